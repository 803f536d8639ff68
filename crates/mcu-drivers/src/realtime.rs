//! Realtime (THC) controller state.
//!
//! `RealtimeBlock` holds everything the realtime controller (component B) and the
//! realtime step timer (component C) need, and is lazily populated by
//! `config_stepper_rt_mode`. `control_tick`/`realtime_step_tick` are implemented as
//! methods on `Stepper` in this module, since both need access to the stepper's
//! direction pin and bias-encoded position alongside this block.

use crate::direction::Direction;
use crate::error::{ShutdownReason, TimerAction};
use crate::fixed_point::Fixed16_16;
use crate::gpio::OutputPin;
use crate::math::isqrt;
use crate::sensor::ArcVoltageSensor;
use crate::stepper::{Mode, Stepper};

/// One realtime-mode telemetry sample, emitted once per `input_cycle` control ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtLogSample {
    pub pos: i32,
    pub error: i32,
}

#[derive(Clone, Copy)]
pub struct RealtimeBlock {
    pub control_freq: u32,
    pub control_period: u32,
    pub input_cycle: u16,
    pub input_factor: Fixed16_16,
    pub max_freq: i32,
    pub max_acc: i32,
    pub max_delta_freq: i32,
    pub min_freq: i32,
    pub min_pos: i32,
    pub max_pos: i32,

    pub count: i32,
    pub current_speed: i32,
    pub target_speed: i32,
    pub current_period: u32,
    pub current_dir: Direction,
    pub dir_save: Direction,

    pub low_pass: i32,
    pub cycle_count: u16,

    pub slowdown: bool,
    pub freq_limiter: i32,

    pub last_step: u32,
    pub control_waketime: u32,
    pub step_waketime: u32,
}

impl RealtimeBlock {
    pub fn new(
        control_freq: u32,
        clock_hz: u32,
        input_cycle: u16,
        input_factor: Fixed16_16,
        max_freq: i32,
        max_acc: i32,
    ) -> Self {
        let control_period = clock_hz / control_freq.max(1);
        let max_delta_freq = (max_acc / control_freq.max(1) as i32).max(1);
        let min_freq = 100i32.min(max_delta_freq);
        Self {
            control_freq,
            control_period,
            input_cycle,
            input_factor,
            max_freq,
            max_acc,
            max_delta_freq,
            min_freq,
            min_pos: 0,
            max_pos: 0,
            count: 0,
            current_speed: 0,
            target_speed: 0,
            current_period: 0,
            current_dir: Direction::Forward,
            dir_save: Direction::Forward,
            low_pass: 0,
            cycle_count: 0,
            slowdown: false,
            freq_limiter: 0,
            last_step: 0,
            control_waketime: 0,
            step_waketime: 0,
        }
    }

    /// Worst-case number of control ticks to decelerate from `max_freq` to 0.
    pub fn slowdown_ticks(&self) -> u32 {
        (self.max_freq.unsigned_abs() / self.max_delta_freq.max(1).unsigned_abs()).max(1)
    }
}

impl<STEP, DIR, SENSOR, const STEP_DELAY_TICKS: u32, const CLOCK_HZ: u32, const N: usize>
    Stepper<STEP, DIR, SENSOR, STEP_DELAY_TICKS, CLOCK_HZ, N>
where
    STEP: OutputPin,
    DIR: OutputPin,
    SENSOR: ArcVoltageSensor,
{
    /// Component B: one realtime control tick.
    ///
    /// Reads the sensor (every `input_cycle` ticks), filters it, derives a bounded
    /// target speed, applies the soft position limits, runs the slowdown envelope if
    /// one is active, clamps acceleration, snaps sub-minimum speeds to zero, derives
    /// the next step period, and flips the direction pin if required.
    pub fn control_tick(&mut self) -> (TimerAction, Option<RtLogSample>) {
        let rt = match &mut self.rt {
            Some(rt) => rt,
            None => return (TimerAction::None, None),
        };

        let mut log = None;
        if rt.cycle_count == 0 {
            let raw = match self.sensor.as_mut().map(|s| s.read_raw()) {
                Some(Ok(v)) => v as i32,
                _ => 0,
            };
            let val = raw - 1024;
            rt.low_pass = (rt.low_pass + val) / 2;
            log = Some(RtLogSample { pos: rt.count, error: rt.low_pass });

            let raw_target = rt.input_factor.scale_i32(rt.low_pass);
            rt.target_speed = raw_target.clamp(-rt.max_freq, rt.max_freq);
        }

        let steps_to_stop = if rt.max_acc > 0 {
            (rt.max_freq * rt.max_freq) / (2 * rt.max_acc) + (2 * rt.max_freq) / rt.control_freq as i32
        } else {
            0
        };
        let dist_to_min = (rt.count - (rt.min_pos + 1)).max(0);
        let dist_to_max = ((rt.max_pos - 1) - rt.count).max(0);
        if dist_to_min <= steps_to_stop {
            let limit = isqrt((rt.max_acc.max(0) as u32) * dist_to_min as u32) as i32;
            rt.target_speed = rt.target_speed.max(-limit);
        }
        if dist_to_max <= steps_to_stop {
            let limit = isqrt((rt.max_acc.max(0) as u32) * dist_to_max as u32) as i32;
            rt.target_speed = rt.target_speed.min(limit);
        }

        if rt.slowdown {
            rt.freq_limiter -= rt.max_delta_freq;
            rt.target_speed = rt.target_speed.clamp(-rt.freq_limiter, rt.freq_limiter);
            if rt.freq_limiter < rt.max_delta_freq {
                return (self.finish_slowdown(), log);
            }
        }

        let rt = self.rt.as_mut().unwrap();
        let delta = (rt.target_speed - rt.current_speed).clamp(-rt.max_delta_freq, rt.max_delta_freq);
        rt.current_speed += delta;

        if rt.current_speed.unsigned_abs() < rt.min_freq as u32 {
            rt.current_speed = 0;
        }

        rt.current_period = if rt.current_speed != 0 {
            CLOCK_HZ / rt.current_speed.unsigned_abs()
        } else {
            0
        };

        let next_dir = Direction::from_signed_speed(rt.current_speed);
        if next_dir != rt.current_dir {
            critical_section::with(|_| {
                self.dir_pin.toggle();
            });
            let rt = self.rt.as_mut().unwrap();
            rt.current_dir = next_dir;
        }

        let rt = self.rt.as_mut().unwrap();
        rt.cycle_count = (rt.cycle_count + 1) % rt.input_cycle.max(1);
        let next_wake = rt.control_waketime + rt.control_period;
        rt.control_waketime = next_wake;
        (TimerAction::Reschedule(next_wake), log)
    }

    /// Completes a slowdown: detaches both realtime timers, restores `dir_pin` to the
    /// saved state, hands position accounting back to the bias-encoded scheme, and
    /// switches the stepper back to `Mode::Host`.
    ///
    /// The realtime block itself is *not* torn down: `control_freq`, `max_freq`,
    /// `max_acc` and friends were set once by `config_stepper_rt_mode` and must
    /// survive the round trip so a later `set_realtime_mode` doesn't need to be
    /// reconfigured (§3: "initialized lazily" means once, not per-entry).
    fn finish_slowdown(&mut self) -> TimerAction {
        let (current_dir, dir_save, count, step_waketime) = {
            let rt = self.rt.as_ref().expect("finish_slowdown called without an active realtime block");
            (rt.current_dir, rt.dir_save, rt.count, rt.step_waketime)
        };
        if current_dir != dir_save {
            self.dir_pin.toggle();
        }
        self.position = crate::position::BiasedPosition::initial();
        self.position.apply_direction_change(count.unsigned_abs());
        if count < 0 {
            self.position = self.position.negate_wire(0);
        }
        if let Some(rt) = &mut self.rt {
            rt.slowdown = false;
            rt.freq_limiter = 0;
            rt.current_speed = 0;
            rt.current_period = 0;
        }
        self.mode = Mode::Host;
        self.next_step_time = step_waketime;
        TimerAction::Stop
    }

    /// Component C: the realtime step timer. Idles by re-arming at `control_period`
    /// while `current_period == 0`; otherwise toggles `step` twice (a full pulse) and
    /// advances `count`.
    pub fn realtime_step_tick(&mut self) -> TimerAction {
        let rt = match &mut self.rt {
            Some(rt) => rt,
            None => return TimerAction::Stop,
        };

        if rt.current_period == 0 {
            rt.step_waketime += rt.control_period;
            return TimerAction::Reschedule(rt.step_waketime);
        }

        self.step_pin.toggle();
        self.step_pin.toggle();
        let rt = self.rt.as_mut().unwrap();
        rt.last_step = rt.step_waketime;
        rt.step_waketime += rt.current_period;
        rt.count += if rt.current_dir.is_reverse() { -1 } else { 1 };
        TimerAction::Reschedule(rt.step_waketime)
    }
}
