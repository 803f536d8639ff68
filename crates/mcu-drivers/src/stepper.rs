//! The stepper motion core: move queue, pulse scheduler, and command surface
//! (components A and E). The realtime controller and step timer (B, C) are
//! implemented on this same type in `realtime.rs`; mode transitions (D) in
//! `transition.rs`.

use crate::direction::Direction;
use crate::error::{ShutdownReason, TimerAction};
use crate::gpio::{OutputPin, TrackedPin};
use crate::move_queue::{Move, MovePool, MoveQueue};
use crate::position::BiasedPosition;
use crate::realtime::RealtimeBlock;
use crate::sensor::ArcVoltageSensor;
use crate::transition::PendingTransition;

/// A minimum gap (in MCU ticks) tolerated between a catch-up wake and the time it
/// was originally due; beyond this the stepper has fallen fatally behind.
const MAX_CATCHUP_TICKS: u32 = 20_000; // 1ms at a 20MHz clock.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Host,
    Realtime,
}

/// One stepper motor, parameterized by its step/dir pin types, its sensor type (for
/// realtime mode), and three compile-time constants:
///
/// - `STEP_DELAY_TICKS`: the `CONFIG_STEP_DELAY` split point (§9). `0` selects the
///   combined toggle-in-one-callback pulse form; any other value selects the
///   step/unstep-as-separate-half-events form.
/// - `CLOCK_HZ`: the MCU's tick rate, used to derive realtime step periods.
/// - `N`: the move pool capacity.
pub struct Stepper<STEP, DIR, SENSOR, const STEP_DELAY_TICKS: u32, const CLOCK_HZ: u32, const N: usize>
{
    pub(crate) step_pin: TrackedPin<STEP>,
    pub(crate) dir_pin: TrackedPin<DIR>,
    pub(crate) sensor: Option<SENSOR>,

    pub(crate) mode: Mode,
    invert_step: bool,
    min_stop_interval: u32,

    pool: MovePool<N>,
    queue: MoveQueue,

    interval: u32,
    add: i16,
    count: u32,
    pub(crate) next_step_time: u32,
    pub(crate) position: BiasedPosition,

    next_dir: Direction,
    last_dir: Option<Direction>,
    fresh_reset: bool,
    need_reset: bool,
    no_next_check: bool,

    pub(crate) rt: Option<RealtimeBlock>,
    pub(crate) pending_transition: PendingTransition,
    pub(crate) toggle_pending: bool,
    pub(crate) transition_clock: u32,
    pub(crate) slowdown_pending: Option<u32>,
}

impl<STEP, DIR, SENSOR, const STEP_DELAY_TICKS: u32, const CLOCK_HZ: u32, const N: usize>
    Stepper<STEP, DIR, SENSOR, STEP_DELAY_TICKS, CLOCK_HZ, N>
where
    STEP: OutputPin,
    DIR: OutputPin,
{
    /// `config_stepper`: create a stepper bound to its step/dir pins.
    pub fn new(step_pin: STEP, dir_pin: DIR, min_stop_interval: u32, invert_step: bool) -> Self {
        Self {
            step_pin: TrackedPin::new(step_pin, invert_step),
            dir_pin: TrackedPin::new(dir_pin, false),
            sensor: None,
            mode: Mode::Host,
            invert_step,
            min_stop_interval,
            pool: MovePool::new(),
            queue: MoveQueue::new(),
            interval: 0,
            add: 0,
            count: 0,
            next_step_time: 0,
            position: BiasedPosition::initial(),
            next_dir: Direction::Forward,
            last_dir: None,
            fresh_reset: false,
            need_reset: false,
            no_next_check: false,
            rt: None,
            pending_transition: PendingTransition::None,
            toggle_pending: false,
            transition_clock: 0,
            slowdown_pending: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The realtime step timer's (component C) next wake, if realtime mode has ever
    /// been entered. A transition into realtime arms both the control and step
    /// timers in one call (§4.4) but `TimerAction` only carries one wake value (the
    /// control timer's), so the scheduler glue reads this one directly to arm the
    /// step timer alongside it.
    pub fn realtime_step_waketime(&self) -> Option<u32> {
        self.rt.as_ref().map(|rt| rt.step_waketime)
    }

    /// The direction the stepper was last moving in, used by `enter_realtime` to
    /// initialize the realtime block's saved direction pin state.
    pub(crate) fn next_dir_for_transition(&self) -> Direction {
        self.last_dir.unwrap_or(Direction::Forward)
    }

    /// `set_next_step_dir`: sets the direction the *next* queued move will carry.
    pub fn set_next_step_dir(&mut self, dir: Direction) {
        self.next_dir = dir;
    }

    /// `reset_step_clock`: rebases the epoch for the next ramp. Fatal if the
    /// stepper is still actively stepping.
    pub fn reset_step_clock(&mut self, clock: u32) -> TimerAction {
        if self.count > 0 {
            return TimerAction::Fatal(ShutdownReason::ResetWhileActive);
        }
        self.next_step_time = clock;
        self.fresh_reset = true;
        self.need_reset = false;
        TimerAction::None
    }

    /// `queue_step`: enqueue one ramp triple.
    pub fn queue_step(&mut self, interval: u32, count: u16, add: i16) -> TimerAction {
        if count == 0 {
            return TimerAction::Fatal(ShutdownReason::InvalidCount);
        }

        let direction_change = self.last_dir != Some(self.next_dir);
        self.last_dir = Some(self.next_dir);

        if (self.fresh_reset || direction_change) && count == 1 {
            self.no_next_check = true;
        }
        self.fresh_reset = false;

        let mv = Move { interval, add, count, direction_change };

        if self.count > 0 {
            // Already stepping: append and return; `load_next` will pick it up later.
            match self.pool.alloc(mv) {
                Some(idx) => self.queue.push_back(&mut self.pool, idx),
                None => return TimerAction::Fatal(ShutdownReason::NoNextStep),
            }
            return TimerAction::None;
        }

        if self.need_reset {
            // Host queued a move after an emergency stop without resetting the clock.
            return TimerAction::None;
        }

        let min_next_time = self.next_step_time.wrapping_add(interval);
        match self.load_next_move(Some(mv), min_next_time) {
            Ok(action) => action,
            Err(reason) => TimerAction::Fatal(reason),
        }
    }

    /// `load_next`: pops the head of the queue (or uses `immediate`, for the first
    /// move of a freshly started ramp) and primes pulse-scheduler state.
    fn load_next_move(&mut self, immediate: Option<Move>, min_next_time: u32) -> Result<TimerAction, ShutdownReason> {
        let mv = match immediate {
            Some(mv) => Some(mv),
            None => self.queue.pop_front(&mut self.pool),
        };

        let mv = match mv {
            None => {
                let tail_ok = self.no_next_check || self.interval.wrapping_sub(self.add as u32) >= self.min_stop_interval;
                self.no_next_check = false;
                self.count = 0;
                if !tail_ok {
                    return Err(ShutdownReason::NoNextStep);
                }
                return Ok(TimerAction::Stop);
            }
            Some(mv) => mv,
        };

        self.next_step_time = self.next_step_time.wrapping_add(mv.interval);
        self.add = mv.add;
        self.interval = mv.interval.wrapping_add(mv.add as u32);

        self.count = if STEP_DELAY_TICKS > 0 {
            mv.count as u32 * 2
        } else {
            mv.count as u32
        };

        let mut wake = self.next_step_time;
        if wake.wrapping_sub(min_next_time) > u32::MAX / 2 {
            // `wake` is behind `min_next_time`; check how far.
            let behind = min_next_time.wrapping_sub(wake);
            if behind > MAX_CATCHUP_TICKS {
                return Err(ShutdownReason::StepperTooFarInPast);
            }
            wake = min_next_time;
            self.next_step_time = wake;
        }

        if mv.direction_change {
            self.position.apply_direction_change(mv.count as u32);
            match self.mode {
                Mode::Host => self.dir_pin.set(self.next_dir.is_reverse() != self.invert_step),
                Mode::Realtime => {
                    if let Some(rt) = &mut self.rt {
                        rt.dir_save = self.next_dir;
                    }
                }
            }
        } else {
            self.position.accumulate(mv.count as u32);
        }

        Ok(TimerAction::Reschedule(wake))
    }

    /// The pulse scheduler's timer callback (component A). Toggles `step`, decrements
    /// `count`, and either advances the ramp or loads the next move.
    pub fn pulse_interrupt(&mut self, now: u32) -> TimerAction {
        if STEP_DELAY_TICKS > 0 {
            self.pulse_interrupt_delayed(now)
        } else {
            self.pulse_interrupt_combined()
        }
    }

    fn pulse_interrupt_combined(&mut self) -> TimerAction {
        self.step_pin.toggle();
        self.count = self.count.saturating_sub(1);
        if self.count == 0 {
            let min_next_time = self.next_step_time;
            return match self.load_next_move(None, min_next_time) {
                Ok(action) => action,
                Err(reason) => TimerAction::Fatal(reason),
            };
        }
        self.next_step_time = self.next_step_time.wrapping_add(self.interval);
        self.interval = self.interval.wrapping_add(self.add as u32);
        TimerAction::Reschedule(self.next_step_time)
    }

    fn pulse_interrupt_delayed(&mut self, now: u32) -> TimerAction {
        self.step_pin.toggle();
        let min_next_time = now.wrapping_add(STEP_DELAY_TICKS);
        self.count = self.count.saturating_sub(1);

        if self.count % 2 == 1 {
            // That was the step edge; the unstep follows after the configured delay.
            return TimerAction::Reschedule(min_next_time);
        }

        if self.count == 0 {
            return match self.load_next_move(None, min_next_time) {
                Ok(action) => action,
                Err(reason) => TimerAction::Fatal(reason),
            };
        }

        self.next_step_time = self.next_step_time.wrapping_add(self.interval);
        self.interval = self.interval.wrapping_add(self.add as u32);
        let wake = if self.next_step_time.wrapping_sub(min_next_time) > u32::MAX / 2 {
            min_next_time
        } else {
            self.next_step_time
        };
        TimerAction::Reschedule(wake)
    }

    /// `stepper_get_position`: the signed, bias-removed position reported to the host.
    pub fn get_position(&self) -> i32 {
        let pending = if STEP_DELAY_TICKS > 0 { self.count / 2 } else { self.count };
        self.position.reported(pending)
    }

    /// `stepper_stop`: force-stop outside the normal ramp protocol (endstop/homing,
    /// or the system-wide shutdown hook).
    pub fn stop(&mut self) {
        let pending = if STEP_DELAY_TICKS > 0 { self.count / 2 } else { self.count };
        self.position = self.position.negate_wire(pending);
        self.next_step_time = 0;
        self.count = 0;
        self.interval = 0;
        self.add = 0;
        self.no_next_check = false;
        self.need_reset = true;
        self.queue.clear(&mut self.pool);
        self.dir_pin.set(false);
        self.step_pin.set(self.invert_step);
        self.mode = Mode::Host;
        // The realtime config block (control_freq, max_freq, ...) is set once by
        // `config_stepper_rt_mode` and outlives an emergency stop; only the
        // in-flight transition bookkeeping is cancelled here.
        self.pending_transition = PendingTransition::None;
        self.toggle_pending = false;
        self.slowdown_pending = None;
    }
}

impl<STEP, DIR, SENSOR, const STEP_DELAY_TICKS: u32, const CLOCK_HZ: u32, const N: usize>
    Stepper<STEP, DIR, SENSOR, STEP_DELAY_TICKS, CLOCK_HZ, N>
where
    STEP: OutputPin,
    DIR: OutputPin,
    SENSOR: ArcVoltageSensor,
{
    /// `config_stepper_rt_mode`: populate the realtime parameters and attach the
    /// ADS1015 sensor handle. Does not itself switch modes; `set_realtime_mode`
    /// schedules the actual transition (component D).
    pub fn config_realtime_mode(
        &mut self,
        sensor: SENSOR,
        control_freq: u32,
        input_cycle: u16,
        input_factor: crate::fixed_point::Fixed16_16,
        max_freq: i32,
        max_acc: i32,
    ) {
        self.sensor = Some(sensor);
        self.rt = Some(RealtimeBlock::new(control_freq, CLOCK_HZ, input_cycle, input_factor, max_freq, max_acc));
    }
}
