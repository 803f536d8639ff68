//! Mode-transition coordinator (component D): Host <-> Realtime switching.
//!
//! The transition timer is reused for both directions; `PendingTransition::None`
//! is the sentinel the original C firmware spells as `func == NULL`.

use crate::direction::Direction;
use crate::error::{ShutdownReason, TimerAction};
use crate::gpio::OutputPin;
use crate::sensor::ArcVoltageSensor;
use crate::stepper::{Mode, Stepper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingTransition {
    None,
    ToRealtime,
    ToHost,
}

impl<STEP, DIR, SENSOR, const STEP_DELAY_TICKS: u32, const CLOCK_HZ: u32, const N: usize>
    Stepper<STEP, DIR, SENSOR, STEP_DELAY_TICKS, CLOCK_HZ, N>
where
    STEP: OutputPin,
    DIR: OutputPin,
    SENSOR: ArcVoltageSensor,
{
    /// `set_realtime_mode`: schedule a Host -> Realtime transition at `clock`.
    /// Fatal if a transition is already in flight, or realtime mode is already active.
    pub fn set_realtime_mode(&mut self, clock: u32, min_pos: i32, max_pos: i32) -> TimerAction {
        if self.mode == Mode::Realtime {
            return TimerAction::Fatal(ShutdownReason::RealtimeModeAlreadyActive);
        }
        if self.pending_transition != PendingTransition::None {
            // A transition is already in flight; silently ignored per the
            // duplicate-transition dedup rule.
            return TimerAction::None;
        }
        if let Some(rt) = &mut self.rt {
            rt.min_pos = min_pos;
            rt.max_pos = max_pos;
        }
        self.pending_transition = PendingTransition::ToRealtime;
        self.transition_clock = clock;
        TimerAction::Reschedule(clock)
    }

    /// `set_host_mode`: schedule (or immediately start) a Realtime -> Host slowdown
    /// landing at `clock`. If the Host -> Realtime transition is still pending, the
    /// request is stashed and chained once `enter_realtime` runs.
    pub fn set_host_mode(&mut self, clock: u32, now: u32) -> TimerAction {
        if self.mode == Mode::Host && self.pending_transition == PendingTransition::ToRealtime {
            self.slowdown_pending = Some(clock);
            return TimerAction::None;
        }

        let rt = match &self.rt {
            Some(rt) => rt,
            None => return TimerAction::None,
        };
        let slowdown_ticks = rt.slowdown_ticks();
        let slowdown_time = rt.control_period.saturating_mul(slowdown_ticks);
        let start_at = clock.wrapping_sub(slowdown_time);

        if start_at.wrapping_sub(now) > u32::MAX / 2 {
            // `start_at` is already in the past: begin the slowdown immediately,
            // sized so the ramp lands at `clock`.
            let remaining_ticks = clock.wrapping_sub(now) / rt.control_period.max(1);
            let rt = self.rt.as_mut().unwrap();
            rt.freq_limiter = rt.max_delta_freq.saturating_mul(remaining_ticks as i32);
            rt.slowdown = true;
            self.pending_transition = PendingTransition::None;
            TimerAction::None
        } else {
            self.pending_transition = PendingTransition::ToHost;
            self.transition_clock = start_at;
            TimerAction::Reschedule(start_at)
        }
    }

    /// The mode-transition timer's interrupt-context callback: only sets a flag for
    /// the task-level dispatcher to pick up, keeping interrupt work minimal.
    pub fn on_transition_timer(&mut self) -> TimerAction {
        self.toggle_pending = true;
        TimerAction::Stop
    }

    /// Task-level transition dispatcher: call once per stepper with `toggle_pending`
    /// set. Runs the appropriate half of the Host<->Realtime switch.
    pub fn poll_transition(&mut self, now: u32) -> TimerAction {
        if !self.toggle_pending {
            return TimerAction::None;
        }
        self.toggle_pending = false;

        match self.pending_transition {
            PendingTransition::None => TimerAction::None,
            PendingTransition::ToRealtime => self.enter_realtime(now),
            PendingTransition::ToHost => {
                if let Some(rt) = &mut self.rt {
                    rt.freq_limiter = rt.max_freq;
                    rt.slowdown = true;
                }
                self.pending_transition = PendingTransition::None;
                TimerAction::None
            }
        }
    }

    /// Executes the Host -> Realtime half of a transition: snapshots position into
    /// `rt.count`, zeroes the live realtime state, and arms the control/step timers.
    fn enter_realtime(&mut self, now: u32) -> TimerAction {
        self.pending_transition = PendingTransition::None;
        let position = self.get_position();

        let rt = match &mut self.rt {
            Some(rt) => rt,
            None => return TimerAction::None,
        };

        rt.dir_save = self.next_dir_for_transition();
        rt.count = position;
        rt.current_dir = Direction::Forward;
        rt.slowdown = false;
        rt.current_period = 0;
        rt.current_speed = 0;
        rt.cycle_count = 0;
        rt.last_step = now;

        // §4.4: offsets are derived from the MCU clock itself, not the control
        // period, so the first control tick reliably precedes the first step window
        // regardless of `control_freq`.
        let control_wake = now.wrapping_add(CLOCK_HZ / 10_000);
        let step_wake = now.wrapping_add(CLOCK_HZ / 5_000);
        rt.control_waketime = control_wake;
        rt.step_waketime = step_wake;

        self.mode = Mode::Realtime;

        if let Some(clock) = self.slowdown_pending.take() {
            return self.set_host_mode(clock, now);
        }

        TimerAction::Reschedule(control_wake)
    }
}
