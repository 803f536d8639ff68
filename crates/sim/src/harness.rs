//! Scenario harness: sequences a `mcu_drivers::Stepper`'s four timers by absolute
//! tick and records the GPIO edges it produces.
//!
//! The motion core never touches a scheduler directly — every entry point returns a
//! [`mcu_drivers::TimerAction`] and leaves scheduling to its caller (§1, §5). This
//! harness plays that caller: a tiny 4-slot "scheduler" (pulse/control/step/
//! transition) that always fires whichever armed timer is soonest, exactly the
//! min-heap-over-absolute-waketime discipline §5 describes, just sized for one
//! stepper instead of a whole board.

use mcu_drivers::{RtLogSample, Stepper, TimerAction};

use crate::scripted_sensor::ScriptedSensor;
use crate::virtual_clock::RecordingPin;

/// Which of the core's four timers fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Pulse,
    Control,
    Step,
    Transition,
}

#[derive(Default, Clone, Copy)]
struct Slot(Option<u32>);

/// A `Stepper` plus the 4-timer scheduler driving it, parameterized the same way
/// every scenario in this harness needs: `CONFIG_STEP_DELAY == 0` (combined pulse
/// callback) and the `CLOCK_FREQ = 20_000_000` ticks/s §8 scenarios are all written
/// against.
pub type SimStepper = Stepper<RecordingPin, RecordingPin, ScriptedSensor, 0, 20_000_000, 16>;

pub struct Scenario {
    pub stepper: SimStepper,
    pub step_trace: std::rc::Rc<std::cell::RefCell<crate::virtual_clock::EdgeTrace>>,
    pub dir_trace: std::rc::Rc<std::cell::RefCell<crate::virtual_clock::EdgeTrace>>,
    tick: std::rc::Rc<std::cell::Cell<u32>>,
    pulse: Slot,
    control: Slot,
    step: Slot,
    transition: Slot,
    pub rt_log: Vec<RtLogSample>,
}

impl Scenario {
    pub fn new(min_stop_interval: u32, invert_step: bool, sensor_centered: i32) -> Self {
        let tick = std::rc::Rc::new(std::cell::Cell::new(0));
        let (step_pin, step_trace) = RecordingPin::new(tick.clone());
        let (dir_pin, dir_trace) = RecordingPin::new(tick.clone());
        let stepper = Stepper::new(step_pin, dir_pin, min_stop_interval, invert_step);
        let _ = sensor_centered;
        Self {
            stepper,
            step_trace,
            dir_trace,
            tick,
            pulse: Slot::default(),
            control: Slot::default(),
            step: Slot::default(),
            transition: Slot::default(),
            rt_log: Vec::new(),
        }
    }

    pub fn now(&self) -> u32 {
        self.tick.get()
    }

    /// Host-mode entry points, forwarded straight onto the stepper and applied to
    /// the pulse timer slot as the caller (the command dispatcher, under irq_disable
    /// per §5) would.
    pub fn reset_step_clock(&mut self, clock: u32) {
        let action = self.stepper.reset_step_clock(clock);
        self.apply(Timer::Pulse, action);
    }

    pub fn queue_step(&mut self, interval: u32, count: u16, add: i16) {
        let action = self.stepper.queue_step(interval, count, add);
        self.apply(Timer::Pulse, action);
    }

    pub fn set_next_step_dir(&mut self, dir: mcu_drivers::Direction) {
        self.stepper.set_next_step_dir(dir);
    }

    pub fn stop(&mut self) {
        self.stepper.stop();
        self.pulse = Slot::default();
        self.control = Slot::default();
        self.step = Slot::default();
        self.transition = Slot::default();
    }

    pub fn config_realtime_mode(
        &mut self,
        sensor: ScriptedSensor,
        control_freq: u32,
        input_cycle: u16,
        input_factor: mcu_drivers::fixed_point::Fixed16_16,
        max_freq: i32,
        max_acc: i32,
    ) {
        self.stepper
            .config_realtime_mode(sensor, control_freq, input_cycle, input_factor, max_freq, max_acc);
    }

    pub fn set_realtime_mode(&mut self, clock: u32, min_pos: i32, max_pos: i32) {
        let action = self.stepper.set_realtime_mode(clock, min_pos, max_pos);
        self.apply(Timer::Transition, action);
    }

    pub fn set_host_mode(&mut self, clock: u32) {
        let now = self.now();
        let action = self.stepper.set_host_mode(clock, now);
        self.apply(Timer::Transition, action);
    }

    /// Runs the scheduler forward until no armed timer remains at or before
    /// `deadline`, firing whichever is soonest each step (ties broken pulse before
    /// control before step before transition, an arbitrary but fixed order — the
    /// spec places no ordering requirement on simultaneous timers).
    pub fn run_until(&mut self, deadline: u32) {
        loop {
            let next = [
                (Timer::Pulse, self.pulse.0),
                (Timer::Control, self.control.0),
                (Timer::Step, self.step.0),
                (Timer::Transition, self.transition.0),
            ]
            .into_iter()
            .filter_map(|(t, w)| w.map(|w| (w, t)))
            .filter(|(w, _)| *w <= deadline)
            .min_by_key(|(w, _)| *w);

            let (wake, timer) = match next {
                Some(x) => x,
                None => break,
            };

            self.tick.set(wake);
            self.fire(timer);
        }
        self.tick.set(deadline.max(self.tick.get()));
    }

    fn fire(&mut self, timer: Timer) {
        match timer {
            Timer::Pulse => {
                let now = self.tick.get();
                let action = self.stepper.pulse_interrupt(now);
                self.apply(Timer::Pulse, action);
            }
            Timer::Control => {
                let (action, log) = self.stepper.control_tick();
                if let Some(sample) = log {
                    self.rt_log.push(sample);
                }
                self.apply(Timer::Control, action);
                // A completed slowdown (§4.2 step 3) hands the stepper back to
                // `Mode::Host` and expects both realtime timers detached; the core
                // only reports the control timer's own fate via `TimerAction`, so
                // the step timer is detached here once the mode flip is observed.
                if self.stepper.mode() == mcu_drivers::Mode::Host {
                    self.step = Slot::default();
                }
            }
            Timer::Step => {
                let action = self.stepper.realtime_step_tick();
                self.apply(Timer::Step, action);
            }
            Timer::Transition => {
                self.stepper.on_transition_timer();
                self.transition = Slot::default();
                let now = self.tick.get();
                let action = self.stepper.poll_transition(now);
                // `poll_transition`'s Host->Realtime branch reports only the control
                // timer's first wake (`TimerAction` carries one value); the step
                // timer was armed in the same call, so read it back directly rather
                // than guessing an offset.
                self.apply(Timer::Control, action);
                if let Some(step_wake) = self.stepper.realtime_step_waketime() {
                    if self.stepper.mode() == mcu_drivers::Mode::Realtime {
                        self.step = Slot(Some(step_wake));
                    }
                }
            }
        }
    }

    fn apply(&mut self, timer: Timer, action: TimerAction) {
        let slot = match timer {
            Timer::Pulse => &mut self.pulse,
            Timer::Control => &mut self.control,
            Timer::Step => &mut self.step,
            Timer::Transition => &mut self.transition,
        };
        match action {
            TimerAction::None => {}
            TimerAction::Reschedule(t) => slot.0 = Some(t),
            TimerAction::Stop => slot.0 = None,
            TimerAction::Fatal(reason) => panic!("fatal shutdown: {reason}"),
        }
    }
}
