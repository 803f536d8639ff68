#![deny(clippy::all)]
#![deny(warnings)]
#![cfg_attr(not(test), no_std)]

//! # Stepper Motion Core
//!
//! The firmware-side motion core for a single stepper motor: a host-queued ramp
//! scheduler for ordinary moves, and a realtime (THC) controller for closed-loop
//! arc-voltage following on a plasma-cutter axis.
//!
//! ## Layout
//!
//! - [`stepper`]: the `Stepper` type, its move queue, and the pulse scheduler and
//!   command surface (components A and E of the motion core).
//! - [`realtime`]: the realtime controller and realtime step timer (components B, C),
//!   implemented as methods on `Stepper`.
//! - [`transition`]: the Host <-> Realtime mode-transition coordinator (component D).
//! - [`position`]: the bias-encoded position representation shared by all three.
//! - [`move_queue`], [`direction`], [`error`], [`math`], [`fixed_point`], [`gpio`],
//!   [`sensor`]: supporting data types.
//!
//! ## What this crate does not do
//!
//! It never touches the cooperative scheduler, GPIO peripheral registers, or the I2C
//! bus directly — those are external collaborators. Every entry point that could
//! affect a timer's schedule returns a [`error::TimerAction`] instead of calling
//! `add_timer`/`del_timer` itself; the board-specific firmware crate applies it.

pub mod direction;
pub mod error;
pub mod fixed_point;
pub mod gpio;
pub mod math;
pub mod move_queue;
pub mod position;
pub mod realtime;
pub mod sensor;
pub mod stepper;
pub mod transition;

pub use direction::Direction;
pub use error::{ShutdownReason, TimerAction};
pub use position::{BiasedPosition, POSITION_BIAS};
pub use realtime::RtLogSample;
pub use stepper::{Mode, Stepper};
pub use transition::PendingTransition;

#[cfg(test)]
mod integration_tests {
    use crate::fixed_point::Fixed16_16;
    use crate::gpio::test_support::MockPin;
    use crate::sensor::test_support::ConstantSensor;
    use crate::stepper::{Mode, Stepper};
    use crate::TimerAction;

    type Steel = Stepper<MockPin, MockPin, ConstantSensor, 0, 20_000_000, 8>;

    fn configured() -> Steel {
        let mut s: Steel = Stepper::new(MockPin::default(), MockPin::default(), 50, false);
        s.config_realtime_mode(ConstantSensor(2048), 100, 4, Fixed16_16::from_float(2.0), 1000, 5000);
        s
    }

    // (P3) round trip: queue a ramp with add=0 and check position mid-ramp.
    #[test]
    fn p3_midramp_position_roundtrip() {
        let mut s: Steel = Stepper::new(MockPin::default(), MockPin::default(), 50, false);
        s.reset_step_clock(1_000_000);
        s.queue_step(1_000, 10, 0);
        for _ in 0..5 {
            s.pulse_interrupt(0);
        }
        assert_eq!(s.get_position(), 5);
    }

    // (S3) realtime cold start with zero sensor input stays at rest for one input_cycle.
    #[test]
    fn s3_cold_start_zero_input_stays_idle() {
        let mut s: Steel = Stepper::new(MockPin::default(), MockPin::default(), 50, false);
        s.config_realtime_mode(ConstantSensor(1024), 100, 4, Fixed16_16::from_float(2.0), 1000, 5000);
        s.set_realtime_mode(0, -1_000_000, 1_000_000);
        s.on_transition_timer();
        s.poll_transition(0);
        assert_eq!(s.mode(), Mode::Realtime);

        let (_action, log) = s.control_tick();
        assert!(log.is_some());
        assert_eq!(log.unwrap().error, 0);
    }

    // (P4)/(P6): saturating input accelerates at no more than max_delta_freq per
    // tick and never exceeds max_freq; a subsequent set_host_mode brings it to rest.
    #[test]
    fn p4_p6_accelerate_then_return_to_host() {
        let mut s = configured();
        s.set_realtime_mode(0, -1_000_000, 1_000_000);
        s.on_transition_timer();
        s.poll_transition(0);

        let mut prev_speed = 0i32;
        let mut max_delta_seen = 0i32;
        for _ in 0..200 {
            let (action, _log) = s.control_tick();
            let rt = s.rt.as_ref().unwrap();
            let delta = (rt.current_speed - prev_speed).abs();
            max_delta_seen = max_delta_seen.max(delta);
            prev_speed = rt.current_speed;
            assert!(rt.current_speed.abs() <= rt.max_freq);
            match action {
                TimerAction::Reschedule(_) => {}
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(max_delta_seen <= s.rt.as_ref().unwrap().max_delta_freq);
        assert!(prev_speed > 0, "expected the saturating input to accelerate the axis");

        // Now request a return to host mode; the slowdown envelope should complete
        // within a bounded number of ticks and zero the speed.
        s.set_host_mode(0, 0);
        let mut ticks = 0;
        loop {
            let (action, _log) = s.control_tick();
            ticks += 1;
            if action == TimerAction::Stop {
                break;
            }
            assert!(ticks < 10_000, "slowdown never completed");
        }
        assert_eq!(s.mode(), Mode::Host);
    }

    // Regression: a full Realtime -> Host round trip must not discard the realtime
    // config block, since `config_stepper_rt_mode` is only ever called once.
    #[test]
    fn realtime_config_survives_a_round_trip_to_host() {
        let mut s = configured();
        s.set_realtime_mode(0, -1_000_000, 1_000_000);
        s.on_transition_timer();
        s.poll_transition(0);
        assert_eq!(s.mode(), Mode::Realtime);

        s.set_host_mode(0, 0);
        let mut ticks = 0;
        loop {
            let (action, _log) = s.control_tick();
            ticks += 1;
            if action == TimerAction::Stop {
                break;
            }
            assert!(ticks < 10_000, "slowdown never completed");
        }
        assert_eq!(s.mode(), Mode::Host);

        // Re-entering realtime mode must work with the same control parameters,
        // without calling config_realtime_mode again.
        s.set_realtime_mode(0, -1_000_000, 1_000_000);
        s.on_transition_timer();
        s.poll_transition(0);
        assert_eq!(s.mode(), Mode::Realtime);
        let rt = s.rt.as_ref().unwrap();
        assert_eq!(rt.max_freq, 1000);
        assert_eq!(rt.max_acc, 5000);
    }
}
