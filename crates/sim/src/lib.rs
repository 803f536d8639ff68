//! # Stepper-core scenario simulator
//!
//! A host-side, in-process harness for exercising `mcu_drivers::Stepper` against a
//! virtual clock instead of real hardware timers. Unlike a host/MCU protocol
//! simulator, there is no serial link or separate process here: the harness plays
//! the scheduler the motion core treats as an external collaborator (§1, §5),
//! sequencing its four timers by absolute tick and recording every GPIO edge they
//! produce.
//!
//! `tests/scenarios.rs` drives this harness through the spec's testable properties
//! (P1-P8) and concrete scenarios (S1-S4).

pub mod harness;
pub mod scripted_sensor;
pub mod virtual_clock;

pub use harness::Scenario;
pub use scripted_sensor::ScriptedSensor;
pub use virtual_clock::{Edge, EdgeTrace, RecordingPin};
