#![deny(clippy::all)]
#![deny(warnings)]

//! The per-board stepper bank: owns one `mcu_drivers::Stepper` per configured oid
//! and turns parsed host commands into calls on it.
//!
//! Pin binding is fixed at board boot (see `embassy_main`/`rtic_main`), not by the
//! wire-level `config_stepper` command: resolving a numeric pin id to a concrete
//! GPIO line is exactly the "GPIO abstraction"/"OID registry" territory the motion
//! core treats as an external collaborator, so this firmware crate hardcodes the
//! board's oid <-> pin mapping instead of reinventing a pin registry. The command
//! still arrives and is used to validate the host's oid numbering.

use heapless::Vec;
use klipper_proto::commands::{Command, CommandQueueStep, Response};
use mcu_drivers::fixed_point::Fixed16_16;
use mcu_drivers::gpio::OutputPin;
use mcu_drivers::sensor::ArcVoltageSensor;
use mcu_drivers::{Direction, ShutdownReason, Stepper, TimerAction};

use crate::shutdown::{reason_str, Shutdown};

/// Number of stepper axes this board drives: X, Y, and the torch (Z) axis, which is
/// the only one ever placed into realtime/THC mode.
pub const NUM_STEPPERS: usize = 3;

/// The torch axis's oid; the only one `ConfigStepperRtMode` is ever sent for.
pub const TORCH_OID: u8 = 2;

/// `CONFIG_STEP_DELAY` split point: 0 selects the combined step/unstep-in-one
/// callback form.
pub const STEP_DELAY_TICKS: u32 = 0;
/// MCU tick rate the realtime controller derives its control and step periods from.
pub const CLOCK_HZ: u32 = 20_000_000;
/// Move pool capacity per stepper (§3's allocation-at-configuration move pool).
const MOVE_POOL_SIZE: usize = 16;

/// Fallback `min_stop_interval` used at board boot, before the host's own
/// `config_stepper` has had a chance to set the real per-axis value.
pub const MIN_STOP_INTERVAL_DEFAULT: u32 = 200;

/// One board stepper, fully parameterized over pin and sensor types so this module
/// stays testable with mock pins on the host.
pub type Motor<STEP, DIR, SENSOR> = Stepper<STEP, DIR, SENSOR, STEP_DELAY_TICKS, CLOCK_HZ, MOVE_POOL_SIZE>;

/// Owns every stepper on the board and dispatches parsed host commands to the right
/// one by oid. All steppers share one sensor type parameter; only the torch axis's
/// sensor slot is ever actually populated, via `ConfigStepperRtMode`.
pub struct StepperBank<STEP, DIR, SENSOR> {
    steppers: Vec<Motor<STEP, DIR, SENSOR>, NUM_STEPPERS>,
    torch_sensor: Option<SENSOR>,
}

impl<STEP, DIR, SENSOR> StepperBank<STEP, DIR, SENSOR>
where
    STEP: OutputPin,
    DIR: OutputPin,
{
    /// `torch_sensor` is consumed by the first `ConfigStepperRtMode` targeting
    /// [`TORCH_OID`]; every other axis never touches it.
    pub fn new(torch_sensor: SENSOR) -> Self {
        Self { steppers: Vec::new(), torch_sensor: Some(torch_sensor) }
    }

    /// Binds the next physical axis. Oids are assigned in call order, matching the
    /// board's fixed boot-time wiring order (X, Y, torch).
    pub fn bind_stepper(&mut self, step_pin: STEP, dir_pin: DIR, min_stop_interval: u32, invert_step: bool) -> Option<u8> {
        let oid = self.steppers.len() as u8;
        self.steppers.push(Motor::new(step_pin, dir_pin, min_stop_interval, invert_step)).ok()?;
        Some(oid)
    }

    pub fn get_mut(&mut self, oid: u8) -> Option<&mut Motor<STEP, DIR, SENSOR>> {
        self.steppers.get_mut(oid as usize)
    }

    pub fn len(&self) -> usize {
        self.steppers.len()
    }

    /// The system-wide shutdown hook (§6): flushes every stepper's queue and forces
    /// it through the same `stepper_stop` path an endstop hit would take.
    pub fn stop_all(&mut self) {
        for stepper in self.steppers.iter_mut() {
            stepper.stop();
        }
    }
}

/// Applies a `TimerAction` returned by any command: latches a board-wide shutdown on
/// `Fatal` and returns the notification frame the host must see. `Reschedule`/`Stop`/
/// `None` are left to the per-oid task loop that owns that stepper's next wake time.
pub fn apply_action(shutdown: &Shutdown, action: TimerAction) -> Option<Response<'static>> {
    match action {
        TimerAction::Fatal(reason) => {
            shutdown.trigger(reason);
            Some(Response::Shutdown { reason: reason_str(reason) })
        }
        _ => None,
    }
}

/// The command surface (component E): turns one parsed `Command` into operations on
/// the bank's steppers, returning a response frame when the command expects one.
pub fn dispatch<STEP, DIR, SENSOR>(
    bank: &mut StepperBank<STEP, DIR, SENSOR>,
    shutdown: &Shutdown,
    cmd: Command,
    now: u32,
) -> Option<Response<'static>>
where
    STEP: OutputPin,
    DIR: OutputPin,
    SENSOR: ArcVoltageSensor,
{
    let response = dispatch_one(bank, shutdown, cmd, now);
    // §6's shutdown hook: a fatal response means `shutdown.trigger` just latched;
    // flush every stepper's queue and force it through `stepper_stop` right away
    // rather than leaving steppers stranded mid-ramp until the host reacts.
    if matches!(response, Some(Response::Shutdown { .. })) {
        bank.stop_all();
    }
    response
}

fn dispatch_one<STEP, DIR, SENSOR>(
    bank: &mut StepperBank<STEP, DIR, SENSOR>,
    shutdown: &Shutdown,
    cmd: Command,
    now: u32,
) -> Option<Response<'static>>
where
    STEP: OutputPin,
    DIR: OutputPin,
    SENSOR: ArcVoltageSensor,
{
    match cmd {
        Command::ConfigStepper { oid, .. } => {
            if bank.get_mut(oid).is_none() {
                shutdown.trigger(ShutdownReason::InvalidCount);
            }
            None
        }
        Command::ConfigStepperRtMode { oid, params } => {
            if oid == TORCH_OID {
                if let Some(sensor) = bank.torch_sensor.take() {
                    if let Some(stepper) = bank.get_mut(oid) {
                        stepper.config_realtime_mode(
                            sensor,
                            params.control_freq,
                            params.input_cycle,
                            Fixed16_16(params.input_factor),
                            params.max_freq,
                            params.max_acc,
                        );
                    }
                }
            }
            None
        }
        Command::QueueStep(CommandQueueStep { oid, interval_ticks, count, add }) => {
            bank.get_mut(oid).and_then(|s| apply_action(shutdown, s.queue_step(interval_ticks, count, add)))
        }
        Command::SetNextStepDir { oid, dir } => {
            if let Some(stepper) = bank.get_mut(oid) {
                stepper.set_next_step_dir(if dir != 0 { Direction::Reverse } else { Direction::Forward });
            }
            None
        }
        Command::ResetStepClock { oid, clock } => {
            bank.get_mut(oid).and_then(|s| apply_action(shutdown, s.reset_step_clock(clock)))
        }
        Command::GetStepperPosition { oid } => {
            bank.get_mut(oid).map(|s| Response::StepperPosition { oid, pos: s.get_position() })
        }
        Command::SetRealtimeMode { oid, clock, min_pos, max_pos } => {
            bank.get_mut(oid).and_then(|s| apply_action(shutdown, s.set_realtime_mode(clock, min_pos, max_pos)))
        }
        Command::SetHostMode { oid, clock } => {
            bank.get_mut(oid).and_then(|s| apply_action(shutdown, s.set_host_mode(clock, now)))
        }
        Command::StepperStop { oid } => {
            if let Some(stepper) = bank.get_mut(oid) {
                stepper.stop();
            }
            None
        }
        _ => None,
    }
}
