//! Fatal shutdown reasons and the scheduling contract the core hands back to its caller.

use core::fmt;

/// An unrecoverable condition that requires the host to reset the MCU.
///
/// These are exactly the fatal error class from the stepper core's error model: once
/// raised, the board latches into shutdown and stops accepting new moves (see
/// `shutdown` in `klipper-mcu-firmware`) until the host resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The move queue ran dry while the tail ramp was still too fast to stop safely.
    NoNextStep,
    /// A timer catch-up would require stepping more than 1ms into the past.
    StepperTooFarInPast,
    /// `queue_step` was called with `count == 0`.
    InvalidCount,
    /// `reset_step_clock` was called while the stepper still had pulses queued.
    ResetWhileActive,
    /// `set_realtime_mode` was called while realtime mode was already active.
    RealtimeModeAlreadyActive,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ShutdownReason::NoNextStep => "No next step",
            ShutdownReason::StepperTooFarInPast => "Stepper too far in past",
            ShutdownReason::InvalidCount => "Invalid count parameter",
            ShutdownReason::ResetWhileActive => "Can't reset time when stepper active",
            ShutdownReason::RealtimeModeAlreadyActive => "Realtime mode already active",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "defmt-logging")]
impl defmt::Format for ShutdownReason {
    fn format(&self, fmt: defmt::Formatter) {
        let msg = match self {
            ShutdownReason::NoNextStep => "No next step",
            ShutdownReason::StepperTooFarInPast => "Stepper too far in past",
            ShutdownReason::InvalidCount => "Invalid count parameter",
            ShutdownReason::ResetWhileActive => "Can't reset time when stepper active",
            ShutdownReason::RealtimeModeAlreadyActive => "Realtime mode already active",
        };
        defmt::write!(fmt, "{}", msg)
    }
}

/// What the caller (timer ISR or command dispatcher) should do with a stepper's timer
/// after a core method returns.
///
/// The scheduler (`add_timer`/`del_timer`/`wake_task`) is an external collaborator the
/// core never touches directly — every entry point that can affect a timer's schedule
/// returns one of these instead, and the firmware's ISR/task glue applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Nothing to schedule; the timer's existing state (if any) is unchanged.
    None,
    /// Re-arm the calling timer at this absolute MCU clock value.
    Reschedule(u32),
    /// Detach the calling timer; it will not fire again until explicitly re-armed.
    Stop,
    /// A fatal condition was hit; the whole board must shut down.
    Fatal(ShutdownReason),
}
