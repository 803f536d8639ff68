#![deny(clippy::all)]
#![deny(warnings)]

//! Board-wide fatal-shutdown latch and independent watchdog.
//!
//! Mirrors the motion core's error model: `mcu_drivers::ShutdownReason` is a fatal
//! class by construction (see that crate's docs), so there is no recoverable path
//! once one is observed. Every task that drives a `Stepper` checks [`Shutdown`]
//! before touching hardware and calls [`Shutdown::trigger`] the moment a
//! `TimerAction::Fatal` comes back, no matter which oid it came from.

use core::sync::atomic::{AtomicBool, Ordering};
use mcu_drivers::ShutdownReason;

/// A globally accessible, interrupt-safe latch recording that some stepper hit a
/// fatal condition. Once set it never clears itself; only a board reset does.
pub struct Shutdown {
    active: AtomicBool,
}

impl Shutdown {
    pub const fn new() -> Self {
        Self { active: AtomicBool::new(false) }
    }

    /// Latches the shutdown. Idempotent — only the first caller's reason is logged.
    pub fn trigger(&self, reason: ShutdownReason) {
        if !self.active.swap(true, Ordering::SeqCst) {
            defmt::error!("SHUTDOWN: {}", reason);
        }
    }

    /// Must be polled by every task before it writes to a step/dir pin or the bus.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// The human-readable reason string sent to the host in `Response::Shutdown`.
pub fn reason_str(reason: ShutdownReason) -> &'static str {
    match reason {
        ShutdownReason::NoNextStep => "No next step",
        ShutdownReason::StepperTooFarInPast => "Stepper too far in past",
        ShutdownReason::InvalidCount => "Invalid count parameter",
        ShutdownReason::ResetWhileActive => "Can't reset time when stepper active",
        ShutdownReason::RealtimeModeAlreadyActive => "Realtime mode already active",
    }
}

/// Feeds the hardware independent watchdog. Kept separate from [`Shutdown`] since
/// it needs a live peripheral handle and isn't meaningful on the host.
pub struct Watchdog<'a> {
    iwdg: embassy_stm32::wdg::IndependentWatchdog<'a>,
}

impl<'a> Watchdog<'a> {
    /// Starts the watchdog. It must be fed at least as often as its configured
    /// timeout or the MCU resets.
    pub fn new(mut iwdg: embassy_stm32::wdg::IndependentWatchdog<'a>) -> Self {
        iwdg.unleash();
        Self { iwdg }
    }

    #[inline]
    pub fn feed(&mut self) {
        self.iwdg.feed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_idempotent_and_sticky() {
        let s = Shutdown::new();
        assert!(!s.is_active());
        s.trigger(ShutdownReason::InvalidCount);
        assert!(s.is_active());
        s.trigger(ShutdownReason::NoNextStep);
        assert!(s.is_active());
    }

    #[test]
    fn reason_str_covers_every_variant() {
        assert_eq!(reason_str(ShutdownReason::NoNextStep), "No next step");
        assert_eq!(reason_str(ShutdownReason::ResetWhileActive), "Can't reset time when stepper active");
    }
}
