//! Infallible GPIO output abstraction.
//!
//! This diverges from `embedded_hal::digital::OutputPin` (which is fallible) to match
//! the always-succeeds atomic GPIO writes the pulse scheduler and realtime step timer
//! depend on for their timing guarantees — a fallible pin on this path would force
//! every step edge to carry error-handling that can never meaningfully trigger.

/// An output pin that cannot fail to be set.
pub trait OutputPin {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// An `OutputPin` with a locally tracked logical level, so the stepper core can
/// toggle it without needing a stateful read-back from the hardware.
pub struct TrackedPin<P> {
    pin: P,
    high: bool,
}

impl<P: OutputPin> TrackedPin<P> {
    pub fn new(pin: P, initial_high: bool) -> Self {
        let mut p = Self { pin, high: !initial_high };
        p.set(initial_high);
        p
    }

    pub fn set(&mut self, high: bool) {
        if high != self.high {
            self.high = high;
            self.apply();
        }
    }

    pub fn toggle(&mut self) {
        self.high = !self.high;
        self.apply();
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    fn apply(&mut self) {
        if self.high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::OutputPin;

    #[derive(Default)]
    pub struct MockPin {
        pub high: bool,
        pub writes: u32,
    }

    impl OutputPin for MockPin {
        fn set_high(&mut self) {
            self.high = true;
            self.writes += 1;
        }
        fn set_low(&mut self) {
            self.high = false;
            self.writes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MockPin;
    use super::*;

    #[test]
    fn toggle_flips_and_writes() {
        let mut pin = TrackedPin::new(MockPin::default(), false);
        assert!(!pin.is_high());
        pin.toggle();
        assert!(pin.is_high());
        assert!(pin.pin.high);
        assert_eq!(pin.pin.writes, 1);
    }

    #[test]
    fn set_is_a_noop_when_already_at_level() {
        let mut pin = TrackedPin::new(MockPin::default(), true);
        let writes_after_init = pin.pin.writes;
        pin.set(true);
        assert_eq!(pin.pin.writes, writes_after_init);
    }
}
