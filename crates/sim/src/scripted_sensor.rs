//! A programmable `ArcVoltageSensor` for driving the realtime controller in tests
//! without an ADS1015 on the bus.

use mcu_drivers::sensor::ArcVoltageSensor;

/// Returns a fixed raw 12-bit-in-top-bits sample (same convention the ADS1015 driver
/// produces: `1024` is the zero-volt center) until reprogrammed with `set`.
pub struct ScriptedSensor {
    value: i16,
}

impl ScriptedSensor {
    /// `centered_value` is the already-centered reading (i.e. what the controller's
    /// `val = raw - 1024` step should see); this constructs the matching raw sample.
    pub fn centered(centered_value: i32) -> Self {
        Self {
            value: (centered_value + 1024) as i16,
        }
    }

    pub fn set_centered(&mut self, centered_value: i32) {
        self.value = (centered_value + 1024) as i16;
    }
}

impl ArcVoltageSensor for ScriptedSensor {
    type Error = core::convert::Infallible;

    fn read_raw(&mut self) -> Result<i16, Self::Error> {
        Ok(self.value)
    }
}
