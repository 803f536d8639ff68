//! Sensor abstraction for the realtime controller's torch-voltage input.

/// A sensor that can produce a signed 16-bit raw sample on demand.
///
/// Implemented for the ADS1015 I2C ADC by `driver-ads1015`; mocked directly in this
/// crate's tests so the realtime controller can be validated without hardware.
pub trait ArcVoltageSensor {
    type Error;

    fn read_raw(&mut self) -> Result<i16, Self::Error>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::ArcVoltageSensor;

    /// A sensor stub that always returns the same value, for control-loop tests.
    pub struct ConstantSensor(pub i16);

    impl ArcVoltageSensor for ConstantSensor {
        type Error = core::convert::Infallible;

        fn read_raw(&mut self) -> Result<i16, Self::Error> {
            Ok(self.0)
        }
    }
}
