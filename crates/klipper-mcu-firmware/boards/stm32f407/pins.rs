//! Pin mappings for the MKS SKIPR board, repurposed as a 2-axis-plus-torch plasma
//! cutter controller: X/Y are ordinary host-queued steppers, the torch (Z) axis is
//! the only one ever put into realtime/THC mode and so is the only one wired to the
//! ADS1015 arc-voltage ADC.
//!
//! This is a starting point and may need to be adjusted against the actual board
//! schematic.

use embassy_stm32::gpio::{AnyPin, Pin};
use embassy_stm32::peripherals::I2C1;

/// Struct to hold all the board pins.
pub struct BoardPins {
    pub led: AnyPin,
    pub stepper_x_step: AnyPin,
    pub stepper_x_dir: AnyPin,
    pub stepper_y_step: AnyPin,
    pub stepper_y_dir: AnyPin,
    pub stepper_torch_step: AnyPin,
    pub stepper_torch_dir: AnyPin,
    /// ADS1015 arc-voltage ADC bus (§6: 400kHz, address 0x48).
    pub i2c1: I2C1,
    pub i2c_scl: AnyPin,
    pub i2c_sda: AnyPin,
    pub uart_tx: AnyPin,
    pub uart_rx: AnyPin,
}

impl BoardPins {
    /// Creates a new BoardPins struct for the MKS SKIPR.
    pub fn new(p: embassy_stm32::Peripherals) -> Self {
        use embassy_stm32::gpio::Pin as _;

        // Note: These are example pins. You will need to verify them against the MKS SKIPR schematic.
        Self {
            led: p.PB1.degrade(),
            stepper_x_step: p.PE2.degrade(),
            stepper_x_dir: p.PB8.degrade(),
            stepper_y_step: p.PC5.degrade(),
            stepper_y_dir: p.PB2.degrade(),
            stepper_torch_step: p.PC6.degrade(),
            stepper_torch_dir: p.PC7.degrade(),
            i2c1: p.I2C1,
            i2c_scl: p.PB6.degrade(),
            i2c_sda: p.PB7.degrade(),
            uart_tx: p.PA9.degrade(),
            uart_rx: p.PA10.degrade(),
        }
    }
}
