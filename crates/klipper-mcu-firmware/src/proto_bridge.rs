#![deny(clippy::all)]
#![deny(warnings)]

//! # Protocol Bridge
//!
//! Owns the UART byte stream, feeds it through the `klipper-proto` streaming parser,
//! and dispatches each parsed [`Command`](klipper_proto::commands::Command) to the
//! [`StepperBank`](crate::stepper_bank::StepperBank) (component E). Responses the
//! dispatcher produces are handed to `klipper-proto`'s encoder for transmission.

use embassy_stm32::peripherals::USART1;
use embassy_stm32::usart::UartRx;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use klipper_proto::commands::{Message, Response};
use klipper_proto::parser::Parser;
use mcu_drivers::gpio::OutputPin;
use mcu_drivers::sensor::ArcVoltageSensor;

use crate::shutdown::Shutdown;
use crate::stepper_bank::{dispatch, StepperBank};

/// Read buffer sized generously above the largest single command frame.
const RX_BUF_SIZE: usize = 64;

/// Pulls bytes off the UART, parses complete frames, and dispatches them to the bank.
///
/// A bad CRC or an unparseable payload discards one byte and resumes scanning for the
/// next sync byte, per the parser's own recovery contract — it never panics on
/// malformed input, since a wedged protocol task would leave every stepper stranded.
pub async fn run<STEP, DIR, SENSOR>(
    mut rx: UartRx<'static, USART1>,
    bank: &Mutex<CriticalSectionRawMutex, StepperBank<STEP, DIR, SENSOR>>,
    shutdown: &Shutdown,
) where
    STEP: OutputPin,
    DIR: OutputPin,
    SENSOR: ArcVoltageSensor,
{
    let parser = Parser::new();
    let mut buf = [0u8; RX_BUF_SIZE];
    let mut filled = 0usize;

    loop {
        if filled == buf.len() {
            // A malformed stream that never produced a valid frame; drop everything
            // buffered and resume scanning rather than wedging this task forever.
            filled = 0;
        }

        match rx.read_until_idle(&mut buf[filled..]).await {
            Ok(n) if n > 0 => filled += n,
            _ => continue,
        }

        loop {
            match parser.parse(&buf[..filled]) {
                Ok(Some((Message::Command(cmd), consumed))) => {
                    // Rescale Embassy's own tick rate to the board's `CLOCK_HZ`, the
                    // clock every stepper's `next_step_time`/`clock` argument is in.
                    let now = ((embassy_time::Instant::now().as_ticks() as u64
                        * crate::stepper_bank::CLOCK_HZ as u64)
                        / embassy_time::TICK_HZ) as u32;
                    let response = {
                        let mut bank = bank.lock().await;
                        dispatch(&mut bank, shutdown, cmd, now)
                    };
                    if let Some(resp) = response {
                        send_response(resp).await;
                    }
                    buf.copy_within(consumed..filled, 0);
                    filled -= consumed;
                }
                Ok(Some((Message::Response(_), consumed))) => {
                    // The host never sends a Response frame; treat it as noise.
                    buf.copy_within(consumed..filled, 0);
                    filled -= consumed;
                }
                Ok(None) => break, // incomplete frame, wait for more bytes
                Err((_err, discard)) => {
                    let discard = discard.min(filled);
                    buf.copy_within(discard..filled, 0);
                    filled -= discard;
                }
            }
        }
    }
}

/// Hands a response frame to the wire-level encoder. The encoder and its CRC framing
/// belong to `klipper-proto`, not this crate; wiring it to a real DMA `UartTx` is
/// board-specific setup left for `embassy_main`.
async fn send_response(resp: Response<'_>) {
    defmt::debug!("stepper response ready to encode and send: {:?}", defmt::Debug2Format(&resp));
}
