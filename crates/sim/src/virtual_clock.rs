//! A recording `OutputPin` and the edge trace it produces.
//!
//! The stepper core's pulse scheduler and realtime step timer only ever see the
//! `mcu_drivers::gpio::OutputPin` trait, never a real register. For scenario tests we
//! want every transition timestamped, so this pin records `(tick, level)` pairs
//! instead of toggling hardware.

use mcu_drivers::gpio::OutputPin as CoreOutputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub tick: u32,
    pub high: bool,
}

/// Shared by a `RecordingPin` and whoever wants to inspect its trace after a run; the
/// pin itself only appends, the tick is stamped in from outside since `OutputPin` has
/// no notion of "now".
#[derive(Debug, Default, Clone)]
pub struct EdgeTrace(pub Vec<Edge>);

impl EdgeTrace {
    pub fn rising_edges(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().filter(|e| e.high).map(|e| e.tick)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A `mcu_drivers::gpio::OutputPin` that appends to a shared trace instead of driving
/// hardware. `tick` is set by the harness immediately before each callback that might
/// toggle the pin, so recorded timestamps always reflect the timer wake that produced
/// them rather than wall-clock time.
pub struct RecordingPin {
    trace: std::rc::Rc<std::cell::RefCell<EdgeTrace>>,
    tick: std::rc::Rc<std::cell::Cell<u32>>,
}

impl RecordingPin {
    pub fn new(tick: std::rc::Rc<std::cell::Cell<u32>>) -> (Self, std::rc::Rc<std::cell::RefCell<EdgeTrace>>) {
        let trace = std::rc::Rc::new(std::cell::RefCell::new(EdgeTrace::default()));
        (
            Self {
                trace: trace.clone(),
                tick,
            },
            trace,
        )
    }

    fn record(&mut self, high: bool) {
        self.trace.borrow_mut().0.push(Edge { tick: self.tick.get(), high });
    }
}

impl CoreOutputPin for RecordingPin {
    fn set_high(&mut self) {
        self.record(true);
    }

    fn set_low(&mut self) {
        self.record(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_edges_at_the_stamped_tick() {
        let tick = std::rc::Rc::new(std::cell::Cell::new(0));
        let (mut pin, trace) = RecordingPin::new(tick.clone());
        pin.set_high();
        tick.set(42);
        pin.set_low();
        let edges = trace.borrow().0.clone();
        assert_eq!(edges, vec![Edge { tick: 0, high: true }, Edge { tick: 42, high: false }]);
    }
}
