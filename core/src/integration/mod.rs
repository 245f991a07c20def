//! Integration tests for the time engine
//!
//! Tests full record/rewind/catch-up cycles, command arbitration through
//! the engine, timescale resolution, and bubble gating.

#[cfg(test)]
mod schedule_tests;

#[cfg(test)]
pub(crate) mod test_utils {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::config::TimeConfig;
    use crate::engine::TimeEngine;
    use crate::test_utils::{CounterAdapter, CounterState};

    /// Engine with a self-ticking counter adapter recorded for `ticks`
    /// ticks, so the counter value always equals the simulated tick.
    pub fn recorded_engine(ticks: u64) -> (TimeEngine, Rc<RefCell<CounterState>>) {
        let mut engine = TimeEngine::new(TimeConfig::default()).unwrap();
        let counter = CounterAdapter::ticking();
        let state = counter.handle();
        engine.register_adapter(Box::new(counter));
        advance(&mut engine, ticks);
        (engine, state)
    }

    pub fn advance(engine: &mut TimeEngine, ticks: u64) {
        for _ in 0..ticks {
            engine.advance_tick().unwrap();
        }
    }
}
