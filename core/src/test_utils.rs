//! Shared test fixtures
//!
//! Small adapters with shared-handle state so tests can observe and
//! mutate adapter internals after handing ownership to a registry.

use std::cell::RefCell;
use std::rc::Rc;

use crate::adapter::{SamplingPolicy, TimeAware};
use crate::snapshot::{RecordDescriptor, SnapshotError, SnapshotReader, SnapshotWriter};

/// Observable internals of a [`CounterAdapter`].
#[derive(Debug, Default)]
pub struct CounterState {
    pub value: u64,
    pub rewind_starts: u32,
    pub rewind_ends: u32,
}

/// Single-u64 adapter. With `ticking` set it increments its value on
/// every `on_tick`, which makes the value track the number of simulated
/// ticks and lets rewind tests assert exact restores.
pub struct CounterAdapter {
    pub state: Rc<RefCell<CounterState>>,
    stride: u64,
    ticking: bool,
}

impl CounterAdapter {
    pub fn new() -> Self {
        Self {
            state: Rc::default(),
            stride: 1,
            ticking: false,
        }
    }

    pub fn with_stride(stride: u64) -> Self {
        Self {
            stride,
            ..Self::new()
        }
    }

    /// Counter that advances itself each tick.
    pub fn ticking() -> Self {
        Self {
            ticking: true,
            ..Self::new()
        }
    }

    pub fn handle(&self) -> Rc<RefCell<CounterState>> {
        Rc::clone(&self.state)
    }
}

impl Default for CounterAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeAware for CounterAdapter {
    fn descriptor(&self) -> RecordDescriptor {
        RecordDescriptor::new("counter", 1)
    }

    fn sampling(&self) -> SamplingPolicy {
        SamplingPolicy {
            stride: self.stride,
            ..SamplingPolicy::default()
        }
    }

    fn on_tick(&mut self, _tick: u64) {
        if self.ticking {
            self.state.borrow_mut().value += 1;
        }
    }

    fn save(&self, writer: &mut SnapshotWriter) {
        writer.write_u64(self.state.borrow().value);
    }

    fn load(&mut self, reader: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        self.state.borrow_mut().value = reader.read_u64()?;
        Ok(())
    }

    fn on_rewind_start(&mut self) {
        self.state.borrow_mut().rewind_starts += 1;
    }

    fn on_rewind_end(&mut self) {
        self.state.borrow_mut().rewind_ends += 1;
    }
}

/// Variable-length adapter: a list of stack sizes with a count prefix.
/// Exercises the variable-width snapshot paths.
pub struct StockpileAdapter {
    pub stacks: Rc<RefCell<Vec<u32>>>,
}

impl StockpileAdapter {
    pub fn new() -> Self {
        Self {
            stacks: Rc::default(),
        }
    }

    pub fn handle(&self) -> Rc<RefCell<Vec<u32>>> {
        Rc::clone(&self.stacks)
    }
}

impl Default for StockpileAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeAware for StockpileAdapter {
    fn descriptor(&self) -> RecordDescriptor {
        RecordDescriptor::new("stockpile", 1)
    }

    fn save(&self, writer: &mut SnapshotWriter) {
        let stacks = self.stacks.borrow();
        writer.write_u32(stacks.len() as u32);
        for stack in stacks.iter() {
            writer.write_u32(*stack);
        }
    }

    fn load(&mut self, reader: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        let count = reader.read_u32()?;
        let mut stacks = self.stacks.borrow_mut();
        stacks.clear();
        for _ in 0..count {
            stacks.push(reader.read_u32()?);
        }
        Ok(())
    }
}
