use crate::device::structures::{SimValue, SimulatedVariable};
use async_trait::async_trait;
use dashmap::DashMap;
use std::error::Error;
use std::sync::Arc;

// Type alias for results from simulator operations
pub type SimResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Somewhere the simulated variables live.
///
/// The device loop only ever talks to this trait, so the same loop drives the
/// OPC UA address space in production and an in-memory map in tests.
#[async_trait]
pub trait VariableStore: Send + Sync {
    /// Read the current value of a variable.
    async fn read(&self, variable: SimulatedVariable) -> SimResult<SimValue>;

    /// Overwrite the value of a variable.
    async fn write(&self, variable: SimulatedVariable, value: SimValue) -> SimResult<()>;
}

#[async_trait]
impl<S: VariableStore + ?Sized> VariableStore for Arc<S> {
    async fn read(&self, variable: SimulatedVariable) -> SimResult<SimValue> {
        (**self).read(variable).await
    }

    async fn write(&self, variable: SimulatedVariable, value: SimValue) -> SimResult<()> {
        (**self).write(variable, value).await
    }
}

/// Variable store kept entirely in process memory.
#[derive(Debug, Clone, Default)] // Clone provides cheap Arc clones
pub struct MemoryStore {
    values: Arc<DashMap<SimulatedVariable, SimValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given initial values.
    pub fn with_values(values: impl IntoIterator<Item = (SimulatedVariable, SimValue)>) -> Self {
        let store = Self::new();
        for (variable, value) in values {
            store.values.insert(variable, value);
        }
        store
    }
}

#[async_trait]
impl VariableStore for MemoryStore {
    async fn read(&self, variable: SimulatedVariable) -> SimResult<SimValue> {
        self.values
            .get(&variable)
            .map(|entry| *entry.value())
            .ok_or_else(|| format!("Variable '{}' has no value", variable).into())
    }

    async fn write(&self, variable: SimulatedVariable, value: SimValue) -> SimResult<()> {
        self.values.insert(variable, value);
        Ok(())
    }
}
