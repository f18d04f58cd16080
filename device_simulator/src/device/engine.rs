use crate::device::store::{SimResult, VariableStore};
use crate::device::structures::{SensorRange, SimValue, SimulatedVariable, TickReport};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

/// Drives the simulated sensors: every tick it publishes a random temperature,
/// a random pressure and bumps the counter.
pub struct DeviceSimulator<S: VariableStore> {
    store: S,
    temperature: SensorRange,
    pressure: SensorRange,
    tick_interval: Duration,
    rng: StdRng,
    ticks: Arc<AtomicU64>,
}

impl<S: VariableStore> DeviceSimulator<S> {
    pub fn new(
        store: S,
        temperature: SensorRange,
        pressure: SensorRange,
        tick_interval: Duration,
    ) -> Self {
        DeviceSimulator {
            store,
            temperature,
            pressure,
            tick_interval,
            rng: StdRng::from_entropy(),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace the entropy-seeded generator with a deterministic one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Shared counter of completed ticks, readable while the loop runs.
    pub fn tick_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.ticks)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Perform a single update of all three variables.
    ///
    /// The counter is read and then written back incremented. A client write
    /// landing between the two is lost.
    pub async fn tick(&mut self) -> SimResult<TickReport> {
        let temperature = self.temperature.sample(&mut self.rng);
        self.store
            .write(SimulatedVariable::Temperature, SimValue::Float(temperature))
            .await?;

        let pressure = self.pressure.sample(&mut self.rng);
        self.store
            .write(SimulatedVariable::Pressure, SimValue::Float(pressure))
            .await?;

        let counter = match self.store.read(SimulatedVariable::Counter).await? {
            SimValue::Int(current) => current
                .checked_add(1)
                .ok_or_else(|| format!("Counter overflowed at {}", current))?,
            other => return Err(format!("Counter holds a non-integer value {:?}", other).into()),
        };
        self.store
            .write(SimulatedVariable::Counter, SimValue::Int(counter))
            .await?;

        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let report = TickReport {
            tick,
            temperature,
            pressure,
            counter,
        };
        debug!(
            "Tick {}: Temperature = {:.3}, Pressure = {:.3}, Counter = {}",
            tick, temperature, pressure, counter
        );
        Ok(report)
    }

    /// Tick at the configured interval until `shutdown` resolves or a tick fails.
    ///
    /// Shutdown is only observed between ticks. Returns the number of ticks
    /// completed by this call.
    pub async fn run_until<F>(&mut self, shutdown: F) -> SimResult<u64>
    where
        F: Future<Output = ()>,
    {
        let mut tick_interval = interval(self.tick_interval);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let started_at = self.ticks();
        info!("Device loop started ({:?} interval).", self.tick_interval);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    let completed = self.ticks() - started_at;
                    info!("Device loop stopped after {} ticks.", completed);
                    return Ok(completed);
                }
                _ = tick_interval.tick() => {
                    self.tick().await?;
                }
            }
        }
    }
}
