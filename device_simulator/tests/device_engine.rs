use device_simulator::device::engine::DeviceSimulator;
use device_simulator::device::store::{MemoryStore, VariableStore};
use device_simulator::device::structures::{SensorRange, SimValue, SimulatedVariable};
use tokio::time::{sleep, Duration};

fn seeded_store() -> MemoryStore {
    MemoryStore::with_values([
        (SimulatedVariable::Temperature, SimValue::Float(20.0)),
        (SimulatedVariable::Pressure, SimValue::Float(1.0)),
        (SimulatedVariable::Counter, SimValue::Int(0)),
    ])
}

fn simulator(store: MemoryStore, interval_ms: u64) -> DeviceSimulator<MemoryStore> {
    DeviceSimulator::new(
        store,
        SensorRange::temperature(),
        SensorRange::pressure(),
        Duration::from_millis(interval_ms),
    )
    .with_seed(42)
}

#[tokio::test]
async fn readings_stay_in_range() {
    let store = seeded_store();
    let mut sim = simulator(store.clone(), 1000);

    for _ in 0..500 {
        let report = sim.tick().await.unwrap();
        assert!((15.0..25.0).contains(&report.temperature));
        assert!((0.8..1.2).contains(&report.pressure));

        let temperature = store.read(SimulatedVariable::Temperature).await.unwrap();
        let pressure = store.read(SimulatedVariable::Pressure).await.unwrap();
        assert_eq!(temperature, SimValue::Float(report.temperature));
        assert_eq!(pressure, SimValue::Float(report.pressure));
    }
}

#[tokio::test]
async fn counter_increments_by_one_per_tick() {
    let store = seeded_store();
    let mut sim = simulator(store.clone(), 1000);

    assert_eq!(
        store.read(SimulatedVariable::Counter).await.unwrap(),
        SimValue::Int(0)
    );
    for n in 1..=25 {
        let report = sim.tick().await.unwrap();
        assert_eq!(report.tick, n as u64);
        assert_eq!(report.counter, n);
        assert_eq!(
            store.read(SimulatedVariable::Counter).await.unwrap(),
            SimValue::Int(n)
        );
    }
    assert_eq!(sim.ticks(), 25);
}

#[tokio::test]
async fn counter_continues_from_external_write() {
    let store = seeded_store();
    let mut sim = simulator(store.clone(), 1000);

    sim.tick().await.unwrap();
    store
        .write(SimulatedVariable::Counter, SimValue::Int(100))
        .await
        .unwrap();
    let report = sim.tick().await.unwrap();
    assert_eq!(report.counter, 101);
}

#[tokio::test]
async fn external_sensor_writes_are_overwritten() {
    let store = seeded_store();
    let mut sim = simulator(store.clone(), 1000);

    store
        .write(SimulatedVariable::Temperature, SimValue::Float(99.0))
        .await
        .unwrap();
    sim.tick().await.unwrap();
    let temperature = store.read(SimulatedVariable::Temperature).await.unwrap();
    assert!(SensorRange::temperature().contains(temperature.as_f64()));
}

#[tokio::test]
async fn counter_overflow_is_fatal() {
    let store = seeded_store();
    store
        .write(SimulatedVariable::Counter, SimValue::Int(i32::MAX))
        .await
        .unwrap();
    let mut sim = simulator(store, 1000);

    assert!(sim.tick().await.is_err());
}

#[tokio::test]
async fn non_integer_counter_is_fatal() {
    let store = seeded_store();
    store
        .write(SimulatedVariable::Counter, SimValue::Float(3.5))
        .await
        .unwrap();
    let mut sim = simulator(store, 1000);

    let err = sim.tick().await.unwrap_err();
    assert!(err.to_string().contains("non-integer"));
}

#[tokio::test]
async fn missing_variable_fails_the_tick() {
    let mut sim = simulator(MemoryStore::new(), 1000);
    assert!(sim.tick().await.is_err());
}

#[tokio::test]
async fn run_until_stops_on_shutdown() {
    let store = seeded_store();
    let mut sim = simulator(store.clone(), 20);

    let completed = sim.run_until(sleep(Duration::from_millis(110))).await.unwrap();

    // First tick fires immediately, the rest every 20ms.
    assert!(completed >= 2, "only {} ticks completed", completed);
    assert_eq!(completed, sim.ticks());
    assert_eq!(
        store.read(SimulatedVariable::Counter).await.unwrap(),
        SimValue::Int(completed as i32)
    );
}

#[tokio::test]
async fn run_until_propagates_tick_errors() {
    let mut sim = simulator(MemoryStore::new(), 10);
    let result = sim.run_until(sleep(Duration::from_secs(5))).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn tick_counter_is_shared() {
    let mut sim = simulator(seeded_store(), 1000);
    let counter = sim.tick_counter();

    sim.tick().await.unwrap();
    sim.tick().await.unwrap();
    assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), 2);
}
