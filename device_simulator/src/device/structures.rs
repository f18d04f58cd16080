use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three variables exposed by the simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulatedVariable {
    Temperature,
    Pressure,
    Counter,
}

impl SimulatedVariable {
    pub const ALL: [SimulatedVariable; 3] = [
        SimulatedVariable::Temperature,
        SimulatedVariable::Pressure,
        SimulatedVariable::Counter,
    ];

    /// Browse name, display name and string identifier of the node.
    pub fn name(&self) -> &'static str {
        match self {
            SimulatedVariable::Temperature => "Temperature",
            SimulatedVariable::Pressure => "Pressure",
            SimulatedVariable::Counter => "Counter",
        }
    }
}

impl fmt::Display for SimulatedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimulatedVariable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SimulatedVariable::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown variable '{}'", s))
    }
}

/// Scalar value held by a simulated variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SimValue {
    Float(f64),
    Int(i32),
}

impl SimValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            SimValue::Float(f) => *f,
            SimValue::Int(i) => *i as f64,
        }
    }
}

/// Half-open range `[low, high)` a sensor reading is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SensorRange {
    pub low: f64,
    pub high: f64,
    /// Value the node holds before the first tick.
    pub initial: f64,
}

impl SensorRange {
    pub fn new(low: f64, high: f64, initial: f64) -> Self {
        SensorRange { low, high, initial }
    }

    pub fn temperature() -> Self {
        Self::new(15.0, 25.0, 20.0)
    }

    pub fn pressure() -> Self {
        Self::new(0.8, 1.2, 1.0)
    }

    /// Draw a uniformly distributed reading.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.low..self.high)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value < self.high
    }

    pub fn validate(&self, label: &str) -> Result<(), String> {
        if !self.low.is_finite() || !self.high.is_finite() || !self.initial.is_finite() {
            return Err(format!("{} range bounds must be finite", label));
        }
        if self.low >= self.high {
            return Err(format!(
                "{} range is empty: low {} >= high {}",
                label, self.low, self.high
            ));
        }
        Ok(())
    }
}

/// Values written during one tick of the device loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub temperature: f64,
    pub pressure: f64,
    pub counter: i32,
}
