//! Synthetic reading generation

use crate::models::{Device, DeviceClass, SensorReading};

use super::random::RandomSource;

/// Default probability that a reading takes the anomaly branch
pub const DEFAULT_ANOMALY_PROBABILITY: f64 = 0.05;

/// Nominal operating point of a device class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub power_kw: f64,
    pub temperature_c: f64,
    pub vibration: f64,
    pub runtime_hours: f64,
}

impl Baseline {
    pub fn for_class(class: DeviceClass) -> Self {
        let (power_kw, temperature_c, vibration, runtime_hours) = match class {
            DeviceClass::Motor => (25.0, 65.0, 2.5, 8.0),
            DeviceClass::Compressor => (45.0, 75.0, 4.0, 12.0),
            DeviceClass::Hvac => (35.0, 22.0, 1.5, 16.0),
            DeviceClass::Conveyor => (12.0, 45.0, 2.0, 10.0),
        };
        Self {
            power_kw,
            temperature_c,
            vibration,
            runtime_hours,
        }
    }
}

/// Multiplier ranges applied to a baseline
struct Factors {
    power: (f64, f64),
    temperature: (f64, f64),
    vibration: (f64, f64),
}

const NORMAL: Factors = Factors {
    power: (0.8, 1.2),
    temperature: (0.9, 1.1),
    vibration: (0.7, 1.3),
};

const ANOMALY: Factors = Factors {
    power: (1.5, 3.0),
    temperature: (1.2, 1.8),
    vibration: (2.0, 4.0),
};

const RUNTIME: (f64, f64) = (0.95, 1.05);

/// Produces one reading per call from a device's class baseline.
///
/// Draw order per reading: branch decision, power, temperature, vibration,
/// runtime. Each metric gets an independent draw.
pub struct ReadingGenerator {
    rng: Box<dyn RandomSource>,
    anomaly_probability: f64,
}

impl ReadingGenerator {
    pub fn new(rng: Box<dyn RandomSource>, anomaly_probability: f64) -> Self {
        Self {
            rng,
            anomaly_probability: anomaly_probability.clamp(0.0, 1.0),
        }
    }

    pub fn generate(&mut self, device: &Device) -> SensorReading {
        let base = Baseline::for_class(device.class);
        let factors = if self.rng.next_f64() < self.anomaly_probability {
            &ANOMALY
        } else {
            &NORMAL
        };

        let power_kw = base.power_kw * self.uniform(factors.power);
        let temperature_c = base.temperature_c * self.uniform(factors.temperature);
        let vibration = base.vibration * self.uniform(factors.vibration);
        let runtime_hours = base.runtime_hours * self.uniform(RUNTIME);

        SensorReading::new(
            device.id.clone(),
            round_to(power_kw, 2),
            round_to(temperature_c, 1),
            round_to(vibration, 2),
            round_to(runtime_hours, 1),
        )
    }

    fn uniform(&mut self, (low, high): (f64, f64)) -> f64 {
        low + (high - low) * self.rng.next_f64()
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
