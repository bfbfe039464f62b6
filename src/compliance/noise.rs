//! Laplace mechanism for epsilon-differential privacy
//!
//! Sensitivity is fixed at 1.0, so the noise scale is `1 / epsilon`. Noise is
//! rounded to a whole number before it is added.

use crate::domain::{GuardError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

/// Query sensitivity assumed for every released value
pub const SENSITIVITY: f64 = 1.0;

/// Adds calibrated Laplace noise to numeric results
///
/// # Examples
///
/// ```
/// use clinguard::compliance::noise::PrivacyNoiseInjector;
/// use serde_json::json;
///
/// let mut injector = PrivacyNoiseInjector::with_seed(7);
/// let noised = injector.add_noise(&json!({"count": 42, "unit": "patients"}), 1.0).unwrap();
/// assert_eq!(noised["unit"], "patients");
/// assert!(noised["count"].is_i64());
/// ```
pub struct PrivacyNoiseInjector {
    rng: StdRng,
}

impl PrivacyNoiseInjector {
    /// Injector seeded from the operating system
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic injector for reproducible runs
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Adds noise to a scalar, to each element of an array, or to each
    /// numeric value of an object
    ///
    /// Integers stay integers. Strings, booleans and null pass through.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `epsilon` is not a positive finite number.
    pub fn add_noise(&mut self, value: &Value, epsilon: f64) -> Result<Value> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(GuardError::Validation(format!(
                "epsilon must be a positive number, got {epsilon}"
            )));
        }
        let scale = SENSITIVITY / epsilon;
        Ok(self.noise_value(value, scale))
    }

    fn noise_value(&mut self, value: &Value, scale: f64) -> Value {
        match value {
            Value::Number(_) => self.noise_number(value, scale),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.noise_value(item, scale))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| {
                        let noised = if item.is_number() {
                            self.noise_number(item, scale)
                        } else {
                            item.clone()
                        };
                        (key.clone(), noised)
                    })
                    .collect::<Map<_, _>>(),
            ),
            other => other.clone(),
        }
    }

    fn noise_number(&mut self, value: &Value, scale: f64) -> Value {
        let noise = self.laplace(scale).round();
        if let Some(n) = value.as_i64() {
            // Noise beyond i64 range saturates
            Value::from(n.saturating_add(noise as i64))
        } else if let Some(f) = value.as_f64() {
            Value::from(f + noise)
        } else {
            value.clone()
        }
    }

    /// One zero-mean Laplace sample with the given scale
    pub fn laplace(&mut self, scale: f64) -> f64 {
        let u = loop {
            let u: f64 = self.rng.gen::<f64>() - 0.5;
            // ln(0) at the open end of the interval
            if u > -0.5 {
                break u;
            }
        };
        -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
    }
}

impl Default for PrivacyNoiseInjector {
    fn default() -> Self {
        Self::new()
    }
}
