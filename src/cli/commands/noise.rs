//! Noise command implementation
//!
//! Adds Laplace noise to the numeric values of a JSON document.

use super::{load_config_or_default, read_json, write_json};
use crate::compliance::PrivacyNoiseInjector;
use clap::Args;

/// Arguments for the noise command
#[derive(Args, Debug)]
pub struct NoiseArgs {
    /// JSON file holding a number, an object of counts, or an array of either
    #[arg(short, long)]
    pub input: String,

    /// Privacy budget; defaults to compliance.default_epsilon
    #[arg(short, long)]
    pub epsilon: Option<f64>,

    /// Seed the generator for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the noised document to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

impl NoiseArgs {
    /// Execute the noise command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config_or_default(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let epsilon = self.epsilon.unwrap_or(config.compliance.default_epsilon);
        let document = read_json(&self.input)?;

        let mut injector = match self.seed {
            Some(seed) => PrivacyNoiseInjector::with_seed(seed),
            None => PrivacyNoiseInjector::new(),
        };

        tracing::info!(epsilon = epsilon, seeded = self.seed.is_some(), "Adding privacy noise");
        let noised = match injector.add_noise(&document, epsilon) {
            Ok(v) => v,
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };

        write_json(&noised, self.output.as_deref())?;
        Ok(0)
    }
}
