//! Runtime settings: built-in defaults, then an optional `sat_prep.toml`
//! next to the working directory, then `SAT_PREP_*` environment variables
//! (nested keys use `__`, e.g. `SAT_PREP_SCRAPE__PER_PAGE=50`).

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::images::CapturePolicy;
use crate::output::DEFAULT_QUESTIONS_FILE;

const CONFIG_FILE: &str = "sat_prep";
const ENV_PREFIX: &str = "SAT_PREP";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Where the page pipeline writes its questions file and `images/`.
    pub output_dir: PathBuf,
    /// Where the bank pipeline writes subject files and the manifest.
    pub processed_dir: PathBuf,
    /// Images looked up by the bank pipeline.
    pub image_dir: PathBuf,
    pub questions_file: String,
    pub min_image_bytes: u64,
    pub render_scale: f64,
    /// `pdftoppm` binary used for full-page renders.
    pub renderer: String,
    pub scrape: ScrapeSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeSettings {
    pub base_url: String,
    pub subject: String,
    pub question_type: String,
    pub per_page: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder(true)?.build()?.try_deserialize()
    }

    fn builder(with_overrides: bool) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let builder = Config::builder()
            .set_default("output_dir", "data/questions")?
            .set_default("processed_dir", "data/processed_questions")?
            .set_default("image_dir", "data/questions/images")?
            .set_default("questions_file", DEFAULT_QUESTIONS_FILE)?
            .set_default("min_image_bytes", 1000_i64)?
            .set_default("render_scale", 2.0_f64)?
            .set_default("renderer", "pdftoppm")?
            .set_default("scrape.base_url", "https://satsuitequestionbank.collegeboard.org")?
            .set_default("scrape.subject", "math")?
            .set_default("scrape.question_type", "multiple-choice")?
            .set_default("scrape.per_page", 20_i64)?
            .set_default("scrape.min_delay_ms", 1000_i64)?
            .set_default("scrape.max_delay_ms", 3000_i64)?;

        if !with_overrides {
            return Ok(builder);
        }
        Ok(builder
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            ))
    }

    pub fn capture_policy(&self) -> CapturePolicy {
        CapturePolicy {
            min_image_bytes: self.min_image_bytes,
            render_scale: self.render_scale,
        }
    }
}
