//! Replay settings resolved from a profile and command-line overrides.

use std::time::Duration;

use clap::ValueEnum;
use ftui_genui::{GenUiConfig, Pipeline};
use serde::Serialize;

use crate::error::{ReplayError, Result};
use crate::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Painted component tree.
    #[default]
    Text,
    /// Pass records as JSON.
    Json,
}

impl OutputFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySettings {
    /// Bytes per simulated delta.
    pub chunk_size: usize,
    /// Pause between deltas.
    pub delay: Duration,
    /// Paint width in columns.
    pub width: usize,
    pub format: OutputFormat,
    /// Print every intermediate pass, not only the final one.
    pub every_pass: bool,
    /// Fixed id epoch; `None` stamps the wall clock.
    pub epoch_ms: Option<u64>,
    pub config: GenUiConfig,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            chunk_size: 24,
            delay: Duration::ZERO,
            width: 80,
            format: OutputFormat::Text,
            every_pass: false,
            epoch_ms: None,
            config: GenUiConfig::default(),
        }
    }
}

impl ReplaySettings {
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        let mut settings = Self::default();
        settings.apply_profile(profile)?;
        Ok(settings)
    }

    /// Apply every key the profile sets; unknown keys are ignored.
    pub fn apply_profile(&mut self, profile: &Profile) -> Result<()> {
        if let Some(size) = positive_usize(profile, "CHUNK_SIZE")? {
            self.chunk_size = size;
        }
        if let Some(ms) = profile.get_parsed::<u64>("DELAY_MS", "milliseconds")? {
            self.delay = Duration::from_millis(ms);
        }
        if let Some(width) = positive_usize(profile, "WIDTH")? {
            self.width = width;
        }
        if let Some(raw) = profile.get("FORMAT") {
            self.format = OutputFormat::parse(raw).ok_or_else(|| ReplayError::InvalidProfileValue {
                key: "FORMAT".to_string(),
                value: raw.to_string(),
                expected: "text or json",
            })?;
        }
        if let Some(every) = profile.get_bool("EVERY_PASS")? {
            self.every_pass = every;
        }
        if let Some(epoch) = profile.get_parsed::<u64>("EPOCH_MS", "milliseconds")? {
            self.epoch_ms = Some(epoch);
        }

        let extract = &mut self.config.extract;
        if let Some(hints) = profile.get_list("FENCE_HINTS") {
            extract.fence_hints = hints;
        }
        if let Some(accept) = profile.get_bool("ACCEPT_UNTAGGED")? {
            extract.accept_untagged = accept;
        }

        let layout = &mut self.config.layout;
        if let Some(height) = positive_f64(profile, "MIN_NODE_HEIGHT")? {
            layout.min_node_height = height;
        }
        if let Some(scale) = positive_f64(profile, "SPAN_SCALE")? {
            layout.span_scale = scale;
        }
        if let Some(step) = positive_f64(profile, "DEPTH_STEP")? {
            layout.depth_step = step;
        }

        if let Some(palette) = profile.get_list("CHART_PALETTE") {
            self.config.chart.palette = palette;
        }
        if let Some(message) = profile.get("CHART_EMPTY_MESSAGE") {
            self.config.chart.empty_message = message.to_string();
        }
        Ok(())
    }

    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        match self.epoch_ms {
            Some(epoch) => Pipeline::with_epoch(self.config.clone(), epoch),
            None => Pipeline::new(self.config.clone()),
        }
    }
}

fn positive_usize(profile: &Profile, key: &str) -> Result<Option<usize>> {
    let value = profile.get_parsed::<usize>(key, "a positive integer")?;
    if value == Some(0) {
        return Err(ReplayError::InvalidProfileValue {
            key: key.to_string(),
            value: "0".to_string(),
            expected: "a positive integer",
        });
    }
    Ok(value)
}

fn positive_f64(profile: &Profile, key: &str) -> Result<Option<f64>> {
    let value = profile.get_parsed::<f64>(key, "a positive number")?;
    match value {
        Some(number) if !(number.is_finite() && number > 0.0) => {
            Err(ReplayError::InvalidProfileValue {
                key: key.to_string(),
                value: number.to_string(),
                expected: "a positive number",
            })
        }
        _ => Ok(value),
    }
}
