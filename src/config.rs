//! Engine configuration loaded from TOML.
//!
//! Every field has a default, so a file only needs the values it changes:
//!
//! ```toml
//! [aligner]
//! duration_tolerance_ratio = 0.25
//! convention = "musical"
//!
//! [segments]
//! min_run_intervals = 3
//!
//! [segments.fallback]
//! epsilon = 0.02
//! ```

use crate::align::{AlignerConfig, NoteAligner};
use crate::segment::{SegmentConfig, SegmentFinder};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub aligner: AlignerConfig,
    pub segments: SegmentConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded engine config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.aligner.validate()?;
        self.segments.validate()
    }

    pub fn aligner(&self) -> NoteAligner {
        NoteAligner::new(self.aligner)
    }

    pub fn segment_finder(&self) -> SegmentFinder {
        SegmentFinder::new(self.segments)
    }
}
