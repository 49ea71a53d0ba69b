//! JSON configuration for the `grow` and `segment` tools.
//!
//! Every field is optional; missing fields take the defaults below.
//!
//! ```json
//! {
//!   "grow": { "threshold": 100.0, "seed": [173, 158] },
//!   "segment": {
//!     "lower_threshold": 102,
//!     "connectivity": "face",
//!     "filters": [
//!       { "attribute": "number_of_pixels", "count": 10 },
//!       { "attribute": "flatness", "count": 5, "reverse": true },
//!       { "attribute": "number_of_pixels", "count": 3 }
//!     ]
//!   }
//! }
//! ```

use crate::enums::{Connectivity, ShapeAttribute};
use crate::filters::KeepNObjects;
use crate::region_growing::DEFAULT_THRESHOLD;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grow: GrowConfig,
    pub segment: SegmentConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowConfig {
    /// Pixels strictly above this intensity join the region.
    pub threshold: f64,
    /// Seed `(x, y)`; a random seed is drawn when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<(u32, u32)>,
}

impl Default for GrowConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Rescaled intensities below this are discarded before labeling.
    pub lower_threshold: u8,
    pub connectivity: Connectivity,
    /// Applied in order after labeling.
    pub filters: Vec<KeepNObjects>,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            lower_threshold: 102,
            connectivity: Connectivity::Face,
            filters: vec![
                KeepNObjects {
                    attribute: ShapeAttribute::NumberOfPixels,
                    count: 10,
                    reverse: false,
                },
                KeepNObjects {
                    attribute: ShapeAttribute::Flatness,
                    count: 5,
                    reverse: true,
                },
                KeepNObjects {
                    attribute: ShapeAttribute::NumberOfPixels,
                    count: 3,
                    reverse: false,
                },
            ],
        }
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
