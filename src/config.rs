//! Session and handler configuration, loadable from TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VolumeButtonError};

/// Audio-session category applied while the handler is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCategory {
    Ambient,
    SoloAmbient,
    #[default]
    Playback,
    Record,
    PlayAndRecord,
    MultiRoute,
}

/// Category option flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionOptions {
    pub mix_with_others: bool,
    pub duck_others: bool,
    pub allow_bluetooth: bool,
    pub default_to_speaker: bool,
    pub interrupt_spoken_audio: bool,
}

impl Default for SessionOptions {
    /// Coexists with audio from other applications.
    fn default() -> Self {
        Self {
            mix_with_others: true,
            duck_others: false,
            allow_bluetooth: false,
            default_to_speaker: false,
            interrupt_spoken_audio: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub category: SessionCategory,
    pub options: SessionOptions,
}

/// Everything needed to construct and start a handler, minus the callbacks.
///
/// ```toml
/// exact_jumps_only = true
/// disable_system_volume_handler = true
///
/// [session]
/// category = "ambient"
///
/// [session.options]
/// mix_with_others = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlerConfig {
    pub session: SessionConfig,
    pub exact_jumps_only: bool,
    pub disable_system_volume_handler: bool,
}

impl HandlerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| VolumeButtonError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        toml::from_str(&source)
            .map_err(|e| VolumeButtonError::Config(format!("{}: {}", path.display(), e)))
    }
}
