/// Validator configuration.
///
/// Precedence, lowest first: defaults, a JSON config file, the
/// `TR_continueAfterValidationError`/`TR_traceLiveNodesDuringValidation`
/// environment variables, then whatever the caller (the CLI) sets last.
/// The environment is read once, when the config is resolved.

use crate::error::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONTINUE_AFTER_ERROR_ENV: &str = "TR_continueAfterValidationError";
pub const TRACE_LIVE_NODES_ENV: &str = "TR_traceLiveNodesDuringValidation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerWidth {
    #[serde(rename = "32")]
    Bits32,
    #[serde(rename = "64")]
    Bits64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub pointer_width: PointerWidth,
}

impl Target {
    pub const BITS_32: Target = Target { pointer_width: PointerWidth::Bits32 };
    pub const BITS_64: Target = Target { pointer_width: PointerWidth::Bits64 };

    pub fn host() -> Target {
        if cfg!(target_pointer_width = "32") {
            Target::BITS_32
        } else {
            Target::BITS_64
        }
    }

    pub fn is_32bit(self) -> bool {
        self.pointer_width == PointerWidth::Bits32
    }

    pub fn pointer_bytes(self) -> u32 {
        match self.pointer_width {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Target::host()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Report strict failures but keep validating. Soundness still aborts.
    pub continue_after_error: bool,
    /// Trace the live-node set at `trace` level during liveness checking.
    pub trace_live_nodes: bool,
    pub echo_to_stderr: bool,
    /// Diagnostics are mirrored (appended) here when set.
    pub log_file: Option<PathBuf>,
    pub target: Target,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            continue_after_error: false,
            trace_live_nodes: false,
            echo_to_stderr: true,
            log_file: None,
            target: Target::host(),
        }
    }
}

impl ValidatorConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// `<platform config dir>/config.json`, e.g. `~/.config/ilvalidate/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "jitval", "ilvalidate").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load `path`, else the default config file if one exists, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => match Self::default_path() {
                Some(default) if default.is_file() => {
                    log::debug!("loading config from {}", default.display());
                    Self::load(&default)?
                }
                _ => Self::default(),
            },
        };
        Ok(config.with_env(|name| std::env::var_os(name).is_some()))
    }

    /// Switch on whichever overrides `is_set` reports present.
    pub fn with_env(mut self, is_set: impl Fn(&str) -> bool) -> Self {
        if is_set(CONTINUE_AFTER_ERROR_ENV) {
            self.continue_after_error = true;
        }
        if is_set(TRACE_LIVE_NODES_ENV) {
            self.trace_live_nodes = true;
        }
        self
    }
}
