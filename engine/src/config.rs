use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const VALIDATION_VAR: &str = "MCVK_VALIDATION";
pub const DIAGNOSTICS_VAR: &str = "MCVK_DIAGNOSTICS";
pub const SELECTION_VAR: &str = "MCVK_SELECTION";
pub const WINDOW_SIZE_VAR: &str = "MCVK_WINDOW_SIZE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`{var}` expects a boolean, got `{value}`.")]
    InvalidBool { var: &'static str, value: String },
    #[error("`{var}` expects `running-best` or `previous-eligible`, got `{value}`.")]
    InvalidSelectionPolicy { var: &'static str, value: String },
    #[error("`{var}` expects `WIDTHxHEIGHT`, got `{value}`.")]
    InvalidWindowSize { var: &'static str, value: String },
}

/// How a newly probed, eligible adapter is ranked during selection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Compare against the best adapter seen so far.
    #[default]
    RunningBest,
    /// Compare against the eligible adapter processed just before this one.
    /// Kept for parity with older builds; it can miss the true best adapter.
    PreviousEligible,
}

impl FromStr for SelectionPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running-best" => Ok(Self::RunningBest),
            "previous-eligible" => Ok(Self::PreviousEligible),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunningBest => write!(f, "running-best"),
            Self::PreviousEligible => write!(f, "previous-eligible"),
        }
    }
}

/// Settings resolved once at process start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Enables the Khronos validation layer and the debug messenger.
    pub validation: bool,
    /// Populates adapter names and emits per-candidate diagnostics.
    pub diagnostics: bool,
    pub selection_policy: SelectionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: String::from("Minecraft"),
            width: 500,
            height: 500,
            validation: cfg!(debug_assertions),
            diagnostics: cfg!(debug_assertions),
            selection_policy: SelectionPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds a config from defaults overridden by whatever `lookup` returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(VALIDATION_VAR) {
            config.validation = parse_bool(VALIDATION_VAR, &value)?;
        }
        if let Some(value) = lookup(DIAGNOSTICS_VAR) {
            config.diagnostics = parse_bool(DIAGNOSTICS_VAR, &value)?;
        }
        if let Some(value) = lookup(SELECTION_VAR) {
            config.selection_policy = value.parse().map_err(|_| {
                ConfigError::InvalidSelectionPolicy {
                    var: SELECTION_VAR,
                    value: value.clone(),
                }
            })?;
        }
        if let Some(value) = lookup(WINDOW_SIZE_VAR) {
            let (width, height) = parse_window_size(&value).ok_or_else(|| {
                ConfigError::InvalidWindowSize {
                    var: WINDOW_SIZE_VAR,
                    value: value.clone(),
                }
            })?;
            config.width = width;
            config.height = height;
        }

        Ok(config)
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_window_size(value: &str) -> Option<(u32, u32)> {
    let (width, height) = value.trim().split_once(['x', 'X'])?;
    let width = width.trim().parse::<u32>().ok()?;
    let height = height.trim().parse::<u32>().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}
