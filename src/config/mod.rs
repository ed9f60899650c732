use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::{
    core::utils::{config_file_in, ensure_dir, history_file_in, store_file_in},
    domain::{Amount, StatsPeriod},
};

const TMP_SUFFIX: &str = "tmp";

/// Largest accepted `minor_unit_digits`; keeps the scale factor well inside `i64`.
pub const MAX_MINOR_UNIT_DIGITS: u32 = 9;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serde(String),

    #[error("minor_unit_digits must be at most {max}, got {found}")]
    MinorUnitDigits { found: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub currency_symbol: String,
    /// Digits after the decimal point in the minor-unit amounts.
    pub minor_unit_digits: u32,
    pub default_period: StatsPeriod,
    /// Installs the default category hierarchy into an empty store.
    pub seed_defaults: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency_symbol: "$".into(),
            minor_unit_digits: 2,
            default_period: StatsPeriod::Monthly,
            seed_defaults: true,
            store_file: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minor_unit_digits > MAX_MINOR_UNIT_DIGITS {
            return Err(ConfigError::MinorUnitDigits {
                found: self.minor_unit_digits,
                max: MAX_MINOR_UNIT_DIGITS,
            });
        }
        Ok(())
    }

    /// Renders minor units as a signed decimal amount, e.g. `-$12.05`.
    /// A digit count whose scale overflows prints the raw minor units.
    pub fn format_amount(&self, amount: Amount) -> String {
        let sign = if amount < 0 { "-" } else { "" };
        let magnitude = amount.unsigned_abs();
        let scale = match 10u64.checked_pow(self.minor_unit_digits) {
            Some(scale) if self.minor_unit_digits > 0 => scale,
            _ => return format!("{sign}{}{magnitude}", self.currency_symbol),
        };
        format!(
            "{sign}{}{}.{:0width$}",
            self.currency_symbol,
            magnitude / scale,
            magnitude % scale,
            width = self.minor_unit_digits as usize
        )
    }
}

/// Loads and saves [`Config`] under the application data directory.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        ensure_dir(&base)?;
        let path = config_file_in(&base);
        Ok(Self { base, path })
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config =
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Store file configured by the user, or the default under the base dir.
    pub fn store_path(&self, config: &Config) -> PathBuf {
        config
            .store_file
            .clone()
            .unwrap_or_else(|| store_file_in(&self.base))
    }

    pub fn history_path(&self) -> PathBuf {
        history_file_in(&self.base)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
