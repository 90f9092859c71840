//! Configuration for the schema engine and the block storage volume.
//!
//! idx loads an optional TOML file (`.idx.toml`) and falls back to the
//! documented defaults below for everything it omits, the same layering
//! the teacher's own configuration crate used for its search settings.

#![warn(missing_docs)]

mod error;

use std::{fs, path::{Path, PathBuf}};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

pub use error::ConfigError;

// =============================================================================
// Default value constants
//
// Public so the CLI can reference them in help text and so tests can
// assert against the documented defaults directly.
// =============================================================================

/// Default accuracy buckets for numeric fields (§4.3).
pub const DEFAULT_NUMERIC_ACCURACY: &[u64] = &[100, 1_000, 10_000, 100_000, 1_000_000, 100_000_000];

/// Default calendar-unit accuracy buckets for date fields.
pub const DEFAULT_DATE_ACCURACY: &[&str] = &["hour", "day", "month", "year", "decade", "century"];

/// Default accuracy buckets for time/timedelta fields.
pub const DEFAULT_TIME_ACCURACY: &[&str] = &["minute", "hour"];

/// Default HTM subdivision levels for geo fields.
pub const DEFAULT_GEO_ACCURACY: &[u8] = &[3, 5, 8, 10, 12, 15];

/// Default EWKT approximation tolerance for a geo field.
pub const DEFAULT_GEO_ERROR: f64 = 0.3;

/// Default `partials` setting for a geo field.
pub const DEFAULT_GEO_PARTIALS: bool = true;

/// Default storage block size, in bytes.
pub const DEFAULT_STORAGE_BLOCK_SIZE: u32 = 4096;

/// Minimum number of free blocks before a volume preallocates more.
pub const DEFAULT_STORAGE_BLOCKS_MIN_FREE: u32 = 8;

/// Volume growth factor applied when preallocating (§4.5).
pub const DEFAULT_STORAGE_GROWTH_FACTOR: f64 = 1.3;

/// Depth limit for namespace partial-path expansion (§4.6).
pub const LIMIT_PARTIAL_PATHS_DEPTH: u8 = 6;

/// The name of the per-project configuration file.
pub const CONFIG_FILENAME: &str = ".idx.toml";

/// Controls when a storage volume commit calls `fsync` (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Never fsync; rely on the OS page cache.
    NoSync,
    /// Schedule an fsync via the debouncer and return immediately.
    AsyncSync,
    /// Call `fsync` synchronously on commit.
    #[default]
    Sync,
    /// Call a platform full-fsync (e.g. `F_FULLFSYNC`) synchronously.
    FullSync,
}

/// Controls how a dynamic UUID path segment is indexed (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UuidStrategy {
    /// Index only the literal-UUID form of the prefix.
    Uuid,
    /// Index only the structural form (the shared `_uuid` placeholder).
    UuidField,
    /// Index both forms: the structural prefix as `prefix`, plus the
    /// literal-UUID form as `uuid_prefix`.
    #[default]
    Both,
}

/// Default detection flags applied when a field's type cannot be inferred
/// from an explicit cast (§4.1, §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionFlags {
    /// Attempt to detect `date` values from free text.
    pub date_detection: bool,
    /// Attempt to detect `datetime` values from free text.
    pub datetime_detection: bool,
    /// Attempt to detect `time` values from free text.
    pub time_detection: bool,
    /// Attempt to detect `timedelta` values from free text.
    pub timedelta_detection: bool,
    /// Attempt to detect `integer`/`positive`/`float` values from free text.
    pub numeric_detection: bool,
    /// Attempt to detect EWKT geo shapes from free text.
    pub geo_detection: bool,
    /// Attempt to detect boolean values from free text.
    pub bool_detection: bool,
    /// Treat long or whitespace-containing strings as `text` rather than `keyword`.
    pub text_detection: bool,
    /// Attempt to detect UUID values from free text.
    pub uuid_detection: bool,
}

impl Default for DetectionFlags {
    fn default() -> Self {
        Self {
            date_detection: true,
            datetime_detection: true,
            time_detection: true,
            timedelta_detection: true,
            numeric_detection: true,
            geo_detection: true,
            bool_detection: true,
            text_detection: true,
            uuid_detection: true,
        }
    }
}

/// Accuracy defaults used by the schema engine when a field does not
/// override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccuracyDefaults {
    /// Numeric bucket widths.
    pub numeric: Vec<u64>,
    /// Date calendar-unit buckets.
    pub date: Vec<String>,
    /// Time/timedelta calendar-unit buckets.
    pub time: Vec<String>,
    /// Geo HTM subdivision levels.
    pub geo: Vec<u8>,
}

impl Default for AccuracyDefaults {
    fn default() -> Self {
        Self {
            numeric: DEFAULT_NUMERIC_ACCURACY.to_vec(),
            date: DEFAULT_DATE_ACCURACY.iter().map(|s| s.to_string()).collect(),
            time: DEFAULT_TIME_ACCURACY.iter().map(|s| s.to_string()).collect(),
            geo: DEFAULT_GEO_ACCURACY.to_vec(),
        }
    }
}

/// Storage volume knobs (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Block size in bytes; must be a power of two, minimum 512.
    pub block_size: u32,
    /// Minimum number of free blocks before preallocating more.
    pub blocks_min_free: u32,
    /// Growth factor applied when preallocating.
    pub growth_factor: f64,
    /// When a volume commit calls `fsync`.
    pub sync_mode: SyncMode,
    /// Whether new records are LZ4-compressed before being written.
    pub compress: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_STORAGE_BLOCK_SIZE,
            blocks_min_free: DEFAULT_STORAGE_BLOCKS_MIN_FREE,
            growth_factor: DEFAULT_STORAGE_GROWTH_FACTOR,
            sync_mode: SyncMode::default(),
            compress: false,
        }
    }
}

/// Root configuration for the schema engine and storage volume.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default detection flags for newly discovered fields.
    pub detection: DetectionFlags,
    /// Default accuracy buckets for newly discovered fields.
    pub accuracy: AccuracyDefaults,
    /// Default `partials` setting for geo fields.
    pub geo_partials: bool,
    /// Default EWKT approximation tolerance for geo fields.
    pub geo_error: f64,
    /// Storage volume settings.
    pub storage: StorageSettings,
    /// Whether newly discovered fields are rejected (`strict`) rather
    /// than auto-typed.
    pub strict: bool,
    /// How dynamic UUID path segments are indexed.
    pub uuid_strategy: UuidStrategy,
}

impl Config {
    /// Loads configuration from a TOML file, failing if it cannot be read
    /// or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
        toml::from_str(&text)
            .map_err(|source| ConfigError::ParseToml { path: path.to_path_buf(), source })
    }

    /// Loads configuration from `path` if it exists, otherwise returns the
    /// defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() { Self::load(path) } else { Ok(Self::default()) }
    }

    /// The default root directory for storage volumes when none is
    /// configured explicitly, following platform conventions.
    pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
        BaseDirs::new()
            .map(|dirs| dirs.data_local_dir().join("idx"))
            .ok_or(ConfigError::NoDataDirectory)
    }

    /// Checks internal consistency: accuracy lists are non-empty and the
    /// storage block size is a sane power of two.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accuracy.numeric.is_empty() {
            return Err(ConfigError::EmptyAccuracy { field: "numeric" });
        }
        if self.accuracy.date.is_empty() {
            return Err(ConfigError::EmptyAccuracy { field: "date" });
        }
        if self.accuracy.geo.is_empty() {
            return Err(ConfigError::EmptyAccuracy { field: "geo" });
        }
        let size = self.storage.block_size;
        if size < 512 || !size.is_power_of_two() {
            return Err(ConfigError::InvalidBlockSize(size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn default_accuracy_matches_documented_constants() {
        let config = Config::default();
        assert_eq!(config.accuracy.numeric, DEFAULT_NUMERIC_ACCURACY);
        assert_eq!(config.accuracy.geo, DEFAULT_GEO_ACCURACY);
    }

    #[test]
    fn rejects_non_power_of_two_block_size() {
        let mut config = Config::default();
        config.storage.block_size = 4097;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBlockSize(4097))));
    }

    #[test]
    fn rejects_empty_accuracy_list() {
        let mut config = Config::default();
        config.accuracy.numeric.clear();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyAccuracy { field: "numeric" })));
    }

    #[test]
    fn loads_partial_toml_and_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "strict = true\n[storage]\nblock_size = 8192\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.strict);
        assert_eq!(config.storage.block_size, 8192);
        assert_eq!(config.accuracy.numeric, DEFAULT_NUMERIC_ACCURACY);
    }

    #[test]
    fn load_or_default_falls_back_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
