//! Configuration system for nightcolors.
//!
//! The configuration lives in a TOML file, by default
//! `$XDG_CONFIG_HOME/nightcolors/nightcolors.toml`, and is created with
//! commented defaults the first time the daemon starts.
//!
//! ```toml
//! #[Schedule]
//! pref_start = 480      # Minutes after midnight when the day period begins (08:00)
//! pref_end = 1200       # Minutes after midnight when the night period begins (20:00)
//!
//! #[Display device]
//! green_path = "/sys/class/misc/samoled_color/green_multiplier"
//! blue_path = "/sys/class/misc/samoled_color/blue_multiplier"
//! day_multiplier = 2000000000
//! night_multiplier = 200000000
//!
//! #[Power]
//! screen_state_path = "/sys/class/graphics/fb0/blank"
//! wake_lock_name = "nightcolors"
//! ```
//!
//! Every key is optional and falls back to the defaults in `constants`.
//! There is no ordering between `pref_start` and `pref_end`: either may be
//! the earlier one in the day.
//!
//! The daemon re-reads the file whenever it receives a reload notification,
//! and the pending-action recovery path re-reads it to recompute the current
//! period, so the file on disk is the source of truth.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::logger::Log;
use crate::time_window::{Period, minute_to_time};

/// Parsed contents of `nightcolors.toml`.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Minutes after midnight at which the day period begins.
    pub pref_start: Option<u32>,
    /// Minutes after midnight at which the night period begins.
    pub pref_end: Option<u32>,
    pub green_path: Option<PathBuf>,
    pub blue_path: Option<PathBuf>,
    pub day_multiplier: Option<u32>,
    pub night_multiplier: Option<u32>,
    /// File read to decide whether the display is on.
    pub screen_state_path: Option<PathBuf>,
    /// Name registered with the kernel wake lock interface.
    pub wake_lock_name: Option<String>,
}

impl Config {
    pub fn start_minute(&self) -> u32 {
        self.pref_start.unwrap_or(DEFAULT_PREF_START)
    }

    pub fn end_minute(&self) -> u32 {
        self.pref_end.unwrap_or(DEFAULT_PREF_END)
    }

    pub fn green_path(&self) -> PathBuf {
        self.green_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GREEN_PATH))
    }

    pub fn blue_path(&self) -> PathBuf {
        self.blue_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BLUE_PATH))
    }

    /// Multiplier written to both channels for `period`.
    pub fn multiplier_for(&self, period: Period) -> u32 {
        match period {
            Period::Day => self.day_multiplier.unwrap_or(DEFAULT_DAY_MULTIPLIER),
            Period::Night => self.night_multiplier.unwrap_or(DEFAULT_NIGHT_MULTIPLIER),
        }
    }

    pub fn screen_state_path(&self) -> PathBuf {
        self.screen_state_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCREEN_STATE_PATH))
    }

    pub fn wake_lock_name(&self) -> String {
        self.wake_lock_name
            .clone()
            .unwrap_or_else(|| DEFAULT_WAKE_LOCK_NAME.to_string())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("nightcolors").join("nightcolors.toml"))
    }

    /// Write a commented default configuration to `path`.
    pub fn create_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let config_content = ConfigBuilder::new()
            .add_section("Schedule")
            .add_setting(
                "pref_start",
                &DEFAULT_PREF_START.to_string(),
                "Minutes after midnight when the day period begins (08:00)",
            )
            .add_setting(
                "pref_end",
                &DEFAULT_PREF_END.to_string(),
                "Minutes after midnight when the night period begins (20:00)",
            )
            .add_section("Display device")
            .add_setting(
                "green_path",
                &format!("\"{}\"", DEFAULT_GREEN_PATH),
                "Green channel multiplier file",
            )
            .add_setting(
                "blue_path",
                &format!("\"{}\"", DEFAULT_BLUE_PATH),
                "Blue channel multiplier file",
            )
            .add_setting(
                "day_multiplier",
                &DEFAULT_DAY_MULTIPLIER.to_string(),
                "Value written to both channels during the day",
            )
            .add_setting(
                "night_multiplier",
                &DEFAULT_NIGHT_MULTIPLIER.to_string(),
                "Value written to both channels during the night",
            )
            .add_section("Power")
            .add_setting(
                "screen_state_path",
                &format!("\"{}\"", DEFAULT_SCREEN_STATE_PATH),
                "Colors are only written while this reads 0/on",
            )
            .add_setting(
                "wake_lock_name",
                &format!("\"{}\"", DEFAULT_WAKE_LOCK_NAME),
                "Kernel wake lock held while colors are applied",
            )
            .build();

        fs::write(path, config_content)
            .with_context(|| format!("Failed to write default config to {}", path.display()))?;

        Log::log_decorated(&format!("Created default config at {}", path.display()));
        Ok(())
    }

    /// Load the configuration from a specific file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Configuration file not found at specified path: {}",
                path.display()
            );
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        validate_config(&config)?;

        Ok(config)
    }

    /// Load the configuration from the default location, creating it first if
    /// it does not exist yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)
                .context("Failed to create default config during load")?;
        }

        Self::load_from_path(&config_path).with_context(|| {
            Log::log_pipe();
            format!(
                "Failed to load configuration from {}",
                config_path.display()
            )
        })
    }

    pub fn log_config(&self) {
        Log::log_block_start("Loaded configuration");
        Log::log_indented(&format!(
            "Day begins: {} (pref_start = {})",
            minute_to_time(self.start_minute()).format("%H:%M"),
            self.start_minute()
        ));
        Log::log_indented(&format!(
            "Night begins: {} (pref_end = {})",
            minute_to_time(self.end_minute()).format("%H:%M"),
            self.end_minute()
        ));
        Log::log_indented(&format!(
            "Multipliers: day {}, night {}",
            self.multiplier_for(Period::Day),
            self.multiplier_for(Period::Night)
        ));
        Log::log_indented(&format!("Green channel: {}", self.green_path().display()));
        Log::log_indented(&format!("Blue channel: {}", self.blue_path().display()));
        Log::log_indented(&format!(
            "Screen state: {}",
            self.screen_state_path().display()
        ));
    }
}

/// Where the pending-action recovery path gets a fresh configuration from.
pub trait ConfigSource: Send + Sync {
    fn current(&self) -> Result<Config>;
}

/// Re-reads a configuration file on every call.
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn current(&self) -> Result<Config> {
        Config::load_from_path(&self.path)
    }
}

/// A fixed in-memory configuration.
impl ConfigSource for Config {
    fn current(&self) -> Result<Config> {
        Ok(self.clone())
    }
}

/// Reject values that cannot describe a schedule or a color profile.
pub fn validate_config(config: &Config) -> Result<()> {
    for (key, value) in [("pref_start", config.pref_start), ("pref_end", config.pref_end)] {
        if let Some(minute) = value {
            if minute > MAXIMUM_MINUTE_OF_DAY {
                anyhow::bail!(
                    "{} ({}) must be a minute of the day between 0 and {}",
                    key,
                    minute,
                    MAXIMUM_MINUTE_OF_DAY
                );
            }
        }
    }

    for period in [Period::Day, Period::Night] {
        if config.multiplier_for(period) == 0 {
            anyhow::bail!("{}_multiplier must be greater than 0", period);
        }
    }

    if config.start_minute() == config.end_minute() {
        Log::log_warning(&format!(
            "pref_start and pref_end are both {}; the active period at that time is undefined",
            config.start_minute()
        ));
    }

    Ok(())
}

/// Builds the default config file with aligned trailing comments.
struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{}]", title)));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{} = {}", key, value),
            comment: format!("# {}", comment),
        });
        self
    }

    fn build(self) -> String {
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1; // one space between setting and comment

        let mut result = Vec::new();
        let mut first_section = true;

        for entry in self.entries {
            match entry {
                ConfigEntry::Section(title) => {
                    if !first_section {
                        result.push(String::new());
                    }
                    result.push(title);
                    first_section = false;
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{}{}{}", line, padding, comment));
                }
            }
        }

        result.push(String::new());
        result.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test_constants::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn create_test_config(start: Option<u32>, end: Option<u32>) -> Config {
        Config {
            pref_start: start,
            pref_end: end,
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::default();
        assert_eq!(config.start_minute(), 480);
        assert_eq!(config.end_minute(), 1200);
        assert_eq!(config.multiplier_for(Period::Day), 2_000_000_000);
        assert_eq!(config.multiplier_for(Period::Night), 200_000_000);
        assert_eq!(config.green_path(), PathBuf::from(DEFAULT_GREEN_PATH));
        assert_eq!(config.blue_path(), PathBuf::from(DEFAULT_BLUE_PATH));
        assert_eq!(config.wake_lock_name(), "nightcolors");
    }

    #[test]
    fn test_config_validation_basic() {
        let config = create_test_config(Some(TEST_STANDARD_START), Some(TEST_STANDARD_END));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_validation_minute_range() {
        assert!(validate_config(&create_test_config(Some(0), Some(1439))).is_ok());
        assert!(validate_config(&create_test_config(Some(1440), None)).is_err());
        assert!(validate_config(&create_test_config(None, Some(5000))).is_err());
    }

    #[test]
    fn test_config_validation_inverted_order_is_allowed() {
        let config = create_test_config(Some(TEST_LATE_START), Some(TEST_EARLY_END));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_validation_identical_times_warns_only() {
        let config = create_test_config(Some(600), Some(600));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_config_validation_zero_multiplier() {
        let config = Config {
            night_multiplier: Some(0),
            ..Config::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("night_multiplier"));
    }

    #[test]
    fn test_default_config_round_trips_through_loader() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nightcolors").join("nightcolors.toml");

        Config::create_default_config(&path).unwrap();
        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.pref_start, Some(DEFAULT_PREF_START));
        assert_eq!(config.pref_end, Some(DEFAULT_PREF_END));
        assert_eq!(config.green_path, Some(PathBuf::from(DEFAULT_GREEN_PATH)));
        assert_eq!(config.night_multiplier, Some(DEFAULT_NIGHT_MULTIPLIER));
        assert_eq!(
            config.screen_state_path,
            Some(PathBuf::from(DEFAULT_SCREEN_STATE_PATH))
        );
    }

    #[test]
    fn test_builder_aligns_comments() {
        let content = ConfigBuilder::new()
            .add_section("A")
            .add_setting("x", "1", "short")
            .add_setting("longer_key", "2", "long")
            .build();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "#[A]");
        assert_eq!(lines[1].find('#'), lines[2].find('#'));
    }

    #[test]
    fn test_load_from_missing_path() {
        let temp_dir = tempdir().unwrap();
        let result = Config::load_from_path(&temp_dir.path().join("absent.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nightcolors.toml");
        fs::write(&path, "pref_start = \"eight\"\n").unwrap();
        assert!(Config::load_from_path(&path).is_err());
    }

    #[test]
    fn test_file_config_source_rereads() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nightcolors.toml");
        fs::write(&path, "pref_start = 420\n").unwrap();

        let source = FileConfigSource::new(path.clone());
        assert_eq!(source.current().unwrap().start_minute(), 420);

        fs::write(&path, "pref_start = 540\n").unwrap();
        assert_eq!(source.current().unwrap().start_minute(), 540);
    }

    #[test]
    #[serial]
    fn test_config_load_default_creation() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nightcolors").join("nightcolors.toml");

        let original = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let result = Config::load();

        unsafe {
            match original {
                Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }

        assert!(result.is_ok());
        assert!(config_path.exists());
    }
}
