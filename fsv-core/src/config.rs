//! src/config.rs
//! ============================================================================
//! # Config: Listing View Configuration Loader and Saver
//!
//! Everything the listing engine consumes from the user: hidden-file
//! predicates, sort and column specifications, cursor constraint, cleanup
//! delay and render pacing. Stored as TOML in the platform config directory
//! found with [`directories`](https://docs.rs/directories).
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! config.save().await?;
//! ```

use std::{path::PathBuf, time::Duration};

use compact_str::CompactString;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs as TokioFs;
use tracing::info;

use crate::{
    error::CoreResult,
    logging::LoggerConfig,
    model::sort::{NAME_SORT_KEY, NameOrder, SortSpec},
};

const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_secs(2);

/// Where the cursor may sit on a listing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstrainMode {
    /// Anywhere.
    Off,
    /// Not left of the name.
    Name,
    /// Not left of the first editable column.
    #[default]
    Editable,
}

/// Which entries are listed and in what order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub show_hidden: bool,

    /// Regex over entry names marking them hidden.
    pub hidden_pattern: CompactString,

    /// Names never listed, even with `show_hidden`.
    pub always_hidden: Vec<CompactString>,

    pub natural_order: bool,

    pub case_insensitive: bool,

    pub sort: Vec<SortSpec>,
}

impl ViewOptions {
    #[must_use]
    pub const fn name_order(&self) -> NameOrder {
        NameOrder {
            natural: self.natural_order,
            case_insensitive: self.case_insensitive,
        }
    }
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            show_hidden: false,
            hidden_pattern: CompactString::const_new(r"^\."),
            always_hidden: Vec::new(),
            natural_order: true,
            case_insensitive: false,
            sort: vec![SortSpec::asc("type"), SortSpec::asc(NAME_SORT_KEY)],
        }
    }
}

/// Pacing of the asynchronous render pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Minimum fetch time between two intermediate renders.
    #[serde(with = "humantime_serde")]
    pub intermediate_threshold: Duration,

    /// Pause before resuming a fetch after an intermediate render. Zero
    /// yields to the scheduler without sleeping.
    #[serde(with = "humantime_serde")]
    pub resume_delay: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            intermediate_threshold: Duration::from_millis(40),
            resume_delay: Duration::ZERO,
        }
    }
}

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub view: ViewOptions,

    /// Columns rendered between the id prefix and the name.
    pub columns: Vec<CompactString>,

    pub constrain_cursor: ConstrainMode,

    /// Settle delay before hidden views are destroyed. `None` (written
    /// `false` in TOML) disables cleanup, zero cleans up without waiting.
    #[serde(with = "cleanup_delay_serde")]
    pub cleanup_delay: Option<Duration>,

    /// Coalescing window for annotation redraws.
    #[serde(with = "humantime_serde")]
    pub annotation_cooldown: Duration,

    pub render: RenderConfig,

    pub logging: LoggerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            view: ViewOptions::default(),
            columns: vec![CompactString::const_new("permissions"), CompactString::const_new("size")],
            constrain_cursor: ConstrainMode::Editable,
            cleanup_delay: Some(DEFAULT_CLEANUP_DELAY),
            annotation_cooldown: Duration::from_millis(100),
            render: RenderConfig::default(),
            logging: LoggerConfig::default(),
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads config from the platform config dir, or returns defaults.
    ///
    /// The config is expected at `$XDG_CONFIG_HOME/fsv/config.toml`
    /// (Linux), or equivalent on Windows/macOS.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            info!("Loading config from {}", path.display());
            let text = TokioFs::read_to_string(&path).await?;
            let cfg: Self = toml::from_str(&text)?;

            Ok(cfg)
        } else {
            info!(
                "No config file found at {}, using default configuration",
                path.display()
            );

            Ok(Self::default())
        }
    }

    /// Saves config to the platform config dir.
    pub async fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()?;

        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(&path, toml_str).await?;

        Ok(())
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fsv", "fsv")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

/// `false` | `true` | `"<duration>"` for the cleanup delay.
mod cleanup_delay_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::DEFAULT_CLEANUP_DELAY;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Flag(bool),
        Delay(#[serde(with = "humantime_serde")] Duration),
    }

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(delay) => Repr::Delay(*delay).serialize(s),
            None => Repr::Flag(false).serialize(s),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(match Repr::deserialize(d)? {
            Repr::Flag(false) => None,
            Repr::Flag(true) => Some(DEFAULT_CLEANUP_DELAY),
            Repr::Delay(delay) => Some(delay),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sort::SortDirection;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config.constrain_cursor, ConstrainMode::Editable);
        assert_eq!(config.render.intermediate_threshold, Duration::from_millis(40));
        assert_eq!(config.cleanup_delay, Some(Duration::from_secs(2)));
        assert!(!config.view.show_hidden);
    }

    #[test]
    fn test_parses_user_settings() {
        let text = r#"
            columns = ["size", "mtime"]
            constrain_cursor = "name"
            cleanup_delay = "0s"
            annotation_cooldown = "250ms"

            [view]
            show_hidden = true
            sort = [{ column = "mtime", direction = "desc" }, { column = "name" }]

            [render]
            intermediate_threshold = "80ms"
        "#;

        let config = Config::from_toml_str(text).expect("parse");
        assert_eq!(config.columns, ["size", "mtime"]);
        assert_eq!(config.constrain_cursor, ConstrainMode::Name);
        assert_eq!(config.cleanup_delay, Some(Duration::ZERO));
        assert_eq!(config.annotation_cooldown, Duration::from_millis(250));
        assert!(config.view.show_hidden);
        assert_eq!(config.view.sort[0].direction, SortDirection::Desc);
        assert_eq!(config.view.sort[1].direction, SortDirection::Asc);
        assert_eq!(config.render.intermediate_threshold, Duration::from_millis(80));
    }

    #[test]
    fn test_cleanup_can_be_disabled() {
        let config = Config::from_toml_str("cleanup_delay = false").expect("parse");
        assert_eq!(config.cleanup_delay, None);

        let text = toml::to_string_pretty(&config).expect("serialize");
        let back = Config::from_toml_str(&text).expect("parse");
        assert_eq!(back.cleanup_delay, None);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).expect("serialize");
        let back = Config::from_toml_str(&text).expect("parse");
        assert_eq!(back.columns, config.columns);
        assert_eq!(back.cleanup_delay, config.cleanup_delay);
    }

    #[test]
    fn test_invalid_document_is_config_error() {
        assert!(Config::from_toml_str("constrain_cursor = 3").is_err());
    }
}
