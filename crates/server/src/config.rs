//! Command-line and file configuration for the `exam-registry` binary.
//!
//! Values are layered, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, else `exam-registry.toml` if present)
//! 3. `EXAM_REGISTRY__*` environment variables, `__` separating nested keys
//!    (e.g. `EXAM_REGISTRY__STORAGE__PATH=/var/lib/registry.redb`)
//! 4. Command-line flags (`--data`, `--log-format`)

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use exam_registry_types::config::{SequenceConfig, StorageConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "EXAM_REGISTRY";

/// Config file looked up in the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "exam-registry";

/// Log output format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    Text,
    /// One JSON object per event.
    Json,
    /// JSON when stderr is not a terminal, text otherwise.
    #[default]
    Auto,
}

/// Registry configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Database location and cache.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Sections and their numbering.
    #[serde(default)]
    pub sequence: SequenceConfig,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from `path` (or the default file, if present) and
    /// the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = ::config::Config::builder();

        let builder = match path {
            Some(path) => builder.add_source(::config::File::from(path)),
            None => {
                builder.add_source(::config::File::with_name(DEFAULT_CONFIG_FILE).required(false))
            },
        };

        // Single underscores in field names are preserved
        // (EXAM_REGISTRY__STORAGE__CACHE_SIZE_BYTES → storage.cache_size_bytes).
        let builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().map_err(|e| ConfigError::Load(e.to_string()))?;
        settings.try_deserialize().map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(data) = &cli.data {
            self.storage.path.clone_from(data);
        }
        if let Some(log_format) = cli.log_format {
            self.log_format = log_format;
        }
        self
    }

    /// Validates every nested section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate().map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.sequence.validate().map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

/// JSON schema of [`Config`], pretty-printed.
pub fn generate_config_schema() -> String {
    let schema = schemars::schema_for!(Config);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Default configuration rendered as TOML.
pub fn generate_config_example() -> String {
    toml::to_string_pretty(&Config::default()).unwrap_or_default()
}

/// Registration-number operator tool.
#[derive(Debug, Parser)]
#[command(name = "exam-registry", version, about)]
pub struct Cli {
    /// Configuration file (TOML).
    #[arg(long, short, global = true, env = "EXAM_REGISTRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file; overrides `storage.path`.
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Log output format; overrides `log_format`.
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Create or raise every section counter from existing student records.
    Init,
    /// Raise counters to cover registration numbers already in use.
    Reconcile {
        /// Reconcile only this section.
        #[arg(long)]
        section: Option<String>,
    },
    /// Show counters, enrollment counts, and the next number per section.
    Status,
    /// Allocate one registration number without enrolling anyone.
    Allocate {
        /// Section to allocate from.
        #[arg(long)]
        section: String,
    },
    /// Enroll a student and print the assigned registration number.
    Enroll {
        /// Curriculum section.
        #[arg(long)]
        section: String,
        /// Student name.
        #[arg(long)]
        name: String,
        /// Student's home place.
        #[arg(long)]
        place: String,
        /// Enrolling institution.
        #[arg(long)]
        institution: i64,
    },
    /// Bulk-import student records from a JSON array.
    Import {
        /// JSON file with `registrationNumber`, `section`, `name`, `place`,
        /// `institutionId`, and optional `createdAt` per record.
        file: PathBuf,
    },
    /// Configuration utilities.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `config` subcommands.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Print the configuration JSON schema.
    Schema,
    /// Print an example configuration file.
    Example,
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to load configuration sources.
    Load(String),
    /// Failed to deserialize configuration.
    Parse(String),
    /// Configuration values are out of range.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "failed to load config: {msg}"),
            ConfigError::Parse(msg) => write!(f, "failed to parse config: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use exam_registry_test_utils::TestDir;
    use exam_registry_types::config::PRIMARY_SECTION;

    use super::*;

    #[test]
    fn test_load_file() {
        let dir = TestDir::new();
        let path = dir.join("registry.toml");
        std::fs::write(
            &path,
            r#"
log_format = "json"

[storage]
path = "/var/lib/exam-registry/registry.redb"

[[sequence.sections]]
name = "primary"
prefix = "P"
start = 1
end = 500
"#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/exam-registry/registry.redb"));
        assert_eq!(config.storage.cache_size_bytes, StorageConfig::default().cache_size_bytes);
        assert_eq!(config.sequence.sections.len(), 1);
        assert_eq!(config.sequence.sections[0].prefix, 'P');
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = TestDir::new();
        let err = Config::load(Some(dir.join("absent.toml").as_path())).expect_err("missing file");
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let mut config = Config::default();
        config.sequence.sections[0].start = 300_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "exam-registry",
            "--data",
            "/tmp/override.redb",
            "--log-format",
            "text",
            "status",
        ]);
        let config = Config::default().with_overrides(&cli);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/override.redb"));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_cli_parses_enroll() {
        let cli = Cli::parse_from([
            "exam-registry",
            "enroll",
            "--section",
            PRIMARY_SECTION,
            "--name",
            "Fathima",
            "--place",
            "Tirur",
            "--institution",
            "12",
        ]);
        match cli.command {
            CliCommand::Enroll { section, institution, .. } => {
                assert_eq!(section, PRIMARY_SECTION);
                assert_eq!(institution, 12);
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_schema_and_example_render() {
        let schema = generate_config_schema();
        assert!(schema.contains("\"sequence\""));
        assert!(schema.contains("\"storage\""));

        let example = generate_config_example();
        let parsed: Config = toml::from_str(&example).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
