//! Exam registry operator binary.
//!
//! # Usage
//!
//! ```bash
//! # Create counters from existing student records
//! exam-registry --data /var/lib/exam-registry/registry.redb init
//!
//! # Enroll a student
//! exam-registry enroll --section "المرحلة العالية" --name Fathima --place Tirur --institution 12
//!
//! # Environment variables override the config file; flags override both
//! EXAM_REGISTRY__STORAGE__PATH=/tmp/registry.redb exam-registry status
//! ```
//!
//! # Concurrent invocations
//!
//! The database file is locked for as long as one invocation has it open. A
//! second `exam-registry` process against the same file does not wait: it
//! exits at once with a `[1000]` store-unavailable error. Callers that run
//! invocations in parallel must retry on that error; no number is issued
//! twice either way.

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use exam_registry_allocator::EnrollmentRequest;
use exam_registry_server::bootstrap::{BootstrapError, Registry};
use exam_registry_server::commands;
use exam_registry_server::config::{
    generate_config_example, generate_config_schema, Cli, CliCommand, Config, ConfigAction,
    ConfigError, LogFormat,
};
use exam_registry_types::{InstitutionId, RegistryError, SectionKey};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Top-level error type for the binary.
#[derive(Debug)]
enum ServerError {
    Config(ConfigError),
    Bootstrap(BootstrapError),
    Command(RegistryError),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "{e}"),
            ServerError::Bootstrap(e) => write!(f, "bootstrap error: {e}"),
            ServerError::Command(e) => write!(f, "[{}] {e}", e.code()),
        }
    }
}

impl std::error::Error for ServerError {}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("error: {err}");
            if let ServerError::Command(inner) | ServerError::Bootstrap(BootstrapError::Store(inner)) =
                &err
            {
                eprintln!("hint: {}", inner.suggested_action());
            }
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<String, ServerError> {
    // Config utilities need neither a config file nor a database.
    if let CliCommand::Config { action } = &cli.command {
        return Ok(match action {
            ConfigAction::Schema => generate_config_schema(),
            ConfigAction::Example => generate_config_example(),
        });
    }

    let config =
        Config::load(cli.config.as_deref()).map_err(ServerError::Config)?.with_overrides(&cli);
    config.validate().map_err(ServerError::Config)?;

    init_logging(&config);

    let registry = Registry::open(&config).map_err(ServerError::Bootstrap)?;

    let output = match cli.command {
        CliCommand::Init => commands::init(&registry),
        CliCommand::Reconcile { section } => commands::reconcile(&registry, section.as_deref()),
        CliCommand::Status => commands::status(&registry),
        CliCommand::Allocate { section } => commands::allocate(&registry, &section),
        CliCommand::Enroll { section, name, place, institution } => commands::enroll(
            &registry,
            EnrollmentRequest {
                institution_id: InstitutionId::new(institution),
                name,
                place,
                section: SectionKey::new(section),
            },
        ),
        CliCommand::Import { file } => commands::import(&registry, &file),
        CliCommand::Config { .. } => Ok(String::new()),
    };

    output.map_err(|err| {
        tracing::error!(
            code = %err.code(),
            retryable = err.is_retryable(),
            error = %err,
            "Command failed"
        );
        ServerError::Command(err)
    })
}

/// Initializes the logging system based on configuration.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// `Auto` selects JSON when stderr is not a terminal.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match config.log_format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stderr().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
