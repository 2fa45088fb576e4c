//! imgaudit - integrity tracking for scientific image files
//!
//! Thin command line front end over the verification engine. Every
//! decision about a file's state is made by the engine; this binary only
//! resolves configuration, forwards arguments and renders results.

mod cli;
mod display;
mod error;
mod events;
mod report;

use crate::cli::{Cli, Commands};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use futures::TryStreamExt;
use imgaudit_config::{normalize_extensions, Config};
use imgaudit_engine::{
    CancellationToken, EditApproval, RegistrationFailure, RegistrationSummary, VerificationEngine,
};
use imgaudit_events::{EventReceiver, FailureContext};
use imgaudit_types::{ColorChoice, HistoryOrder, OutputFormat};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::select;
use tracing::{error, info};

/// Default file name when a report directory is configured
const REPORT_FILE: &str = "integrity_report.txt";

/// Exit status when verification found tampered or unreadable files
const EXIT_ATTENTION: i32 = 2;

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    match run(cli).await {
        Ok(needs_attention) => {
            if needs_attention {
                process::exit(EXIT_ATTENTION);
            }
        }
        Err(e) => {
            error!("Application error: {}", e);
            if !json_mode {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Main application logic; returns whether any file needs attention
async fn run(cli: Cli) -> Result<bool, CliError> {
    info!("Starting imgaudit v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global);

    let format = if cli.global.json {
        OutputFormat::Json
    } else {
        config.general.default_output
    };
    let json_output = format == OutputFormat::Json;

    let mut engine = VerificationEngine::open(
        &config.db_path(),
        Duration::from_secs(config.store.busy_timeout_secs),
        config.hashing.algorithm,
    )
    .await?
    .with_follow_symlinks(config.scan.follow_symlinks);

    // Status lines would corrupt JSON output, so events stay unattached there
    let (event_sender, event_receiver) = imgaudit_events::channel();
    if !json_output {
        engine = engine.with_events(event_sender);
    } else {
        drop(event_sender);
    }

    // Ctrl-C stops batch verification at the next file boundary
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let renderer = OutputRenderer::new(format, config.general.color);
    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    } && format != OutputFormat::Plain;
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug);

    let result = execute_command_with_events(
        cli.command,
        &engine,
        &config,
        &cancel,
        event_receiver,
        &mut event_handler,
    )
    .await;
    engine.close().await;
    let output = result?;

    renderer.render(&output)?;

    match &output {
        CommandOutput::Registration(summary) if !summary.failures.is_empty() => {
            Err(CliError::Partial {
                failed: summary.failures.len(),
                total: summary.total(),
            })
        }
        CommandOutput::Verification(batch) => Ok(batch.has_failures()),
        _ => {
            info!("Command completed successfully");
            Ok(false)
        }
    }
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    engine: &VerificationEngine,
    config: &Config,
    cancel: &CancellationToken,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, engine, config, cancel));

    // Handle events concurrently with command execution
    loop {
        select! {
            // Command completed
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            // Event received
            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => {
                        // Channel closed: nothing more to show, finish the command
                        return command_future.await;
                    }
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    engine: &VerificationEngine,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Register {
            paths,
            registered_by,
        } => {
            let operator = config.operator(registered_by.as_deref())?;
            let mut summary = RegistrationSummary::default();
            for path in paths {
                match engine.register(&path, &operator).await {
                    Ok(record) => summary.registered.push(record),
                    Err(e) => summary.failures.push(RegistrationFailure {
                        failure: FailureContext::from_error(&e),
                        path,
                    }),
                }
            }
            Ok(CommandOutput::Registration(summary))
        }

        Commands::RegisterDir {
            dir,
            extensions,
            registered_by,
        } => {
            let operator = config.operator(registered_by.as_deref())?;
            let extensions = resolve_extensions(config, &extensions);
            let summary = engine
                .register_directory(&dir, &extensions, &operator)
                .await?;
            Ok(CommandOutput::Registration(summary))
        }

        Commands::Verify { paths } => {
            let batch = engine.verify_many(&paths, cancel).await;
            Ok(CommandOutput::Verification(batch))
        }

        Commands::VerifyDir { dir, extensions } => {
            let extensions = resolve_extensions(config, &extensions);
            let batch = engine.verify_directory(&dir, &extensions, cancel).await?;
            Ok(CommandOutput::Verification(batch))
        }

        Commands::Approve {
            path,
            edit_type,
            description,
            approved_by,
            software,
        } => {
            let approval = EditApproval {
                edit_type,
                description,
                approved_by: config.operator(approved_by.as_deref())?,
                software_used: software.unwrap_or_else(|| config.audit.software_used.clone()),
            };
            let edit = engine.approve_edit(&path, approval).await?;
            Ok(CommandOutput::Approved { edit })
        }

        Commands::History { path, oldest_first } => {
            let order = if oldest_first {
                HistoryOrder::Ascending
            } else {
                HistoryOrder::Descending
            };
            let edits = engine.edit_history(&path, order).await?;
            Ok(CommandOutput::History { path, edits })
        }

        Commands::Chain { path } => {
            let links = engine.verify_chain(&path).await?;
            Ok(CommandOutput::Chain { path, links })
        }

        Commands::Remove { path } => {
            let removed = engine.remove(&path).await?;
            Ok(CommandOutput::Removed(removed))
        }

        Commands::List => {
            let records = engine.all_records().try_collect().await?;
            Ok(CommandOutput::Records { records })
        }

        Commands::Report { output } => generate_report(engine, config, output).await,
    }
}

/// Build the text report and write it to a file or hand it back for stdout
async fn generate_report(
    engine: &VerificationEngine,
    config: &Config,
    output: Option<PathBuf>,
) -> Result<CommandOutput, CliError> {
    let records: Vec<_> = engine.all_records().try_collect().await?;
    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        let edits = engine
            .store()
            .edit_history(record.id, HistoryOrder::Ascending)
            .await?;
        entries.push((record, edits));
    }

    let text = report::render(&entries, chrono::Local::now());
    let destination = output.or_else(|| {
        config
            .audit
            .report_dir
            .as_ref()
            .map(|dir| dir.join(REPORT_FILE))
    });

    match destination {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, text).await?;
            info!(path = %path.display(), files = entries.len(), "report written");
            Ok(CommandOutput::Report {
                written_to: Some(path),
                text: None,
                files: entries.len(),
            })
        }
        None => Ok(CommandOutput::Report {
            written_to: None,
            text: Some(text),
            files: entries.len(),
        }),
    }
}

/// Extensions from the command line, falling back to the configured filter
fn resolve_extensions(config: &Config, cli_extensions: &[String]) -> Vec<String> {
    if cli_extensions.is_empty() {
        config.extensions()
    } else {
        normalize_extensions(cli_extensions)
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    // Check if debug logging is enabled
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let default_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(
                "info,imgaudit=debug,imgaudit_engine=debug,imgaudit_store=info",
            )
        })
    };

    if debug_enabled_flag {
        // Debug mode: structured JSON logs to file
        let log_dir = Config::default().logs_dir();
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let log_file = log_dir.join(format!(
                "imgaudit-{}.log",
                chrono::Utc::now().format("%Y%m%d-%H%M%S")
            ));

            if let Ok(file) = std::fs::File::create(&log_file) {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(default_filter())
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
        }
        if !json_mode {
            eprintln!("Warning: Failed to create log file in {}", log_dir.display());
        }
    }

    if json_mode {
        // JSON mode: suppress all console output to avoid contaminating JSON
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else if debug_enabled {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(default_filter())
            .init();
    } else {
        // Normal mode: minimal logging to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("warn")
                }),
            )
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs) {
    if let Some(color) = global.color {
        config.general.color = color;
    }

    if let Some(db) = &global.db {
        config.store.db_path = Some(db.clone());
    }
}
