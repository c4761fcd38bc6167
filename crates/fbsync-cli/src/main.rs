mod commands;
mod error;
mod notify;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

use crate::commands::{
    backup, completions, convert, download, fax, quickdials, restore, run, save, upload, Context,
};
use crate::error::{exit_code_for, report_error};
use fbsync_config as config;

#[derive(Debug, Parser)]
#[command(
    name = "fbsync",
    version,
    about = "Sync CardDAV contacts into a FRITZ!Box phonebook"
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download, convert and upload in one pass
    Run(run::RunArgs),
    Download(download::DownloadArgs),
    Convert(convert::ConvertArgs),
    Upload(upload::UploadArgs),
    /// Back up quick-dial, vanity and internal numbers from the device
    Backup(backup::BackupArgs),
    Restore(restore::RestoreArgs),
    /// Export the device phonebook as vCards
    Save(save::SaveArgs),
    Fax(fax::FaxArgs),
    Quickdials(quickdials::QuickdialArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(verbose);
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, verbose);
            exit_code_for(&err)
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let Cli {
        config: config_path,
        json,
        verbose,
        command,
    } = cli;

    if let Command::Completions(args) = command {
        return completions::emit(args);
    }

    let app_config = config::load(config_path.clone()).with_context(|| "load config")?;
    if verbose {
        match config::resolve_config_path(config_path) {
            Ok(path) if path.exists() => debug!(path = %path.display(), "config resolved"),
            Ok(path) => debug!(path = %path.display(), "config missing, using defaults"),
            Err(err) => debug!(error = %err, "config unavailable"),
        }
    }

    let ctx = Context {
        json,
        config: &app_config,
    };

    match command {
        Command::Run(args) => run::run(&ctx, args),
        Command::Download(args) => download::download(&ctx, args),
        Command::Convert(args) => convert::convert(&ctx, args),
        Command::Upload(args) => upload::upload(&ctx, args),
        Command::Backup(args) => backup::backup(&ctx, args),
        Command::Restore(args) => restore::restore(&ctx, args),
        Command::Save(args) => save::save(&ctx, args),
        Command::Fax(args) => fax::fax(&ctx, args),
        Command::Quickdials(args) => quickdials::quickdials(&ctx, args),
        Command::Completions(_) => unreachable!("completions handled before config load"),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
