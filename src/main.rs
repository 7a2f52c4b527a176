mod cli;
mod commands;
mod config;
mod interrupt;
mod observer;
mod paths;
mod progress;
mod settings;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use settings::Settings;
use std::io;
use std::path::PathBuf;
use std::process;

/// Exit code for config, selection and setup errors
const EXIT_CONFIG_ERROR: i32 = 2;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub file: Option<PathBuf>,
    pub stage: Option<String>,
    pub stack: Option<String>,
    pub profile: Option<String>,
    pub region: Option<String>,
    pub settings: Settings,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            if let Some(err) = e.downcast_ref::<runbook::Error>() {
                ui::dim(err.category().advice());
            }
            EXIT_CONFIG_ERROR
        }
    };
    process::exit(code);
}

/// Run the selected command, returning the process exit code.
fn run(cli: Cli) -> Result<i32> {
    if let Command::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "stackrun", &mut io::stdout());
        return Ok(0);
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        file: cli.file,
        stage: cli.stage,
        stack: cli.stack,
        profile: cli.profile,
        region: cli.region,
        settings: Settings::load()?,
    };

    match cli.command {
        Command::Deploy(args) => commands::deploy::run(&ctx, &args),
        Command::Update(args) => commands::update::run(&ctx, &args),
        Command::Delete(args) => commands::delete::run(&ctx, &args),
        Command::Status(args) => commands::status::run(&ctx, &args),
        Command::Sync(args) => commands::sync::run(&ctx, &args),
        Command::Validate => commands::validate::run(&ctx),
        Command::Completions { .. } => Ok(0),
    }
}
