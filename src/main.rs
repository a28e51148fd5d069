mod cli;
mod commands;
mod config;
mod engine;
mod manifest;
mod remote;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit status for defects in the declared resources
const EXIT_CONFIGURATION: u8 = 2;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub access_token: Option<String>,
}

fn main() -> ExitCode {
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

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        access_token: cli.access_token,
    };

    match run(&ctx, cli.command) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            ui::error(&format!("{err:#}"));
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(ctx: &Context, command: Command) -> Result<u8> {
    let code = match command {
        Command::Plan(args) => commands::sync::plan(ctx, &args)?,
        Command::Apply(args) => commands::sync::apply(ctx, &args)?,
        Command::Status(args) => {
            commands::status::run(ctx, &args)?;
            0
        }
        Command::Query(args) => {
            commands::query::run(ctx, &args)?;
            0
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "dbsync", &mut io::stdout());
            0
        }
    };
    Ok(u8::try_from(code).unwrap_or(1))
}

/// Configuration errors stop the process with a distinct status
fn exit_code(err: &anyhow::Error) -> u8 {
    let fatal = err.chain().any(|cause| {
        cause.downcast_ref::<reconcile::ConfigurationError>().is_some()
            || cause
                .downcast_ref::<reconcile::Error>()
                .is_some_and(reconcile::Error::is_fatal)
    });
    if fatal { EXIT_CONFIGURATION } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;
    use reconcile::ConfigurationError;

    #[test]
    fn test_exit_code_for_configuration_errors() {
        let err = anyhow::Error::new(ConfigurationError::EmptyRelationPath);
        assert_eq!(exit_code(&err), EXIT_CONFIGURATION);

        let wrapped: Result<()> = Err(reconcile::Error::from(ConfigurationError::EmptyRelationPath))
            .context("building query");
        assert_eq!(exit_code(&wrapped.unwrap_err()), EXIT_CONFIGURATION);
    }

    #[test]
    fn test_exit_code_for_other_errors() {
        let err = anyhow::anyhow!("network down");
        assert_eq!(exit_code(&err), 1);

        let err = anyhow::Error::new(reconcile::Error::MalformedRecord {
            kind: reconcile::ResourceKind::Role,
            message: "record has no name".into(),
        });
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from(["dbsync", "-vv", "apply", "roles", "--yes", "-n"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.target.target.as_deref(), Some("roles"));
                assert!(args.yes);
                assert!(args.dry_run);
            }
            _ => panic!("expected apply"),
        }
    }
}
