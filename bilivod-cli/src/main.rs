mod cli;
mod commands;
mod config;
mod error;
mod output;
mod serve;

use crate::{
    cli::{Args, Commands},
    commands::{CommandExecutor, SessionOverrides},
    config::AppConfig,
    error::Result,
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use std::process;
use tracing::{Level, debug, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {}", e);
        }
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = AppConfig::load(args.config.as_deref())?;
    debug!("Loaded configuration: {:?}", config);

    let overrides = SessionOverrides {
        timeout: args.timeout,
        cookies: args.cookies,
        proxy: args.proxy,
        proxy_username: args.proxy_username,
        proxy_password: args.proxy_password,
        output: args.output,
    };

    match args.command {
        Commands::Resolve {
            input,
            page,
            output_file,
        } => {
            CommandExecutor::new(config, overrides, args.quiet)?
                .resolve(&input, page, output_file.as_deref())
                .await?;
        }

        Commands::Pages { input } => {
            CommandExecutor::new(config, overrides, args.quiet)?
                .pages(&input)
                .await?;
        }

        Commands::Serve { input, page, bind } => {
            CommandExecutor::new(config, overrides, args.quiet)?
                .serve(&input, page, bind)
                .await?;
        }

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        }

        Commands::Config { show, reset } => {
            if reset {
                AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults");
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
