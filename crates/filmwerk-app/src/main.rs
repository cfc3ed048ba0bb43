// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filmwerk: DICOM film print provider
//
// Operator CLI. Initialises logging and configuration, then inspects routes
// and film sizes or re-prints persisted jobs through the raster spooler.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use filmwerk_core::error::Result;
use filmwerk_render::paper::parse_film_size_id;

use services::app_services::AppServices;

/// filmwerk - DICOM film print provider
#[derive(Parser, Debug)]
#[command(name = "filmwerk")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the JSON server configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect the routes file
    #[command(subcommand)]
    Routes(RoutesCommands),

    /// Show how a Film Size ID maps to paper
    FilmSize {
        /// Film Size ID token, e.g. 14INX17IN
        token: String,

        /// Output device to match against
        #[arg(long)]
        printer: Option<String>,
    },

    /// Print a persisted job folder again
    Reprint {
        /// Job folder, e.g. <data>/PrintJobs/<job uid>
        job_dir: PathBuf,

        /// Output device (defaults to the first configured one)
        #[arg(long)]
        printer: Option<String>,

        /// Fill the page instead of keeping the film aspect ratio
        #[arg(long)]
        no_fit: bool,
    },
}

#[derive(Subcommand, Debug)]
enum RoutesCommands {
    /// Show the route for a caller/called pair
    Resolve {
        /// Calling AE title
        caller: String,
        /// Called AE title
        called: String,
    },

    /// List every route
    #[command(alias = "ls")]
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "filmwerk failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let services = AppServices::init(cli.config.as_deref())?;

    match cli.command {
        Commands::Routes(RoutesCommands::Resolve { caller, called }) => {
            match services.resolve(&caller, &called) {
                Some(route) => println!("{}", serde_json::to_string_pretty(&route)?),
                None => println!("no route for {caller} -> {called}"),
            }
        }
        Commands::Routes(RoutesCommands::List) => {
            let routes = services.routes();
            println!("# {}", services.routes_path().display());
            for route in &routes.routes {
                println!(
                    "{:<16} {:<16} -> {}",
                    route.caller, route.called, route.printer_name
                );
            }
        }
        Commands::FilmSize { token, printer } => {
            let Some((width, height)) = parse_film_size_id(&token) else {
                println!("{token}: not a Film Size ID");
                return Ok(());
            };
            println!("{token}: {width} x {height} (1/100 in)");
            if let Ok(printer) = services.printer_name(printer.as_deref()) {
                let paper = services.paper_for(&printer, &token)?;
                println!(
                    "{printer}: {} ({} x {})",
                    paper.name, paper.width, paper.height
                );
            }
        }
        Commands::Reprint {
            job_dir,
            printer,
            no_fit,
        } => {
            let status = services
                .reprint(&job_dir, printer.as_deref(), !no_fit, |event| {
                    println!("[{}] {}", event.status, event.info);
                })
                .await?;
            println!("{}: {status}", job_dir.display());
        }
    }
    Ok(())
}
