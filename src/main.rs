use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod banner;
mod charts;
mod controller;
mod domain;
mod filter;
mod inputter;
mod loader;
mod model;
mod stats;
mod table;
mod ui;

use controller::Controller;
use domain::{TrendsConfig, TrendsError};
use model::{Model, Status};
use ui::TrendsUI;

/// A tui based shopping trends analyzer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Spreadsheet to analyze (csv, xlsx, parquet or arrow).
    file: String,

    /// Append tracing output to this file instead of discarding it.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error processing file: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn init_tracing(log_file: &PathBuf) -> Result<(), TrendsError> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: &Args) -> Result<(), TrendsError> {
    if let Some(log_file) = &args.log_file {
        init_tracing(log_file)?;
    }

    let path = shellexpand::full(&args.file)
        .map_err(|e| TrendsError::LoadingFailed(e.to_string()))?
        .into_owned();

    let cfg = TrendsConfig::default();
    let mut model = Model::load(PathBuf::from(path), &cfg)?;
    model.fetch_banner();

    let ui = TrendsUI::new();
    let controller = Controller::new(&cfg);
    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message; a tick with no event still
        // updates the model so the banner fetch can land.
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    Ok(())
}
