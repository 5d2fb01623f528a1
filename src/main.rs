use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};

mod catalog;
mod controller;
mod document;
mod domain;
mod inputter;
mod logging;
mod model;
mod search;
mod sorter;
mod striper;
mod table;
mod ui;

use catalog::Catalog;
use controller::Controller;
use domain::{Config, SongError};
use model::{Model, Status};
use sorter::{ColumnKind, ColumnKinds};
use ui::TableUI;

/// A tui song table viewer with live search and column sorting.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Songs file to open (csv, parquet or arrow)
    path: String,

    /// Columns compared as numbers when sorting
    #[arg(
        long = "numeric",
        value_name = "COLUMN",
        default_values_t = ["Year Released".to_string(), "BPM".to_string(), "Count".to_string()]
    )]
    numeric_columns: Vec<String>,

    /// Columns holding minutes:seconds durations
    #[arg(long = "duration", value_name = "COLUMN", default_values_t = ["Duration".to_string()])]
    duration_columns: Vec<String>,

    /// Open the statistics of this category right away
    #[arg(long)]
    category: Option<String>,

    /// Event poll time in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Where the log is written to
    #[arg(long, default_value = "songtv.log")]
    log_file: String,
}

impl Args {
    fn column_kinds(&self) -> ColumnKinds {
        let kinds = self
            .numeric_columns
            .iter()
            .fold(ColumnKinds::empty(), |kinds, c| kinds.with(c, ColumnKind::Numeric));
        self.duration_columns
            .iter()
            .fold(kinds, |kinds, c| kinds.with(c, ColumnKind::Duration))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand(path: &str) -> Result<PathBuf, SongError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| SongError::LoadingFailed(format!("Can not expand {path:?}: {e}")))
}

fn run(args: Args) -> Result<(), SongError> {
    logging::init_logging(&expand(&args.log_file)?)?;
    info!("Starting songtv with {:?}", args);

    let cfg = Config::default()
        .event_poll_time(args.poll_ms)
        .column_kinds(args.column_kinds())
        .start_category(args.category.clone());

    let catalog = Catalog::load(expand(&args.path)?)?;

    let mut terminal = ratatui::init();
    let result = run_ui(&mut terminal, &cfg, catalog);
    // Only a terminal that went through init is restored
    ratatui::restore();
    result
}

fn run_ui(terminal: &mut DefaultTerminal, cfg: &Config, catalog: Catalog) -> Result<(), SongError> {
    let size = terminal.size()?;
    let mut model = Model::init(cfg, catalog, size.height as usize)?;
    let mut ui = TableUI::new(cfg);
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(Some(message))?;
        };
    }

    info!("Quitting songtv");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_return_before_the_terminal_is_touched() {
        let log_file = std::env::temp_dir().join("songtv-test.log");
        let args = Args::parse_from([
            "songtv",
            "does/not/exist.csv",
            "--log-file",
            &*log_file.to_string_lossy(),
        ]);
        assert!(matches!(run(args), Err(SongError::FileNotFound)));
    }

    #[test]
    fn column_kinds_from_arguments() {
        let args = Args::parse_from(["songtv", "songs.csv", "--numeric", "Plays"]);
        let kinds = args.column_kinds();
        assert_eq!(kinds.kind_of("Plays"), ColumnKind::Numeric);
        assert_eq!(kinds.kind_of("BPM"), ColumnKind::Text);
        assert_eq!(kinds.kind_of("Duration"), ColumnKind::Duration);
    }
}
