use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::sorter::ColumnKinds;

pub const HELP_TEXT: &str = "\
songtv - song table viewer

  q            quit
  Up/Down j/k  move row selection
  PgUp/PgDn    move one page
  Home/End     first / last row
  Left/Right   move header selection
  s            sort by selected header (again to flip)
  1-9          sort by header n
  /            type into the search box (Enter keep, Esc clear)
  c            open category statistics
  Enter        show songs of selected category value
  Esc          back / close
  ?            this help
";

// Custom error type used through out the loading and setup code.
#[derive(Debug)]
pub enum SongError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    MissingColumn(String),
    InvalidValue(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for SongError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongError::IoError(e) => write!(f, "IO error: {e}"),
            SongError::PolarsError(e) => write!(f, "Polars error: {e}"),
            SongError::LoadingFailed(msg) => write!(f, "{msg}"),
            SongError::MissingColumn(name) => write!(f, "Missing column {name:?}"),
            SongError::InvalidValue(msg) => write!(f, "Invalid value: {msg}"),
            SongError::FileNotFound => write!(f, "File not found"),
            SongError::PermissionDenied => write!(f, "Permission denied"),
            SongError::UnknownFileType => write!(f, "Unknown file type"),
        }
    }
}

impl From<Error> for SongError {
    fn from(err: Error) -> Self {
        SongError::IoError(err)
    }
}

impl From<PolarsError> for SongError {
    fn from(err: PolarsError) -> Self {
        SongError::PolarsError(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
    Category,
}

#[derive(Debug, Clone)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveLeft,
    MoveRight,
    Sort,
    SortColumn(usize),
    Search,
    Category,
    Enter,
    Exit,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

#[derive(Debug, Clone, Setters)]
pub struct Config {
    pub event_poll_time: u64,
    pub column_kinds: ColumnKinds,
    pub start_category: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            event_poll_time: 100,
            column_kinds: ColumnKinds::default(),
            start_category: None,
        }
    }
}
