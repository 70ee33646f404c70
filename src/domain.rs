use std::fmt;
use std::io::Error;

use calamine::XlsxError;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

/// The three categorical columns exposed for multi-select filtering.
pub const FILTER_COLUMNS: [&str; 3] = ["Gender", "Age", "Category"];

/// Column the monthly trend is derived from.
pub const DATE_COLUMN: &str = "Purchase Date";

/// Name of the CSV download written on export.
pub const EXPORT_FILE: &str = "filtered_shopping_data.csv";

/// Decorative shopping animation asset, fetched best-effort at startup.
pub const BANNER_URL: &str = "https://assets2.lottiefiles.com/packages/lf20_jcikwtux.json";

#[derive(Debug)]
pub enum TrendsError {
    IoError(Error),
    PolarsError(PolarsError),
    XlsxError(XlsxError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    MissingColumn(String),
}

impl From<Error> for TrendsError {
    fn from(err: Error) -> Self {
        TrendsError::IoError(err)
    }
}

impl From<PolarsError> for TrendsError {
    fn from(err: PolarsError) -> Self {
        TrendsError::PolarsError(err)
    }
}

impl From<XlsxError> for TrendsError {
    fn from(err: XlsxError) -> Self {
        TrendsError::XlsxError(err)
    }
}

impl fmt::Display for TrendsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendsError::IoError(e) => write!(f, "io error: {e}"),
            TrendsError::PolarsError(e) => write!(f, "dataframe error: {e}"),
            TrendsError::XlsxError(e) => write!(f, "xlsx error: {e}"),
            TrendsError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            TrendsError::FileNotFound => write!(f, "file not found"),
            TrendsError::PermissionDenied => write!(f, "permission denied"),
            TrendsError::UnknownFileType => write!(f, "unknown file type"),
            TrendsError::MissingColumn(name) => {
                write!(f, "expected column \"{name}\" is missing from the data")
            }
        }
    }
}

impl std::error::Error for TrendsError {}

#[derive(Debug, Clone)]
pub struct TrendsConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub preview_rows: usize,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        TrendsConfig {
            event_poll_time: 100,
            max_column_width: 24,
            preview_rows: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    /// Pick the column to visualize in the frequency bar chart.
    VisualizeColumn,
}

#[derive(Debug)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    ShowPreview,
    ShowFilters,
    ShowStats,
    ShowBar,
    ShowPie,
    ShowTrend,
    ToggleValue,
    ResetFilters,
    Export,
    ChooseBarColumn,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
 Shopping Trends Analyzer

 d        Data preview (filtered)
 f        Filters (space toggles a value, r resets)
 s        Summary statistics
 b        Bar chart (v picks the column)
 c        Category pie chart
 t        Monthly trend
 e        Export filtered rows as CSV
 Up/Down  Move selection, PgUp/PgDn page
 Esc      Close popup / back to preview
 q        Quit
";
