use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Instant;

use polars::prelude::*;
use ratatui::crossterm::event::KeyEvent;
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::banner::{Banner, BannerError, fetch_in_background};
use crate::charts::{ChartSpec, category_pie, frequency_bar, monthly_trend};
use crate::domain::{
    CMDMode, DATE_COLUMN, EXPORT_FILE, HELP_TEXT, Message, TrendsConfig, TrendsError,
};
use crate::filter::Selections;
use crate::inputter::{InputResult, Inputter};
use crate::loader::{FileInfo, load_table};
use crate::stats::{ColumnStats, describe, export_csv};
use crate::table::{string_values, text_columns};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    PREVIEW,
    FILTERS,
    STATS,
    BAR,
    PIE,
    TREND,
    POPUP,
    CMDINPUT,
}

/// Pre-rendered column of the preview table.
#[derive(Clone)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

/// One toggleable row of the filter panel.
#[derive(Debug, Clone)]
pub struct FilterEntry {
    pub column_idx: usize,
    pub value: String,
}

const PAGE_SIZE: usize = 10;

pub struct Model {
    config: TrendsConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,

    file_info: FileInfo,
    df: DataFrame,
    selections: Selections,
    filtered: DataFrame,

    preview: Vec<ColumnView>,
    preview_offset: usize,

    filter_entries: Vec<FilterEntry>,
    filter_cursor: usize,

    stats: Vec<ColumnStats>,
    bar_column: Option<String>,
    bar: Option<ChartSpec>,
    pie: Option<ChartSpec>,
    trend: Option<ChartSpec>,
    trend_note: Option<String>,

    banner_rx: Option<Receiver<Result<Banner, BannerError>>>,
    banner: Option<Banner>,
    banner_warning: Option<String>,

    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,

    popup_message: String,
    show_popup: bool,
    status_message: String,
}

impl Model {
    /// Load a spreadsheet and run the whole pipeline once: selections,
    /// statistics, trend, and the filtered views. Any load or schema
    /// failure propagates to the caller as one error.
    pub fn load(path: PathBuf, config: &TrendsConfig) -> Result<Self, TrendsError> {
        let (file_info, df) = load_table(path)?;
        let selections = Selections::from_table(&df)?;

        // The trend reads the unfiltered table and is independent of the
        // filter selections, so one computation at load time is enough.
        let trend = monthly_trend(&df)?;
        let trend_note = trend
            .is_none()
            .then(|| format!("'{DATE_COLUMN}' column not found for trend analysis."));
        let stats = describe(&df)?;
        let bar_column = text_columns(&df).into_iter().next();

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::PREVIEW,
            previous_modus: Modus::PREVIEW,
            file_info,
            filtered: df.clone(),
            df,
            selections,
            preview: Vec::new(),
            preview_offset: 0,
            filter_entries: Vec::new(),
            filter_cursor: 0,
            stats,
            bar_column,
            bar: None,
            pie: None,
            trend,
            trend_note,
            banner_rx: None,
            banner: None,
            banner_warning: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            popup_message: String::new(),
            show_popup: false,
            status_message: String::new(),
        };
        model.rebuild_filter_entries();
        model.recompute()?;
        model.set_status_message(format!("Loaded {:?}", model.file_info.path));
        Ok(model)
    }

    /// Start the cosmetic banner fetch. Separate from `load` so the data
    /// pipeline stays network-free.
    pub fn fetch_banner(&mut self) {
        self.banner_rx = Some(fetch_in_background());
    }

    // Re-run filter -> preview/bar/pie from the full table. Called after
    // every selection change.
    fn recompute(&mut self) -> Result<(), TrendsError> {
        let start_time = Instant::now();
        self.filtered = self.selections.apply(&self.df)?;
        self.preview = self.build_preview()?;
        self.preview_offset = 0;

        self.bar = match &self.bar_column {
            Some(column) => Some(frequency_bar(&self.filtered, column)?),
            None => None,
        };
        self.pie = category_pie(&self.filtered)?;

        debug!(
            "Recomputed pipeline in {}ms: {} of {} records",
            start_time.elapsed().as_millis(),
            self.filtered.height(),
            self.df.height()
        );
        Ok(())
    }

    // Stringify the filtered table for rendering, one rayon task per
    // column, capped at the configured preview length.
    fn build_preview(&self) -> Result<Vec<ColumnView>, TrendsError> {
        let df = &self.filtered;
        let nrows = df.height().min(self.config.preview_rows);
        let max_width = self.config.max_column_width;

        let names: Vec<String> = df.get_column_names_str().iter().map(|s| s.to_string()).collect();
        names
            .par_iter()
            .map(|name| {
                let data: Vec<String> = string_values(df, name)?
                    .into_iter()
                    .take(nrows)
                    .map(|s| s.replace("\r\n", " ↵ ").replace("\n", " ↵ "))
                    .collect();
                let width = data
                    .iter()
                    .map(|s| s.chars().count())
                    .chain([name.chars().count()])
                    .max()
                    .unwrap_or(0)
                    .min(max_width);
                Ok(ColumnView {
                    name: name.clone(),
                    width,
                    data,
                })
            })
            .collect()
    }

    fn rebuild_filter_entries(&mut self) {
        self.filter_entries = self
            .selections
            .columns
            .iter()
            .enumerate()
            .flat_map(|(column_idx, selection)| {
                selection.values.iter().map(move |value| FilterEntry {
                    column_idx,
                    value: value.clone(),
                })
            })
            .collect();
        self.filter_cursor = 0;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    /// One step of the update loop. `None` messages still poll the
    /// banner channel so the header updates when the fetch lands.
    pub fn update(&mut self, message: Option<Message>) -> Result<(), TrendsError> {
        self.poll_banner();

        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);

        // Keys that behave the same in every data view.
        if !matches!(self.modus, Modus::POPUP | Modus::CMDINPUT) {
            match msg {
                Message::Quit => {
                    self.quit();
                    return Ok(());
                }
                Message::ShowPreview => return self.switch_to(Modus::PREVIEW),
                Message::ShowFilters => return self.switch_to(Modus::FILTERS),
                Message::ShowStats => return self.switch_to(Modus::STATS),
                Message::ShowBar => return self.switch_to(Modus::BAR),
                Message::ShowPie => return self.switch_to(Modus::PIE),
                Message::ShowTrend => return self.switch_to(Modus::TREND),
                Message::Export => {
                    self.export();
                    return Ok(());
                }
                Message::ChooseBarColumn => {
                    self.enter_cmd_mode(CMDMode::VisualizeColumn);
                    return Ok(());
                }
                Message::Help => {
                    self.show_help();
                    return Ok(());
                }
                _ => {}
            }
        }

        match self.modus {
            Modus::PREVIEW => match msg {
                Message::MoveUp => self.scroll_preview(-1),
                Message::MoveDown => self.scroll_preview(1),
                Message::MovePageUp => self.scroll_preview(-(PAGE_SIZE as i64)),
                Message::MovePageDown => self.scroll_preview(PAGE_SIZE as i64),
                Message::MoveBeginning => self.preview_offset = 0,
                Message::MoveEnd => {
                    self.preview_offset = self.preview_len().saturating_sub(1);
                }
                _ => (),
            },
            Modus::FILTERS => match msg {
                Message::MoveUp => self.move_filter_cursor(-1),
                Message::MoveDown => self.move_filter_cursor(1),
                Message::MovePageUp => self.move_filter_cursor(-(PAGE_SIZE as i64)),
                Message::MovePageDown => self.move_filter_cursor(PAGE_SIZE as i64),
                Message::ToggleValue => self.toggle_filter_value()?,
                Message::ResetFilters => {
                    self.selections.reset();
                    self.recompute()?;
                    self.set_status_message("Filters reset");
                }
                Message::Exit => self.modus = Modus::PREVIEW,
                _ => (),
            },
            Modus::STATS | Modus::BAR | Modus::PIE | Modus::TREND => {
                if let Message::Exit = msg {
                    self.modus = Modus::PREVIEW;
                }
            }
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => {
                    self.show_popup = false;
                    self.modus = self.previous_modus;
                }
                _ => (),
            },
            Modus::CMDINPUT => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)?;
                }
            }
        }
        Ok(())
    }

    fn switch_to(&mut self, modus: Modus) -> Result<(), TrendsError> {
        self.modus = modus;
        Ok(())
    }

    fn scroll_preview(&mut self, step: i64) {
        let len = self.preview_len();
        if len == 0 {
            return;
        }
        let offset = self.preview_offset as i64 + step;
        self.preview_offset = offset.clamp(0, len as i64 - 1) as usize;
    }

    fn preview_len(&self) -> usize {
        self.preview.first().map(|c| c.data.len()).unwrap_or(0)
    }

    fn move_filter_cursor(&mut self, step: i64) {
        if self.filter_entries.is_empty() {
            return;
        }
        let cursor = self.filter_cursor as i64 + step;
        self.filter_cursor = cursor.clamp(0, self.filter_entries.len() as i64 - 1) as usize;
    }

    fn toggle_filter_value(&mut self) -> Result<(), TrendsError> {
        let Some(entry) = self.filter_entries.get(self.filter_cursor) else {
            return Ok(());
        };
        let value = entry.value.clone();
        self.selections.columns[entry.column_idx].toggle(&value);
        self.recompute()?;
        self.set_status_message(format!(
            "{} of {} records",
            self.filtered.height(),
            self.df.height()
        ));
        Ok(())
    }

    fn export(&mut self) {
        match self.write_export(Path::new(".")) {
            Ok((path, nrows)) => {
                info!("Exported {} rows to {:?}", nrows, path);
                self.set_status_message(format!("Exported {nrows} records to {}", path.display()));
            }
            Err(e) => self.set_status_message(format!("Export failed: {e}")),
        }
    }

    /// Write the filtered table as CSV into `dir`, returning the file
    /// path and the number of exported rows.
    pub fn write_export(&self, dir: &Path) -> Result<(PathBuf, usize), TrendsError> {
        let bytes = export_csv(&self.filtered)?;
        let path = dir.join(EXPORT_FILE);
        fs::write(&path, bytes)?;
        Ok((path, self.filtered.height()))
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = HELP_TEXT.to_string();
        self.show_popup = true;
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.clear();
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) -> Result<(), TrendsError> {
        if !self.active_cmdinput {
            return Ok(());
        }
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.handle_cmd_input()?;
        }
        Ok(())
    }

    fn handle_cmd_input(&mut self) -> Result<(), TrendsError> {
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let cmd_input = self.last_input.input.trim().to_string();
        match self.cmd_mode {
            Some(CMDMode::VisualizeColumn) if !self.last_input.canceled => {
                self.set_bar_column(&cmd_input)?;
            }
            _ => {}
        }
        self.cmd_mode = None;
        Ok(())
    }

    // Only text-typed columns qualify for the frequency bar chart.
    fn set_bar_column(&mut self, name: &str) -> Result<(), TrendsError> {
        if text_columns(&self.filtered).iter().any(|c| c == name) {
            self.bar_column = Some(name.to_string());
            self.bar = Some(frequency_bar(&self.filtered, name)?);
            self.modus = Modus::BAR;
            self.set_status_message(format!("Visualizing \"{name}\""));
        } else {
            self.set_status_message(format!("\"{name}\" is not a text column"));
        }
        Ok(())
    }

    fn poll_banner(&mut self) {
        let Some(rx) = &self.banner_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(banner)) => {
                self.banner = Some(banner);
                self.banner_rx = None;
            }
            Ok(Err(e)) => {
                self.banner_warning = Some(format!("Could not load the shopping animation: {e}"));
                self.banner_rx = None;
            }
            Err(_) => {} // still pending, or the fetch thread died
        }
    }

    // -------------------- View accessors ---------------------- //

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn file_name(&self) -> String {
        self.file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string()
    }

    pub fn preview_columns(&self) -> &[ColumnView] {
        &self.preview
    }

    pub fn preview_offset(&self) -> usize {
        self.preview_offset
    }

    pub fn record_counts(&self) -> (usize, usize) {
        (self.filtered.height(), self.df.height())
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn filter_entries(&self) -> &[FilterEntry] {
        &self.filter_entries
    }

    pub fn filter_cursor(&self) -> usize {
        self.filter_cursor
    }

    pub fn stats(&self) -> &[ColumnStats] {
        &self.stats
    }

    pub fn bar(&self) -> Option<&ChartSpec> {
        self.bar.as_ref()
    }

    pub fn pie(&self) -> Option<&ChartSpec> {
        self.pie.as_ref()
    }

    pub fn trend(&self) -> Option<&ChartSpec> {
        self.trend.as_ref()
    }

    pub fn trend_note(&self) -> Option<&str> {
        self.trend_note.as_deref()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn banner_warning(&self) -> Option<&str> {
        self.banner_warning.as_deref()
    }

    pub fn popup(&self) -> Option<&str> {
        self.show_popup.then_some(self.popup_message.as_str())
    }

    pub fn cmd_input(&self) -> Option<&InputResult> {
        self.active_cmdinput.then_some(&self.last_input)
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> PathBuf {
        PathBuf::from(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/shopping_01.csv"
        ))
    }

    fn model() -> Model {
        Model::load(fixture(), &TrendsConfig::default()).unwrap()
    }

    #[test]
    fn load_runs_the_whole_pipeline() {
        let m = model();
        assert_eq!(m.record_counts(), (8, 8));
        assert!(!m.stats().is_empty());
        assert!(m.bar().is_some());
        assert!(m.pie().is_some());
        assert!(m.trend().is_some());
        assert!(m.trend_note().is_none());
    }

    #[test]
    fn trend_ignores_active_filters() {
        let mut m = model();
        // Drop every gender value; the trend must not change.
        let before = m.trend().unwrap().values.clone();
        m.selections.columns[0].toggle("Male");
        m.selections.columns[0].toggle("Female");
        m.recompute().unwrap();
        assert_eq!(m.record_counts().0, 0);
        assert_eq!(m.trend().unwrap().values, before);
    }

    #[test]
    fn toggling_a_filter_recomputes_dependent_views() {
        let mut m = model();
        m.modus = Modus::FILTERS;
        // Cursor starts on the first Gender value ("Male").
        m.update(Some(Message::ToggleValue)).unwrap();
        let (filtered, total) = m.record_counts();
        assert_eq!(total, 8);
        assert_eq!(filtered, 4);
        let bar = m.bar().unwrap();
        let total_bar: u64 = bar.values.iter().sum();
        assert_eq!(total_bar, 4);
    }

    #[test]
    fn export_writes_the_filtered_csv() {
        let mut m = model();
        m.selections.columns[2].toggle("Clothing");
        m.recompute().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let (path, nrows) = m.write_export(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), EXPORT_FILE);
        assert_eq!(nrows, 4);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1 + nrows);
        assert!(lines[0].contains("Gender"));
        assert!(!content.contains("Clothing"));
    }

    #[test]
    fn trend_note_appears_without_date_column() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        use std::io::Write;
        writeln!(file, "Gender,Age,Category").unwrap();
        writeln!(file, "Male,31,Clothing").unwrap();
        let m = Model::load(file.path().to_path_buf(), &TrendsConfig::default()).unwrap();
        assert!(m.trend().is_none());
        assert!(m.trend_note().unwrap().contains("Purchase Date"));
    }

    #[test]
    fn missing_filterable_column_fails_loading() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        use std::io::Write;
        writeln!(file, "Gender,Age").unwrap();
        writeln!(file, "Male,31").unwrap();
        let result = Model::load(file.path().to_path_buf(), &TrendsConfig::default());
        assert!(matches!(
            result,
            Err(TrendsError::MissingColumn(name)) if name == "Category"
        ));
    }

    #[test]
    fn choosing_a_numeric_bar_column_is_rejected() {
        let mut m = model();
        m.set_bar_column("Age").unwrap();
        assert!(m.status_message().contains("not a text column"));
        assert_eq!(m.bar().unwrap().title, "Distribution of Gender");
    }
}
