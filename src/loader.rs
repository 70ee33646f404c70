use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Xlsx, open_workbook};
use polars::prelude::*;
use tracing::{debug, info};

use crate::domain::TrendsError;

#[derive(Debug)]
pub enum FileType {
    CSV,
    PARQUET,
    XLSX,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

/// Decode a spreadsheet file into an eagerly collected DataFrame.
///
/// CSV, parquet and arrow go through the polars lazy scanners; xlsx is
/// decoded with calamine and typed per column. A table with zero columns
/// is a loading failure.
pub fn load_table(path: PathBuf) -> Result<(FileInfo, DataFrame), TrendsError> {
    let file_info = get_file_info(path)?;
    let df = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?.collect()?,
        FileType::PARQUET => load_parquet(&file_info.path)?.collect()?,
        FileType::ARROW => load_arrow(&file_info.path)?.collect()?,
        FileType::XLSX => load_xlsx(&file_info.path)?,
    };

    if df.width() == 0 {
        return Err(TrendsError::LoadingFailed(
            "file contains no columns".into(),
        ));
    }

    info!(
        "Loaded {:?} ({} bytes): {} rows x {} columns",
        file_info.path,
        file_info.file_size,
        df.height(),
        df.width()
    );
    for (name, dtype) in df.schema().iter() {
        debug!("Column \"{}\": {:?}", name, dtype);
    }

    Ok((file_info, df))
}

fn detect_file_type(path: &Path) -> Result<FileType, TrendsError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("XLSX") => Ok(FileType::XLSX),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(TrendsError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, TrendsError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TrendsError::FileNotFound,
        ErrorKind::PermissionDenied => TrendsError::PermissionDenied,
        _ => TrendsError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TrendsError::LoadingFailed("not a file".into()));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

fn load_csv(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.as_path().into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(
        PlPath::Local(path.as_path().into()),
        ScanArgsParquet::default(),
    )
}

fn load_arrow(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.as_path().into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

fn load_xlsx(path: &PathBuf) -> Result<DataFrame, TrendsError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();
    let first_sheet = sheet_names
        .first()
        .ok_or_else(|| TrendsError::LoadingFailed("workbook contains no sheets".into()))?;

    let range = workbook
        .worksheet_range(first_sheet)
        .map_err(|e| TrendsError::LoadingFailed(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| TrendsError::LoadingFailed("worksheet is empty".into()))?;
    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::Empty => format!("column_{idx}"),
            other => other.to_string(),
        })
        .collect();

    let body: Vec<&[Data]> = rows.collect();
    let columns: Vec<Column> = names
        .iter()
        .enumerate()
        .map(|(cidx, name)| xlsx_column(name, cidx, &body))
        .collect();

    Ok(DataFrame::new(columns)?)
}

// A column whose non-empty cells are all numbers becomes Float64,
// everything else is kept as text. Dates render as ISO strings so the
// trend parser can pick them up.
fn xlsx_column(name: &str, cidx: usize, body: &[&[Data]]) -> Column {
    let numeric = body.iter().all(|row| {
        matches!(
            row.get(cidx),
            None | Some(Data::Empty) | Some(Data::Float(_)) | Some(Data::Int(_))
        )
    });

    if numeric {
        let values: Vec<Option<f64>> = body
            .iter()
            .map(|row| match row.get(cidx) {
                Some(Data::Float(f)) => Some(*f),
                Some(Data::Int(i)) => Some(*i as f64),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values).into_column()
    } else {
        let values: Vec<Option<String>> = body
            .iter()
            .map(|row| match row.get(cidx) {
                None | Some(Data::Empty) => None,
                Some(Data::DateTime(dt)) => dt
                    .as_datetime()
                    .map(|d| d.date().to_string())
                    .or_else(|| Some(dt.as_f64().to_string())),
                Some(other) => Some(other.to_string()),
            })
            .collect();
        Series::new(name.into(), values).into_column()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_known_extensions() {
        assert!(matches!(
            detect_file_type(Path::new("data.csv")),
            Ok(FileType::CSV)
        ));
        assert!(matches!(
            detect_file_type(Path::new("data.XLSX")),
            Ok(FileType::XLSX)
        ));
        assert!(matches!(
            detect_file_type(Path::new("data.feather")),
            Ok(FileType::ARROW)
        ));
        assert!(matches!(
            detect_file_type(Path::new("data.txt")),
            Err(TrendsError::UnknownFileType)
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = load_table(PathBuf::from("no/such/file.csv"));
        assert!(matches!(result, Err(TrendsError::FileNotFound)));
    }

    #[test]
    fn loads_csv_fixture() {
        let path = PathBuf::from(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/shopping_01.csv"
        ));
        let (info, df) = load_table(path).unwrap();
        assert!(matches!(info.file_type, FileType::CSV));
        assert_eq!(df.height(), 8);
        let names = df.get_column_names_str();
        assert!(names.contains(&"Gender"));
        assert!(names.contains(&"Age"));
        assert!(names.contains(&"Category"));
        assert!(names.contains(&"Purchase Date"));
    }

    #[test]
    fn single_header_csv_still_loads() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Gender,Age,Category").unwrap();
        writeln!(file, "Male,31,Clothing").unwrap();
        let (_, df) = load_table(file.path().to_path_buf()).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 3);
    }
}
