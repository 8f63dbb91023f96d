//! Reading and writing tables as CSV or Parquet, chosen by file extension.

use crate::error::{PipelineError, Result, ResultExt};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet") | Some("pq") => Ok(Self::Parquet),
            _ => Err(PipelineError::InvalidConfig(format!(
                "Unsupported table format for {} (expected .csv or .parquet)",
                path.display()
            ))),
        }
    }
}

/// Load a table from a CSV or Parquet file.
pub fn read_table(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let format = TableFormat::from_path(path)?;
    debug!("Reading {:?} table from {}", format, path.display());

    let df = match format {
        TableFormat::Csv => CsvReadOptions::default()
            .with_infer_schema_length(Some(100))
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .context(format!("Failed to read {}", path.display()))?,
        TableFormat::Parquet => {
            let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
            ParquetReader::new(file)
                .finish()
                .context(format!("Failed to read {}", path.display()))?
        }
    };

    info!("Loaded {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Write a table, creating parent directories.
pub fn write_table(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let format = TableFormat::from_path(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path).context(format!("Failed to create {}", path.display()))?;
    match format {
        TableFormat::Csv => {
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
        TableFormat::Parquet => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
    }

    info!("Saved {} rows to {}", df.height(), path.display());
    Ok(())
}
