//! Tabular export of the lake-area time series.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{AreaRecord, LakeError, LakeResult};

/// Exportable record fields, named as they appear in the table header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AreaColumn {
    Date,
    SceneId,
    LakeArea,
    ObstructionArea,
    /// Lake-scoped reconstruction
    Reconstructed,
    /// Occurrence-only reconstruction, the headline series
    ReconstructedArea,
    PolygonArea,
    FillStatus,
    ShorelineOcc,
    ShorelineOccStd,
    CloudCover,
}

/// Columns written when the caller does not choose any
pub const DEFAULT_COLUMNS: [AreaColumn; 2] = [AreaColumn::Date, AreaColumn::ReconstructedArea];

impl AreaColumn {
    pub const ALL: [AreaColumn; 11] = [
        AreaColumn::Date,
        AreaColumn::SceneId,
        AreaColumn::LakeArea,
        AreaColumn::ObstructionArea,
        AreaColumn::Reconstructed,
        AreaColumn::ReconstructedArea,
        AreaColumn::PolygonArea,
        AreaColumn::FillStatus,
        AreaColumn::ShorelineOcc,
        AreaColumn::ShorelineOccStd,
        AreaColumn::CloudCover,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            AreaColumn::Date => "Date",
            AreaColumn::SceneId => "SceneId",
            AreaColumn::LakeArea => "LakeArea",
            AreaColumn::ObstructionArea => "ObstructionArea",
            AreaColumn::Reconstructed => "Reconstructed",
            AreaColumn::ReconstructedArea => "ReconstructedArea",
            AreaColumn::PolygonArea => "PolygonArea",
            AreaColumn::FillStatus => "FillStatus",
            AreaColumn::ShorelineOcc => "ShorelineOcc",
            AreaColumn::ShorelineOccStd => "ShorelineOccStd",
            AreaColumn::CloudCover => "CloudCover",
        }
    }

    /// Cell text for one record; a missing value is an empty cell
    pub fn value(&self, record: &AreaRecord) -> String {
        match self {
            AreaColumn::Date => record.date.format("%Y-%m-%d").to_string(),
            AreaColumn::SceneId => record.scene_id.clone(),
            AreaColumn::LakeArea => record.lake_area.to_string(),
            AreaColumn::ObstructionArea => record.obstruction_area.to_string(),
            AreaColumn::Reconstructed => record.reconstructed_area.to_string(),
            AreaColumn::ReconstructedArea => record.reconstructed_all_area.to_string(),
            AreaColumn::PolygonArea => record.polygon_area.to_string(),
            AreaColumn::FillStatus => record.fill_status.to_string(),
            AreaColumn::ShorelineOcc => record.shoreline_occurrence.to_string(),
            AreaColumn::ShorelineOccStd => record
                .shoreline_occurrence_std
                .map(|v| v.to_string())
                .unwrap_or_default(),
            AreaColumn::CloudCover => record.cloud_cover.to_string(),
        }
    }
}

impl FromStr for AreaColumn {
    type Err = LakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AreaColumn::ALL
            .iter()
            .copied()
            .find(|c| c.header().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let valid: Vec<&str> = AreaColumn::ALL.iter().map(|c| c.header()).collect();
                LakeError::InvalidFormat(format!(
                    "unknown column '{}'; expected one of {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Destination for the finished time series
pub trait AreaTableSink: Send + Sync {
    fn write_table(&self, name: &str, rows: &[AreaRecord], columns: &[AreaColumn]) -> LakeResult<()>;
}

/// Write rows as CSV with a header line; empty `columns` means [`DEFAULT_COLUMNS`]
pub fn write_csv<W: Write>(writer: W, rows: &[AreaRecord], columns: &[AreaColumn]) -> LakeResult<()> {
    let columns = if columns.is_empty() { &DEFAULT_COLUMNS[..] } else { columns };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(columns.iter().map(|c| c.header()))?;
    for record in rows {
        csv_writer.write_record(columns.iter().map(|c| c.value(record)))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes each table to `<dir>/<name>.csv`
#[derive(Debug, Clone)]
pub struct CsvTableSink {
    dir: PathBuf,
}

impl CsvTableSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        let file_name: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.csv", file_name))
    }
}

impl AreaTableSink for CsvTableSink {
    fn write_table(&self, name: &str, rows: &[AreaRecord], columns: &[AreaColumn]) -> LakeResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        log::info!("Writing {} rows to {}", rows.len(), path.display());
        write_csv(File::create(&path)?, rows, columns)
    }
}
