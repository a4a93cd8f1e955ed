//! Import reports and JSON export

use crate::midi::file_stem;
use crate::pattern::Pattern;
use crate::state::{ImportDiagnostics, SmfHeader, TrackSummary};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pattern plus everything learned while importing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub version: String,
    pub header: SmfHeader,
    pub tracks: Vec<TrackSummary>,
    pub diagnostics: ImportDiagnostics,
    pub pattern: Pattern,
}

/// Export an import report to `<output_dir>/<pattern id>.json`
pub fn export_report(report: &ImportReport, output_dir: &Path) -> crate::RiffResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let report_path = output_dir.join(format!("{}.json", file_stem(&report.pattern.id)));
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&report_path, json)?;

    log::info!("Exported import report to {}", report_path.display());
    Ok(report_path)
}
