use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use witness_collation::{Report, SummaryDump};

pub fn write_report(path: &Path, report: &Report) -> Result<(), String> {
    write_pretty_json(path, report, "report")
}

pub fn write_summary(path: &Path, summary: &SummaryDump) -> Result<(), String> {
    write_pretty_json(path, summary, "summary")
}

fn write_pretty_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create {what} output directory '{}': {err}",
                parent.display()
            )
        })?;
    }

    let mut file = File::create(path)
        .map_err(|err| format!("Failed to create {what} file '{}': {err}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, value)
        .map_err(|err| format!("Failed to serialize {what} JSON '{}': {err}", path.display()))?;
    file.write_all(b"\n")
        .map_err(|err| format!("Failed to finalize {what} file '{}': {err}", path.display()))?;
    Ok(())
}
