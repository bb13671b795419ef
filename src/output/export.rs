//! JSON export of harvested records

use crate::extract::Record;
use crate::output::{OutputError, OutputResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// File name used when no export path is configured
pub const DEFAULT_EXPORT_FILE: &str = "scraped-mcqs.json";

/// Writes `records` to `output_path` as a pretty-printed JSON array
///
/// # Arguments
///
/// * `records` - Records in accumulation order
/// * `output_path` - Destination file; overwritten if it exists
///
/// # Returns
///
/// * `Ok(())` - File written
/// * `Err(OutputError::Empty)` - There were no records; no file is created
/// * `Err(OutputError)` - Serialization or IO failure
pub fn export_json(records: &[Record], output_path: &Path) -> OutputResult<()> {
    if records.is_empty() {
        return Err(OutputError::Empty);
    }

    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!(
        "Exported {} records to {}",
        records.len(),
        output_path.display()
    );
    Ok(())
}
