//! Human-readable run summaries

use crate::harvest::{HarvestOutcome, HarvestReport};

/// Formats a finished run as plain text
pub fn format_report(report: &HarvestReport) -> String {
    let mut out = String::new();

    out.push_str("=== Harvest Summary ===\n\n");
    out.push_str(&format!("Session: {}\n", report.session_id));
    out.push_str(&format!("State: {}\n", report.state()));
    out.push_str(&format!("Pages processed: {}\n", report.pages));
    out.push_str(&format!("Records: {}\n", report.records.len()));

    match &report.outcome {
        HarvestOutcome::Blocked { locator, summary } => {
            out.push_str(&format!("Blocked at: {}\n", locator));
            out.push_str(&format!("Last route failure: {}\n", summary));
        }
        HarvestOutcome::Failed { kind, message } => {
            out.push_str(&format!("Failure ({:?}): {}\n", kind, message));
        }
        HarvestOutcome::Completed | HarvestOutcome::Cancelled => {}
    }

    let exams = exam_counts(report);
    if !exams.is_empty() {
        out.push_str("\nRecords by Exam:\n");
        for (exam, count) in exams {
            out.push_str(&format!("  {}: {}\n", exam, count));
        }
    }

    out
}

/// Prints a finished run to stdout
///
/// # Arguments
///
/// * `report` - The report returned by the harvester
pub fn print_report(report: &HarvestReport) {
    print!("{}", format_report(report));
}

/// Record counts per exam name, most frequent first
fn exam_counts(report: &HarvestReport) -> Vec<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for exam in report.records.iter().filter_map(|r| r.exam_name.as_deref()) {
        match counts.iter_mut().find(|(name, _)| *name == exam) {
            Some((_, count)) => *count += 1,
            None => counts.push((exam, 1)),
        }
    }
    // Stable sort keeps first-seen order among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
