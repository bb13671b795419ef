//! Extracted record types and response interpretation

use crate::extract::ExtractionError;
use crate::url::Locator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One multiple-choice question extracted from a page
///
/// `correct_answer` is expected to be one of `options`. The extraction
/// service is responsible for that; the harvester does not re-check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Full question text
    pub question: String,

    /// Answer options, in page order
    pub options: Vec<String>,

    /// Text of the correct option
    pub correct_answer: String,

    /// Examination or source label, e.g. "UPSC IAS, 2012"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_name: Option<String>,

    /// Absolute URL of an associated figure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Records found on one page plus the pointer to the next page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub records: Vec<Record>,
    pub next_locator: Option<Locator>,
}

impl ExtractionOutcome {
    /// Interprets the JSON text produced by the extraction service
    ///
    /// The text must be a JSON object with an `mcqs` array. A relative
    /// `nextUrl` is resolved against `base` when one is given. A `nextUrl`
    /// that is missing, null, blank, or still not an absolute http(s) URL
    /// means there is no next page.
    pub fn from_json(text: &str, base: Option<&Locator>) -> Result<Self, ExtractionError> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            ExtractionError::MalformedResponse(format!(
                "Failed to parse the API response as JSON: {}",
                e
            ))
        })?;

        let mcqs = value
            .get("mcqs")
            .filter(|v| v.is_array())
            .cloned()
            .ok_or_else(|| {
                ExtractionError::MalformedResponse(
                    "response does not contain an `mcqs` array".to_string(),
                )
            })?;

        let records: Vec<Record> = serde_json::from_value(mcqs).map_err(|e| {
            ExtractionError::MalformedResponse(format!("invalid record in `mcqs`: {}", e))
        })?;

        let next_locator = value
            .get("nextUrl")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| resolve_next(s, base));

        Ok(Self {
            records,
            next_locator,
        })
    }
}

/// Turns a `nextUrl` value into a locator, joining relative links onto `base`
fn resolve_next(raw: &str, base: Option<&Locator>) -> Option<Locator> {
    let reason = match Locator::parse(raw) {
        Ok(locator) => return Some(locator),
        Err(e) => e,
    };

    let joined = base.and_then(|base| base.as_url().join(raw).ok());
    match joined.map(|url| Locator::parse(url.as_str())) {
        Some(Ok(locator)) => {
            tracing::debug!("Resolved relative nextUrl '{}' to {}", raw, locator);
            Some(locator)
        }
        _ => {
            tracing::warn!(
                "Ignoring unusable nextUrl '{}' ({}); pagination stops here",
                raw,
                reason
            );
            None
        }
    }
}
