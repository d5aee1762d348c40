//! JSON export sink implementation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use pagecase_protocols::error::ExportError;
use pagecase_protocols::sink::{ExportRecords, ExportSink};
use pagecase_protocols::types::{RunFailure, RunState};

/// Writes the records of a run into an output directory.
///
/// Files are named after the page host, so successive runs against the same
/// host overwrite each other:
///
/// - `elements_<host>.json`
/// - `test_cases_<host>.json`
/// - `scripts_<host>.json`
/// - `run_<host>.json` (summary)
/// - `scripts_<host>/tc_<id>.py` for every successful script; the
///   directory is cleared first
pub struct JsonExportSink {
    output_dir: PathBuf,
}

/// Summary written next to the record files.
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    url: &'a str,
    state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<&'a RunFailure>,
    elements: usize,
    test_cases: usize,
    scripts_ok: usize,
    scripts_failed: usize,
    exported_at: DateTime<Utc>,
}

impl JsonExportSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), ExportError> {
        let path = self.output_dir.join(name);
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content)?;
        debug!("Wrote {:?}", path);
        Ok(())
    }
}

impl ExportSink for JsonExportSink {
    fn write(&self, records: &ExportRecords<'_>) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.output_dir)?;
        let host = host_slug(records.url);

        self.write_json(&format!("elements_{}.json", host), records.elements)?;
        self.write_json(&format!("test_cases_{}.json", host), records.test_cases)?;
        self.write_json(&format!("scripts_{}.json", host), records.scripts)?;

        let scripts_ok = records.scripts.iter().filter(|s| s.is_ok()).count();
        let script_dir = self.output_dir.join(format!("scripts_{}", host));
        // Scripts from an earlier run against the same host are replaced.
        if script_dir.exists() {
            fs::remove_dir_all(&script_dir)?;
        }
        if scripts_ok > 0 {
            fs::create_dir_all(&script_dir)?;
            for script in records.scripts.iter().filter(|s| s.is_ok()) {
                let path = script_dir.join(format!("tc_{}.py", script.test_case_id));
                fs::write(&path, format!("{}\n", script.script.trim_end()))?;
            }
        }

        let summary = RunSummary {
            url: records.url,
            state: records.state,
            failure: records.failure,
            elements: records.elements.len(),
            test_cases: records.test_cases.len(),
            scripts_ok,
            scripts_failed: records.scripts.len() - scripts_ok,
            exported_at: Utc::now(),
        };
        self.write_json(&format!("run_{}.json", host), &summary)?;

        info!(dir = ?self.output_dir, host = %host, "Exported run records");
        Ok(self.output_dir.clone())
    }
}

/// File-name-safe form of a URL's host: lowercase, with every character
/// other than ASCII letters and digits replaced by `_`. Falls back to
/// `page` when the URL has no host.
pub fn host_slug(url: &str) -> String {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default();
    let slug: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if slug.is_empty() {
        "page".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
