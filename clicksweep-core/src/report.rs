// CSV report sink and end-of-run summaries

use clicksweep_scanner::{CrawlSummary, ReportRow, RowSink, ScanError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

pub const SCOPED_HEADER: [&str; 4] = ["Scope", "Element Text", "Status", "Clickable"];
pub const PAGED_HEADER: [&str; 4] = ["Home", "Page", "Element", "Status"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLayout {
    /// One row per outcome labelled with its scope.
    #[default]
    Scoped,
    /// Rows grouped under the start URL, then the page they were found on.
    Paged,
}

impl ReportLayout {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "scoped" => Some(ReportLayout::Scoped),
            "paged" => Some(ReportLayout::Paged),
            _ => None,
        }
    }

    pub fn header(&self) -> [&'static str; 4] {
        match self {
            ReportLayout::Scoped => SCOPED_HEADER,
            ReportLayout::Paged => PAGED_HEADER,
        }
    }
}

/// Report file that survives interruption: the header is written once on
/// creation and every batch after that is appended and flushed before
/// `append` returns.
#[derive(Debug)]
pub struct CsvReportSink {
    path: PathBuf,
    layout: ReportLayout,
    home: String,
    rows_written: usize,
}

impl CsvReportSink {
    /// Truncate `path` and write the header for `layout`.
    pub fn create(path: &Path, layout: ReportLayout) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(layout.header())?;
        writer.flush()?;

        Ok(Self {
            path: path.to_path_buf(),
            layout,
            home: String::new(),
            rows_written: 0,
        })
    }

    /// Start URL recorded in the `Home` column of the paged layout.
    pub fn set_home(&mut self, url: &str) {
        self.home = url.to_string();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn record(&self, row: &ReportRow) -> [String; 4] {
        match self.layout {
            ReportLayout::Scoped => [
                row.scope.clone(),
                row.element_text.clone(),
                row.status.clone(),
                row.clickable.to_string(),
            ],
            ReportLayout::Paged => [
                self.home.clone(),
                row.scope.clone(),
                row.element_text.clone(),
                row.status.clone(),
            ],
        }
    }
}

impl RowSink for CsvReportSink {
    fn append(&mut self, rows: &[ReportRow]) -> clicksweep_scanner::error::Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        for row in rows {
            writer
                .write_record(self.record(row))
                .map_err(|e| ScanError::Other(format!("CSV write failed: {}", e)))?;
        }
        writer.flush()?;

        self.rows_written += rows.len();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub scope: String,
    pub element: String,
    pub status: String,
}

/// What one start URL produced, for the end-of-run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub start_url: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_secs: i64,
    pub scopes_completed: usize,
    pub total: usize,
    pub clickable: usize,
    /// Keyed by `InteractionStatus::kind`.
    pub status_counts: BTreeMap<String, usize>,
    pub failures: Vec<FailureEntry>,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    fn empty(
        start_url: &str,
        started_at: chrono::DateTime<chrono::Utc>,
        finished_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            start_url: start_url.to_string(),
            started_at: started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
            duration_secs: (finished_at - started_at).num_seconds(),
            scopes_completed: 0,
            total: 0,
            clickable: 0,
            status_counts: BTreeMap::new(),
            failures: Vec::new(),
            cancelled: false,
            error: None,
        }
    }

    pub fn from_crawl(
        crawl: &CrawlSummary,
        started_at: chrono::DateTime<chrono::Utc>,
        finished_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let mut summary = Self::empty(&crawl.start_url, started_at, finished_at);
        summary.scopes_completed = crawl.scopes_completed();
        summary.cancelled = crawl.cancelled;

        for scope in &crawl.scopes {
            for outcome in &scope.outcomes {
                summary.total += 1;
                if outcome.success {
                    summary.clickable += 1;
                } else {
                    summary.failures.push(FailureEntry {
                        scope: scope.scope.clone(),
                        element: outcome.text.clone(),
                        status: outcome.status.to_string(),
                    });
                }
                *summary
                    .status_counts
                    .entry(outcome.status.kind().to_string())
                    .or_insert(0) += 1;
            }
        }

        summary
    }

    /// Summary for a start URL whose crawl ended in an error.
    pub fn failed(
        start_url: &str,
        started_at: chrono::DateTime<chrono::Utc>,
        finished_at: chrono::DateTime<chrono::Utc>,
        error: String,
    ) -> Self {
        let mut summary = Self::empty(start_url, started_at, finished_at);
        summary.error = Some(error);
        summary
    }

    fn status_label(&self) -> &'static str {
        if self.error.is_some() {
            "Failed"
        } else if self.cancelled {
            "Cancelled"
        } else {
            "Completed"
        }
    }
}

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

pub fn generate_text_summary(summaries: &[RunSummary]) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("                          CLICKSWEEP RUN SUMMARY\n");
    report.push_str(RULE);
    report.push('\n');

    for summary in summaries {
        report.push_str(&format!("Run ID:       {}\n", summary.run_id));
        report.push_str(&format!("Start URL:    {}\n", summary.start_url));
        report.push_str(&format!("Status:       {}\n", summary.status_label()));
        report.push_str(&format!("Started:      {}\n", summary.started_at));
        report.push_str(&format!("Duration:     {} seconds\n", summary.duration_secs));
        report.push_str(&format!("Scopes:       {}\n", summary.scopes_completed));
        report.push_str(&format!(
            "Elements:     {} ({} clickable)\n",
            summary.total, summary.clickable
        ));

        if let Some(ref error) = summary.error {
            report.push_str(&format!("Error:        {}\n", error));
        }

        if !summary.status_counts.is_empty() {
            report.push('\n');
            for (kind, count) in &summary.status_counts {
                report.push_str(&format!("  {:<20} {}\n", kind, count));
            }
        }

        if !summary.failures.is_empty() {
            report.push_str("\nFailures:\n");
            for failure in &summary.failures {
                report.push_str(&format!(
                    "  [{}] {}: {}\n",
                    failure.scope, failure.element, failure.status
                ));
            }
        }

        report.push_str("\n────────────────────────────────────────────────────────────────────────────────\n\n");
    }

    report.push_str(RULE);
    report.push_str(&format!("Generated by clicksweep v{}\n", env!("CARGO_PKG_VERSION")));

    report
}

pub fn generate_json_summary(summaries: &[RunSummary]) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "clicksweep",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "runs": summaries
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_summary(
    summaries: &[RunSummary],
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_summary(summaries)),
        ReportFormat::Json => generate_json_summary(summaries),
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    fs::write(path, content)
}
