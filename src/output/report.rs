//! Text crawl report
//!
//! Aggregates a statistics snapshot into the figures crawl operators look at:
//! fetch success, outlink and scope counts, and histograms of status codes,
//! file sizes and content types.

use crate::output::traits::{OutputHandler, OutputResult};
use crate::output::CrawlStatsSnapshot;
use crate::url::UrlScope;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

/// Labels of the file size buckets, smallest first
pub const SIZE_BUCKETS: [&str; 5] = ["< 1KB", "1KB ~ <10KB", "10KB ~ <100KB", "100KB ~ <1MB", ">= 1MB"];

/// Returns the size bucket index for a body of `bytes` bytes
pub fn size_bucket(bytes: u64) -> usize {
    match bytes {
        b if b < KB => 0,
        b if b < 10 * KB => 1,
        b if b < 100 * KB => 2,
        b if b < MB => 3,
        _ => 4,
    }
}

/// Aggregated crawl figures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub fetches_attempted: usize,
    pub fetches_succeeded: usize,
    pub fetches_failed: usize,

    /// Sum of per-page outlink counts
    pub total_urls_extracted: u64,
    pub unique_urls: usize,
    pub unique_urls_within: usize,
    pub unique_urls_outside: usize,

    /// Status code -> count, ascending by code
    pub status_codes: BTreeMap<u16, usize>,
    /// Counts per [`SIZE_BUCKETS`] entry
    pub file_sizes: [usize; 5],
    /// Content type -> count, lexicographic
    pub content_types: BTreeMap<String, usize>,
}

impl CrawlReport {
    pub fn from_snapshot(snapshot: &CrawlStatsSnapshot) -> Self {
        let mut report = Self {
            fetches_attempted: snapshot.fetches.len(),
            unique_urls: snapshot.urls.len(),
            ..Self::default()
        };

        for fetch in &snapshot.fetches {
            if (200..300).contains(&fetch.status) {
                report.fetches_succeeded += 1;
            }
            *report.status_codes.entry(fetch.status).or_insert(0) += 1;
        }
        report.fetches_failed = report.fetches_attempted - report.fetches_succeeded;

        for visit in &snapshot.visits {
            report.total_urls_extracted += visit.outlinks as u64;
            report.file_sizes[size_bucket(visit.size)] += 1;
            *report
                .content_types
                .entry(visit.content_type.clone())
                .or_insert(0) += 1;
        }

        for url in &snapshot.urls {
            match url.scope {
                UrlScope::InScope => report.unique_urls_within += 1,
                UrlScope::OutOfScope => report.unique_urls_outside += 1,
            }
        }

        report
    }

    /// Renders the report as plain text
    pub fn render(&self, header: &ReportHeader) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Site crawled: {}", header.site_label);
        let _ = writeln!(out, "Number of workers: {}", header.worker_count);
        if let Some(hash) = &header.config_hash {
            let _ = writeln!(out, "Config hash: {}", hash);
        }
        let _ = writeln!(out, "Generated: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
        out.push('\n');

        section(&mut out, "Fetch Statistics");
        let _ = writeln!(out, "# fetches attempted: {}", self.fetches_attempted);
        let _ = writeln!(out, "# fetches succeeded: {}", self.fetches_succeeded);
        let _ = writeln!(out, "# fetches failed or aborted: {}", self.fetches_failed);
        out.push('\n');

        section(&mut out, "Outgoing URLs:");
        let _ = writeln!(out, "Total URLs extracted: {}", self.total_urls_extracted);
        let _ = writeln!(out, "# unique URLs extracted: {}", self.unique_urls);
        let _ = writeln!(out, "# unique URLs within site: {}", self.unique_urls_within);
        let _ = writeln!(out, "# unique URLs outside site: {}", self.unique_urls_outside);
        out.push('\n');

        section(&mut out, "Status Codes:");
        for (code, count) in &self.status_codes {
            let _ = writeln!(out, "{}: {}", code, count);
        }
        out.push('\n');

        section(&mut out, "File Sizes:");
        for (label, count) in SIZE_BUCKETS.iter().zip(self.file_sizes) {
            let _ = writeln!(out, "{}: {}", label, count);
        }
        out.push('\n');

        section(&mut out, "Content Types:");
        for (content_type, count) in &self.content_types {
            let _ = writeln!(out, "{}: {}", content_type, count);
        }

        out
    }
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.len()));
}

/// Run metadata printed above the figures
#[derive(Debug, Clone)]
pub struct ReportHeader {
    pub site_label: String,
    pub worker_count: usize,
    pub config_hash: Option<String>,
}

/// Path of the report file for a site label
pub fn report_path(directory: impl AsRef<Path>, site_label: &str) -> PathBuf {
    directory
        .as_ref()
        .join(format!("CrawlReport_{}.txt", site_label))
}

/// Writes `CrawlReport_<label>.txt`
#[derive(Debug, Clone)]
pub struct ReportWriter {
    directory: PathBuf,
    header: ReportHeader,
}

impl ReportWriter {
    pub fn new(directory: impl Into<PathBuf>, header: ReportHeader) -> Self {
        Self {
            directory: directory.into(),
            header,
        }
    }

    pub fn path(&self) -> PathBuf {
        report_path(&self.directory, &self.header.site_label)
    }
}

impl OutputHandler for ReportWriter {
    fn name(&self) -> &str {
        "report"
    }

    fn emit(&self, snapshot: &CrawlStatsSnapshot) -> OutputResult<()> {
        let report = CrawlReport::from_snapshot(snapshot);
        fs::create_dir_all(&self.directory)?;
        fs::write(self.path(), report.render(&self.header))?;
        tracing::info!("Report written to {}", self.path().display());
        Ok(())
    }
}
