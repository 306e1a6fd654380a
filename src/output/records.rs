//! CSV record streams
//!
//! One file per statistics table, named after the site label:
//! `fetch_<label>.csv`, `visit_<label>.csv` and `urls_<label>.csv`.
//! The same files can be read back to rebuild a report without crawling.

use crate::output::stats::{FetchRecord, UrlScopeRecord, VisitRecord};
use crate::output::traits::{OutputError, OutputHandler, OutputResult};
use crate::output::CrawlStatsSnapshot;
use crate::url::UrlScope;
use std::fs;
use std::path::{Path, PathBuf};

const FETCH_HEADER: [&str; 2] = ["URL", "Status"];
const VISIT_HEADER: [&str; 4] = ["URL", "Size (Bytes)", "# of Outlinks", "Content-Type"];
const URLS_HEADER: [&str; 2] = ["URL", "Indicator"];

/// Locations of the three record files for one site label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFiles {
    pub fetch: PathBuf,
    pub visit: PathBuf,
    pub urls: PathBuf,
}

impl RecordFiles {
    pub fn new(directory: impl AsRef<Path>, site_label: &str) -> Self {
        let dir = directory.as_ref();
        Self {
            fetch: dir.join(format!("fetch_{}.csv", site_label)),
            visit: dir.join(format!("visit_{}.csv", site_label)),
            urls: dir.join(format!("urls_{}.csv", site_label)),
        }
    }
}

/// Writes the three record streams as CSV
#[derive(Debug, Clone)]
pub struct CsvRecordWriter {
    directory: PathBuf,
    files: RecordFiles,
}

impl CsvRecordWriter {
    pub fn new(directory: impl Into<PathBuf>, site_label: &str) -> Self {
        let directory = directory.into();
        let files = RecordFiles::new(&directory, site_label);
        Self { directory, files }
    }

    pub fn files(&self) -> &RecordFiles {
        &self.files
    }

    fn write_fetches(&self, records: &[FetchRecord]) -> OutputResult<()> {
        let mut writer = csv::Writer::from_path(&self.files.fetch)?;
        writer.write_record(FETCH_HEADER)?;
        for record in records {
            writer.write_record([record.url.as_str(), record.status.to_string().as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_visits(&self, records: &[VisitRecord]) -> OutputResult<()> {
        let mut writer = csv::Writer::from_path(&self.files.visit)?;
        writer.write_record(VISIT_HEADER)?;
        for record in records {
            writer.write_record([
                record.url.as_str(),
                record.size.to_string().as_str(),
                record.outlinks.to_string().as_str(),
                record.content_type.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_urls(&self, records: &[UrlScopeRecord]) -> OutputResult<()> {
        let mut writer = csv::Writer::from_path(&self.files.urls)?;
        writer.write_record(URLS_HEADER)?;
        for record in records {
            writer.write_record([record.url.as_str(), record.scope.indicator()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl OutputHandler for CsvRecordWriter {
    fn name(&self) -> &str {
        "csv"
    }

    fn emit(&self, snapshot: &CrawlStatsSnapshot) -> OutputResult<()> {
        fs::create_dir_all(&self.directory)?;
        self.write_fetches(&snapshot.fetches)?;
        self.write_visits(&snapshot.visits)?;
        self.write_urls(&snapshot.urls)?;
        tracing::info!(
            "Wrote {} fetch, {} visit and {} url records to {}",
            snapshot.fetches.len(),
            snapshot.visits.len(),
            snapshot.urls.len(),
            self.directory.display()
        );
        Ok(())
    }
}

/// Reads previously written record files back into a snapshot
///
/// # Arguments
///
/// * `directory` - Directory the files were written to
/// * `site_label` - Label used in the file names
///
/// # Returns
///
/// * `Ok(CrawlStatsSnapshot)` - All three files parsed
/// * `Err(OutputError)` - A file is missing or a row is malformed
pub fn read_snapshot(directory: impl AsRef<Path>, site_label: &str) -> OutputResult<CrawlStatsSnapshot> {
    let files = RecordFiles::new(directory, site_label);

    let mut fetches = Vec::new();
    for row in csv::Reader::from_path(&files.fetch)?.records() {
        let row = row?;
        fetches.push(FetchRecord {
            url: field(&row, 0, &files.fetch)?.to_string(),
            status: parse_field(&row, 1, &files.fetch)?,
        });
    }

    let mut visits = Vec::new();
    for row in csv::Reader::from_path(&files.visit)?.records() {
        let row = row?;
        visits.push(VisitRecord {
            url: field(&row, 0, &files.visit)?.to_string(),
            size: parse_field(&row, 1, &files.visit)?,
            outlinks: parse_field(&row, 2, &files.visit)?,
            content_type: field(&row, 3, &files.visit)?.to_string(),
        });
    }

    let mut urls = Vec::new();
    for row in csv::Reader::from_path(&files.urls)?.records() {
        let row = row?;
        let indicator = field(&row, 1, &files.urls)?;
        let scope = UrlScope::from_indicator(indicator).ok_or_else(|| OutputError::Format {
            file: files.urls.display().to_string(),
            message: format!("unknown indicator '{}'", indicator),
        })?;
        urls.push(UrlScopeRecord {
            url: field(&row, 0, &files.urls)?.to_string(),
            scope,
        });
    }

    let mut snapshot = CrawlStatsSnapshot {
        fetches,
        visits,
        urls,
    };
    snapshot.sort();
    Ok(snapshot)
}

fn field<'a>(row: &'a csv::StringRecord, index: usize, file: &Path) -> OutputResult<&'a str> {
    row.get(index).ok_or_else(|| OutputError::Format {
        file: file.display().to_string(),
        message: format!("missing column {} in row {:?}", index + 1, row),
    })
}

fn parse_field<T: std::str::FromStr>(
    row: &csv::StringRecord,
    index: usize,
    file: &Path,
) -> OutputResult<T> {
    let raw = field(row, index, file)?;
    raw.trim().parse().map_err(|_| OutputError::Format {
        file: file.display().to_string(),
        message: format!("'{}' is not a number", raw),
    })
}
