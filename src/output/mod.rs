//! Output module: statistics collection and reporting
//!
//! - `stats`: concurrent fetch/visit/url tables and their snapshot
//! - `records`: CSV record streams, written after a crawl and read back for `--report-only`
//! - `report`: aggregated text report
//! - `traits`: `OutputHandler` and `OutputError`

mod records;
mod report;
mod stats;
mod traits;

pub use records::{read_snapshot, CsvRecordWriter, RecordFiles};
pub use report::{report_path, size_bucket, CrawlReport, ReportHeader, ReportWriter, SIZE_BUCKETS};
pub use stats::{CrawlStatsSnapshot, FetchRecord, StatsAggregator, UrlScopeRecord, VisitRecord};
pub use traits::{emit_all, OutputError, OutputHandler, OutputResult};
