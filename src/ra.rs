//! Event listings from the ra.co GraphQL API.
//!
//! A run walks the requested date range with successive sweeps (page 1, 2, ...
//! until an empty page), flattens the listings and writes them to a CSV file.
//!
//! ```rust,ignore
//! let template = QueryTemplate::from_path(Path::new("resources/graphql_query_template.json"))?;
//! let fetcher = PageFetcher::new(ApiConfig::from_env()?)?;
//! let mut walker = DateWindowWalker::new(template, fetcher, FixedDelay(DEFAULT_DELAY));
//! let job = Job::new(13, DateRange::new(date(2023, 4, 23), date(2023, 4, 29))?)
//!     .with_output("events.csv");
//! let outcome = run_job(&mut walker, &job, None::<&mut ConsoleReporter<io::Stdout>>)?;
//! ```

pub mod config;
pub mod export;
pub mod fetcher;
pub mod listing;
pub mod query;
pub mod report;
pub mod walker;

use std::{io::Write, path::PathBuf};

use log::{info, warn};

use crate::error::ListingsError;
use export::ExportProfile;
use fetcher::PageSource;
use listing::ExportRecord;
use report::ConsoleReporter;
use walker::{DateRange, DateWindowWalker, WaitPolicy, WalkReport};

/// What to fetch and where to put it.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub area: i64,
    pub range: DateRange,
    pub profile: ExportProfile,
    /// No export when `None`.
    pub output: Option<PathBuf>,
}

impl Job {
    pub fn new(area: i64, range: DateRange) -> Self {
        Self {
            area,
            range,
            profile: ExportProfile::default(),
            output: None,
        }
    }

    pub fn with_profile(mut self, profile: ExportProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

#[derive(Debug)]
pub struct JobOutcome {
    pub walk: WalkReport,
    pub records: Vec<ExportRecord>,
    /// Listings that could not be normalized.
    pub dropped: usize,
    /// Data rows written, `None` if nothing was exported.
    pub rows_written: Option<usize>,
}

/// Walk, normalize, export.
///
/// Fetch failures are logged and end their sweep only; whatever was
/// collected is still exported.  Only an export failure is an error.
pub fn run_job<S, W, O>(
    walker: &mut DateWindowWalker<S, W>,
    job: &Job,
    mut reporter: Option<&mut ConsoleReporter<O>>,
) -> Result<JobOutcome, ListingsError>
where
    S: PageSource,
    W: WaitPolicy,
    O: Write,
{
    let walk = walker.walk(job.area, job.range, |items| {
        if let Some(reporter) = reporter.as_deref_mut() {
            if let Err(e) = reporter.report_page(items) {
                warn!("Can't print page: {}", e);
            }
        }
    });
    for failure in walk.failures() {
        warn!("Incomplete sweep: {}", failure);
    }

    let (records, dropped) = listing::normalize_items(&walk.items);
    info!(
        "{} listings fetched, {} exportable, {} dropped",
        walk.items.len(),
        records.len(),
        dropped
    );

    let rows_written = match &job.output {
        Some(path) => Some(export::export(&records, path, job.profile)?),
        None => None,
    };
    Ok(JobOutcome {
        walk,
        records,
        dropped,
        rows_written,
    })
}
