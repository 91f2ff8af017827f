use std::{fmt, thread, time::Duration};

use jiff::{civil::Date, Span};
use log::{error, info};

use super::{
    fetcher::{FetchResult, PageSource},
    listing::RawListingItem,
    query::{QueryFilter, QueryTemplate},
};
use crate::error::{ConfigError, FetchError};

/// Inclusive date range requested by the caller, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

/// What to do between two pages of a sweep.
pub trait WaitPolicy {
    fn wait(&mut self);
}

/// Sleep for a fixed duration after every page.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl WaitPolicy for FixedDelay {
    fn wait(&mut self) {
        if !self.0.is_zero() {
            thread::sleep(self.0);
        }
    }
}

/// Don't wait at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWait;

impl WaitPolicy for NoWait {
    fn wait(&mut self) {}
}

/// What happened during one sweep.
#[derive(Debug)]
pub struct SweepSummary {
    pub window: (Date, Date),
    /// Number of requests issued, the terminating one included.
    pub pages_requested: u32,
    pub records: usize,
    pub failure: Option<FetchError>,
}

/// Everything collected during a walk, in the order the server returned it.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub items: Vec<RawListingItem>,
    pub sweeps: Vec<SweepSummary>,
}

impl WalkReport {
    pub fn failures(&self) -> impl Iterator<Item = &FetchError> {
        self.sweeps.iter().filter_map(|sweep| sweep.failure.as_ref())
    }
}

/// Move the window start forward by one day per record of the previous sweep.
///
/// This mirrors the upstream scripts and is only exact when an area has at
/// most one listing per day.  With more listings per day the next window
/// skips days; see DESIGN.md.  Returns `None` if the date overflows.
pub fn advance_window(start: Date, records: usize) -> Option<Date> {
    let days = i64::try_from(records).ok()?;
    let span = Span::new().try_days(days).ok()?;
    start.checked_add(span).ok()
}

/// Drives a [`PageSource`] through successive sweeps until the requested
/// range is covered.
pub struct DateWindowWalker<S, W> {
    template: QueryTemplate,
    source: S,
    wait: W,
}

impl<S: PageSource, W: WaitPolicy> DateWindowWalker<S, W> {
    pub fn new(template: QueryTemplate, source: S, wait: W) -> Self {
        Self {
            template,
            source,
            wait,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Request pages 1, 2, 3, ... of `filter` until an empty page or a failure.
    /// Listings are appended to `items`; `on_page` sees every non-empty page
    /// as soon as it arrives.
    pub fn sweep<F>(
        &mut self,
        filter: &mut QueryFilter,
        items: &mut Vec<RawListingItem>,
        on_page: &mut F,
    ) -> SweepSummary
    where
        F: FnMut(&[RawListingItem]),
    {
        let mut page: u32 = 1;
        let mut records = 0;
        let failure = loop {
            match self.source.fetch_page(filter, page) {
                FetchResult::Page(batch) => {
                    on_page(&batch);
                    records += batch.len();
                    items.extend(batch);
                    self.wait.wait();
                    page += 1;
                }
                FetchResult::Exhausted => break None,
                FetchResult::Failed(e) => {
                    error!("Page {} of sweep {:?} failed: {}", page, filter.window(), e);
                    break Some(e);
                }
            }
        };
        SweepSummary {
            window: filter.window(),
            pages_requested: page,
            records,
            failure,
        }
    }

    /// Walk `range` for `area`.
    ///
    /// Each sweep covers `[current_start, range.end()]`.  After a sweep with `k`
    /// records the start moves `k` days forward.  The walk stops when the
    /// start passes the end date or when a sweep brings nothing back.  A
    /// failed page only ends its own sweep.
    pub fn walk<F>(&mut self, area: i64, range: DateRange, mut on_page: F) -> WalkReport
    where
        F: FnMut(&[RawListingItem]),
    {
        let mut report = WalkReport::default();
        let mut start = range.start();
        while start <= range.end() {
            info!("Sweeping area {} from {} to {}", area, start, range.end());
            let mut filter = self.template.build(area, start, range.end());
            let summary = self.sweep(&mut filter, &mut report.items, &mut on_page);
            let records = summary.records;
            info!(
                "Sweep from {} done: {} records in {} requests",
                start, records, summary.pages_requested
            );
            report.sweeps.push(summary);
            if records == 0 {
                break;
            }
            match advance_window(start, records) {
                Some(next) => start = next,
                None => break,
            }
        }
        report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{cell::RefCell, collections::VecDeque, error::Error};

    use jiff::civil::date;
    use reqwest::StatusCode;

    use super::*;
    use crate::ra::listing::tests::listing;

    /// Serves a fixed sequence of answers and remembers what was asked.
    pub(crate) struct ScriptedSource {
        script: RefCell<VecDeque<FetchResult>>,
        pub calls: RefCell<Vec<((Date, Date), u32)>>,
    }

    impl ScriptedSource {
        pub(crate) fn new(script: Vec<FetchResult>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl PageSource for ScriptedSource {
        fn fetch_page(&self, filter: &mut QueryFilter, page: u32) -> FetchResult {
            filter.set_page(page);
            self.calls.borrow_mut().push((filter.window(), filter.page()));
            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or(FetchResult::Exhausted)
        }
    }

    #[derive(Default)]
    struct CountingWait(usize);

    impl WaitPolicy for &mut CountingWait {
        fn wait(&mut self) {
            self.0 += 1;
        }
    }

    pub(crate) fn page(from: usize, n: usize) -> FetchResult {
        FetchResult::Page((from..from + n).map(|i| listing(i, &format!("Event {}", i))).collect())
    }

    fn template() -> QueryTemplate {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Info)
            .is_test(true)
            .try_init();
        include_str!("../../resources/graphql_query_template.json")
            .parse()
            .unwrap()
    }

    #[test]
    fn single_day_sweep_stops_at_first_empty_page() -> Result<(), Box<dyn Error>> {
        let day = date(2023, 4, 23);
        let source = ScriptedSource::new(vec![page(0, 3), page(3, 2), FetchResult::Exhausted]);
        let mut wait = CountingWait::default();
        let mut walker = DateWindowWalker::new(template(), source, &mut wait);
        let mut seen = Vec::new();
        let report = walker.walk(13, DateRange::new(day, day)?, |batch| seen.push(batch.len()));

        let pages: Vec<u32> = walker.source().calls.borrow().iter().map(|c| c.1).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(seen, vec![3, 2]);
        assert_eq!(report.items.len(), 5);
        assert_eq!(report.items[4].id(), Some("4"));
        assert_eq!(report.sweeps.len(), 1);
        assert_eq!(report.sweeps[0].pages_requested, 3);
        assert_eq!(wait.0, 2);
        Ok(())
    }

    #[test]
    fn window_advances_by_record_count() -> Result<(), Box<dyn Error>> {
        let range = DateRange::new(date(2023, 4, 1), date(2023, 4, 10))?;
        let source = ScriptedSource::new(vec![
            page(0, 3),
            FetchResult::Exhausted,
            page(3, 2),
            FetchResult::Exhausted,
            FetchResult::Exhausted,
        ]);
        let mut walker = DateWindowWalker::new(template(), source, NoWait);
        let report = walker.walk(13, range, |_| {});

        let windows: Vec<(Date, Date)> = report.sweeps.iter().map(|s| s.window).collect();
        assert_eq!(
            windows,
            vec![
                (date(2023, 4, 1), date(2023, 4, 10)),
                (date(2023, 4, 4), date(2023, 4, 10)),
                (date(2023, 4, 6), date(2023, 4, 10)),
            ]
        );
        assert_eq!(report.items.len(), 5);
        assert_eq!(walker.source().calls.borrow().len(), 5);
        Ok(())
    }

    #[test]
    fn empty_sweep_terminates() -> Result<(), Box<dyn Error>> {
        let range = DateRange::new(date(2023, 4, 1), date(2023, 4, 30))?;
        let source = ScriptedSource::new(vec![FetchResult::Exhausted]);
        let mut walker = DateWindowWalker::new(template(), source, NoWait);
        let report = walker.walk(13, range, |_| {});
        assert_eq!(report.sweeps.len(), 1);
        assert!(report.items.is_empty());
        assert_eq!(walker.source().calls.borrow().len(), 1);
        Ok(())
    }

    #[test]
    fn walk_stops_past_end_date() -> Result<(), Box<dyn Error>> {
        let range = DateRange::new(date(2023, 4, 1), date(2023, 4, 3))?;
        let source = ScriptedSource::new(vec![page(0, 5), FetchResult::Exhausted]);
        let mut walker = DateWindowWalker::new(template(), source, NoWait);
        let report = walker.walk(13, range, |_| {});
        assert_eq!(report.sweeps.len(), 1);
        assert_eq!(report.items.len(), 5);
        Ok(())
    }

    #[test]
    fn failed_page_keeps_partial_results() -> Result<(), Box<dyn Error>> {
        let day = date(2023, 4, 23);
        let source = ScriptedSource::new(vec![
            page(0, 20),
            FetchResult::Failed(FetchError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "oops".to_string(),
            }),
            page(20, 20),
        ]);
        let mut walker = DateWindowWalker::new(template(), source, NoWait);
        let report = walker.walk(13, DateRange::new(day, day)?, |_| {});
        assert_eq!(report.items.len(), 20);
        assert_eq!(report.sweeps[0].pages_requested, 2);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].to_string().contains("500"));
        Ok(())
    }

    #[test]
    fn advance_rule() {
        assert_eq!(advance_window(date(2023, 4, 23), 20), Some(date(2023, 5, 13)));
        assert_eq!(advance_window(date(2023, 4, 23), 0), Some(date(2023, 4, 23)));
        assert_eq!(advance_window(date(9999, 12, 1), 100), None);
    }

    #[test]
    fn invalid_range() {
        assert!(matches!(
            DateRange::new(date(2023, 4, 24), date(2023, 4, 23)),
            Err(ConfigError::InvalidDateRange { .. })
        ));
        let range = DateRange::new(date(2023, 4, 23), date(2023, 4, 23)).unwrap();
        assert_eq!(range.to_string(), "2023-04-23/2023-04-23");
    }
}
