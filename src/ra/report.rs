use std::io::{self, Write};

use itertools::Itertools;
use tabled::{builder::Builder, settings::Style};

use super::{listing::RawListingItem, walker::SweepSummary};

pub const RULE_WIDTH: usize = 80;

/// Prints every listing of a page as soon as it arrives.  Purely
/// observational, nothing here feeds the export.
pub struct ConsoleReporter<W> {
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn report_page(&mut self, items: &[RawListingItem]) -> io::Result<()> {
        for item in items {
            self.write_listing(item)?;
            writeln!(self.out, "{}", "-".repeat(RULE_WIDTH))?;
        }
        self.out.flush()
    }

    fn write_listing(&mut self, item: &RawListingItem) -> io::Result<()> {
        let event = match item.event_fields() {
            Ok(event) => event,
            Err(e) => {
                return writeln!(self.out, "Listing {}: {}", item.id().unwrap_or("?"), e);
            }
        };
        let na = || "n/a".to_string();
        writeln!(self.out, "Event name: {}", event.title.clone().unwrap_or_else(na))?;
        writeln!(self.out, "Date: {}", event.date.clone().unwrap_or_else(na))?;
        writeln!(self.out, "Start Time: {}", event.start_time.clone().unwrap_or_else(na))?;
        writeln!(self.out, "End Time: {}", event.end_time.clone().unwrap_or_else(na))?;
        writeln!(self.out, "Artists: {}", event.artist_names().iter().join(", "))?;
        writeln!(self.out, "Venue: {}", event.venue_name().unwrap_or("n/a"))?;
        writeln!(self.out, "Event URL: {}", event.content_url.clone().unwrap_or_else(na))?;
        writeln!(
            self.out,
            "Number of guests attending: {}",
            event.attending.map_or_else(na, |n| n.to_string())
        )
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// One line per sweep: window, requests, records and how it ended.
pub fn sweep_table(sweeps: &[SweepSummary]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["From", "To", "Requests", "Records", "Outcome"]);
    for sweep in sweeps {
        builder.push_record(vec![
            sweep.window.0.to_string(),
            sweep.window.1.to_string(),
            sweep.pages_requested.to_string(),
            sweep.records.to_string(),
            match &sweep.failure {
                Some(e) => format!("failed: {}", e),
                None => "complete".to_string(),
            },
        ]);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    table
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use jiff::civil::date;
    use serde_json::json;

    use super::*;
    use crate::{error::FetchError, ra::listing::tests::listing};

    #[test]
    fn one_block_per_listing() -> Result<(), Box<dyn Error>> {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.report_page(&[listing(1, "Warehouse"), listing(2, "Basement")])?;
        let text = String::from_utf8(reporter.into_inner())?;

        let rule = "-".repeat(80);
        assert_eq!(text.lines().filter(|l| *l == rule).count(), 2);
        assert!(text.starts_with("Event name: Warehouse\nDate: 2023-04-23T00:00:00.000\n"));
        assert!(text.contains("Artists: Ben UFO, Joy Orbison\n"));
        assert!(text.contains("Venue: Fabric\n"));
        assert!(text.contains("Number of guests attending: 42\n"));
        Ok(())
    }

    #[test]
    fn incomplete_listing_still_printed() -> Result<(), Box<dyn Error>> {
        let mut reporter = ConsoleReporter::new(Vec::new());
        reporter.report_page(&[
            RawListingItem(json!({"id": "9", "event": {"title": "Bare"}})),
            RawListingItem(json!({"id": "10"})),
        ])?;
        let text = String::from_utf8(reporter.into_inner())?;
        assert!(text.contains("Venue: n/a\n"));
        assert!(text.contains("Listing 10: missing required field `event`\n"));
        Ok(())
    }

    #[test]
    fn table_of_sweeps() {
        let sweeps = vec![
            SweepSummary {
                window: (date(2023, 4, 23), date(2023, 4, 29)),
                pages_requested: 3,
                records: 40,
                failure: None,
            },
            SweepSummary {
                window: (date(2023, 4, 25), date(2023, 4, 29)),
                pages_requested: 1,
                records: 0,
                failure: Some(FetchError::Api {
                    payload: "{}".to_string(),
                }),
            },
        ];
        let text = sweep_table(&sweeps).to_string();
        assert!(text.contains("2023-04-23"));
        assert!(text.contains("complete"));
        assert!(text.contains("failed: unexpected response payload: {}"));
    }
}
