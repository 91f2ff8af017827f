use std::{fs, io, path::Path};

use clap::ValueEnum;
use itertools::Itertools;
use log::info;

use super::listing::ExportRecord;
use crate::error::ExportError;

const EVENTS_HEADER: [&str; 8] = [
    "Event name",
    "Date",
    "Start Time",
    "End Time",
    "Artists",
    "Venue",
    "Event URL",
    "Number of guests attending",
];

const ARTISTS_HEADER: [&str; 4] = ["Event name", "Date", "Artists", "Venue"];

/// Column layout of the export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportProfile {
    /// All columns, timestamps exactly as received, artists joined with `, `
    #[default]
    Events,
    /// Title, readable date, artists joined with ` | `, venue
    Artists,
}

impl ExportProfile {
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            ExportProfile::Events => &EVENTS_HEADER,
            ExportProfile::Artists => &ARTISTS_HEADER,
        }
    }

    pub fn default_output(&self) -> &'static str {
        match self {
            ExportProfile::Events => "events.csv",
            ExportProfile::Artists => "artists.csv",
        }
    }

    pub fn artist_separator(&self) -> &'static str {
        match self {
            ExportProfile::Events => ", ",
            ExportProfile::Artists => " | ",
        }
    }

    /// The cells of one row, in header order.
    pub fn row(&self, record: &ExportRecord) -> Vec<String> {
        let artists = record.artists.iter().join(self.artist_separator());
        match self {
            ExportProfile::Events => vec![
                record.title.clone(),
                record.date.clone(),
                record.start_time.clone(),
                record.end_time.clone(),
                artists,
                record.venue.clone(),
                record.url.clone(),
                record
                    .attending
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
            ],
            ExportProfile::Artists => vec![
                record.title.clone(),
                record.display_date(),
                artists,
                record.venue.clone(),
            ],
        }
    }
}

/// Write the header and one row per record.
pub fn write_csv<W: io::Write>(
    out: W,
    records: &[ExportRecord],
    profile: ExportProfile,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(profile.header())?;
    for record in records {
        wtr.write_record(profile.row(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the records to `destination`, replacing any existing file.
/// Returns the number of data rows written.
pub fn export(
    records: &[ExportRecord],
    destination: &Path,
    profile: ExportProfile,
) -> Result<usize, ExportError> {
    if let Some(dir) = destination.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = fs::File::create(destination)?;
    write_csv(file, records, profile)?;
    info!(
        "Wrote {} rows to {}",
        records.len(),
        destination.display()
    );
    Ok(records.len())
}
