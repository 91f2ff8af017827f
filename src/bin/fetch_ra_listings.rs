use std::{error::Error, io, path::Path, path::PathBuf, time::Duration};

use clap::Parser;
use jiff::civil::Date;
use log::{error, info};

use ra_listings::ra::{
    config::{self, ApiConfig},
    export::ExportProfile,
    fetcher::PageFetcher,
    query::QueryTemplate,
    report::{sweep_table, ConsoleReporter},
    run_job,
    walker::{DateRange, DateWindowWalker, FixedDelay},
    Job,
};

#[derive(Parser, Debug)]
#[command(version, about = "Fetch event listings from ra.co and save them to a CSV file", long_about = None)]
struct Args {
    /// The area code to filter events, e.g. 13 for London
    area: i64,

    /// Start date for event listings (inclusive), e.g. 2023-04-23
    start_date: Date,

    /// End date for event listings (inclusive), e.g. 2023-04-29
    end_date: Date,

    /// Output file path.  Defaults to events.csv or artists.csv depending on the profile
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Column layout of the output file
    #[arg(short, long, value_enum, default_value_t = ExportProfile::Events)]
    profile: ExportProfile,

    /// GraphQL query template
    #[arg(short, long, default_value = "resources/graphql_query_template.json")]
    template: PathBuf,

    /// Seconds to wait between pages.  Overrides RA_DELAY_SECS
    #[arg(long, value_parser = parse_delay)]
    delay: Option<Duration>,

    /// Number of listings per page
    #[arg(long)]
    page_size: Option<u32>,

    /// Print every listing as it is fetched
    #[arg(long)]
    print: bool,

    /// Don't write the output file
    #[arg(long)]
    no_export: bool,

    /// Environment name, e.g., test, prod.  Loads .env/<env>.env if it exists
    #[arg(short, long, default_value = "prod")]
    env: String,
}

fn parse_delay(value: &str) -> Result<Duration, String> {
    config::parse_secs("delay", value).map_err(|e| e.to_string())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let env_file = format!(".env/{}.env", args.env);
    if Path::new(&env_file).exists() {
        dotenvy::from_path(Path::new(&env_file))?;
    }

    let range = DateRange::new(args.start_date, args.end_date)?;
    let mut template = QueryTemplate::from_path(&args.template)?;
    if let Some(page_size) = args.page_size {
        template = template.with_page_size(page_size);
    }
    let api = ApiConfig::from_env()?;
    let delay = match args.delay {
        Some(delay) => delay,
        None => config::delay_from_env()?,
    };
    info!("Querying {} for area {} over {}", api.endpoint, args.area, range);

    let fetcher = PageFetcher::new(api)?;
    let mut walker = DateWindowWalker::new(template, fetcher, FixedDelay(delay));

    let mut job = Job::new(args.area, range).with_profile(args.profile);
    if !args.no_export {
        let output = args
            .output
            .unwrap_or_else(|| PathBuf::from(args.profile.default_output()));
        job = job.with_output(output);
    }

    let mut reporter = ConsoleReporter::stdout();
    let reporter: Option<&mut ConsoleReporter<io::Stdout>> = args.print.then_some(&mut reporter);
    let outcome = run_job(&mut walker, &job, reporter)?;

    info!("Sweeps:\n{}", sweep_table(&outcome.walk.sweeps));
    let failures = outcome.walk.failures().count();
    if failures > 0 {
        error!("{} sweep(s) ended early, the export may be incomplete", failures);
    }
    match (&job.output, outcome.rows_written) {
        (Some(path), Some(n)) => info!("{} listings saved to {}", n, path.display()),
        _ => info!("{} listings fetched, nothing exported", outcome.records.len()),
    }

    Ok(())
}
