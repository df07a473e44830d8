use std::env;
use std::path::PathBuf;
use std::process;

use chrono::{Duration, Utc};
use getopts::Options;

use compass_client::range::DATE_FORMAT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Ics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub mode: Option<String>,
    pub start: String,
    pub end: String,
    pub limit: usize,
    pub user: bool,
    pub format: Format,
    pub mock_data_dir: Option<PathBuf>,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "m",
        "mode",
        "Client to use, 'real' or 'mock' [Default: $COMPASS_MODE or real]",
        "MODE",
    );
    opts.optopt("s", "start", "First day to fetch [Default: today]", "YYYY-MM-DD");
    opts.optopt(
        "e",
        "end",
        "Last day to fetch [Default: 30 days after start]",
        "YYYY-MM-DD",
    );
    opts.optopt("l", "limit", "Maximum number of events [Default: 100]", "COUNT");
    opts.optflag("u", "user", "Fetch the user's details instead of events");
    opts.optopt("f", "format", "Output format, 'json' or 'ics' [Default: json]", "FORMAT");
    opts.optopt(
        "d",
        "mock-data-dir",
        "Fixture directory for mock mode [Default: bundled fixtures]",
        "DIR",
    );
    opts
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(err) => fail(err),
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
        process::exit(0);
    }

    let today = Utc::now().date_naive();
    let start = matches
        .opt_str("start")
        .unwrap_or_else(|| today.format(DATE_FORMAT).to_string());
    let end = matches.opt_str("end").unwrap_or_else(|| {
        (today + Duration::days(30))
            .format(DATE_FORMAT)
            .to_string()
    });

    let limit = match matches.opt_get_default("limit", 100) {
        Ok(limit) => limit,
        Err(err) => fail(format!("Provided value for option 'limit' is invalid: {err}")),
    };

    let format = match matches.opt_str("format").as_deref() {
        None | Some("json") => Format::Json,
        Some("ics") => Format::Ics,
        Some(other) => fail(format!(
            "Provided value for option 'format' is invalid: {other}"
        )),
    };

    Args {
        mode: matches.opt_str("mode"),
        start,
        end,
        limit,
        user: matches.opt_present("user"),
        format,
        mock_data_dir: matches.opt_str("mock-data-dir").map(PathBuf::from),
    }
}
