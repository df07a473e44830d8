use std::env;
use std::io::{self, Write};
use std::process;

use compass_client::{
    create_client, ics, parser, CalendarEvent, CalendarUser, ClientOptions, CompassApi,
    Credentials,
};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

mod cli;

fn setup_logging() {
    let filter = EnvFilter::try_from_env("COMPASS_LOG")
        .unwrap_or_else(|_| EnvFilter::new("compass_client=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: cli::Args, client: &mut dyn CompassApi) -> Result<String, Box<dyn std::error::Error>> {
    client.login()?;

    if args.user {
        let raw = client.user_details(None)?;
        let user: CalendarUser = parser::parse(&raw)?;
        return Ok(serde_json::to_string_pretty(&user)?);
    }

    let raw = client.calendar_events(&args.start, &args.end, args.limit)?;
    let (events, errors) = parser::parse_safe::<CalendarEvent>(&raw, true);
    for err in &errors {
        warn!(error = %err, raw = %err.raw_data(), "skipping calendar event");
    }

    Ok(match args.format {
        cli::Format::Json => serde_json::to_string_pretty(&events)?,
        cli::Format::Ics => ics::calendar("Compass", &events).to_string(),
    })
}

fn main() {
    dotenvy::dotenv().ok();
    let args = cli::parse(env::args().skip(1).collect());
    setup_logging();

    let credentials = Credentials::from_env();
    let mut options = ClientOptions::from_env();
    if let Some(dir) = args.mock_data_dir.clone() {
        options = options.with_mock_data_dir(dir);
    }

    let mut client = match create_client(
        &credentials.base_url,
        &credentials.username,
        &credentials.password,
        args.mode.as_deref(),
        &options,
    ) {
        Ok(client) => client,
        Err(err) => {
            error!("{err}");
            process::exit(1);
        }
    };

    let result = run(args, client.as_mut());
    client.close();

    match result {
        Ok(output) => {
            let mut stdout = io::stdout().lock();
            if writeln!(stdout, "{output}").is_err() {
                process::exit(1);
            }
        }
        Err(err) => {
            error!("{err}");
            process::exit(1);
        }
    }
}
