use super::*;
use clap::Parser;
use clap::Subcommand;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(
    name = "webtracker",
    version,
    about = "Heuristic page-safety checks and navigation interception"
)]
pub(super) struct Cli {
    #[arg(
        long,
        global = true,
        env = "RUST_LOG",
        default_value = "info",
        help = "Log filter directive (e.g. `debug`, `wt_browser=trace`)"
    )]
    log_level: String,
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub(super) enum Command {
    /// Evaluate a single URL against the heuristics.
    Check { url: String },
    /// Replay recorded host events (JSON lines; `-` reads stdin).
    Replay {
        input: PathBuf,
        #[arg(long, help = "Run as if the host had no session storage")]
        no_session_store: bool,
    },
    /// Decode an interstitial URL into what the warning page shows.
    Warning { location: String },
}

pub(crate) fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match execute(&cli, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("webtracker error: {error}");
            ExitCode::FAILURE
        }
    }
}

pub(super) fn execute(cli: &Cli, out: &mut dyn Write) -> TrackerResult<()> {
    let config = ExtensionConfig::from_env();
    config.validate()?;
    debug!(base = %config.extension_base_url, "loaded extension config");

    match &cli.command {
        Command::Check { url } => runtime::check(&config, url, cli.json, out),
        Command::Replay {
            input,
            no_session_store,
        } => {
            let reader = open_input(input)?;
            runtime::replay(config, reader, !no_session_store, cli.json, out)
        }
        Command::Warning { location } => runtime::warning(location, cli.json, out),
    }
}

fn open_input(path: &Path) -> TrackerResult<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(std::io::BufReader::new(std::io::stdin())));
    }

    let file = std::fs::File::open(path).map_err(|error| {
        TrackerError::new(
            "cli.input_open_failed",
            format!("failed to open replay input `{}`: {error}", path.display()),
        )
    })?;
    Ok(Box::new(std::io::BufReader::new(file)))
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
