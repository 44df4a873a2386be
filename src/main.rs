use std::{error::Error, io, process, time::Duration};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, LevelFilter};
use uuid::Uuid;

use tunegrab::{
    config::{Config, Secrets},
    locator::Locator,
    pipeline::Pipeline,
    tracker::{TaskState, TaskStore},
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// How often task progress is polled and reported.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Track or playlist URLs to download
    ///
    /// Spotify track and playlist links, YouTube video and playlist
    /// links, and `spotify:` URIs are accepted. Playlists are detected
    /// from the URL and expanded into one download per track.
    #[arg(required = true, value_name = "URL", value_hint = ValueHint::Url)]
    urls: Vec<String>,

    /// Secrets file
    ///
    /// Ensure that this file is kept secure and not shared publicly, as
    /// it contains an access token that can grant access to your
    /// Spotify account.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"))]
    secrets_file: String,

    /// Directory to write audio files into
    #[arg(short, long, value_name = "DIR", value_hint = ValueHint::DirPath, default_value_t = String::from("downloads"))]
    output_dir: String,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Parameters
///
/// - `config`: a `&Args` with the command line arguments.
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // The default level here and the verbosity mapping below are
        // coupled; change them together.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            // `clap` keeps the two flags mutually exclusive, so zero
            // verbosity in this branch means quiet mode.
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(env!("CARGO_PKG_NAME"), level);
    }

    logger.init();
}

/// Loads the secrets from a file.
///
/// # Errors
///
/// This function returns an error if the file could not be read. This could be
/// due to the file not existing or not having the correct permissions.
fn load_secrets(secrets_file: &str) -> io::Result<Secrets> {
    let secrets = Secrets::from_file(secrets_file);

    if let Err(ref e) = secrets {
        if e.kind() == io::ErrorKind::NotFound {
            info!("read the documentation on how to set your access token in {secrets_file}");
        }
    }

    secrets
}

/// Submits every URL and returns the IDs of the track-level tasks to
/// wait on. Playlist parents are not waited on; their children are.
async fn submit_all(pipeline: &std::sync::Arc<Pipeline>, urls: &[String]) -> Vec<Uuid> {
    let mut ids = Vec::new();

    for url in urls {
        if Locator::classify(url).is_playlist() {
            match pipeline.submit_playlist(url).await {
                Ok(submission) => {
                    info!(
                        "playlist {url} expanded into {} downloads",
                        submission.children.len()
                    );
                    ids.extend(submission.children);
                }
                Err(e) => error!("{url}: {e}"),
            }
        } else {
            ids.push(pipeline.submit(url));
        }
    }

    ids
}

/// Polls the store until every submitted task is terminal, then reports
/// per-task outcomes. Returns the number of failed tasks.
async fn wait_for_tasks(store: &TaskStore, ids: &[Uuid]) -> usize {
    loop {
        let done = ids
            .iter()
            .filter_map(|id| store.get(*id))
            .filter(|record| record.state.is_terminal())
            .count();
        if done == ids.len() {
            break;
        }

        debug!("{done}/{} tasks done", ids.len());
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    let mut failures = 0;
    for id in ids {
        let Some(record) = store.get(*id) else {
            continue;
        };

        if record.state == TaskState::Failed {
            failures += 1;
            let cause = record.error.as_deref().unwrap_or("unknown cause");
            error!("{} - {}: {cause}", record.artist, record.track);
        } else if let Some(path) = &record.file_path {
            info!("{} - {}: {}", record.artist, record.track, path.display());
        }
    }

    failures
}

/// Main application logic: builds the pipeline, submits the URLs, and
/// waits for all downloads to settle.
///
/// # Errors
///
/// This function returns an error when the secrets file cannot be read
/// or the pipeline cannot be constructed. Per-download failures are
/// reported but do not abort the other downloads.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let secrets = load_secrets(&args.secrets_file)?;

    let mut config = Config::with_secrets(secrets);
    config.download_dir = args.output_dir.clone().into();
    std::fs::create_dir_all(&config.download_dir)?;

    let store = TaskStore::new();
    let pipeline = Pipeline::new(&config, store.clone())?;

    let ids = submit_all(&pipeline, &args.urls).await;
    if ids.is_empty() {
        return Err("no downloads could be started".into());
    }

    let failures = tokio::select! {
        // Prioritize shutdown signals.
        biased;

        _ = tokio::signal::ctrl_c() => {
            info!("shutting down gracefully");
            return Ok(());
        }

        failures = wait_for_tasks(&store, &ids) => failures,
    };

    if failures > 0 {
        return Err(format!("{failures} of {} downloads failed", ids.len()).into());
    }

    info!("all {} downloads completed", ids.len());
    Ok(())
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and starts the main application logic.
#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(&args);

    // Log the parsed arguments early; they contextualize everything after.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}
