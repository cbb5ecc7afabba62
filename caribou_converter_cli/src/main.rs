//! # caribou_converter_cli
//!
//! Part of the caribou_converter crate family.
//!
//! This is the application to convert Caribou raw data to standard events from the
//! command line.
//!
//! ## Use
//!
//! Make a template configuration with
//!
//! ```bash
//! caribou_converter_cli -p config.yml new
//! ```
//!
//! edit it, then convert with
//!
//! ```bash
//! caribou_converter_cli -p config.yml
//! ```
//!
//! Add `-v` to write decoder debug information to the log file `caribou_converter.log`.
use clap::{Arg, ArgAction, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use libcaribou_converter::config::Config;
use libcaribou_converter::process::process;
use libcaribou_converter::worker_status::WorkerStatus;

const LOG_FILE: &str = "./caribou_converter.log";

/// Route library logging to a file, at debug level when verbose
fn init_library_logging(verbose: bool) -> Result<(), spdlog::Error> {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from(LOG_FILE))
            .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()?,
    );
    let level = if verbose {
        spdlog::LevelFilter::All
    } else {
        spdlog::LevelFilter::MoreSevereEqual(spdlog::Level::Info)
    };
    let logger = Arc::new(
        spdlog::Logger::builder()
            .level_filter(level)
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()?,
    );
    spdlog::set_default_logger(logger);
    Ok(())
}

fn make_template_config(path: &Path) {
    match Config::default().write_config_file(path) {
        Ok(()) => log::info!("Done."),
        Err(e) => log::error!("Could not write template config: {e}"),
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("caribou_converter_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log decoder debug information"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }

    if let Err(e) = init_library_logging(matches.get_flag("verbose")) {
        log::warn!("Could not open log file {LOG_FILE}: {e}");
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(path) => PathBuf::from(path),
        None => {
            log::error!("A configuration path is required");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(&config_path);
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Raw Path: {}", config.raw_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!("Detector Type: {}", config.detector_type);
    for (key, value) in config.parameters.iter() {
        match serde_yaml::to_string(value) {
            Ok(text) => log::info!("  {key}: {}", text.trim_end()),
            Err(e) => log::warn!("  {key}: {e}"),
        }
    }

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    // Spawn the task!
    let handle = std::thread::spawn(|| process(config, tx));

    let mut last_status = WorkerStatus::default();
    loop {
        // No UI here, so sleep a bit before checking for updates
        std::thread::sleep(std::time::Duration::from_millis(250));
        while let Ok(status) = rx.try_recv() {
            last_status = status;
        }
        pb.set_position((last_status.progress * 100.0) as u64);

        if handle.is_finished() {
            match handle.join() {
                Ok(result) => match result {
                    Ok(summary) => {
                        log::info!(
                            "Successfully converted data! {} of {} events converted ({} read).",
                            summary.events_converted,
                            summary.events_read,
                            human_bytes::human_bytes(summary.total_bytes as f64)
                        );
                        if summary.events_dropped > 0 {
                            log::warn!(
                                "{} events were not converted. See {LOG_FILE} for details.",
                                summary.events_dropped
                            );
                        }
                    }
                    Err(e) => log::error!("Conversion failed with error: {e}"),
                },
                Err(_) => log::error!("Failed to join conversion task!"),
            }
            break;
        }
    }

    pb.finish();

    log::info!("Done.");
}
