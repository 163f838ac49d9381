use clap::Parser;
use colored::Colorize;
use env_logger::{Builder, Env};
use log::{error, info, Level};
use std::io::Write;

use zverolov::color_utils;
use zverolov::color_utils::symbols;
use zverolov::config::{DetectCommand, DetectionConfig, GlobalArgs};
use zverolov::detector::run_detection;
use zverolov::model_session::{DEFAULT_MODEL_PATH, MODEL_PATH_ENV_VAR};

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Detect animals in images and annotate them
    Detect(DetectCommand),

    /// Show version information
    Version,
}

#[derive(Parser)]
#[command(name = "zverolov")]
#[command(about = "Animal detection and annotation for camera-trap imagery")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn get_log_level_from_verbosity(
    verbosity: clap_verbosity_flag::Verbosity<clap_verbosity_flag::ErrorLevel>,
) -> log::LevelFilter {
    let base_level = verbosity.log_level_filter();
    let adjusted_level = match base_level {
        log::LevelFilter::Off => log::LevelFilter::Off, // -qq -> OFF
        log::LevelFilter::Error => log::LevelFilter::Warn, // default -> WARN
        log::LevelFilter::Warn => log::LevelFilter::Info, // -v -> INFO
        log::LevelFilter::Info => log::LevelFilter::Debug, // -vv -> DEBUG
        log::LevelFilter::Debug => log::LevelFilter::Trace, // -vvv -> TRACE
        log::LevelFilter::Trace => log::LevelFilter::Trace, // -vvvv -> TRACE (max)
    };

    // clap-verbosity-flag can't distinguish default from -q, so check the
    // quiet flag directly
    if verbosity.is_silent() {
        log::LevelFilter::Error // -q -> ERROR
    } else {
        adjusted_level
    }
}

fn main() {
    let cli = Cli::parse();

    color_utils::init_color_config(cli.global.no_color);

    // If user didn't pass -v/-q and RUST_LOG is set, honor the env var.
    let use_env = !cli.global.verbosity.is_present() && std::env::var_os("RUST_LOG").is_some();

    let mut logger = if use_env {
        Builder::from_env(Env::default())
    } else {
        let level_filter = get_log_level_from_verbosity(cli.global.verbosity.clone());

        let mut b = Builder::new();
        b.filter_level(level_filter);
        b
    };

    logger
        .format(|buf, record| {
            let level_str = match record.level() {
                Level::Error => "ERROR".red().bold().to_string(),
                Level::Warn => "WARN".yellow().to_string(),
                Level::Info => "INFO".green().to_string(),
                Level::Debug => "DEBUG".blue().to_string(),
                Level::Trace => "TRACE".magenta().to_string(),
            };
            writeln!(buf, "[{}] {}", level_str, record.args())
        })
        .init();

    match cli.command {
        Some(Commands::Detect(detect_cmd)) => {
            let sources_desc = if detect_cmd.sources.len() == 1 {
                detect_cmd.sources[0].clone()
            } else {
                format!("{} inputs", detect_cmd.sources.len())
            };

            info!(
                "{} Animal detection: {} | conf: {} | IoU: {} | device: {}",
                symbols::detection_start(),
                sources_desc,
                detect_cmd.confidence,
                detect_cmd.iou_threshold,
                cli.global.device
            );

            let mut outputs = Vec::new();
            outputs.push("report");
            if detect_cmd.bounding_box {
                outputs.push("bounding-boxes");
            }
            if detect_cmd.json {
                outputs.push("json");
            }
            info!("   Outputs: {}", outputs.join(", "));

            let config = DetectionConfig::from_args(cli.global, detect_cmd);
            match run_detection(config) {
                Ok(_) => {}
                Err(e) => {
                    error!("{} Detection failed: {e}", symbols::operation_failed());
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Version) => {
            println!("zverolov v{}", env!("CARGO_PKG_VERSION"));
            let model = std::env::var(MODEL_PATH_ENV_VAR)
                .unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string());
            println!("Default model: {model}");
        }
        None => {
            // Show help if no command specified
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            let _ = cmd.print_help();
        }
    }
}
