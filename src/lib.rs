//! idcard-form: identity-card form filler.
//!
//! This is the library root: module declarations and the CLI entry point.
//! No business logic lives here.
//!
//! Domains:
//!   - form/     : the card record and per-field input masking
//!   - capture/  : camera stream interface + still-image camera
//!   - ocr/      : OCR engine interface, Tesseract backend, field heuristics
//!   - export/   : pure form snapshot, rasterizer, JPEG output
//!   - session/  : state machine tying the flows together
//!
//! Glue:
//!   - pipeline.rs : scan and export orchestration with stage timings
//!   - commands.rs : one handler per CLI subcommand
//!   - settings.rs : config file + environment layering

pub mod capture;
pub mod cli;
mod commands;
pub mod export;
pub mod form;
pub mod ocr;
pub mod pipeline;
pub mod session;
pub mod settings;

use clap::Parser;
use cli::Cli;
use settings::AppConfig;

/// Entry point: called by the binary.
pub fn run() {
    settings::load_env_files();
    env_logger::init();

    let cli = Cli::parse();
    let mut config = AppConfig::load();
    if cli.relaxed {
        config.strict_secondary_id = false;
    }
    if cli.no_scan {
        config.enable_scan = false;
    }
    log::info!(
        "idcard-form starting (strict_secondary_id={}, enable_scan={})",
        config.strict_secondary_id,
        config.enable_scan
    );

    // Single logical thread; OCR and rasterization go to the blocking pool.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(commands::dispatch(cli.command, &config)) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
