//! Command handlers.
//!
//! Thin wrappers that map one CLI subcommand onto the library: build a
//! session, feed it events, print the result. Errors come back as
//! user-facing strings.
//!
//! Multi-step flows live in pipeline.rs and session/.

use crate::capture::StillImageCamera;
use crate::cli::{Commands, FieldArgs, SaveArgs};
use crate::export::GlyphRasterizer;
use crate::form::Field;
use crate::ocr::heuristics::{self, ExtractedFields};
use crate::ocr::TesseractEngine;
use crate::session::{ScanOutcome, Session};
use crate::settings::{self, AppConfig};
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

pub async fn dispatch(command: Commands, config: &AppConfig) -> Result<(), String> {
    match command {
        Commands::Extract { file } => {
            let fields = extract_text(file.as_deref())?;
            print_json(&fields)
        }
        Commands::Scan { image } => {
            let mut session = build_session(config, Some(&image));
            let outcome = scan(&mut session).await?;
            eprintln!("{}", outcome.message());
            print_json(session.record())
        }
        Commands::Save(args) => save(config, args).await,
        Commands::Status(fields) => {
            let mut session = build_session(config, None);
            fill_fields(&mut session, &fields)?;
            print_json(&Status {
                record: session.record(),
                controls: session.controls(),
                strict_secondary_id: session.validator().is_strict(),
            })
        }
        Commands::Config { write } => {
            if write {
                let path = settings::config_path();
                settings::save_config_file(&path, config)?;
                eprintln!("Wrote {}", path.display());
            }
            print_json(config)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Status<'a> {
    record: &'a crate::form::FormRecord,
    controls: crate::session::Controls,
    strict_secondary_id: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

/// Extract card fields from OCR text in `file`, or stdin.
pub fn extract_text(file: Option<&Path>) -> Result<ExtractedFields, String> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            buf
        }
    };
    let fields = heuristics::extract(&text);
    log::info!(
        "[EXTRACT] {} chars in, primary_id found: {}, name found: {}",
        text.len(),
        !fields.primary_id.is_empty(),
        !fields.name.is_empty()
    );
    Ok(fields)
}

/// Session wired from config. The camera reads `image` when given.
fn build_session(config: &AppConfig, image: Option<&Path>) -> Session {
    let mut session = Session::new(config.validator())
        .with_scan_enabled(config.enable_scan)
        .with_export_options(config.export_options());
    if let Some(path) = image {
        session = session.with_scanner(
            Arc::new(StillImageCamera::new(path)),
            Arc::new(TesseractEngine::new(config.ocr.clone())),
            config.camera.clone(),
        );
    }
    session
}

/// Type each provided value into its field.
fn fill_fields(session: &mut Session, fields: &FieldArgs) -> Result<(), String> {
    let typed = [
        (Field::PrimaryId, fields.aadhaar.as_deref()),
        (Field::Name, fields.name.as_deref()),
        (Field::SecondaryId, fields.usc.as_deref()),
    ];
    for (field, value) in typed {
        if let Some(raw) = value {
            session.handle_change(field, raw).map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

/// Open the scanner, capture and recognize.
async fn scan(session: &mut Session) -> Result<ScanOutcome, String> {
    session.start_scan().map_err(|e| e.to_string())?;

    let mut last = None;
    let result = session
        .capture_and_scan(|pct| {
            if last != Some(pct) {
                last = Some(pct);
                eprint!("\rScanning: {}%", pct);
                let _ = std::io::stderr().flush();
            }
        })
        .await;
    eprintln!();
    result.map_err(|e| e.to_string())
}

/// Scan (optional), type, validate, then export.
///
/// The font is only looked up once the record is known to be saveable, so
/// an incomplete form always reports the missing field first.
async fn save(config: &AppConfig, args: SaveArgs) -> Result<(), String> {
    let mut config = config.clone();
    if let Some(out) = args.out {
        config.output_dir = Some(out);
    }

    let mut session = build_session(&config, args.image.as_deref());
    if args.image.is_some() {
        match scan(&mut session).await {
            Ok(outcome) => eprintln!("{}", outcome.message()),
            Err(e) => eprintln!("{}", e),
        }
    }
    fill_fields(&mut session, &args.fields)?;
    session
        .validator()
        .validate_for_save(session.record())
        .map_err(|e| e.to_string())?;

    let rasterizer = GlyphRasterizer::discover(config.font_path.as_deref())
        .map_err(|e| format!("Failed to save image. Please try again. ({})", e))?;
    let mut session = session.with_rasterizer(Arc::new(rasterizer));

    let saved = session.save().await.map_err(|e| e.to_string())?;
    eprintln!("Saved {}", saved.path.display());
    print_json(&saved)
}
