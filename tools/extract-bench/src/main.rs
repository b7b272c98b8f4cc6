//! Card field extraction benchmark for idcard-form.
//!
//! Runs the same OCR + heuristics path the scanner uses over a directory
//! of samples and prints one CSV row per file. Text files (`.txt`) skip
//! OCR and go straight to extraction, so heuristics can be checked
//! against saved transcripts without tesseract installed.
//!
//! Usage:
//!   extract-bench <file>                      Single sample, key/value output
//!   extract-bench --batch <directory>         All samples in directory → CSV
//!   extract-bench --batch <dir> --lang hin    Use another tesseract language
//!   extract-bench ... --warm                  Probe the engine before timing

use idcard_form_lib::ocr::heuristics::{self, ExtractedFields};
use idcard_form_lib::ocr::{OcrEngine, OcrSettings, TesseractEngine};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

struct Sample {
    source: &'static str,
    chars: usize,
    ocr_ms: Option<f64>,
    extract_us: u128,
    fields: ExtractedFields,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage:");
        eprintln!("  extract-bench <file> [--lang <code>] [--warm]");
        eprintln!("  extract-bench --batch <directory> [--lang <code>] [--warm]");
        std::process::exit(1);
    }

    let mut settings = OcrSettings::default();
    if let Some(pos) = args.iter().position(|a| a == "--lang") {
        match args.get(pos + 1) {
            Some(lang) => settings.language = lang.clone(),
            None => {
                eprintln!("--lang requires a language code");
                std::process::exit(1);
            }
        }
    }
    let engine = TesseractEngine::new(settings);

    if args.contains(&"--warm".to_string()) {
        let warm_start = Instant::now();
        match engine.warm_up() {
            Ok(()) => eprintln!(
                "[WARM-UP] tesseract ready in {:.1}ms",
                warm_start.elapsed().as_micros() as f64 / 1000.0
            ),
            Err(e) => eprintln!("[WARM-UP] {}", e),
        }
    }

    if args[1] == "--batch" {
        let Some(dir) = args.get(2) else {
            eprintln!("--batch requires a directory path");
            std::process::exit(1);
        };
        run_batch(&engine, Path::new(dir));
    } else {
        run_single(&engine, Path::new(&args[1]));
    }
}

fn is_text(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "txt")
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// OCR (images only) then extract, timing each stage separately.
fn process(engine: &TesseractEngine, path: &Path) -> Result<Sample, String> {
    let (text, source, ocr_ms) = if is_text(path) {
        let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        (text, "text", None)
    } else {
        let image = image::open(path).map_err(|e| e.to_string())?;
        let start = Instant::now();
        let output = engine.recognize(&image).map_err(|e| e.to_string())?;
        let wall_ms = start.elapsed().as_micros() as f64 / 1000.0;
        (output.text, "ocr", Some(wall_ms))
    };

    let start = Instant::now();
    let fields = heuristics::extract(&text);
    let extract_us = start.elapsed().as_micros();

    Ok(Sample {
        source,
        chars: text.chars().count(),
        ocr_ms,
        extract_us,
        fields,
    })
}

fn run_single(engine: &TesseractEngine, path: &Path) {
    if !path.is_file() {
        eprintln!("File not found: {}", path.display());
        std::process::exit(1);
    }
    match process(engine, path) {
        Ok(sample) => {
            println!("source:      {}", sample.source);
            println!("chars:       {}", sample.chars);
            if let Some(ms) = sample.ocr_ms {
                println!("ocr_ms:      {:.1}", ms);
            }
            println!("extract_us:  {}", sample.extract_us);
            println!("primary_id:  {}", sample.fields.primary_id);
            println!("name:        {}", sample.fields.name);
        }
        Err(e) => {
            eprintln!("{}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn run_batch(engine: &TesseractEngine, dir: &Path) {
    if !dir.is_dir() {
        eprintln!("Not a directory: {}", dir.display());
        std::process::exit(1);
    }

    let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(read) => read
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_text(p) || is_image(p))
            .collect(),
        Err(e) => {
            eprintln!("Failed to read {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    };
    entries.sort();

    if entries.is_empty() {
        eprintln!("No samples found in {}", dir.display());
        std::process::exit(1);
    }

    println!("filename,source,chars,ocr_ms,extract_us,primary_id,name");

    let mut ocr_ms: Vec<f64> = Vec::new();
    let mut extract_us: Vec<f64> = Vec::new();
    let mut found_id = 0usize;
    let mut found_name = 0usize;
    let mut failed = 0usize;

    for path in &entries {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match process(engine, path) {
            Ok(sample) => {
                println!(
                    "{},{},{},{},{},{},{}",
                    filename,
                    sample.source,
                    sample.chars,
                    sample.ocr_ms.map(|ms| format!("{:.1}", ms)).unwrap_or_default(),
                    sample.extract_us,
                    sample.fields.primary_id,
                    sample.fields.name
                );
                if let Some(ms) = sample.ocr_ms {
                    ocr_ms.push(ms);
                }
                extract_us.push(sample.extract_us as f64);
                found_id += usize::from(!sample.fields.primary_id.is_empty());
                found_name += usize::from(!sample.fields.name.is_empty());
            }
            Err(e) => {
                failed += 1;
                eprintln!("[SKIP] {}: {}", filename, e);
            }
        }

        std::io::stdout().flush().ok();
    }

    let processed = entries.len() - failed;
    eprintln!("\n--- Extraction Summary ---");
    eprintln!("  Samples processed: {} ({} failed)", processed, failed);
    eprintln!("  Aadhaar number found: {}", hit_rate(found_id, processed));
    eprintln!("  Name found: {}", hit_rate(found_name, processed));

    if let Some(stats) = Timing::from_samples(&ocr_ms) {
        stats.report("ocr", "ms", Some(OCR_BUDGET_MS));
    }
    if let Some(stats) = Timing::from_samples(&extract_us) {
        stats.report("extract", "us", None);
    }
}

/// Scans slower than this at the median feel stuck behind the progress bar.
const OCR_BUDGET_MS: f64 = 1500.0;

fn hit_rate(hits: usize, total: usize) -> String {
    if total == 0 {
        return "0/0".to_string();
    }
    format!("{}/{} ({:.0}%)", hits, total, hits as f64 * 100.0 / total as f64)
}

/// Order statistics for one pipeline stage.
#[derive(Debug, PartialEq)]
struct Timing {
    median: f64,
    p99: f64,
    max: f64,
}

impl Timing {
    fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        // Nearest-rank percentile.
        let rank = (n * 99).div_ceil(100);
        Some(Self {
            median,
            p99: sorted[rank - 1],
            max: sorted[n - 1],
        })
    }

    fn report(&self, stage: &str, unit: &str, budget: Option<f64>) {
        let verdict = match budget {
            Some(b) if self.median <= b => format!("  within {:.0}{}", b, unit),
            Some(b) => format!("  OVER {:.0}{}", b, unit),
            None => String::new(),
        };
        eprintln!(
            "  [{}] median {:.1}{u} / p99 {:.1}{u} / max {:.1}{u}{}",
            stage,
            self.median,
            self.p99,
            self.max,
            verdict,
            u = unit
        );
    }
}
