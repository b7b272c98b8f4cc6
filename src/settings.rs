//! App configuration and its sources.
//!
//! Layers, later wins:
//! 1. built-in defaults
//! 2. `~/.config/idcard-form/config.json` (platform config dir)
//! 3. environment (`.env.local` / `.env` are loaded into it at startup)
//! 4. command-line flags, applied by the caller

use crate::capture::CaptureConstraints;
use crate::export::{SnapshotStyle, DEFAULT_JPEG_QUALITY, DEFAULT_SCALE, MAX_SCALE};
use crate::form::FieldValidator;
use crate::ocr::OcrSettings;
use crate::session::ExportOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "idcard-form";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Cap the USC number at 13 digits and require all 13 to save.
    pub strict_secondary_id: bool,
    pub enable_scan: bool,
    pub ocr: OcrSettings,
    pub camera: CaptureConstraints,
    pub export_quality: u8,
    /// Device-pixel ratio of the export, clamped to `1..=8`.
    pub export_scale: u32,
    /// Defaults to the Downloads folder.
    pub output_dir: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            strict_secondary_id: true,
            enable_scan: true,
            ocr: OcrSettings::default(),
            camera: CaptureConstraints::default(),
            export_quality: DEFAULT_JPEG_QUALITY,
            export_scale: DEFAULT_SCALE,
            output_dir: None,
            font_path: None,
        }
    }
}

/// Directory holding the config file.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Load `.env.local`, falling back to `.env`, from the working directory.
pub fn load_env_files() {
    for env_file in [".env.local", ".env"] {
        let path = Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => log::debug!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break;
        }
    }
}

/// Read a config file. Missing or invalid files yield defaults.
pub fn load_config_file(path: &Path) -> AppConfig {
    match std::fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("[CONFIG] Ignoring invalid {}: {}", path.display(), e);
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// Persist `config` as pretty JSON, creating the directory if needed.
pub fn save_config_file(path: &Path, config: &AppConfig) -> Result<(), String> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write config: {}", e))?;
    log::info!("[CONFIG] Saved {}", path.display());
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    /// Defaults, then the config file, then the process environment.
    pub fn load() -> Self {
        let mut config = load_config_file(&config_path());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Override fields from environment-style variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("IDCARD_STRICT_SECONDARY_ID") {
            match parse_bool(&raw) {
                Some(v) => self.strict_secondary_id = v,
                None => log::warn!("[CONFIG] Invalid IDCARD_STRICT_SECONDARY_ID: {}", raw),
            }
        }
        if let Some(raw) = lookup("IDCARD_ENABLE_SCAN") {
            match parse_bool(&raw) {
                Some(v) => self.enable_scan = v,
                None => log::warn!("[CONFIG] Invalid IDCARD_ENABLE_SCAN: {}", raw),
            }
        }
        if let Some(lang) = lookup("OCR_LANG").filter(|l| !l.trim().is_empty()) {
            self.ocr.language = lang.trim().to_string();
        }
        if let Some(raw) = lookup("IDCARD_EXPORT_QUALITY") {
            match raw.trim().parse::<u8>() {
                Ok(q) if (1..=100).contains(&q) => self.export_quality = q,
                _ => log::warn!("[CONFIG] Invalid IDCARD_EXPORT_QUALITY: {}", raw),
            }
        }
        if let Some(dir) = lookup("IDCARD_OUTPUT_DIR").filter(|d| !d.is_empty()) {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(font) = lookup("IDCARD_FONT_PATH").filter(|f| !f.is_empty()) {
            self.font_path = Some(PathBuf::from(font));
        }
    }

    pub fn validator(&self) -> FieldValidator {
        FieldValidator::new(self.strict_secondary_id)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            quality: self.export_quality,
            style: SnapshotStyle {
                scale: self.export_scale.clamp(1, MAX_SCALE),
                ..SnapshotStyle::default()
            },
            output_dir: self.output_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_strict_with_scan() {
        let c = AppConfig::default();
        assert!(c.strict_secondary_id);
        assert!(c.enable_scan);
        assert_eq!(c.export_quality, 95);
        assert_eq!(c.export_scale, 2);
        assert!(c.validator().is_strict());
    }

    #[test]
    fn env_overrides() {
        let mut c = AppConfig::default();
        c.apply_env(env(&[
            ("IDCARD_STRICT_SECONDARY_ID", "false"),
            ("IDCARD_ENABLE_SCAN", "0"),
            ("OCR_LANG", "eng+hin"),
            ("IDCARD_EXPORT_QUALITY", "80"),
            ("IDCARD_OUTPUT_DIR", "/tmp/cards"),
        ]));
        assert!(!c.strict_secondary_id);
        assert!(!c.enable_scan);
        assert_eq!(c.ocr.language, "eng+hin");
        assert_eq!(c.export_quality, 80);
        assert_eq!(c.output_dir(), PathBuf::from("/tmp/cards"));
    }

    #[test]
    fn bad_env_values_are_ignored() {
        let mut c = AppConfig::default();
        c.apply_env(env(&[
            ("IDCARD_STRICT_SECONDARY_ID", "maybe"),
            ("IDCARD_EXPORT_QUALITY", "0"),
            ("OCR_LANG", "  "),
        ]));
        assert_eq!(c, AppConfig::default());
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let c = load_config_file(Path::new("/nonexistent/idcard-form/config.json"));
        assert_eq!(c, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = std::env::temp_dir().join("idcard-form-test-config-partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "strictSecondaryId": false, "ocr": { "language": "hin" } }"#)
            .unwrap();

        let c = load_config_file(&path);
        assert!(!c.strict_secondary_id);
        assert_eq!(c.ocr.language, "hin");
        assert_eq!(c.ocr.psm, OcrSettings::default().psm);
        assert!(c.enable_scan);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join("idcard-form-test-config-roundtrip");
        let path = dir.join(CONFIG_FILE);
        let config = AppConfig {
            enable_scan: false,
            font_path: Some(PathBuf::from("/fonts/x.ttf")),
            ..Default::default()
        };
        save_config_file(&path, &config).unwrap();
        assert_eq!(load_config_file(&path), config);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn export_options_follow_config() {
        let c = AppConfig {
            export_quality: 70,
            export_scale: 0,
            output_dir: Some(PathBuf::from("out")),
            ..Default::default()
        };
        let opts = c.export_options();
        assert_eq!(opts.quality, 70);
        assert_eq!(opts.style.scale, 1);
        assert_eq!(opts.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn oversized_scale_from_file_is_clamped() {
        let c = AppConfig {
            export_scale: 1_000_000,
            ..Default::default()
        };
        assert_eq!(c.export_options().style.scale, MAX_SCALE);
    }
}
