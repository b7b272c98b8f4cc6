//! Form session: the form record plus everything that may change it.
//!
//! A `Session` is driven by discrete events (keystroke, clear, scan,
//! capture, close, save) on a single logical thread. Scanning and saving
//! are guarded by [`SessionState`] so only one long-running operation can
//! be in flight. The camera stream is held in a [`StreamGuard`] and is
//! released on every exit path from the scanner.

mod state;

pub use state::{Controls, SessionEvent, SessionState, TransitionError};

use crate::capture::{CameraError, CameraProvider, CaptureConstraints, StreamGuard};
use crate::export::{self, ExportError, Rasterizer, SnapshotStyle};
use crate::form::{Field, FieldValidator, FormRecord, ValidationError};
use crate::ocr::heuristics::ExtractedFields;
use crate::ocr::{OcrEngine, OcrError, PROGRESS_DONE};
use crate::pipeline::{self, SavedExport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unable to access camera. {0}")]
    CameraUnavailable(#[from] CameraError),
    #[error("Error processing image. Please try again or enter manually. ({0})")]
    RecognitionFailure(#[from] OcrError),
    #[error("Could not extract Aadhaar details. Please try again or enter manually.")]
    NoDataExtracted,
    #[error(transparent)]
    ValidationFailure(#[from] ValidationError),
    #[error("Failed to save image. Please try again. ({0})")]
    ExportFailure(#[from] ExportError),
    #[error("Scanning is disabled")]
    ScanDisabled,
    #[error(transparent)]
    Busy(#[from] TransitionError),
}

/// Export parameters taken from config.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub quality: u8,
    pub style: SnapshotStyle,
    pub output_dir: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            quality: export::DEFAULT_JPEG_QUALITY,
            style: SnapshotStyle::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// What a successful scan changed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub extracted: ExtractedFields,
    pub char_count: usize,
    pub ocr_ms: u128,
}

impl ScanOutcome {
    /// User-facing summary, asking for the rest to be checked by hand.
    pub fn message(&self) -> String {
        let mut msg = String::from("Scanned successfully!\n");
        if !self.extracted.primary_id.is_empty() {
            msg.push_str(&format!("Aadhaar Number: {}\n", self.extracted.primary_id));
        }
        if !self.extracted.name.is_empty() {
            msg.push_str(&format!("Name: {}\n", self.extracted.name));
        }
        msg.push_str("\nPlease verify and complete the remaining fields.");
        msg
    }
}

struct Scanner {
    camera: Arc<dyn CameraProvider>,
    ocr: Arc<dyn OcrEngine>,
    constraints: CaptureConstraints,
}

pub struct Session {
    validator: FieldValidator,
    record: FormRecord,
    state: SessionState,
    scan_enabled: bool,
    scanner: Option<Scanner>,
    stream: Option<StreamGuard>,
    rasterizer: Option<Arc<dyn Rasterizer>>,
    export: ExportOptions,
}

impl Session {
    pub fn new(validator: FieldValidator) -> Self {
        Self {
            validator,
            record: FormRecord::new(),
            state: SessionState::Idle,
            scan_enabled: true,
            scanner: None,
            stream: None,
            rasterizer: None,
            export: ExportOptions::default(),
        }
    }

    pub fn with_scanner(
        mut self,
        camera: Arc<dyn CameraProvider>,
        ocr: Arc<dyn OcrEngine>,
        constraints: CaptureConstraints,
    ) -> Self {
        self.scanner = Some(Scanner {
            camera,
            ocr,
            constraints,
        });
        self
    }

    pub fn with_scan_enabled(mut self, enabled: bool) -> Self {
        self.scan_enabled = enabled;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export = options;
        self
    }

    pub fn record(&self) -> &FormRecord {
        &self.record
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn validator(&self) -> &FieldValidator {
        &self.validator
    }

    pub fn camera_active(&self) -> bool {
        self.stream.as_ref().is_some_and(StreamGuard::is_active)
    }

    pub fn controls(&self) -> Controls {
        let s = self.state;
        Controls {
            scan: self.scan_enabled && s.allows(SessionEvent::StartScan),
            capture: s.allows(SessionEvent::Capture),
            close_scanner: s.allows(SessionEvent::CloseScanner),
            save: s.allows(SessionEvent::StartSave) && self.validator.can_save(&self.record),
            clear: s.allows(SessionEvent::Clear),
            edit: s.allows(SessionEvent::Edit),
        }
    }

    fn transition(&mut self, event: SessionEvent) -> Result<(), TransitionError> {
        let next = self.state.next(event)?;
        if next != self.state {
            log::debug!("[SESSION] {:?} --{:?}--> {:?}", self.state, event, next);
        }
        self.state = next;
        Ok(())
    }

    /// Keystroke or paste into one field.
    pub fn handle_change(&mut self, field: Field, raw: &str) -> Result<&FormRecord, SessionError> {
        self.transition(SessionEvent::Edit)?;
        self.record = self.validator.apply(field, raw, &self.record);
        Ok(&self.record)
    }

    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.transition(SessionEvent::Clear)?;
        self.record = FormRecord::new();
        log::info!("[SESSION] Form cleared");
        Ok(())
    }

    /// Open the camera and show the scanner.
    pub fn start_scan(&mut self) -> Result<(), SessionError> {
        if !self.scan_enabled {
            return Err(SessionError::ScanDisabled);
        }
        // Check the guard before touching the device.
        self.state.next(SessionEvent::StartScan)?;
        let scanner = self
            .scanner
            .as_ref()
            .ok_or(SessionError::CameraUnavailable(CameraError::Unsupported))?;

        let stream = scanner.camera.request_stream(&scanner.constraints).map_err(|e| {
            log::error!("[CAPTURE] Error accessing camera: {}", e);
            SessionError::CameraUnavailable(e)
        })?;
        self.stream = Some(StreamGuard::new(stream));
        self.transition(SessionEvent::StartScan)?;
        Ok(())
    }

    /// Close the scanner without capturing.
    pub fn close_scanner(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Idle {
            return Ok(());
        }
        self.transition(SessionEvent::CloseScanner)?;
        self.release_camera();
        Ok(())
    }

    fn release_camera(&mut self) {
        release(&mut self.stream);
    }

    /// Grab a frame, release the camera, then run OCR and fill the form.
    ///
    /// `progress` receives coarse percentages (0-100). Only non-empty
    /// extracted values overwrite the form, and they go through the
    /// validator like typed input. Dropping the future before it resolves
    /// leaves the session idle with the form untouched.
    pub async fn capture_and_scan<F>(&mut self, mut progress: F) -> Result<ScanOutcome, SessionError>
    where
        F: FnMut(u8),
    {
        let busy = BusyGuard::enter(
            &mut self.state,
            SessionEvent::Capture,
            SessionEvent::RecognitionFinished,
        )?;

        let frame = self
            .stream
            .as_mut()
            .map(StreamGuard::capture_frame)
            .unwrap_or(Err(CameraError::Capture("camera stream missing".into())));
        release(&mut self.stream);

        let ocr = self.scanner.as_ref().map(|s| Arc::clone(&s.ocr));
        let result = match (frame, ocr) {
            (Ok(frame), Some(ocr)) => pipeline::scan_frame(ocr, frame, &mut progress)
                .await
                .map_err(SessionError::from),
            (Ok(_), None) => Err(SessionError::CameraUnavailable(CameraError::Unsupported)),
            (Err(e), _) => Err(SessionError::CameraUnavailable(e)),
        };
        drop(busy);

        let scan = result.inspect_err(|e| log::error!("[PIPELINE] Scan failed: {}", e))?;
        if scan.fields.is_empty() {
            log::info!("[EXTRACT] No card fields found in {} chars", scan.ocr.char_count);
            return Err(SessionError::NoDataExtracted);
        }

        if !scan.fields.primary_id.is_empty() {
            self.record = self
                .validator
                .apply(Field::PrimaryId, &scan.fields.primary_id, &self.record);
        }
        if !scan.fields.name.is_empty() {
            self.record = self.validator.apply(Field::Name, &scan.fields.name, &self.record);
        }
        progress(PROGRESS_DONE);

        Ok(ScanOutcome {
            extracted: scan.fields,
            char_count: scan.ocr.char_count,
            ocr_ms: scan.ocr.latency_ms,
        })
    }

    pub async fn save(&mut self) -> Result<SavedExport, SessionError> {
        self.save_at(Utc::now()).await
    }

    /// Export the form as an image named after `captured_at`.
    ///
    /// Nothing is written unless every save constraint holds. Dropping the
    /// future before it resolves returns the session to idle.
    pub async fn save_at(&mut self, captured_at: DateTime<Utc>) -> Result<SavedExport, SessionError> {
        self.state.next(SessionEvent::StartSave)?;
        self.validator.validate_for_save(&self.record)?;
        let rasterizer = self
            .rasterizer
            .as_ref()
            .map(Arc::clone)
            .ok_or(ExportError::NoRasterizer)?;

        let snapshot = export::snapshot(&self.record, &self.export.style);
        let quality = self.export.quality;
        let output_dir = self.export.output_dir.clone();

        let busy = BusyGuard::enter(&mut self.state, SessionEvent::StartSave, SessionEvent::SaveFinished)?;
        let result = pipeline::export_snapshot(
            rasterizer,
            snapshot,
            quality,
            output_dir,
            export::export_file_name(captured_at),
        )
        .await;
        drop(busy);

        result.map_err(|e| {
            log::error!("[EXPORT] Error saving image: {}", e);
            SessionError::ExportFailure(e)
        })
    }
}

fn release(stream: &mut Option<StreamGuard>) {
    if let Some(mut guard) = stream.take() {
        guard.release();
    }
}

/// Holds the session in a busy state until dropped.
///
/// The finishing transition runs on every exit path, including when the
/// owning future is dropped mid-await.
struct BusyGuard<'a> {
    state: &'a mut SessionState,
    finish: SessionEvent,
}

impl<'a> BusyGuard<'a> {
    fn enter(
        state: &'a mut SessionState,
        start: SessionEvent,
        finish: SessionEvent,
    ) -> Result<Self, TransitionError> {
        let next = state.next(start)?;
        log::debug!("[SESSION] {:?} --{:?}--> {:?}", state, start, next);
        *state = next;
        Ok(Self { state, finish })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        match self.state.next(self.finish) {
            Ok(next) => {
                log::debug!("[SESSION] {:?} --{:?}--> {:?}", self.state, self.finish, next);
                *self.state = next;
            }
            Err(e) => log::error!("[SESSION] {}", e),
        }
    }
}
