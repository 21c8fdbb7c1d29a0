//! gf-logging: NDJSON run events + run manifests.
//!
//! Each `gf` run appends one JSON object per line to `<logs_dir>/events.ndjson`
//! and keeps `<logs_dir>/run.json` (a [`RunManifestV1`]) current for post-mortems.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run manifest schema version.
pub const RUN_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifestV1 {
    pub run_manifest_version: u32,

    pub run_id: String,
    pub command: String,
    pub created_ts_ms: u64,
    pub completed_ts_ms: Option<u64>,

    // Hashes for reproducibility.
    pub git_hash: Option<String>,
    pub config_hash: Option<String>,

    // Layout.
    pub games_dir: String,
    pub feature_set_dir: String,
    pub matrices_file: String,
    pub logs_dir: String,

    // Feature set.
    pub feature_set: String,
    pub features: Vec<String>,
    pub dimensionality: u64,

    // Counters.
    pub games_scanned: u64,
    pub datums_written: u64,
    pub rows_written: u64,
}

pub fn now_ms() -> u64 {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    d.as_millis() as u64
}

pub fn hash_config_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn try_git_hash() -> Option<String> {
    use std::process::Command;

    let out = Command::new("git").args(["rev-parse", "HEAD"]).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8(out.stdout).ok()?;
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

pub fn read_manifest(path: impl AsRef<Path>) -> Result<RunManifestV1, NdjsonError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice::<RunManifestV1>(&bytes)?)
}

pub fn write_manifest_atomic(path: impl AsRef<Path>, m: &RunManifestV1) -> Result<(), NdjsonError> {
    let path = path.as_ref();
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(m)?;
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Emitted once per feature after its vocabulary is frozen.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureInitEventV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub run_id: String,

    pub feature_set: String,
    pub feature: String,
    pub kind: String,
    pub dimensionality: u64,
    /// `None` for features without a vocabulary (embeddings).
    pub vocabulary_size: Option<u64>,
}

impl FeatureInitEventV1 {
    pub const EVENT: &'static str = "feature_init";
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputeProgressEventV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub run_id: String,

    pub game: String,
    pub games_done: u64,
    pub examples_done: u64,
}

impl ComputeProgressEventV1 {
    pub const EVENT: &'static str = "compute_progress";
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputeDoneEventV1 {
    pub event: &'static str,
    pub ts_ms: u64,
    pub run_id: String,

    pub feature_set: String,
    pub games: u64,
    pub datums: u64,
    pub rows: u64,
    pub dimensionality: u64,
    pub elapsed_ms: u64,
}

impl ComputeDoneEventV1 {
    pub const EVENT: &'static str = "compute_done";
}

#[derive(Debug)]
pub enum NdjsonError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for NdjsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NdjsonError::Io(e) => write!(f, "io: {e}"),
            NdjsonError::Json(e) => write!(f, "json: {e}"),
        }
    }
}

impl std::error::Error for NdjsonError {}

impl From<io::Error> for NdjsonError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for NdjsonError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Append-only NDJSON writer.
///
/// Contract: each call writes exactly one JSON object followed by a newline.
pub struct NdjsonWriter {
    w: BufWriter<File>,
    lines_since_flush: u64,
    flush_every_lines: u64,
}

impl NdjsonWriter {
    /// Open a file for append. Creates it if it doesn't exist.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, NdjsonError> {
        Self::open_append_with_flush(path, 0)
    }

    /// `flush_every_lines=0` disables periodic flushing.
    pub fn open_append_with_flush(
        path: impl AsRef<Path>,
        flush_every_lines: u64,
    ) -> Result<Self, NdjsonError> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            w: BufWriter::new(f),
            lines_since_flush: 0,
            flush_every_lines,
        })
    }

    pub fn write_event<T: Serialize>(&mut self, event: &T) -> Result<(), NdjsonError> {
        let mut buf = serde_json::to_vec(event)?;
        buf.push(b'\n');
        self.w.write_all(&buf)?;
        self.lines_since_flush += 1;
        if self.flush_every_lines > 0 && self.lines_since_flush >= self.flush_every_lines {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), NdjsonError> {
        self.w.flush()?;
        self.lines_since_flush = 0;
        Ok(())
    }
}
