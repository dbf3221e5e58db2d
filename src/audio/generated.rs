use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rodio::{Decoder, Source};
use tempfile::NamedTempFile;

use crate::error::AppError;

const STAGING_PREFIX: &str = "voicegen-";
const STAGING_SUFFIX: &str = ".wav";

/// Format details of a payload, when the bytes can be decoded locally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub duration: Duration,
}

/// Audio returned by the speech server, staged in a temporary file.
///
/// The staged file is the local reference used for downloads. It is removed
/// when the value is released or dropped.
pub struct GeneratedAudio {
    bytes: Arc<Vec<u8>>,
    staged: NamedTempFile,
    info: Option<AudioInfo>,
}

impl GeneratedAudio {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AppError> {
        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(STAGING_SUFFIX)
            .tempfile()
            .context("Failed creating staging file for generated audio")
            .map_err(AppError::from)?;
        staged
            .write_all(&bytes)
            .and_then(|()| staged.flush())
            .context("Failed staging generated audio")
            .map_err(AppError::from)?;

        let info = probe(&bytes);
        if info.is_none() {
            log::debug!("Generated audio ({} bytes) could not be decoded locally", bytes.len());
        }
        Ok(Self {
            bytes: Arc::new(bytes),
            staged,
            info,
        })
    }

    pub fn path(&self) -> &Path {
        self.staged.path()
    }

    pub fn bytes(&self) -> Arc<Vec<u8>> {
        self.bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn info(&self) -> Option<AudioInfo> {
        self.info
    }

    /// Copies the staged payload to `dest`, returning the number of bytes written.
    pub fn save_to(&self, dest: &Path) -> Result<u64, AppError> {
        fs::copy(self.staged.path(), dest)
            .with_context(|| format!("Failed writing {}", dest.display()))
            .map_err(AppError::from)
    }

    pub fn release(self) {
        let path = self.staged.path().to_path_buf();
        match self.staged.close() {
            Ok(()) => log::debug!("Released {}", path.display()),
            Err(err) => log::warn!("Failed removing {}: {err}", path.display()),
        }
    }
}

fn probe(bytes: &[u8]) -> Option<AudioInfo> {
    probe_wav(bytes).or_else(|| probe_with_rodio(bytes))
}

fn probe_wav(bytes: &[u8]) -> Option<AudioInfo> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    let frames = reader.duration();
    Some(AudioInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        duration: Duration::from_secs_f64(frames as f64 / spec.sample_rate as f64),
    })
}

fn probe_with_rodio(bytes: &[u8]) -> Option<AudioInfo> {
    let decoder = Decoder::new(Cursor::new(bytes.to_vec())).ok()?;
    let sample_rate = decoder.sample_rate();
    let channels = decoder.channels();
    if sample_rate == 0 || channels == 0 {
        return None;
    }
    let duration = match decoder.total_duration() {
        Some(duration) => duration,
        None => {
            let samples = decoder.count() as f64;
            Duration::from_secs_f64(samples / channels as f64 / sample_rate as f64)
        }
    };
    Some(AudioInfo {
        sample_rate,
        channels,
        duration,
    })
}
