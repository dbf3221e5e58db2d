use std::io::Cursor;
use std::time::{Duration, Instant};

use crate::audio::GeneratedAudio;
use crate::error::AppError;

/// Preview playback of generated audio on the default output device.
pub struct AudioPlayer {
    _stream: rodio::OutputStream,
    handle: rodio::OutputStreamHandle,
    current: Option<Playback>,
}

struct Playback {
    sink: rodio::Sink,
    started: Instant,
    duration: Option<Duration>,
}

impl AudioPlayer {
    pub fn new() -> Result<Self, AppError> {
        let (stream, handle) = rodio::OutputStream::try_default()
            .map_err(|err| AppError::Audio(format!("Output device error: {err}")))?;
        Ok(Self {
            _stream: stream,
            handle,
            current: None,
        })
    }

    pub fn play(&mut self, audio: &GeneratedAudio) -> Result<(), AppError> {
        self.stop();
        let cursor = Cursor::new((*audio.bytes()).clone());
        let decoder = rodio::Decoder::new(cursor)
            .map_err(|err| AppError::Audio(format!("Decode error: {err}")))?;
        let sink = rodio::Sink::try_new(&self.handle)
            .map_err(|err| AppError::Audio(format!("Audio sink error: {err}")))?;
        sink.append(decoder);
        sink.play();
        self.current = Some(Playback {
            sink,
            started: Instant::now(),
            duration: audio.info().map(|info| info.duration),
        });
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(playback) = self.current.take() {
            playback.sink.stop();
        }
    }

    pub fn refresh(&mut self) {
        if let Some(playback) = &self.current {
            if playback.sink.empty() {
                self.current = None;
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current
            .as_ref()
            .map(|playback| !playback.sink.empty())
            .unwrap_or(false)
    }

    pub fn elapsed(&self) -> Duration {
        self.current
            .as_ref()
            .map(|playback| playback.started.elapsed())
            .unwrap_or_default()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.current.as_ref().and_then(|playback| playback.duration)
    }
}
