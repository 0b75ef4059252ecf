/// Transcoding capability
///
/// `FfmpegTranscoder` shells out to ffmpeg for trim, colour filter and music
/// mix. When ffmpeg is missing the service runs with `DisabledTranscoder`
/// and uploads are stored as-is.
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

use crate::models::{ProcessingOptions, VideoFilter};

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("transcoder unavailable")]
    Unavailable,

    #[error("failed to launch transcoder: {0}")]
    Launch(#[from] std::io::Error),

    #[error("transcoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Inputs and outputs of one transform
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub thumbnail: PathBuf,
    /// Resolved music track, if one was requested
    pub music: Option<PathBuf>,
    pub options: ProcessingOptions,
}

/// What a successful transform produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOutcome {
    pub thumbnail_written: bool,
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Capability flag checked before queueing work
    fn is_available(&self) -> bool;

    async fn transcode(
        &self,
        request: &TranscodeRequest,
    ) -> Result<TranscodeOutcome, TranscodeError>;
}

pub struct FfmpegTranscoder {
    binary: String,
    available: bool,
}

impl FfmpegTranscoder {
    /// Run `ffmpeg -version` once to decide availability
    pub async fn probe(binary: &str) -> Self {
        let available = match Command::new(binary).arg("-version").output().await {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                warn!(binary, status = %output.status, "ffmpeg probe failed");
                false
            }
            Err(e) => {
                warn!(binary, error = %e, "ffmpeg not found");
                false
            }
        };
        if available {
            info!(binary, "ffmpeg available, media processing enabled");
        }
        Self {
            binary: binary.to_string(),
            available,
        }
    }

    /// Whether `source` carries an audio stream, read from ffmpeg's input dump
    async fn has_audio(&self, source: &Path) -> bool {
        match Command::new(&self.binary)
            .args(["-hide_banner", "-i"])
            .arg(source)
            .output()
            .await
        {
            Ok(output) => stream_dump_has_audio(&String::from_utf8_lossy(&output.stderr)),
            Err(e) => {
                warn!(source = %source.display(), error = %e, "Audio probe failed");
                true
            }
        }
    }

    async fn run(&self, args: &[String]) -> Result<(), TranscodeError> {
        let output = Command::new(&self.binary).args(args).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::Failed {
                status: output.status.to_string(),
                stderr: tail(&stderr, 500),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn transcode(
        &self,
        request: &TranscodeRequest,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        if !self.available {
            return Err(TranscodeError::Unavailable);
        }

        let has_audio = self.has_audio(&request.source).await;
        self.run(&transcode_args(request, has_audio)).await?;

        let thumbnail_written = match self
            .run(&thumbnail_args(&request.output, &request.thumbnail))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(output = %request.output.display(), error = %e, "Thumbnail extraction failed");
                false
            }
        };

        Ok(TranscodeOutcome { thumbnail_written })
    }
}

/// Used when no transcoding engine is installed
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTranscoder;

#[async_trait]
impl Transcoder for DisabledTranscoder {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn transcode(
        &self,
        _request: &TranscodeRequest,
    ) -> Result<TranscodeOutcome, TranscodeError> {
        Err(TranscodeError::Unavailable)
    }
}

/// ffmpeg video filter for a named look
pub fn filter_expression(filter: VideoFilter) -> Option<&'static str> {
    match filter {
        VideoFilter::None => None,
        VideoFilter::Grayscale => Some("hue=s=0"),
        VideoFilter::Sepia => {
            Some("colorchannelmixer=.393:.769:.189:0:.349:.686:.168:0:.272:.534:.131")
        }
        VideoFilter::Vintage => Some("curves=preset=vintage"),
        VideoFilter::Vivid => Some("eq=saturation=1.5:contrast=1.1"),
        VideoFilter::Cool => Some("colorbalance=rs=-0.1:bs=0.3"),
        VideoFilter::Warm => Some("colorbalance=rs=0.3:bs=-0.1"),
    }
}

/// Arguments for the main trim/filter/mix pass
///
/// All inputs come first; every option after the last `-i` applies to the
/// output. Video and audio both go through `-filter_complex` when touched.
pub fn transcode_args(request: &TranscodeRequest, source_has_audio: bool) -> Vec<String> {
    let options = &request.options;
    let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error"]
        .map(String::from)
        .to_vec();

    if let Some(start) = options.trim_start {
        args.extend(["-ss".to_string(), format_seconds(start)]);
    }
    args.extend(["-i".to_string(), path_arg(&request.source)]);
    if let Some(music) = &request.music {
        args.extend(["-i".to_string(), path_arg(music)]);
    }

    if let Some(end) = options.trim_end {
        let duration = end - options.trim_start.unwrap_or(0.0);
        args.extend(["-t".to_string(), format_seconds(duration)]);
    }

    let mut graph = Vec::new();
    let video_map = match filter_expression(options.filter) {
        Some(filter) => {
            graph.push(format!("[0:v]{filter}[v]"));
            "[v]"
        }
        None => "0:v",
    };

    let volume_changed = (options.original_volume - 1.0).abs() > f32::EPSILON;
    let audio_map = match (&request.music, source_has_audio) {
        (Some(_), true) => {
            graph.push(format!(
                "[0:a]volume={:.2}[a0];[1:a]volume={:.2}[a1];[a0][a1]amix=inputs=2:duration=first:dropout_transition=0[aout]",
                options.original_volume, options.music_volume
            ));
            "[aout]"
        }
        (Some(_), false) => {
            graph.push(format!("[1:a]volume={:.2}[aout]", options.music_volume));
            "[aout]"
        }
        (None, true) if volume_changed => {
            graph.push(format!("[0:a]volume={:.2}[aout]", options.original_volume));
            "[aout]"
        }
        (None, _) => "0:a?",
    };

    if !graph.is_empty() {
        args.extend(["-filter_complex".to_string(), graph.join(";")]);
    }
    args.extend(["-map", video_map, "-map", audio_map].map(String::from));
    if request.music.is_some() {
        // music tracks outlast most clips
        args.push("-shortest".to_string());
    }

    args.extend(
        [
            "-c:v", "libx264", "-preset", "veryfast", "-crf", "23", "-c:a", "aac", "-b:a",
            "128k", "-movflags", "+faststart",
        ]
        .map(String::from),
    );
    args.push(path_arg(&request.output));
    args
}

/// Arguments for grabbing a poster frame from the processed output
pub fn thumbnail_args(video: &Path, thumbnail: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        path_arg(video),
        "-frames:v".into(),
        "1".into(),
        "-vf".into(),
        "scale=480:-2".into(),
        path_arg(thumbnail),
    ]
}

/// ffmpeg lists input streams as `Stream #0:1(und): Audio: aac ...`
fn stream_dump_has_audio(dump: &str) -> bool {
    dump.lines()
        .any(|line| line.trim_start().starts_with("Stream #") && line.contains(": Audio:"))
}

fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.3}")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn tail(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - max_chars).collect()
}
