/// Upload handlers - multipart media intake and processing jobs
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use mime::Mime;

use super::parse_id;
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::models::{ProcessResponse, ProcessingOptions, UploadResponse, VideoFilter};
use crate::services::media_storage::effective_mime;
use crate::services::{MediaKind, UploadPolicy};
use crate::state::AppState;

const MAX_TEXT_FIELD_BYTES: usize = 16 * 1024;

/// A file part read fully into memory after passing the upload policy
struct FilePart {
    mime: Mime,
    bytes: Bytes,
}

/// Read a file field, enforcing the MIME allow-list and the size ceiling
/// while the body is still streaming
async fn read_file(field: &mut Field, policy: UploadPolicy, expected: MediaKind) -> Result<FilePart> {
    let filename = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(str::to_string);
    let mime = effective_mime(field.content_type(), filename.as_deref())
        .ok_or_else(|| AppError::Validation("Missing content type for uploaded file".into()))?;

    let kind = policy.classify(&mime)?;
    if kind != expected {
        return Err(AppError::Validation(format!(
            "Expected a {} file, got {}",
            expected.as_str(),
            mime.essence_str()
        )));
    }

    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        policy.check_size(kind, buf.len() + chunk.len())?;
        buf.extend_from_slice(&chunk);
    }
    if buf.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    Ok(FilePart {
        mime,
        bytes: buf.freeze(),
    })
}

async fn read_text(field: &mut Field) -> Result<String> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::Validation("Form field too large".into()));
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf.to_vec())
        .map(|s| s.trim().to_string())
        .map_err(|_| AppError::Validation("Form field is not valid UTF-8".into()))
}

async fn drain(field: &mut Field) -> Result<()> {
    while let Some(chunk) = field.next().await {
        chunk?;
    }
    Ok(())
}

fn parse_number(name: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| AppError::Validation(format!("{name} must be a number")))
}

/// Apply one processing form field; unknown names are ignored
fn apply_option(options: &mut ProcessingOptions, name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    match name {
        "options" => *options = serde_json::from_str(value)?,
        "trimStart" => options.trim_start = Some(parse_number(name, value)?),
        "trimEnd" => options.trim_end = Some(parse_number(name, value)?),
        "filter" => {
            options.filter = VideoFilter::from_str(value)
                .ok_or_else(|| AppError::Validation(format!("Unknown filter: {value}")))?;
        }
        "musicTrack" => options.music_track = Some(value.to_string()),
        "originalVolume" => options.original_volume = parse_number(name, value)? as f32,
        "musicVolume" => options.music_volume = parse_number(name, value)? as f32,
        _ => {}
    }
    Ok(())
}

/// POST /reels/upload
///
/// Fields: `video` (required, video/*) and `thumbnail` (optional, image/*).
/// Both parts are read and checked before either is stored.
pub async fn upload_media(
    state: web::Data<AppState>,
    user: UserId,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let policy = state.media.policy();
    let mut video = None;
    let mut thumbnail = None;

    while let Some(field) = payload.next().await {
        let mut field = field?;
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => video = Some(read_file(&mut field, policy, MediaKind::Video).await?),
            "thumbnail" => {
                thumbnail = Some(read_file(&mut field, policy, MediaKind::Image).await?)
            }
            _ => drain(&mut field).await?,
        }
    }

    let video = video.ok_or_else(|| AppError::Validation("Missing video file".into()))?;
    let (_, stored_video) = state.media.upload(video.bytes, &video.mime).await?;
    let thumbnail_url = match thumbnail {
        Some(part) => Some(state.media.upload(part.bytes, &part.mime).await?.1.url),
        None => None,
    };

    tracing::info!(user_id = %user.0, filename = %stored_video.filename, "Reel media uploaded");

    Ok(HttpResponse::Ok().json(UploadResponse {
        video_url: stored_video.url,
        thumbnail_url,
        filename: stored_video.filename,
    }))
}

/// POST /reels/process
///
/// Stores the video and queues an enhancement job. Without a transcoder the
/// upload is kept as-is and no job is created.
pub async fn process_media(
    state: web::Data<AppState>,
    user: UserId,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let policy = state.media.policy();
    let mut video = None;
    let mut options = ProcessingOptions::default();

    while let Some(field) = payload.next().await {
        let mut field = field?;
        let name = field.name().unwrap_or_default().to_string();
        if name == "video" {
            video = Some(read_file(&mut field, policy, MediaKind::Video).await?);
        } else {
            let value = read_text(&mut field).await?;
            apply_option(&mut options, &name, &value)?;
        }
    }

    let video = video.ok_or_else(|| AppError::Validation("Missing video file".into()))?;
    let transcode = state.media.transcoder_available();
    // nothing is written until the whole request is known to be acceptable
    if transcode {
        state.media.check_options(&options).await?;
    } else {
        options.validate().map_err(AppError::Validation)?;
    }

    let (_, stored) = state.media.upload(video.bytes, &video.mime).await?;

    if !transcode {
        tracing::info!(
            user_id = %user.0,
            filename = %stored.filename,
            "Transcoder unavailable, skipping processing"
        );
        return Ok(HttpResponse::Ok().json(ProcessResponse {
            job_id: None,
            video_url: stored.url,
            processing: "skipped".into(),
        }));
    }

    let job_id = state.media.queue_processing(user.0, &stored, options).await?;
    Ok(HttpResponse::Accepted().json(ProcessResponse {
        job_id: Some(job_id),
        video_url: stored.url,
        processing: "queued".into(),
    }))
}

/// GET /reels/process/{job_id}
pub async fn get_job_status(
    state: web::Data<AppState>,
    user: UserId,
    job_id: web::Path<String>,
) -> Result<HttpResponse> {
    let job_id = parse_id(&job_id, "job")?;
    let job = state.media.get_status(job_id)?;
    if job.owner_id != user.0 {
        return Err(AppError::NotFound(format!("Processing job {job_id} not found")));
    }
    Ok(HttpResponse::Ok().json(job))
}
