/// Media Processing Queue
///
/// Accepts uploads synchronously and runs trim/filter/music-mix jobs on a
/// pool of background workers.
///
/// Architecture:
/// - Job records live in a shared `DashMap`, polled by id
/// - Job ids travel over a bounded `tokio::sync::mpsc` channel
/// - `processing_workers` tasks share the receiver and run one job each
/// - Jobs move queued -> running -> completed | failed and are never retried
/// - A failed job's source file stays on disk for inspection
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use mime::Mime;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{JobOutput, JobStatus, ProcessingJob, ProcessingOptions};
use crate::services::media_storage::{
    extension_for, MediaKind, MediaStorage, StoredMedia, UploadPolicy,
};
use crate::services::transcoder::{TranscodeRequest, Transcoder};

type JobTable = DashMap<Uuid, ProcessingJob>;

pub struct MediaProcessingQueue {
    jobs: Arc<JobTable>,
    sender: mpsc::Sender<Uuid>,
    storage: Arc<dyn MediaStorage>,
    transcoder: Arc<dyn Transcoder>,
    policy: UploadPolicy,
    music_dir: PathBuf,
    workers: Vec<JoinHandle<()>>,
}

impl MediaProcessingQueue {
    /// Create the queue and spawn its workers on the current runtime
    pub fn start(
        config: &MediaConfig,
        storage: Arc<dyn MediaStorage>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let jobs: Arc<JobTable> = Arc::new(DashMap::new());

        let worker_count = config.processing_workers.max(1);
        let workers = (0..worker_count)
            .map(|worker_id| {
                let runner = JobRunner {
                    jobs: jobs.clone(),
                    storage: storage.clone(),
                    transcoder: transcoder.clone(),
                    music_dir: config.music_dir.clone(),
                };
                tokio::spawn(worker_loop(worker_id, receiver.clone(), runner))
            })
            .collect();

        info!(
            workers = worker_count,
            capacity = config.queue_capacity,
            transcoder = transcoder.name(),
            "Media processing queue started"
        );

        Self {
            jobs,
            sender,
            storage,
            transcoder,
            policy: UploadPolicy::from_config(config),
            music_dir: config.music_dir.clone(),
            workers,
        }
    }

    /// Whether enhancement jobs can run at all
    pub fn transcoder_available(&self) -> bool {
        self.transcoder.is_available()
    }

    pub fn policy(&self) -> UploadPolicy {
        self.policy
    }

    /// Validate and persist an upload, returning its public URL
    pub async fn upload(&self, bytes: Bytes, mime: &Mime) -> Result<(MediaKind, StoredMedia)> {
        let kind = self.policy.classify(mime)?;
        self.policy.check_size(kind, bytes.len())?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".into()));
        }

        let stored = self.storage.put(bytes, &extension_for(mime)).await?;
        info!(
            kind = kind.as_str(),
            filename = %stored.filename,
            "Media uploaded"
        );
        Ok((kind, stored))
    }

    /// Reject options a job could never run with, including music tracks
    /// missing from the library
    pub async fn check_options(&self, options: &ProcessingOptions) -> Result<()> {
        options.validate().map_err(AppError::Validation)?;
        if let Some(track) = &options.music_track {
            let path = self.music_dir.join(track);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(AppError::Validation(format!(
                    "Unknown music track: {track}"
                )));
            }
        }
        Ok(())
    }

    /// Register a job for `source` and hand it to the workers
    ///
    /// Returns as soon as the job is recorded. A full queue fails the job
    /// immediately; callers observe that through `get_status`.
    pub async fn queue_processing(
        &self,
        owner_id: Uuid,
        source: &StoredMedia,
        options: ProcessingOptions,
    ) -> Result<Uuid> {
        self.check_options(&options).await?;

        let job = ProcessingJob {
            id: Uuid::new_v4(),
            owner_id,
            source_path: source.path.clone(),
            source_url: source.url.clone(),
            options,
            status: JobStatus::Queued,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        let job_id = job.id;
        self.jobs.insert(job_id, job);
        metrics::record_job_status(JobStatus::Queued.as_str());

        if let Err(e) = self.sender.try_send(job_id) {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "processing queue full",
                mpsc::error::TrySendError::Closed(_) => "processing queue closed",
            };
            warn!(job_id = %job_id, reason, "Job rejected by queue");
            fail_job(&self.jobs, job_id, reason.to_string());
        } else {
            info!(job_id = %job_id, owner_id = %owner_id, "Processing job queued");
        }

        Ok(job_id)
    }

    /// Current state of a job; unknown ids are `NotFound`
    pub fn get_status(&self, job_id: Uuid) -> Result<ProcessingJob> {
        self.jobs
            .get(&job_id)
            .map(|job| job.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("Processing job {job_id} not found")))
    }
}

impl Drop for MediaProcessingQueue {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

#[derive(Clone)]
struct JobRunner {
    jobs: Arc<JobTable>,
    storage: Arc<dyn MediaStorage>,
    transcoder: Arc<dyn Transcoder>,
    music_dir: PathBuf,
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Uuid>>>,
    runner: JobRunner,
) {
    loop {
        let next = { receiver.lock().await.recv().await };
        match next {
            Some(job_id) => runner.run(worker_id, job_id).await,
            None => break,
        }
    }
    info!(worker_id, "Media processing worker stopped (channel closed)");
}

impl JobRunner {
    async fn run(&self, worker_id: usize, job_id: Uuid) {
        let Some(job) = transition(&self.jobs, job_id, JobStatus::Running, |job| {
            job.started_at = Some(Utc::now());
        }) else {
            return;
        };

        let started = Instant::now();
        info!(worker_id, job_id = %job_id, "Processing job started");

        let output = self.storage.allocate("mp4");
        let thumbnail = self.storage.allocate("jpg");
        let request = TranscodeRequest {
            source: job.source_path.clone(),
            output: output.path.clone(),
            thumbnail: thumbnail.path.clone(),
            music: job
                .options
                .music_track
                .as_ref()
                .map(|track| self.music_dir.join(track)),
            options: job.options.clone(),
        };

        match self.transcoder.transcode(&request).await {
            Ok(outcome) => {
                let result = JobOutput {
                    video_url: output.url,
                    thumbnail_url: outcome.thumbnail_written.then_some(thumbnail.url),
                };
                transition(&self.jobs, job_id, JobStatus::Completed, |job| {
                    job.result = Some(result);
                    job.finished_at = Some(Utc::now());
                });
                info!(job_id = %job_id, "Processing job completed");
            }
            Err(e) => {
                error!(
                    job_id = %job_id,
                    source = %job.source_path.display(),
                    error = %e,
                    "Processing job failed, source retained"
                );
                fail_job(&self.jobs, job_id, e.to_string());
            }
        }

        metrics::record_job_duration(started.elapsed());
    }
}

/// Apply a monotonic status change, returning the updated job
fn transition(
    jobs: &JobTable,
    job_id: Uuid,
    next: JobStatus,
    update: impl FnOnce(&mut ProcessingJob),
) -> Option<ProcessingJob> {
    let mut job = jobs.get_mut(&job_id)?;
    if !job.status.can_transition_to(next) {
        warn!(
            job_id = %job_id,
            from = job.status.as_str(),
            to = next.as_str(),
            "Ignoring invalid job transition"
        );
        return None;
    }
    job.status = next;
    update(job.value_mut());
    metrics::record_job_status(next.as_str());
    Some(job.value().clone())
}

fn fail_job(jobs: &JobTable, job_id: Uuid, reason: String) {
    transition(jobs, job_id, JobStatus::Failed, |job| {
        job.error = Some(reason);
        job.finished_at = Some(Utc::now());
    });
}
