//! Scriptable in-process providers.
//!
//! Used by the pipeline and API tests (where each test scripts the upstream
//! answers and counts submissions) and by `PROVIDER_MODE=fake`, where jobs
//! complete on their own after a few polls so the service can be demoed
//! without credentials.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dreamreel_core::entry::Playback;
use tokio::sync::Mutex;

use crate::error::{PollError, SubmissionError};
use crate::job::{GenerationRequest, JobClient, JobHandle, JobStatus, PublishStatus, PublisherClient};

/// Host used in URLs the fakes make up.
pub const FAKE_ASSET_BASE: &str = "https://assets.fake.invalid";

// ---------------------------------------------------------------------------
// Shared bookkeeping
// ---------------------------------------------------------------------------

struct Job<S> {
    status: S,
    polls: u32,
}

struct Ledger<S> {
    prefix: &'static str,
    jobs: HashMap<JobHandle, Job<S>>,
    /// Handles in submission order.
    order: Vec<JobHandle>,
    /// Status given to newly submitted jobs.
    initial: S,
    fail_submissions: u32,
    fail_polls: bool,
    /// When set, a job reports its completed status after this many polls.
    complete_after: Option<u32>,
}

impl<S: Clone> Ledger<S> {
    fn new(prefix: &'static str, initial: S, complete_after: Option<u32>) -> Self {
        Self {
            prefix,
            jobs: HashMap::new(),
            order: Vec::new(),
            initial,
            fail_submissions: 0,
            fail_polls: false,
            complete_after,
        }
    }

    fn submit(&mut self) -> Result<JobHandle, SubmissionError> {
        if self.fail_submissions > 0 {
            self.fail_submissions -= 1;
            return Err(SubmissionError::Rejected {
                status: 503,
                body: "fake provider unavailable".to_string(),
            });
        }
        let handle = format!("{}-{}", self.prefix, self.order.len() + 1);
        self.jobs.insert(
            handle.clone(),
            Job {
                status: self.initial.clone(),
                polls: 0,
            },
        );
        self.order.push(handle.clone());
        Ok(handle)
    }

    /// Bump the poll count of `handle` and return its status, or `completed`
    /// once the auto-complete threshold is reached.
    fn poll(&mut self, handle: &str, completed: impl FnOnce(&str) -> S) -> Result<S, PollError> {
        if self.fail_polls {
            return Err(PollError::Api {
                status: 503,
                body: "fake provider unavailable".to_string(),
            });
        }
        let complete_after = self.complete_after;
        let job = self
            .jobs
            .get_mut(handle)
            .ok_or_else(|| PollError::Api {
                status: 404,
                body: format!("unknown handle {handle}"),
            })?;
        job.polls += 1;
        if complete_after.is_some_and(|n| job.polls >= n) {
            job.status = completed(handle);
        }
        Ok(job.status.clone())
    }

    fn set(&mut self, handle: &str, status: S) -> bool {
        match self.jobs.get_mut(handle) {
            Some(job) => {
                job.status = status;
                true
            }
            None => false,
        }
    }

    fn set_all(&mut self, status: impl Fn(&str) -> S) {
        for (handle, job) in &mut self.jobs {
            job.status = status(handle);
        }
    }
}

/// URL a fake generation job completes with.
pub fn fake_asset_url(handle: &str) -> String {
    format!("{FAKE_ASSET_BASE}/{handle}")
}

// ---------------------------------------------------------------------------
// FakeJobClient
// ---------------------------------------------------------------------------

/// In-process [`JobClient`]. New jobs start out pending.
pub struct FakeJobClient {
    ledger: Mutex<Ledger<JobStatus>>,
    requests: Mutex<Vec<GenerationRequest>>,
    submissions: AtomicUsize,
    polls: AtomicUsize,
    submit_delay: Option<Duration>,
}

impl FakeJobClient {
    /// Handles are `"{prefix}-1"`, `"{prefix}-2"`, ...
    pub fn new(prefix: &'static str) -> Self {
        Self::build(prefix, None)
    }

    /// Jobs report `completed` with [`fake_asset_url`] once polled `polls` times.
    pub fn completing_after(prefix: &'static str, polls: u32) -> Self {
        Self::build(prefix, Some(polls))
    }

    fn build(prefix: &'static str, complete_after: Option<u32>) -> Self {
        Self {
            ledger: Mutex::new(Ledger::new(prefix, JobStatus::Pending, complete_after)),
            requests: Mutex::new(Vec::new()),
            submissions: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            submit_delay: None,
        }
    }

    /// Sleep inside every `submit`, widening race windows in tests.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// Number of `submit` calls, including rejected ones.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Requests of accepted submissions, in order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    /// Script the answer for one job. Returns `false` for unknown handles.
    pub async fn set_status(&self, handle: &str, status: JobStatus) -> bool {
        self.ledger.lock().await.set(handle, status)
    }

    /// Script the same answer for every job submitted so far.
    pub async fn set_all(&self, status: JobStatus) {
        self.ledger.lock().await.set_all(|_| status.clone());
    }

    /// Complete every job submitted so far, each with its own URL.
    pub async fn complete_all(&self) {
        self.ledger.lock().await.set_all(|handle| JobStatus::Completed {
            url: fake_asset_url(handle),
        });
    }

    /// Reject the next `count` submissions.
    pub async fn fail_next_submissions(&self, count: u32) {
        self.ledger.lock().await.fail_submissions = count;
    }

    /// Make every poll error until switched off again.
    pub async fn fail_polls(&self, fail: bool) {
        self.ledger.lock().await.fail_polls = fail;
    }
}

#[async_trait]
impl JobClient for FakeJobClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, SubmissionError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        let handle = self.ledger.lock().await.submit()?;
        self.requests.lock().await.push(request.clone());
        tracing::debug!(handle = %handle, "Fake job submitted");
        Ok(handle)
    }

    async fn poll(&self, handle: &str) -> Result<JobStatus, PollError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.ledger.lock().await.poll(handle, |h| JobStatus::Completed {
            url: fake_asset_url(h),
        })
    }
}

// ---------------------------------------------------------------------------
// FakePublisher
// ---------------------------------------------------------------------------

/// In-process [`PublisherClient`]. New assets start out pending.
pub struct FakePublisher {
    ledger: Mutex<Ledger<PublishStatus>>,
    media_urls: Mutex<Vec<String>>,
    submissions: AtomicUsize,
    polls: AtomicUsize,
}

/// Playback reference a fake asset becomes ready with.
pub fn fake_playback(handle: &str) -> Playback {
    let playback_id = format!("pb-{handle}");
    Playback {
        playback_url: format!("{FAKE_ASSET_BASE}/{playback_id}.m3u8"),
        playback_id,
    }
}

impl Default for FakePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePublisher {
    /// Handles are `"asset-1"`, `"asset-2"`, ...
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Assets become ready with [`fake_playback`] once polled `polls` times.
    pub fn ready_after(polls: u32) -> Self {
        Self::build(Some(polls))
    }

    fn build(complete_after: Option<u32>) -> Self {
        Self {
            ledger: Mutex::new(Ledger::new("asset", PublishStatus::Pending, complete_after)),
            media_urls: Mutex::new(Vec::new()),
            submissions: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Media URLs of accepted publishes, in order.
    pub async fn media_urls(&self) -> Vec<String> {
        self.media_urls.lock().await.clone()
    }

    pub async fn handles(&self) -> Vec<JobHandle> {
        self.ledger.lock().await.order.clone()
    }

    pub async fn set_status(&self, handle: &str, status: PublishStatus) -> bool {
        self.ledger.lock().await.set(handle, status)
    }

    pub async fn set_all(&self, status: PublishStatus) {
        self.ledger.lock().await.set_all(|_| status.clone());
    }

    pub async fn fail_next_submissions(&self, count: u32) {
        self.ledger.lock().await.fail_submissions = count;
    }

    pub async fn fail_polls(&self, fail: bool) {
        self.ledger.lock().await.fail_polls = fail;
    }
}

#[async_trait]
impl PublisherClient for FakePublisher {
    async fn publish(&self, media_url: &str) -> Result<JobHandle, SubmissionError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let handle = self.ledger.lock().await.submit()?;
        self.media_urls.lock().await.push(media_url.to_string());
        tracing::debug!(handle = %handle, "Fake asset created");
        Ok(handle)
    }

    async fn poll(&self, handle: &str) -> Result<PublishStatus, PollError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.ledger
            .lock()
            .await
            .poll(handle, |h| PublishStatus::Ready(fake_playback(h)))
    }
}
