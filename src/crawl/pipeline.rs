// src/crawl/pipeline.rs
// =============================================================================
// The scrape run itself.
//
// Every request is a Job on one channel. A job goes through named stages:
//
//   Intercept -> Fetch -> Classify -> Discover (seed page)
//                                  -> Persist  (image)
//
// Intercept runs before anything touches the network. Every image job claims
// a limit gate slot there (waiting while all slots are held by saves still in
// flight) and is dropped once the limit is reached. Base64 data URIs are then
// decoded and written right away. Discover sends one Image job per reference back into the
// channel. The dispatcher loop in `scrape` spawns each job as a task and
// returns when the channel is empty and no task is left running.
//
// Failures stay inside their job: they are logged with the URL and counted,
// and the run carries on.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Response};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use super::client::build_client;
use super::dispatch::DispatchLimiter;
use crate::config::RunConfig;
use crate::extract::discover_images;
use crate::save::{
    inline_file_name, suggested_filename, write_inline_image, InlineSequence, InlineTarget,
    LimitGate, Reservation, ResolvedFilename,
};

/// What a finished run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub saved: usize,
    pub failed: usize,
}

#[derive(Debug)]
enum Job {
    /// The page given on the command line
    Seed(Url),
    /// A reference found on the page
    Image(Url),
}

impl Job {
    fn url(&self) -> &Url {
        match self {
            Job::Seed(url) | Job::Image(url) => url,
        }
    }
}

enum Intercept<'a> {
    Inline(InlineTarget, Reservation<'a>),
    Suppressed,
    /// The seed goes out without a slot
    Network(Option<Reservation<'a>>),
}

enum Classified {
    Page,
    Image(String),
    Other(String),
}

// State shared by every task of one run
struct Scraper {
    config: RunConfig,
    client: Client,
    limiter: DispatchLimiter,
    gate: LimitGate,
    sequence: InlineSequence,
    failed: AtomicUsize,
    jobs: mpsc::UnboundedSender<Job>,
}

/// Scrapes `config.seed` and returns once every discovered image is handled.
///
/// Only a broken HTTP client setup is an error here. Everything that goes
/// wrong with individual requests shows up in the logs and in
/// `RunSummary::failed`.
pub async fn scrape(config: RunConfig) -> Result<RunSummary> {
    let client = build_client(&config)?;
    let (jobs, mut queue) = mpsc::unbounded_channel();

    let scraper = Arc::new(Scraper {
        limiter: DispatchLimiter::new(config.parallel, config.delay),
        gate: LimitGate::new(config.limit),
        sequence: InlineSequence::default(),
        failed: AtomicUsize::new(0),
        jobs,
        client,
        config,
    });

    debug!(
        seed = %scraper.config.seed,
        limit = scraper.gate.limit(),
        parallel = scraper.config.parallel,
        delay_secs = scraper.config.delay.as_secs(),
        "starting run"
    );
    scraper.enqueue(Job::Seed(scraper.config.seed.clone()))?;

    let mut tasks = JoinSet::new();
    loop {
        while let Ok(job) = queue.try_recv() {
            tasks.spawn(Arc::clone(&scraper).handle(job));
        }
        // Jobs are only queued by running tasks, so an empty set after
        // draining the queue means the run is over.
        if tasks.is_empty() {
            break;
        }
        tokio::select! {
            Some(job) = queue.recv() => {
                tasks.spawn(Arc::clone(&scraper).handle(job));
            }
            Some(joined) = tasks.join_next() => {
                if let Err(err) = joined {
                    scraper.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %err, "scrape task aborted");
                }
            }
            else => break,
        }
    }

    Ok(RunSummary {
        saved: scraper.gate.saved(),
        failed: scraper.failed.load(Ordering::Relaxed),
    })
}

impl Scraper {
    fn enqueue(&self, job: Job) -> Result<()> {
        self.jobs
            .send(job)
            .map_err(|_| anyhow!("job queue closed"))
    }

    async fn handle(self: Arc<Self>, job: Job) {
        let target = display_target(job.url());
        if let Err(err) = self.process(&job).await {
            self.failed.fetch_add(1, Ordering::Relaxed);
            warn!("Request URL: {target} Error: {err:#}");
        }
    }

    async fn process(&self, job: &Job) -> Result<()> {
        match self.intercept(job).await {
            Intercept::Inline(target, slot) => self.persist_inline(target, slot).await,
            Intercept::Suppressed => {
                debug!(url = %display_target(job.url()), "image limit reached, skipping");
                Ok(())
            }
            Intercept::Network(slot) => self.limiter.run(self.fetch_and_handle(job, slot)).await,
        }
    }

    // Decides before any network activity what happens to a job
    async fn intercept(&self, job: &Job) -> Intercept<'_> {
        let inline = InlineTarget::from_url(job.url());
        if inline.is_none() && matches!(job, Job::Seed(_)) {
            return Intercept::Network(None);
        }

        // Held until the file is written; any failure before that releases it
        let Some(slot) = self.gate.reserve_or_wait().await else {
            return Intercept::Suppressed;
        };
        match inline {
            Some(target) => Intercept::Inline(target, slot),
            None => Intercept::Network(Some(slot)),
        }
    }

    async fn fetch_and_handle(&self, job: &Job, slot: Option<Reservation<'_>>) -> Result<()> {
        let response = self.fetch(job).await?;
        match classify(job, &response) {
            Classified::Page => self.discover(response).await,
            Classified::Image(content_type) => self.persist(response, &content_type, slot).await,
            Classified::Other(content_type) => {
                debug!(url = %response.url(), content_type = %content_type, "not an image, skipping");
                Ok(())
            }
        }
    }

    async fn fetch(&self, job: &Job) -> Result<Response> {
        let mut request = self.client.get(job.url().clone());
        // Credentials go with the seed request only
        if let (Job::Seed(_), Some(credentials)) = (job, &self.config.credentials) {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if self.config.verbose {
            info!("response url {} {}", response.url(), status.as_u16());
        }
        if !status.is_success() {
            bail!("HTTP {}", status);
        }
        Ok(response)
    }

    async fn discover(&self, response: Response) -> Result<()> {
        let page_url = response.url().clone();
        let html = response
            .text()
            .await
            .context("failed to read page body")?;

        let images = discover_images(&html, &page_url);
        debug!(page = %page_url, count = images.len(), "discovered image references");
        for url in images {
            self.enqueue(Job::Image(url))?;
        }
        Ok(())
    }

    async fn persist(
        &self,
        response: Response,
        content_type: &str,
        slot: Option<Reservation<'_>>,
    ) -> Result<()> {
        // a seed that is itself an image has no slot yet
        let Some(slot) = slot.or_else(|| self.gate.reserve()) else {
            debug!(url = %response.url(), "image limit reached, not saving");
            return Ok(());
        };

        let url = response.url().clone();
        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let name = ResolvedFilename::resolve(
            &suggested_filename(&url, disposition.as_deref()),
            content_type,
        );

        let bytes = response.bytes().await.context("failed to read image body")?;
        let path = self.config.dest.join(name.as_str());
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        let total = slot.commit();
        debug!(url = %url, path = %path.display(), total, "saved image");
        Ok(())
    }

    async fn persist_inline(&self, target: InlineTarget, slot: Reservation<'_>) -> Result<()> {
        let bytes = target.decode()?;
        let name = inline_file_name(self.sequence.next(), target.extension());
        let path = write_inline_image(&self.config.dest, &name, &bytes).await?;

        let total = slot.commit();
        debug!(path = %path.display(), bytes = bytes.len(), total, "saved inline image");
        Ok(())
    }
}

fn classify(job: &Job, response: &Response) -> Classified {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.contains("image/") {
        Classified::Image(content_type)
    } else if matches!(job, Job::Seed(_)) && content_type.contains("html") {
        Classified::Page
    } else {
        Classified::Other(content_type)
    }
}

// data: URLs can be megabytes long; keep log lines readable
fn display_target(url: &Url) -> String {
    const MAX: usize = 64;
    let full = url.as_str();
    if url.scheme() != "data" || full.len() <= MAX {
        return full.to_string();
    }
    let mut end = MAX;
    while !full.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &full[..end])
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a channel instead of a Vec of URLs?
//    - Image URLs only become known once the page has been fetched
//    - The page task pushes them into the channel while the loop is running
//    - The loop spawns each one as soon as it arrives
//
// 2. What is JoinSet?
//    - A set of spawned tasks we can wait on one at a time
//    - join_next() returns None once every task has finished
//
// 3. What does `self: Arc<Self>` mean?
//    - handle() takes ownership of one Arc clone
//    - The spawned task then owns everything it touches ('static)
//
// 4. Why does Reservation have a Drop impl?
//    - Any early return with `?` drops the reservation
//    - Dropping without commit() gives the slot back to the gate
//    - A job waiting in reserve_or_wait() then picks the slot up
//
// 5. Why does Intercept carry a lifetime?
//    - Reservation<'a> borrows the gate inside Scraper
//    - The borrow lives as long as the job's `&self`, so nothing outlives it
// -----------------------------------------------------------------------------
