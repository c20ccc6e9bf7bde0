//! Sequential batch driver.
//!
//! Processes one URL at a time: robots check, coalesce, finalize, persist.
//! A fixed [`Schedule`] spaces consecutive URLs out; no pause follows the
//! last one. An interrupt during a pause stops the batch before the next
//! URL, leaving everything already written intact.

use crate::coalesce::{Coalescer, finalize};
use crate::extractors::Extractor;
use crate::models::RecordStatus;
use crate::outputs::{PersistError, RecordSink};
use crate::robots::PolicyGate;
use crate::utils::truncate_for_log;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Pipeline settings derived from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub delay: Duration,
    pub timeout: Duration,
    pub respect_robots: bool,
    pub use_fallback: bool,
    pub fail_fast: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            timeout: Duration::from_secs(20),
            respect_robots: true,
            use_fallback: true,
            fail_fast: false,
        }
    }
}

/// Fixed pause between consecutive URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    delay: Duration,
}

impl Schedule {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Pause owed after item `index` (0-based) of `total`; none after the last.
    pub fn pause_after(&self, index: usize, total: usize) -> Option<Duration> {
        (index + 1 < total && !self.delay.is_zero()).then_some(self.delay)
    }

    /// Sleep for `pause`, returning `false` if an interrupt arrives first.
    async fn wait(pause: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = sleep(pause) => !*shutdown.borrow(),
            changed = shutdown.changed() => match changed {
                Ok(()) => !*shutdown.borrow(),
                // Nobody can interrupt any more; just sleep.
                Err(_) => {
                    sleep(pause).await;
                    true
                }
            },
        }
    }
}

/// Counts for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub partial: usize,
    pub empty: usize,
    pub skipped: usize,
    pub failed: usize,
    pub interrupted: bool,
}

impl RunSummary {
    /// URLs that reached the sink successfully.
    pub fn persisted(&self) -> usize {
        self.successful + self.partial + self.empty
    }

    fn record(&mut self, status: RecordStatus) {
        match status {
            RecordStatus::Successful => self.successful += 1,
            RecordStatus::Partial => self.partial += 1,
            RecordStatus::Empty => self.empty += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} URLs: {} successful, {} partial, {} empty, {} skipped, {} failed",
            self.total, self.successful, self.partial, self.empty, self.skipped, self.failed
        )?;
        if self.interrupted {
            f.write_str(" (interrupted)")?;
        }
        Ok(())
    }
}

/// Everything one batch needs, wired together once at startup.
pub struct Pipeline<P, F, G, S> {
    coalescer: Coalescer<P, F>,
    gate: Option<G>,
    sink: S,
    schedule: Schedule,
    fail_fast: bool,
}

impl<P, F, G, S> Pipeline<P, F, G, S>
where
    P: Extractor,
    F: Extractor,
    G: PolicyGate,
    S: RecordSink,
{
    /// `gate` is `None` when robots checks are skipped.
    pub fn new(coalescer: Coalescer<P, F>, gate: Option<G>, sink: S, config: &RunConfig) -> Self {
        Self {
            coalescer,
            gate,
            sink,
            schedule: Schedule::new(config.delay),
            fail_fast: config.fail_fast,
        }
    }

    /// Process `urls` in order.
    ///
    /// Persistence failures are logged and counted; under fail-fast the
    /// first one is returned instead. Setting `shutdown` to `true` stops the
    /// batch at the next pause. URLs denied by robots.txt are never fetched,
    /// so no pause follows them.
    #[instrument(level = "info", skip_all, fields(count = urls.len()))]
    pub async fn run(
        &self,
        urls: &[String],
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary, PersistError> {
        let total = urls.len();
        let mut summary = RunSummary::default();

        for (i, url) in urls.iter().enumerate() {
            if *shutdown.borrow() {
                warn!(remaining = total - i, "Interrupted; stopping batch");
                summary.interrupted = true;
                break;
            }
            summary.total += 1;
            info!(index = i + 1, total, %url, "Processing URL");
            let fetched = self.process(url, &mut summary).await?;
            if !fetched {
                continue;
            }

            if let Some(pause) = self.schedule.pause_after(i, total) {
                if !Schedule::wait(pause, &mut shutdown).await {
                    warn!(remaining = total - i - 1, "Interrupted; stopping batch");
                    summary.interrupted = true;
                    break;
                }
            }
        }

        info!(%summary, "Batch finished");
        Ok(summary)
    }

    /// Gate, extract and persist one URL. Returns `false` when robots.txt denied it.
    async fn process(&self, url: &str, summary: &mut RunSummary) -> Result<bool, PersistError> {
        if let Some(gate) = &self.gate {
            if !gate.allowed(url).await {
                warn!(%url, "Skipping URL disallowed by robots.txt");
                summary.skipped += 1;
                return Ok(false);
            }
        }

        let draft = self.coalescer.coalesce(url).await;
        let origin = draft.origin;
        let record = finalize(draft);
        let status = record.status();
        debug!(
            %url,
            title = %truncate_for_log(record.title.as_deref().unwrap_or(""), 120),
            text_bytes = record.text.as_ref().map_or(0, String::len),
            authors = record.authors.len(),
            "Finalized record"
        );

        match self.sink.persist(&record).await {
            Ok(path) => {
                info!(%url, %origin, %status, path = %path.display(), "Saved article");
                summary.record(status);
                Ok(true)
            }
            Err(e) if self.fail_fast => {
                error!(%url, error = %e, "Persistence failed; aborting batch");
                summary.failed += 1;
                Err(e)
            }
            Err(e) => {
                error!(%url, error = %e, "Persistence failed; continuing");
                summary.failed += 1;
                Ok(true)
            }
        }
    }
}
