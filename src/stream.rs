//! Streaming batch API: emit each chapter's outcome as it completes.
//!
//! A four-chapter batch with two AI calls per chapter takes minutes.
//! [`process_batch_stream`] yields every [`ChapterOutcome`] as soon as its
//! chapter finishes, so callers can print or persist results while later
//! chapters are still running. Chapters still run one at a time, in order;
//! outcomes therefore arrive in submission order.

use crate::config::{ChapterJob, PipelineConfig};
use crate::convert::run_job;
use crate::output::ChapterOutcome;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of chapter outcomes.
pub type ChapterStream = Pin<Box<dyn Stream<Item = ChapterOutcome> + Send>>;

/// Process `jobs` in order, yielding each outcome as it is ready.
///
/// The stream owns its inputs. Progress events fire exactly as in
/// [`crate::convert::process_batch`], `on_batch_complete` included once the
/// last chapter has been yielded.
///
/// # Example
/// ```rust,no_run
/// use edgequake_chapter::{process_batch_stream, ChapterJob, PipelineConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let jobs = vec![ChapterJob::new("Sound", "https://ncert.nic.in/textbook/pdf/hesc113.pdf")];
/// let mut outcomes = process_batch_stream(jobs, PipelineConfig::default());
/// while let Some(outcome) = outcomes.next().await {
///     println!("{}: success={}", outcome.chapter(), outcome.is_success());
/// }
/// # Ok(())
/// # }
/// ```
pub fn process_batch_stream(jobs: Vec<ChapterJob>, config: PipelineConfig) -> ChapterStream {
    let total = jobs.len();
    info!("Starting streaming batch of {} chapters", total);
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let succeeded = Arc::new(AtomicUsize::new(0));
    let callback = config.progress_callback.clone();
    let config = Arc::new(config);

    let counter = Arc::clone(&succeeded);
    let outcomes = stream::iter(jobs.into_iter().enumerate()).then(move |(i, job)| {
        let config = Arc::clone(&config);
        let counter = Arc::clone(&counter);
        async move {
            let outcome = run_job(&job, i + 1, total, &config).await;
            if outcome.is_success() {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            outcome
        }
    });

    let finish = stream::once(async move {
        if let Some(cb) = callback {
            cb.on_batch_complete(total, succeeded.load(Ordering::Relaxed));
        }
    })
    .filter_map(|()| async { None::<ChapterOutcome> });

    Box::pin(outcomes.chain(finish))
}
