use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::client::{HttpClient, Response};
use crate::error::{Error, FailureReason, SinkError, TransportError};
use crate::extract::Extractor;
use crate::frontier::{Frontier, RetryVerdict};
use crate::request::{Attempt, RequestSpec};
use crate::sink::{FailureReporter, ResultSink};
use crate::spiders::Spider;

/// Maps the number of the upcoming attempt (1 for the first retry) to how
/// long to wait before sending it.
pub type RetryDelay = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

#[derive(Clone)]
pub struct CrawlerOptions {
    pub min_concurrency: usize,
    pub max_concurrency: usize,
    /// Retries after the first attempt; 0 means a single attempt.
    pub max_retries: u32,
    pub request_timeout: Duration,
    /// Distinct requests handled per run; 0 means no limit.
    pub max_requests_per_run: usize,
    pub retry_delay: RetryDelay,
}

impl CrawlerOptions {
    pub fn with_retry_delay<F>(mut self, retry_delay: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        self.retry_delay = Arc::new(retry_delay);
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.min_concurrency < 1 {
            return Err(Error::InvalidOptions(
                "min_concurrency must be at least 1".into(),
            ));
        }
        if self.max_concurrency < self.min_concurrency {
            return Err(Error::InvalidOptions(format!(
                "max_concurrency ({}) must not be below min_concurrency ({})",
                self.max_concurrency, self.min_concurrency
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::InvalidOptions(
                "request_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            min_concurrency: 10,
            max_concurrency: 50,
            max_retries: 1,
            request_timeout: Duration::from_secs(30),
            max_requests_per_run: 10,
            retry_delay: Arc::new(|_| Duration::ZERO),
        }
    }
}

impl Debug for CrawlerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlerOptions")
            .field("min_concurrency", &self.min_concurrency)
            .field("max_concurrency", &self.max_concurrency)
            .field("max_retries", &self.max_retries)
            .field("request_timeout", &self.request_timeout)
            .field("max_requests_per_run", &self.max_requests_per_run)
            .finish_non_exhaustive()
    }
}

/// Outcome counters of one run.
///
/// `delivered + sink_errors + failed + abandoned` equals the number of
/// admitted requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records extracted and stored.
    pub delivered: usize,
    /// Requests handed to the failure reporter.
    pub failed: usize,
    /// Records extracted but rejected by the sink.
    pub sink_errors: usize,
    /// Requests left unfinished by cancellation.
    pub abandoned: usize,
    /// Requests beyond the per-run limit.
    pub skipped: usize,
    pub attempts: usize,
    pub peak_in_flight: usize,
}

pub struct Crawler {
    options: CrawlerOptions,
    http_client: Arc<dyn HttpClient>,
    sink: Arc<dyn ResultSink>,
    reporter: Arc<dyn FailureReporter>,
}

impl Crawler {
    pub fn new(
        options: CrawlerOptions,
        http_client: Arc<dyn HttpClient>,
        sink: Arc<dyn ResultSink>,
        reporter: Arc<dyn FailureReporter>,
    ) -> Result<Self, Error> {
        options.validate()?;
        Ok(Self {
            options,
            http_client,
            sink,
            reporter,
        })
    }

    pub async fn run(&self, spider: Arc<dyn Spider>, token: CancellationToken) -> RunSummary {
        let span = tracing::info_span!("run", spider = %spider.name());
        let extractor = spider.extractor();
        self.run_requests(spider.start_requests(), &extractor, token)
            .instrument(span)
            .await
    }

    /// Processes `requests` until every admitted one is terminal, or until
    /// the in-flight attempts drain after `token` is cancelled.
    pub async fn run_requests(
        &self,
        requests: Vec<RequestSpec>,
        extractor: &Extractor,
        token: CancellationToken,
    ) -> RunSummary {
        let mut frontier = Frontier::new(
            requests,
            self.options.max_requests_per_run,
            self.options.max_retries,
        );
        let mut summary = RunSummary {
            skipped: frontier.skipped(),
            ..Default::default()
        };
        tracing::info!(
            requests = frontier.admitted(),
            min_concurrency = self.options.min_concurrency,
            max_concurrency = self.options.max_concurrency,
            max_retries = self.options.max_retries,
            "starting crawl"
        );

        let mut in_flight: FuturesUnordered<BoxFuture<'_, Event>> = FuturesUnordered::new();
        let mut fetching = 0;
        loop {
            while !token.is_cancelled() && fetching < self.options.max_concurrency {
                let Some(attempt) = frontier.take_next() else {
                    break;
                };
                summary.attempts += 1;
                fetching += 1;
                in_flight.push(self.fetch(attempt).boxed());
            }
            summary.peak_in_flight = summary.peak_in_flight.max(fetching);

            let Some(event) = in_flight.next().await else {
                break;
            };
            match event {
                Event::Fetched(attempt, result) => {
                    fetching -= 1;
                    let delivery = self.resolve(
                        &mut frontier,
                        &mut summary,
                        extractor,
                        attempt,
                        result,
                        token.is_cancelled(),
                    );
                    if let Some(delivery) = delivery {
                        in_flight.push(delivery);
                    }
                }
                Event::Stored { url, result } => match result {
                    Ok(()) => summary.delivered += 1,
                    Err(err) => {
                        tracing::error!(url = %url, "failed storing record: {}", err);
                        summary.sink_errors += 1;
                    }
                },
                Event::Reported => {}
            }
        }

        summary.abandoned = frontier.pending();
        if summary.abandoned > 0 {
            tracing::warn!(abandoned = summary.abandoned, "crawl cancelled");
        }
        tracing::info!(
            delivered = summary.delivered,
            failed = summary.failed,
            sink_errors = summary.sink_errors,
            attempts = summary.attempts,
            "Crawler finished."
        );
        summary
    }

    async fn fetch(&self, attempt: Attempt) -> Event {
        let span = tracing::debug_span!(
            "attempt",
            url = attempt.url(),
            attempt = attempt.attempt_number
        );
        let timeout = self.options.request_timeout;
        let result = async {
            if attempt.attempt_number > 0 {
                let delay = (self.options.retry_delay)(attempt.attempt_number);
                if !delay.is_zero() {
                    tracing::debug!(?delay, "waiting before retry");
                    tokio::time::sleep(delay).await;
                }
            }
            tracing::debug!("Processing {}...", attempt.url());
            match tokio::time::timeout(timeout, self.http_client.send(&attempt.spec, timeout)).await
            {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout),
            }
        }
        .instrument(span)
        .await;
        Event::Fetched(attempt, result)
    }

    /// Books the outcome of one attempt. Returns the sink or reporter call
    /// to run when the request reached its terminal outcome.
    fn resolve(
        &self,
        frontier: &mut Frontier,
        summary: &mut RunSummary,
        extractor: &Extractor,
        attempt: Attempt,
        result: Result<Response, TransportError>,
        cancelled: bool,
    ) -> Option<BoxFuture<'static, Event>> {
        let url = attempt.url();
        let elapsed = attempt.started_at.elapsed();
        match result {
            Err(err) => {
                tracing::debug!(
                    url,
                    attempt = attempt.attempt_number,
                    ?elapsed,
                    "attempt failed: {}",
                    err
                );
                match frontier.retry(&attempt) {
                    RetryVerdict::Requeued { next_attempt } if cancelled => {
                        // stays queued but is never taken again; counted as abandoned
                        tracing::debug!(url, next_attempt, "run cancelled, not retrying");
                        None
                    }
                    RetryVerdict::Requeued { next_attempt } => {
                        tracing::debug!(url, next_attempt, "requeued");
                        None
                    }
                    RetryVerdict::Exhausted { attempts } => {
                        tracing::debug!("Request {} failed {} times.", url, attempts);
                        summary.failed += 1;
                        Some(self.report(attempt.spec, FailureReason::Transport(err)))
                    }
                }
            }
            Ok(response) => {
                tracing::trace!(url, status = response.status, ?elapsed, "response received");
                if !frontier.mark_terminal(url) {
                    tracing::error!(url, "request already finished, dropping response");
                    return None;
                }
                match extractor.extract(url, &response.body) {
                    Ok(record) => {
                        let sink = self.sink.clone();
                        Some(
                            async move {
                                let result = sink.store(&record).await;
                                Event::Stored {
                                    url: record.source_url,
                                    result,
                                }
                            }
                            .boxed(),
                        )
                    }
                    Err(err) => {
                        tracing::error!(
                            url,
                            status = response.status,
                            content_type = ?response.content_type(),
                            "malformed payload: {}",
                            err
                        );
                        summary.failed += 1;
                        Some(self.report(attempt.spec, FailureReason::Malformed(err)))
                    }
                }
            }
        }
    }

    fn report(&self, request: RequestSpec, reason: FailureReason) -> BoxFuture<'static, Event> {
        let reporter = self.reporter.clone();
        async move {
            reporter.notify(&request, &reason).await;
            Event::Reported
        }
        .boxed()
    }
}

/// What the coordinator gets back from its in-flight work.
enum Event {
    Fetched(Attempt, Result<Response, TransportError>),
    Stored {
        url: String,
        result: Result<(), SinkError>,
    },
    Reported,
}
