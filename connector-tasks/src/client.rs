//! Creating and polling scrape tasks.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use connector_primitives::TaskId;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info};

use crate::error::{TaskError, TaskResult};
use crate::model::{ScrapeTask, TaskStatus};
use crate::store::TaskStore;

/// How long to wait for a task and how often to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    timeout: Duration,
    interval: Duration,
}

impl WaitOptions {
    /// Creates wait options.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidWait`] when either duration is zero or the
    /// interval exceeds the timeout.
    pub fn new(timeout: Duration, interval: Duration) -> TaskResult<Self> {
        if timeout.is_zero() {
            return Err(TaskError::InvalidWait("timeout must be positive"));
        }
        if interval.is_zero() {
            return Err(TaskError::InvalidWait("poll interval must be positive"));
        }
        if interval > timeout {
            return Err(TaskError::InvalidWait("poll interval exceeds timeout"));
        }
        Ok(Self { timeout, interval })
    }

    /// Same interval, different timeout. The interval shrinks to fit.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let timeout = timeout.max(Duration::from_millis(1));
        Self {
            timeout,
            interval: self.interval.min(timeout),
        }
    }

    /// Total wait budget.
    #[must_use]
    pub const fn timeout(self) -> Duration {
        self.timeout
    }

    /// Delay between polls.
    #[must_use]
    pub const fn interval(self) -> Duration {
        self.interval
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(1),
        }
    }
}

/// Creates tasks and observes them until they finish.
pub struct AsyncTaskClient {
    store: Arc<dyn TaskStore>,
    wait: WaitOptions,
}

impl fmt::Debug for AsyncTaskClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTaskClient")
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl AsyncTaskClient {
    /// Creates a client with default wait options.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            wait: WaitOptions::default(),
        }
    }

    /// Replaces the default wait options.
    #[must_use]
    pub fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Default wait options.
    #[must_use]
    pub fn wait_options(&self) -> WaitOptions {
        self.wait
    }

    /// Creates a pending task and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidUrl`] for anything but an absolute http(s)
    /// URL, before the store is touched, or the store's error.
    pub async fn create(&self, url: &str) -> TaskResult<ScrapeTask> {
        let url = check_url(url)?;
        let task = self.store.create_task(url).await?;
        info!(task_id = %task.id(), "scrape task created");
        Ok(task)
    }

    /// Returns the stored task verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown id, or the store's error.
    pub async fn get(&self, id: TaskId) -> TaskResult<ScrapeTask> {
        self.store
            .get_task(id)
            .await?
            .ok_or(TaskError::NotFound { id })
    }

    /// Polls until the task is terminal or the budget is spent.
    ///
    /// The first poll is immediate; later polls are `interval` apart, and the
    /// final poll lands at the deadline. A store read still outstanding at the
    /// deadline is abandoned and the last status seen decides the error.
    /// Dropping the future stops polling.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidWait`] if the timeout overflows the clock.
    /// - [`TaskError::FulfillerNotRunning`] if still pending at the deadline.
    /// - [`TaskError::TimedOut`] if still processing at the deadline.
    /// - [`TaskError::Failed`] if the fulfiller failed it.
    /// - [`TaskError::EmptyResult`] if it completed with empty content.
    /// - [`TaskError::NotFound`] or a store error from any poll.
    pub async fn wait_for(&self, id: TaskId, options: WaitOptions) -> TaskResult<ScrapeTask> {
        let started = Instant::now();
        let deadline = started
            .checked_add(options.timeout)
            .ok_or(TaskError::InvalidWait("timeout too large"))?;
        let mut polls = 0_u32;
        let mut last_status = TaskStatus::Pending;

        loop {
            let Ok(polled) = timeout_at(deadline, self.get(id)).await else {
                debug!(task_id = %id, polls, status = %last_status, "task store did not answer before the deadline");
                return Err(expired(id, started.elapsed(), last_status));
            };
            let task = polled?;
            polls += 1;

            match task.status() {
                TaskStatus::Completed => {
                    if task.result().is_none_or(|r| r.trim().is_empty()) {
                        return Err(TaskError::EmptyResult { id });
                    }
                    debug!(task_id = %id, polls, "task completed");
                    return Ok(task);
                }
                TaskStatus::Failed => {
                    return Err(TaskError::Failed {
                        message: task
                            .error_message()
                            .unwrap_or("the page could not be scraped")
                            .to_owned(),
                        suggestion: task.suggestion().map(str::to_owned),
                    });
                }
                status @ (TaskStatus::Pending | TaskStatus::Processing) => {
                    last_status = status;
                    let now = Instant::now();
                    if now >= deadline {
                        debug!(task_id = %id, polls, %status, "task wait budget spent");
                        return Err(expired(id, now - started, status));
                    }
                    sleep(options.interval.min(deadline - now)).await;
                }
            }
        }
    }
}

fn expired(id: TaskId, waited: Duration, status: TaskStatus) -> TaskError {
    if status == TaskStatus::Pending {
        TaskError::FulfillerNotRunning { id, waited }
    } else {
        TaskError::TimedOut {
            id,
            waited,
            last_status: status,
        }
    }
}

fn check_url(url: &str) -> TaskResult<&str> {
    let url = url.trim();
    let invalid = |reason: &str| TaskError::InvalidUrl {
        url: url.to_owned(),
        reason: reason.to_owned(),
    };
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| invalid("only http and https URLs can be scraped"))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::memory::InMemoryTaskStore;

    /// Counts reads, delegating to an in-memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryTaskStore,
        reads: AtomicUsize,
        creates: AtomicUsize,
    }

    #[async_trait]
    impl TaskStore for CountingStore {
        async fn create_task(&self, url: &str) -> TaskResult<ScrapeTask> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create_task(url).await
        }

        async fn get_task(&self, id: TaskId) -> TaskResult<Option<ScrapeTask>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_task(id).await
        }
    }

    /// Creates tasks, then never answers a read.
    struct StalledStore;

    #[async_trait]
    impl TaskStore for StalledStore {
        async fn create_task(&self, url: &str) -> TaskResult<ScrapeTask> {
            Ok(ScrapeTask::pending(url))
        }

        async fn get_task(&self, _id: TaskId) -> TaskResult<Option<ScrapeTask>> {
            std::future::pending().await
        }
    }

    fn client() -> (Arc<CountingStore>, AsyncTaskClient) {
        let store = Arc::new(CountingStore::default());
        (store.clone(), AsyncTaskClient::new(store))
    }

    fn options(timeout_ms: u64, interval_ms: u64) -> WaitOptions {
        WaitOptions::new(Duration::from_millis(timeout_ms), Duration::from_millis(interval_ms)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn pending_task_times_out_as_fulfiller_not_running() {
        let (store, client) = client();
        let task = client.create("https://example.com/jobs").await.unwrap();

        let started = Instant::now();
        let err = client.wait_for(task.id(), options(10_000, 1_000)).await.unwrap_err();

        assert!(matches!(err, TaskError::FulfillerNotRunning { .. }));
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        // One immediate poll plus one per interval.
        assert_eq!(store.reads.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn processing_task_times_out_with_last_status() {
        let (store, client) = client();
        let task = client.create("https://example.com").await.unwrap();
        store.inner.start(task.id()).await.unwrap();

        let err = client.wait_for(task.id(), options(3_000, 1_000)).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::TimedOut { last_status: TaskStatus::Processing, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_read_ends_at_the_deadline() {
        let client = AsyncTaskClient::new(Arc::new(StalledStore));
        let task = client.create("https://example.com").await.unwrap();

        let started = Instant::now();
        let err = client
            .wait_for(task.id(), options(5_000, 1_000))
            .await
            .unwrap_err();

        assert!(matches!(err, TaskError::FulfillerNotRunning { waited, .. } if waited == Duration::from_secs(5)));
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn overflowing_timeout_is_rejected() {
        let (store, client) = client();
        let task = client.create("https://example.com").await.unwrap();

        let err = client
            .wait_for(task.id(), WaitOptions::default().with_timeout(Duration::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidWait(_)));
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn get_returns_state_verbatim() {
        let (store, client) = client();
        let task = client.create("https://example.com").await.unwrap();
        assert_eq!(client.get(task.id()).await.unwrap().status(), TaskStatus::Pending);

        store.inner.start(task.id()).await.unwrap();
        store.inner.complete(task.id(), "Hello, page").await.unwrap();

        let seen = client.get(task.id()).await.unwrap();
        assert_eq!(seen.status(), TaskStatus::Completed);
        assert_eq!(seen.result(), Some("Hello, page"));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_resolves_when_the_fulfiller_finishes() {
        let (store, client) = client();
        let task = client.create("https://example.com").await.unwrap();
        let id = task.id();

        let fulfiller = {
            let store = store.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(2_500)).await;
                store.inner.start(id).await.unwrap();
                store.inner.complete(id, "content").await.unwrap();
            })
        };

        let done = client.wait_for(id, options(10_000, 1_000)).await.unwrap();
        fulfiller.await.unwrap();
        assert_eq!(done.result(), Some("content"));
        assert_eq!(store.reads.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_result_and_failure_are_distinct() {
        let (store, client) = client();

        let empty = client.create("https://example.com/a").await.unwrap();
        store.inner.start(empty.id()).await.unwrap();
        store.inner.complete(empty.id(), "  ").await.unwrap();
        assert!(matches!(
            client.wait_for(empty.id(), options(1_000, 100)).await,
            Err(TaskError::EmptyResult { .. })
        ));

        let failed = client.create("https://example.com/b").await.unwrap();
        store
            .inner
            .fail(failed.id(), "login wall", Some("sign in first".into()))
            .await
            .unwrap();
        let err = client.wait_for(failed.id(), options(1_000, 100)).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::Failed { ref message, suggestion: Some(_) } if message == "login wall"
        ));
    }

    #[tokio::test]
    async fn rejects_bad_urls_before_touching_the_store() {
        let (store, client) = client();
        for bad in ["ftp://example.com", "example.com", "https://", "javascript:alert(1)"] {
            assert!(matches!(client.create(bad).await, Err(TaskError::InvalidUrl { .. })), "{bad}");
        }
        assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (_, client) = client();
        assert!(matches!(client.get(TaskId::random()).await, Err(TaskError::NotFound { .. })));
    }

    #[test]
    fn wait_options_validate() {
        assert!(WaitOptions::new(Duration::ZERO, Duration::from_secs(1)).is_err());
        assert!(WaitOptions::new(Duration::from_secs(1), Duration::ZERO).is_err());
        assert!(WaitOptions::new(Duration::from_secs(1), Duration::from_secs(2)).is_err());
        let shorter = WaitOptions::default().with_timeout(Duration::from_millis(500));
        assert_eq!(shorter.interval(), Duration::from_millis(500));
    }
}
