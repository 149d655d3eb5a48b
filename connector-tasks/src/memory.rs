//! In-process task store with fulfiller hooks.

use std::collections::HashMap;

use async_trait::async_trait;
use connector_primitives::TaskId;
use tokio::sync::RwLock;

use crate::error::{TaskError, TaskResult};
use crate::model::ScrapeTask;
use crate::store::TaskStore;

/// Tasks held in process memory.
///
/// Besides [`TaskStore`], it exposes the fulfiller side (`start`,
/// `complete`, `fail`) so an in-process worker or a test can resolve tasks.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, ScrapeTask>>,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: TaskId, apply: F) -> TaskResult<ScrapeTask>
    where
        F: FnOnce(&mut ScrapeTask) -> TaskResult<()>,
    {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(TaskError::NotFound { id })?;
        apply(task)?;
        Ok(task.clone())
    }

    /// Marks a pending task as picked up.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] or [`TaskError::InvalidTransition`].
    pub async fn start(&self, id: TaskId) -> TaskResult<ScrapeTask> {
        self.update(id, ScrapeTask::start).await
    }

    /// Completes a processing task with its result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] or [`TaskError::InvalidTransition`].
    pub async fn complete(&self, id: TaskId, result: impl Into<String>) -> TaskResult<ScrapeTask> {
        let result = result.into();
        self.update(id, |task| task.complete(result)).await
    }

    /// Fails a non-terminal task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] or [`TaskError::InvalidTransition`].
    pub async fn fail(
        &self,
        id: TaskId,
        message: impl Into<String>,
        suggestion: Option<String>,
    ) -> TaskResult<ScrapeTask> {
        let message = message.into();
        self.update(id, |task| task.fail(message, suggestion)).await
    }

    /// Oldest pending task, for a worker looking for work.
    pub async fn next_pending(&self) -> Option<ScrapeTask> {
        self.tasks
            .read()
            .await
            .values()
            .filter(|task| task.status() == crate::TaskStatus::Pending)
            .min_by_key(|task| task.created_at())
            .cloned()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, url: &str) -> TaskResult<ScrapeTask> {
        let task = ScrapeTask::pending(url);
        self.tasks.write().await.insert(task.id(), task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: TaskId) -> TaskResult<Option<ScrapeTask>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskStatus;

    #[tokio::test]
    async fn fulfiller_hooks_drive_the_lifecycle() {
        let store = InMemoryTaskStore::new();
        let task = store.create_task("https://example.com").await.unwrap();
        assert_eq!(store.next_pending().await.map(|t| t.id()), Some(task.id()));

        store.start(task.id()).await.unwrap();
        assert!(store.next_pending().await.is_none());
        let done = store.complete(task.id(), "body").await.unwrap();
        assert_eq!(done.status(), TaskStatus::Completed);

        let stored = store.get_task(task.id()).await.unwrap().unwrap();
        assert_eq!(stored, done);
    }

    #[tokio::test]
    async fn hooks_reject_unknown_and_illegal_updates() {
        let store = InMemoryTaskStore::new();
        assert!(matches!(
            store.start(TaskId::random()).await,
            Err(TaskError::NotFound { .. })
        ));

        let task = store.create_task("https://example.com").await.unwrap();
        assert!(matches!(
            store.complete(task.id(), "early").await,
            Err(TaskError::InvalidTransition { .. })
        ));
        assert_eq!(
            store.get_task(task.id()).await.unwrap().unwrap().status(),
            TaskStatus::Pending
        );
    }
}
