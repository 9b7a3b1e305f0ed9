//! Workflow storage seam.
//!
//! The engine reads definitions through the `WorkflowStore` trait.
//! Durable backends live outside this crate; the in-memory store covers
//! embedding and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::workflow::WorkflowDefinition;

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowDefinition>>;

    async fn put_workflow(&self, workflow: WorkflowDefinition) -> Result<()>;

    async fn delete_workflow(&self, id: &str) -> Result<bool>;

    async fn list_workflow_ids(&self) -> Result<Vec<String>>;
}

/// In-memory workflow store keyed by workflow id.
#[derive(Clone, Default)]
pub struct InMemoryWorkflowStore {
    workflows: Arc<RwLock<HashMap<String, WorkflowDefinition>>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowDefinition>> {
        Ok(self.workflows.read().await.get(id).cloned())
    }

    async fn put_workflow(&self, workflow: WorkflowDefinition) -> Result<()> {
        self.workflows
            .write()
            .await
            .insert(workflow.id.clone(), workflow);
        Ok(())
    }

    async fn delete_workflow(&self, id: &str) -> Result<bool> {
        Ok(self.workflows.write().await.remove(id).is_some())
    }

    async fn list_workflow_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.workflows.read().await.keys().cloned().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
