use serde_json::Value;

use crate::client::requests::{IssueSearch, NewFeedEntry, ProjectSearch};
use crate::error::ApiResult;
use crate::resilience::executor::RequestExecutor;

/// TDX projects and issues endpoints for one environment.
///
/// Every call goes through the environment's `RequestExecutor`, so auth
/// refresh and retries apply uniformly. Payloads are returned as raw JSON;
/// shaping happens in the tool layer. The projects API is not scoped by
/// application id; the ids configured for an environment are only validated.
#[derive(Clone)]
pub struct TdxClient {
    executor: RequestExecutor,
}

impl TdxClient {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    pub fn environment(&self) -> &str {
        self.executor.environment()
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    // projects

    pub async fn get_project(&self, project_id: u64) -> ApiResult<Value> {
        self.executor.get(&format!("/api/projects/{project_id}")).await
    }

    pub async fn update_project(&self, project_id: u64, project: &Value) -> ApiResult<Value> {
        self.executor.post(&format!("/api/projects/{project_id}"), project).await
    }

    pub async fn search_projects(&self, search: ProjectSearch) -> ApiResult<Value> {
        self.executor.post("/api/projects/search", &search.clamped()).await
    }

    /// Projects the service account is a member of.
    pub async fn list_projects(&self) -> ApiResult<Value> {
        self.executor.get("/api/projects/list").await
    }

    pub async fn get_project_resources(&self, project_id: u64) -> ApiResult<Value> {
        self.executor.get(&format!("/api/projects/{project_id}/resources")).await
    }

    pub async fn get_project_feed(&self, project_id: u64) -> ApiResult<Value> {
        self.executor.get(&format!("/api/projects/{project_id}/feed")).await
    }

    pub async fn add_project_feed_entry(&self, project_id: u64, entry: &NewFeedEntry) -> ApiResult<Value> {
        self.executor.post(&format!("/api/projects/{project_id}/feed"), entry).await
    }

    // issues

    pub async fn get_issue(&self, project_id: u64, issue_id: u64) -> ApiResult<Value> {
        self.executor
            .get(&format!("/api/projects/{project_id}/issues/{issue_id}"))
            .await
    }

    pub async fn update_issue(&self, project_id: u64, issue_id: u64, issue: &Value) -> ApiResult<Value> {
        self.executor
            .post(&format!("/api/projects/{project_id}/issues/{issue_id}"), issue)
            .await
    }

    pub async fn search_issues(&self, search: IssueSearch) -> ApiResult<Value> {
        self.executor.post("/api/projects/issues/search", &search.clamped()).await
    }

    pub async fn get_issue_feed(&self, project_id: u64, issue_id: u64) -> ApiResult<Value> {
        self.executor
            .get(&format!("/api/projects/{project_id}/issues/{issue_id}/feed"))
            .await
    }

    pub async fn add_issue_feed_entry(
        &self,
        project_id: u64,
        issue_id: u64,
        entry: &NewFeedEntry,
    ) -> ApiResult<Value> {
        self.executor
            .post(&format!("/api/projects/{project_id}/issues/{issue_id}/feed"), entry)
            .await
    }

    pub async fn get_issue_categories(&self, project_id: u64) -> ApiResult<Value> {
        self.executor
            .get(&format!("/api/projects/{project_id}/issues/categories"))
            .await
    }

    pub async fn get_issue_priorities(&self) -> ApiResult<Value> {
        self.executor.get("/api/projects/issues/priorities").await
    }

    pub async fn get_issue_statuses(&self) -> ApiResult<Value> {
        self.executor.get("/api/projects/issues/statuses").await
    }
}
