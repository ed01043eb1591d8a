use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::api::TdxClient;
use crate::error::ToolError;
use crate::observability::metrics::get_metrics;
use crate::registry::environments::EnvironmentRegistry;
use crate::server::protocol::ToolDefinition;
use crate::shaping::projection::EntityKind;
use crate::shaping::{to_pretty_json, ResponseShaper, ShapingResult};
use crate::tools::args::{
    parse, AddFeedArgs, EnvironmentArgs, RecordArgs, SearchIssuesArgs, SearchProjectsArgs,
    UpdateIssueArgs, UpdateProjectArgs,
};
use crate::tools::catalogue::{tool_definitions, ToolName};

/// Routes a tool call to the right environment and endpoint, and renders the
/// shaped result as the text handed back to the agent.
#[derive(Clone)]
pub struct ToolHandlers {
    registry: Arc<EnvironmentRegistry>,
    shaper: ResponseShaper,
}

impl ToolHandlers {
    pub fn new(registry: Arc<EnvironmentRegistry>, shaper: ResponseShaper) -> Self {
        Self { registry, shaper }
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        tool_definitions(&self.registry.available())
    }

    pub async fn call(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let metrics = get_metrics();
        let Some(tool) = ToolName::from_name(name) else {
            metrics.tool_calls.with_label_values(&["unknown", "unknown_tool"]).inc();
            warn!(tool = %name, "unknown tool requested");
            return Err(ToolError::UnknownTool(name.to_string()));
        };

        let start = Instant::now();
        let result = self.dispatch(tool, args).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.kind(),
        };
        metrics.tool_calls.with_label_values(&[tool.as_str(), outcome]).inc();
        debug!(
            tool = tool.as_str(),
            outcome,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "tool call finished"
        );
        result
    }

    async fn dispatch(&self, tool: ToolName, args: Value) -> Result<String, ToolError> {
        match tool {
            ToolName::GetProject => {
                let args: RecordArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let project_id = args.project().ok_or_else(|| missing("projectId is required"))?;
                let project = client.get_project(project_id).await?;
                Ok(to_pretty_json(&self.shaper.shape_record(project)))
            }
            ToolName::UpdateProject => {
                let args: UpdateProjectArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let (Some(project_id), Some(data)) = (non_zero(args.project_id), non_null(args.project_data))
                else {
                    return Err(missing("projectId and projectData are required"));
                };
                let updated = client.update_project(project_id, &data).await?;
                let summary = format!(
                    "Project #{} \"{}\" updated successfully.",
                    field_text(&updated, "ID"),
                    field_text(&updated, "Name")
                );
                Ok(format!(
                    "{}\n\nUpdated project details:\n{}",
                    summary,
                    to_pretty_json(&self.shaper.shape_record(updated))
                ))
            }
            ToolName::SearchProjects => {
                let args: SearchProjectsArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let projects = client.search_projects(args.into()).await?;
                Ok(self.collection(tool, EntityKind::Project, projects))
            }
            ToolName::ListProjects => {
                let args: EnvironmentArgs = parse(args)?;
                let projects = self.client(&args.environment)?.list_projects().await?;
                Ok(self.collection(tool, EntityKind::Project, projects))
            }
            ToolName::GetProjectResources => {
                let args: RecordArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let project_id = args.project().ok_or_else(|| missing("projectId is required"))?;
                Ok(to_pretty_json(&client.get_project_resources(project_id).await?))
            }
            ToolName::GetProjectFeed => {
                let args: RecordArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let project_id = args.project().ok_or_else(|| missing("projectId is required"))?;
                let feed = client.get_project_feed(project_id).await?;
                Ok(self.feed(tool, feed))
            }
            ToolName::AddProjectFeed => {
                let args: AddFeedArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let (Some(project_id), Some(entry)) = (non_zero(args.project_id), args.entry()) else {
                    return Err(missing("projectId and comments are required"));
                };
                let created = client.add_project_feed_entry(project_id, &entry).await?;
                Ok(format!(
                    "Feed entry #{} added to project #{} successfully.",
                    field_text(&created, "ID"),
                    project_id
                ))
            }
            ToolName::GetIssue => {
                let args: RecordArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let (Some(project_id), Some(issue_id)) = (args.project(), args.issue()) else {
                    return Err(missing("projectId and issueId are required"));
                };
                let issue = client.get_issue(project_id, issue_id).await?;
                Ok(to_pretty_json(&self.shaper.shape_record(issue)))
            }
            ToolName::UpdateIssue => {
                let args: UpdateIssueArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let (Some(project_id), Some(issue_id), Some(data)) = (
                    non_zero(args.project_id),
                    non_zero(args.issue_id),
                    non_null(args.issue_data),
                ) else {
                    return Err(missing("projectId, issueId, and issueData are required"));
                };
                let updated = client.update_issue(project_id, issue_id, &data).await?;
                let summary = format!(
                    "Issue #{} \"{}\" updated successfully.",
                    field_text(&updated, "ID"),
                    field_text(&updated, "Title")
                );
                Ok(format!(
                    "{}\n\nUpdated issue details:\n{}",
                    summary,
                    to_pretty_json(&self.shaper.shape_record(updated))
                ))
            }
            ToolName::SearchIssues => {
                let args: SearchIssuesArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let issues = client.search_issues(args.into()).await?;
                Ok(self.collection(tool, EntityKind::Issue, issues))
            }
            ToolName::GetIssueFeed => {
                let args: RecordArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let (Some(project_id), Some(issue_id)) = (args.project(), args.issue()) else {
                    return Err(missing("projectId and issueId are required"));
                };
                let feed = client.get_issue_feed(project_id, issue_id).await?;
                Ok(self.feed(tool, feed))
            }
            ToolName::AddIssueFeed => {
                let args: AddFeedArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let (Some(project_id), Some(issue_id), Some(entry)) =
                    (non_zero(args.project_id), non_zero(args.issue_id), args.entry())
                else {
                    return Err(missing("projectId, issueId, and comments are required"));
                };
                let created = client.add_issue_feed_entry(project_id, issue_id, &entry).await?;
                Ok(format!(
                    "Feed entry #{} added to issue #{} successfully.",
                    field_text(&created, "ID"),
                    issue_id
                ))
            }
            ToolName::GetIssueCategories => {
                let args: RecordArgs = parse(args)?;
                let client = self.client(&args.environment)?;
                let project_id = args.project().ok_or_else(|| missing("projectId is required"))?;
                Ok(to_pretty_json(&client.get_issue_categories(project_id).await?))
            }
            ToolName::GetIssuePriorities => {
                let args: EnvironmentArgs = parse(args)?;
                let priorities = self.client(&args.environment)?.get_issue_priorities().await?;
                Ok(to_pretty_json(&priorities))
            }
            ToolName::GetIssueStatuses => {
                let args: EnvironmentArgs = parse(args)?;
                let statuses = self.client(&args.environment)?.get_issue_statuses().await?;
                Ok(to_pretty_json(&statuses))
            }
        }
    }

    fn client(&self, environment: &Option<String>) -> Result<&TdxClient, ToolError> {
        self.registry.resolve(environment.as_deref())
    }

    fn collection(&self, tool: ToolName, kind: EntityKind, payload: Value) -> String {
        let shaped = self.shaper.shape_collection(kind, payload);
        self.note_truncation(tool, &shaped);
        shaped.render()
    }

    fn feed(&self, tool: ToolName, payload: Value) -> String {
        let shaped = self.shaper.shape_feed(payload);
        self.note_truncation(tool, &shaped);
        shaped.render()
    }

    fn note_truncation(&self, tool: ToolName, shaped: &ShapingResult) {
        if shaped.truncated {
            info!(
                tool = tool.as_str(),
                returned = shaped.returned_count,
                total = shaped.original_count,
                "result truncated to fit the response budget"
            );
            get_metrics()
                .shaping_truncations
                .with_label_values(&[tool.as_str()])
                .inc();
        }
    }
}

fn missing(message: &str) -> ToolError {
    ToolError::InvalidArguments(message.to_string())
}

fn non_zero(id: Option<u64>) -> Option<u64> {
    id.filter(|id| *id != 0)
}

fn non_null(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

/// Field of an API record as plain text (strings unquoted).
fn field_text(record: &Value, field: &str) -> String {
    match record.get(field) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn handlers() -> ToolHandlers {
        let registry = EnvironmentRegistry::new(BTreeMap::new(), BTreeMap::new(), "prod");
        ToolHandlers::new(Arc::new(registry), ResponseShaper::default())
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let err = handlers().call("tdx_delete_everything", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: tdx_delete_everything");
    }

    #[tokio::test]
    async fn environment_is_resolved_before_arguments_are_checked() {
        let err = handlers().call("tdx_get_project", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownEnvironment { .. }));
    }

    #[tokio::test]
    async fn malformed_arguments_are_invalid() {
        let err = handlers()
            .call("tdx_get_issue", json!({"projectId": "seven"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn field_text_renders_plain_values() {
        let record = json!({"ID": 12, "Name": "Portal", "Title": null});
        assert_eq!(field_text(&record, "ID"), "12");
        assert_eq!(field_text(&record, "Name"), "Portal");
        assert_eq!(field_text(&record, "Title"), "unknown");
    }

    #[test]
    fn definitions_cover_every_tool() {
        assert_eq!(handlers().definitions().len(), ToolName::ALL.len());
    }
}
