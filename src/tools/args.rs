//! Tool arguments as agents send them (camelCase), and their conversion to
//! API request bodies.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::client::requests::{IssueSearch, NewFeedEntry, ProjectSearch};
use crate::error::ToolError;

/// Missing or `null` arguments deserialize as the all-`None` value.
pub fn parse<T: DeserializeOwned + Default>(args: Value) -> Result<T, ToolError> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(format!("invalid arguments: {e}")))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentArgs {
    pub environment: Option<String>,
}

/// Tools addressed by project and optionally issue.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordArgs {
    pub environment: Option<String>,
    pub project_id: Option<u64>,
    pub issue_id: Option<u64>,
}

impl RecordArgs {
    pub fn project(&self) -> Option<u64> {
        non_zero(self.project_id)
    }

    pub fn issue(&self) -> Option<u64> {
        non_zero(self.issue_id)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectArgs {
    pub environment: Option<String>,
    pub project_id: Option<u64>,
    pub project_data: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueArgs {
    pub environment: Option<String>,
    pub project_id: Option<u64>,
    pub issue_id: Option<u64>,
    pub issue_data: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFeedArgs {
    pub environment: Option<String>,
    pub project_id: Option<u64>,
    pub issue_id: Option<u64>,
    pub comments: Option<String>,
    pub is_private: Option<bool>,
    pub notify: Option<Vec<String>>,
}

impl AddFeedArgs {
    /// The entry body, or `None` when there is no comment text.
    pub fn entry(&self) -> Option<NewFeedEntry> {
        let comments = self.comments.as_deref().filter(|c| !c.is_empty())?;
        Some(NewFeedEntry {
            comments: comments.to_string(),
            is_private: self.is_private.unwrap_or(false),
            notify: self.notify.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchProjectsArgs {
    pub environment: Option<String>,
    pub search_text: Option<String>,
    pub max_results: Option<u64>,
    #[serde(rename = "statusIDs")]
    pub status_ids: Option<Vec<u64>>,
    #[serde(rename = "managerUIDs")]
    pub manager_uids: Option<Vec<String>>,
    #[serde(rename = "typeIDs")]
    pub type_ids: Option<Vec<u64>>,
    #[serde(rename = "priorityIDs")]
    pub priority_ids: Option<Vec<u64>>,
    #[serde(rename = "resourceUIDs")]
    pub resource_uids: Option<Vec<String>>,
    pub modified_date_from: Option<String>,
    pub modified_date_to: Option<String>,
}

impl From<SearchProjectsArgs> for ProjectSearch {
    fn from(args: SearchProjectsArgs) -> Self {
        ProjectSearch {
            search_text: non_blank(args.search_text),
            max_results: non_zero(args.max_results),
            status_ids: args.status_ids,
            manager_uids: args.manager_uids,
            type_ids: args.type_ids,
            priority_ids: args.priority_ids,
            resource_uids: args.resource_uids,
            modified_date_from: non_blank(args.modified_date_from),
            modified_date_to: non_blank(args.modified_date_to),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIssuesArgs {
    pub environment: Option<String>,
    pub project_id: Option<u64>,
    pub search_text: Option<String>,
    pub max_results: Option<u64>,
    #[serde(rename = "statusIDs")]
    pub status_ids: Option<Vec<u64>>,
    #[serde(rename = "priorityIDs")]
    pub priority_ids: Option<Vec<u64>>,
    #[serde(rename = "categoryIDs")]
    pub category_ids: Option<Vec<u64>>,
    #[serde(rename = "responsibleUIDs")]
    pub responsible_uids: Option<Vec<String>>,
    pub modified_date_from: Option<String>,
    pub modified_date_to: Option<String>,
}

impl From<SearchIssuesArgs> for IssueSearch {
    fn from(args: SearchIssuesArgs) -> Self {
        IssueSearch {
            project_ids: non_zero(args.project_id).map(|id| vec![id]),
            search_text: non_blank(args.search_text),
            max_results: non_zero(args.max_results),
            status_ids: args.status_ids,
            priority_ids: args.priority_ids,
            category_ids: args.category_ids,
            responsible_uids: args.responsible_uids,
            modified_date_from: non_blank(args.modified_date_from),
            modified_date_to: non_blank(args.modified_date_to),
        }
    }
}

fn non_zero(value: Option<u64>) -> Option<u64> {
    value.filter(|v| *v != 0)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_arguments_map_to_api_fields() {
        let args: SearchIssuesArgs = parse(json!({
            "environment": "test",
            "projectId": 42,
            "searchText": "login",
            "maxResults": 25,
            "statusIDs": [1, 2],
            "categoryIDs": [7],
            "responsibleUIDs": ["uid-1"],
            "modifiedDateFrom": "2025-01-01"
        }))
        .unwrap();
        assert_eq!(args.environment.as_deref(), Some("test"));

        let search = IssueSearch::from(args);
        assert_eq!(
            serde_json::to_value(&search).unwrap(),
            json!({
                "ProjectIDs": [42],
                "SearchText": "login",
                "MaxResults": 25,
                "StatusIDs": [1, 2],
                "CategoryIDs": [7],
                "ResponsibleUIDs": ["uid-1"],
                "ModifiedDateFrom": "2025-01-01"
            })
        );
    }

    #[test]
    fn empty_values_are_dropped() {
        let args: SearchProjectsArgs = parse(json!({"searchText": "", "maxResults": 0, "typeIDs": []})).unwrap();
        let search = ProjectSearch::from(args);
        assert_eq!(serde_json::to_value(&search).unwrap(), json!({"TypeIDs": []}));
    }

    #[test]
    fn null_arguments_are_all_absent() {
        let args: RecordArgs = parse(Value::Null).unwrap();
        assert!(args.project().is_none());
        assert!(args.environment.is_none());
    }

    #[test]
    fn mistyped_arguments_are_rejected() {
        let err = parse::<RecordArgs>(json!({"projectId": "abc"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn feed_entry_defaults_to_public() {
        let args: AddFeedArgs = parse(json!({"projectId": 3, "comments": "Kickoff done"})).unwrap();
        let entry = args.entry().unwrap();
        assert!(!entry.is_private);
        assert!(entry.notify.is_none());

        let args: AddFeedArgs = parse(json!({"projectId": 3, "comments": ""})).unwrap();
        assert!(args.entry().is_none());
    }
}
