use serde_json::{json, Map, Value};

use crate::server::protocol::ToolDefinition;

/// The tool names are the wire contract with agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetProject,
    UpdateProject,
    SearchProjects,
    ListProjects,
    GetProjectResources,
    GetProjectFeed,
    AddProjectFeed,
    GetIssue,
    UpdateIssue,
    SearchIssues,
    GetIssueFeed,
    AddIssueFeed,
    GetIssueCategories,
    GetIssuePriorities,
    GetIssueStatuses,
}

impl ToolName {
    pub const ALL: [ToolName; 15] = [
        ToolName::GetProject,
        ToolName::UpdateProject,
        ToolName::SearchProjects,
        ToolName::ListProjects,
        ToolName::GetProjectResources,
        ToolName::GetProjectFeed,
        ToolName::AddProjectFeed,
        ToolName::GetIssue,
        ToolName::UpdateIssue,
        ToolName::SearchIssues,
        ToolName::GetIssueFeed,
        ToolName::AddIssueFeed,
        ToolName::GetIssueCategories,
        ToolName::GetIssuePriorities,
        ToolName::GetIssueStatuses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetProject => "tdx_get_project",
            ToolName::UpdateProject => "tdx_update_project",
            ToolName::SearchProjects => "tdx_search_projects",
            ToolName::ListProjects => "tdx_list_projects",
            ToolName::GetProjectResources => "tdx_get_project_resources",
            ToolName::GetProjectFeed => "tdx_get_project_feed",
            ToolName::AddProjectFeed => "tdx_add_project_feed",
            ToolName::GetIssue => "tdx_get_issue",
            ToolName::UpdateIssue => "tdx_update_issue",
            ToolName::SearchIssues => "tdx_search_issues",
            ToolName::GetIssueFeed => "tdx_get_issue_feed",
            ToolName::AddIssueFeed => "tdx_add_issue_feed",
            ToolName::GetIssueCategories => "tdx_get_issue_categories",
            ToolName::GetIssuePriorities => "tdx_get_issue_priorities",
            ToolName::GetIssueStatuses => "tdx_get_issue_statuses",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::GetProject => "Get project by ID (returns full project details)",
            ToolName::UpdateProject => "Update project",
            ToolName::SearchProjects => {
                "Search for projects (returns minimal fields for browsing - use tdx_get_project for full details)"
            }
            ToolName::ListProjects => {
                "Get projects the user is on (returns minimal fields for browsing - use tdx_get_project for full details)"
            }
            ToolName::GetProjectResources => "Get project team members",
            ToolName::GetProjectFeed => {
                "Get project feed entries (returns metadata with body preview - excludes full Body field for efficiency)"
            }
            ToolName::AddProjectFeed => "Add feed entry to project",
            ToolName::GetIssue => "Get issue by ID (returns full issue details)",
            ToolName::UpdateIssue => {
                "Update issue. IMPORTANT: Comments field is REQUIRED by the API (creates a feed entry). \
                 Include any fields you want to update (StatusID, ResponsibleUID, Title, Description, \
                 CategoryID, PriorityID, etc.)."
            }
            ToolName::SearchIssues => {
                "Search for issues (returns minimal fields for browsing - use tdx_get_issue for full details)"
            }
            ToolName::GetIssueFeed => {
                "Get issue feed entries (returns metadata with body preview - excludes full Body field for efficiency)"
            }
            ToolName::AddIssueFeed => "Add feed entry to issue",
            ToolName::GetIssueCategories => "Get issue categories for project",
            ToolName::GetIssuePriorities => "Get issue priorities",
            ToolName::GetIssueStatuses => "Get issue statuses",
        }
    }

    /// JSON schema of the tool's arguments. `environments` feeds the enum of
    /// the shared `environment` parameter.
    pub fn input_schema(&self, environments: &[String]) -> Value {
        let mut properties = Map::new();
        properties.insert("environment".into(), environment_param(environments));

        let required: &[&str] = match self {
            ToolName::ListProjects | ToolName::GetIssuePriorities | ToolName::GetIssueStatuses => &[],
            ToolName::GetProject
            | ToolName::GetProjectResources
            | ToolName::GetProjectFeed
            | ToolName::GetIssueCategories => {
                properties.insert("projectId".into(), id_param("Project ID"));
                &["projectId"]
            }
            ToolName::UpdateProject => {
                properties.insert("projectId".into(), id_param("Project ID"));
                properties.insert(
                    "projectData".into(),
                    json!({"type": "object", "description": "Project data to update"}),
                );
                &["projectId", "projectData"]
            }
            ToolName::SearchProjects => {
                search_params(&mut properties);
                properties.insert("managerUIDs".into(), uid_list("Filter by manager UIDs"));
                properties.insert("typeIDs".into(), id_list("Filter by project type IDs"));
                properties.insert("resourceUIDs".into(), uid_list("Filter by assigned resource UIDs"));
                &[]
            }
            ToolName::AddProjectFeed => {
                properties.insert("projectId".into(), id_param("Project ID"));
                feed_params(&mut properties);
                &["projectId", "comments"]
            }
            ToolName::GetIssue | ToolName::GetIssueFeed => {
                properties.insert("projectId".into(), id_param("Project ID"));
                properties.insert("issueId".into(), id_param("Issue ID"));
                &["projectId", "issueId"]
            }
            ToolName::UpdateIssue => {
                properties.insert("projectId".into(), id_param("Project ID"));
                properties.insert("issueId".into(), id_param("Issue ID"));
                properties.insert("issueData".into(), issue_data_schema());
                &["projectId", "issueId", "issueData"]
            }
            ToolName::SearchIssues => {
                properties.insert("projectId".into(), id_param("Project ID"));
                search_params(&mut properties);
                properties.insert("categoryIDs".into(), id_list("Filter by category IDs"));
                properties.insert("responsibleUIDs".into(), uid_list("Filter by responsible UIDs"));
                &[]
            }
            ToolName::AddIssueFeed => {
                properties.insert("projectId".into(), id_param("Project ID"));
                properties.insert("issueId".into(), id_param("Issue ID"));
                feed_params(&mut properties);
                &["projectId", "issueId", "comments"]
            }
        };

        let mut schema = json!({"type": "object", "properties": properties});
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    pub fn definition(&self, environments: &[String]) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str(),
            description: self.description(),
            input_schema: self.input_schema(environments),
        }
    }
}

/// Definitions of every tool, in catalogue order.
pub fn tool_definitions(environments: &[String]) -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(|tool| tool.definition(environments)).collect()
}

fn environment_param(environments: &[String]) -> Value {
    let mut param = json!({
        "type": "string",
        "description": "Target environment; the configured default is used when omitted",
    });
    if !environments.is_empty() {
        param["enum"] = json!(environments);
    }
    param
}

fn id_param(description: &str) -> Value {
    json!({"type": "number", "description": description})
}

fn id_list(description: &str) -> Value {
    json!({"type": "array", "items": {"type": "number"}, "description": description})
}

fn uid_list(description: &str) -> Value {
    json!({"type": "array", "items": {"type": "string"}, "description": description})
}

fn search_params(properties: &mut Map<String, Value>) {
    properties.insert("searchText".into(), json!({"type": "string", "description": "Search text"}));
    properties.insert(
        "maxResults".into(),
        json!({"type": "number", "description": "Max results (capped at 1000)", "default": 50}),
    );
    properties.insert("statusIDs".into(), id_list("Filter by status IDs"));
    properties.insert("priorityIDs".into(), id_list("Filter by priority IDs"));
    for key in ["modifiedDateFrom", "modifiedDateTo"] {
        properties.insert(
            key.into(),
            json!({"type": "string", "description": "Filter by modified date (ISO 8601 format: YYYY-MM-DD)"}),
        );
    }
}

fn feed_params(properties: &mut Map<String, Value>) {
    properties.insert("comments".into(), json!({"type": "string", "description": "Comment text"}));
    properties.insert(
        "isPrivate".into(),
        json!({"type": "boolean", "description": "Private entry", "default": false}),
    );
    properties.insert("notify".into(), uid_list("Email addresses to notify"));
}

fn issue_data_schema() -> Value {
    json!({
        "type": "object",
        "description": "Issue data to update. Must include Comments field (required by API). \
                        Optional fields: StatusID, ResponsibleUID, Title, Description, CategoryID, \
                        PriorityID, Resolution, ImpactID, ResponsibleGroupID.",
        "properties": {
            "Comments": {"type": "string", "description": "REQUIRED: Comment text that will be added to the issue feed"},
            "StatusID": {"type": "number", "description": "Optional: New status ID"},
            "ResponsibleUID": {"type": "string", "description": "Optional: New responsible user UID"},
            "Title": {"type": "string", "description": "Optional: Issue title"},
            "Description": {"type": "string", "description": "Optional: Issue description"},
            "CategoryID": {"type": "number", "description": "Optional: Category ID"},
            "PriorityID": {"type": "number", "description": "Optional: Priority ID"}
        },
        "required": ["Comments"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalogue_has_fifteen_unique_names() {
        let defs = tool_definitions(&[]);
        assert_eq!(defs.len(), 15);
        let names: HashSet<_> = defs.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), 15);
        for tool in ToolName::ALL {
            assert_eq!(ToolName::from_name(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolName::from_name("tdx_delete_project"), None);
    }

    #[test]
    fn required_arguments_are_declared() {
        let schema = ToolName::AddIssueFeed.input_schema(&[]);
        assert_eq!(schema["required"], json!(["projectId", "issueId", "comments"]));
        assert_eq!(schema["properties"]["isPrivate"]["default"], json!(false));

        let schema = ToolName::ListProjects.input_schema(&[]);
        assert!(schema.get("required").is_none());
    }

    #[test]
    fn environment_enum_follows_registry() {
        let envs = vec!["prod".to_string(), "test".to_string()];
        let schema = ToolName::GetIssueStatuses.input_schema(&envs);
        assert_eq!(schema["properties"]["environment"]["enum"], json!(["prod", "test"]));
        assert!(ToolName::GetIssueStatuses.input_schema(&[])["properties"]["environment"]
            .get("enum")
            .is_none());
    }
}
