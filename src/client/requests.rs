//! Request bodies for the TDX projects API (PascalCase on the wire).

use serde::Serialize;
use tracing::warn;

use crate::utils::constants::MAX_SEARCH_RESULTS;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u64>,
    #[serde(rename = "StatusIDs", skip_serializing_if = "Option::is_none")]
    pub status_ids: Option<Vec<u64>>,
    #[serde(rename = "ManagerUIDs", skip_serializing_if = "Option::is_none")]
    pub manager_uids: Option<Vec<String>>,
    #[serde(rename = "TypeIDs", skip_serializing_if = "Option::is_none")]
    pub type_ids: Option<Vec<u64>>,
    #[serde(rename = "PriorityIDs", skip_serializing_if = "Option::is_none")]
    pub priority_ids: Option<Vec<u64>>,
    #[serde(rename = "ResourceUIDs", skip_serializing_if = "Option::is_none")]
    pub resource_uids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date_to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IssueSearch {
    /// The search endpoint only filters on the plural form.
    #[serde(rename = "ProjectIDs", skip_serializing_if = "Option::is_none")]
    pub project_ids: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u64>,
    #[serde(rename = "StatusIDs", skip_serializing_if = "Option::is_none")]
    pub status_ids: Option<Vec<u64>>,
    #[serde(rename = "PriorityIDs", skip_serializing_if = "Option::is_none")]
    pub priority_ids: Option<Vec<u64>>,
    #[serde(rename = "CategoryIDs", skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<u64>>,
    #[serde(rename = "ResponsibleUIDs", skip_serializing_if = "Option::is_none")]
    pub responsible_uids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_date_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewFeedEntry {
    pub comments: String,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<Vec<String>>,
}

/// Caps a requested page size at what the search endpoints accept.
pub fn clamp_max_results(requested: Option<u64>) -> Option<u64> {
    match requested {
        Some(n) if n > MAX_SEARCH_RESULTS => {
            warn!(requested = n, cap = MAX_SEARCH_RESULTS, "MaxResults capped at {}", MAX_SEARCH_RESULTS);
            Some(MAX_SEARCH_RESULTS)
        }
        other => other,
    }
}

impl ProjectSearch {
    pub fn clamped(mut self) -> Self {
        self.max_results = clamp_max_results(self.max_results);
        self
    }
}

impl IssueSearch {
    pub fn clamped(mut self) -> Self {
        self.max_results = clamp_max_results(self.max_results);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clamps_only_above_the_cap() {
        assert_eq!(clamp_max_results(Some(5000)), Some(1000));
        assert_eq!(clamp_max_results(Some(1000)), Some(1000));
        assert_eq!(clamp_max_results(Some(25)), Some(25));
        assert_eq!(clamp_max_results(None), None);
    }

    #[test]
    fn search_bodies_use_api_field_names() {
        let search = IssueSearch {
            project_ids: Some(vec![42]),
            status_ids: Some(vec![1, 2]),
            responsible_uids: Some(vec!["a-b".into()]),
            max_results: Some(10),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&search).unwrap(),
            json!({"ProjectIDs": [42], "MaxResults": 10, "StatusIDs": [1, 2], "ResponsibleUIDs": ["a-b"]})
        );

        let search = ProjectSearch {
            search_text: Some("portal".into()),
            manager_uids: Some(vec!["m".into()]),
            modified_date_from: Some("2025-01-01".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&search).unwrap(),
            json!({"SearchText": "portal", "ManagerUIDs": ["m"], "ModifiedDateFrom": "2025-01-01"})
        );
    }

    #[test]
    fn feed_entry_omits_missing_notify() {
        let entry = NewFeedEntry {
            comments: "Done".into(),
            is_private: false,
            notify: None,
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"Comments": "Done", "IsPrivate": false})
        );
    }
}
