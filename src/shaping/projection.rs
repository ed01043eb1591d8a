use serde_json::{Map, Value};

/// Record kinds that get a minimal field set in collection results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Issue,
}

const PROJECT_FIELDS: &[&str] = &[
    "ID",
    "Name",
    "StatusName",
    "PercentComplete",
    "IsActive",
    "ManagerFullName",
    "ModifiedDate",
];

const ISSUE_FIELDS: &[&str] = &[
    "ID",
    "ProjectID",
    "Title",
    "StatusID",
    "StatusName",
    "PriorityID",
    "PriorityName",
    "CategoryID",
    "CategoryName",
    "ResponsibleUID",
    "ResponsibleFullName",
    "CreatedDate",
    "ModifiedDate",
];

impl EntityKind {
    pub const fn minimal_fields(self) -> &'static [&'static str] {
        match self {
            EntityKind::Project => PROJECT_FIELDS,
            EntityKind::Issue => ISSUE_FIELDS,
        }
    }

    /// Keep only the minimal fields the record actually has, in table order.
    pub fn project(self, record: &Value) -> Value {
        let mut minimal = Map::new();
        if let Value::Object(source) = record {
            for field in self.minimal_fields() {
                if let Some(value) = source.get(*field) {
                    minimal.insert((*field).to_string(), value.clone());
                }
            }
        }
        Value::Object(minimal)
    }
}

pub fn project_all(kind: EntityKind, records: &[Value]) -> Vec<Value> {
    records.iter().map(|record| kind.project(record)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_only_declared_fields_that_exist() {
        let project = json!({
            "ID": 7,
            "Name": "Portal",
            "Description": "long text",
            "StatusName": "Open",
            "Attributes": [{"ID": 1}],
            "IsActive": false,
            "ManagerFullName": null
        });

        let minimal = EntityKind::Project.project(&project);
        let obj = minimal.as_object().unwrap();
        assert_eq!(
            obj.keys().collect::<Vec<_>>(),
            vec!["ID", "Name", "StatusName", "IsActive", "ManagerFullName"]
        );
        for key in obj.keys() {
            assert!(EntityKind::Project.minimal_fields().contains(&key.as_str()));
        }
        // absent fields are not defaulted
        assert!(obj.get("PercentComplete").is_none());
        assert_eq!(obj["ManagerFullName"], Value::Null);
    }

    #[test]
    fn issue_projection_follows_table_order() {
        let issue = json!({
            "ModifiedDate": "2025-11-03T19:50:49Z",
            "Title": "Login broken",
            "ID": 99,
            "ProjectID": 5,
            "Resolution": "n/a"
        });
        let minimal = EntityKind::Issue.project(&issue);
        assert_eq!(
            minimal.as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["ID", "ProjectID", "Title", "ModifiedDate"]
        );
    }

    #[test]
    fn non_objects_project_to_empty() {
        assert_eq!(EntityKind::Issue.project(&json!(3)), json!({}));
        assert_eq!(project_all(EntityKind::Project, &[json!({"ID": 1, "X": 2})]), vec![json!({"ID": 1})]);
    }
}
