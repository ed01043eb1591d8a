//! Custom attribute collapsing for single project and issue records.
//!
//! TDX returns every attribute with its full `Choices` list. Only the chosen
//! entries are interesting to a caller, so each attribute is reduced to
//! `ID, Name, Value, ValueText` plus `SelectedChoices`.

use serde_json::{Map, Value};

const KEPT_FIELDS: [&str; 4] = ["ID", "Name", "Value", "ValueText"];

pub fn collapse_attributes(record: Value) -> Value {
    let Value::Object(mut record) = record else {
        return record;
    };
    if let Some(Value::Array(attributes)) = record.get_mut("Attributes") {
        for attribute in attributes.iter_mut() {
            *attribute = collapse_attribute(attribute);
        }
    }
    Value::Object(record)
}

fn collapse_attribute(attribute: &Value) -> Value {
    let Value::Object(source) = attribute else {
        return attribute.clone();
    };

    let mut collapsed = Map::new();
    for field in KEPT_FIELDS {
        if let Some(value) = source.get(field) {
            collapsed.insert(field.to_string(), value.clone());
        }
    }

    let selected = source.get("Value").map(selected_ids).unwrap_or_default();
    if let (Some(Value::Array(choices)), false) = (source.get("Choices"), selected.is_empty()) {
        let picked = choices
            .iter()
            .filter(|choice| {
                choice
                    .get("ID")
                    .and_then(textual_id)
                    .is_some_and(|id| selected.contains(&id))
            })
            .map(choice_summary)
            .collect();
        collapsed.insert("SelectedChoices".to_string(), Value::Array(picked));
    }

    Value::Object(collapsed)
}

/// Selected values as strings; a scalar counts as a one-element selection.
fn selected_ids(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(textual_id).collect(),
        other => textual_id(other).into_iter().collect(),
    }
}

fn textual_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn choice_summary(choice: &Value) -> Value {
    let mut summary = Map::new();
    for field in ["ID", "Name"] {
        if let Some(value) = choice.get(field) {
            summary.insert(field.to_string(), value.clone());
        }
    }
    Value::Object(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn choices() -> Value {
        json!([
            {"ID": 1, "Name": "A", "IsActive": true},
            {"ID": 2, "Name": "B", "IsActive": true},
            {"ID": 5, "Name": "C", "IsActive": false}
        ])
    }

    #[test]
    fn keeps_selected_choices_in_choice_order() {
        let record = json!({
            "ID": 10,
            "Attributes": [{
                "ID": 900,
                "Name": "Department",
                "Order": 3,
                "Value": [5, 2],
                "ValueText": "B, C",
                "Choices": choices()
            }]
        });

        let collapsed = collapse_attributes(record);
        assert_eq!(
            collapsed["Attributes"][0],
            json!({
                "ID": 900,
                "Name": "Department",
                "Value": [5, 2],
                "ValueText": "B, C",
                "SelectedChoices": [{"ID": 2, "Name": "B"}, {"ID": 5, "Name": "C"}]
            })
        );
        assert_eq!(collapsed["ID"], 10);
    }

    #[test]
    fn scalar_and_numeric_string_values_match() {
        let record = json!({"Attributes": [
            {"ID": 1, "Value": "2", "Choices": choices()},
            {"ID": 2, "Value": 1, "Choices": choices()}
        ]});
        let collapsed = collapse_attributes(record);
        assert_eq!(collapsed["Attributes"][0]["SelectedChoices"], json!([{"ID": 2, "Name": "B"}]));
        assert_eq!(collapsed["Attributes"][1]["SelectedChoices"], json!([{"ID": 1, "Name": "A"}]));
    }

    #[test]
    fn empty_value_or_missing_choices_yield_no_selection() {
        let record = json!({"Attributes": [
            {"ID": 1, "Name": "Free text", "Value": "", "Choices": choices()},
            {"ID": 2, "Name": "Tags", "Value": [], "Choices": choices()},
            {"ID": 3, "Name": "Note", "Value": "hello"}
        ]});
        let collapsed = collapse_attributes(record);
        for attribute in collapsed["Attributes"].as_array().unwrap() {
            assert!(attribute.get("SelectedChoices").is_none());
            assert!(attribute.get("Choices").is_none());
        }
        assert_eq!(collapsed["Attributes"][2], json!({"ID": 3, "Name": "Note", "Value": "hello"}));
    }

    #[test]
    fn records_without_attributes_pass_through() {
        let record = json!({"ID": 4, "Name": "No attrs"});
        assert_eq!(collapse_attributes(record.clone()), record);
        assert_eq!(collapse_attributes(json!("text")), json!("text"));
    }
}
