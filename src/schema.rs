//! Declarative validators for the two collections.
//!
//! Definitions are versioned and registered with the store by `init-db`.
//! Writes are checked against them, but with `ValidationAction::Warn` a
//! violation is only logged.

use serde::Serialize;
use serde_json::Value;

use crate::models::CAMPUSES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationAction {
    Warn,
}

impl ValidationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationAction::Warn => "warn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Int,
    Double,
    Bool,
    String,
    Array,
}

fn is_empty_list(list: &&'static [&'static str]) -> bool {
    list.is_empty()
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "is_empty_list")]
    pub allowed: &'static [&'static str],
    #[serde(skip_serializing_if = "is_empty_list")]
    pub item_required: &'static [&'static str],
}

impl FieldSchema {
    const fn new(name: &'static str, kind: FieldKind, required: bool) -> Self {
        Self {
            name,
            kind,
            required,
            minimum: None,
            maximum: None,
            allowed: &[],
            item_required: &[],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSchema {
    pub collection: &'static str,
    pub version: i32,
    pub validation_action: ValidationAction,
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn grades_schema() -> CollectionSchema {
    CollectionSchema {
        collection: "grades",
        version: 1,
        validation_action: ValidationAction::Warn,
        fields: vec![
            FieldSchema {
                minimum: Some(0.0),
                maximum: Some(300.0),
                ..FieldSchema::new("class_id", FieldKind::Int, true)
            },
            FieldSchema {
                minimum: Some(0.0),
                ..FieldSchema::new("learner_id", FieldKind::Int, true)
            },
            FieldSchema {
                item_required: &["type", "score"],
                ..FieldSchema::new("scores", FieldKind::Array, false)
            },
        ],
    }
}

pub fn learners_schema() -> CollectionSchema {
    CollectionSchema {
        collection: "learners",
        version: 1,
        validation_action: ValidationAction::Warn,
        fields: vec![
            FieldSchema::new("name", FieldKind::String, true),
            FieldSchema::new("enrolled", FieldKind::Bool, true),
            FieldSchema {
                minimum: Some(1995.0),
                ..FieldSchema::new("year", FieldKind::Int, true)
            },
            FieldSchema::new("avg", FieldKind::Double, false),
            FieldSchema {
                allowed: &CAMPUSES,
                ..FieldSchema::new("campus", FieldKind::String, true)
            },
        ],
    }
}

pub fn all_schemas() -> Vec<CollectionSchema> {
    vec![grades_schema(), learners_schema()]
}

fn kind_matches(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::Int => value.as_i64().is_some(),
        FieldKind::Double => value.is_number(),
        FieldKind::Bool => value.is_boolean(),
        FieldKind::String => value.is_string(),
        FieldKind::Array => value.is_array(),
    }
}

impl CollectionSchema {
    /// Checks a serialized document; absent and null fields are treated alike.
    pub fn check(&self, document: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();

        for field in &self.fields {
            let value = match document.get(field.name) {
                Some(Value::Null) | None => {
                    if field.required {
                        violations.push(Violation {
                            field: field.name.to_string(),
                            message: "is required".to_string(),
                        });
                    }
                    continue;
                }
                Some(value) => value,
            };

            if !kind_matches(field.kind, value) {
                violations.push(Violation {
                    field: field.name.to_string(),
                    message: format!("must be of type {:?}", field.kind).to_lowercase(),
                });
                continue;
            }

            if let Some(number) = value.as_f64() {
                if field.minimum.is_some_and(|min| number < min) {
                    violations.push(Violation {
                        field: field.name.to_string(),
                        message: format!("must be at least {}", field.minimum.unwrap_or_default()),
                    });
                }
                if field.maximum.is_some_and(|max| number > max) {
                    violations.push(Violation {
                        field: field.name.to_string(),
                        message: format!("must be at most {}", field.maximum.unwrap_or_default()),
                    });
                }
            }

            if let Some(text) = value.as_str() {
                if !field.allowed.is_empty() && !field.allowed.contains(&text) {
                    violations.push(Violation {
                        field: field.name.to_string(),
                        message: format!("must be one of {}", field.allowed.join(", ")),
                    });
                }
            }

            if let Some(items) = value.as_array() {
                for (index, item) in items.iter().enumerate() {
                    for key in field.item_required {
                        if item.get(key).map_or(true, Value::is_null) {
                            violations.push(Violation {
                                field: format!("{}.{index}.{key}", field.name),
                                message: "is required".to_string(),
                            });
                        }
                    }
                }
            }
        }

        violations
    }

    /// Checks a record and logs each violation. Never blocks the write.
    pub fn warn_on<T: Serialize>(&self, record: &T, source_key: &str) -> usize {
        let document = match serde_json::to_value(record) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(collection = self.collection, source_key, error = %err, "could not serialize record for validation");
                return 0;
            }
        };

        let violations = self.check(&document);
        for violation in &violations {
            tracing::warn!(
                collection = self.collection,
                version = self.version,
                action = self.validation_action.as_str(),
                source_key,
                "document failed validation: {violation}"
            );
        }
        violations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grades_require_ids_within_range() {
        let schema = grades_schema();
        assert!(schema
            .check(&json!({"class_id": 300, "learner_id": 0, "scores": []}))
            .is_empty());

        let violations = schema.check(&json!({"class_id": 301, "scores": []}));
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["class_id", "learner_id"]);
        assert_eq!(violations[0].message, "must be at most 300");
    }

    #[test]
    fn grades_reject_fractional_ids() {
        let violations = grades_schema().check(&json!({"class_id": 1.5, "learner_id": 2}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "must be of type int");
    }

    #[test]
    fn score_items_need_type_and_score() {
        let violations = grades_schema().check(&json!({
            "class_id": 1,
            "learner_id": 2,
            "scores": [{"type": "exam", "score": 90}, {"type": "quiz"}]
        }));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "scores.1.score");
    }

    #[test]
    fn learners_follow_year_and_campus_rules() {
        let schema = learners_schema();
        let valid = json!({"name": "Jules", "enrolled": false, "year": 1995, "campus": "Remote"});
        assert!(schema.check(&valid).is_empty());

        let invalid = json!({"name": "Jules", "enrolled": false, "year": 1990, "campus": "Austin"});
        let violations = schema.check(&invalid);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].to_string(), "year: must be at least 1995");
        assert_eq!(violations[1].field, "campus");
    }

    #[test]
    fn definitions_serialize_for_registration() {
        let definition = serde_json::to_value(grades_schema()).unwrap();
        assert_eq!(definition["collection"], "grades");
        assert_eq!(definition["validation_action"], "warn");
        assert_eq!(definition["fields"][0]["maximum"], 300.0);
        assert!(definition["fields"][0].get("allowed").is_none());
    }

    #[test]
    fn warn_on_never_fails_the_caller() {
        let schema = learners_schema();
        let count = schema.warn_on(&json!({"name": "Avery"}), "test-1");
        assert_eq!(count, 3);
    }
}
