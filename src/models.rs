use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CAMPUSES: [&str; 7] = [
    "Remote",
    "Boston",
    "New York",
    "Denver",
    "Los Angeles",
    "Seattle",
    "Dallas",
];

/// A learner row. Every field except the id may be absent in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learner {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrolled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Value>,
}

impl ScoreEntry {
    /// The score when it is stored as a number.
    pub fn as_double(&self) -> Option<f64> {
        match &self.score {
            Some(Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// The score converted to a double, the way a `toDouble` stage would.
    pub fn to_double(&self) -> Option<f64> {
        match self.score.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::Bool(true) => Some(1.0),
            Value::Bool(false) => Some(0.0),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learner_id: Option<i32>,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeStats {
    #[serde(rename = "Total Number of Learners")]
    pub total: u64,
    #[serde(rename = "Number of Learners With Grade Above 70")]
    pub above70: u64,
    #[serde(rename = "Percentage of Learners With Grade Above 70")]
    pub percentage: f64,
}

#[derive(Debug, Clone)]
pub struct ClassStats {
    pub class_id: i32,
    pub stats: GradeStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(score: Value) -> ScoreEntry {
        ScoreEntry {
            kind: Some("exam".to_string()),
            score: Some(score),
        }
    }

    #[test]
    fn only_numbers_count_as_doubles() {
        assert_eq!(entry(json!(80)).as_double(), Some(80.0));
        assert_eq!(entry(json!(72.5)).as_double(), Some(72.5));
        assert_eq!(entry(json!("90")).as_double(), None);
        assert_eq!(entry(Value::Null).as_double(), None);
    }

    #[test]
    fn conversion_accepts_numeric_strings_and_booleans() {
        assert_eq!(entry(json!(" 88.5 ")).to_double(), Some(88.5));
        assert_eq!(entry(json!(true)).to_double(), Some(1.0));
        assert_eq!(entry(json!("abc")).to_double(), None);
        assert_eq!(entry(json!([1, 2])).to_double(), None);
    }

    #[test]
    fn stats_serialize_with_display_keys_in_order() {
        let stats = GradeStats {
            total: 2,
            above70: 1,
            percentage: 50.0,
        };
        let body = serde_json::to_string(&stats).unwrap();
        assert_eq!(
            body,
            r#"{"Total Number of Learners":2,"Number of Learners With Grade Above 70":1,"Percentage of Learners With Grade Above 70":50.0}"#
        );
    }

    #[test]
    fn absent_learner_fields_are_omitted() {
        let learner = Learner {
            id: 7,
            name: Some("Avery Lee".to_string()),
            enrolled: None,
            year: Some(2021),
            avg: None,
            campus: None,
        };
        let value = serde_json::to_value(&learner).unwrap();
        assert_eq!(value, json!({"_id": 7, "name": "Avery Lee", "year": 2021}));
    }
}
