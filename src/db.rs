use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Grade, Learner, ScoreEntry};
use crate::schema;
use crate::store::RecordStore;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A learner as written by enrollment processes: no id yet, any field may be
/// missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLearner {
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
    #[serde(default, skip_serializing)]
    pub source_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GradeCsvRow {
    class_id: Option<i32>,
    learner_id: Option<i32>,
    #[serde(rename = "type")]
    kind: Option<String>,
    score: Option<String>,
    source_key: Option<String>,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;

    for definition in schema::all_schemas() {
        sqlx::query(
            r#"
            INSERT INTO grade_stats.schema_validators
            (collection, version, validation_action, definition)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (collection, version) DO UPDATE
            SET validation_action = EXCLUDED.validation_action,
                definition = EXCLUDED.definition,
                registered_at = now()
            "#,
        )
        .bind(definition.collection)
        .bind(definition.version)
        .bind(definition.validation_action.as_str())
        .bind(Json(&definition))
        .execute(pool)
        .await
        .with_context(|| format!("failed to register {} validator", definition.collection))?;

        tracing::info!(
            collection = definition.collection,
            version = definition.version,
            "registered validator"
        );
    }

    Ok(())
}

async fn insert_learner(pool: &PgPool, learner: &NewLearner, source_key: &str) -> anyhow::Result<bool> {
    schema::learners_schema().warn_on(learner, source_key);

    let result = sqlx::query(
        r#"
        INSERT INTO grade_stats.learners (name, enrolled, year, avg, campus, source_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(&learner.name)
    .bind(learner.enrolled)
    .bind(learner.year)
    .bind(learner.avg)
    .bind(&learner.campus)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn insert_grade(pool: &PgPool, grade: &Grade, source_key: &str) -> anyhow::Result<bool> {
    schema::grades_schema().warn_on(grade, source_key);

    let result = sqlx::query(
        r#"
        INSERT INTO grade_stats.grades (class_id, learner_id, scores, source_key)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(grade.class_id)
    .bind(grade.learner_id)
    .bind(Json(&grade.scores))
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn learner(name: &str, enrolled: bool, year: i32, avg: Option<f64>, campus: &str) -> NewLearner {
    NewLearner {
        name: Some(name.to_string()),
        enrolled: Some(enrolled),
        year: Some(year),
        avg,
        campus: Some(campus.to_string()),
        source_key: None,
    }
}

fn seed_grade(class_id: i32, learner_id: i32, scores: &[(&str, f64)]) -> Grade {
    Grade {
        class_id: Some(class_id),
        learner_id: Some(learner_id),
        scores: scores
            .iter()
            .map(|(kind, score)| ScoreEntry {
                kind: Some(kind.to_string()),
                score: Some(Value::from(*score)),
            })
            .collect(),
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let mut nameless = learner("", true, 2019, None, "Boston");
    nameless.name = None;

    let learners = vec![
        ("seed-learner-001", learner("Avery Lee", true, 2021, Some(84.5), "Boston")),
        ("seed-learner-002", learner("Jules Moreno", true, 2022, Some(67.0), "Remote")),
        ("seed-learner-003", learner("Kiara Patel", false, 2019, None, "Los Angeles")),
        ("seed-learner-004", learner("Dana Whitfield", true, 1991, Some(72.0), "Denver")),
        ("seed-learner-005", learner("Rory Quinn", true, 2023, Some(90.1), "Chicago")),
        ("seed-learner-006", nameless),
    ];

    for (source_key, record) in &learners {
        insert_learner(pool, record, source_key).await?;
    }

    let grades = vec![
        (
            "seed-grade-001",
            seed_grade(101, 1, &[("exam", 88.0), ("quiz", 79.5), ("homework", 92.0)]),
        ),
        (
            "seed-grade-002",
            seed_grade(101, 2, &[("exam", 55.0), ("quiz", 64.0), ("homework", 71.0)]),
        ),
        (
            "seed-grade-003",
            seed_grade(101, 3, &[("exam", 70.0), ("quiz", 70.0)]),
        ),
        (
            "seed-grade-004",
            seed_grade(205, 1, &[("exam", 93.5), ("quiz", 81.0), ("homework", 77.0)]),
        ),
        (
            "seed-grade-005",
            seed_grade(205, 4, &[("exam", 48.0), ("quiz", 52.5), ("homework", 60.0)]),
        ),
        (
            "seed-grade-006",
            seed_grade(300, 5, &[("exam", 99.0), ("homework", 85.0)]),
        ),
    ];

    for (source_key, grade) in &grades {
        insert_grade(pool, grade, source_key).await?;
    }

    Ok(())
}

/// Parses a CSV score cell: numbers stay numbers, other text is kept as text.
pub fn score_value(raw: Option<&str>) -> Option<Value> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(number) if number.is_finite() => Some(Value::from(number)),
        _ => Some(Value::String(raw.to_string())),
    }
}

fn group_grade_rows(rows: Vec<GradeCsvRow>) -> Vec<(String, Grade)> {
    let mut groups: Vec<(Option<String>, String, Grade)> = Vec::new();

    for row in rows {
        let entry = ScoreEntry {
            kind: row.kind.filter(|kind| !kind.is_empty()),
            score: score_value(row.score.as_deref()),
        };

        let continues = groups.last().is_some_and(|(key, _, grade)| {
            *key == row.source_key
                && grade.class_id == row.class_id
                && grade.learner_id == row.learner_id
        });

        match groups.last_mut() {
            Some((_, _, grade)) if continues => grade.scores.push(entry),
            _ => {
                let source_key = row
                    .source_key
                    .clone()
                    .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
                groups.push((
                    row.source_key,
                    source_key,
                    Grade {
                        class_id: row.class_id,
                        learner_id: row.learner_id,
                        scores: vec![entry],
                    },
                ));
            }
        }
    }

    groups
        .into_iter()
        .map(|(_, source_key, grade)| (source_key, grade))
        .collect()
}

pub async fn import_grades_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let rows = reader
        .deserialize::<GradeCsvRow>()
        .collect::<Result<Vec<_>, _>>()?;

    let mut inserted = 0usize;
    for (source_key, grade) in group_grade_rows(rows) {
        if insert_grade(pool, &grade, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn import_learners_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<NewLearner>() {
        let row = result?;
        let source_key = row
            .source_key
            .clone()
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_learner(pool, &row, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

fn grade_from_row(row: &sqlx::postgres::PgRow) -> anyhow::Result<Grade> {
    let scores: Json<Vec<ScoreEntry>> = row.try_get("scores")?;
    Ok(Grade {
        class_id: row.try_get("class_id")?,
        learner_id: row.try_get("learner_id")?,
        scores: scores.0,
    })
}

#[async_trait]
impl RecordStore for PgStore {
    async fn learners(&self) -> anyhow::Result<Vec<Learner>> {
        let rows = sqlx::query(
            "SELECT id, name, enrolled, year, avg, campus \
             FROM grade_stats.learners ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch learners")?;

        let mut learners = Vec::with_capacity(rows.len());
        for row in rows {
            learners.push(Learner {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                enrolled: row.try_get("enrolled")?,
                year: row.try_get("year")?,
                avg: row.try_get("avg")?,
                campus: row.try_get("campus")?,
            });
        }

        Ok(learners)
    }

    async fn grades(&self) -> anyhow::Result<Vec<Grade>> {
        let rows = sqlx::query(
            "SELECT class_id, learner_id, scores FROM grade_stats.grades ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch grades")?;

        rows.iter().map(grade_from_row).collect()
    }

    async fn class_grades(&self, class_id: i32) -> anyhow::Result<Vec<Grade>> {
        let rows = sqlx::query(
            "SELECT class_id, learner_id, scores FROM grade_stats.grades \
             WHERE class_id = $1 ORDER BY id",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to fetch grades for class {class_id}"))?;

        rows.iter().map(grade_from_row).collect()
    }
}
