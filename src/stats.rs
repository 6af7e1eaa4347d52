use std::collections::BTreeMap;

use crate::models::{ClassStats, Grade, GradeStats};

pub const PASS_THRESHOLD: f64 = 70.0;

fn percentage(above70: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        above70 as f64 / total as f64 * 100.0
    }
}

/// Counts score entries above the threshold across every grade record.
///
/// Entries are filtered before they are counted, so the total equals the
/// qualifying count and a present result always reports 100 percent.
/// Returns `None` when no entry qualifies.
pub fn global_stats(grades: &[Grade]) -> Option<GradeStats> {
    let above70 = grades
        .iter()
        .filter(|grade| grade.scores.iter().any(|entry| entry.as_double().is_some()))
        .flat_map(|grade| grade.scores.iter())
        .filter_map(|entry| entry.as_double())
        .filter(|score| *score > PASS_THRESHOLD)
        .count() as u64;

    if above70 == 0 {
        return None;
    }

    let total = above70;
    Some(GradeStats {
        total,
        above70,
        percentage: percentage(above70, total),
    })
}

/// Mean of the entries that convert to a double.
pub fn record_average(grade: &Grade) -> Option<f64> {
    let values: Vec<f64> = grade.scores.iter().filter_map(|entry| entry.to_double()).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Per-record averages for one class's grade records.
///
/// Returns `None` when no record was given.
pub fn class_stats(grades: &[Grade]) -> Option<GradeStats> {
    if grades.is_empty() {
        return None;
    }

    let total = grades.len() as u64;
    let above70 = grades
        .iter()
        .filter_map(record_average)
        .filter(|avg| *avg > PASS_THRESHOLD)
        .count() as u64;

    Some(GradeStats {
        total,
        above70,
        percentage: percentage(above70, total),
    })
}

pub fn stats_by_class(grades: &[Grade]) -> Vec<ClassStats> {
    let mut classes: BTreeMap<i32, Vec<Grade>> = BTreeMap::new();
    for grade in grades {
        if let Some(class_id) = grade.class_id {
            classes.entry(class_id).or_default().push(grade.clone());
        }
    }

    classes
        .into_iter()
        .filter_map(|(class_id, grades)| {
            class_stats(&grades).map(|stats| ClassStats { class_id, stats })
        })
        .collect()
}

/// Coerces a path segment into a class id the way numeric coercion of text
/// does. `None` matches no record.
pub fn coerce_class_id(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0);
    }

    let value: f64 = trimmed.parse().ok()?;
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i32::MIN as f64 || value > i32::MAX as f64 {
        return None;
    }
    Some(value as i32)
}
