use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{Grade, Learner};
use crate::stats;
use crate::validity;

pub fn build_report(generated_at: DateTime<Utc>, learners: &[Learner], grades: &[Grade]) -> String {
    let global = stats::global_stats(grades);
    let classes = stats::stats_by_class(grades);
    let invalid = validity::find_invalid(learners);

    let mut output = String::new();

    let _ = writeln!(output, "# Grade Statistics Report");
    let _ = writeln!(
        output,
        "Generated {} from {} grade records and {} learners",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        grades.len(),
        learners.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## All Classes");

    match global {
        Some(global) => {
            let _ = writeln!(
                output,
                "- {} score entries above {} ({:.1}%)",
                global.above70,
                stats::PASS_THRESHOLD,
                global.percentage
            );
        }
        None => {
            let _ = writeln!(output, "No scores above 70 recorded.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Class");

    if classes.is_empty() {
        let _ = writeln!(output, "No grade records with a class id.");
    } else {
        let _ = writeln!(output, "| Class | Learners | Above 70 | Percentage |");
        let _ = writeln!(output, "|---|---|---|---|");
        for class in &classes {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {:.1}% |",
                class.class_id, class.stats.total, class.stats.above70, class.stats.percentage
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Invalid Learner Records");

    if invalid.is_empty() {
        let _ = writeln!(output, "All learner records are valid.");
    } else {
        for learner in &invalid {
            let _ = writeln!(
                output,
                "- #{} {}: {}",
                learner.id,
                learner.name.as_deref().unwrap_or("(no name)"),
                validity::failed_rules(learner).join(", ")
            );
        }
    }

    output
}
