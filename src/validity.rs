use crate::models::{Learner, CAMPUSES};

pub const MIN_YEAR: i32 = 1995;

pub struct ValidityRule {
    pub name: &'static str,
    pub fails: fn(&Learner) -> bool,
}

pub fn missing_name(learner: &Learner) -> bool {
    learner.name.is_none()
}

pub fn missing_enrolled(learner: &Learner) -> bool {
    learner.enrolled.is_none()
}

pub fn missing_year(learner: &Learner) -> bool {
    learner.year.is_none()
}

pub fn missing_campus(learner: &Learner) -> bool {
    learner.campus.is_none()
}

pub fn year_before_minimum(learner: &Learner) -> bool {
    learner.year.is_some_and(|year| year < MIN_YEAR)
}

/// Also true when the campus is absent.
pub fn campus_outside_set(learner: &Learner) -> bool {
    !learner
        .campus
        .as_deref()
        .is_some_and(|campus| CAMPUSES.contains(&campus))
}

pub const RULES: [ValidityRule; 6] = [
    ValidityRule {
        name: "missing name",
        fails: missing_name,
    },
    ValidityRule {
        name: "missing enrolled",
        fails: missing_enrolled,
    },
    ValidityRule {
        name: "missing year",
        fails: missing_year,
    },
    ValidityRule {
        name: "missing campus",
        fails: missing_campus,
    },
    ValidityRule {
        name: "year before 1995",
        fails: year_before_minimum,
    },
    ValidityRule {
        name: "unknown campus",
        fails: campus_outside_set,
    },
];

pub fn is_invalid(learner: &Learner) -> bool {
    RULES.iter().any(|rule| (rule.fails)(learner))
}

pub fn failed_rules(learner: &Learner) -> Vec<&'static str> {
    RULES
        .iter()
        .filter(|rule| (rule.fails)(learner))
        .map(|rule| rule.name)
        .collect()
}

pub fn find_invalid(learners: &[Learner]) -> Vec<Learner> {
    learners
        .iter()
        .filter(|learner| is_invalid(learner))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_learner(id: i64) -> Learner {
        Learner {
            id,
            name: Some("Kiara Patel".to_string()),
            enrolled: Some(true),
            year: Some(2020),
            avg: Some(81.2),
            campus: Some("Denver".to_string()),
        }
    }

    #[test]
    fn complete_learners_pass_every_rule() {
        for campus in CAMPUSES {
            let mut learner = valid_learner(1);
            learner.campus = Some(campus.to_string());
            assert!(!is_invalid(&learner), "{campus} should be accepted");
        }

        let mut boundary = valid_learner(2);
        boundary.year = Some(MIN_YEAR);
        boundary.avg = None;
        assert!(!is_invalid(&boundary));
    }

    #[test]
    fn any_single_failure_reports_the_learner() {
        let mutations: [fn(&mut Learner); 6] = [
            |l: &mut Learner| l.name = None,
            |l: &mut Learner| l.enrolled = None,
            |l: &mut Learner| l.year = None,
            |l: &mut Learner| l.campus = None,
            |l: &mut Learner| l.year = Some(1994),
            |l: &mut Learner| l.campus = Some("Chicago".to_string()),
        ];

        for mutate in mutations {
            let mut learner = valid_learner(3);
            mutate(&mut learner);
            assert!(is_invalid(&learner), "{learner:?} should be reported");
        }
    }

    #[test]
    fn campus_match_is_exact() {
        let mut learner = valid_learner(4);
        learner.campus = Some("boston".to_string());
        assert_eq!(failed_rules(&learner), vec!["unknown campus"]);
    }

    #[test]
    fn missing_campus_fails_both_campus_rules() {
        let mut learner = valid_learner(5);
        learner.campus = None;
        assert_eq!(
            failed_rules(&learner),
            vec!["missing campus", "unknown campus"]
        );
    }

    #[test]
    fn find_invalid_keeps_store_order_and_skips_valid() {
        let mut old = valid_learner(2);
        old.year = Some(1980);
        let mut nameless = valid_learner(4);
        nameless.name = None;
        let learners = vec![valid_learner(1), old, valid_learner(3), nameless];

        let invalid = find_invalid(&learners);
        let ids: Vec<i64> = invalid.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![2, 4]);
        assert!(find_invalid(&[valid_learner(9)]).is_empty());
    }
}
