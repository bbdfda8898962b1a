use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::models::StopRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeCount {
    pub outcome: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardMetrics {
    pub total_stops: usize,
    pub total_arrests: usize,
    pub total_warnings: usize,
    pub drug_stops: usize,

    /// One entry per distinct `stop_outcome`, missing outcomes included as
    /// `null`, so the counts always add up to `total_stops`.
    pub outcome_distribution: Vec<OutcomeCount>,
}

impl DashboardMetrics {
    #[must_use]
    pub fn distribution_total(&self) -> usize {
        self.outcome_distribution
            .iter()
            .map(|entry| entry.count)
            .sum()
    }
}

#[must_use]
pub fn compute(records: &[StopRecord]) -> DashboardMetrics {
    let mut metrics = DashboardMetrics {
        total_stops: records.len(),
        ..DashboardMetrics::default()
    };

    let mut positions: HashMap<Option<&str>, usize> = HashMap::new();
    let mut distribution: Vec<OutcomeCount> = Vec::new();

    for record in records {
        let outcome = record.stop_outcome.as_deref();
        if outcome.is_some_and(is_arrest_outcome) {
            metrics.total_arrests += 1;
        }
        if outcome.is_some_and(is_warning_outcome) {
            metrics.total_warnings += 1;
        }
        if record.drug_related() {
            metrics.drug_stops += 1;
        }

        match positions.get(&outcome) {
            Some(&index) => distribution[index].count += 1,
            None => {
                positions.insert(outcome, distribution.len());
                distribution.push(OutcomeCount {
                    outcome: outcome.map(ToString::to_string),
                    count: 1,
                });
            }
        }
    }

    // Largest slice first; equal counts keep first-seen order.
    distribution.sort_by(|left, right| right.count.cmp(&left.count));
    metrics.outcome_distribution = distribution;
    metrics
}

#[must_use]
pub fn is_arrest_outcome(outcome: &str) -> bool {
    arrest_regex().is_match(outcome)
}

#[must_use]
pub fn is_warning_outcome(outcome: &str) -> bool {
    warning_regex().is_match(outcome)
}

fn arrest_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)arrest").expect("arrest outcome regex must compile"))
}

fn warning_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)warning").expect("warning outcome regex must compile"))
}
