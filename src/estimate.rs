use indexmap::IndexMap;
use serde::Serialize;

use crate::api::templates::{FilesPayload, Risk, Task};

/// Three-point (PERT) expected value: `(best + 4 * likely + worst) / 6`.
pub fn pert(best: u32, likely: u32, worst: u32) -> f64 {
    (f64::from(best) + 4.0 * f64::from(likely) + f64::from(worst)) / 6.0
}

pub fn task_expected_hours(task: &Task) -> f64 {
    pert(
        task.hours_best_case,
        task.hours_most_likely,
        task.hours_worst_case,
    )
}

/// Expected impact weighted by the chance of the risk occurring.
pub fn risk_exposure(risk: &Risk) -> f64 {
    let impact = pert(
        risk.impact_hours_best_case,
        risk.impact_hours_most_likely,
        risk.impact_hours_worst_case,
    );
    impact * f64::from(risk.chance_of_occurring.min(100)) / 100.0
}

/// Rolled-up hours of a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstimateSummary {
    pub task_count: usize,
    pub best_case_hours: u64,
    pub most_likely_hours: u64,
    pub worst_case_hours: u64,
    pub expected_hours: f64,
    pub risk_count: usize,
    pub risk_exposure_hours: f64,
    /// Expected task hours plus risk exposure.
    pub total_hours: f64,
    /// Summed allocation percentage per role, in first-seen order.
    pub allocation_by_role: IndexMap<String, u32>,
}

pub fn summarize(files: &FilesPayload) -> EstimateSummary {
    let tasks = &files.tasks;
    let expected_hours: f64 = tasks.iter().map(task_expected_hours).sum();
    let risk_exposure_hours: f64 = files.risks.iter().map(risk_exposure).sum();

    let mut allocation_by_role: IndexMap<String, u32> = IndexMap::new();
    for allocation in &files.team_modeling {
        *allocation_by_role
            .entry(allocation.role.clone())
            .or_default() += allocation.percentage;
    }

    EstimateSummary {
        task_count: tasks.len(),
        best_case_hours: tasks.iter().map(|t| u64::from(t.hours_best_case)).sum(),
        most_likely_hours: tasks.iter().map(|t| u64::from(t.hours_most_likely)).sum(),
        worst_case_hours: tasks.iter().map(|t| u64::from(t.hours_worst_case)).sum(),
        expected_hours,
        risk_count: files.risks.len(),
        risk_exposure_hours,
        total_hours: expected_hours + risk_exposure_hours,
        allocation_by_role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::templates::TeamModeling;

    fn task(best: u32, likely: u32, worst: u32) -> Task {
        Task {
            task_description: "work".into(),
            hours_best_case: best,
            hours_most_likely: likely,
            hours_worst_case: worst,
            ..Task::default()
        }
    }

    #[test]
    fn test_pert() {
        assert!((pert(2, 5, 14) - 6.0).abs() < f64::EPSILON);
        assert!((pert(0, 0, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_risk_exposure() {
        let risk = Risk {
            risk: "Vendor delay".into(),
            chance_of_occurring: 50,
            impact_hours_best_case: 6,
            impact_hours_most_likely: 6,
            impact_hours_worst_case: 6,
            ..Risk::default()
        };
        assert!((risk_exposure(&risk) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_totals() {
        let files = FilesPayload {
            tasks: vec![task(2, 5, 14), task(1, 1, 1)],
            risks: vec![Risk {
                risk: "Data quality".into(),
                chance_of_occurring: 100,
                impact_hours_best_case: 3,
                impact_hours_most_likely: 3,
                impact_hours_worst_case: 3,
                ..Risk::default()
            }],
            team_modeling: vec![
                TeamModeling {
                    role: "Developer".into(),
                    percentage: 50,
                    ..TeamModeling::default()
                },
                TeamModeling {
                    role: "Developer".into(),
                    percentage: 25,
                    ..TeamModeling::default()
                },
            ],
            ..FilesPayload::default()
        };

        let summary = summarize(&files);
        assert_eq!(summary.task_count, 2);
        assert_eq!(summary.best_case_hours, 3);
        assert_eq!(summary.worst_case_hours, 15);
        assert!((summary.expected_hours - 7.0).abs() < 1e-9);
        assert!((summary.total_hours - 10.0).abs() < 1e-9);
        assert_eq!(summary.allocation_by_role["Developer"], 75);
    }
}
