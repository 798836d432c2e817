//! Allocator — greedy, project-by-project selection over a shared employee pool.
//!
//! Projects are processed strictly in table order. Every committed selection
//! removes the employee from the pool before the next project is scored, so
//! nobody is booked twice within one run.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::matching::scoring::MatchScorer;
use crate::matching::sheet::{sanitize_sheet_name, AssignmentRow};
use crate::models::{Employee, Project};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// How the top candidates for a project are chosen and committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Fill from 100% matches when there are enough of them, otherwise take the
    /// top scorers regardless of score. Commits by bumping `current_projects`
    /// and zeroing `current_availability`.
    ExactMatchPreferred,
    /// Drop zero scores, take up to headcount. Commits by setting `currently_assigned`.
    #[default]
    Threshold,
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::ExactMatchPreferred => f.write_str("exact-match-preferred"),
            SelectionPolicy::Threshold => f.write_str("threshold"),
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "exact-match-preferred" | "exact" => Ok(SelectionPolicy::ExactMatchPreferred),
            "threshold" => Ok(SelectionPolicy::Threshold),
            other => Err(format!(
                "unknown selection policy '{other}' (expected 'exact-match-preferred' or 'threshold')"
            )),
        }
    }
}

/// Ranked selection for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAssignment {
    pub project: String,
    pub sheet_name: String,
    pub headcount: u32,
    /// Baseline weekly hours of the selected employees.
    pub committed_hours: u32,
    pub rows: Vec<AssignmentRow>,
}

impl ProjectAssignment {
    pub fn is_understaffed(&self) -> bool {
        self.rows.len() < self.headcount as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub total_projects: usize,
    /// Employees not flagged as assigned before the run started.
    pub not_assigned_before_run: usize,
    pub eligible_pool: usize,
    pub employees_assigned: usize,
    pub projects_without_match: usize,
    pub understaffed_projects: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub assignments: Vec<ProjectAssignment>,
    /// Eligible employees that no project selected.
    pub remaining: Vec<Employee>,
    /// Every input employee, with mutated state fields.
    pub employees: Vec<Employee>,
    pub summary: AllocationSummary,
}

// ────────────────────────────────────────────────────────────────────────────
// Pool
// ────────────────────────────────────────────────────────────────────────────

/// The employees of one run plus the ordered subset still open for selection.
#[derive(Debug, Clone)]
pub struct EmployeePool {
    employees: Vec<Employee>,
    eligible: Vec<usize>,
    not_assigned_before_run: usize,
}

impl EmployeePool {
    /// Builds the pool and applies the eligibility filter as of `as_of`.
    /// Names must be unique within a run.
    pub fn new(
        employees: Vec<Employee>,
        as_of: NaiveDate,
        lookahead_days: u64,
    ) -> Result<Self, AppError> {
        let mut seen = HashSet::new();
        for employee in &employees {
            if !seen.insert(employee.name.as_str()) {
                return Err(AppError::Validation(format!(
                    "Duplicate employee name '{}'",
                    employee.name
                )));
            }
        }

        let eligible: Vec<usize> = employees
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_eligible(as_of, lookahead_days))
            .map(|(i, _)| i)
            .collect();
        let not_assigned_before_run = employees.iter().filter(|e| !e.currently_assigned).count();

        info!(
            "Employee pool: {} total, {} eligible as of {as_of} (+{lookahead_days}d)",
            employees.len(),
            eligible.len()
        );

        Ok(EmployeePool {
            employees,
            eligible,
            not_assigned_before_run,
        })
    }

    pub fn eligible_len(&self) -> usize {
        self.eligible.len()
    }

    /// Scores every eligible employee, highest first. Ties keep pool order.
    fn rank(&self, project: &Project, scorer: &dyn MatchScorer) -> Vec<(usize, f64)> {
        let mut scored: Vec<(usize, f64)> = self
            .eligible
            .iter()
            .map(|&i| (i, scorer.score(&self.employees[i], project)))
            .collect();
        // sort_by is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
    }

    fn commit(&mut self, index: usize, selection: SelectionPolicy) {
        let employee = &mut self.employees[index];
        match selection {
            SelectionPolicy::ExactMatchPreferred => {
                employee.current_projects += 1;
                employee.current_availability = 0;
            }
            SelectionPolicy::Threshold => employee.currently_assigned = true,
        }
        self.eligible.retain(|&i| i != index);
    }

    fn into_parts(self) -> (Vec<Employee>, Vec<Employee>) {
        let remaining = self
            .eligible
            .iter()
            .map(|&i| self.employees[i].clone())
            .collect();
        (remaining, self.employees)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Selection algorithm
// ────────────────────────────────────────────────────────────────────────────

fn is_exact_match(score: f64) -> bool {
    (score - 100.0).abs() < f64::EPSILON
}

fn select(ranked: Vec<(usize, f64)>, headcount: usize, selection: SelectionPolicy) -> Vec<(usize, f64)> {
    match selection {
        SelectionPolicy::ExactMatchPreferred => {
            let exact: Vec<(usize, f64)> = ranked
                .iter()
                .copied()
                .filter(|&(_, score)| is_exact_match(score))
                .collect();
            if exact.len() >= headcount {
                exact.into_iter().take(headcount).collect()
            } else {
                ranked.into_iter().take(headcount).collect()
            }
        }
        SelectionPolicy::Threshold => ranked
            .into_iter()
            .filter(|&(_, score)| score > 0.0)
            .take(headcount)
            .collect(),
    }
}

/// Scores, selects and commits one project against the pool.
pub fn assign_project(
    pool: &mut EmployeePool,
    project: &Project,
    scorer: &dyn MatchScorer,
    selection: SelectionPolicy,
) -> ProjectAssignment {
    if !project.has_requirements() {
        debug!("Project '{}' lists no requirements", project.name);
    }
    let ranked = pool.rank(project, scorer);
    let chosen = select(ranked, project.headcount as usize, selection);

    let rows: Vec<AssignmentRow> = chosen
        .iter()
        .map(|&(i, score)| AssignmentRow::project(&pool.employees[i], score))
        .collect();
    let committed_hours = chosen
        .iter()
        .map(|&(i, _)| pool.employees[i].available_hours())
        .sum();

    for &(i, score) in &chosen {
        debug!(
            "'{}' -> '{}' ({score:.1}%)",
            pool.employees[i].name, project.name
        );
        pool.commit(i, selection);
    }

    info!(
        "Project '{}': {}/{} selected, {} left in pool",
        project.name,
        rows.len(),
        project.headcount,
        pool.eligible_len()
    );

    ProjectAssignment {
        project: project.name.clone(),
        sheet_name: sanitize_sheet_name(&project.name),
        headcount: project.headcount,
        committed_hours,
        rows,
    }
}

/// Runs every project in order against one pool.
///
/// Earlier projects are committed before later ones are scored; there is no
/// rebalancing across projects.
pub fn allocate(
    projects: &[Project],
    mut pool: EmployeePool,
    scorer: &dyn MatchScorer,
    selection: SelectionPolicy,
) -> AllocationOutcome {
    let eligible_pool = pool.eligible_len();
    let not_assigned_before_run = pool.not_assigned_before_run;

    let assignments: Vec<ProjectAssignment> = projects
        .iter()
        .map(|project| assign_project(&mut pool, project, scorer, selection))
        .collect();

    let summary = AllocationSummary {
        total_projects: projects.len(),
        not_assigned_before_run,
        eligible_pool,
        employees_assigned: assignments.iter().map(|a| a.rows.len()).sum(),
        projects_without_match: assignments.iter().filter(|a| a.rows.is_empty()).count(),
        understaffed_projects: assignments.iter().filter(|a| a.is_understaffed()).count(),
    };

    let (remaining, employees) = pool.into_parts();
    AllocationOutcome {
        assignments,
        remaining,
        employees,
        summary,
    }
}

/// Read-only preview: the best `limit` non-zero scorers for each project.
/// Nobody is consumed, so one employee may appear under several projects.
pub fn shortlist(
    projects: &[Project],
    pool: &EmployeePool,
    scorer: &dyn MatchScorer,
    limit: usize,
) -> Vec<ProjectAssignment> {
    projects
        .iter()
        .map(|project| {
            let top: Vec<(usize, f64)> = pool
                .rank(project, scorer)
                .into_iter()
                .filter(|&(_, score)| score > 0.0)
                .take(limit)
                .collect();
            ProjectAssignment {
                project: project.name.clone(),
                sheet_name: sanitize_sheet_name(&project.name),
                headcount: project.headcount,
                committed_hours: 0,
                rows: top
                    .into_iter()
                    .map(|(i, score)| AssignmentRow::project(&pool.employees[i], score))
                    .collect(),
            }
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::scoring::{ScoringPolicy, SetOverlapScorer, SubstringOverlapScorer};
    use crate::models::AvailabilityClass;
    use chrono::Days;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn make_employee(name: &str, languages: &str, skills: &str, tools: &str, days_left: u64) -> Employee {
        Employee {
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            id: None,
            availability: AvailabilityClass::FullTime,
            current_projects: 0,
            current_availability: 40,
            currently_assigned: false,
            end_date: today() + Days::new(days_left),
            languages: languages.to_string(),
            skills: skills.to_string(),
            tools: tools.to_string(),
            certifications: None,
        }
    }

    fn make_project(name: &str, languages: &str, skills: &str, tools: &str, headcount: u32) -> Project {
        let field = |v: &str| (!v.is_empty()).then(|| v.to_string());
        Project {
            name: name.to_string(),
            headcount,
            hours_required: Some(100),
            languages: field(languages),
            skills: field(skills),
            tools: field(tools),
        }
    }

    fn pool_of(employees: Vec<Employee>) -> EmployeePool {
        EmployeePool::new(employees, today(), 15).unwrap()
    }

    fn names(assignment: &ProjectAssignment) -> Vec<&str> {
        assignment.rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_full_match_employee_selected() {
        let mut a = make_employee("A", "Python", "Data Analysis", "Excel", 60);
        a.certifications = Some("CompTIA Data+".to_string());
        let project = make_project("P", "python", "data analysis", "excel", 1);

        let outcome = allocate(
            &[project],
            pool_of(vec![a]),
            &SubstringOverlapScorer,
            SelectionPolicy::ExactMatchPreferred,
        );

        assert_eq!(names(&outcome.assignments[0]), vec!["A"]);
        assert_eq!(outcome.assignments[0].rows[0].match_pct, 100.0);
        assert_eq!(outcome.employees[0].current_projects, 1);
        assert_eq!(outcome.employees[0].current_availability, 0);
        assert!(outcome.remaining.is_empty());
    }

    #[test]
    fn test_expired_employee_never_assigned() {
        let b = make_employee("B", "Python", "Data Analysis", "Excel", 0);
        let almost = make_employee("Almost", "Python", "Data Analysis", "Excel", 15);
        let project = make_project("P", "Python", "Data Analysis", "Excel", 5);

        for selection in [SelectionPolicy::ExactMatchPreferred, SelectionPolicy::Threshold] {
            let outcome = allocate(
                &[project.clone()],
                pool_of(vec![b.clone(), almost.clone()]),
                &SetOverlapScorer,
                selection,
            );
            assert!(outcome.assignments[0].rows.is_empty(), "{selection}");
            assert!(outcome.remaining.is_empty());
            assert_eq!(outcome.summary.eligible_pool, 0);
        }
    }

    #[test]
    fn test_first_project_consumes_shared_employee() {
        let c = make_employee("C", "Rust", "Systems", "Git", 90);
        let projects = [
            make_project("P1", "Rust", "", "", 1),
            make_project("P2", "Rust", "", "", 1),
        ];

        let outcome = allocate(&projects, pool_of(vec![c]), &SetOverlapScorer, SelectionPolicy::Threshold);

        assert_eq!(names(&outcome.assignments[0]), vec!["C"]);
        assert!(outcome.assignments[1].rows.is_empty());
        assert!(outcome.remaining.is_empty());
        assert!(outcome.employees[0].currently_assigned);
        assert_eq!(outcome.summary.projects_without_match, 1);
    }

    #[test]
    fn test_no_employee_in_two_projects() {
        let employees: Vec<Employee> = (0..6)
            .map(|i| make_employee(&format!("E{i}"), "SQL", "Data Cleaning", "Tableau", 100))
            .collect();
        let projects = [
            make_project("P1", "SQL", "", "", 2),
            make_project("P2", "SQL", "Data Cleaning", "", 3),
            make_project("P3", "", "", "Tableau", 4),
        ];

        let outcome = allocate(&projects, pool_of(employees), &SetOverlapScorer, SelectionPolicy::Threshold);

        let mut seen = HashSet::new();
        for assignment in &outcome.assignments {
            for row in &assignment.rows {
                assert!(seen.insert(row.name.clone()), "{} assigned twice", row.name);
            }
        }
        for employee in &outcome.remaining {
            assert!(seen.insert(employee.name.clone()), "{} both assigned and remaining", employee.name);
        }
        assert_eq!(seen.len(), 6, "assigned + remaining must equal the eligible pool");
        assert_eq!(outcome.assignments[2].rows.len(), 1);
        assert_eq!(outcome.summary.understaffed_projects, 1);
    }

    #[test]
    fn test_headcount_above_pool_returns_short_list() {
        let employees = vec![
            make_employee("X", "Julia", "", "", 40),
            make_employee("Y", "Julia", "", "", 40),
        ];
        let project = make_project("Big", "Julia", "", "", 5);

        let outcome = allocate(&[project], pool_of(employees), &SetOverlapScorer, SelectionPolicy::Threshold);

        assert_eq!(outcome.assignments[0].rows.len(), 2);
        assert!(outcome.assignments[0].is_understaffed());
        assert_eq!(outcome.assignments[0].committed_hours, 80);
    }

    #[test]
    fn test_threshold_drops_zero_scores() {
        let employees = vec![
            make_employee("Match", "R", "", "", 40),
            make_employee("Miss", "Java", "", "", 40),
        ];
        let project = make_project("P", "R", "", "", 2);

        let outcome = allocate(&[project], pool_of(employees), &SetOverlapScorer, SelectionPolicy::Threshold);

        assert_eq!(names(&outcome.assignments[0]), vec!["Match"]);
        assert_eq!(outcome.remaining.len(), 1);
        assert!(!outcome.employees[1].currently_assigned);
    }

    #[test]
    fn test_exact_match_preferred_falls_back_to_top_scores() {
        let employees = vec![
            make_employee("Zero", "Java", "Cooking", "Hammer", 40),
            make_employee("Half", "Python", "Cooking", "Hammer", 40),
            make_employee("Full", "Python", "Data Analysis", "Excel", 40),
        ];
        let project = make_project("P", "Python", "Data Analysis", "Excel", 3);

        let outcome = allocate(
            &[project],
            pool_of(employees),
            &SubstringOverlapScorer,
            SelectionPolicy::ExactMatchPreferred,
        );

        // Only one exact match for three seats: top three regardless of score.
        assert_eq!(names(&outcome.assignments[0]), vec!["Full", "Half", "Zero"]);
        assert_eq!(outcome.assignments[0].rows[2].match_pct, 0.0);
    }

    #[test]
    fn test_exact_match_preferred_takes_exact_group_when_large_enough() {
        let employees = vec![
            make_employee("Partial", "Python", "", "", 40),
            make_employee("Exact1", "Python", "Data Analysis", "", 40),
            make_employee("Exact2", "Python", "Data Analysis", "", 40),
        ];
        let project = make_project("P", "Python", "Data Analysis", "", 2);

        let outcome = allocate(
            &[project],
            pool_of(employees),
            &SubstringOverlapScorer,
            SelectionPolicy::ExactMatchPreferred,
        );

        assert_eq!(names(&outcome.assignments[0]), vec!["Exact1", "Exact2"]);
        assert_eq!(names_of(&outcome.remaining), vec!["Partial"]);
    }

    fn names_of(employees: &[Employee]) -> Vec<&str> {
        employees.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_ties_keep_pool_order() {
        let employees = vec![
            make_employee("First", "SQL", "", "", 40),
            make_employee("Second", "SQL", "", "", 40),
            make_employee("Third", "SQL", "", "", 40),
        ];
        let project = make_project("P", "SQL", "", "", 2);

        let outcome = allocate(&[project], pool_of(employees), &SetOverlapScorer, SelectionPolicy::Threshold);

        assert_eq!(names(&outcome.assignments[0]), vec!["First", "Second"]);
        assert_eq!(names_of(&outcome.remaining), vec!["Third"]);
    }

    #[test]
    fn test_blank_project_yields_empty_threshold_assignment() {
        let employees = vec![make_employee("A", "Python", "Data Analysis", "Excel", 40)];
        let project = make_project("Blank", "", "", "", 1);

        let outcome = allocate(&[project], pool_of(employees), &SubstringOverlapScorer, SelectionPolicy::Threshold);

        assert!(outcome.assignments[0].rows.is_empty());
        assert_eq!(outcome.remaining.len(), 1);
    }

    #[test]
    fn test_already_assigned_employee_excluded() {
        let mut busy = make_employee("Busy", "Python", "", "", 90);
        busy.currently_assigned = true;
        let free = make_employee("Free", "Python", "", "", 90);
        let project = make_project("P", "Python", "", "", 2);

        let outcome = allocate(&[project], pool_of(vec![busy, free]), &SetOverlapScorer, SelectionPolicy::Threshold);

        assert_eq!(names(&outcome.assignments[0]), vec!["Free"]);
        assert_eq!(outcome.summary.not_assigned_before_run, 1);
        assert_eq!(outcome.employees.len(), 2);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let employees = vec![
            make_employee("Same", "Python", "", "", 90),
            make_employee("Same", "SQL", "", "", 90),
        ];
        let result = EmployeePool::new(employees, today(), 15);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_sheet_name_is_sanitized() {
        let employees = vec![make_employee("A", "Python", "", "", 90)];
        let project = make_project("A/B:C*D", "Python", "", "", 1);

        let outcome = allocate(&[project], pool_of(employees), &SetOverlapScorer, SelectionPolicy::Threshold);

        assert_eq!(outcome.assignments[0].project, "A/B:C*D");
        assert_eq!(outcome.assignments[0].sheet_name, "A-B-C-D");
    }

    #[test]
    fn test_shortlist_does_not_consume_pool() {
        let employees: Vec<Employee> = (0..12)
            .map(|i| make_employee(&format!("E{i:02}"), "Python", "", "", 90))
            .collect();
        let projects = [
            make_project("P1", "Python", "", "", 1),
            make_project("P2", "Python", "", "", 1),
        ];
        let pool = pool_of(employees);
        let scorer = ScoringPolicy::Set.scorer();

        let lists = shortlist(&projects, &pool, scorer.as_ref(), 10);

        assert_eq!(lists[0].rows.len(), 10);
        assert_eq!(lists[0].rows, lists[1].rows);
        assert_eq!(pool.eligible_len(), 12);
        assert!(pool.employees.iter().all(|e| !e.currently_assigned));
    }

    #[test]
    fn test_selection_policy_parses() {
        assert_eq!("exact_match_preferred".parse(), Ok(SelectionPolicy::ExactMatchPreferred));
        assert_eq!("Threshold".parse(), Ok(SelectionPolicy::Threshold));
        assert!("random".parse::<SelectionPolicy>().is_err());
    }
}
