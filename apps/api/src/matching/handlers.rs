//! Axum route handlers for the Matching API.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{field, info, Span};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::adapter::{adapt_employees, adapt_projects, ColumnSpec, RawRow};
use crate::matching::allocator::{
    allocate, shortlist, AllocationSummary, EmployeePool, ProjectAssignment, SelectionPolicy,
};
use crate::matching::scoring::{MatchBreakdown, MatchScorer, ScoringPolicy};
use crate::models::{Employee, Project};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AllocationRequest {
    pub employees: Vec<RawRow>,
    pub projects: Vec<RawRow>,
    #[serde(default)]
    pub columns: ColumnSpec,
    pub scoring: Option<ScoringPolicy>,
    pub selection: Option<SelectionPolicy>,
    /// Reference date for the end-date lookahead. Defaults to today.
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct AllocationResponse {
    pub run_id: Uuid,
    pub as_of: NaiveDate,
    pub scoring: ScoringPolicy,
    pub selection: SelectionPolicy,
    pub assignments: Vec<ProjectAssignment>,
    pub remaining: Vec<Employee>,
    /// The employee table in its input schema, state columns updated.
    pub employees: Vec<RawRow>,
    pub summary: AllocationSummary,
}

#[derive(Debug, Deserialize)]
pub struct ShortlistRequest {
    pub employees: Vec<RawRow>,
    pub projects: Vec<RawRow>,
    #[serde(default)]
    pub columns: ColumnSpec,
    pub scoring: Option<ScoringPolicy>,
    pub as_of: Option<NaiveDate>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ShortlistResponse {
    pub as_of: NaiveDate,
    pub scoring: ScoringPolicy,
    pub limit: usize,
    pub shortlists: Vec<ProjectAssignment>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub employee: Employee,
    pub project: Project,
    pub scoring: Option<ScoringPolicy>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/allocations
///
/// Full run: adapt both tables, filter the pool, assign projects in order.
/// Empty assignments are valid results, not errors.
#[tracing::instrument(name = "allocation", skip_all, fields(run_id = field::Empty))]
pub async fn handle_allocate(
    State(state): State<AppState>,
    Json(request): Json<AllocationRequest>,
) -> Result<Json<AllocationResponse>, AppError> {
    let run_id = Uuid::new_v4();
    Span::current().record("run_id", field::display(run_id));

    let as_of = request.as_of.unwrap_or_else(today);
    let (scoring, scorer) = resolve_scorer(&state, request.scoring);
    let selection = request.selection.unwrap_or(state.config.selection_policy);
    let columns = request.columns.resolve();

    let projects = adapt_projects(&request.projects, &columns.projects)?;
    let (employees, source) = adapt_employees(request.employees, &columns.employees)?;
    let pool = EmployeePool::new(employees, as_of, state.config.lookahead_days)?;

    info!(
        "Allocating {} projects (scoring={scoring}, selection={selection})",
        projects.len()
    );
    let outcome = allocate(&projects, pool, scorer.as_ref(), selection);

    Ok(Json(AllocationResponse {
        run_id,
        as_of,
        scoring,
        selection,
        employees: source.write_back(&outcome.employees),
        assignments: outcome.assignments,
        remaining: outcome.remaining,
        summary: outcome.summary,
    }))
}

/// POST /api/v1/shortlists
///
/// Read-only preview of the best candidates per project. Nobody is reserved.
pub async fn handle_shortlist(
    State(state): State<AppState>,
    Json(request): Json<ShortlistRequest>,
) -> Result<Json<ShortlistResponse>, AppError> {
    let limit = request.limit.unwrap_or(state.config.shortlist_limit);
    if limit == 0 {
        return Err(AppError::Validation("limit must be at least 1".to_string()));
    }

    let as_of = request.as_of.unwrap_or_else(today);
    let (scoring, scorer) = resolve_scorer(&state, request.scoring);
    let columns = request.columns.resolve();

    let projects = adapt_projects(&request.projects, &columns.projects)?;
    let (employees, _) = adapt_employees(request.employees, &columns.employees)?;
    let pool = EmployeePool::new(employees, as_of, state.config.lookahead_days)?;

    Ok(Json(ShortlistResponse {
        as_of,
        scoring,
        limit,
        shortlists: shortlist(&projects, &pool, scorer.as_ref(), limit),
    }))
}

/// POST /api/v1/score
///
/// Scores one canonical employee against one project and returns the breakdown.
pub async fn handle_score(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<MatchBreakdown>, AppError> {
    if request.project.name.trim().is_empty() {
        return Err(AppError::Validation("project name cannot be empty".to_string()));
    }
    let (_, scorer) = resolve_scorer(&state, request.scoring);
    Ok(Json(scorer.evaluate(&request.employee, &request.project)))
}

fn resolve_scorer(
    state: &AppState,
    requested: Option<ScoringPolicy>,
) -> (ScoringPolicy, Arc<dyn MatchScorer>) {
    match requested {
        Some(policy) if policy != state.config.scoring_policy => (policy, Arc::from(policy.scorer())),
        _ => (state.config.scoring_policy, Arc::clone(&state.scorer)),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
