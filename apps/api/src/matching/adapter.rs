//! Table adapter — maps raw spreadsheet rows (column header → cell) onto
//! canonical `Employee` / `Project` values, and writes mutated state back.
//!
//! Column names live only here. The scorer and allocator never see a header.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::AppError;
use crate::models::{AvailabilityClass, Employee, Project};

/// One spreadsheet row as delivered by the upload front end.
pub type RawRow = Map<String, Value>;

const EMPLOYEE_TABLE: &str = "employee";
const PROJECT_TABLE: &str = "project";

// ────────────────────────────────────────────────────────────────────────────
// Column mappings
// ────────────────────────────────────────────────────────────────────────────

/// Header names for each canonical employee field. `None` means the table has no such column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeColumns {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    pub availability: String,
    #[serde(default)]
    pub current_projects: Option<String>,
    #[serde(default)]
    pub current_availability: Option<String>,
    #[serde(default)]
    pub currently_assigned: Option<String>,
    pub end_date: String,
    pub languages: String,
    pub skills: String,
    pub tools: String,
    pub certifications: String,
    /// Collapse repeated submissions of the same person, keeping the highest id.
    #[serde(default)]
    pub dedupe_by_name: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectColumns {
    pub name: String,
    pub headcount: String,
    #[serde(default)]
    pub hours_required: Option<String>,
    pub languages: String,
    pub skills: String,
    pub tools: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumns {
    pub employees: EmployeeColumns,
    pub projects: ProjectColumns,
}

/// Known spreadsheet layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPreset {
    /// Generated roster: one value per attribute, project counts and hours.
    #[default]
    Generated,
    /// Survey export: `;`-separated answers, yes/no assignment flag, repeat submissions.
    IntakeForm,
}

/// Either a preset name or a full explicit mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Preset(ColumnPreset),
    Explicit(TableColumns),
}

impl Default for ColumnSpec {
    fn default() -> Self {
        ColumnSpec::Preset(ColumnPreset::default())
    }
}

impl ColumnSpec {
    pub fn resolve(self) -> TableColumns {
        match self {
            ColumnSpec::Preset(preset) => preset.columns(),
            ColumnSpec::Explicit(columns) => columns,
        }
    }
}

impl ColumnPreset {
    pub fn columns(self) -> TableColumns {
        let s = |v: &str| v.to_string();
        match self {
            ColumnPreset::Generated => TableColumns {
                employees: EmployeeColumns {
                    name: s("Name"),
                    email: Some(s("Email")),
                    id: None,
                    availability: s("Availability"),
                    current_projects: Some(s("Current Projects")),
                    current_availability: Some(s("Current Availability")),
                    currently_assigned: None,
                    end_date: s("End Date"),
                    languages: s("Languages"),
                    skills: s("Skills"),
                    tools: s("Tools"),
                    certifications: s("Certifications"),
                    dedupe_by_name: false,
                },
                projects: ProjectColumns {
                    name: s("Project Name"),
                    headcount: s("Number of People Required"),
                    hours_required: Some(s("Hours Required")),
                    languages: s("Languages"),
                    skills: s("Skills"),
                    tools: s("Tools"),
                },
            },
            ColumnPreset::IntakeForm => TableColumns {
                employees: EmployeeColumns {
                    name: s("Name1"),
                    email: None,
                    id: Some(s("Id")),
                    availability: s("Availability"),
                    current_projects: None,
                    current_availability: None,
                    currently_assigned: Some(s("Are you currently assigned to a project?")),
                    end_date: s("Please Enter Your End Date"),
                    languages: s("Languages"),
                    skills: s("Experience"),
                    tools: s("Tools"),
                    certifications: s("Certifications"),
                    dedupe_by_name: true,
                },
                projects: ProjectColumns {
                    name: s("Project Name"),
                    headcount: s("Number of Employees Needed"),
                    hours_required: None,
                    // Header spelling matches the form export.
                    languages: s("Langauages proficiency required (e.g. Python, Java)"),
                    skills: s(
                        "Skills Required (e.g. Risk Management, Data Analysis, Data Visualization )",
                    ),
                    tools: s("Tools (e.g. Power BI, Jira)"),
                },
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cell decoding
// ────────────────────────────────────────────────────────────────────────────

struct Cells<'a> {
    table: &'static str,
    row: usize,
    raw: &'a RawRow,
}

impl<'a> Cells<'a> {
    fn malformed(&self, column: &str, reason: impl Into<String>) -> AppError {
        AppError::malformed(self.table, self.row, column, reason)
    }

    /// Trimmed text of a cell; `None` for absent, null or blank cells.
    fn text(&self, column: &str) -> Result<Option<String>, AppError> {
        let text = match self.raw.get(column) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(_) => return Err(self.malformed(column, "expected a scalar cell")),
        };
        Ok((!text.is_empty()).then_some(text))
    }

    fn required_text(&self, column: &str) -> Result<String, AppError> {
        if !self.raw.contains_key(column) {
            return Err(self.malformed(column, "column is missing"));
        }
        self.text(column)?
            .ok_or_else(|| self.malformed(column, "value is blank"))
    }

    fn optional_text(&self, column: Option<&str>) -> Result<Option<String>, AppError> {
        match column {
            Some(column) => self.text(column),
            None => Ok(None),
        }
    }

    fn count(&self, column: &str) -> Result<Option<u64>, AppError> {
        let parsed = match self.raw.get(column) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().and_then(whole_non_negative)),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
            Some(Value::String(s)) => {
                let s = s.trim();
                s.parse::<u64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole_non_negative))
            }
            Some(other) => {
                return Err(self.malformed(column, format!("expected a number, got {other}")))
            }
        };
        parsed
            .map(Some)
            .ok_or_else(|| self.malformed(column, "expected a non-negative whole number"))
    }

    fn u32_count(&self, column: &str) -> Result<Option<u32>, AppError> {
        self.count(column)?
            .map(|n| u32::try_from(n).map_err(|_| self.malformed(column, "number is too large")))
            .transpose()
    }

    fn date(&self, column: &str) -> Result<NaiveDate, AppError> {
        let text = self.required_text(column)?;
        parse_date(&text).ok_or_else(|| self.malformed(column, format!("unparseable date '{text}'")))
    }

    fn flag(&self, column: Option<&str>) -> Result<bool, AppError> {
        let Some(column) = column else {
            return Ok(false);
        };
        if !self.raw.contains_key(column) {
            return Err(self.malformed(column, "column is missing"));
        }
        match self.text(column)?.map(|t| t.to_lowercase()).as_deref() {
            Some("no" | "n" | "false" | "0") => Ok(false),
            Some("yes" | "y" | "true" | "1") => Ok(true),
            None => Err(self.malformed(column, "expected yes or no, got a blank cell")),
            Some(other) => Err(self.malformed(column, format!("expected yes or no, got '{other}'"))),
        }
    }
}

fn whole_non_negative(f: f64) -> Option<u64> {
    (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Accepts plain dates, naive date-times (time is dropped) and RFC 3339 timestamps.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Capitalizes the first letter of every alphabetic run, lowercasing the rest.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;
    for c in name.trim().chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Employees
// ────────────────────────────────────────────────────────────────────────────

/// The source rows behind a list of adapted employees, index-aligned.
#[derive(Debug, Clone)]
pub struct SourceRows {
    rows: Vec<RawRow>,
    columns: EmployeeColumns,
}

impl SourceRows {
    /// Returns the input rows with name and state columns updated from `employees`.
    /// Other cells are left untouched.
    pub fn write_back(self, employees: &[Employee]) -> Vec<RawRow> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .zip(employees)
            .map(|(mut row, employee)| {
                row.insert(columns.name.clone(), Value::from(employee.name.clone()));
                if let Some(column) = &columns.current_projects {
                    row.insert(column.clone(), Value::from(employee.current_projects));
                }
                if let Some(column) = &columns.current_availability {
                    row.insert(column.clone(), Value::from(employee.current_availability));
                }
                if let Some(column) = &columns.currently_assigned {
                    let flag = if employee.currently_assigned { "Yes" } else { "No" };
                    row.insert(column.clone(), Value::from(flag));
                }
                row
            })
            .collect()
    }
}

/// Maps employee rows onto canonical employees.
///
/// Missing project counts and availability default to 0. When the mapping has
/// an assignment flag column, every row must answer it. Any other missing or
/// unparseable required value is an error. Repeated submissions are collapsed
/// before the survivors are validated.
pub fn adapt_employees(
    rows: Vec<RawRow>,
    columns: &EmployeeColumns,
) -> Result<(Vec<Employee>, SourceRows), AppError> {
    let numbered: Vec<(usize, RawRow)> = rows
        .into_iter()
        .enumerate()
        .map(|(i, raw)| (i + 1, raw))
        .collect();
    let numbered = if columns.dedupe_by_name {
        dedupe_by_name(numbered, columns)?
    } else {
        numbered
    };

    let mut employees = Vec::with_capacity(numbered.len());
    for (row, raw) in &numbered {
        let mut employee = adapt_employee(*row, raw, columns)?;
        if columns.dedupe_by_name {
            employee.name = title_case(&employee.name);
        }
        employees.push(employee);
    }
    let rows = numbered.into_iter().map(|(_, raw)| raw).collect();

    Ok((
        employees,
        SourceRows {
            rows,
            columns: columns.clone(),
        },
    ))
}

fn adapt_employee(row: usize, raw: &RawRow, columns: &EmployeeColumns) -> Result<Employee, AppError> {
    let cells = Cells {
        table: EMPLOYEE_TABLE,
        row,
        raw,
    };

    let availability_text = cells.required_text(&columns.availability)?;
    let availability: AvailabilityClass = availability_text
        .parse()
        .map_err(|reason: String| cells.malformed(&columns.availability, reason))?;

    let id = record_id(&cells, columns.id.as_deref())?;

    let current_projects = match &columns.current_projects {
        Some(column) => cells.u32_count(column)?.unwrap_or(0),
        None => 0,
    };
    let current_availability = match &columns.current_availability {
        Some(column) => cells.u32_count(column)?.unwrap_or(0),
        None => 0,
    };

    Ok(Employee {
        name: cells.required_text(&columns.name)?,
        email: cells.optional_text(columns.email.as_deref())?,
        id,
        availability,
        current_projects,
        current_availability,
        currently_assigned: cells.flag(columns.currently_assigned.as_deref())?,
        end_date: cells.date(&columns.end_date)?,
        languages: cells.text(&columns.languages)?.unwrap_or_default(),
        skills: cells.text(&columns.skills)?.unwrap_or_default(),
        tools: cells.text(&columns.tools)?.unwrap_or_default(),
        certifications: cells.text(&columns.certifications)?,
    })
}

fn record_id(cells: &Cells<'_>, column: Option<&str>) -> Result<Option<i64>, AppError> {
    let Some(column) = column else {
        return Ok(None);
    };
    cells
        .count(column)?
        .map(|n| i64::try_from(n).map_err(|_| cells.malformed(column, "id is too large")))
        .transpose()
}

/// Keeps one row per case-insensitive name: the one with the highest id
/// (first seen on ties). Only the name and id cells are read here, so a
/// dropped submission never fails the run. Survivors keep input order.
fn dedupe_by_name(
    rows: Vec<(usize, RawRow)>,
    columns: &EmployeeColumns,
) -> Result<Vec<(usize, RawRow)>, AppError> {
    let mut keys = Vec::with_capacity(rows.len());
    let mut winner: HashMap<String, (usize, Option<i64>)> = HashMap::new();
    for (position, (row, raw)) in rows.iter().enumerate() {
        let cells = Cells {
            table: EMPLOYEE_TABLE,
            row: *row,
            raw,
        };
        let key = cells.required_text(&columns.name)?.to_lowercase();
        let id = record_id(&cells, columns.id.as_deref())?;
        match winner.get(&key) {
            Some(&(_, kept_id)) if kept_id >= id => {}
            _ => {
                winner.insert(key.clone(), (position, id));
            }
        }
        keys.push(key);
    }

    let total = rows.len();
    let kept: Vec<(usize, RawRow)> = rows
        .into_iter()
        .zip(keys)
        .enumerate()
        .filter(|(position, (_, key))| winner.get(key).map(|&(p, _)| p) == Some(*position))
        .map(|(_, (row, _))| row)
        .collect();

    if kept.len() < total {
        warn!("Dropped {} repeated employee submissions", total - kept.len());
    }
    Ok(kept)
}

// ────────────────────────────────────────────────────────────────────────────
// Projects
// ────────────────────────────────────────────────────────────────────────────

pub fn adapt_projects(rows: &[RawRow], columns: &ProjectColumns) -> Result<Vec<Project>, AppError> {
    rows.iter()
        .enumerate()
        .map(|(i, raw)| adapt_project(i + 1, raw, columns))
        .collect()
}

fn adapt_project(row: usize, raw: &RawRow, columns: &ProjectColumns) -> Result<Project, AppError> {
    let cells = Cells {
        table: PROJECT_TABLE,
        row,
        raw,
    };

    cells.required_text(&columns.headcount)?;
    let headcount = cells
        .u32_count(&columns.headcount)?
        .filter(|&n| n > 0)
        .ok_or_else(|| cells.malformed(&columns.headcount, "headcount must be a positive whole number"))?;

    let hours_required = match &columns.hours_required {
        Some(column) => cells.u32_count(column)?,
        None => None,
    };

    Ok(Project {
        name: cells.required_text(&columns.name)?,
        headcount,
        hours_required,
        languages: cells.text(&columns.languages)?,
        skills: cells.text(&columns.skills)?,
        tools: cells.text(&columns.tools)?,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
