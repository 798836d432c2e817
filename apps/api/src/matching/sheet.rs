//! Output projection for per-project assignment sheets.

use serde::{Deserialize, Serialize};

use crate::models::{AvailabilityClass, Employee};

/// Longest sheet name spreadsheet tools accept.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

const DISALLOWED_SHEET_CHARS: &[char] = &['\\', '/', '*', '?', ':', '[', ']'];

/// One output row: the fixed column set shown for every assigned employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Availability")]
    pub availability: AvailabilityClass,
    #[serde(rename = "Languages")]
    pub languages: String,
    #[serde(rename = "Skills/Experience")]
    pub skills: String,
    #[serde(rename = "Tools")]
    pub tools: String,
    #[serde(rename = "Certifications")]
    pub certifications: Option<String>,
    #[serde(rename = "Match %")]
    pub match_pct: f64,
}

impl AssignmentRow {
    pub fn project(employee: &Employee, match_pct: f64) -> Self {
        AssignmentRow {
            name: employee.name.clone(),
            availability: employee.availability,
            languages: employee.languages.clone(),
            skills: employee.skills.clone(),
            tools: employee.tools.clone(),
            certifications: employee.certifications.clone(),
            match_pct,
        }
    }
}

/// Replaces characters sheet names cannot hold with `-` and truncates to 31 characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    name.chars()
        .map(|c| if DISALLOWED_SHEET_CHARS.contains(&c) { '-' } else { c })
        .take(MAX_SHEET_NAME_CHARS)
        .collect()
}
