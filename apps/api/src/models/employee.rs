use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Contracted availability class. Drives the baseline weekly hour capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityClass {
    #[serde(rename = "Part-Time")]
    PartTime,
    #[default]
    #[serde(rename = "Full-Time")]
    FullTime,
}

impl AvailabilityClass {
    pub fn baseline_hours(self) -> u32 {
        match self {
            AvailabilityClass::PartTime => 20,
            AvailabilityClass::FullTime => 40,
        }
    }
}

impl fmt::Display for AvailabilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityClass::PartTime => f.write_str("Part-Time"),
            AvailabilityClass::FullTime => f.write_str("Full-Time"),
        }
    }
}

impl FromStr for AvailabilityClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match normalized.as_str() {
            "fulltime" => Ok(AvailabilityClass::FullTime),
            "parttime" => Ok(AvailabilityClass::PartTime),
            _ => Err(format!("unknown availability class '{}'", s.trim())),
        }
    }
}

/// One row of the employee table in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    pub availability: AvailabilityClass,
    #[serde(default)]
    pub current_projects: u32,
    #[serde(default)]
    pub current_availability: u32,
    #[serde(default)]
    pub currently_assigned: bool,
    pub end_date: NaiveDate,
    /// Single value or `;`-delimited set, kept as entered.
    #[serde(default)]
    pub languages: String,
    /// Skills or experience, same shape as `languages`.
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub tools: String,
    #[serde(default)]
    pub certifications: Option<String>,
}

impl Employee {
    pub fn available_hours(&self) -> u32 {
        self.availability.baseline_hours()
    }

    /// Empty, whitespace-only and "N/A" (any case) all mean no certification.
    pub fn has_certification(&self) -> bool {
        self.certifications
            .as_deref()
            .map(str::trim)
            .map(|c| !c.is_empty() && !c.eq_ignore_ascii_case("n/a"))
            .unwrap_or(false)
    }

    /// True when the engagement runs strictly past `as_of + lookahead_days`
    /// and the employee is not already on a project.
    pub fn is_eligible(&self, as_of: NaiveDate, lookahead_days: u64) -> bool {
        let Some(threshold) = as_of.checked_add_days(Days::new(lookahead_days)) else {
            return false;
        };
        self.end_date > threshold && !self.currently_assigned
    }
}
