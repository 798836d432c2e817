//! Match Scoring — pluggable, trait-based scorer that measures an employee against a project.
//!
//! Two strategies, picked by `ScoringPolicy`:
//! - `SubstringOverlapScorer`: one comparison per attribute, containment in either direction.
//! - `SetOverlapScorer`: token sets, one comparison per required token.
//!
//! Both add the same certification bonus and define 0/0 as 0%.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{Employee, Project};

// ────────────────────────────────────────────────────────────────────────────
// Output data models (shared across all scorer backends)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Language,
    Skill,
    Tool,
    Certification,
}

/// Contribution of one attribute to the overall percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMatch {
    pub attribute: Attribute,
    pub required: u32,
    pub matched: u32,
}

/// Full score breakdown returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchBreakdown {
    pub percentage: f64, // 0 – 100
    pub matched: u32,
    pub compared: u32,
    pub attributes: Vec<AttributeMatch>,
    pub scorer_backend: String,
}

impl MatchBreakdown {
    fn from_attributes(attributes: Vec<AttributeMatch>, backend: &str) -> Self {
        let matched: u32 = attributes.iter().map(|a| a.matched).sum();
        let compared: u32 = attributes.iter().map(|a| a.required).sum();
        let percentage = if compared > 0 {
            f64::from(matched) / f64::from(compared) * 100.0
        } else {
            0.0
        };

        MatchBreakdown {
            percentage,
            matched,
            compared,
            attributes,
            scorer_backend: backend.to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Implement this to add a scoring strategy without touching the allocator or handlers.
pub trait MatchScorer: Send + Sync {
    fn evaluate(&self, employee: &Employee, project: &Project) -> MatchBreakdown;

    fn score(&self, employee: &Employee, project: &Project) -> f64 {
        self.evaluate(employee, project).percentage
    }

    fn backend(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    Substring,
    #[default]
    Set,
}

impl ScoringPolicy {
    pub fn scorer(self) -> Box<dyn MatchScorer> {
        match self {
            ScoringPolicy::Substring => Box::new(SubstringOverlapScorer),
            ScoringPolicy::Set => Box::new(SetOverlapScorer),
        }
    }
}

impl fmt::Display for ScoringPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringPolicy::Substring => f.write_str("substring"),
            ScoringPolicy::Set => f.write_str("set"),
        }
    }
}

impl FromStr for ScoringPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substring" | "substring-overlap" => Ok(ScoringPolicy::Substring),
            "set" | "set-overlap" => Ok(ScoringPolicy::Set),
            other => Err(format!(
                "unknown scoring policy '{other}' (expected 'substring' or 'set')"
            )),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scorer backends
// ────────────────────────────────────────────────────────────────────────────

/// Whole-field comparison: a requirement matches when either normalized value
/// contains the other.
pub struct SubstringOverlapScorer;

impl MatchScorer for SubstringOverlapScorer {
    fn evaluate(&self, employee: &Employee, project: &Project) -> MatchBreakdown {
        let mut attributes: Vec<AttributeMatch> = paired_fields(employee, project)
            .into_iter()
            .filter_map(|(attribute, have, want)| {
                let want = normalize(want?);
                if want.is_empty() {
                    return None;
                }
                let have = normalize(have);
                let hit = !have.is_empty() && (have.contains(&want) || want.contains(&have));
                Some(AttributeMatch {
                    attribute,
                    required: 1,
                    matched: u32::from(hit),
                })
            })
            .collect();

        attributes.extend(certification_bonus(employee));
        MatchBreakdown::from_attributes(attributes, self.backend())
    }

    fn backend(&self) -> &'static str {
        "substring"
    }
}

/// Token-set comparison: employee values split on `;`, requirements on `,`.
pub struct SetOverlapScorer;

impl MatchScorer for SetOverlapScorer {
    fn evaluate(&self, employee: &Employee, project: &Project) -> MatchBreakdown {
        let mut attributes: Vec<AttributeMatch> = paired_fields(employee, project)
            .into_iter()
            .filter_map(|(attribute, have, want)| {
                let want = want?;
                // The leading entry decides whether the requirement exists at all.
                let first = want.split(',').next().map(normalize).unwrap_or_default();
                if first.is_empty() || first == "n/a" {
                    return None;
                }
                let required = tokens(want, ',');
                let offered = tokens(have, ';');
                let matched = required.iter().filter(|t| offered.contains(t)).count();
                Some(AttributeMatch {
                    attribute,
                    required: count_u32(required.len()),
                    matched: count_u32(matched),
                })
            })
            .collect();

        attributes.extend(certification_bonus(employee));
        MatchBreakdown::from_attributes(attributes, self.backend())
    }

    fn backend(&self) -> &'static str {
        "set"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn paired_fields<'a>(
    employee: &'a Employee,
    project: &'a Project,
) -> [(Attribute, &'a str, Option<&'a str>); 3] {
    [
        (
            Attribute::Language,
            employee.languages.as_str(),
            project.languages.as_deref(),
        ),
        (
            Attribute::Skill,
            employee.skills.as_str(),
            project.skills.as_deref(),
        ),
        (
            Attribute::Tool,
            employee.tools.as_str(),
            project.tools.as_deref(),
        ),
    ]
}

/// Always a match when present: certifications are not compared against the project.
fn certification_bonus(employee: &Employee) -> Option<AttributeMatch> {
    employee.has_certification().then_some(AttributeMatch {
        attribute: Attribute::Certification,
        required: 1,
        matched: 1,
    })
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn tokens(value: &str, delimiter: char) -> Vec<String> {
    value
        .split(delimiter)
        .map(normalize)
        .filter(|t| !t.is_empty())
        .collect()
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
