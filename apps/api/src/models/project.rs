use serde::{Deserialize, Serialize};

/// One row of the project table in canonical form.
///
/// Requirement fields are `None` when the source cell was blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub headcount: u32,
    /// Informational only; never split across the selected employees.
    #[serde(default)]
    pub hours_required: Option<u32>,
    #[serde(default)]
    pub languages: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub tools: Option<String>,
}

impl Project {
    pub fn has_requirements(&self) -> bool {
        [&self.languages, &self.skills, &self.tools]
            .into_iter()
            .flatten()
            .any(|v| !v.trim().is_empty())
    }
}
