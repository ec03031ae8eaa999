//! Domain models for the employee directory.
//!
//! - [`Employee`] - One row of the employees table
//! - [`Project`] - One row of the projects table
//! - [`Assignment`] - Project/employee link (many-to-many)
//! - [`SourceKind`] - Which of the three tables a CSV source feeds
//!
//! Rows are built from parsed CSV records in [`crate::parser::tables`];
//! nothing downstream sees untyped records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status given to employees whose `status` column is empty.
pub const DEFAULT_STATUS: &str = "Active";

// =============================================================================
// Source Kind
// =============================================================================

/// The three CSV tables the directory is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Employees,
    Projects,
    Assignments,
}

impl SourceKind {
    /// Load order.
    pub const ALL: [SourceKind; 3] = [Self::Employees, Self::Projects, Self::Assignments];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employees => "employees",
            Self::Projects => "projects",
            Self::Assignments => "assignments",
        }
    }

    /// File name inside the local data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Employees => "employees.csv",
            Self::Projects => "projects.csv",
            Self::Assignments => "project_employees.csv",
        }
    }

    /// Index into per-kind arrays, following [`SourceKind::ALL`].
    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Employees => 0,
            Self::Projects => 1,
            Self::Assignments => 2,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Employee
// =============================================================================

/// A person in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// From `id`, falling back to `EmployeeID`; 0 when neither parses.
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub work_phone: Option<String>,
    /// Role / seniority label (e.g. "Principal").
    pub title: Option<String>,
    /// Functional role (e.g. "Architect").
    pub job_title: Option<String>,
    /// `studio_office`, falling back to `office`.
    pub office_or_studio: Option<String>,
    pub total_years_in_industry: Option<u32>,
    pub current_years_with_firm: Option<u32>,
    pub status: String,
    pub image_url: Option<String>,
}

impl Employee {
    /// An employee with only an id set, status defaulted.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            email: None,
            work_phone: None,
            title: None,
            job_title: None,
            office_or_studio: None,
            total_years_in_industry: None,
            current_years_with_firm: None,
            status: DEFAULT_STATUS.to_string(),
            image_url: None,
        }
    }

    /// `"first last"`, with missing parts left empty.
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
    }
}

// =============================================================================
// Project
// =============================================================================

/// A project employees can be assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: Option<String>,
    pub practice_area: Option<String>,
    pub sub_practice_area: Option<String>,
    pub region: Option<String>,
    pub status: Option<String>,
    pub service_type: Option<String>,
    /// `openasset_url` when present, otherwise `{base}/page/project/{id}/`.
    pub external_url: String,
}

impl Project {
    /// A project with only an id set and its derived external URL.
    pub fn new(id: i64, base_url: &str) -> Self {
        Self {
            id,
            name: None,
            practice_area: None,
            sub_practice_area: None,
            region: None,
            status: None,
            service_type: None,
            external_url: derived_project_url(base_url, id),
        }
    }
}

/// Deterministic project page URL used when the CSV has no `openasset_url`.
pub fn derived_project_url(base_url: &str, id: i64) -> String {
    format!("{}/page/project/{}/", base_url.trim_end_matches('/'), id)
}

// =============================================================================
// Assignment
// =============================================================================

/// Links one employee to one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub project_id: i64,
    pub employee_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_with_missing_parts() {
        let mut emp = Employee::new(1);
        emp.first_name = Some("Jo".into());
        assert_eq!(emp.full_name(), "Jo ");

        emp.last_name = Some("Lee".into());
        assert_eq!(emp.full_name(), "Jo Lee");
    }

    #[test]
    fn test_derived_project_url() {
        assert_eq!(
            derived_project_url("https://assets.example.com/", 42),
            "https://assets.example.com/page/project/42/"
        );
        assert_eq!(
            Project::new(7, "https://assets.example.com").external_url,
            "https://assets.example.com/page/project/7/"
        );
    }

    #[test]
    fn test_source_kind_files() {
        assert_eq!(SourceKind::Assignments.file_name(), "project_employees.csv");
        for (i, kind) in SourceKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
