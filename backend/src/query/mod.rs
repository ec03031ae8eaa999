//! Join & filter engine over a [`DirectorySnapshot`].
//!
//! Everything here is synchronous and pure: callers load the cache first,
//! take a snapshot, then query it. Results keep table order unless stated
//! otherwise.

pub mod filter;

use std::collections::{BTreeSet, HashMap};

use crate::cache::DirectorySnapshot;
use crate::models::{Employee, Project};
use filter::{matches_substring, CompiledFilter};

pub use filter::{EmployeeFilter, InvalidRangeToken, ProjectFilter, YearsRange};

/// Employee → assigned projects, built once per search.
///
/// Links to unknown project ids resolve to nothing.
struct ProjectIndex<'a> {
    by_id: HashMap<i64, Vec<&'a Project>>,
    by_employee: HashMap<i64, Vec<i64>>,
}

impl<'a> ProjectIndex<'a> {
    fn build(snapshot: &'a DirectorySnapshot) -> Self {
        let mut by_id: HashMap<i64, Vec<&Project>> = HashMap::new();
        for project in &snapshot.projects {
            by_id.entry(project.id).or_default().push(project);
        }

        let mut by_employee: HashMap<i64, Vec<i64>> = HashMap::new();
        for link in &snapshot.assignments {
            by_employee
                .entry(link.employee_id)
                .or_default()
                .push(link.project_id);
        }

        Self { by_id, by_employee }
    }

    fn projects_of(&self, employee_id: i64) -> Vec<&'a Project> {
        self.by_employee
            .get(&employee_id)
            .into_iter()
            .flatten()
            .filter_map(|pid| self.by_id.get(pid))
            .flatten()
            .copied()
            .collect()
    }
}

impl DirectorySnapshot {
    /// Employees matching every criterion of `filter`, in load order.
    ///
    /// The assignment join only runs when a project-derived criterion is set.
    pub fn search(&self, filter: &EmployeeFilter) -> Vec<Employee> {
        let compiled = CompiledFilter::new(filter);
        let index = compiled.needs_projects().then(|| ProjectIndex::build(self));

        self.employees
            .iter()
            .filter(|emp| compiled.matches_employee(emp))
            .filter(|emp| match &index {
                Some(index) => compiled.matches_projects(index.projects_of(emp.id).iter().copied()),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Projects the employee is assigned to, in projects-table order.
    ///
    /// Each project appears once even if linked twice; unknown ids are dropped.
    pub fn employee_projects(&self, employee_id: i64) -> Vec<Project> {
        let ids: Vec<i64> = self
            .assignments
            .iter()
            .filter(|link| link.employee_id == employee_id)
            .map(|link| link.project_id)
            .collect();

        self.projects
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect()
    }

    /// Distinct practice areas across projects, trimmed and sorted.
    pub fn distinct_practice_areas(&self) -> Vec<String> {
        distinct(self.projects.iter().map(|p| p.practice_area.as_deref()))
    }

    /// Distinct sub-practice areas across projects, trimmed and sorted.
    pub fn distinct_sub_practice_areas(&self) -> Vec<String> {
        distinct(self.projects.iter().map(|p| p.sub_practice_area.as_deref()))
    }

    /// Projects matching `filter`, sorted by name (case-insensitive).
    pub fn search_projects(&self, filter: &ProjectFilter) -> Vec<Project> {
        let term = |t: &Option<String>| -> Vec<String> {
            t.as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| vec![t.to_lowercase()])
                .unwrap_or_default()
        };
        let practice_area = term(&filter.practice_area);
        let sub_practice_area = term(&filter.sub_practice_area);
        let region = term(&filter.region);
        let status = term(&filter.status);

        let mut projects: Vec<Project> = self
            .projects
            .iter()
            .filter(|p| matches_substring(p.practice_area.as_deref(), &practice_area))
            .filter(|p| matches_substring(p.sub_practice_area.as_deref(), &sub_practice_area))
            .filter(|p| matches_substring(p.region.as_deref(), &region))
            .filter(|p| p.status.is_none() || matches_substring(p.status.as_deref(), &status))
            .cloned()
            .collect();

        sort_by_name(&mut projects);
        projects
    }
}

/// Stable sort by lowercased name; unnamed projects first.
pub fn sort_by_name(projects: &mut [Project]) {
    projects.sort_by_cached_key(|p| p.name.as_deref().unwrap_or("").to_lowercase());
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
