//! Filter criteria and the predicates behind them.
//!
//! Matching rules:
//!
//! | Criterion                           | Rule                                       |
//! |-------------------------------------|--------------------------------------------|
//! | name search                         | substring of first, last, or "first last"  |
//! | studio, title, job title, status    | exact                                      |
//! | years of experience / at firm       | range tokens (`"6-10"`, `"21+"`)           |
//! | practice area, sub-practice, region | substring of any assigned project's value  |
//!
//! All comparisons are case-insensitive. Categories are ANDed; values
//! within a category are ORed. Empty lists do not constrain.

use std::str::FromStr;

use crate::models::{Employee, Project};

/// Employee search criteria. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeFilter {
    pub name_search: Option<String>,
    pub studio: Vec<String>,
    /// Matches [`Employee::title`] (the role label).
    pub title: Vec<String>,
    pub job_title: Vec<String>,
    pub status: Vec<String>,
    /// Range tokens against `total_years_in_industry`.
    pub years_experience: Vec<String>,
    /// Range tokens against `current_years_with_firm`.
    pub years_at_firm: Vec<String>,
    pub practice_area: Vec<String>,
    pub sub_practice_area: Vec<String>,
    pub region: Vec<String>,
}

/// Project listing criteria: one optional substring per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFilter {
    pub practice_area: Option<String>,
    pub sub_practice_area: Option<String>,
    pub region: Option<String>,
    /// Projects without a status are not excluded by this.
    pub status: Option<String>,
}

// =============================================================================
// Range tokens
// =============================================================================

/// A parsed range token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearsRange {
    /// `"min-max"`, both bounds inclusive.
    Between { min: i64, max: i64 },
    /// `"min+"`.
    AtLeast(i64),
}

/// A range token that is neither `"a-b"` nor `"a+"` with integer bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRangeToken(pub String);

impl FromStr for YearsRange {
    type Err = InvalidRangeToken;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        let invalid = || InvalidRangeToken(token.to_string());

        if let Some((min, max)) = token.split_once('-') {
            let min = min.trim().parse().map_err(|_| invalid())?;
            let max = max.trim().parse().map_err(|_| invalid())?;
            Ok(Self::Between { min, max })
        } else if let Some(min) = token.strip_suffix('+') {
            Ok(Self::AtLeast(min.trim().parse().map_err(|_| invalid())?))
        } else {
            Err(invalid())
        }
    }
}

impl YearsRange {
    pub fn contains(&self, value: u32) -> bool {
        let value = i64::from(value);
        match *self {
            Self::Between { min, max } => min <= value && value <= max,
            Self::AtLeast(min) => value >= min,
        }
    }
}

// =============================================================================
// Compiled filter
// =============================================================================

/// A range criterion. `active` stays true even when every token was
/// malformed, in which case no present value matches.
#[derive(Debug, Clone, Default)]
struct RangeCriterion {
    active: bool,
    ranges: Vec<YearsRange>,
}

impl RangeCriterion {
    fn compile(tokens: &[String]) -> Self {
        Self {
            active: !tokens.is_empty(),
            ranges: tokens.iter().filter_map(|t| t.parse().ok()).collect(),
        }
    }

    /// Employees without a value are not constrained.
    fn matches(&self, value: Option<u32>) -> bool {
        match value {
            Some(v) if self.active => self.ranges.iter().any(|r| r.contains(v)),
            _ => true,
        }
    }
}

/// [`EmployeeFilter`] with values lowercased and ranges parsed once.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledFilter {
    name: Option<String>,
    studio: Vec<String>,
    title: Vec<String>,
    job_title: Vec<String>,
    status: Vec<String>,
    years_experience: RangeCriterion,
    years_at_firm: RangeCriterion,
    practice_area: Vec<String>,
    sub_practice_area: Vec<String>,
    region: Vec<String>,
}

fn lowered(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

impl CompiledFilter {
    pub(crate) fn new(filter: &EmployeeFilter) -> Self {
        Self {
            name: filter
                .name_search
                .as_deref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            studio: lowered(&filter.studio),
            title: lowered(&filter.title),
            job_title: lowered(&filter.job_title),
            status: lowered(&filter.status),
            years_experience: RangeCriterion::compile(&filter.years_experience),
            years_at_firm: RangeCriterion::compile(&filter.years_at_firm),
            practice_area: lowered(&filter.practice_area),
            sub_practice_area: lowered(&filter.sub_practice_area),
            region: lowered(&filter.region),
        }
    }

    pub(crate) fn needs_projects(&self) -> bool {
        !self.practice_area.is_empty() || !self.sub_practice_area.is_empty() || !self.region.is_empty()
    }

    /// Everything that can be decided from the employee row alone.
    pub(crate) fn matches_employee(&self, emp: &Employee) -> bool {
        self.matches_name(emp)
            && matches_exact(emp.office_or_studio.as_deref(), &self.studio)
            && matches_exact(emp.title.as_deref(), &self.title)
            && matches_exact(emp.job_title.as_deref(), &self.job_title)
            && matches_exact(Some(emp.status.as_str()), &self.status)
            && self.years_experience.matches(emp.total_years_in_industry)
            && self.years_at_firm.matches(emp.current_years_with_firm)
    }

    /// Project-derived criteria, given the employee's resolved projects.
    pub(crate) fn matches_projects<'a, I>(&self, projects: I) -> bool
    where
        I: IntoIterator<Item = &'a Project> + Clone,
    {
        any_project(projects.clone(), |p| p.practice_area.as_deref(), &self.practice_area)
            && any_project(projects.clone(), |p| p.sub_practice_area.as_deref(), &self.sub_practice_area)
            && any_project(projects, |p| p.region.as_deref(), &self.region)
    }

    fn matches_name(&self, emp: &Employee) -> bool {
        let Some(term) = &self.name else {
            return true;
        };
        let first = emp.first_name.as_deref().unwrap_or("").to_lowercase();
        let last = emp.last_name.as_deref().unwrap_or("").to_lowercase();
        first.contains(term.as_str())
            || last.contains(term.as_str())
            || emp.full_name().to_lowercase().contains(term.as_str())
    }
}

fn any_project<'a, I>(projects: I, field: fn(&Project) -> Option<&str>, wanted: &[String]) -> bool
where
    I: IntoIterator<Item = &'a Project>,
{
    wanted.is_empty() || projects.into_iter().any(|p| matches_substring(field(p), wanted))
}

/// Case-insensitive equality against any of `wanted` (already lowercased).
fn matches_exact(value: Option<&str>, wanted: &[String]) -> bool {
    if wanted.is_empty() {
        return true;
    }
    match value {
        Some(v) => {
            let v = v.to_lowercase();
            wanted.iter().any(|w| *w == v)
        }
        None => false,
    }
}

/// Case-insensitive containment of any of `wanted` (already lowercased).
pub(crate) fn matches_substring(value: Option<&str>, wanted: &[String]) -> bool {
    if wanted.is_empty() {
        return true;
    }
    match value {
        Some(v) => {
            let v = v.to_lowercase();
            wanted.iter().any(|w| v.contains(w.as_str()))
        }
        None => false,
    }
}
