//! Wire types for the directory API.
//!
//! Query parameters arrive as comma-separated lists; responses use the
//! snake_case field names the directory UI consumes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ServerError;
use crate::models::{Employee, Project};
use crate::query::{EmployeeFilter, ProjectFilter};

/// Image shown for employees without a photo.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-user.jpg";

const NOT_AVAILABLE: &str = "N/A";
const UNKNOWN_PROJECT: &str = "Unknown Project";

// =============================================================================
// Query parameters
// =============================================================================

/// Query string of `/api/employees` and `/api/export/employees`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub name_search: Option<String>,
    pub studio: Option<String>,
    pub role: Option<String>,
    pub job_title: Option<String>,
    pub status: Option<String>,
    pub years_experience: Option<String>,
    pub years_at_pe: Option<String>,
    pub practice_area: Option<String>,
    pub sub_practice_area: Option<String>,
    pub region: Option<String>,
}

/// `"a, b,,c"` → `["a", "b", "c"]`
pub fn parse_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

impl From<SearchParams> for EmployeeFilter {
    fn from(params: SearchParams) -> Self {
        Self {
            name_search: params.name_search,
            studio: parse_list(params.studio.as_deref()),
            title: parse_list(params.role.as_deref()),
            job_title: parse_list(params.job_title.as_deref()),
            status: parse_list(params.status.as_deref()),
            years_experience: parse_list(params.years_experience.as_deref()),
            years_at_firm: parse_list(params.years_at_pe.as_deref()),
            practice_area: parse_list(params.practice_area.as_deref()),
            sub_practice_area: parse_list(params.sub_practice_area.as_deref()),
            region: parse_list(params.region.as_deref()),
        }
    }
}

/// Query string of `/api/projects`. Each criterion is a single term.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectParams {
    pub practice_area: Option<String>,
    pub sub_practice_area: Option<String>,
    pub region: Option<String>,
    pub status: Option<String>,
}

impl From<ProjectParams> for ProjectFilter {
    fn from(params: ProjectParams) -> Self {
        Self {
            practice_area: params.practice_area,
            sub_practice_area: params.sub_practice_area,
            region: params.region,
            status: params.status,
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// An employee as returned by `/api/employees`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub title: String,
    pub job_title: String,
    pub office: String,
    pub img_url: String,
    pub total_years_in_industry: Option<u32>,
    pub current_years_with_this_firm: Option<u32>,
    pub status: String,
}

impl From<&Employee> for EmployeeView {
    fn from(emp: &Employee) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Self {
            id: emp.id,
            first_name: text(&emp.first_name),
            last_name: text(&emp.last_name),
            email: text(&emp.email),
            phone: text(&emp.work_phone),
            title: text(&emp.title),
            job_title: text(&emp.job_title),
            office: text(&emp.office_or_studio),
            img_url: emp
                .image_url
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            total_years_in_industry: emp.total_years_in_industry,
            current_years_with_this_firm: emp.current_years_with_firm,
            status: emp.status.clone(),
        }
    }
}

/// A project as returned by the project endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: i64,
    pub name: String,
    pub practice_area: String,
    pub sub_practice_area: String,
    pub region: String,
    pub service_type: String,
    pub status: String,
    pub openasset_url: String,
}

impl From<&Project> for ProjectView {
    fn from(p: &Project) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();

        Self {
            id: p.id,
            name: p.name.clone().unwrap_or_else(|| UNKNOWN_PROJECT.to_string()),
            practice_area: text(&p.practice_area),
            sub_practice_area: text(&p.sub_practice_area),
            region: text(&p.region),
            service_type: text(&p.service_type),
            status: text(&p.status),
            openasset_url: p.external_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeesResponse {
    pub employees: Vec<EmployeeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeProjectsResponse {
    pub employee_id: i64,
    pub projects: Vec<ProjectView>,
    pub total_projects: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectsResponse {
    pub projects: Vec<ProjectView>,
    pub total_found: usize,
    pub total_in_system: usize,
}

// =============================================================================
// Errors
// =============================================================================

/// `{ "error": message }`
pub fn error_response(error: &str) -> Value {
    json!({ "error": error })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Load(e) if e.requires_auth() => StatusCode::UNAUTHORIZED,
            Self::Load(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = error_response(&self.to_string());
        if status == StatusCode::UNAUTHORIZED {
            body["requiresAuth"] = Value::Bool(true);
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoadError, SourceError};
    use crate::models::SourceKind;

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(Some(" NYC , ,Boston,")), vec!["NYC", "Boston"]);
        assert!(parse_list(Some("")).is_empty());
        assert!(parse_list(None).is_empty());
    }

    #[test]
    fn test_params_to_filter() {
        let params = SearchParams {
            role: Some("Principal,Associate".into()),
            years_at_pe: Some("0-5".into()),
            name_search: Some("jo".into()),
            ..Default::default()
        };
        let filter = EmployeeFilter::from(params);

        assert_eq!(filter.title, vec!["Principal", "Associate"]);
        assert_eq!(filter.years_at_firm, vec!["0-5"]);
        assert_eq!(filter.name_search.as_deref(), Some("jo"));
        assert!(filter.studio.is_empty());
    }

    #[test]
    fn test_employee_view_defaults() {
        let mut emp = Employee::new(3);
        emp.first_name = Some("Ana".into());
        let view = EmployeeView::from(&emp);

        assert_eq!(view.first_name, "Ana");
        assert_eq!(view.last_name, "N/A");
        assert_eq!(view.phone, "N/A");
        assert_eq!(view.img_url, PLACEHOLDER_IMAGE);
        assert_eq!(view.status, "Active");
        assert_eq!(view.total_years_in_industry, None);
    }

    #[test]
    fn test_project_view() {
        let mut p = Project::new(12, "https://assets.example.com/");
        p.region = Some("East".into());
        let view = ProjectView::from(&p);

        assert_eq!(view.name, "Unknown Project");
        assert_eq!(view.region, "East");
        assert_eq!(view.practice_area, "");
        assert_eq!(view.openasset_url, "https://assets.example.com/page/project/12/");
    }

    #[test]
    fn test_error_status_mapping() {
        let auth: LoadError = SourceError::auth_required(SourceKind::Employees, "login").into();
        assert_eq!(ServerError::from(auth).status_code(), StatusCode::UNAUTHORIZED);

        let down: LoadError = SourceError::unavailable(SourceKind::Projects, "HTTP 502").into();
        assert_eq!(
            ServerError::from(down).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        assert_eq!(
            ServerError::BadRequest("bad id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::NotFound("empty".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_auth_error_body() {
        let auth: LoadError = SourceError::auth_required(SourceKind::Employees, "login").into();
        let response = ServerError::from(auth).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
