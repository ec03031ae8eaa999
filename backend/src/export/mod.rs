//! Spreadsheet export of a filtered employee list.
//!
//! [`project_for_export`] flattens employees into [`ExportRow`]s with a fixed
//! column set; [`write_csv`] serializes them with a header row.

use chrono::Utc;
use serde::Serialize;

use crate::models::Employee;

/// Placeholder for missing text cells.
pub const NOT_AVAILABLE: &str = "N/A";

/// Column headers, in output order.
pub const EXPORT_COLUMNS: [&str; 10] = [
    "First Name",
    "Last Name",
    "Email",
    "Phone",
    "Title",
    "Job Title",
    "Office",
    "Years of Experience",
    "Years at PE",
    "Status",
];

/// One spreadsheet row. Field order matches [`EXPORT_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "First Name")]
    pub first_name: String,
    #[serde(rename = "Last Name")]
    pub last_name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Job Title")]
    pub job_title: String,
    #[serde(rename = "Office")]
    pub office: String,
    #[serde(rename = "Years of Experience")]
    pub years_of_experience: String,
    #[serde(rename = "Years at PE")]
    pub years_at_firm: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl From<&Employee> for ExportRow {
    fn from(emp: &Employee) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let number = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();

        Self {
            first_name: text(&emp.first_name),
            last_name: text(&emp.last_name),
            email: text(&emp.email),
            phone: text(&emp.work_phone),
            title: text(&emp.title),
            job_title: text(&emp.job_title),
            office: text(&emp.office_or_studio),
            years_of_experience: number(emp.total_years_in_industry),
            years_at_firm: number(emp.current_years_with_firm),
            status: emp.status.clone(),
        }
    }
}

/// One row per employee, same order.
pub fn project_for_export(employees: &[Employee]) -> Vec<ExportRow> {
    employees.iter().map(ExportRow::from).collect()
}

/// Serialize rows as CSV, header first. An empty list still yields the header.
pub fn write_csv(rows: &[ExportRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(EXPORT_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

/// `employee_directory_<UTC timestamp>.csv`
pub fn export_filename() -> String {
    format!(
        "employee_directory_{}.csv",
        Utc::now().format("%Y-%m-%dT%H-%M-%S")
    )
}
