//! Typed mapping from parsed CSV records to directory rows.
//!
//! Column names follow the exports the directory is fed from. Extra
//! columns are ignored; missing ones read as absent.

use super::Record;
use crate::models::{derived_project_url, Assignment, Employee, Project, DEFAULT_STATUS};

/// Map employee records, in file order.
pub fn employees_from_records(records: &[Record]) -> Vec<Employee> {
    records.iter().map(employee_from_record).collect()
}

/// Map project records, deriving missing external URLs from `base_url`.
pub fn projects_from_records(records: &[Record], base_url: &str) -> Vec<Project> {
    records
        .iter()
        .map(|r| project_from_record(r, base_url))
        .collect()
}

/// Map project/employee link records.
pub fn assignments_from_records(records: &[Record]) -> Vec<Assignment> {
    records
        .iter()
        .map(|r| Assignment {
            project_id: parse_id(r.get("ProjectID")),
            employee_id: parse_id(r.get("EmployeeID")),
        })
        .collect()
}

fn employee_from_record(r: &Record) -> Employee {
    Employee {
        id: parse_id(r.get_any(&["id", "EmployeeID"])),
        first_name: r.text("first_name"),
        last_name: r.text("last_name"),
        email: r.text("email"),
        work_phone: r.text("work_phone"),
        title: r.text("title"),
        job_title: r.text("job_title"),
        office_or_studio: r.get_any(&["studio_office", "office"]).map(str::to_string),
        total_years_in_industry: parse_years(r.get("total_years_in_industry")),
        current_years_with_firm: parse_years(r.get("current_years_with_this_firm")),
        status: r.text("status").unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        image_url: r.text("img_url"),
    }
}

fn project_from_record(r: &Record, base_url: &str) -> Project {
    let id = parse_id(r.get("id"));
    Project {
        id,
        name: r.text("name"),
        practice_area: r.text("practice_area"),
        sub_practice_area: r.text("sub_practice_area"),
        region: r.text("region"),
        status: r.text("status"),
        service_type: r.text("service_type"),
        external_url: r
            .text("openasset_url")
            .unwrap_or_else(|| derived_project_url(base_url, id)),
    }
}

/// Leading integer of `value`: optional sign, then digits. `"12.0"` → 12,
/// `"7 yrs"` → 7, `"abc"` → None.
fn leading_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let n: i64 = digits[..end].parse().ok()?;
    Some(if negative { -n } else { n })
}

/// Id columns default to 0 when empty or unparseable.
fn parse_id(value: Option<&str>) -> i64 {
    value.and_then(leading_int).unwrap_or(0)
}

/// Year counts are non-negative; anything else is absent.
fn parse_years(value: Option<&str>) -> Option<u32> {
    value
        .and_then(leading_int)
        .and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_csv;

    const BASE: &str = "https://assets.example.com";

    #[test]
    fn test_employee_mapping() {
        let csv = "id,first_name,last_name,email,title,job_title,studio_office,office,work_phone,total_years_in_industry,current_years_with_this_firm,status,img_url\n\
                   12,Jo,Lee,jo@example.com,Associate,Architect,Boston Studio 01,Boston,555-0100,8,3,,https://img/jo.png";
        let parsed = parse_csv(csv).unwrap();
        let employees = employees_from_records(&parsed.records);

        let jo = &employees[0];
        assert_eq!(jo.id, 12);
        assert_eq!(jo.first_name.as_deref(), Some("Jo"));
        assert_eq!(jo.office_or_studio.as_deref(), Some("Boston Studio 01"));
        assert_eq!(jo.total_years_in_industry, Some(8));
        assert_eq!(jo.current_years_with_firm, Some(3));
        assert_eq!(jo.status, "Active");
        assert_eq!(jo.image_url.as_deref(), Some("https://img/jo.png"));
    }

    #[test]
    fn test_employee_id_falls_back_to_employee_id_column() {
        let record = Record::from_pairs(&[("id", ""), ("EmployeeID", "44")]);
        assert_eq!(employee_from_record(&record).id, 44);

        let record = Record::from_pairs(&[("id", "not-a-number")]);
        assert_eq!(employee_from_record(&record).id, 0);
    }

    #[test]
    fn test_office_fallback() {
        let record = Record::from_pairs(&[("id", "1"), ("studio_office", ""), ("office", "NYC")]);
        assert_eq!(employee_from_record(&record).office_or_studio.as_deref(), Some("NYC"));
    }

    #[test]
    fn test_years_absent_when_empty_or_non_numeric() {
        let record = Record::from_pairs(&[
            ("total_years_in_industry", "unknown"),
            ("current_years_with_this_firm", ""),
        ]);
        let emp = employee_from_record(&record);
        assert_eq!(emp.total_years_in_industry, None);
        assert_eq!(emp.current_years_with_firm, None);

        let record = Record::from_pairs(&[
            ("total_years_in_industry", "12.0"),
            ("current_years_with_this_firm", "-2"),
        ]);
        let emp = employee_from_record(&record);
        assert_eq!(emp.total_years_in_industry, Some(12));
        assert_eq!(emp.current_years_with_firm, None);
    }

    #[test]
    fn test_zero_years_is_present() {
        let record = Record::from_pairs(&[("current_years_with_this_firm", "0")]);
        assert_eq!(employee_from_record(&record).current_years_with_firm, Some(0));
    }

    #[test]
    fn test_project_url_from_column_or_derived() {
        let parsed = parse_csv(
            "id,name,practice_area,openasset_url\n10,Clinic,Healthcare,https://custom/10\n20,School,Education,",
        )
        .unwrap();
        let projects = projects_from_records(&parsed.records, BASE);

        assert_eq!(projects[0].external_url, "https://custom/10");
        assert_eq!(projects[1].external_url, "https://assets.example.com/page/project/20/");
        assert_eq!(projects[1].practice_area.as_deref(), Some("Education"));
    }

    #[test]
    fn test_assignment_ids_default_to_zero() {
        let parsed = parse_csv("ProjectID,EmployeeID\n10,1\nx,2").unwrap();
        let links = assignments_from_records(&parsed.records);

        assert_eq!(links[0], Assignment { project_id: 10, employee_id: 1 });
        assert_eq!(links[1], Assignment { project_id: 0, employee_id: 2 });
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int(" 42 "), Some(42));
        assert_eq!(leading_int("7 yrs"), Some(7));
        assert_eq!(leading_int("-3"), Some(-3));
        assert_eq!(leading_int("abc"), None);
        assert_eq!(leading_int(""), None);
    }
}
