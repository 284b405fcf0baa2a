use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

const DATE_FORMAT_YMD: &str = "%Y-%m-%d";
const DATE_FORMAT_DMY: &str = "%d-%b-%y";

/// Employee row as persisted. `start_date` accepts `yyyy-MM-dd` or
/// `dd-MMM-yy` on the way in and always renders as `yyyy-MM-dd`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Employee {
    pub id: String,
    pub login: String,
    pub name: String,
    pub salary: Decimal,
    pub start_date: NaiveDate,
}

/// JSON shape at the API edge: camelCase, salary as a number,
/// date as `yyyy-MM-dd`.
#[derive(Serialize)]
pub struct EmployeeResponse {
    pub id: String,
    pub login: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub salary: Decimal,
    #[serde(rename = "startDate")]
    pub start_date: String,
}

impl From<&Employee> for EmployeeResponse {
    fn from(employee: &Employee) -> Self {
        EmployeeResponse {
            id: employee.id.clone(),
            login: employee.login.clone(),
            name: employee.name.clone(),
            salary: employee.salary,
            start_date: employee.start_date.format(DATE_FORMAT_YMD).to_string(),
        }
    }
}

/// Incoming JSON body for create/update. Every field is optional so the
/// converter can report which one is missing; salary tolerates a number
/// or a numeric string.
#[derive(Debug, Deserialize)]
pub struct EmployeePayload {
    pub id: Option<String>,
    pub login: Option<String>,
    pub name: Option<String>,
    pub salary: Option<SalaryField>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SalaryField {
    Number(serde_json::Number),
    Text(String),
}

/// Optional query parameters for `GET /users`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "minSalary")]
    pub min_salary: Option<Decimal>,
    #[serde(rename = "maxSalary")]
    pub max_salary: Option<Decimal>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub sorting: Option<String>,
    pub desc: Option<bool>,
}

impl Employee {
    /// Field extraction plus validation for one non-comment CSV row.
    pub fn from_csv_record(record: &csv::StringRecord) -> Result<Employee, AppError> {
        if record.len() != 5 {
            return Err(AppError::Validation(
                "Invalid CSV format to upload as employee.".to_string(),
            ));
        }
        let draft = EmployeeDraft {
            id: clean_text(record.get(0)),
            login: clean_text(record.get(1)),
            name: clean_text(record.get(2)),
            salary: parse_salary(record.get(3).unwrap_or_default()),
            start_date: record.get(4).and_then(parse_start_date),
        };
        draft.validate()
    }

    /// Field extraction plus validation for a JSON payload.
    pub fn from_payload(payload: EmployeePayload) -> Result<Employee, AppError> {
        let salary = match &payload.salary {
            Some(SalaryField::Number(number)) => parse_salary(&number.to_string()),
            Some(SalaryField::Text(text)) => parse_salary(text),
            None => Decimal::ZERO,
        };
        let draft = EmployeeDraft {
            id: clean_text(payload.id.as_deref()),
            login: clean_text(payload.login.as_deref()),
            name: clean_text(payload.name.as_deref()),
            salary,
            start_date: payload.start_date.as_deref().and_then(parse_start_date),
        };
        draft.validate()
    }
}

/// Extracted fields before validation; `None` marks a missing value.
struct EmployeeDraft {
    id: Option<String>,
    login: Option<String>,
    name: Option<String>,
    salary: Decimal,
    start_date: Option<NaiveDate>,
}

impl EmployeeDraft {
    /// Checks run in order; the first violation wins.
    fn validate(self) -> Result<Employee, AppError> {
        let id = self
            .id
            .ok_or_else(|| AppError::Validation("Employee id should not be empty.".to_string()))?;
        let login = self.login.ok_or_else(|| {
            AppError::Validation("Employee login should not be empty.".to_string())
        })?;
        let name = self
            .name
            .ok_or_else(|| AppError::Validation("Employee name should not be empty.".to_string()))?;
        if self.salary <= Decimal::ZERO {
            return Err(AppError::Validation("Invalid salary".to_string()));
        }
        let start_date = self
            .start_date
            .ok_or_else(|| AppError::Validation("Invalid date".to_string()))?;
        Ok(Employee {
            id,
            login,
            name,
            salary: self.salary,
            start_date,
        })
    }
}

/// Rows whose first field starts with `#` are comments.
pub fn is_comment_row(record: &csv::StringRecord) -> bool {
    record
        .get(0)
        .map(|field| field.trim().starts_with('#'))
        .unwrap_or(false)
}

fn clean_text(text: Option<&str>) -> Option<String> {
    let trimmed = text?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Unparseable salary text collapses to zero, which the validator then
/// rejects as non-positive.
fn parse_salary(text: &str) -> Decimal {
    match text.trim().parse::<Decimal>() {
        Ok(value) => value,
        Err(err) => {
            debug!("salary conversion error: {}", err);
            Decimal::ZERO
        }
    }
}

/// 10 characters means `yyyy-MM-dd`, 9 means `dd-MMM-yy`; anything else
/// is not a date.
fn parse_start_date(text: &str) -> Option<NaiveDate> {
    let format = match text.len() {
        10 => DATE_FORMAT_YMD,
        9 => DATE_FORMAT_DMY,
        _ => return None,
    };
    match NaiveDate::parse_from_str(text, format) {
        Ok(date) => Some(date),
        Err(err) => {
            debug!("date conversion error for {:?}: {}", text, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> csv::StringRecord {
        csv::StringRecord::from(fields.to_vec())
    }

    fn payload(json: serde_json::Value) -> EmployeePayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn csv_row_parses_to_employee() {
        let employee = Employee::from_csv_record(&record(&[
            "R001",
            "abcdef",
            "Ramesh Selvaraj",
            "18500",
            "2022-05-20",
        ]))
        .unwrap();
        assert_eq!(employee.id, "R001");
        assert_eq!(employee.login, "abcdef");
        assert_eq!(employee.name, "Ramesh Selvaraj");
        assert_eq!(employee.salary, Decimal::new(18500, 0));
        assert_eq!(
            employee.start_date,
            NaiveDate::from_ymd_opt(2022, 5, 20).unwrap()
        );
    }

    #[test]
    fn csv_fields_are_trimmed() {
        let employee = Employee::from_csv_record(&record(&[
            "  R002  ",
            " rs22 ",
            " Ramesh ",
            " 100.50 ",
            "20-May-22",
        ]))
        .unwrap();
        assert_eq!(employee.id, "R002");
        assert_eq!(employee.login, "rs22");
        assert_eq!(employee.salary, Decimal::new(10050, 2));
    }

    #[test]
    fn csv_row_with_wrong_field_count_is_rejected() {
        let err = Employee::from_csv_record(&record(&["R001", "abcdef", "Ramesh", "18500"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid CSV format to upload as employee.");
    }

    #[test]
    fn comment_rows_are_detected() {
        assert!(is_comment_row(&record(&[
            "#R001", "x", "y", "1", "2022-05-20"
        ])));
        assert!(is_comment_row(&record(&[
            "  # note", "x", "y", "1", "2022-05-20"
        ])));
        assert!(!is_comment_row(&record(&[
            "R001", "x", "y", "1", "2022-05-20"
        ])));
    }

    #[test]
    fn both_date_formats_parse_to_the_same_day() {
        let ymd = parse_start_date("2022-05-20").unwrap();
        let dmy = parse_start_date("20-May-22").unwrap();
        assert_eq!(ymd, dmy);
        assert_eq!(ymd.format(DATE_FORMAT_YMD).to_string(), "2022-05-20");
        assert_eq!(ymd.format(DATE_FORMAT_DMY).to_string(), "20-May-22");
    }

    #[test]
    fn odd_length_or_garbage_dates_are_missing() {
        assert_eq!(parse_start_date("2022-5-20"), None);
        assert_eq!(parse_start_date("not-a-date-at-all"), None);
        assert_eq!(parse_start_date("2022-13-40"), None);
        assert_eq!(parse_start_date("99-Zzz-99"), None);
        assert_eq!(parse_start_date(""), None);
    }

    #[test]
    fn missing_date_fails_validation() {
        let err = Employee::from_csv_record(&record(&[
            "R001", "abcdef", "Ramesh", "18500", "someday",
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid date");
    }

    #[test]
    fn unparseable_salary_becomes_zero_and_fails() {
        let err = Employee::from_csv_record(&record(&[
            "R001",
            "abcdef",
            "Ramesh",
            "lots of money",
            "2022-05-20",
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid salary");
    }

    #[test]
    fn zero_and_negative_salary_fail_but_one_cent_passes() {
        let base = |salary: &str| {
            Employee::from_csv_record(&record(&["R001", "abcdef", "Ramesh", salary, "2022-05-20"]))
        };
        assert_eq!(base("0").unwrap_err().to_string(), "Invalid salary");
        assert_eq!(base("-10").unwrap_err().to_string(), "Invalid salary");
        assert_eq!(base("0.01").unwrap().salary, Decimal::new(1, 2));
    }

    #[test]
    fn empty_fields_fail_in_declaration_order() {
        let blank_id = Employee::from_csv_record(&record(&["", "l", "n", "1", "2022-05-20"]));
        assert_eq!(
            blank_id.unwrap_err().to_string(),
            "Employee id should not be empty."
        );
        let blank_login = Employee::from_csv_record(&record(&["i", " ", "n", "1", "2022-05-20"]));
        assert_eq!(
            blank_login.unwrap_err().to_string(),
            "Employee login should not be empty."
        );
        let blank_name = Employee::from_csv_record(&record(&["i", "l", "", "1", "2022-05-20"]));
        assert_eq!(
            blank_name.unwrap_err().to_string(),
            "Employee name should not be empty."
        );
    }

    #[test]
    fn json_payload_with_numeric_salary_parses() {
        let employee = Employee::from_payload(payload(serde_json::json!({
            "id": "R001",
            "login": "abcdef",
            "name": "Ramesh Selvaraj",
            "salary": 18500,
            "startDate": "2022-05-20"
        })))
        .unwrap();
        assert_eq!(employee.salary, Decimal::new(18500, 0));
    }

    #[test]
    fn json_payload_with_string_salary_parses() {
        let employee = Employee::from_payload(payload(serde_json::json!({
            "id": "R001",
            "login": "abcdef",
            "name": "Ramesh Selvaraj",
            "salary": "18500.75",
            "startDate": "20-May-22"
        })))
        .unwrap();
        assert_eq!(employee.salary, Decimal::new(1850075, 2));
    }

    #[test]
    fn json_payload_missing_salary_fails_validation() {
        let err = Employee::from_payload(payload(serde_json::json!({
            "id": "R001",
            "login": "abcdef",
            "name": "Ramesh Selvaraj",
            "startDate": "2022-05-20"
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid salary");
    }

    #[test]
    fn json_payload_missing_id_fails_validation() {
        let err = Employee::from_payload(payload(serde_json::json!({
            "login": "abcdef",
            "name": "Ramesh Selvaraj",
            "salary": 100,
            "startDate": "2022-05-20"
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "Employee id should not be empty.");
    }

    #[test]
    fn response_renders_camel_case_and_ymd_date() {
        let employee = Employee {
            id: "R001".to_string(),
            login: "abcdef".to_string(),
            name: "Ramesh Selvaraj".to_string(),
            salary: Decimal::new(18500, 0),
            start_date: NaiveDate::from_ymd_opt(2022, 5, 20).unwrap(),
        };
        let value = serde_json::to_value(EmployeeResponse::from(&employee)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": "R001",
                "login": "abcdef",
                "name": "Ramesh Selvaraj",
                "salary": 18500.0,
                "startDate": "2022-05-20"
            })
        );
    }
}
