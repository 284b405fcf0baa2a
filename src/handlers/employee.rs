use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use log::info;
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashSet;

use crate::db;
use crate::errors::AppError;
use crate::models::employee::{
    is_comment_row, Employee, EmployeePayload, EmployeeResponse, SearchParams,
};

/// `GET /users` with optional salary range, sort and pagination parameters.
pub async fn search(
    pool: web::Data<PgPool>,
    query: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    let employees = db::employee::search(&pool, &query).await?;
    let results: Vec<EmployeeResponse> = employees.iter().map(EmployeeResponse::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "results": results })))
}

/// `GET /users/{id}`
pub async fn find_by_id(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let employee = db::employee::find_by_id(&pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("employee not found.".to_string()))?;
    Ok(HttpResponse::Ok().json(EmployeeResponse::from(&employee)))
}

/// `POST /users/upload` reconciles a CSV batch against storage. The
/// whole batch is rejected on any in-batch id/login collision; otherwise
/// existing ids are updated and new ids inserted, both inside one
/// transaction.
pub async fn upload(
    pool: web::Data<PgPool>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let file = read_file_field(&mut payload).await?;
    let employees = parse_csv(&file)?;
    if employees.is_empty() {
        return Ok(HttpResponse::Ok().json(json!({ "message": "No records to upload." })));
    }
    if let Some(name) = find_duplicate(&employees) {
        return Err(AppError::Conflict(format!(
            "Duplicate employee not accepted : {}",
            name
        )));
    }
    let existing = db::employee::find_existing_ids(&pool, &employees).await?;
    let (inserts, updates) = partition_by_existing(employees, &existing);

    let mut tx = pool.begin().await?;
    if !updates.is_empty() {
        db::employee::update_all(&mut tx, &updates).await?;
    }
    if !inserts.is_empty() {
        db::employee::insert_all(&mut tx, &inserts).await?;
    }
    tx.commit().await?;

    Ok(HttpResponse::Created().json(json!({
        "message": upload_summary(inserts.len(), updates.len())
    })))
}

/// `POST /users`
pub async fn create(
    pool: web::Data<PgPool>,
    payload: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    let employee = Employee::from_payload(payload.into_inner())?;
    if db::employee::id_exists(&pool, &employee.id).await? {
        return Err(AppError::Conflict("Employee ID already exists".to_string()));
    }
    if db::employee::login_taken_by_other(&pool, &employee.id, &employee.login).await? {
        return Err(AppError::Conflict("Employee login not unique".to_string()));
    }
    let mut conn = pool.acquire().await?;
    db::employee::insert_all(&mut conn, std::slice::from_ref(&employee)).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully created" })))
}

/// `PUT /users/{id}` and `PATCH /users/{id}` both replace all mutable
/// fields; the path id overrides whatever the body carries.
pub async fn update(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    payload: web::Json<EmployeePayload>,
) -> Result<HttpResponse, AppError> {
    let mut payload = payload.into_inner();
    payload.id = Some(path.into_inner());
    let employee = Employee::from_payload(payload)?;
    if db::employee::find_by_id(&pool, &employee.id).await?.is_none() {
        return Err(AppError::NotFound("Bad input - no such employee".to_string()));
    }
    if db::employee::login_taken_by_other(&pool, &employee.id, &employee.login).await? {
        return Err(AppError::Conflict("Employee login not unique".to_string()));
    }
    let mut conn = pool.acquire().await?;
    db::employee::update_all(&mut conn, std::slice::from_ref(&employee)).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully updated" })))
}

/// `DELETE /users/{id}`
pub async fn delete(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let affected = db::employee::delete_by_id(&pool, &id).await?;
    if affected == 0 {
        return Err(AppError::NotFound(
            "Bad input - no such employee.".to_string(),
        ));
    }
    info!("Employee has deleted : {}", id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deleted" })))
}

/// Drains the multipart stream and returns the bytes of the `file` field.
async fn read_file_field(payload: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|err| AppError::Io(err.to_string()))?
    {
        if field.name() != "file" {
            continue;
        }
        let mut data = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|err| AppError::Io(err.to_string()))?
        {
            data.extend_from_slice(&chunk);
        }
        return Ok(data);
    }
    Err(AppError::Validation(
        "Missing file field in upload.".to_string(),
    ))
}

/// CSV header `id,login,name,salary,start_date` is skipped; `#`-prefixed
/// rows are comments. Field-count and record validation happen per row.
fn parse_csv(data: &[u8]) -> Result<Vec<Employee>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);
    let mut employees = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| AppError::Io(err.to_string()))?;
        if is_comment_row(&record) {
            continue;
        }
        employees.push(Employee::from_csv_record(&record)?);
    }
    Ok(employees)
}

/// First id or login seen twice within the batch; returns that
/// employee's name.
fn find_duplicate(employees: &[Employee]) -> Option<String> {
    let mut ids = HashSet::new();
    let mut logins = HashSet::new();
    for employee in employees {
        if !ids.insert(employee.id.as_str()) || !logins.insert(employee.login.as_str()) {
            return Some(employee.name.clone());
        }
    }
    None
}

/// Splits candidates into (inserts, updates) by id presence in storage,
/// preserving input order on both sides.
fn partition_by_existing(
    employees: Vec<Employee>,
    existing: &[String],
) -> (Vec<Employee>, Vec<Employee>) {
    let existing: HashSet<&str> = existing.iter().map(String::as_str).collect();
    employees
        .into_iter()
        .partition(|employee| !existing.contains(employee.id.as_str()))
}

fn upload_summary(inserted: usize, updated: usize) -> String {
    if updated == 0 {
        format!("{}, employee(s) are added.", inserted)
    } else if inserted == 0 {
        format!("{}, employee(s) are updated.", updated)
    } else {
        format!(
            "{}, employee(s) are updated, and {} employee(s) are added.",
            updated, inserted
        )
    }
}
