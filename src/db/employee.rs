use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::errors::AppError;
use crate::models::employee::{Employee, SearchParams};

const SELECT_EMPLOYEE: &str = "SELECT id, login, name, salary, start_date FROM employee";

/// A search statement with its salary bounds in bind order.
#[derive(Debug)]
pub struct SearchQuery {
    pub sql: String,
    pub salary_bounds: Vec<Decimal>,
}

/// Maps a caller-supplied sort key to a known column. `startDate` is the
/// logical alias for `start_date`; anything outside the allow-list is
/// rejected rather than interpolated into SQL.
fn sort_column(key: Option<&str>) -> Result<&'static str, AppError> {
    match key.unwrap_or("id") {
        "id" => Ok("id"),
        "login" => Ok("login"),
        "name" => Ok("name"),
        "salary" => Ok("salary"),
        "startDate" | "start_date" => Ok("start_date"),
        _ => Err(AppError::Validation("Invalid sorting column.".to_string())),
    }
}

/// Assembles the filtered/sorted/paginated SELECT. Salary bounds become
/// positional parameters; limit and offset are appended only when positive.
pub fn build_search_query(params: &SearchParams) -> Result<SearchQuery, AppError> {
    let mut sql = String::from(SELECT_EMPLOYEE);
    let mut salary_bounds = Vec::new();
    if let Some(min_salary) = params.min_salary {
        salary_bounds.push(min_salary);
        sql.push_str(&format!(" WHERE salary > ${}", salary_bounds.len()));
    }
    if let Some(max_salary) = params.max_salary {
        salary_bounds.push(max_salary);
        let keyword = if salary_bounds.len() == 1 { "WHERE" } else { "AND" };
        sql.push_str(&format!(" {} salary < ${}", keyword, salary_bounds.len()));
    }
    sql.push_str(&format!(
        " ORDER BY {}",
        sort_column(params.sorting.as_deref())?
    ));
    if params.desc.unwrap_or(false) {
        sql.push_str(" DESC");
    }
    if let Some(limit) = params.limit {
        if limit > 0 {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
    }
    if let Some(offset) = params.offset {
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }
    Ok(SearchQuery { sql, salary_bounds })
}

pub async fn search(pool: &PgPool, params: &SearchParams) -> Result<Vec<Employee>, AppError> {
    let query = build_search_query(params)?;
    let mut statement = sqlx::query_as::<_, Employee>(&query.sql);
    for bound in &query.salary_bounds {
        statement = statement.bind(*bound);
    }
    Ok(statement.fetch_all(pool).await?)
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Employee>, AppError> {
    let employee = sqlx::query_as::<_, Employee>(&format!("{} WHERE id = $1", SELECT_EMPLOYEE))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(employee)
}

/// Returns which of the candidates' ids are already present.
pub async fn find_existing_ids(
    pool: &PgPool,
    employees: &[Employee],
) -> Result<Vec<String>, AppError> {
    if employees.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = employees.iter().map(|employee| employee.id.clone()).collect();
    let found = sqlx::query_scalar::<_, String>("SELECT id FROM employee WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(found)
}

pub async fn id_exists(pool: &PgPool, id: &str) -> Result<bool, AppError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employee WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Login uniqueness check that ignores the row being written, so an
/// employee keeping their own login passes.
pub async fn login_taken_by_other(
    pool: &PgPool,
    id: &str,
    login: &str,
) -> Result<bool, AppError> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employee WHERE id <> $1 AND login = $2")
            .bind(id)
            .bind(login)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

pub async fn insert_all(
    conn: &mut PgConnection,
    employees: &[Employee],
) -> Result<(), AppError> {
    for employee in employees {
        sqlx::query(
            "INSERT INTO employee (id, login, name, salary, start_date) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&employee.id)
        .bind(&employee.login)
        .bind(&employee.name)
        .bind(employee.salary)
        .bind(employee.start_date)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn update_all(
    conn: &mut PgConnection,
    employees: &[Employee],
) -> Result<(), AppError> {
    for employee in employees {
        sqlx::query(
            "UPDATE employee SET login = $1, name = $2, salary = $3, start_date = $4 \
             WHERE id = $5",
        )
        .bind(&employee.login)
        .bind(&employee.name)
        .bind(employee.salary)
        .bind(employee.start_date)
        .bind(&employee.id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn delete_by_id(pool: &PgPool, id: &str) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM employee WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
