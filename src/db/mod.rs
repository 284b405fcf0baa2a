use log::info;
use sqlx::PgPool;
use std::env;

pub mod employee;

pub async fn create_pool() -> PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to the database")
}

/// Bootstraps the employee table on startup.
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    info!("Creating sql table employee if not existed, id, login, name, salary, start_date");
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS employee(id varchar(32) PRIMARY KEY, \
         login VARCHAR(32) UNIQUE, name VARCHAR(128), salary decimal, start_date date)",
    )
    .execute(pool)
    .await?;
    Ok(())
}
