mod db;
mod errors;
mod handlers;
mod models;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::info;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let pool = db::create_pool().await;
    db::init_schema(&pool)
        .await
        .expect("Failed to create the employee table");

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    info!("Starting server at {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .service(
                web::resource("/users/upload")
                    .route(web::post().to(handlers::employee::upload)),
            )
            .service(
                web::resource("/users")
                    .route(web::get().to(handlers::employee::search))
                    .route(web::post().to(handlers::employee::create)),
            )
            .service(
                web::resource("/users/{id}")
                    .route(web::get().to(handlers::employee::find_by_id))
                    .route(web::put().to(handlers::employee::update))
                    .route(web::patch().to(handlers::employee::update))
                    .route(web::delete().to(handlers::employee::delete)),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
