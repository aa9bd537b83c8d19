use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::net::TcpListener;

mod config;
mod db;
mod error;
mod handlers;
mod logging;

use crate::config::AppSettings;
use crate::db::{create_pool, verify_connection};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Load application settings; APP_SETTINGS names the profile
    let settings = match AppSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            // No log handler exists this early
            eprintln!("Failed to load application settings: {}", e);
            eprintln!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };

    // Console log handler, unless a debug profile owns the output
    logging::init(&settings);

    log::info!("Configuration\n{:#?}", settings);

    // Database connection setup
    let db_pool = match create_pool(&settings.database).await {
        Ok(pool) => {
            // Verify the database connection
            if let Err(e) = verify_connection(&pool).await {
                log::error!("Database connection verification failed: {}", e);
                log::error!("Cannot start server without a working database connection");
                std::process::exit(1);
            }
            log::info!("Database connection established successfully");
            pool
        }
        Err(e) => {
            log::error!("Failed to create database connection pool: {}", e);
            log::error!("Cannot start server without a working database connection");
            std::process::exit(1);
        }
    };

    let host = &settings.server.host;
    let port = settings.server.port;

    log::info!("Starting server at http://{}:{}", host, port);

    let server_addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(server_addr)?;

    HttpServer::new(move || {
        // Clone the data for the factory closure
        let settings = settings.clone();
        let db_pool = db_pool.clone();

        // Configure CORS using actix-cors
        let mut cors = Cors::default().supports_credentials();

        if settings.server.cors_origins.contains(&"*".to_string()) {
            cors = cors.allow_any_origin();
        } else {
            for origin in &settings.server.cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }

        cors = cors.allow_any_method().allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(settings))
            .app_data(web::Data::new(db_pool))
            // Health check endpoint, no auth
            .service(
                web::resource("/health").route(web::get().to(handlers::health::health_check)),
            )
    })
    .listen(listener)?
    .run()
    .await
}
