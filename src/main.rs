#[macro_use]
extern crate rocket;

mod batch;
mod config;
mod db;
mod env;
mod error;
mod models;
mod rankings;
mod routes;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use config::AppConfig;
use rocket::{Build, Rocket};
use routes::{
    add_review, add_review_page, add_spirit, add_spirit_page, delete_spirit_route, edit_ranking,
    edit_ranking_page, edit_review, edit_review_page, health, index, rank_spirit,
    rank_spirit_page, rankings_page, save_rankings, spirit_detail, update_rankings,
};
use sqlx::SqlitePool;
use telemetry::{RequestTracingFairing, init_tracing};
use tracing::{error, info, warn};

#[launch]
async fn rocket() -> _ {
    let profile = env::Profile::current();
    let env_result = env::load_environment(profile);

    let config = AppConfig::from_env();
    init_tracing(&config, profile);

    match env_result {
        Ok(loaded) => {
            for path in &loaded.missing {
                warn!("Environment file {} not found, skipping", path);
            }
            info!(profile = profile.as_str(), files = ?loaded.loaded, "Loaded environment");
        }
        Err(e) => warn!("Failed to load environment files: {}", e),
    }

    let pool = match config.connect().await {
        Ok(pool) => pool,
        Err(e) => {
            error!("{:#}", e);
            panic!("Database connection failed: {:#}", e);
        }
    };

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(_) => info!("Migrations completed successfully"),
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            panic!("Database migration failed: {}", e);
        }
    }

    init_rocket(pool, config).await
}

pub async fn init_rocket(pool: SqlitePool, config: AppConfig) -> Rocket<Build> {
    info!(
        default_spirit_type = %config.default_spirit_type,
        "Starting spirit rankings"
    );

    rocket::build()
        .manage(pool)
        .manage(config)
        .mount(
            "/",
            routes![
                index,
                health,
                rankings_page,
                update_rankings,
                save_rankings,
                edit_ranking_page,
                edit_ranking,
                rank_spirit_page,
                rank_spirit,
                add_spirit_page,
                add_spirit,
                add_review_page,
                add_review,
                edit_review_page,
                edit_review,
                spirit_detail,
                delete_spirit_route,
            ],
        )
        .attach(RequestTracingFairing)
}
