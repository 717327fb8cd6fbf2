use actix_web::HttpServer;

use cms_server::{
    build_app, config::AppConfig, csrf::CsrfGuard, db::Database, AppState,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (for development)
    // Try loading from current directory first, then from server/ directory
    if dotenvy::dotenv().is_err() {
        dotenvy::from_filename("server/.env").ok();
    }

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    log::info!("Loaded configuration: {:?}", config);

    log::info!("Opening database at {}...", config.database_url);
    let db = Database::connect(&config.database_url).await?;
    db.initialize().await?;

    let csrf = match &config.cookie_secret {
        Some(secret) => CsrfGuard::new(secret.as_bytes().to_vec(), config.is_production())?,
        None => {
            log::warn!("COOKIE_SECRET not set; CSRF cookies will not survive a restart");
            CsrfGuard::ephemeral(config.is_production())
        }
    };

    let state = AppState::new(config.clone(), db.clone(), csrf);
    let metrics = state.metrics.clone();

    log::info!("Backend server running on port {}", config.port);
    log::info!("Metrics available at http://localhost:{}/metrics", config.port);
    log::info!("Health check at http://localhost:{}/health", config.port);
    log::info!("CSRF protection enabled (allowed origin: {})", config.frontend_url);

    HttpServer::new(move || build_app(&state))
        .bind((config.host.clone(), config.port))?
        .run()
        .await?;

    metrics.shutdown();
    db.close().await;

    Ok(())
}
