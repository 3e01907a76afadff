use actix_web::{App, HttpServer, middleware};

use jing_admin::config::AppConfig;
use jing_admin::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;
    log::debug!("{config:?}");

    // Ensure the directory of a file-backed database exists
    if let Some(path) = config.database_url.strip_prefix("sqlite://") {
        let file = path.split('?').next().unwrap_or(path);
        if let Some(dir) = std::path::Path::new(file).parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
    }

    let pool = db::init_pool(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;
    db::run_migrations(&pool).await.map_err(std::io::Error::other)?;
    db::seed(&pool, &config.admin_password)
        .await
        .map_err(std::io::Error::other)?;

    let codec = config.token_codec();
    let bind_addr = config.bind_addr;
    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(handlers::app_config(pool.clone(), codec.clone()))
    })
    .bind(bind_addr)?
    .run()
    .await
}
