use actix_web::{App, HttpServer, middleware, web};

use diwan::config::Config;
use diwan::storage::FileStore;
use diwan::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = Config::from_env();

    let pool = db::init_pool(&config.database_url, config.max_connections).await;
    db::run_migrations(&pool).await;

    let store = FileStore::new(&config.upload_dir);
    store.init().await.expect("Failed to create upload directory");

    log::info!("Starting server at http://{}", config.bind_addr);

    let bind_addr = config.bind_addr.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(store.clone()))
            .route("/health", web::get().to(handlers::health))
            .service(web::scope("/api/v1").configure(handlers::configure))
            // Default 404 handler (must be registered last)
            .default_service(web::to(|| async {
                actix_web::HttpResponse::NotFound()
                    .json(serde_json::json!({ "error": "Not found" }))
            }))
    })
    .bind(bind_addr)?
    .run()
    .await
}
