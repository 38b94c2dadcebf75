use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlers;
use actix_web::{App, HttpServer, web};
use dotenv::dotenv;
use freelance_backend::cache::{CacheConfig, RedisCache};
use freelance_backend::config::AppConfig;
use freelance_backend::error;
use freelance_backend::mail::{Mailer, SmtpMailer};
use freelance_backend::payments::{PaymentGateway, StripeClient};
use freelance_backend::realtime::EventHub;
use freelance_backend::{create_pool, handlers};
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AppConfig::from_env().map_err(io::Error::other)?;

    let db = create_pool(&config.database_url)
        .await
        .map_err(io::Error::other)?;
    let db_data = web::Data::new(db);
    tracing::info!("Connected to database");

    let redis_cache = RedisCache::new(&config.redis_url)
        .await
        .map_err(io::Error::other)?;
    let redis_data = web::Data::new(Arc::new(redis_cache));
    let cache_config = web::Data::new(CacheConfig::from_env());
    tracing::info!("Connected to Redis");

    // Realtime hub for chat rooms and notification streams.
    let hub = Arc::new(EventHub::new());
    hub.start();
    let hub_data = web::Data::new(hub);

    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeClient::new(&config.stripe));
    let gateway_data = web::Data::new(gateway);

    let mailer: Arc<dyn Mailer> =
        Arc::new(SmtpMailer::new(&config.smtp).map_err(io::Error::other)?);
    let mailer_data = web::Data::new(mailer);

    let jwt_data = web::Data::new(config.jwt.clone());
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let config_data = web::Data::new(config);

    tracing::info!("Server running at http://{bind_addr}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::INTERNAL_SERVER_ERROR, error::attach_internal_detail),
            )
            .configure(handlers::configure_extractors)
            .app_data(db_data.clone())
            .app_data(redis_data.clone())
            .app_data(cache_config.clone())
            .app_data(hub_data.clone())
            .app_data(gateway_data.clone())
            .app_data(mailer_data.clone())
            .app_data(jwt_data.clone())
            .app_data(config_data.clone())
            .service(web::scope("/api").configure(handlers::init_routes))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
