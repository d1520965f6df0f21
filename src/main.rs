use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use severity_backend::config::AppConfig;
use severity_backend::handlers;
use severity_backend::predictor::{load_model, SeverityPredictor};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();

    let model = load_model(config.model_path.as_deref()).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("model initialization failed: {e}"),
        )
    })?;
    let predictor = web::Data::new(SeverityPredictor::new(model));

    log::info!("server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(predictor.clone())
            .service(web::resource("/predict").route(web::post().to(handlers::predict)))
            .service(web::resource("/model_info").route(web::get().to(handlers::model_info)))
            .service(web::resource("/health").route(web::get().to(handlers::health)))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
