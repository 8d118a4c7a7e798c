use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;

use bee_check::{handlers, AppState, Classifier, Logger, OnnxClassifier, ServiceConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("invalid configuration")?;

    let logger = Logger::new("api", None, &config.log).context("could not set up logging")?;
    logger.install().context("could not install the global logger")?;
    tracing::debug!("Logger initialized");

    tracing::debug!("Loading model from {}", config.model_path.display());
    let classifier: Option<Arc<dyn Classifier>> = match OnnxClassifier::load(&config.model_path) {
        Ok(model) => {
            tracing::info!("Model loaded successfully");
            Some(Arc::new(model))
        }
        Err(e) => {
            tracing::error!("{}", e);
            None
        }
    };
    tracing::debug!("EMOJI setting: {}", config.emoji);

    let state = web::Data::new(AppState::new(classifier, config.emoji));

    tracing::info!("Starting the application on port {}", config.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await?;

    Ok(())
}
