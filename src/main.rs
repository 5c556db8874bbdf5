use actix_web::{middleware::Logger, web, App, HttpServer};
use std::error::Error;

use student_risk_predictor::{api, Config, PredictorState, RiskPredictor};

async fn start_api(predictor: RiskPredictor, host: &str, port: u16) -> std::io::Result<()> {
    let predictor_data = web::Data::new(predictor);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(predictor_data.clone())
            .configure(api::configure)
    })
    .bind((host, port))?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    log::info!(
        "Preparing risk model (model dir: {})",
        config.predictor.model_dir.display()
    );

    let predictor = RiskPredictor::initialize(config.predictor.clone());
    let status = predictor.status();
    match (status.state, status.model.as_ref()) {
        (PredictorState::Ready, Some(info)) => log::info!(
            "Model ready: {} trees, holdout accuracy {:.2}%",
            info.n_trees,
            info.accuracy * 100.0
        ),
        _ => log::warn!("No usable model, predictions will use the default low-risk answer"),
    }

    log::info!("Starting Student Risk Predictor API on http://{}:{}", config.host, config.port);
    start_api(predictor, &config.host, config.port).await?;

    Ok(())
}
