use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde_json::json;

use crate::data::FeatureRecord;
use crate::error::RiskError;
use crate::predictor::{RiskPredictor, StudentFeatures};

impl ResponseError for RiskError {
    fn status_code(&self) -> StatusCode {
        match self {
            RiskError::ModelUnavailable | RiskError::Training(_) => StatusCode::SERVICE_UNAVAILABLE,
            RiskError::Inference(_) | RiskError::ShapeMismatch { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }
        HttpResponse::build(status).json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }))
    }
}

// Single prediction, always answers (falls back to the default when no model is usable)
async fn predict(
    req: web::Json<FeatureRecord>,
    predictor: web::Data<RiskPredictor>,
) -> HttpResponse {
    HttpResponse::Ok().json(predictor.predict(&req))
}

// Cohort view for a course: one prediction per student plus a summary
async fn batch_predict(
    web::Json(students): web::Json<Vec<StudentFeatures>>,
    predictor: web::Data<RiskPredictor>,
) -> HttpResponse {
    HttpResponse::Ok().json(predictor.predict_batch(&students))
}

async fn get_model_info(predictor: web::Data<RiskPredictor>) -> HttpResponse {
    HttpResponse::Ok().json(predictor.status())
}

async fn retrain(predictor: web::Data<RiskPredictor>) -> Result<HttpResponse, RiskError> {
    let worker = predictor.clone();
    let accuracy = web::block(move || worker.train())
        .await
        .map_err(|e| RiskError::Training(e.to_string()))?;

    match accuracy {
        Some(_) => Ok(HttpResponse::Ok().json(predictor.status())),
        None => Err(RiskError::ModelUnavailable),
    }
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Student Risk Predictor API is running!")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/predict", web::post().to(predict))
        .route("/batch-predict", web::post().to(batch_predict))
        .route("/model/info", web::get().to(get_model_info))
        .route("/model/retrain", web::post().to(retrain));
}
