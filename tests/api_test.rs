use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};

use student_risk_predictor::predictor::{BatchPredictResponse, PredictorStatus};
use student_risk_predictor::{api, PredictorConfig, PredictorState, RiskPrediction, RiskPredictor, TrainingConfig};

fn predictor_in(dir: &std::path::Path, n_samples: usize) -> web::Data<RiskPredictor> {
    web::Data::new(RiskPredictor::initialize(PredictorConfig {
        model_dir: dir.to_path_buf(),
        training: TrainingConfig {
            n_samples,
            n_trees: 15,
            ..TrainingConfig::default()
        },
    }))
}

#[actix_web::test]
async fn health_endpoint_responds() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(predictor_in(dir.path(), 300))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn predict_accepts_partial_records() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(predictor_in(dir.path(), 300))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(json!({ "attendance_rate": 0.95, "assignment_avg": 90.0 }))
        .to_request();
    let prediction: RiskPrediction = test::call_and_read_body_json(&app, req).await;

    assert!((0.0..=1.0).contains(&prediction.risk_probability));
    assert!(!prediction.recommendations.is_empty());
}

#[actix_web::test]
async fn predict_serializes_lowercase_tier() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(predictor_in(dir.path(), 300))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(json!({
            "attendance_rate": 0.95,
            "assignment_avg": 92.0,
            "participation_score": 9.0,
            "previous_grades": 95.0,
            "study_hours": 18.0
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["risk_level"], "low");
    assert_eq!(body["at_risk"], false);
    assert_eq!(body["recommendations"], json!(["Maintain current study habits"]));
}

#[actix_web::test]
async fn malformed_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(predictor_in(dir.path(), 300))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/predict")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"attendance_rate\": \"lots\"}")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn batch_predict_summarizes_cohort() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(predictor_in(dir.path(), 300))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/batch-predict")
        .set_json(json!([
            { "name": "amina", "attendance_rate": 0.55, "assignment_avg": 52.0,
              "participation_score": 1.0, "previous_grades": 61.0, "study_hours": 2.0 },
            { "name": "brian", "attendance_rate": 0.97, "assignment_avg": 95.0,
              "participation_score": 9.0, "previous_grades": 97.0, "study_hours": 18.0 }
        ]))
        .to_request();
    let batch: BatchPredictResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(batch.total_students, 2);
    assert_eq!(batch.predictions[0].name, "amina");
    assert!(batch.predictions[0].prediction.at_risk);
    assert!(!batch.predictions[1].prediction.at_risk);
    assert_eq!(batch.summary.at_risk_count, 1);
}

#[actix_web::test]
async fn model_info_and_retrain_report_status() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(predictor_in(dir.path(), 300))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/model/info").to_request();
    let status: PredictorStatus = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status.state, PredictorState::Ready);
    assert_eq!(status.model.as_ref().map(|m| m.n_trees), Some(15));

    let req = test::TestRequest::post().uri("/model/retrain").to_request();
    let retrained: PredictorStatus = test::call_and_read_body_json(&app, req).await;
    assert_eq!(retrained.state, PredictorState::Ready);
}

#[actix_web::test]
async fn degraded_predictor_still_answers_but_retrain_fails() {
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .app_data(predictor_in(dir.path(), 0))
            .configure(api::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/model/info").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["state"], "degraded");

    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(json!({ "attendance_rate": 0.4 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body,
        json!({
            "at_risk": false,
            "risk_probability": 0.2,
            "risk_level": "low",
            "recommendations": ["Maintain current study habits"]
        })
    );

    let req = test::TestRequest::post().uri("/model/retrain").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
