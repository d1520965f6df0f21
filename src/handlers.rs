use crate::models::PredictionResponse;
use crate::predictor::SeverityPredictor;
use crate::preprocess;
use actix_multipart::Multipart;
use actix_web::{web, Error, HttpResponse, Result};
use futures_util::StreamExt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::Builder;
use uuid::Uuid;

/// Accepts a multipart image upload, runs it through the pipeline and
/// returns the classification with presentation hints for the client.
pub async fn predict(
    mut payload: Multipart,
    predictor: web::Data<SeverityPredictor>,
) -> Result<HttpResponse, Error> {
    // spool the upload into a per-request temporary directory
    let upload_dir = Builder::new()
        .prefix("severity_uploads")
        .tempdir()
        .map_err(|e| {
            log::error!("failed to create temporary upload directory: {e}");
            actix_web::error::ErrorInternalServerError("could not create upload directory")
        })?;

    let mut filepath = String::new();

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let filename = format!("{}.img", Uuid::new_v4());
        filepath = upload_dir
            .path()
            .join(filename)
            .to_string_lossy()
            .into_owned();

        let filepath_for_closure = filepath.clone();

        let mut f = web::block(move || File::create(&filepath_for_closure))
            .await?
            .map_err(|e| {
                log::error!("failed to create upload file: {e}");
                actix_web::error::ErrorInternalServerError("could not save upload")
            })?;

        while let Some(chunk) = field.next().await {
            let data = chunk?;
            f = web::block(move || f.write_all(&data).map(|_| f))
                .await?
                .map_err(|e| {
                    log::error!("failed to write upload data: {e}");
                    actix_web::error::ErrorInternalServerError("could not write upload")
                })?;
        }
    }

    if filepath.is_empty() {
        return Err(actix_web::error::ErrorBadRequest("no image in upload"));
    }

    let img = preprocess::open_image(Path::new(&filepath)).map_err(|e| {
        log::warn!("rejected upload: {e}");
        actix_web::error::ErrorBadRequest("invalid image file")
    })?;

    let tensor = preprocess::normalize(&img).into_dyn();

    // contract violations here are wiring bugs, fatal to the request
    let result = predictor.predict(&tensor).map_err(|e| {
        log::error!("prediction failed: {e}");
        actix_web::error::ErrorInternalServerError("prediction failed")
    })?;
    let probabilities = predictor.class_probabilities(&tensor).map_err(|e| {
        log::error!("probability computation failed: {e}");
        actix_web::error::ErrorInternalServerError("prediction failed")
    })?;

    log::info!(
        "predicted {} at {:.1}% confidence",
        result.class,
        result.confidence
    );

    Ok(HttpResponse::Ok().json(PredictionResponse::new(result, probabilities)))
}

pub async fn model_info(predictor: web::Data<SeverityPredictor>) -> HttpResponse {
    HttpResponse::Ok().json(predictor.model_info())
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}
