use axum::{
    extract::{rejection::JsonRejection, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use bytes::Bytes;

use crate::{
    dto::job_dto::{
        AcceptJobRequest, JobListQuery, JobPayload, ProductPayload, ShipmentPayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    utils::time::parse_date_range,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/jobs/post_job",
    responses(
        (status = 201, description = "Job aggregate created"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn post_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut job: Option<JobPayload> = None;
    let mut products: Option<Vec<ProductPayload>> = None;
    let mut shipment: Option<ShipmentPayload> = None;
    let mut image: Option<Bytes> = None;
    let mut image_name = "image.bin".to_string();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "job" => job = Some(serde_json::from_str(&field.text().await?)?),
            "products" => products = Some(serde_json::from_str(&field.text().await?)?),
            "shipment" => shipment = Some(serde_json::from_str(&field.text().await?)?),
            "image" => {
                if let Some(name) = field.file_name() {
                    image_name = name.to_string();
                }
                let data = field.bytes().await?;
                if !data.is_empty() {
                    image = Some(data);
                }
            }
            _ => {}
        }
    }

    let job = job.ok_or_else(|| Error::BadRequest("job is required".into()))?;
    let products = products.ok_or_else(|| Error::BadRequest("products is required".into()))?;
    let shipment = shipment.ok_or_else(|| Error::BadRequest("shipment is required".into()))?;
    let image = image.ok_or_else(|| Error::BadRequest("image is required".into()))?;

    let poster = claims.user_id()?;
    let document = state
        .job_service
        .post_job(poster, job, products, shipment, image, &image_name)
        .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(
        ("fromDate" = Option<String>, Query, description = "Range start, DD/MM/YYYY"),
        ("toDate" = Option<String>, Query, description = "Range end, DD/MM/YYYY")
    ),
    responses(
        (status = 200, description = "Active jobs with shipment and products")
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let range = parse_date_range(query.from_date.as_deref(), query.to_date.as_deref())?;
    let documents = state.job_service.list_jobs(range).await?;
    Ok(Json(documents))
}

#[utoipa::path(
    get,
    path = "/api/jobs/my_jobs",
    responses(
        (status = 200, description = "Caller's active jobs with auction bids")
    )
)]
#[axum::debug_handler]
pub async fn my_jobs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let poster = claims.user_id()?;
    let documents = state.job_service.my_jobs(poster).await?;
    Ok(Json(documents))
}

#[utoipa::path(
    post,
    path = "/api/jobs/accept",
    request_body = AcceptJobRequest,
    responses(
        (status = 200, description = "Winner assigned"),
        (status = 404, description = "Job or shipper not found")
    )
)]
#[axum::debug_handler]
pub async fn accept_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: std::result::Result<Json<AcceptJobRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    // a missing or malformed body is the client's fault, not unprocessable
    let Json(payload) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;
    let poster = claims.user_id()?;
    state
        .job_service
        .accept(poster, payload.job, payload.shipper)
        .await?;
    Ok(StatusCode::OK)
}
