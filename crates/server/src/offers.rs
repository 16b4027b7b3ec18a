//! JSON API routes for the offer lifecycle.
//!
//! Endpoints:
//! - `POST /api/offers/submit`     — submit a purchase offer
//! - `POST /api/offers/status`     — fetch a single offer by ID
//! - `POST /api/offers/respond`    — accept, reject, or counter an offer
//! - `POST /api/offers/list`       — list offers for a property with statistics
//! - `POST /api/offers/statistics` — statistics only
//! - `POST /api/offers/delete`     — administratively remove an offer

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use homekey_core::domain::offer::{NewOffer, Offer, OfferId, OfferStatistics, OfferStatus};
use homekey_db::{DbPool, OfferStore, SqlOfferStore, StoreError};

#[derive(Clone)]
pub struct OffersState {
    store: Arc<SqlOfferStore>,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitOfferRequest {
    pub property_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: String,
    pub offer_price: f64,
    #[serde(default)]
    pub contingencies: Vec<String>,
    pub closing_date: String,
    #[serde(default)]
    pub additional_terms: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct OfferIdRequest {
    pub offer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub offer_id: String,
    pub response: String,
    #[serde(default)]
    pub counter_offer_price: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListOffersRequest {
    pub property_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PropertyIdRequest {
    pub property_id: String,
}

#[derive(Debug, Serialize)]
pub struct ListOffersResponse {
    pub property_id: String,
    pub filter_status: Option<String>,
    pub count: usize,
    pub offers: Vec<Offer>,
    pub statistics: OfferStatistics,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub property_id: String,
    pub statistics: OfferStatistics,
}

#[derive(Debug, Serialize)]
pub struct DeleteOfferResponse {
    pub offer_id: String,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        let status = match &error {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Database(_) | StoreError::Decode(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self { status, message: error.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiErrorBody { error: self.message })).into_response()
    }
}

fn price_from_f64(field: &'static str, value: f64) -> Result<Decimal, ApiError> {
    Decimal::try_from(value)
        .map_err(|_| ApiError::bad_request(format!("`{field}` is not a valid price")))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(db_pool: DbPool) -> Router {
    Router::new()
        .route("/api/offers/submit", post(submit_offer))
        .route("/api/offers/status", post(get_offer_status))
        .route("/api/offers/respond", post(respond_to_offer))
        .route("/api/offers/list", post(list_offers))
        .route("/api/offers/statistics", post(get_offer_statistics))
        .route("/api/offers/delete", post(delete_offer))
        .with_state(OffersState { store: Arc::new(SqlOfferStore::new(db_pool)) })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn submit_offer(
    State(state): State<OffersState>,
    Json(request): Json<SubmitOfferRequest>,
) -> Result<(StatusCode, Json<Offer>), ApiError> {
    debug!(property_id = %request.property_id, "submit_offer called");

    let offer = state
        .store
        .create_offer(NewOffer {
            property_id: request.property_id,
            buyer_name: request.buyer_name,
            buyer_email: request.buyer_email,
            buyer_phone: request.buyer_phone,
            offer_price: price_from_f64("offer_price", request.offer_price)?,
            contingencies: request.contingencies,
            closing_date: request.closing_date,
            additional_terms: request.additional_terms,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(offer)))
}

async fn get_offer_status(
    State(state): State<OffersState>,
    Json(request): Json<OfferIdRequest>,
) -> Result<Json<Offer>, ApiError> {
    debug!(offer_id = %request.offer_id, "get_offer_status called");

    let offer = state.store.get_offer(&OfferId(request.offer_id)).await?;
    Ok(Json(offer))
}

async fn respond_to_offer(
    State(state): State<OffersState>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<Offer>, ApiError> {
    debug!(offer_id = %request.offer_id, response = %request.response, "respond_to_offer called");

    let counter_offer_price = request
        .counter_offer_price
        .map(|price| price_from_f64("counter_offer_price", price))
        .transpose()?;

    let offer = state
        .store
        .process_offer_response(
            &OfferId(request.offer_id),
            &request.response,
            counter_offer_price,
            request.notes,
        )
        .await?;

    Ok(Json(offer))
}

async fn list_offers(
    State(state): State<OffersState>,
    Json(request): Json<ListOffersRequest>,
) -> Result<Json<ListOffersResponse>, ApiError> {
    debug!(property_id = %request.property_id, "list_offers called");

    let status = match request.status.as_deref() {
        Some(raw) => Some(OfferStatus::parse(raw).ok_or_else(|| {
            ApiError::bad_request(format!(
                "invalid status `{raw}` (expected pending_review|accepted|rejected|countered)"
            ))
        })?),
        None => None,
    };

    let (offers, statistics) = state.store.list_offers(&request.property_id, status).await?;

    Ok(Json(ListOffersResponse {
        property_id: request.property_id,
        filter_status: request.status,
        count: offers.len(),
        offers,
        statistics,
    }))
}

async fn get_offer_statistics(
    State(state): State<OffersState>,
    Json(request): Json<PropertyIdRequest>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    debug!(property_id = %request.property_id, "get_offer_statistics called");

    let statistics = state.store.get_offer_statistics(&request.property_id).await?;
    Ok(Json(StatisticsResponse { property_id: request.property_id, statistics }))
}

async fn delete_offer(
    State(state): State<OffersState>,
    Json(request): Json<OfferIdRequest>,
) -> Result<Json<DeleteOfferResponse>, ApiError> {
    debug!(offer_id = %request.offer_id, "delete_offer called");

    let removed = state.store.delete_offer(&OfferId(request.offer_id.clone())).await?;
    Ok(Json(DeleteOfferResponse { offer_id: request.offer_id, removed }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use homekey_db::{connect_with_settings, migrations};

    use crate::offers::router;

    async fn test_router() -> Router {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        router(pool)
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build");

        let response = app.clone().oneshot(request).await.expect("handler should respond");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let payload = serde_json::from_slice(&bytes).expect("body should be JSON");
        (status, payload)
    }

    fn submit_body(property_id: &str, price: f64) -> Value {
        json!({
            "property_id": property_id,
            "buyer_name": "Dana Wells",
            "buyer_email": "dana@example.com",
            "buyer_phone": "+1-555-0100",
            "offer_price": price,
            "contingencies": ["inspection", "financing"],
            "closing_date": "2026-10-15",
        })
    }

    #[tokio::test]
    async fn submit_returns_created_pending_offer() {
        let app = test_router().await;

        let (status, offer) =
            post_json(&app, "/api/offers/submit", submit_body("PROP-1", 500_000.0)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(offer["status"], json!("pending_review"));
        assert_eq!(offer["property_id"], json!("PROP-1"));
        assert!(offer["offer_id"].as_str().expect("id").starts_with("OFFER-"));
    }

    #[tokio::test]
    async fn submit_with_invalid_email_is_bad_request() {
        let app = test_router().await;

        let mut body = submit_body("PROP-1", 500_000.0);
        body["buyer_email"] = json!("not-an-email");
        let (status, payload) = post_json(&app, "/api/offers/submit", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].as_str().expect("error").contains("buyer_email"));
    }

    #[tokio::test]
    async fn status_for_unknown_offer_is_not_found() {
        let app = test_router().await;

        let (status, payload) = post_json(
            &app,
            "/api/offers/status",
            json!({ "offer_id": "OFFER-20260829-DEADBEEF" }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(payload["error"].as_str().expect("error").contains("OFFER-20260829-DEADBEEF"));
    }

    #[tokio::test]
    async fn respond_counter_updates_offer() {
        let app = test_router().await;

        let (_, submitted) =
            post_json(&app, "/api/offers/submit", submit_body("PROP-1", 500_000.0)).await;
        let offer_id = submitted["offer_id"].as_str().expect("id").to_string();

        let (status, countered) = post_json(
            &app,
            "/api/offers/respond",
            json!({
                "offer_id": offer_id,
                "response": "counter",
                "counter_offer_price": 525_000.0,
                "notes": "counter at asking",
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(countered["status"], json!("countered"));
        assert_eq!(countered["counter_offer_price"], json!("525000"));
        assert_eq!(countered["response_notes"], json!("counter at asking"));
    }

    #[tokio::test]
    async fn respond_counter_without_price_is_bad_request() {
        let app = test_router().await;

        let (_, submitted) =
            post_json(&app, "/api/offers/submit", submit_body("PROP-1", 500_000.0)).await;
        let offer_id = submitted["offer_id"].as_str().expect("id").to_string();

        let (status, payload) = post_json(
            &app,
            "/api/offers/respond",
            json!({ "offer_id": offer_id, "response": "counter" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].as_str().expect("error").contains("counter_offer_price"));
    }

    #[tokio::test]
    async fn list_filters_offers_but_reports_full_statistics() {
        let app = test_router().await;

        let (_, first) =
            post_json(&app, "/api/offers/submit", submit_body("PROP-1", 500_000.0)).await;
        post_json(&app, "/api/offers/submit", submit_body("PROP-1", 550_000.0)).await;
        let first_id = first["offer_id"].as_str().expect("id").to_string();

        post_json(
            &app,
            "/api/offers/respond",
            json!({ "offer_id": first_id, "response": "accept" }),
        )
        .await;

        let (status, payload) = post_json(
            &app,
            "/api/offers/list",
            json!({ "property_id": "PROP-1", "status": "accepted" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["count"], json!(1));
        assert_eq!(payload["offers"][0]["status"], json!("accepted"));
        assert_eq!(payload["statistics"]["total_offers"], json!(2));
        assert_eq!(payload["statistics"]["highest_offer"], json!("550000"));
    }

    #[tokio::test]
    async fn list_with_unknown_status_is_bad_request() {
        let app = test_router().await;

        let (status, payload) = post_json(
            &app,
            "/api/offers/list",
            json!({ "property_id": "PROP-1", "status": "withdrawn" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].as_str().expect("error").contains("invalid status"));
    }

    #[tokio::test]
    async fn statistics_for_empty_property_reports_zeroes() {
        let app = test_router().await;

        let (status, payload) =
            post_json(&app, "/api/offers/statistics", json!({ "property_id": "PROP-9" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["statistics"]["total_offers"], json!(0));
        assert_eq!(payload["statistics"]["highest_offer"], Value::Null);
        assert_eq!(payload["statistics"]["average_offer"], Value::Null);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_record_was_removed() {
        let app = test_router().await;

        let (_, submitted) =
            post_json(&app, "/api/offers/submit", submit_body("PROP-1", 500_000.0)).await;
        let offer_id = submitted["offer_id"].as_str().expect("id").to_string();

        let (status, payload) =
            post_json(&app, "/api/offers/delete", json!({ "offer_id": offer_id })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["removed"], json!(true));

        let (status, payload) =
            post_json(&app, "/api/offers/delete", json!({ "offer_id": offer_id })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["removed"], json!(false));
    }
}
