use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use crate::application::{
    CreatePurchaseCommand, CreatePurchaseUseCase, GetConvertedPurchaseUseCase,
    GetPurchaseUseCase, PurchaseStore, RateCache, RateSource,
};
use crate::domain::{Clock, CurrencyCode, PurchaseId};
use crate::presentation::rest::{ApiError, dto::*};

use super::AppState;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// POST /api/v1/purchases
pub async fn create_purchase<P, S, K, C>(
    State(state): State<Arc<AppState<P, S, K, C>>>,
    headers: HeaderMap,
    payload: Result<Json<CreatePurchaseRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    P: PurchaseStore + 'static,
    S: RateSource + 'static,
    K: RateCache + 'static,
    C: Clock + 'static,
{
    let Json(req) = payload.map_err(|e| ApiError::bad_request("INVALID_BODY", e.body_text()))?;

    let idempotency_key = extract_idempotency_key(&headers)?;
    let amount = parse_amount(&req.amount)?;
    let transaction_date = parse_date("transactionDate", &req.transaction_date)?;
    if transaction_date > state.clock.today() {
        return Err(ApiError::invalid_parameter(
            "transactionDate",
            "must not be in the future",
        ));
    }

    let command = CreatePurchaseCommand {
        description: req.description,
        transaction_date,
        amount,
        currency: req.currency,
        idempotency_key,
    };

    let use_case = CreatePurchaseUseCase::new(Arc::clone(&state.store));
    let result = use_case.execute(command).await?;

    let location = format!("/api/v1/purchases/{}", result.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CreatePurchaseResponse {
            id: result.id.to_string(),
        }),
    ))
}

/// GET /api/v1/purchases/{id}
pub async fn get_purchase<P, S, K, C>(
    State(state): State<Arc<AppState<P, S, K, C>>>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseResponse>, ApiError>
where
    P: PurchaseStore + 'static,
    S: RateSource + 'static,
    K: RateCache + 'static,
    C: Clock + 'static,
{
    let id = parse_id(&id)?;
    let use_case = GetPurchaseUseCase::new(Arc::clone(&state.store));
    let purchase = use_case.execute(id).await?;
    Ok(Json(PurchaseResponse::from(&purchase)))
}

/// GET /api/v1/purchases/{id}/converted?currency=XXX
pub async fn get_converted_purchase<P, S, K, C>(
    State(state): State<Arc<AppState<P, S, K, C>>>,
    Path(id): Path<String>,
    Query(query): Query<ConvertQuery>,
) -> Result<Json<ConvertedPurchaseResponse>, ApiError>
where
    P: PurchaseStore + 'static,
    S: RateSource + 'static,
    K: RateCache + 'static,
    C: Clock + 'static,
{
    let id = parse_id(&id)?;
    let target = query
        .currency
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::missing_parameter("currency"))?;
    let target = CurrencyCode::new(target)
        .map_err(|_| ApiError::invalid_parameter("currency", "must be a 3-letter ISO code"))?;

    let use_case = GetConvertedPurchaseUseCase::new(
        Arc::clone(&state.store),
        Arc::clone(&state.resolver),
        state.converter.clone(),
    );
    let report = use_case.execute(id, &target).await?;
    Ok(Json(report.into()))
}

/// GET /health/live
pub async fn live() -> Json<HealthResponse> {
    Json(HealthResponse::new("ok"))
}

/// GET /health/ready
pub async fn ready<P, S, K, C>(
    State(state): State<Arc<AppState<P, S, K, C>>>,
) -> (StatusCode, Json<HealthResponse>)
where
    P: PurchaseStore + 'static,
    S: RateSource + 'static,
    K: RateCache + 'static,
    C: Clock + 'static,
{
    match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::new("ready"))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".to_string(),
                    detail: Some("storage".to_string()),
                }),
            )
        }
    }
}

fn extract_idempotency_key(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };
    let key = value
        .to_str()
        .map_err(|_| ApiError::invalid_parameter("Idempotency-Key", "must be visible ASCII"))?
        .trim();
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(ApiError::invalid_parameter(
            "Idempotency-Key",
            "must be at most 128 characters",
        ));
    }
    Ok(Some(key.to_string()))
}

fn parse_amount(value: &serde_json::Value) -> Result<Decimal, ApiError> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return Err(ApiError::invalid_parameter("amount", "must be a decimal")),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ApiError::invalid_parameter("amount", "must be a decimal"))
}

fn parse_date(param: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::invalid_parameter(param, "must be a YYYY-MM-DD date"))
}

fn parse_id(value: &str) -> Result<PurchaseId, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::invalid_parameter("id", "must be a UUID"))
}
