use crate::application::ConvertedPurchase;
use crate::domain::Purchase;
use serde::{Deserialize, Serialize};

/// Request to record a purchase.
///
/// `amount` may be a JSON number or a decimal string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseRequest {
    pub description: String,
    pub transaction_date: String,
    pub amount: serde_json::Value,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePurchaseResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub id: String,
    pub description: String,
    pub transaction_date: String,
    pub amount: String,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl From<&Purchase> for PurchaseResponse {
    fn from(purchase: &Purchase) -> Self {
        PurchaseResponse {
            id: purchase.id.to_string(),
            description: purchase.description.clone(),
            transaction_date: purchase.transaction_date.to_string(),
            amount: purchase.original_amount.amount().to_string(),
            currency: purchase.currency().to_string(),
            idempotency_key: purchase.idempotency_key.client_key().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertQuery {
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedPurchaseResponse {
    pub id: String,
    pub description: String,
    pub transaction_date: String,
    pub original_amount: String,
    pub original_currency: String,
    pub converted_amount: String,
    pub target_currency: String,
    pub exchange_rate: String,
    pub rate_effective_date: String,
}

impl From<ConvertedPurchase> for ConvertedPurchaseResponse {
    fn from(report: ConvertedPurchase) -> Self {
        ConvertedPurchaseResponse {
            id: report.id.to_string(),
            description: report.description,
            transaction_date: report.transaction_date.to_string(),
            original_amount: report.original_amount.amount().to_string(),
            original_currency: report.original_amount.currency().to_string(),
            converted_amount: report.converted_amount.amount().to_string(),
            target_currency: report.converted_amount.currency().to_string(),
            exchange_rate: report.rate.to_string(),
            rate_effective_date: report.rate_effective_date.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HealthResponse {
    pub fn new(status: impl Into<String>) -> Self {
        HealthResponse {
            status: status.into(),
            detail: None,
        }
    }
}

/// Error body for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorResponse {
            code: code.into(),
            message: message.into(),
        }
    }
}
