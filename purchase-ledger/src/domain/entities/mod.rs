mod purchase;

pub use purchase::{
    IdempotencyKey, MAX_DESCRIPTION_LEN, Purchase, PurchaseDetails, PurchaseError, PurchaseId,
};
