mod create_purchase;
mod get_converted_purchase;
mod get_purchase;

pub use create_purchase::{
    CreatePurchaseCommand, CreatePurchaseError, CreatePurchaseResult, CreatePurchaseUseCase,
};
pub use get_converted_purchase::{
    ConvertedPurchase, ConvertedPurchaseError, GetConvertedPurchaseUseCase,
};
pub use get_purchase::{GetPurchaseError, GetPurchaseUseCase};
