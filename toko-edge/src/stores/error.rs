use shared::error::{AppError, ErrorCode};
use std::fmt;
use thiserror::Error;

/// Record kinds a store can fail to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Product,
    Transaction,
    Customer,
    Debt,
}

impl Resource {
    fn not_found_code(self) -> ErrorCode {
        match self {
            Resource::Product => ErrorCode::ProductNotFound,
            Resource::Transaction => ErrorCode::OrderNotFound,
            Resource::Customer => ErrorCode::CustomerNotFound,
            Resource::Debt => ErrorCode::DebtNotFound,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Product => "Product",
            Resource::Transaction => "Transaction",
            Resource::Customer => "Customer",
            Resource::Debt => "Debt",
        };
        f.write_str(name)
    }
}

/// Store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{resource} {id} not found")]
    NotFound { resource: Resource, id: i64 },

    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: i64,
        available: i64,
        requested: i64,
    },

    #[error("Transaction already voided: {0}")]
    AlreadyVoided(i64),

    #[error("Invalid data: {0}")]
    Invalid(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound { resource, id } => {
                AppError::with_message(resource.not_found_code(), message)
                    .with_detail("resource", resource.to_string())
                    .with_detail("id", id)
            }
            StoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => AppError::with_message(ErrorCode::InsufficientStock, message)
                .with_detail("product_id", product_id)
                .with_detail("available", available)
                .with_detail("requested", requested),
            StoreError::AlreadyVoided(id) => {
                AppError::with_message(ErrorCode::OrderAlreadyVoided, message)
                    .with_detail("transaction_id", id)
            }
            StoreError::Invalid(_) => AppError::validation(message),
            StoreError::Unavailable(_) => {
                tracing::error!(error = %message, "Store unavailable");
                AppError::database(message)
            }
        }
    }
}
