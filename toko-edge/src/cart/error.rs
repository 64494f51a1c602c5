use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Cart errors
///
/// Every variant is recoverable: the cart is left exactly as it was before
/// the failing operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CartError {
    #[error("Product {product_id} is out of stock")]
    OutOfStock { product_id: i64 },

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("Discount {amount} exceeds line subtotal {subtotal} for product {product_id}")]
    InvalidDiscount {
        product_id: i64,
        amount: f64,
        subtotal: f64,
    },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Customer name is required for credit sales")]
    MissingCustomer,

    #[error("Product {0} is not in the cart")]
    LineNotFound(i64),

    #[error("Invalid product {product_id}: {reason}")]
    InvalidProduct { product_id: i64, reason: String },

    #[error("Amount for product {product_id} × {quantity} is out of range")]
    AmountOutOfRange { product_id: i64, quantity: i64 },
}

pub type CartResult<T> = Result<T, CartError>;

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        let message = err.to_string();
        match err {
            CartError::OutOfStock { product_id } => {
                AppError::with_message(ErrorCode::ProductOutOfStock, message)
                    .with_detail("product_id", product_id)
            }
            CartError::InsufficientStock {
                product_id,
                requested,
                available,
            } => AppError::with_message(ErrorCode::InsufficientStock, message)
                .with_detail("product_id", product_id)
                .with_detail("requested", requested)
                .with_detail("available", available),
            CartError::InvalidDiscount {
                product_id,
                amount,
                subtotal,
            } => AppError::with_message(ErrorCode::DiscountInvalid, message)
                .with_detail("product_id", product_id)
                .with_detail("amount", amount)
                .with_detail("subtotal", subtotal),
            CartError::EmptyCart => AppError::with_message(ErrorCode::OrderEmpty, message),
            CartError::MissingCustomer => {
                AppError::with_message(ErrorCode::CreditCustomerRequired, message)
            }
            CartError::LineNotFound(product_id) => {
                AppError::with_message(ErrorCode::CartLineNotFound, message)
                    .with_detail("product_id", product_id)
            }
            CartError::InvalidProduct { product_id, .. } => {
                AppError::with_message(ErrorCode::ProductInvalidPrice, message)
                    .with_detail("product_id", product_id)
            }
            CartError::AmountOutOfRange {
                product_id,
                quantity,
            } => AppError::with_message(ErrorCode::ValueOutOfRange, message)
                .with_detail("product_id", product_id)
                .with_detail("quantity", quantity),
        }
    }
}
