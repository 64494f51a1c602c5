//! Unified error codes for the TokoKu POS core
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order / cart errors
//! - 5xxx: Payment and credit errors
//! - 6xxx: Product, stock and discount errors
//! - 7xxx: Customer errors
//! - 8xxx: Sync queue errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so that any outer surface
/// (HTTP, IPC, logs) can carry them without knowing the Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Order ====================
    /// Transaction not found
    OrderNotFound = 4001,
    /// Transaction has already been voided
    OrderAlreadyVoided = 4004,
    /// Cart is empty
    OrderEmpty = 4007,
    /// Cart line not found
    CartLineNotFound = 4008,
    /// Checkout failed and its side effects were rolled back
    CheckoutRolledBack = 4009,

    // ==================== 5xxx: Payment ====================
    /// Credit sale without a customer name
    CreditCustomerRequired = 5101,
    /// Debt not found
    DebtNotFound = 5102,
    /// Debt payment amount is invalid
    DebtPaymentInvalid = 5103,
    /// Debt is already fully paid
    DebtAlreadyPaid = 5104,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product has invalid price
    ProductInvalidPrice = 6002,
    /// Product is out of stock
    ProductOutOfStock = 6003,
    /// Requested quantity exceeds available stock
    InsufficientStock = 6004,
    /// Manual discount exceeds the line subtotal
    DiscountInvalid = 6801,
    /// Discount rule failed validation
    DiscountRuleInvalid = 6802,

    // ==================== 7xxx: Customer ====================
    /// Customer not found
    CustomerNotFound = 7001,

    // ==================== 8xxx: Sync ====================
    /// Replay of a queued operation failed
    SyncReplayFailed = 8001,
    /// Device is offline
    SyncOffline = 8002,
    /// Nothing pending in the queue
    SyncNothingPending = 8003,
    /// Queued operation discarded after exhausting retries
    SyncItemDiscarded = 8004,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Storage corrupted (data file damaged)
    StorageCorrupted = 9403,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether a caller may retry the same operation later
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkError
                | ErrorCode::TimeoutError
                | ErrorCode::SyncReplayFailed
                | ErrorCode::SyncOffline
        )
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Order
            ErrorCode::OrderNotFound => "Transaction not found",
            ErrorCode::OrderAlreadyVoided => "Transaction has already been voided",
            ErrorCode::OrderEmpty => "Cart is empty",
            ErrorCode::CartLineNotFound => "Product is not in the cart",
            ErrorCode::CheckoutRolledBack => "Checkout failed and was rolled back",

            // Payment
            ErrorCode::CreditCustomerRequired => "Customer name is required for credit sales",
            ErrorCode::DebtNotFound => "Debt not found",
            ErrorCode::DebtPaymentInvalid => "Debt payment amount is invalid",
            ErrorCode::DebtAlreadyPaid => "Debt is already paid",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductInvalidPrice => "Product has an invalid price",
            ErrorCode::ProductOutOfStock => "Product is out of stock",
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::DiscountInvalid => "Discount exceeds the line subtotal",
            ErrorCode::DiscountRuleInvalid => "Discount rule is invalid",

            // Customer
            ErrorCode::CustomerNotFound => "Customer not found",

            // Sync
            ErrorCode::SyncReplayFailed => "Replay of queued operation failed",
            ErrorCode::SyncOffline => "Device is offline",
            ErrorCode::SyncNothingPending => "Nothing to sync",
            ErrorCode::SyncItemDiscarded => "Queued operation discarded after retries",

            // System
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::StorageCorrupted => "Storage corrupted (data file damaged)",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4004 => Ok(ErrorCode::OrderAlreadyVoided),
            4007 => Ok(ErrorCode::OrderEmpty),
            4008 => Ok(ErrorCode::CartLineNotFound),
            4009 => Ok(ErrorCode::CheckoutRolledBack),

            // Payment
            5101 => Ok(ErrorCode::CreditCustomerRequired),
            5102 => Ok(ErrorCode::DebtNotFound),
            5103 => Ok(ErrorCode::DebtPaymentInvalid),
            5104 => Ok(ErrorCode::DebtAlreadyPaid),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductInvalidPrice),
            6003 => Ok(ErrorCode::ProductOutOfStock),
            6004 => Ok(ErrorCode::InsufficientStock),
            6801 => Ok(ErrorCode::DiscountInvalid),
            6802 => Ok(ErrorCode::DiscountRuleInvalid),

            // Customer
            7001 => Ok(ErrorCode::CustomerNotFound),

            // Sync
            8001 => Ok(ErrorCode::SyncReplayFailed),
            8002 => Ok(ErrorCode::SyncOffline),
            8003 => Ok(ErrorCode::SyncNothingPending),
            8004 => Ok(ErrorCode::SyncItemDiscarded),

            // System
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9403 => Ok(ErrorCode::StorageCorrupted),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
