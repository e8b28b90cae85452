//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  API errors (apps/api)                                                 │
//! │  └── ApiError         - HTTP status + JSON body                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, PO number, amounts)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Category id does not exist (or is outside the selected store).
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Subcategory id does not exist under the addressed category.
    #[error("Subcategory not found: {0}")]
    SubcategoryNotFound(String),

    /// Item id is not under any subcategory or category item list.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Name collides case-insensitively with a sibling.
    ///
    /// ## When This Occurs
    /// - Creating a category whose name already exists in the store
    /// - Adding a subcategory whose name already exists in the category
    #[error("{entity} '{name}' already exists")]
    DuplicateName { entity: String, name: String },

    /// Category still holds subcategories or items.
    #[error("Category cannot be deleted: it has {subcategories} subcategories and {items} items")]
    CategoryNotEmpty { subcategories: usize, items: usize },

    /// Subcategory still holds items.
    #[error("Subcategory cannot be deleted: it has {items} items")]
    SubcategoryNotEmpty { items: usize },

    /// Not enough stock to complete a bill.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Purchase order is in a state that forbids the requested operation.
    ///
    /// ## When This Occurs
    /// - Receiving a completed or cancelled order
    /// - Editing, cancelling or deleting an order that left `pending`
    #[error("Purchase order {po_number} is {current_status}, cannot {action}")]
    InvalidOrderStatus {
        po_number: String,
        current_status: String,
        action: String,
    },

    /// Received quantity exceeds what is still outstanding on the line.
    #[error("Received quantity {received} for {sku} exceeds outstanding quantity {outstanding}")]
    ReceiptExceedsOrdered {
        sku: String,
        outstanding: i64,
        received: i64,
    },

    /// A receipt line names a SKU that is not on the purchase order.
    #[error("SKU {0} is not on this purchase order")]
    SkuNotOnOrder(String),

    /// A receipt carried no positive quantities.
    #[error("Receipt contains no quantities to receive")]
    NothingToReceive,

    /// Payment amount is invalid (zero, negative, rounds to nothing).
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Payment is larger than the outstanding balance.
    #[error("Payment amount {payment} exceeds remaining balance {balance}")]
    PaymentExceedsBalance { payment: i64, balance: i64 },

    /// A computed amount or quantity does not fit the supported range.
    #[error("{field} is too large")]
    AmountOutOfRange { field: String },

    /// Operation needs the acting user's selected store.
    #[error("No store selected")]
    NoStoreSelected,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Whether this error means "the addressed thing does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::CategoryNotFound(_)
                | CoreError::SubcategoryNotFound(_)
                | CoreError::ItemNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Name of the offending field, for field-level error reporting.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::Duplicate { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "COLA1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for COLA1: available 3, requested 5"
        );

        let err = CoreError::PaymentExceedsBalance {
            payment: 70_000,
            balance: 60_000,
        };
        assert_eq!(
            err.to_string(),
            "Payment amount 70000 exceeds remaining balance 60000"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");
        assert_eq!(err.field(), "sku");

        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 6,
        };
        assert_eq!(err.to_string(), "password must be at least 6 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(CoreError::ItemNotFound("x".into()).is_not_found());
        assert!(!CoreError::NoStoreSelected.is_not_found());
    }
}
