//! # Credit Ledger
//!
//! Outstanding balances owed to a supplier ([`Credit`], one per purchase
//! order) or by a customer ([`CustomerCredit`], one per bill). Both embed
//! the same [`Ledger`], so amendment and payment rules live here once.
//!
//! ## Balance Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  balance = max(original − paid, 0)                                     │
//! │                                                                         │
//! │  status  = paid            when balance == 0                           │
//! │          = partially_paid  when paid > 0                               │
//! │          = pending         otherwise                                   │
//! │                                                                         │
//! │  Recomputed after every amendment and every payment.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payments
//! Payments apply in whole currency units. A payment that rounds above the
//! (rounded) balance is rejected without touching the ledger. A payment
//! that rounds to at most the balance but overshoots the exact balance
//! settles the ledger: balance 0, paid = original.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::validate_non_negative_cents;

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CreditStatus {
    Pending,
    PartiallyPaid,
    Paid,
}

impl CreditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::Pending => "pending",
            CreditStatus::PartiallyPaid => "partially_paid",
            CreditStatus::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(CreditStatus::Pending),
            "partially_paid" => Some(CreditStatus::PartiallyPaid),
            "paid" => Some(CreditStatus::Paid),
            _ => None,
        }
    }

    /// Status as a pure function of original and paid amounts.
    pub fn derive(original_cents: i64, paid_cents: i64) -> Self {
        if original_cents - paid_cents <= 0 {
            CreditStatus::Paid
        } else if paid_cents > 0 {
            CreditStatus::PartiallyPaid
        } else {
            CreditStatus::Pending
        }
    }
}

// =============================================================================
// History Entries
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AmountChange {
    pub previous_amount_cents: i64,
    pub updated_amount_cents: i64,
    #[ts(as = "String")]
    pub change_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub changed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentEntry {
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Ledger {
    /// Amount at creation; never changes afterwards.
    pub initial_original_amount_cents: i64,
    pub original_amount_cents: i64,
    pub paid_amount_cents: i64,
    pub balance_amount_cents: i64,
    pub status: CreditStatus,
    pub amount_change_history: Vec<AmountChange>,
    pub payment_history: Vec<PaymentEntry>,
}

impl Ledger {
    pub fn new(original_amount_cents: i64) -> CoreResult<Self> {
        validate_non_negative_cents("originalAmount", original_amount_cents)?;

        let mut ledger = Ledger {
            initial_original_amount_cents: original_amount_cents,
            original_amount_cents,
            paid_amount_cents: 0,
            balance_amount_cents: 0,
            status: CreditStatus::Pending,
            amount_change_history: Vec::new(),
            payment_history: Vec::new(),
        };
        ledger.recompute();
        Ok(ledger)
    }

    /// Re-derives balance and status from original and paid amounts.
    pub fn recompute(&mut self) {
        let balance = Money::from_cents(self.original_amount_cents) - Money::from_cents(self.paid_amount_cents);
        self.balance_amount_cents = balance.floor_at_zero().cents();
        self.status = CreditStatus::derive(self.original_amount_cents, self.paid_amount_cents);
    }

    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_amount_cents)
    }

    /// Sets a new original amount and records the change.
    pub fn amend(
        &mut self,
        new_amount_cents: i64,
        notes: Option<String>,
        changed_by: Option<String>,
    ) -> CoreResult<()> {
        validate_non_negative_cents("newAmount", new_amount_cents)?;

        self.amount_change_history.push(AmountChange {
            previous_amount_cents: self.original_amount_cents,
            updated_amount_cents: new_amount_cents,
            change_date: Utc::now(),
            notes,
            changed_by,
        });
        self.original_amount_cents = new_amount_cents;
        self.recompute();
        Ok(())
    }

    /// Applies a payment and returns the amount actually applied.
    ///
    /// ## Flow
    /// ```text
    /// amount ≤ 0                       → reject
    /// rounded = round(amount)          → reject if rounded ≤ 0
    /// rounded > round(balance)         → reject (ledger untouched)
    /// balance − rounded < 0            → settle: balance 0, paid = original
    /// otherwise                        → paid += rounded
    /// ```
    pub fn pay(
        &mut self,
        amount_cents: i64,
        notes: Option<String>,
        created_by: Option<String>,
    ) -> CoreResult<i64> {
        if amount_cents <= 0 {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "payment must be greater than zero".to_string(),
            });
        }

        let rounded = Money::from_cents(amount_cents).round_to_whole_units();
        if !rounded.is_positive() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "payment rounds to zero".to_string(),
            });
        }

        let rounded_balance = self.balance().round_to_whole_units();
        if rounded > rounded_balance {
            return Err(CoreError::PaymentExceedsBalance {
                payment: rounded.cents(),
                balance: rounded_balance.cents(),
            });
        }

        let adjusted = self.balance() - rounded;
        let applied = if adjusted.is_negative() {
            let remaining = self.balance().cents();
            self.paid_amount_cents = self.original_amount_cents;
            remaining
        } else {
            self.paid_amount_cents += rounded.cents();
            rounded.cents()
        };

        self.payment_history.push(PaymentEntry {
            amount_cents: applied,
            payment_date: Utc::now(),
            notes,
            created_by,
        });
        self.recompute();

        Ok(applied)
    }
}

/// Aggregate totals over a set of ledgers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerTotals {
    pub count: u64,
    pub original_amount_cents: i64,
    pub paid_amount_cents: i64,
    pub balance_amount_cents: i64,
}

impl<'a> FromIterator<&'a Ledger> for LedgerTotals {
    fn from_iter<I: IntoIterator<Item = &'a Ledger>>(iter: I) -> Self {
        iter.into_iter().fold(LedgerTotals::default(), |mut acc, l| {
            acc.count += 1;
            acc.original_amount_cents = acc.original_amount_cents.saturating_add(l.original_amount_cents);
            acc.paid_amount_cents = acc.paid_amount_cents.saturating_add(l.paid_amount_cents);
            acc.balance_amount_cents = acc.balance_amount_cents.saturating_add(l.balance_amount_cents);
            acc
        })
    }
}

// =============================================================================
// Credit Documents
// =============================================================================

/// Amount owed to a supplier for one purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Credit {
    pub id: String,
    pub purchase_order_id: String,
    pub po_number: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub store_id: String,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub ledger: Ledger,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Amount owed by a customer for one bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerCredit {
    pub id: String,
    pub bill_id: String,
    pub bill_number: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub store_id: String,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub ledger: Ledger,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Fields shared by both credit create requests.
#[derive(Debug, Clone, Default)]
pub struct CreditTerms {
    pub amount_cents: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

impl Credit {
    pub fn new(
        purchase_order_id: &str,
        po_number: &str,
        supplier_id: &str,
        supplier_name: &str,
        store_id: &str,
        terms: CreditTerms,
    ) -> CoreResult<Self> {
        let now = Utc::now();
        Ok(Credit {
            id: Uuid::new_v4().to_string(),
            purchase_order_id: purchase_order_id.to_string(),
            po_number: po_number.to_string(),
            supplier_id: supplier_id.to_string(),
            supplier_name: supplier_name.to_string(),
            store_id: store_id.to_string(),
            due_date: terms.due_date,
            notes: terms.notes,
            ledger: Ledger::new(terms.amount_cents)?,
            created_by: terms.created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

impl CustomerCredit {
    pub fn new(
        bill_id: &str,
        bill_number: &str,
        customer_name: &str,
        customer_phone: Option<String>,
        store_id: &str,
        terms: CreditTerms,
    ) -> CoreResult<Self> {
        let now = Utc::now();
        Ok(CustomerCredit {
            id: Uuid::new_v4().to_string(),
            bill_id: bill_id.to_string(),
            bill_number: bill_number.to_string(),
            customer_name: customer_name.to_string(),
            customer_phone,
            store_id: store_id.to_string(),
            due_date: terms.due_date,
            notes: terms.notes,
            ledger: Ledger::new(terms.amount_cents)?,
            created_by: terms.created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
