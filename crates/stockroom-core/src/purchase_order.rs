//! # Purchase Orders
//!
//! Orders placed with a supplier, their totals and the receipt workflow.
//!
//! ## Status Machine
//! ```text
//!              receive (some lines outstanding)
//!   ┌─────────┐ ─────────────────────────────▶ ┌────────────────────┐
//!   │ pending │                                │ partially_received │◀──┐
//!   └─────────┘ ──┐                            └────────────────────┘ ──┘
//!        │        │ receive (all lines full)            │ receive (all full)
//!        │ cancel │                                     ▼
//!        ▼        └──────────────────────────────▶ ┌───────────┐
//!   ┌───────────┐                                  │ completed │
//!   │ cancelled │                                  └───────────┘
//!   └───────────┘
//! ```
//!
//! Cancelled and completed are terminal. Edits, cancellation and deletion
//! are only allowed while pending.
//!
//! ## Receipt
//! The order itself only records quantities and decides the next status.
//! [`PurchaseOrder::receive`] returns one [`ReceivedLine`] per line that took
//! stock; the database layer applies those to catalog items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    validate_line_count, validate_name, validate_non_negative_cents, validate_quantity,
    validate_sku,
};

/// Prefix shared by every purchase order number.
pub const PO_NUMBER_PREFIX: &str = "PO-";

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PurchaseOrderStatus {
    Pending,
    PartiallyReceived,
    Completed,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::PartiallyReceived => "partially_received",
            PurchaseOrderStatus::Completed => "completed",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PurchaseOrderStatus::Pending),
            "partially_received" => Some(PurchaseOrderStatus::PartiallyReceived),
            "completed" => Some(PurchaseOrderStatus::Completed),
            "cancelled" => Some(PurchaseOrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether stock may still be received against the order.
    pub fn can_receive(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Pending | PurchaseOrderStatus::PartiallyReceived
        )
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Numbering
// =============================================================================

/// Next purchase order number after the most recently created one.
///
/// ```rust
/// use stockroom_core::purchase_order::next_po_number;
///
/// assert_eq!(next_po_number(None), "PO-0001");
/// assert_eq!(next_po_number(Some("PO-0041")), "PO-0042");
/// assert_eq!(next_po_number(Some("legacy")), "PO-0001");
/// ```
pub fn next_po_number(last: Option<&str>) -> String {
    let next = last
        .and_then(|n| n.strip_prefix(PO_NUMBER_PREFIX))
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .map_or(1, |n| n + 1);
    format!("{}{:04}", PO_NUMBER_PREFIX, next)
}

// =============================================================================
// Lines
// =============================================================================

/// One ordered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseOrderItem {
    pub id: String,
    /// Catalog item the line was picked from, when known.
    pub item_id: Option<String>,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit: String,
    pub cost_price_cents: i64,
    pub line_total_cents: i64,
    #[serde(default)]
    pub received_quantity: i64,
    /// Number of receipts that delivered stock for this line.
    #[serde(default)]
    pub receipt_count: u32,
}

impl PurchaseOrderItem {
    pub fn outstanding(&self) -> i64 {
        (self.quantity - self.received_quantity).max(0)
    }

    pub fn is_fully_received(&self) -> bool {
        self.received_quantity >= self.quantity
    }
}

/// Input for one line on create or update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct PurchaseOrderLineInput {
    pub item_id: Option<String>,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit: String,
    pub cost_price_cents: i64,
}

impl PurchaseOrderLineInput {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_name("items.name", &self.name, 100)?;
        validate_sku(&self.sku)?;
        validate_quantity(self.quantity)?;
        validate_non_negative_cents("items.costPrice", self.cost_price_cents)?;
        Ok(())
    }

    fn into_line(self) -> PurchaseOrderItem {
        PurchaseOrderItem {
            id: Uuid::new_v4().to_string(),
            item_id: self.item_id,
            name: self.name.trim().to_string(),
            sku: self.sku.trim().to_string(),
            quantity: self.quantity,
            unit: if self.unit.trim().is_empty() {
                "pcs".to_string()
            } else {
                self.unit
            },
            cost_price_cents: self.cost_price_cents,
            line_total_cents: 0,
            received_quantity: 0,
            receipt_count: 0,
        }
    }
}

fn validate_lines(lines: &[PurchaseOrderLineInput]) -> Result<(), ValidationError> {
    validate_line_count(lines.len())?;
    lines.iter().try_for_each(PurchaseOrderLineInput::validate)
}

// =============================================================================
// Purchase Order
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    pub po_number: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub store_id: String,
    pub status: PurchaseOrderStatus,
    pub items: Vec<PurchaseOrderItem>,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub discount_cents: i64,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub expected_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub received_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Body of a create request. Supplier name is resolved by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct NewPurchaseOrder {
    pub supplier_id: String,
    pub items: Vec<PurchaseOrderLineInput>,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub discount_cents: i64,
    #[ts(as = "Option<String>")]
    pub expected_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Body of an update request; absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct PurchaseOrderUpdate {
    pub items: Option<Vec<PurchaseOrderLineInput>>,
    pub tax_cents: Option<i64>,
    pub shipping_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub expected_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// One receipt input line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceiptLine {
    pub sku: String,
    pub received_quantity: i64,
}

/// Stock that a receipt delivered for one order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReceivedLine {
    /// 1-based position on the order.
    pub line_number: usize,
    pub item_id: Option<String>,
    pub sku: String,
    pub quantity: i64,
    pub cost_price_cents: i64,
    pub batch_number: String,
}

impl PurchaseOrder {
    /// Builds a pending order with computed totals.
    pub fn new(
        po_number: String,
        store_id: &str,
        supplier_name: String,
        input: NewPurchaseOrder,
        created_by: Option<String>,
    ) -> CoreResult<Self> {
        if input.supplier_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "supplierId".to_string(),
            }
            .into());
        }
        validate_lines(&input.items)?;
        validate_charges(input.tax_cents, input.shipping_cents, input.discount_cents)?;

        let now = Utc::now();
        let mut order = PurchaseOrder {
            id: Uuid::new_v4().to_string(),
            po_number,
            supplier_id: input.supplier_id,
            supplier_name,
            store_id: store_id.to_string(),
            status: PurchaseOrderStatus::Pending,
            items: input
                .items
                .into_iter()
                .map(PurchaseOrderLineInput::into_line)
                .collect(),
            tax_cents: input.tax_cents,
            shipping_cents: input.shipping_cents,
            discount_cents: input.discount_cents,
            subtotal_cents: 0,
            total_cents: 0,
            order_date: now,
            expected_date: input.expected_date,
            received_date: None,
            notes: input.notes,
            created_by,
            created_at: now,
            updated_at: now,
        };
        order.recalculate_totals()?;

        Ok(order)
    }

    /// `lineTotal = qty × cost`, `subtotal = Σ lineTotal`,
    /// `total = max(subtotal + tax + shipping − discount, 0)`.
    pub fn recalculate_totals(&mut self) -> CoreResult<()> {
        for line in &mut self.items {
            line.line_total_cents = Money::from_cents(line.cost_price_cents)
                .checked_multiply_quantity(line.quantity, "items.lineTotal")?
                .cents();
        }

        let subtotal = Money::checked_sum(
            self.items.iter().map(|l| Money::from_cents(l.line_total_cents)),
            "subtotal",
        )?
        .ensure_within_limit("subtotal")?;
        let total = subtotal
            .checked_add(Money::from_cents(self.tax_cents), "total")?
            .checked_add(Money::from_cents(self.shipping_cents), "total")?
            .checked_sub(Money::from_cents(self.discount_cents), "total")?
            .ensure_within_limit("total")?;

        self.subtotal_cents = subtotal.cents();
        self.total_cents = total.floor_at_zero().cents();
        Ok(())
    }

    fn ensure_pending(&self, action: &str) -> CoreResult<()> {
        if self.status == PurchaseOrderStatus::Pending {
            Ok(())
        } else {
            Err(self.invalid_status(action))
        }
    }

    fn invalid_status(&self, action: &str) -> CoreError {
        CoreError::InvalidOrderStatus {
            po_number: self.po_number.clone(),
            current_status: self.status.to_string(),
            action: action.to_string(),
        }
    }

    pub fn ensure_deletable(&self) -> CoreResult<()> {
        self.ensure_pending("delete")
    }

    /// Applies an edit to a pending order and recomputes totals.
    pub fn apply_update(&mut self, update: PurchaseOrderUpdate) -> CoreResult<()> {
        self.ensure_pending("update")?;

        if let Some(lines) = &update.items {
            validate_lines(lines)?;
        }
        validate_charges(
            update.tax_cents.unwrap_or(self.tax_cents),
            update.shipping_cents.unwrap_or(self.shipping_cents),
            update.discount_cents.unwrap_or(self.discount_cents),
        )?;

        let mut next = self.clone();
        if let Some(lines) = update.items {
            next.items = lines.into_iter().map(PurchaseOrderLineInput::into_line).collect();
        }
        if let Some(tax) = update.tax_cents {
            next.tax_cents = tax;
        }
        if let Some(shipping) = update.shipping_cents {
            next.shipping_cents = shipping;
        }
        if let Some(discount) = update.discount_cents {
            next.discount_cents = discount;
        }
        if update.expected_date.is_some() {
            next.expected_date = update.expected_date;
        }
        if update.notes.is_some() {
            next.notes = update.notes;
        }

        next.recalculate_totals()?;
        next.updated_at = Utc::now();
        *self = next;
        Ok(())
    }

    pub fn cancel(&mut self) -> CoreResult<()> {
        self.ensure_pending("cancel")?;
        self.status = PurchaseOrderStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records received quantities and advances the status.
    ///
    /// All receipt lines are checked before anything changes: an unknown SKU,
    /// a negative quantity or a quantity above what is outstanding rejects
    /// the whole receipt.
    ///
    /// ## Returns
    /// One [`ReceivedLine`] per order line that took stock, carrying the
    /// batch number `<poNumber>-<line#>` (suffixed with the receipt
    /// sequence on later partial receipts).
    pub fn receive(&mut self, receipt: &[ReceiptLine]) -> CoreResult<Vec<ReceivedLine>> {
        if !self.status.can_receive() {
            return Err(self.invalid_status("receive"));
        }

        let mut lines = self.items.clone();
        let mut delivered = vec![0i64; lines.len()];

        for entry in receipt {
            if entry.received_quantity < 0 {
                return Err(ValidationError::Negative {
                    field: "receivedQuantity".to_string(),
                }
                .into());
            }
            if entry.received_quantity == 0 {
                continue;
            }

            let sku = entry.sku.trim();
            let matching: Vec<usize> = lines
                .iter()
                .enumerate()
                .filter(|(_, line)| line.sku.eq_ignore_ascii_case(sku))
                .map(|(i, _)| i)
                .collect();
            if matching.is_empty() {
                return Err(CoreError::SkuNotOnOrder(sku.to_string()));
            }

            // A SKU ordered on several lines fills them in order.
            let outstanding: i64 = matching.iter().map(|&i| lines[i].outstanding()).sum();
            if entry.received_quantity > outstanding {
                return Err(CoreError::ReceiptExceedsOrdered {
                    sku: sku.to_string(),
                    outstanding,
                    received: entry.received_quantity,
                });
            }

            let mut remaining = entry.received_quantity;
            for index in matching {
                let take = remaining.min(lines[index].outstanding());
                if take > 0 {
                    lines[index].received_quantity += take;
                    delivered[index] += take;
                    remaining -= take;
                }
            }
        }

        if delivered.iter().all(|q| *q == 0) {
            return Err(CoreError::NothingToReceive);
        }

        let mut received = Vec::new();
        for (index, line) in lines.iter_mut().enumerate() {
            let quantity = delivered[index];
            if quantity == 0 {
                continue;
            }
            line.receipt_count += 1;

            let line_number = index + 1;
            let batch_number = if line.receipt_count == 1 {
                format!("{}-{}", self.po_number, line_number)
            } else {
                format!("{}-{}-{}", self.po_number, line_number, line.receipt_count)
            };

            received.push(ReceivedLine {
                line_number,
                item_id: line.item_id.clone(),
                sku: line.sku.clone(),
                quantity,
                cost_price_cents: line.cost_price_cents,
                batch_number,
            });
        }

        let now = Utc::now();
        self.items = lines;
        self.status = if self.items.iter().all(PurchaseOrderItem::is_fully_received) {
            PurchaseOrderStatus::Completed
        } else {
            PurchaseOrderStatus::PartiallyReceived
        };
        self.received_date = Some(now);
        self.updated_at = now;

        Ok(received)
    }

    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

fn validate_charges(tax: i64, shipping: i64, discount: i64) -> Result<(), ValidationError> {
    validate_non_negative_cents("tax", tax)?;
    validate_non_negative_cents("shipping", shipping)?;
    validate_non_negative_cents("discount", discount)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(sku: &str, quantity: i64, cost: i64) -> PurchaseOrderLineInput {
        PurchaseOrderLineInput {
            item_id: None,
            name: format!("Item {}", sku),
            sku: sku.to_string(),
            quantity,
            unit: "pcs".to_string(),
            cost_price_cents: cost,
        }
    }

    fn order(lines: Vec<PurchaseOrderLineInput>) -> PurchaseOrder {
        PurchaseOrder::new(
            "PO-0001".to_string(),
            "store-1",
            "Acme".to_string(),
            NewPurchaseOrder {
                supplier_id: "sup-1".to_string(),
                items: lines,
                ..NewPurchaseOrder::default()
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_next_po_number() {
        assert_eq!(next_po_number(None), "PO-0001");
        assert_eq!(next_po_number(Some("PO-0009")), "PO-0010");
        assert_eq!(next_po_number(Some("PO-9999")), "PO-10000");
        assert_eq!(next_po_number(Some("PO-abc")), "PO-0001");
    }

    #[test]
    fn test_totals_ten_by_five() {
        let po = order(vec![line("COLA1", 10, 500)]);
        assert_eq!(po.subtotal_cents, 5000);
        assert_eq!(po.total_cents, 5000);
        assert_eq!(po.items[0].line_total_cents, 5000);
        assert_eq!(po.status, PurchaseOrderStatus::Pending);
    }

    #[test]
    fn test_total_floors_at_zero() {
        let mut po = order(vec![line("A", 1, 1000)]);
        po.apply_update(PurchaseOrderUpdate {
            tax_cents: Some(100),
            shipping_cents: Some(200),
            discount_cents: Some(5000),
            ..PurchaseOrderUpdate::default()
        })
        .unwrap();
        assert_eq!(po.subtotal_cents, 1000);
        assert_eq!(po.total_cents, 0);

        po.apply_update(PurchaseOrderUpdate {
            discount_cents: Some(300),
            ..PurchaseOrderUpdate::default()
        })
        .unwrap();
        assert_eq!(po.total_cents, 1000);
    }

    #[test]
    fn test_create_rejects_bad_lines() {
        let result = PurchaseOrder::new(
            "PO-0001".to_string(),
            "store-1",
            "Acme".to_string(),
            NewPurchaseOrder {
                supplier_id: "sup-1".to_string(),
                items: vec![line("A", 0, 100)],
                ..NewPurchaseOrder::default()
            },
            None,
        );
        assert!(matches!(result, Err(CoreError::Validation(_))));

        let result = PurchaseOrder::new(
            "PO-0001".to_string(),
            "store-1",
            "Acme".to_string(),
            NewPurchaseOrder {
                supplier_id: "sup-1".to_string(),
                ..NewPurchaseOrder::default()
            },
            None,
        );
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_oversized_amounts_are_rejected() {
        let result = PurchaseOrder::new(
            "PO-0001".to_string(),
            "store-1",
            "Acme".to_string(),
            NewPurchaseOrder {
                supplier_id: "sup-1".to_string(),
                items: vec![line("A", 2, i64::MAX / 2 + 1)],
                ..NewPurchaseOrder::default()
            },
            None,
        );
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        // Every line within limits, the sum beyond them.
        let max_lines: Vec<_> = (0..crate::MAX_ORDER_LINES)
            .map(|i| line(&format!("SKU{}", i), crate::MAX_LINE_QUANTITY, crate::MAX_AMOUNT_CENTS))
            .collect();
        let result = PurchaseOrder::new(
            "PO-0001".to_string(),
            "store-1",
            "Acme".to_string(),
            NewPurchaseOrder {
                supplier_id: "sup-1".to_string(),
                items: max_lines,
                ..NewPurchaseOrder::default()
            },
            None,
        );
        assert!(matches!(
            result,
            Err(CoreError::AmountOutOfRange { field }) if field == "subtotal"
        ));

        let mut po = order(vec![line("A", 1, crate::MAX_AMOUNT_CENTS)]);
        assert_eq!(po.total_cents, crate::MAX_AMOUNT_CENTS);
        let before = po.clone();
        let shipping = po.apply_update(PurchaseOrderUpdate {
            shipping_cents: Some(1),
            ..PurchaseOrderUpdate::default()
        });
        assert!(matches!(
            shipping,
            Err(CoreError::AmountOutOfRange { field }) if field == "total"
        ));
        assert_eq!(po, before);

        let update = po.apply_update(PurchaseOrderUpdate {
            tax_cents: Some(i64::MAX),
            ..PurchaseOrderUpdate::default()
        });
        assert!(update.is_err());
        assert_eq!(po, before);
    }

    #[test]
    fn test_receipt_spans_lines_with_same_sku() {
        let mut po = order(vec![line("A", 3, 100), line("B", 1, 100), line("A", 4, 120)]);

        let received = po
            .receive(&[ReceiptLine {
                sku: "A".to_string(),
                received_quantity: 5,
            }])
            .unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!((received[0].line_number, received[0].quantity), (1, 3));
        assert_eq!((received[1].line_number, received[1].quantity), (3, 2));
        assert_eq!(received[1].cost_price_cents, 120);
        assert_eq!(po.items[2].outstanding(), 2);

        let over = po.receive(&[ReceiptLine {
            sku: "a".to_string(),
            received_quantity: 3,
        }]);
        assert!(matches!(
            over,
            Err(CoreError::ReceiptExceedsOrdered { outstanding: 2, .. })
        ));
    }

    #[test]
    fn test_full_receipt_completes() {
        let mut po = order(vec![line("COLA1", 10, 500)]);
        let received = po
            .receive(&[ReceiptLine {
                sku: "COLA1".to_string(),
                received_quantity: 10,
            }])
            .unwrap();

        assert_eq!(received.len(), 1);
        assert_eq!(received[0].quantity, 10);
        assert_eq!(received[0].cost_price_cents, 500);
        assert_eq!(received[0].batch_number, "PO-0001-1");
        assert_eq!(po.status, PurchaseOrderStatus::Completed);
        assert!(po.received_date.is_some());

        let again = po.receive(&[ReceiptLine {
            sku: "COLA1".to_string(),
            received_quantity: 1,
        }]);
        assert!(matches!(again, Err(CoreError::InvalidOrderStatus { .. })));
    }

    #[test]
    fn test_partial_receipts() {
        let mut po = order(vec![line("A", 10, 100), line("B", 5, 200)]);

        po.receive(&[ReceiptLine {
            sku: "A".to_string(),
            received_quantity: 4,
        }])
        .unwrap();
        assert_eq!(po.status, PurchaseOrderStatus::PartiallyReceived);
        assert_eq!(po.items[0].outstanding(), 6);

        let received = po
            .receive(&[
                ReceiptLine {
                    sku: "A".to_string(),
                    received_quantity: 6,
                },
                ReceiptLine {
                    sku: "B".to_string(),
                    received_quantity: 5,
                },
            ])
            .unwrap();
        assert_eq!(received[0].batch_number, "PO-0001-1-2");
        assert_eq!(received[1].batch_number, "PO-0001-2");
        assert_eq!(po.status, PurchaseOrderStatus::Completed);
    }

    #[test]
    fn test_receipt_rejections_leave_order_untouched() {
        let mut po = order(vec![line("A", 10, 100)]);
        let before = po.clone();

        let over = po.receive(&[ReceiptLine {
            sku: "A".to_string(),
            received_quantity: 11,
        }]);
        assert!(matches!(over, Err(CoreError::ReceiptExceedsOrdered { .. })));

        let unknown = po.receive(&[ReceiptLine {
            sku: "Z".to_string(),
            received_quantity: 1,
        }]);
        assert!(matches!(unknown, Err(CoreError::SkuNotOnOrder(_))));

        let nothing = po.receive(&[ReceiptLine {
            sku: "A".to_string(),
            received_quantity: 0,
        }]);
        assert!(matches!(nothing, Err(CoreError::NothingToReceive)));

        assert_eq!(po, before);
    }

    #[test]
    fn test_cancel_and_delete_only_while_pending() {
        let mut po = order(vec![line("A", 2, 100)]);
        po.receive(&[ReceiptLine {
            sku: "A".to_string(),
            received_quantity: 1,
        }])
        .unwrap();

        assert!(po.ensure_deletable().is_err());
        assert!(po.cancel().is_err());
        assert!(po.apply_update(PurchaseOrderUpdate::default()).is_err());

        let mut fresh = order(vec![line("A", 2, 100)]);
        assert!(fresh.ensure_deletable().is_ok());
        fresh.cancel().unwrap();
        assert_eq!(fresh.status, PurchaseOrderStatus::Cancelled);
        assert!(fresh.cancel().is_err());
        assert!(fresh
            .receive(&[ReceiptLine {
                sku: "A".to_string(),
                received_quantity: 1
            }])
            .is_err());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&PurchaseOrderStatus::PartiallyReceived).unwrap(),
            "\"partially_received\""
        );
        assert_eq!(
            PurchaseOrderStatus::parse("cancelled"),
            Some(PurchaseOrderStatus::Cancelled)
        );
    }
}
