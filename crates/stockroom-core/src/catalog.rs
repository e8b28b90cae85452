//! # Catalog Aggregate
//!
//! One persisted document per top-level category. Everything beneath it
//! (subcategories, items, stock batches) lives inside that document and is
//! saved as a unit.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Category "Beverages" (slug: beverages, store: S1)                     │
//! │  ├── items[]                 ← items attached directly to the category │
//! │  └── subcategories[]                                                   │
//! │      └── Subcategory "Soda"                                            │
//! │          └── items[]                                                   │
//! │              └── Item "Cola" (sku COLA1, stock 10)                     │
//! │                  ├── images[]   (at most one primary)                  │
//! │                  └── batches[]  (created by PO receipt, never removed) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Category names are unique per store, subcategory names per category
//!   (both case-insensitive).
//! - A category can only be deleted when it has no subcategories and no
//!   items anywhere beneath it.
//! - `stock`, `price`, `cost`, batch quantities are never negative.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::MAX_STOCK_LEVEL;
use crate::validation::{
    validate_barcode, validate_name, validate_non_negative_cents, validate_sku,
    validate_stock_level,
};

/// Maximum length of category, subcategory and item names.
pub const MAX_NAME_LEN: usize = 100;

// =============================================================================
// Slugs
// =============================================================================

/// Derives a URL slug from a display name.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single hyphen and trims hyphens from both ends.
///
/// ```rust
/// use stockroom_core::catalog::slugify;
///
/// assert_eq!(slugify("Fresh Milk & Dairy!"), "fresh-milk-dairy");
/// assert_eq!(slugify("  --Soft   Drinks--"), "soft-drinks");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Case-insensitive, whitespace-trimmed name comparison.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

// =============================================================================
// Store Reference
// =============================================================================

/// The store an operation acts in, stamped onto new items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoreRef {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Stock Status
// =============================================================================

/// Stock classification derived from `stock`, `minStock` and `maxStock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    Overstock,
    InStock,
}

impl StockStatus {
    /// Parses the wire form (`out-of-stock`, `low-stock`, ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "out-of-stock" => Some(StockStatus::OutOfStock),
            "low-stock" => Some(StockStatus::LowStock),
            "overstock" => Some(StockStatus::Overstock),
            "in-stock" => Some(StockStatus::InStock),
            _ => None,
        }
    }
}

// =============================================================================
// Images and Batches
// =============================================================================

/// An item image. `url` is either a static path or, on the way in,
/// a `data:` URI that the API layer persists before merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ItemImage {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

impl ItemImage {
    /// Whether the url carries inline image bytes.
    pub fn is_data_uri(&self) -> bool {
        self.url.starts_with("data:")
    }
}

/// Keeps the first primary image and demotes every later one.
pub fn normalize_primary_images(images: &mut [ItemImage]) {
    let mut seen_primary = false;
    for image in images.iter_mut() {
        if image.is_primary {
            if seen_primary {
                image.is_primary = false;
            }
            seen_primary = true;
        }
    }
}

/// A dated lot of stock for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Batch {
    pub batch_number: String,
    pub quantity: i64,
    pub cost_price_cents: i64,
    pub purchase_order_number: Option<String>,
    #[ts(as = "String")]
    pub purchase_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

// =============================================================================
// Item
// =============================================================================

/// A stocked item, embedded in a subcategory or directly in a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub stock: i64,
    pub min_stock: i64,
    pub max_stock: Option<i64>,
    pub unit: String,
    pub barcode: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<ItemImage>,
    pub batches: Vec<Batch>,
    pub is_active: bool,
    pub store_id: String,
    pub store_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Sum of quantities over active batches.
    pub fn calculated_stock(&self) -> i64 {
        self.batches
            .iter()
            .filter(|b| b.is_active)
            .fold(0i64, |acc, b| acc.saturating_add(b.quantity))
    }

    /// Classifies current stock against the item's thresholds.
    ///
    /// ```text
    /// stock == 0              → out-of-stock
    /// stock <= minStock       → low-stock
    /// stock >= maxStock (set) → overstock
    /// otherwise               → in-stock
    /// ```
    pub fn stock_status(&self) -> StockStatus {
        if self.stock <= 0 {
            StockStatus::OutOfStock
        } else if self.stock <= self.min_stock {
            StockStatus::LowStock
        } else if self.max_stock.is_some_and(|max| self.stock >= max) {
            StockStatus::Overstock
        } else {
            StockStatus::InStock
        }
    }

    /// `(price − cost) / cost × 100`, only when cost is positive.
    pub fn profit_margin(&self) -> Option<f64> {
        if self.cost_cents <= 0 {
            return None;
        }
        let margin = (self.price_cents - self.cost_cents) as f64 / self.cost_cents as f64 * 100.0;
        Some((margin * 100.0).round() / 100.0)
    }

    /// Stock value at cost.
    pub fn inventory_value(&self) -> Money {
        self.cost().saturating_multiply_quantity(self.stock)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Input for a new item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct NewItem {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub stock: i64,
    pub min_stock: i64,
    pub max_stock: Option<i64>,
    pub unit: String,
    pub barcode: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<ItemImage>,
}

impl NewItem {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name, MAX_NAME_LEN)?;
        validate_sku(&self.sku)?;
        validate_non_negative_cents("price", self.price_cents)?;
        validate_non_negative_cents("cost", self.cost_cents)?;
        validate_stock_level("stock", self.stock)?;
        validate_stock_level("minStock", self.min_stock)?;
        if let Some(max) = self.max_stock {
            validate_stock_level("maxStock", max)?;
        }
        if let Some(barcode) = non_blank(&self.barcode) {
            validate_barcode(barcode)?;
        }
        Ok(())
    }

    fn into_item(self, store: &StoreRef) -> Item {
        let now = Utc::now();
        let mut images = self.images;
        normalize_primary_images(&mut images);

        Item {
            id: Uuid::new_v4().to_string(),
            name: self.name.trim().to_string(),
            sku: self.sku.trim().to_string(),
            description: self.description,
            price_cents: self.price_cents,
            cost_cents: self.cost_cents,
            stock: self.stock,
            min_stock: self.min_stock,
            max_stock: self.max_stock,
            unit: if self.unit.trim().is_empty() {
                "pcs".to_string()
            } else {
                self.unit.trim().to_string()
            },
            barcode: non_blank(&self.barcode).map(str::to_string),
            tags: self.tags,
            images,
            batches: Vec::new(),
            is_active: true,
            store_id: store.id.clone(),
            store_name: store.name.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update merged into an existing item. Absent fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub unit: Option<String>,
    pub barcode: Option<String>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<ItemImage>>,
    pub is_active: Option<bool>,
}

impl ItemPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name("name", name, MAX_NAME_LEN)?;
        }
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        if let Some(price) = self.price_cents {
            validate_non_negative_cents("price", price)?;
        }
        if let Some(cost) = self.cost_cents {
            validate_non_negative_cents("cost", cost)?;
        }
        if let Some(stock) = self.stock {
            validate_stock_level("stock", stock)?;
        }
        if let Some(min) = self.min_stock {
            validate_stock_level("minStock", min)?;
        }
        if let Some(max) = self.max_stock {
            validate_stock_level("maxStock", max)?;
        }
        if let Some(barcode) = non_blank(&self.barcode) {
            validate_barcode(barcode)?;
        }
        Ok(())
    }

    fn apply(self, item: &mut Item) {
        if let Some(name) = self.name {
            item.name = name.trim().to_string();
        }
        if let Some(sku) = self.sku {
            item.sku = sku.trim().to_string();
        }
        if let Some(description) = self.description {
            item.description = Some(description);
        }
        if let Some(price) = self.price_cents {
            item.price_cents = price;
        }
        if let Some(cost) = self.cost_cents {
            item.cost_cents = cost;
        }
        if let Some(stock) = self.stock {
            item.stock = stock;
        }
        if let Some(min) = self.min_stock {
            item.min_stock = min;
        }
        if let Some(max) = self.max_stock {
            item.max_stock = Some(max);
        }
        if let Some(unit) = self.unit {
            item.unit = unit;
        }
        if let Some(barcode) = self.barcode {
            // An empty string clears the barcode
            item.barcode = Some(barcode.trim().to_string()).filter(|b| !b.is_empty());
        }
        if let Some(tags) = self.tags {
            item.tags = tags;
        }
        if let Some(mut images) = self.images {
            normalize_primary_images(&mut images);
            item.images = images;
        }
        if let Some(active) = self.is_active {
            item.is_active = active;
        }
        item.touch();
    }
}

/// Stock arriving from a purchase order receipt.
#[derive(Debug, Clone)]
pub struct StockReceipt {
    pub quantity: i64,
    pub cost_price_cents: i64,
    pub batch_number: String,
    pub purchase_order_number: String,
}

// =============================================================================
// Subcategory
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Subcategory {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub items: Vec<Item>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Category
// =============================================================================

/// Root catalog aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub store_id: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub subcategories: Vec<Subcategory>,
    /// Items attached directly to the category.
    #[serde(default)]
    pub items: Vec<Item>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Where an item sits inside its category.
#[derive(Debug, Clone, Copy)]
pub struct ItemLocation<'a> {
    pub subcategory: Option<&'a Subcategory>,
    pub item: &'a Item,
}

impl Category {
    /// Creates an empty category for a store.
    pub fn new(
        name: &str,
        description: Option<String>,
        store_id: &str,
        created_by: Option<String>,
    ) -> CoreResult<Self> {
        validate_name("name", name, MAX_NAME_LEN)?;

        let now = Utc::now();
        Ok(Category {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            slug: slugify(name),
            description,
            is_active: true,
            store_id: store_id.to_string(),
            created_by: created_by.clone(),
            updated_by: created_by,
            subcategories: Vec::new(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Renames the category and re-derives its slug.
    pub fn rename(&mut self, name: &str) -> CoreResult<()> {
        validate_name("name", name, MAX_NAME_LEN)?;
        self.name = name.trim().to_string();
        self.slug = slugify(name);
        Ok(())
    }

    /// Applies a category-level edit. A new name re-derives the slug.
    pub fn apply_patch(&mut self, patch: CategoryPatch) -> CoreResult<()> {
        if let Some(name) = patch.name.as_deref() {
            self.rename(name)?;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        Ok(())
    }

    /// Records who touched the aggregate last.
    pub fn touch(&mut self, updated_by: Option<&str>) {
        self.updated_at = Utc::now();
        if let Some(user) = updated_by {
            self.updated_by = Some(user.to_string());
        }
    }

    // -------------------------------------------------------------------------
    // Counts and deletion guard
    // -------------------------------------------------------------------------

    pub fn subcategory_count(&self) -> usize {
        self.subcategories.len()
    }

    /// Items directly on the category plus items in every subcategory.
    pub fn total_item_count(&self) -> usize {
        self.items.len()
            + self
                .subcategories
                .iter()
                .map(|s| s.items.len())
                .sum::<usize>()
    }

    pub fn can_delete(&self) -> bool {
        self.total_item_count() == 0 && self.subcategory_count() == 0
    }

    pub fn ensure_deletable(&self) -> CoreResult<()> {
        if self.can_delete() {
            Ok(())
        } else {
            Err(CoreError::CategoryNotEmpty {
                subcategories: self.subcategory_count(),
                items: self.total_item_count(),
            })
        }
    }

    // -------------------------------------------------------------------------
    // Subcategories
    // -------------------------------------------------------------------------

    pub fn subcategory(&self, subcategory_id: &str) -> Option<&Subcategory> {
        self.subcategories.iter().find(|s| s.id == subcategory_id)
    }

    fn ensure_unique_subcategory_name(&self, name: &str, except_id: Option<&str>) -> CoreResult<()> {
        let clash = self
            .subcategories
            .iter()
            .any(|s| Some(s.id.as_str()) != except_id && names_match(&s.name, name));
        if clash {
            return Err(CoreError::DuplicateName {
                entity: "Subcategory".to_string(),
                name: name.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Appends a subcategory; names are unique within the category.
    pub fn add_subcategory(&mut self, name: &str, description: Option<String>) -> CoreResult<&Subcategory> {
        validate_name("name", name, MAX_NAME_LEN)?;
        self.ensure_unique_subcategory_name(name, None)?;

        let now = Utc::now();
        self.subcategories.push(Subcategory {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            slug: slugify(name),
            description,
            is_active: true,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        });

        Ok(&self.subcategories[self.subcategories.len() - 1])
    }

    pub fn update_subcategory(
        &mut self,
        subcategory_id: &str,
        name: Option<&str>,
        description: Option<String>,
        is_active: Option<bool>,
    ) -> CoreResult<&Subcategory> {
        if let Some(name) = name {
            validate_name("name", name, MAX_NAME_LEN)?;
            self.ensure_unique_subcategory_name(name, Some(subcategory_id))?;
        }

        let sub = self
            .subcategories
            .iter_mut()
            .find(|s| s.id == subcategory_id)
            .ok_or_else(|| CoreError::SubcategoryNotFound(subcategory_id.to_string()))?;

        if let Some(name) = name {
            sub.name = name.trim().to_string();
            sub.slug = slugify(name);
        }
        if description.is_some() {
            sub.description = description;
        }
        if let Some(active) = is_active {
            sub.is_active = active;
        }
        sub.updated_at = Utc::now();

        Ok(sub)
    }

    /// Removes an empty subcategory.
    pub fn remove_subcategory(&mut self, subcategory_id: &str) -> CoreResult<Subcategory> {
        let index = self
            .subcategories
            .iter()
            .position(|s| s.id == subcategory_id)
            .ok_or_else(|| CoreError::SubcategoryNotFound(subcategory_id.to_string()))?;

        let items = self.subcategories[index].items.len();
        if items > 0 {
            return Err(CoreError::SubcategoryNotEmpty { items });
        }

        Ok(self.subcategories.remove(index))
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    /// Adds an item to a subcategory, or to the category itself when
    /// `subcategory_id` is `None`.
    ///
    /// The acting store must be known; the item is stamped with it.
    pub fn add_item(
        &mut self,
        subcategory_id: Option<&str>,
        new_item: NewItem,
        store: Option<&StoreRef>,
    ) -> CoreResult<&Item> {
        let store = store.ok_or(CoreError::NoStoreSelected)?;
        new_item.validate()?;

        if self.find_item_by_sku(new_item.sku.trim()).is_some() {
            return Err(ValidationError::Duplicate {
                field: "sku".to_string(),
                value: new_item.sku.trim().to_string(),
            }
            .into());
        }

        let item = new_item.into_item(store);
        let list = match subcategory_id {
            Some(sub_id) => {
                &mut self
                    .subcategories
                    .iter_mut()
                    .find(|s| s.id == sub_id)
                    .ok_or_else(|| CoreError::SubcategoryNotFound(sub_id.to_string()))?
                    .items
            }
            None => &mut self.items,
        };

        list.push(item);
        Ok(&list[list.len() - 1])
    }

    /// Every item with its location, category-level items first.
    pub fn item_locations(&self) -> impl Iterator<Item = ItemLocation<'_>> {
        self.items
            .iter()
            .map(|item| ItemLocation {
                subcategory: None,
                item,
            })
            .chain(self.subcategories.iter().flat_map(|sub| {
                sub.items.iter().map(move |item| ItemLocation {
                    subcategory: Some(sub),
                    item,
                })
            }))
    }

    pub fn find_item(&self, item_id: &str) -> Option<ItemLocation<'_>> {
        self.item_locations().find(|loc| loc.item.id == item_id)
    }

    pub fn find_item_by_sku(&self, sku: &str) -> Option<&Item> {
        self.item_locations()
            .map(|loc| loc.item)
            .find(|item| item.sku.eq_ignore_ascii_case(sku))
    }

    fn item_mut(&mut self, item_id: &str) -> CoreResult<&mut Item> {
        self.items
            .iter_mut()
            .chain(self.subcategories.iter_mut().flat_map(|s| s.items.iter_mut()))
            .find(|item| item.id == item_id)
            .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))
    }

    /// Merges a patch into an embedded item.
    ///
    /// Image data URIs must already have been replaced with static paths.
    pub fn update_item(&mut self, item_id: &str, patch: ItemPatch) -> CoreResult<&Item> {
        patch.validate()?;

        if let Some(sku) = patch.sku.as_deref() {
            let clash = self
                .item_locations()
                .any(|loc| loc.item.id != item_id && loc.item.sku.eq_ignore_ascii_case(sku.trim()));
            if clash {
                return Err(ValidationError::Duplicate {
                    field: "sku".to_string(),
                    value: sku.trim().to_string(),
                }
                .into());
            }
        }

        let item = self.item_mut(item_id)?;
        patch.apply(item);
        Ok(item)
    }

    pub fn remove_item(&mut self, item_id: &str) -> CoreResult<Item> {
        if let Some(index) = self.items.iter().position(|i| i.id == item_id) {
            return Ok(self.items.remove(index));
        }
        for sub in &mut self.subcategories {
            if let Some(index) = sub.items.iter().position(|i| i.id == item_id) {
                return Ok(sub.items.remove(index));
            }
        }
        Err(CoreError::ItemNotFound(item_id.to_string()))
    }

    /// Applies received purchase-order stock to an item.
    ///
    /// Increments stock, overwrites cost with the PO line's cost and
    /// appends an active batch.
    pub fn receive_stock(&mut self, item_id: &str, receipt: StockReceipt) -> CoreResult<&Item> {
        let item = self.item_mut(item_id)?;

        let stock = item
            .stock
            .checked_add(receipt.quantity)
            .filter(|stock| *stock <= MAX_STOCK_LEVEL)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "stock".to_string(),
                min: 0,
                max: MAX_STOCK_LEVEL,
            })?;

        item.stock = stock;
        item.cost_cents = receipt.cost_price_cents;
        item.batches.push(Batch {
            batch_number: receipt.batch_number,
            quantity: receipt.quantity,
            cost_price_cents: receipt.cost_price_cents,
            purchase_order_number: Some(receipt.purchase_order_number),
            purchase_date: Utc::now(),
            expiry_date: None,
            is_active: true,
        });
        item.touch();

        Ok(item)
    }

    /// Removes sold quantity from an item's stock.
    pub fn deduct_stock(&mut self, item_id: &str, quantity: i64) -> CoreResult<&Item> {
        let item = self.item_mut(item_id)?;

        if item.stock < quantity {
            return Err(CoreError::InsufficientStock {
                sku: item.sku.clone(),
                available: item.stock,
                requested: quantity,
            });
        }

        item.stock -= quantity;
        item.touch();
        Ok(item)
    }

    /// Deactivates a batch. Batches are never removed.
    pub fn deactivate_batch(&mut self, item_id: &str, batch_number: &str) -> CoreResult<&Item> {
        let item = self.item_mut(item_id)?;

        let batch = item
            .batches
            .iter_mut()
            .find(|b| b.batch_number == batch_number)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "batchNumber".to_string(),
                reason: format!("no batch {} on item", batch_number),
            })?;
        batch.is_active = false;
        item.touch();

        Ok(item)
    }

    /// Re-establishes per-save invariants (slug, single primary image).
    pub fn normalize(&mut self) {
        self.slug = slugify(&self.name);
        for sub in &mut self.subcategories {
            sub.slug = slugify(&sub.name);
        }
        for item in self
            .items
            .iter_mut()
            .chain(self.subcategories.iter_mut().flat_map(|s| s.items.iter_mut()))
        {
            normalize_primary_images(&mut item.images);
        }
    }

    /// Flattened read model of every item in the category.
    pub fn item_views(&self) -> Vec<ItemView> {
        self.item_locations()
            .map(|loc| ItemView::new(self, loc.subcategory, loc.item))
            .collect()
    }
}

/// Partial update of category-level fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Read Models
// =============================================================================

/// Item plus derived values and its position in the catalog.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub calculated_stock: i64,
    pub stock_status: StockStatus,
    pub profit_margin: Option<f64>,
    pub category_id: String,
    pub category_name: String,
    pub subcategory_id: Option<String>,
    pub subcategory_name: Option<String>,
}

impl ItemView {
    pub fn new(category: &Category, subcategory: Option<&Subcategory>, item: &Item) -> Self {
        ItemView {
            calculated_stock: item.calculated_stock(),
            stock_status: item.stock_status(),
            profit_margin: item.profit_margin(),
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            subcategory_id: subcategory.map(|s| s.id.clone()),
            subcategory_name: subcategory.map(|s| s.name.clone()),
            item: item.clone(),
        }
    }
}

/// Category plus its counts, as returned by listings.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: Category,
    pub subcategory_count: usize,
    pub total_item_count: usize,
    pub can_delete: bool,
}

impl From<Category> for CategorySummary {
    fn from(category: Category) -> Self {
        CategorySummary {
            subcategory_count: category.subcategory_count(),
            total_item_count: category.total_item_count(),
            can_delete: category.can_delete(),
            category,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StoreRef {
        StoreRef {
            id: "store-1".to_string(),
            name: "Main Street".to_string(),
        }
    }

    fn cola() -> NewItem {
        NewItem {
            name: "Cola".to_string(),
            sku: "COLA1".to_string(),
            price_cents: 5000,
            unit: "pcs".to_string(),
            ..NewItem::default()
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Fresh Milk & Dairy!"), "fresh-milk-dairy");
        assert_eq!(slugify("Beverages"), "beverages");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("A  --  B"), "a-b");
    }

    #[test]
    fn test_beverages_scenario_blocks_delete() {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        assert!(category.can_delete());

        let soda_id = category.add_subcategory("Soda", None).unwrap().id.clone();
        assert!(!category.can_delete());

        let item = category
            .add_item(Some(&soda_id), cola(), Some(&store()))
            .unwrap();
        assert_eq!(item.store_id, "store-1");
        assert_eq!(item.store_name, "Main Street");

        assert_eq!(category.total_item_count(), 1);
        assert!(!category.can_delete());
        assert!(matches!(
            category.ensure_deletable(),
            Err(CoreError::CategoryNotEmpty {
                subcategories: 1,
                items: 1
            })
        ));
    }

    #[test]
    fn test_category_level_items_count() {
        let mut category = Category::new("Snacks", None, "store-1", None).unwrap();
        category.add_item(None, cola(), Some(&store())).unwrap();
        assert_eq!(category.subcategory_count(), 0);
        assert_eq!(category.total_item_count(), 1);
        assert!(!category.can_delete());
    }

    #[test]
    fn test_duplicate_subcategory_name_case_insensitive() {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        category.add_subcategory("Soda", None).unwrap();
        let err = category.add_subcategory("  soda ", None).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName { .. }));
    }

    #[test]
    fn test_add_item_requires_store() {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        let err = category.add_item(None, cola(), None).unwrap_err();
        assert!(matches!(err, CoreError::NoStoreSelected));
    }

    #[test]
    fn test_add_item_rejects_duplicate_sku_and_unknown_subcategory() {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        category.add_item(None, cola(), Some(&store())).unwrap();

        let err = category.add_item(None, cola(), Some(&store())).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Duplicate { .. })));

        let mut other = cola();
        other.sku = "COLA2".to_string();
        let err = category
            .add_item(Some("missing"), other, Some(&store()))
            .unwrap_err();
        assert!(matches!(err, CoreError::SubcategoryNotFound(_)));
    }

    #[test]
    fn test_remove_subcategory_requires_empty() {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        let soda_id = category.add_subcategory("Soda", None).unwrap().id.clone();
        let item_id = category
            .add_item(Some(&soda_id), cola(), Some(&store()))
            .unwrap()
            .id
            .clone();

        assert!(matches!(
            category.remove_subcategory(&soda_id),
            Err(CoreError::SubcategoryNotEmpty { items: 1 })
        ));

        category.remove_item(&item_id).unwrap();
        category.remove_subcategory(&soda_id).unwrap();
        assert!(category.can_delete());
    }

    #[test]
    fn test_stock_status_and_margin() {
        let mut category = Category::new("Dairy", None, "store-1", None).unwrap();
        let mut milk = cola();
        milk.sku = "MILK".to_string();
        milk.cost_cents = 4000;
        milk.min_stock = 5;
        milk.max_stock = Some(50);
        let id = category
            .add_item(None, milk, Some(&store()))
            .unwrap()
            .id
            .clone();

        let status_for = |category: &mut Category, stock: i64| {
            category
                .update_item(
                    &id,
                    ItemPatch {
                        stock: Some(stock),
                        ..ItemPatch::default()
                    },
                )
                .unwrap()
                .stock_status()
        };

        assert_eq!(status_for(&mut category, 0), StockStatus::OutOfStock);
        assert_eq!(status_for(&mut category, 5), StockStatus::LowStock);
        assert_eq!(status_for(&mut category, 20), StockStatus::InStock);
        assert_eq!(status_for(&mut category, 50), StockStatus::Overstock);

        let item = category.find_item(&id).unwrap().item;
        assert_eq!(item.profit_margin(), Some(25.0));
    }

    #[test]
    fn test_profit_margin_absent_without_cost() {
        let mut category = Category::new("Dairy", None, "store-1", None).unwrap();
        let item = category.add_item(None, cola(), Some(&store())).unwrap();
        assert_eq!(item.profit_margin(), None);
    }

    #[test]
    fn test_single_primary_image() {
        let mut images = vec![
            ItemImage {
                url: "/uploads/a.png".into(),
                alt: None,
                is_primary: false,
            },
            ItemImage {
                url: "/uploads/b.png".into(),
                alt: None,
                is_primary: true,
            },
            ItemImage {
                url: "/uploads/c.png".into(),
                alt: None,
                is_primary: true,
            },
        ];
        normalize_primary_images(&mut images);
        let primaries: Vec<_> = images.iter().filter(|i| i.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].url, "/uploads/b.png");
    }

    #[test]
    fn test_receive_stock_adds_batch_and_overwrites_cost() {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        let id = category
            .add_item(None, cola(), Some(&store()))
            .unwrap()
            .id
            .clone();

        let item = category
            .receive_stock(
                &id,
                StockReceipt {
                    quantity: 10,
                    cost_price_cents: 500,
                    batch_number: "PO-0001-1".into(),
                    purchase_order_number: "PO-0001".into(),
                },
            )
            .unwrap();

        assert_eq!(item.stock, 10);
        assert_eq!(item.cost_cents, 500);
        assert_eq!(item.calculated_stock(), 10);

        let item = category.deactivate_batch(&id, "PO-0001-1").unwrap();
        assert_eq!(item.batches.len(), 1);
        assert_eq!(item.calculated_stock(), 0);
    }

    #[test]
    fn test_receive_stock_beyond_limit_is_rejected() {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        let mut stocked = cola();
        stocked.stock = MAX_STOCK_LEVEL;
        stocked.cost_cents = crate::MAX_AMOUNT_CENTS;
        let id = category
            .add_item(None, stocked, Some(&store()))
            .unwrap()
            .id
            .clone();

        let err = category
            .receive_stock(
                &id,
                StockReceipt {
                    quantity: 1,
                    cost_price_cents: 500,
                    batch_number: "PO-0001-1".into(),
                    purchase_order_number: "PO-0001".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));

        let item = category.find_item(&id).unwrap().item;
        assert_eq!(item.stock, MAX_STOCK_LEVEL);
        assert!(!item.batches.iter().any(|b| b.batch_number == "PO-0001-1"));
        assert_eq!(
            item.inventory_value().cents(),
            MAX_STOCK_LEVEL * crate::MAX_AMOUNT_CENTS
        );
    }

    #[test]
    fn test_deduct_stock_rejects_oversell() {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        let mut stocked = cola();
        stocked.stock = 3;
        let id = category
            .add_item(None, stocked, Some(&store()))
            .unwrap()
            .id
            .clone();

        assert!(matches!(
            category.deduct_stock(&id, 5),
            Err(CoreError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            })
        ));
        assert_eq!(category.deduct_stock(&id, 2).unwrap().stock, 1);
    }

    #[test]
    fn test_update_item_missing_is_not_found() {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        let err = category
            .update_item("nope", ItemPatch::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_apply_patch_reslugs() {
        let mut category = Category::new("Beverages", None, "store-1", None).unwrap();
        category
            .apply_patch(CategoryPatch {
                name: Some("Cold Drinks".to_string()),
                is_active: Some(false),
                ..CategoryPatch::default()
            })
            .unwrap();
        assert_eq!(category.slug, "cold-drinks");
        assert!(!category.is_active);

        let err = category
            .apply_patch(CategoryPatch {
                name: Some("  ".to_string()),
                ..CategoryPatch::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(category.name, "Cold Drinks");
    }
}
