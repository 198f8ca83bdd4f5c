//! # Order Composer
//!
//! The cart state machine. A cart is transient: it never touches stock
//! while it is being built. Only petal-db's order commit turns it into
//! ledger mutations.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Empty ──add──► Building ──commit──► Committed   (terminal)           │
//! │                     │  ▲                                                │
//! │                     │  └── add / update / remove / failed commit       │
//! │                     │                                                   │
//! │                     └──clear──► Discarded          (terminal)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lines
//! A line is either a *standard* product sold by the stem or package, or a
//! *custom* arrangement composed of stem allocations over several products
//! and colors. Both share `line_id` and `quantity`.
//!
//! Prices are frozen when the line is added. A later price edit on the
//! product does not change what is already in the cart.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::units::{to_stems_with, StockUnit};
use crate::validation::validate_product_name;
use crate::{MAX_CART_LINES, MAX_ITEM_QUANTITY};

// =============================================================================
// Stock Lookup
// =============================================================================

/// Read-only view of current stem counts used for the soft feasibility
/// check when a custom arrangement is added.
///
/// Returns `None` for unknown products.
pub trait StockLookup {
    fn available(&self, product_id: &str) -> Option<i64>;
}

impl StockLookup for HashMap<String, i64> {
    fn available(&self, product_id: &str) -> Option<i64> {
        self.get(product_id).copied()
    }
}

impl StockLookup for BTreeMap<String, i64> {
    fn available(&self, product_id: &str) -> Option<i64> {
        self.get(product_id).copied()
    }
}

impl StockLookup for [Product] {
    fn available(&self, product_id: &str) -> Option<i64> {
        self.iter()
            .find(|p| p.id == product_id && p.is_active)
            .map(|p| p.stock)
    }
}

// =============================================================================
// Lines
// =============================================================================

/// Stems of one product used by a custom arrangement, split by color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CompositionEntry {
    pub product_id: String,
    /// color id → stems of that color
    pub color_allocations: BTreeMap<String, i64>,
}

impl CompositionEntry {
    pub fn new(product_id: impl Into<String>) -> Self {
        CompositionEntry {
            product_id: product_id.into(),
            color_allocations: BTreeMap::new(),
        }
    }

    /// Builder-style allocation; repeated colors accumulate.
    pub fn with_color(mut self, color_id: impl Into<String>, stems: i64) -> Self {
        let held = self.color_allocations.entry(color_id.into()).or_insert(0);
        *held = held.saturating_add(stems);
        self
    }

    /// Stems of this product used by ONE arrangement.
    pub fn stems(&self) -> CoreResult<i64> {
        self.color_allocations
            .values()
            .try_fold(0_i64, |total, stems| total.checked_add(*stems))
            .ok_or_else(|| CoreError::stem_overflow(&self.product_id))
    }
}

/// Adds `stems` to the running requirement for `product_id`.
fn add_stems(
    required: &mut BTreeMap<String, i64>,
    product_id: &str,
    stems: i64,
) -> CoreResult<()> {
    let total = required.entry(product_id.to_string()).or_insert(0);
    *total = total
        .checked_add(stems)
        .ok_or_else(|| CoreError::stem_overflow(product_id))?;
    Ok(())
}

/// Per-stem price × stems of a standard line.
fn standard_total(
    name: &str,
    unit_price_cents: i64,
    units_per_package: i64,
    quantity: i64,
    unit: StockUnit,
) -> CoreResult<Money> {
    let stems = to_stems_with(units_per_package, quantity, unit)?;
    Money::from_cents(unit_price_cents)
        .checked_multiply_quantity(stems)
        .ok_or_else(|| CoreError::amount_overflow(name))
}

/// Variant-specific payload of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineItem {
    /// A catalog product sold as-is.
    Standard {
        product_id: String,
        /// Product name at time of adding (frozen)
        name: String,
        /// Per-stem price at time of adding (frozen)
        unit_price_cents: i64,
        unit: StockUnit,
        /// Package size at time of adding (frozen)
        units_per_package: i64,
    },
    /// A composed arrangement priced as a whole.
    Custom {
        name: String,
        /// Price of one arrangement, set by the caller.
        unit_price_cents: i64,
        composition: Vec<CompositionEntry>,
    },
}

/// A cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub line_id: String,
    /// Always in `1..=MAX_ITEM_QUANTITY`.
    pub quantity: i64,
    pub item: LineItem,
}

impl OrderLine {
    fn new(quantity: i64, item: LineItem) -> Self {
        OrderLine {
            line_id: Uuid::new_v4().to_string(),
            quantity,
            item,
        }
    }

    pub fn name(&self) -> &str {
        match &self.item {
            LineItem::Standard { name, .. } | LineItem::Custom { name, .. } => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.item, LineItem::Custom { .. })
    }

    /// Line price.
    ///
    /// Standard: per-stem price × stems. Custom: arrangement price × quantity.
    pub fn line_total(&self) -> CoreResult<Money> {
        match &self.item {
            LineItem::Standard {
                name,
                unit_price_cents,
                unit,
                units_per_package,
                ..
            } => standard_total(
                name,
                *unit_price_cents,
                *units_per_package,
                self.quantity,
                *unit,
            ),
            LineItem::Custom {
                name,
                unit_price_cents,
                ..
            } => Money::from_cents(*unit_price_cents)
                .checked_multiply_quantity(self.quantity)
                .ok_or_else(|| CoreError::amount_overflow(name.as_str())),
        }
    }

    /// Stems this line consumes, per product.
    pub fn stem_requirements(&self) -> CoreResult<BTreeMap<String, i64>> {
        let mut required = BTreeMap::new();
        match &self.item {
            LineItem::Standard {
                product_id,
                unit,
                units_per_package,
                ..
            } => {
                let stems = to_stems_with(*units_per_package, self.quantity, *unit)?;
                required.insert(product_id.clone(), stems);
            }
            LineItem::Custom { composition, .. } => {
                for entry in composition {
                    let stems = entry
                        .stems()?
                        .checked_mul(self.quantity)
                        .ok_or_else(|| CoreError::stem_overflow(&entry.product_id))?;
                    add_stems(&mut required, &entry.product_id, stems)?;
                }
            }
        }
        Ok(required)
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Empty,
    Building,
    Committed,
    Discarded,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Empty => "empty",
            CartStatus::Building => "building",
            CartStatus::Committed => "committed",
            CartStatus::Discarded => "discarded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CartStatus::Committed | CartStatus::Discarded)
    }
}

/// A cart being composed at the counter.
///
/// ## Invariants
/// - Standard lines are unique by product; adding again merges, and a
///   mix of packages and stems collapses into one line counted in stems
/// - Every quantity is ≥ 1; removal is explicit
/// - At most `MAX_CART_LINES` lines
/// - Once `Committed` or `Discarded`, nothing changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    id: String,
    status: CartStatus,
    lines: Vec<OrderLine>,
    #[ts(as = "String")]
    created_at: DateTime<Utc>,
    /// Set once the cart has been committed.
    order_id: Option<String>,
}

impl Cart {
    pub fn new(now: DateTime<Utc>) -> Self {
        Cart {
            id: Uuid::new_v4().to_string(),
            status: CartStatus::Empty,
            lines: Vec::new(),
            created_at: now,
            order_id: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, line_id: &str) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    fn ensure_editable(&self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::invalid_state("Cart", &self.id, self.status.as_str()));
        }
        Ok(())
    }

    fn ensure_building(&self) -> CoreResult<()> {
        if self.status != CartStatus::Building {
            return Err(CoreError::invalid_state("Cart", &self.id, self.status.as_str()));
        }
        Ok(())
    }

    fn ensure_room(&self) -> CoreResult<()> {
        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }
        Ok(())
    }

    fn check_quantity(quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(CoreError::invalid_quantity("quantity", quantity));
        }
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        Ok(())
    }

    /// Adds a catalog product, merging into an existing line for the same
    /// product. Returns the line id.
    ///
    /// Stock is NOT checked here; the commit does that authoritatively.
    pub fn add_standard_item(
        &mut self,
        product: &Product,
        quantity: i64,
        unit: StockUnit,
    ) -> CoreResult<String> {
        self.ensure_editable()?;
        Self::check_quantity(quantity)?;
        if !product.is_active {
            return Err(CoreError::not_found("Product", &product.id));
        }
        // Catch a bad package size or price now rather than at commit.
        standard_total(
            &product.name,
            product.price_cents,
            product.units_per_package,
            quantity,
            unit,
        )?;

        let existing = self.lines.iter_mut().find(|line| match &line.item {
            LineItem::Standard { product_id, .. } => *product_id == product.id,
            LineItem::Custom { .. } => false,
        });

        if let Some(line) = existing {
            if let LineItem::Standard {
                name,
                unit_price_cents,
                unit: line_unit,
                units_per_package,
                ..
            } = &mut line.item
            {
                let (merged, merged_unit) = if *line_unit == unit {
                    (line.quantity + quantity, unit)
                } else {
                    let held = to_stems_with(*units_per_package, line.quantity, *line_unit)?;
                    let added = to_stems_with(product.units_per_package, quantity, unit)?;
                    let stems = held
                        .checked_add(added)
                        .ok_or_else(|| CoreError::stem_overflow(&product.id))?;
                    (stems, StockUnit::Stem)
                };
                if merged > MAX_ITEM_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        requested: merged,
                        max: MAX_ITEM_QUANTITY,
                    });
                }
                standard_total(
                    name,
                    *unit_price_cents,
                    *units_per_package,
                    merged,
                    merged_unit,
                )?;

                line.quantity = merged;
                *line_unit = merged_unit;
                let line_id = line.line_id.clone();
                self.status = CartStatus::Building;
                return Ok(line_id);
            }
        }

        self.ensure_room()?;
        let line = OrderLine::new(
            quantity,
            LineItem::Standard {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price_cents: product.price_cents,
                unit,
                units_per_package: product.units_per_package,
            },
        );
        let line_id = line.line_id.clone();
        self.lines.push(line);
        self.status = CartStatus::Building;
        Ok(line_id)
    }

    /// Adds a custom arrangement. Returns the line id.
    ///
    /// Runs a soft feasibility check of this arrangement alone against
    /// `stock`. Nothing is reserved; the commit re-checks under lock.
    ///
    /// ## Errors
    /// - `InvalidAmount` if `unit_price_cents` ≤ 0, or the line total does
    ///   not fit in cents
    /// - `InvalidQuantity` for a non-positive quantity, empty composition,
    ///   non-positive color allocation, or a stem total that overflows
    /// - `NotFound` if a referenced product is unknown to `stock`
    /// - `InsufficientStock` if the arrangement alone exceeds current stock
    pub fn add_custom_item<S>(
        &mut self,
        name: &str,
        unit_price_cents: i64,
        quantity: i64,
        composition: Vec<CompositionEntry>,
        stock: &S,
    ) -> CoreResult<String>
    where
        S: StockLookup + ?Sized,
    {
        self.ensure_editable()?;
        validate_product_name(name)?;
        if unit_price_cents <= 0 {
            return Err(CoreError::InvalidAmount {
                cents: unit_price_cents,
            });
        }
        Self::check_quantity(quantity)?;
        if composition.is_empty() {
            return Err(CoreError::invalid_quantity("composition size", 0));
        }
        for entry in &composition {
            if entry.color_allocations.is_empty() {
                return Err(CoreError::invalid_quantity(
                    format!("allocations for {}", entry.product_id),
                    0,
                ));
            }
            for (color, stems) in &entry.color_allocations {
                if *stems <= 0 {
                    return Err(CoreError::invalid_quantity(
                        format!("stems of {} in {}", color, entry.product_id),
                        *stems,
                    ));
                }
            }
        }
        self.ensure_room()?;

        let line = OrderLine::new(
            quantity,
            LineItem::Custom {
                name: name.trim().to_string(),
                unit_price_cents,
                composition,
            },
        );

        line.line_total()?;
        for (product_id, requested) in line.stem_requirements()? {
            let available = stock
                .available(&product_id)
                .ok_or_else(|| CoreError::not_found("Product", &product_id))?;
            if available < requested {
                return Err(CoreError::InsufficientStock {
                    product_id,
                    available,
                    requested,
                });
            }
        }

        let line_id = line.line_id.clone();
        self.lines.push(line);
        self.status = CartStatus::Building;
        Ok(line_id)
    }

    /// Applies `delta` to a line's quantity, clamped to
    /// `1..=MAX_ITEM_QUANTITY`. Returns the new quantity.
    pub fn update_quantity(&mut self, line_id: &str, delta: i64) -> CoreResult<i64> {
        self.ensure_building()?;
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.line_id == line_id)
            .ok_or_else(|| CoreError::not_found("Cart line", line_id))?;
        line.quantity = line
            .quantity
            .saturating_add(delta)
            .clamp(1, MAX_ITEM_QUANTITY);
        Ok(line.quantity)
    }

    /// Removes one line. The cart stays `Building` even when it empties.
    pub fn remove_item(&mut self, line_id: &str) -> CoreResult<OrderLine> {
        self.ensure_building()?;
        let index = self
            .lines
            .iter()
            .position(|l| l.line_id == line_id)
            .ok_or_else(|| CoreError::not_found("Cart line", line_id))?;
        Ok(self.lines.remove(index))
    }

    /// Drops every line and discards the cart.
    pub fn clear(&mut self) -> CoreResult<()> {
        self.ensure_building()?;
        self.lines.clear();
        self.status = CartStatus::Discarded;
        Ok(())
    }

    /// Cart total: sum of line totals.
    pub fn total(&self) -> CoreResult<Money> {
        self.lines.iter().try_fold(Money::zero(), |total, line| {
            total
                .checked_add(line.line_total()?)
                .ok_or_else(|| CoreError::amount_overflow("cart total"))
        })
    }

    /// Total stems required per product across every line.
    ///
    /// Keys are sorted, which is also the order per-product locks must
    /// be taken in.
    pub fn stem_requirements(&self) -> CoreResult<BTreeMap<String, i64>> {
        let mut required = BTreeMap::new();
        for line in &self.lines {
            for (product_id, stems) in line.stem_requirements()? {
                add_stems(&mut required, &product_id, stems)?;
            }
        }
        Ok(required)
    }

    /// Fails unless the cart is `Building` with at least one line.
    pub fn ensure_committable(&self) -> CoreResult<()> {
        self.ensure_building()?;
        if self.lines.is_empty() {
            return Err(CoreError::invalid_state("Cart", &self.id, "empty"));
        }
        Ok(())
    }

    /// Terminal transition after the ledger accepted the order.
    pub fn mark_committed(&mut self, order_id: impl Into<String>) -> CoreResult<()> {
        self.ensure_committable()?;
        self.status = CartStatus::Committed;
        self.order_id = Some(order_id.into());
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn product(id: &str, price: i64, upp: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: format!("Flower {}", id),
            price_cents: price,
            cost_cents: price / 2,
            units_per_package: upp,
            stock,
            care_days_water: 2,
            care_days_cut: 3,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn stock_of(entries: &[(&str, i64)]) -> HashMap<String, i64> {
        entries.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = Cart::new(Utc::now());
        assert_eq!(cart.status(), CartStatus::Empty);
        assert!(cart.is_empty());
        assert_eq!(cart.total().unwrap(), Money::zero());
    }

    #[test]
    fn test_add_standard_merges_by_product() {
        let rose = product("rose", 250, 10, 50);
        let mut cart = Cart::new(Utc::now());

        let first = cart.add_standard_item(&rose, 2, StockUnit::Stem).unwrap();
        let second = cart.add_standard_item(&rose, 3, StockUnit::Stem).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
        assert_eq!(cart.status(), CartStatus::Building);
    }

    #[test]
    fn test_packages_and_stems_merge_into_stems() {
        let rose = product("rose", 250, 10, 50);
        let mut cart = Cart::new(Utc::now());
        let first = cart.add_standard_item(&rose, 1, StockUnit::Package).unwrap();
        let second = cart.add_standard_item(&rose, 4, StockUnit::Stem).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 14);
        assert!(matches!(
            cart.lines()[0].item,
            LineItem::Standard {
                unit: StockUnit::Stem,
                ..
            }
        ));
        assert_eq!(cart.total().unwrap().cents(), 250 * 14);
        assert_eq!(cart.stem_requirements().unwrap()["rose"], 14);

        cart.add_standard_item(&rose, 1, StockUnit::Package).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 24);
    }

    #[test]
    fn test_packages_merge_as_packages() {
        let rose = product("rose", 250, 10, 50);
        let mut cart = Cart::new(Utc::now());
        cart.add_standard_item(&rose, 1, StockUnit::Package).unwrap();
        cart.add_standard_item(&rose, 2, StockUnit::Package).unwrap();

        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.stem_requirements().unwrap()["rose"], 30);
    }

    #[test]
    fn test_huge_allocations_are_invalid_quantity() {
        let mut cart = Cart::new(Utc::now());
        let stock = stock_of(&[("rose", i64::MAX)]);
        let half = i64::MAX / 2 + 1;
        let composition = vec![CompositionEntry::new("rose")
            .with_color("red", half)
            .with_color("white", half)];

        let err = cart
            .add_custom_item("Everything", 1000, 1, composition, &stock)
            .unwrap_err();
        assert!(matches!(err, CoreError::StemOverflow { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
        assert!(cart.is_empty());

        // Fits per arrangement, overflows once multiplied by quantity.
        let composition = vec![CompositionEntry::new("rose").with_color("red", half)];
        let err = cart
            .add_custom_item("Twice", 1000, 2, composition, &stock)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_requirements_overflow_across_lines() {
        let mut cart = Cart::new(Utc::now());
        let stock = stock_of(&[("rose", i64::MAX)]);
        let entry = || vec![CompositionEntry::new("rose").with_color("red", i64::MAX / 2 + 1)];

        cart.add_custom_item("First", 1000, 1, entry(), &stock).unwrap();
        cart.add_custom_item("Second", 1000, 1, entry(), &stock).unwrap();

        let err = cart.stem_requirements().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
    }

    #[test]
    fn test_huge_arrangement_price_is_invalid_amount() {
        let mut cart = Cart::new(Utc::now());
        let stock = stock_of(&[("rose", 10)]);
        let entry = || vec![CompositionEntry::new("rose").with_color("red", 1)];

        let err = cart
            .add_custom_item("Pricey", i64::MAX / 2, 3, entry(), &stock)
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        assert!(cart.is_empty());

        // Each line fits on its own; the sum does not.
        cart.add_custom_item("Half", i64::MAX / 2 + 1, 1, entry(), &stock)
            .unwrap();
        cart.add_custom_item("Other half", i64::MAX / 2 + 1, 1, entry(), &stock)
            .unwrap();
        assert_eq!(cart.total().unwrap_err().kind(), ErrorKind::InvalidAmount);
    }

    #[test]
    fn test_huge_stem_price_is_invalid_amount() {
        let orchid = product("orchid", i64::MAX / 2, 10, 50);
        let mut cart = Cart::new(Utc::now());

        let err = cart
            .add_standard_item(&orchid, 3, StockUnit::Stem)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
        assert!(cart.is_empty());

        cart.add_standard_item(&orchid, 1, StockUnit::Stem).unwrap();
        assert_eq!(
            cart.add_standard_item(&orchid, 2, StockUnit::Stem)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidAmount
        );
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_price_frozen_at_add_time() {
        let mut rose = product("rose", 250, 10, 50);
        let mut cart = Cart::new(Utc::now());
        cart.add_standard_item(&rose, 2, StockUnit::Stem).unwrap();

        rose.price_cents = 999;
        assert_eq!(cart.total().unwrap().cents(), 500);
    }

    #[test]
    fn test_add_rejects_bad_quantity() {
        let rose = product("rose", 250, 10, 50);
        let mut cart = Cart::new(Utc::now());
        assert!(matches!(
            cart.add_standard_item(&rose, 0, StockUnit::Stem),
            Err(CoreError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            cart.add_standard_item(&rose, MAX_ITEM_QUANTITY + 1, StockUnit::Stem),
            Err(CoreError::QuantityTooLarge { .. })
        ));
        assert_eq!(cart.status(), CartStatus::Empty);
    }

    #[test]
    fn test_custom_item_total_and_requirements() {
        let mut cart = Cart::new(Utc::now());
        let stock = stock_of(&[("rose", 20), ("tulip", 20)]);
        let composition = vec![
            CompositionEntry::new("rose")
                .with_color("red", 3)
                .with_color("white", 2),
            CompositionEntry::new("tulip").with_color("yellow", 4),
        ];

        cart.add_custom_item("Spring bouquet", 4500, 2, composition, &stock)
            .unwrap();

        assert_eq!(cart.total().unwrap().cents(), 9000);
        let required = cart.stem_requirements().unwrap();
        assert_eq!(required["rose"], 10);
        assert_eq!(required["tulip"], 8);
    }

    #[test]
    fn test_custom_item_soft_check() {
        let mut cart = Cart::new(Utc::now());
        let stock = stock_of(&[("p2", 4), ("p3", 1)]);
        let composition = vec![
            CompositionEntry::new("p2").with_color("pink", 4),
            CompositionEntry::new("p3").with_color("white", 2),
        ];

        let err = cart
            .add_custom_item("Arrangement", 3000, 1, composition, &stock)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product_id: "p3".to_string(),
                available: 1,
                requested: 2,
            }
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_custom_item_unknown_product() {
        let mut cart = Cart::new(Utc::now());
        let stock = stock_of(&[]);
        let composition = vec![CompositionEntry::new("ghost").with_color("red", 1)];
        assert!(matches!(
            cart.add_custom_item("Ghost", 1000, 1, composition, &stock),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_custom_item_validation() {
        let mut cart = Cart::new(Utc::now());
        let stock = stock_of(&[("rose", 10)]);
        let entry = || vec![CompositionEntry::new("rose").with_color("red", 1)];

        assert!(matches!(
            cart.add_custom_item("Free", 0, 1, entry(), &stock),
            Err(CoreError::InvalidAmount { cents: 0 })
        ));
        assert!(matches!(
            cart.add_custom_item("Nothing", 1000, 1, vec![], &stock),
            Err(CoreError::InvalidQuantity { .. })
        ));
        let negative = vec![CompositionEntry::new("rose").with_color("red", -1)];
        assert!(cart
            .add_custom_item("Negative", 1000, 1, negative, &stock)
            .is_err());
        assert!(matches!(
            cart.add_custom_item("", 1000, 1, entry(), &stock),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_soft_check_against_product_slice() {
        let products = vec![product("rose", 250, 10, 3)];
        let mut cart = Cart::new(Utc::now());
        let composition = vec![CompositionEntry::new("rose").with_color("red", 2)];

        assert!(cart
            .add_custom_item("Duo", 800, 1, composition.clone(), &products[..])
            .is_ok());
        // Two arrangements need 4 stems.
        assert!(cart
            .add_custom_item("Duo", 800, 2, composition, &products[..])
            .is_err());
    }

    #[test]
    fn test_update_quantity_clamps() {
        let rose = product("rose", 250, 10, 50);
        let mut cart = Cart::new(Utc::now());
        let line_id = cart.add_standard_item(&rose, 3, StockUnit::Stem).unwrap();

        assert_eq!(cart.update_quantity(&line_id, 2).unwrap(), 5);
        assert_eq!(cart.update_quantity(&line_id, -10).unwrap(), 1);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(
            cart.update_quantity(&line_id, i64::MAX).unwrap(),
            MAX_ITEM_QUANTITY
        );
        assert!(matches!(
            cart.update_quantity("missing", 1),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_remove_last_line_stays_building() {
        let rose = product("rose", 250, 10, 50);
        let mut cart = Cart::new(Utc::now());
        let line_id = cart.add_standard_item(&rose, 1, StockUnit::Stem).unwrap();

        cart.remove_item(&line_id).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.status(), CartStatus::Building);
        assert!(cart.ensure_committable().is_err());
    }

    #[test]
    fn test_clear_discards() {
        let rose = product("rose", 250, 10, 50);
        let mut cart = Cart::new(Utc::now());
        cart.add_standard_item(&rose, 1, StockUnit::Stem).unwrap();

        cart.clear().unwrap();
        assert_eq!(cart.status(), CartStatus::Discarded);
        assert!(matches!(
            cart.add_standard_item(&rose, 1, StockUnit::Stem),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_clear_requires_building() {
        let mut cart = Cart::new(Utc::now());
        assert!(matches!(cart.clear(), Err(CoreError::InvalidState { .. })));
    }

    #[test]
    fn test_committed_cart_is_immutable() {
        let rose = product("rose", 250, 10, 50);
        let mut cart = Cart::new(Utc::now());
        let line_id = cart.add_standard_item(&rose, 1, StockUnit::Stem).unwrap();

        cart.mark_committed("order-1").unwrap();
        assert_eq!(cart.status(), CartStatus::Committed);
        assert_eq!(cart.order_id(), Some("order-1"));

        assert!(cart.add_standard_item(&rose, 1, StockUnit::Stem).is_err());
        assert!(cart.update_quantity(&line_id, 1).is_err());
        assert!(cart.remove_item(&line_id).is_err());
        assert!(cart.clear().is_err());
        assert!(cart.mark_committed("order-2").is_err());
    }

    #[test]
    fn test_line_serializes_with_kind_tag() {
        let rose = product("rose", 250, 10, 50);
        let mut cart = Cart::new(Utc::now());
        cart.add_standard_item(&rose, 1, StockUnit::Stem).unwrap();

        let json = serde_json::to_value(&cart.lines()[0]).unwrap();
        assert_eq!(json["item"]["kind"], "standard");
        assert_eq!(json["item"]["unit"], "stem");
    }
}
