//! # Unit Converter
//!
//! Translates quantities expressed in purchasing packages into stems.
//!
//! Stock is stored in stems only. Packages exist at the counter and on
//! supplier invoices, so every quantity is converted here before it
//! reaches the ledger.
//!
//! ```text
//! 2 packages × 10 stems/package ──► 20 stems
//! 7 stems                       ──► 7 stems
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::Product;

/// The unit a quantity is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum StockUnit {
    #[default]
    Stem,
    Package,
}

impl StockUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockUnit::Stem => "stem",
            StockUnit::Package => "package",
        }
    }
}

impl std::str::FromStr for StockUnit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stem" | "stems" => Ok(StockUnit::Stem),
            "package" | "packages" | "pkg" => Ok(StockUnit::Package),
            other => Err(crate::error::ValidationError::InvalidFormat {
                field: "unit".to_string(),
                reason: format!("unknown unit '{}'", other),
            }
            .into()),
        }
    }
}

/// Converts `quantity` of `unit` into stems, given a package size.
///
/// ## Errors
/// - `InvalidQuantity` if `quantity` is not positive
/// - `InvalidQuantity` if `units_per_package` is not positive
pub fn to_stems_with(units_per_package: i64, quantity: i64, unit: StockUnit) -> CoreResult<i64> {
    if quantity <= 0 {
        return Err(CoreError::invalid_quantity("quantity", quantity));
    }
    match unit {
        StockUnit::Stem => Ok(quantity),
        StockUnit::Package => {
            if units_per_package <= 0 {
                return Err(CoreError::invalid_quantity(
                    "units_per_package",
                    units_per_package,
                ));
            }
            quantity
                .checked_mul(units_per_package)
                .ok_or_else(|| CoreError::invalid_quantity("quantity", quantity))
        }
    }
}

/// Converts `quantity` of `unit` of `product` into stems.
///
/// ## Example
/// ```rust,ignore
/// // rose: 10 stems per package
/// assert_eq!(to_stems(&rose, 2, StockUnit::Package)?, 20);
/// ```
pub fn to_stems(product: &Product, quantity: i64, unit: StockUnit) -> CoreResult<i64> {
    to_stems_with(product.units_per_package, quantity, unit)
}
