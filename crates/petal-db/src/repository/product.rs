//! # Product Repository
//!
//! Catalog operations for flower products.
//!
//! Stem counts are NOT written here. `stock` is owned by the Stock Ledger
//! (`repository::stock`); this repository only creates products and edits
//! catalog fields.
//!
//! ## Care Interval Edits
//! ```text
//! update_care_intervals(rose, water = 1)
//!       │
//!       ▼
//! products.care_days_water = 1
//!       │
//!       ▼
//! every active rose batch: next_water_due = last_water_change_at + 1 day
//! (nothing else to update, due times are derived on read)
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use petal_core::validation::{
    validate_care_days, validate_price_cents, validate_product_name, validate_units_per_package,
};
use petal_core::{CoreError, CoreResult, Product};

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, price_cents, cost_cents, units_per_package, \
     stock, care_days_water, care_days_cut, is_active, created_at, updated_at";

/// Input for a new catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub units_per_package: i64,
    pub care_days_water: i64,
    pub care_days_cut: i64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price_cents: i64, cost_cents: i64) -> Self {
        NewProduct {
            name: name.into(),
            price_cents,
            cost_cents,
            units_per_package: 1,
            care_days_water: 2,
            care_days_cut: 3,
        }
    }

    pub fn units_per_package(mut self, units: i64) -> Self {
        self.units_per_package = units;
        self
    }

    pub fn care_days(mut self, water: i64, cut: i64) -> Self {
        self.care_days_water = water;
        self.care_days_cut = cut;
        self
    }

    /// Validates and builds a product with zero stock.
    pub fn into_product(self, now: DateTime<Utc>) -> CoreResult<Product> {
        validate_product_name(&self.name)?;
        validate_price_cents(self.price_cents)?;
        validate_price_cents(self.cost_cents)?;
        validate_units_per_package(self.units_per_package)?;
        validate_care_days("care_days_water", self.care_days_water)?;
        validate_care_days("care_days_cut", self.care_days_cut)?;

        Ok(Product {
            id: Uuid::new_v4().to_string(),
            name: self.name.trim().to_string(),
            price_cents: self.price_cents,
            cost_cents: self.cost_cents,
            units_per_package: self.units_per_package,
            stock: 0,
            care_days_water: self.care_days_water,
            care_days_cut: self.care_days_cut,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Loads one product through any executor (pool or open transaction).
pub(crate) async fn fetch_product<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(product)
}

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Validates and inserts a new product with zero stock.
    ///
    /// Initial stock goes through the Stock Ledger as a restock so it
    /// shows up in the movement audit.
    pub async fn create(&self, new: NewProduct) -> DbResult<Product> {
        let product = new.into_product(Utc::now())?;
        self.insert(&product).await?;
        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Inserts a fully-formed product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - id already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents, cost_cents, units_per_package,
                stock, care_days_water, care_days_cut, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.units_per_package)
        .bind(product.stock)
        .bind(product.care_days_water)
        .bind(product.care_days_cut)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, id).await
    }

    /// Gets a product by its ID or fails with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE is_active = 1 ORDER BY name, id",
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed active products");
        Ok(products)
    }

    /// Updates sale price, cost and package size.
    ///
    /// Carts already holding this product keep their frozen price.
    pub async fn update_pricing(
        &self,
        id: &str,
        price_cents: i64,
        cost_cents: i64,
        units_per_package: i64,
    ) -> DbResult<Product> {
        validate_price_cents(price_cents).map_err(CoreError::from)?;
        validate_price_cents(cost_cents).map_err(CoreError::from)?;
        validate_units_per_package(units_per_package).map_err(CoreError::from)?;

        debug!(id = %id, price_cents, cost_cents, units_per_package, "Updating pricing");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                price_cents = ?2,
                cost_cents = ?3,
                units_per_package = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(price_cents)
        .bind(cost_cents)
        .bind(units_per_package)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        self.get(id).await
    }

    /// Updates the care intervals of a flower species.
    ///
    /// Applies retroactively to every live batch of this product.
    pub async fn update_care_intervals(
        &self,
        id: &str,
        care_days_water: i64,
        care_days_cut: i64,
    ) -> DbResult<Product> {
        validate_care_days("care_days_water", care_days_water)
            .map_err(CoreError::from)?;
        validate_care_days("care_days_cut", care_days_cut).map_err(CoreError::from)?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                care_days_water = ?2,
                care_days_cut = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(care_days_water)
        .bind(care_days_cut)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, care_days_water, care_days_cut, "Care intervals updated");
        self.get(id).await
    }

    /// Soft-deletes a product. History and batches keep referencing it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use petal_core::ErrorKind;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup().await;
        let rose = db
            .products()
            .create(
                NewProduct::new("Red Rose", 250, 90)
                    .units_per_package(10)
                    .care_days(2, 3),
            )
            .await
            .unwrap();

        let loaded = db.products().get(&rose.id).await.unwrap();
        assert_eq!(loaded.name, "Red Rose");
        assert_eq!(loaded.units_per_package, 10);
        assert_eq!(loaded.stock, 0);
        assert!(loaded.is_active);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let db = setup().await;
        let err = db.products().get("nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(db.products().get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_validates() {
        let db = setup().await;
        let err = db
            .products()
            .create(NewProduct::new("Bad", 250, 90).units_per_package(0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        let err = db
            .products()
            .create(NewProduct::new("", 250, 90))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_list_active_skips_deactivated() {
        let db = setup().await;
        let tulip = db
            .products()
            .create(NewProduct::new("Tulip", 180, 70))
            .await
            .unwrap();
        db.products()
            .create(NewProduct::new("Lily", 400, 150))
            .await
            .unwrap();

        db.products().deactivate(&tulip.id).await.unwrap();

        let names: Vec<_> = db
            .products()
            .list_active()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Lily".to_string()]);
    }

    #[tokio::test]
    async fn test_update_pricing_and_care() {
        let db = setup().await;
        let rose = db
            .products()
            .create(NewProduct::new("Red Rose", 250, 90))
            .await
            .unwrap();

        let updated = db
            .products()
            .update_pricing(&rose.id, 300, 100, 12)
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 300);
        assert_eq!(updated.units_per_package, 12);

        let updated = db
            .products()
            .update_care_intervals(&rose.id, 1, 4)
            .await
            .unwrap();
        assert_eq!(updated.care_intervals().water_days, 1);
        assert_eq!(updated.care_intervals().cut_days, 4);

        assert!(db
            .products()
            .update_care_intervals(&rose.id, 0, 4)
            .await
            .is_err());
        assert!(db
            .products()
            .update_pricing("ghost", 1, 1, 1)
            .await
            .is_err());
    }
}
