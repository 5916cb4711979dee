use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::sweets;

/// Fields for a new catalog entry.
#[derive(Debug, Clone)]
pub struct NewSweet {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub quantity: i64,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct SweetPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
}

/// Optional conjunctive search filters.
#[derive(Debug, Clone, Default)]
pub struct SweetFilter {
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

/// Result of a stock-mutating operation (purchase/restock).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutcome {
    Updated(i64),
    NotFound,
    InsufficientStock,
}

pub struct SweetRepository {
    conn: DatabaseConnection,
}

impl SweetRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, sweet: NewSweet) -> Result<sweets::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = sweets::ActiveModel {
            name: Set(sweet.name),
            category: Set(sweet.category),
            price: Set(sweet.price),
            quantity: Set(sweet.quantity),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert sweet")?;

        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<sweets::Model>> {
        let sweet = sweets::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query sweet by id")?;

        Ok(sweet)
    }

    pub async fn list(&self) -> Result<Vec<sweets::Model>> {
        let rows = sweets::Entity::find()
            .order_by_asc(sweets::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list sweets")?;

        Ok(rows)
    }

    /// Filters are conjunctive; absent filters impose no constraint.
    /// Name matching is a case-insensitive substring, category is exact,
    /// price bounds are inclusive.
    pub async fn search(&self, filter: SweetFilter) -> Result<Vec<sweets::Model>> {
        let mut query = sweets::Entity::find();

        if let Some(name) = filter.name {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(sweets::Column::Name)))
                    .like(format!("%{}%", name.to_lowercase())),
            );
        }
        if let Some(category) = filter.category {
            query = query.filter(sweets::Column::Category.eq(category));
        }
        if let Some(min_price) = filter.min_price {
            query = query.filter(sweets::Column::Price.gte(min_price));
        }
        if let Some(max_price) = filter.max_price {
            query = query.filter(sweets::Column::Price.lte(max_price));
        }

        let rows = query
            .order_by_asc(sweets::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to search sweets")?;

        Ok(rows)
    }

    /// Apply only the fields present in the patch.
    pub async fn update(&self, id: i32, patch: SweetPatch) -> Result<Option<sweets::Model>> {
        let Some(sweet) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: sweets::ActiveModel = sweet.into();

        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(category) = patch.category {
            active.category = Set(category);
        }
        if let Some(price) = patch.price {
            active.price = Set(price);
        }
        if let Some(quantity) = patch.quantity {
            active.quantity = Set(quantity);
        }

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update sweet")?;

        Ok(Some(model))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = sweets::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete sweet")?;

        Ok(result.rows_affected > 0)
    }

    /// Decrement stock by `quantity` if enough is available.
    /// The read and write run in one transaction so two concurrent
    /// purchases cannot both pass the stock check.
    pub async fn purchase(&self, id: i32, quantity: i64) -> Result<StockOutcome> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to begin purchase transaction")?;

        let Some(sweet) = sweets::Entity::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(StockOutcome::NotFound);
        };

        if sweet.quantity < quantity {
            txn.rollback().await?;
            return Ok(StockOutcome::InsufficientStock);
        }

        let remaining = sweet.quantity - quantity;
        let mut active: sweets::ActiveModel = sweet.into();
        active.quantity = Set(remaining);
        active.update(&txn).await?;

        txn.commit()
            .await
            .context("Failed to commit purchase transaction")?;

        Ok(StockOutcome::Updated(remaining))
    }

    /// Increment stock by `quantity`.
    pub async fn restock(&self, id: i32, quantity: i64) -> Result<StockOutcome> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to begin restock transaction")?;

        let Some(sweet) = sweets::Entity::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(StockOutcome::NotFound);
        };

        let total = sweet.quantity + quantity;
        let mut active: sweets::ActiveModel = sweet.into();
        active.quantity = Set(total);
        active.update(&txn).await?;

        txn.commit()
            .await
            .context("Failed to commit restock transaction")?;

        Ok(StockOutcome::Updated(total))
    }
}
