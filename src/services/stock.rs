//! Admin stock management: the stock snapshot projection, direct stock
//! overwrites, and low-stock alerts.
//!
//! The projection is a point-in-time, read-time derivation. It carries no
//! reservation semantics: nothing prevents the cart hold from exceeding the
//! recorded stock, and concurrent checkouts can oversell. The `max(0, ..)`
//! clamp exists for display only.

use crate::{
    entities::{
        cart_item, order, order_item, product, product_variant, stock_alert, wishlist_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Display status of a variant on the stock dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Low")]
    Low,
    #[serde(rename = "In Stock")]
    InStock,
}

impl StockStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Out of Stock" => Some(StockStatus::OutOfStock),
            "Low" => Some(StockStatus::Low),
            "In Stock" => Some(StockStatus::InStock),
            _ => None,
        }
    }
}

/// `max(0, stock_quantity - cart_hold)`.
pub fn available_stock(stock_quantity: i64, cart_hold: i64) -> i64 {
    (stock_quantity - cart_hold).max(0)
}

/// Status partition over `available_stock >= 0`. Exhaustive and mutually
/// exclusive: exactly one arm matches for every non-negative input.
pub fn stock_status(available_stock: i64, threshold: i64) -> StockStatus {
    if available_stock == 0 {
        StockStatus::OutOfStock
    } else if available_stock < threshold {
        StockStatus::Low
    } else {
        StockStatus::InStock
    }
}

/// One row of the admin stock dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StockSnapshot {
    pub variant_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub cart_hold: i64,
    pub sold_count: i64,
    pub available_stock: i64,
    pub status: StockStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockAlertView {
    pub alert: stock_alert::Model,
    pub sku: Option<String>,
}

#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
    threshold: i64,
}

/// Per-variant hold and sold aggregates for a set of variants.
struct HoldCounts {
    cart: HashMap<Uuid, i64>,
    wishlist: HashMap<Uuid, i64>,
    sold: HashMap<Uuid, i64>,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender, threshold: i64) -> Self {
        Self {
            db,
            events,
            threshold,
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Stock dashboard: one snapshot per variant, recomputed from the cart,
    /// wishlist and order tables on every call. The status only exists after
    /// derivation, so snapshots are built for every variant first; the status
    /// filter and the page window apply to the derived set, and `total` is
    /// the filtered count.
    #[instrument(skip(self))]
    pub async fn overview(
        &self,
        page: u64,
        per_page: u64,
        status_filter: Option<StockStatus>,
    ) -> Result<(Vec<StockSnapshot>, u64), ServiceError> {
        let rows = product_variant::Entity::find()
            .find_also_related(product::Entity)
            .order_by_asc(product_variant::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|(v, _)| v.id).collect();
        let counts = self.hold_counts(&ids).await?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for (variant, product) in rows {
            let snapshot = self.snapshot_from_counts(&variant, product.as_ref(), &counts);
            if snapshot.status != StockStatus::InStock {
                self.ensure_alert(&snapshot).await?;
            }
            if status_filter.map_or(true, |f| f == snapshot.status) {
                snapshots.push(snapshot);
            }
        }

        let total = snapshots.len() as u64;
        let per_page = per_page.max(1) as usize;
        let offset = page.saturating_sub(1) as usize * per_page;
        let page_rows: Vec<StockSnapshot> =
            snapshots.into_iter().skip(offset).take(per_page).collect();

        Ok((page_rows, total))
    }

    /// Snapshot for a single variant.
    pub async fn snapshot_for_variant(
        &self,
        variant_id: Uuid,
    ) -> Result<StockSnapshot, ServiceError> {
        let (variant, product) = product_variant::Entity::find_by_id(variant_id)
            .find_also_related(product::Entity)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

        let counts = self.hold_counts(&[variant_id]).await?;
        Ok(self.snapshot_from_counts(&variant, product.as_ref(), &counts))
    }

    /// Direct overwrite of a variant's stock quantity. This is the only
    /// mutation path for `stock_quantity`; nothing else increments or
    /// decrements it.
    #[instrument(skip(self))]
    pub async fn update_stock(
        &self,
        variant_id: Uuid,
        stock_quantity: i32,
    ) -> Result<StockSnapshot, ServiceError> {
        if stock_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "stock_quantity must be non-negative".to_string(),
            ));
        }

        let variant = product_variant::Entity::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

        let mut active: product_variant::ActiveModel = variant.into();
        active.stock_quantity = Set(stock_quantity);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        self.events
            .send_or_log(Event::StockUpdated {
                variant_id,
                stock_quantity,
            })
            .await;

        let snapshot = self.snapshot_for_variant(variant_id).await?;
        if snapshot.status != StockStatus::InStock {
            self.ensure_alert(&snapshot).await?;
        }

        info!(
            "Stock for variant {} set to {} (available: {})",
            variant_id, stock_quantity, snapshot.available_stock
        );
        Ok(snapshot)
    }

    /// List stock alerts, unacknowledged first.
    pub async fn alerts(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<StockAlertView>, u64), ServiceError> {
        let paginator = stock_alert::Entity::find()
            .find_also_related(product_variant::Entity)
            .order_by_asc(stock_alert::Column::Acknowledged)
            .order_by_desc(stock_alert::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((
            rows.into_iter()
                .map(|(alert, variant)| StockAlertView {
                    alert,
                    sku: variant.map(|v| v.sku),
                })
                .collect(),
            total,
        ))
    }

    /// Acknowledge an alert, closing it.
    pub async fn acknowledge_alert(
        &self,
        alert_id: Uuid,
    ) -> Result<stock_alert::Model, ServiceError> {
        let alert = stock_alert::Entity::find_by_id(alert_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock alert {} not found", alert_id)))?;

        let mut active: stock_alert::ActiveModel = alert.into();
        active.acknowledged = Set(true);
        active.acknowledged_at = Set(Some(Utc::now()));
        Ok(active.update(&*self.db).await?)
    }

    fn snapshot_from_counts(
        &self,
        variant: &product_variant::Model,
        product: Option<&product::Model>,
        counts: &HoldCounts,
    ) -> StockSnapshot {
        // Absent aggregates default to 0.
        let cart = counts.cart.get(&variant.id).copied().unwrap_or(0);
        let wishlist = counts.wishlist.get(&variant.id).copied().unwrap_or(0);
        let sold = counts.sold.get(&variant.id).copied().unwrap_or(0);

        let cart_hold = cart + wishlist;
        let available = available_stock(variant.stock_quantity as i64, cart_hold);

        StockSnapshot {
            variant_id: variant.id,
            product_id: variant.product_id,
            product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
            sku: variant.sku.clone(),
            price: variant.price,
            stock_quantity: variant.stock_quantity,
            cart_hold,
            sold_count: sold,
            available_stock: available,
            status: stock_status(available, self.threshold),
        }
    }

    async fn hold_counts(&self, variant_ids: &[Uuid]) -> Result<HoldCounts, ServiceError> {
        let mut counts = HoldCounts {
            cart: HashMap::new(),
            wishlist: HashMap::new(),
            sold: HashMap::new(),
        };
        if variant_ids.is_empty() {
            return Ok(counts);
        }

        let cart_items = cart_item::Entity::find()
            .filter(cart_item::Column::VariantId.is_in(variant_ids.to_vec()))
            .all(&*self.db)
            .await?;
        for item in cart_items {
            *counts.cart.entry(item.variant_id).or_insert(0) += item.quantity.max(0) as i64;
        }

        let wishlist_rows = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::VariantId.is_in(variant_ids.to_vec()))
            .all(&*self.db)
            .await?;
        for row in wishlist_rows {
            *counts.wishlist.entry(row.variant_id).or_insert(0) += 1;
        }

        let order_items = order_item::Entity::find()
            .filter(order_item::Column::VariantId.is_in(variant_ids.to_vec()))
            .find_also_related(order::Entity)
            .all(&*self.db)
            .await?;
        for (item, parent) in order_items {
            let cancelled = parent
                .map(|o| o.status == order::OrderStatus::Cancelled)
                .unwrap_or(false);
            if !cancelled {
                *counts.sold.entry(item.variant_id).or_insert(0) += item.quantity.max(0) as i64;
            }
        }

        Ok(counts)
    }

    /// Keep at most one unacknowledged alert per variant.
    async fn ensure_alert(&self, snapshot: &StockSnapshot) -> Result<(), ServiceError> {
        let existing = stock_alert::Entity::find()
            .filter(stock_alert::Column::VariantId.eq(snapshot.variant_id))
            .filter(stock_alert::Column::Acknowledged.eq(false))
            .one(&*self.db)
            .await?;

        if existing.is_none() {
            let alert = stock_alert::ActiveModel {
                id: Set(Uuid::new_v4()),
                variant_id: Set(snapshot.variant_id),
                available_stock: Set(snapshot.available_stock),
                threshold: Set(self.threshold),
                acknowledged: Set(false),
                created_at: Set(Utc::now()),
                acknowledged_at: Set(None),
            };
            alert.insert(&*self.db).await?;

            self.events
                .send_or_log(Event::LowStockDetected {
                    variant_id: snapshot.variant_id,
                    available_stock: snapshot.available_stock,
                })
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_stock_is_simple_subtraction() {
        assert_eq!(available_stock(10, 2), 8);
        assert_eq!(available_stock(10, 0), 10);
        assert_eq!(available_stock(0, 0), 0);
    }

    #[test]
    fn available_stock_clamps_at_zero() {
        // Holds exceeding stock is possible and documented; the clamp is
        // display-only.
        assert_eq!(available_stock(10, 12), 0);
        assert_eq!(available_stock(0, 100), 0);
    }

    #[test]
    fn status_out_of_stock_iff_zero_available() {
        assert_eq!(stock_status(0, 5), StockStatus::OutOfStock);
        assert_ne!(stock_status(1, 5), StockStatus::OutOfStock);
    }

    #[test]
    fn status_low_strictly_between_zero_and_threshold() {
        for available in 1..5 {
            assert_eq!(stock_status(available, 5), StockStatus::Low);
        }
        assert_eq!(stock_status(5, 5), StockStatus::InStock);
    }

    #[test]
    fn status_partition_is_exhaustive_and_exclusive() {
        let threshold = 5;
        for available in 0..100 {
            let status = stock_status(available, threshold);
            let expected = if available == 0 {
                StockStatus::OutOfStock
            } else if available < threshold {
                StockStatus::Low
            } else {
                StockStatus::InStock
            };
            assert_eq!(status, expected, "available={}", available);
        }
    }

    // Reference scenarios for the dashboard projection.

    #[test]
    fn scenario_holds_exceed_stock() {
        let available = available_stock(10, 12);
        assert_eq!(available, 0);
        assert_eq!(stock_status(available, 5), StockStatus::OutOfStock);
    }

    #[test]
    fn scenario_plenty_available() {
        let available = available_stock(10, 2);
        assert_eq!(available, 8);
        assert_eq!(stock_status(available, 5), StockStatus::InStock);
    }

    #[test]
    fn scenario_running_low() {
        let available = available_stock(10, 7);
        assert_eq!(available, 3);
        assert_eq!(stock_status(available, 5), StockStatus::Low);
    }

    #[test]
    fn status_serializes_to_display_strings() {
        assert_eq!(
            serde_json::to_string(&StockStatus::OutOfStock).unwrap(),
            "\"Out of Stock\""
        );
        assert_eq!(
            serde_json::to_string(&StockStatus::Low).unwrap(),
            "\"Low\""
        );
        assert_eq!(
            serde_json::to_string(&StockStatus::InStock).unwrap(),
            "\"In Stock\""
        );
    }

    #[test]
    fn status_parse_round_trips() {
        for s in [StockStatus::OutOfStock, StockStatus::Low, StockStatus::InStock] {
            let text = serde_json::to_string(&s).unwrap();
            let trimmed = text.trim_matches('"');
            assert_eq!(StockStatus::parse(trimmed), Some(s));
        }
        assert_eq!(StockStatus::parse("Backordered"), None);
    }
}
