//! Per-user shopping cart.
//!
//! There is no cart entity; a user's cart is the set of `cart_items` rows
//! keyed by user. Adding a variant that is already present increments its
//! quantity, and an update to quantity zero removes the row. No stock is
//! reserved or checked here: cart contents only influence the display-side
//! availability projection.

use crate::{
    entities::{cart_item, product, product_variant, wishlist_item},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

/// One cart line joined with its variant and product.
#[derive(Debug, Serialize)]
pub struct CartLine {
    pub item: cart_item::Model,
    pub sku: String,
    pub product_name: String,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    /// Add a variant to the user's cart, incrementing the quantity when the
    /// variant is already present. A matching wishlist row is removed: the
    /// item has graduated from "saved" to "held".
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        product_variant::Entity::find_by_id(variant_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

        let existing = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::VariantId.eq(variant_id))
            .one(&txn)
            .await?;

        match existing {
            Some(item) => {
                let current = item.quantity;
                let mut active: cart_item::ActiveModel = item.into();
                active.quantity = Set(current + quantity);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;
            }
            None => {
                let item = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    variant_id: Set(variant_id),
                    quantity: Set(quantity),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                };
                item.insert(&txn).await?;
            }
        }

        wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::VariantId.eq(variant_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.events
            .send_or_log(Event::CartItemAdded {
                user_id,
                variant_id,
            })
            .await;
        info!("Added variant {} x{} to cart of {}", variant_id, quantity, user_id);

        self.get_cart(user_id).await
    }

    /// Set a cart item's quantity. Zero or negative removes the item.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        let item = cart_item::Entity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        if item.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Cart item belongs to another user".to_string(),
            ));
        }

        if quantity <= 0 {
            cart_item::Entity::delete_by_id(item_id)
                .exec(&*self.db)
                .await?;
        } else {
            let mut active: cart_item::ActiveModel = item.into();
            active.quantity = Set(quantity);
            active.updated_at = Set(Utc::now());
            active.update(&*self.db).await?;
        }

        self.get_cart(user_id).await
    }

    pub async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, ServiceError> {
        self.update_quantity(user_id, item_id, 0).await
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<(), ServiceError> {
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;
        self.events.send_or_log(Event::CartCleared(user_id)).await;
        Ok(())
    }

    /// The user's cart with per-line and grand totals, priced at current
    /// variant prices.
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView, ServiceError> {
        let rows = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .find_also_related(product_variant::Entity)
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let product_ids: Vec<Uuid> = rows
            .iter()
            .filter_map(|(_, v)| v.as_ref().map(|v| v.product_id))
            .collect();
        let products = if product_ids.is_empty() {
            Vec::new()
        } else {
            product::Entity::find()
                .filter(product::Column::Id.is_in(product_ids))
                .all(&*self.db)
                .await?
        };

        let mut items = Vec::with_capacity(rows.len());
        let mut subtotal = Decimal::ZERO;
        for (item, variant) in rows {
            let variant = variant.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Cart item {} references missing variant",
                    item.id
                ))
            })?;
            let product_name = products
                .iter()
                .find(|p| p.id == variant.product_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();

            let line_total = variant.price * Decimal::from(item.quantity);
            subtotal += line_total;
            items.push(CartLine {
                sku: variant.sku.clone(),
                product_name,
                unit_price: variant.price,
                line_total,
                item,
            });
        }

        Ok(CartView { items, subtotal })
    }
}
