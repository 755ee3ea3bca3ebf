//! Order placement and lifecycle.
//!
//! Placing an order snapshots cart lines into order items, applies an
//! optional coupon, clears the cart and notifies the customer, all inside
//! one transaction. Stock is deliberately untouched: there is no reservation
//! ledger, and the admin dashboard derives availability at read time.

use crate::{
    entities::{
        cart_item, coupon, notification, order, order_item, product, product_variant,
        order::OrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::coupons::{compute_discount, validate_coupon},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderInput {
    pub shipping_name: String,
    pub shipping_phone: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    /// Place an order from the user's current cart.
    #[instrument(skip(self, input))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let cart_rows = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .find_also_related(product_variant::Entity)
            .all(&txn)
            .await?;
        if cart_rows.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
        }

        let product_ids: Vec<Uuid> = cart_rows
            .iter()
            .filter_map(|(_, v)| v.as_ref().map(|v| v.product_id))
            .collect();
        let products = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(&txn)
            .await?;

        let mut subtotal = Decimal::ZERO;
        let mut lines = Vec::with_capacity(cart_rows.len());
        for (item, variant) in &cart_rows {
            let variant = variant.as_ref().ok_or_else(|| {
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
            lines.push((item, variant.clone(), product_name, line_total));
        }

        // Resolve and consume the coupon inside the transaction so its usage
        // count moves with the order.
        let mut discount_total = Decimal::ZERO;
        let mut applied_code = None;
        if let Some(code) = input
            .coupon_code
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
        {
            let coupon_row = coupon::Entity::find()
                .filter(coupon::Column::Code.eq(code.clone()))
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))?;

            validate_coupon(&coupon_row, subtotal, Utc::now())?;
            discount_total = compute_discount(&coupon_row, subtotal);

            let used = coupon_row.used_count;
            let mut coupon_active: coupon::ActiveModel = coupon_row.into();
            coupon_active.used_count = Set(used + 1);
            coupon_active.updated_at = Set(Utc::now());
            coupon_active.update(&txn).await?;
            applied_code = Some(code);
        }

        let order_id = Uuid::new_v4();
        let total = subtotal - discount_total;
        let order_model = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            subtotal: Set(subtotal),
            discount_total: Set(discount_total),
            total: Set(total),
            coupon_code: Set(applied_code.clone()),
            shipping_name: Set(input.shipping_name),
            shipping_phone: Set(input.shipping_phone),
            shipping_address: Set(input.shipping_address),
            shipping_city: Set(input.shipping_city),
            shipping_postal_code: Set(input.shipping_postal_code),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let order = order_model.insert(&txn).await?;

        let mut items = Vec::with_capacity(lines.len());
        for (cart_line, variant, product_name, line_total) in lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                variant_id: Set(variant.id),
                product_name: Set(product_name),
                sku: Set(variant.sku),
                unit_price: Set(variant.price),
                quantity: Set(cart_line.quantity),
                line_total: Set(line_total),
                created_at: Set(Utc::now()),
            };
            items.push(item.insert(&txn).await?);
        }

        cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        let note = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set("Order placed".to_string()),
            body: Set(format!("Your order {} has been placed.", order_id)),
            read: Set(false),
            created_at: Set(Utc::now()),
        };
        note.insert(&txn).await?;

        txn.commit().await?;

        self.events.send_or_log(Event::OrderPlaced(order_id)).await;
        if let Some(code) = applied_code {
            self.events
                .send_or_log(Event::CouponRedeemed { code, order_id })
                .await;
        }
        info!("Placed order {} for user {}", order_id, user_id);

        Ok(OrderWithItems { order, items })
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Fetch an order with items. Non-admin callers only see their own.
    pub async fn get_order(
        &self,
        order_id: Uuid,
        requester: Uuid,
        is_admin: bool,
    ) -> Result<OrderWithItems, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !is_admin && order.user_id != requester {
            return Err(ServiceError::Forbidden(
                "Order belongs to another user".to_string(),
            ));
        }

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(OrderWithItems { order, items })
    }

    /// Customer cancellation, allowed while the order is still pending.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Order belongs to another user".to_string(),
            ));
        }
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Order in status '{}' can no longer be cancelled",
                order.status.as_str()
            )));
        }

        let updated = self.set_status(order, OrderStatus::Cancelled).await?;
        self.events
            .send_or_log(Event::OrderCancelled(order_id))
            .await;
        Ok(updated)
    }

    pub async fn admin_list(
        &self,
        status: Option<OrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let mut query = order::Entity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Admin status advance along the legal transition graph.
    #[instrument(skip(self))]
    pub async fn advance_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !order.status.can_transition_to(next) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot move order from '{}' to '{}'",
                order.status.as_str(),
                next.as_str()
            )));
        }

        let old_status = order.status;
        let updated = self.set_status(order, next).await?;
        self.events
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.as_str().to_string(),
                new_status: next.as_str().to_string(),
            })
            .await;
        Ok(updated)
    }

    async fn set_status(
        &self,
        order: order::Model,
        status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let mut active: order::ActiveModel = order.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }
}
