use crate::{
    entities::{product, product_variant, wishlist_item},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Per-user wishlist. Rows have no quantity; each counts as one held unit in
/// the stock projection.
#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Serialize)]
pub struct WishlistEntry {
    pub item: wishlist_item::Model,
    pub sku: String,
    pub product_name: String,
    pub price: Decimal,
}

impl WishlistService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Add a variant to the wishlist. Idempotent: adding a variant that is
    /// already saved returns the existing row.
    pub async fn add(
        &self,
        user_id: Uuid,
        variant_id: Uuid,
    ) -> Result<wishlist_item::Model, ServiceError> {
        product_variant::Entity::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

        let existing = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::VariantId.eq(variant_id))
            .one(&*self.db)
            .await?;
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let model = wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            variant_id: Set(variant_id),
            created_at: Set(Utc::now()),
        };
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn remove(&self, user_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let item = wishlist_item::Entity::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Wishlist item {} not found", item_id))
            })?;
        if item.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Wishlist item belongs to another user".to_string(),
            ));
        }
        wishlist_item::Entity::delete_by_id(item_id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<WishlistEntry>, ServiceError> {
        let rows = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .find_also_related(product_variant::Entity)
            .order_by_desc(wishlist_item::Column::CreatedAt)
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

        let mut entries = Vec::with_capacity(rows.len());
        for (item, variant) in rows {
            let variant = variant.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Wishlist item {} references missing variant",
                    item.id
                ))
            })?;
            let product_name = products
                .iter()
                .find(|p| p.id == variant.product_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            entries.push(WishlistEntry {
                sku: variant.sku.clone(),
                product_name,
                price: variant.price,
                item,
            });
        }
        Ok(entries)
    }
}
