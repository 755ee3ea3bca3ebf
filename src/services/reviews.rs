use crate::{
    entities::{product, review, user},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Serialize)]
pub struct ReviewView {
    pub review: review::Model,
    pub reviewer_name: Option<String>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create or replace the caller's review of a product. One review per
    /// (user, product).
    pub async fn upsert(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<review::Model, ServiceError> {
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::ValidationError(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let existing = review::Entity::find()
            .filter(review::Column::UserId.eq(user_id))
            .filter(review::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?;

        match existing {
            Some(current) => {
                let mut active: review::ActiveModel = current.into();
                active.rating = Set(rating);
                active.comment = Set(comment);
                active.updated_at = Set(Utc::now());
                Ok(active.update(&*self.db).await?)
            }
            None => {
                let model = review::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(product_id),
                    rating: Set(rating),
                    comment: Set(comment),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                };
                Ok(model.insert(&*self.db).await?)
            }
        }
    }

    pub async fn list_for_product(
        &self,
        product_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ReviewView>, u64), ServiceError> {
        let paginator = review::Entity::find()
            .filter(review::Column::ProductId.eq(product_id))
            .find_also_related(user::Entity)
            .order_by_desc(review::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((
            rows.into_iter()
                .map(|(review, reviewer)| ReviewView {
                    review,
                    reviewer_name: reviewer.map(|u| u.full_name),
                })
                .collect(),
            total,
        ))
    }

    /// Delete a review; owners may delete their own, admins any.
    pub async fn delete(
        &self,
        review_id: Uuid,
        requester: Uuid,
        is_admin: bool,
    ) -> Result<(), ServiceError> {
        let review = review::Entity::find_by_id(review_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", review_id)))?;

        if !is_admin && review.user_id != requester {
            return Err(ServiceError::Forbidden(
                "Review belongs to another user".to_string(),
            ));
        }

        review::Entity::delete_by_id(review_id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}
