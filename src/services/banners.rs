use crate::{entities::banner, errors::ServiceError};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct BannerService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBannerInput {
    pub title: String,
    pub image_path: String,
    pub target_url: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBannerInput {
    pub title: Option<String>,
    pub image_path: Option<String>,
    pub target_url: Option<String>,
    pub position: Option<i32>,
    pub active: Option<bool>,
}

impl BannerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateBannerInput) -> Result<banner::Model, ServiceError> {
        let model = banner::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            image_path: Set(input.image_path),
            target_url: Set(input.target_url),
            position: Set(input.position.unwrap_or(0)),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        Ok(model.insert(&*self.db).await?)
    }

    /// Active banners in display order, for the storefront.
    pub async fn active(&self) -> Result<Vec<banner::Model>, ServiceError> {
        Ok(banner::Entity::find()
            .filter(banner::Column::Active.eq(true))
            .order_by_asc(banner::Column::Position)
            .all(&*self.db)
            .await?)
    }

    pub async fn list_all(&self) -> Result<Vec<banner::Model>, ServiceError> {
        Ok(banner::Entity::find()
            .order_by_asc(banner::Column::Position)
            .all(&*self.db)
            .await?)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateBannerInput,
    ) -> Result<banner::Model, ServiceError> {
        let existing = banner::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Banner {} not found", id)))?;

        let mut active: banner::ActiveModel = existing.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(image_path) = input.image_path {
            active.image_path = Set(image_path);
        }
        if let Some(target_url) = input.target_url {
            active.target_url = Set(Some(target_url));
        }
        if let Some(position) = input.position {
            active.position = Set(position);
        }
        if let Some(is_active) = input.active {
            active.active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = banner::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Banner {} not found", id)));
        }
        Ok(())
    }
}
