//! Catalog management: categories, brands, products, variants and media.
//!
//! Product creation accepts the complete wizard payload (category, brand,
//! product, variants with attributes) and persists it inside a single
//! transaction, so a failure partway through leaves no partial state.

use crate::{
    entities::{brand, category, product, product_media, product_variant, review},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    events: EventSender,
}

// Inputs

#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBrandInput {
    pub name: String,
    pub slug: String,
    pub logo_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBrandInput {
    pub name: Option<String>,
    pub logo_path: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVariantInput {
    pub sku: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    /// Attribute map, e.g. {"size": "M", "color": "navy"}.
    pub attributes: serde_json::Value,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub category_id: Uuid,
    pub brand_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub variants: Vec<CreateVariantInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVariantInput {
    pub price: Option<Decimal>,
    pub attributes: Option<serde_json::Value>,
    pub position: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub search: Option<String>,
    /// Keep products with at least one variant priced in `[min, max]`.
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub include_inactive: Option<bool>,
}

// Views

#[derive(Debug, Serialize)]
pub struct ProductListItem {
    pub product: product::Model,
    pub price_from: Option<Decimal>,
    pub variant_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ReviewSummary {
    pub average_rating: Option<f64>,
    pub review_count: u64,
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: product::Model,
    pub category: Option<category::Model>,
    pub brand: Option<brand::Model>,
    pub variants: Vec<product_variant::Model>,
    pub media: Vec<product_media::Model>,
    pub reviews: ReviewSummary,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, events: EventSender) -> Self {
        Self { db, events }
    }

    // Categories

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        self.ensure_slug_free::<category::Entity>(
            category::Column::Slug,
            &input.slug,
            "category",
        )
        .await?;

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn list_categories(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<category::Model>, ServiceError> {
        let mut query = category::Entity::find().order_by_asc(category::Column::Name);
        if !include_inactive {
            query = query.filter(category::Column::Active.eq(true));
        }
        Ok(query.all(&*self.db).await?)
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        let existing = category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))?;

        let mut active: category::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(is_active) = input.active {
            active.active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let in_use = product::Entity::find()
            .filter(product::Column::CategoryId.eq(id))
            .count(&*self.db)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category {} still has {} products",
                id, in_use
            )));
        }
        let result = category::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Category {} not found", id)));
        }
        Ok(())
    }

    // Brands

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_brand(
        &self,
        input: CreateBrandInput,
    ) -> Result<brand::Model, ServiceError> {
        self.ensure_slug_free::<brand::Entity>(brand::Column::Slug, &input.slug, "brand")
            .await?;

        let model = brand::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(input.slug),
            logo_path: Set(input.logo_path),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn update_brand(
        &self,
        id: Uuid,
        input: UpdateBrandInput,
    ) -> Result<brand::Model, ServiceError> {
        let existing = brand::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Brand {} not found", id)))?;

        let mut active: brand::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(logo_path) = input.logo_path {
            active.logo_path = Set(Some(logo_path));
        }
        if let Some(flag) = input.active {
            active.active = Set(flag);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    pub async fn list_brands(&self) -> Result<Vec<brand::Model>, ServiceError> {
        Ok(brand::Entity::find()
            .filter(brand::Column::Active.eq(true))
            .order_by_asc(brand::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Brands that have at least one product in the given category. Drives
    /// the related-entity filtering step of the creation wizard and the
    /// storefront's brand facet.
    pub async fn brands_for_category(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<brand::Model>, ServiceError> {
        let brand_ids: Vec<Uuid> = product::Entity::find()
            .filter(product::Column::CategoryId.eq(category_id))
            .select_only()
            .column(product::Column::BrandId)
            .distinct()
            .into_tuple()
            .all(&*self.db)
            .await?;

        if brand_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(brand::Entity::find()
            .filter(brand::Column::Id.is_in(brand_ids))
            .order_by_asc(brand::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn delete_brand(&self, id: Uuid) -> Result<(), ServiceError> {
        let in_use = product::Entity::find()
            .filter(product::Column::BrandId.eq(id))
            .count(&*self.db)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Brand {} still has {} products",
                id, in_use
            )));
        }
        let result = brand::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Brand {} not found", id)));
        }
        Ok(())
    }

    // Products

    /// Persist the full product-creation wizard payload in one transaction.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_product(
        &self,
        created_by: Uuid,
        input: CreateProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        if input.variants.is_empty() {
            return Err(ServiceError::ValidationError(
                "A product needs at least one variant".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        category::Entity::find_by_id(input.category_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category {} not found", input.category_id))
            })?;
        brand::Entity::find_by_id(input.brand_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Brand {} not found", input.brand_id)))?;

        let slug_taken = product::Entity::find()
            .filter(product::Column::Slug.eq(input.slug.clone()))
            .one(&txn)
            .await?;
        if slug_taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A product with slug '{}' already exists",
                input.slug
            )));
        }

        let product_id = Uuid::new_v4();
        let model = product::ActiveModel {
            id: Set(product_id),
            category_id: Set(input.category_id),
            brand_id: Set(input.brand_id),
            created_by: Set(created_by),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let created = model.insert(&txn).await?;

        for (idx, variant) in input.variants.into_iter().enumerate() {
            Self::insert_variant(&txn, product_id, idx as i32, variant).await?;
        }

        txn.commit().await?;

        self.events
            .send_or_log(Event::ProductCreated(product_id))
            .await;
        info!("Created product {} with variants", product_id);

        self.product_detail(created.id).await
    }

    async fn insert_variant(
        conn: &impl ConnectionTrait,
        product_id: Uuid,
        default_position: i32,
        input: CreateVariantInput,
    ) -> Result<product_variant::Model, ServiceError> {
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price must be non-negative".to_string(),
            ));
        }
        if input.stock_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "stock_quantity must be non-negative".to_string(),
            ));
        }

        let existing = product_variant::Entity::find()
            .filter(product_variant::Column::Sku.eq(input.sku.clone()))
            .one(conn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU '{}' is already in use",
                input.sku
            )));
        }

        let model = product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            sku: Set(input.sku),
            price: Set(input.price),
            stock_quantity: Set(input.stock_quantity),
            attributes: Set(input.attributes),
            position: Set(input.position.unwrap_or(default_position)),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        Ok(model.insert(conn).await?)
    }

    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductListItem>, u64), ServiceError> {
        let mut query = product::Entity::find().order_by_desc(product::Column::CreatedAt);

        if !filter.include_inactive.unwrap_or(false) {
            query = query.filter(product::Column::Active.eq(true));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(brand_id) = filter.brand_id {
            query = query.filter(product::Column::BrandId.eq(brand_id));
        }
        if let Some(search) = filter.search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(product::Column::Name.contains(search.trim()));
        }
        if filter.price_min.is_some() || filter.price_max.is_some() {
            let mut variant_query = product_variant::Entity::find()
                .select_only()
                .column(product_variant::Column::ProductId)
                .distinct();
            if let Some(min) = filter.price_min {
                variant_query = variant_query.filter(product_variant::Column::Price.gte(min));
            }
            if let Some(max) = filter.price_max {
                variant_query = variant_query.filter(product_variant::Column::Price.lte(max));
            }
            let matching: Vec<Uuid> = variant_query.into_tuple().all(&*self.db).await?;
            query = query.filter(product::Column::Id.is_in(matching));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let variants = if ids.is_empty() {
            Vec::new()
        } else {
            product_variant::Entity::find()
                .filter(product_variant::Column::ProductId.is_in(ids))
                .all(&*self.db)
                .await?
        };

        let items = products
            .into_iter()
            .map(|p| {
                let own: Vec<&product_variant::Model> =
                    variants.iter().filter(|v| v.product_id == p.id).collect();
                ProductListItem {
                    price_from: own.iter().map(|v| v.price).min(),
                    variant_count: own.len(),
                    product: p,
                }
            })
            .collect();

        Ok((items, total))
    }

    pub async fn product_detail(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let category = category::Entity::find_by_id(product.category_id)
            .one(&*self.db)
            .await?;
        let brand = brand::Entity::find_by_id(product.brand_id)
            .one(&*self.db)
            .await?;
        let variants = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(id))
            .order_by_asc(product_variant::Column::Position)
            .all(&*self.db)
            .await?;
        let media = product_media::Entity::find()
            .filter(product_media::Column::ProductId.eq(id))
            .order_by_asc(product_media::Column::Position)
            .all(&*self.db)
            .await?;

        let ratings: Vec<i32> = review::Entity::find()
            .filter(review::Column::ProductId.eq(id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|r| r.rating)
            .collect();
        let reviews = ReviewSummary {
            review_count: ratings.len() as u64,
            average_rating: if ratings.is_empty() {
                None
            } else {
                Some(ratings.iter().sum::<i32>() as f64 / ratings.len() as f64)
            },
        };

        Ok(ProductDetail {
            product,
            category,
            brand,
            variants,
            media,
            reviews,
        })
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let existing = product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        if let Some(category_id) = input.category_id {
            category::Entity::find_by_id(category_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category {} not found", category_id))
                })?;
        }
        if let Some(brand_id) = input.brand_id {
            brand::Entity::find_by_id(brand_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Brand {} not found", brand_id)))?;
        }

        let mut active: product::ActiveModel = existing.into();
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(brand_id) = input.brand_id {
            active.brand_id = Set(brand_id);
        }
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(is_active) = input.active {
            active.active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        self.events.send_or_log(Event::ProductUpdated(id)).await;
        Ok(updated)
    }

    /// Delete a product together with its variants and media.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let existing = product::Entity::find_by_id(id).one(&txn).await?;
        if existing.is_none() {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }

        product_media::Entity::delete_many()
            .filter(product_media::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        product_variant::Entity::delete_many()
            .filter(product_variant::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        review::Entity::delete_many()
            .filter(review::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        product::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        self.events.send_or_log(Event::ProductDeleted(id)).await;
        Ok(())
    }

    // Variants

    pub async fn add_variant(
        &self,
        product_id: Uuid,
        input: CreateVariantInput,
    ) -> Result<product_variant::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let next_position = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .count(&*self.db)
            .await? as i32;

        Self::insert_variant(&*self.db, product_id, next_position, input).await
    }

    pub async fn update_variant(
        &self,
        variant_id: Uuid,
        input: UpdateVariantInput,
    ) -> Result<product_variant::Model, ServiceError> {
        let existing = product_variant::Entity::find_by_id(variant_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;

        let mut active: product_variant::ActiveModel = existing.into();
        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "price must be non-negative".to_string(),
                ));
            }
            active.price = Set(price);
        }
        if let Some(attributes) = input.attributes {
            active.attributes = Set(attributes);
        }
        if let Some(position) = input.position {
            active.position = Set(position);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    pub async fn delete_variant(&self, variant_id: Uuid) -> Result<(), ServiceError> {
        let result = product_variant::Entity::delete_by_id(variant_id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Variant {} not found",
                variant_id
            )));
        }
        Ok(())
    }

    // Media

    pub async fn add_media(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        file_path: String,
        mime_type: String,
    ) -> Result<product_media::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if let Some(variant_id) = variant_id {
            let variant = product_variant::Entity::find_by_id(variant_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Variant {} not found", variant_id))
                })?;
            if variant.product_id != product_id {
                return Err(ServiceError::InvalidOperation(
                    "Variant does not belong to this product".to_string(),
                ));
            }
        }

        let position = product_media::Entity::find()
            .filter(product_media::Column::ProductId.eq(product_id))
            .count(&*self.db)
            .await? as i32;

        let model = product_media::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            variant_id: Set(variant_id),
            file_path: Set(file_path),
            mime_type: Set(mime_type),
            position: Set(position),
            created_at: Set(Utc::now()),
        };
        Ok(model.insert(&*self.db).await?)
    }

    async fn ensure_slug_free<E>(
        &self,
        column: impl ColumnTrait,
        slug: &str,
        kind: &str,
    ) -> Result<(), ServiceError>
    where
        E: EntityTrait,
    {
        let existing = E::find()
            .filter(column.eq(slug))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A {} with slug '{}' already exists",
                kind, slug
            )));
        }
        Ok(())
    }
}
