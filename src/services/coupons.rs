use crate::{
    entities::coupon::{self, CouponKind},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCouponInput {
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order_total: Decimal,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCouponInput {
    pub value: Option<Decimal>,
    pub min_order_total: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CouponPreview {
    pub code: String,
    pub discount: Decimal,
    pub total_after_discount: Decimal,
}

/// Check a coupon against an order subtotal at a given instant.
///
/// Pure so the order path and the preview endpoint share one rule set.
pub fn validate_coupon(
    coupon: &coupon::Model,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if !coupon.active {
        return Err(ServiceError::ValidationError(format!(
            "Coupon {} is not active",
            coupon.code
        )));
    }
    if now < coupon.starts_at {
        return Err(ServiceError::ValidationError(format!(
            "Coupon {} is not valid yet",
            coupon.code
        )));
    }
    if now > coupon.expires_at {
        return Err(ServiceError::ValidationError(format!(
            "Coupon {} has expired",
            coupon.code
        )));
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            return Err(ServiceError::ValidationError(format!(
                "Coupon {} has reached its usage limit",
                coupon.code
            )));
        }
    }
    if subtotal < coupon.min_order_total {
        return Err(ServiceError::ValidationError(format!(
            "Order total below the {} minimum for coupon {}",
            coupon.min_order_total, coupon.code
        )));
    }
    Ok(())
}

/// Discount amount for a valid coupon, capped at the subtotal.
pub fn compute_discount(coupon: &coupon::Model, subtotal: Decimal) -> Decimal {
    let raw = match coupon.kind {
        CouponKind::Percent => subtotal * coupon.value / Decimal::from(100),
        CouponKind::Fixed => coupon.value,
    };
    raw.min(subtotal).max(Decimal::ZERO)
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateCouponInput) -> Result<coupon::Model, ServiceError> {
        if input.value <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Coupon value must be positive".to_string(),
            ));
        }
        if input.kind == CouponKind::Percent && input.value > Decimal::from(100) {
            return Err(ServiceError::ValidationError(
                "Percent coupons cannot exceed 100".to_string(),
            ));
        }
        if input.expires_at <= input.starts_at {
            return Err(ServiceError::ValidationError(
                "expires_at must be after starts_at".to_string(),
            ));
        }

        let code = input.code.trim().to_uppercase();
        let existing = coupon::Entity::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon code '{}' already exists",
                code
            )));
        }

        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            kind: Set(input.kind),
            value: Set(input.value),
            min_order_total: Set(input.min_order_total),
            starts_at: Set(input.starts_at),
            expires_at: Set(input.expires_at),
            usage_limit: Set(input.usage_limit),
            used_count: Set(0),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<coupon::Model>, u64), ServiceError> {
        let paginator = coupon::Entity::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        let existing = coupon::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))?;

        let mut active: coupon::ActiveModel = existing.into();
        if let Some(value) = input.value {
            active.value = Set(value);
        }
        if let Some(min_order_total) = input.min_order_total {
            active.min_order_total = Set(min_order_total);
        }
        if let Some(expires_at) = input.expires_at {
            active.expires_at = Set(expires_at);
        }
        if let Some(usage_limit) = input.usage_limit {
            active.usage_limit = Set(Some(usage_limit));
        }
        if let Some(is_active) = input.active {
            active.active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = coupon::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Coupon {} not found", id)));
        }
        Ok(())
    }

    /// Customer-facing preview: would this coupon apply to a cart of the
    /// given subtotal, and what would it save?
    pub async fn preview(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<CouponPreview, ServiceError> {
        let code = code.trim().to_uppercase();
        let coupon = coupon::Entity::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))?;

        validate_coupon(&coupon, subtotal, Utc::now())?;
        let discount = compute_discount(&coupon, subtotal);
        Ok(CouponPreview {
            code: coupon.code,
            total_after_discount: subtotal - discount,
            discount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn coupon(kind: CouponKind, value: Decimal) -> coupon::Model {
        let now = Utc::now();
        coupon::Model {
            id: Uuid::new_v4(),
            code: "SUMMER10".to_string(),
            kind,
            value,
            min_order_total: dec!(20.00),
            starts_at: now - Duration::days(1),
            expires_at: now + Duration::days(30),
            usage_limit: Some(100),
            used_count: 0,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn percent_discount_is_proportional() {
        let c = coupon(CouponKind::Percent, dec!(10));
        assert_eq!(compute_discount(&c, dec!(50.00)), dec!(5.00));
    }

    #[test]
    fn fixed_discount_capped_at_subtotal() {
        let c = coupon(CouponKind::Fixed, dec!(30.00));
        assert_eq!(compute_discount(&c, dec!(25.00)), dec!(25.00));
        assert_eq!(compute_discount(&c, dec!(100.00)), dec!(30.00));
    }

    #[test]
    fn expired_coupon_rejected() {
        let mut c = coupon(CouponKind::Percent, dec!(10));
        c.expires_at = Utc::now() - Duration::days(1);
        assert!(validate_coupon(&c, dec!(50.00), Utc::now()).is_err());
    }

    #[test]
    fn not_yet_started_coupon_rejected() {
        let mut c = coupon(CouponKind::Percent, dec!(10));
        c.starts_at = Utc::now() + Duration::days(1);
        assert!(validate_coupon(&c, dec!(50.00), Utc::now()).is_err());
    }

    #[test]
    fn subtotal_below_minimum_rejected() {
        let c = coupon(CouponKind::Percent, dec!(10));
        assert!(validate_coupon(&c, dec!(19.99), Utc::now()).is_err());
        assert!(validate_coupon(&c, dec!(20.00), Utc::now()).is_ok());
    }

    #[test]
    fn exhausted_usage_limit_rejected() {
        let mut c = coupon(CouponKind::Percent, dec!(10));
        c.used_count = 100;
        assert!(validate_coupon(&c, dec!(50.00), Utc::now()).is_err());
    }

    #[test]
    fn inactive_coupon_rejected() {
        let mut c = coupon(CouponKind::Percent, dec!(10));
        c.active = false;
        assert!(validate_coupon(&c, dec!(50.00), Utc::now()).is_err());
    }
}
