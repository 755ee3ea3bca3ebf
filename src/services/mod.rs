pub mod banners;
pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod notifications;
pub mod orders;
pub mod reviews;
pub mod stock;
pub mod uploads;
pub mod users;
pub mod wishlist;

use crate::{auth::AuthService, config::AppConfig, events::EventSender};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Aggregate of all application services shared with HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub users: users::UserService,
    pub catalog: catalog::CatalogService,
    pub cart: cart::CartService,
    pub wishlist: wishlist::WishlistService,
    pub orders: orders::OrderService,
    pub coupons: coupons::CouponService,
    pub reviews: reviews::ReviewService,
    pub banners: banners::BannerService,
    pub notifications: notifications::NotificationService,
    pub stock: stock::StockService,
    pub uploads: uploads::UploadService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        events: EventSender,
        auth: Arc<AuthService>,
        config: &AppConfig,
    ) -> Self {
        Self {
            users: users::UserService::new(db.clone(), events.clone(), auth),
            catalog: catalog::CatalogService::new(db.clone(), events.clone()),
            cart: cart::CartService::new(db.clone(), events.clone()),
            wishlist: wishlist::WishlistService::new(db.clone()),
            orders: orders::OrderService::new(db.clone(), events.clone()),
            coupons: coupons::CouponService::new(db.clone()),
            reviews: reviews::ReviewService::new(db.clone()),
            banners: banners::BannerService::new(db.clone()),
            notifications: notifications::NotificationService::new(db.clone()),
            stock: stock::StockService::new(db, events, config.low_stock_threshold),
            uploads: uploads::UploadService::new(
                config.upload_dir.clone(),
                config.upload_max_bytes,
                config.upload_soft_target_bytes,
            ),
        }
    }
}
