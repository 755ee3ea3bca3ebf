use crate::{
    auth::{require_admin, require_auth, require_staff},
    handlers, AppState,
};
use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::sync::Arc;

/// Assembles the full application router.
///
/// Role gating is layered: `require_auth` validates the bearer token and
/// attaches the caller identity, then `require_admin`/`require_staff` read
/// it. The role layers are added first so the auth layer wraps them and
/// runs before they do.
pub fn app_router(state: Arc<AppState>) -> Router {
    // Multipart uploads need more headroom than axum's 2 MiB default.
    let body_limit = DefaultBodyLimit::max(state.config.upload_max_bytes + 1024 * 1024);

    let public = Router::new()
        .nest("/auth", handlers::auth::routes())
        .nest("/categories", handlers::categories::public_routes())
        .nest("/brands", handlers::brands::public_routes())
        .nest(
            "/products",
            handlers::products::public_routes().merge(handlers::reviews::public_routes()),
        )
        .nest("/banners", handlers::banners::public_routes());

    let authed = Router::new()
        .nest(
            "/user",
            handlers::users::routes().nest("/notifications", handlers::notifications::routes()),
        )
        .nest("/cart", handlers::carts::routes())
        .nest("/wishlist", handlers::wishlists::routes())
        .nest("/orders", handlers::orders::routes())
        .nest("/coupons", handlers::coupons::routes())
        .nest("/reviews", handlers::reviews::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let staff = Router::new()
        .nest("/retailer/products", handlers::products::staff_routes())
        .route_layer(middleware::from_fn(require_staff))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let admin = Router::new()
        .nest("/categories", handlers::categories::admin_routes())
        .nest("/brands", handlers::brands::admin_routes())
        .nest("/orders", handlers::orders::admin_routes())
        .nest("/coupons", handlers::coupons::admin_routes())
        .nest("/banners", handlers::banners::admin_routes())
        .nest("/stock", handlers::stock::admin_routes())
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api = public
        .merge(authed)
        .merge(staff)
        .nest("/admin", admin);

    Router::new()
        .merge(handlers::health::routes())
        .nest("/api/v1", api)
        .layer(body_limit)
        .with_state(state)
}
