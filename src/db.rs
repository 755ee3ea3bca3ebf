use crate::config::AppConfig;
use crate::entities;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use std::time::Duration;
use tracing::info;

/// Open a connection pool using the application configuration.
pub async fn establish_connection(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(config.database_url.clone());
    opts.max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let db = Database::connect(opts).await?;
    info!("Connected to database");
    Ok(db)
}

/// Create any missing tables from the entity definitions.
///
/// Statements are generated per-entity with `IF NOT EXISTS`, so running this
/// against an already-initialized database is a no-op.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    async fn create<E: EntityTrait>(
        db: &DatabaseConnection,
        schema: &Schema,
        entity: E,
    ) -> Result<(), DbErr> {
        let backend = db.get_database_backend();
        let mut stmt = schema.create_table_from_entity(entity);
        stmt.if_not_exists();
        db.execute(backend.build(&stmt)).await?;
        Ok(())
    }

    create(db, &schema, entities::user::Entity).await?;
    create(db, &schema, entities::category::Entity).await?;
    create(db, &schema, entities::brand::Entity).await?;
    create(db, &schema, entities::product::Entity).await?;
    create(db, &schema, entities::product_variant::Entity).await?;
    create(db, &schema, entities::product_media::Entity).await?;
    create(db, &schema, entities::cart_item::Entity).await?;
    create(db, &schema, entities::wishlist_item::Entity).await?;
    create(db, &schema, entities::order::Entity).await?;
    create(db, &schema, entities::order_item::Entity).await?;
    create(db, &schema, entities::coupon::Entity).await?;
    create(db, &schema, entities::review::Entity).await?;
    create(db, &schema, entities::banner::Entity).await?;
    create(db, &schema, entities::stock_alert::Entity).await?;
    create(db, &schema, entities::notification::Entity).await?;

    info!("Database schema is up to date");
    Ok(())
}
