pub mod banner;
pub mod brand;
pub mod cart_item;
pub mod category;
pub mod coupon;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_media;
pub mod product_variant;
pub mod review;
pub mod stock_alert;
pub mod user;
pub mod wishlist_item;

pub use banner::Entity as Banner;
pub use brand::Entity as Brand;
pub use cart_item::Entity as CartItem;
pub use category::Entity as Category;
pub use coupon::Entity as Coupon;
pub use notification::Entity as Notification;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use product_media::Entity as ProductMedia;
pub use product_variant::Entity as ProductVariant;
pub use review::Entity as Review;
pub use stock_alert::Entity as StockAlert;
pub use user::Entity as User;
pub use wishlist_item::Entity as WishlistItem;

pub use banner::Model as BannerModel;
pub use cart_item::Model as CartItemModel;
pub use coupon::Model as CouponModel;
pub use order::Model as OrderModel;
pub use product::Model as ProductModel;
pub use product_variant::Model as ProductVariantModel;
pub use user::Model as UserModel;
