//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Sign-in via the managed auth provider plus the admin allow-list
//! - `images` - Image uploads into object storage
//! - `products` - Product create / partial update / delete

pub mod auth;
pub mod images;
pub mod products;

pub use auth::{AdminAllowList, AdminAuthError, AdminAuthService};
pub use images::{ImageService, UploadedImage, object_key};
pub use products::ProductService;
