//! Core types for Shelfmark.

pub mod email;
pub mod patch;
pub mod product;
pub mod slug;

pub use email::{Email, EmailError};
pub use patch::{PatchError, ProductPatch};
pub use product::{NewProduct, Product};
pub use slug::{Slug, SlugError};
