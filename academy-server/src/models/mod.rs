//! Request models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod pagination;
pub mod slug;
pub mod text;
pub mod validation;

pub use pagination::{Paginated, Pagination, PaginationParams};
pub use slug::Slug;
pub use text::{Body, Title};
pub use validation::{check_range, ValidationError};
