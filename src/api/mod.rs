pub mod extract;
pub mod pagination;

pub use extract::{Id, JsonBody};
pub use pagination::{Page, PageQuery};
