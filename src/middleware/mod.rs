pub mod auth;
pub mod client_info;
pub mod rbac;

pub use auth::{ensure_active, optional_auth, require_auth, CurrentUser};
pub use rbac::{require_admin, require_author, require_role};
