// handlers/elevated/mod.rs - admin-only routes (require_auth + require_admin)

pub mod categories;
pub mod orders;
pub mod users;
