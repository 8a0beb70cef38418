// handlers/protected/mod.rs - routes behind require_auth
//
// templates and blog additionally require the author or admin role.

pub mod account;
pub mod blog;
pub mod checkout;
pub mod profile;
pub mod templates;
