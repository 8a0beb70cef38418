// handlers/public/mod.rs - no authentication required
//
// The blog handlers run behind optional_auth so a signed-in author can read
// their own drafts; everything else here ignores the caller.

pub mod auth;
pub mod blog;
pub mod categories;
pub mod payment;
pub mod templates;
