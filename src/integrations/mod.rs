// Clients for the third-party services the store depends on
pub mod email;
pub mod identity;
pub mod payment;
pub mod storage;

pub use email::{EmailMessage, Mailer};
pub use identity::IdentityClient;
pub use payment::PaymentClient;
pub use storage::StorageClient;
