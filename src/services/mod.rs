pub mod activity_service;
pub mod blog_service;
pub mod category_service;
pub mod checkout_service;
pub mod order_service;
pub mod template_service;
pub mod user_service;

pub use activity_service::{ActivityService, ClientInfo};
pub use blog_service::BlogService;
pub use category_service::CategoryService;
pub use checkout_service::CheckoutService;
pub use order_service::OrderService;
pub use template_service::TemplateService;
pub use user_service::UserService;
