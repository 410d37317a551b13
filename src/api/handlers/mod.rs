//! HTTP handlers.

pub mod health;
pub mod redirect;
pub mod urls;

pub use health::health_handler;
pub use redirect::redirect_handler;
pub use urls::{
    bulk_delete_handler, check_alias_handler, create_url_handler, delete_url_handler,
    get_url_handler, list_urls_handler, update_expiry_handler, webhook_test_handler,
};
