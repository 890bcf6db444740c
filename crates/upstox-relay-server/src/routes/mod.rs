//! HTTP routes.

pub mod auth;
pub mod health;
pub mod profile;
pub mod webhooks;

pub use auth::{callback_handler, login_handler, refresh_token_handler};
pub use health::health_routes;
pub use profile::profile_handler;
pub use webhooks::{token_webhook_handler, webhook_handler};
