//! HTTP request handlers for Social API.

pub mod auth_handler;
pub mod debug;
pub mod health;
pub mod metrics;
pub mod posts;
pub mod users;

pub use auth_handler::{create_token, register_user};
pub use debug::debug_vars;
pub use health::health_check;
pub use metrics::metrics_handler;
pub use posts::{delete_post, update_post};
pub use users::{activate_user, get_user};
