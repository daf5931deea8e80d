mod auth;
mod health_check;

pub use auth::{logout, refresh, sign_in, sign_up};
pub use health_check::health_check;
