/// Middleware module
///
/// Request guards for protected routes.

mod jwt_middleware;

pub use jwt_middleware::{AuthenticatedUser, BearerGuard, JwtMiddleware, TokenGuard};
