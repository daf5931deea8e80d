/// Authentication module
///
/// Password hashing, JWT pair issuance/validation and the
/// signup/signin/refresh/logout workflow built on top of them.

mod claims;
mod jwt;
mod password;
mod service;

pub use claims::Claims;
pub use jwt::{TokenIssuer, TokenKind, TokenPair};
pub use password::{PasswordHasher, DEFAULT_HASH_COST};
pub use service::AuthService;
