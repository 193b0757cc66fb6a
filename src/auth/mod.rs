pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod utils;

pub use claims::{Claims, RefreshClaims};
pub use jwt::{hash_token, JwtService};
pub use middleware::{AuthMiddleware, AuthenticatedUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
pub use password::{hash_password, verify_password};
pub use utils::require_quiz_owner;
