/// Authentication module
///
/// Password hashing, JWT access tokens, opaque refresh tokens and the
/// session lifecycle built on top of them.

mod bearer;
mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use bearer::{get_api_key, get_bearer_token};
pub use claims::Claims;
pub use jwt::{AccessTokenCodec, TokenError};
pub use password::{PasswordError, PasswordHash, PasswordHasher, MAX_PASSWORD_BYTES};
pub use refresh_token::{
    generate_refresh_token, EntropyError, FutureRevocation, RefreshTokenRecord,
    RefreshTokenState,
};
pub use session::{LoginSession, SessionManager};
