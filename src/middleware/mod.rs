/// Middleware module
///
/// Request extractors for authentication and the file server hit counter.

mod authenticated;
mod hit_counter;

pub use authenticated::{ApiKey, AuthenticatedUser, BearerToken};
pub use hit_counter::{HitCounter, HitCounterMiddleware};
