/// Middleware module
///
/// Access token verification for protected routes.

mod jwt_middleware;

pub use jwt_middleware::{admit, bearer_token, AuthenticatedSubject, JwtMiddleware};
