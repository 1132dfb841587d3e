/// Authentication module
///
/// Password verification, signed token issuance/verification,
/// login and refresh token exchange.

mod claims;
mod password;
mod refresh;
mod session;
mod store;
mod token;

pub use claims::{Claims, TokenPurpose};
pub use password::{equalize_timing, hash_password, verify_password, HASH_COST};
pub use refresh::RefreshExchanger;
pub use session::SessionIssuer;
pub use store::{Credential, CredentialStore, InMemoryCredentialStore, PgCredentialStore};
pub use token::{TokenCodec, TokenOutcome, TokenPair};
