pub mod connection_string;
pub mod errors;
pub mod provider;
pub mod sas_token_generator;
pub mod token_cache;

pub use connection_string::{ConnectionString, ConnectionStringProvider};
pub use errors::AuthError;
pub use provider::{AuthToken, TokenProvider};
pub use sas_token_generator::SasTokenGenerator;
pub use token_cache::{CachedToken, CachingTokenProvider, TokenCache};
