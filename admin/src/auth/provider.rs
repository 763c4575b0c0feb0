use super::errors::AuthError;
use async_trait::async_trait;

pub const TOKEN_TYPE_BEARER: &str = "Bearer";
pub const TOKEN_TYPE_SAS: &str = "SharedAccessSignature";

/// Access token for a Service Bus resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthToken {
    /// The token string. SAS tokens already carry their
    /// `SharedAccessSignature` prefix.
    pub token: String,
    /// The type of token (`Bearer` or `SharedAccessSignature`)
    pub token_type: String,
    /// Optional lifetime in seconds from when the token was issued
    pub expires_in_secs: Option<u64>,
}

impl AuthToken {
    pub fn bearer(token: impl Into<String>, expires_in_secs: Option<u64>) -> Self {
        Self {
            token: token.into(),
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in_secs,
        }
    }

    /// Value to place in an authorization header.
    ///
    /// Bearer tokens are sent as `Bearer <token>`; every other kind is sent
    /// verbatim.
    pub fn header_value(&self) -> String {
        if self.token_type.eq_ignore_ascii_case(TOKEN_TYPE_BEARER) {
            format!("{TOKEN_TYPE_BEARER} {}", self.token)
        } else {
            self.token.clone()
        }
    }
}

/// Source of tokens scoped to an audience (the URL of the addressed resource).
///
/// # Examples
///
/// ```no_run
/// use admin::auth::{AuthError, AuthToken, TokenProvider};
/// use async_trait::async_trait;
///
/// struct StaticBearer(String);
///
/// #[async_trait]
/// impl TokenProvider for StaticBearer {
///     async fn get_token(&self, _audience: &str) -> Result<AuthToken, AuthError> {
///         Ok(AuthToken::bearer(self.0.clone(), Some(3600)))
///     }
/// }
/// ```
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token valid for `audience`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if no token can be produced for the audience.
    async fn get_token(&self, audience: &str) -> Result<AuthToken, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_tokens_get_scheme_prefix() {
        let token = AuthToken::bearer("abc", None);
        assert_eq!(token.header_value(), "Bearer abc");
    }

    #[test]
    fn sas_tokens_are_sent_verbatim() {
        let token = AuthToken {
            token: "SharedAccessSignature sr=x&sig=y&se=1&skn=k".to_string(),
            token_type: TOKEN_TYPE_SAS.to_string(),
            expires_in_secs: Some(60),
        };
        assert_eq!(token.header_value(), token.token);
    }
}
