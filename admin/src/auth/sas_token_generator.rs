use super::errors::AuthError;
use super::provider::{AuthToken, TOKEN_TYPE_SAS};
use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generator for Shared Access Signature (SAS) tokens.
///
/// Creates time-limited tokens signed with HMAC-SHA256 over the URL-encoded
/// audience and the expiry timestamp. The shared access key is used as given
/// (its UTF-8 bytes are the HMAC key), matching what the service verifies.
///
/// # Examples
///
/// ```no_run
/// use admin::auth::SasTokenGenerator;
/// use chrono::Duration;
///
/// let generator = SasTokenGenerator::new("RootManageSharedAccessKey", "key");
/// let token = generator.generate_sas_token(
///     "https://my-namespace.servicebus.windows.net/orders",
///     Duration::hours(1),
/// )?;
/// # Ok::<(), admin::auth::AuthError>(())
/// ```
#[derive(Clone)]
pub struct SasTokenGenerator {
    key_name: String,
    key: String,
}

impl SasTokenGenerator {
    pub fn new(key_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            key: key.into(),
        }
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Generates a SAS token for `audience`, valid for `validity` from now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the HMAC cannot be initialised.
    pub fn generate_sas_token(
        &self,
        audience: &str,
        validity: Duration,
    ) -> Result<AuthToken, AuthError> {
        let expiry = Utc::now() + validity;
        let token = self.sign(audience, expiry.timestamp())?;

        Ok(AuthToken {
            token,
            token_type: TOKEN_TYPE_SAS.to_string(),
            expires_in_secs: u64::try_from(validity.num_seconds()).ok(),
        })
    }

    fn sign(&self, audience: &str, expiry_timestamp: i64) -> Result<String, AuthError> {
        let encoded_audience = urlencoding::encode(audience);
        let string_to_sign = format!("{encoded_audience}\n{expiry_timestamp}");

        let mut mac = HmacSha256::new_from_slice(self.key.as_bytes())
            .map_err(|e| AuthError::Signing(format!("Failed to create HMAC: {e}")))?;
        mac.update(string_to_sign.as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!(
            "{TOKEN_TYPE_SAS} sr={}&sig={}&se={}&skn={}",
            encoded_audience,
            urlencoding::encode(&signature),
            expiry_timestamp,
            self.key_name
        ))
    }
}

impl std::fmt::Debug for SasTokenGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SasTokenGenerator")
            .field("key_name", &self.key_name)
            .field("key", &"<redacted>")
            .finish()
    }
}
