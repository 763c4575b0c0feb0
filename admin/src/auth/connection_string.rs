use super::errors::AuthError;
use super::provider::{AuthToken, TOKEN_TYPE_SAS, TokenProvider};
use super::sas_token_generator::SasTokenGenerator;
use async_trait::async_trait;
use std::str::FromStr;

/// How long generated SAS tokens stay valid.
pub const SAS_TOKEN_VALIDITY_HOURS: i64 = 24;

/// Parsed `Endpoint=sb://<ns>/;SharedAccessKeyName=..;SharedAccessKey=..`
/// connection string. Segment names are matched case-insensitively.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Namespace host, e.g. `my-namespace.servicebus.windows.net`
    pub host: String,
    pub key_name: Option<String>,
    pub key: Option<String>,
    /// Pre-issued `SharedAccessSignature ...` token
    pub shared_access_signature: Option<String>,
    pub entity_path: Option<String>,
}

impl ConnectionString {
    /// Management endpoint for the namespace.
    pub fn endpoint(&self) -> String {
        format!("https://{}/", self.host)
    }
}

impl FromStr for ConnectionString {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Err(AuthError::EmptyConnectionString);
        }

        let mut host = None;
        let mut key_name = None;
        let mut key = None;
        let mut shared_access_signature = None;
        let mut entity_path = None;

        for part in value.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (name, segment) = part
                .split_once('=')
                .ok_or_else(|| AuthError::InvalidSegment(part.to_string()))?;

            match name.trim().to_ascii_lowercase().as_str() {
                "endpoint" => host = Some(endpoint_host(segment)?),
                "sharedaccesskeyname" => key_name = Some(segment.to_string()),
                "sharedaccesskey" => key = Some(segment.to_string()),
                "sharedaccesssignature" => shared_access_signature = Some(segment.to_string()),
                "entitypath" => entity_path = Some(segment.to_string()),
                _ => log::debug!("Ignoring connection string segment {name}"),
            }
        }

        let host = host.ok_or(AuthError::MissingField("Endpoint"))?;
        if shared_access_signature.is_none() {
            if key_name.is_none() {
                return Err(AuthError::MissingField("SharedAccessKeyName"));
            }
            if key.is_none() {
                return Err(AuthError::MissingField("SharedAccessKey"));
            }
        }

        Ok(Self {
            host,
            key_name,
            key,
            shared_access_signature,
            entity_path,
        })
    }
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host", &self.host)
            .field("key_name", &self.key_name)
            .field("entity_path", &self.entity_path)
            .finish_non_exhaustive()
    }
}

/// Extracts the host from `sb://host/` (any scheme, or none).
fn endpoint_host(endpoint: &str) -> Result<String, AuthError> {
    let without_scheme = endpoint
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(endpoint);
    let host = without_scheme.trim_end_matches('/');
    if host.is_empty() || host.contains('/') {
        return Err(AuthError::InvalidSegment(format!("Endpoint={endpoint}")));
    }
    Ok(host.to_string())
}

enum Credential {
    Key(SasTokenGenerator),
    Signature(String),
}

/// Token provider backed by a connection string: signs a fresh SAS token for
/// each audience, or hands out the pre-issued signature when the connection
/// string carries one.
pub struct ConnectionStringProvider {
    connection_string: ConnectionString,
    credential: Credential,
}

impl ConnectionStringProvider {
    pub fn new(connection_string: ConnectionString) -> Result<Self, AuthError> {
        let credential = match (
            &connection_string.shared_access_signature,
            &connection_string.key_name,
            &connection_string.key,
        ) {
            (Some(signature), _, _) => Credential::Signature(signature.clone()),
            (None, Some(key_name), Some(key)) => {
                Credential::Key(SasTokenGenerator::new(key_name.clone(), key.clone()))
            }
            (None, None, _) => return Err(AuthError::MissingField("SharedAccessKeyName")),
            (None, Some(_), None) => return Err(AuthError::MissingField("SharedAccessKey")),
        };

        Ok(Self {
            connection_string,
            credential,
        })
    }

    pub fn connection_string(&self) -> &ConnectionString {
        &self.connection_string
    }
}

#[async_trait]
impl TokenProvider for ConnectionStringProvider {
    async fn get_token(&self, audience: &str) -> Result<AuthToken, AuthError> {
        match &self.credential {
            Credential::Key(generator) => generator
                .generate_sas_token(audience, chrono::Duration::hours(SAS_TOKEN_VALIDITY_HOURS)),
            Credential::Signature(signature) => Ok(AuthToken {
                token: signature.clone(),
                token_type: TOKEN_TYPE_SAS.to_string(),
                expires_in_secs: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err_eq, assert_ok};

    const CONNECTION_STRING: &str = "Endpoint=sb://my-ns.servicebus.windows.net/;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=abc123=";

    #[test]
    fn parses_key_based_connection_string() {
        let cs: ConnectionString = assert_ok!(CONNECTION_STRING.parse());
        assert_eq!(cs.host, "my-ns.servicebus.windows.net");
        assert_eq!(cs.endpoint(), "https://my-ns.servicebus.windows.net/");
        assert_eq!(cs.key_name.as_deref(), Some("RootManageSharedAccessKey"));
        assert_eq!(cs.key.as_deref(), Some("abc123="));
        assert_eq!(cs.entity_path, None);
    }

    #[test]
    fn segment_names_are_case_insensitive() {
        let cs: ConnectionString = assert_ok!(
            "endpoint=sb://ns.servicebus.windows.net;sharedaccesskeyname=k;sharedaccesskey=v;EntityPath=q"
                .parse()
        );
        assert_eq!(cs.host, "ns.servicebus.windows.net");
        assert_eq!(cs.entity_path.as_deref(), Some("q"));
    }

    #[test]
    fn rejects_incomplete_connection_strings() {
        assert_err_eq!("".parse::<ConnectionString>(), AuthError::EmptyConnectionString);
        assert_err_eq!(
            "SharedAccessKeyName=k;SharedAccessKey=v".parse::<ConnectionString>(),
            AuthError::MissingField("Endpoint")
        );
        assert_err_eq!(
            "Endpoint=sb://ns/;SharedAccessKey=v".parse::<ConnectionString>(),
            AuthError::MissingField("SharedAccessKeyName")
        );
        assert_err_eq!(
            "Endpoint=sb://ns/;SharedAccessKeyName=k".parse::<ConnectionString>(),
            AuthError::MissingField("SharedAccessKey")
        );
        assert_err_eq!(
            "Endpoint=sb://ns/;garbage".parse::<ConnectionString>(),
            AuthError::InvalidSegment("garbage".to_string())
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cs: ConnectionString = assert_ok!(CONNECTION_STRING.parse());
        assert!(!format!("{cs:?}").contains("abc123"));
    }

    #[tokio::test]
    async fn provider_signs_per_audience() {
        let provider = assert_ok!(ConnectionStringProvider::new(assert_ok!(
            CONNECTION_STRING.parse()
        )));
        let token = assert_ok!(
            provider
                .get_token("https://my-ns.servicebus.windows.net/orders")
                .await
        );
        assert!(token.token.starts_with(
            "SharedAccessSignature sr=https%3A%2F%2Fmy-ns.servicebus.windows.net%2Forders&"
        ));
        assert_eq!(token.expires_in_secs, Some(24 * 3600));
    }

    #[tokio::test]
    async fn provider_hands_out_preissued_signature() {
        let cs: ConnectionString = assert_ok!(
            "Endpoint=sb://ns.servicebus.windows.net/;SharedAccessSignature=SharedAccessSignature sr=a&sig=b&se=1&skn=c"
                .parse()
        );
        let provider = assert_ok!(ConnectionStringProvider::new(cs));
        let token = assert_ok!(provider.get_token("https://anything").await);
        assert_eq!(token.token, "SharedAccessSignature sr=a&sig=b&se=1&skn=c");
    }
}
