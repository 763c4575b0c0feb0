use super::AdminClient;
use super::types::parse_timestamp;
use crate::atom::NamespaceEnvelope;
use crate::errors::AdminError;
use chrono::{DateTime, Utc};

const NAMESPACE_INFO_PATH: &str = "/$namespaceinfo";

/// Facts about the namespace the client is connected to.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceProperties {
    pub name: String,
    /// `Basic`, `Standard` or `Premium`
    pub sku: String,
    /// Only reported for `Premium` namespaces
    pub messaging_units: Option<i64>,
    pub created_time: DateTime<Utc>,
    pub modified_time: DateTime<Utc>,
}

impl AdminClient {
    /// Reads the namespace's name, tier and timestamps.
    ///
    /// # Errors
    ///
    /// Fails when the request fails, or when the response lacks the name,
    /// SKU or either timestamp.
    pub async fn get_namespace_properties(&self) -> Result<NamespaceProperties, AdminError> {
        let envelope: NamespaceEnvelope = self.entity_manager.get(NAMESPACE_INFO_PATH, &[]).await?;
        namespace_properties(envelope)
    }
}

fn namespace_properties(envelope: NamespaceEnvelope) -> Result<NamespaceProperties, AdminError> {
    let info = envelope
        .content
        .map(|content| content.namespace_info)
        .unwrap_or_default();

    let name = info
        .name
        .ok_or(AdminError::MissingNamespaceElement("Name"))?;
    let sku = info
        .messaging_sku
        .ok_or(AdminError::MissingNamespaceElement("MessagingSKU"))?;
    let created_time = info
        .created_time
        .ok_or(AdminError::MissingNamespaceElement("CreatedTime"))?;
    let modified_time = info
        .modified_time
        .ok_or(AdminError::MissingNamespaceElement("ModifiedTime"))?;

    Ok(NamespaceProperties {
        name,
        sku,
        messaging_units: info.messaging_units,
        created_time: parse_timestamp(&created_time)?,
        modified_time: parse_timestamp(&modified_time)?,
    })
}
