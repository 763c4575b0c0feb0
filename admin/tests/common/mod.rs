//! Shared fakes for the integration tests: a transport that replays canned
//! responses and records what it was sent, and a token provider that echoes
//! the audience it was asked for.
#![allow(dead_code)]

use admin::atom::{EntityManager, Handler, Request, Response};
use admin::auth::{AuthError, AuthToken, TokenProvider};
use admin::{AdminClient, AdminClientOptions};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const ENDPOINT: &str = "sb://sbadmin.servicebus.windows.net/";
pub const HOST: &str = "https://sbadmin.servicebus.windows.net";

const ATOM: &str = "http://www.w3.org/2005/Atom";
const CONNECT: &str = "http://schemas.microsoft.com/netservices/2010/10/servicebus/connect";
const INSTANCE: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const EMPTY_SERVICE_FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title type="text">Publicly Listed Services</title><subtitle type="text">This is the list of publicly-listed services currently available.</subtitle><id>uuid:27fcd1e2-3a99-44b1-8f1e-3e92b52f0171;id=30</id><updated>2019-12-27T13:11:47Z</updated><generator>Service Bus 1.1</generator></feed>"#;

#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<Response>>,
    requests: Mutex<Vec<Request>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: impl Into<String>) {
        let status = StatusCode::from_u16(status).expect("valid status code");
        self.responses
            .lock()
            .unwrap()
            .push_back(Response::new(status, body));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| request.url.to_string())
            .collect()
    }

    pub fn last_request(&self) -> Request {
        self.requests()
            .pop()
            .expect("transport received at least one request")
    }
}

#[async_trait]
impl Handler for FakeTransport {
    async fn handle(&self, request: Request) -> Result<Response, admin::atom::AtomError> {
        self.requests.lock().unwrap().push(request);
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("a canned response for every request");
        Ok(response)
    }
}

/// Hands out a SAS-style token naming the audience it was issued for.
pub struct EchoTokenProvider;

#[async_trait]
impl TokenProvider for EchoTokenProvider {
    async fn get_token(&self, audience: &str) -> Result<AuthToken, AuthError> {
        Ok(AuthToken {
            token: format!("SharedAccessSignature sr={audience}"),
            token_type: "SharedAccessSignature".to_string(),
            expires_in_secs: None,
        })
    }
}

pub fn create_client(transport: Arc<FakeTransport>) -> AdminClient {
    create_client_with_options(transport, AdminClientOptions::default())
}

pub fn create_client_with_options(
    transport: Arc<FakeTransport>,
    options: AdminClientOptions,
) -> AdminClient {
    let manager = EntityManager::with_transport(ENDPOINT, Arc::new(EchoTokenProvider), transport)
        .expect("valid endpoint");
    AdminClient::with_entity_manager(manager, options).expect("valid options")
}

pub fn header(request: &Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn entry(path: &str, name: &str, description: &str) -> String {
    format!(
        r#"<entry xmlns="{ATOM}"><id>{HOST}/{path}?api-version=2017-04</id><title type="text">{name}</title><updated>2020-01-02T03:04:05Z</updated><content type="application/xml">{description}</content></entry>"#
    )
}

pub fn queue_entry(name: &str) -> String {
    entry(
        name,
        name,
        &format!(
            r#"<QueueDescription xmlns="{CONNECT}" xmlns:i="{INSTANCE}"><LockDuration>PT1M</LockDuration><MaxDeliveryCount>10</MaxDeliveryCount><Status>Active</Status><CountDetails xmlns:d2p1="http://schemas.microsoft.com/netservices/2011/06/servicebus"><d2p1:ActiveMessageCount>1</d2p1:ActiveMessageCount><d2p1:DeadLetterMessageCount>0</d2p1:DeadLetterMessageCount><d2p1:ScheduledMessageCount>0</d2p1:ScheduledMessageCount><d2p1:TransferDeadLetterMessageCount>0</d2p1:TransferDeadLetterMessageCount><d2p1:TransferMessageCount>0</d2p1:TransferMessageCount></CountDetails></QueueDescription>"#
        ),
    )
}

pub fn subscription_entry(topic: &str, name: &str) -> String {
    entry(
        &format!("{topic}/Subscriptions/{name}"),
        name,
        &format!(
            r#"<SubscriptionDescription xmlns="{CONNECT}" xmlns:i="{INSTANCE}"><LockDuration>PT1M</LockDuration><MaxDeliveryCount>10</MaxDeliveryCount><Status>Active</Status></SubscriptionDescription>"#
        ),
    )
}

pub fn rule_entry(topic: &str, subscription: &str, name: &str) -> String {
    entry(
        &format!("{topic}/Subscriptions/{subscription}/Rules/{name}"),
        name,
        &format!(
            r#"<RuleDescription xmlns="{CONNECT}" xmlns:i="{INSTANCE}"><Filter i:type="TrueFilter"><SqlExpression>1=1</SqlExpression><CompatibilityLevel>20</CompatibilityLevel></Filter><Action i:type="EmptyRuleAction"/><Name>{name}</Name></RuleDescription>"#
        ),
    )
}

/// Queue entry as the service echoes it back with one `Send` rule.
pub fn queue_entry_with_send_rule(name: &str, key_name: &str) -> String {
    entry(
        name,
        name,
        &format!(
            r#"<QueueDescription xmlns="{CONNECT}" xmlns:i="{INSTANCE}"><LockDuration>PT1M</LockDuration><IsAnonymousAccessible>false</IsAnonymousAccessible><AuthorizationRules><AuthorizationRule i:type="SharedAccessAuthorizationRule"><ClaimType>SharedAccessKey</ClaimType><ClaimValue>None</ClaimValue><Rights><AccessRights>Send</AccessRights></Rights><CreatedTime>2020-01-02T03:04:05.1Z</CreatedTime><ModifiedTime>2020-01-02T03:04:05.1Z</ModifiedTime><KeyName>{key_name}</KeyName><PrimaryKey>primary</PrimaryKey><SecondaryKey>secondary</SecondaryKey></AuthorizationRule></AuthorizationRules><Status>Active</Status></QueueDescription>"#
        ),
    )
}

pub fn namespace_entry(sku: &str) -> String {
    entry(
        "$namespaceinfo",
        "sbadmin",
        &format!(
            r#"<NamespaceInfo xmlns="{CONNECT}" xmlns:i="{INSTANCE}"><CreatedTime>2020-04-23T21:33:54.32Z</CreatedTime><MessagingSKU>{sku}</MessagingSKU><ModifiedTime>2021-01-12T19:27:13.69Z</ModifiedTime><Name>sbadmin</Name><NamespaceType>Messaging</NamespaceType></NamespaceInfo>"#
        ),
    )
}

/// A `Queues` feed holding `count` queues named from `first` onwards.
pub fn queue_feed(first: usize, count: usize) -> String {
    let entries: String = (first..first + count)
        .map(|i| queue_entry(&format!("queue-{i}")))
        .collect();
    format!(
        r#"<feed xmlns="{ATOM}"><title type="text">Queues</title><id>{HOST}/$Resources/Queues</id><updated>2020-01-02T03:04:05Z</updated>{entries}</feed>"#
    )
}

pub fn subscription_feed(topic: &str, names: &[&str]) -> String {
    let entries: String = names
        .iter()
        .map(|name| subscription_entry(topic, name))
        .collect();
    format!(
        r#"<feed xmlns="{ATOM}"><title type="text">Subscriptions</title><id>{HOST}/{topic}/Subscriptions</id>{entries}</feed>"#
    )
}

pub fn management_error(code: u16, detail: &str) -> String {
    format!("<Error><Code>{code}</Code><Detail>{detail}</Detail></Error>")
}
