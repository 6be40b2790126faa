//! Outbound cXML documents.
//!
//! [`OrderRequest`] and [`InvoiceRequest`] share an [`Envelope`] (payload id,
//! timestamp, protocol version, language and header) and the [`Document`]
//! contract used by the submit pipeline. Everything else, including field sets
//! and validation tables, is per variant.

pub mod invoice;
pub mod order;

use chrono::{Local, SecondsFormat};
use serde::Serialize;
use serde_json::Value;

use crate::entities::{Credential, Header};
use crate::error::{CxmlError, Result};

pub use invoice::{InvoiceOptions, InvoiceRequest, RequestHeader};
pub use order::{OrderOptions, OrderRequest};

/// Protocol version carried in every rendered document
pub const CXML_VERSION: &str = "1.2.014";

/// Destination sentinel that skips the network entirely
pub const TEST_URL: &str = "%%TEST%%";

/// Body sentinel returned when the remote endpoint replies with nothing
pub const EMPTY_RESPONSE: &str = "%%EMPTY%%";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageType {
    OrderRequest,
    InvoiceDetailRequest,
}

impl MessageType {
    /// DTD file the rendered DOCTYPE points at
    pub fn dtd_file(&self) -> &'static str {
        match self {
            MessageType::OrderRequest => "cXML.dtd",
            MessageType::InvoiceDetailRequest => "InvoiceDetail.dtd",
        }
    }

    pub fn dtd_url(&self, version: &str) -> String {
        format!(
            "http://xml.cxml.org/schemas/cXML/{}/{}",
            version,
            self.dtd_file()
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::OrderRequest => "OrderRequest",
            MessageType::InvoiceDetailRequest => "InvoiceDetailRequest",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DeploymentMode {
    #[default]
    Production,
    Test,
}

impl DeploymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Production => "production",
            DeploymentMode::Test => "test",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" => Some(DeploymentMode::Production),
            "test" => Some(DeploymentMode::Test),
            _ => None,
        }
    }
}

/// Fields common to every outbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub(crate) payload_id: String,
    pub(crate) timestamp: String,
    pub(crate) version: String,
    pub(crate) language: String,
    pub(crate) header: Option<Header>,
}

impl Envelope {
    pub(crate) fn new(payload_id: String, timestamp: Option<String>, language: String) -> Self {
        Self {
            payload_id,
            timestamp: timestamp.unwrap_or_else(now_timestamp),
            version: CXML_VERSION.to_string(),
            language,
            header: None,
        }
    }

    pub fn payload_id(&self) -> &str {
        &self.payload_id
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub(crate) fn set_header(&mut self, value: &Value) -> Result<&Header> {
        let header: &Header = self.header.insert(Header::from_value(value)?);
        Ok(header)
    }

    pub(crate) fn require_header(&self) -> Result<&Header> {
        self.header.as_ref().ok_or_else(|| {
            CxmlError::Precondition(
                "the header (from, to, sender) must be set before submitting".to_string(),
            )
        })
    }
}

/// Current local time in RFC 3339 with millisecond precision
pub(crate) fn now_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Payload id in the customary `<millis>.<pid>.<random>@<host>` shape
pub fn generate_payload_id(domain: &str) -> String {
    format!(
        "{}.{}.{}@{}",
        Local::now().timestamp_millis(),
        std::process::id(),
        uuid::Uuid::new_v4().simple(),
        domain
    )
}

/// Options controlling how a document is serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// Indent nested elements for human readers
    pub pretty: bool,
}

impl RenderOptions {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

/// Contract shared by every outbound message type
pub trait Document {
    fn message_type(&self) -> MessageType;

    fn envelope(&self) -> &Envelope;

    fn envelope_mut(&mut self) -> &mut Envelope;

    /// Store the From/To/Sender header.
    fn set_header(&mut self, header: &Value) -> Result<()> {
        let message_type = self.message_type();
        let header = self.envelope_mut().set_header(header)?;
        tracing::debug!(
            message_type = %message_type,
            sender = %header.sender.identity,
            "header set"
        );
        Ok(())
    }

    fn header(&self) -> Option<&Header> {
        self.envelope().header()
    }

    /// Party that sells: `to` on orders, `from` on invoices
    fn supplier(&self) -> Option<&Credential>;

    /// Party that buys: `from` on orders, `to` on invoices
    fn buyer(&self) -> Option<&Credential>;

    /// Sender identity details used for the HTTP user agent
    fn user_agent(&self) -> Option<&str> {
        self.header()
            .map(|header| header.sender.user_agent.as_str())
            .filter(|agent| !agent.is_empty())
    }

    /// Whether the rendered text must pass DTD validation before it is sent
    fn requires_schema_validation(&self) -> bool;

    /// Last-moment derivations before rendering for submission.
    fn prepare_for_submit(&mut self) -> Result<()> {
        Ok(())
    }

    fn render(&self, options: RenderOptions) -> Result<String>;
}
