//! Submit pipeline: URL checks, rendering, pre-flight XML checks and delivery.
//!
//! A [`Submitter`] holds no per-document state. It can be shared across tasks
//! and drive any number of documents; each `submit` call walks the states of
//! [`SubmitState`] once and either returns the endpoint's reply or the first
//! error it hit. Nothing is retried.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::document::{Document, MessageType, RenderOptions, TEST_URL};
use crate::error::{CxmlError, Result};
use crate::http_client::{HttpClientConfig, HttpTransport, Transport};
use crate::response::CxmlResponse;
use crate::schema::{DtdValidator, SchemaValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Building,
    Rendering,
    SchemaValidating,
    /// Replaces `Sending` and `AwaitingResponse` for the `%%TEST%%` destination
    TestShortcut,
    Sending,
    AwaitingResponse,
    Completed,
    Failed,
}

impl SubmitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitState::Building => "building",
            SubmitState::Rendering => "rendering",
            SubmitState::SchemaValidating => "schema_validating",
            SubmitState::TestShortcut => "test_shortcut",
            SubmitState::Sending => "sending",
            SubmitState::AwaitingResponse => "awaiting_response",
            SubmitState::Completed => "completed",
            SubmitState::Failed => "failed",
        }
    }
}

/// Notifications delivered to listeners registered with [`Submitter::on_event`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitEvent {
    /// The wire text about to be posted
    Sending(String),
    /// The raw reply body
    Received(String),
}

pub type EventListener = Arc<dyn Fn(&SubmitEvent) + Send + Sync>;

/// Submit-time switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmitOptions {
    /// DTD-validate orders too; invoices are always validated
    pub validate_orders: bool,
}

pub struct Submitter {
    transport: Arc<dyn Transport>,
    validator: Arc<dyn SchemaValidator>,
    options: SubmitOptions,
    listeners: Vec<EventListener>,
}

impl Submitter {
    pub fn new(
        transport: Arc<dyn Transport>,
        validator: Arc<dyn SchemaValidator>,
        options: SubmitOptions,
    ) -> Self {
        Self {
            transport,
            validator,
            options,
            listeners: Vec::new(),
        }
    }

    /// HTTP transport and DTD validator built from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(HttpClientConfig {
            timeout_seconds: config.network.timeout_seconds,
            user_agent: config.network.user_agent.clone(),
        })?;
        let validator = DtdValidator::new(
            config.validation.dtd_dir.clone(),
            config.validation.max_cached_dtds,
        );

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(validator),
            SubmitOptions {
                validate_orders: config.validation.validate_orders,
            },
        ))
    }

    /// Register a listener for `Sending`/`Received` notifications.
    pub fn on_event<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&SubmitEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn options(&self) -> SubmitOptions {
        self.options
    }

    fn notify(&self, event: SubmitEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// Render, check and send `document` to `url`.
    ///
    /// `%%TEST%%` as the destination runs every check and returns a canned
    /// success without touching the network.
    pub async fn submit<D>(&self, document: &mut D, url: &str) -> Result<CxmlResponse>
    where
        D: Document + Send + ?Sized,
    {
        let message_type = document.message_type();
        info!(
            message_type = %message_type,
            payload_id = %document.envelope().payload_id(),
            url = %url,
            "submitting document"
        );

        let mut state = SubmitState::Building;
        let result = self.run(document, url, &mut state).await;

        match &result {
            Ok(response) => {
                transition(&mut state, SubmitState::Completed);
                info!(message_type = %message_type, kind = ?response.kind(), "submit completed");
            }
            Err(error) => {
                let failed_in = state;
                transition(&mut state, SubmitState::Failed);
                warn!(message_type = %message_type, state = failed_in.as_str(), error = %error, "submit failed");
            }
        }

        result
    }

    async fn run<D>(&self, document: &mut D, url: &str, state: &mut SubmitState) -> Result<CxmlResponse>
    where
        D: Document + Send + ?Sized,
    {
        let url = validate_url(url)?;
        document.envelope().require_header()?;
        document.prepare_for_submit()?;

        transition(state, SubmitState::Rendering);
        let xml = document.render(RenderOptions::pretty())?;

        transition(state, SubmitState::SchemaValidating);
        let well_formed = self.validator.check_well_formed(&xml).await?;
        if !well_formed.is_valid() {
            warn!(errors = ?well_formed.errors(), "rendered document is not well-formed");
        }

        let message_type = document.message_type();
        let needs_dtd = document.requires_schema_validation()
            || (message_type == MessageType::OrderRequest && self.options.validate_orders);
        if needs_dtd {
            self.validator.validate(message_type, &xml).await?;
        }

        if url == TEST_URL {
            transition(state, SubmitState::TestShortcut);
            let envelope = document.envelope();
            return Ok(CxmlResponse::test(envelope.payload_id(), envelope.timestamp()));
        }

        transition(state, SubmitState::Sending);
        self.notify(SubmitEvent::Sending(xml.clone()));
        let user_agent = document.user_agent().unwrap_or_default().to_string();

        transition(state, SubmitState::AwaitingResponse);
        let reply = self.transport.post(url, xml, &user_agent).await?;
        self.notify(SubmitEvent::Received(reply.body.clone()));

        Ok(CxmlResponse::received(reply.status, reply.body))
    }
}

fn transition(state: &mut SubmitState, next: SubmitState) {
    debug!(from = state.as_str(), to = next.as_str(), "submit state");
    *state = next;
}

/// Blank → error; `%%TEST%%` passes; anything else must be absolute http(s).
fn validate_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CxmlError::InvalidArgument(
            "destination URL must not be blank".to_string(),
        ));
    }
    if url == TEST_URL {
        return Ok(url);
    }

    let parsed = Url::parse(url)
        .map_err(|e| CxmlError::InvalidArgument(format!("invalid destination URL {url:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
        return Err(CxmlError::InvalidArgument(format!(
            "destination URL must be an absolute http(s) URL, got {url:?}"
        )));
    }

    Ok(url)
}
