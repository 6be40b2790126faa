//! Result of a submit: the raw reply plus the parsed cXML status.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;

use crate::document::{EMPTY_RESPONSE, TEST_URL};

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseKind {
    /// Canned reply for the `%%TEST%%` destination; nothing was sent
    Test,
    /// The endpoint answered 2xx with an empty body
    Empty,
    Received { http_status: u16 },
}

/// `<Status code="…" text="…">message</Status>` from a cXML reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CxmlStatus {
    pub code: String,
    pub text: String,
    pub message: Option<String>,
}

impl CxmlStatus {
    /// cXML status codes follow HTTP: 2xx means accepted.
    pub fn is_success(&self) -> bool {
        self.code.starts_with('2') && self.code.len() == 3
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CxmlResponse {
    kind: ResponseKind,
    body: String,
}

impl CxmlResponse {
    pub(crate) fn test(payload_id: &str, timestamp: &str) -> Self {
        let body = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><cXML payloadID=\"{}\" timestamp=\"{}\"><Response><Status code=\"200\" text=\"OK\">{}</Status></Response></cXML>",
            quick_xml::escape::escape(payload_id),
            quick_xml::escape::escape(timestamp),
            TEST_URL
        );

        Self {
            kind: ResponseKind::Test,
            body,
        }
    }

    pub(crate) fn received(http_status: u16, body: String) -> Self {
        if body.is_empty() {
            return Self {
                kind: ResponseKind::Empty,
                body: EMPTY_RESPONSE.to_string(),
            };
        }

        Self {
            kind: ResponseKind::Received { http_status },
            body,
        }
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// Raw reply text, or `%%EMPTY%%` when the endpoint sent nothing
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_empty(&self) -> bool {
        self.kind == ResponseKind::Empty
    }

    /// First `Status` element of the reply, if it has one.
    pub fn status(&self) -> Option<CxmlStatus> {
        if self.is_empty() {
            return None;
        }

        let mut reader = Reader::from_str(&self.body);
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.name().as_ref() == b"Status" => {
                    let mut status = status_from_attributes(&e);
                    if let Ok(Event::Text(text)) = reader.read_event() {
                        status.message = text
                            .unescape()
                            .ok()
                            .map(|t| t.trim().to_string())
                            .filter(|t| !t.is_empty());
                    }
                    return Some(status);
                }
                Ok(Event::Empty(e)) if e.name().as_ref() == b"Status" => {
                    return Some(status_from_attributes(&e));
                }
                Ok(Event::Eof) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }

    /// True for a 2xx cXML status and for an empty reply.
    pub fn is_success(&self) -> bool {
        self.is_empty() || self.status().is_some_and(|status| status.is_success())
    }
}

fn status_from_attributes(element: &quick_xml::events::BytesStart<'_>) -> CxmlStatus {
    let mut status = CxmlStatus {
        code: String::new(),
        text: String::new(),
        message: None,
    };

    for attribute in element.attributes().flatten() {
        let value = attribute
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match attribute.key.as_ref() {
            b"code" => status.code = value,
            b"text" => status.text = value,
            _ => {}
        }
    }

    status
}
