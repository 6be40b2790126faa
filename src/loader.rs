//! Builds documents from JSON descriptions.
//!
//! A description names its `type` (`order` or `invoice`), the constructor
//! `options`, and optional sections that map one-to-one onto builder calls,
//! applied in a fixed order:
//!
//! ```json
//! {
//!   "type": "order",
//!   "options": { "order_id": "PO-1001" },
//!   "header": { "from": {}, "to": {}, "sender": {} },
//!   "items": [],
//!   "billing": {},
//!   "shipping": {},
//!   "total": { "amount": 10, "currency": "USD" }
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::document::{
    DeploymentMode, Document, InvoiceOptions, InvoiceRequest, OrderOptions, OrderRequest,
};
use crate::error::{CxmlError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DocumentDescription {
    Order(OrderDescription),
    Invoice(InvoiceDescription),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderDescription {
    pub options: OrderOptions,
    #[serde(default)]
    pub deployment_mode: Option<String>,
    #[serde(default)]
    pub header: Option<Value>,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub billing: Option<Value>,
    #[serde(default)]
    pub shipping: Option<Value>,
    #[serde(default)]
    pub total: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceDescription {
    pub options: InvoiceOptions,
    #[serde(default)]
    pub header: Option<Value>,
    #[serde(default)]
    pub request_header: Option<Value>,
    #[serde(default)]
    pub contacts: Vec<Value>,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub item_taxes: Vec<Value>,
    #[serde(default)]
    pub distributions: Vec<Value>,
    /// One summary object or a list of them
    #[serde(default)]
    pub summary: Option<Value>,
    /// One tax object or a list of them
    #[serde(default)]
    pub summary_tax: Option<Value>,
}

/// A built document of either kind
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedDocument {
    Order(OrderRequest),
    Invoice(InvoiceRequest),
}

impl LoadedDocument {
    pub fn as_document(&self) -> &(dyn Document + Send) {
        match self {
            LoadedDocument::Order(order) => order,
            LoadedDocument::Invoice(invoice) => invoice,
        }
    }

    pub fn as_document_mut(&mut self) -> &mut (dyn Document + Send) {
        match self {
            LoadedDocument::Order(order) => order,
            LoadedDocument::Invoice(invoice) => invoice,
        }
    }
}

/// Read and build a description file.
pub async fn load_document(path: &Path) -> Result<LoadedDocument> {
    let content = tokio::fs::read_to_string(path).await?;
    debug!(path = %path.display(), bytes = content.len(), "loaded document description");
    parse_document(&content)
}

pub fn parse_document(content: &str) -> Result<LoadedDocument> {
    let description: DocumentDescription = serde_json::from_str(content)?;
    build_document(description)
}

pub fn build_document(description: DocumentDescription) -> Result<LoadedDocument> {
    match description {
        DocumentDescription::Order(order) => build_order(order).map(LoadedDocument::Order),
        DocumentDescription::Invoice(invoice) => build_invoice(invoice).map(LoadedDocument::Invoice),
    }
}

fn build_order(description: OrderDescription) -> Result<OrderRequest> {
    let mut order = OrderRequest::new(description.options)?;

    if let Some(raw) = &description.deployment_mode {
        let mode = DeploymentMode::parse(raw).ok_or_else(|| {
            CxmlError::InvalidArgument(format!(
                "deployment_mode must be \"production\" or \"test\", got {raw:?}"
            ))
        })?;
        order.set_deployment_mode(mode);
    }
    if let Some(header) = &description.header {
        order.set_header(header)?;
    }
    order.add_items(&description.items)?;
    if let Some(billing) = &description.billing {
        order.set_billing_info(billing)?;
    }
    if let Some(shipping) = &description.shipping {
        order.set_shipping_info(shipping)?;
    }
    if let Some(total) = &description.total {
        order.set_total(total)?;
    }

    Ok(order)
}

fn build_invoice(description: InvoiceDescription) -> Result<InvoiceRequest> {
    let mut invoice = InvoiceRequest::new(description.options)?;

    if let Some(header) = &description.header {
        invoice.set_header(header)?;
    }
    if let Some(request_header) = &description.request_header {
        invoice.set_request_header(request_header)?;
    }
    invoice.add_contacts(&description.contacts)?;
    invoice.add_items(&description.items)?;
    invoice.add_item_taxes(&description.item_taxes)?;
    invoice.add_distributions(&description.distributions)?;
    for summary in one_or_many(description.summary.as_ref()) {
        invoice.add_summary(summary)?;
    }
    for tax in one_or_many(description.summary_tax.as_ref()) {
        invoice.add_summary_tax(tax)?;
    }

    Ok(invoice)
}

fn one_or_many(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries.iter().collect(),
        Some(single) => vec![single],
    }
}
