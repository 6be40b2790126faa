//! # cxml-outbound
//!
//! Builds outbound cXML purchase orders (`OrderRequest`) and invoices
//! (`InvoiceDetailRequest`) from loosely-typed field maps, renders them to
//! wire text, checks them with libxml2 and posts them to a trading partner.

pub mod cli;
pub mod config;
pub mod document;
pub mod entities;
pub mod error;
pub mod fields;
pub mod http_client;
pub mod libxml2;
pub mod loader;
pub mod render;
pub mod reporter;
pub mod response;
pub mod schema;
pub mod submit;

pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigManager};
pub use document::{
    DeploymentMode, Document, Envelope, InvoiceOptions, InvoiceRequest, MessageType, OrderOptions,
    OrderRequest, RenderOptions, RequestHeader,
};
pub use error::{ConfigError, CxmlError, LibXml2Error};
pub use http_client::{HttpClientConfig, HttpTransport, Transport, TransportResponse};
pub use libxml2::{LibXml2Wrapper, ValidationResult, XmlDtdPtr};
pub use loader::{LoadedDocument, load_document, parse_document};
pub use reporter::Reporter;
pub use response::{CxmlResponse, CxmlStatus, ResponseKind};
pub use schema::{DtdCache, DtdValidator, SchemaValidator};
pub use submit::{SubmitEvent, SubmitOptions, SubmitState, Submitter};
