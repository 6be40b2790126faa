//! cXML serializer.
//!
//! Writes the shared envelope (declaration, DOCTYPE, `cXML` root and `Header`)
//! and hands the writer to the document variant for its `Request` body.
//! Built on quick-xml's event writer so text and attribute values are
//! always escaped.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::document::{Envelope, MessageType, RenderOptions};
use crate::entities::{Credential, Header, Money, TaxDetail};
use crate::error::{CxmlError, Result};

/// Thin wrapper over the quick-xml writer with cXML-shaped helpers
pub struct CxmlWriter {
    inner: Writer<Vec<u8>>,
}

impl CxmlWriter {
    pub fn new(options: RenderOptions) -> Self {
        let inner = if options.pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };

        Self { inner }
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.inner
            .write_event(event)
            .map_err(|e| CxmlError::Render(e.to_string()))
    }

    fn element<'a>(name: &'a str, attributes: &[(&'a str, &'a str)]) -> BytesStart<'a> {
        let mut element = BytesStart::new(name);
        for attribute in attributes {
            element.push_attribute(*attribute);
        }
        element
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.write(Event::Start(Self::element(name, attributes)))
    }

    pub fn end(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.write(Event::Empty(Self::element(name, attributes)))
    }

    /// `<name attrs>text</name>`
    pub fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attributes)?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    /// `<name>` … `</name>` around whatever `body` writes
    pub fn wrap<F>(&mut self, name: &str, attributes: &[(&str, &str)], body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.start(name, attributes)?;
        body(self)?;
        self.end(name)
    }

    /// `<Money currency="…">amount</Money>`
    pub fn money(&mut self, money: &Money) -> Result<()> {
        self.text_element(
            "Money",
            &[("currency", money.currency.as_str())],
            &money.amount.to_string(),
        )
    }

    /// `<name><Money …/></name>`
    pub fn money_element(&mut self, name: &str, money: &Money) -> Result<()> {
        self.wrap(name, &[], |w| w.money(money))
    }

    pub fn description(&mut self, language: &str, text: &str) -> Result<()> {
        self.text_element("Description", &[("xml:lang", language)], text)
    }

    pub fn credential(&mut self, credential: &Credential) -> Result<()> {
        self.wrap("Credential", &[("domain", credential.domain.as_str())], |w| {
            w.text_element("Identity", &[], &credential.identity)
        })
    }

    pub fn tax_detail(&mut self, tax: &TaxDetail) -> Result<()> {
        let percent_rate = tax.percent_rate.to_string();
        let attributes = [
            ("purpose", tax.purpose.as_str()),
            ("category", tax.category.as_str()),
            ("percentageRate", percent_rate.as_str()),
        ];

        self.wrap("TaxDetail", &attributes, |w| {
            w.money_element("TaxableAmount", &tax.taxable)?;
            w.money_element("TaxAmount", &tax.tax_money())?;
            w.text_element(
                "TaxLocation",
                &[("xml:lang", tax.location_language.as_str())],
                &tax.location,
            )?;
            w.description(&tax.description_language, &tax.description)
        })
    }

    fn header(&mut self, header: Option<&Header>) -> Result<()> {
        let Some(header) = header else {
            // An unset header still renders; submit refuses it earlier.
            return self.empty("Header", &[]);
        };

        self.wrap("Header", &[], |w| {
            w.wrap("From", &[], |w| w.credential(&header.from))?;
            w.wrap("To", &[], |w| w.credential(&header.to))?;
            w.wrap("Sender", &[], |w| {
                let sender = &header.sender;
                w.wrap("Credential", &[("domain", sender.domain.as_str())], |w| {
                    w.text_element("Identity", &[], &sender.identity)?;
                    w.text_element("SharedSecret", &[], &sender.shared_secret)
                })?;
                w.text_element("UserAgent", &[], &sender.user_agent)
            })
        })
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner()).map_err(|e| CxmlError::Render(e.to_string()))
    }
}

/// Render a complete cXML message; `request` writes the children of `<Request>`.
pub fn render_message<F>(
    envelope: &Envelope,
    message_type: MessageType,
    deployment_mode: &str,
    options: RenderOptions,
    request: F,
) -> Result<String>
where
    F: FnOnce(&mut CxmlWriter) -> Result<()>,
{
    let mut w = CxmlWriter::new(options);

    w.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let doctype = format!(
        "cXML SYSTEM \"{}\"",
        message_type.dtd_url(envelope.version())
    );
    w.write(Event::DocType(BytesText::from_escaped(doctype)))?;

    let root = [
        ("payloadID", envelope.payload_id()),
        ("timestamp", envelope.timestamp()),
        ("version", envelope.version()),
        ("xml:lang", envelope.language()),
    ];
    w.wrap("cXML", &root, |w| {
        w.header(envelope.header())?;
        w.wrap("Request", &[("deploymentMode", deployment_mode)], request)
    })?;

    w.finish()
}
