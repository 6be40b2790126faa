//! Invoice (`InvoiceDetailRequest`) document.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{DeploymentMode, Document, Envelope, MessageType, RenderOptions};
use crate::entities::{
    Contact, ContactPlacement, Credential, Distribution, EntityList, InvoiceItem, Money, Summary,
    TaxDetail,
};
use crate::error::{CxmlError, Result};
use crate::fields::{self, optional_text, text_field};
use crate::render::{CxmlWriter, render_message};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceOptions {
    pub payload_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl InvoiceOptions {
    pub fn new(payload_id: impl Into<String>) -> Self {
        Self {
            payload_id: payload_id.into(),
            ..Default::default()
        }
    }
}

/// `InvoiceDetailRequestHeader` attributes plus the optional references
/// rendered around it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestHeader {
    pub invoice_date: String,
    pub invoice_id: String,
    pub operation: String,
    pub purpose: String,
    pub deployment_mode: DeploymentMode,
    pub is_tax_in_line: Option<String>,
    pub is_accounting_in_line: Option<String>,
    pub requester_email: Option<String>,
    pub requester_name: Option<String>,
    /// Payload id of the order being invoiced
    pub order_payload_id: Option<String>,
    pub percent_rate: Option<Decimal>,
    pub pay_in_number_of_days: Option<String>,
}

impl RequestHeader {
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        fields::validate("request header", value, fields::REQUEST_HEADER)?;
        let object = fields::as_object("request header", value)?;

        let deployment_mode = match optional_text(object, "deployment_mode") {
            None => DeploymentMode::default(),
            Some(raw) => DeploymentMode::parse(&raw).ok_or_else(|| {
                CxmlError::validation(
                    "request header",
                    "deployment_mode",
                    format!("must be \"production\" or \"test\", got {raw:?}"),
                )
            })?,
        };

        let percent_rate = match object.get("percent_rate").filter(|v| !v.is_null()) {
            None => None,
            Some(raw) => Some(fields::coerce_number(raw).ok_or_else(|| {
                CxmlError::validation("request header", "percent_rate", "must be numeric")
            })?),
        };

        Ok(Self {
            invoice_date: text_field(object, "invoice_date"),
            invoice_id: text_field(object, "invoice_id"),
            operation: text_field(object, "operation"),
            purpose: text_field(object, "purpose"),
            deployment_mode,
            is_tax_in_line: flag(object.get("is_tax_in_line")),
            is_accounting_in_line: flag(object.get("is_accounting_in_line")),
            requester_email: optional_text(object, "requester_email"),
            requester_name: optional_text(object, "requester_name"),
            order_payload_id: optional_text(object, "payload_id"),
            percent_rate,
            pay_in_number_of_days: optional_text(object, "pay_in_number_of_days"),
        })
    }
}

/// Line indicator flags take `yes`; booleans are accepted for convenience.
fn flag(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Bool(true) => Some("yes".to_string()),
        Value::Bool(false) | Value::Null => None,
        other => Some(fields::text(other)).filter(|s| !s.is_empty()),
    }
}

/// A cXML invoice being assembled
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRequest {
    envelope: Envelope,
    request_header: Option<RequestHeader>,
    items: EntityList<InvoiceItem>,
    item_taxes: EntityList<TaxDetail>,
    distributions: EntityList<Distribution>,
    summaries: EntityList<Summary>,
    summary_taxes: EntityList<TaxDetail>,
    partner_contacts: EntityList<Contact>,
    shipping_contacts: EntityList<Contact>,
}

impl InvoiceRequest {
    pub fn new(options: InvoiceOptions) -> Result<Self> {
        if options.payload_id.trim().is_empty() {
            return Err(CxmlError::InvalidArgument(
                "\"payload_id\" is required and must not be blank".to_string(),
            ));
        }

        debug!(payload_id = %options.payload_id, "constructing invoice request");

        let language = options.language.unwrap_or_else(|| "en-US".to_string());
        Ok(Self {
            envelope: Envelope::new(options.payload_id, options.timestamp, language),
            request_header: None,
            items: EntityList::new(),
            item_taxes: EntityList::new(),
            distributions: EntityList::new(),
            summaries: EntityList::new(),
            summary_taxes: EntityList::new(),
            partner_contacts: EntityList::new(),
            shipping_contacts: EntityList::new(),
        })
    }

    pub fn payload_id(&self) -> &str {
        self.envelope.payload_id()
    }

    pub fn timestamp(&self) -> &str {
        self.envelope.timestamp()
    }

    pub fn request_header(&self) -> Option<&RequestHeader> {
        self.request_header.as_ref()
    }

    pub fn deployment_mode(&self) -> DeploymentMode {
        self.request_header
            .as_ref()
            .map(|header| header.deployment_mode)
            .unwrap_or_default()
    }

    pub fn items(&self) -> &EntityList<InvoiceItem> {
        &self.items
    }

    pub fn item_taxes(&self) -> &EntityList<TaxDetail> {
        &self.item_taxes
    }

    pub fn distributions(&self) -> &EntityList<Distribution> {
        &self.distributions
    }

    pub fn summaries(&self) -> &EntityList<Summary> {
        &self.summaries
    }

    pub fn summary_taxes(&self) -> &EntityList<TaxDetail> {
        &self.summary_taxes
    }

    pub fn partner_contacts(&self) -> &EntityList<Contact> {
        &self.partner_contacts
    }

    pub fn shipping_contacts(&self) -> &EntityList<Contact> {
        &self.shipping_contacts
    }

    pub fn add_item(&mut self, item: &Value) -> Result<&mut Self> {
        let line_number = self.items.len() + 1;
        let item = InvoiceItem::from_value(item, line_number)?;

        debug!(payload_id = %self.payload_id(), line_number, part = %item.part_id, "adding item to invoice");
        self.items.push(item);

        Ok(self)
    }

    /// Append items in order. A failure leaves earlier items in place.
    pub fn add_items<'a, I>(&mut self, items: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        for item in items {
            self.add_item(item)?;
        }
        Ok(self)
    }

    /// Tax detail for a line item, matched to it by `invoice_id`.
    pub fn add_item_tax(&mut self, tax: &Value) -> Result<&mut Self> {
        if self.items.is_empty() {
            return Err(CxmlError::Precondition(
                "add at least one item before adding item taxes".to_string(),
            ));
        }

        let tax = TaxDetail::from_value("item tax", tax)?;
        debug!(payload_id = %self.payload_id(), invoice_id = %tax.invoice_id, "adding item tax");
        self.item_taxes.push(tax);

        Ok(self)
    }

    pub fn add_item_taxes<'a, I>(&mut self, taxes: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        for tax in taxes {
            self.add_item_tax(tax)?;
        }
        Ok(self)
    }

    pub fn add_distribution(&mut self, distribution: &Value) -> Result<&mut Self> {
        let distribution = Distribution::from_value(distribution)?;
        debug!(payload_id = %self.payload_id(), name = %distribution.name, "adding distribution");
        self.distributions.push(distribution);

        Ok(self)
    }

    pub fn add_distributions<'a, I>(&mut self, distributions: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        for distribution in distributions {
            self.add_distribution(distribution)?;
        }
        Ok(self)
    }

    pub fn add_summary(&mut self, summary: &Value) -> Result<&mut Self> {
        let summary = Summary::from_value(summary)?;
        debug!(payload_id = %self.payload_id(), due = %summary.due.amount, "adding summary");
        self.summaries.push(summary);

        Ok(self)
    }

    pub fn add_summary_tax(&mut self, tax: &Value) -> Result<&mut Self> {
        let tax = TaxDetail::from_value("summary tax", tax)?;
        debug!(payload_id = %self.payload_id(), invoice_id = %tax.invoice_id, "adding summary tax");
        self.summary_taxes.push(tax);

        Ok(self)
    }

    /// `shipTo`/`shipFrom` contacts go to shipping, every other role to partners.
    pub fn add_contact(&mut self, contact: &Value) -> Result<&mut Self> {
        let contact = Contact::from_value(contact)?;
        debug!(payload_id = %self.payload_id(), role = %contact.role, "adding contact");

        match contact.placement() {
            ContactPlacement::Shipping => self.shipping_contacts.push(contact),
            ContactPlacement::Partner => self.partner_contacts.push(contact),
        }

        Ok(self)
    }

    pub fn add_contacts<'a, I>(&mut self, contacts: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        for contact in contacts {
            self.add_contact(contact)?;
        }
        Ok(self)
    }

    pub fn set_request_header(&mut self, header: &Value) -> Result<&mut Self> {
        let header = RequestHeader::from_value(header)?;
        debug!(payload_id = %self.payload_id(), invoice_id = %header.invoice_id, "request header set");
        self.request_header = Some(header);

        Ok(self)
    }

    fn write_request(&self, w: &mut CxmlWriter) -> Result<()> {
        w.wrap("InvoiceDetailRequest", &[], |w| {
            self.write_request_header(w)?;
            self.write_order(w)?;
            self.write_summary(w)
        })
    }

    fn write_request_header(&self, w: &mut CxmlWriter) -> Result<()> {
        let header = self.request_header.as_ref();
        let (invoice_id, purpose, operation, invoice_date) = match header {
            Some(h) => (
                h.invoice_id.as_str(),
                h.purpose.as_str(),
                h.operation.as_str(),
                h.invoice_date.as_str(),
            ),
            None => ("", "", "", ""),
        };

        let attributes = [
            ("invoiceID", invoice_id),
            ("purpose", purpose),
            ("operation", operation),
            ("invoiceDate", invoice_date),
        ];

        w.wrap("InvoiceDetailRequestHeader", &attributes, |w| {
            w.empty("InvoiceDetailHeaderIndicator", &[])?;

            let mut indicators = Vec::new();
            if let Some(flag) = header.and_then(|h| h.is_tax_in_line.as_deref()) {
                indicators.push(("isTaxInLine", flag));
            }
            if let Some(flag) = header.and_then(|h| h.is_accounting_in_line.as_deref()) {
                indicators.push(("isAccountingInLine", flag));
            }
            w.empty("InvoiceDetailLineIndicator", &indicators)?;

            for contact in &self.partner_contacts {
                w.wrap("InvoicePartner", &[], |w| write_contact(w, contact))?;
            }

            if !self.shipping_contacts.is_empty() {
                w.wrap("InvoiceDetailShipping", &[], |w| {
                    for contact in &self.shipping_contacts {
                        write_contact(w, contact)?;
                    }
                    Ok(())
                })?;
            }

            if let Some(header) = header {
                let percent_rate = header.percent_rate.map(|rate| rate.to_string());
                if let (Some(rate), Some(days)) = (&percent_rate, &header.pay_in_number_of_days) {
                    w.empty(
                        "InvoiceDetailPaymentTerm",
                        &[("payInNumberOfDays", days.as_str()), ("percentageRate", rate.as_str())],
                    )?;
                }
                if let Some(email) = &header.requester_email {
                    w.text_element("Extrinsic", &[("name", "requesterEmail")], email)?;
                }
                if let Some(name) = &header.requester_name {
                    w.text_element("Extrinsic", &[("name", "requesterName")], name)?;
                }
            }
            Ok(())
        })
    }

    fn write_order(&self, w: &mut CxmlWriter) -> Result<()> {
        w.wrap("InvoiceDetailOrder", &[], |w| {
            w.wrap("InvoiceDetailOrderInfo", &[], |w| {
                let payload_id = self
                    .request_header
                    .as_ref()
                    .and_then(|h| h.order_payload_id.as_deref())
                    .unwrap_or_default();
                w.wrap("OrderReference", &[], |w| {
                    w.empty("DocumentReference", &[("payloadID", payload_id)])
                })
            })?;

            for item in &self.items {
                self.write_item(w, item)?;
            }
            Ok(())
        })
    }

    fn write_item(&self, w: &mut CxmlWriter, item: &InvoiceItem) -> Result<()> {
        let line_number = item.invoice_line_number.to_string();
        let quantity = item.quantity.to_string();
        let attributes = [
            ("invoiceLineNumber", line_number.as_str()),
            ("quantity", quantity.as_str()),
        ];

        w.wrap("InvoiceDetailItem", &attributes, |w| {
            w.text_element("UnitOfMeasure", &[], &item.uom)?;
            w.money_element("UnitPrice", &item.unit_price)?;
            w.wrap(
                "InvoiceDetailItemReference",
                &[("lineNumber", line_number.as_str())],
                |w| {
                    w.wrap("ItemID", &[], |w| {
                        w.text_element("SupplierPartID", &[], &item.part_id)
                    })?;
                    w.description(&item.part_description_language, &item.part_description)
                },
            )?;

            let subtotal = Money::new(item.subtotal, item.unit_price.currency.clone());
            w.money_element("SubtotalAmount", &subtotal)?;

            w.wrap("Tax", &[], |w| {
                w.money(&item.tax)?;
                w.description(&item.tax_description_language, &item.tax_description)?;
                for tax in self.item_taxes.iter().filter(|t| t.invoice_id == item.invoice_id) {
                    w.tax_detail(tax)?;
                }
                Ok(())
            })?;

            w.money_element("GrossAmount", &item.gross)?;
            w.money_element("NetAmount", &item.net)?;

            for distribution in &self.distributions {
                write_distribution(w, distribution)?;
            }
            Ok(())
        })
    }

    fn write_summary(&self, w: &mut CxmlWriter) -> Result<()> {
        let Some(summary) = self.summaries.first() else {
            return Ok(());
        };

        w.wrap("InvoiceDetailSummary", &[], |w| {
            w.money_element("SubtotalAmount", &summary.sub_total)?;
            w.wrap("Tax", &[], |w| {
                let total_tax = self
                    .summary_taxes
                    .iter()
                    .try_fold(Decimal::ZERO, |sum, tax| sum.checked_add(tax.tax_amount))
                    .ok_or_else(|| {
                        CxmlError::Precondition(format!(
                            "summary tax total for invoice {} is out of range",
                            summary.invoice_id
                        ))
                    })?;
                w.money(&Money::new(total_tax, summary.net.currency.clone()))?;
                w.description(&summary.tax_description_language, &summary.tax_description)?;
                for tax in &self.summary_taxes {
                    w.tax_detail(tax)?;
                }
                Ok(())
            })?;
            w.money_element("ShippingAmount", &summary.shipping)?;
            w.money_element("GrossAmount", &summary.gross)?;
            w.money_element("NetAmount", &summary.net)?;
            w.money_element("DueAmount", &summary.due)
        })
    }
}

fn write_contact(w: &mut CxmlWriter, contact: &Contact) -> Result<()> {
    let mut attributes = vec![("role", contact.role.as_str())];
    if let Some(id) = &contact.address_id {
        attributes.push(("addressID", id.as_str()));
    }

    w.wrap("Contact", &attributes, |w| {
        w.text_element("Name", &[("xml:lang", contact.language.as_str())], &contact.name)?;
        w.wrap("PostalAddress", &[], |w| {
            w.text_element("Street", &[], &contact.street)?;
            w.text_element("City", &[], &contact.city)?;
            w.text_element("State", &[], &contact.state)?;
            if let Some(postal_code) = &contact.postal_code {
                w.text_element("PostalCode", &[], postal_code)?;
            }
            let country_code = contact.country_code.as_deref().unwrap_or_default();
            w.text_element("Country", &[("isoCountryCode", country_code)], &contact.country)
        })?;
        if let Some(email) = &contact.email {
            w.text_element("Email", &[], email)?;
        }
        Ok(())
    })
}

fn write_distribution(w: &mut CxmlWriter, distribution: &Distribution) -> Result<()> {
    w.wrap("Distribution", &[], |w| {
        w.wrap("Accounting", &[("name", distribution.name.as_str())], |w| {
            for segment in &distribution.segments {
                w.wrap("AccountingSegment", &[("id", segment.id.as_str())], |w| {
                    w.text_element("Name", &[("xml:lang", segment.name_language.as_str())], &segment.name)?;
                    w.description(&segment.description_language, &segment.description)
                })?;
            }
            Ok(())
        })?;
        w.money_element("Charge", &distribution.charge)
    })
}

impl Document for InvoiceRequest {
    fn message_type(&self) -> MessageType {
        MessageType::InvoiceDetailRequest
    }

    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn supplier(&self) -> Option<&Credential> {
        self.header().map(|header| &header.from)
    }

    fn buyer(&self) -> Option<&Credential> {
        self.header().map(|header| &header.to)
    }

    fn requires_schema_validation(&self) -> bool {
        true
    }

    fn render(&self, options: RenderOptions) -> Result<String> {
        render_message(
            &self.envelope,
            MessageType::InvoiceDetailRequest,
            self.deployment_mode().as_str(),
            options,
            |w| self.write_request(w),
        )
    }
}
