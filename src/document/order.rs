//! Purchase order (`OrderRequest`) document.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{DeploymentMode, Document, Envelope, MessageType, RenderOptions, generate_payload_id, now_timestamp};
use crate::entities::{
    Address, Credential, Email, EntityList, Money, OrderItem, OrderTax, Phone, PurchasingCard,
    ShippingMethod,
};
use crate::error::{CxmlError, Result};
use crate::fields;
use crate::render::{CxmlWriter, render_message};

/// Identity fields an order is created with
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderOptions {
    pub order_id: String,
    /// Kept verbatim when supplied; defaults to now
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub payload_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl OrderOptions {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            ..Default::default()
        }
    }

    pub fn with_order_date(mut self, order_date: impl Into<String>) -> Self {
        self.order_date = Some(order_date.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct PartyInfo {
    address: Option<Address>,
    email: Option<Email>,
    phone: Option<Phone>,
}

/// A cXML purchase order being assembled
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    envelope: Envelope,
    id: String,
    date: String,
    order_type: String,
    request_type: String,
    deployment_mode: DeploymentMode,
    items: EntityList<OrderItem>,
    bill_to: PartyInfo,
    ship_to: PartyInfo,
    pcard: Option<PurchasingCard>,
    tax: Option<OrderTax>,
    shipping: Option<ShippingMethod>,
    total: Option<Money>,
}

impl OrderRequest {
    /// Create an order; `order_id` must not be blank.
    pub fn new(options: OrderOptions) -> Result<Self> {
        debug!(order_id = %options.order_id, "constructing order request");

        if options.order_id.trim().is_empty() {
            return Err(CxmlError::InvalidArgument(
                "\"order_id\" is required and must not be blank".to_string(),
            ));
        }

        let payload_id = options
            .payload_id
            .unwrap_or_else(|| generate_payload_id("cxml-outbound"));
        let language = options.language.unwrap_or_else(|| "en".to_string());

        Ok(Self {
            envelope: Envelope::new(payload_id, None, language),
            id: options.order_id,
            date: options.order_date.unwrap_or_else(now_timestamp),
            order_type: "regular".to_string(),
            request_type: "new".to_string(),
            deployment_mode: DeploymentMode::default(),
            items: EntityList::new(),
            bill_to: PartyInfo::default(),
            ship_to: PartyInfo::default(),
            pcard: None,
            tax: None,
            shipping: None,
            total: None,
        })
    }

    pub fn order_id(&self) -> &str {
        &self.id
    }

    pub fn order_date(&self) -> &str {
        &self.date
    }

    pub fn order_type(&self) -> &str {
        &self.order_type
    }

    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    pub fn deployment_mode(&self) -> DeploymentMode {
        self.deployment_mode
    }

    pub fn set_deployment_mode(&mut self, mode: DeploymentMode) {
        self.deployment_mode = mode;
    }

    pub fn items(&self) -> &EntityList<OrderItem> {
        &self.items
    }

    /// Explicit total, or the derived one once submit has prepared the order
    pub fn total(&self) -> Option<&Money> {
        self.total.as_ref()
    }

    pub fn bill_to(&self) -> Option<&Address> {
        self.bill_to.address.as_ref()
    }

    pub fn ship_to(&self) -> Option<&Address> {
        self.ship_to.address.as_ref()
    }

    pub fn purchasing_card(&self) -> Option<&PurchasingCard> {
        self.pcard.as_ref()
    }

    /// Append a line item; it receives the next line number.
    pub fn add_item(&mut self, item: &Value) -> Result<&mut Self> {
        let line_number = self.items.len() + 1;
        let item = OrderItem::from_value(item, line_number)?;

        debug!(order_id = %self.id, line_number, part = %item.supplier_part_id, "adding item to order");
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

    /// Bill-to address plus optional e-mail, phone, purchasing card and tax.
    pub fn set_billing_info(&mut self, options: &Value) -> Result<&mut Self> {
        let address = options
            .get("address")
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                CxmlError::validation("billing info", "address", "is required")
            })?;

        let address = Address::bill_to(address)?;
        let email = optional(options, "email")
            .map(|v| Email::from_value("bill-to e-mail", v))
            .transpose()?;
        let phone = optional(options, "phone")
            .map(|v| Phone::from_value("bill-to phone", v))
            .transpose()?;
        let pcard = optional(options, "pcard")
            .map(PurchasingCard::from_value)
            .transpose()?;
        let tax = optional(options, "tax")
            .map(OrderTax::from_value)
            .transpose()?;

        debug!(order_id = %self.id, company = %address.company_name, "bill-to set");

        self.bill_to = PartyInfo {
            address: Some(address),
            email,
            phone,
        };
        if pcard.is_some() {
            self.pcard = pcard;
        }
        if tax.is_some() {
            self.tax = tax;
        }

        Ok(self)
    }

    /// Ship-to address plus optional e-mail, phone and shipping method.
    pub fn set_shipping_info(&mut self, options: &Value) -> Result<&mut Self> {
        let address = options
            .get("address")
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                CxmlError::validation("shipping info", "address", "is required")
            })?;

        let address = Address::ship_to(address)?;
        let email = optional(options, "email")
            .map(|v| Email::from_value("ship-to e-mail", v))
            .transpose()?;
        let phone = optional(options, "phone")
            .map(|v| Phone::from_value("ship-to phone", v))
            .transpose()?;
        let method = optional(options, "method")
            .map(ShippingMethod::from_value)
            .transpose()?;

        debug!(order_id = %self.id, company = %address.company_name, "ship-to set");

        self.ship_to = PartyInfo {
            address: Some(address),
            email,
            phone,
        };
        if method.is_some() {
            self.shipping = method;
        }

        Ok(self)
    }

    /// Override the total derived from the items.
    pub fn set_total(&mut self, options: &Value) -> Result<&mut Self> {
        fields::validate("total", options, fields::MONEY)?;
        let object = fields::as_object("total", options)?;

        self.total = Some(Money::from_object(object));
        Ok(self)
    }

    /// Σ quantity × unit price over items sharing one currency.
    pub fn computed_total(&self) -> Result<Money> {
        let mut currency: Option<&str> = None;
        let mut amount = Decimal::ZERO;

        for item in &self.items {
            match currency {
                None => currency = Some(item.currency.as_str()),
                Some(existing) if existing != item.currency => {
                    return Err(CxmlError::Precondition(format!(
                        "items use both {} and {}; call set_total before submitting an order with mixed currencies",
                        existing, item.currency
                    )));
                }
                Some(_) => {}
            }
            amount = amount.checked_add(item.extended_price()?).ok_or_else(|| {
                CxmlError::Precondition(format!(
                    "order total is out of range at line {}",
                    item.line_number
                ))
            })?;
        }

        Ok(Money::new(amount, currency.unwrap_or_default()))
    }

    fn write_request(&self, w: &mut CxmlWriter) -> Result<()> {
        w.wrap("OrderRequest", &[], |w| {
            let header_attributes = [
                ("orderID", self.id.as_str()),
                ("orderDate", self.date.as_str()),
                ("type", self.request_type.as_str()),
                ("orderType", self.order_type.as_str()),
            ];
            w.wrap("OrderRequestHeader", &header_attributes, |w| {
                if let Some(total) = &self.total {
                    w.money_element("Total", total)?;
                }
                if let Some(address) = &self.ship_to.address {
                    w.wrap("ShipTo", &[], |w| write_address(w, address, &self.ship_to, &self.envelope.language))?;
                }
                if let Some(address) = &self.bill_to.address {
                    w.wrap("BillTo", &[], |w| write_address(w, address, &self.bill_to, &self.envelope.language))?;
                }
                if let Some(shipping) = &self.shipping {
                    w.wrap("Shipping", &[], |w| {
                        let currency = shipping
                            .currency
                            .clone()
                            .or_else(|| self.total.as_ref().map(|t| t.currency.clone()))
                            .unwrap_or_default();
                        w.money(&Money::new(shipping.amount, currency))?;
                        w.description(
                            shipping.language.as_deref().unwrap_or(&self.envelope.language),
                            shipping.description.as_deref().unwrap_or_default(),
                        )
                    })?;
                }
                if let Some(tax) = &self.tax {
                    w.wrap("Tax", &[], |w| {
                        w.money(&tax.money)?;
                        w.description(
                            tax.language.as_deref().unwrap_or(&self.envelope.language),
                            tax.description.as_deref().unwrap_or_default(),
                        )
                    })?;
                }
                if let Some(pcard) = &self.pcard {
                    w.wrap("Payment", &[], |w| {
                        let mut attributes = vec![
                            ("number", pcard.number.as_str()),
                            ("expiration", pcard.expiration.as_str()),
                        ];
                        if let Some(name) = &pcard.name {
                            attributes.push(("name", name.as_str()));
                        }
                        w.empty("PCard", &attributes)
                    })?;
                }
                Ok(())
            })?;

            for item in &self.items {
                self.write_item(w, item)?;
            }
            Ok(())
        })
    }

    fn write_item(&self, w: &mut CxmlWriter, item: &OrderItem) -> Result<()> {
        let quantity = item.quantity.to_string();
        let line_number = item.line_number.to_string();
        let attributes = [
            ("quantity", quantity.as_str()),
            ("lineNumber", line_number.as_str()),
        ];

        w.wrap("ItemOut", &attributes, |w| {
            w.wrap("ItemID", &[], |w| {
                w.text_element("SupplierPartID", &[], &item.supplier_part_id)
            })?;
            w.wrap("ItemDetail", &[], |w| {
                w.money_element("UnitPrice", &Money::new(item.unit_price, item.currency.clone()))?;
                let language = item.language.as_deref().unwrap_or(&self.envelope.language);
                w.wrap("Description", &[("xml:lang", language)], |w| {
                    w.text_element("ShortName", &[], &item.name)?;
                    if let Some(description) = &item.description {
                        w.text_element("Comments", &[], description)?;
                    }
                    Ok(())
                })?;
                w.text_element("UnitOfMeasure", &[], &item.uom)?;
                for (domain, code) in &item.classification {
                    w.text_element("Classification", &[("domain", domain.as_str())], code)?;
                }
                Ok(())
            })
        })
    }
}

fn optional<'a>(options: &'a Value, key: &str) -> Option<&'a Value> {
    options.get(key).filter(|v| !v.is_null())
}

fn write_address(w: &mut CxmlWriter, address: &Address, party: &PartyInfo, language: &str) -> Result<()> {
    let mut attributes = Vec::new();
    if let Some(id) = &address.address_id {
        attributes.push(("addressID", id.as_str()));
    }
    if let Some(code) = &address.country_code {
        attributes.push(("isoCountryCode", code.as_str()));
    }

    w.wrap("Address", &attributes, |w| {
        w.text_element("Name", &[("xml:lang", language)], &address.company_name)?;
        w.wrap("PostalAddress", &[("name", address.nickname.as_str())], |w| {
            for line in &address.attention {
                w.text_element("DeliverTo", &[], line)?;
            }
            for line in &address.street {
                w.text_element("Street", &[], line)?;
            }
            w.text_element("City", &[], address.city.as_deref().unwrap_or_default())?;
            if let Some(state) = &address.state {
                w.text_element("State", &[], state)?;
            }
            if let Some(postal_code) = &address.postal_code {
                w.text_element("PostalCode", &[], postal_code)?;
            }
            let country_code = address.country_code.as_deref().unwrap_or_default();
            w.text_element(
                "Country",
                &[("isoCountryCode", country_code)],
                address.country.as_deref().unwrap_or_default(),
            )
        })?;
        if let Some(email) = &party.email {
            w.text_element("Email", &[("name", email.nickname.as_str())], &email.address)?;
        }
        if let Some(phone) = &party.phone {
            w.wrap("Phone", &[("name", phone.nickname.as_str())], |w| {
                w.wrap("TelephoneNumber", &[], |w| {
                    w.text_element(
                        "CountryCode",
                        &[("isoCountryCode", country_code_or_blank(address))],
                        &phone.country_code,
                    )?;
                    w.text_element("AreaOrCityCode", &[], &phone.area_or_city_code)?;
                    w.text_element("Number", &[], &phone.number)?;
                    if let Some(extension) = &phone.extension {
                        w.text_element("Extension", &[], extension)?;
                    }
                    Ok(())
                })
            })?;
        }
        Ok(())
    })
}

fn country_code_or_blank(address: &Address) -> &str {
    address.country_code.as_deref().unwrap_or_default()
}

impl Document for OrderRequest {
    fn message_type(&self) -> MessageType {
        MessageType::OrderRequest
    }

    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    fn supplier(&self) -> Option<&Credential> {
        self.header().map(|header| &header.to)
    }

    fn buyer(&self) -> Option<&Credential> {
        self.header().map(|header| &header.from)
    }

    fn requires_schema_validation(&self) -> bool {
        false
    }

    /// Derive the total from the items unless one was set explicitly.
    fn prepare_for_submit(&mut self) -> Result<()> {
        if self.total.is_none() {
            let total = self.computed_total()?;
            debug!(order_id = %self.id, amount = %total.amount, currency = %total.currency, "derived order total");
            self.total = Some(total);
        }
        Ok(())
    }

    fn render(&self, options: RenderOptions) -> Result<String> {
        render_message(
            &self.envelope,
            MessageType::OrderRequest,
            self.deployment_mode.as_str(),
            options,
            |w| self.write_request(w),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(part: &str, quantity: Value, price: Value, currency: &str) -> Value {
        json!({
            "name": format!("Part {part}"),
            "quantity": quantity,
            "supplier_part_id": part,
            "unit_price": price,
            "currency": currency,
            "uom": "EA",
            "classification": { "UNSPSC": "31162800" },
        })
    }

    #[test]
    fn test_blank_order_id_is_rejected() {
        let err = OrderRequest::new(OrderOptions::new("  ")).unwrap_err();
        assert!(matches!(err, CxmlError::InvalidArgument(_)));
    }

    #[test]
    fn test_defaults() {
        let order = OrderRequest::new(OrderOptions::new("PO-1").with_order_date("2026-01-05")).unwrap();
        assert_eq!(order.order_id(), "PO-1");
        assert_eq!(order.order_date(), "2026-01-05");
        assert_eq!(order.order_type(), "regular");
        assert_eq!(order.request_type(), "new");
        assert_eq!(order.envelope().language(), "en");
        assert!(order.items().is_empty());
        assert!(order.total().is_none());
    }

    #[test]
    fn test_line_numbers_skip_failed_items() {
        let mut order = OrderRequest::new(OrderOptions::new("PO-2")).unwrap();
        order.add_item(&item("A", json!(1), json!(2), "USD")).unwrap();
        assert!(order.add_item(&json!({ "name": "broken" })).is_err());
        order.add_item(&item("B", json!("3"), json!("4.5"), "USD")).unwrap();

        let numbers: Vec<usize> = order.items().iter().map(|i| i.line_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_rejected_item_leaves_collection_unchanged() {
        let mut order = OrderRequest::new(OrderOptions::new("PO-8")).unwrap();
        order.add_item(&item("A", json!(1), json!(2), "USD")).unwrap();
        let before = order.items().as_slice().to_vec();

        for missing in ["name", "quantity", "supplier_part_id", "unit_price", "currency", "uom", "classification"] {
            let mut rejected = item("B", json!(1), json!(2), "USD");
            rejected.as_object_mut().unwrap().remove(missing);

            let err = order.add_item(&rejected).unwrap_err();
            assert_eq!(err.field(), Some(missing));
            assert_eq!(order.items().len(), 1);
        }
        assert_eq!(order.items().as_slice(), before.as_slice());
    }

    #[test]
    fn test_computed_total_single_currency() {
        let mut order = OrderRequest::new(OrderOptions::new("PO-3")).unwrap();
        order
            .add_items(&[
                item("A", json!(2), json!(5), "USD"),
                item("B", json!(1), json!(3), "USD"),
            ])
            .unwrap();

        let total = order.computed_total().unwrap();
        assert_eq!(total, Money::new(Decimal::from(13), "USD"));
    }

    #[test]
    fn test_computed_total_mixed_currency() {
        let mut order = OrderRequest::new(OrderOptions::new("PO-4")).unwrap();
        order.add_item(&item("A", json!(1), json!(1), "USD")).unwrap();
        order.add_item(&item("B", json!(1), json!(1), "EUR")).unwrap();

        assert!(order.computed_total().unwrap_err().is_precondition());
        assert!(order.prepare_for_submit().unwrap_err().is_precondition());
        assert!(order.total().is_none());

        order.set_total(&json!({ "amount": 2, "currency": "USD" })).unwrap();
        order.prepare_for_submit().unwrap();
        assert_eq!(order.total().unwrap().amount, Decimal::from(2));
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let mut order = OrderRequest::new(OrderOptions::new("PO-6")).unwrap();
        order.add_item(&item("A", json!("1e20"), json!("1e20"), "USD")).unwrap();

        let err = order.prepare_for_submit().unwrap_err();
        assert!(err.is_precondition());
        assert!(err.to_string().contains("line 1"), "{err}");
        assert!(order.total().is_none());

        let mut order = OrderRequest::new(OrderOptions::new("PO-7")).unwrap();
        order.add_item(&item("A", json!(1), json!("7e28"), "USD")).unwrap();
        order.add_item(&item("B", json!(1), json!("7e28"), "USD")).unwrap();
        let err = order.computed_total().unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn test_empty_order_total_is_zero() {
        let order = OrderRequest::new(OrderOptions::new("PO-5")).unwrap();
        let total = order.computed_total().unwrap();
        assert_eq!(total.amount, Decimal::ZERO);
        assert_eq!(total.currency, "");
    }

    #[test]
    fn test_billing_info_validation_does_not_apply_partial_state() {
        let mut order = OrderRequest::new(OrderOptions::new("PO-6")).unwrap();
        let err = order
            .set_billing_info(&json!({
                "address": { "company_name": "Acme" },
                "pcard": { "number": "4111", "expiration": "soon" },
            }))
            .unwrap_err();
        assert_eq!(err.field(), Some("expiration"));
        assert!(order.bill_to().is_none());
        assert!(order.purchasing_card().is_none());

        let err = order.set_billing_info(&json!({})).unwrap_err();
        assert_eq!(err.field(), Some("address"));
    }

    #[test]
    fn test_render_contains_items_and_total() {
        let mut order = OrderRequest::new(OrderOptions::new("PO-7").with_order_date("2026-02-01")).unwrap();
        order.add_item(&item("A", json!(2), json!(5), "USD")).unwrap();
        order.prepare_for_submit().unwrap();

        let xml = order.render(RenderOptions::default()).unwrap();
        assert!(xml.contains("orderID=\"PO-7\""));
        assert!(xml.contains("<Total><Money currency=\"USD\">10</Money></Total>"));
        assert!(xml.contains("<ItemOut quantity=\"2\" lineNumber=\"1\">"));
        assert!(xml.contains("<Classification domain=\"UNSPSC\">31162800</Classification>"));
        assert!(xml.contains("deploymentMode=\"production\""));
    }
}
