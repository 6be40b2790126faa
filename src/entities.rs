//! Typed sub-entities of a document and the append-only list that holds them.
//!
//! Each entity is built from a JSON object only after that object passed its
//! rule table in [`crate::fields`]. Building copies every value, so callers keep
//! full ownership of what they passed in.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CxmlError, Result};
use crate::fields::{self, number_field, optional_text, text_field};

/// Ordered, insertion-preserving sequence with no removal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntityList<T> {
    entries: Vec<T>,
}

impl<T> EntityList<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    pub fn first(&self) -> Option<&T> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }
}

impl<T> Default for EntityList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a EntityList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    pub(crate) fn from_object(object: &Map<String, Value>) -> Self {
        Self::new(
            number_field(object, "amount"),
            text_field(object, "currency"),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub domain: String,
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderCredential {
    pub domain: String,
    pub identity: String,
    pub shared_secret: String,
    pub user_agent: String,
}

/// From/To/Sender block of the cXML envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub from: Credential,
    pub to: Credential,
    pub sender: SenderCredential,
}

impl Header {
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        fields::validate("header", value, fields::HEADER)?;
        let object = fields::as_object("header", value)?;

        let from = credential(object, "from")?;
        let to = credential(object, "to")?;

        let sender_value = &object["sender"];
        fields::validate("header sender", sender_value, fields::SENDER)?;
        let sender = fields::as_object("header sender", sender_value)?;

        Ok(Self {
            from,
            to,
            sender: SenderCredential {
                domain: text_field(sender, "domain"),
                identity: text_field(sender, "identity"),
                shared_secret: text_field(sender, "shared_secret"),
                user_agent: text_field(sender, "user_agent"),
            },
        })
    }
}

fn credential(object: &Map<String, Value>, key: &'static str) -> Result<Credential> {
    let entity = match key {
        "from" => "header from",
        _ => "header to",
    };
    let value = &object[key];
    fields::validate(entity, value, fields::CREDENTIAL)?;
    let inner = fields::as_object(entity, value)?;

    Ok(Credential {
        domain: text_field(inner, "domain"),
        identity: text_field(inner, "identity"),
    })
}

/// Line item of a purchase order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub line_number: usize,
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub quantity: Decimal,
    pub supplier_part_id: String,
    pub unit_price: Decimal,
    pub currency: String,
    pub uom: String,
    /// Classification domain → code, e.g. `UNSPSC` → `31162800`
    pub classification: BTreeMap<String, String>,
}

impl OrderItem {
    pub(crate) fn from_value(value: &Value, line_number: usize) -> Result<Self> {
        fields::validate("order item", value, fields::ORDER_ITEM)?;
        let object = fields::as_object("order item", value)?;

        let classification = object
            .get("classification")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(domain, code)| (domain.clone(), fields::text(code)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            line_number,
            name: text_field(object, "name"),
            description: optional_text(object, "description"),
            language: optional_text(object, "language"),
            quantity: number_field(object, "quantity"),
            supplier_part_id: text_field(object, "supplier_part_id"),
            unit_price: number_field(object, "unit_price"),
            currency: text_field(object, "currency"),
            uom: text_field(object, "uom"),
            classification,
        })
    }

    /// Quantity × unit price; `Precondition` when the product leaves the
    /// decimal range.
    pub fn extended_price(&self) -> Result<Decimal> {
        self.quantity.checked_mul(self.unit_price).ok_or_else(|| {
            CxmlError::Precondition(format!(
                "extended price of line {} ({} × {}) is out of range",
                self.line_number, self.quantity, self.unit_price
            ))
        })
    }
}

/// Line item of an invoice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceItem {
    pub invoice_line_number: usize,
    pub part_description: String,
    pub part_description_language: String,
    pub part_id: String,
    pub subtotal: Decimal,
    pub uom: String,
    pub unit_price: Money,
    pub gross: Money,
    pub invoice_id: String,
    pub net: Money,
    pub quantity: Decimal,
    pub tax: Money,
    pub tax_description: String,
    pub tax_description_language: String,
}

impl InvoiceItem {
    pub(crate) fn from_value(value: &Value, invoice_line_number: usize) -> Result<Self> {
        fields::validate("invoice item", value, fields::INVOICE_ITEM)?;
        let object = fields::as_object("invoice item", value)?;

        Ok(Self {
            invoice_line_number,
            part_description: text_field(object, "part_description"),
            part_description_language: text_field(object, "part_description_language"),
            part_id: text_field(object, "part_id"),
            subtotal: number_field(object, "subtotal"),
            uom: text_field(object, "uom"),
            unit_price: Money::new(
                number_field(object, "unit_price"),
                text_field(object, "unit_price_currency"),
            ),
            gross: Money::new(
                number_field(object, "gross_amt"),
                text_field(object, "gross_amt_currency"),
            ),
            invoice_id: text_field(object, "invoice_id"),
            net: Money::new(
                number_field(object, "net_amt"),
                text_field(object, "net_amt_currency"),
            ),
            quantity: number_field(object, "quantity"),
            tax: Money::new(
                number_field(object, "tax_amt"),
                text_field(object, "tax_currency"),
            ),
            tax_description: text_field(object, "tax_desc"),
            tax_description_language: text_field(object, "tax_desc_language"),
        })
    }
}

/// Tax detail attached to a line item or to the invoice summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxDetail {
    pub category: String,
    pub invoice_id: String,
    pub percent_rate: Decimal,
    pub purpose: String,
    pub tax_amount: Decimal,
    pub description: String,
    pub description_language: String,
    pub location: String,
    pub location_language: String,
    pub taxable: Money,
}

impl TaxDetail {
    pub(crate) fn from_value(entity: &'static str, value: &Value) -> Result<Self> {
        fields::validate(entity, value, fields::TAX_DETAIL)?;
        let object = fields::as_object(entity, value)?;

        Ok(Self {
            category: text_field(object, "category"),
            invoice_id: text_field(object, "invoice_id"),
            percent_rate: number_field(object, "percent_rate"),
            purpose: text_field(object, "purpose"),
            tax_amount: number_field(object, "tax_amt"),
            description: text_field(object, "tax_desc"),
            description_language: text_field(object, "tax_desc_lang"),
            location: text_field(object, "tax_location"),
            location_language: text_field(object, "tax_location_lang"),
            taxable: Money::new(
                number_field(object, "taxable_amt"),
                text_field(object, "taxable_currency"),
            ),
        })
    }

    /// Tax amount in the currency of the taxable amount
    pub fn tax_money(&self) -> Money {
        Money::new(self.tax_amount, self.taxable.currency.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountingSegment {
    pub id: String,
    pub name: String,
    pub name_language: String,
    pub description: String,
    pub description_language: String,
}

/// Cost allocation entry with two accounting segment levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub name: String,
    pub charge: Money,
    pub segments: [AccountingSegment; 2],
}

impl Distribution {
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        fields::validate("distribution", value, fields::DISTRIBUTION)?;
        let object = fields::as_object("distribution", value)?;

        let segment = |level: u8| {
            let key = |suffix: &str| format!("dist_seg{level}{suffix}");
            AccountingSegment {
                id: text_field(object, &key("")),
                name: text_field(object, &key("_name")),
                name_language: text_field(object, &key("_namelang")),
                description: text_field(object, &key("_desc")),
                description_language: text_field(object, &key("_desclang")),
            }
        };

        Ok(Self {
            name: text_field(object, "dist_name"),
            charge: Money::new(
                number_field(object, "dist_amt"),
                text_field(object, "dist_currency"),
            ),
            segments: [segment(1), segment(2)],
        })
    }
}

/// Invoice-level totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub invoice_id: String,
    pub sub_total: Money,
    pub shipping: Money,
    pub gross: Money,
    pub net: Money,
    pub due: Money,
    pub tax_description: String,
    pub tax_description_language: String,
}

impl Summary {
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        fields::validate("summary", value, fields::SUMMARY)?;
        let object = fields::as_object("summary", value)?;

        let money = |amount: &str, currency: &str| {
            Money::new(number_field(object, amount), text_field(object, currency))
        };

        Ok(Self {
            invoice_id: text_field(object, "invoice_id"),
            sub_total: money("sub_total_amt", "sub_total_currency"),
            shipping: money("shipping_amt", "shipping_currency"),
            gross: money("gross_amt", "gross_currency"),
            net: money("net_amt", "net_currency"),
            due: money("due_amt", "due_currency"),
            tax_description: text_field(object, "tax_desc"),
            tax_description_language: text_field(object, "tax_desc_lang"),
        })
    }
}

/// Where an invoice contact is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContactPlacement {
    Partner,
    Shipping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub role: String,
    pub name: String,
    pub language: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: Option<String>,
    pub country: String,
    pub country_code: Option<String>,
    pub email: Option<String>,
    pub address_id: Option<String>,
}

impl Contact {
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        fields::validate("contact", value, fields::CONTACT)?;
        let object = fields::as_object("contact", value)?;

        Ok(Self {
            role: text_field(object, "role"),
            name: text_field(object, "name"),
            language: text_field(object, "language"),
            street: text_field(object, "street"),
            city: text_field(object, "city"),
            state: text_field(object, "state"),
            postal_code: optional_text(object, "postal_code"),
            country: text_field(object, "country"),
            country_code: optional_text(object, "country_code"),
            email: optional_text(object, "email"),
            address_id: optional_text(object, "address_id"),
        })
    }

    pub fn placement(&self) -> ContactPlacement {
        match self.role.as_str() {
            "shipTo" | "shipFrom" => ContactPlacement::Shipping,
            _ => ContactPlacement::Partner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub nickname: String,
    pub address: String,
}

impl Email {
    pub(crate) fn from_value(entity: &'static str, value: &Value) -> Result<Self> {
        fields::validate(entity, value, fields::EMAIL)?;
        let object = fields::as_object(entity, value)?;

        Ok(Self {
            nickname: optional_text(object, "nickname").unwrap_or_else(|| "default".to_string()),
            address: text_field(object, "address"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phone {
    pub nickname: String,
    pub country_code: String,
    pub area_or_city_code: String,
    pub number: String,
    pub extension: Option<String>,
}

impl Phone {
    pub(crate) fn from_value(entity: &'static str, value: &Value) -> Result<Self> {
        fields::validate(entity, value, fields::PHONE)?;
        let object = fields::as_object(entity, value)?;

        Ok(Self {
            nickname: optional_text(object, "nickname").unwrap_or_else(|| "default".to_string()),
            country_code: text_field(object, "country_code"),
            area_or_city_code: text_field(object, "area_or_city_code"),
            number: text_field(object, "number"),
            extension: optional_text(object, "extension"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub company_name: String,
    pub nickname: String,
    pub address_id: Option<String>,
    /// Ship-to "attention of" lines; empty for bill-to
    pub attention: Vec<String>,
    pub street: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
}

impl Address {
    pub(crate) fn bill_to(value: &Value) -> Result<Self> {
        fields::validate("bill-to address", value, fields::BILL_TO_ADDRESS)?;
        let object = fields::as_object("bill-to address", value)?;
        Ok(Self::from_object(object, Vec::new()))
    }

    pub(crate) fn ship_to(value: &Value) -> Result<Self> {
        fields::validate("ship-to address", value, fields::SHIP_TO_ADDRESS)?;
        let object = fields::as_object("ship-to address", value)?;

        let attention = match &object["attention_of"] {
            Value::Array(lines) => {
                let lines: Vec<String> = lines.iter().map(fields::text).collect();
                if lines.concat().is_empty() {
                    return Err(CxmlError::validation(
                        "ship-to address",
                        "attention_of",
                        "is required and must not be blank",
                    ));
                }
                lines
            }
            other => vec![fields::text(other)],
        };

        Ok(Self::from_object(object, attention))
    }

    fn from_object(object: &Map<String, Value>, attention: Vec<String>) -> Self {
        let street = match object.get("street") {
            Some(Value::Array(lines)) => lines.iter().map(fields::text).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(line) => vec![fields::text(line)],
        };

        Self {
            company_name: text_field(object, "company_name"),
            nickname: optional_text(object, "nickname").unwrap_or_else(|| "default".to_string()),
            address_id: optional_text(object, "address_id"),
            attention,
            street,
            city: optional_text(object, "city"),
            state: optional_text(object, "state"),
            postal_code: optional_text(object, "postal_code"),
            country: optional_text(object, "country"),
            country_code: optional_text(object, "country_code"),
        }
    }
}

/// Purchasing card with its expiration normalized to the end of its month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchasingCard {
    pub number: String,
    /// `YYYY-MM-DD`, last day of the expiration month
    pub expiration: String,
    pub name: Option<String>,
}

impl PurchasingCard {
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        fields::validate("purchasing card", value, fields::PCARD)?;
        let object = fields::as_object("purchasing card", value)?;

        let raw = text_field(object, "expiration");
        let date = parse_iso_date(&raw).ok_or_else(|| {
            CxmlError::validation(
                "purchasing card",
                "expiration",
                format!("must be an ISO 8601 date, got {raw:?}"),
            )
        })?;

        Ok(Self {
            number: text_field(object, "number"),
            expiration: end_of_month(date).format("%Y-%m-%d").to_string(),
            name: optional_text(object, "name"),
        })
    }
}

/// Accepts `YYYY-MM`, `YYYY-MM-DD`, and date-times with or without an offset
pub(crate) fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
        return Some(date_time.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| chrono::NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|date_time| date_time.date())
}

pub(crate) fn end_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Shipping charge on an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingMethod {
    pub amount: Decimal,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
}

impl ShippingMethod {
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        fields::validate("ship-to method", value, fields::SHIPPING_METHOD)?;
        let object = fields::as_object("ship-to method", value)?;

        Ok(Self {
            amount: number_field(object, "amount"),
            currency: optional_text(object, "currency"),
            description: optional_text(object, "description"),
            language: optional_text(object, "language"),
        })
    }
}

/// Order-level tax charged on the bill-to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTax {
    pub money: Money,
    pub description: Option<String>,
    pub language: Option<String>,
}

impl OrderTax {
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        fields::validate("bill-to tax", value, fields::MONEY)?;
        let object = fields::as_object("bill-to tax", value)?;

        Ok(Self {
            money: Money::from_object(object),
            description: optional_text(object, "description"),
            language: optional_text(object, "language"),
        })
    }
}
