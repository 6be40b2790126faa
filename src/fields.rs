//! Declarative, fail-fast field validation for builder inputs.
//!
//! Every builder operation receives a JSON object and checks it against an
//! ordered rule table. The first violated rule is reported; nothing is
//! collected. Values are never mutated here.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::{CxmlError, Result};

/// What a field must satisfy besides being present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Present and not null
    Required,
    /// Present and coercible to a number (numeric strings pass)
    Numeric,
    /// Present and not an empty string
    NonBlank,
    /// A JSON object with at least one key
    NonEmptyMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn required(name: &'static str) -> FieldRule {
    FieldRule {
        name,
        kind: FieldKind::Required,
    }
}

const fn numeric(name: &'static str) -> FieldRule {
    FieldRule {
        name,
        kind: FieldKind::Numeric,
    }
}

const fn non_blank(name: &'static str) -> FieldRule {
    FieldRule {
        name,
        kind: FieldKind::NonBlank,
    }
}

const fn non_empty_map(name: &'static str) -> FieldRule {
    FieldRule {
        name,
        kind: FieldKind::NonEmptyMap,
    }
}

pub const ORDER_ITEM: &[FieldRule] = &[
    required("name"),
    numeric("quantity"),
    required("supplier_part_id"),
    numeric("unit_price"),
    non_blank("currency"),
    required("uom"),
    non_empty_map("classification"),
];

pub const INVOICE_ITEM: &[FieldRule] = &[
    required("part_description"),
    required("part_description_language"),
    required("part_id"),
    numeric("subtotal"),
    required("uom"),
    numeric("unit_price"),
    required("unit_price_currency"),
    numeric("gross_amt"),
    required("gross_amt_currency"),
    required("invoice_id"),
    numeric("net_amt"),
    required("net_amt_currency"),
    numeric("quantity"),
    numeric("tax_amt"),
    required("tax_currency"),
    required("tax_desc"),
    required("tax_desc_language"),
];

/// Shared by per-item taxes and the invoice-level tax summary
pub const TAX_DETAIL: &[FieldRule] = &[
    required("category"),
    required("invoice_id"),
    numeric("percent_rate"),
    required("purpose"),
    numeric("tax_amt"),
    required("tax_desc"),
    required("tax_desc_lang"),
    required("tax_location"),
    required("tax_location_lang"),
    numeric("taxable_amt"),
    required("taxable_currency"),
];

pub const DISTRIBUTION: &[FieldRule] = &[
    numeric("dist_amt"),
    required("dist_currency"),
    required("dist_name"),
    required("dist_seg1"),
    required("dist_seg1_desc"),
    required("dist_seg1_desclang"),
    required("dist_seg1_name"),
    required("dist_seg1_namelang"),
    required("dist_seg2"),
    required("dist_seg2_desc"),
    required("dist_seg2_desclang"),
    required("dist_seg2_name"),
    required("dist_seg2_namelang"),
];

pub const SUMMARY: &[FieldRule] = &[
    numeric("due_amt"),
    required("due_currency"),
    numeric("gross_amt"),
    required("gross_currency"),
    required("invoice_id"),
    numeric("net_amt"),
    required("net_currency"),
    required("shipping_currency"),
    numeric("shipping_amt"),
    numeric("sub_total_amt"),
    required("sub_total_currency"),
    required("tax_desc"),
    required("tax_desc_lang"),
];

pub const CONTACT: &[FieldRule] = &[
    required("role"),
    required("name"),
    required("language"),
    required("street"),
    required("city"),
    required("state"),
    required("country"),
];

pub const HEADER: &[FieldRule] = &[required("to"), required("from"), required("sender")];

pub const CREDENTIAL: &[FieldRule] = &[required("domain"), required("identity")];

pub const SENDER: &[FieldRule] = &[
    required("domain"),
    required("identity"),
    required("shared_secret"),
    required("user_agent"),
];

pub const REQUEST_HEADER: &[FieldRule] = &[
    required("invoice_date"),
    required("invoice_id"),
    required("operation"),
    required("purpose"),
];

/// Order total and bill-to tax
pub const MONEY: &[FieldRule] = &[numeric("amount"), non_blank("currency")];

pub const SHIPPING_METHOD: &[FieldRule] = &[numeric("amount")];

pub const BILL_TO_ADDRESS: &[FieldRule] = &[non_blank("company_name")];

pub const SHIP_TO_ADDRESS: &[FieldRule] = &[non_blank("company_name"), non_blank("attention_of")];

pub const EMAIL: &[FieldRule] = &[non_blank("address")];

pub const PHONE: &[FieldRule] = &[
    non_blank("country_code"),
    non_blank("area_or_city_code"),
    non_blank("number"),
];

pub const PCARD: &[FieldRule] = &[non_blank("number"), non_blank("expiration")];

/// Check `value` against `rules`, reporting the first violation.
pub fn validate(entity: &'static str, value: &Value, rules: &[FieldRule]) -> Result<()> {
    let object = value.as_object();

    for rule in rules {
        let field = object.and_then(|map| map.get(rule.name));
        check_rule(entity, rule, field)?;
    }

    Ok(())
}

fn check_rule(entity: &'static str, rule: &FieldRule, field: Option<&Value>) -> Result<()> {
    let present = field.filter(|v| !v.is_null());

    match rule.kind {
        FieldKind::Required => {
            if present.is_none() {
                return Err(CxmlError::validation(entity, rule.name, "is required"));
            }
        }
        FieldKind::Numeric => {
            if present.and_then(coerce_number).is_none() {
                let reason = if present.is_some_and(is_finite_number) {
                    "is outside the supported amount range (about ±7.9e28)"
                } else {
                    "is required and must be numeric"
                };
                return Err(CxmlError::validation(entity, rule.name, reason));
            }
        }
        FieldKind::NonBlank => {
            if !present.is_some_and(is_truthy) {
                return Err(CxmlError::validation(
                    entity,
                    rule.name,
                    "is required and must not be blank",
                ));
            }
        }
        FieldKind::NonEmptyMap => {
            if !present
                .and_then(Value::as_object)
                .is_some_and(|map| !map.is_empty())
            {
                return Err(CxmlError::validation(
                    entity,
                    rule.name,
                    "is required and must be a non-empty object",
                ));
            }
        }
    }

    Ok(())
}

/// A present value that is not an empty string, zero or `false`
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerce a JSON number or numeric string to a decimal.
///
/// Strings are trimmed first. Blank strings, booleans and containers do not
/// coerce.
pub fn coerce_number(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

/// A JSON number or numeric string that parses as a finite float, whatever
/// its magnitude
fn is_finite_number(value: &Value) -> bool {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.is_some_and(f64::is_finite)
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }

    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Render a present scalar as text, the way it lands in the wire format.
pub fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Read a field that validation already proved present.
pub(crate) fn text_field(object: &Map<String, Value>, name: &str) -> String {
    object.get(name).map(text).unwrap_or_default()
}

/// Read an optional scalar field; null and absent are both `None`.
pub(crate) fn optional_text(object: &Map<String, Value>, name: &str) -> Option<String> {
    object
        .get(name)
        .filter(|v| !v.is_null())
        .map(text)
        .filter(|s| !s.is_empty())
}

/// Read a numeric field that validation already proved coercible.
pub(crate) fn number_field(object: &Map<String, Value>, name: &str) -> Decimal {
    object
        .get(name)
        .and_then(coerce_number)
        .unwrap_or_default()
}

/// Borrow the object behind a validated value.
pub(crate) fn as_object<'a>(
    entity: &'static str,
    value: &'a Value,
) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        CxmlError::validation(entity, "<root>", "must be an object")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_missing_field_is_reported() {
        let item = json!({
            "name": "Widget",
            "quantity": 2,
            "unit_price": 5,
        });

        let err = validate("order item", &item, ORDER_ITEM).unwrap_err();
        assert_eq!(err.field(), Some("supplier_part_id"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let contact = json!({ "role": null });
        let err = validate("contact", &contact, CONTACT).unwrap_err();
        assert_eq!(err.field(), Some("role"));
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        assert_eq!(coerce_number(&json!("5")), Some(Decimal::from(5)));
        assert_eq!(coerce_number(&json!(" 2.50 ")), Some(Decimal::new(250, 2)));
        assert_eq!(coerce_number(&json!("1e3")), Some(Decimal::from(1000)));
        assert_eq!(coerce_number(&json!(7)), Some(Decimal::from(7)));
    }

    #[test]
    fn test_non_numeric_values_are_rejected() {
        assert_eq!(coerce_number(&json!("five")), None);
        assert_eq!(coerce_number(&json!("")), None);
        assert_eq!(coerce_number(&json!("   ")), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_number(&json!([1])), None);

        let total = json!({ "amount": "abc", "currency": "USD" });
        let err = validate("total", &total, MONEY).unwrap_err();
        assert_eq!(err.field(), Some("amount"));
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn test_huge_numbers_report_range() {
        for quantity in [json!(1e30), json!("1e30"), json!("-1e40")] {
            let item = json!({
                "name": "Widget",
                "quantity": quantity,
                "supplier_part_id": "W-1",
                "unit_price": "1",
                "currency": "USD",
                "uom": "EA",
                "classification": { "UNSPSC": "31162800" },
            });
            let err = validate("order item", &item, ORDER_ITEM).unwrap_err();
            assert_eq!(err.field(), Some("quantity"));
            assert!(err.to_string().contains("range"), "{err}");
        }

        let total = json!({ "amount": "inf", "currency": "USD" });
        let err = validate("total", &total, MONEY).unwrap_err();
        assert!(err.to_string().contains("must be numeric"));

        let total = json!({ "amount": true, "currency": "USD" });
        let err = validate("total", &total, MONEY).unwrap_err();
        assert!(err.to_string().contains("must be numeric"));
    }

    #[test]
    fn test_non_blank_rejects_empty_string() {
        let total = json!({ "amount": 10, "currency": "" });
        let err = validate("total", &total, MONEY).unwrap_err();
        assert_eq!(err.field(), Some("currency"));
    }

    #[test]
    fn test_required_accepts_empty_string() {
        let credential = json!({ "domain": "", "identity": "" });
        assert!(validate("credential", &credential, CREDENTIAL).is_ok());
    }

    #[test]
    fn test_classification_must_be_non_empty_object() {
        let mut item = json!({
            "name": "Widget",
            "quantity": 1,
            "supplier_part_id": "W-1",
            "unit_price": "3.00",
            "currency": "USD",
            "uom": "EA",
            "classification": {},
        });
        let err = validate("order item", &item, ORDER_ITEM).unwrap_err();
        assert_eq!(err.field(), Some("classification"));

        item["classification"] = json!("UNSPSC");
        assert!(validate("order item", &item, ORDER_ITEM).is_err());

        item["classification"] = json!({ "UNSPSC": "31162800" });
        assert!(validate("order item", &item, ORDER_ITEM).is_ok());
    }

    #[test]
    fn test_non_object_fails_on_first_rule() {
        let err = validate("summary", &json!([1, 2, 3]), SUMMARY).unwrap_err();
        assert_eq!(err.field(), Some("due_amt"));
    }

    #[test]
    fn test_every_rule_table_reports_each_omitted_field() {
        let tables: &[(&str, &[FieldRule])] = &[
            ("order item", ORDER_ITEM),
            ("invoice item", INVOICE_ITEM),
            ("tax", TAX_DETAIL),
            ("distribution", DISTRIBUTION),
            ("summary", SUMMARY),
            ("contact", CONTACT),
            ("request header", REQUEST_HEADER),
            ("header", HEADER),
            ("credential", CREDENTIAL),
            ("sender", SENDER),
            ("total", MONEY),
            ("shipping method", SHIPPING_METHOD),
            ("bill-to address", BILL_TO_ADDRESS),
            ("ship-to address", SHIP_TO_ADDRESS),
            ("e-mail", EMAIL),
            ("phone", PHONE),
            ("purchasing card", PCARD),
        ];

        for (entity, rules) in tables {
            let complete: Map<String, Value> = rules
                .iter()
                .map(|rule| {
                    let value = match rule.kind {
                        FieldKind::NonEmptyMap => json!({ "UNSPSC": "1" }),
                        _ => json!("1"),
                    };
                    (rule.name.to_string(), value)
                })
                .collect();
            assert!(validate(entity, &Value::Object(complete.clone()), rules).is_ok());

            for rule in rules.iter() {
                let mut partial = complete.clone();
                partial.remove(rule.name);
                let err = validate(entity, &Value::Object(partial), rules).unwrap_err();
                assert_eq!(err.field(), Some(rule.name), "{entity}");
            }
        }
    }

    #[test]
    fn test_text_renders_numbers() {
        assert_eq!(text(&json!(12)), "12");
        assert_eq!(text(&json!("abc")), "abc");
        assert_eq!(text(&json!(true)), "true");
    }
}
