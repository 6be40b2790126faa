use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use cxml_outbound::document::{Document, InvoiceOptions, InvoiceRequest, OrderOptions, OrderRequest};

pub fn header_json() -> Value {
    json!({
        "from": { "domain": "NetworkId", "identity": "AN-BUYER" },
        "to": { "domain": "DUNS", "identity": "123456789" },
        "sender": {
            "domain": "NetworkId",
            "identity": "AN-BUYER",
            "shared_secret": "s3cret",
            "user_agent": "Procurement 1.0",
        },
    })
}

pub fn order_item_json(part: &str, quantity: Value, price: Value, currency: &str) -> Value {
    json!({
        "name": format!("Part {part}"),
        "description": "Stainless widget",
        "language": "en",
        "quantity": quantity,
        "supplier_part_id": part,
        "unit_price": price,
        "currency": currency,
        "uom": "EA",
        "classification": { "UNSPSC": "31162800" },
    })
}

pub fn billing_json() -> Value {
    json!({
        "address": {
            "company_name": "Acme Corp",
            "street": ["1 Main St"],
            "city": "Springfield",
            "state": "IL",
            "postal_code": "62701",
            "country": "United States",
            "country_code": "US",
        },
        "email": { "nickname": "ap", "address": "ap@acme.example" },
    })
}

pub fn shipping_json() -> Value {
    json!({
        "address": {
            "company_name": "Acme Corp",
            "attention_of": "Receiving Dock",
            "street": "2 Dock Rd",
            "city": "Springfield",
            "country": "United States",
            "country_code": "US",
        },
        "method": { "amount": "7.50", "currency": "USD", "description": "Ground" },
    })
}

pub fn invoice_item_json(invoice_id: &str) -> Value {
    json!({
        "part_description": "Widget",
        "part_description_language": "en",
        "part_id": "W-1",
        "subtotal": "10.00",
        "uom": "EA",
        "unit_price": "5.00",
        "unit_price_currency": "USD",
        "gross_amt": "10.80",
        "gross_amt_currency": "USD",
        "invoice_id": invoice_id,
        "net_amt": "10.80",
        "net_amt_currency": "USD",
        "quantity": 2,
        "tax_amt": "0.80",
        "tax_currency": "USD",
        "tax_desc": "Sales tax",
        "tax_desc_language": "en",
    })
}

pub fn tax_json(invoice_id: &str) -> Value {
    json!({
        "category": "sales",
        "invoice_id": invoice_id,
        "percent_rate": 8,
        "purpose": "tax",
        "tax_amt": "0.80",
        "tax_desc": "State sales tax",
        "tax_desc_lang": "en",
        "tax_location": "IL",
        "tax_location_lang": "en",
        "taxable_amt": "10.00",
        "taxable_currency": "USD",
    })
}

pub fn distribution_json() -> Value {
    json!({
        "dist_amt": "10.80",
        "dist_currency": "USD",
        "dist_name": "Cost Center",
        "dist_seg1": "4000",
        "dist_seg1_desc": "Operations",
        "dist_seg1_desclang": "en",
        "dist_seg1_name": "CostCenter",
        "dist_seg1_namelang": "en",
        "dist_seg2": "6100",
        "dist_seg2_desc": "Supplies",
        "dist_seg2_desclang": "en",
        "dist_seg2_name": "GLAccount",
        "dist_seg2_namelang": "en",
    })
}

pub fn summary_json(invoice_id: &str) -> Value {
    json!({
        "invoice_id": invoice_id,
        "sub_total_amt": "10.00",
        "sub_total_currency": "USD",
        "shipping_amt": "0",
        "shipping_currency": "USD",
        "gross_amt": "10.80",
        "gross_currency": "USD",
        "net_amt": "10.80",
        "net_currency": "USD",
        "due_amt": "10.80",
        "due_currency": "USD",
        "tax_desc": "Sales tax",
        "tax_desc_lang": "en",
    })
}

pub fn request_header_json(invoice_id: &str) -> Value {
    json!({
        "invoice_date": "2026-03-01T00:00:00-06:00",
        "invoice_id": invoice_id,
        "operation": "new",
        "purpose": "standard",
        "is_tax_in_line": true,
        "is_accounting_in_line": true,
        "payload_id": "po-1@buyer.example",
        "pay_in_number_of_days": 30,
    })
}

pub fn contact_json(role: &str) -> Value {
    json!({
        "role": role,
        "name": "Acme Corp",
        "language": "en",
        "street": "1 Main St",
        "city": "Springfield",
        "state": "IL",
        "postal_code": "62701",
        "country": "United States",
        "country_code": "US",
    })
}

/// Order with a header and two USD lines totalling 13.00
pub fn sample_order(order_id: &str) -> OrderRequest {
    let mut order = OrderRequest::new(OrderOptions::new(order_id).with_order_date("2026-02-01"))
        .expect("order");
    order.set_header(&header_json()).expect("header");
    order
        .add_items(&[
            order_item_json("A-1", json!(2), json!("5.00"), "USD"),
            order_item_json("B-2", json!(1), json!(3), "USD"),
        ])
        .expect("items");
    order.set_billing_info(&billing_json()).expect("billing");
    order.set_shipping_info(&shipping_json()).expect("shipping");
    order
}

/// Invoice with every section populated
pub fn sample_invoice(payload_id: &str) -> InvoiceRequest {
    let mut invoice = InvoiceRequest::new(InvoiceOptions::new(payload_id)).expect("invoice");
    invoice.set_header(&header_json()).expect("header");
    invoice
        .set_request_header(&request_header_json("INV-1"))
        .expect("request header");
    invoice.add_contact(&contact_json("remitTo")).expect("contact");
    invoice.add_contact(&contact_json("shipTo")).expect("contact");
    invoice.add_contact(&contact_json("shipFrom")).expect("contact");
    invoice.add_item(&invoice_item_json("INV-1")).expect("item");
    invoice.add_item_tax(&tax_json("INV-1")).expect("item tax");
    invoice.add_distribution(&distribution_json()).expect("distribution");
    invoice.add_summary(&summary_json("INV-1")).expect("summary");
    invoice.add_summary_tax(&tax_json("INV-1")).expect("summary tax");
    invoice
}

/// JSON description of [`sample_order`] for the loader and the binary
pub fn order_description_json(order_id: &str) -> Value {
    json!({
        "type": "order",
        "options": { "order_id": order_id, "order_date": "2026-02-01", "payload_id": "po-1@buyer.example" },
        "header": header_json(),
        "items": [
            order_item_json("A-1", json!(2), json!("5.00"), "USD"),
            order_item_json("B-2", json!(1), json!(3), "USD"),
        ],
        "billing": billing_json(),
        "shipping": shipping_json(),
    })
}

pub fn invoice_description_json(payload_id: &str) -> Value {
    json!({
        "type": "invoice",
        "options": { "payload_id": payload_id, "timestamp": "2026-03-01T10:00:00-06:00" },
        "header": header_json(),
        "request_header": request_header_json("INV-1"),
        "contacts": [contact_json("remitTo"), contact_json("shipTo")],
        "items": [invoice_item_json("INV-1")],
        "item_taxes": [tax_json("INV-1")],
        "distributions": [distribution_json()],
        "summary": summary_json("INV-1"),
        "summary_tax": tax_json("INV-1"),
    })
}

pub fn write_description(dir: &Path, name: &str, description: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(description).expect("json"))
        .expect("write description");
    path
}

/// Checked-in DTD fixtures
pub fn fixture_dtd_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/dtds")
}

/// Temporary DTD directory holding one file
pub fn dtd_dir_with(file_name: &str, content: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join(file_name), content).expect("write dtd");
    dir
}
