//! Parsing of Tally XML export responses.
//!
//! Tally's XML is not always pristine (stray whitespace, display-formatted
//! numbers, optional attributes), so parsing is deliberately tolerant:
//! unescape failures fall back to the raw text, unparsable balances become
//! 0.0 and unparsable dates become `None`.

use crate::domain::model::{Company, Ledger};
use crate::utils::error::Result;
use chrono::NaiveDate;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use std::collections::HashMap;

const LEDGER_FIELDS: &[&str] = &[
    "PARENT",
    "ADDRESS",
    "STATE",
    "COUNTRY",
    "PINCODE",
    "EMAIL",
    "PHONE",
    "MOBILE",
    "GSTIN",
    "OPENINGBALANCE",
    "CLOSINGBALANCE",
    "ALTEREDON",
];

/// Extract company names from a `Company Collection` export.
pub fn parse_companies(xml: &str) -> Result<Vec<Company>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    // Self-closing tags like <COMPANY NAME="..."/> must surface as Start.
    reader.config_mut().expand_empty_elements = true;

    let mut companies = Vec::new();
    let mut in_company = false;
    let mut in_name = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = tag_name(&e);
                if tag == "COMPANY" {
                    in_company = true;
                    if let Some(name) = name_attribute(&e) {
                        if !name.is_empty() {
                            companies.push(Company { name });
                        }
                    }
                } else if in_company && tag == "NAME" {
                    in_name = true;
                }
            }
            Event::Text(t) if in_name => {
                let name = text_content(&t);
                if !name.is_empty() {
                    companies.push(Company { name });
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"COMPANY" => in_company = false,
                b"NAME" => in_name = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    companies.dedup_by(|a, b| a.name == b.name);
    Ok(companies)
}

/// Extract ledgers from a `Ledger Details` export. Nameless entries are
/// skipped; everything else is kept even when fields are missing.
pub fn parse_ledgers(xml: &str) -> Result<Vec<Ledger>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader.config_mut().expand_empty_elements = true;

    let mut ledgers = Vec::new();
    let mut current: Option<LedgerBuilder> = None;
    let mut field: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = tag_name(&e);
                if tag == "LEDGER" {
                    current = Some(LedgerBuilder::new(name_attribute(&e).unwrap_or_default()));
                } else if current.is_some()
                    && (tag == "NAME" || LEDGER_FIELDS.contains(&tag.as_str()))
                {
                    field = Some(tag);
                }
            }
            Event::Text(t) => {
                if let (Some(builder), Some(tag)) = (current.as_mut(), field.as_deref()) {
                    builder.set(tag, text_content(&t));
                }
            }
            Event::End(e) => {
                let tag = e.local_name();
                if tag.as_ref() == b"LEDGER" {
                    if let Some(builder) = current.take() {
                        if let Some(ledger) = builder.build() {
                            ledgers.push(ledger);
                        }
                    }
                    field = None;
                } else if field.is_some() {
                    field = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ledgers)
}

/// Normalize a Tally balance string: strip currency symbol, thousands
/// separators and surrounding whitespace. Anything unparsable becomes 0.0.
pub fn parse_balance(raw: &str) -> f64 {
    let cleaned: String = raw
        .replace('₹', "")
        .replace(',', "")
        .trim()
        .to_string();
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Tally reports `ALTEREDON` as `YYYYMMDD`; older exports use `DD/MM/YY`.
pub fn parse_altered_on(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%y"))
        .ok()
}

struct LedgerBuilder {
    name: String,
    fields: HashMap<String, String>,
}

impl LedgerBuilder {
    fn new(name_attr: String) -> Self {
        Self {
            name: name_attr,
            fields: HashMap::new(),
        }
    }

    fn set(&mut self, tag: &str, value: String) {
        if tag == "NAME" {
            // The NAME attribute wins over the child element when both exist.
            if self.name.is_empty() {
                self.name = value;
            }
        } else {
            // Multi-line fields (addresses) arrive as repeated elements.
            self.fields
                .entry(tag.to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
    }

    fn take(&mut self, tag: &str) -> String {
        self.fields.remove(tag).unwrap_or_default()
    }

    fn build(mut self) -> Option<Ledger> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return None;
        }
        let opening_balance = parse_balance(&self.take("OPENINGBALANCE"));
        let closing_balance = parse_balance(&self.take("CLOSINGBALANCE"));
        let altered_on = parse_altered_on(&self.take("ALTEREDON"));
        Some(Ledger {
            name,
            parent: self.take("PARENT"),
            address: self.take("ADDRESS"),
            state: self.take("STATE"),
            country: self.take("COUNTRY"),
            pincode: self.take("PINCODE"),
            email: self.take("EMAIL"),
            phone: self.take("PHONE"),
            mobile: self.take("MOBILE"),
            gstin: self.take("GSTIN"),
            opening_balance,
            closing_balance,
            altered_on,
        })
    }
}

fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn text_content(t: &BytesText) -> String {
    t.unescape()
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(t.as_ref()).into_owned())
        .trim()
        .to_string()
}

fn name_attribute(e: &BytesStart) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.local_name().as_ref() == b"NAME" {
            attr.unescape_value().ok().map(|v| v.trim().to_string())
        } else {
            None
        }
    })
}
