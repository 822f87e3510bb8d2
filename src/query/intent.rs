//! Question classification and slot extraction.
//!
//! The rules mirror the phrasing the assistant's users actually type
//! ("add all closing balance", "show all rows of 2023", "closing balance
//! of ABC Suppliers"). Anything that matches no rule is handed to the
//! language model fallback.

use chrono::NaiveDate;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceColumn {
    Opening,
    Closing,
}

impl BalanceColumn {
    pub fn column_name(self) -> &'static str {
        match self {
            BalanceColumn::Opening => "opening_balance",
            BalanceColumn::Closing => "closing_balance",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BalanceColumn::Opening => "opening balance",
            BalanceColumn::Closing => "closing balance",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Sum {
        column: BalanceColumn,
        year: Option<i32>,
    },
    ListNames {
        column: BalanceColumn,
        year: Option<i32>,
    },
    ListAll {
        year: Option<i32>,
    },
    NameSearch {
        name: String,
        column: Option<BalanceColumn>,
        year: Option<i32>,
    },
    DateRows {
        date: NaiveDate,
    },
    YearRows {
        year: i32,
    },
    Extreme {
        largest: bool,
        column: BalanceColumn,
        year: Option<i32>,
    },
    Fallback,
}

/// Classify a question. The rule order matters: sums before listings,
/// listings before name search, explicit dates before year listings.
pub fn classify(question: &str) -> Intent {
    let q = question.to_lowercase();
    let year = extract_year(&q);

    if q.contains("add all") || q.contains("sum of") {
        return Intent::Sum {
            column: balance_column(&q).unwrap_or(BalanceColumn::Closing),
            year,
        };
    }

    if q.contains("show all ledger name") && balance_column(&q).is_some() {
        return Intent::ListNames {
            column: balance_column(&q).unwrap_or(BalanceColumn::Closing),
            year,
        };
    }

    if (q.contains("show all") || q.contains("list all") || q.contains("display all"))
        && q.contains("ledger")
    {
        return Intent::ListAll { year };
    }

    if q.contains("ledger") {
        if let Some(name) = extract_explicit_name(&q) {
            return Intent::NameSearch {
                name,
                column: explicit_balance_column(&q),
                year,
            };
        }
    }

    if let Some(date) = extract_date(&q) {
        return Intent::DateRows { date };
    }

    if let Some(year) = year {
        if q.contains("show all") {
            return Intent::YearRows { year };
        }
    }

    if q.contains("largest") || q.contains("highest") || q.contains("max") {
        return Intent::Extreme {
            largest: true,
            column: balance_column(&q).unwrap_or(BalanceColumn::Closing),
            year,
        };
    }

    if q.contains("smallest") || q.contains("lowest") || q.contains("min") {
        return Intent::Extreme {
            largest: false,
            column: balance_column(&q).unwrap_or(BalanceColumn::Closing),
            year,
        };
    }

    // Loose extraction runs last so aggregate words are not mistaken for
    // a ledger name.
    if q.contains("ledger") {
        if let Some(name) = extract_loose_name(&q) {
            return Intent::NameSearch {
                name,
                column: explicit_balance_column(&q),
                year,
            };
        }
    }

    Intent::Fallback
}

/// Tax and duty heads are excluded from largest/smallest questions, since
/// GST collection ledgers would otherwise always win.
pub fn is_tax_ledger(ledger_name: &str) -> bool {
    const TAX_KEYWORDS: &[&str] = &["gst", "igst", "cgst", "sgst", "tax", "tds", "vat", "cess"];
    let name = ledger_name.to_lowercase();
    TAX_KEYWORDS.iter().any(|kw| name.contains(kw))
}

pub fn extract_year(q: &str) -> Option<i32> {
    let re = Regex::new(r"\b(20\d{2})\b").unwrap();
    re.captures(q)?.get(1)?.as_str().parse().ok()
}

pub fn extract_date(q: &str) -> Option<NaiveDate> {
    let re = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
    let raw = re.find(q)?.as_str();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn balance_column(q: &str) -> Option<BalanceColumn> {
    if q.contains("opening") {
        Some(BalanceColumn::Opening)
    } else if q.contains("closing") {
        Some(BalanceColumn::Closing)
    } else {
        None
    }
}

/// Only an explicit "... balance" phrase restricts search output columns.
fn explicit_balance_column(q: &str) -> Option<BalanceColumn> {
    if q.contains("opening balance") {
        Some(BalanceColumn::Opening)
    } else if q.contains("closing balance") {
        Some(BalanceColumn::Closing)
    } else {
        None
    }
}

/// Pull a ledger name out of a question written with an explicit marker:
/// quoted or `name = value` forms, or an "of <name>" phrase.
pub fn extract_explicit_name(q: &str) -> Option<String> {
    let q = q.trim();

    let patterns = [
        r#"ledger\s+name\s*[=:]\s*["']([^"']+)["']"#,
        r"ledger\s+name\s*[=:]\s*([^,]+)",
        r#"ledger\s*[=:]\s*["']([^"']+)["']"#,
        r"ledger\s*[=:]\s*([^,]+)",
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).unwrap();
        if let Some(caps) = re.captures(q) {
            let name = caps[1].trim().to_string();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }

    let of_re = Regex::new(r"\bof\s+(.+?)(?:\s+of\s+\d{4}|\s+\d{4}|$)").unwrap();
    if let Some(caps) = of_re.captures(q) {
        let name = caps[1].trim().to_string();
        if !name.is_empty() && name != "ledger" {
            return Some(name);
        }
    }

    None
}

/// Last-resort extraction: strip query vocabulary and treat the rest as a
/// name. Returns `None` when nothing meaningful is left.
pub fn extract_loose_name(q: &str) -> Option<String> {
    const QUERY_WORDS: &[&str] = &[
        "show", "all", "rows", "ledger", "ledgers", "name", "names", "data", "of", "for",
        "with", "balance", "balances", "closing", "opening", "the", "what", "is", "me", "my",
        "account", "accounts",
    ];
    let year_re = Regex::new(r"^\d{4}$").unwrap();
    let kept: Vec<&str> = q
        .split_whitespace()
        .filter(|w| !year_re.is_match(w))
        .filter(|w| !QUERY_WORDS.contains(w))
        .filter(|w| *w != "=" && *w != ":")
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(" "))
    }
}
