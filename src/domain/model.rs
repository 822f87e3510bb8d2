use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A company registered in the connected Tally instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
}

/// A ledger as exported by Tally, before it is filtered for storage.
///
/// Balances arrive as display strings (possibly with currency symbols and
/// thousands separators); they are normalized to plain numbers at parse time.
/// `altered_on` stays optional here because Tally omits it for ledgers that
/// were never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub name: String,
    pub parent: String,
    pub address: String,
    pub state: String,
    pub country: String,
    pub pincode: String,
    pub email: String,
    pub phone: String,
    pub mobile: String,
    pub gstin: String,
    pub opening_balance: f64,
    pub closing_balance: f64,
    pub altered_on: Option<NaiveDate>,
}

impl Ledger {
    /// Convert to a storable row. Returns `None` when the ledger has no
    /// usable alteration date, since the incremental sync keys on that date.
    pub fn into_row(self) -> Option<LedgerRow> {
        let altered_on = self.altered_on?;
        Some(LedgerRow {
            ledger_name: self.name,
            parent: self.parent,
            opening_balance: self.opening_balance,
            closing_balance: self.closing_balance,
            altered_on,
        })
    }
}

/// One row of the `tally_ledger_data` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerRow {
    pub ledger_name: String,
    pub parent: String,
    pub opening_balance: f64,
    pub closing_balance: f64,
    pub altered_on: NaiveDate,
}

impl LedgerRow {
    pub fn year(&self) -> i32 {
        use chrono::Datelike;
        self.altered_on.year()
    }
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub skipped: usize,
    pub inserted: u64,
    pub watermark_before: Option<NaiveDate>,
}

/// A structured answer from the query engine. The web layer renders tables
/// as HTML, the CLI flattens everything to text.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Message(String),
    Table {
        title: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Suggestions {
        query: String,
        names: Vec<String>,
    },
}

impl Answer {
    pub fn to_text(&self) -> String {
        match self {
            Answer::Message(msg) => msg.clone(),
            Answer::Table {
                title,
                columns,
                rows,
            } => {
                let mut out = String::new();
                out.push_str(title);
                out.push('\n');
                out.push_str(&columns.join(" | "));
                out.push('\n');
                out.push_str(&"-".repeat(columns.join(" | ").len().max(8)));
                for row in rows {
                    out.push('\n');
                    out.push_str(&row.join(" | "));
                }
                out
            }
            Answer::Suggestions { query, names } => {
                let mut out = format!("No exact match found for '{}'", query);
                if !names.is_empty() {
                    out.push_str("\nDid you mean one of these?");
                    for name in names {
                        out.push_str(&format!("\n  - {}", name));
                    }
                }
                out
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the web chat history.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub answer: Answer,
    pub timestamp: NaiveDateTime,
}

/// Display formatting used everywhere a balance or count faces the user:
/// thousands separators, two decimals for non-integral values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9e15 {
        group_thousands(&format!("{}", value as i64))
    } else {
        let formatted = format!("{:.2}", value);
        let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));
        format!("{}.{}", group_thousands(int_part), frac_part)
    }
}

/// Like `format_number` but always with two decimals, the way ledger
/// reports print totals.
pub fn format_amount(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    format!("{}.{}", group_thousands(int_part), frac_part)
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}", sign, grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbers_like_reports() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(1234567.0), "1,234,567");
        assert_eq!(format_number(1234.5), "1,234.50");
        assert_eq!(format_number(-4500.25), "-4,500.25");
    }

    #[test]
    fn totals_always_carry_two_decimals() {
        assert_eq!(format_amount(2500.0), "2,500.00");
        assert_eq!(format_amount(102724.0), "102,724.00");
        assert_eq!(format_amount(-150.5), "-150.50");
    }

    #[test]
    fn ledger_without_date_is_not_storable() {
        let mut ledger = Ledger {
            name: "Cash".to_string(),
            parent: "Current Assets".to_string(),
            address: String::new(),
            state: String::new(),
            country: String::new(),
            pincode: String::new(),
            email: String::new(),
            phone: String::new(),
            mobile: String::new(),
            gstin: String::new(),
            opening_balance: 100.0,
            closing_balance: 250.0,
            altered_on: None,
        };
        assert!(ledger.clone().into_row().is_none());

        ledger.altered_on = NaiveDate::from_ymd_opt(2025, 4, 1);
        let row = ledger.into_row().unwrap();
        assert_eq!(row.ledger_name, "Cash");
        assert_eq!(row.year(), 2025);
    }

    #[test]
    fn answer_text_rendering() {
        let table = Answer::Table {
            title: "Ledger names with closing balance:".to_string(),
            columns: vec!["ledger_name".to_string(), "closing_balance".to_string()],
            rows: vec![vec!["Cash".to_string(), "250".to_string()]],
        };
        let text = table.to_text();
        assert!(text.contains("ledger_name | closing_balance"));
        assert!(text.contains("Cash | 250"));

        let suggestions = Answer::Suggestions {
            query: "abc".to_string(),
            names: vec!["ABC Suppliers".to_string()],
        };
        assert!(suggestions.to_text().contains("Did you mean"));
    }
}
