//! Natural-language question answering over synced ledger rows.
//!
//! Questions run through the rule engine first (`rule_answer`); only
//! unmatched questions are forwarded to the configured language model.

pub mod intent;

use crate::domain::model::{format_amount, format_number, Answer, LedgerRow};
use crate::domain::ports::AnswerModel;
use intent::{BalanceColumn, Intent};

const FULL_COLUMNS: &[&str] = &[
    "ledger_name",
    "parent",
    "opening_balance",
    "closing_balance",
    "altered_on",
];

const MAX_SUGGESTIONS: usize = 5;

pub struct QueryEngine {
    model: Option<Box<dyn AnswerModel>>,
}

impl QueryEngine {
    pub fn new(model: Option<Box<dyn AnswerModel>>) -> Self {
        Self { model }
    }

    pub async fn answer(&self, rows: &[LedgerRow], question: &str) -> Answer {
        if let Some(answer) = rule_answer(rows, question) {
            return answer;
        }

        match &self.model {
            Some(model) => {
                tracing::debug!("No rule matched, forwarding question to the model");
                match model.complete(&fallback_prompt(rows, question)).await {
                    Ok(text) => Answer::Message(text.trim().to_string()),
                    Err(e) => {
                        tracing::warn!("Model fallback failed: {}", e);
                        Answer::Message(format!(
                            "I could not answer that question ({}). Try phrasing it like: \
                             'show all ledger name with closing balance' or \
                             'closing balance of <ledger>'.",
                            e.user_friendly_message()
                        ))
                    }
                }
            }
            None => Answer::Message(
                "I don't have a rule for that question and the language model is disabled. \
                 Try: 'add all closing balance', 'show all rows of 2024', or \
                 'closing balance of <ledger>'."
                    .to_string(),
            ),
        }
    }
}

/// Evaluate the rule intents. `None` means the question needs the model.
pub fn rule_answer(rows: &[LedgerRow], question: &str) -> Option<Answer> {
    match intent::classify(question) {
        Intent::Sum { column, year } => Some(sum_answer(rows, column, year)),
        Intent::ListNames { column, year } => Some(list_names_answer(rows, column, year)),
        Intent::ListAll { year } => Some(list_all_answer(rows, year)),
        Intent::NameSearch { name, column, year } => {
            Some(name_search_answer(rows, &name, column, year))
        }
        Intent::DateRows { date } => Some(date_rows_answer(rows, date)),
        Intent::YearRows { year } => Some(year_rows_answer(rows, year)),
        Intent::Extreme {
            largest,
            column,
            year,
        } => extreme_answer(rows, largest, column, year),
        Intent::Fallback => None,
    }
}

fn sum_answer(rows: &[LedgerRow], column: BalanceColumn, year: Option<i32>) -> Answer {
    let total: f64 = rows
        .iter()
        .filter(|r| year.is_none_or(|y| r.year() == y))
        .map(|r| balance_of(r, column))
        .sum();
    let suffix = year.map(|y| format!(" for {}", y)).unwrap_or_default();
    Answer::Message(format!(
        "Total {}{}: {}",
        column.display_name(),
        suffix,
        format_amount(total)
    ))
}

fn list_names_answer(rows: &[LedgerRow], column: BalanceColumn, year: Option<i32>) -> Answer {
    let selected: Vec<&LedgerRow> = rows
        .iter()
        .filter(|r| year.is_none_or(|y| r.year() == y))
        .collect();
    let suffix = year.map(|y| format!(" for {}", y)).unwrap_or_default();
    Answer::Table {
        title: format!("Ledger names with {}{}:", column.display_name(), suffix),
        columns: vec!["ledger_name".to_string(), column.column_name().to_string()],
        rows: selected
            .iter()
            .map(|r| vec![r.ledger_name.clone(), format_number(balance_of(r, column))])
            .collect(),
    }
}

fn list_all_answer(rows: &[LedgerRow], year: Option<i32>) -> Answer {
    let selected: Vec<&LedgerRow> = rows
        .iter()
        .filter(|r| year.is_none_or(|y| r.year() == y))
        .collect();
    if selected.is_empty() {
        return Answer::Message("No ledger data synced yet. Run `tallybridge sync` first.".to_string());
    }
    let suffix = year.map(|y| format!(" for {}", y)).unwrap_or_default();
    full_table(format!("All ledgers{}:", suffix), &selected)
}

fn name_search_answer(
    rows: &[LedgerRow],
    name: &str,
    column: Option<BalanceColumn>,
    year: Option<i32>,
) -> Answer {
    let matches = exact_matches(rows, name);

    if matches.is_empty() {
        let lowered = name.to_lowercase();
        let mut names: Vec<String> = rows
            .iter()
            .filter(|r| r.ledger_name.to_lowercase().contains(&lowered))
            .map(|r| r.ledger_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names.truncate(MAX_SUGGESTIONS);

        if names.is_empty() {
            return Answer::Message(format!("No results found for '{}'", name));
        }
        return Answer::Suggestions {
            query: name.to_string(),
            names,
        };
    }

    let filtered: Vec<&LedgerRow> = matches
        .into_iter()
        .filter(|r| year.is_none_or(|y| r.year() == y))
        .collect();
    if filtered.is_empty() {
        // The ledger exists but has no rows in the requested year.
        return Answer::Message(format!(
            "No results found for '{}' in year {}",
            name,
            year.unwrap_or_default()
        ));
    }

    let year_info = year.map(|y| format!(" for {}", y)).unwrap_or_default();
    let title = format!(
        "{} results found for '{}'{}:",
        filtered.len(),
        name,
        year_info
    );

    match column {
        Some(col) => Answer::Table {
            title,
            columns: vec!["ledger_name".to_string(), col.column_name().to_string()],
            rows: filtered
                .iter()
                .map(|r| vec![r.ledger_name.clone(), format_number(balance_of(r, col))])
                .collect(),
        },
        None => full_table(title, &filtered),
    }
}

fn date_rows_answer(rows: &[LedgerRow], date: chrono::NaiveDate) -> Answer {
    let selected: Vec<&LedgerRow> = rows.iter().filter(|r| r.altered_on == date).collect();
    if selected.is_empty() {
        Answer::Message(format!("No entries found for date {}", date))
    } else {
        full_table(format!("Results for date {}:", date), &selected)
    }
}

fn year_rows_answer(rows: &[LedgerRow], year: i32) -> Answer {
    let selected: Vec<&LedgerRow> = rows.iter().filter(|r| r.year() == year).collect();
    if selected.is_empty() {
        Answer::Message(format!("No entries found for year {}", year))
    } else {
        full_table(format!("Results for year {}:", year), &selected)
    }
}

fn extreme_answer(
    rows: &[LedgerRow],
    largest: bool,
    column: BalanceColumn,
    year: Option<i32>,
) -> Option<Answer> {
    let candidates: Vec<&LedgerRow> = rows
        .iter()
        .filter(|r| !intent::is_tax_ledger(&r.ledger_name))
        .filter(|r| year.is_none_or(|y| r.year() == y))
        .collect();

    let target = candidates
        .iter()
        .map(|r| balance_of(r, column))
        .reduce(|a, b| if largest { a.max(b) } else { a.min(b) })?;

    let winners: Vec<&LedgerRow> = candidates
        .into_iter()
        .filter(|r| balance_of(r, column) == target)
        .collect();
    if winners.is_empty() {
        return None;
    }

    let direction = if largest { "highest" } else { "lowest" };
    Some(full_table(
        format!(
            "Ledger with {} {} (excluding tax accounts):",
            direction,
            column.display_name()
        ),
        &winners,
    ))
}

/// Exact name match, case-insensitive; a whitespace-normalized comparison
/// is tried when the strict one finds nothing.
fn exact_matches<'a>(rows: &'a [LedgerRow], name: &str) -> Vec<&'a LedgerRow> {
    let wanted = name.trim().to_lowercase();
    let strict: Vec<&LedgerRow> = rows
        .iter()
        .filter(|r| r.ledger_name.to_lowercase() == wanted)
        .collect();
    if !strict.is_empty() {
        return strict;
    }

    let normalized = normalize_spaces(&wanted);
    rows.iter()
        .filter(|r| normalize_spaces(&r.ledger_name.to_lowercase()) == normalized)
        .collect()
}

fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn balance_of(row: &LedgerRow, column: BalanceColumn) -> f64 {
    match column {
        BalanceColumn::Opening => row.opening_balance,
        BalanceColumn::Closing => row.closing_balance,
    }
}

fn full_table(title: String, rows: &[&LedgerRow]) -> Answer {
    Answer::Table {
        title,
        columns: FULL_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    r.ledger_name.clone(),
                    r.parent.clone(),
                    format_number(r.opening_balance),
                    format_number(r.closing_balance),
                    r.altered_on.format("%Y-%m-%d").to_string(),
                ]
            })
            .collect(),
    }
}

/// Prompt for the model fallback: the schema, a few aggregates and the
/// question. The model answers in prose; its output is never executed.
pub fn fallback_prompt(rows: &[LedgerRow], question: &str) -> String {
    let total_closing: f64 = rows.iter().map(|r| r.closing_balance).sum();
    let total_opening: f64 = rows.iter().map(|r| r.opening_balance).sum();
    let mut years: Vec<i32> = rows.iter().map(|r| r.year()).collect();
    years.sort_unstable();
    years.dedup();

    format!(
        "You are an assistant for accounting ledger data synced from Tally ERP.\n\
         The table `tally_ledger_data` has columns: {}.\n\
         It currently holds {} rows covering the years {:?}.\n\
         Total opening balance: {}. Total closing balance: {}.\n\
         \n\
         User question: \"{}\"\n\
         \n\
         Answer in plain prose, using only the information above. If the \
         question cannot be answered from it, say so and suggest a more \
         specific question about ledgers or balances.",
        FULL_COLUMNS.join(", "),
        rows.len(),
        years,
        format_number(total_opening),
        format_number(total_closing),
        question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(name: &str, parent: &str, opening: f64, closing: f64, ymd: (i32, u32, u32)) -> LedgerRow {
        LedgerRow {
            ledger_name: name.to_string(),
            parent: parent.to_string(),
            opening_balance: opening,
            closing_balance: closing,
            altered_on: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
        }
    }

    fn fixture() -> Vec<LedgerRow> {
        vec![
            row("ABC Suppliers", "Sundry Creditors", 1000.0, 2500.0, (2024, 5, 1)),
            row("Star  Traders", "Sundry Debtors", 300.0, 150.0, (2023, 8, 20)),
            row("Output CGST @ 9%", "Duties & Taxes", 0.0, 99999.0, (2024, 6, 30)),
            row("Cash", "Cash-in-Hand", 50.0, 75.0, (2024, 1, 15)),
        ]
    }

    #[test]
    fn sums_closing_balance_with_year_filter() {
        let rows = fixture();
        let all = rule_answer(&rows, "add all closing balance").unwrap();
        assert_eq!(all.to_text(), "Total closing balance: 102,724.00");

        let filtered = rule_answer(&rows, "sum of closing balance for 2023").unwrap();
        assert_eq!(filtered.to_text(), "Total closing balance for 2023: 150.00");
    }

    #[test]
    fn lists_names_with_balances() {
        let rows = fixture();
        match rule_answer(&rows, "show all ledger name with opening balance").unwrap() {
            Answer::Table { columns, rows, .. } => {
                assert_eq!(columns, vec!["ledger_name", "opening_balance"]);
                assert_eq!(rows.len(), 4);
                assert_eq!(rows[0], vec!["ABC Suppliers", "1,000"]);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn exact_name_search_normalizes_whitespace() {
        let rows = fixture();
        match rule_answer(&rows, "closing balance of ledger name = 'star traders'").unwrap() {
            Answer::Table { title, rows, .. } => {
                assert!(title.contains("1 results found"));
                assert_eq!(rows[0][0], "Star  Traders");
                assert_eq!(rows[0][1], "150");
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn missing_name_offers_suggestions() {
        let rows = fixture();
        match rule_answer(&rows, "show ledger name = 'abc'").unwrap() {
            Answer::Suggestions { query, names } => {
                assert_eq!(query, "abc");
                assert_eq!(names, vec!["ABC Suppliers"]);
            }
            other => panic!("expected suggestions, got {:?}", other),
        }
    }

    #[test]
    fn unknown_name_reports_no_results() {
        let rows = fixture();
        let answer = rule_answer(&rows, "show ledger name = 'zzz'").unwrap();
        assert_eq!(answer.to_text(), "No results found for 'zzz'");
    }

    #[test]
    fn date_and_year_listings() {
        let rows = fixture();
        let by_date = rule_answer(&rows, "entries for 2024-01-15").unwrap();
        match by_date {
            Answer::Table { rows, .. } => assert_eq!(rows[0][0], "Cash"),
            other => panic!("expected table, got {:?}", other),
        }

        let empty = rule_answer(&rows, "entries for 2019-01-01").unwrap();
        assert_eq!(empty.to_text(), "No entries found for date 2019-01-01");

        let by_year = rule_answer(&rows, "show all rows of 2023").unwrap();
        match by_year {
            Answer::Table { rows, .. } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0][0], "Star  Traders");
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn highest_excludes_tax_ledgers() {
        let rows = fixture();
        match rule_answer(&rows, "which ledger has the highest closing balance").unwrap() {
            Answer::Table { title, rows, .. } => {
                assert!(title.contains("highest closing balance"));
                assert_eq!(rows[0][0], "ABC Suppliers");
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn fallback_prompt_contains_schema_and_question() {
        let rows = fixture();
        let prompt = fallback_prompt(&rows, "how healthy are my books?");
        assert!(prompt.contains("tally_ledger_data"));
        assert!(prompt.contains("closing_balance"));
        assert!(prompt.contains("how healthy are my books?"));
    }
}
