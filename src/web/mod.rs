//! Web chat interface over the synced ledger data.

use crate::config::toml_config::ServerConfig;
use crate::domain::model::{Answer, ChatMessage, ChatRole};
use crate::domain::ports::LedgerStore;
use crate::query::QueryEngine;
use crate::utils::error::{BridgeError, Result};
use crate::utils::validation;
use axum::extract::{Form, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn LedgerStore>,
    engine: Arc<QueryEngine>,
    history: Arc<RwLock<Vec<ChatMessage>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, engine: QueryEngine) -> Self {
        Self {
            store,
            engine: Arc::new(engine),
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    query: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/query", post(process_query))
        .route("/clear", post(clear_chat))
        .with_state(state)
}

/// Run the web app, with TLS when a certificate pair is configured.
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| BridgeError::ConfigError {
            message: format!("invalid server address: {}", e),
        })?;

    match config.tls_paths() {
        Some((cert, key)) => {
            validation::validate_file_exists("server.tls_cert", cert)?;
            validation::validate_file_exists("server.tls_key", key)?;
            let tls = RustlsConfig::from_pem_file(cert, key).await?;
            tracing::info!("Serving HTTPS on https://{}", addr);
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!("Serving HTTP on http://{}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}

async fn home(State(state): State<AppState>) -> Html<String> {
    let history = state.history.read().await;
    Html(render_page(&history))
}

async fn process_query(
    State(state): State<AppState>,
    Form(form): Form<QueryForm>,
) -> Html<String> {
    let question = form.query.trim().to_string();
    if question.is_empty() {
        let history = state.history.read().await;
        return Html(render_page(&history));
    }

    let started = std::time::Instant::now();
    let answer = match state.store.fetch_all().await {
        Ok(rows) => state.engine.answer(&rows, &question).await,
        Err(e) => {
            tracing::error!("Failed to load ledger rows: {}", e);
            Answer::Message(format!("Error: {}", e.user_friendly_message()))
        }
    };

    tracing::info!(
        question = %question,
        answer = %log_summary(&answer),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Query answered"
    );

    let now = chrono::Local::now().naive_local();
    let mut history = state.history.write().await;
    history.push(ChatMessage {
        role: ChatRole::User,
        answer: Answer::Message(question),
        timestamp: now,
    });
    history.push(ChatMessage {
        role: ChatRole::Assistant,
        answer,
        timestamp: chrono::Local::now().naive_local(),
    });
    Html(render_page(&history))
}

async fn clear_chat(State(state): State<AppState>) -> Html<String> {
    state.history.write().await.clear();
    let history = state.history.read().await;
    Html(render_page(&history))
}

const PAGE_TOP: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>tallybridge - Ledger Assistant</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box;
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; }
        body { background: #1a2a6c; min-height: 100vh; padding: 20px;
               display: flex; justify-content: center; align-items: center; color: #333; }
        .container { width: 90%; max-width: 1100px; background: #fff;
                     border-radius: 16px; overflow: hidden;
                     box-shadow: 0 15px 35px rgba(0,0,0,0.3); }
        header { background: linear-gradient(90deg, #1a2980, #26d0ce); color: #fff;
                 padding: 22px 28px; text-align: center; }
        header h1 { font-size: 2rem; margin-bottom: 8px; }
        .content { padding: 24px; }
        .chat-container { background: #f8f9fa; border-radius: 12px; padding: 20px;
                          margin-bottom: 20px; max-height: 60vh; overflow-y: auto;
                          min-height: 260px; }
        .chat-bubble { padding: 12px 16px; border-radius: 14px; margin-bottom: 12px;
                       max-width: 85%; }
        .user-bubble { background: #e3f2fd; margin-left: auto; }
        .assistant-bubble { background: #fff; border: 1px solid #e0e0e0; margin-right: auto; }
        .timestamp { font-size: 0.8rem; color: #777; text-align: right; margin-top: 4px; }
        .query-form { display: flex; gap: 12px; }
        #query-input { flex: 1; padding: 14px 18px; border: 2px solid #26d0ce;
                       border-radius: 40px; font-size: 1rem; outline: none; }
        #submit-btn, #clear-btn { color: #fff; border: none; border-radius: 40px;
                                  padding: 0 26px; font-size: 1rem; cursor: pointer; }
        #submit-btn { background: linear-gradient(90deg, #1a2980, #26d0ce); }
        #clear-btn { background: linear-gradient(90deg, #ff416c, #ff4b2b); }
        .styled-table { width: 100%; border-collapse: collapse; margin: 12px 0;
                        font-size: 0.92em; }
        .styled-table thead tr { background: linear-gradient(90deg, #1a2980, #26d0ce);
                                 color: #fff; text-align: left; }
        .styled-table th, .styled-table td { padding: 10px 14px; }
        .styled-table tbody tr { border-bottom: 1px solid #e0e0e0; }
        .styled-table tbody tr:nth-of-type(even) { background-color: #f8f9fa; }
        .empty-chat { text-align: center; color: #999; padding: 48px 16px; font-style: italic; }
        footer { text-align: center; padding: 16px; color: #777; font-size: 0.85rem;
                 border-top: 1px solid #e0e0e0; background: #f8f9fa; }
    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1>tallybridge</h1>
            <p>Ask anything about your synced ledger data</p>
        </header>
        <div class="content">
            <div class="chat-container" id="chat-container">
"#;

const PAGE_BOTTOM: &str = r#"            </div>
            <form method="POST" class="query-form">
                <input type="text" name="query" id="query-input"
                       placeholder="Ask your question about ledger data..."
                       autocomplete="off" autofocus>
                <input type="submit" id="submit-btn" value="Ask" formaction="/query">
                <input type="submit" id="clear-btn" value="Clear Chat" formaction="/clear">
            </form>
        </div>
        <footer>tallybridge &bull; Tally ERP &rarr; PostgreSQL &rarr; you</footer>
    </div>
    <script>
        const chat = document.getElementById('chat-container');
        chat.scrollTop = chat.scrollHeight;
        document.getElementById('query-input').focus();
    </script>
</body>
</html>
"#;

const EMPTY_CHAT: &str = r#"<div class="empty-chat">
    <p>Start chatting with your ledger assistant</p>
    <p>Ask questions like:</p>
    <p>"show all ledgers with balances"</p>
    <p>"What is the closing balance of ledger name = 'ABC Suppliers'?"</p>
    <p>"sum of closing balance for 2024"</p>
</div>"#;

pub fn render_page(history: &[ChatMessage]) -> String {
    let mut page = String::with_capacity(PAGE_TOP.len() + PAGE_BOTTOM.len() + 1024);
    page.push_str(PAGE_TOP);
    if history.is_empty() {
        page.push_str(EMPTY_CHAT);
    } else {
        for message in history {
            let class = match message.role {
                ChatRole::User => "user-bubble",
                ChatRole::Assistant => "assistant-bubble",
            };
            page.push_str(&format!(
                "<div class=\"chat-bubble {}\"><div>{}</div>\
                 <div class=\"timestamp\">{}</div></div>\n",
                class,
                answer_html(&message.answer),
                message.timestamp.format("%H:%M:%S")
            ));
        }
    }
    page.push_str(PAGE_BOTTOM);
    page
}

/// Render an answer as HTML. All data-derived strings are escaped; only the
/// markup produced here is trusted.
pub fn answer_html(answer: &Answer) -> String {
    match answer {
        Answer::Message(msg) => escape_html(msg).replace('\n', "<br>"),
        Answer::Table {
            title,
            columns,
            rows,
        } => {
            let mut html = format!("{}<table class=\"styled-table\"><thead><tr>", escape_html(title));
            for column in columns {
                html.push_str(&format!("<th>{}</th>", escape_html(column)));
            }
            html.push_str("</tr></thead><tbody>");
            for row in rows {
                html.push_str("<tr>");
                for cell in row {
                    html.push_str(&format!("<td>{}</td>", escape_html(cell)));
                }
                html.push_str("</tr>");
            }
            html.push_str("</tbody></table>");
            html
        }
        Answer::Suggestions { query, names } => {
            let mut html = format!("No exact match found for '{}'", escape_html(query));
            if !names.is_empty() {
                html.push_str("<br>Did you mean one of these?<ul>");
                for name in names {
                    html.push_str(&format!("<li>{}</li>", escape_html(name)));
                }
                html.push_str("</ul>");
            }
            html
        }
    }
}

/// Single-line form of an answer for the query log. Table answers can be
/// large, so the text is capped.
fn log_summary(answer: &Answer) -> String {
    const MAX_LOG_CHARS: usize = 200;
    let text = answer.to_text().replace('\n', " | ");
    if text.chars().count() > MAX_LOG_CHARS {
        let cut: String = text.chars().take(MAX_LOG_CHARS).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn empty_history_shows_examples() {
        let page = render_page(&[]);
        assert!(page.contains("Start chatting"));
        assert!(page.contains("show all ledgers with balances"));
    }

    #[test]
    fn answers_are_escaped() {
        let html = answer_html(&Answer::Message("<script>alert(1)</script>".to_string()));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn tables_render_with_styled_class() {
        let html = answer_html(&Answer::Table {
            title: "Results:".to_string(),
            columns: vec!["ledger_name".to_string()],
            rows: vec![vec!["A & B Traders".to_string()]],
        });
        assert!(html.contains("styled-table"));
        assert!(html.contains("A &amp; B Traders"));
    }

    #[test]
    fn log_summary_is_single_line_and_capped() {
        let short = log_summary(&Answer::Message("Total closing balance: 2,500.00".to_string()));
        assert_eq!(short, "Total closing balance: 2,500.00");

        let table = Answer::Table {
            title: "All ledgers:".to_string(),
            columns: vec!["ledger_name".to_string()],
            rows: (0..100).map(|i| vec![format!("Ledger {}", i)]).collect(),
        };
        let summary = log_summary(&table);
        assert!(!summary.contains('\n'));
        assert!(summary.contains("All ledgers: | ledger_name"));
        assert!(summary.ends_with("..."));
        assert!(summary.chars().count() <= 203);
    }

    #[test]
    fn history_renders_both_roles() {
        let ts = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let history = vec![
            ChatMessage {
                role: ChatRole::User,
                answer: Answer::Message("hello".to_string()),
                timestamp: ts,
            },
            ChatMessage {
                role: ChatRole::Assistant,
                answer: Answer::Message("hi".to_string()),
                timestamp: ts,
            },
        ];
        let page = render_page(&history);
        assert!(page.contains("user-bubble"));
        assert!(page.contains("assistant-bubble"));
        assert!(page.contains("10:30:00"));
    }
}
