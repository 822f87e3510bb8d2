use chrono::NaiveDate;
use httpmock::prelude::*;
use std::time::Duration;
use tallybridge::domain::model::{Answer, LedgerRow};
use tallybridge::{OllamaClient, QueryEngine};

fn fixture_rows() -> Vec<LedgerRow> {
    vec![LedgerRow {
        ledger_name: "ABC Suppliers".to_string(),
        parent: "Sundry Creditors".to_string(),
        opening_balance: 1000.0,
        closing_balance: 2500.0,
        altered_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
    }]
}

#[tokio::test]
async fn unmatched_question_is_answered_by_the_model() {
    let server = MockServer::start();
    let chat_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .body_includes("how healthy are my books");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "model": "llama3.2",
                "message": {
                    "role": "assistant",
                    "content": "Your books look healthy overall."
                },
                "done": true
            }));
    });

    let model = OllamaClient::new(
        server.base_url(),
        "llama3.2".to_string(),
        Duration::from_secs(5),
    )
    .unwrap();
    let engine = QueryEngine::new(Some(Box::new(model)));

    let answer = engine
        .answer(&fixture_rows(), "how healthy are my books?")
        .await;
    chat_mock.assert();
    assert_eq!(
        answer,
        Answer::Message("Your books look healthy overall.".to_string())
    );
}

#[tokio::test]
async fn rule_matches_never_reach_the_model() {
    let server = MockServer::start();
    let chat_mock = server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200).json_body(serde_json::json!({
            "message": {"role": "assistant", "content": "should not be used"}
        }));
    });

    let model = OllamaClient::new(
        server.base_url(),
        "llama3.2".to_string(),
        Duration::from_secs(5),
    )
    .unwrap();
    let engine = QueryEngine::new(Some(Box::new(model)));

    let answer = engine.answer(&fixture_rows(), "add all closing balance").await;
    assert_eq!(
        answer,
        Answer::Message("Total closing balance: 2,500.00".to_string())
    );
    chat_mock.assert_hits(0);
}

#[tokio::test]
async fn model_failure_degrades_to_a_helpful_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(404).body("model 'llama3.2' not found");
    });

    let model = OllamaClient::new(
        server.base_url(),
        "llama3.2".to_string(),
        Duration::from_secs(5),
    )
    .unwrap();
    let engine = QueryEngine::new(Some(Box::new(model)));

    let answer = engine
        .answer(&fixture_rows(), "predict next quarter revenue")
        .await;
    match answer {
        Answer::Message(msg) => assert!(msg.contains("could not answer")),
        other => panic!("unexpected answer: {:?}", other),
    }
}

#[tokio::test]
async fn disabled_model_suggests_rule_phrasings() {
    let engine = QueryEngine::new(None);
    let answer = engine
        .answer(&fixture_rows(), "predict next quarter revenue")
        .await;
    match answer {
        Answer::Message(msg) => assert!(msg.contains("language model is disabled")),
        other => panic!("unexpected answer: {:?}", other),
    }
}
