//! Tests for `src/extract.rs` — JSON recovery and intent parsing.

use khata::extract::{json_from_text, parse_intent, ExtractError};
use khata::types::UserIntent;

// -- json_from_text --

#[test]
fn pure_json_parses_directly() {
    let value = json_from_text(r#"{"intent": "READ"}"#).expect("should parse");
    assert_eq!(value["intent"], "READ");
}

#[test]
fn fenced_block_with_json_tag_is_preferred() {
    let text = "Here is the result:\n```json\n{\"intent\": \"OTHER\"}\n```\nHope that helps!";
    let value = json_from_text(text).expect("should parse");
    assert_eq!(value["intent"], "OTHER");
}

#[test]
fn fenced_block_without_tag_is_found() {
    let text = "```\n{\"intent\": \"READ\"}\n```";
    let value = json_from_text(text).expect("should parse");
    assert_eq!(value["intent"], "READ");
}

#[test]
fn brace_scan_recovers_json_wrapped_in_prose() {
    let text = "Sure! The answer is {\"intent\": \"READ\"} as requested.";
    let value = json_from_text(text).expect("should parse");
    assert_eq!(value["intent"], "READ");
}

#[test]
fn brace_scan_takes_outermost_pair() {
    let text = "prefix {\"a\": {\"b\": 1}} suffix";
    let value = json_from_text(text).expect("should parse");
    assert_eq!(value["a"]["b"], 1);
}

#[test]
fn text_without_json_is_rejected() {
    let err = json_from_text("I cannot help with that.").expect_err("should fail");
    assert!(matches!(err, ExtractError::NoJsonFound));
}

#[test]
fn invalid_json_inside_fence_is_rejected() {
    let err = json_from_text("```json\n{not json}\n```").expect_err("should fail");
    assert!(matches!(err, ExtractError::InvalidJson(_)));
}

#[test]
fn empty_response_is_rejected() {
    assert!(matches!(
        json_from_text(""),
        Err(ExtractError::NoJsonFound)
    ));
}

// -- parse_intent --

#[test]
fn create_intent_carries_transaction() {
    let text = r#"{
        "intent": "CREATE",
        "transaction": {
            "type": "expense",
            "items": [
                { "item_name": "milkshake", "quantity": 2, "price_per_item": 10 },
                { "item_name": "coffee", "quantity": 1, "price_per_item": 15 }
            ]
        }
    }"#;
    let intent = parse_intent(text).expect("should parse");
    match intent {
        UserIntent::Create(draft) => {
            assert_eq!(draft.items.len(), 2);
            assert_eq!(draft.items[0].item_name, "milkshake");
            assert_eq!(draft.items[0].quantity.to_string(), "2");
            assert_eq!(draft.items[1].unit_price.to_string(), "15");
        }
        other => panic!("expected CREATE, got {other:?}"),
    }
}

#[test]
fn read_intent_has_no_payload() {
    let intent = parse_intent(r#"{"intent": "READ"}"#).expect("should parse");
    assert_eq!(intent, UserIntent::Read);
}

#[test]
fn both_intent_carries_transaction() {
    let text = r#"{
        "intent": "BOTH",
        "transaction": {
            "type": "expense",
            "items": [{ "item_name": "pizza", "quantity": 1, "price_per_item": 250 }]
        }
    }"#;
    let intent = parse_intent(text).expect("should parse");
    assert!(matches!(intent, UserIntent::Both(_)));
}

#[test]
fn other_intent_parses() {
    let intent = parse_intent(r#"{"intent": "OTHER"}"#).expect("should parse");
    assert_eq!(intent, UserIntent::Other);
}

#[test]
fn lowercase_tag_is_accepted() {
    let intent = parse_intent(r#"{"intent": "read"}"#).expect("should parse");
    assert_eq!(intent, UserIntent::Read);
}

#[test]
fn unrecognized_tag_falls_back_to_other() {
    let intent = parse_intent(r#"{"intent": "DELETE_EVERYTHING"}"#).expect("should parse");
    assert_eq!(intent, UserIntent::Other);
}

#[test]
fn create_without_transaction_is_malformed() {
    let err = parse_intent(r#"{"intent": "CREATE"}"#).expect_err("should fail");
    assert!(matches!(err, ExtractError::MissingTransaction));
}

#[test]
fn create_with_empty_items_is_malformed() {
    let text = r#"{"intent": "CREATE", "transaction": {"type": "expense", "items": []}}"#;
    let err = parse_intent(text).expect_err("should fail");
    assert!(matches!(err, ExtractError::EmptyTransaction));
}

#[test]
fn fenced_intent_response_round_trips() {
    let text = "```json\n{\"intent\": \"CREATE\", \"transaction\": {\"type\": \"income\", \"items\": [{\"item_name\": \"salary\", \"quantity\": 1, \"price_per_item\": 5000}]}}\n```";
    let intent = parse_intent(text).expect("should parse");
    match intent {
        UserIntent::Create(draft) => {
            assert_eq!(draft.items[0].item_name, "salary");
        }
        other => panic!("expected CREATE, got {other:?}"),
    }
}

#[test]
fn wrong_shape_is_rejected() {
    let err = parse_intent(r#"{"verdict": "yes"}"#).expect_err("should fail");
    assert!(matches!(err, ExtractError::UnexpectedShape(_)));
}
