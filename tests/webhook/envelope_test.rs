//! Tests for `src/webhook.rs` — envelope parsing and the verify handshake.

use std::collections::HashMap;

use khata::webhook::{check_verification, extract_messages, WebhookEnvelope};

fn parse(json: &str) -> WebhookEnvelope {
    serde_json::from_str(json).expect("envelope should parse")
}

#[test]
fn text_message_is_extracted() {
    let envelope = parse(
        r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [{
                            "from": "919999999999",
                            "id": "wamid.xyz",
                            "type": "text",
                            "text": { "body": "i bought chai for 10" }
                        }]
                    }
                }]
            }]
        }"#,
    );
    let messages = extract_messages(&envelope);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].contact_handle, "919999999999");
    assert_eq!(messages[0].text, "i bought chai for 10");
}

#[test]
fn status_only_delivery_yields_no_messages() {
    let envelope = parse(
        r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "value": { "statuses": [{ "status": "delivered" }] }
                }]
            }]
        }"#,
    );
    assert!(extract_messages(&envelope).is_empty());
}

#[test]
fn non_text_message_is_skipped() {
    let envelope = parse(
        r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{ "from": "919999999999", "type": "image" }]
                    }
                }]
            }]
        }"#,
    );
    assert!(extract_messages(&envelope).is_empty());
}

#[test]
fn unrelated_object_type_is_ignored() {
    let envelope = parse(
        r#"{
            "object": "instagram",
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{ "from": "1", "text": { "body": "hi" } }]
                    }
                }]
            }]
        }"#,
    );
    assert!(extract_messages(&envelope).is_empty());
}

#[test]
fn multiple_messages_are_all_extracted() {
    let envelope = parse(
        r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [
                            { "from": "1", "text": { "body": "first" } },
                            { "from": "2", "text": { "body": "second" } }
                        ]
                    }
                }]
            }]
        }"#,
    );
    let messages = extract_messages(&envelope);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, "second");
}

#[test]
fn empty_envelope_parses_to_nothing() {
    let envelope = parse("{}");
    assert!(extract_messages(&envelope).is_empty());
}

// -- verification handshake --

fn params(mode: &str, token: &str, challenge: &str) -> HashMap<String, String> {
    [
        ("hub.mode", mode),
        ("hub.verify_token", token),
        ("hub.challenge", challenge),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

#[test]
fn matching_token_echoes_challenge() {
    let p = params("subscribe", "sekrit", "12345");
    assert_eq!(check_verification(&p, "sekrit").as_deref(), Some("12345"));
}

#[test]
fn wrong_token_is_refused() {
    let p = params("subscribe", "wrong", "12345");
    assert!(check_verification(&p, "sekrit").is_none());
}

#[test]
fn wrong_mode_is_refused() {
    let p = params("unsubscribe", "sekrit", "12345");
    assert!(check_verification(&p, "sekrit").is_none());
}

#[test]
fn missing_params_are_refused() {
    assert!(check_verification(&HashMap::new(), "sekrit").is_none());
}
