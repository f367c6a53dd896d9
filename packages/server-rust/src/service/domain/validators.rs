//! Stateless webhook-shape validators.
//!
//! Pure functions of their single argument. A missing or mismatched field is
//! a refusal (`ProcedureError::Rejected`), which the listener reports as a
//! non-success `"error"` response.

use conduit_core::Reply;
use serde_json::Value;

use crate::service::operation::ProcedureError;
use crate::service::registry::{procedure, ProcedureRegistry, RegistryError};

/// Accepts `{"entry": [{"messaging": m}, ...]}` and answers `"received: m"`.
///
/// # Errors
///
/// Rejects payloads without `entry[0].messaging`.
pub fn messaging_entry(payload: &Value) -> Result<Reply, ProcedureError> {
    let messaging = payload
        .pointer("/entry/0/messaging")
        .ok_or_else(|| ProcedureError::rejected("missing entry[0].messaging"))?;
    let rendered = match messaging {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(Reply::text(format!("received: {rendered}")))
}

/// Accepts a subscription handshake `{"hub": {"mode": "subscribe",
/// "verify_token": <token>}}` and answers `"success"`.
///
/// The flat query-string form `{"hub.mode": .., "hub.verify_token": ..}` is
/// accepted too.
///
/// # Errors
///
/// Rejects missing fields, other modes, and a wrong token.
pub fn subscription_handshake(payload: &Value, verify_token: &str) -> Result<Reply, ProcedureError> {
    let (mode, token) = match payload.get("hub") {
        Some(hub) => (hub.get("mode"), hub.get("verify_token")),
        None if payload.get("hub.mode").is_some() => {
            (payload.get("hub.mode"), payload.get("hub.verify_token"))
        }
        None => return Err(ProcedureError::rejected("missing hub")),
    };
    let mode = mode.and_then(Value::as_str);
    let token = token.and_then(Value::as_str);
    match (mode, token) {
        (Some("subscribe"), Some(token)) if token == verify_token => Ok(Reply::text("success")),
        (Some("subscribe"), Some(_)) => Err(ProcedureError::rejected("verify token mismatch")),
        (Some(_), Some(_)) => Err(ProcedureError::rejected("unsupported hub mode")),
        _ => Err(ProcedureError::rejected("missing hub.mode or hub.verify_token")),
    }
}

/// `example_one(payload)` and `example_two(payload)`.
///
/// # Errors
///
/// Fails if a name is already registered.
pub fn register(registry: &mut ProcedureRegistry, verify_token: &str) -> Result<(), RegistryError> {
    registry.register(
        "example_one",
        procedure(1, |args| messaging_entry(args.get(0)?)),
    )?;

    let verify_token = verify_token.to_string();
    registry.register(
        "example_two",
        procedure(1, move |args| subscription_handshake(args.get(0)?, &verify_token)),
    )
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    const TOKEN: &str = "AFIDOH1H41V";

    #[test]
    fn example_one_accepts_messaging_entry() {
        let payload = json!({"object": "page", "entry": [{"messaging": "hello world"}]});
        assert_eq!(messaging_entry(&payload).unwrap(), Reply::text("received: hello world"));
    }

    #[test]
    fn example_one_renders_structured_messaging() {
        let payload = json!({"entry": [{"messaging": [1, 2]}]});
        assert_eq!(messaging_entry(&payload).unwrap(), Reply::text("received: [1,2]"));
    }

    #[test]
    fn example_one_rejects_missing_path() {
        for payload in [
            json!({"object": "page", "entries": []}),
            json!({"entry": []}),
            json!({"entry": [{"message": "x"}]}),
            json!("entry"),
        ] {
            assert!(matches!(
                messaging_entry(&payload),
                Err(ProcedureError::Rejected { .. })
            ));
        }
    }

    #[test]
    fn example_two_accepts_subscription() {
        let payload = json!({"hub": {"mode": "subscribe", "verify_token": TOKEN}});
        assert_eq!(
            subscription_handshake(&payload, TOKEN).unwrap(),
            Reply::text("success")
        );
    }

    #[test]
    fn example_two_accepts_flat_query_form() {
        let payload = json!({"hub.mode": "subscribe", "hub.verify_token": TOKEN});
        assert_eq!(
            subscription_handshake(&payload, TOKEN).unwrap(),
            Reply::text("success")
        );
        let wrong = json!({"hub.mode": "subscribe", "hub.verify_token": "x"});
        assert!(subscription_handshake(&wrong, TOKEN).is_err());
    }

    #[test]
    fn example_two_rejects_everything_else() {
        for payload in [
            json!({"ham": {}}),
            json!({"hub": {}}),
            json!({"hub": {"mode": "subscribe", "verify_token": "nope"}}),
            json!({"hub": {"mode": "unsubscribe", "verify_token": TOKEN}}),
            json!({"hub": {"mode": "subscribe", "verify_token": 5}}),
        ] {
            assert!(subscription_handshake(&payload, TOKEN).is_err(), "{payload}");
        }
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn validators_are_deterministic(payload in arb_json()) {
            let first = messaging_entry(&payload).map_err(|e| e.to_string());
            let second = messaging_entry(&payload).map_err(|e| e.to_string());
            prop_assert_eq!(first, second);

            let first = subscription_handshake(&payload, TOKEN).map_err(|e| e.to_string());
            let second = subscription_handshake(&payload, TOKEN).map_err(|e| e.to_string());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn payloads_without_entry_are_always_rejected(
            fields in prop::collection::btree_map("[a-z]{1,6}", arb_json(), 0..5)
        ) {
            let mut payload = fields;
            payload.remove("entry");
            let payload = Value::Object(payload.into_iter().collect());
            prop_assert!(messaging_entry(&payload).is_err());
        }

        #[test]
        fn payloads_without_hub_are_always_rejected(
            fields in prop::collection::btree_map("[a-z]{1,6}", arb_json(), 0..5)
        ) {
            let mut payload = fields;
            payload.remove("hub");
            let payload = Value::Object(payload.into_iter().collect());
            prop_assert!(subscription_handshake(&payload, TOKEN).is_err());
        }
    }
}
