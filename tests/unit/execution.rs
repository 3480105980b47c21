// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use serde_json::json;

use rustymail_actions::error::{ComposedError, HandlerError, NodeError};
use rustymail_actions::imap::error::ImapError;
use rustymail_actions::imap::types::Flag;
use rustymail_actions::node::{
    ExecutionContext, InputItem, Operation, OperationHandler, OperationRegistry, OperationSchema, ResultItem,
};

use super::mock_imap::{invocation, params, run, run_with_registry, Call, MockConnector, MockImapSession};

fn uid_item(uid: u32) -> InputItem {
    InputItem::default().with_parameter("emailUid", json!(uid.to_string()))
}

fn flag_batch(continue_on_fail: bool) -> rustymail_actions::node::Invocation {
    let mut inv = invocation("email", "setEmailFlags", json!({ "flags": { "Seen": true } }));
    inv.continue_on_fail = continue_on_fail;
    inv.items = vec![uid_item(1), uid_item(2), uid_item(3)];
    inv
}

#[tokio::test]
async fn test_unknown_operation_fails_before_connecting() {
    let connector = MockConnector::new(MockImapSession::new());
    let mut inv = invocation("mailbox", "explode", json!({}));
    inv.continue_on_fail = true;

    let err = run(&connector, inv).await.unwrap_err();
    assert!(matches!(err, NodeError::UnknownOperation { .. }));
    assert_eq!(err.to_string(), "The operation \"explode\" is not known for resource \"mailbox\"");
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_operation_of_other_resource_is_unknown() {
    let connector = MockConnector::new(MockImapSession::new());
    let err = run(&connector, invocation("mailbox", "getEmailsList", json!({}))).await.unwrap_err();
    assert!(matches!(err, NodeError::UnknownOperation { .. }));
    assert_eq!(connector.connects(), 0);
}

#[tokio::test]
async fn test_connection_failure_is_reported() {
    let mock = MockImapSession::new();
    let connector = MockConnector::refusing(mock.clone(), ImapError::Auth("Invalid credentials".to_string()));

    let err = run(&connector, invocation("mailbox", "loadMailboxList", json!({}))).await.unwrap_err();
    assert!(matches!(err, NodeError::Connection(ImapError::Auth(_))));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_continue_on_fail_emits_one_item_per_input() {
    let mock = MockImapSession::new().fail_for_uid(2, "Message is locked");
    let connector = MockConnector::new(mock.clone());

    let results = run(&connector, flag_batch(true)).await.unwrap();
    assert_eq!(results.len(), 3);
    for (index, item) in results.iter().enumerate() {
        assert_eq!(item.correlated_to, Some(index));
    }
    assert_eq!(results[0].json["uid"], "1");
    assert_eq!(results[1].json, json!({ "error": "STORE failed" }));
    assert_eq!(results[2].json["added"], json!(["Seen"]));
    assert_eq!(mock.count(|c| *c == Call::Logout), 1);
}

#[tokio::test]
async fn test_fail_fast_aborts_with_captured_diagnostics() {
    let mock = MockImapSession::new().fail_for_uid(2, "Message is locked");
    let connector = MockConnector::new(mock.clone());

    let err = run(&connector, flag_batch(false)).await.unwrap_err();
    match err {
        NodeError::Item(composed) => {
            assert_eq!(composed.message, "STORE failed");
            assert_eq!(composed.item_index, Some(1));
            let description = composed.description.unwrap_or_default();
            assert!(description.contains("Message is locked"), "{}", description);
            assert!(description.contains("STORE"), "{}", description);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // The third item never ran, and the session was still closed once.
    assert_eq!(mock.count(|c| matches!(c, Call::FlagsAdd(uid, _) if uid == "3")), 0);
    assert_eq!(mock.count(|c| *c == Call::Logout), 1);
}

#[tokio::test]
async fn test_diagnostics_do_not_leak_into_later_items() {
    let mock = MockImapSession::new()
        .warn_for_uid(1, "First warning")
        .fail_for_uid(2, "Second failure");
    let connector = MockConnector::new(mock);
    let mut inv = flag_batch(false);
    inv.items = vec![uid_item(1), uid_item(2)];

    let err = run(&connector, inv).await.unwrap_err();
    let NodeError::Item(composed) = err else { panic!("expected an item error") };
    let description = composed.description.unwrap_or_default();
    assert!(description.contains("Second failure"));
    assert!(!description.contains("First warning"));
}

#[tokio::test]
async fn test_logout_failure_does_not_mask_results() {
    let mock = MockImapSession::new().fail_command("LOGOUT", "Connection reset");
    let connector = MockConnector::new(mock.clone());

    let results = run(&connector, invocation("mailbox", "loadMailboxList", json!({}))).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(mock.count(|c| *c == Call::Logout), 1);
}

#[tokio::test]
async fn test_item_parameters_override_invocation_parameters() {
    let mock = MockImapSession::new();
    let connector = MockConnector::new(mock.clone());
    let mut inv = invocation("email", "setEmailFlags", json!({ "emailUid": "5", "flags": { "Flagged": true } }));
    inv.items = vec![InputItem::default(), uid_item(9)];

    run(&connector, inv).await.unwrap();
    let adds: Vec<Call> = mock
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::FlagsAdd(..)))
        .collect();
    assert_eq!(
        adds,
        vec![
            Call::FlagsAdd("5".to_string(), vec![Flag::Flagged]),
            Call::FlagsAdd("9".to_string(), vec![Flag::Flagged]),
        ]
    );
}

/// Handler whose behaviour is chosen by the `mode` parameter.
struct Scripted;

#[async_trait]
impl OperationHandler for Scripted {
    fn operation(&self) -> Operation {
        Operation::GetQuota
    }

    fn display_name(&self) -> &'static str {
        "Scripted"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema.parameter(rustymail_actions::node::ParameterDescriptor::string("mode", "Mode"))
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        match ctx.get_string("mode")?.as_str() {
            "blank" => Err(HandlerError::raw("  ")),
            "composed" => Err(ComposedError::new("Handler refused").with_description("own details").into()),
            "none" => Ok(Vec::new()),
            "pinned" => Ok(vec![ResultItem { correlated_to: Some(7), ..ResultItem::new(json!({})) }]),
            _ => Ok(vec![ResultItem::new(json!({ "a": 1 })), ResultItem::new(json!({ "b": 2 }))]),
        }
    }
}

fn scripted_registry() -> &'static OperationRegistry {
    Box::leak(Box::new(OperationRegistry::builder().register(Scripted).build()))
}

fn scripted(mode: &str, continue_on_fail: bool) -> rustymail_actions::node::Invocation {
    let mut inv = invocation("mailbox", "getQuota", json!({ "mode": mode }));
    inv.continue_on_fail = continue_on_fail;
    inv
}

#[tokio::test]
async fn test_blank_raw_error_becomes_unknown_error() {
    let connector = MockConnector::new(MockImapSession::new());
    let err = run_with_registry(&connector, scripted_registry(), scripted("blank", false))
        .await
        .unwrap_err();
    let NodeError::Item(composed) = err else { panic!("expected an item error") };
    assert_eq!(composed.message, "Unknown error");
    assert_eq!(composed.item_index, Some(0));
}

#[tokio::test]
async fn test_composed_error_passes_through_unchanged() {
    let connector = MockConnector::new(MockImapSession::new());
    let err = run_with_registry(&connector, scripted_registry(), scripted("composed", false))
        .await
        .unwrap_err();
    let NodeError::Item(composed) = err else { panic!("expected an item error") };
    assert_eq!(composed.message, "Handler refused");
    assert_eq!(composed.description.as_deref(), Some("own details"));
    assert_eq!(composed.item_index, None);
    assert_eq!(composed.to_string(), "Handler refused");
}

#[tokio::test]
async fn test_every_output_is_correlated() {
    let connector = MockConnector::new(MockImapSession::new());
    let mut inv = scripted("many", false);
    inv.items = vec![InputItem::default(), InputItem::default().with_parameter("mode", json!("pinned"))];

    let results = run_with_registry(&connector, scripted_registry(), inv).await.unwrap();
    let correlations: Vec<Option<usize>> = results.iter().map(|r| r.correlated_to).collect();
    // A handler cannot point its output at another item.
    assert_eq!(correlations, vec![Some(0), Some(0), Some(1)]);
}

#[tokio::test]
async fn test_empty_handler_output_is_allowed() {
    let connector = MockConnector::new(MockImapSession::new());
    let results = run_with_registry(&connector, scripted_registry(), scripted("none", false))
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_undeclared_parameters_are_ignored() {
    let connector = MockConnector::new(MockImapSession::new());
    let mut inv = scripted("many", false);
    inv.parameters = params(json!({ "mode": "many", "somethingElse": 1 }));
    assert_eq!(run_with_registry(&connector, scripted_registry(), inv).await.unwrap().len(), 2);
}
