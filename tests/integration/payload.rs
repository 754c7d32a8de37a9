//! Logging payload tests
//!
//! Attribution order, cost failure handling and the kwargs fallback, checked
//! through the handler with recording collaborators.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use sentinel_passthrough::payload::LogStatus;
use sentinel_passthrough::{Config, PassthroughLoggingHandler};

use crate::common::{self, constants};
use crate::mocks::collaborators::{
    FailingCost, FailingStandardLogging, FixedCost, RecordingStandardLogging,
};

fn body_with_users(internal: Option<&str>, anthropic: Option<&str>) -> serde_json::Value {
    let mut body = common::request_body();
    if let Some(user) = internal {
        body["proxy_metadata"] = json!({ "user": user });
    }
    if let Some(user) = anthropic {
        body["metadata"] = json!({ "user_id": user });
    }
    body
}

#[test]
fn test_internal_user_wins_over_provider_user() {
    let recorder = Arc::new(RecordingStandardLogging::default());
    let handler = PassthroughLoggingHandler::new(
        &Config::default(),
        Arc::new(FixedCost::new(0.5)),
        recorder.clone(),
    );
    let context = common::context(body_with_users(
        Some(constants::TEST_INTERNAL_USER),
        Some(constants::TEST_ANTHROPIC_USER),
    ));

    let outcome = handler
        .handle_collected_chunks(
            common::text_transcript(),
            &context,
            common::start_time(),
            common::end_time(),
        )
        .unwrap();

    assert_eq!(outcome.kwargs.user_id.as_deref(), Some(constants::TEST_INTERNAL_USER));
    assert_eq!(
        outcome.kwargs.proxy_server_request,
        Some(json!({"body": {"user": constants::TEST_INTERNAL_USER}}))
    );
    assert_eq!(outcome.kwargs.response_cost, Some(0.5));
    assert_eq!(outcome.kwargs.standard_logging_object, Some(json!({"recorded": true, "id": constants::TEST_CALL_ID})));
}

#[test]
fn test_provider_user_is_fallback() {
    let handler = PassthroughLoggingHandler::new(
        &Config::default(),
        Arc::new(FixedCost::new(0.5)),
        Arc::new(RecordingStandardLogging::default()),
    );
    let context = common::context(body_with_users(None, Some(constants::TEST_ANTHROPIC_USER)));

    let outcome = handler
        .handle_collected_chunks(
            common::text_transcript(),
            &context,
            common::start_time(),
            common::end_time(),
        )
        .unwrap();
    assert_eq!(outcome.kwargs.user_id.as_deref(), Some(constants::TEST_ANTHROPIC_USER));
}

#[test]
fn test_configured_internal_field() {
    let config = Config {
        internal_metadata_field: "gateway_metadata".to_string(),
        ..Config::default()
    };
    let handler = PassthroughLoggingHandler::new(
        &config,
        Arc::new(FixedCost::new(0.5)),
        Arc::new(RecordingStandardLogging::default()),
    );
    let mut body = body_with_users(Some(constants::TEST_INTERNAL_USER), None);
    body["gateway_metadata"] = json!({"user": "gateway-user"});

    let outcome = handler
        .handle_collected_chunks(
            common::text_transcript(),
            &common::context(body),
            common::start_time(),
            common::end_time(),
        )
        .unwrap();
    assert_eq!(outcome.kwargs.user_id.as_deref(), Some("gateway-user"));
}

#[test]
fn test_no_user_leaves_attribution_empty() {
    let outcome = common::handler()
        .handle_collected_chunks(
            common::text_transcript(),
            &common::context(common::request_body()),
            common::start_time(),
            common::end_time(),
        )
        .unwrap();
    assert_eq!(outcome.kwargs.user_id, None);
    assert_eq!(outcome.kwargs.proxy_server_request, None);
}

#[test]
fn test_cost_failure_still_builds_payload() {
    let recorder = Arc::new(RecordingStandardLogging::default());
    let handler = PassthroughLoggingHandler::new(&Config::default(), Arc::new(FailingCost), recorder.clone());
    let context = common::context(body_with_users(Some(constants::TEST_INTERNAL_USER), None));

    let outcome = handler
        .handle_collected_chunks(
            common::text_transcript(),
            &context,
            common::start_time(),
            common::end_time(),
        )
        .unwrap();

    assert_eq!(outcome.kwargs.response_cost, None);
    assert_eq!(outcome.kwargs.call_id, constants::TEST_CALL_ID);
    assert_eq!(outcome.kwargs.model.as_deref(), Some(constants::TEST_MODEL));
    assert_eq!(outcome.kwargs.user_id.as_deref(), Some(constants::TEST_INTERNAL_USER));
    assert!(outcome.kwargs.standard_logging_object.is_some());
    assert_eq!(recorder.calls().len(), 1);
}

#[test]
fn test_response_is_stamped_before_standard_object() {
    let recorder = Arc::new(RecordingStandardLogging::default());
    let cost = Arc::new(FixedCost::new(1.25));
    let handler = PassthroughLoggingHandler::new(&Config::default(), cost.clone(), recorder.clone());
    let context = common::context(common::request_body());

    handler
        .handle_collected_chunks(
            common::text_transcript(),
            &context,
            common::start_time(),
            common::end_time(),
        )
        .unwrap();

    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call_id, constants::TEST_CALL_ID);
    assert_eq!(calls[0].response_id, constants::TEST_CALL_ID);
    assert_eq!(calls[0].response_model, constants::TEST_MODEL);
    assert_eq!(calls[0].response_cost, Some(1.25));
    assert_eq!(calls[0].status, LogStatus::Success);
    assert_eq!(*cost.models.lock().unwrap(), vec![constants::TEST_MODEL.to_string()]);
}

#[test]
fn test_standard_object_failure_returns_original_kwargs() {
    let handler = PassthroughLoggingHandler::new(
        &Config::default(),
        Arc::new(FixedCost::new(0.5)),
        Arc::new(FailingStandardLogging),
    );
    let context = common::context(body_with_users(Some(constants::TEST_INTERNAL_USER), None))
        .with_kwarg("call_source", json!("passthrough"));

    let outcome = handler
        .handle_collected_chunks(
            common::text_transcript(),
            &context,
            common::start_time(),
            common::end_time(),
        )
        .unwrap();

    // The response is still returned; only the payload falls back
    assert!(outcome.result.is_some());
    assert!(outcome.kwargs.is_bare());
    assert_eq!(outcome.kwargs.call_id, constants::TEST_CALL_ID);
    assert_eq!(
        outcome.kwargs.kwargs.get("call_source"),
        Some(&json!("passthrough"))
    );
}
