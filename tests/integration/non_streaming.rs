//! Non-streamed passthrough tests

use pretty_assertions::assert_eq;
use serde_json::json;

use sentinel_passthrough::native::{FinishReason, TranslationError};
use sentinel_passthrough::PassthroughError;

use crate::common::{self, constants};

#[test]
fn test_message_body_is_translated_and_logged() {
    let context = common::context(json!({"model": "claude-3-5-sonnet", "stream": false}));
    let outcome = common::handler()
        .handle_non_streaming(
            &common::message_body(),
            &context,
            common::start_time(),
            common::end_time(),
        )
        .unwrap();

    let response = outcome.result.unwrap();
    assert_eq!(response.content(), Some("Let me look that up."));
    assert_eq!(response.finish_reason(), Some(FinishReason::ToolCalls));
    assert_eq!(response.tool_calls()[0].function.arguments, r#"{"query":"rust"}"#);
    assert_eq!(response.usage.total_tokens, 160);

    // The response body's model wins over the request's alias
    assert_eq!(response.model, constants::TEST_MODEL);
    assert_eq!(outcome.kwargs.model.as_deref(), Some(constants::TEST_MODEL));
    assert_eq!(response.id, constants::TEST_CALL_ID);
    assert_eq!(response.created, common::end_time().timestamp());
}

#[test]
fn test_cost_uses_per_million_pricing() {
    let context = common::context(common::request_body());
    let outcome = common::handler()
        .handle_non_streaming(
            &common::message_body(),
            &context,
            common::start_time(),
            common::end_time(),
        )
        .unwrap();

    // 120 input at $3/M plus 40 output at $15/M
    let expected = 120.0 * 3.0 / 1_000_000.0 + 40.0 * 15.0 / 1_000_000.0;
    let cost = outcome.kwargs.response_cost.unwrap();
    assert!((cost - expected).abs() < 1e-12);
}

#[test]
fn test_provider_error_body_is_rejected() {
    let body = json!({
        "type": "error",
        "error": {"type": "invalid_request_error", "message": "max_tokens: field required"}
    });
    let context = common::context(common::request_body());
    let err = common::handler()
        .handle_non_streaming(&body, &context, common::start_time(), common::end_time())
        .unwrap_err();

    assert!(matches!(
        err,
        PassthroughError::Translation(TranslationError::ProviderError { .. })
    ));
    let body = serde_json::to_value(err.to_error_response()).unwrap();
    assert_eq!(body["error"]["details"]["provider_error_type"], "invalid_request_error");
}
