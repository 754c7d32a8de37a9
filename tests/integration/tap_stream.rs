//! Forward-while-reconstructing tests
//!
//! The tapped stream must hand every transport item through untouched and
//! deliver the logging result once upstream ends.

use bytes::Bytes;
use futures::StreamExt;
use pretty_assertions::assert_eq;

use sentinel_passthrough::{PassthroughError, StreamError};

use crate::common;

fn pieces(wire: &str, size: usize) -> Vec<Result<Bytes, std::io::Error>> {
    wire.as_bytes()
        .chunks(size)
        .map(|p| Ok(Bytes::copy_from_slice(p)))
        .collect()
}

#[tokio::test]
async fn test_items_pass_through_unchanged() {
    let wire = common::to_wire(&common::text_transcript());
    let context = common::context(common::request_body());

    let (tapped, result) = common::handler().tap_stream(
        futures::stream::iter(pieces(&wire, 11)),
        context,
        common::start_time(),
    );
    let forwarded: Vec<Bytes> = tapped.map(|item| item.unwrap()).collect().await;

    let joined: Vec<u8> = forwarded.iter().flat_map(|b| b.iter().copied()).collect();
    assert_eq!(String::from_utf8(joined).unwrap(), wire);

    let outcome = result.await.unwrap().unwrap();
    assert_eq!(outcome.result.unwrap().content(), Some("Hello, world"));
    assert!(outcome.kwargs.standard_logging_object.is_some());
}

#[tokio::test]
async fn test_transport_error_is_forwarded_and_aborts() {
    let wire = common::to_wire(&common::text_transcript());
    let mut items = pieces(&wire[..200], 50);
    items.push(Err(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset by peer",
    )));
    let context = common::context(common::request_body());

    let (tapped, result) =
        common::handler().tap_stream(futures::stream::iter(items), context, common::start_time());
    let forwarded: Vec<Result<Bytes, std::io::Error>> = tapped.collect().await;

    assert!(forwarded.last().unwrap().is_err());
    let err = result.await.unwrap().unwrap_err();
    assert!(matches!(err, PassthroughError::Stream(StreamError::Transport(_))));
}

#[tokio::test]
async fn test_transport_error_after_message_stop_keeps_response() {
    let wire = common::to_wire(&common::text_transcript());
    let items = vec![
        Ok(Bytes::from(wire)),
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset after stop",
        )),
    ];
    let context = common::context(common::request_body());

    let (tapped, result) =
        common::handler().tap_stream(futures::stream::iter(items), context, common::start_time());
    let forwarded: Vec<Result<Bytes, std::io::Error>> = tapped.collect().await;
    assert_eq!(forwarded.len(), 2);
    assert!(forwarded[1].is_err());

    let outcome = result.await.unwrap().unwrap();
    assert_eq!(outcome.result.unwrap().content(), Some("Hello, world"));
    assert!(outcome.kwargs.standard_logging_object.is_some());
}

#[tokio::test]
async fn test_dropped_stream_drops_result() {
    let wire = common::to_wire(&common::text_transcript());
    let context = common::context(common::request_body());

    let (tapped, result) = common::handler().tap_stream(
        futures::stream::iter(pieces(&wire, 64)),
        context,
        common::start_time(),
    );
    let mut tapped = Box::pin(tapped);
    assert!(tapped.next().await.is_some());
    drop(tapped);

    assert!(result.await.is_err());
}

#[test]
fn test_tap_stream_on_blocking_runtime() {
    let wire = common::to_wire(&common::tool_transcript());
    let context = common::context(common::request_body());

    let outcome = tokio_test::block_on(async {
        let (tapped, result) = common::handler().tap_stream(
            futures::stream::iter(pieces(&wire, 128)),
            context,
            common::start_time(),
        );
        let _forwarded: Vec<_> = tapped.collect().await;
        result.await.unwrap()
    })
    .unwrap();

    assert_eq!(outcome.result.unwrap().tool_calls().len(), 1);
}
