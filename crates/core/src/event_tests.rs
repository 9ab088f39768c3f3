// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_assistant_message_with_nested_content() {
    let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"},{"type":"tool_use","name":"Bash","input":{}}]}}"#;
    let event = StreamEvent::parse_line(line).unwrap();
    let blocks = event.blocks();
    assert_eq!(blocks.len(), 2);
    assert!(matches!(&blocks[0], ContentBlock::Text { text } if text == "hi"));
    assert!(matches!(&blocks[1], ContentBlock::ToolUse { name } if name == "Bash"));
}

#[test]
fn parses_message_with_top_level_content() {
    let line = r#"{"type":"message","content":[{"type":"text","text":"hello"}]}"#;
    let event = StreamEvent::parse_line(line).unwrap();
    assert_eq!(event.blocks().len(), 1);
}

#[test]
fn parses_message_delta() {
    let line = r#"{"type":"messageDelta","delta":{"content":" more"}}"#;
    match StreamEvent::parse_line(line).unwrap() {
        StreamEvent::MessageDelta { delta: Some(delta) } => {
            assert_eq!(delta.content.as_deref(), Some(" more"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn parses_content_block_start_tool_use() {
    let line = r#"{"type":"contentBlockStart","contentBlock":{"type":"tool_use","name":"Grep"}}"#;
    match StreamEvent::parse_line(line).unwrap() {
        StreamEvent::ContentBlockStart { content_block: Some(ContentBlock::ToolUse { name }) } => {
            assert_eq!(name, "Grep");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn tool_result_delta_is_recognized() {
    let line = r#"{"type":"contentBlockDelta","delta":{"type":"tool_result","content":"ok"}}"#;
    match StreamEvent::parse_line(line).unwrap() {
        StreamEvent::ContentBlockDelta { delta: Some(delta) } => assert!(delta.is_tool_result()),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn result_event_yields_canonical_text() {
    let event = StreamEvent::parse_line(r#"{"type":"result","result":"hi"}"#).unwrap();
    assert_eq!(event.result_text().as_deref(), Some("hi"));

    // Non-string results are serialized rather than dropped.
    let event = StreamEvent::parse_line(r#"{"type":"result","result":{"answer":1}}"#).unwrap();
    assert_eq!(event.result_text().as_deref(), Some(r#"{"answer":1}"#));
}

#[test]
fn error_event_yields_text() {
    let event = StreamEvent::parse_line(r#"{"type":"error","message":"rate limited"}"#).unwrap();
    assert_eq!(event.error_text().as_deref(), Some("rate limited"));

    let event =
        StreamEvent::parse_line(r#"{"type":"error","error":{"message":"overloaded"}}"#).unwrap();
    assert_eq!(event.error_text().as_deref(), Some("overloaded"));
}

#[test]
fn unknown_type_is_other_not_a_parse_failure() {
    let event = StreamEvent::parse_line(r#"{"type":"system","subtype":"init"}"#).unwrap();
    assert!(matches!(event, StreamEvent::Other));
}

#[test]
fn non_json_lines_are_not_events() {
    assert!(StreamEvent::parse_line("plain progress text").is_none());
    assert!(StreamEvent::parse_line("{\"type\":").is_none());
}

#[test]
fn unknown_block_types_are_tolerated() {
    let line = r#"{"type":"message","content":[{"type":"thinking","thinking":"..."}]}"#;
    let event = StreamEvent::parse_line(line).unwrap();
    assert!(matches!(event.blocks()[0], ContentBlock::Other));
}
