use kaflow_api::{SseEvent, SseStreamParser};

#[test]
fn sse_framing_parses_named_events_and_skips_pings() {
    let payload = concat!(
        "event: message_chunk\ndata: {\"content\":\"hel\"}\n\n",
        "data:\n\n",
        ": keep-alive comment\n\n",
        "event: tool_calls\ndata: {\"tool_calls\":[]}\n\n"
    );

    let events = SseStreamParser::parse_frames(payload);
    assert_eq!(
        events,
        vec![
            SseEvent::new("message_chunk", "{\"content\":\"hel\"}"),
            SseEvent::new("tool_calls", "{\"tool_calls\":[]}"),
        ]
    );
}

#[test]
fn sse_parser_defaults_event_name_to_message() {
    let events = SseStreamParser::parse_frames("data: {\"x\":1}\n\n");
    assert_eq!(events, vec![SseEvent::new("message", "{\"x\":1}")]);
}

#[test]
fn sse_parser_keeps_named_event_without_data() {
    let events = SseStreamParser::parse_frames("event: cancelled\n\n");
    assert_eq!(
        events,
        vec![SseEvent {
            event: "cancelled".to_string(),
            data: None,
        }]
    );
}

#[test]
fn sse_parser_last_data_line_wins() {
    let events = SseStreamParser::parse_frames("event: error\ndata: {\"a\":1}\ndata: {\"b\":2}\n\n");
    assert_eq!(events, vec![SseEvent::new("error", "{\"b\":2}")]);
}

#[test]
fn sse_parser_tolerates_extra_whitespace() {
    let events =
        SseStreamParser::parse_frames("  event :   final_report  \n\tdata:   {\"report\":\"r\"}   \n\n");
    assert_eq!(events, vec![SseEvent::new("final_report", "{\"report\":\"r\"}")]);
}

#[test]
fn sse_parser_handles_split_frames_incrementally() {
    let mut parser = SseStreamParser::default();
    assert!(parser.feed(b"event: message_chunk\ndata: {\"content\":\"abc\"").is_empty());
    assert!(!parser.is_empty_buffer());

    let events = parser.feed(b"}\n\nevent: cancelled\ndata: {}\n\n");
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event, "cancelled");
    assert!(parser.is_empty_buffer());
}

#[test]
fn sse_parser_flushes_unterminated_final_event() {
    let mut parser = SseStreamParser::default();
    assert!(parser.feed(b"event: final_report\ndata: {\"report\":\"done\"}\n").is_empty());

    assert_eq!(
        parser.finish(),
        Some(SseEvent::new("final_report", "{\"report\":\"done\"}"))
    );
    assert_eq!(parser.finish(), None);
}

#[test]
fn sse_parser_accepts_crlf_line_endings() {
    let events = SseStreamParser::parse_frames("event: cancelled\r\ndata: {}\r\n\r\n");
    assert_eq!(events, vec![SseEvent::new("cancelled", "{}")]);
}
