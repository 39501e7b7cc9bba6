use editstream_sse::{EventId, SseParser};
use proptest::prelude::*;

fn line_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z0-9]{1,12}").expect("line regex")
}

proptest! {
    #[test]
    fn n_well_formed_blocks_yield_n_events_in_order(
        blocks in proptest::collection::vec(line_strategy(), 1..16),
        split in 0_usize..1024,
    ) {
        let mut payload = String::new();
        for (index, line) in blocks.iter().enumerate() {
            payload.push_str(&format!("id: {index}\n"));
            payload.push_str("data: ");
            payload.push_str(line);
            payload.push('\n');
            payload.push('\n');
        }

        let bytes = payload.as_bytes();
        let split_at = split.min(bytes.len());
        let mut parser = SseParser::new();

        let mut emitted = Vec::new();
        emitted.extend(parser.push_bytes(&bytes[..split_at]));
        emitted.extend(parser.push_bytes(&bytes[split_at..]));

        prop_assert_eq!(emitted.len(), blocks.len());
        for (index, event) in emitted.iter().enumerate() {
            prop_assert_eq!(event.id.clone(), Some(EventId::Value(index.to_string())));
            prop_assert_eq!(event.data.as_str(), blocks[index].as_str());
        }
    }

    #[test]
    fn multiline_data_joins_with_newline_under_arbitrary_split(
        lines in proptest::collection::vec(line_strategy(), 1..8),
        split in 0_usize..512,
    ) {
        let mut payload = String::new();
        for line in &lines {
            payload.push_str("data: ");
            payload.push_str(line);
            payload.push('\n');
        }
        payload.push('\n');

        let bytes = payload.as_bytes();
        let split_at = split.min(bytes.len());
        let mut parser = SseParser::new();

        let mut emitted = Vec::new();
        emitted.extend(parser.push_bytes(&bytes[..split_at]));
        emitted.extend(parser.push_bytes(&bytes[split_at..]));

        prop_assert_eq!(emitted.len(), 1);
        let expected_data = lines.join("\n");
        prop_assert_eq!(emitted[0].data.as_str(), expected_data.as_str());
    }

    #[test]
    fn comment_only_input_emits_no_events(
        comments in proptest::collection::vec(line_strategy(), 1..8),
        split in 0_usize..512,
    ) {
        let mut payload = String::new();
        for comment in &comments {
            payload.push(':');
            payload.push_str(comment);
            payload.push('\n');
        }
        payload.push('\n');

        let bytes = payload.as_bytes();
        let split_at = split.min(bytes.len());
        let mut parser = SseParser::new();

        let mut emitted = Vec::new();
        emitted.extend(parser.push_bytes(&bytes[..split_at]));
        emitted.extend(parser.push_bytes(&bytes[split_at..]));
        let tail = parser.finish();

        prop_assert!(emitted.is_empty());
        prop_assert!(tail.is_none());
    }

    #[test]
    fn invalid_retry_field_does_not_set_retry_ms(
        bad_retry in proptest::string::string_regex("[a-zA-Z_-]{1,16}").expect("retry regex"),
        data_line in line_strategy(),
    ) {
        let payload = format!("retry: {bad_retry}\ndata: {data_line}\n\n");
        let mut parser = SseParser::new();
        let emitted = parser.push_bytes(payload.as_bytes());

        prop_assert_eq!(emitted.len(), 1);
        prop_assert_eq!(emitted[0].retry_ms, None);
        prop_assert_eq!(emitted[0].data.as_str(), data_line.as_str());
    }

    #[test]
    fn no_event_ever_carries_empty_data(raw in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let mut parser = SseParser::new();
        let mut emitted = parser.push_bytes(&raw);
        emitted.extend(parser.finish());
        for event in &emitted {
            prop_assert!(!event.data.is_empty());
        }
    }
}
