//! Unit tests for the event record decoder

#[cfg(test)]
mod tests {
    use crate::event::{
        decode_events, encode_event, DeliveryMode, EventKind, EventTiming, SynthEvent,
        PHONEME_LEN, RECORD_SIZE,
    };
    use byteorder::{LittleEndian, WriteBytesExt};
    use std::time::Duration;

    fn event(token: u64, kind: EventKind) -> SynthEvent {
        SynthEvent {
            token,
            timing: EventTiming::default(),
            kind,
        }
    }

    fn encode_all(events: &[SynthEvent]) -> Vec<u8> {
        let mut buf = Vec::new();
        for event in events {
            encode_event(&mut buf, event);
        }
        buf
    }

    #[test]
    fn test_retrieval_decodes_until_list_terminated() {
        let records = encode_all(&[
            event(7, EventKind::Sentence { number: 1 }),
            event(7, EventKind::Word { number: 1 }),
            event(7, EventKind::Word { number: 2 }),
            event(7, EventKind::ListTerminated),
            // Anything after the terminator must never be reached.
            event(9, EventKind::Word { number: 99 }),
        ]);

        let events = decode_events(&records, DeliveryMode::Retrieval);

        assert_eq!(events.len(), 4);
        assert_eq!(events[3].kind, EventKind::ListTerminated);
        assert!(events.iter().all(|e| e.token == 7));
    }

    #[test]
    fn test_playback_decodes_exactly_one_record() {
        let records = encode_all(&[
            event(3, EventKind::Word { number: 1 }),
            event(3, EventKind::Word { number: 2 }),
            event(3, EventKind::ListTerminated),
        ]);

        let events = decode_events(&records, DeliveryMode::Playback);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Word { number: 1 });
    }

    #[test]
    fn test_playback_single_terminator_block() {
        let records = encode_all(&[event(1, EventKind::ListTerminated)]);

        let events = decode_events(&records, DeliveryMode::Playback);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ListTerminated);
    }

    #[test]
    fn test_common_fields_survive_the_wire() {
        let original = SynthEvent {
            token: u64::MAX - 1,
            timing: EventTiming {
                message_id: 12,
                text_position: 34,
                length: 5,
                audio_position: Duration::from_millis(1500),
                sample: 33075,
            },
            kind: EventKind::Word { number: 6 },
        };
        let records = encode_all(&[original.clone(), event(0, EventKind::ListTerminated)]);

        let events = decode_events(&records, DeliveryMode::Retrieval);

        assert_eq!(events[0], original);
    }

    #[test]
    fn test_mark_name_roundtrip() {
        let records = encode_all(&[
            event(
                1,
                EventKind::Mark {
                    name: "chapter-2".to_string(),
                },
            ),
            event(1, EventKind::ListTerminated),
        ]);

        let events = decode_events(&records, DeliveryMode::Retrieval);

        assert_eq!(
            events[0].kind,
            EventKind::Mark {
                name: "chapter-2".to_string()
            }
        );
    }

    #[test]
    fn test_phoneme_is_bounded() {
        // A phoneme filling the whole field has no NUL terminator.
        let records = encode_all(&[
            event(
                1,
                EventKind::Phoneme {
                    phoneme: "abcdefghij".to_string(),
                },
            ),
            event(1, EventKind::ListTerminated),
        ]);

        let events = decode_events(&records, DeliveryMode::Retrieval);

        assert_eq!(
            events[0].kind,
            EventKind::Phoneme {
                phoneme: "abcdefgh".to_string()
            }
        );
        assert_eq!("abcdefgh".len(), PHONEME_LEN);
    }

    #[test]
    #[should_panic(expected = "unexpected event type")]
    fn test_unknown_tag_panics() {
        let mut records = Vec::new();
        records.write_u32::<LittleEndian>(4242).unwrap();
        records.resize(RECORD_SIZE, 0);

        decode_events(&records, DeliveryMode::Retrieval);
    }

    #[test]
    #[should_panic(expected = "truncated event record")]
    fn test_truncated_block_panics() {
        let records = encode_all(&[event(1, EventKind::Word { number: 1 })]);

        // Word is not a terminator, so the decoder expects another record.
        decode_events(&records, DeliveryMode::Retrieval);
    }

    #[test]
    fn test_terminal_predicate() {
        assert!(event(1, EventKind::MsgTerminated).is_terminal());
        assert!(!event(1, EventKind::ListTerminated).is_terminal());
        assert!(!event(1, EventKind::End).is_terminal());
    }
}
