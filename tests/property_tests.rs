//! Property-based tests for document composition and encoding

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use rust_json_logger::core::timestamp::{format_timestamp, parse_timestamp};
use rust_json_logger::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

fn render(entry: LogEntry) -> Value {
    let line = JsonFormatter::new().format(&entry).expect("entry encodes");
    serde_json::from_str(&line).expect("output is valid JSON")
}

fn level_strategy() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warning),
        Just(LogLevel::Error),
        Just(LogLevel::Critical),
    ]
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,12}"
}

fn mapping_strategy() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map(key_strategy(), any::<i64>(), 0..8)
}

fn fields_of(map: &BTreeMap<String, i64>) -> Fields {
    map.iter().map(|(k, v)| (k.clone(), *v)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any message string produces exactly one parseable line
    #[test]
    fn test_any_message_is_valid_json(level in level_strategy(), message in ".*") {
        let line = JsonFormatter::new()
            .format(&LogEntry::new(level, message.as_str()))
            .unwrap();

        prop_assert!(!line.contains('\n'));
        let doc: Value = serde_json::from_str(&line).unwrap();
        prop_assert_eq!(doc["msg"].as_str(), Some(message.as_str()));
        prop_assert_eq!(doc["level"].as_str(), Some(level.to_str()));
    }

    /// Flattened keys land at the root unless extra names them too
    #[test]
    fn test_flatten_with_extra_precedence(
        message in mapping_strategy(),
        extra in mapping_strategy(),
    ) {
        let mut context = LogContext::new();
        for (key, value) in &extra {
            context.add_field(key.clone(), format!("extra-{}", value));
        }

        let doc = render(
            LogEntry::new(LogLevel::Info, fields_of(&message))
                .with_flatten(true)
                .with_extra(context),
        );

        for (key, value) in &message {
            match extra.get(key) {
                Some(winner) => {
                    let expected = format!("extra-{}", winner);
                    prop_assert_eq!(doc[key.as_str()].as_str(), Some(expected.as_str()));
                }
                None => prop_assert_eq!(doc[key.as_str()].as_i64(), Some(*value)),
            }
        }
        if !message.contains_key("msg") && !extra.contains_key("msg") {
            prop_assert!(doc.get("msg").is_none());
        }
    }

    /// JSON object messages flatten the same way as field maps
    #[test]
    fn test_flatten_json_object_message(message in mapping_strategy()) {
        let object: serde_json::Map<String, Value> = message
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(*v)))
            .collect();

        let doc = render(LogEntry::new(LogLevel::Info, Value::Object(object)).with_flatten(true));

        for (key, value) in &message {
            prop_assert_eq!(doc[key.as_str()].as_i64(), Some(*value));
        }
        if !message.contains_key("msg") {
            prop_assert!(doc.get("msg").is_none());
        }
    }

    /// Flatten is a no-op for non-mapping messages
    #[test]
    fn test_flatten_non_mapping_is_noop(number in any::<i64>(), text in "[ -~]{0,40}") {
        let doc = render(LogEntry::new(LogLevel::Info, number).with_flatten(true));
        prop_assert_eq!(doc["msg"].as_i64(), Some(number));

        let doc = render(LogEntry::new(LogLevel::Info, text.as_str()).with_flatten(true));
        prop_assert_eq!(doc["msg"].as_str(), Some(text.as_str()));
    }

    /// Extra keys always reach the root and beat same-named default fields
    #[test]
    fn test_extra_overrides_defaults(
        extra in mapping_strategy(),
        shadowed in prop::sample::select(vec![
            "logged_at", "line_number", "function", "level", "file_path",
        ]),
    ) {
        let mut context = LogContext::new();
        for (key, value) in &extra {
            context.add_field(key.clone(), *value);
        }
        context.add_field(shadowed, "overridden");

        let doc = render(LogEntry::new(LogLevel::Warning, "x").with_extra(context));

        prop_assert_eq!(doc[shadowed].as_str(), Some("overridden"));
        for (key, value) in &extra {
            if key != shadowed {
                prop_assert_eq!(doc[key.as_str()].as_i64(), Some(*value));
            }
        }
    }

    /// Encoded timestamps parse back to the same microsecond
    #[test]
    fn test_timestamp_round_trip(
        days in 0i64..80_000,
        seconds in 0u32..86_400,
        micros in 0u32..1_000_000,
    ) {
        let base = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
        let date = base + chrono::Duration::days(days);
        let datetime: NaiveDateTime = date
            .and_hms_micro_opt(seconds / 3600, (seconds / 60) % 60, seconds % 60, micros)
            .unwrap();

        let doc = render(
            LogEntry::new(LogLevel::Info, "when")
                .with_extra(LogContext::new().with_field("at", datetime)),
        );

        let raw = doc["at"].as_str().unwrap();
        prop_assert_eq!(raw, format_timestamp(&datetime));
        prop_assert_eq!(parse_timestamp(raw).unwrap(), datetime);
    }

    /// Excluded default fields never appear, whatever the call does
    #[test]
    fn test_excluded_fields_stay_absent(
        excluded in prop::collection::vec(
            prop::sample::select(DefaultField::ALL.to_vec()),
            0..5,
        ),
        flatten in any::<bool>(),
        message in mapping_strategy(),
    ) {
        let formatter = JsonFormatter::new().excluding(excluded.iter().copied());
        let line = formatter
            .format(&LogEntry::new(LogLevel::Error, fields_of(&message)).with_flatten(flatten))
            .unwrap();
        let doc: Value = serde_json::from_str(&line).unwrap();

        for field in DefaultField::ALL {
            let shadowed = flatten && message.contains_key(field.name());
            if excluded.contains(&field) && !shadowed {
                prop_assert!(doc.get(field.name()).is_none());
            } else if !excluded.contains(&field) {
                prop_assert!(doc.get(field.name()).is_some());
            }
        }
    }

    /// Severity names parse back to the same level
    #[test]
    fn test_level_name_round_trip(level in level_strategy()) {
        let parsed: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(parsed, level);
        let lower: LogLevel = level.to_str().to_lowercase().parse().unwrap();
        prop_assert_eq!(lower, level);
    }
}
