//! Property tests for the parsing and display helpers.

use std::collections::HashMap;

use listenpost_tasks::{
    display_options, parse_options_str, parse_result_batch, Task, TaskSpec,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Option keys that can never collide with the named wire fields and
/// survive trimming untouched.
fn option_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}"
}

/// Values free of the `,` and `=` separators and of surrounding whitespace.
fn option_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_./-]{0,12}"
}

proptest! {
    #[test]
    fn options_string_parses_back_to_map(
        options in prop::collection::hash_map(option_key(), option_value(), 0..8)
    ) {
        let joined = options
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let parsed = parse_options_str(&joined).unwrap();
        prop_assert_eq!(parsed, options);
    }

    #[test]
    fn display_options_is_sorted_and_complete(
        options in prop::collection::hash_map(option_key(), option_value(), 0..8)
    ) {
        let display = display_options(&options);
        prop_assert_eq!(display.len(), options.len());
        let mut sorted = display.clone();
        sorted.sort();
        prop_assert_eq!(&display, &sorted);
        for line in &display {
            let (key, value) = line.split_once(": ").unwrap_or((line.as_str(), ""));
            prop_assert_eq!(options.get(key).map(String::as_str), Some(value));
        }
    }

    #[test]
    fn task_wire_form_round_trips(
        task_type in "[a-z]{1,12}",
        options in prop::collection::hash_map(option_key(), option_value(), 0..8)
    ) {
        let task = Task::new(TaskSpec { task_type, options });
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, task);
    }

    #[test]
    fn result_batch_parse_preserves_scalar_payloads(
        task_id in "[a-f0-9]{8}",
        payload in prop::collection::hash_map(option_key(), option_value(), 0..6)
    ) {
        let mut wire_payload = Map::new();
        for (k, v) in &payload {
            wire_payload.insert(k.clone(), Value::String(v.clone()));
        }
        let body = json!([{ task_id.clone(): wire_payload }]);

        let batch = parse_result_batch(&body).unwrap();
        prop_assert_eq!(batch.len(), 1);
        prop_assert_eq!(&batch[0].task_id, &task_id);
        let fields: HashMap<_, _> = batch[0].fields.clone();
        prop_assert_eq!(fields, payload);
    }

    #[test]
    fn option_string_without_separator_always_rejected(
        segment in "[a-z]{1,12}"
    ) {
        prop_assert!(parse_options_str(&segment).is_err());
    }
}
