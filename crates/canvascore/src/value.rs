use serde_json::{Map, Value};

/// Combine upstream results into a single node input.
///
/// No upstream results yields `Null`. Otherwise results are folded in order
/// onto an empty object: objects are shallow-merged with later fields
/// winning, and any result that cannot be merged with the accumulator
/// replaces it.
pub fn merge_inputs<'a, I>(results: I) -> Value
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut results = results.into_iter().peekable();
    if results.peek().is_none() {
        return Value::Null;
    }

    results.fold(Value::Object(Map::new()), |acc, next| match (acc, next) {
        (Value::Object(mut merged), Value::Object(fields)) => {
            merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            Value::Object(merged)
        }
        (_, other) => other.clone(),
    })
}

/// Spread the fields of `overlay` on top of `base` when both are objects.
pub fn spread(base: &mut Map<String, Value>, overlay: &Value) {
    if let Value::Object(fields) = overlay {
        base.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_upstream_is_null() {
        assert_eq!(merge_inputs(std::iter::empty::<&Value>()), Value::Null);
    }

    #[test]
    fn later_sources_win_on_conflict() {
        let first = json!({"a": 1});
        let second = json!({"a": 2, "b": 3});

        assert_eq!(merge_inputs([&first, &second]), json!({"a": 2, "b": 3}));
        assert_eq!(merge_inputs([&second, &first]), json!({"a": 1, "b": 3}));
    }

    #[test]
    fn single_object_is_copied() {
        let only = json!({"message": "Workflow started"});
        assert_eq!(merge_inputs([&only]), only);
    }

    #[test]
    fn last_non_mergeable_value_wins() {
        let object = json!({"a": 1});
        let text = json!("plain");
        let number = json!(7);

        assert_eq!(merge_inputs([&object, &text]), json!("plain"));
        assert_eq!(merge_inputs([&text, &number]), json!(7));
        assert_eq!(merge_inputs([&text, &object]), json!({"a": 1}));
    }

    #[test]
    fn spread_only_merges_objects() {
        let mut base = Map::new();
        base.insert("testResult".into(), json!("ok"));

        spread(&mut base, &json!("ignored"));
        assert_eq!(base.len(), 1);

        spread(&mut base, &json!({"testResult": "overridden", "question": "ping"}));
        assert_eq!(base["testResult"], json!("overridden"));
        assert_eq!(base["question"], json!("ping"));
    }
}
