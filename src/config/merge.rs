//! Deep merge over `serde_json::Value` (§4.1 step 3, §8 associativity law).
//!
//! Maps merge recursively, arrays are replaced wholesale, scalars override.

use serde_json::Value;

pub fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

pub fn merge_all(layers: impl IntoIterator<Item = Value>) -> Value {
    let mut result = Value::Object(Default::default());
    for layer in layers {
        merge(&mut result, &layer);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_merge_recursively() {
        let mut base = json!({"a": {"x": 1, "y": 2}});
        let overlay = json!({"a": {"y": 3, "z": 4}});
        merge(&mut base, &overlay);
        assert_eq!(base, json!({"a": {"x": 1, "y": 3, "z": 4}}));
    }

    #[test]
    fn arrays_are_replaced_not_concatenated() {
        let mut base = json!({"a": [1, 2, 3]});
        let overlay = json!({"a": [9]});
        merge(&mut base, &overlay);
        assert_eq!(base, json!({"a": [9]}));
    }

    #[test]
    fn scalars_are_overridden() {
        let mut base = json!({"a": 1});
        let overlay = json!({"a": 2});
        merge(&mut base, &overlay);
        assert_eq!(base, json!({"a": 2}));
    }

    #[test]
    fn merge_is_associative_over_independent_branches() {
        let a = json!({"x": 1});
        let b = json!({"y": 2});
        let c = json!({"z": 3});

        let left = merge_all([merge_all([a.clone(), b.clone()]), c.clone()]);
        let right = merge_all([a, merge_all([b, c])]);
        assert_eq!(left, right);
    }
}
