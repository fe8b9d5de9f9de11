use serde_json::Value;

/// One leaf-level change: dotted path, old value, new value.
pub(crate) type Change = (String, Value, Value);

/// Collect leaf changes between two JSON documents. Arrays are compared by
/// index so a changed stage runtime shows up as `stages.0.runTime`.
pub(crate) fn diff_json(
    previous: &Value,
    current: &Value,
    path_prefix: &str,
    changes: &mut Vec<Change>,
) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = join(path_prefix, key);
                match prev_map.get(key) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None => {
                        if curr_val.is_object() {
                            let empty = Value::Object(serde_json::Map::new());
                            diff_json(&empty, curr_val, &path, changes);
                        } else {
                            changes.push((path, Value::Null, curr_val.clone()));
                        }
                    }
                }
            }
            for (key, prev_val) in prev_map {
                if !curr_map.contains_key(key) {
                    changes.push((join(path_prefix, key), prev_val.clone(), Value::Null));
                }
            }
        }
        (Value::Array(prev_arr), Value::Array(curr_arr)) if prev_arr.len() == curr_arr.len() => {
            for (idx, (p, c)) in prev_arr.iter().zip(curr_arr).enumerate() {
                diff_json(p, c, &join(path_prefix, &idx.to_string()), changes);
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((path_prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
