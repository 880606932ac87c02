//! Generic rendering for unknown types and values a typed formatter could not read.

use super::fragment::Fragment;
use super::text::{plural, truncate_chars};
use crate::host::scalar_string;
use serde_json::Value;

const SCALAR_CHARS: usize = 60;

/// Collections render as an item-count badge; exports join their scalar
/// members when there are any. Scalars are truncated.
pub fn render(value: &Value) -> Fragment {
    match value {
        Value::Null => Fragment::Empty,
        Value::Array(items) => {
            collection(items.len(), items.iter().filter_map(scalar_string).collect())
        }
        Value::Object(obj) => {
            collection(obj.len(), obj.values().filter_map(scalar_string).collect())
        }
        other => match scalar_string(other) {
            Some(s) => truncate_chars(&s, SCALAR_CHARS),
            None => Fragment::Empty,
        },
    }
}

fn collection(len: usize, scalars: Vec<String>) -> Fragment {
    if len == 0 {
        return Fragment::Empty;
    }
    let plain = if scalars.is_empty() {
        len.to_string()
    } else {
        scalars.join(", ")
    };
    Fragment::alt(Fragment::badge("count", plural(len, "item", "items")), plain)
}
