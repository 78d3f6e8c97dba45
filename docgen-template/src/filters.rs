//! The closed set of filters (and one test) injected into the Jinja
//! environment. Each is a plain, independently testable Rust function;
//! `environment.rs` wires them into `minijinja::Environment`.

use chrono::NaiveDateTime;
use serde_json::Value;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// `''` for a null/absent timestamp; otherwise parses the portion of an
/// ISO 8601 string before any fractional seconds and formats it with a
/// strftime-style spec.
pub fn datetime_format(iso: Option<&str>, fmt: &str) -> String {
    let Some(iso) = iso else { return String::new() };
    let head = iso.split('.').next().unwrap_or(iso);
    match NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S") {
        Ok(dt) => dt.format(fmt).to_string(),
        Err(_) => String::new(),
    }
}

/// The ordered sequence of `obj[k]` for each `k` in `keys` that `obj`
/// actually contains (an object-valued `obj` is assumed; anything else
/// yields no values).
pub fn extract(obj: &Value, keys: &[String]) -> Vec<Value> {
    let Some(map) = obj.as_object() else {
        return Vec::new();
    };
    keys.iter().filter_map(|k| map.get(k).cloned()).collect()
}

/// Positional bijective base-26 labeling: `0->a, 25->z, 26->aa, 27->ab,
/// 701->zz, 702->aaa`. This is the standard bijective-numeration
/// algorithm (decrement before each division, prepend the digit) rather
/// than a literal port of the source's `divmod`-based loop, which
/// produces `"ab"` for `n=26` and so fails this labeling's own defined
/// boundary at 26.
pub fn of_alphabet(n: i64) -> String {
    let mut n = n + 1;
    let mut result = Vec::new();
    loop {
        n -= 1;
        result.push(ALPHABET[(n % 26) as usize]);
        n /= 26;
        if n == 0 {
            break;
        }
    }
    result.reverse();
    String::from_utf8(result).expect("alphabet is ASCII")
}

const ROMANS: &[(i64, &str)] = &[
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Classical additive Roman numerals for positive `n`; `""` for `n <= 0`.
pub fn roman(mut n: i64) -> String {
    let mut result = String::new();
    while n > 0 {
        for &(value, symbol) in ROMANS {
            while n >= value {
                result.push_str(symbol);
                n -= value;
            }
        }
    }
    result
}

/// Rendered as HTML; list items don't need a preceding blank line to be
/// recognized (CommonMark's own "breakless list" behavior, which is what
/// the reference worker's `mdx_breakless_lists` extension adds on top of
/// stock Python-Markdown). `None` -> `""`.
pub fn markdown(text: Option<&str>) -> String {
    use pulldown_cmark::{html, Options, Parser};
    let Some(text) = text else { return String::new() };
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(text, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// Append `.` unless `text` is blank or already ends with `.`.
pub fn dot(text: &str) -> String {
    if text.ends_with('.') || text.trim().is_empty() {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

/// `path.join('.')` over a sequence of reply path segments.
pub fn reply_path(uuids: &[String]) -> String {
    uuids.join(".")
}

/// A single reply's shape is `{value: {value: X}}`; both levels must be
/// present for the reply to carry a value at all.
fn get_value(reply: &Value) -> Option<&Value> {
    reply.get("value")?.get("value")
}

pub fn reply_str_value(reply: &Value) -> String {
    get_value(reply)
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default()
}

pub fn reply_int_value(reply: &Value) -> i64 {
    get_value(reply).and_then(Value::as_i64).unwrap_or(0)
}

pub fn reply_float_value(reply: &Value) -> f64 {
    get_value(reply).and_then(Value::as_f64).unwrap_or(0.0)
}

pub fn reply_items(reply: &Value) -> Vec<Value> {
    get_value(reply)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Look up `path` (already dot-joined, e.g. via `reply_path`) in the
/// top-level replies map and coerce its value per `xtype` (`"string"`
/// (default), `"int"`, `"float"`, or `"list"`). `None` if the path is
/// absent or carries no value.
pub fn find_reply(replies: &Value, path: &str, xtype: &str) -> Option<Value> {
    let reply = replies.get(path)?;
    let value = get_value(reply)?;
    Some(match xtype {
        "int" => Value::from(value.as_i64().unwrap_or(0)),
        "float" => Value::from(value.as_f64().unwrap_or(0.0)),
        "list" => value.as_array().cloned().map(Value::Array).unwrap_or(Value::Array(vec![])),
        _ => Value::String(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
    })
}

/// Test: `not_empty(x)` — true when `x` has positive length, or is a
/// non-null scalar.
pub fn not_empty(x: &Value) -> bool {
    match x {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn of_alphabet_matches_the_documented_boundaries() {
        assert_eq!(of_alphabet(0), "a");
        assert_eq!(of_alphabet(25), "z");
        assert_eq!(of_alphabet(26), "aa");
        assert_eq!(of_alphabet(27), "ab");
        assert_eq!(of_alphabet(701), "zz");
        assert_eq!(of_alphabet(702), "aaa");
    }

    #[test]
    fn roman_covers_boundary_cases() {
        assert_eq!(roman(0), "");
        assert_eq!(roman(-5), "");
        assert_eq!(roman(4), "IV");
        assert_eq!(roman(1994), "MCMXCIV");
    }

    #[test]
    fn datetime_format_handles_null_and_fractional_seconds() {
        assert_eq!(datetime_format(None, "%Y"), "");
        assert_eq!(
            datetime_format(Some("2023-05-01T12:30:00.123456"), "%Y-%m-%d"),
            "2023-05-01"
        );
    }

    #[test]
    fn dot_is_idempotent_and_skips_blank() {
        assert_eq!(dot("abc"), "abc.");
        assert_eq!(dot("abc."), "abc.");
        assert_eq!(dot("   "), "   ");
    }

    #[test]
    fn extract_preserves_key_order_and_skips_missing() {
        let obj = json!({"a": 1, "b": 2, "c": 3});
        let keys = vec!["c".to_string(), "a".to_string(), "missing".to_string()];
        assert_eq!(extract(&obj, &keys), vec![json!(3), json!(1)]);
    }

    #[test]
    fn reply_value_accessors_unwrap_the_double_nested_shape() {
        let reply = json!({"value": {"value": "hi"}});
        assert_eq!(reply_str_value(&reply), "hi");
        assert_eq!(reply_str_value(&json!({})), "");
        assert_eq!(reply_int_value(&json!({"value": {"value": 3}})), 3);
        assert_eq!(reply_int_value(&json!({})), 0);
    }

    #[test]
    fn find_reply_looks_up_by_dot_joined_path_and_coerces() {
        let replies = json!({"q1.q2": {"value": {"value": "5"}}});
        assert_eq!(reply_path(&["q1".to_string(), "q2".to_string()]), "q1.q2");
        assert_eq!(
            find_reply(&replies, "q1.q2", "string"),
            Some(json!("5"))
        );
        assert_eq!(find_reply(&replies, "missing", "string"), None);
    }

    #[test]
    fn not_empty_treats_null_and_empty_collections_as_empty() {
        assert!(!not_empty(&Value::Null));
        assert!(!not_empty(&json!("")));
        assert!(!not_empty(&json!([])));
        assert!(not_empty(&json!(0)));
        assert!(not_empty(&json!("x")));
    }
}
