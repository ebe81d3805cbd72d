//! Canonical JSON rendering for deterministic hashing.
//!
//! The rendering follows these rules:
//! - Object keys sorted by byte comparison, at every depth
//! - Array elements keep their order
//! - Null-valued object members are omitted, so an absent optional field and
//!   an explicit `null` hash identically
//! - Integers in decimal; floats as ECMAScript `Number::toString` prints them:
//!   shortest round-trip digits, plain notation for magnitudes in
//!   `[1e-6, 1e21)` (`500.0` -> `500`, `1e20` -> `100000000000000000000`),
//!   exponent form otherwise (`1e21` -> `1e+21`, `1.5e-7` -> `1.5e-7`)
//! - Strings JSON-escaped, no insignificant whitespace
//!
//! The canonical rendering is critical: producers and verifiers must derive
//! byte-identical input for the same event, or hashes stop matching.

use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::CanonicalizationError;

/// Maximum nesting depth accepted by the canonicalizer.
pub const MAX_DEPTH: usize = 128;

/// Render a JSON value canonically.
pub fn canonicalize(value: &Value) -> Result<String, CanonicalizationError> {
    let mut out = String::new();
    write_value(&mut out, value, 0)?;
    Ok(out)
}

/// Render any serializable value canonically.
pub fn canonicalize_serializable<T: Serialize + ?Sized>(
    value: &T,
) -> Result<String, CanonicalizationError> {
    let value = serde_json::to_value(value)
        .map_err(|e| CanonicalizationError::Unserializable(e.to_string()))?;
    canonicalize(&value)
}

fn write_value(out: &mut String, value: &Value, depth: usize) -> Result<(), CanonicalizationError> {
    if depth > MAX_DEPTH {
        return Err(CanonicalizationError::TooDeep { limit: MAX_DEPTH });
    }

    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s)?,
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, depth + 1)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key)?;
                out.push(':');
                write_value(out, item, depth + 1)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_number(out: &mut String, n: &Number) {
    if n.is_i64() || n.is_u64() {
        out.push_str(&n.to_string());
        return;
    }
    match n.as_f64() {
        Some(f) => write_float(out, f),
        None => out.push_str(&n.to_string()),
    }
}

/// Render a finite float the way ECMAScript `Number::toString` does.
fn write_float(out: &mut String, f: f64) {
    // Also folds -0.0 into 0.
    if f == 0.0 {
        out.push('0');
        return;
    }
    if f < 0.0 {
        out.push('-');
    }

    // Shortest round-trip digits in `d.ddde<x>` form.
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    // value = 0.<digits> * 10^point
    let k = digits.len() as i32;
    let point = exp + 1;

    if k <= point && point <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((point - k) as usize));
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else if -6 < point && point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-point) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        let e = point - 1;
        out.push('e');
        out.push(if e < 0 { '-' } else { '+' });
        out.push_str(&e.abs().to_string());
    }
}

fn write_string(out: &mut String, s: &str) -> Result<(), CanonicalizationError> {
    let escaped =
        serde_json::to_string(s).map_err(|e| CanonicalizationError::Unserializable(e.to_string()))?;
    out.push_str(&escaped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn canon_str(text: &str) -> String {
        let value: Value = serde_json::from_str(text).unwrap();
        canonicalize(&value).unwrap()
    }

    #[test]
    fn test_key_order_independent() {
        assert_eq!(canon_str(r#"{"a":1,"b":2}"#), canon_str(r#"{"b":2,"a":1}"#));
        assert_eq!(canon_str(r#"{"b":2,"a":1}"#), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_nested_objects_sorted_at_every_depth() {
        let left = canon_str(r#"{"z":{"y":{"x":{"b":1,"a":[{"d":4,"c":3}]}}},"m":0}"#);
        let right = canon_str(r#"{"m":0,"z":{"y":{"x":{"a":[{"c":3,"d":4}],"b":1}}}}"#);
        assert_eq!(left, right);
        assert_eq!(left, r#"{"m":0,"z":{"y":{"x":{"a":[{"c":3,"d":4}],"b":1}}}}"#);
    }

    #[test]
    fn test_arrays_keep_order() {
        assert_eq!(canon_str("[3,1,2]"), "[3,1,2]");
        assert_ne!(canon_str("[1,2]"), canon_str("[2,1]"));
    }

    #[test]
    fn test_null_members_omitted() {
        assert_eq!(
            canon_str(r#"{"a":1,"description":null}"#),
            canon_str(r#"{"a":1}"#)
        );
    }

    #[test]
    fn test_null_array_elements_kept() {
        assert_eq!(canon_str("[null,1]"), "[null,1]");
    }

    #[test]
    fn test_scalar_encoding() {
        let value = json!({
            "int": 500,
            "neg": -7,
            "float_integral": 500.0,
            "float": 0.912,
            "small": 0.25,
            "flag": true,
            "text": "line\n\"quoted\" é"
        });
        assert_eq!(
            canonicalize(&value).unwrap(),
            r#"{"flag":true,"float":0.912,"float_integral":500,"int":500,"neg":-7,"small":0.25,"text":"line\n\"quoted\" é"}"#
        );
    }

    #[test]
    fn test_float_rendering_matches_ecmascript() {
        let cases = [
            (1e20, "100000000000000000000"),
            (123_456_789_012_345_678_901.0, "123456789012345680000"),
            (9_007_199_254_740_992.0, "9007199254740992"),
            (1e21, "1e+21"),
            (1.7976931348623157e308, "1.7976931348623157e+308"),
            (123.456, "123.456"),
            (1.5e-5, "0.000015"),
            (1e-6, "0.000001"),
            (1e-7, "1e-7"),
            (1.5e-7, "1.5e-7"),
            (-2.5e-3, "-0.0025"),
            (-1e21, "-1e+21"),
        ];
        for (value, expected) in cases {
            assert_eq!(canonicalize(&json!(value)).unwrap(), expected, "{value:e}");
        }
    }

    #[test]
    fn test_negative_zero_normalized() {
        assert_eq!(canonicalize(&json!(-0.0)).unwrap(), "0");
    }

    #[test]
    fn test_top_level_scalars() {
        assert_eq!(canonicalize(&json!("x")).unwrap(), "\"x\"");
        assert_eq!(canonicalize(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn test_too_deep_rejected() {
        let mut value = json!(1);
        for _ in 0..(MAX_DEPTH + 1) {
            value = json!({ "k": value });
        }
        assert_eq!(
            canonicalize(&value),
            Err(CanonicalizationError::TooDeep { limit: MAX_DEPTH })
        );
    }

    #[test]
    fn test_depth_at_limit_accepted() {
        let mut value = json!(1);
        for _ in 0..MAX_DEPTH {
            value = json!([value]);
        }
        assert!(canonicalize(&value).is_ok());
    }

    #[test]
    fn test_serializable_struct_sorted() {
        #[derive(Serialize)]
        struct Reversed {
            zeta: u8,
            alpha: Option<u8>,
            mid: Vec<u8>,
        }
        let s = canonicalize_serializable(&Reversed {
            zeta: 1,
            alpha: None,
            mid: vec![2, 1],
        })
        .unwrap();
        assert_eq!(s, r#"{"mid":[2,1],"zeta":1}"#);
    }

    #[test]
    fn test_unserializable_map_keys() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], 1);
        assert!(matches!(
            canonicalize_serializable(&map),
            Err(CanonicalizationError::Unserializable(_))
        ));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(5, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-e]{1,3}", inner), 0..5).prop_map(|pairs| {
                    Value::Object(pairs.into_iter().collect())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_canonical_output_reparses_to_same_canonical(value in arb_json()) {
            let first = canonicalize(&value).unwrap();
            let reparsed: Value = serde_json::from_str(&first).unwrap();
            prop_assert_eq!(canonicalize(&reparsed).unwrap(), first);
        }

        #[test]
        fn prop_member_order_irrelevant(pairs in prop::collection::btree_map("[a-z]{1,4}", any::<i32>(), 0..8)) {
            let forward = format!(
                "{{{}}}",
                pairs.iter().map(|(k, v)| format!("\"{k}\":{v}")).collect::<Vec<_>>().join(",")
            );
            let backward = format!(
                "{{{}}}",
                pairs.iter().rev().map(|(k, v)| format!("\"{k}\":{v}")).collect::<Vec<_>>().join(",")
            );
            prop_assert_eq!(canon_str(&forward), canon_str(&backward));
        }
    }
}
