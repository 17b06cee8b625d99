//! Implicit tag resolution for plain scalars.
//!
//! When a scalar carries no explicit tag, its plain text decides the tag: `null`, bool (including
//! the YAML 1.1 `yes`/`no`/`on`/`off` forms), int (decimal, binary, octal, hexadecimal,
//! sexagesimal), float (including `.inf` and `.nan`), timestamp, or the `<<` merge key. Anything
//! that matches no pattern is a string. Quoted scalars are always strings unless explicitly
//! tagged.

use std::sync::OnceLock;

use ordered_float::OrderedFloat;
use regex::Regex;

use peridot_parser::Tag;

/// The URI prefix of the YAML core schema tags.
pub const CORE_SCHEMA_PREFIX: &str = "tag:yaml.org,2002:";

/// Build a core schema [`Tag`] from its suffix.
#[must_use]
pub fn core_tag(suffix: &str) -> Tag {
    Tag {
        handle: CORE_SCHEMA_PREFIX.to_owned(),
        suffix: suffix.to_owned(),
    }
}

/// The ordered pattern table. First match wins.
fn resolvers() -> &'static [(Regex, &'static str)] {
    static RESOLVERS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RESOLVERS.get_or_init(|| {
        // Each pattern is anchored and matches the whole scalar.
        let table: &[(&str, &str)] = &[
            (r"^(?:~|null|Null|NULL|)$", "null"),
            (r"^<<$", "merge"),
            (
                r"^(?:true|True|TRUE|false|False|FALSE|yes|Yes|YES|no|No|NO|on|On|ON|off|Off|OFF)$",
                "bool",
            ),
            // Base-prefixed ints come before decimal so that the leading `0` is not claimed by
            // the decimal pattern.
            (r"^[-+]?0b[0-1_]+$", "int"),
            (r"^[-+]?0o[0-7_]+$", "int"),
            (r"^[-+]?0[0-7_]+$", "int"),
            (r"^[-+]?0x[0-9a-fA-F_]+$", "int"),
            (r"^[-+]?(?:0|[1-9][0-9_]*)$", "int"),
            (r"^[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+$", "int"),
            (r"^[-+]?\.(?:inf|Inf|INF)$", "float"),
            (r"^\.(?:nan|NaN|NAN)$", "float"),
            (
                r"^[-+]?(?:[0-9][0-9_]*)?\.[0-9_]*(?:[eE][-+]?[0-9]+)?$",
                "float",
            ),
            (r"^[-+]?[0-9][0-9_]*[eE][-+]?[0-9]+$", "float"),
            (r"^[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*$", "float"),
            (r"^[0-9][0-9][0-9][0-9]-[0-9][0-9]?-[0-9][0-9]?$", "timestamp"),
            (
                r"^[0-9][0-9][0-9][0-9]-[0-9][0-9]?-[0-9][0-9]?(?:[Tt]|[ \t]+)[0-9][0-9]?:[0-9][0-9]:[0-9][0-9](?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9][0-9]?(?::[0-9][0-9])?))?$",
                "timestamp",
            ),
        ];
        table
            .iter()
            .map(|(pattern, suffix)| {
                (
                    Regex::new(pattern).expect("hardcoded pattern must compile"),
                    *suffix,
                )
            })
            .collect()
    })
}

/// Resolve the implicit tag of a plain scalar from its text.
#[must_use]
pub fn resolve_plain(value: &str) -> Tag {
    for (pattern, suffix) in resolvers() {
        if pattern.is_match(value) {
            return core_tag(suffix);
        }
    }
    core_tag("str")
}

/// Whether emitting `value` as a plain scalar would change its resolved tag away from `!!str`.
#[must_use]
pub fn is_ambiguous_as_plain(value: &str) -> bool {
    resolve_plain(value).suffix != "str"
}

/// A typed view over a scalar node's resolved value.
///
/// This is derived data for callers that want typed values without a reflection layer. Scalars
/// whose text does not parse under their resolved tag (e.g. an overflowing integer), as well as
/// timestamps, fall back to [`ScalarValue::Str`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ScalarValue {
    /// A null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float. `OrderedFloat` keeps the type usable as a mapping key.
    Float(OrderedFloat<f64>),
    /// A string, or any scalar that did not parse under its tag.
    Str(String),
}

/// Parse a scalar's text under its resolved core schema tag.
#[must_use]
pub fn parse_scalar(tag: &Tag, value: &str) -> ScalarValue {
    if !tag.is_yaml_core_schema() {
        return ScalarValue::Str(value.to_owned());
    }
    match tag.suffix.as_str() {
        "null" => ScalarValue::Null,
        "bool" => match value.chars().next() {
            Some('t' | 'T' | 'y' | 'Y') => ScalarValue::Bool(true),
            Some('o' | 'O') => ScalarValue::Bool(matches!(
                value.to_ascii_lowercase().as_str(),
                "on"
            )),
            _ => ScalarValue::Bool(false),
        },
        "int" => match parse_int(value) {
            Some(v) => ScalarValue::Int(v),
            None => ScalarValue::Str(value.to_owned()),
        },
        "float" => match parse_float(value) {
            Some(v) => ScalarValue::Float(OrderedFloat(v)),
            None => ScalarValue::Str(value.to_owned()),
        },
        _ => ScalarValue::Str(value.to_owned()),
    }
}

fn parse_int(value: &str) -> Option<i64> {
    let v = value.replace('_', "");
    let (sign, v) = match v.strip_prefix('-') {
        Some(rest) => (-1i64, rest.to_owned()),
        None => (1i64, v.strip_prefix('+').unwrap_or(&v).to_owned()),
    };
    let magnitude = if let Some(rest) = v.strip_prefix("0b") {
        i64::from_str_radix(rest, 2).ok()?
    } else if let Some(rest) = v.strip_prefix("0o") {
        i64::from_str_radix(rest, 8).ok()?
    } else if let Some(rest) = v.strip_prefix("0x") {
        i64::from_str_radix(rest, 16).ok()?
    } else if v.contains(':') {
        parse_sexagesimal(&v)?
    } else if v.len() > 1 && v.starts_with('0') {
        // YAML 1.1 legacy octal
        i64::from_str_radix(&v[1..], 8).ok()?
    } else {
        v.parse::<i64>().ok()?
    };
    magnitude.checked_mul(sign)
}

/// Parse a base-60 integer (`190:20:30`).
fn parse_sexagesimal(value: &str) -> Option<i64> {
    let mut total = 0i64;
    for part in value.split(':') {
        let digit = part.parse::<i64>().ok()?;
        total = total.checked_mul(60)?.checked_add(digit)?;
    }
    Some(total)
}

#[allow(clippy::cast_precision_loss)]
fn parse_float(value: &str) -> Option<f64> {
    let v = value.replace('_', "");
    let (sign, v) = match v.strip_prefix('-') {
        Some(rest) => (-1f64, rest.to_owned()),
        None => (1f64, v.strip_prefix('+').unwrap_or(&v).to_owned()),
    };
    if v == ".inf" || v == ".Inf" || v == ".INF" {
        return Some(sign * f64::INFINITY);
    }
    if v == ".nan" || v == ".NaN" || v == ".NAN" {
        return Some(f64::NAN);
    }
    if v.contains(':') {
        // Sexagesimal float: all parts but the last are base-60 digits.
        let (head, tail) = v.rsplit_once(':')?;
        let whole = parse_sexagesimal(head)? as f64;
        let frac = tail.parse::<f64>().ok()?;
        return Some(sign * (whole * 60.0 + frac));
    }
    v.parse::<f64>().ok().map(|f| sign * f)
}

#[cfg(test)]
mod tests {
    use super::{parse_scalar, resolve_plain, ScalarValue};
    use ordered_float::OrderedFloat;

    fn suffix(value: &str) -> String {
        resolve_plain(value).suffix
    }

    #[test]
    fn null_forms() {
        for v in ["~", "null", "Null", "NULL", ""] {
            assert_eq!(suffix(v), "null", "{v:?}");
        }
    }

    #[test]
    fn bool_forms_include_yaml_1_1() {
        for v in ["true", "False", "yes", "NO", "on", "Off"] {
            assert_eq!(suffix(v), "bool", "{v:?}");
        }
        // Bare y/n resolve as strings.
        assert_eq!(suffix("y"), "str");
        assert_eq!(suffix("n"), "str");
    }

    #[test]
    fn int_forms() {
        for v in ["0", "12", "-12", "+34", "0b1010", "0o17", "017", "0x1F", "190:20:30"] {
            assert_eq!(suffix(v), "int", "{v:?}");
        }
        // Not a valid octal nor a decimal.
        assert_eq!(suffix("09"), "str");
    }

    #[test]
    fn float_forms() {
        for v in ["1.5", "-2.", ".5", "1e3", "6.8523015e+5", ".inf", "-.Inf", ".nan", "20:30.15"] {
            assert_eq!(suffix(v), "float", "{v:?}");
        }
    }

    #[test]
    fn timestamps() {
        for v in [
            "2001-12-15",
            "2001-12-14t21:59:43.10-05:00",
            "2001-12-14 21:59:43.10 -5",
            "2001-12-15T02:59:43.1Z",
        ] {
            assert_eq!(suffix(v), "timestamp", "{v:?}");
        }
    }

    #[test]
    fn merge_key() {
        assert_eq!(suffix("<<"), "merge");
    }

    #[test]
    fn everything_else_is_a_string() {
        for v in ["hello", "a: b", "12 monkeys", "-", "0x"] {
            assert_eq!(suffix(v), "str", "{v:?}");
        }
    }

    #[test]
    fn typed_values() {
        let check = |text: &str, expected: ScalarValue| {
            let tag = resolve_plain(text);
            assert_eq!(parse_scalar(&tag, text), expected, "{text:?}");
        };
        check("~", ScalarValue::Null);
        check("yes", ScalarValue::Bool(true));
        check("off", ScalarValue::Bool(false));
        check("-42", ScalarValue::Int(-42));
        check("0x1F", ScalarValue::Int(31));
        check("190:20:30", ScalarValue::Int(685_230));
        check("1.5", ScalarValue::Float(OrderedFloat(1.5)));
        check("-.inf", ScalarValue::Float(OrderedFloat(f64::NEG_INFINITY)));
        check("hello", ScalarValue::Str("hello".to_owned()));
    }

    #[test]
    fn int_overflow_falls_back_to_string() {
        let tag = resolve_plain("9223372036854775808");
        assert_eq!(tag.suffix, "int");
        assert_eq!(
            parse_scalar(&tag, "9223372036854775808"),
            ScalarValue::Str("9223372036854775808".to_owned())
        );
    }
}
