//! Field parsers for CI input strings.
//!
//! Every input arrives as a raw string. These helpers turn them into typed
//! values; "absent" is always `None`, never an error, except for booleans
//! where a typo would silently flip deployment behaviour.

use crate::error::{DeployError, DeployResult};
use cfn_deploy_aws::{Parameter, StackTag};
use serde::Deserialize;
use std::collections::BTreeMap;

/// True only for strings that parse as a URL with the `https` scheme.
pub fn is_url(s: &str) -> bool {
    url::Url::parse(s)
        .map(|u| u.scheme() == "https")
        .unwrap_or(false)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsInput {
    List(Vec<TagEntry>),
    Map(BTreeMap<String, String>),
}

#[derive(Deserialize)]
struct TagEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: String,
}

/// Decode a JSON tag blob. Accepts `[{"Key": …, "Value": …}]` and
/// `{"key": "value"}`. Anything undecodable is `None`.
pub fn parse_tags(s: &str) -> Option<Vec<StackTag>> {
    match serde_json::from_str::<TagsInput>(s) {
        Ok(TagsInput::List(entries)) => Some(
            entries
                .into_iter()
                .map(|t| StackTag { key: t.key, value: t.value })
                .collect(),
        ),
        Ok(TagsInput::Map(map)) => Some(
            map.into_iter()
                .map(|(key, value)| StackTag { key, value })
                .collect(),
        ),
        Err(e) => {
            if !s.trim().is_empty() {
                log::debug!("ignoring undecodable tags input: {}", e);
            }
            None
        }
    }
}

/// Comma-separated ARN list; `None` when empty.
pub fn parse_arns(s: &str) -> Option<Vec<String>> {
    if s.is_empty() {
        return None;
    }
    let arns: Vec<String> = s
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();
    if arns.is_empty() {
        None
    } else {
        Some(arns)
    }
}

pub fn parse_string(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Parse a leading integer (`"30min"` is 30). Zero counts as absent.
pub fn parse_number(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let n = digits[..end].parse::<i64>().ok()? * sign;
    if n == 0 {
        None
    } else {
        Some(n)
    }
}

/// `"1"` / `"true"` are true, `"0"` / `"false"` / empty are false.
pub fn parse_bool(field: &str, s: &str) -> DeployResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "" | "0" | "false" => Ok(false),
        other => Err(DeployError::invalid_input(
            field,
            format!("expected one of 1, 0, true, false; got '{}'", other),
        )),
    }
}

/// Split on commas, except inside a value quoted right after its `=`.
///
/// A quote only opens when it starts the value and a matching quote closes
/// the piece (is followed by a comma or the end). Any other quote is a
/// literal character, so `Desc=it's live,Env=prod` still splits.
fn split_unquoted(s: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while start <= s.len() {
        let rest = &s[start..];
        let end = piece_len(rest);
        pieces.push(&rest[..end]);
        start += end + 1;
    }
    pieces
}

fn piece_len(rest: &str) -> usize {
    let plain = rest.find(',').unwrap_or(rest.len());
    let Some(eq) = rest[..plain].find('=') else {
        return plain;
    };
    let value = &rest[eq + 1..];
    let value_start = eq + 1 + (value.len() - value.trim_start().len());
    let quote = match rest[value_start..].chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return plain,
    };

    let mut search = value_start + 1;
    while let Some(offset) = rest[search..].find(quote) {
        let close = search + offset + 1;
        let after = rest[close..].trim_start();
        if after.is_empty() || after.starts_with(',') {
            return rest.len() - after.len();
        }
        search = close;
    }
    plain
}

fn strip_quotes(s: &str) -> &str {
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Parse `Key=Value,Key2=Value2` overrides.
///
/// Values may be quoted to carry commas (`Subnets="a,b"`). A key given more
/// than once gets its values joined with `,` in the order seen; keys keep
/// their first-seen position.
pub fn parse_parameters(s: &str) -> Vec<Parameter> {
    let mut entries: Vec<(String, String)> = Vec::new();

    for piece in split_unquoted(s) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let (key, value) = piece.split_once('=').unwrap_or((piece, ""));
        let key = strip_quotes(key.trim());
        let value = strip_quotes(value.trim());
        if key.is_empty() {
            continue;
        }

        match entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) if existing.is_empty() => *existing = value.to_string(),
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(value);
            }
            None => entries.push((key.to_string(), value.to_string())),
        }
    }

    entries
        .into_iter()
        .map(|(parameter_key, parameter_value)| Parameter {
            parameter_key,
            parameter_value,
        })
        .collect()
}

/// Parse the contents of a parameter file:
/// `[{"ParameterKey": "Env", "ParameterValue": "prod"}]`.
pub fn parse_parameter_file(contents: &str) -> DeployResult<Vec<Parameter>> {
    Ok(serde_json::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_url_requires_https() {
        assert!(is_url("https://x.com"));
        assert!(is_url("https://bucket.s3.amazonaws.com/template.yaml"));
        assert!(!is_url("http://x.com"));
        assert!(!is_url("not a url"));
        assert!(!is_url("./template.yaml"));
        assert!(!is_url(""));
    }

    #[test]
    fn tags_from_map() {
        assert_eq!(parse_tags(r#"{"a":"b"}"#), Some(vec![StackTag::new("a", "b")]));
    }

    #[test]
    fn tags_from_list() {
        let tags = parse_tags(r#"[{"Key":"team","Value":"core"},{"Key":"env","Value":"prod"}]"#).unwrap();
        assert_eq!(tags, vec![StackTag::new("team", "core"), StackTag::new("env", "prod")]);
    }

    #[test]
    fn tags_garbage_is_absent() {
        assert_eq!(parse_tags("not json"), None);
        assert_eq!(parse_tags(""), None);
        assert_eq!(parse_tags(r#"{"a": 1}"#), None);
    }

    #[test]
    fn arns_split_in_order() {
        assert_eq!(
            parse_arns("arn:aws:sns:us-east-1:1:a,arn:aws:sns:us-east-1:1:b"),
            Some(vec!["arn:aws:sns:us-east-1:1:a".to_string(), "arn:aws:sns:us-east-1:1:b".to_string()])
        );
        assert_eq!(parse_arns("single"), Some(vec!["single".to_string()]));
        assert_eq!(parse_arns(""), None);
        assert_eq!(parse_arns(" , "), None);
    }

    #[test]
    fn string_passthrough() {
        assert_eq!(parse_string("role"), Some("role".to_string()));
        assert_eq!(parse_string(""), None);
    }

    #[test]
    fn number_leading_integer() {
        assert_eq!(parse_number("30"), Some(30));
        assert_eq!(parse_number("  15min"), Some(15));
        assert_eq!(parse_number("-5"), Some(-5));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn number_zero_is_absent() {
        assert_eq!(parse_number("0"), None);
        assert_eq!(parse_number("000"), None);
    }

    #[test]
    fn bool_values() {
        assert!(parse_bool("f", "1").unwrap());
        assert!(parse_bool("f", "TRUE").unwrap());
        assert!(!parse_bool("f", "0").unwrap());
        assert!(!parse_bool("f", "").unwrap());
        assert!(!parse_bool("f", "false").unwrap());
        let err = parse_bool("no-execute-changeset", "yes").unwrap_err();
        assert!(err.to_string().contains("no-execute-changeset"));
    }

    #[test]
    fn parameters_repeated_key_concatenates() {
        assert_eq!(parse_parameters("A=1,A=2"), vec![Parameter::new("A", "1,2")]);
    }

    #[test]
    fn parameters_keep_first_seen_order() {
        let params = parse_parameters(" B=x , A=1, B=y ,C=3");
        assert_eq!(
            params,
            vec![Parameter::new("B", "x,y"), Parameter::new("A", "1"), Parameter::new("C", "3")]
        );
    }

    #[test]
    fn parameters_value_may_contain_equals() {
        assert_eq!(
            parse_parameters("Query=a=b"),
            vec![Parameter::new("Query", "a=b")]
        );
    }

    #[test]
    fn parameters_quoted_commas() {
        assert_eq!(
            parse_parameters(r#"Subnets="subnet-1,subnet-2",Env='prod'"#),
            vec![Parameter::new("Subnets", "subnet-1,subnet-2"), Parameter::new("Env", "prod")]
        );
    }

    #[test]
    fn parameters_apostrophe_inside_value_is_literal() {
        assert_eq!(
            parse_parameters("Desc=it's live,Env=prod"),
            vec![Parameter::new("Desc", "it's live"), Parameter::new("Env", "prod")]
        );
    }

    #[test]
    fn parameters_unclosed_quote_is_literal() {
        assert_eq!(
            parse_parameters("A='x,B=2"),
            vec![Parameter::new("A", "'x"), Parameter::new("B", "2")]
        );
    }

    #[test]
    fn parameters_quote_must_close_the_piece() {
        assert_eq!(
            parse_parameters(r#"Msg="say "hi" now",C=3"#),
            vec![Parameter::new("Msg", r#"say "hi" now"#), Parameter::new("C", "3")]
        );
    }

    #[test]
    fn parameters_empty_input() {
        assert!(parse_parameters("").is_empty());
        assert!(parse_parameters(" , ").is_empty());
    }

    #[test]
    fn parameter_file_entries() {
        let params = parse_parameter_file(
            r#"[{"ParameterKey":"Env","ParameterValue":"prod"},{"ParameterKey":"Size","ParameterValue":"2"}]"#,
        )
        .unwrap();
        assert_eq!(params, vec![Parameter::new("Env", "prod"), Parameter::new("Size", "2")]);
        assert!(parse_parameter_file("{}").is_err());
    }
}
