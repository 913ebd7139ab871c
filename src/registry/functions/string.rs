//! String filters
//!
//! Values that are not strings pass through unchanged unless noted.

use super::{arg, arg_i64, parse_arg_value};
use crate::model::Value;
use crate::registry::transformer::{FilterError, FilterRegistry, FilterResult, Transformer};
use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

fn map_str(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

fn trim_set<'a>(s: &'a str, chars: Option<&String>, start: bool, end: bool) -> &'a str {
    let matches = |c: char| match chars {
        Some(set) => set.contains(c),
        None => c.is_whitespace(),
    };
    let s = if start { s.trim_start_matches(matches) } else { s };
    if end { s.trim_end_matches(matches) } else { s }
}

/// `trim[:chars]` removes whitespace, or the given characters, from both ends
pub struct TrimFilter;

impl Transformer for TrimFilter {
    fn name(&self) -> &str {
        "trim"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (0, Some(1))
    }
    fn documentation(&self) -> &str {
        "Strip whitespace or the given characters from both ends"
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        Ok(map_str(value, |s| trim_set(s, args.first(), true, true).to_string()))
    }
}

/// `ltrim[:chars]`
pub struct LtrimFilter;

impl Transformer for LtrimFilter {
    fn name(&self) -> &str {
        "ltrim"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (0, Some(1))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        Ok(map_str(value, |s| trim_set(s, args.first(), true, false).to_string()))
    }
}

/// `rtrim[:chars]`
pub struct RtrimFilter;

impl Transformer for RtrimFilter {
    fn name(&self) -> &str {
        "rtrim"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (0, Some(1))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        Ok(map_str(value, |s| trim_set(s, args.first(), false, true).to_string()))
    }
}

/// `upper`
pub struct UpperFilter;

impl Transformer for UpperFilter {
    fn name(&self) -> &str {
        "upper"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(map_str(value, str::to_uppercase))
    }
}

/// `lower`
pub struct LowerFilter;

impl Transformer for LowerFilter {
    fn name(&self) -> &str {
        "lower"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(map_str(value, str::to_lowercase))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `ucfirst` upper-cases the first character
pub struct UcfirstFilter;

impl Transformer for UcfirstFilter {
    fn name(&self) -> &str {
        "ucfirst"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(map_str(value, capitalize))
    }
}

/// `title` upper-cases the first character of every word
pub struct TitleFilter;

impl Transformer for TitleFilter {
    fn name(&self) -> &str {
        "title"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        Ok(map_str(value, |s| {
            let mut out = String::with_capacity(s.len());
            let mut at_word_start = true;
            for c in s.chars() {
                if at_word_start && !c.is_whitespace() {
                    out.extend(c.to_uppercase());
                } else {
                    out.push(c);
                }
                at_word_start = c.is_whitespace();
            }
            out
        }))
    }
}

/// `slug[:separator]` lower-cases and joins alphanumeric runs with `-`
pub struct SlugFilter;

impl Transformer for SlugFilter {
    fn name(&self) -> &str {
        "slug"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (0, Some(1))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let separator = args.first().map_or("-", String::as_str);
        Ok(map_str(value, |s| {
            NON_ALPHANUMERIC
                .split(&s.to_lowercase())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(separator)
        }))
    }
}

/// `replace:search:replacement`
pub struct ReplaceFilter;

impl Transformer for ReplaceFilter {
    fn name(&self) -> &str {
        "replace"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (2, Some(2))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let search = arg(self.name(), args, 0)?;
        let replacement = arg(self.name(), args, 1)?;
        if search.is_empty() {
            return Ok(value);
        }
        Ok(map_str(value, |s| s.replace(search, replacement)))
    }
}

/// `regex_replace:pattern:replacement`
pub struct RegexReplaceFilter;

impl Transformer for RegexReplaceFilter {
    fn name(&self) -> &str {
        "regex_replace"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (2, Some(2))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let pattern = Regex::new(arg(self.name(), args, 0)?)
            .map_err(|e| FilterError::invalid_argument(self.name(), e.to_string()))?;
        let replacement = arg(self.name(), args, 1)?;
        Ok(map_str(value, |s| pattern.replace_all(s, replacement).into_owned()))
    }
}

fn affix(value: Value, f: impl FnOnce(String) -> String) -> Value {
    match value {
        Value::Null => Value::Null,
        scalar if !scalar.is_container() => Value::String(f(scalar.to_display_string())),
        container => container,
    }
}

/// `prefix:text` prepends text to any non-null scalar
pub struct PrefixFilter;

impl Transformer for PrefixFilter {
    fn name(&self) -> &str {
        "prefix"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let prefix = arg(self.name(), args, 0)?;
        Ok(affix(value, |s| format!("{prefix}{s}")))
    }
}

/// `suffix:text` appends text to any non-null scalar
pub struct SuffixFilter;

impl Transformer for SuffixFilter {
    fn name(&self) -> &str {
        "suffix"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let suffix = arg(self.name(), args, 0)?;
        Ok(affix(value, |s| format!("{s}{suffix}")))
    }
}

/// `substr:start[:length]`, character based; negative values count from the end
pub struct SubstrFilter;

impl Transformer for SubstrFilter {
    fn name(&self) -> &str {
        "substr"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(2))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let start = arg_i64(self.name(), arg(self.name(), args, 0)?)?;
        let length = args
            .get(1)
            .map(|arg| arg_i64(self.name(), arg))
            .transpose()?;

        Ok(map_str(value, |s| {
            let chars: Vec<char> = s.chars().collect();
            let total = chars.len() as i64;
            let from = if start < 0 { (total + start).max(0) } else { start.min(total) };
            let to = match length {
                Some(len) if len < 0 => (total + len).max(from),
                Some(len) => from.saturating_add(len).min(total),
                None => total,
            };
            chars[from as usize..to as usize].iter().collect()
        }))
    }
}

/// `length` counts characters of a string or entries of a container
pub struct LengthFilter;

impl Transformer for LengthFilter {
    fn name(&self) -> &str {
        "length"
    }
    fn transform(&self, value: Value, _args: &[String]) -> FilterResult<Value> {
        let length = match &value {
            Value::Null => 0,
            Value::String(s) => s.chars().count(),
            other => match other.as_container() {
                Some(container) => container.len(),
                None => other.to_display_string().chars().count(),
            },
        };
        Ok(Value::from(length))
    }
}

/// `default:value` replaces null or an empty string
pub struct DefaultFilter;

impl Transformer for DefaultFilter {
    fn name(&self) -> &str {
        "default"
    }
    fn arity(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }
    fn transform(&self, value: Value, args: &[String]) -> FilterResult<Value> {
        let fallback = arg(self.name(), args, 0)?;
        match &value {
            Value::Null => Ok(parse_arg_value(fallback)),
            Value::String(s) if s.is_empty() => Ok(parse_arg_value(fallback)),
            _ => Ok(value),
        }
    }
}

/// Register all string filters
pub fn register_string_filters(registry: &mut FilterRegistry) {
    registry.register(TrimFilter);
    registry.register(LtrimFilter);
    registry.register(RtrimFilter);
    registry.register(UpperFilter);
    registry.register(LowerFilter);
    registry.register(UcfirstFilter);
    registry.register(TitleFilter);
    registry.register(SlugFilter);
    registry.register(ReplaceFilter);
    registry.register(RegexReplaceFilter);
    registry.register(PrefixFilter);
    registry.register(SuffixFilter);
    registry.register(SubstrFilter);
    registry.register(LengthFilter);
    registry.register(DefaultFilter);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn apply(filter: &dyn Transformer, input: &str, args: &[&str]) -> Value {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        filter.transform(Value::from(input), &args).unwrap()
    }

    #[rstest]
    #[case(&TrimFilter, "  hi  ", &[], "hi")]
    #[case(&TrimFilter, "--hi--", &["-"], "hi")]
    #[case(&LtrimFilter, "  hi  ", &[], "hi  ")]
    #[case(&RtrimFilter, "xxhixx", &["x"], "xxhi")]
    #[case(&UpperFilter, "abc", &[], "ABC")]
    #[case(&LowerFilter, "ÄBC", &[], "äbc")]
    #[case(&UcfirstFilter, "hello world", &[], "Hello world")]
    #[case(&TitleFilter, "hello  big world", &[], "Hello  Big World")]
    #[case(&SlugFilter, "Hello, World! 2024", &[], "hello-world-2024")]
    #[case(&SlugFilter, "Hello World", &["_"], "hello_world")]
    #[case(&ReplaceFilter, "a-b-c", &["-", "+"], "a+b+c")]
    #[case(&RegexReplaceFilter, "a1b22c", &[r"\d+", "#"], "a#b#c")]
    #[case(&PrefixFilter, "42", &["ID-"], "ID-42")]
    #[case(&SuffixFilter, "5", &["px"], "5px")]
    #[case(&SubstrFilter, "abcdef", &["1", "3"], "bcd")]
    #[case(&SubstrFilter, "abcdef", &["-2"], "ef")]
    #[case(&SubstrFilter, "abcdef", &["2", "-1"], "cde")]
    #[case(&SubstrFilter, "abc", &["10"], "")]
    #[case(&SubstrFilter, "abcdef", &["2", "9223372036854775807"], "cdef")]
    #[case(&SubstrFilter, "abcdef", &["-9223372036854775808", "-9223372036854775808"], "")]
    fn test_string_filters(
        #[case] filter: &dyn Transformer,
        #[case] input: &str,
        #[case] args: &[&str],
        #[case] expected: &str,
    ) {
        assert_eq!(apply(filter, input, args), Value::from(expected));
    }

    #[test]
    fn test_non_strings_pass_through() {
        assert_eq!(UpperFilter.transform(Value::Int(3), &[]), Ok(Value::Int(3)));
        assert_eq!(TrimFilter.transform(Value::Null, &[]), Ok(Value::Null));
        assert_eq!(
            PrefixFilter.transform(Value::Int(3), &["#".to_string()]),
            Ok(Value::from("#3"))
        );
    }

    #[test]
    fn test_length_and_default() {
        assert_eq!(LengthFilter.transform(Value::from("héllo"), &[]), Ok(Value::Int(5)));
        assert_eq!(
            LengthFilter.transform(Value::from(vec![1, 2, 3]), &[]),
            Ok(Value::Int(3))
        );
        assert_eq!(
            DefaultFilter.transform(Value::Null, &["0".to_string()]),
            Ok(Value::Int(0))
        );
        assert_eq!(
            DefaultFilter.transform(Value::from(""), &["n/a".to_string()]),
            Ok(Value::from("n/a"))
        );
    }

    #[rstest]
    #[case(&ReplaceFilter, &["-"])]
    #[case(&RegexReplaceFilter, &[])]
    #[case(&PrefixFilter, &[])]
    #[case(&SuffixFilter, &[])]
    #[case(&SubstrFilter, &[])]
    #[case(&DefaultFilter, &[])]
    fn test_missing_arguments_are_errors(#[case] filter: &dyn Transformer, #[case] args: &[&str]) {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        assert!(matches!(
            filter.transform(Value::from("x"), &args),
            Err(FilterError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_invalid_regex() {
        let args = vec!["(".to_string(), "".to_string()];
        assert!(matches!(
            RegexReplaceFilter.transform(Value::from("x"), &args),
            Err(FilterError::InvalidArgument { .. })
        ));
    }
}
