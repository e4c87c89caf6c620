//! Translation of embedded helper expressions into WireMock response templates.
//!
//! Recognized calls are described by [`HELPER_CATALOG`]; everything about a helper
//! (name, parameters, output) lives in that table so adding one is a data change.
//! https://wiremock.org/docs/response-templating/

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;

/// Kind of a helper argument; decides validation and normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Text,
    Integer,
    /// Day offset such as `+1D` or `-3`
    DayOffset,
}

#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub kind: ArgKind,
    pub default: Option<&'static str>,
}

impl Param {
    const fn required(kind: ArgKind) -> Self {
        Self {
            kind,
            default: None,
        }
    }

    const fn optional(kind: ArgKind, default: &'static str) -> Self {
        Self {
            kind,
            default: Some(default),
        }
    }
}

/// One supported helper.
///
/// `template` refers to arguments as `$0`, `$1`, ...; `$*` expands to every
/// variadic argument, each single-quoted.
#[derive(Debug, Clone, Copy)]
pub struct HelperSpec {
    pub name: &'static str,
    pub params: &'static [Param],
    /// Kind of the trailing variadic arguments, if any
    pub rest: Option<ArgKind>,
    pub template: &'static str,
}

impl HelperSpec {
    pub fn min_args(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }

    pub fn max_args(&self) -> Option<usize> {
        self.rest.is_none().then_some(self.params.len())
    }

    fn accepts(&self, count: usize) -> bool {
        count >= self.min_args() && self.max_args().is_none_or(|max| count <= max)
    }
}

pub static HELPER_CATALOG: &[HelperSpec] = &[
    HelperSpec {
        name: "doDateDeltaFromCurrent",
        params: &[
            Param::required(ArgKind::Text),
            Param::optional(ArgKind::DayOffset, "+0D"),
        ],
        rest: None,
        template: "{{now offset='$1 days' format='$0'}}",
    },
    HelperSpec {
        name: "doRandomString",
        params: &[Param::required(ArgKind::Integer)],
        rest: None,
        template: "{{randomValue type='ALPHANUMERIC' length='$0'}}",
    },
    HelperSpec {
        name: "doRandomNumber",
        params: &[
            Param::required(ArgKind::Integer),
            Param::required(ArgKind::Integer),
        ],
        rest: None,
        template: "{{randomInt lower=$0 upper=$1}}",
    },
    HelperSpec {
        name: "doRandomBoolean",
        params: &[],
        rest: None,
        template: "{{pickRandom true false}}",
    },
    HelperSpec {
        name: "doRandomEmail",
        params: &[],
        rest: None,
        template: "{{random 'Internet.safeEmailAddress'}}",
    },
    HelperSpec {
        name: "doRandomSSN",
        params: &[],
        rest: None,
        template: "{{random 'IdNumber.ssnValid'}}",
    },
    HelperSpec {
        name: "doRandomCreditCard",
        params: &[],
        rest: None,
        template: "{{random 'Business.creditCardNumber'}}",
    },
    HelperSpec {
        name: "doRandomFromList",
        params: &[Param::required(ArgKind::Text)],
        rest: Some(ArgKind::Text),
        template: "{{pickRandom $*}}",
    },
    HelperSpec {
        name: "doUUID",
        params: &[],
        rest: None,
        template: "{{randomValue type='UUID'}}",
    },
];

/// Prefix of request-field references, `{{=request_a_b}}`
const REQUEST_REFERENCE_PREFIX: &str = "request_";
const REQUEST_REFERENCE_TEMPLATE: &str = "{{xPath request.body '//$0/text()'}}";

/// Opening of a helper call, `{{=name`
static CALL_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{=\s*(?P<name>[A-Za-z_][A-Za-z0-9_.]*)\s*")
        .expect("helper call head pattern is valid")
});

/// Closing of a helper call: optional `;` and `/*comment*/` before `}}`
static CALL_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*;?\s*(?:/\*.*?\*/)?\s*\}\}")
        .expect("helper call tail pattern is valid")
});

static TEMPLATE_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d+|\*)").expect("template slot pattern is valid"));

static INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("integer pattern is valid"));

static DAY_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-]?\d+)\s*[dD]?$").expect("day offset pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslateMode {
    #[default]
    Lenient,
    Strict,
}

/// Result of translating one piece of text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Translation {
    pub text: String,
    pub translated: usize,
    /// Source text of every call that was replaced by a sentinel
    pub unsupported: Vec<String>,
}

impl Translation {
    pub fn is_complete(&self) -> bool {
        self.unsupported.is_empty()
    }
}

/// An unrecognized call met in strict mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedHelper {
    pub call: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HelperTranslator {
    mode: TranslateMode,
}

impl HelperTranslator {
    pub fn new(mode: TranslateMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> TranslateMode {
        self.mode
    }

    /// Rewrite every helper call in `text`, replacing from the end so earlier
    /// offsets stay valid
    pub fn translate(&self, text: &str) -> Result<Translation, UnsupportedHelper> {
        let mut replacements = Vec::new();
        let mut unsupported = Vec::new();

        for call in scan_calls(text) {
            match render_call(&call) {
                Some(rendered) => replacements.push((call.range.clone(), rendered)),
                None => {
                    let source = text[call.range.clone()].to_string();
                    if self.mode == TranslateMode::Strict {
                        return Err(UnsupportedHelper { call: source });
                    }
                    replacements.push((call.range.clone(), call.sentinel()));
                    unsupported.push(source);
                }
            }
        }

        let translated = replacements.len() - unsupported.len();
        let mut out = text.to_string();
        for (range, replacement) in replacements.into_iter().rev() {
            out.replace_range(range, &replacement);
        }

        Ok(Translation {
            text: out,
            translated,
            unsupported,
        })
    }
}

/// One `{{=...}}` occurrence found in text
#[derive(Debug, Clone, PartialEq, Eq)]
struct Call<'t> {
    range: Range<usize>,
    name: &'t str,
    args: Option<&'t str>,
    /// Set when the text between `{{=` and `}}` is not a well-formed call
    malformed: bool,
}

impl Call<'_> {
    fn sentinel(&self) -> String {
        match self.args {
            Some(args) => format!("[UNSUPPORTED: {}({})]", self.name, args.trim()),
            None => format!("[UNSUPPORTED: {}]", self.name),
        }
    }
}

/// Find every helper call in `text`, in order.
///
/// Argument lists are scanned for the matching `)` outside quotes, so quoted
/// or nested parentheses stay inside the call. A `{{=` that does not form a
/// well-formed call up to the next `}}` is still reported, as malformed.
fn scan_calls(text: &str) -> Vec<Call<'_>> {
    let mut calls = Vec::new();
    let mut pos = 0;

    while let Some(start) = text[pos..].find("{{=").map(|i| pos + i) {
        match parse_call(text, start) {
            Some(call) => {
                pos = call.range.end;
                calls.push(call);
            }
            None => {
                let Some(close) = text[start..].find("}}").map(|i| start + i + 2) else {
                    break;
                };
                calls.push(Call {
                    range: start..close,
                    name: text[start + 3..close - 2].trim(),
                    args: None,
                    malformed: true,
                });
                pos = close;
            }
        }
    }
    calls
}

fn parse_call(text: &str, start: usize) -> Option<Call<'_>> {
    let head = CALL_HEAD.captures_at(text, start)?;
    let whole = head.get(0)?;
    if whole.start() != start {
        return None;
    }
    let name = head.name("name")?.as_str();

    let mut end = whole.end();
    let mut args = None;
    if text[end..].starts_with('(') {
        let close = matching_paren(text, end)?;
        args = Some(&text[end + 1..close]);
        end = close + 1;
    }
    let tail = CALL_TAIL.find(&text[end..])?;

    Some(Call {
        range: start..end + tail.end(),
        name,
        args,
        malformed: false,
    })
}

/// Offset of the `)` closing the `(` at `open`, skipping quoted text
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (offset, c) in text[open..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            (None, '}') if text[open + offset..].starts_with("}}") => return None,
            _ => {}
        }
    }
    None
}

fn render_call(call: &Call<'_>) -> Option<String> {
    if call.malformed {
        return None;
    }
    let name = call.name;

    let Some(raw_args) = call.args else {
        let field = name.strip_prefix(REQUEST_REFERENCE_PREFIX)?;
        if field.is_empty() {
            return None;
        }
        return Some(REQUEST_REFERENCE_TEMPLATE.replace("$0", &field.replace('_', "/")));
    };

    let spec = HELPER_CATALOG.iter().find(|spec| spec.name == name)?;
    let args = split_args(&decode_entities(raw_args));
    if !spec.accepts(args.len()) {
        return None;
    }

    let mut values = Vec::with_capacity(spec.params.len().max(args.len()));
    for (index, param) in spec.params.iter().enumerate() {
        let raw = match args.get(index) {
            Some(arg) => arg.as_str(),
            None => param.default?,
        };
        values.push(normalize(param.kind, raw)?);
    }
    let mut rest = Vec::new();
    if let Some(kind) = spec.rest {
        for arg in args.iter().skip(spec.params.len()) {
            rest.push(normalize(kind, arg)?);
        }
    }

    // Variadic helpers quote every argument, including the leading required ones
    let variadic: Vec<String> = values
        .iter()
        .chain(rest.iter())
        .map(|v| format!("'{}'", v))
        .collect();

    Some(
        TEMPLATE_SLOT
            .replace_all(spec.template, |slot: &Captures<'_>| match &slot[1] {
                "*" => variadic.join(" "),
                index => index
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| values.get(i))
                    .cloned()
                    .unwrap_or_default(),
            })
            .into_owned(),
    )
}

fn normalize(kind: ArgKind, raw: &str) -> Option<String> {
    match kind {
        ArgKind::Text => Some(raw.to_string()),
        ArgKind::Integer => INTEGER
            .is_match(raw)
            .then(|| raw.trim_start_matches('+').to_string()),
        ArgKind::DayOffset => DAY_OFFSET.captures(raw).map(|c| c[1].to_string()),
    }
}

/// Undo HTML entity encoding of quotes and markup characters
fn decode_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Split an argument list on commas outside quotes, stripping surrounding quotes
fn split_args(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in raw.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => quote = Some(c),
            (None, ',') => args.push(std::mem::take(&mut current).trim().to_string()),
            (None, c) => current.push(c),
        }
    }
    args.push(current.trim().to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient(text: &str) -> Translation {
        HelperTranslator::new(TranslateMode::Lenient)
            .translate(text)
            .unwrap()
    }

    #[test]
    fn test_date_delta_forms() {
        let expected = "{{now offset='+1 days' format='yyyy-MM-dd'}}";
        for source in [
            r#"{{=doDateDeltaFromCurrent("yyyy-MM-dd","+1D")}}"#,
            r#"{{=doDateDeltaFromCurrent("yyyy-MM-dd","+1D");}}"#,
            r#"{{=doDateDeltaFromCurrent(&quot;yyyy-MM-dd&quot;,&quot;+1D&quot;);/*tomorrow*/}}"#,
        ] {
            let t = lenient(source);
            assert_eq!(t.text, expected, "source: {}", source);
            assert_eq!(t.translated, 1);
        }
        assert_eq!(
            lenient(r#"{{=doDateDeltaFromCurrent("MM/dd")}}"#).text,
            "{{now offset='+0 days' format='MM/dd'}}"
        );
    }

    #[test]
    fn test_random_helpers() {
        let cases = [
            ("{{=doRandomString(10)}}", "{{randomValue type='ALPHANUMERIC' length='10'}}"),
            ("{{=doRandomNumber(18, 65)}}", "{{randomInt lower=18 upper=65}}"),
            ("{{=doRandomBoolean()}}", "{{pickRandom true false}}"),
            ("{{=doRandomEmail()}}", "{{random 'Internet.safeEmailAddress'}}"),
            ("{{=doRandomSSN()}}", "{{random 'IdNumber.ssnValid'}}"),
            ("{{=doRandomCreditCard()}}", "{{random 'Business.creditCardNumber'}}"),
            ("{{=doUUID()}}", "{{randomValue type='UUID'}}"),
            (
                r#"{{=doRandomFromList("red", "green", "blue")}}"#,
                "{{pickRandom 'red' 'green' 'blue'}}",
            ),
        ];
        for (source, expected) in cases {
            assert_eq!(lenient(source).text, expected, "source: {}", source);
        }
    }

    #[test]
    fn test_request_reference() {
        assert_eq!(
            lenient("{{=request_user_id}}").text,
            "{{xPath request.body '//user/id/text()'}}"
        );
        assert_eq!(
            lenient("{{=request_order;/*from body*/}}").text,
            "{{xPath request.body '//order/text()'}}"
        );
    }

    #[test]
    fn test_multiple_calls_replaced_right_to_left() {
        let t = lenient(
            r#"{"id": "{{=doUUID()}}", "n": {{=doRandomNumber(1,9)}}, "x": "{{=doNope()}}"}"#,
        );
        assert_eq!(
            t.text,
            concat!(
                r#"{"id": "{{randomValue type='UUID'}}", "n": {{randomInt lower=1 upper=9}}, "#,
                r#""x": "[UNSUPPORTED: doNope()]"}"#
            )
        );
        assert_eq!(t.translated, 2);
        assert_eq!(t.unsupported, vec!["{{=doNope()}}".to_string()]);
        assert!(!t.is_complete());
    }

    #[test]
    fn test_bad_arity_or_arguments_are_unsupported() {
        let t = lenient("{{=doRandomNumber(1)}} {{=doRandomString(abc)}}");
        assert_eq!(
            t.text,
            "[UNSUPPORTED: doRandomNumber(1)] [UNSUPPORTED: doRandomString(abc)]"
        );
        assert_eq!(t.unsupported.len(), 2);
    }

    #[test]
    fn test_parentheses_inside_arguments() {
        let t = lenient(r#"x={{=doRandomFromList("a (1)","b")}} y={{=doMystery(f(1))}}"#);
        assert_eq!(
            t.text,
            "x={{pickRandom 'a (1)' 'b'}} y=[UNSUPPORTED: doMystery(f(1))]"
        );
        assert_eq!(t.translated, 1);
        assert_eq!(t.unsupported, vec!["{{=doMystery(f(1))}}".to_string()]);

        let err = HelperTranslator::new(TranslateMode::Strict)
            .translate("y={{=doMystery(f(1))}}")
            .unwrap_err();
        assert_eq!(err.call, "{{=doMystery(f(1))}}");
    }

    #[test]
    fn test_malformed_call_is_unsupported() {
        let t = lenient("a {{=doRandomNumber(1, 2}} b {{=doUUID() trailing}} c");
        assert_eq!(
            t.text,
            "a [UNSUPPORTED: doRandomNumber(1, 2] b [UNSUPPORTED: doUUID() trailing] c"
        );
        assert_eq!(t.translated, 0);
        assert_eq!(t.unsupported.len(), 2);

        assert!(
            HelperTranslator::new(TranslateMode::Strict)
                .translate("{{=doUUID() trailing}}")
                .is_err()
        );
    }

    #[test]
    fn test_strict_mode_fails_on_unknown_helper() {
        let err = HelperTranslator::new(TranslateMode::Strict)
            .translate("ok {{=doUUID()}} then {{=doUnknownHelper()}}")
            .unwrap_err();
        assert_eq!(err.call, "{{=doUnknownHelper()}}");
    }

    #[test]
    fn test_text_without_helpers_is_untouched() {
        let t = lenient("{{request.path}} and {{ plain }}");
        assert_eq!(t.text, "{{request.path}} and {{ plain }}");
        assert_eq!(t.translated, 0);
        assert!(t.is_complete());
    }

    #[test]
    fn test_catalog_arity() {
        let date = HELPER_CATALOG
            .iter()
            .find(|s| s.name == "doDateDeltaFromCurrent")
            .unwrap();
        assert_eq!((date.min_args(), date.max_args()), (1, Some(2)));
        let list = HELPER_CATALOG.iter().find(|s| s.name == "doRandomFromList").unwrap();
        assert_eq!((list.min_args(), list.max_args()), (1, None));
    }
}
