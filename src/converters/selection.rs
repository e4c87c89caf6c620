//! Static translation of recorded selection scripts.
//!
//! Scripts are never executed. A script made only of recognized comparisons joined
//! with `&&` becomes extra request constraints; anything else is left for review.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionConstraint {
    Query { name: String, value: String },
    Header { name: String, value: String },
    BodyContains(String),
    Operation(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    Static(Vec<SelectionConstraint>),
    Untranslatable,
}

type Build = fn(&Captures<'_>) -> SelectionConstraint;

static COMPARISONS: Lazy<Vec<(Regex, Build)>> = Lazy::new(|| {
    let patterns: [(&str, Build); 4] = [
        (
            r#"^incomingRequest\.getArguments\(\)\.get\(\s*"([^"]+)"\s*\)\.equals\(\s*"([^"]*)"\s*\)$"#,
            |c: &Captures<'_>| SelectionConstraint::Query {
                name: c[1].to_string(),
                value: c[2].to_string(),
            },
        ),
        (
            r#"^incomingRequest\.getMetaData\(\)\.get\(\s*"([^"]+)"\s*\)\.equals\(\s*"([^"]*)"\s*\)$"#,
            |c: &Captures<'_>| SelectionConstraint::Header {
                name: c[1].to_string(),
                value: c[2].to_string(),
            },
        ),
        (
            r#"^incomingRequest\.getBodyText\(\)\.contains\(\s*"([^"]*)"\s*\)$"#,
            |c: &Captures<'_>| SelectionConstraint::BodyContains(c[1].to_string()),
        ),
        (
            r#"^incomingRequest\.getOperation\(\)\.equals\(\s*"([^"]+)"\s*\)$"#,
            |c: &Captures<'_>| SelectionConstraint::Operation(c[1].to_string()),
        ),
    ];

    patterns
        .into_iter()
        .map(|(pattern, build)| (Regex::new(pattern).expect("Invalid regex"), build))
        .collect()
});

fn strip_parens(expr: &str) -> &str {
    let mut expr = expr.trim();
    while expr.starts_with('(') && expr.ends_with(')') && balanced(&expr[1..expr.len() - 1]) {
        expr = expr[1..expr.len() - 1].trim();
    }
    expr
}

fn balanced(expr: &str) -> bool {
    let mut depth = 0i32;
    for c in expr.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn translate_comparison(expr: &str) -> Option<SelectionConstraint> {
    let expr = strip_parens(expr);
    COMPARISONS
        .iter()
        .find_map(|(regex, build)| regex.captures(expr).map(|caps| build(&caps)))
}

/// Translate a selection script into static request constraints
pub fn translate_selection(script: &str) -> SelectionOutcome {
    let mut body = script.trim();
    body = body.strip_prefix("return ").unwrap_or(body).trim();
    body = body.strip_suffix(';').unwrap_or(body).trim();

    if body.is_empty() || body.contains("||") {
        return SelectionOutcome::Untranslatable;
    }

    body.split("&&")
        .map(translate_comparison)
        .collect::<Option<Vec<_>>>()
        .map_or(SelectionOutcome::Untranslatable, SelectionOutcome::Static)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_query_comparison() {
        assert_eq!(
            translate_selection(r#"incomingRequest.getArguments().get("type").equals("premium")"#),
            SelectionOutcome::Static(vec![SelectionConstraint::Query {
                name: "type".to_string(),
                value: "premium".to_string(),
            }])
        );
    }

    #[test]
    fn test_conjunction_with_return_and_parens() {
        let outcome = translate_selection(
            r#"return (incomingRequest.getMetaData().get("X-Tenant").equals("acme")) && incomingRequest.getBodyText().contains("<vip>true</vip>");"#,
        );
        assert_eq!(
            outcome,
            SelectionOutcome::Static(vec![
                SelectionConstraint::Header {
                    name: "X-Tenant".to_string(),
                    value: "acme".to_string(),
                },
                SelectionConstraint::BodyContains("<vip>true</vip>".to_string()),
            ])
        );
    }

    #[test]
    fn test_operation_comparison() {
        assert_eq!(
            translate_selection(r#"incomingRequest.getOperation().equals("getSupplier")"#),
            SelectionOutcome::Static(vec![SelectionConstraint::Operation(
                "getSupplier".to_string()
            )])
        );
    }

    #[test]
    fn test_untranslatable_scripts() {
        for script in [
            r#"incomingRequest.getArguments().get("a").equals("1") || incomingRequest.getArguments().get("b").equals("2")"#,
            r#"Math.random() > 0.5"#,
            r#"!incomingRequest.getBodyText().contains("x")"#,
            "",
        ] {
            assert_eq!(translate_selection(script), SelectionOutcome::Untranslatable, "{}", script);
        }
    }
}
