//! The public entry point: parse a JSONata expression once, then evaluate it
//! against any number of input documents. Mirrors the two-phase
//! parse/evaluate split of the reference implementation's `JsonAta` class,
//! but works in terms of this crate's `Value`/`Environment`/`Options` types
//! rather than a borrowed JSON tree.

use log::debug;

use crate::ast::Node;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::options::{CancellationToken, Options};
use crate::value::{self, Value};

/// A parsed JSONata expression, ready to evaluate.
pub struct JsonAta {
    ast: Node,
    /// Parse errors collected when `Options::recover` is set and parsing
    /// failed; the AST in that case is a placeholder, not a best-effort
    /// reparse (this parser has no partial-parse recovery machinery).
    errors: Vec<Error>,
    bindings: Vec<(String, Value)>,
}

impl JsonAta {
    /// Parses `expr`. Fails outright unless `options.recover` is set, in
    /// which case a parse error is captured in `errors()` and a placeholder
    /// `null` AST is returned instead.
    pub fn new(expr: &str, options: &Options) -> Result<Self> {
        match crate::parser::parse(expr) {
            Ok(ast) => Ok(Self {
                ast,
                errors: Vec::new(),
                bindings: Vec::new(),
            }),
            Err(err) if options.recover => {
                debug!("parse error recovered: {}", err);
                Ok(Self {
                    ast: Node {
                        kind: crate::ast::NodeKind::Null,
                        position: crate::position::Position(0),
                        keep_array: false,
                        cons_array: false,
                        predicates: Vec::new(),
                        focus: None,
                        index: None,
                    },
                    errors: vec![*err],
                    bindings: Vec::new(),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Parse errors collected during recovery; empty unless `new` was
    /// called with `Options::recover` and parsing failed.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn ast(&self) -> &Node {
        &self.ast
    }

    /// Binds `name` to `value` in every subsequent `evaluate` call, as a
    /// caller-supplied variable alongside the built-in function library.
    pub fn assign(&mut self, name: &str, value: Value) {
        self.bindings.push((name.to_string(), value));
    }

    pub fn evaluate(
        &self,
        input: Option<&serde_json::Value>,
        options: &Options,
    ) -> Result<Option<serde_json::Value>> {
        self.evaluate_cancellable(input, options, CancellationToken::new())
    }

    pub fn evaluate_cancellable(
        &self,
        input: Option<&serde_json::Value>,
        options: &Options,
        cancellation: CancellationToken,
    ) -> Result<Option<serde_json::Value>> {
        let input_value = input.map(value::from_json).unwrap_or(Value::Undefined);
        let env = Evaluator::root_environment(&input_value, &self.bindings);
        let mut evaluator = Evaluator::new(options, cancellation);
        let result = evaluator.evaluate(&self.ast, &input_value, &env)?;
        Ok(value::to_json(&result))
    }
}

/// Parses `source` into an AST, discarding the intermediate `JsonAta`
/// wrapper — the free-function form of the public API described for
/// one-shot callers who don't need to evaluate the same expression twice.
pub fn parse(source: &str) -> Result<Node> {
    crate::parser::parse(source)
}

/// Evaluates a pre-parsed `ast` against `input`, with optional variable
/// bindings and resource limits. The free-function counterpart to
/// `JsonAta::evaluate` for callers who already hold an `Environment`.
pub fn evaluate(
    ast: &Node,
    input: Option<&serde_json::Value>,
    bindings: &[(String, Value)],
    options: &Options,
) -> Result<Option<serde_json::Value>> {
    let input_value = input.map(value::from_json).unwrap_or(Value::Undefined);
    let env = Evaluator::root_environment(&input_value, bindings);
    let mut evaluator = Evaluator::new(options, CancellationToken::new());
    let result = evaluator.evaluate(ast, &input_value, &env)?;
    Ok(value::to_json(&result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> serde_json::Value {
        let jsonata = JsonAta::new(expr, &Options::default()).unwrap();
        jsonata
            .evaluate(None, &Options::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn add() {
        assert_eq!(eval("1 + 3"), serde_json::json!(4));
    }

    #[test]
    fn sub() {
        assert_eq!(eval("1 - 3"), serde_json::json!(-2));
    }

    #[test]
    fn mul() {
        assert_eq!(eval("4 * 7"), serde_json::json!(28));
    }

    #[test]
    fn div() {
        assert_eq!(eval("10 / 2"), serde_json::json!(5));
    }

    #[test]
    fn modulo() {
        assert_eq!(eval("10 % 8"), serde_json::json!(2));
    }

    #[test]
    fn less_than_num_true() {
        assert_eq!(eval("3 < 4"), serde_json::json!(true));
    }

    #[test]
    fn less_than_str_false() {
        assert_eq!(eval("\"4\" < \"3\""), serde_json::json!(false));
    }

    #[test]
    fn str_concat() {
        assert_eq!(eval("\"hello\" & \" world\""), serde_json::json!("hello world"));
    }

    #[test]
    fn eq() {
        assert_eq!(eval("1 = 1"), serde_json::json!(true));
    }

    #[test]
    fn neq() {
        assert_eq!(eval("1 != 2"), serde_json::json!(true));
    }

    #[test]
    fn operator_precedence() {
        assert_eq!(eval("(2 + 3) * 4 + 2"), serde_json::json!(22));
    }

    #[test]
    fn path_filter_singleton_unwrap() {
        let input: serde_json::Value = serde_json::json!({
            "Phone": [{"type": "mobile", "number": "077 7700 1234"}]
        });
        let jsonata = JsonAta::new("Phone[type='mobile'].number", &Options::default()).unwrap();
        let result = jsonata
            .evaluate(Some(&input), &Options::default())
            .unwrap()
            .unwrap();
        assert_eq!(result, serde_json::json!("077 7700 1234"));
    }

    #[test]
    fn path_filter_multi_result_stays_array() {
        let input: serde_json::Value = serde_json::json!({
            "Phone": [
                {"type": "office", "number": "A"},
                {"type": "office", "number": "B"}
            ]
        });
        let jsonata = JsonAta::new("Phone[type='office'].number", &Options::default()).unwrap();
        let result = jsonata
            .evaluate(Some(&input), &Options::default())
            .unwrap()
            .unwrap();
        assert_eq!(result, serde_json::json!(["A", "B"]));
    }

    #[test]
    fn descendant_wildcard() {
        let input: serde_json::Value = serde_json::json!({"A": {"B": [{"C": 1}, {"C": 2}]}});
        let jsonata = JsonAta::new("**.C", &Options::default()).unwrap();
        let result = jsonata
            .evaluate(Some(&input), &Options::default())
            .unwrap()
            .unwrap();
        assert_eq!(result, serde_json::json!([1, 2]));
    }

    #[test]
    fn recursive_closure() {
        let result = eval("($f := function($n){ $n <= 1 ? 1 : $n * $f($n-1) }; $f(5))");
        assert_eq!(result, serde_json::json!(120));
    }

    #[test]
    fn banker_rounding() {
        assert_eq!(eval("$round(12.5)"), serde_json::json!(12));
    }

    #[test]
    fn order_by_ascending() {
        let input: serde_json::Value = serde_json::json!({"xs": [3, 1, 2]});
        let jsonata = JsonAta::new("xs^(<$)", &Options::default()).unwrap();
        let result = jsonata
            .evaluate(Some(&input), &Options::default())
            .unwrap()
            .unwrap();
        assert_eq!(result, serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn apply_chain() {
        assert_eq!(eval("[1,2,3] ~> $sum()"), serde_json::json!(6));
    }

    #[test]
    fn assign_binding_visible_to_expression() {
        let mut jsonata = JsonAta::new("$greeting & \" world\"", &Options::default()).unwrap();
        jsonata.assign("greeting", Value::string("hello"));
        let result = jsonata
            .evaluate(None, &Options::default())
            .unwrap()
            .unwrap();
        assert_eq!(result, serde_json::json!("hello world"));
    }

    #[test]
    fn undefined_result_is_none() {
        let jsonata = JsonAta::new("nonexistent.path", &Options::default()).unwrap();
        let result = jsonata.evaluate(None, &Options::default()).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn recover_collects_parse_error() {
        let options = Options {
            recover: true,
            ..Options::default()
        };
        let jsonata = JsonAta::new("1 +", &options).unwrap();
        assert!(!jsonata.errors().is_empty());
    }

    #[test]
    fn depth_limit_is_enforced() {
        let options = Options {
            max_depth: Some(3),
            ..Options::default()
        };
        let jsonata = JsonAta::new(
            "($f := function($n){ $n <= 1 ? 1 : $n * $f($n-1) }; $f(20))",
            &Options::default(),
        )
        .unwrap();
        let result = jsonata.evaluate(None, &options);
        assert!(result.is_err());
    }
}
