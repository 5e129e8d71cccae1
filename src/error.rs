//! Error codes and messages, following the numbering scheme of the reference
//! JSONata implementation:
//!
//! - `Sxxxx` syntax errors raised while tokenizing or parsing
//! - `Txxxx` type errors raised while evaluating
//! - `Dxxxx` dynamic/runtime errors raised by builtin functions
//! - `Ixxxx` errors converting to/from the external JSON representation

use crate::position::Position;

pub type Result<T> = std::result::Result<T, Box<Error>>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    // -- tokenizer (S01xx) --------------------------------------------------
    #[error("{0}: Unsupported escape sequence: \\{1}")]
    S0103UnsupportedEscape(Position, char),
    #[error("{0}: Quoted property name must be terminated with a backtick")]
    S0105UnterminatedName(Position),
    #[error("{0}: Comment has no closing tag")]
    S0106UnterminatedComment(Position),
    #[error("{0}: Unterminated string literal")]
    S0101UnterminatedString(Position),
    #[error("{0}: Invalid unicode escape sequence")]
    S0104InvalidUnicodeEscape(Position),
    #[error("{0}: Unsupported regular expression: {1}")]
    S0302InvalidRegex(Position, String),

    // -- parser (S02xx) -------------------------------------------------------
    #[error("{0}: Syntax error: `{1}`")]
    S0201SyntaxError(Position, String),
    #[error("{0}: Expected `{1}`, got `{2}`")]
    S0202UnexpectedToken(Position, String, String),
    #[error("{0}: Expected `{1}` before end of expression")]
    S0203ExpectedTokenBeforeEnd(Position, String),
    #[error("{0}: The symbol `{1}` cannot be used as a prefix operator")]
    S0211InvalidUnary(Position, String),
    #[error("{0}: Expected a parameter name, got `{1}`")]
    S0208InvalidFunctionParam(Position, String),
    #[error("{0}: A predicate cannot follow a grouping expression in a path step")]
    S0209PredicateAfterGroupBy(Position),
    #[error("{0}: Each step can only have one grouping expression")]
    S0210MultipleGroupBy(Position),
    #[error("{0}: The right side of `{1}` must be a variable name")]
    S0214ExpectedVarRight(Position, String),
    #[error("{0}: The left side of `:=` must be a variable name")]
    S0212InvalidAssignmentTarget(Position),
    #[error("{0}: The literal value `{1}` cannot be used as a step in a path expression")]
    S0213InvalidStep(Position, String),
    #[error("{0}: A context variable binding must precede a positional variable binding")]
    S0215ContextBindOrder(Position),
    #[error("{0}: A context variable binding must be a variable reference")]
    S0216ContextBindNotVariable(Position),
    #[error("{0}: The object representing the `%` parent operator cannot be used in this context")]
    S0217InvalidParent(Position),

    // -- runtime / evaluator (D1xxx, T1xxx) -----------------------------------
    #[error("{0}: Cannot negate a non-numeric value: {1}")]
    D1002NegatingNonNumeric(Position, String),
    #[error("{0}: Key in object structure must evaluate to a string: {1}")]
    T1003NonStringKey(Position, String),
    #[error("{0}: Multiple key definitions evaluate to same key: {1}")]
    D1009MultipleKeys(Position, String),
    #[error("{0}: The left side of `{1}` must evaluate to a number")]
    T2001LeftSideNotNumber(Position, String),
    #[error("{0}: The right side of `{1}` must evaluate to a number")]
    T2002RightSideNotNumber(Position, String),
    #[error("{0}: The values {1} and {2} either side of operator `{3}` must be of the same data type")]
    T2009BinaryOpMismatch(Position, String, String, String),
    #[error("{0}: The expressions either side of operator `{1}` must evaluate to numeric or string values")]
    T2010BinaryOpTypes(Position, String),
    #[error("{0}: Argument {1} of function `{2}` is not valid")]
    T0410ArgumentNotValid(Position, usize, String),
    #[error("{0}: Argument {1} of function `{2}` must be an array of `{3}`")]
    T0412ArgumentMustBeArrayOfType(Position, usize, String, String),
    #[error("{0}: Function `{1}` requires at least {2} argument(s)")]
    T0410TooFewArguments(Position, String, usize),
    #[error("{0}: The left side of the range operator must evaluate to an integer")]
    T2003LeftSideRangeNotInteger(Position),
    #[error("{0}: The right side of the range operator must evaluate to an integer")]
    T2004RightSideRangeNotInteger(Position),
    #[error("{0}: Attempting to invoke a non-function")]
    T1006NotAFunction(Position),
    #[error("{0}: The `{1}` and `{2}` operands must not evaluate to arrays")]
    T2008OperandsMustNotBeArrays(Position, String, String),

    // -- runtime / builtin functions (D3xxx) ----------------------------------
    #[error("{0}: The single argument form of `$sort` is only applicable to arrays of strings or numbers, use the comparator form instead")]
    D3070InvalidDefaultSort(Position),
    #[error("{0}: Argument to `$sqrt` must not be negative: {1}")]
    D3060NegativeSqrt(Position, String),
    #[error("{0}: The result of function `$power` is not a number: {1}")]
    D3061PowerNotFinite(Position, String),
    #[error("{0}: Unable to cast value to a number: {1}")]
    D3030CannotCastToNumber(Position, String),
    #[error("{0}: Attempting to evaluate an expression that produces a non-finite (NaN or Infinity) number")]
    D3001NonFiniteNumber(Position),
    #[error("{0}: {1}")]
    D3137UserError(Position, String),
    #[error("{0}: `$single` expected an array containing exactly one item, but {1} matched")]
    D3138SingleMatchedMany(Position, usize),
    #[error("{0}: `$single` expected an array containing exactly one item, but none matched")]
    D3139SingleMatchedNone(Position),
    #[error("{0}: Assertion failed: {1}")]
    D3141AssertionFailed(Position, String),
    #[error("{0}: Third argument of function `$replace` cannot be a function that returns an empty string")]
    D3013ReplaceReturnsEmpty(Position),
    #[error("{0}: Fourth argument of function `$replace` must evaluate to a positive number")]
    D3012ReplaceLimitNegative(Position),
    #[error("{0}: Unknown variable reference: ${1}")]
    D3011UnknownVariable(Position, String),
    #[error("{0}: First argument of function `$pad` must evaluate to a string")]
    D3020PadFirstArgNotString(Position),
    #[error("{0}: The second argument of the `$split` function must be a positive number")]
    D3040SplitLimitNegative(Position),
    #[error("{0}: Third argument of function `$formatNumber` must be an object matching the required picture string format")]
    D3135InvalidFormatNumberOptions(Position),
    #[error("{0}: The matcher function argument passed to function `{1}` does not return the correct object structure")]
    D3100InvalidRegexResult(Position, String),
    #[error("{0}: Regular expression matches zero length string")]
    D1004RegexMatchesZeroLength(Position),
    #[error("{0}: The second argument of `$reduce` function must be a function with two or more arguments")]
    D3050ReduceFunctionArity(Position),
    #[error("{0}: The radix of function `$formatBase` must be between 2 and 36")]
    D3081RadixOutOfRange(Position),
    #[error("{0}: The expression passed to `$eval` is not valid: {1}")]
    D3120EvalExpressionInvalid(Position, String),

    // -- cancellation / resource limits --------------------------------------
    #[error("{0}: Evaluation exceeded the configured time limit")]
    U1001TimeLimitExceeded(Position),
    #[error("{0}: Evaluation exceeded the configured maximum recursion depth")]
    U1002MaxDepthExceeded(Position),
    #[error("Evaluation was cancelled")]
    U1003Cancelled,

    // -- JSON conversion (I02xx) ----------------------------------------------
    #[error("Unable to parse input JSON: {0}")]
    I0201InvalidJson(String),
    #[error("Expected {0}")]
    I0205WrongType(String),
}

impl Error {
    /// The short reference-style error code, e.g. `"T0410"`.
    pub fn code(&self) -> &'static str {
        use Error::*;
        match self {
            S0103UnsupportedEscape(..) => "S0103",
            S0105UnterminatedName(..) => "S0105",
            S0106UnterminatedComment(..) => "S0106",
            S0101UnterminatedString(..) => "S0101",
            S0104InvalidUnicodeEscape(..) => "S0104",
            S0302InvalidRegex(..) => "S0302",
            S0201SyntaxError(..) => "S0201",
            S0202UnexpectedToken(..) => "S0202",
            S0203ExpectedTokenBeforeEnd(..) => "S0203",
            S0211InvalidUnary(..) => "S0211",
            S0208InvalidFunctionParam(..) => "S0208",
            S0209PredicateAfterGroupBy(..) => "S0209",
            S0210MultipleGroupBy(..) => "S0210",
            S0214ExpectedVarRight(..) => "S0214",
            S0212InvalidAssignmentTarget(..) => "S0212",
            S0213InvalidStep(..) => "S0213",
            S0215ContextBindOrder(..) => "S0215",
            S0216ContextBindNotVariable(..) => "S0216",
            S0217InvalidParent(..) => "S0217",
            D1002NegatingNonNumeric(..) => "D1002",
            T1003NonStringKey(..) => "T1003",
            D1009MultipleKeys(..) => "D1009",
            T2001LeftSideNotNumber(..) => "T2001",
            T2002RightSideNotNumber(..) => "T2002",
            T2009BinaryOpMismatch(..) => "T2009",
            T2010BinaryOpTypes(..) => "T2010",
            T0410ArgumentNotValid(..) => "T0410",
            T0412ArgumentMustBeArrayOfType(..) => "T0412",
            T0410TooFewArguments(..) => "T0410",
            T2003LeftSideRangeNotInteger(..) => "T2003",
            T2004RightSideRangeNotInteger(..) => "T2004",
            T1006NotAFunction(..) => "T1006",
            T2008OperandsMustNotBeArrays(..) => "T2008",
            D3070InvalidDefaultSort(..) => "D3070",
            D3060NegativeSqrt(..) => "D3060",
            D3061PowerNotFinite(..) => "D3061",
            D3030CannotCastToNumber(..) => "D3030",
            D3001NonFiniteNumber(..) => "D3001",
            D3137UserError(..) => "D3137",
            D3138SingleMatchedMany(..) => "D3138",
            D3139SingleMatchedNone(..) => "D3139",
            D3141AssertionFailed(..) => "D3141",
            D3013ReplaceReturnsEmpty(..) => "D3013",
            D3012ReplaceLimitNegative(..) => "D3012",
            D3011UnknownVariable(..) => "D3011",
            D3020PadFirstArgNotString(..) => "D3020",
            D3040SplitLimitNegative(..) => "D3040",
            D3135InvalidFormatNumberOptions(..) => "D3135",
            D3100InvalidRegexResult(..) => "D3100",
            D1004RegexMatchesZeroLength(..) => "D1004",
            D3050ReduceFunctionArity(..) => "D3050",
            D3081RadixOutOfRange(..) => "D3081",
            D3120EvalExpressionInvalid(..) => "D3120",
            U1001TimeLimitExceeded(..) => "U1001",
            U1002MaxDepthExceeded(..) => "U1002",
            U1003Cancelled => "U1003",
            I0201InvalidJson(..) => "I0201",
            I0205WrongType(..) => "I0205",
        }
    }

    pub fn position(&self) -> Option<Position> {
        use Error::*;
        match self {
            U1003Cancelled | I0201InvalidJson(..) | I0205WrongType(..) => None,
            S0103UnsupportedEscape(p, _)
            | S0105UnterminatedName(p)
            | S0106UnterminatedComment(p)
            | S0101UnterminatedString(p)
            | S0104InvalidUnicodeEscape(p)
            | S0302InvalidRegex(p, _)
            | S0201SyntaxError(p, _)
            | S0202UnexpectedToken(p, _, _)
            | S0203ExpectedTokenBeforeEnd(p, _)
            | S0211InvalidUnary(p, _)
            | S0208InvalidFunctionParam(p, _)
            | S0209PredicateAfterGroupBy(p)
            | S0210MultipleGroupBy(p)
            | S0214ExpectedVarRight(p, _)
            | S0212InvalidAssignmentTarget(p)
            | S0213InvalidStep(p, _)
            | S0215ContextBindOrder(p)
            | S0216ContextBindNotVariable(p)
            | S0217InvalidParent(p)
            | D1002NegatingNonNumeric(p, _)
            | T1003NonStringKey(p, _)
            | D1009MultipleKeys(p, _)
            | T2001LeftSideNotNumber(p, _)
            | T2002RightSideNotNumber(p, _)
            | T2009BinaryOpMismatch(p, _, _, _)
            | T2010BinaryOpTypes(p, _)
            | T0410ArgumentNotValid(p, _, _)
            | T0412ArgumentMustBeArrayOfType(p, _, _, _)
            | T0410TooFewArguments(p, _, _)
            | T2003LeftSideRangeNotInteger(p)
            | T2004RightSideRangeNotInteger(p)
            | T1006NotAFunction(p)
            | T2008OperandsMustNotBeArrays(p, _, _)
            | D3070InvalidDefaultSort(p)
            | D3060NegativeSqrt(p, _)
            | D3061PowerNotFinite(p, _)
            | D3030CannotCastToNumber(p, _)
            | D3001NonFiniteNumber(p)
            | D3137UserError(p, _)
            | D3138SingleMatchedMany(p, _)
            | D3139SingleMatchedNone(p)
            | D3141AssertionFailed(p, _)
            | D3013ReplaceReturnsEmpty(p)
            | D3012ReplaceLimitNegative(p)
            | D3011UnknownVariable(p, _)
            | D3020PadFirstArgNotString(p)
            | D3040SplitLimitNegative(p)
            | D3135InvalidFormatNumberOptions(p)
            | D3100InvalidRegexResult(p, _)
            | D1004RegexMatchesZeroLength(p)
            | D3050ReduceFunctionArity(p)
            | D3081RadixOutOfRange(p)
            | D3120EvalExpressionInvalid(p, _)
            | U1001TimeLimitExceeded(p)
            | U1002MaxDepthExceeded(p) => Some(*p),
        }
    }
}
