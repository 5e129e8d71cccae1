//! A Pratt (top-down operator precedence) parser. Each [`TokenKind`] has a
//! left binding power (`lbp`); [`Parser::nud`] parses a token in prefix
//! position, [`Parser::led`] continues parsing a token found in infix or
//! postfix position given the already-parsed left-hand side.

use crate::ast::{BinaryOp, Node, NodeKind, UnaryOp};
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::position::Position;
use crate::token::{Token, TokenKind};

const BP_ASSIGNMENT: u8 = 10;
const BP_TERNARY: u8 = 20;
const BP_OR: u8 = 30;
const BP_AND: u8 = 40;
const BP_IN: u8 = 50;
const BP_COMPARISON: u8 = 60;
const BP_CONCAT: u8 = 70;
const BP_ADDITIVE: u8 = 80;
const BP_MULTIPLICATIVE: u8 = 90;
const BP_RANGE: u8 = 100;
const BP_UNARY: u8 = 105;
const BP_PATH: u8 = 110;
const BP_POSTFIX: u8 = 120;

fn lbp(kind: &TokenKind) -> u8 {
    use TokenKind::*;
    match kind {
        Assignment => BP_ASSIGNMENT,
        Question => BP_TERNARY,
        Or => BP_OR,
        And => BP_AND,
        In => BP_IN,
        Equal | NotEqual | LeftCaret | RightCaret | LessEqual | GreaterEqual | ChainArrow => {
            BP_COMPARISON
        }
        Ampersand => BP_CONCAT,
        Plus | Minus => BP_ADDITIVE,
        Asterisk | ForwardSlash | Percent => BP_MULTIPLICATIVE,
        DotDot => BP_RANGE,
        Dot => BP_PATH,
        LeftBracket | LeftParen | LeftBrace | Caret | At | Hash => BP_POSTFIX,
        _ => 0,
    }
}

pub struct Parser {
    lexer: Lexer,
    token: Token,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let token = lexer
            .next(false)?
            .unwrap_or_else(|| Token::new(TokenKind::End, Position(source.chars().count())));
        Ok(Self { lexer, token })
    }

    pub fn parse(&mut self) -> Result<Node> {
        let ast = self.expression(0)?;
        if self.token.kind != TokenKind::End {
            return Err(Box::new(Error::S0201SyntaxError(
                self.token.position,
                self.token.kind.to_string(),
            )));
        }
        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        let infix = is_operand_end(&self.token.kind);
        self.token = self
            .lexer
            .next(infix)?
            .unwrap_or_else(|| Token::new(TokenKind::End, self.token.position));
        Ok(())
    }

    fn expect(&mut self, expected: TokenKind) -> Result<()> {
        if self.token.kind == expected {
            self.advance()
        } else if self.token.kind == TokenKind::End {
            Err(Box::new(Error::S0203ExpectedTokenBeforeEnd(
                self.token.position,
                expected.to_string(),
            )))
        } else {
            Err(Box::new(Error::S0202UnexpectedToken(
                self.token.position,
                expected.to_string(),
                self.token.kind.to_string(),
            )))
        }
    }

    pub fn expression(&mut self, rbp: u8) -> Result<Node> {
        let mut left = self.nud()?;
        while rbp < lbp(&self.token.kind) {
            left = self.led(left)?;
        }
        Ok(left)
    }

    fn nud(&mut self) -> Result<Node> {
        let position = self.token.position;
        match self.token.kind.clone() {
            TokenKind::Number(n) => {
                self.advance()?;
                Ok(Node::new(NodeKind::Number(n), position))
            }
            TokenKind::String(s) => {
                self.advance()?;
                Ok(Node::new(NodeKind::Str(s), position))
            }
            TokenKind::Boolean(b) => {
                self.advance()?;
                Ok(Node::new(NodeKind::Bool(b), position))
            }
            TokenKind::Null => {
                self.advance()?;
                Ok(Node::new(NodeKind::Null, position))
            }
            TokenKind::Name(name) => {
                self.advance()?;
                Ok(Node::new(NodeKind::Name(name), position))
            }
            TokenKind::Variable(name) => {
                self.advance()?;
                Ok(Node::new(NodeKind::Var(name), position))
            }
            TokenKind::Regex(pattern, flags) => {
                self.advance()?;
                Ok(Node::new(NodeKind::Regex(pattern, flags), position))
            }
            TokenKind::Asterisk => {
                self.advance()?;
                Ok(Node::new(NodeKind::Wildcard, position))
            }
            TokenKind::DoubleAsterisk => {
                self.advance()?;
                Ok(Node::new(NodeKind::DescendantWildcard, position))
            }
            TokenKind::Percent => {
                self.advance()?;
                Ok(Node::new(NodeKind::Parent, position))
            }
            TokenKind::Minus => {
                self.advance()?;
                let operand = self.expression(BP_UNARY)?;
                Ok(Node::new(
                    NodeKind::Unary(UnaryOp::Minus(Box::new(operand))),
                    position,
                ))
            }
            TokenKind::Question => {
                self.advance()?;
                Ok(Node::new(NodeKind::PartialArg, position))
            }
            TokenKind::LeftParen => self.parse_block(position),
            TokenKind::LeftBracket => self.parse_array(position),
            TokenKind::LeftBrace => self.parse_object(position),
            TokenKind::Pipe => self.parse_transform(position),
            other => Err(Box::new(Error::S0211InvalidUnary(
                position,
                other.to_string(),
            ))),
        }
    }

    fn led(&mut self, left: Node) -> Result<Node> {
        let position = self.token.position;
        match self.token.kind.clone() {
            TokenKind::Dot => {
                self.advance()?;
                let rhs = self.expression(BP_PATH)?;
                Ok(Node::new(
                    NodeKind::Binary(BinaryOp::PathOp, Box::new(left), Box::new(rhs)),
                    position,
                ))
            }
            TokenKind::Plus => self.binary(left, BinaryOp::Add, BP_ADDITIVE, position),
            TokenKind::Minus => self.binary(left, BinaryOp::Subtract, BP_ADDITIVE, position),
            TokenKind::Asterisk => self.binary(left, BinaryOp::Multiply, BP_MULTIPLICATIVE, position),
            TokenKind::ForwardSlash => self.binary(left, BinaryOp::Divide, BP_MULTIPLICATIVE, position),
            TokenKind::Percent => self.binary(left, BinaryOp::Modulus, BP_MULTIPLICATIVE, position),
            TokenKind::Ampersand => self.binary(left, BinaryOp::Concat, BP_CONCAT, position),
            TokenKind::Equal => self.binary(left, BinaryOp::Equal, BP_COMPARISON, position),
            TokenKind::NotEqual => self.binary(left, BinaryOp::NotEqual, BP_COMPARISON, position),
            TokenKind::LeftCaret => self.binary(left, BinaryOp::LessThan, BP_COMPARISON, position),
            TokenKind::RightCaret => self.binary(left, BinaryOp::GreaterThan, BP_COMPARISON, position),
            TokenKind::LessEqual => self.binary(left, BinaryOp::LessThanEqual, BP_COMPARISON, position),
            TokenKind::GreaterEqual => {
                self.binary(left, BinaryOp::GreaterThanEqual, BP_COMPARISON, position)
            }
            TokenKind::ChainArrow => self.binary(left, BinaryOp::Apply, BP_COMPARISON, position),
            TokenKind::And => self.binary(left, BinaryOp::And, BP_AND, position),
            TokenKind::Or => self.binary(left, BinaryOp::Or, BP_OR, position),
            TokenKind::In => self.binary(left, BinaryOp::In, BP_IN, position),
            TokenKind::DotDot => self.binary(left, BinaryOp::Range, BP_RANGE, position),
            TokenKind::Assignment => {
                if !matches!(left.kind, NodeKind::Var(_)) {
                    return Err(Box::new(Error::S0212InvalidAssignmentTarget(position)));
                }
                self.advance()?;
                let rhs = self.expression(BP_ASSIGNMENT - 1)?;
                Ok(Node::new(
                    NodeKind::Binary(BinaryOp::Bind, Box::new(left), Box::new(rhs)),
                    position,
                ))
            }
            TokenKind::Question => {
                self.advance()?;
                let truthy = self.expression(0)?;
                let falsy = if self.token.kind == TokenKind::Colon {
                    self.advance()?;
                    Some(Box::new(self.expression(0)?))
                } else {
                    None
                };
                Ok(Node::new(
                    NodeKind::Ternary {
                        cond: Box::new(left),
                        truthy: Box::new(truthy),
                        falsy,
                    },
                    position,
                ))
            }
            TokenKind::LeftBracket => {
                self.advance()?;
                if self.token.kind == TokenKind::RightBracket {
                    self.advance()?;
                    let mut result = left;
                    result.keep_array = true;
                    return Ok(result);
                }
                let predicate = self.expression(0)?;
                self.expect(TokenKind::RightBracket)?;
                Ok(Node::new(
                    NodeKind::Binary(BinaryOp::Predicate, Box::new(left), Box::new(predicate)),
                    position,
                ))
            }
            TokenKind::LeftParen => self.parse_call_or_lambda(left, position),
            TokenKind::LeftBrace => {
                self.advance()?;
                let pairs = self.parse_pairs(TokenKind::RightBrace)?;
                Ok(Node::new(NodeKind::GroupBy(Box::new(left), pairs), position))
            }
            TokenKind::Caret => {
                self.advance()?;
                self.expect(TokenKind::LeftParen)?;
                let mut terms = vec![];
                loop {
                    let descending = match self.token.kind {
                        TokenKind::RightCaret => {
                            self.advance()?;
                            true
                        }
                        TokenKind::LeftCaret => {
                            self.advance()?;
                            false
                        }
                        _ => false,
                    };
                    let expr = self.expression(0)?;
                    terms.push((expr, descending));
                    if self.token.kind == TokenKind::Comma {
                        self.advance()?;
                        continue;
                    }
                    break;
                }
                self.expect(TokenKind::RightParen)?;
                Ok(Node::new(NodeKind::OrderBy(Box::new(left), terms), position))
            }
            TokenKind::At => {
                self.advance()?;
                let var = self.expect_variable()?;
                Ok(Node::new(
                    NodeKind::Binary(
                        BinaryOp::ContextBind,
                        Box::new(left),
                        Box::new(Node::new(NodeKind::Var(var), position)),
                    ),
                    position,
                ))
            }
            TokenKind::Hash => {
                self.advance()?;
                let var = self.expect_variable()?;
                Ok(Node::new(
                    NodeKind::Binary(
                        BinaryOp::PositionalBind,
                        Box::new(left),
                        Box::new(Node::new(NodeKind::Var(var), position)),
                    ),
                    position,
                ))
            }
            other => Err(Box::new(Error::S0202UnexpectedToken(
                position,
                "an operator".into(),
                other.to_string(),
            ))),
        }
    }

    fn binary(&mut self, left: Node, op: BinaryOp, bp: u8, position: Position) -> Result<Node> {
        self.advance()?;
        let rhs = self.expression(bp)?;
        Ok(Node::new(
            NodeKind::Binary(op, Box::new(left), Box::new(rhs)),
            position,
        ))
    }

    fn expect_variable(&mut self) -> Result<String> {
        match self.token.kind.clone() {
            TokenKind::Variable(name) => {
                self.advance()?;
                Ok(name)
            }
            other => Err(Box::new(Error::S0214ExpectedVarRight(
                self.token.position,
                other.to_string(),
            ))),
        }
    }

    fn parse_block(&mut self, position: Position) -> Result<Node> {
        self.advance()?;
        let mut exprs = vec![];
        if self.token.kind != TokenKind::RightParen {
            loop {
                exprs.push(self.expression(0)?);
                if self.token.kind == TokenKind::Semicolon {
                    self.advance()?;
                    if self.token.kind == TokenKind::RightParen {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;
        if exprs.len() == 1 {
            Ok(exprs.pop().unwrap())
        } else {
            Ok(Node::new(NodeKind::Block(exprs), position))
        }
    }

    fn parse_array(&mut self, position: Position) -> Result<Node> {
        self.advance()?;
        let mut items = vec![];
        if self.token.kind != TokenKind::RightBracket {
            loop {
                items.push(self.expression(BP_TERNARY)?);
                if self.token.kind == TokenKind::Comma {
                    self.advance()?;
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RightBracket)?;
        Ok(Node::new(
            NodeKind::Unary(UnaryOp::ArrayConstructor(items)),
            position,
        ))
    }

    fn parse_object(&mut self, position: Position) -> Result<Node> {
        self.advance()?;
        let pairs = self.parse_pairs(TokenKind::RightBrace)?;
        Ok(Node::new(
            NodeKind::Unary(UnaryOp::ObjectConstructor(pairs)),
            position,
        ))
    }

    fn parse_pairs(&mut self, terminator: TokenKind) -> Result<Vec<(Node, Node)>> {
        let mut pairs = vec![];
        if self.token.kind != terminator {
            loop {
                let key = self.expression(BP_TERNARY)?;
                self.expect(TokenKind::Colon)?;
                let value = self.expression(BP_TERNARY)?;
                pairs.push((key, value));
                if self.token.kind == TokenKind::Comma {
                    self.advance()?;
                    continue;
                }
                break;
            }
        }
        self.expect(terminator)?;
        Ok(pairs)
    }

    fn parse_transform(&mut self, position: Position) -> Result<Node> {
        self.advance()?;
        let pattern = self.expression(0)?;
        self.expect(TokenKind::Pipe)?;
        let update = self.expression(0)?;
        let delete = if self.token.kind == TokenKind::Pipe {
            self.advance()?;
            if self.token.kind == TokenKind::Pipe {
                None
            } else {
                Some(Box::new(self.expression(0)?))
            }
        } else {
            None
        };
        self.expect(TokenKind::Pipe)?;
        Ok(Node::new(
            NodeKind::Transform {
                pattern: Box::new(pattern),
                update: Box::new(update),
                delete,
            },
            position,
        ))
    }

    fn parse_call_or_lambda(&mut self, left: Node, position: Position) -> Result<Node> {
        let is_lambda_keyword = matches!(&left.kind, NodeKind::Name(n) if n == "function" || n == "λ");
        if is_lambda_keyword {
            self.advance()?;
            let mut params = vec![];
            if self.token.kind != TokenKind::RightParen {
                loop {
                    match self.token.kind.clone() {
                        TokenKind::Variable(name) => {
                            params.push(name);
                            self.advance()?;
                        }
                        other => {
                            return Err(Box::new(Error::S0208InvalidFunctionParam(
                                self.token.position,
                                other.to_string(),
                            )))
                        }
                    }
                    if self.token.kind == TokenKind::Comma {
                        self.advance()?;
                        continue;
                    }
                    break;
                }
            }
            self.expect(TokenKind::RightParen)?;
            // An optional type signature (`<n:n>`) may follow; not evaluated, only skipped.
            if self.token.kind == TokenKind::LeftCaret {
                self.skip_signature()?;
            }
            self.expect(TokenKind::LeftBrace)?;
            let body = self.expression(0)?;
            self.expect(TokenKind::RightBrace)?;
            return Ok(Node::new(
                NodeKind::Lambda {
                    params,
                    body: Box::new(body),
                },
                position,
            ));
        }

        self.advance()?;
        let mut args = vec![];
        if self.token.kind != TokenKind::RightParen {
            loop {
                args.push(self.expression(BP_TERNARY)?);
                if self.token.kind == TokenKind::Comma {
                    self.advance()?;
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;
        let is_partial = args.iter().any(|a| matches!(a.kind, NodeKind::PartialArg));
        Ok(Node::new(
            NodeKind::Function {
                proc: Box::new(left),
                args,
                is_partial,
            },
            position,
        ))
    }

    /// Consumes an ignored `<...>` type signature after a lambda parameter list.
    fn skip_signature(&mut self) -> Result<()> {
        self.advance()?;
        let mut depth = 1usize;
        loop {
            match self.token.kind {
                TokenKind::LeftCaret => depth += 1,
                TokenKind::RightCaret => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance()?;
                        return Ok(());
                    }
                }
                TokenKind::End => {
                    return Err(Box::new(Error::S0203ExpectedTokenBeforeEnd(
                        self.token.position,
                        ">".into(),
                    )))
                }
                _ => {}
            }
            self.advance()?;
        }
    }
}

fn is_operand_end(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::Name(_)
            | TokenKind::Variable(_)
            | TokenKind::Boolean(_)
            | TokenKind::Null
            | TokenKind::RightParen
            | TokenKind::RightBracket
            | TokenKind::RightBrace
    )
}
