use std::fmt;

use crate::ast::{BinaryOperator, Expression, Param, Program, Statement};
use crate::token::{Span, Token, TokenKind};

#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !matches!(self.current_kind(), TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.current_kind() {
            TokenKind::Def => self.parse_function_def(),
            TokenKind::While => self.parse_while(),
            TokenKind::If => self.parse_if(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Pass => {
                self.advance();
                self.expect_newline()?;
                Ok(Statement::Pass)
            }
            _ => {
                let target_span = self.current_span();
                let expr = self.parse_expression()?;
                if matches!(self.current_kind(), TokenKind::Equal) {
                    self.advance();
                    let value = self.parse_expression()?;
                    self.expect_newline()?;
                    return Ok(Statement::Assign {
                        target: expr,
                        target_span,
                        value,
                    });
                }
                self.expect_newline()?;
                Ok(Statement::Expr(expr))
            }
        }
    }

    fn parse_function_def(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // def
        let name = self.expect_identifier()?;
        self.expect_lparen()?;

        let mut params = Vec::new();
        while !matches!(self.current_kind(), TokenKind::RParen) {
            let param_name = self.expect_identifier()?;
            let annotation = if matches!(self.current_kind(), TokenKind::Colon) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Param {
                name: param_name,
                annotation,
            });
            if matches!(self.current_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect_rparen()?;

        let returns = if matches!(self.current_kind(), TokenKind::Arrow) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        let body = self.parse_block()?;
        Ok(Statement::FunctionDef {
            name,
            params,
            returns,
            body,
        })
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // while
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::While { condition, body })
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // if
        let condition = self.parse_expression()?;
        let then_body = self.parse_block()?;
        let else_body = if matches!(self.current_kind(), TokenKind::Else) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // return
        if matches!(self.current_kind(), TokenKind::Newline) {
            self.advance();
            return Ok(Statement::Return(None));
        }
        let value = self.parse_expression()?;
        self.expect_newline()?;
        Ok(Statement::Return(Some(value)))
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect_colon()?;
        self.expect_newline()?;
        self.expect_indent()?;

        let mut body = Vec::new();
        while !matches!(self.current_kind(), TokenKind::Dedent | TokenKind::EOF) {
            if self.consume_newlines() {
                continue;
            }
            body.push(self.parse_statement()?);
        }
        self.expect_dedent()?;
        Ok(body)
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_additive()?;
        while matches!(self.current_kind(), TokenKind::Less) {
            self.advance();
            let right = self.parse_additive()?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op: BinaryOperator::LessThan,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_call()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::Slash => BinaryOperator::Div,
                TokenKind::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_call()?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_call(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;
        while matches!(self.current_kind(), TokenKind::LParen) {
            self.advance();
            let mut args = Vec::new();
            while !matches!(self.current_kind(), TokenKind::RParen) {
                args.push(self.parse_expression()?);
                if matches!(self.current_kind(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect_rparen()?;
            expr = Expression::Call {
                callee: Box::new(expr),
                args,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match *self.current_kind() {
            TokenKind::Integer(value) => {
                self.advance();
                Ok(Expression::Integer(value))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expression::Float(value))
            }
            TokenKind::String(raw) => {
                let span = self.current_span();
                self.advance();
                Ok(Expression::String(decode_string(raw, span)?))
            }
            TokenKind::Bytes(raw) => {
                let span = self.current_span();
                self.advance();
                Ok(Expression::Bytes(decode_bytes(raw, span)?))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Boolean(false))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expression::None)
            }
            TokenKind::Identifier(name) => {
                let name = name.to_string();
                self.advance();
                Ok(Expression::Identifier(name))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_list_display(),
            TokenKind::LBrace => self.parse_dict_display(),
            _ => Err(self.error("expression")),
        }
    }

    fn parse_list_display(&mut self) -> Result<Expression, ParseError> {
        self.advance(); // [
        let mut elements = Vec::new();
        while !matches!(self.current_kind(), TokenKind::RBracket) {
            elements.push(self.parse_expression()?);
            if matches!(self.current_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        if !matches!(self.current_kind(), TokenKind::RBracket) {
            return Err(self.error("]"));
        }
        self.advance();
        Ok(Expression::List(elements))
    }

    fn parse_dict_display(&mut self) -> Result<Expression, ParseError> {
        self.advance(); // {
        let mut pairs = Vec::new();
        while !matches!(self.current_kind(), TokenKind::RBrace) {
            let key = self.parse_expression()?;
            self.expect_colon()?;
            let value = self.parse_expression()?;
            pairs.push((key, value));
            if matches!(self.current_kind(), TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        if !matches!(self.current_kind(), TokenKind::RBrace) {
            return Err(self.error("}"));
        }
        self.advance();
        Ok(Expression::Dict(pairs))
    }

    fn consume_newlines(&mut self) -> bool {
        let mut consumed = false;
        while matches!(self.current_kind(), TokenKind::Newline) {
            consumed = true;
            self.advance();
        }
        consumed
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Identifier(name) = self.current_kind() {
            let name = name.to_string();
            self.advance();
            Ok(name)
        } else {
            Err(self.error("identifier"))
        }
    }

    fn expect_lparen(&mut self) -> Result<(), ParseError> {
        if matches!(self.current_kind(), TokenKind::LParen) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("("))
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        if matches!(self.current_kind(), TokenKind::RParen) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(")"))
        }
    }

    fn expect_colon(&mut self) -> Result<(), ParseError> {
        if matches!(self.current_kind(), TokenKind::Colon) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(":"))
        }
    }

    fn expect_newline(&mut self) -> Result<(), ParseError> {
        if matches!(self.current_kind(), TokenKind::Newline | TokenKind::EOF) {
            if matches!(self.current_kind(), TokenKind::Newline) {
                self.advance();
            }
            Ok(())
        } else {
            Err(self.error("newline"))
        }
    }

    fn expect_indent(&mut self) -> Result<(), ParseError> {
        if matches!(self.current_kind(), TokenKind::Indent) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("indent"))
        }
    }

    fn expect_dedent(&mut self) -> Result<(), ParseError> {
        if matches!(self.current_kind(), TokenKind::Dedent) {
            self.advance();
            Ok(())
        } else {
            Err(self.error("dedent"))
        }
    }

    fn current_kind(&self) -> &TokenKind<'a> {
        self.tokens[self.position].kind()
    }

    fn current_span(&self) -> Span {
        self.tokens[self.position].span()
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn error(&self, expected: &str) -> ParseError {
        let span = self.current_span();
        ParseError::new(format!(
            "Expected {expected}, got {:?} at line {}, column {}",
            self.current_kind(),
            span.line,
            span.column
        ))
    }
}

fn decode_string(raw: &str, span: Span) -> Result<String, ParseError> {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            decoded.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => decoded.push('\\'),
            Some('"') => decoded.push('"'),
            Some('n') => decoded.push('\n'),
            Some('r') => decoded.push('\r'),
            Some('t') => decoded.push('\t'),
            Some('x') => {
                let value = decode_hex_pair(&mut chars, span)?;
                decoded.push(value as char);
            }
            other => {
                return Err(ParseError::new(format!(
                    "Unknown escape '\\{}' in string literal at line {}, column {}",
                    other.map(String::from).unwrap_or_default(),
                    span.line,
                    span.column
                )));
            }
        }
    }
    Ok(decoded)
}

fn decode_bytes(raw: &str, span: Span) -> Result<Vec<u8>, ParseError> {
    let mut decoded = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            if !ch.is_ascii() {
                return Err(ParseError::new(format!(
                    "Bytes literal must be ASCII at line {}, column {}",
                    span.line, span.column
                )));
            }
            decoded.push(ch as u8);
            continue;
        }
        match chars.next() {
            Some('\\') => decoded.push(b'\\'),
            Some('"') => decoded.push(b'"'),
            Some('n') => decoded.push(b'\n'),
            Some('r') => decoded.push(b'\r'),
            Some('t') => decoded.push(b'\t'),
            Some('x') => decoded.push(decode_hex_pair(&mut chars, span)?),
            other => {
                return Err(ParseError::new(format!(
                    "Unknown escape '\\{}' in bytes literal at line {}, column {}",
                    other.map(String::from).unwrap_or_default(),
                    span.line,
                    span.column
                )));
            }
        }
    }
    Ok(decoded)
}

fn decode_hex_pair(chars: &mut std::str::Chars<'_>, span: Span) -> Result<u8, ParseError> {
    let mut value = 0u8;
    for _ in 0..2 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| {
                ParseError::new(format!(
                    "Invalid \\x escape at line {}, column {}",
                    span.line, span.column
                ))
            })?;
        value = value * 16 + digit as u8;
    }
    Ok(value)
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> Result<Program, ParseError> {
    if tokens.is_empty() {
        return Ok(Program {
            statements: Vec::new(),
        });
    }
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use indoc::indoc;

    fn parse(input: &str) -> Result<Program, ParseError> {
        let tokens = tokenize(input).expect("tokenize failed");
        parse_tokens(tokens)
    }

    fn int(value: i64) -> Expression {
        Expression::Integer(value)
    }

    fn identifier(name: &str) -> Expression {
        Expression::Identifier(name.to_string())
    }

    fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    #[test]
    fn parses_typed_function() {
        let input = indoc! {"
            def test(a: int, b: int) -> int:
                c = a + b + 1
                return c
        "};
        let program = parse(input).expect("parse failed");

        assert_eq!(program.statements.len(), 1);
        let Statement::FunctionDef {
            name,
            params,
            returns,
            body,
        } = &program.statements[0]
        else {
            panic!("expected function definition, got {:?}", program.statements);
        };
        assert_eq!(name, "test");
        assert_eq!(
            params,
            &vec![
                Param {
                    name: "a".to_string(),
                    annotation: Some(identifier("int")),
                },
                Param {
                    name: "b".to_string(),
                    annotation: Some(identifier("int")),
                },
            ]
        );
        assert_eq!(returns, &Some(identifier("int")));

        assert_eq!(body.len(), 2);
        let Statement::Assign { target, value, .. } = &body[0] else {
            panic!("expected assignment, got {:?}", body[0]);
        };
        assert_eq!(target, &identifier("c"));
        assert_eq!(
            value,
            &binary(
                binary(identifier("a"), BinaryOperator::Add, identifier("b")),
                BinaryOperator::Add,
                int(1),
            )
        );
        assert_eq!(body[1], Statement::Return(Some(identifier("c"))));
    }

    #[test]
    fn parses_operator_precedence() {
        let program = parse("x = 1 + 2 * 3\n").expect("parse failed");
        let Statement::Assign { value, .. } = &program.statements[0] else {
            panic!("expected assignment");
        };
        assert_eq!(
            value,
            &binary(
                int(1),
                BinaryOperator::Add,
                binary(int(2), BinaryOperator::Mul, int(3)),
            )
        );
    }

    #[test]
    fn parses_literal_displays() {
        let program = parse("x = [1, 2.5]\ny = {\"k\": None, \"j\": True}\n").expect("parse failed");
        let Statement::Assign { value, .. } = &program.statements[0] else {
            panic!("expected assignment");
        };
        assert_eq!(value, &Expression::List(vec![int(1), Expression::Float(2.5)]));
        let Statement::Assign { value, .. } = &program.statements[1] else {
            panic!("expected assignment");
        };
        assert_eq!(
            value,
            &Expression::Dict(vec![
                (Expression::String("k".to_string()), Expression::None),
                (Expression::String("j".to_string()), Expression::Boolean(true)),
            ])
        );
    }

    #[test]
    fn decodes_string_and_bytes_escapes() {
        let program = parse("s = \"a\\\"b\\n\"\ndata = b\"\\x00\\xff\"\n").expect("parse failed");
        let Statement::Assign { value, .. } = &program.statements[0] else {
            panic!("expected assignment");
        };
        assert_eq!(value, &Expression::String("a\"b\n".to_string()));
        let Statement::Assign { value, .. } = &program.statements[1] else {
            panic!("expected assignment");
        };
        assert_eq!(value, &Expression::Bytes(vec![0x00, 0xff]));
    }

    #[test]
    fn parses_multi_argument_call() {
        let program = parse("test(1, 2)\n").expect("parse failed");
        assert_eq!(
            program.statements[0],
            Statement::Expr(Expression::Call {
                callee: Box::new(identifier("test")),
                args: vec![int(1), int(2)],
            })
        );
    }

    #[test]
    fn parses_general_assignment_target() {
        // Target validity is the transpiler's concern, not the parser's.
        let program = parse("[a] = 1\n").expect("parse failed");
        let Statement::Assign { target, .. } = &program.statements[0] else {
            panic!("expected assignment");
        };
        assert_eq!(target, &Expression::List(vec![identifier("a")]));
    }

    #[test]
    fn parses_bare_return() {
        let input = indoc! {"
            def fn():
                return
        "};
        let program = parse(input).expect("parse failed");
        let Statement::FunctionDef { body, .. } = &program.statements[0] else {
            panic!("expected function definition");
        };
        assert_eq!(body[0], Statement::Return(None));
    }

    #[test]
    fn errors_on_missing_block() {
        let err = parse("def fn():\n").expect_err("expected parse failure");
        assert!(err.to_string().contains("Expected indent"));
    }

    #[test]
    fn errors_on_unclosed_call() {
        let err = parse("print(1\n").expect_err("expected parse failure");
        assert!(err.to_string().contains("Expected"));
    }
}
