use std::{iter::Peekable, str::CharIndices};

use anyhow::{Result, anyhow, bail};

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    indent_stack: Vec<usize>,
    pending_tokens: Vec<Token<'a>>,
    at_line_start: bool,
    eof_reached: bool,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            indent_stack: vec![0],
            pending_tokens: Vec::new(),
            at_line_start: true,
            eof_reached: false,
            line: 1,
            column: 0,
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'a>> {
        if let Some(token) = self.pending_tokens.pop() {
            return Ok(token);
        }

        if self.eof_reached {
            return Ok(Token::new(TokenKind::EOF, self.point_span()));
        }

        if self.at_line_start {
            self.at_line_start = false;
            let indent_level = self.count_indentation()?;
            let current_indent = *self.indent_stack.last().unwrap();
            let span = self.point_span();

            if indent_level > current_indent {
                self.indent_stack.push(indent_level);
                return Ok(Token::new(TokenKind::Indent, span));
            } else if indent_level < current_indent {
                while let Some(&top) = self.indent_stack.last() {
                    if top > indent_level {
                        self.indent_stack.pop();
                        self.pending_tokens
                            .push(Token::new(TokenKind::Dedent, span));
                    } else {
                        break;
                    }
                }
                if *self.indent_stack.last().unwrap() != indent_level {
                    bail!(
                        "Invalid dedent to {} spaces at line {}, column {}",
                        indent_level,
                        self.line,
                        self.column
                    );
                }
                if !self.pending_tokens.is_empty() {
                    let token = self.pending_tokens.pop().unwrap();
                    return Ok(token);
                }
            }
        }

        self.skip_whitespace();

        let (start_idx, ch) = match self.chars.peek() {
            Some(&(idx, c)) => (idx, c),
            None => {
                self.eof_reached = true;
                // Flush remaining dedents at EOF
                while self.indent_stack.len() > 1 {
                    self.indent_stack.pop();
                    let span = self.point_span();
                    self.pending_tokens
                        .push(Token::new(TokenKind::Dedent, span));
                }
                if !self.pending_tokens.is_empty() {
                    return Ok(self.pending_tokens.pop().unwrap());
                }
                return Ok(Token::new(TokenKind::EOF, self.point_span()));
            }
        };

        let start_line = self.line;
        let start_column = self.column;
        match ch {
            '\n' => {
                self.at_line_start = true;
                Ok(self.single_char_token(TokenKind::Newline, start_idx, start_line, start_column))
            }
            '=' => Ok(self.single_char_token(TokenKind::Equal, start_idx, start_line, start_column)),
            '+' => Ok(self.single_char_token(TokenKind::Plus, start_idx, start_line, start_column)),
            '-' => {
                self.advance_char();
                if matches!(self.chars.peek(), Some(&(_, '>'))) {
                    self.advance_char();
                    Ok(Token::new(
                        TokenKind::Arrow,
                        Span {
                            start: start_idx,
                            end: start_idx + 2,
                            line: start_line,
                            column: start_column,
                        },
                    ))
                } else {
                    Ok(Token::new(
                        TokenKind::Minus,
                        Span {
                            start: start_idx,
                            end: start_idx + 1,
                            line: start_line,
                            column: start_column,
                        },
                    ))
                }
            }
            '*' => Ok(self.single_char_token(TokenKind::Star, start_idx, start_line, start_column)),
            '/' => Ok(self.single_char_token(TokenKind::Slash, start_idx, start_line, start_column)),
            '%' => {
                Ok(self.single_char_token(TokenKind::Percent, start_idx, start_line, start_column))
            }
            '<' => Ok(self.single_char_token(TokenKind::Less, start_idx, start_line, start_column)),
            ':' => Ok(self.single_char_token(TokenKind::Colon, start_idx, start_line, start_column)),
            ',' => Ok(self.single_char_token(TokenKind::Comma, start_idx, start_line, start_column)),
            '(' => {
                Ok(self.single_char_token(TokenKind::LParen, start_idx, start_line, start_column))
            }
            ')' => {
                Ok(self.single_char_token(TokenKind::RParen, start_idx, start_line, start_column))
            }
            '[' => {
                Ok(self.single_char_token(TokenKind::LBracket, start_idx, start_line, start_column))
            }
            ']' => {
                Ok(self.single_char_token(TokenKind::RBracket, start_idx, start_line, start_column))
            }
            '{' => {
                Ok(self.single_char_token(TokenKind::LBrace, start_idx, start_line, start_column))
            }
            '}' => {
                Ok(self.single_char_token(TokenKind::RBrace, start_idx, start_line, start_column))
            }
            '"' => self.read_quoted(start_idx, start_line, start_column, false),
            'b' if self.peek_second() == Some('"') => {
                self.advance_char(); // Consume the prefix
                self.read_quoted(start_idx, start_line, start_column, true)
            }
            c if c.is_alphabetic() || c == '_' => {
                Ok(self.read_identifier(start_idx, start_line, start_column))
            }
            c if c.is_ascii_digit() => self.read_number(start_idx, start_line, start_column),
            _ => Err(anyhow!(
                "Unexpected character '{}' at line {}, column {}",
                ch,
                start_line,
                start_column
            )),
        }
    }

    fn single_char_token(
        &mut self,
        kind: TokenKind<'a>,
        start: usize,
        line: usize,
        column: usize,
    ) -> Token<'a> {
        self.advance_char();
        Token::new(
            kind,
            Span {
                start,
                end: start + 1,
                line,
                column,
            },
        )
    }

    fn count_indentation(&mut self) -> Result<usize> {
        let mut count = 0;

        // Look ahead without consuming so blank lines keep the current level
        let mut temp_chars = self.chars.clone();
        let mut is_empty_line = false;

        while let Some(&(_, c)) = temp_chars.peek() {
            if c == ' ' {
                temp_chars.next();
            } else if c == '\t' {
                bail!(
                    "Tabs are not supported for indentation at line {}, column {}",
                    self.line,
                    self.column
                );
            } else if c == '\n' {
                is_empty_line = true;
                break;
            } else {
                break;
            }
        }

        if is_empty_line {
            return Ok(*self.indent_stack.last().unwrap());
        }

        while let Some(&(_, c)) = self.chars.peek() {
            if c == ' ' {
                self.advance_char();
                count += 1;
            } else {
                break;
            }
        }

        Ok(count)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == ' ' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char(); // Consume first char
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end_idx = self.current_index();
        let ident = &self.input[start..end_idx];
        let kind = match ident {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "pass" => TokenKind::Pass,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            _ => TokenKind::Identifier(ident),
        };
        Token::new(
            kind,
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        )
    }

    fn read_number(&mut self, start: usize, line: usize, column: usize) -> Result<Token<'a>> {
        self.advance_char(); // Consume first digit
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if matches!(self.chars.peek(), Some(&(_, '.'))) && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance_char(); // Consume '.'
            while let Some(&(_, c)) = self.chars.peek() {
                if c.is_ascii_digit() {
                    self.advance_char();
                } else {
                    break;
                }
            }
        }

        let end_idx = self.current_index();
        let num_str = &self.input[start..end_idx];
        let span = Span {
            start,
            end: end_idx,
            line,
            column,
        };

        if is_float {
            let num = num_str.parse::<f64>().map_err(|_| {
                anyhow!("Invalid float literal '{num_str}' at line {line}, column {column}")
            })?;
            return Ok(Token::new(TokenKind::Float(num), span));
        }

        let num = num_str.parse::<i64>().map_err(|_| {
            anyhow!("Invalid integer literal '{num_str}' at line {line}, column {column}")
        })?;
        Ok(Token::new(TokenKind::Integer(num), span))
    }

    /// Reads a `"..."` or `b"..."` literal, keeping the raw slice between the
    /// quotes. Backslash escapes are only honored to find the closing quote;
    /// decoding them is the parser's job.
    fn read_quoted(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
        is_bytes: bool,
    ) -> Result<Token<'a>> {
        self.advance_char(); // Consume opening quote
        let content_start = self.current_index();
        while let Some(&(idx, c)) = self.chars.peek() {
            match c {
                '"' => {
                    let content_end = idx;
                    self.advance_char(); // Consume closing quote
                    let raw = &self.input[content_start..content_end];
                    let kind = if is_bytes {
                        TokenKind::Bytes(raw)
                    } else {
                        TokenKind::String(raw)
                    };
                    return Ok(Token::new(
                        kind,
                        Span {
                            start,
                            end: idx + 1,
                            line,
                            column,
                        },
                    ));
                }
                '\n' => bail!("Unterminated string literal at line {line}, column {column}"),
                '\\' => {
                    self.advance_char();
                    if self.chars.peek().is_none() {
                        break;
                    }
                    self.advance_char();
                }
                _ => {
                    self.advance_char();
                }
            }
        }
        bail!("Unterminated string literal at line {line}, column {column}");
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) => Some(Ok(token)),
            Err(e) => Some(Err(e)),
        }
    }
}

impl<'a> Lexer<'a> {
    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.clone().nth(1).map(|(_, c)| c)
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }

    fn point_span(&mut self) -> Span {
        let index = self.current_index();
        Span {
            start: index,
            end: index,
            line: self.line,
            column: self.column,
        }
    }
}

pub fn tokenize<'a>(input: &'a str) -> Result<Vec<Token<'a>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds<'a>(input: &'a str) -> Vec<TokenKind<'a>> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_simple_program() {
        let input = indoc! {"
            def fn():
                n = 4 + 4
                print(n)
            fn()
        "};
        let expected_tokens = vec![
            TokenKind::Def,
            TokenKind::Identifier("fn"),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Identifier("n"),
            TokenKind::Equal,
            TokenKind::Integer(4),
            TokenKind::Plus,
            TokenKind::Integer(4),
            TokenKind::Newline,
            TokenKind::Identifier("print"),
            TokenKind::LParen,
            TokenKind::Identifier("n"),
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Identifier("fn"),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Newline,
            TokenKind::EOF,
        ];

        assert_eq!(kinds(input), expected_tokens);
    }

    #[test]
    fn tokenizes_annotated_signature() {
        let input = "def test(a: int, b: int) -> int:\n";
        let expected_tokens = vec![
            TokenKind::Def,
            TokenKind::Identifier("test"),
            TokenKind::LParen,
            TokenKind::Identifier("a"),
            TokenKind::Colon,
            TokenKind::Identifier("int"),
            TokenKind::Comma,
            TokenKind::Identifier("b"),
            TokenKind::Colon,
            TokenKind::Identifier("int"),
            TokenKind::RParen,
            TokenKind::Arrow,
            TokenKind::Identifier("int"),
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::EOF,
        ];

        assert_eq!(kinds(input), expected_tokens);
    }

    #[test]
    fn tokenizes_displays_and_keyword_literals() {
        let input = "x = [1, 2.5, True, False, None]\ny = {}\n";
        let expected_tokens = vec![
            TokenKind::Identifier("x"),
            TokenKind::Equal,
            TokenKind::LBracket,
            TokenKind::Integer(1),
            TokenKind::Comma,
            TokenKind::Float(2.5),
            TokenKind::Comma,
            TokenKind::True,
            TokenKind::Comma,
            TokenKind::False,
            TokenKind::Comma,
            TokenKind::None,
            TokenKind::RBracket,
            TokenKind::Newline,
            TokenKind::Identifier("y"),
            TokenKind::Equal,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::Newline,
            TokenKind::EOF,
        ];

        assert_eq!(kinds(input), expected_tokens);
    }

    #[test]
    fn keeps_raw_string_and_bytes_slices() {
        let input = "s = \"a\\\"b\"\ndata = b\"\\x00\\xff\"\n";
        let tokens = tokenize(input).expect("tokenize should succeed");
        assert!(
            tokens
                .iter()
                .any(|token| token.kind == TokenKind::String("a\\\"b"))
        );
        assert!(
            tokens
                .iter()
                .any(|token| token.kind == TokenKind::Bytes("\\x00\\xff"))
        );
    }

    #[test]
    fn errors_on_invalid_character() {
        let err = tokenize("x = 1 @ 2\n").expect_err("expected lexing failure");
        assert!(err.to_string().contains("Unexpected character '@'"));
    }

    #[test]
    fn errors_on_integer_overflow() {
        let err = tokenize("n = 99999999999999999999999999\n").expect_err("expected overflow");
        assert!(err.to_string().contains("Invalid integer literal"));
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize("s = \"oops\n").expect_err("expected failure");
        assert!(err.to_string().contains("Unterminated string literal"));
    }

    #[test]
    fn errors_on_tab_indentation() {
        let err = tokenize("def fn():\n\tpass\n").expect_err("expected failure");
        assert!(err.to_string().contains("Tabs are not supported"));
    }
}
