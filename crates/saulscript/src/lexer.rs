//! Character-by-character scanner.
//!
//! A single left-to-right pass with one character of lookahead and a
//! mutable accumulator for the token being built (string, number, or
//! identifier). Everything else is emitted directly from the dispatch
//! table. The output always ends with at least one line terminator.

use crate::{
    error::Error,
    token::{Op, Token, TokenKind},
};

/// Lexes `source` into a token stream.
pub(crate) fn lex(source: &str) -> Result<Vec<Token>, Error> {
    Lexer::new(source).run()
}

/// Partially accumulated token, together with the line it started on.
enum Pending {
    Str { body: String, delimiter: char },
    Number(String),
    Identifier(String),
}

struct Lexer {
    src: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
    current: Option<(Pending, usize)>,
    in_escape: bool,
    in_line_comment: bool,
    in_block_comment: bool,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            src: source.chars().collect(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            current: None,
            in_escape: false,
            in_line_comment: false,
            in_block_comment: false,
        }
    }

    fn next_char(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn get_char(&mut self) -> Option<char> {
        let ch = self.src.get(self.pos).copied()?;
        self.pos += 1;
        Some(ch)
    }

    fn back_up(&mut self) {
        self.pos -= 1;
    }

    fn skip_ahead(&mut self) {
        self.pos += 1;
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.line));
    }

    fn flush(&mut self, pending: Pending, line: usize) {
        let kind = match pending {
            Pending::Str { body, delimiter } => TokenKind::Str { body, delimiter },
            Pending::Number(body) => TokenKind::Number(body),
            Pending::Identifier(body) => TokenKind::Identifier(body),
        };
        self.tokens.push(Token::new(kind, line));
    }

    fn run(mut self) -> Result<Vec<Token>, Error> {
        while let Some(ch) = self.get_char() {
            match self.current.take() {
                None => self.dispatch(ch)?,
                Some((pending, line)) => self.continue_pending(pending, line, ch)?,
            }
        }
        if let Some((pending, line)) = self.current.take() {
            self.flush(pending, line);
        }
        if !matches!(
            self.tokens.last(),
            Some(Token {
                kind: TokenKind::LineTerminator,
                ..
            })
        ) {
            self.line += 1;
            self.push(TokenKind::LineTerminator);
        }
        Ok(self.tokens)
    }

    /// Handles one character while no accumulator is active.
    fn dispatch(&mut self, ch: char) -> Result<(), Error> {
        match ch {
            '\n' if !self.in_block_comment => {
                self.in_line_comment = false;
                self.push(TokenKind::LineTerminator);
                self.line += 1;
            }
            '*' if self.next_char() == Some('/') => {
                if !self.in_block_comment {
                    return Err(Error::parse(self.line, "Ending block comment token unexpected."));
                }
                self.in_block_comment = false;
                self.skip_ahead();
            }
            _ if self.in_line_comment || self.in_block_comment => {
                if ch == '\n' {
                    self.line += 1;
                }
            }
            '\'' | '"' => {
                self.in_escape = false;
                self.current = Some((
                    Pending::Str {
                        body: String::new(),
                        delimiter: ch,
                    },
                    self.line,
                ));
            }
            _ if ch.is_ascii_digit() || (ch == '.' && self.next_char().is_some_and(|c| c.is_ascii_digit())) => {
                self.current = Some((Pending::Number(ch.to_string()), self.line));
            }
            _ if ch.is_ascii_alphabetic() || ch == '_' => {
                self.current = Some((Pending::Identifier(ch.to_string()), self.line));
            }
            '>' => self.push_maybe_eq(Op::Ge, Op::Gt),
            '<' => self.push_maybe_eq(Op::Le, Op::Lt),
            '=' => self.push_maybe_eq(Op::Eq, Op::Assign),
            '+' => self.push(TokenKind::Op(Op::Add)),
            '-' => self.push(TokenKind::Op(Op::Sub)),
            '/' if self.next_char() == Some('/') => {
                self.in_line_comment = true;
                self.skip_ahead();
            }
            '/' if self.next_char() == Some('*') => {
                self.in_block_comment = true;
                self.skip_ahead();
            }
            '/' => self.push(TokenKind::Op(Op::Div)),
            '*' if self.next_char() == Some('*') => {
                self.push(TokenKind::Op(Op::Pow));
                self.skip_ahead();
            }
            '*' => self.push(TokenKind::Op(Op::Mul)),
            '\\' if self.next_char() == Some('\n') => {
                // escaped line terminator: swallow the newline, no token
                self.skip_ahead();
                self.line += 1;
            }
            '(' => self.push(TokenKind::LeftParen),
            ')' => self.push(TokenKind::RightParen),
            '{' => self.push(TokenKind::LeftBrace),
            '}' => self.push(TokenKind::RightBrace),
            '[' => self.push(TokenKind::LeftBracket),
            ']' => self.push(TokenKind::RightBracket),
            ':' => self.push(TokenKind::Colon),
            ',' => self.push(TokenKind::Comma),
            _ if ch.is_ascii_whitespace() => {}
            _ => return Err(Error::UnexpectedCharacter { line: self.line, ch }),
        }
        Ok(())
    }

    /// Emits the two-char operator when the next char is `=`, otherwise
    /// the single-char one.
    fn push_maybe_eq(&mut self, combined: Op, single: Op) {
        if self.next_char() == Some('=') {
            self.push(TokenKind::Op(combined));
            self.skip_ahead();
        } else {
            self.push(TokenKind::Op(single));
        }
    }

    /// Handles one character while a string/number/identifier is open.
    fn continue_pending(&mut self, pending: Pending, line: usize, ch: char) -> Result<(), Error> {
        match pending {
            Pending::Str { mut body, delimiter } => {
                if self.in_escape {
                    body.push(ch);
                    self.in_escape = false;
                    self.current = Some((Pending::Str { body, delimiter }, line));
                } else if ch == '\\' {
                    self.in_escape = true;
                    self.current = Some((Pending::Str { body, delimiter }, line));
                } else if ch == delimiter {
                    self.flush(Pending::Str { body, delimiter }, line);
                } else {
                    if ch == '\n' {
                        self.line += 1;
                    }
                    body.push(ch);
                    self.current = Some((Pending::Str { body, delimiter }, line));
                }
            }
            Pending::Number(mut body) => {
                if ch.is_ascii_digit() || ch == '.' {
                    if ch == '.' && body.contains('.') {
                        return Err(Error::parse(self.line, "Second . found in number"));
                    }
                    body.push(ch);
                    self.current = Some((Pending::Number(body), line));
                } else {
                    self.flush(Pending::Number(body), line);
                    self.back_up();
                }
            }
            Pending::Identifier(mut body) => {
                if ch.is_ascii_alphanumeric() || ch == '$' || ch == '_' {
                    body.push(ch);
                    self.current = Some((Pending::Identifier(body), line));
                } else if ch == '.' {
                    // member resolution operator terminates the identifier
                    self.flush(Pending::Identifier(body), line);
                    self.push(TokenKind::Op(Op::Dot));
                } else {
                    self.flush(Pending::Identifier(body), line);
                    self.back_up();
                }
            }
        }
        Ok(())
    }
}
