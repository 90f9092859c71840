//! EWKT tokenizer.
//!
//! Converts an EWKT string into a stream of tokens for the parser.

use std::{iter::Peekable, str::Chars};

use crate::error::LexError;

/// A token in the EWKT grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare uppercase word: a geometry tag or the `EMPTY` keyword.
    Word(String),
    /// A numeric literal (coordinate ordinate or radius).
    Number(f64),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `SRID=<n>`, captured with its numeric value.
    Srid(u32),
    /// `;` separating the SRID prefix from the geometry body.
    Semicolon,
}

/// Tokenizes an EWKT string.
struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, chars: input.chars().peekable(), position: 0 }
    }

    fn error_at(&self, message: impl Into<String>, position: usize) -> LexError {
        LexError::new(message, position, self.input)
    }

    fn advance(&mut self) {
        if let Some(ch) = self.chars.next() {
            self.position += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let Some(&ch) = self.chars.peek() else {
            return Ok(None);
        };

        match ch {
            '(' => {
                self.advance();
                Ok(Some(Token::LParen))
            }
            ')' => {
                self.advance();
                Ok(Some(Token::RParen))
            }
            ',' => {
                self.advance();
                Ok(Some(Token::Comma))
            }
            ';' => {
                self.advance();
                Ok(Some(Token::Semicolon))
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.read_number(),
            c if c.is_ascii_alphabetic() => self.read_word(),
            other => Err(self.error_at(format!("unexpected character {other:?}"), self.position)),
        }
    }

    fn read_number(&mut self) -> Result<Option<Token>, LexError> {
        let start = self.position;
        let mut text = String::new();

        if matches!(self.chars.peek(), Some('-') | Some('+')) {
            text.push(self.chars.next().unwrap());
            self.position += 1;
        }

        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                text.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E') && !seen_exp {
                seen_exp = true;
                text.push(ch);
                self.advance();
                if matches!(self.chars.peek(), Some('-') | Some('+')) {
                    text.push(self.chars.next().unwrap());
                    self.position += 1;
                }
            } else {
                break;
            }
        }

        text.parse::<f64>()
            .map(|n| Some(Token::Number(n)))
            .map_err(|_| self.error_at(format!("invalid number literal {text:?}"), start))
    }

    fn read_word(&mut self) -> Result<Option<Token>, LexError> {
        let start = self.position;
        let mut word = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if word.eq_ignore_ascii_case("SRID") {
            self.skip_whitespace();
            if self.chars.peek() != Some(&'=') {
                return Err(self.error_at("expected '=' after SRID", self.position));
            }
            self.advance();
            let mut digits = String::new();
            while let Some(&ch) = self.chars.peek() {
                if ch.is_ascii_digit() {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            return digits
                .parse::<u32>()
                .map(|n| Some(Token::Srid(n)))
                .map_err(|_| self.error_at("expected a numeric SRID", start));
        }

        Ok(Some(Token::Word(word.to_ascii_uppercase())))
    }
}

/// Convenience function to tokenize an EWKT string.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_point() {
        assert_eq!(
            tokenize("POINT(1 2)").unwrap(),
            vec![
                Token::Word("POINT".into()),
                Token::LParen,
                Token::Number(1.0),
                Token::Number(2.0),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn tokenizes_srid_prefix() {
        assert_eq!(
            tokenize("SRID=4326;POINT(1 2)").unwrap()[0..3],
            [Token::Srid(4326), Token::Semicolon, Token::Word("POINT".into())]
        );
    }

    #[test]
    fn tokenizes_negative_and_decimal() {
        assert_eq!(
            tokenize("-1.5 2.25").unwrap(),
            vec![Token::Number(-1.5), Token::Number(2.25)]
        );
    }

    #[test]
    fn tokenizes_empty_keyword() {
        assert_eq!(
            tokenize("POLYGON EMPTY").unwrap(),
            vec![Token::Word("POLYGON".into()), Token::Word("EMPTY".into())]
        );
    }

    #[test]
    fn rejects_unexpected_character() {
        let err = tokenize("POINT(1 2) #").unwrap_err();
        assert!(err.message.contains("unexpected character"));
    }
}
