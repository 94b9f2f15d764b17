//! SQL Lexer (Tokenizer)
//!
//! This module converts SQL strings into a stream of tokens, and splits
//! scripts into their individual statements.

use super::token::Token;
use crate::error::{Error, Result};

/// SQL Lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Split a script into statement texts on top-level semicolons.
    ///
    /// Semicolons inside string literals, quoted identifiers and comments do
    /// not split. Whitespace and comments between statements are dropped, so
    /// every returned text starts at the statement's first token.
    pub fn split_statements(script: &str) -> Vec<String> {
        let chars: Vec<char> = script.chars().collect();
        let mut statements = Vec::new();
        let mut current = String::new();
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            let next = chars.get(i + 1).copied();

            match ch {
                '-' if next == Some('-') => {
                    let end = chars[i..]
                        .iter()
                        .position(|&c| c == '\n')
                        .map_or(chars.len(), |offset| i + offset);
                    if !current.is_empty() {
                        current.extend(&chars[i..end]);
                    }
                    i = end;
                }
                '/' if next == Some('*') => {
                    let end = chars[i + 2..]
                        .windows(2)
                        .position(|w| w == ['*', '/'])
                        .map_or(chars.len(), |offset| i + 2 + offset + 2);
                    if !current.is_empty() {
                        current.extend(&chars[i..end]);
                    }
                    i = end;
                }
                '\'' | '"' => {
                    // Doubled quotes inside a literal read as two adjacent literals,
                    // which keeps the split position correct.
                    let end = chars[i + 1..]
                        .iter()
                        .position(|&c| c == ch)
                        .map_or(chars.len(), |offset| i + 1 + offset + 1);
                    current.extend(&chars[i..end]);
                    i = end;
                }
                ';' => {
                    let statement = current.trim();
                    if !statement.is_empty() {
                        statements.push(statement.to_string());
                    }
                    current.clear();
                    i += 1;
                }
                c if c.is_whitespace() && current.is_empty() => i += 1,
                c => {
                    current.push(c);
                    i += 1;
                }
            }
        }

        let statement = current.trim();
        if !statement.is_empty() {
            statements.push(statement.to_string());
        }
        statements
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let ch = self.current_char();

        // Single character tokens
        let single = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '.' => Some(Token::Dot),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Asterisk),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '=' => Some(Token::Eq),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match ch {
            '<' => {
                self.advance();
                if self.eat('=') {
                    return Ok(Token::Lte);
                }
                if self.eat('>') {
                    return Ok(Token::Neq);
                }
                Ok(Token::Lt)
            }
            '>' => {
                self.advance();
                if self.eat('=') {
                    return Ok(Token::Gte);
                }
                Ok(Token::Gt)
            }
            '!' => {
                self.advance();
                if self.eat('=') {
                    return Ok(Token::Neq);
                }
                Err(Error::UnexpectedCharacter('!', self.position - 1))
            }
            '|' => {
                self.advance();
                if self.eat('|') {
                    return Ok(Token::Concat);
                }
                Err(Error::UnexpectedCharacter('|', self.position - 1))
            }
            '\'' => self.read_string(),
            '"' => self.read_quoted_identifier(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier()),
            c => Err(Error::UnexpectedCharacter(c, self.position)),
        }
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the current character
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// Peek at the next character
    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Consume the current character if it matches
    fn eat(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.current_char() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip whitespace and SQL comments (-- and /* */)
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while !self.is_at_end() && self.current_char().is_whitespace() {
                self.advance();
            }
            if self.is_at_end() {
                return;
            }

            match (self.current_char(), self.peek_char()) {
                ('-', Some('-')) => {
                    while !self.is_at_end() && self.current_char() != '\n' {
                        self.advance();
                    }
                }
                ('/', Some('*')) => {
                    self.advance(); // skip /
                    self.advance(); // skip *
                    while !self.is_at_end() {
                        if self.current_char() == '*' && self.peek_char() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    /// Read a delimited run of characters, where a doubled delimiter escapes itself
    fn read_delimited(&mut self, delimiter: char) -> Result<String> {
        let start_pos = self.position;
        self.advance(); // skip opening delimiter

        let mut value = String::new();
        while !self.is_at_end() {
            let ch = self.current_char();
            self.advance();
            if ch != delimiter {
                value.push(ch);
            } else if self.eat(delimiter) {
                value.push(delimiter);
            } else {
                return Ok(value);
            }
        }

        Err(Error::UnterminatedString(start_pos))
    }

    /// Read a string literal (single-quoted)
    fn read_string(&mut self) -> Result<Token> {
        self.read_delimited('\'').map(Token::StringLiteral)
    }

    /// Read a quoted identifier (double-quoted)
    fn read_quoted_identifier(&mut self) -> Result<Token> {
        self.read_delimited('"').map(Token::Identifier)
    }

    /// Read a number (integer or float)
    fn read_number(&mut self) -> Result<Token> {
        let start_pos = self.position;
        let mut value = String::new();
        let mut is_float = false;

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !is_float && self.peek_char().is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if is_float {
            value
                .parse::<f64>()
                .map(Token::FloatLiteral)
                .map_err(|_| Error::InvalidNumber(start_pos))
        } else {
            value
                .parse::<u64>()
                .map(Token::IntegerLiteral)
                .map_err(|_| Error::InvalidNumber(start_pos))
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::from_keyword(&value).unwrap_or(Token::Identifier(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_select() {
        let mut lexer = Lexer::new("SELECT * FROM customers");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Select,
                Token::Asterisk,
                Token::From,
                Token::Identifier("customers".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_select_with_where() {
        let mut lexer = Lexer::new("SELECT id, score FROM customers WHERE score >= 500");
        let tokens = lexer.tokenize().unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Select,
                Token::Identifier("id".to_string()),
                Token::Comma,
                Token::Identifier("score".to_string()),
                Token::From,
                Token::Identifier("customers".to_string()),
                Token::Where,
                Token::Identifier("score".to_string()),
                Token::Gte,
                Token::IntegerLiteral(500),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_minus_is_never_folded_into_literals() {
        let tokens = Lexer::new("score-5").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("score".to_string()),
                Token::Minus,
                Token::IntegerLiteral(5),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_escaped_string() {
        let tokens = Lexer::new("SELECT 'it''s a test'").tokenize().unwrap();
        assert_eq!(tokens[1], Token::StringLiteral("it's a test".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let result = Lexer::new("SELECT 'oops").tokenize();
        assert!(matches!(result, Err(Error::UnterminatedString(7))));
    }

    #[test]
    fn test_operators() {
        let tokens = Lexer::new("a < b <= c > d >= e <> f != g || h % i")
            .tokenize()
            .unwrap();

        assert!(tokens.contains(&Token::Lt));
        assert!(tokens.contains(&Token::Lte));
        assert!(tokens.contains(&Token::Gt));
        assert!(tokens.contains(&Token::Gte));
        assert!(tokens.contains(&Token::Concat));
        assert!(tokens.contains(&Token::Percent));
        assert_eq!(tokens.iter().filter(|t| **t == Token::Neq).count(), 2);
    }

    #[test]
    fn test_float_literal() {
        let tokens = Lexer::new("SELECT 2.5").tokenize().unwrap();
        assert_eq!(tokens[1], Token::FloatLiteral(2.5));
    }

    #[test]
    fn test_comments() {
        let tokens = Lexer::new("SELECT -- this is a comment\n* /* another */ FROM orders --")
            .tokenize()
            .unwrap();

        assert_eq!(
            tokens,
            vec![
                Token::Select,
                Token::Asterisk,
                Token::From,
                Token::Identifier("orders".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let result = Lexer::new("SELECT #").tokenize();
        assert!(matches!(result, Err(Error::UnexpectedCharacter('#', 7))));
    }

    #[test]
    fn test_split_statements() {
        let script = "-- intro\nSELECT 1;\n\n/* two */ SELECT 'a;b' FROM t;  ;\nSELECT 3 -- tail";
        assert_eq!(
            Lexer::split_statements(script),
            vec!["SELECT 1", "SELECT 'a;b' FROM t", "SELECT 3 -- tail"]
        );
    }

    #[test]
    fn test_split_statements_only_comments() {
        assert!(Lexer::split_statements("-- nothing here\n/* at all */\n").is_empty());
    }
}
