//! Lexer for the computation mini-language
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ident(String),
    Integer(i64),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Integer(i) => write!(f, "{}", i),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Hand-written lexer over a computation string
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_integer(&mut self) -> Result<i64, String> {
        let start = self.pos;
        let mut result = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
            .parse()
            .map_err(|_| format!("integer literal '{}' at column {} is too large", result, start + 1))
    }

    fn read_ident(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    pub fn next_token(&mut self) -> Result<Token, String> {
        self.skip_whitespace();

        let column = self.pos + 1;
        match self.current() {
            None => Ok(Token::Eof),
            Some(ch) if ch.is_ascii_digit() => Ok(Token::Integer(self.read_integer()?)),
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => Ok(Token::Ident(self.read_ident())),
            Some(ch) => {
                self.advance();
                match ch {
                    '(' => Ok(Token::LParen),
                    ')' => Ok(Token::RParen),
                    '+' => Ok(Token::Plus),
                    '-' => Ok(Token::Minus),
                    '*' => Ok(Token::Star),
                    '/' => Ok(Token::Slash),
                    '%' => Ok(Token::Percent),
                    other => Err(format!(
                        "unexpected character '{}' at column {}",
                        other, column
                    )),
                }
            }
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexer_basic() {
        let mut lexer = Lexer::new("(bits + 1) * 2");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::Ident("bits".to_string()),
                Token::Plus,
                Token::Integer(1),
                Token::RParen,
                Token::Star,
                Token::Integer(2),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_no_whitespace() {
        let mut lexer = Lexer::new("arg%3-1");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("arg".to_string()),
                Token::Percent,
                Token::Integer(3),
                Token::Minus,
                Token::Integer(1),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_empty_input() {
        let mut lexer = Lexer::new("   ");
        assert_eq!(lexer.tokenize().unwrap(), vec![Token::Eof]);
    }

    #[test]
    fn test_lexer_unexpected_character() {
        let mut lexer = Lexer::new("arg ^ 2");
        let err = lexer.tokenize().unwrap_err();
        assert!(err.contains("'^'"));
        assert!(err.contains("column 5"));
    }

    #[test]
    fn test_lexer_integer_overflow() {
        let mut lexer = Lexer::new("99999999999999999999");
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn test_display_token() {
        assert_eq!(Token::Percent.to_string(), "%");
        assert_eq!(Token::Ident("arg".to_string()).to_string(), "arg");
        assert_eq!(Token::Eof.to_string(), "end of input");
    }
}
