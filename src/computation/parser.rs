//! Recursive-descent parser and evaluator for computation expressions.
//!
//! Grammar (lowest precedence first, all binary operators left-associative):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := INTEGER | VARIABLE | '(' expr ')'
//! ```

use std::fmt;

use super::lexer::{Lexer, Token};
use super::Variable;

/// Maximum nesting of parentheses and unary operators
pub const MAX_DEPTH: usize = 64;

/// Maximum number of binary operators in one expression. Together with
/// `MAX_DEPTH` this bounds the height of the tree that `Expr::eval` walks.
pub const MAX_OPERATORS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        };
        write!(f, "{}", symbol)
    }
}

/// Parsed computation expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(i64),
    /// The single bound variable (`bits` or `arg`)
    Variable,
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Arithmetic failure raised while evaluating an [`Expr`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    DivisionByZero,
    ModuloByZero,
    Overflow,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::DivisionByZero => write!(f, "division by zero"),
            Fault::ModuloByZero => write!(f, "modulo by zero"),
            Fault::Overflow => write!(f, "integer overflow"),
        }
    }
}

impl Expr {
    /// Evaluate with the bound variable set to `value`
    pub fn eval(&self, value: i64) -> Result<i64, Fault> {
        match self {
            Expr::Literal(n) => Ok(*n),
            Expr::Variable => Ok(value),
            Expr::Negate(inner) => inner.eval(value)?.checked_neg().ok_or(Fault::Overflow),
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(value)?;
                let b = rhs.eval(value)?;
                match op {
                    BinaryOp::Add => a.checked_add(b).ok_or(Fault::Overflow),
                    BinaryOp::Sub => a.checked_sub(b).ok_or(Fault::Overflow),
                    BinaryOp::Mul => a.checked_mul(b).ok_or(Fault::Overflow),
                    // Rust integer division truncates toward zero
                    BinaryOp::Div if b == 0 => Err(Fault::DivisionByZero),
                    BinaryOp::Div => a.checked_div(b).ok_or(Fault::Overflow),
                    BinaryOp::Rem if b == 0 => Err(Fault::ModuloByZero),
                    BinaryOp::Rem => a.checked_rem(b).ok_or(Fault::Overflow),
                }
            }
        }
    }

}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(n) => write!(f, "{}", n),
            Expr::Variable => write!(f, "$"),
            Expr::Negate(inner) => write!(f, "(-{})", inner),
            Expr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op, rhs),
        }
    }
}

/// Recursive-descent parser over a token stream
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    variable: Variable,
    depth: usize,
    operators: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, variable: Variable) -> Self {
        Parser {
            tokens,
            pos: 0,
            variable,
            depth: 0,
            operators: 0,
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn enter(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(format!("expression nested deeper than {} levels", MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn count_operator(&mut self) -> Result<(), String> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(format!("expression has more than {} operators", MAX_OPERATORS));
        }
        Ok(())
    }

    /// Parse a complete expression, rejecting trailing tokens
    pub fn parse(&mut self) -> Result<Expr, String> {
        if self.current() == &Token::Eof {
            return Err("empty expression".to_string());
        }
        let expr = self.parse_expr()?;
        match self.current() {
            Token::Eof => Ok(expr),
            other => Err(format!("unexpected '{}' after complete expression", other)),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            self.count_operator()?;
            let rhs = self.parse_term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            self.count_operator()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        match self.current() {
            Token::Minus => {
                self.advance();
                self.enter()?;
                let inner = self.parse_unary()?;
                self.leave();
                Ok(match inner {
                    Expr::Literal(n) => Expr::Literal(-n),
                    other => Expr::Negate(Box::new(other)),
                })
            }
            Token::Plus => {
                self.advance();
                self.enter()?;
                let inner = self.parse_unary()?;
                self.leave();
                Ok(inner)
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.current().clone() {
            Token::Integer(n) => {
                self.advance();
                Ok(Expr::Literal(n))
            }
            Token::Ident(name) => {
                if name != self.variable.name() {
                    return Err(format!(
                        "unknown symbol '{}' (only '{}' is bound here)",
                        name,
                        self.variable.name()
                    ));
                }
                self.advance();
                Ok(Expr::Variable)
            }
            Token::LParen => {
                self.advance();
                self.enter()?;
                let inner = self.parse_expr()?;
                self.leave();
                match self.current() {
                    Token::RParen => {
                        self.advance();
                        Ok(inner)
                    }
                    Token::Eof => Err("unexpected end of input, expected ')'".to_string()),
                    other => Err(format!("expected ')', found '{}'", other)),
                }
            }
            Token::Eof => Err("unexpected end of input".to_string()),
            other => Err(format!("unexpected '{}'", other)),
        }
    }
}

/// Tokenize and parse `source` against `variable`
pub fn parse(source: &str, variable: Variable) -> Result<Expr, String> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens, variable).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str, value: i64) -> Result<i64, Fault> {
        parse(source, Variable::Arg).unwrap().eval(value)
    }

    #[test]
    fn test_parser_precedence() {
        assert_eq!(eval("1 + 2 * 3", 0), Ok(7));
        assert_eq!(eval("(1 + 2) * 3", 0), Ok(9));
        assert_eq!(eval("arg + arg * arg", 3), Ok(12));
    }

    #[test]
    fn test_parser_left_associativity() {
        assert_eq!(eval("10 - 3 - 2", 0), Ok(5));
        assert_eq!(eval("100 / 10 / 5", 0), Ok(2));
        assert_eq!(eval("17 % 10 % 4", 0), Ok(3));
    }

    #[test]
    fn test_division_truncates_toward_zero() {
        assert_eq!(eval("7 / 2", 0), Ok(3));
        assert_eq!(eval("-7 / 2", 0), Ok(-3));
        assert_eq!(eval("arg / -2", 7), Ok(-3));
        assert_eq!(eval("-7 % 3", 0), Ok(-1));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(eval("-arg", 4), Ok(-4));
        assert_eq!(eval("+arg", 4), Ok(4));
        assert_eq!(eval("--arg", 4), Ok(4));
        assert_eq!(eval("2 * -(arg + 1)", 4), Ok(-10));
    }

    #[test]
    fn test_division_and_modulo_by_zero() {
        assert_eq!(eval("arg / 0", 5), Err(Fault::DivisionByZero));
        assert_eq!(eval("arg % 0", 5), Err(Fault::ModuloByZero));
        assert_eq!(eval("10 / arg", 0), Err(Fault::DivisionByZero));
    }

    #[test]
    fn test_overflow() {
        assert_eq!(eval("arg * 2", i64::MAX), Err(Fault::Overflow));
        assert_eq!(eval("arg / -1", i64::MIN), Err(Fault::Overflow));
    }

    #[test]
    fn test_parser_unknown_symbol() {
        let err = parse("x + 1", Variable::Arg).unwrap_err();
        assert!(err.contains("unknown symbol 'x'"));
        assert!(parse("arg + 1", Variable::Bits).is_err());
        assert!(parse("bits + 1", Variable::Bits).is_ok());
    }

    #[test]
    fn test_parser_malformed() {
        assert!(parse("", Variable::Arg).is_err());
        assert!(parse("(arg + 1", Variable::Arg).is_err());
        assert!(parse("arg + 1)", Variable::Arg).is_err());
        assert!(parse("arg +", Variable::Arg).is_err());
        assert!(parse("arg arg", Variable::Arg).is_err());
        assert!(parse("()", Variable::Arg).is_err());
        assert!(parse("* 2", Variable::Arg).is_err());
    }

    #[test]
    fn test_parser_depth_limit() {
        let shallow = format!("{}arg{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(parse(&shallow, Variable::Arg).is_ok());
        let deep = format!("{}arg{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(parse(&deep, Variable::Arg).unwrap_err().contains("nested"));
    }

    #[test]
    fn test_parser_operator_chain_limit() {
        let longest = format!("arg{}", " + 1".repeat(MAX_OPERATORS));
        assert_eq!(parse(&longest, Variable::Arg).unwrap().eval(0), Ok(MAX_OPERATORS as i64));
        let too_long = format!("arg{}", " * 1".repeat(MAX_OPERATORS + 1));
        assert!(parse(&too_long, Variable::Arg).unwrap_err().contains("operators"));
        // Very long flat chains fail at parse time instead of exhausting the stack later
        let huge = format!("arg{}", " + 1".repeat(200_000));
        assert!(parse(&huge, Variable::Arg).is_err());
    }

    #[test]
    fn test_display_expr() {
        let expr = parse("(bits + 1) * 2", Variable::Bits).unwrap();
        assert_eq!(expr.to_string(), "(($ + 1) * 2)");
    }
}
