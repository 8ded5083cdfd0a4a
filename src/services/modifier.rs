//! Modifier chain and numeric coercion for device writes.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::models::modifier::Modifier;
use crate::models::value::Value;
use crate::services::precondition::compare;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModifierError {
    #[error("An error occurred on parsing your value formula \"{expression}\": {reason}")]
    Parse { expression: String, reason: String },
}

impl ModifierError {
    fn parse(expression: &str, reason: impl Into<String>) -> Self {
        ModifierError::Parse {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

static NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?)(\d[\d,]*)(?:\.(\d*))?\s*$").expect("Invalid number regex")
});

/// Coerce text into the integer form hardware outputs expect.
///
/// Group separators are stripped (`"40,8"` is `408`), fractions are truncated toward zero
/// and anything that is not a number becomes `1`.
pub fn parse_value(text: &str) -> i32 {
    let Some(captures) = NUMBER_PATTERN.captures(text) else {
        return 1;
    };

    let sign = captures.get(1).map_or("", |m| m.as_str());
    let digits: String = captures
        .get(2)
        .map_or("", |m| m.as_str())
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    match digits.parse::<i64>() {
        Ok(magnitude) => {
            let value = if sign == "-" { -magnitude } else { magnitude };
            value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
        }
        Err(_) => 1,
    }
}

/// Run every active modifier in order.
pub fn apply_modifiers(modifiers: &[Modifier], value: Value) -> Result<Value, ModifierError> {
    modifiers
        .iter()
        .filter(|modifier| modifier.is_active())
        .try_fold(value, |current, modifier| apply(modifier, current))
}

fn apply(modifier: &Modifier, value: Value) -> Result<Value, ModifierError> {
    match modifier {
        Modifier::Transformation { expression, .. } => {
            let Value::Number(current) = value else {
                return Ok(value);
            };
            if expression.trim().is_empty() {
                return Ok(Value::Number(current));
            }
            evaluate(expression, current).map(Value::Number)
        }
        Modifier::Comparison {
            operand,
            value: expected,
            if_value,
            else_value,
            ..
        } => {
            let current = value.to_string();
            let branch = if compare(*operand, &current, expected) {
                if_value
            } else {
                else_value
            };
            let result = branch.replace('$', &current);
            Ok(match result.trim().parse::<f64>() {
                Ok(number) => Value::Number(number),
                Err(_) => Value::Text(result),
            })
        }
    }
}

/// Evaluate an arithmetic expression where `$` stands for `current`.
pub fn evaluate(expression: &str, current: f64) -> Result<f64, ModifierError> {
    let tokens = tokenize(expression).map_err(|reason| ModifierError::parse(expression, reason))?;
    let mut parser = Parser {
        tokens: &tokens,
        position: 0,
        current,
    };
    let result = parser
        .expression()
        .and_then(|value| match parser.peek() {
            None => Ok(value),
            Some(token) => Err(format!("unexpected {:?}", token)),
        })
        .map_err(|reason| ModifierError::parse(expression, reason))?;

    if result.is_finite() {
        Ok(result)
    } else {
        Err(ModifierError::parse(expression, "result is not a finite number"))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Current,
    Ident(String),
    Op(char),
    Open,
    Close,
    Comma,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '$' => {
                chars.next();
                tokens.push(Token::Current);
            }
            '+' | '-' | '*' | '/' | '%' => {
                chars.next();
                tokens.push(Token::Op(c));
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = literal
                    .parse()
                    .map_err(|_| format!("invalid number \"{}\"", literal))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident.to_ascii_lowercase()));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    current: f64,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!("expected {:?}, found {:?}", expected, token)),
            None => Err(format!("expected {:?}, found end of formula", expected)),
        }
    }

    fn expression(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.position += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.position += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err("division by zero".to_string()),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.position += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.position += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Current) => Ok(self.current),
            Some(Token::Open) => {
                let value = self.expression()?;
                self.expect(Token::Close)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => self.call(&name),
            Some(token) => Err(format!("unexpected {:?}", token)),
            None => Err("unexpected end of formula".to_string()),
        }
    }

    fn call(&mut self, name: &str) -> Result<f64, String> {
        self.expect(Token::Open)?;
        let mut args = vec![self.expression()?];
        while self.peek() == Some(&Token::Comma) {
            self.position += 1;
            args.push(self.expression()?);
        }
        self.expect(Token::Close)?;

        match (name, args.as_slice()) {
            ("round", [x]) => Ok(x.round()),
            ("round", [x, digits]) => {
                let factor = 10f64.powi(*digits as i32);
                Ok((x * factor).round() / factor)
            }
            ("floor", [x]) => Ok(x.floor()),
            ("ceil", [x]) => Ok(x.ceil()),
            ("abs", [x]) => Ok(x.abs()),
            ("min", [a, b]) => Ok(a.min(*b)),
            ("max", [a, b]) => Ok(a.max(*b)),
            _ => Err(format!("unknown function {}/{}", name, args.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::precondition::Operand;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("40,8"), 408);
        assert_eq!(parse_value("-3.5"), -3);
        assert_eq!(parse_value("something"), 1);
        assert_eq!(parse_value("10000.00"), 10000);
        assert_eq!(parse_value("-500.8"), -500);
        assert_eq!(parse_value("0.0"), 0);
        assert_eq!(parse_value("4.22223"), 4);
        assert_eq!(parse_value("123"), 123);
        assert_eq!(parse_value(""), 1);
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(evaluate("$*2", 21.0).unwrap(), 42.0);
        assert_eq!(evaluate("($ + 1) * 2", 1.0).unwrap(), 4.0);
        assert_eq!(evaluate("-$ + 10 % 4", 1.0).unwrap(), 1.0);
        assert_eq!(evaluate("round($ / 3, 2)", 10.0).unwrap(), 3.33);
        assert_eq!(evaluate("max(min($, 100), 0)", 150.0).unwrap(), 100.0);
        assert_eq!(evaluate("abs(floor($))", -2.5).unwrap(), 3.0);
    }

    #[test]
    fn test_evaluate_errors() {
        let err = evaluate("$ *", 1.0).unwrap_err();
        assert!(err.to_string().contains("error occurred on parsing your value formula"));
        assert!(evaluate("$ / 0", 1.0).is_err());
        assert!(evaluate("foo($)", 1.0).is_err());
        assert!(evaluate("($ + 1", 1.0).is_err());
    }

    #[test]
    fn test_chain_skips_inactive() {
        let mut inactive = Modifier::transformation("$*1000");
        if let Modifier::Transformation { active, .. } = &mut inactive {
            *active = false;
        }
        let chain = vec![Modifier::transformation("$+1"), inactive, Modifier::transformation("$*2")];

        assert_eq!(apply_modifiers(&chain, Value::Number(1.0)).unwrap(), Value::Number(4.0));
    }

    #[test]
    fn test_comparison_substitutes_current_value() {
        let chain = vec![Modifier::comparison(Operand::Greater, "10", "high:$", "low")];

        assert_eq!(
            apply_modifiers(&chain, Value::Number(12.0)).unwrap(),
            Value::Text("high:12".to_string())
        );
        assert_eq!(
            apply_modifiers(&chain, Value::Number(3.0)).unwrap(),
            Value::Text("low".to_string())
        );
    }

    #[test]
    fn test_text_passes_transformations() {
        let chain = vec![Modifier::transformation("$*2")];
        assert_eq!(
            apply_modifiers(&chain, Value::from("ABC")).unwrap(),
            Value::from("ABC")
        );
    }
}
