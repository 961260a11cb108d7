//! Calculator tool — evaluates arithmetic expressions.
//!
//! Supports `+`, `-`, `*`, `/`, parentheses, unary negation and decimal
//! numbers via a small recursive-descent parser. Bad input never raises:
//! the model gets an `Error: ...` result it can read and recover from.

use async_trait::async_trait;
use docassist_core::error::ToolError;
use docassist_core::tool::{Tool, ToolResult};

/// Decimal places kept when printing results.
const DISPLAY_PRECISION: f64 = 1e10;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports +, -, *, /, parentheses and decimal numbers. \
         Use it for every calculation, e.g. '22000 * 0.15' for 15% of 22000."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The expression to evaluate, e.g. '(69300 + 214500) / 2'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let Some(expr) = arguments["expression"].as_str() else {
            return Ok(ToolResult::error("missing 'expression' argument"));
        };

        match evaluate(expr) {
            Ok(value) => {
                let formatted = format_number(value);
                Ok(ToolResult::ok(
                    format!("{} = {}", expr.trim(), formatted),
                    Some(serde_json::json!({"expression": expr.trim(), "result": tidy(value)})),
                ))
            }
            Err(e) => Ok(ToolResult::error(e)),
        }
    }
}

/// Round away binary floating-point noise such as `15.000000000000002`.
fn tidy(value: f64) -> f64 {
    if value.abs() >= 1e15 {
        return value;
    }
    let rounded = (value * DISPLAY_PRECISION).round() / DISPLAY_PRECISION;
    // Avoid printing "-0"
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Format a result the way a person would write it: `15`, not `15.0`.
pub fn format_number(value: f64) -> String {
    format!("{}", tidy(value))
}

// ── Recursive-descent expression evaluator ────────────────────────────────

/// Evaluate an arithmetic expression string.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let result = parser.parse_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(format!(
            "Unexpected token at position {}: {:?}",
            parser.pos, parser.tokens[parser.pos]
        ));
    }
    if !result.is_finite() {
        return Err("Result is not a finite number".into());
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '/' => { tokens.push(Token::Slash); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| format!("Invalid number: {num_str}"))?;
                tokens.push(Token::Number(num));
            }
            c => return Err(format!("Unexpected character: '{c}'")),
        }
    }

    Ok(tokens)
}

/// Nesting deeper than this is rejected before it can exhaust the stack.
const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err("Expression nested too deeply".into());
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut left = self.parse_term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.consume();
                    left += self.parse_term()?;
                }
                Token::Minus => {
                    self.consume();
                    left -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // term = unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<f64, String> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.consume();
                    left *= self.parse_unary()?;
                }
                Token::Slash => {
                    self.consume();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err("Division by zero".into());
                    }
                    left /= right;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // unary = '-' unary | primary
    fn parse_unary(&mut self) -> Result<f64, String> {
        if let Some(Token::Minus) = self.peek() {
            self.consume();
            self.descend()?;
            let val = -self.parse_unary()?;
            self.depth -= 1;
            return Ok(val);
        }
        self.parse_primary()
    }

    // primary = NUMBER | '(' expr ')'
    fn parse_primary(&mut self) -> Result<f64, String> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(*n),
            Some(Token::LParen) => {
                self.descend()?;
                let val = self.parse_expr()?;
                self.depth -= 1;
                match self.consume() {
                    Some(Token::RParen) => Ok(val),
                    _ => Err("Expected closing parenthesis".into()),
                }
            }
            Some(tok) => Err(format!("Unexpected token: {tok:?}")),
            None => Err("Unexpected end of expression".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(expr: &str) -> ToolResult {
        CalculatorTool
            .execute(serde_json::json!({ "expression": expr }))
            .await
            .unwrap()
    }

    #[test]
    fn operator_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
    }

    #[test]
    fn unary_negation() {
        assert_eq!(evaluate("-5 + 3").unwrap(), -2.0);
        assert_eq!(evaluate("-(2 * 3)").unwrap(), -6.0);
    }

    #[test]
    fn division_by_zero() {
        assert!(evaluate("1 / 0").is_err());
    }

    #[test]
    fn malformed_input() {
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1.2.3").is_err());
    }

    #[test]
    fn shallow_nesting_is_fine() {
        let expr = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&expr).unwrap(), 1.0);
        assert_eq!(evaluate(&format!("{}1", "-".repeat(100))).unwrap(), 1.0);
    }

    #[tokio::test]
    async fn deep_nesting_is_error_text() {
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let result = run(&parens).await;
        assert!(!result.success);
        assert!(result.output.starts_with("Error:"));
        assert!(result.output.contains("nested too deeply"));

        let negations = format!("{}1", "-".repeat(10_000));
        assert!(!run(&negations).await.success);
    }

    #[test]
    fn float_noise_is_rounded() {
        assert_eq!(format_number(100.0 * 0.15), "15");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(10.0 / 4.0), "2.5");
        assert_eq!(format_number(-0.0), "0");
    }

    #[tokio::test]
    async fn reference_cases() {
        assert_eq!(run("2 + 2").await.output, "2 + 2 = 4");
        assert_eq!(run("100 * 0.15").await.output, "100 * 0.15 = 15");
        assert_eq!(run("(69300 + 214500)").await.output, "(69300 + 214500) = 283800");
        assert_eq!(run("22000 * 0.15").await.output, "22000 * 0.15 = 3300");
    }

    #[tokio::test]
    async fn result_data_is_numeric() {
        let result = run("10 / 4").await;
        assert!(result.success);
        assert_eq!(result.data.unwrap()["result"], 2.5);
    }

    #[tokio::test]
    async fn non_arithmetic_is_error_text() {
        let result = run("import os").await;
        assert!(!result.success);
        assert!(result.output.starts_with("Error:"));

        let result = run("2 ** 3").await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn missing_expression_is_error_text() {
        let result = CalculatorTool.execute(serde_json::json!({})).await.unwrap();
        assert!(!result.success);
        assert!(result.output.contains("expression"));
    }

    #[test]
    fn tool_definition() {
        assert_eq!(CalculatorTool.to_definition().name, "calculator");
    }
}
