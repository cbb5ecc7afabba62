//! Per-channel calibration functions.
//!
//! A calibration is configured as a formula in the variable `x` (the raw amplitude), e.g.
//! `1.02*x - 3.5` or `sqrt(x)*12 + x^2/1e4`. The formula is parsed once into an expression
//! tree and evaluated for every hit afterwards.
//!
//! Supported: numbers (with exponent), `x`, `pi`, `e`, `+ - * /`, `^` and `**` (right
//! associative), unary minus, parentheses and the functions `sqrt exp log log10 abs sin
//! cos tan pow min max`. A `TMath::` prefix on names is accepted and ignored.
use winnow::ascii::{float, multispace0};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated};
use winnow::token::{one_of, take_while};
use winnow::{ModalResult, Parser};

use super::error::CalibrationError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Function {
    Sqrt,
    Exp,
    Log,
    Log10,
    Abs,
    Sin,
    Cos,
    Tan,
    Pow,
    Min,
    Max,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("TMath::").unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "sqrt" => Some(Self::Sqrt),
            "exp" => Some(Self::Exp),
            "log" | "ln" => Some(Self::Log),
            "log10" => Some(Self::Log10),
            "abs" => Some(Self::Abs),
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "pow" | "power" => Some(Self::Pow),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Self::Pow | Self::Min | Self::Max => 2,
            _ => 1,
        }
    }

    fn apply(&self, args: &[f64]) -> f64 {
        match self {
            Self::Sqrt => args[0].sqrt(),
            Self::Exp => args[0].exp(),
            Self::Log => args[0].ln(),
            Self::Log10 => args[0].log10(),
            Self::Abs => args[0].abs(),
            Self::Sin => args[0].sin(),
            Self::Cos => args[0].cos(),
            Self::Tan => args[0].tan(),
            Self::Pow => args[0].powf(args[1]),
            Self::Min => args[0].min(args[1]),
            Self::Max => args[0].max(args[1]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Constant(f64),
    Variable,
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    fn eval(&self, x: f64) -> f64 {
        match self {
            Expr::Constant(c) => *c,
            Expr::Variable => x,
            Expr::Negate(inner) => -inner.eval(x),
            Expr::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(x), rhs.eval(x));
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                }
            }
            Expr::Call(func, args) => {
                let values: Vec<f64> = args.iter().map(|arg| arg.eval(x)).collect();
                func.apply(&values)
            }
        }
    }
}

/// Syntax tree as parsed, before names are resolved
#[derive(Debug, Clone, PartialEq)]
enum Ast {
    Number(f64),
    Ident(String),
    Negate(Box<Ast>),
    Binary(BinaryOp, Box<Ast>, Box<Ast>),
    Call(String, Vec<Ast>),
}

fn formula(input: &mut &str) -> ModalResult<Ast> {
    let ast = expression.parse_next(input)?;
    multispace0.parse_next(input)?;
    Ok(ast)
}

fn expression(input: &mut &str) -> ModalResult<Ast> {
    let first = term.parse_next(input)?;
    let rest: Vec<(char, Ast)> =
        repeat(0.., (preceded(multispace0, one_of(['+', '-'])), term)).parse_next(input)?;
    Ok(rest.into_iter().fold(first, |lhs, (op, rhs)| {
        let op = if op == '+' {
            BinaryOp::Add
        } else {
            BinaryOp::Sub
        };
        Ast::Binary(op, Box::new(lhs), Box::new(rhs))
    }))
}

fn term(input: &mut &str) -> ModalResult<Ast> {
    let first = unary.parse_next(input)?;
    let rest: Vec<(char, Ast)> =
        repeat(0.., (preceded(multispace0, one_of(['*', '/'])), unary)).parse_next(input)?;
    Ok(rest.into_iter().fold(first, |lhs, (op, rhs)| {
        let op = if op == '*' {
            BinaryOp::Mul
        } else {
            BinaryOp::Div
        };
        Ast::Binary(op, Box::new(lhs), Box::new(rhs))
    }))
}

// Unary minus binds looser than power: -x^2 == -(x^2)
fn unary(input: &mut &str) -> ModalResult<Ast> {
    multispace0.parse_next(input)?;
    match opt(one_of(['-', '+'])).parse_next(input)? {
        Some('-') => Ok(Ast::Negate(Box::new(unary.parse_next(input)?))),
        Some(_) => unary.parse_next(input),
        None => power.parse_next(input),
    }
}

fn power(input: &mut &str) -> ModalResult<Ast> {
    let base = primary.parse_next(input)?;
    let caret = opt(preceded(multispace0, alt(("**", "^")))).parse_next(input)?;
    match caret {
        Some(_) => {
            let exponent = unary.parse_next(input)?;
            Ok(Ast::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)))
        }
        None => Ok(base),
    }
}

fn primary(input: &mut &str) -> ModalResult<Ast> {
    multispace0.parse_next(input)?;
    alt((
        number.map(Ast::Number),
        delimited('(', expression, (multispace0, ')')),
        call_or_ident,
    ))
    .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<f64> {
    float.parse_next(input)
}

fn identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == ':'),
    )
        .take()
        .parse_next(input)
}

fn call_or_ident(input: &mut &str) -> ModalResult<Ast> {
    let name = identifier.parse_next(input)?;
    let args: Option<Vec<Ast>> = opt(delimited(
        (multispace0, '('),
        separated(0.., expression, (multispace0, ',')),
        (multispace0, ')'),
    ))
    .parse_next(input)?;
    Ok(match args {
        Some(args) => Ast::Call(name.to_string(), args),
        None => Ast::Ident(name.to_string()),
    })
}

/// Parse a formula and resolve its names
fn parse_formula(text: &str) -> Result<Expr, CalibrationError> {
    if text.trim().is_empty() {
        return Err(CalibrationError::EmptyFormula(text.to_string()));
    }
    let ast = formula
        .parse(text)
        .map_err(|e| CalibrationError::Syntax {
            formula: text.to_string(),
            position: e.offset(),
        })?;
    resolve(ast, text)
}

fn resolve(ast: Ast, text: &str) -> Result<Expr, CalibrationError> {
    match ast {
        Ast::Number(value) => Ok(Expr::Constant(value)),
        Ast::Ident(name) => match name.as_str() {
            "x" | "X" => Ok(Expr::Variable),
            "pi" | "TMath::Pi" => Ok(Expr::Constant(std::f64::consts::PI)),
            "e" | "TMath::E" => Ok(Expr::Constant(std::f64::consts::E)),
            _ => Err(CalibrationError::UnknownIdentifier {
                formula: text.to_string(),
                name,
            }),
        },
        Ast::Negate(inner) => Ok(Expr::Negate(Box::new(resolve(*inner, text)?))),
        Ast::Binary(op, lhs, rhs) => Ok(Expr::Binary(
            op,
            Box::new(resolve(*lhs, text)?),
            Box::new(resolve(*rhs, text)?),
        )),
        Ast::Call(name, args) => {
            let func =
                Function::from_name(&name).ok_or_else(|| CalibrationError::UnknownIdentifier {
                    formula: text.to_string(),
                    name: name.clone(),
                })?;
            if args.len() != func.arity() {
                return Err(CalibrationError::WrongArgumentCount {
                    formula: text.to_string(),
                    name,
                    given: args.len(),
                    expected: func.arity(),
                });
            }
            let args = args
                .into_iter()
                .map(|arg| resolve(arg, text))
                .collect::<Result<Vec<Expr>, CalibrationError>>()?;
            Ok(Expr::Call(func, args))
        }
    }
}

/// CalibrationFunction maps a raw amplitude to calibrated units for one channel.
///
/// The domain `[min, max]` is fixed when the function is built and is the range later used
/// to clip calibrated values.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationFunction {
    name: String,
    formula: String,
    expr: Expr,
    range_min: f64,
    range_max: f64,
}

impl CalibrationFunction {
    /// Parse a formula into a calibration function over `[range_min, range_max]`
    pub fn new(
        name: &str,
        formula: &str,
        range_min: f64,
        range_max: f64,
    ) -> Result<Self, CalibrationError> {
        if range_min.is_nan() || range_max.is_nan() || range_min > range_max {
            return Err(CalibrationError::InvalidDomain {
                name: name.to_string(),
                min: range_min,
                max: range_max,
            });
        }
        let expr = parse_formula(formula)?;
        Ok(Self {
            name: name.to_string(),
            formula: formula.to_string(),
            expr,
            range_min,
            range_max,
        })
    }

    /// Evaluate the calibration for a raw amplitude
    pub fn eval(&self, x: f64) -> f64 {
        self.expr.eval(x)
    }

    /// Evaluate and clip into the domain: above the maximum is clamped to the maximum,
    /// below the minimum is set to zero.
    pub fn eval_clipped(&self, x: f64) -> f64 {
        let value = self.eval(x);
        if value > self.range_max {
            self.range_max
        } else if value < self.range_min {
            0.0
        } else {
            value
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(formula: &str, x: f64) -> f64 {
        CalibrationFunction::new("test", formula, 0.0, 16384.0)
            .unwrap()
            .eval(x)
    }

    #[test]
    fn test_identity() {
        let f = CalibrationFunction::new("calibration_px00", "x", 0.0, 16384.0).unwrap();
        assert_eq!(f.eval(1234.5), 1234.5);
        assert_eq!(f.name(), "calibration_px00");
        assert_eq!(f.formula(), "x");
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2*x", 3.0), 7.0);
        assert_eq!(eval("(1 + 2)*x", 3.0), 9.0);
        assert_eq!(eval("x - 1 - 1", 3.0), 1.0);
        assert_eq!(eval("x / 2 / 2", 8.0), 2.0);
        assert_eq!(eval("2^3^2", 0.0), 512.0);
        assert_eq!(eval("-x^2", 3.0), -9.0);
        assert_eq!(eval("x**2", 3.0), 9.0);
        assert_eq!(eval("2*-x", 3.0), -6.0);
    }

    #[test]
    fn test_numbers_and_constants() {
        assert_eq!(eval("1.5e2 + x", 0.0), 150.0);
        assert_eq!(eval("2.5E-1*x", 4.0), 1.0);
        assert!((eval("2*e", 0.0) - 2.0 * std::f64::consts::E).abs() < 1e-12);
        assert!((eval("pi", 0.0) - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("sqrt(x)", 16.0), 4.0);
        assert_eq!(eval("pow(x, 2) + abs(-1)", 3.0), 10.0);
        assert_eq!(eval("max(x, 10)", 3.0), 10.0);
        assert_eq!(eval("min(x, 10)", 3.0), 3.0);
        assert!((eval("TMath::Exp(log(x))", 5.0) - 5.0).abs() < 1e-12);
        assert!((eval("log10(x)", 1000.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            CalibrationFunction::new("f", "", 0.0, 1.0),
            Err(CalibrationError::EmptyFormula(_))
        ));
        assert!(matches!(
            CalibrationFunction::new("f", "   ", 0.0, 1.0),
            Err(CalibrationError::EmptyFormula(_))
        ));
        assert!(matches!(
            CalibrationFunction::new("f", "x +", 0.0, 1.0),
            Err(CalibrationError::Syntax { .. })
        ));
        assert!(matches!(
            CalibrationFunction::new("f", "x $ 2", 0.0, 1.0),
            Err(CalibrationError::Syntax { .. })
        ));
        assert!(matches!(
            CalibrationFunction::new("f", "y*2", 0.0, 1.0),
            Err(CalibrationError::UnknownIdentifier { .. })
        ));
        assert!(matches!(
            CalibrationFunction::new("f", "pow(x)", 0.0, 1.0),
            Err(CalibrationError::WrongArgumentCount { .. })
        ));
        assert!(matches!(
            CalibrationFunction::new("f", "(x", 0.0, 1.0),
            Err(CalibrationError::Syntax { .. })
        ));
        assert!(matches!(
            CalibrationFunction::new("f", "x x", 0.0, 1.0),
            Err(CalibrationError::Syntax { .. })
        ));
        assert!(matches!(
            CalibrationFunction::new("f", "sqrt(x", 0.0, 1.0),
            Err(CalibrationError::Syntax { .. })
        ));
        assert!(matches!(
            CalibrationFunction::new("f", "x", 2.0, 1.0),
            Err(CalibrationError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn test_clipping() {
        let f = CalibrationFunction::new("f", "2*x", 10.0, 100.0).unwrap();
        assert_eq!(f.eval_clipped(20.0), 40.0);
        assert_eq!(f.eval_clipped(80.0), 100.0);
        // Below the minimum goes to zero, not to the minimum
        assert_eq!(f.eval_clipped(4.0), 0.0);
        assert_eq!(f.eval_clipped(-4.0), 0.0);
    }
}
