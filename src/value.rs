//! Runtime values.

use std::fmt;
use std::rc::Rc;

/// A Lox value.
///
/// Values of different variants are never equal, so the derived `PartialEq` is the language
/// `==`.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(_) | Value::Str(_) => true,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(Rc::from(s))
    }
}

/// User-visible rendering used by `print` and the REPL.
///
/// Integral numbers print without a fractional part.  Magnitudes from 1e16 up and below
/// 1e-4 print in exponent form with a signed exponent of at least two digits (`1e+22`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write_number(f, *n),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        return write!(f, "nan");
    }
    let magnitude = n.abs();
    if n.is_infinite() || magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        return write!(f, "{}", n);
    }
    let scientific = format!("{:e}", n);
    match scientific.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            write!(f, "{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => write!(f, "{}", scientific),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_drop_fraction() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
        assert_eq!(Value::Number(-0.25).to_string(), "-0.25");
        assert_eq!(Value::Number(100.0).to_string(), "100");
    }

    #[test]
    fn extreme_magnitudes_use_exponent_form() {
        assert_eq!(Value::Number(1e22).to_string(), "1e+22");
        assert_eq!(Value::Number(1e16).to_string(), "1e+16");
        assert_eq!(Value::Number(-1.5e300).to_string(), "-1.5e+300");
        assert_eq!(Value::Number(1e15).to_string(), "1000000000000000");
        assert_eq!(Value::Number(0.0001).to_string(), "0.0001");
        assert_eq!(Value::Number(-2.5e-7).to_string(), "-2.5e-07");
        assert_eq!(Value::Number(0.0).to_string(), "0");
    }

    #[test]
    fn non_finite_numbers() {
        assert_eq!(Value::Number(f64::NAN).to_string(), "nan");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-inf");
    }

    #[test]
    fn stringify_other_values() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::from("a b").to_string(), "a b");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::from("").is_truthy());
    }

    #[test]
    fn different_kinds_are_never_equal() {
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::from("1"), Value::Number(1.0));
        assert_eq!(Value::Nil, Value::Nil);
        assert_eq!(Value::from("ab"), Value::from(String::from("ab")));
    }
}
