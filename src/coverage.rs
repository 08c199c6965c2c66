//! Planform coverage resolution.
//!
//! A slab's cover is either a structured mapping, passed through verbatim,
//! or a textual expression such as
//!
//! ```text
//! [('aft', web_aft - 0.1, web_aft + 0.2), ('full', 0.0, 1.0)]
//! ```
//!
//! where identifiers name datum curves. The predecessor of this module
//! substituted datum arrays into the text and evaluated it as code; here the
//! expression is parsed by a small interpreter that supports exactly datum
//! substitution, arithmetic and tuple construction, and nothing else.

use std::collections::{BTreeMap, HashMap};

use crate::errors::{CoverageError, PlanError};
use crate::grid::interp;
use crate::slab::{CoverSpec, Datum, Slab};

/// Resolved coverage: cover key to its sequence of numbers.
pub type CoverMap = BTreeMap<String, Vec<f64>>;

/// Resolve a slab's coverage against the datum curves.
///
/// Structured covers are returned verbatim. Textual covers are evaluated
/// with each datum interpolated onto `radius_relative`, scaled per axis
/// (`x / scalex`, `y * scaley`).
pub fn resolve_coverage(
    slab: &Slab,
    datums: &HashMap<String, Datum>,
    radius_relative: &[f64],
) -> Result<CoverMap, PlanError> {
    let expr = match &slab.cover {
        CoverSpec::Map(map) => return Ok(map.clone()),
        CoverSpec::Expr(expr) => expr,
    };
    let mut env = HashMap::new();
    for (name, datum) in datums {
        let xp: Vec<f64> = datum.xy.iter().map(|p| p[0] / datum.scalex).collect();
        let fp: Vec<f64> = datum.xy.iter().map(|p| p[1] * datum.scaley).collect();
        env.insert(name.clone(), interp(radius_relative, &xp, &fp));
    }
    let tuples = evaluate(expr, &env).map_err(|source| PlanError::Coverage {
        slab: slab.name.clone(),
        source,
    })?;
    Ok(tuples.into_iter().collect())
}

/// Evaluate a cover expression to `(key, values)` tuples.
pub(crate) fn evaluate(
    expr: &str,
    env: &HashMap<String, Vec<f64>>,
) -> Result<Vec<(String, Vec<f64>)>, CoverageError> {
    Parser::new(expr, env).parse_list()
}

/// A value during evaluation: scalars, datum arrays and string keys.
#[derive(Debug, Clone)]
enum Value {
    Num(f64),
    Array(Vec<f64>),
    Text(String),
}

impl Value {
    fn flatten_into(self, values: &mut Vec<f64>, offset: usize) -> Result<(), CoverageError> {
        match self {
            Value::Num(v) => values.push(v),
            Value::Array(v) => values.extend(v),
            Value::Text(_) => {
                return Err(CoverageError::Expected {
                    expected: "numeric cover value",
                    offset,
                })
            }
        }
        Ok(())
    }
}

/// Elementwise binary arithmetic with scalar broadcast.
fn apply(op: char, lhs: Value, rhs: Value) -> Result<Value, CoverageError> {
    let scalar = |a: f64, b: f64| match op {
        '+' => a + b,
        '-' => a - b,
        '*' => a * b,
        _ => a / b,
    };
    match (lhs, rhs) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::Num(scalar(a, b))),
        (Value::Num(a), Value::Array(b)) => {
            Ok(Value::Array(b.into_iter().map(|v| scalar(a, v)).collect()))
        }
        (Value::Array(a), Value::Num(b)) => {
            Ok(Value::Array(a.into_iter().map(|v| scalar(v, b)).collect()))
        }
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return Err(CoverageError::LengthMismatch(a.len(), b.len()));
            }
            Ok(Value::Array(
                a.into_iter().zip(b).map(|(x, y)| scalar(x, y)).collect(),
            ))
        }
        _ => Err(CoverageError::StringArithmetic),
    }
}

/// Recursive-descent parser over the cover grammar.
struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    env: &'a HashMap<String, Vec<f64>>,
}

impl<'a> Parser<'a> {
    fn new(src: &str, env: &'a HashMap<String, Vec<f64>>) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            env,
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.get(self.pos), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected_char: char, expected: &'static str) -> Result<(), CoverageError> {
        match self.peek() {
            Some(c) if c == expected_char => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(CoverageError::Expected {
                expected,
                offset: self.pos,
            }),
            None => Err(CoverageError::UnexpectedEnd),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<(String, Vec<f64>)>, CoverageError> {
        self.eat('[', "'['")?;
        let mut tuples = Vec::new();
        loop {
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some('(') => {
                    tuples.push(self.parse_tuple()?);
                    match self.peek() {
                        Some(',') => {
                            self.pos += 1;
                        }
                        Some(']') => {}
                        Some(_) => {
                            return Err(CoverageError::Expected {
                                expected: "',' or ']'",
                                offset: self.pos,
                            })
                        }
                        None => return Err(CoverageError::UnexpectedEnd),
                    }
                }
                Some(_) => {
                    return Err(CoverageError::Expected {
                        expected: "'(' opening a cover tuple",
                        offset: self.pos,
                    })
                }
                None => return Err(CoverageError::UnexpectedEnd),
            }
        }
        self.skip_ws();
        if self.pos < self.chars.len() {
            return Err(CoverageError::UnexpectedChar {
                found: self.chars[self.pos],
                offset: self.pos,
            });
        }
        Ok(tuples)
    }

    fn parse_tuple(&mut self) -> Result<(String, Vec<f64>), CoverageError> {
        self.eat('(', "'('")?;
        let key = match self.parse_additive()? {
            Value::Text(key) => key,
            _ => return Err(CoverageError::MissingKey),
        };
        let mut values = Vec::new();
        loop {
            match self.peek() {
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                Some(',') => {
                    self.pos += 1;
                    // Tolerate a trailing comma before the closing paren.
                    if self.peek() == Some(')') {
                        self.pos += 1;
                        break;
                    }
                    let offset = self.pos;
                    let value = self.parse_additive()?;
                    value.flatten_into(&mut values, offset)?;
                }
                Some(_) => {
                    return Err(CoverageError::Expected {
                        expected: "',' or ')'",
                        offset: self.pos,
                    })
                }
                None => return Err(CoverageError::UnexpectedEnd),
            }
        }
        Ok((key, values))
    }

    fn parse_additive(&mut self) -> Result<Value, CoverageError> {
        let mut lhs = self.parse_term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Value, CoverageError> {
        let mut lhs = self.parse_factor()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.parse_factor()?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Value, CoverageError> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                let value = self.parse_factor()?;
                apply('*', Value::Num(-1.0), value)
            }
            Some('(') => {
                self.pos += 1;
                let value = self.parse_additive()?;
                self.eat(')', "')'")?;
                Ok(value)
            }
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let start = self.pos;
                while let Some(&c) = self.chars.get(self.pos) {
                    if c == quote {
                        let text: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(Value::Text(text));
                    }
                    self.pos += 1;
                }
                Err(CoverageError::UnexpectedEnd)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let start = self.pos;
                while matches!(self.chars.get(self.pos), Some(&c) if c.is_alphanumeric() || c == '_')
                {
                    self.pos += 1;
                }
                let name: String = self.chars[start..self.pos].iter().collect();
                self.env
                    .get(&name)
                    .map(|curve| Value::Array(curve.clone()))
                    .ok_or(CoverageError::UnknownDatum(name))
            }
            Some(c) => Err(CoverageError::UnexpectedChar {
                found: c,
                offset: self.pos,
            }),
            None => Err(CoverageError::UnexpectedEnd),
        }
    }

    fn parse_number(&mut self) -> Result<Value, CoverageError> {
        let start = self.pos;
        while matches!(self.chars.get(self.pos), Some(&c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        if matches!(self.chars.get(self.pos), Some('e' | 'E')) {
            self.pos += 1;
            if matches!(self.chars.get(self.pos), Some('+' | '-')) {
                self.pos += 1;
            }
            while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map(Value::Num)
            .map_err(|_| CoverageError::Expected {
                expected: "number",
                offset: start,
            })
    }
}
