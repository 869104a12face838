//! Numerical evaluation of expressions in double precision.

use std::f64::consts::PI;

use ahash::HashMap;
use thiserror::Error;

use crate::{
    atom::Atom,
    state::{State, Symbol},
};

/// The reason why an expression has no finite value.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EvaluationError {
    #[error("symbol {0} has no value")]
    UnboundSymbol(Symbol),
    #[error("function {0} cannot be evaluated numerically")]
    UnknownFunction(Symbol),
    #[error("function {name} expects {expected} argument(s), got {found}")]
    WrongArgumentCount {
        name: Symbol,
        expected: usize,
        found: usize,
    },
    #[error("expression evaluates to {0}")]
    NonFinite(f64),
}

impl Atom {
    /// Evaluate the expression, using `const_map` for the values of variables.
    ///
    /// The builtin functions and `pi` are evaluated in `f64`. Every
    /// subexpression must have a finite value, so a point where a part of the
    /// expression diverges fails even if the total would be finite, as for
    /// `exp(-1/x^2)` at `x = 0`.
    pub fn evaluate(&self, const_map: &HashMap<Symbol, f64>) -> Result<f64, EvaluationError> {
        let r = match self {
            Atom::Num(n) => n.to_f64(),
            Atom::Var(v) => match const_map.get(v) {
                Some(r) => *r,
                None if *v == State::PI => PI,
                None => return Err(EvaluationError::UnboundSymbol(*v)),
            },
            Atom::Fun(name, args) => {
                if !State::is_builtin(*name) || *name == State::DERIVATIVE || *name == State::PI {
                    return Err(EvaluationError::UnknownFunction(*name));
                }

                if args.len() != 1 {
                    return Err(EvaluationError::WrongArgumentCount {
                        name: *name,
                        expected: 1,
                        found: args.len(),
                    });
                }

                let arg = args[0].evaluate(const_map)?;
                match *name {
                    State::EXP => arg.exp(),
                    State::LOG => arg.ln(),
                    State::SIN => arg.sin(),
                    State::COS => arg.cos(),
                    State::TAN => arg.tan(),
                    State::SQRT => arg.sqrt(),
                    _ => return Err(EvaluationError::UnknownFunction(*name)),
                }
            }
            Atom::Pow(p) => {
                let base = p.0.evaluate(const_map)?;

                match p
                    .1
                    .as_num()
                    .filter(|e| e.is_integer())
                    .and_then(|e| e.numer().to_i32())
                {
                    Some(n) => base.powi(n),
                    None => base.powf(p.1.evaluate(const_map)?),
                }
            }
            Atom::Mul(factors) => {
                let mut r = 1.;
                for f in factors {
                    r *= f.evaluate(const_map)?;
                }
                r
            }
            Atom::Add(terms) => {
                let mut r = 0.;
                for t in terms {
                    r += t.evaluate(const_map)?;
                }
                r
            }
        };

        if r.is_finite() {
            Ok(r)
        } else {
            Err(EvaluationError::NonFinite(r))
        }
    }

    /// Evaluate the expression for a single variable `x` set to `value`.
    pub fn evaluate_at(&self, x: Symbol, value: f64) -> Result<f64, EvaluationError> {
        let mut const_map = HashMap::default();
        const_map.insert(x, value);
        self.evaluate(&const_map)
    }
}

#[cfg(test)]
mod test {
    use ahash::HashMap;

    use crate::{atom::Atom, evaluate::EvaluationError, state::Symbol};

    #[test]
    fn evaluate() {
        let x = Symbol::new("x");
        let y = Symbol::new("y");
        let a = Atom::parse("x*cos(x) + y^2/2 + sqrt(4*y)").unwrap();

        let mut const_map = HashMap::default();
        const_map.insert(x, 6.);
        const_map.insert(y, 1.);

        let r = a.evaluate(&const_map).unwrap();
        assert!((r - (6. * 6f64.cos() + 0.5 + 2.)).abs() < 1e-12);
    }

    #[test]
    fn pi() {
        let a = Atom::parse("sin(pi/2)").unwrap();
        assert_eq!(a.evaluate(&HashMap::default()), Ok(1.));
    }

    #[test]
    fn failures() {
        let x = Symbol::new("x");

        assert_eq!(
            Atom::parse("1/x").unwrap().evaluate_at(x, 0.),
            Err(EvaluationError::NonFinite(f64::INFINITY))
        );
        assert!(matches!(
            Atom::parse("log(x)").unwrap().evaluate_at(x, -1.),
            Err(EvaluationError::NonFinite(v)) if v.is_nan()
        ));
        assert_eq!(
            Atom::parse("x + z").unwrap().evaluate_at(x, 1.),
            Err(EvaluationError::UnboundSymbol(Symbol::new("z")))
        );
        assert_eq!(
            Atom::parse("f(x)").unwrap().evaluate_at(x, 1.),
            Err(EvaluationError::UnknownFunction(Symbol::new("f")))
        );
    }

    #[test]
    fn diverging_subexpression() {
        let x = Symbol::new("x");
        let a = Atom::parse("exp(-1/x^2)").unwrap();
        assert_eq!(
            a.evaluate_at(x, 0.),
            Err(EvaluationError::NonFinite(f64::INFINITY))
        );
        assert!(a.evaluate_at(x, 1.).is_ok());

        let b = Atom::parse("x^2*exp(-1/x)").unwrap();
        assert!(b.evaluate_at(x, 0.).is_err());

        let c = Atom::parse("sin(x)/x").unwrap();
        assert!(c.evaluate_at(x, 0.).is_err());
        assert!((c.evaluate_at(x, 0.5).unwrap() - 0.5f64.sin() / 0.5).abs() < 1e-15);
    }
}
