//! Owned symbolic expressions.
//!
//! An [Atom] is kept in normal form at all times: every constructor in this
//! module normalizes its output, so structurally equal expressions compare
//! equal. See [crate::normalize] for the rules.

use rug::Rational;

use crate::state::{State, Symbol};

/// A symbolic expression over interned symbols with exact rational coefficients.
///
/// The variant order defines the canonical ordering of terms in sums and
/// factors in products.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Atom {
    Num(Rational),
    Var(Symbol),
    Fun(Symbol, Vec<Atom>),
    Pow(Box<(Atom, Atom)>),
    Mul(Vec<Atom>),
    Add(Vec<Atom>),
}

impl Default for Atom {
    /// The zero number.
    fn default() -> Self {
        Atom::Num(Rational::new())
    }
}

impl From<i64> for Atom {
    fn from(n: i64) -> Self {
        Atom::Num(n.into())
    }
}

impl From<i32> for Atom {
    fn from(n: i32) -> Self {
        Atom::Num(n.into())
    }
}

impl From<(i64, i64)> for Atom {
    /// Create the rational number `num/den`. Panics when `den` is zero.
    fn from((num, den): (i64, i64)) -> Self {
        Atom::Num(Rational::from((num, den)))
    }
}

impl From<Rational> for Atom {
    fn from(r: Rational) -> Self {
        Atom::Num(r)
    }
}

impl From<Symbol> for Atom {
    fn from(s: Symbol) -> Self {
        Atom::Var(s)
    }
}

impl Atom {
    /// Parse an expression, such as `x^2*sin(3x) + 1/2`.
    ///
    /// New symbols are registered in the global state.
    pub fn parse(input: &str) -> Result<Atom, String> {
        crate::parser::Token::parse(input)?.to_atom()
    }

    #[inline]
    pub fn new_num<T: Into<Rational>>(num: T) -> Atom {
        Atom::Num(num.into())
    }

    #[inline]
    pub fn new_var(id: Symbol) -> Atom {
        Atom::Var(id)
    }

    #[inline]
    pub fn zero() -> Atom {
        Atom::Num(Rational::new())
    }

    #[inline]
    pub fn one() -> Atom {
        Atom::Num(Rational::from(1))
    }

    /// Create the function `name(args)`.
    pub fn new_fun(name: Symbol, args: Vec<Atom>) -> Atom {
        Atom::normalize_fun(name, args)
    }

    /// Create `base^exp`.
    pub fn new_pow(base: Atom, exp: Atom) -> Atom {
        Atom::normalize_pow(base, exp)
    }

    /// Create the product of `factors`.
    pub fn new_mul(factors: Vec<Atom>) -> Atom {
        Atom::normalize_mul(factors)
    }

    /// Create the sum of `terms`.
    pub fn new_add(terms: Vec<Atom>) -> Atom {
        Atom::normalize_add(terms)
    }

    /// Raise `self` to the power `exp`.
    pub fn pow(&self, exp: &Atom) -> Atom {
        Atom::new_pow(self.clone(), exp.clone())
    }

    /// Returns `true` if the atom is the number 0.
    pub fn is_zero(&self) -> bool {
        matches!(self, Atom::Num(n) if *n == 0)
    }

    /// Returns `true` if the atom is the number 1.
    pub fn is_one(&self) -> bool {
        matches!(self, Atom::Num(n) if *n == 1)
    }

    /// Get the numerical value of the atom, if it is a number.
    pub fn as_num(&self) -> Option<&Rational> {
        match self {
            Atom::Num(n) => Some(n),
            _ => None,
        }
    }

    /// Returns `true` iff `x` occurs anywhere in the expression, also as a function name.
    pub fn contains_symbol(&self, x: Symbol) -> bool {
        match self {
            Atom::Num(_) => false,
            Atom::Var(v) => *v == x,
            Atom::Fun(f, args) => *f == x || args.iter().any(|a| a.contains_symbol(x)),
            Atom::Pow(p) => p.0.contains_symbol(x) || p.1.contains_symbol(x),
            Atom::Mul(args) | Atom::Add(args) => args.iter().any(|a| a.contains_symbol(x)),
        }
    }

    /// Replace every occurrence of the variable `x` by `value` and normalize the result.
    pub fn replace_symbol(&self, x: Symbol, value: &Atom) -> Atom {
        match self {
            Atom::Num(_) => self.clone(),
            Atom::Var(v) => {
                if *v == x {
                    value.clone()
                } else {
                    self.clone()
                }
            }
            Atom::Fun(f, args) => Atom::new_fun(
                *f,
                args.iter().map(|a| a.replace_symbol(x, value)).collect(),
            ),
            Atom::Pow(p) => Atom::new_pow(p.0.replace_symbol(x, value), p.1.replace_symbol(x, value)),
            Atom::Mul(args) => {
                Atom::new_mul(args.iter().map(|a| a.replace_symbol(x, value)).collect())
            }
            Atom::Add(args) => {
                Atom::new_add(args.iter().map(|a| a.replace_symbol(x, value)).collect())
            }
        }
    }

    /// Split a term into its rational coefficient and the remaining factors.
    pub(crate) fn split_coefficient(self) -> (Rational, Atom) {
        match self {
            Atom::Num(n) => (n, Atom::one()),
            Atom::Mul(mut factors) => {
                if let Some(Atom::Num(_)) = factors.first() {
                    let Atom::Num(c) = factors.remove(0) else {
                        unreachable!()
                    };
                    let rest = if factors.len() == 1 {
                        factors.pop().unwrap_or_default()
                    } else {
                        Atom::Mul(factors)
                    };
                    (c, rest)
                } else {
                    (Rational::from(1), Atom::Mul(factors))
                }
            }
            a => (Rational::from(1), a),
        }
    }

    /// Returns `true` if the expression prints with a leading minus sign.
    pub(crate) fn is_negative_term(&self) -> bool {
        match self {
            Atom::Num(n) => *n < 0,
            Atom::Mul(factors) => matches!(factors.first(), Some(Atom::Num(n)) if *n < 0),
            _ => false,
        }
    }
}

impl std::str::FromStr for Atom {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Atom::parse(s)
    }
}

impl std::ops::Neg for Atom {
    type Output = Atom;
    fn neg(self) -> Atom {
        Atom::new_mul(vec![Atom::from(-1), self])
    }
}

impl std::ops::Neg for &Atom {
    type Output = Atom;
    fn neg(self) -> Atom {
        -self.clone()
    }
}

/// Implements a binary operation for all combinations of owned and borrowed atoms.
macro_rules! impl_binary_ops {
    ($op_trait:ident, $op_method:ident, $op_fn:ident) => {
        impl std::ops::$op_trait<Atom> for Atom {
            type Output = Atom;
            fn $op_method(self, rhs: Atom) -> Atom {
                Atom::$op_fn(self, rhs)
            }
        }

        impl std::ops::$op_trait<&Atom> for Atom {
            type Output = Atom;
            fn $op_method(self, rhs: &Atom) -> Atom {
                Atom::$op_fn(self, rhs.clone())
            }
        }

        impl std::ops::$op_trait<Atom> for &Atom {
            type Output = Atom;
            fn $op_method(self, rhs: Atom) -> Atom {
                Atom::$op_fn(self.clone(), rhs)
            }
        }

        impl std::ops::$op_trait<&Atom> for &Atom {
            type Output = Atom;
            fn $op_method(self, rhs: &Atom) -> Atom {
                Atom::$op_fn(self.clone(), rhs.clone())
            }
        }
    };
}

impl Atom {
    fn add_impl(lhs: Atom, rhs: Atom) -> Atom {
        Atom::new_add(vec![lhs, rhs])
    }

    fn sub_impl(lhs: Atom, rhs: Atom) -> Atom {
        Atom::new_add(vec![lhs, -rhs])
    }

    fn mul_impl(lhs: Atom, rhs: Atom) -> Atom {
        Atom::new_mul(vec![lhs, rhs])
    }

    fn div_impl(lhs: Atom, rhs: Atom) -> Atom {
        Atom::new_mul(vec![lhs, Atom::new_pow(rhs, Atom::from(-1))])
    }
}

impl_binary_ops!(Add, add, add_impl);
impl_binary_ops!(Sub, sub, sub_impl);
impl_binary_ops!(Mul, mul, mul_impl);
impl_binary_ops!(Div, div, div_impl);

/// Builtin function helpers.
impl Atom {
    pub fn exp(arg: Atom) -> Atom {
        Atom::new_fun(State::EXP, vec![arg])
    }

    pub fn log(arg: Atom) -> Atom {
        Atom::new_fun(State::LOG, vec![arg])
    }

    pub fn sin(arg: Atom) -> Atom {
        Atom::new_fun(State::SIN, vec![arg])
    }

    pub fn cos(arg: Atom) -> Atom {
        Atom::new_fun(State::COS, vec![arg])
    }

    pub fn tan(arg: Atom) -> Atom {
        Atom::new_fun(State::TAN, vec![arg])
    }

    pub fn sqrt(arg: Atom) -> Atom {
        Atom::new_fun(State::SQRT, vec![arg])
    }
}

#[cfg(test)]
mod test {
    use crate::{atom::Atom, state::Symbol};

    #[test]
    fn arithmetic() {
        let x = Atom::new_var(Symbol::new("x"));
        let r = &x * &x + Atom::from(2) * &x - &x;
        assert_eq!(r, Atom::parse("x^2 + x").unwrap());

        let d = (&x * Atom::from(3)) / &x;
        assert_eq!(d, Atom::from(3));

        assert_eq!(-(-&x), x);
        assert_eq!(x.pow(&Atom::from(3)), Atom::parse("x^3").unwrap());
        assert_eq!(Atom::from(2).pow(&Atom::from(-2)), Atom::from((1, 4)));
    }

    #[test]
    fn replace() {
        let x = Symbol::new("x");
        let a = Atom::parse("x^2 + h*x").unwrap();
        let r = a.replace_symbol(Symbol::new("h"), &Atom::from((1, 10)));
        assert_eq!(r, Atom::parse("x^2 + 1/10*x").unwrap());

        let at_two = r.replace_symbol(x, &Atom::from(2));
        assert_eq!(at_two, Atom::from((21, 5)));
    }

    #[test]
    fn contains() {
        let a = Atom::parse("sin(y) + f(z)").unwrap();
        assert!(a.contains_symbol(Symbol::new("y")));
        assert!(a.contains_symbol(Symbol::new("f")));
        assert!(!a.contains_symbol(Symbol::new("x")));
    }
}
