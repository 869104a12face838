//! Normal form of expressions.
//!
//! Sums and products are flat and sorted, contain at most one numerical
//! coefficient and have merged like terms and equal bases. Powers with a
//! numerical base and an integer exponent are evaluated exactly.

use std::collections::BTreeMap;

use rug::{ops::Pow, Integer, Rational};

use crate::{
    atom::Atom,
    state::{State, Symbol},
};

/// The largest exponent for which powers of rationals are evaluated exactly.
const MAX_EXACT_EXPONENT: u32 = 1 << 12;

impl Atom {
    /// Bring an arbitrary expression tree into normal form.
    ///
    /// Atoms built with the constructors in this crate are already normalized,
    /// so this is only needed for trees that were assembled by hand.
    pub fn normalize(&self) -> Atom {
        match self {
            Atom::Num(_) | Atom::Var(_) => self.clone(),
            Atom::Fun(f, args) => Atom::normalize_fun(*f, args.iter().map(|a| a.normalize()).collect()),
            Atom::Pow(p) => Atom::normalize_pow(p.0.normalize(), p.1.normalize()),
            Atom::Mul(args) => Atom::normalize_mul(args.iter().map(|a| a.normalize()).collect()),
            Atom::Add(args) => Atom::normalize_add(args.iter().map(|a| a.normalize()).collect()),
        }
    }

    /// Simplify the expression. This is the normal form, computed from scratch.
    pub fn simplify(&self) -> Atom {
        self.normalize()
    }

    pub(crate) fn normalize_fun(name: Symbol, args: Vec<Atom>) -> Atom {
        if args.len() != 1 || !State::is_builtin(name) {
            return Atom::Fun(name, args);
        }

        let arg = &args[0];
        match name {
            State::EXP => {
                if arg.is_zero() {
                    return Atom::one();
                }
                if let Atom::Fun(State::LOG, inner) = arg {
                    if inner.len() == 1 {
                        return inner[0].clone();
                    }
                }
            }
            State::LOG => {
                if arg.is_one() {
                    return Atom::zero();
                }
            }
            State::SIN | State::TAN => {
                if arg.is_zero() {
                    return Atom::zero();
                }
            }
            State::COS => {
                if arg.is_zero() {
                    return Atom::one();
                }
            }
            State::SQRT => {
                if let Atom::Num(n) = arg {
                    if let Some(r) = exact_root(n, 2) {
                        return Atom::Num(r);
                    }
                }
            }
            _ => {}
        }

        Atom::Fun(name, args)
    }

    pub(crate) fn normalize_pow(base: Atom, exp: Atom) -> Atom {
        if exp.is_zero() {
            return Atom::one();
        }
        if exp.is_one() || base.is_one() {
            return base;
        }

        let int_exp = exp.as_num().filter(|e| e.is_integer()).and_then(|e| e.numer().to_i64());

        if let (Atom::Num(b), Atom::Num(e)) = (&base, &exp) {
            if *b == 0 {
                if *e > 0 {
                    return Atom::zero();
                }
                // 1/0 stays symbolic, it evaluates to infinity
                return Atom::Pow(Box::new((base, exp)));
            }

            if let Some(n) = int_exp {
                if n.unsigned_abs() <= MAX_EXACT_EXPONENT as u64 {
                    let r = rational_pow(b, n.unsigned_abs() as u32);
                    return Atom::Num(if n < 0 { r.recip() } else { r });
                }
            } else if *b > 0 {
                // roots of perfect powers, 4^(1/2) = 2
                if let Some(den) = e.denom().to_u32() {
                    if let (Some(root), Some(num)) = (exact_root(b, den), e.numer().to_i64()) {
                        return Atom::normalize_pow(Atom::Num(root), Atom::from(num));
                    }
                }
            }

            return Atom::Pow(Box::new((base, exp)));
        }

        if let Some(n) = int_exp {
            match base {
                Atom::Pow(p) => {
                    let (b, e) = *p;
                    let new_exp = Atom::normalize_mul(vec![e, Atom::from(n)]);
                    return Atom::normalize_pow(b, new_exp);
                }
                Atom::Mul(factors) => {
                    return Atom::normalize_mul(
                        factors
                            .into_iter()
                            .map(|f| Atom::normalize_pow(f, Atom::from(n)))
                            .collect(),
                    );
                }
                _ => {}
            }
        }

        Atom::Pow(Box::new((base, exp)))
    }

    pub(crate) fn normalize_mul(factors: Vec<Atom>) -> Atom {
        let mut coeff = Rational::from(1);
        let mut rest = Vec::with_capacity(factors.len());

        let mut stack = factors;
        while let Some(f) = stack.pop() {
            match f {
                Atom::Num(n) => {
                    if n == 0 {
                        return Atom::zero();
                    }
                    coeff *= n;
                }
                Atom::Mul(inner) => stack.extend(inner),
                a => rest.push(a),
            }
        }

        // collect the exponents of equal bases
        let mut powers: BTreeMap<Atom, Vec<Atom>> = BTreeMap::new();
        for f in rest {
            let (base, exp) = match f {
                Atom::Pow(p) => *p,
                a => (a, Atom::one()),
            };
            powers.entry(base).or_default().push(exp);
        }

        let mut merged = Vec::with_capacity(powers.len());
        let mut needs_renormalization = false;
        for (base, exps) in powers {
            let p = if exps.len() == 1 {
                let mut exps = exps;
                let exp = exps.pop().unwrap_or_default();
                if exp.is_one() {
                    base
                } else {
                    Atom::Pow(Box::new((base, exp)))
                }
            } else {
                Atom::normalize_pow(base, Atom::normalize_add(exps))
            };

            if matches!(p, Atom::Num(_) | Atom::Mul(_)) {
                needs_renormalization = true;
            }
            merged.push(p);
        }

        if needs_renormalization {
            merged.push(Atom::Num(coeff));
            return Atom::normalize_mul(merged);
        }

        merged.sort();

        if merged.is_empty() {
            return Atom::Num(coeff);
        }

        if coeff == 1 {
            if merged.len() == 1 {
                return merged.pop().unwrap_or_default();
            }
        } else {
            merged.insert(0, Atom::Num(coeff));
        }

        Atom::Mul(merged)
    }

    pub(crate) fn normalize_add(terms: Vec<Atom>) -> Atom {
        let mut constant = Rational::new();
        let mut collected: BTreeMap<Atom, Rational> = BTreeMap::new();

        let mut stack = terms;
        while let Some(t) = stack.pop() {
            match t {
                Atom::Num(n) => constant += n,
                Atom::Add(inner) => stack.extend(inner),
                a => {
                    let (c, rest) = a.split_coefficient();
                    *collected.entry(rest).or_default() += c;
                }
            }
        }

        let mut out: Vec<Atom> = collected
            .into_iter()
            .filter(|(_, c)| *c != 0)
            .map(|(rest, c)| {
                if c == 1 {
                    rest
                } else {
                    Atom::normalize_mul(vec![Atom::Num(c), rest])
                }
            })
            .collect();

        if constant != 0 {
            out.push(Atom::Num(constant));
        }

        out.sort();

        match out.len() {
            0 => Atom::zero(),
            1 => out.pop().unwrap_or_default(),
            _ => Atom::Add(out),
        }
    }
}

/// Compute `b^n` exactly.
fn rational_pow(b: &Rational, n: u32) -> Rational {
    let num = Integer::from(b.numer().pow(n));
    let den = Integer::from(b.denom().pow(n));
    Rational::from((num, den))
}

/// The exact `n`th root of a non-negative rational, if it exists.
fn exact_root(r: &Rational, n: u32) -> Option<Rational> {
    if n == 0 || *r < 0 {
        return None;
    }

    let num = r.numer().clone().root(n);
    let den = r.denom().clone().root(n);
    if rational_pow(&Rational::from((num.clone(), den.clone())), n) == *r {
        Some(Rational::from((num, den)))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use rug::Rational;

    use crate::{atom::Atom, state::Symbol};

    #[test]
    fn collect_terms() {
        let a = Atom::parse("2x + 3x - x + 1 + 1/2").unwrap();
        let x = Atom::new_var(Symbol::new("x"));
        assert_eq!(a, Atom::from(4) * &x + Atom::from((3, 2)));
    }

    #[test]
    fn merge_powers() {
        let a = Atom::parse("x*x^2*y/x").unwrap();
        assert_eq!(a, Atom::parse("y*x^2").unwrap());

        let b = Atom::parse("(x^2)^3").unwrap();
        assert_eq!(b, Atom::parse("x^6").unwrap());

        let c = Atom::parse("(2*x)^2").unwrap();
        assert_eq!(c, Atom::parse("4*x^2").unwrap());
    }

    #[test]
    fn exact_numbers() {
        assert_eq!(Atom::parse("2^10").unwrap(), Atom::from(1024));
        assert_eq!(Atom::parse("(2/3)^-2").unwrap(), Atom::from((9, 4)));
        assert_eq!(Atom::parse("4^(1/2)").unwrap(), Atom::from(2));
        assert_eq!(Atom::parse("sqrt(9/4)").unwrap(), Atom::from((3, 2)));
        assert_eq!(Atom::parse("0*sin(x)").unwrap(), Atom::zero());
        assert_eq!(
            Atom::parse("0.25 + 1/4").unwrap().as_num(),
            Some(&Rational::from((1, 2)))
        );
    }

    #[test]
    fn zero_denominator_stays_symbolic() {
        let a = Atom::parse("1/0").unwrap();
        assert!(matches!(a, Atom::Pow(_)));
    }

    #[test]
    fn builtin_values() {
        assert_eq!(Atom::parse("exp(0) + cos(0)").unwrap(), Atom::from(2));
        assert_eq!(Atom::parse("log(1) + sin(0) + tan(0)").unwrap(), Atom::zero());
        assert_eq!(Atom::parse("exp(log(x))").unwrap(), Atom::parse("x").unwrap());
    }

    #[test]
    fn idempotent() {
        let a = Atom::parse("(1+x)^2*(x+1)^-1 + 3*sin(x)^2 - sin(x)*sin(x)").unwrap();
        assert_eq!(a.normalize(), a);
        assert_eq!(a, Atom::parse("1 + x + 2*sin(x)^2").unwrap());
    }
}
