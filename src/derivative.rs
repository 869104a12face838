use tracing::{debug, instrument};

use crate::{
    atom::Atom,
    state::{State, Symbol},
};

impl Atom {
    /// Take a derivative of the expression with respect to `x`.
    ///
    /// Derivatives of user-defined functions are written with the builtin `der`
    /// function, whose leading arguments count how often each argument of the
    /// last argument was derived: `d f(x^2)/dx = 2*x*der(1,f(x^2))`.
    pub fn derivative(&self, x: Symbol) -> Atom {
        match self {
            Atom::Num(_) => Atom::zero(),
            Atom::Var(v) => {
                if *v == x {
                    Atom::one()
                } else {
                    Atom::zero()
                }
            }
            Atom::Add(terms) => Atom::new_add(terms.iter().map(|t| t.derivative(x)).collect()),
            Atom::Mul(factors) => {
                // product rule
                let mut terms = Vec::with_capacity(factors.len());
                for (i, f) in factors.iter().enumerate() {
                    let f_der = f.derivative(x);
                    if f_der.is_zero() {
                        continue;
                    }

                    let mut term = Vec::with_capacity(factors.len());
                    term.extend(
                        factors
                            .iter()
                            .enumerate()
                            .filter(|(j, _)| *j != i)
                            .map(|(_, g)| g.clone()),
                    );
                    term.push(f_der);
                    terms.push(Atom::new_mul(term));
                }
                Atom::new_add(terms)
            }
            Atom::Pow(p) => {
                let (base, exp) = (&p.0, &p.1);
                let base_der = base.derivative(x);

                if !exp.contains_symbol(x) {
                    if base_der.is_zero() {
                        return Atom::zero();
                    }

                    // e*b^(e-1)*b'
                    let new_exp = exp - Atom::one();
                    return Atom::new_mul(vec![
                        exp.clone(),
                        Atom::new_pow(base.clone(), new_exp),
                        base_der,
                    ]);
                }

                // b^e*(e'*log(b) + e*b'/b)
                let exp_der = exp.derivative(x);
                let log_term = Atom::new_mul(vec![exp_der, Atom::log(base.clone())]);
                let base_term = Atom::new_mul(vec![
                    exp.clone(),
                    base_der,
                    Atom::new_pow(base.clone(), Atom::from(-1)),
                ]);

                Atom::new_mul(vec![self.clone(), Atom::new_add(vec![log_term, base_term])])
            }
            Atom::Fun(name, args) => self.derivative_fun(*name, args, x),
        }
    }

    fn derivative_fun(&self, name: Symbol, args: &[Atom], x: Symbol) -> Atom {
        if args.len() == 1 && State::is_builtin(name) && name != State::DERIVATIVE {
            let arg = &args[0];
            let arg_der = arg.derivative(x);
            if arg_der.is_zero() {
                return Atom::zero();
            }

            let fn_der = match name {
                State::EXP => self.clone(),
                State::LOG => Atom::new_pow(arg.clone(), Atom::from(-1)),
                State::SIN => Atom::cos(arg.clone()),
                State::COS => -Atom::sin(arg.clone()),
                State::TAN => Atom::new_add(vec![
                    Atom::one(),
                    Atom::new_pow(self.clone(), Atom::from(2)),
                ]),
                State::SQRT => Atom::new_mul(vec![
                    Atom::from((1, 2)),
                    Atom::new_pow(self.clone(), Atom::from(-1)),
                ]),
                _ => return self.derivative_user_fun(name, args, x),
            };

            return Atom::new_mul(vec![fn_der, arg_der]);
        }

        self.derivative_user_fun(name, args, x)
    }

    /// Derive a function without known derivative by tagging which argument was derived.
    fn derivative_user_fun(&self, name: Symbol, args: &[Atom], x: Symbol) -> Atom {
        // detect if the function to derive is the derivative function itself
        // if so, derive the last argument of the derivative function and
        // accumulate the previous derivative counts
        let (to_derive, counts) = match args.split_last() {
            Some((inner, counts))
                if name == State::DERIVATIVE
                    && matches!(inner, Atom::Fun(_, a) if a.len() == counts.len()) =>
            {
                (inner, Some(counts))
            }
            _ => (self, None),
        };

        let Atom::Fun(_, inner_args) = to_derive else {
            unreachable!()
        };

        let mut terms = vec![];
        for (index, arg) in inner_args.iter().enumerate() {
            let arg_der = arg.derivative(x);
            if arg_der.is_zero() {
                continue;
            }

            let mut der_args = Vec::with_capacity(inner_args.len() + 1);
            match counts {
                Some(counts) => {
                    for (i, c) in counts.iter().enumerate() {
                        if i == index {
                            der_args.push(c + Atom::one());
                        } else {
                            der_args.push(c.clone());
                        }
                    }
                }
                None => {
                    for i in 0..inner_args.len() {
                        der_args.push(Atom::from(if i == index { 1 } else { 0 }));
                    }
                }
            }
            der_args.push(to_derive.clone());

            terms.push(Atom::new_mul(vec![
                Atom::new_fun(State::DERIVATIVE, der_args),
                arg_der,
            ]));
        }

        Atom::new_add(terms)
    }
}

/// A function together with its simplified first and second derivative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Derivatives {
    pub function: Atom,
    pub gradient: Atom,
    pub laplacian: Atom,
}

impl Derivatives {
    /// Simplify `expr` and compute its first and second derivative with respect to `x`.
    #[instrument(level = "debug", skip_all, fields(%expr, %x))]
    pub fn new(expr: &Atom, x: Symbol) -> Derivatives {
        let function = expr.simplify();
        let gradient = function.derivative(x).simplify();
        let laplacian = gradient.derivative(x).simplify();

        debug!("gradient = {}, laplacian = {}", gradient, laplacian);

        Derivatives {
            function,
            gradient,
            laplacian,
        }
    }

    /// Parse `input` and derive it with respect to the variable named `x`.
    pub fn parse(input: &str, x: &str) -> Result<Derivatives, String> {
        let expr = Atom::parse(input)?;
        Ok(Derivatives::new(&expr, Symbol::new(x)))
    }
}

#[cfg(test)]
mod test {
    use crate::{atom::Atom, derivative::Derivatives, state::Symbol};

    fn d(input: &str) -> Atom {
        Atom::parse(input).unwrap().derivative(Symbol::new("x"))
    }

    #[test]
    fn polynomial() {
        assert_eq!(d("x^3 + 2x + 5"), Atom::parse("3x^2 + 2").unwrap());
        assert_eq!(d("y*x^2"), Atom::parse("2*x*y").unwrap());
        assert_eq!(d("y"), Atom::zero());
    }

    #[test]
    fn chain_rule() {
        assert_eq!(d("sin(x^2)"), Atom::parse("2*x*cos(x^2)").unwrap());
        assert_eq!(d("cos(2x)"), Atom::parse("-2*sin(2x)").unwrap());
        assert_eq!(d("exp(3x)"), Atom::parse("3*exp(3x)").unwrap());
        assert_eq!(d("log(x)"), Atom::parse("x^-1").unwrap());
        assert_eq!(d("sqrt(x)"), Atom::parse("1/2*sqrt(x)^-1").unwrap());
        assert_eq!(d("tan(x)"), Atom::parse("1 + tan(x)^2").unwrap());
    }

    #[test]
    fn variable_exponent() {
        assert_eq!(d("2^x"), Atom::parse("2^x*log(2)").unwrap());
        assert_eq!(d("x^x"), Atom::parse("x^x*(log(x) + 1)").unwrap());
    }

    #[test]
    fn user_functions() {
        assert_eq!(d("f(x^2)"), Atom::parse("2*x*der(1,f(x^2))").unwrap());
        assert_eq!(
            d("der(1,f(x))"),
            Atom::parse("der(2,f(x))").unwrap()
        );
        assert_eq!(
            d("g(x, 1)"),
            Atom::parse("der(1,0,g(x,1))").unwrap()
        );
    }

    #[test]
    fn derivatives_of_square() {
        let r = Derivatives::parse("x**2", "x").unwrap();
        assert_eq!(r.function, Atom::parse("x^2").unwrap());
        assert_eq!(r.gradient, Atom::parse("2x").unwrap());
        assert_eq!(r.laplacian, Atom::from(2));
    }

    #[test]
    fn derivatives_of_reciprocal() {
        let r = Derivatives::parse("1/x", "x").unwrap();
        assert_eq!(r.gradient, Atom::parse("-x^-2").unwrap());
        assert_eq!(r.laplacian, Atom::parse("2*x^-3").unwrap());
    }
}
