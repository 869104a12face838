use std::fmt::{self, Write};

use rug::Rational;

use crate::{
    atom::Atom,
    state::{State, Symbol},
};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PrintMode {
    /// Output that can be parsed back, `2*x^3+sin(x)`.
    #[default]
    Plain,
    /// Mathematica input form, `2*x^3+Sin[x]`.
    Mathematica,
}

/// A printer for atoms with a configurable output format.
pub struct AtomPrinter<'a> {
    pub atom: &'a Atom,
    pub print_mode: PrintMode,
}

impl<'a> AtomPrinter<'a> {
    pub fn new(atom: &'a Atom, print_mode: PrintMode) -> AtomPrinter<'a> {
        AtomPrinter { atom, print_mode }
    }
}

impl fmt::Display for AtomPrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.atom.fmt_output(f, self.print_mode)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_output(f, PrintMode::default())
    }
}

fn fmt_symbol(s: Symbol, f: &mut fmt::Formatter, print_mode: PrintMode) -> fmt::Result {
    match (print_mode, s) {
        (PrintMode::Mathematica, State::PI) => f.write_str("Pi"),
        (PrintMode::Mathematica, State::EXP) => f.write_str("Exp"),
        (PrintMode::Mathematica, State::LOG) => f.write_str("Log"),
        (PrintMode::Mathematica, State::SIN) => f.write_str("Sin"),
        (PrintMode::Mathematica, State::COS) => f.write_str("Cos"),
        (PrintMode::Mathematica, State::TAN) => f.write_str("Tan"),
        (PrintMode::Mathematica, State::SQRT) => f.write_str("Sqrt"),
        _ => f.write_str(s.get_name()),
    }
}

fn fmt_num(n: &Rational, f: &mut fmt::Formatter) -> fmt::Result {
    if *n.denom() == 1 {
        write!(f, "{}", n.numer())
    } else {
        write!(f, "{}/{}", n.numer(), n.denom())
    }
}

impl Atom {
    fn fmt_output(&self, f: &mut fmt::Formatter, print_mode: PrintMode) -> fmt::Result {
        match self {
            Atom::Num(n) => fmt_num(n, f),
            Atom::Var(v) => fmt_symbol(*v, f, print_mode),
            Atom::Fun(name, args) => {
                fmt_symbol(*name, f, print_mode)?;
                f.write_char(if print_mode == PrintMode::Mathematica { '[' } else { '(' })?;

                let mut first = true;
                for x in args {
                    if !first {
                        f.write_char(',')?;
                    }
                    first = false;

                    x.fmt_output(f, print_mode)?;
                }

                f.write_char(if print_mode == PrintMode::Mathematica { ']' } else { ')' })
            }
            Atom::Pow(p) => {
                let (b, e) = (&p.0, &p.1);
                let wrap_base = match b {
                    Atom::Add(_) | Atom::Mul(_) | Atom::Pow(_) => true,
                    Atom::Num(n) => *n < 0 || *n.denom() != 1,
                    _ => false,
                };

                if wrap_base {
                    f.write_char('(')?;
                    b.fmt_output(f, print_mode)?;
                    f.write_char(')')?;
                } else {
                    b.fmt_output(f, print_mode)?;
                }

                f.write_char('^')?;

                let wrap_exp = match e {
                    Atom::Add(_) | Atom::Mul(_) | Atom::Pow(_) => true,
                    Atom::Num(n) => *n.denom() != 1,
                    _ => false,
                };

                if wrap_exp {
                    f.write_char('(')?;
                    e.fmt_output(f, print_mode)?;
                    f.write_char(')')
                } else {
                    e.fmt_output(f, print_mode)
                }
            }
            Atom::Mul(factors) => {
                let mut first = true;
                for x in factors {
                    if first {
                        if let Atom::Num(n) = x {
                            if *n == -1 {
                                f.write_char('-')?;
                                continue;
                            }
                        }
                    } else {
                        f.write_char('*')?;
                    }
                    first = false;

                    if let Atom::Add(_) = x {
                        f.write_char('(')?;
                        x.fmt_output(f, print_mode)?;
                        f.write_char(')')?;
                    } else {
                        x.fmt_output(f, print_mode)?;
                    }
                }
                Ok(())
            }
            Atom::Add(terms) => {
                let mut first = true;
                for x in terms {
                    if !first && !x.is_negative_term() {
                        f.write_char('+')?;
                    }
                    first = false;

                    x.fmt_output(f, print_mode)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        atom::Atom,
        printer::{AtomPrinter, PrintMode},
    };

    #[test]
    fn print_and_reparse() {
        for input in [
            "x^2*sin(x)+1/2",
            "1-x",
            "(1+x)^(1/2)*y^-1",
            "-3*x^-2+exp(x*y)",
            "(2/3)^(1/2)",
        ] {
            let a = Atom::parse(input).unwrap();
            let printed = format!("{}", a);
            assert_eq!(Atom::parse(&printed).unwrap(), a, "{} -> {}", input, printed);
        }
    }

    #[test]
    fn print_forms() {
        let a = Atom::parse("1 - x").unwrap();
        assert_eq!(format!("{}", a), "1-x");

        let b = Atom::parse("2*x^3").unwrap();
        assert_eq!(format!("{}", b), "2*x^3");

        let c = Atom::parse("cos(pi*x)").unwrap();
        assert_eq!(
            format!("{}", AtomPrinter::new(&c, PrintMode::Mathematica)),
            "Cos[Pi*x]"
        );
    }
}
