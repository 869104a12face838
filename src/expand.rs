use crate::atom::Atom;

impl Atom {
    /// Expand an expression by distributing products over sums and writing out
    /// positive integer powers of sums. Function arguments are left untouched.
    pub fn expand(&self) -> Atom {
        match self {
            Atom::Num(_) | Atom::Var(_) | Atom::Fun(_, _) => self.clone(),
            Atom::Pow(p) => {
                let base = p.0.expand();
                let exp = &p.1;

                if let (Atom::Add(_), Some(n)) = (&base, exp.as_num()) {
                    if let Some(n) = n.is_integer().then(|| n.numer().to_u32()).flatten() {
                        let mut out = Atom::one();
                        for _ in 0..n {
                            out = distribute(&out, &base);
                        }
                        return out;
                    }
                }

                let r = Atom::new_pow(base, exp.clone());
                if matches!(r, Atom::Mul(_)) {
                    r.expand()
                } else {
                    r
                }
            }
            Atom::Mul(factors) => {
                let mut out = Atom::one();
                for f in factors {
                    out = distribute(&out, &f.expand());
                }
                out
            }
            Atom::Add(terms) => Atom::new_add(terms.iter().map(|t| t.expand()).collect()),
        }
    }
}

/// Multiply two expanded expressions and expand the product.
fn distribute(a: &Atom, b: &Atom) -> Atom {
    let terms = |x: &Atom| -> Vec<Atom> {
        match x {
            Atom::Add(t) => t.clone(),
            _ => vec![x.clone()],
        }
    };

    let (lhs, rhs) = (terms(a), terms(b));
    let mut out = Vec::with_capacity(lhs.len() * rhs.len());
    for l in &lhs {
        for r in &rhs {
            out.push(l * r);
        }
    }

    Atom::new_add(out)
}
