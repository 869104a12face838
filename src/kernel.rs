//! Radial profiles of the smoothing kernels used in smoothed-particle hydrodynamics.

use std::{fmt, str::FromStr};

use rug::Rational;
use tracing::debug;

use crate::{
    atom::Atom,
    derivative::Derivatives,
    sample::{SampleRecord, Sampler},
    state::Symbol,
};

/// A smoothing kernel `W(r, h)` with support radius `h`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SmoothingKernel {
    Poly6,
    Spiky,
    Viscosity,
}

impl SmoothingKernel {
    pub const ALL: [SmoothingKernel; 3] = [
        SmoothingKernel::Poly6,
        SmoothingKernel::Spiky,
        SmoothingKernel::Viscosity,
    ];

    fn profile(&self) -> &'static str {
        match self {
            SmoothingKernel::Poly6 => "315/(64*pi*h^9)*(h^2-r^2)^3",
            SmoothingKernel::Spiky => "15/(pi*h^6)*(h-r)^3",
            SmoothingKernel::Viscosity => {
                "15/(2*pi*h^3)*(-r^3/(2*h^3) + r^2/h^2 + h/(2*r) - 1)"
            }
        }
    }

    /// The radial variable `r`.
    pub fn radius() -> Symbol {
        Symbol::new("r")
    }

    /// The kernel as an expression in `r` for the support radius `h`.
    pub fn expression(&self, h: &Rational) -> Result<Atom, String> {
        let w = Atom::parse(self.profile())?;
        Ok(w.replace_symbol(Symbol::new("h"), &Atom::new_num(h.clone())))
    }

    /// Derive the kernel with respect to `r` and sample it on `[start, h)`.
    ///
    /// The viscosity kernel diverges at `r = 0`, so that point is absent from its record.
    pub fn sample(&self, h: &Rational, sampler: &Sampler) -> Result<SampleRecord, String> {
        let w = self.expression(h)?;
        let d = Derivatives::new(&w, Self::radius());
        debug!("Sampling {} kernel: W = {}", self, d.function);

        let h = h.to_f64();
        Ok(sampler.sample_derivatives(&d, Self::radius(), h, h))
    }
}

impl fmt::Display for SmoothingKernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            SmoothingKernel::Poly6 => "poly6",
            SmoothingKernel::Spiky => "spiky",
            SmoothingKernel::Viscosity => "viscosity",
        })
    }
}

impl FromStr for SmoothingKernel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SmoothingKernel::ALL
            .into_iter()
            .find(|k| k.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown kernel '{}': expected poly6, spiky or viscosity", s))
    }
}

/// Parse a support radius such as `0.1` or `1/10` into an exact positive rational.
pub fn parse_radius(input: &str) -> Result<Rational, String> {
    match Atom::parse(input)? {
        Atom::Num(h) if h > 0 => Ok(h),
        a => Err(format!("Support radius must be a positive number, got {}", a)),
    }
}

#[cfg(test)]
mod test {
    use rug::Rational;

    use crate::{atom::Atom, sample::Sampler};

    use super::{parse_radius, SmoothingKernel};

    #[test]
    fn names() {
        assert_eq!("Poly6".parse::<SmoothingKernel>(), Ok(SmoothingKernel::Poly6));
        assert_eq!("SPIKY".parse::<SmoothingKernel>(), Ok(SmoothingKernel::Spiky));
        assert_eq!(" viscosity".parse::<SmoothingKernel>(), Ok(SmoothingKernel::Viscosity));
        assert!("gaussian".parse::<SmoothingKernel>().is_err());
    }

    #[test]
    fn radius() {
        assert_eq!(parse_radius("0.1"), Ok(Rational::from((1, 10))));
        assert_eq!(parse_radius("1/4"), Ok(Rational::from((1, 4))));
        assert!(parse_radius("0").is_err());
        assert!(parse_radius("-1").is_err());
        assert!(parse_radius("r").is_err());
    }

    #[test]
    fn spiky_expression() {
        let w = SmoothingKernel::Spiky
            .expression(&Rational::from(1))
            .unwrap();
        assert_eq!(w, Atom::parse("15/pi*(1-r)^3").unwrap());
    }

    #[test]
    fn poly6_at_origin() {
        let h = Rational::from((1, 10));
        let r = SmoothingKernel::Poly6.sample(&h, &Sampler::default()).unwrap();

        assert_eq!(r.h_value, 0.1);
        assert_eq!(r.function.len(), 10);
        assert_eq!(r.function[0].0, 0.);

        let expected = 315. / (64. * std::f64::consts::PI * 0.1f64.powi(3));
        assert!((r.function[0].1 - expected).abs() / expected < 1e-12);
        assert!(r.gradient[0].1.abs() < 1e-9);
    }

    #[test]
    fn viscosity_drops_origin() {
        let h = Rational::from((1, 10));
        let r = SmoothingKernel::Viscosity
            .sample(&h, &Sampler::default())
            .unwrap();

        assert_eq!(r.function.len(), 9);
        assert_eq!(r.gradient.len(), 9);
        assert_eq!(r.laplacian.len(), 9);
        assert!(r.function.iter().all(|(x, _)| *x > 0.));
    }
}
