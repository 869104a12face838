//! Symsample derives single-variable functions symbolically and samples the
//! function, its first derivative (gradient) and its second derivative
//! (laplacian) on evenly spaced points.
//!
//! For example:
//!
//! ```
//! use symsample::{derivative::Derivatives, sample::Sampler, state::Symbol};
//!
//! fn main() {
//!     let d = Derivatives::parse("x**2", "x").unwrap();
//!     println!("f = {}, f' = {}, f'' = {}", d.function, d.gradient, d.laplacian);
//!
//!     let record = Sampler::default().sample_derivatives(&d, Symbol::new("x"), 1., 0.1);
//!     println!("{}", record.to_json().unwrap());
//! }
//! ```
//!
//! Points at which an expression has no finite value are left out of the
//! sampled sequences, so the three sequences of a record may differ in length.

pub mod atom;
pub mod derivative;
pub mod evaluate;
mod expand;
pub mod kernel;
mod normalize;
pub mod parser;
pub mod printer;
pub mod range;
pub mod sample;
pub mod state;
