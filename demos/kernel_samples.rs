use std::path::PathBuf;

use rug::Rational;
use symsample::{kernel::SmoothingKernel, sample::Sampler};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("SYMSAMPLE_LOG"))
        .init();

    let h = Rational::from((1, 10));
    let sampler = Sampler::default();

    for kernel in SmoothingKernel::ALL {
        let record = kernel.sample(&h, &sampler).unwrap();

        let path = PathBuf::from(format!("{}.json", kernel));
        match record.persist(Some(&path)) {
            Ok(r) => println!(
                "> {}: wrote {} function values to {}",
                kernel,
                r.function.len(),
                path.display()
            ),
            Err(e) => println!("> {}: {}", kernel, e),
        }
    }
}
