use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use rug::Rational;
use symsample::{
    derivative::Derivatives,
    kernel::{parse_radius, SmoothingKernel},
    sample::{PersistError, SampleRecord, Sampler, SamplingSettings},
    state::Symbol,
};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Sample a function and its derivatives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Derive an expression and sample it on evenly spaced points in [start, end)
    Expr {
        expr: String,
        #[arg(long, default_value = "x")]
        var: String,
        #[arg(long, allow_negative_numbers = true)]
        end: f64,
        /// Value that is stored unchanged as `h_value`
        #[arg(long, default_value_t = 0., allow_negative_numbers = true)]
        h: f64,
        #[arg(long, default_value_t = 0., allow_negative_numbers = true)]
        start: f64,
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Write the record to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Sample a smoothing kernel (poly6, spiky or viscosity) on [0, h)
    Kernel {
        name: SmoothingKernel,
        #[arg(long, value_parser = parse_radius)]
        h: Rational,
        #[arg(long, default_value_t = 10)]
        count: usize,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn run(command: Command) -> Result<(), String> {
    let (record, output) = match command {
        Command::Expr {
            expr,
            var,
            end,
            h,
            start,
            count,
            output,
        } => {
            let d = Derivatives::parse(&expr, &var)?;
            debug!("f = {}, f' = {}, f'' = {}", d.function, d.gradient, d.laplacian);

            let sampler = Sampler::new(SamplingSettings { start, count });
            (sampler.sample_derivatives(&d, Symbol::new(&var), end, h), output)
        }
        Command::Kernel {
            name,
            h,
            count,
            output,
        } => {
            let sampler = Sampler::new(SamplingSettings { start: 0., count });
            (name.sample(&h, &sampler)?, output)
        }
    };

    write_record(record, output)
}

fn write_record(record: SampleRecord, output: Option<PathBuf>) -> Result<(), String> {
    match output {
        Some(path) => record
            .persist(Some(&path))
            .map(|_| ())
            .map_err(|e: PersistError| e.to_string()),
        None => {
            println!("{}", record.to_json().map_err(|e| e.to_string())?);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("SYMSAMPLE_LOG"))
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
