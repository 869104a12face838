use std::path::PathBuf;

use symsample::{
    atom::Atom,
    derivative::Derivatives,
    sample::{evaluate_points, sample, RecordError, SampleRecord, Sampler},
    state::Symbol,
};

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("symsample_{}_{}.json", std::process::id(), name))
}

fn assert_close(actual: &[(f64, f64)], expected: &[(f64, f64)]) {
    assert_eq!(actual.len(), expected.len());
    for ((x, y), (ex, ey)) in actual.iter().zip(expected) {
        assert!((x - ex).abs() < 1e-12, "point {} != {}", x, ex);
        assert!((y - ey).abs() < 1e-12, "value {} != {} at {}", y, ey, x);
    }
}

#[test]
fn square() {
    let x = Symbol::new("x");
    let d = Derivatives::parse("x**2", "x").unwrap();
    let record = Sampler::default().sample_derivatives(&d, x, 1., 0.1);

    let points: Vec<f64> = (0..10).map(|i| i as f64 / 10.).collect();

    assert_eq!(record.h_value, 0.1);
    assert_close(
        &record.function,
        &points.iter().map(|p| (*p, p * p)).collect::<Vec<_>>(),
    );
    assert_close(
        &record.gradient,
        &points.iter().map(|p| (*p, 2. * p)).collect::<Vec<_>>(),
    );
    assert_close(
        &record.laplacian,
        &points.iter().map(|p| (*p, 2.)).collect::<Vec<_>>(),
    );
}

#[test]
fn reciprocal_skips_pole() {
    let x = Symbol::new("x");
    let d = Derivatives::parse("1/x", "x").unwrap();
    let record = Sampler::default().sample_derivatives(&d, x, 10., 1.);

    for seq in [&record.function, &record.gradient, &record.laplacian] {
        assert_eq!(seq.len(), 9);
        assert_eq!(seq[0].0, 1.);
        assert_eq!(seq[8].0, 9.);
    }

    assert_eq!(record.function[1], (2., 0.5));
    assert_eq!(record.gradient[1], (2., -0.25));
    assert_eq!(record.laplacian[1], (2., 0.25));
}

#[test]
fn singularities_are_skipped() {
    let x = Symbol::new("x");

    for input in ["exp(-1/x^2)", "sin(x)/x", "x^2*exp(-1/x)"] {
        let points = evaluate_points(&Atom::parse(input).unwrap(), x, 0., 10., 10);
        assert_eq!(points.len(), 9, "{}", input);
        assert_eq!(points[0].0, 1.);
        assert!(points.iter().all(|(p, _)| *p != 0.));
    }

    let d = Derivatives::parse("exp(-1/x^2)", "x").unwrap();
    let record = Sampler::default().sample_derivatives(&d, x, 10., 0.);
    for seq in [&record.function, &record.gradient, &record.laplacian] {
        assert_eq!(seq.len(), 9);
        assert_eq!(seq[0].0, 1.);
    }
    assert!((record.function[0].1 - (-1f64).exp()).abs() < 1e-15);
}

#[test]
fn empty_interval() {
    let x = Symbol::new("x");
    let d = Derivatives::parse("x^2 + 1", "x").unwrap();
    let record = Sampler::default().sample_derivatives(&d, x, 0., 0.5);

    assert_eq!(record.function, vec![(0., 1.); 10]);
    assert_eq!(record.gradient, vec![(0., 0.); 10]);
    assert_eq!(record.laplacian, vec![(0., 2.); 10]);
}

#[test]
fn file_round_trip() {
    let x = Symbol::new("x");
    let path = temp_file("round_trip");

    let f = Atom::parse("sin(x)").unwrap();
    let g = Atom::parse("cos(x)").unwrap();
    let l = Atom::parse("-sin(x)").unwrap();

    let record = sample(&f, &g, &l, x, 3., 0.25, Some(&path)).unwrap();
    assert_eq!(SampleRecord::read_from(&path).unwrap(), record);

    // a second write replaces the content
    let record2 = sample(&f, &g, &l, x, 1., 0.5, Some(&path)).unwrap();
    let read = SampleRecord::read_from(&path).unwrap();
    assert_eq!(read, record2);
    assert_eq!(read.h_value, 0.5);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn failed_write_keeps_record() {
    let x = Symbol::new("x");
    let path = std::env::temp_dir()
        .join(format!("symsample_{}_missing", std::process::id()))
        .join("record.json");

    let d = Derivatives::parse("x", "x").unwrap();
    let err = Sampler::default()
        .sample_to(&d, x, 1., 2., Some(&path))
        .unwrap_err();

    assert!(matches!(err.error(), RecordError::Io { path: p, .. } if *p == path));
    assert_eq!(err.record().h_value, 2.);

    let record = err.into_record();
    assert_eq!(record.function.len(), 10);
    assert_eq!(record.h_value, 2.);
    assert!(!path.exists());
}

#[test]
fn no_destination() {
    let x = Symbol::new("x");
    let d = Derivatives::parse("x^3", "x").unwrap();
    let record = Sampler::default().sample_to(&d, x, 2., 0., None).unwrap();
    assert_eq!(record.laplacian.len(), 10);
    assert_eq!(record.laplacian[5], (1., 6.));
}
