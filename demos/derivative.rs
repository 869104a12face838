use symsample::{atom::Atom, derivative::Derivatives, state::Symbol};

fn main() {
    let x = Symbol::new("x");

    let inputs = [
        "(1+2*x)^(5+x)",
        "log(2*x) + exp(3*x) + sin(4*x) + cos(y*x)",
        "f(x^2,x)",
        "der(0,1,f(x,x^3))",
    ];

    for input in inputs {
        let input = Atom::parse(input).unwrap();
        println!("d({})/dx = {}", input, input.derivative(x));
    }

    let d = Derivatives::parse("x**2*exp(-x)", "x").unwrap();
    println!(
        "> f = {}\n  f' = {}\n  f'' = {}",
        d.function, d.gradient, d.laplacian
    );
}
