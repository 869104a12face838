use std::fmt::Write;

use rug::{Integer, Rational};
use smallvec::SmallVec;
use smartstring::{LazyCompact, SmartString};

use crate::{atom::Atom, state::State};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ParseState {
    Identifier,
    Number,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Mul,
    Add,
    Pow,
    Argument, // comma
    Neg,      // left side should be tagged as 'finished'
    Inv,      // left side should be tagged as 'finished', for internal use
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Mul => f.write_char('*'),
            Operator::Add => f.write_char('+'),
            Operator::Pow => f.write_char('^'),
            Operator::Argument => f.write_char(','),
            Operator::Neg => f.write_char('-'),
            Operator::Inv => f.write_char('/'),
        }
    }
}

impl Operator {
    #[inline]
    pub fn get_precedence(&self) -> u8 {
        match self {
            Operator::Mul => 8,
            Operator::Add => 7,
            Operator::Pow => 11,
            Operator::Argument => 6,
            Operator::Neg => 10,
            Operator::Inv => 9,
        }
    }

    #[inline]
    pub fn right_associative(&self) -> bool {
        !matches!(self, Operator::Pow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Number(SmartString<LazyCompact>),
    ID(SmartString<LazyCompact>),
    Op(bool, bool, Operator, Vec<Token>),
    Fn(bool, Vec<Token>),
    Start,
    OpenParenthesis,
    CloseParenthesis,
    EOF,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => f.write_str(n),
            Token::ID(v) => f.write_str(v),
            Token::Op(_, _, o, m) => {
                let mut first = true;
                f.write_char('(')?;

                for mm in m {
                    if !first {
                        match o {
                            Operator::Neg => f.write_char('-')?,
                            Operator::Inv => f.write_str("1/")?,
                            _ => std::fmt::Display::fmt(o, f)?,
                        }
                    } else if *o == Operator::Neg {
                        f.write_char('-')?;
                    } else if *o == Operator::Inv {
                        f.write_str("1/")?;
                    }
                    first = false;

                    std::fmt::Display::fmt(mm, f)?;
                }
                f.write_char(')')
            }
            Token::Fn(_, args) => {
                let mut first = true;

                if let Some(name) = args.first() {
                    std::fmt::Display::fmt(name, f)?;
                }

                f.write_char('(')?;
                for aa in args.iter().skip(1) {
                    if !first {
                        f.write_char(',')?;
                    }
                    first = false;

                    std::fmt::Display::fmt(aa, f)?;
                }
                f.write_char(')')
            }
            Token::Start => f.write_str("START"),
            Token::OpenParenthesis => f.write_char('('),
            Token::CloseParenthesis => f.write_char(')'),
            Token::EOF => f.write_str("EOF"),
        }
    }
}

impl Token {
    /// Return if the token does not require any further arguments.
    fn is_normal(&self) -> bool {
        match self {
            Token::Number(_) => true,
            Token::ID(_) => true,
            Token::Op(more_left, more_right, _, _) => !more_left && !more_right,
            Token::Fn(more_right, _) => !more_right,
            _ => false,
        }
    }

    /// Return if the token still expects an argument on its right-hand side,
    /// so that a following `+`, `-` or `/` is unary.
    fn expects_operand(&self) -> bool {
        matches!(
            self,
            Token::Start | Token::OpenParenthesis | Token::Fn(true, _) | Token::Op(_, true, _, _)
        )
    }

    /// Get the precedence of the token.
    #[inline]
    fn get_precedence(&self) -> u8 {
        match self {
            Token::Number(_) => 11,
            Token::ID(_) => 11,
            Token::Op(_, _, o, _) => o.get_precedence(),
            Token::Fn(_, _) | Token::OpenParenthesis | Token::CloseParenthesis => 5,
            Token::Start | Token::EOF => 4,
        }
    }

    /// Add `other` to the left side of `self`, where `self` is a binary operation.
    #[inline]
    fn add_left(&mut self, other: Token) -> Result<(), String> {
        if let Token::Op(ml, _, o1, args) = self {
            debug_assert!(*ml);
            *ml = false;

            if let Token::Op(ml, mr, o2, mut args2) = other {
                debug_assert!(!ml && !mr);
                if *o1 == o2 {
                    // add from the left by swapping and then extending from the right
                    std::mem::swap(args, &mut args2);
                    args.append(&mut args2);
                } else {
                    args.insert(0, Token::Op(false, false, o2, args2));
                }
            } else {
                args.insert(0, other);
            }
            Ok(())
        } else {
            Err(format!(
                "operator expected, but found '{}'. Are parentheses unbalanced?",
                self
            ))
        }
    }

    fn distribute_neg(&mut self) {
        match self {
            Token::Op(_, _, Operator::Neg, args3) if args3.len() == 1 => {
                if let Some(t) = args3.pop() {
                    *self = t;
                }
            }
            Token::Op(_, _, Operator::Mul, args2) => {
                if let Some(a) = args2.first_mut() {
                    a.distribute_neg();
                }
            }
            Token::Op(_, _, Operator::Add, args2) => {
                for a in args2 {
                    a.distribute_neg();
                }
            }
            Token::Number(n) => {
                if n.starts_with('-') {
                    n.remove(0);
                } else {
                    n.insert(0, '-');
                }
            }
            _ => {
                let t = std::mem::replace(self, Token::EOF);
                *self = Token::Op(false, false, Operator::Neg, vec![t]);
            }
        }
    }

    /// Add `other` to right side of `self`, where `self` is a binary operation.
    #[inline]
    fn add_right(&mut self, mut other: Token) -> Result<(), String> {
        if let Token::Op(_, mr, o1, args) = self {
            debug_assert!(*mr);
            *mr = false;

            if *o1 == Operator::Neg {
                other.distribute_neg();
                *self = other;
                return Ok(());
            }

            if let Token::Op(ml, mr, o2, mut args2) = other {
                debug_assert!(!ml && !mr);
                if *o1 == o2 && o2.right_associative() {
                    if o2 == Operator::Inv && args2.len() == 1 {
                        // twice inv cancels out
                        if let Some(t) = args2.pop() {
                            *self = t;
                        }
                    } else {
                        args.append(&mut args2)
                    }
                } else {
                    args.push(Token::Op(false, false, o2, args2));
                }
            } else {
                args.push(other);
            }

            Ok(())
        } else {
            Err(format!(
                "operator expected, but found '{}'. Are parentheses unbalanced?",
                self
            ))
        }
    }

    /// Parse the token into a normalized atom, registering new symbols in the global state.
    pub fn to_atom(&self) -> Result<Atom, String> {
        let mut state = State::get_global_state().write().unwrap();
        self.to_atom_with_state(&mut state)
    }

    fn to_atom_with_state(&self, state: &mut State) -> Result<Atom, String> {
        match self {
            Token::Number(n) => Ok(Atom::Num(parse_decimal(n)?)),
            Token::ID(x) => Ok(Atom::Var(state.get_symbol_impl(x))),
            Token::Op(_, _, op, args) => match op {
                Operator::Mul => {
                    let factors = args
                        .iter()
                        .map(|a| a.to_atom_with_state(state))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Atom::new_mul(factors))
                }
                Operator::Add => {
                    let terms = args
                        .iter()
                        .map(|a| a.to_atom_with_state(state))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Atom::new_add(terms))
                }
                Operator::Pow => {
                    // pow is right associative
                    let mut it = args.iter().rev();
                    let mut out = match it.next() {
                        Some(last) => last.to_atom_with_state(state)?,
                        None => return Err("Power without arguments".into()),
                    };
                    for a in it {
                        let base = a.to_atom_with_state(state)?;
                        out = Atom::new_pow(base, out);
                    }
                    Ok(out)
                }
                Operator::Argument => Err("Unexpected argument operator".into()),
                Operator::Neg => {
                    let base = Self::unary_arg(args)?.to_atom_with_state(state)?;
                    Ok(Atom::new_mul(vec![base, Atom::from(-1)]))
                }
                Operator::Inv => {
                    let base = Self::unary_arg(args)?.to_atom_with_state(state)?;
                    Ok(Atom::new_pow(base, Atom::from(-1)))
                }
            },
            Token::Fn(_, args) => {
                let name = match args.first() {
                    Some(Token::ID(s)) => s,
                    _ => return Err("Function without a name".into()),
                };

                let name = state.get_symbol_impl(name);
                let fn_args = args
                    .iter()
                    .skip(1)
                    .map(|a| a.to_atom_with_state(state))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Atom::new_fun(name, fn_args))
            }
            x => Err(format!("Unexpected token {}", x)),
        }
    }

    fn unary_arg(args: &[Token]) -> Result<&Token, String> {
        match args {
            [a] => Ok(a),
            _ => Err("Unary operator must have exactly one argument".into()),
        }
    }

    /// Parse an expression into a token tree.
    ///
    /// Powers can be written as `^` or `**`, and a missing `*` is inserted
    /// between adjacent operands: `2x(1+x)` is `2*x*(1+x)`.
    pub fn parse(input: &str) -> Result<Token, String> {
        let mut stack: Vec<_> = Vec::with_capacity(20);
        stack.push(Token::Start);
        let mut state = ParseState::Any;

        let ops = ['\0', '^', '+', '*', '-', '(', ')', '/', ','];
        let whitespace = [' ', '\t', '\n', '\r', '\\'];
        let forbidden = [';', ':', '&', '!', '%', '[', ']', '=', '<', '>'];

        let mut char_iter = input.chars();
        let mut c = char_iter.next().unwrap_or('\0'); // add EOF as a token
        let mut extra_ops: SmallVec<[char; 6]> = SmallVec::new();

        let mut id_buffer = String::with_capacity(30);

        let mut line_counter = 1;
        let mut column_counter = 1;

        loop {
            match state {
                ParseState::Identifier => {
                    if ops.contains(&c) || whitespace.contains(&c) {
                        state = ParseState::Any;
                        stack.push(Token::ID(id_buffer.as_str().into()));
                        id_buffer.clear();
                    } else if !forbidden.contains(&c) {
                        id_buffer.push(c);
                    } else {
                        // check for some symbols that could be the result of copy-paste errors
                        // when importing from other languages
                        Err(format!(
                            "Unexpected '{}' in input at line {} and column {}",
                            c, line_counter, column_counter
                        ))?;
                    }
                }
                ParseState::Number => {
                    if (c == 'e' || c == 'E')
                        && !id_buffer.contains(['e', 'E'])
                        && starts_with_exponent(char_iter.as_str())
                    {
                        id_buffer.push(c);
                        if let Some(sign @ ('+' | '-')) = char_iter.as_str().chars().next() {
                            id_buffer.push(sign);
                            char_iter.next();
                            column_counter += 1;
                        }
                    } else if c != '_' && c != '.' && !c.is_ascii_digit() {
                        state = ParseState::Any;
                        stack.push(Token::Number(id_buffer.as_str().into()));
                        id_buffer.clear();
                    } else if c != '_' {
                        id_buffer.push(c);
                    }
                }
                ParseState::Any => {}
            }

            if state == ParseState::Any {
                if whitespace.contains(&c) {
                    if c == '\n' {
                        column_counter = 1;
                        line_counter += 1;
                    } else {
                        column_counter += 1;
                    }

                    c = char_iter.next().unwrap_or('\0');
                    continue;
                }

                let (last_is_normal, last_expects_operand) = stack
                    .last()
                    .map(|t| (t.is_normal(), t.expects_operand()))
                    .unwrap_or((false, true));

                match c {
                    '+' => {
                        if !last_expects_operand {
                            stack.push(Token::Op(true, true, Operator::Add, vec![]))
                        }
                        // a unary + operator can be ignored as plus is the default
                    }
                    '^' => stack.push(Token::Op(true, true, Operator::Pow, vec![])),
                    '*' => {
                        if char_iter.as_str().starts_with('*') {
                            // python-style power
                            char_iter.next();
                            column_counter += 1;
                            stack.push(Token::Op(true, true, Operator::Pow, vec![]))
                        } else {
                            stack.push(Token::Op(true, true, Operator::Mul, vec![]))
                        }
                    }
                    '-' => {
                        if last_expects_operand {
                            // unary minus only requires an argument to the right
                            stack.push(Token::Op(false, true, Operator::Neg, vec![]));
                        } else {
                            stack.push(Token::Op(true, true, Operator::Add, vec![]));
                            extra_ops.push('-'); // push a unary minus
                        }
                    }
                    '(' => {
                        // check if the opening bracket belongs to a function
                        if let Some(Token::ID(_)) = stack.last() {
                            if let Some(name) = stack.pop() {
                                stack.push(Token::Fn(true, vec![name])); // serves as open paren
                            }
                        } else if last_is_normal {
                            // insert multiplication: x(...) -> x*(...)
                            stack.push(Token::Op(true, true, Operator::Mul, vec![]));
                            extra_ops.push(c);
                        } else {
                            stack.push(Token::OpenParenthesis)
                        }
                    }
                    ')' => stack.push(Token::CloseParenthesis),
                    '/' => {
                        if last_expects_operand {
                            // unary inv only requires an argument to the right
                            stack.push(Token::Op(false, true, Operator::Inv, vec![]));
                        } else {
                            stack.push(Token::Op(true, true, Operator::Mul, vec![]));
                            extra_ops.push('/'); // push a (unary) inverse
                        }
                    }
                    ',' => stack.push(Token::Op(true, true, Operator::Argument, vec![])),
                    '\0' => stack.push(Token::EOF),
                    _ => {
                        if last_is_normal {
                            // insert multiplication: x y -> x*y
                            stack.push(Token::Op(true, true, Operator::Mul, vec![]));
                            extra_ops.push(c);
                        } else if c.is_ascii_digit() || c == '.' {
                            state = ParseState::Number;
                            id_buffer.push(c);
                        } else if !forbidden.contains(&c) {
                            state = ParseState::Identifier;
                            id_buffer.push(c);
                        } else {
                            Err(format!(
                                "Unexpected '{}' in input at line {} and column {}",
                                c, line_counter, column_counter
                            ))?;
                        }
                    }
                }
            }

            // match on triplets of type operator identifier operator
            while state == ParseState::Any && stack.len() > 2 {
                if !stack[stack.len() - 2].is_normal() {
                    // check if the left operator needs a right-hand side and the new operator still needs a left-hand side
                    match &stack[stack.len() - 1] {
                        Token::Op(true, _, op, _) => {
                            Err(format!(
                                "Error at line {} and position {}: operator '{}' is missing left-hand side",
                                line_counter, column_counter, op,
                            ))?;
                        }
                        Token::CloseParenthesis => {
                            let pos = stack.len() - 2;
                            // check if we have an empty function
                            if let Token::Fn(f, _) = &mut stack[pos] {
                                *f = false;
                                stack.pop();
                            } else {
                                Err(format!(
                                    "Error at line {} and position {}: unexpected ')'",
                                    line_counter, column_counter,
                                ))?;
                            }
                        }
                        _ => {}
                    }

                    // no simplification, get new token
                    break;
                }

                let (Some(mut last), Some(middle)) = (stack.pop(), stack.pop()) else {
                    return Err("Unknown parsing error: stack underflow".into());
                };
                let Some(mut first) = stack.last_mut() else {
                    return Err("Unknown parsing error: stack underflow".into());
                };

                match first.get_precedence().cmp(&last.get_precedence()) {
                    std::cmp::Ordering::Greater => {
                        first.add_right(middle).map_err(|e| {
                            format!(
                                "Error at line {} and position {}: ",
                                line_counter, column_counter
                            ) + e.as_str()
                        })?;
                        stack.push(last);
                    }
                    std::cmp::Ordering::Less => {
                        last.add_left(middle).map_err(|e| {
                            format!(
                                "Error at line {} and position {}: ",
                                line_counter, column_counter
                            ) + e.as_str()
                        })?;

                        stack.push(last);
                    }
                    std::cmp::Ordering::Equal => {
                        // same degree, special merges!
                        match (&mut first, middle, last) {
                            (Token::Start, mid, Token::EOF) => {
                                *first = mid;
                            }
                            (Token::Fn(mr, args), mid, Token::CloseParenthesis) => {
                                debug_assert!(*mr);
                                *mr = false;

                                if let Token::Op(_, _, Operator::Argument, arg2) = mid {
                                    args.extend(arg2);
                                } else {
                                    args.push(mid);
                                }
                            }
                            (Token::OpenParenthesis, mid, Token::CloseParenthesis) => {
                                *first = mid;
                            }
                            (
                                Token::Op(ml1, mr1, o1, m),
                                mid,
                                Token::Op(ml2, mr2, mut o2, mut mm),
                            ) => {
                                debug_assert!(!*ml1);
                                debug_assert!(*mr1 && ml2);
                                // same precedence, so left associate

                                // flatten if middle identifier is also a binary operator of the same type that
                                // is also right associative
                                if let Token::Op(_, _, o_mid, mut m_mid) = mid {
                                    if o_mid == *o1 && o_mid.right_associative() {
                                        m.append(&mut m_mid);
                                    } else {
                                        m.push(Token::Op(false, false, o_mid, m_mid));
                                    }
                                } else {
                                    m.push(mid)
                                }

                                // may not be the same operator, in the case of * and /
                                if *o1 == o2 {
                                    m.append(&mut mm);
                                    *mr1 = mr2;
                                } else {
                                    // embed operator 1 in operator 2
                                    *mr1 = mr2;
                                    std::mem::swap(o1, &mut o2);
                                    std::mem::swap(m, &mut mm);
                                    m.insert(0, Token::Op(false, false, o2, mm));
                                }
                            }
                            _ => return Err("Cannot merge operator".to_string()),
                        }
                    }
                }
            }

            if c == '\0' {
                break;
            }

            // first drain the queue of extra operators
            if extra_ops.is_empty() {
                if c == '\n' {
                    column_counter = 1;
                    line_counter += 1;
                } else {
                    column_counter += 1;
                }

                c = char_iter.next().unwrap_or('\0');
            } else {
                c = extra_ops.remove(0);
            }
        }

        if stack.len() == 1 {
            stack.pop().ok_or_else(|| "Expression is empty".to_string())
        } else {
            match stack.get(stack.len().wrapping_sub(2)) {
                Some(Token::Op(false, true, op, _)) => Err(format!(
                    "Unexpected end of input: missing right-hand side for operator '{}'",
                    op
                )),
                Some(Token::OpenParenthesis) => {
                    Err("Unexpected end of input: open parenthesis is not closed".to_string())
                }
                Some(Token::Fn(true, args)) => Err(format!(
                    "Unexpected end of input: Missing closing parenthesis for function '{}'",
                    args.first().map(|a| a.to_string()).unwrap_or_default()
                )),
                Some(Token::Start) => Err("Expression is empty".to_string()),
                _ => Err(format!("Unknown parsing error: {:?}", stack)),
            }
        }
    }
}

/// Returns `true` if `rest` starts with an exponent, optionally signed: `3`, `-3` or `+3`.
fn starts_with_exponent(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some('+' | '-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(c) => c.is_ascii_digit(),
        None => false,
    }
}

/// Parse an integer or a decimal number such as `-12.5` or `1.5e-3` into an exact rational.
fn parse_decimal(n: &str) -> Result<Rational, String> {
    let (mantissa, exponent) = match n.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (n, None),
    };

    let r = parse_mantissa(mantissa).map_err(|_| format!("Could not parse number: '{}'", n))?;

    let Some(exponent) = exponent else {
        return Ok(r);
    };

    let e = exponent
        .parse::<i32>()
        .ok()
        .filter(|e| e.unsigned_abs() <= MAX_DECIMAL_EXPONENT)
        .ok_or_else(|| format!("Invalid exponent in number: '{}'", n))?;

    let scale = Rational::from(Integer::from(Integer::u_pow_u(10, e.unsigned_abs())));
    Ok(if e < 0 { r / scale } else { r * scale })
}

/// The largest decimal exponent accepted in a number literal.
const MAX_DECIMAL_EXPONENT: u32 = 4096;

fn parse_mantissa(n: &str) -> Result<Rational, String> {
    let (negative, digits) = match n.strip_prefix('-') {
        Some(d) => (true, d),
        None => (false, n),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };

    if (int_part.is_empty() && frac_part.is_empty())
        || frac_part.contains('.')
        || !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit())
    {
        return Err(format!("Could not parse number: '{}'", n));
    }

    let mut all_digits = String::with_capacity(int_part.len() + frac_part.len());
    all_digits.push_str(int_part);
    all_digits.push_str(frac_part);

    let num = all_digits
        .parse::<Integer>()
        .map_err(|e| format!("Could not parse number '{}': {}", n, e))?;
    let den = Integer::from(Integer::u_pow_u(10, frac_part.len() as u32));

    let r = Rational::from((num, den));
    Ok(if negative { -r } else { r })
}

#[cfg(test)]
mod test {
    use rug::Rational;

    use crate::{atom::Atom, parser::Token};

    #[test]
    fn python_power() {
        assert_eq!(
            Atom::parse("x**2 + 3*x").unwrap(),
            Atom::parse("x^2 + 3x").unwrap()
        );
    }

    #[test]
    fn implicit_multiplication() {
        assert_eq!(
            Atom::parse("2x(1+x)").unwrap(),
            Atom::parse("2*x*(1+x)").unwrap()
        );
    }

    #[test]
    fn decimals() {
        assert_eq!(
            Atom::parse("0.125").unwrap().as_num(),
            Some(&Rational::from((1, 8)))
        );
        assert_eq!(
            Atom::parse("-1.5*2").unwrap().as_num(),
            Some(&Rational::from(-3))
        );
        assert_eq!(Atom::parse("1_000").unwrap(), Atom::from(1000));
        assert!(Atom::parse("1.2.3").is_err());
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(
            Atom::parse("1e-3*x").unwrap(),
            Atom::parse("1/1000*x").unwrap()
        );
        assert_eq!(Atom::parse("2.5E+2").unwrap(), Atom::from(250));
        assert_eq!(Atom::parse("3e2").unwrap(), Atom::from(300));
        assert_eq!(
            Atom::parse("2exp(x)").unwrap(),
            Atom::parse("2*exp(x)").unwrap()
        );
        assert!(Atom::parse("1e99999").is_err());
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(Atom::parse("2^3^2").unwrap(), Atom::from(512));
    }

    #[test]
    fn unary_operators() {
        assert_eq!(Atom::parse("-(-x)").unwrap(), Atom::parse("x").unwrap());
        assert_eq!(Atom::parse("+x - -x").unwrap(), Atom::parse("2*x").unwrap());
        assert_eq!(Atom::parse("x^-1*x").unwrap(), Atom::from(1));
    }

    #[test]
    fn functions() {
        let a = Atom::parse("f(x, y^2) + sin(x)").unwrap();
        assert_eq!(format!("{}", a), "sin(x)+f(x,y^2)");
    }

    #[test]
    fn errors() {
        assert!(Token::parse("").is_err());
        assert!(Token::parse("(x + 1").is_err());
        assert!(Token::parse("x + ").is_err());
        assert!(Token::parse("sin(x").is_err());
        assert!(Token::parse("x; y").is_err());
        assert!(Token::parse("x)").is_err());
    }
}
