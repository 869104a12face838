use std::collections::hash_map::Entry;
use std::sync::RwLock;

use ahash::{HashMap, HashMapExt};
use once_cell::sync::Lazy;
use smartstring::alias::String;

static STATE: Lazy<RwLock<State>> = Lazy::new(|| RwLock::new(State::new()));

/// A handle to an interned variable or function name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol {
    id: u32,
}

impl Symbol {
    pub(crate) const fn init(id: u32) -> Symbol {
        Symbol { id }
    }

    /// Get the symbol for `name`, registering it if needed.
    pub fn new<S: AsRef<str>>(name: S) -> Symbol {
        State::get_symbol(name)
    }

    #[inline]
    pub fn get_id(&self) -> u32 {
        self.id
    }

    pub fn get_name(&self) -> &'static str {
        State::get_name(*self)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.get_name())
    }
}

/// A global state, that stores mappings from variable and function names to ids.
pub struct State {
    str_to_id: HashMap<String, Symbol>,
    id_to_str: Vec<&'static str>,
}

impl State {
    pub const EXP: Symbol = Symbol::init(0);
    pub const LOG: Symbol = Symbol::init(1);
    pub const SIN: Symbol = Symbol::init(2);
    pub const COS: Symbol = Symbol::init(3);
    pub const TAN: Symbol = Symbol::init(4);
    pub const SQRT: Symbol = Symbol::init(5);
    pub const DERIVATIVE: Symbol = Symbol::init(6);
    pub const PI: Symbol = Symbol::init(7);

    pub const BUILTIN_VAR_LIST: [&'static str; 8] =
        ["exp", "log", "sin", "cos", "tan", "sqrt", "der", "pi"];

    fn new() -> State {
        let mut state = State {
            str_to_id: HashMap::new(),
            id_to_str: Vec::new(),
        };

        for x in Self::BUILTIN_VAR_LIST {
            state.get_symbol_impl(x);
        }

        state
    }

    /// Get the global state.
    #[inline]
    pub(crate) fn get_global_state() -> &'static RwLock<State> {
        &STATE
    }

    /// Returns `true` iff this symbol is one of the builtin functions or constants.
    pub fn is_builtin(id: Symbol) -> bool {
        id.get_id() < Self::BUILTIN_VAR_LIST.len() as u32
    }

    /// Iterate over all user-defined symbol names.
    pub fn symbol_iter() -> impl Iterator<Item = &'static str> {
        let names = STATE.read().unwrap().id_to_str.clone();
        names.into_iter().skip(Self::BUILTIN_VAR_LIST.len())
    }

    /// Get the symbol for a certain name if the name is already registered,
    /// else register it and return a new symbol.
    pub fn get_symbol<S: AsRef<str>>(name: S) -> Symbol {
        STATE.write().unwrap().get_symbol_impl(name.as_ref())
    }

    pub(crate) fn get_symbol_impl(&mut self, name: &str) -> Symbol {
        match self.str_to_id.entry(name.into()) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                if self.id_to_str.len() == u32::MAX as usize - 1 {
                    panic!("Too many variables defined");
                }

                // names live as long as the process, like the symbols referring to them
                let id = self.id_to_str.len() as u32;
                self.id_to_str.push(Box::leak(Box::<str>::from(name)));

                let new_symbol = Symbol::init(id);
                v.insert(new_symbol);
                new_symbol
            }
        }
    }

    /// Get the name for a given symbol.
    pub fn get_name(id: Symbol) -> &'static str {
        STATE.read().unwrap().id_to_str[id.get_id() as usize]
    }
}
