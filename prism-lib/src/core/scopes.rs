//! Scopes is a stack of Mappings. Used by the code generator to resolve names.
//!
//! The chain is built from immutable datastructures with structural sharing, so a
//! [`SymbolTable`] can be cloned for every compilation without copying the global
//! bindings.

use im::HashMap as ImHashMap;
use im::Vector as ImVec;
use log::warn;
use thiserror::Error;

use std::borrow::Borrow;
use std::fmt::Debug;
use std::hash::Hash;

use crate::core::DataType;

pub type Scope<K, V> = ImHashMap<K, V>;

/// represents the scope hirarchy
#[derive(Debug, Clone)]
pub struct Scopes<K, V>
where
    K: Debug + Hash + Clone + Eq,
    V: Clone + Debug,
{
    /// Each Entry in the vec is a new scope, the last is the inner most one.
    /// The first scope is the global scope and is never removed.
    pub scopes: ImVec<Scope<K, V>>,
}

impl<K, V> Default for Scopes<K, V>
where
    K: Debug + Hash + Clone + Eq,
    V: Clone + Debug,
{
    fn default() -> Self {
        Scopes {
            scopes: ImVec::unit(ImHashMap::new()),
        }
    }
}

impl<K, V> Scopes<K, V>
where
    K: Debug + Hash + Clone + Eq,
    V: Clone + Debug,
{
    /// open a new scope
    pub fn open_new(&mut self) {
        self.scopes.push_back(ImHashMap::new());
    }

    /// Removes the innermost scope and returns it. The global scope stays,
    /// collapsing it returns None.
    pub fn collapse_innermost(&mut self) -> Option<Scope<K, V>> {
        if self.scopes.len() > 1 {
            self.scopes.pop_back()
        } else {
            None
        }
    }

    /// number of open scopes, the global one included
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// add a symbol to the innermost scope. Returns the entry it shadows in
    /// that same scope, if any.
    pub fn add_entry(&mut self, key: K, val: V) -> Option<V> {
        self.scopes.back_mut()?.insert(key, val)
    }

    /// returns the information about a symbol if it can be found.
    ///
    /// starts searching in the innermost scope, and goes outwards,
    /// if the symbol is not in the scope. Returns None if the symbol is not
    /// in any scope
    pub fn find_entry<BK>(&self, key: &BK) -> Option<&V>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.scopes.iter().rev().find_map(|scope| scope.get(key))
    }

    /// like [`Scopes::find_entry`] but only looks at the innermost scope
    pub fn find_in_innermost<BK>(&self, key: &BK) -> Option<&V>
    where
        BK: Hash + Eq + ?Sized,
        K: Borrow<BK>,
    {
        self.scopes.back()?.get(key)
    }
}

/// A call target: a chunk index when non-negative, native `k` encoded as `-(k + 1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallTarget(pub i64);

impl CallTarget {
    pub fn chunk(idx: usize) -> Self {
        CallTarget(idx as i64)
    }

    pub fn native(idx: usize) -> Self {
        CallTarget(-(idx as i64) - 1)
    }

    pub fn decode(self) -> Target {
        if self.0 >= 0 {
            Target::Chunk(self.0 as usize)
        } else {
            Target::Native((-(self.0 + 1)) as usize)
        }
    }
}

/// the decoded form of a [`CallTarget`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Chunk(usize),
    Native(usize),
}

/// what a name resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datum {
    Slot(u16),
    Callable(CallTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub dtype: DataType,
    pub exposed: bool,
    pub internal: bool,
    pub datum: Datum,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("Too many variables, at most {} slots are available", MAX_SLOTS)]
    TooManySlots,
}

/// slots are addressed by u16 operands
pub const MAX_SLOTS: usize = u16::MAX as usize + 1;

/// Compile time view of all bindings. Slots come from one counter for the whole
/// table, leaving a scope never frees them.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    scopes: Scopes<String, SymbolEntry>,
    next_slot: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// inserts into the innermost scope, shadowing outer bindings of the same name.
    /// Returns the entry it replaced if the name was already bound in that scope.
    pub fn define(
        &mut self,
        name: &str,
        dtype: DataType,
        exposed: bool,
        internal: bool,
        datum: Datum,
    ) -> Option<SymbolEntry> {
        let entry = SymbolEntry {
            dtype,
            exposed,
            internal,
            datum,
        };
        let replaced = self.scopes.add_entry(name.to_owned(), entry);
        if replaced.is_some() {
            warn!("'{}' redeclared in the same scope", name);
        }
        replaced
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.scopes.find_entry(name)
    }

    pub fn lookup_current(&self, name: &str) -> Option<&SymbolEntry> {
        self.scopes.find_in_innermost(name)
    }

    pub fn enter_scope(&mut self) {
        self.scopes.open_new();
    }

    /// no-op on the global scope
    pub fn exit_scope(&mut self) {
        self.scopes.collapse_innermost();
    }

    pub fn depth(&self) -> usize {
        self.scopes.depth()
    }

    pub fn allocate_slot(&mut self) -> Result<u16, SymbolError> {
        if self.next_slot >= MAX_SLOTS {
            return Err(SymbolError::TooManySlots);
        }
        self.next_slot += 1;
        Ok((self.next_slot - 1) as u16)
    }

    /// number of slots handed out so far
    pub fn slot_count(&self) -> usize {
        self.next_slot
    }
}
