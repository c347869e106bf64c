use lasso::{Spur, ThreadedRodeo};

/// Interned name of a global constant (definition, axiom, projection,
/// instance). Comparing two `ConstId`s is comparing the constants.
pub type ConstId = Spur;

/// Interner for constant names.
///
/// Guarantees:
/// - Same name always produces the same ConstId
/// - A ConstId resolves back to the name it was interned from
pub struct SymbolStore {
    rodeo: ThreadedRodeo,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Intern a constant name.
    pub fn intern(&self, name: &str) -> ConstId {
        self.rodeo.get_or_intern(name)
    }

    /// Name of a constant, if it was interned here.
    pub fn resolve(&self, id: ConstId) -> Option<&str> {
        self.rodeo.try_resolve(&id)
    }

    /// Look up a name without interning it.
    pub fn get(&self, name: &str) -> Option<ConstId> {
        self.rodeo.get(name)
    }

    /// Display name for a constant; foreign ids render as `c#<n>`.
    pub fn display(&self, id: ConstId) -> String {
        match self.resolve(id) {
            Some(name) => name.to_string(),
            None => format!("c#{}", lasso::Key::into_usize(id)),
        }
    }
}

impl Default for SymbolStore {
    fn default() -> Self {
        Self::new()
    }
}
