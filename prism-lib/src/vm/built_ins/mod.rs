//! The natives every compilation unit gets by default

use crate::vm::NativeFn;

pub mod io;
pub mod standard;

/// name and host function of every default native, in registration order
pub fn all() -> impl Iterator<Item = (&'static str, NativeFn)> {
    standard::FUNCTIONS
        .iter()
        .chain(io::FUNCTIONS.iter())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: Vec<_> = all().map(|(name, _)| name).collect();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), unique.len());
        assert_eq!(names.len(), 13);
        assert_eq!(names[0], "print");
    }
}
