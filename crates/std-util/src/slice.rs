use std::{collections::HashSet, hash::Hash};

pub trait SliceUtil<T> {
    /// Whether no two elements are equal.
    fn is_unique(&self) -> bool
    where
        T: Eq + Hash;
}

impl<T> SliceUtil<T> for [T] {
    fn is_unique(&self) -> bool
    where
        T: Eq + Hash,
    {
        let mut seen = HashSet::with_capacity(self.len());
        self.iter().all(|item| seen.insert(item))
    }
}

#[macro_export]
macro_rules! assert_empty {
    ($e:expr) => {{
        let items = &$e;
        if !items.is_empty() {
            panic!("expected empty; actual={:?}", items);
        }
    }};
}

#[macro_export]
macro_rules! assert_unique {
    ($e:expr) => {{
        use $crate::slice::SliceUtil;
        let items = &$e[..];
        if !items.is_unique() {
            panic!("expected unique elements; actual={:?}", items);
        }
    }};
}
