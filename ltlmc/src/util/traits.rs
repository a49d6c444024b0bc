use std::collections::BTreeSet;

pub trait Add {
    type Item;
    fn add(self, item: Self::Item) -> Self;
}

pub trait AddMany {
    type Item;
    fn add_many(self, items: impl IntoIterator<Item = Self::Item>) -> Self;
}

impl<T> Add for Vec<T> {
    type Item = T;

    fn add(mut self, item: Self::Item) -> Self {
        self.push(item);
        self
    }
}

impl<T: Ord> AddMany for BTreeSet<T> {
    type Item = T;

    fn add_many(mut self, items: impl IntoIterator<Item = Self::Item>) -> Self {
        self.extend(items);
        self
    }
}
