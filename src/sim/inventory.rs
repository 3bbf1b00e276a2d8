/// Tank inventory: one counter per item category.

use crate::domain::kind::Item;

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Inventory {
    counts: [i32; Item::COUNT],
}

impl Inventory {
    pub fn new() -> Self {
        Inventory::default()
    }

    pub fn count(&self, item: Item) -> i32 {
        self.counts[item.index()]
    }

    pub fn add_one(&mut self, item: Item) {
        self.counts[item.index()] += 1;
    }

    pub fn add_ten(&mut self, item: Item) {
        self.counts[item.index()] += 10;
    }

    /// Use one unit. Returns false, changing nothing, when none are left.
    pub fn consume(&mut self, item: Item) -> bool {
        let slot = &mut self.counts[item.index()];
        if *slot <= 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    pub fn has(&self, item: Item) -> bool {
        self.count(item) > 0
    }

    pub fn reset(&mut self) {
        self.counts = [0; Item::COUNT];
    }
}
