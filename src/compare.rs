//! 比較選択（最大2件、古い方から押し出し）

use crate::upload::ItemId;
use std::collections::VecDeque;

pub const MAX_COMPARE: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareSelection {
    ids: VecDeque<ItemId>,
}

impl CompareSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 選択済みなら外す。未選択なら追加し、上限を超えたら最も古いものを外す
    pub fn toggle(&mut self, id: ItemId) {
        if self.remove(id) {
            return;
        }
        if self.ids.len() >= MAX_COMPARE {
            self.ids.pop_front();
        }
        self.ids.push_back(id);
    }

    pub fn remove(&mut self, id: ItemId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|selected| *selected != id);
        self.ids.len() != before
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.ids.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
