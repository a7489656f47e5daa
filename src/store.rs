use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::{Actor, Entity};

#[derive(Debug, Clone)]
pub struct EntityStore<E: Entity> {
    items: Vec<E>,
    selection: BTreeSet<i64>,
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selection: BTreeSet::new(),
        }
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.items.iter()
    }

    pub fn get(&self, id: i64) -> Option<&E> {
        self.items.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    pub fn selection(&self) -> &BTreeSet<i64> {
        &self.selection
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.selection.contains(&id)
    }

    pub fn replace_all(&mut self, entities: Vec<E>) {
        self.items = entities;
        self.prune_selection();
    }

    pub fn append(&mut self, entity: E) {
        self.items.push(entity);
    }

    pub fn replace(&mut self, id: i64, entity: E) -> bool {
        match self.items.iter_mut().find(|e| e.id() == id) {
            Some(slot) => {
                *slot = entity;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: i64) -> Option<E> {
        let pos = self.items.iter().position(|e| e.id() == id)?;
        self.selection.remove(&id);
        Some(self.items.remove(pos))
    }

    pub fn remove_many(&mut self, ids: &[i64]) -> usize {
        let before = self.items.len();
        self.items.retain(|e| !ids.contains(&e.id()));
        for id in ids {
            self.selection.remove(id);
        }
        before - self.items.len()
    }

    // Unknown ids are ignored.
    pub fn toggle_selection(&mut self, id: i64) -> bool {
        if !self.contains(id) {
            return false;
        }
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn filter(&self, term: &str) -> Vec<&E> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|e| e.search_text().to_lowercase().contains(&needle))
            .collect()
    }

    fn prune_selection(&mut self) {
        let items = &self.items;
        self.selection
            .retain(|id| items.iter().any(|e| e.id() == *id));
    }
}

pub fn actors_by_surname<'a>(actors: impl IntoIterator<Item = &'a Actor>) -> Vec<&'a Actor> {
    let mut sorted: Vec<&Actor> = actors.into_iter().collect();
    sorted.sort_by(|a, b| collate(&a.surname, &b.surname));
    sorted
}

/// Dictionary-style comparison: case-folded first, exact text breaks ties.
pub fn collate(a: &str, b: &str) -> Ordering {
    let folded = a.to_lowercase().cmp(&b.to_lowercase());
    if folded != Ordering::Equal {
        return folded;
    }
    // Lowercase before uppercase, as dictionary collations do.
    b.cmp(a)
}
