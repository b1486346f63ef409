//! Generation-tagged slot arena backing token identity.
//!
//! A token's identity is its slot index plus the generation the slot had
//! when the token was allocated. Freeing a slot bumps the generation, so a
//! handle held across an invalidating edit stops matching instead of
//! dangling.

/// Stable identity of one token within its hierarchy.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TokenId {
    slot: u32,
    generation: u32,
}

pub(crate) struct TokenArena {
    generations: Vec<u32>,
    free: Vec<u32>,
}

impl TokenArena {
    pub(crate) fn new() -> Self {
        Self { generations: Vec::new(), free: Vec::new() }
    }

    pub(crate) fn alloc(&mut self) -> TokenId {
        match self.free.pop() {
            Some(slot) => TokenId { slot, generation: self.generations[slot as usize] },
            None => {
                let slot = self.generations.len() as u32;
                self.generations.push(0);
                TokenId { slot, generation: 0 }
            }
        }
    }

    pub(crate) fn free(&mut self, id: TokenId) {
        let generation = &mut self.generations[id.slot as usize];
        debug_assert_eq!(*generation, id.generation, "double free of token slot");
        *generation += 1;
        self.free.push(id.slot);
    }

    pub(crate) fn is_live(&self, id: TokenId) -> bool {
        self.generations.get(id.slot as usize) == Some(&id.generation)
    }

    /// Frees every slot at once; all outstanding ids stop matching.
    pub(crate) fn clear(&mut self) {
        self.free.clear();
        for (slot, generation) in self.generations.iter_mut().enumerate() {
            *generation += 1;
            self.free.push(slot as u32);
        }
    }
}
