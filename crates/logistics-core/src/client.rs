//! Observer-side mirror of one segment's packets.
//!
//! The mirror never routes. It moves packets forward for display between
//! server updates and replaces them wholesale whenever an update arrives.

use crate::id::StackId;
use crate::persist::{read_update_tag, PersistError};
use crate::position::Pos;
use crate::stack::FULL_PROGRESS;
use crate::sync::{ClientStack, SyncMessage};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientTransit {
    segment: Pos,
    speed: u32,
    stacks: BTreeMap<StackId, ClientStack>,
}

impl ClientTransit {
    pub fn new(segment: Pos, speed: u32) -> Self {
        Self {
            segment,
            speed,
            stacks: BTreeMap::new(),
        }
    }

    pub fn segment(&self) -> Pos {
        self.segment
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn get(&self, id: StackId) -> Option<&ClientStack> {
        self.stacks.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StackId, &ClientStack)> {
        self.stacks.iter().map(|(&id, s)| (id, s))
    }

    /// Apply a server message. Messages for other segments are ignored;
    /// returns whether this one applied.
    pub fn apply(&mut self, message: &SyncMessage) -> bool {
        if message.segment() != self.segment {
            return false;
        }
        match message {
            SyncMessage::Spawned { id, stack, .. } => {
                self.stacks.insert(*id, stack.clone());
            }
            SyncMessage::Update(update) => {
                for (id, stack) in &update.changed {
                    self.stacks.insert(*id, stack.clone());
                }
                for id in &update.deleted {
                    self.stacks.remove(id);
                }
            }
        }
        true
    }

    /// Replace the mirror with the contents of an update tag.
    pub fn load_update_tag(&mut self, data: &[u8]) -> Result<(), PersistError> {
        let (segment, entries) = read_update_tag(data)?;
        self.segment = segment;
        self.stacks = entries.into_iter().collect();
        Ok(())
    }

    /// Advance every packet by the segment speed, stopping at the boundary.
    pub fn tick(&mut self) {
        for stack in self.stacks.values_mut() {
            stack.progress = stack.progress.saturating_add(self.speed).min(FULL_PROGRESS);
        }
    }
}
