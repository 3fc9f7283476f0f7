//! Random-activation scheduler.

use lotka_core::AgentId;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

/// The set of live agents and the order they act in each tick.
///
/// Membership is kept ordered so that shuffling a snapshot with a seeded
/// generator always yields the same activation order.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    live: BTreeSet<AgentId>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the agent was already registered
    pub fn register(&mut self, id: AgentId) -> bool {
        self.live.insert(id)
    }

    /// Returns false if the agent was not registered
    pub fn unregister(&mut self, id: AgentId) -> bool {
        self.live.remove(&id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.live.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.live.iter().copied()
    }

    /// Snapshot of the live set in a uniformly random order
    pub fn activation_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<AgentId> {
        let mut order: Vec<AgentId> = self.live.iter().copied().collect();
        order.shuffle(rng);
        order
    }

    /// Activate every agent that is live at the start of the tick, once, in
    /// random order.
    ///
    /// `invoke` gets the scheduler and the generator back so it can register
    /// newborns and unregister the dead. Newborns wait for the next tick; an
    /// agent unregistered before its turn is skipped. Returns how many agents
    /// were activated.
    pub fn run_tick<R, F>(&mut self, rng: &mut R, mut invoke: F) -> usize
    where
        R: Rng + ?Sized,
        F: FnMut(AgentId, &mut Scheduler, &mut R),
    {
        let order = self.activation_order(&mut *rng);
        let mut activated = 0;

        for id in order {
            if !self.live.contains(&id) {
                continue;
            }
            invoke(id, &mut *self, &mut *rng);
            activated += 1;
        }

        activated
    }
}
