//! Agent table kept in lockstep with the grid and the scheduler.

use crate::agent::Agent;
use crate::grid::Grid;
use crate::scheduler::Scheduler;
use lotka_core::{AgentId, AgentKind, Error, PopulationCounts, Position, Result};
use std::collections::BTreeMap;

/// Owns every live agent together with the grid they stand on.
///
/// Agents enter through [`Population::spawn`] and leave through
/// [`Population::destroy`]; both touch the agent table, the grid and the
/// scheduler together so the three never disagree about who is alive.
#[derive(Debug, Clone)]
pub struct Population {
    grid: Grid,
    agents: BTreeMap<AgentId, Agent>,
    next_id: AgentId,
}

impl Population {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            agents: BTreeMap::new(),
            next_id: AgentId(0),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Live agents in id order
    pub fn iter(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn counts(&self) -> PopulationCounts {
        let mut counts = PopulationCounts::default();
        for agent in self.agents.values() {
            match agent.kind() {
                AgentKind::Prey => counts.prey += 1,
                AgentKind::Predator => counts.predators += 1,
            }
        }
        counts
    }

    /// Handle the next spawned agent will receive
    pub fn next_id(&self) -> AgentId {
        self.next_id
    }

    /// Create an agent with a fresh handle, put it on the grid and register
    /// it with the scheduler.
    pub fn spawn<F>(&mut self, scheduler: &mut Scheduler, build: F) -> Result<AgentId>
    where
        F: FnOnce(AgentId) -> Agent,
    {
        let id = self.next_id;
        let mut agent = build(id);
        if agent.id != id {
            return Err(Error::InvalidState(format!(
                "spawned agent claims handle {} but {} was assigned",
                agent.id, id
            )));
        }

        self.grid.place(id, agent.position)?;
        agent.position = self.grid.location(id).unwrap_or(agent.position);
        self.agents.insert(id, agent);
        scheduler.register(id);
        self.next_id = id.next();
        Ok(id)
    }

    /// Remove an agent from the grid, the scheduler and the table.
    ///
    /// Destroying an agent that is already gone returns `None` and changes
    /// nothing.
    pub fn destroy(&mut self, scheduler: &mut Scheduler, id: AgentId) -> Option<Agent> {
        self.grid.remove(id);
        scheduler.unregister(id);
        self.agents.remove(&id)
    }

    /// Move an agent to `pos`, keeping its recorded position in sync
    pub fn relocate(&mut self, id: AgentId, pos: Position) -> Result<()> {
        let agent = self
            .agents
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("agent {}", id)))?;
        self.grid.move_agent(id, pos)?;
        if let Some(location) = self.grid.location(id) {
            agent.position = location;
        }
        Ok(())
    }

    /// Current cell of a live agent.
    ///
    /// An agent that is in the table but not on the grid is an invalid state.
    pub fn position_of(&self, id: AgentId) -> Result<Position> {
        let agent = self
            .agents
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("agent {}", id)))?;
        match self.grid.location(id) {
            Some(location) if location == agent.position => Ok(location),
            Some(location) => Err(Error::InvalidState(format!(
                "agent {} records {} but occupies {}",
                id, agent.position, location
            ))),
            None => Err(Error::InvalidState(format!(
                "agent {} is alive but not on the grid",
                id
            ))),
        }
    }
}
