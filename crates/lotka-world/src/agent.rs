//! Agent state.

use lotka_core::{AgentId, AgentKind, AgentView, Position};
use serde::{Deserialize, Serialize};

/// Species-specific state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentState {
    Prey {
        /// Latched once the prey reaches maturity; never reset
        growth: bool,
    },
    Predator {
        satiation: i32,
    },
}

/// An agent in the simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub position: Position,
    pub age: u32,
    pub reproduction_rate: u32,
    pub state: AgentState,
}

impl Agent {
    pub fn prey(id: AgentId, position: Position, reproduction_rate: u32) -> Self {
        Self {
            id,
            position,
            age: 0,
            reproduction_rate,
            state: AgentState::Prey { growth: false },
        }
    }

    pub fn predator(id: AgentId, position: Position, reproduction_rate: u32, satiation: i32) -> Self {
        Self {
            id,
            position,
            age: 0,
            reproduction_rate,
            state: AgentState::Predator { satiation },
        }
    }

    pub fn kind(&self) -> AgentKind {
        match self.state {
            AgentState::Prey { .. } => AgentKind::Prey,
            AgentState::Predator { .. } => AgentKind::Predator,
        }
    }

    pub fn is_prey(&self) -> bool {
        self.kind() == AgentKind::Prey
    }

    pub fn is_predator(&self) -> bool {
        self.kind() == AgentKind::Predator
    }

    /// Satiation of a predator, `None` for prey
    pub fn satiation(&self) -> Option<i32> {
        match self.state {
            AgentState::Predator { satiation } => Some(satiation),
            AgentState::Prey { .. } => None,
        }
    }

    /// Growth latch of a prey, `None` for predators
    pub fn growth(&self) -> Option<bool> {
        match self.state {
            AgentState::Prey { growth } => Some(growth),
            AgentState::Predator { .. } => None,
        }
    }

    pub fn tick(&mut self) {
        self.age += 1;
    }

    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.id,
            kind: self.kind(),
            position: self.position,
        }
    }
}
