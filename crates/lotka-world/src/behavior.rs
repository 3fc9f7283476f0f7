//! Per-tick behavior of prey and predators.

use crate::agent::{Agent, AgentState};
use crate::population::Population;
use crate::scheduler::Scheduler;
use lotka_core::{AgentId, AgentKind, Error, LifecycleConfig, Position, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

/// What happened while one agent acted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Kind of the agent that acted
    pub kind: AgentKind,
    /// Cell the agent moved into, if it moved
    pub moved_to: Option<Position>,
    /// Newborn created by this agent
    pub offspring: Option<AgentId>,
    /// Prey eaten by this agent
    pub eaten: Vec<AgentId>,
    /// The agent starved and has been removed
    pub starved: bool,
    /// Satiation at the end of the step, for predators
    pub satiation: Option<i32>,
}

impl StepOutcome {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            moved_to: None,
            offspring: None,
            eaten: Vec::new(),
            starved: false,
            satiation: None,
        }
    }
}

/// Everything an agent may read or change while it acts
pub struct StepContext<'a, R: Rng + ?Sized> {
    pub population: &'a mut Population,
    pub scheduler: &'a mut Scheduler,
    pub rng: &'a mut R,
    pub lifecycle: &'a LifecycleConfig,
}

/// Run one agent's behavior, dispatched on its kind
pub fn step<R: Rng + ?Sized>(ctx: &mut StepContext<'_, R>, id: AgentId) -> Result<StepOutcome> {
    let kind = ctx
        .population
        .get(id)
        .map(Agent::kind)
        .ok_or_else(|| Error::NotFound(format!("agent {}", id)))?;

    match kind {
        AgentKind::Prey => step_prey(ctx, id),
        AgentKind::Predator => step_predator(ctx, id),
    }
}

fn step_prey<R: Rng + ?Sized>(ctx: &mut StepContext<'_, R>, id: AgentId) -> Result<StepOutcome> {
    let mut outcome = StepOutcome::new(AgentKind::Prey);
    let pos = ctx.population.position_of(id)?;

    // Prey wander regardless of who is in the target cell
    let neighbors = ctx.population.grid().neighbors(pos);
    if let Some(&target) = neighbors.choose(&mut *ctx.rng) {
        ctx.population.relocate(id, target)?;
        outcome.moved_to = Some(target);
    }

    let maturity_age = ctx.lifecycle.prey_maturity_age;
    let agent = agent_mut(ctx.population, id)?;
    agent.tick();

    if agent.age >= maturity_age {
        if let AgentState::Prey { growth } = &mut agent.state {
            *growth = true;
        }
        outcome.offspring = reproduce(ctx, id)?;
    }

    Ok(outcome)
}

fn step_predator<R: Rng + ?Sized>(ctx: &mut StepContext<'_, R>, id: AgentId) -> Result<StepOutcome> {
    let mut outcome = StepOutcome::new(AgentKind::Predator);
    let pos = ctx.population.position_of(id)?;

    let neighbors = ctx.population.grid().neighbors(pos);
    let target = neighbors.choose(&mut *ctx.rng).copied();

    let decay = ctx.lifecycle.satiation_decay;
    adjust_satiation(ctx.population, id, -decay)?;

    if let Some(target) = target {
        if ctx.population.grid().is_empty(target) {
            ctx.population.relocate(id, target)?;
            outcome.moved_to = Some(target);
        } else {
            // Eat every prey in the target cell and stay put
            let occupants = ctx.population.grid().occupants(target).to_vec();
            for occupant in occupants {
                let is_prey = ctx.population.get(occupant).is_some_and(Agent::is_prey);
                if !is_prey {
                    continue;
                }

                adjust_satiation(ctx.population, id, ctx.lifecycle.satiation_per_prey)?;
                ctx.population.destroy(ctx.scheduler, occupant);
                outcome.eaten.push(occupant);

                debug!(
                    event = "prey_eaten",
                    predator_id = %id,
                    prey_id = %occupant,
                    position_x = target.x,
                    position_y = target.y,
                    "Predator ate prey"
                );
            }
        }
    }

    let satiation = agent_mut(ctx.population, id)?.satiation().unwrap_or_default();
    outcome.satiation = Some(satiation);
    if satiation <= 0 {
        if let Some(dead) = ctx.population.destroy(ctx.scheduler, id) {
            debug!(
                event = "predator_starved",
                predator_id = %id,
                age = dead.age,
                satiation = satiation,
                position_x = dead.position.x,
                position_y = dead.position.y,
                "Predator starved"
            );
        }
        outcome.starved = true;
        return Ok(outcome);
    }

    let maturity_age = ctx.lifecycle.predator_maturity_age;
    let agent = agent_mut(ctx.population, id)?;
    agent.tick();

    if agent.age >= maturity_age {
        outcome.offspring = reproduce(ctx, id)?;
    }

    Ok(outcome)
}

/// Spawn a newborn of the parent's kind into a random empty neighbor cell.
///
/// Prey must have their growth latch set; predators must have reached their
/// reproduction rate in age. Without an empty neighbor nothing happens.
fn reproduce<R: Rng + ?Sized>(ctx: &mut StepContext<'_, R>, parent_id: AgentId) -> Result<Option<AgentId>> {
    let parent = ctx
        .population
        .get(parent_id)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("agent {}", parent_id)))?;

    let fertile = match parent.state {
        AgentState::Prey { growth } => growth,
        AgentState::Predator { .. } => parent.age >= parent.reproduction_rate,
    };
    if !fertile {
        return Ok(None);
    }

    let empty = ctx.population.grid().empty_neighbors(parent.position);
    let Some(&birthplace) = empty.choose(&mut *ctx.rng) else {
        trace!(
            event = "reproduction_failed",
            agent_id = %parent_id,
            kind = %parent.kind(),
            failure_reason = "no_empty_adjacent_cell",
            position_x = parent.position.x,
            position_y = parent.position.y,
            "Reproduction failed: no empty adjacent cell found"
        );
        return Ok(None);
    };

    let initial_satiation = ctx.lifecycle.predator_initial_satiation;
    let child_id = ctx.population.spawn(ctx.scheduler, |id| match parent.state {
        AgentState::Prey { .. } => Agent::prey(id, birthplace, parent.reproduction_rate),
        AgentState::Predator { .. } => {
            Agent::predator(id, birthplace, parent.reproduction_rate, initial_satiation)
        }
    })?;

    debug!(
        event = "reproduction_success",
        parent_id = %parent_id,
        offspring_id = %child_id,
        kind = %parent.kind(),
        parent_age = parent.age,
        offspring_position_x = birthplace.x,
        offspring_position_y = birthplace.y,
        "Agent reproduced"
    );

    Ok(Some(child_id))
}

fn agent_mut(population: &mut Population, id: AgentId) -> Result<&mut Agent> {
    population
        .get_mut(id)
        .ok_or_else(|| Error::NotFound(format!("agent {}", id)))
}

fn adjust_satiation(population: &mut Population, id: AgentId, delta: i32) -> Result<()> {
    match &mut agent_mut(population, id)?.state {
        AgentState::Predator { satiation } => {
            *satiation += delta;
            Ok(())
        }
        AgentState::Prey { .. } => Err(Error::InvalidState(format!(
            "agent {} is prey and has no satiation",
            id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Fixture {
        population: Population,
        scheduler: Scheduler,
        rng: ChaCha8Rng,
        lifecycle: LifecycleConfig,
    }

    impl Fixture {
        fn new(width: i32, height: i32) -> Self {
            Self {
                population: Population::new(Grid::new(width, height).unwrap()),
                scheduler: Scheduler::new(),
                rng: ChaCha8Rng::seed_from_u64(42),
                lifecycle: LifecycleConfig::default(),
            }
        }

        fn add(&mut self, agent: impl FnOnce(AgentId) -> Agent) -> AgentId {
            self.population.spawn(&mut self.scheduler, agent).unwrap()
        }

        fn step(&mut self, id: AgentId) -> Result<StepOutcome> {
            let mut ctx = StepContext {
                population: &mut self.population,
                scheduler: &mut self.scheduler,
                rng: &mut self.rng,
                lifecycle: &self.lifecycle,
            };
            step(&mut ctx, id)
        }

        fn agent(&self, id: AgentId) -> &Agent {
            self.population.get(id).unwrap()
        }
    }

    #[test]
    fn test_young_prey_moves_and_ages() {
        let mut fx = Fixture::new(5, 5);
        let start = Position::new(2, 2);
        let prey = fx.add(|id| Agent::prey(id, start, 10));

        let outcome = fx.step(prey).unwrap();

        let moved_to = outcome.moved_to.unwrap();
        assert!(fx.population.grid().neighbors(start).contains(&moved_to));
        assert_eq!(fx.agent(prey).position, moved_to);
        assert_eq!(fx.agent(prey).age, 1);
        assert_eq!(fx.agent(prey).growth(), Some(false));
        assert_eq!(outcome.offspring, None);
    }

    #[test]
    fn test_prey_growth_latch_sets_at_maturity() {
        let mut fx = Fixture::new(5, 5);
        let prey = fx.add(|id| Agent { age: 10, ..Agent::prey(id, Position::new(0, 0), 10) });

        let outcome = fx.step(prey).unwrap();
        assert_eq!(fx.agent(prey).age, 11);
        assert_eq!(fx.agent(prey).growth(), Some(false));
        assert!(outcome.offspring.is_none());

        let outcome = fx.step(prey).unwrap();
        assert_eq!(fx.agent(prey).age, 12);
        assert_eq!(fx.agent(prey).growth(), Some(true));
        assert!(outcome.offspring.is_some());
    }

    #[test]
    fn test_mature_prey_reproduces_every_tick() {
        let mut fx = Fixture::new(10, 10);
        let prey = fx.add(|id| Agent::prey(id, Position::new(5, 5), 10));
        fx.population.get_mut(prey).unwrap().age = 12;

        for _ in 0..3 {
            let outcome = fx.step(prey).unwrap();
            assert!(outcome.offspring.is_some());
        }
        assert_eq!(fx.population.counts().prey, 4);
    }

    #[test]
    fn test_prey_offspring_inherits_rate() {
        let mut fx = Fixture::new(5, 5);
        let prey = fx.add(|id| Agent { age: 12, ..Agent::prey(id, Position::new(2, 2), 33) });

        let outcome = fx.step(prey).unwrap();
        let child = fx.agent(outcome.offspring.unwrap());
        let parent = fx.agent(prey);

        assert_eq!(child.age, 0);
        assert_eq!(child.reproduction_rate, 33);
        assert_eq!(child.growth(), Some(false));
        assert!(fx.population.grid().neighbors(parent.position).contains(&child.position));
        assert!(fx.scheduler.contains(child.id));
    }

    #[test]
    fn test_predator_moves_into_empty_cell() {
        let mut fx = Fixture::new(5, 5);
        let predator = fx.add(|id| Agent::predator(id, Position::new(2, 2), 5, 5));

        let outcome = fx.step(predator).unwrap();

        assert!(outcome.moved_to.is_some());
        assert!(outcome.eaten.is_empty());
        assert_eq!(fx.agent(predator).satiation(), Some(4));
        assert_eq!(fx.agent(predator).age, 1);
    }

    #[test]
    fn test_predator_does_not_eat_predators() {
        // On a 2x1 grid the only neighbor of (0, 0) is (1, 0)
        let mut fx = Fixture::new(2, 1);
        let hunter = fx.add(|id| Agent::predator(id, Position::new(0, 0), 5, 5));
        let other = fx.add(|id| Agent::predator(id, Position::new(1, 0), 5, 5));

        let outcome = fx.step(hunter).unwrap();

        assert_eq!(outcome.moved_to, None);
        assert!(outcome.eaten.is_empty());
        assert_eq!(fx.agent(hunter).position, Position::new(0, 0));
        assert_eq!(fx.agent(hunter).satiation(), Some(4));
        assert_eq!(fx.agent(other).satiation(), Some(5));
    }

    #[test]
    fn test_predator_eats_all_prey_in_target_cell() {
        let mut fx = Fixture::new(2, 1);
        let hunter = fx.add(|id| Agent::predator(id, Position::new(0, 0), 5, 3));
        let first = fx.add(|id| Agent::prey(id, Position::new(1, 0), 10));
        let rival = fx.add(|id| Agent::predator(id, Position::new(1, 0), 5, 5));
        let second = fx.add(|id| Agent::prey(id, Position::new(1, 0), 10));

        let outcome = fx.step(hunter).unwrap();

        assert_eq!(outcome.eaten, vec![first, second]);
        assert_eq!(fx.agent(hunter).satiation(), Some(3 - 1 + 20));
        assert_eq!(fx.agent(hunter).position, Position::new(0, 0));
        assert_eq!(fx.population.grid().occupants(Position::new(1, 0)), &[rival]);
        assert!(!fx.scheduler.contains(first));
        assert!(!fx.scheduler.contains(second));
    }

    #[test]
    fn test_starving_predator_is_removed_everywhere() {
        let mut fx = Fixture::new(5, 5);
        let predator = fx.add(|id| Agent::predator(id, Position::new(2, 2), 5, 1));

        let outcome = fx.step(predator).unwrap();

        assert!(outcome.starved);
        assert!(fx.population.get(predator).is_none());
        assert!(!fx.population.grid().contains(predator));
        assert!(!fx.scheduler.contains(predator));

        // A second activation of the dead handle is reported, not executed
        assert!(matches!(fx.step(predator), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_predator_reproduction_gates() {
        // Old enough for both gates
        let mut fx = Fixture::new(5, 5);
        let predator = fx.add(|id| Agent { age: 14, ..Agent::predator(id, Position::new(2, 2), 5, 50) });
        let outcome = fx.step(predator).unwrap();
        let child = fx.agent(outcome.offspring.unwrap());
        assert_eq!(child.satiation(), Some(0));
        assert_eq!(child.reproduction_rate, 5);
        assert_eq!(child.age, 0);

        // Below the maturity age
        let mut fx = Fixture::new(5, 5);
        let predator = fx.add(|id| Agent { age: 12, ..Agent::predator(id, Position::new(2, 2), 5, 50) });
        assert!(fx.step(predator).unwrap().offspring.is_none());

        // Mature but younger than its reproduction rate
        let mut fx = Fixture::new(5, 5);
        let predator = fx.add(|id| Agent { age: 14, ..Agent::predator(id, Position::new(2, 2), 20, 50) });
        assert!(fx.step(predator).unwrap().offspring.is_none());
        assert_eq!(fx.agent(predator).age, 15);
    }

    #[test]
    fn test_lone_agent_on_single_cell_grid() {
        let mut fx = Fixture::new(1, 1);
        let prey = fx.add(|id| Agent { age: 30, ..Agent::prey(id, Position::new(0, 0), 10) });

        let outcome = fx.step(prey).unwrap();

        assert_eq!(outcome.moved_to, None);
        assert_eq!(outcome.offspring, None);
        assert_eq!(fx.agent(prey).age, 31);
        assert_eq!(fx.agent(prey).growth(), Some(true));
    }
}
