//! Simulation engine: initialization and the tick loop.

use crate::agent::Agent;
use crate::behavior::{self, StepContext, StepOutcome};
use crate::grid::Grid;
use crate::population::Population;
use crate::scheduler::Scheduler;
use lotka_core::{
    AgentId, AgentKind, AgentView, Error, PopulationCounts, Position, Result, SimulationConfig,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{event, info, instrument, warn, Level};

pub struct Simulation {
    population: Population,
    scheduler: Scheduler,
    config: SimulationConfig,
    rng: ChaCha8Rng,
    tick: u64,
}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    /// Agents that acted this tick
    pub activated: usize,
    pub prey_born: usize,
    pub predators_born: usize,
    pub prey_eaten: usize,
    pub predators_starved: usize,
    /// Population at the end of the tick
    pub counts: PopulationCounts,
}

impl TickReport {
    fn record(&mut self, outcome: &StepOutcome) {
        // Offspring always share the parent's kind
        if outcome.offspring.is_some() {
            match outcome.kind {
                AgentKind::Prey => self.prey_born += 1,
                AgentKind::Predator => self.predators_born += 1,
            }
        }
        self.prey_eaten += outcome.eaten.len();
        if outcome.starved {
            self.predators_starved += 1;
        }
    }
}

impl Simulation {
    /// Build a simulation and scatter the initial populations at random
    /// cells. Prey are placed first, then predators; cells may be shared.
    #[instrument(skip(config), fields(seed = config.seed, width = config.grid_width, height = config.grid_height))]
    pub fn initialize(config: SimulationConfig) -> Result<Self> {
        let mut sim = Self::empty(config)?;

        for _ in 0..sim.config.initial_prey_count {
            let pos = sim.population.grid().random_position(&mut sim.rng);
            sim.spawn_prey(pos)?;
        }

        for _ in 0..sim.config.initial_predator_count {
            let pos = sim.population.grid().random_position(&mut sim.rng);
            sim.spawn_predator(pos)?;
        }

        let counts = sim.counts();
        info!(
            event = "simulation_initialized",
            prey = counts.prey,
            predators = counts.predators,
            "Simulation initialized"
        );

        Ok(sim)
    }

    /// A validated simulation with an empty grid and a seeded generator
    pub fn empty(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let grid = Grid::new(config.grid_width, config.grid_height)?;

        Ok(Self {
            population: Population::new(grid),
            scheduler: Scheduler::new(),
            config,
            rng,
            tick: 0,
        })
    }

    /// Add a newborn prey at `pos`
    pub fn spawn_prey(&mut self, pos: Position) -> Result<AgentId> {
        let rate = self.config.prey_reproduction_rate;
        self.population
            .spawn(&mut self.scheduler, |id| Agent::prey(id, pos, rate))
    }

    /// Add a newborn predator at `pos`
    pub fn spawn_predator(&mut self, pos: Position) -> Result<AgentId> {
        let rate = self.config.predator_reproduction_rate;
        let satiation = self.config.lifecycle.predator_initial_satiation;
        self.population
            .spawn(&mut self.scheduler, |id| Agent::predator(id, pos, rate, satiation))
    }

    /// Advance the world by one tick.
    ///
    /// Every agent alive at the start of the tick acts once, in random order.
    /// Agents born during the tick first act on the next one; agents eaten or
    /// starved before their turn do not act.
    pub fn advance_one_tick(&mut self) -> TickReport {
        self.tick += 1;
        let before = self.population.counts();
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        let population = &mut self.population;
        let lifecycle = &self.config.lifecycle;
        let tick = self.tick;

        let activated = self.scheduler.run_tick(&mut self.rng, |id, scheduler, rng| {
            let mut ctx = StepContext {
                population: &mut *population,
                scheduler,
                rng,
                lifecycle,
            };
            match behavior::step(&mut ctx, id) {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    warn!(agent_id = %id, tick = tick, "Skipping agent in invalid state: {}", e);
                }
            }
        });

        report.activated = activated;
        report.counts = self.population.counts();
        self.log_tick(&before, &report);
        report
    }

    /// Run `ticks` ticks and collect their reports
    #[instrument(skip(self), fields(start_tick = self.tick))]
    pub fn run(&mut self, ticks: u64) -> Vec<TickReport> {
        info!("Running simulation for {} ticks", ticks);
        (0..ticks).map(|_| self.advance_one_tick()).collect()
    }

    /// Step a single live agent outside of a full tick, using the
    /// simulation's own generator.
    pub fn step_agent(&mut self, id: AgentId) -> Result<StepOutcome> {
        if !self.scheduler.contains(id) {
            return Err(Error::NotFound(format!("agent {} is not scheduled", id)));
        }

        let mut ctx = StepContext {
            population: &mut self.population,
            scheduler: &mut self.scheduler,
            rng: &mut self.rng,
            lifecycle: &self.config.lifecycle,
        };
        behavior::step(&mut ctx, id)
    }

    /// Step a single live agent drawing every random choice from `rng`
    pub fn step_agent_with<R: Rng + ?Sized>(&mut self, id: AgentId, rng: &mut R) -> Result<StepOutcome> {
        if !self.scheduler.contains(id) {
            return Err(Error::NotFound(format!("agent {} is not scheduled", id)));
        }

        let mut ctx = StepContext {
            population: &mut self.population,
            scheduler: &mut self.scheduler,
            rng,
            lifecycle: &self.config.lifecycle,
        };
        behavior::step(&mut ctx, id)
    }

    /// Number of completed ticks
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        self.population.grid()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.population.get(id)
    }

    /// Mutable access for setting up scenarios. Position changes must go
    /// through the grid, so only state, age and rate should be edited.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.population.get_mut(id)
    }

    /// Live agents in id order
    pub fn agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.population.iter()
    }

    pub fn counts(&self) -> PopulationCounts {
        self.population.counts()
    }

    /// Every live agent as `(id, kind, position)`, sorted by id
    pub fn snapshot(&self) -> Vec<AgentView> {
        self.population.iter().map(Agent::view).collect()
    }

    /// True once either species has died out
    pub fn is_extinct(&self) -> bool {
        let counts = self.counts();
        counts.prey == 0 || counts.predators == 0
    }

    fn log_tick(&self, before: &PopulationCounts, report: &TickReport) {
        for kind in [AgentKind::Prey, AgentKind::Predator] {
            if before.count(kind) > 0 && report.counts.count(kind) == 0 {
                info!(
                    event = "species_extinct",
                    species = %kind,
                    tick = report.tick,
                    "Species died out"
                );
            }
        }

        let interval = self.config.log_interval;
        if interval == 0 || report.tick % interval != 0 {
            return;
        }

        info!(
            event = "population_metrics",
            tick = report.tick,
            prey = report.counts.prey,
            predators = report.counts.predators,
            prey_born = report.prey_born,
            predators_born = report.predators_born,
            prey_eaten = report.prey_eaten,
            predators_starved = report.predators_starved,
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_prey",
            gauge_value = report.counts.prey,
            tick = report.tick,
            "Prey population gauge"
        );

        event!(
            Level::INFO,
            gauge_name = "population_predators",
            gauge_value = report.counts.predators,
            tick = report.tick,
            "Predator population gauge"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            grid_width: 20,
            grid_height: 15,
            initial_prey_count: 40,
            initial_predator_count: 10,
            seed: 42,
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::initialize(small_config()).unwrap();

        assert_eq!(sim.counts(), PopulationCounts { prey: 40, predators: 10 });
        assert_eq!(sim.scheduler().len(), 50);
        assert_eq!(sim.grid().len(), 50);
        assert_eq!(sim.tick(), 0);

        let ids: Vec<_> = sim.snapshot().iter().map(|view| view.id).collect();
        assert_eq!(ids, (0..50).map(AgentId).collect::<Vec<_>>());
    }

    #[test]
    fn test_initial_agents_are_fresh() {
        let sim = Simulation::initialize(small_config()).unwrap();

        for agent in sim.agents() {
            assert_eq!(agent.age, 0);
            match agent.kind() {
                AgentKind::Prey => {
                    assert_eq!(agent.growth(), Some(false));
                    assert_eq!(agent.reproduction_rate, 10);
                }
                AgentKind::Predator => {
                    assert_eq!(agent.satiation(), Some(0));
                    assert_eq!(agent.reproduction_rate, 5);
                }
            }
        }
    }

    #[test]
    fn test_invalid_config_fails() {
        let config = SimulationConfig {
            grid_width: 0,
            ..small_config()
        };
        assert!(matches!(
            Simulation::initialize(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_tick_counter_and_run() {
        let mut sim = Simulation::initialize(small_config()).unwrap();
        let reports = sim.run(5);

        assert_eq!(reports.len(), 5);
        assert_eq!(sim.tick(), 5);
        assert_eq!(
            reports.iter().map(|r| r.tick).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_first_tick_activates_initial_population() {
        let mut sim = Simulation::initialize(small_config()).unwrap();
        let report = sim.advance_one_tick();

        // Nobody is born in the first tick, and eaten prey lose their turn
        assert_eq!(report.prey_born + report.predators_born, 0);
        assert!(report.activated <= 50);
        assert!(report.activated >= 50 - report.prey_eaten);
    }

    #[test]
    fn test_step_agent_requires_scheduled_agent() {
        let mut sim = Simulation::empty(small_config()).unwrap();
        assert!(matches!(sim.step_agent(AgentId(3)), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_is_extinct() {
        let mut sim = Simulation::empty(small_config()).unwrap();
        assert!(sim.is_extinct());

        sim.spawn_prey(Position::new(0, 0)).unwrap();
        assert!(sim.is_extinct());

        sim.spawn_predator(Position::new(5, 5)).unwrap();
        assert!(!sim.is_extinct());
    }

    #[test]
    fn test_report_serialization() {
        let mut sim = Simulation::initialize(small_config()).unwrap();
        let report = sim.advance_one_tick();
        let json = serde_json::to_string(&report).unwrap();
        let decoded: TickReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, decoded);
    }
}
