//! 2D toroidal multi-occupancy grid.

use lotka_core::{AgentId, Direction, Error, Position, Result};
use rand::Rng;
use std::collections::HashMap;

/// A 2D toroidal grid where each cell holds any number of agents
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Vec<AgentId>>,
    locations: HashMap<AgentId, Position>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                width, height
            )));
        }

        let size = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            cells: vec![Vec::new(); size],
            locations: HashMap::new(),
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Moore neighborhood of `pos`, wrapping at the edges.
    ///
    /// Always excludes `pos` itself. On grids narrower or shorter than three
    /// cells the wrapped coordinates collide; duplicates are dropped keeping
    /// the first occurrence, so a 1x1 grid has no neighbors at all.
    pub fn neighbors(&self, pos: Position) -> Vec<Position> {
        let center = pos.wrap(self.width, self.height);
        let mut neighbors = Vec::with_capacity(8);

        for direction in Direction::all() {
            let neighbor = center.step(direction, self.width, self.height);
            if neighbor != center && !neighbors.contains(&neighbor) {
                neighbors.push(neighbor);
            }
        }

        neighbors
    }

    /// Neighbors of `pos` with no occupants
    pub fn empty_neighbors(&self, pos: Position) -> Vec<Position> {
        self.neighbors(pos)
            .into_iter()
            .filter(|neighbor| self.is_empty(*neighbor))
            .collect()
    }

    pub fn is_empty(&self, pos: Position) -> bool {
        self.occupants(pos).is_empty()
    }

    /// Agents at `pos`, in the order they arrived
    pub fn occupants(&self, pos: Position) -> &[AgentId] {
        let index = self.pos_to_index(pos);
        &self.cells[index]
    }

    /// Put an agent that is not on the grid yet into a cell
    pub fn place(&mut self, id: AgentId, pos: Position) -> Result<()> {
        if let Some(current) = self.locations.get(&id) {
            return Err(Error::AlreadyExists(format!(
                "agent {} is already placed at {}",
                id, current
            )));
        }

        let wrapped = pos.wrap(self.width, self.height);
        let index = self.pos_to_index(wrapped);
        self.cells[index].push(id);
        self.locations.insert(id, wrapped);
        Ok(())
    }

    /// Take an agent off the grid, returning the cell it occupied.
    ///
    /// Removing an agent that is not on the grid is a no-op.
    pub fn remove(&mut self, id: AgentId) -> Option<Position> {
        let pos = self.locations.remove(&id)?;
        let index = self.pos_to_index(pos);
        self.cells[index].retain(|occupant| *occupant != id);
        Some(pos)
    }

    /// Relocate an agent: remove it from its cell, then place it at `new_pos`
    pub fn move_agent(&mut self, id: AgentId, new_pos: Position) -> Result<()> {
        self.remove(id);
        self.place(id, new_pos)
    }

    /// Cell currently holding `id`, if it is on the grid
    pub fn location(&self, id: AgentId) -> Option<Position> {
        self.locations.get(&id).copied()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.locations.contains_key(&id)
    }

    /// Number of agents on the grid
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_grid_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Uniformly random cell; x is drawn before y
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let x = rng.gen_range(0..self.width);
        let y = rng.gen_range(0..self.height);
        Position::new(x, y)
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        let wrapped = pos.wrap(self.width, self.height);
        (wrapped.y * self.width + wrapped.x) as usize
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// Iterator over all positions
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_pos(i))
    }

    /// Iterator over occupied cells with their occupants
    pub fn iter(&self) -> impl Iterator<Item = (Position, &[AgentId])> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_empty())
            .map(move |(i, cell)| (self.index_to_pos(i), cell.as_slice()))
    }
}
