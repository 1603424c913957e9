//! Spatial model - tile grid shared by every settlement

use serde::{Deserialize, Serialize};

use crate::world::SettlementId;

/// Handle into the tile arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileId(u32);

impl TileId {
    pub fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tile position in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

impl TilePos {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: TilePos) -> u64 {
        let dx = self.x.abs_diff(other.x) as u64;
        let dy = self.y.abs_diff(other.y) as u64;
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Water,
    Wood,
    Stone,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Food,
        ResourceKind::Water,
        ResourceKind::Wood,
        ResourceKind::Stone,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub pos: TilePos,
    pub resource: ResourceKind,
    pub quantity: f64,
    pub owner: Option<SettlementId>,
    pub radioactive: bool,
}

impl Tile {
    pub fn new(pos: TilePos, resource: ResourceKind, quantity: f64) -> Self {
        Self {
            pos,
            resource,
            quantity: quantity.max(0.0),
            owner: None,
            radioactive: false,
        }
    }

    pub fn is_claimable(&self) -> bool {
        self.owner.is_none() && !self.radioactive
    }
}

/// Tile grid holding every cell of the world.
///
/// Four-neighbour lists are computed once at construction; the topology never
/// changes, only ownership does.
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    neighbors: Vec<Vec<TileId>>,
}

impl TileGrid {
    /// Builds a grid, asking `fill` for the resource of every cell in row-major order.
    pub fn new(
        width: u32,
        height: u32,
        mut fill: impl FnMut(TilePos) -> (ResourceKind, f64),
    ) -> Self {
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let pos = TilePos::new(x, y);
                let (resource, quantity) = fill(pos);
                tiles.push(Tile::new(pos, resource, quantity));
            }
        }
        let mut grid = Self {
            width,
            height,
            tiles,
            neighbors: Vec::new(),
        };
        grid.neighbors = (0..grid.tile_count())
            .map(|index| grid.compute_neighbors(TileId(index)))
            .collect();
        grid
    }

    /// A grid where every tile carries the same resource and quantity.
    pub fn uniform(width: u32, height: u32, resource: ResourceKind, quantity: f64) -> Self {
        Self::new(width, height, |_| (resource, quantity))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_count(&self) -> u32 {
        self.width * self.height
    }

    /// Convert tile position to tile ID
    pub fn id_at(&self, pos: TilePos) -> Option<TileId> {
        if pos.x < self.width && pos.y < self.height {
            Some(TileId(pos.y * self.width + pos.x))
        } else {
            None
        }
    }

    pub fn pos(&self, id: TileId) -> TilePos {
        self.tiles[id.index()].pos
    }

    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.index()]
    }

    pub fn tile_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id.index()]
    }

    pub fn owner(&self, id: TileId) -> Option<SettlementId> {
        self.tiles[id.index()].owner
    }

    pub fn tiles(&self) -> impl Iterator<Item = (TileId, &Tile)> {
        self.tiles
            .iter()
            .enumerate()
            .map(|(index, tile)| (TileId(index as u32), tile))
    }

    /// Cached 4-neighbourhood (north, south, west, east; off-grid cells omitted).
    pub fn neighbors(&self, id: TileId) -> &[TileId] {
        &self.neighbors[id.index()]
    }

    /// Square (Chebyshev) neighbourhood of `radius`, centre first, then row-major.
    pub fn square(&self, center: TileId, radius: u32) -> Vec<TileId> {
        let c = self.pos(center);
        let mut out = vec![center];
        for y in c.y.saturating_sub(radius)..=(c.y + radius).min(self.height - 1) {
            for x in c.x.saturating_sub(radius)..=(c.x + radius).min(self.width - 1) {
                if let Some(id) = self.id_at(TilePos::new(x, y)) {
                    if id != center {
                        out.push(id);
                    }
                }
            }
        }
        out
    }

    /// Every tile whose squared Euclidean distance to `center` is at most `radius²`.
    pub fn disk(&self, center: TileId, radius: u32) -> Vec<TileId> {
        let c = self.pos(center);
        let limit = (radius as u64) * (radius as u64);
        self.square(center, radius)
            .into_iter()
            .filter(|id| self.pos(*id).distance_sq(c) <= limit)
            .collect()
    }

    fn compute_neighbors(&self, id: TileId) -> Vec<TileId> {
        let pos = TilePos {
            x: id.0 % self.width,
            y: id.0 / self.width,
        };
        let mut neighbors = Vec::with_capacity(4);

        // North
        if pos.y > 0 {
            neighbors.push(TileId(id.0 - self.width));
        }
        // South
        if pos.y + 1 < self.height {
            neighbors.push(TileId(id.0 + self.width));
        }
        // West
        if pos.x > 0 {
            neighbors.push(TileId(id.0 - 1));
        }
        // East
        if pos.x + 1 < self.width {
            neighbors.push(TileId(id.0 + 1));
        }

        neighbors
    }
}
