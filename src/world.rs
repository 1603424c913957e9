use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::SimParams,
    settlement::{Polity, Relation, Settlement, Stage, StageKind, Stockpile},
    spatial::{TileGrid, TileId, TilePos},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SettlementId(u64);

impl SettlementId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

const STATE_COLORS: [[u8; 3]; 6] = [
    [0, 110, 230],
    [230, 110, 0],
    [0, 170, 0],
    [180, 0, 180],
    [230, 200, 0],
    [0, 180, 180],
];
const FALLBACK_COLOR: [u8; 3] = [100, 100, 100];

/// A band that the population collaborator has judged ready to settle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotableCluster {
    pub position: TilePos,
    pub members: u32,
    #[serde(default)]
    pub stock: Stockpile,
}

/// Direct construction of a settlement at any stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSeed {
    pub name: Option<String>,
    pub stage: StageKind,
    pub position: TilePos,
    pub population: f64,
    #[serde(default)]
    pub stock: Stockpile,
    #[serde(default)]
    pub technology: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEvent {
    Founded {
        settlement: SettlementId,
    },
    Promoted {
        settlement: SettlementId,
        stage: StageKind,
    },
    Perished {
        settlement: SettlementId,
    },
    Expanded {
        settlement: SettlementId,
        tile: TileId,
    },
    RelationSet {
        a: SettlementId,
        b: SettlementId,
        relation: Relation,
    },
    RelationDropped {
        a: SettlementId,
        b: SettlementId,
    },
    Captured {
        tile: TileId,
        from: SettlementId,
        to: SettlementId,
    },
    Strike {
        by: SettlementId,
        target: TileId,
        tiles_hit: usize,
    },
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BookkeepingState {
    pub starving: Vec<String>,
    pub events: Vec<SimEvent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettlementSnapshot {
    pub id: u64,
    pub name: String,
    pub stage: StageKind,
    pub position: TilePos,
    pub population: f64,
    pub resources: Stockpile,
    pub progress: f64,
    pub territory: Vec<TilePos>,
    pub border: Vec<TilePos>,
    pub diplomacy: BTreeMap<u64, Relation>,
    pub color: Option<[u8; 3]>,
    pub technology: Option<f64>,
    pub weapons: Option<u32>,
    pub weapon_progress: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub total_population: f64,
    pub radioactive_tiles: usize,
    pub starving: Vec<String>,
    pub events: Vec<SimEvent>,
    pub settlements: Vec<SettlementSnapshot>,
}

pub struct World {
    next_settlement: u64,
    tick: u64,
    states_founded: usize,
    pub(crate) grid: TileGrid,
    pub(crate) settlements: HashMap<SettlementId, Settlement>,
    pub(crate) params: SimParams,
    pub(crate) bookkeeping: BookkeepingState,
}

impl World {
    pub fn new(grid: TileGrid, params: SimParams) -> Self {
        Self {
            next_settlement: 0,
            tick: 0,
            states_founded: 0,
            grid,
            settlements: HashMap::new(),
            params,
            bookkeeping: BookkeepingState::default(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn advance_time(&mut self) {
        self.tick += 1;
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut TileGrid {
        &mut self.grid
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut SimParams {
        &mut self.params
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.bookkeeping.events
    }

    pub fn record(&mut self, event: SimEvent) {
        self.bookkeeping.events.push(event);
    }

    pub fn settlement(&self, id: SettlementId) -> Option<&Settlement> {
        self.settlements.get(&id)
    }

    pub fn settlement_mut(&mut self, id: SettlementId) -> Option<&mut Settlement> {
        self.settlements.get_mut(&id)
    }

    pub fn contains(&self, id: SettlementId) -> bool {
        self.settlements.contains_key(&id)
    }

    pub fn polity(&self, id: SettlementId) -> Option<&Polity> {
        self.settlements.get(&id).and_then(Settlement::polity)
    }

    pub fn polity_mut(&mut self, id: SettlementId) -> Option<&mut Polity> {
        self.settlements.get_mut(&id).and_then(Settlement::polity_mut)
    }

    pub fn settlement_ids(&self) -> Vec<SettlementId> {
        let mut ids: Vec<_> = self.settlements.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Active states in ascending id order.
    pub fn state_ids(&self) -> Vec<SettlementId> {
        let mut ids: Vec<_> = self
            .settlements
            .values()
            .filter(|s| s.is_state())
            .map(|s| s.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn total_population(&self) -> f64 {
        // summed in id order so replays agree bit for bit
        self.settlement_ids()
            .iter()
            .filter_map(|id| self.settlements.get(id))
            .map(|s| s.population)
            .sum()
    }

    pub fn power(&self, id: SettlementId) -> f64 {
        self.settlements.get(&id).map(Settlement::power).unwrap_or(0.0)
    }

    /// Turns a promotable cluster into a Tribe; clusters below the founding rule are ignored.
    pub fn found_tribe(&mut self, cluster: &PromotableCluster) -> Option<SettlementId> {
        let rule = &self.params.founding;
        if cluster.members < rule.min_members
            || cluster.stock.wood < rule.wood
            || cluster.stock.stone < rule.stone
        {
            return None;
        }
        let id = self.spawn(SettlementSeed {
            name: None,
            stage: StageKind::Tribe,
            position: cluster.position,
            population: cluster.members as f64,
            stock: cluster.stock.clone(),
            technology: None,
        })?;
        self.record(SimEvent::Founded { settlement: id });
        Some(id)
    }

    /// Places a settlement directly. States seed their starting land immediately.
    pub fn spawn(&mut self, seed: SettlementSeed) -> Option<SettlementId> {
        let position = self.grid.id_at(seed.position)?;
        let id = self.allocate();
        let name = seed
            .name
            .unwrap_or_else(|| format!("{:?} {}", seed.stage, id.raw()));
        let radius = self.params.profile(seed.stage).territory_radius;
        let (stage, territory) = match seed.stage {
            StageKind::Tribe => (Stage::Tribe, self.grid.square(position, radius)),
            StageKind::City => (Stage::City, self.grid.square(position, radius)),
            StageKind::State => {
                let technology = seed
                    .technology
                    .unwrap_or(self.params.technology.initial_level);
                (Stage::State(self.new_polity(technology)), Vec::new())
            }
        };
        self.settlements.insert(
            id,
            Settlement {
                id,
                name,
                stage,
                position,
                population: seed.population.max(0.0),
                stock: seed.stock,
                territory,
                progress: 0.0,
            },
        );
        if seed.stage == StageKind::State {
            self.seed_territory(id, position, radius);
        }
        debug!(settlement = id.raw(), stage = ?seed.stage, "settlement spawned");
        Some(id)
    }

    /// Removes a settlement; a state releases its land and its relations on both sides.
    pub fn remove_settlement(&mut self, id: SettlementId) -> Option<Settlement> {
        if self.settlements.get(&id).is_some_and(Settlement::is_state) {
            self.release_all(id);
            let partners: Vec<SettlementId> = self
                .polity(id)
                .map(|p| p.diplomacy.keys().cloned().collect())
                .unwrap_or_default();
            for partner in partners {
                if let Some(polity) = self.polity_mut(partner) {
                    polity.diplomacy.remove(&id);
                }
            }
        }
        let removed = self.settlements.remove(&id)?;
        debug!(settlement = id.raw(), "settlement removed");
        Some(removed)
    }

    pub(crate) fn new_polity(&mut self, technology: f64) -> Polity {
        let color = STATE_COLORS
            .get(self.states_founded)
            .copied()
            .unwrap_or(FALLBACK_COLOR);
        self.states_founded += 1;
        Polity::new(color, technology)
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        let settlements = self
            .settlement_ids()
            .into_iter()
            .filter_map(|id| self.settlements.get(&id))
            .map(|s| {
                let polity = s.polity();
                SettlementSnapshot {
                    id: s.id.raw(),
                    name: s.name.clone(),
                    stage: s.kind(),
                    position: self.grid.pos(s.position),
                    population: s.population,
                    resources: s.stock.clone(),
                    progress: s.progress,
                    territory: positions(&self.grid, &s.territory),
                    border: polity
                        .map(|p| positions(&self.grid, &p.border))
                        .unwrap_or_default(),
                    diplomacy: polity
                        .map(|p| p.diplomacy.iter().map(|(k, v)| (k.raw(), *v)).collect())
                        .unwrap_or_default(),
                    color: polity.map(|p| p.color),
                    technology: polity.map(|p| p.technology),
                    weapons: polity.map(Polity::whole_weapons),
                    weapon_progress: polity.map(Polity::weapon_progress),
                }
            })
            .collect();
        WorldSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            total_population: self.total_population(),
            radioactive_tiles: self.grid.tiles().filter(|(_, t)| t.radioactive).count(),
            starving: self.bookkeeping.starving.clone(),
            events: self.bookkeeping.events.clone(),
            settlements,
        }
    }

    fn allocate(&mut self) -> SettlementId {
        let id = SettlementId(self.next_settlement);
        self.next_settlement += 1;
        id
    }
}

fn positions<'a>(grid: &TileGrid, tiles: impl IntoIterator<Item = &'a TileId>) -> Vec<TilePos> {
    tiles.into_iter().map(|t| grid.pos(*t)).collect()
}
