use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    config::SimParams,
    spatial::{ResourceKind, TileId},
    world::SettlementId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Tribe,
    City,
    State,
}

impl StageKind {
    pub fn next(self) -> Option<StageKind> {
        match self {
            StageKind::Tribe => Some(StageKind::City),
            StageKind::City => Some(StageKind::State),
            StageKind::State => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    War,
    Peace,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stockpile {
    pub food: f64,
    pub water: f64,
    pub wood: f64,
    pub stone: f64,
}

impl Stockpile {
    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Water => &mut self.water,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Stone => &mut self.stone,
        }
    }

    pub fn total(&self) -> f64 {
        self.food + self.water + self.wood + self.stone
    }

    pub fn covers(&self, cost: &Stockpile) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|kind| self.get(*kind) >= cost.get(*kind))
    }

    /// Deducts `cost`, clamping each kind at zero.
    pub fn debit(&mut self, cost: &Stockpile) {
        for kind in ResourceKind::ALL {
            *self.get_mut(kind) -= cost.get(kind);
        }
        self.clamp_non_negative();
    }

    pub fn scale(&mut self, factor: f64) {
        for kind in ResourceKind::ALL {
            *self.get_mut(kind) *= factor;
        }
        self.clamp_non_negative();
    }

    pub fn clamp_non_negative(&mut self) {
        self.food = self.food.max(0.0);
        self.water = self.water.max(0.0);
        self.wood = self.wood.max(0.0);
        self.stone = self.stone.max(0.0);
    }
}

/// Everything a settlement gains on becoming a State.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polity {
    pub color: [u8; 3],
    pub diplomacy: BTreeMap<SettlementId, Relation>,
    pub border: BTreeSet<TileId>,
    pub technology: f64,
    /// Whole part is usable; the fraction is build progress.
    pub weapons: f64,
    pub war_triggered: bool,
    /// States touching this one's border; `None` once ownership nearby changed.
    #[serde(skip)]
    pub(crate) contacts: Option<BTreeSet<SettlementId>>,
}

impl Polity {
    pub fn new(color: [u8; 3], technology: f64) -> Self {
        Self {
            color,
            diplomacy: BTreeMap::new(),
            border: BTreeSet::new(),
            technology,
            weapons: 0.0,
            war_triggered: false,
            contacts: None,
        }
    }

    pub fn whole_weapons(&self) -> u32 {
        self.weapons.max(0.0).floor() as u32
    }

    pub fn weapon_progress(&self) -> f64 {
        self.weapons.max(0.0).fract()
    }

    pub fn relation(&self, other: SettlementId) -> Option<Relation> {
        self.diplomacy.get(&other).copied()
    }

    pub fn enemies(&self) -> Vec<SettlementId> {
        self.partners(Relation::War)
    }

    pub fn partners(&self, relation: Relation) -> Vec<SettlementId> {
        self.diplomacy
            .iter()
            .filter(|(_, r)| **r == relation)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn at_war(&self) -> bool {
        self.diplomacy.values().any(|r| *r == Relation::War)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stage {
    Tribe,
    City,
    State(Polity),
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Tribe => StageKind::Tribe,
            Stage::City => StageKind::City,
            Stage::State(_) => StageKind::State,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub name: String,
    pub stage: Stage,
    pub position: TileId,
    pub population: f64,
    pub stock: Stockpile,
    pub territory: Vec<TileId>,
    pub progress: f64,
}

impl Settlement {
    pub fn kind(&self) -> StageKind {
        self.stage.kind()
    }

    pub fn is_state(&self) -> bool {
        matches!(self.stage, Stage::State(_))
    }

    pub fn polity(&self) -> Option<&Polity> {
        match &self.stage {
            Stage::State(polity) => Some(polity),
            _ => None,
        }
    }

    pub fn polity_mut(&mut self) -> Option<&mut Polity> {
        match &mut self.stage {
            Stage::State(polity) => Some(polity),
            _ => None,
        }
    }

    /// Population plus a tenth of the stockpile, scaled by technology for states.
    pub fn power(&self) -> f64 {
        let base = self.population + self.stock.total() / 10.0;
        match &self.stage {
            Stage::State(polity) => base * polity.technology,
            _ => base,
        }
    }

    pub fn capacity(&self, params: &SimParams) -> f64 {
        params.capacity(self.kind(), self.territory.len())
    }

    /// Applies a proportional loss to population and every resource.
    pub fn suffer_losses(&mut self, fraction: f64) {
        let keep = (1.0 - fraction).clamp(0.0, 1.0);
        self.population = (self.population * keep).max(0.0);
        self.stock.scale(keep);
    }

    /// Builds the next-stage variant from this one, discarding the current stage.
    ///
    /// A new city's gathering range is the square neighbourhood of its stage
    /// radius. A new state starts with no land; the caller seeds it.
    pub fn promote(self, territory: Vec<TileId>, polity: Option<Polity>) -> Settlement {
        let stage = match (self.kind().next(), polity) {
            (Some(StageKind::City), _) => Stage::City,
            (Some(StageKind::State), Some(polity)) => Stage::State(polity),
            _ => return self,
        };
        Settlement {
            id: self.id,
            name: self.name,
            stage,
            position: self.position,
            population: self.population,
            stock: self.stock,
            territory,
            progress: 0.0,
        }
    }
}
