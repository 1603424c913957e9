//! Tuning parameters for the simulation core

use serde::{Deserialize, Serialize};

use crate::settlement::{StageKind, Stockpile};

/// Resource and population gate for promotion to the next stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromotionThreshold {
    pub population: f64,
    pub wood: f64,
    pub stone: f64,
}

impl PromotionThreshold {
    pub fn is_met(&self, population: f64, stock: &Stockpile) -> bool {
        population >= self.population && stock.wood >= self.wood && stock.stone >= self.stone
    }

    /// Minimum of each requirement's ratio, each clamped to 1.
    pub fn progress(&self, population: f64, stock: &Stockpile) -> f64 {
        [
            ratio(population, self.population),
            ratio(stock.wood, self.wood),
            ratio(stock.stone, self.stone),
        ]
        .into_iter()
        .fold(1.0, f64::min)
    }
}

fn ratio(value: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        1.0
    } else {
        (value / threshold).clamp(0.0, 1.0)
    }
}

/// Per-stage strategy table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProfile {
    /// Primary-resource extraction per head per tick, spread across territory.
    pub gather_rate: f64,
    pub growth_increment: f64,
    /// Fixed capacity; states add `state_capacity_per_tile` per owned tile on top.
    pub max_population: f64,
    pub territory_radius: u32,
    pub promotion: Option<PromotionThreshold>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoundingRule {
    pub min_members: u32,
    pub wood: f64,
    pub stone: f64,
}

impl Default for FoundingRule {
    fn default() -> Self {
        Self {
            min_members: 15,
            wood: 50.0,
            stone: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionRule {
    pub chance: f64,
    pub cost: Stockpile,
}

impl Default for ExpansionRule {
    fn default() -> Self {
        Self {
            chance: 0.01,
            cost: Stockpile {
                food: 50.0,
                water: 0.0,
                wood: 100.0,
                stone: 100.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiplomacyParams {
    /// Power ratios inside `[peace_low, peace_high]` settle into peace.
    pub peace_low: f64,
    pub peace_high: f64,
}

impl Default for DiplomacyParams {
    fn default() -> Self {
        Self {
            peace_low: 0.8,
            peace_high: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarParams {
    /// Fraction of population and stockpile both sides lose per battle.
    pub attrition: f64,
}

impl Default for WarParams {
    fn default() -> Self {
        Self { attrition: 0.01 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyParams {
    pub initial_level: f64,
    pub max_level: f64,
    pub per_capita_rate: f64,
    pub peace_influence: f64,
    pub war_influence: f64,
    pub weapon_rate: f64,
    pub strike_radius: u32,
}

impl Default for TechnologyParams {
    fn default() -> Self {
        Self {
            initial_level: 1.0,
            max_level: 100.0,
            per_capita_rate: 0.0005,
            peace_influence: 0.001,
            war_influence: 0.0005,
            weapon_rate: 0.01,
            strike_radius: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub tribe: StageProfile,
    pub city: StageProfile,
    pub state: StageProfile,
    pub state_capacity_per_tile: f64,
    pub food_per_capita: f64,
    pub water_per_capita: f64,
    pub growth_stock_multiple: f64,
    pub starvation_loss: f64,
    /// Share of each extraction credited to every other resource kind.
    pub trade_fraction: f64,
    pub founding: FoundingRule,
    pub expansion: ExpansionRule,
    pub diplomacy: DiplomacyParams,
    pub war: WarParams,
    pub technology: TechnologyParams,
    /// Recompute every ownership invariant at the end of each tick.
    pub strict_invariants: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            tribe: StageProfile {
                gather_rate: 0.5,
                growth_increment: 0.1,
                max_population: 40.0,
                territory_radius: 1,
                promotion: Some(PromotionThreshold {
                    population: 30.0,
                    wood: 200.0,
                    stone: 200.0,
                }),
            },
            city: StageProfile {
                gather_rate: 0.6,
                growth_increment: 0.25,
                max_population: 120.0,
                territory_radius: 2,
                promotion: Some(PromotionThreshold {
                    population: 100.0,
                    wood: 500.0,
                    stone: 500.0,
                }),
            },
            state: StageProfile {
                gather_rate: 0.8,
                growth_increment: 0.5,
                max_population: 150.0,
                territory_radius: 3,
                promotion: None,
            },
            state_capacity_per_tile: 5.0,
            food_per_capita: 0.1,
            water_per_capita: 0.15,
            growth_stock_multiple: 2.0,
            starvation_loss: 0.5,
            trade_fraction: 0.1,
            founding: FoundingRule::default(),
            expansion: ExpansionRule::default(),
            diplomacy: DiplomacyParams::default(),
            war: WarParams::default(),
            technology: TechnologyParams::default(),
            strict_invariants: false,
        }
    }
}

impl SimParams {
    pub fn profile(&self, stage: StageKind) -> &StageProfile {
        match stage {
            StageKind::Tribe => &self.tribe,
            StageKind::City => &self.city,
            StageKind::State => &self.state,
        }
    }

    /// Population ceiling for a settlement at `stage` holding `territory` tiles.
    pub fn capacity(&self, stage: StageKind, territory: usize) -> f64 {
        let base = self.profile(stage).max_population;
        match stage {
            StageKind::State => base + territory as f64 * self.state_capacity_per_tile,
            _ => base,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
