//! Territory frontier tracking.
//!
//! Every ownership change goes through this module so that each state's
//! border set stays exactly the tiles of its territory with at least one
//! 4-neighbour it does not own. Updates only touch the changed tile and its
//! neighbours; a full recompute happens once when a state is seeded.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    error::InvariantViolation,
    settlement::Stage,
    spatial::{TileGrid, TileId},
    world::{SettlementId, World},
};

pub fn is_border(grid: &TileGrid, owner: SettlementId, tile: TileId) -> bool {
    grid.neighbors(tile)
        .iter()
        .any(|n| grid.owner(*n) != Some(owner))
}

/// Border set recomputed from scratch.
pub fn recompute_border(
    grid: &TileGrid,
    owner: SettlementId,
    territory: &[TileId],
) -> BTreeSet<TileId> {
    territory
        .iter()
        .copied()
        .filter(|t| is_border(grid, owner, *t))
        .collect()
}

fn attach(
    grid: &mut TileGrid,
    owner: SettlementId,
    territory: &mut Vec<TileId>,
    border: &mut BTreeSet<TileId>,
    tile: TileId,
) {
    grid.tile_mut(tile).owner = Some(owner);
    territory.push(tile);
    if is_border(grid, owner, tile) {
        border.insert(tile);
    }
    for &n in grid.neighbors(tile) {
        if grid.owner(n) == Some(owner) && !is_border(grid, owner, n) {
            border.remove(&n);
        }
    }
}

fn detach(
    grid: &mut TileGrid,
    owner: SettlementId,
    territory: &mut Vec<TileId>,
    border: &mut BTreeSet<TileId>,
    tile: TileId,
) {
    grid.tile_mut(tile).owner = None;
    if let Some(index) = territory.iter().position(|t| *t == tile) {
        territory.remove(index);
    }
    border.remove(&tile);
    for &n in grid.neighbors(tile) {
        if grid.owner(n) == Some(owner) {
            border.insert(n);
        }
    }
}

impl World {
    /// Bulk-claims every free tile of the square neighbourhood around `center`.
    pub fn seed_territory(&mut self, id: SettlementId, center: TileId, radius: u32) -> usize {
        let candidates = self.grid.square(center, radius);
        let Some(settlement) = self.settlements.get_mut(&id) else {
            return 0;
        };
        let Stage::State(polity) = &mut settlement.stage else {
            return 0;
        };
        let mut seeded = Vec::new();
        for tile in candidates {
            if self.grid.tile(tile).is_claimable() {
                self.grid.tile_mut(tile).owner = Some(id);
                settlement.territory.push(tile);
                seeded.push(tile);
            }
        }
        polity.border = recompute_border(&self.grid, id, &settlement.territory);
        self.invalidate_contacts(&seeded, &[id]);
        seeded.len()
    }

    /// Claims a free tile for a state. Owned or radioactive tiles are refused.
    pub fn claim_tile(&mut self, tile: TileId, id: SettlementId) -> bool {
        if !self.grid.tile(tile).is_claimable() {
            return false;
        }
        let Some(settlement) = self.settlements.get_mut(&id) else {
            return false;
        };
        let Stage::State(polity) = &mut settlement.stage else {
            return false;
        };
        attach(
            &mut self.grid,
            id,
            &mut settlement.territory,
            &mut polity.border,
            tile,
        );
        self.invalidate_contacts(&[tile], &[id]);
        true
    }

    /// Clears ownership of a tile and returns the previous owner.
    pub fn release_tile(&mut self, tile: TileId) -> Option<SettlementId> {
        let owner = self.grid.owner(tile)?;
        match self
            .settlements
            .get_mut(&owner)
            .map(|s| (&mut s.territory, &mut s.stage))
        {
            Some((territory, Stage::State(polity))) => {
                detach(&mut self.grid, owner, territory, &mut polity.border, tile);
            }
            _ => self.grid.tile_mut(tile).owner = None,
        }
        self.invalidate_contacts(&[tile], &[owner]);
        Some(owner)
    }

    /// Moves a tile from `from` to `to` in one step. No-op unless `from` owns it.
    pub fn transfer_tile(&mut self, tile: TileId, from: SettlementId, to: SettlementId) -> bool {
        if from == to || self.grid.owner(tile) != Some(from) || self.polity(to).is_none() {
            return false;
        }
        self.release_tile(tile);
        self.claim_tile(tile, to)
    }

    pub(crate) fn release_all(&mut self, id: SettlementId) {
        let Some(settlement) = self.settlements.get_mut(&id) else {
            return;
        };
        let tiles = std::mem::take(&mut settlement.territory);
        if let Some(polity) = settlement.polity_mut() {
            polity.border.clear();
        }
        for tile in &tiles {
            self.grid.tile_mut(*tile).owner = None;
        }
        self.invalidate_contacts(&tiles, &[id]);
    }

    /// States owning a tile adjacent to one of `id`'s border tiles.
    pub fn contacts(&mut self, id: SettlementId) -> BTreeSet<SettlementId> {
        let Some(polity) = self.settlements.get_mut(&id).and_then(|s| s.polity_mut()) else {
            return BTreeSet::new();
        };
        if let Some(cached) = &polity.contacts {
            return cached.clone();
        }
        let mut found = BTreeSet::new();
        for &tile in &polity.border {
            for &n in self.grid.neighbors(tile) {
                match self.grid.owner(n) {
                    Some(other) if other != id => {
                        found.insert(other);
                    }
                    _ => {}
                }
            }
        }
        polity.contacts = Some(found.clone());
        found
    }

    /// Every (own border tile, enemy tile) pair that touch, in tile order.
    pub fn combat_front(&self, id: SettlementId, enemy: SettlementId) -> Vec<(TileId, TileId)> {
        let Some(polity) = self.polity(id) else {
            return Vec::new();
        };
        let mut front = Vec::new();
        for &tile in &polity.border {
            for &n in self.grid.neighbors(tile) {
                if self.grid.owner(n) == Some(enemy) {
                    front.push((tile, n));
                }
            }
        }
        front
    }

    fn invalidate_contacts(&mut self, tiles: &[TileId], extra: &[SettlementId]) {
        let mut owners: BTreeSet<SettlementId> = extra.iter().copied().collect();
        for &tile in tiles {
            owners.extend(self.grid.owner(tile));
            for &n in self.grid.neighbors(tile) {
                owners.extend(self.grid.owner(n));
            }
        }
        for owner in owners {
            if let Some(polity) = self.polity_mut(owner) {
                polity.contacts = None;
            }
        }
    }

    /// Recomputes ownership, border and diplomacy invariants from scratch.
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        let mut claimed: HashMap<SettlementId, HashSet<TileId>> = HashMap::new();
        for id in self.state_ids() {
            let Some(settlement) = self.settlements.get(&id) else {
                continue;
            };
            let set = claimed.entry(id).or_default();
            for &tile in &settlement.territory {
                let pos = self.grid.pos(tile);
                if !set.insert(tile) {
                    return Err(InvariantViolation::DuplicateTerritory { state: id, pos });
                }
                let actual = self.grid.owner(tile);
                if actual != Some(id) {
                    return Err(InvariantViolation::ForeignTerritory {
                        state: id,
                        pos,
                        actual,
                    });
                }
            }
        }

        for (tile, cell) in self.grid.tiles() {
            if let Some(owner) = cell.owner {
                match claimed.get(&owner) {
                    Some(set) if set.contains(&tile) => {}
                    Some(_) => {
                        return Err(InvariantViolation::MissingFromTerritory {
                            pos: cell.pos,
                            owner,
                        })
                    }
                    None => {
                        return Err(InvariantViolation::UnknownOwner {
                            pos: cell.pos,
                            owner,
                        })
                    }
                }
            }
        }

        for id in self.state_ids() {
            let (Some(settlement), Some(polity)) = (self.settlement(id), self.polity(id)) else {
                continue;
            };
            let expected = recompute_border(&self.grid, id, &settlement.territory);
            let stale = polity.border.difference(&expected).count();
            let missing = expected.difference(&polity.border).count();
            if stale + missing > 0 {
                return Err(InvariantViolation::BorderMismatch {
                    state: id,
                    stale,
                    missing,
                });
            }
            for (other, relation) in &polity.diplomacy {
                let mirrored = self.polity(*other).and_then(|p| p.relation(id));
                if mirrored != Some(*relation) {
                    return Err(InvariantViolation::AsymmetricRelation { a: id, b: *other });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SimParams,
        settlement::{StageKind, Stockpile},
        spatial::{ResourceKind, TilePos},
        world::SettlementSeed,
    };

    fn world() -> World {
        World::new(
            TileGrid::uniform(12, 12, ResourceKind::Wood, 500.0),
            SimParams::default(),
        )
    }

    fn state_at(world: &mut World, x: u32, y: u32) -> SettlementId {
        world
            .spawn(SettlementSeed {
                name: None,
                stage: StageKind::State,
                position: TilePos::new(x, y),
                population: 100.0,
                stock: Stockpile::default(),
                technology: None,
            })
            .unwrap()
    }

    fn tile(world: &World, x: u32, y: u32) -> TileId {
        world.grid().id_at(TilePos::new(x, y)).unwrap()
    }

    #[test]
    fn seeding_claims_radius_and_hollow_border() {
        let mut world = world();
        let id = state_at(&mut world, 5, 5);
        let settlement = world.settlement(id).unwrap();
        assert_eq!(settlement.territory.len(), 49);
        // 7x7 block: the outer ring of 24 tiles is border, the 5x5 core is not
        assert_eq!(world.polity(id).unwrap().border.len(), 24);
        assert!(world.verify_invariants().is_ok());
    }

    #[test]
    fn claim_drops_interior_neighbours_from_border() {
        let mut world = world();
        let id = state_at(&mut world, 3, 3);
        // (7, 3) is just outside the 7x7 block [0..=6]
        let outside = tile(&world, 7, 3);
        let edge = tile(&world, 6, 3);
        assert!(world.polity(id).unwrap().border.contains(&edge));
        assert!(world.claim_tile(outside, id));
        assert!(world.polity(id).unwrap().border.contains(&outside));
        assert!(!world.polity(id).unwrap().border.contains(&edge));
        world.verify_invariants().unwrap();
    }

    #[test]
    fn release_exposes_same_owner_neighbours() {
        let mut world = world();
        let id = state_at(&mut world, 5, 5);
        let core = tile(&world, 5, 5);
        assert!(!world.polity(id).unwrap().border.contains(&core));
        assert_eq!(world.release_tile(core), Some(id));
        let border = &world.polity(id).unwrap().border;
        assert!(!border.contains(&core));
        for n in world.grid().neighbors(core) {
            assert!(border.contains(n));
        }
        world.verify_invariants().unwrap();
    }

    #[test]
    fn transfer_requires_current_owner_and_keeps_both_borders_exact() {
        let mut world = world();
        let west = state_at(&mut world, 2, 5);
        let east = state_at(&mut world, 9, 5);
        let contested = tile(&world, 5, 5);
        assert_eq!(world.grid().owner(contested), Some(west));

        assert!(!world.transfer_tile(contested, east, west));
        assert!(world.transfer_tile(contested, west, east));
        assert_eq!(world.grid().owner(contested), Some(east));
        assert!(world.settlement(east).unwrap().territory.contains(&contested));
        assert!(!world.settlement(west).unwrap().territory.contains(&contested));
        world.verify_invariants().unwrap();
    }

    #[test]
    fn occupied_tiles_cannot_be_claimed() {
        let mut world = world();
        let west = state_at(&mut world, 2, 5);
        let east = state_at(&mut world, 9, 5);
        let taken = tile(&world, 4, 5);
        assert!(!world.claim_tile(taken, east));
        assert_eq!(world.grid().owner(taken), Some(west));
    }

    #[test]
    fn contacts_follow_ownership_changes() {
        let mut world = world();
        let west = state_at(&mut world, 2, 5);
        let east = state_at(&mut world, 10, 5);
        // west spans x 0..=5, east spans x 7..=11: one empty column between
        assert!(world.contacts(west).is_empty());
        let gap = tile(&world, 6, 5);
        assert!(world.claim_tile(gap, west));
        assert!(world.contacts(west).contains(&east));
        assert!(world.contacts(east).contains(&west));
        world.release_tile(gap);
        assert!(world.contacts(east).is_empty());
    }

    #[test]
    fn detects_a_corrupted_border() {
        let mut world = world();
        let id = state_at(&mut world, 5, 5);
        let core = tile(&world, 5, 5);
        world.polity_mut(id).unwrap().border.insert(core);
        assert!(matches!(
            world.verify_invariants(),
            Err(InvariantViolation::BorderMismatch { stale: 1, .. })
        ));
    }
}
