//! Maps a target shape plus an optional primary id to the concrete set of
//! living combatants an effect lands on. The resolved list never contains a
//! fainted combatant; an empty list means "no effect", not an error.

use serde::{Deserialize, Serialize};

use crate::Dice;
use crate::combatant::{Arena, CombatantId, Faction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetShape {
    /// The caster itself.
    #[serde(rename = "self")]
    Caster,
    SingleEnemy,
    SingleAlly,
    /// The party's designated leader.
    AllyLeader,
    AllEnemies,
    AllAllies,
    /// Every living member of the player's party, regardless of caster side.
    Party,
    /// The primary target plus one other random living enemy.
    #[serde(rename = "aoe_2")]
    Aoe2,
    /// Resolves like `single_enemy`; splash propagation is the action
    /// resolver's job.
    SingleEnemySplash,
    AllEnemiesSelf,
}

impl TargetShape {
    /// Shapes that hit a whole side need no primary-target selection.
    pub fn is_whole_side(self) -> bool {
        matches!(
            self,
            TargetShape::AllEnemies
                | TargetShape::AllAllies
                | TargetShape::Party
                | TargetShape::AllEnemiesSelf
        )
    }

    /// Shapes whose primary is picked from the caster's opponents.
    pub fn targets_enemies(self) -> bool {
        matches!(
            self,
            TargetShape::SingleEnemy
                | TargetShape::Aoe2
                | TargetShape::SingleEnemySplash
                | TargetShape::AllEnemies
                | TargetShape::AllEnemiesSelf
        )
    }
}

/// Living members of a faction, in roster order.
pub fn living_of_faction(arena: &Arena, faction: Faction) -> Vec<CombatantId> {
    arena
        .values()
        .filter(|c| c.alive() && c.side.faction() == faction)
        .map(|c| c.id)
        .collect()
}

fn is_living_member(arena: &Arena, id: CombatantId, faction: Faction) -> bool {
    arena
        .get(&id)
        .map(|c| c.alive() && c.side.faction() == faction)
        .unwrap_or(false)
}

/// Resolve a target shape to an ordered list of living combatants. "Enemy"
/// and "ally" are relative to the caster's faction.
pub fn resolve_targets(
    arena: &Arena,
    shape: TargetShape,
    caster: CombatantId,
    primary: Option<CombatantId>,
    dice: &mut Dice,
) -> Vec<CombatantId> {
    let Some(caster_ref) = arena.get(&caster) else {
        return Vec::new();
    };
    let own = caster_ref.side.faction();
    let opposing = own.opposing();

    match shape {
        TargetShape::Caster => {
            if caster_ref.alive() {
                vec![caster]
            } else {
                Vec::new()
            }
        }
        TargetShape::SingleEnemy | TargetShape::SingleEnemySplash => {
            match primary.filter(|&p| is_living_member(arena, p, opposing)) {
                Some(p) => vec![p],
                None => living_of_faction(arena, opposing).into_iter().take(1).collect(),
            }
        }
        TargetShape::SingleAlly => {
            match primary.filter(|&p| is_living_member(arena, p, own)) {
                Some(p) => vec![p],
                // The caster is its own first fallback when it qualifies.
                None if caster_ref.alive() => vec![caster],
                None => living_of_faction(arena, own).into_iter().take(1).collect(),
            }
        }
        TargetShape::AllyLeader => arena
            .values()
            .find(|c| c.leader && c.alive())
            .map(|c| vec![c.id])
            .unwrap_or_default(),
        TargetShape::AllEnemies => living_of_faction(arena, opposing),
        TargetShape::AllAllies => living_of_faction(arena, own),
        TargetShape::Party => living_of_faction(arena, Faction::Party),
        TargetShape::Aoe2 => {
            let pool = living_of_faction(arena, opposing);
            match primary.filter(|&p| is_living_member(arena, p, opposing)) {
                Some(p) => {
                    let mut targets = vec![p];
                    let others: Vec<CombatantId> =
                        pool.into_iter().filter(|&id| id != p).collect();
                    if !others.is_empty() {
                        targets.push(others[dice.pick(others.len())]);
                    }
                    targets
                }
                None => pool.into_iter().take(2).collect(),
            }
        }
        TargetShape::AllEnemiesSelf => {
            let mut targets = Vec::new();
            if caster_ref.alive() {
                targets.push(caster);
            }
            targets.extend(living_of_faction(arena, opposing));
            targets
        }
    }
}

/// Valid primary targets for a shape, for the host's target-selection menu.
/// Whole-side shapes return an empty pool: nothing to choose.
pub fn candidate_pool(arena: &Arena, shape: TargetShape, caster: CombatantId) -> Vec<CombatantId> {
    let Some(caster_ref) = arena.get(&caster) else {
        return Vec::new();
    };
    let own = caster_ref.side.faction();
    match shape {
        TargetShape::Caster | TargetShape::AllyLeader => Vec::new(),
        _ if shape.is_whole_side() => Vec::new(),
        TargetShape::SingleAlly => living_of_faction(arena, own),
        _ => living_of_faction(arena, own.opposing()),
    }
}

/// The two roster-adjacent living neighbors of `primary` on its own side:
/// the nearest living combatant before it and after it in roster order.
pub fn splash_neighbors(arena: &Arena, primary: CombatantId) -> Vec<CombatantId> {
    let Some(primary_ref) = arena.get(&primary) else {
        return Vec::new();
    };
    let faction = primary_ref.side.faction();
    let roster: Vec<CombatantId> = arena
        .values()
        .filter(|c| c.side.faction() == faction)
        .map(|c| c.id)
        .collect();
    let Some(pos) = roster.iter().position(|&id| id == primary) else {
        return Vec::new();
    };

    let mut neighbors = Vec::new();
    if let Some(&before) = roster[..pos]
        .iter()
        .rev()
        .find(|id| arena.get(*id).is_some_and(|c| c.alive()))
    {
        neighbors.push(before);
    }
    if let Some(&after) = roster[pos + 1..]
        .iter()
        .find(|id| arena.get(*id).is_some_and(|c| c.alive()))
    {
        neighbors.push(after);
    }
    neighbors
}
