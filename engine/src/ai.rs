//! Decision policies for AI-controlled combatants. Enemies follow a simple
//! skill-or-attack coin flip; AI allies walk a fixed priority list. Both
//! share the lowest-HP-ratio target pick, ties broken by roster order.

use tracing::trace;

use crate::Dice;
use crate::actions::Action;
use crate::combatant::{Arena, CombatantId, Faction, Side};
use crate::content::{ContentLibrary, DamageBase, EffectKind, SkillDef, SkillTag};
use crate::status::effective_stats;
use crate::targeting::living_of_faction;

/// Chance, in percent, that an enemy with a usable skill casts it instead of
/// attacking.
const ENEMY_SKILL_CHANCE: i32 = 50;

/// Leader HP ratio below which an AI ally prioritizes a defensive buff.
const LEADER_RESCUE_RATIO: f64 = 0.35;

pub fn decide(
    arena: &Arena,
    content: &ContentLibrary,
    dice: &mut Dice,
    actor: CombatantId,
) -> Action {
    let Some(combatant) = arena.get(&actor) else {
        return Action::Pass { caster: actor };
    };
    let action = match combatant.side {
        Side::Enemy => decide_enemy(arena, content, dice, actor),
        Side::Player | Side::Ally => decide_ally(arena, content, dice, actor),
    };
    trace!(actor = %actor, ?action, "ai decision");
    action
}

fn decide_enemy(
    arena: &Arena,
    content: &ContentLibrary,
    dice: &mut Dice,
    actor: CombatantId,
) -> Action {
    let opponents = living_of_faction(arena, Faction::Party);
    if opponents.is_empty() {
        return Action::Pass { caster: actor };
    }
    let focus = lowest_hp_ratio(arena, &opponents);

    let usable: Vec<&SkillDef> = known_affordable(arena, content, actor)
        .into_iter()
        .filter(|s| s.has_tag(SkillTag::Attack) || s.has_tag(SkillTag::Debuff))
        .collect();
    if !usable.is_empty() && dice.chance(ENEMY_SKILL_CHANCE) {
        let skill = usable[dice.pick(usable.len())];
        let target = if skill.target.is_whole_side() { None } else { focus };
        return Action::Skill { caster: actor, skill: skill.id.clone(), target };
    }

    Action::Attack { caster: actor, target: focus }
}

fn decide_ally(
    arena: &Arena,
    content: &ContentLibrary,
    _dice: &mut Dice,
    actor: CombatantId,
) -> Action {
    let enemies = living_of_faction(arena, Faction::Enemies);
    if enemies.is_empty() {
        return Action::Pass { caster: actor };
    }
    let focus = lowest_hp_ratio(arena, &enemies);
    let affordable = known_affordable(arena, content, actor);

    // 1. Shore the leader up when they are in danger.
    if let Some(leader) = arena.values().find(|c| c.leader && c.alive()) {
        if leader.hp_ratio() < LEADER_RESCUE_RATIO {
            let buff = affordable.iter().find(|s| {
                s.has_tag(SkillTag::Buff)
                    && s.applied_status().is_some_and(|st| !leader.has_status(st))
            });
            if let Some(skill) = buff {
                return Action::Skill {
                    caster: actor,
                    skill: skill.id.clone(),
                    target: Some(leader.id),
                };
            }
        }
    }

    // 2. Crowd control when outnumbered, unless it is already everywhere.
    if enemies.len() > 1 {
        let control = affordable.iter().find(|s| {
            s.has_tag(SkillTag::CrowdControl)
                && s.applied_status().is_some_and(|st| {
                    enemies
                        .iter()
                        .any(|id| arena.get(id).is_some_and(|e| !e.has_status(st)))
                })
        });
        if let Some(skill) = control {
            let target = if skill.target.is_whole_side() { None } else { focus };
            return Action::Skill { caster: actor, skill: skill.id.clone(), target };
        }
    }

    // 3. Strongest affordable offensive skill.
    let strongest = affordable
        .iter()
        .filter(|s| s.has_tag(SkillTag::Attack))
        .max_by_key(|s| estimate_power(s, arena, content, actor));
    if let Some(skill) = strongest {
        let target = if skill.target.is_whole_side() { None } else { focus };
        return Action::Skill { caster: actor, skill: skill.id.clone(), target };
    }

    // 4. Plain attack.
    Action::Attack { caster: actor, target: focus }
}

/// Minimal current/max HP ratio among living candidates; roster order breaks
/// ties because the scan keeps the first strict minimum.
pub fn lowest_hp_ratio(arena: &Arena, candidates: &[CombatantId]) -> Option<CombatantId> {
    let mut best: Option<(CombatantId, f64)> = None;
    for id in candidates {
        let Some(c) = arena.get(id) else { continue };
        if !c.alive() {
            continue;
        }
        let ratio = c.hp_ratio();
        match best {
            Some((_, lowest)) if ratio >= lowest => {}
            _ => best = Some((*id, ratio)),
        }
    }
    best.map(|(id, _)| id)
}

fn known_affordable<'a>(
    arena: &Arena,
    content: &'a ContentLibrary,
    actor: CombatantId,
) -> Vec<&'a SkillDef> {
    let Some(combatant) = arena.get(&actor) else {
        return Vec::new();
    };
    combatant
        .skills
        .iter()
        .filter_map(|id| content.skill(id))
        .filter(|s| s.mp_cost <= combatant.mp)
        .filter(|s| {
            s.requires_equipped
                .map(|cat| combatant.equipped.contains(&cat))
                .unwrap_or(true)
        })
        .filter(|s| {
            s.requires_status
                .as_deref()
                .map(|st| combatant.has_status(st))
                .unwrap_or(true)
        })
        .collect()
}

/// Rough expected base damage of a skill with the actor's current effective
/// stats. Only used for ranking, so defense and crits are ignored.
fn estimate_power(
    skill: &SkillDef,
    arena: &Arena,
    content: &ContentLibrary,
    actor: CombatantId,
) -> i32 {
    let Some(combatant) = arena.get(&actor) else {
        return 0;
    };
    let stats = effective_stats(combatant, content);
    skill
        .effects
        .iter()
        .map(|effect| match &effect.kind {
            EffectKind::Damage { base, .. } => match base {
                DamageBase::Fixed { power, scaling } => {
                    *power
                        + scaling
                            .map(|s| (stats.get(s.stat) as f64 * s.factor) as i32)
                            .unwrap_or(0)
                }
                DamageBase::Weapon { multiplier, bonus } => {
                    (stats.attack as f64 * multiplier) as i32
                        + bonus
                            .map(|s| (stats.get(s.stat) as f64 * s.factor) as i32)
                            .unwrap_or(0)
                }
            },
            _ => 0,
        })
        .sum()
}
