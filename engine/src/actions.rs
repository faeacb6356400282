//! Action resolution: one submitted action in, mutated session state plus
//! log events out. Every path reports success or failure explicitly; failure
//! never tears the session down, it only tells the controller to re-prompt a
//! player or force-advance an AI turn.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::combatant::{Arena, CombatantId, Faction, StatBlock};
use crate::content::{ContentLibrary, DamageBase, EffectKind, ItemCategory, ItemEffect, Scaling};
use crate::events::{CombatEvent, LogEntry};
use crate::session::CombatSession;
use crate::targeting::{self, TargetShape};
use crate::{finalize_damage, flee_chance, hit_roll, physical_damage, status};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Attack {
        caster: CombatantId,
        /// Preferred target; the targeting fallback rules apply when absent
        /// or stale.
        target: Option<CombatantId>,
    },
    Skill {
        caster: CombatantId,
        skill: String,
        target: Option<CombatantId>,
    },
    Item {
        caster: CombatantId,
        item: String,
        target: Option<CombatantId>,
    },
    Flee {
        caster: CombatantId,
    },
    Pass {
        caster: CombatantId,
    },
}

impl Action {
    pub fn caster(&self) -> CombatantId {
        match *self {
            Action::Attack { caster, .. }
            | Action::Skill { caster, .. }
            | Action::Item { caster, .. }
            | Action::Flee { caster }
            | Action::Pass { caster } => caster,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("unknown skill `{0}`")]
    UnknownSkill(String),
    #[error("unknown item `{0}`")]
    UnknownItem(String),
    #[error("there is no `{0}` in the inventory")]
    NotInInventory(String),
    #[error("not enough MP: need {need}, have {have}")]
    NotEnoughMp { need: i32, have: i32 },
    #[error("requires an equipped {0:?}")]
    MissingEquipment(ItemCategory),
    #[error("requires the `{0}` status")]
    MissingStatus(String),
    #[error("no valid target")]
    NoValidTarget,
    #[error("{0} cannot be used in combat")]
    NotCombatUsable(String),
    #[error("nothing to cure")]
    NothingToCure,
    #[error("only the player can use items in combat")]
    PlayerOnlyItem,
    #[error("only the player can flee")]
    PlayerOnlyFlee,
    #[error("it is not that combatant's turn")]
    OutOfTurn,
    #[error("the session is already over")]
    SessionOver,
}

/// What a successfully resolved action tells the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionReport {
    /// Offensive actions consume the caster's single-use crit buff.
    pub offensive: bool,
    /// A successful flee ends the session as a non-fatal exit.
    pub fled: bool,
}

impl ActionReport {
    fn offensive() -> Self {
        Self { offensive: true, fled: false }
    }

    fn supportive() -> Self {
        Self { offensive: false, fled: false }
    }
}

pub(crate) fn resolve(
    session: &mut CombatSession,
    content: &ContentLibrary,
    action: &Action,
) -> Result<ActionReport, ActionError> {
    debug!(?action, "resolving action");
    match action {
        Action::Attack { caster, target } => resolve_attack(session, content, *caster, *target),
        Action::Skill { caster, skill, target } => {
            resolve_skill(session, content, *caster, skill, *target)
        }
        Action::Item { caster, item, target } => {
            resolve_item(session, content, *caster, item, *target)
        }
        Action::Flee { caster } => resolve_flee(session, content, *caster),
        Action::Pass { caster } => {
            let name = session
                .combatants
                .get(caster)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            session
                .events
                .push(CombatEvent::Message(LogEntry::note(format!("{name} bides their time.")).actor(*caster)));
            Ok(ActionReport::supportive())
        }
    }
}

/// Guardian redirect: a harmful effect aimed at the living party leader by
/// anyone but the guardian lands on a living guardian instead.
fn redirect_harmful(arena: &Arena, caster: CombatantId, target: CombatantId) -> (CombatantId, bool) {
    let Some(target_ref) = arena.get(&target) else {
        return (target, false);
    };
    if !target_ref.leader || !target_ref.alive() {
        return (target, false);
    }
    match arena.values().find(|c| c.guards_leader && c.alive()) {
        Some(guardian) if guardian.id != caster => (guardian.id, true),
        _ => (target, false),
    }
}

fn scaling_value(scaling: &Option<Scaling>, stats: &StatBlock) -> f64 {
    scaling
        .map(|s| stats.get(s.stat) as f64 * s.factor)
        .unwrap_or(0.0)
}

fn damage_base_value(base: &DamageBase, stats: &StatBlock) -> f64 {
    match base {
        DamageBase::Fixed { power, scaling } => *power as f64 + scaling_value(scaling, stats),
        DamageBase::Weapon { multiplier, bonus } => {
            stats.attack as f64 * multiplier + scaling_value(bonus, stats)
        }
    }
}

fn resolve_attack(
    session: &mut CombatSession,
    content: &ContentLibrary,
    caster: CombatantId,
    primary: Option<CombatantId>,
) -> Result<ActionReport, ActionError> {
    let CombatSession { combatants, events, dice, .. } = session;

    let targets =
        targeting::resolve_targets(combatants, TargetShape::SingleEnemy, caster, primary, dice);
    let Some(&target) = targets.first() else {
        return Err(ActionError::NoValidTarget);
    };
    let (target, intercepted) = redirect_harmful(combatants, caster, target);

    let caster_name = combatants[&caster].name.clone();
    let target_name = combatants[&target].name.clone();
    if intercepted {
        events.push(CombatEvent::Message(
            LogEntry::note(format!("{target_name} steps in to shield the leader!")).target(target),
        ));
    }

    let caster_stats = status::effective_stats(&combatants[&caster], content);
    let target_stats = status::effective_stats(&combatants[&target], content);

    let roll = hit_roll(dice, caster_stats.accuracy, target_stats.evasion);
    if !roll.hit {
        events.push(CombatEvent::Message(
            LogEntry::note(format!("{caster_name} attacks {target_name}, but misses!"))
                .actor(caster)
                .target(target),
        ));
        return Ok(ActionReport::offensive());
    }

    let crit = status::has_guaranteed_crit(&combatants[&caster], content)
        || dice.chance(caster_stats.crit_chance);
    let raw = physical_damage(dice, caster_stats.attack, target_stats.defense);
    let dealt = finalize_damage(raw, crit);

    let Some(victim) = combatants.get_mut(&target) else {
        return Err(ActionError::NoValidTarget);
    };
    let lost = victim.take_damage(dealt);
    let suffix = if crit { ", a critical hit!" } else { "!" };
    events.push(CombatEvent::Message(
        LogEntry::note(format!("{caster_name} attacks {target_name} for {lost} damage{suffix}"))
            .actor(caster)
            .target(target)
            .hp(-lost),
    ));
    Ok(ActionReport::offensive())
}

fn resolve_skill(
    session: &mut CombatSession,
    content: &ContentLibrary,
    caster: CombatantId,
    skill: &str,
    primary: Option<CombatantId>,
) -> Result<ActionReport, ActionError> {
    let CombatSession { combatants, events, dice, .. } = session;

    let def = content
        .skill(skill)
        .ok_or_else(|| ActionError::UnknownSkill(skill.to_string()))?;
    let caster_ref = combatants.get(&caster).ok_or(ActionError::NoValidTarget)?;
    if caster_ref.mp < def.mp_cost {
        return Err(ActionError::NotEnoughMp { need: def.mp_cost, have: caster_ref.mp });
    }
    if let Some(category) = def.requires_equipped {
        if !caster_ref.equipped.contains(&category) {
            return Err(ActionError::MissingEquipment(category));
        }
    }
    if let Some(required) = &def.requires_status {
        if !caster_ref.has_status(required) {
            return Err(ActionError::MissingStatus(required.clone()));
        }
    }

    let caster_name = caster_ref.name.clone();
    if let Some(c) = combatants.get_mut(&caster) {
        c.mp -= def.mp_cost;
    }
    events.push(CombatEvent::Message(
        LogEntry::note(format!("{caster_name} uses {}!", def.name))
            .actor(caster)
            .mp(-def.mp_cost),
    ));

    let mut offensive = false;
    for effect in &def.effects {
        let shape = effect.target.unwrap_or(def.target);
        let targets = targeting::resolve_targets(combatants, shape, caster, primary, dice);
        // Splash keys off the effect's primary even when none was submitted.
        let splash_primary = primary.or_else(|| targets.first().copied());

        match &effect.kind {
            EffectKind::Damage { base, splash } => {
                offensive = true;
                for target in targets {
                    let (victim_id, intercepted) = redirect_harmful(combatants, caster, target);
                    if intercepted {
                        let guardian_name = combatants[&victim_id].name.clone();
                        events.push(CombatEvent::Message(
                            LogEntry::note(format!("{guardian_name} steps in to shield the leader!"))
                                .target(victim_id),
                        ));
                    }
                    let caster_stats = status::effective_stats(&combatants[&caster], content);
                    let victim_stats = status::effective_stats(&combatants[&victim_id], content);
                    let base_value = damage_base_value(base, &caster_stats);
                    let raw = (base_value - victim_stats.defense as f64 / 2.0).floor() as i32;
                    let crit = status::has_guaranteed_crit(&combatants[&caster], content)
                        || dice.chance(caster_stats.crit_chance);
                    let dealt = finalize_damage(raw, crit);

                    let Some(victim) = combatants.get_mut(&victim_id) else { continue };
                    let victim_name = victim.name.clone();
                    let lost = victim.take_damage(dealt);
                    let suffix = if crit { ", a critical hit!" } else { "!" };
                    events.push(CombatEvent::Message(
                        LogEntry::note(format!("{} hits {victim_name} for {lost} damage{suffix}", def.name))
                            .actor(caster)
                            .target(victim_id)
                            .hp(-lost),
                    ));

                    if let Some(multiplier) = splash {
                        if Some(target) == splash_primary && !intercepted {
                            let splashed = ((dealt as f64) * multiplier).floor().max(1.0) as i32;
                            for neighbor in targeting::splash_neighbors(combatants, target) {
                                let Some(n) = combatants.get_mut(&neighbor) else { continue };
                                let neighbor_name = n.name.clone();
                                let lost = n.take_damage(splashed);
                                events.push(CombatEvent::Message(
                                    LogEntry::note(format!(
                                        "{neighbor_name} is caught in the blast for {lost} damage!"
                                    ))
                                    .actor(caster)
                                    .target(neighbor)
                                    .hp(-lost),
                                ));
                            }
                        }
                    }
                }
            }
            EffectKind::Heal { amount, scaling } => {
                for target in targets {
                    let caster_stats = status::effective_stats(&combatants[&caster], content);
                    let healed = *amount + scaling_value(scaling, &caster_stats).floor() as i32;
                    let max_hp = status::effective_stats(&combatants[&target], content).max_hp;
                    let Some(recipient) = combatants.get_mut(&target) else { continue };
                    let recipient_name = recipient.name.clone();
                    let gained = recipient.heal(healed, max_hp);
                    events.push(CombatEvent::Message(
                        LogEntry::note(format!("{recipient_name} recovers {gained} HP."))
                            .actor(caster)
                            .target(target)
                            .hp(gained),
                    ));
                }
            }
            EffectKind::Status { status, duration, chance } => {
                let hostile = content.status(status).map(status::is_hostile).unwrap_or(false);
                for target in targets {
                    let (victim_id, intercepted) = if hostile {
                        redirect_harmful(combatants, caster, target)
                    } else {
                        (target, false)
                    };
                    if intercepted {
                        let guardian_name = combatants[&victim_id].name.clone();
                        events.push(CombatEvent::Message(
                            LogEntry::note(format!("{guardian_name} steps in to shield the leader!"))
                                .target(victim_id),
                        ));
                    }
                    if let Some(pct) = chance {
                        if !dice.chance(*pct) {
                            let victim_name = combatants[&victim_id].name.clone();
                            events.push(CombatEvent::Message(
                                LogEntry::note(format!("{victim_name} shrugs it off."))
                                    .actor(caster)
                                    .target(victim_id),
                            ));
                            continue;
                        }
                    }
                    let Some(victim) = combatants.get_mut(&victim_id) else { continue };
                    status::apply_status(victim, content, status, *duration, caster, |entry| {
                        events.push(CombatEvent::Message(entry));
                    });
                }
            }
        }
    }

    Ok(ActionReport { offensive, fled: false })
}

fn resolve_item(
    session: &mut CombatSession,
    content: &ContentLibrary,
    caster: CombatantId,
    item: &str,
    primary: Option<CombatantId>,
) -> Result<ActionReport, ActionError> {
    let CombatSession { combatants, events, dice, inventory, .. } = session;

    let caster_ref = combatants.get(&caster).ok_or(ActionError::NoValidTarget)?;
    if !caster_ref.player_controlled {
        return Err(ActionError::PlayerOnlyItem);
    }
    if inventory.get(item).copied().unwrap_or(0) == 0 {
        return Err(ActionError::NotInInventory(item.to_string()));
    }
    let def = content
        .item(item)
        .ok_or_else(|| ActionError::UnknownItem(item.to_string()))?;
    if !def.effect.combat_usable() {
        return Err(ActionError::NotCombatUsable(def.name.clone()));
    }

    let targets = targeting::resolve_targets(combatants, def.target, caster, primary, dice);
    let Some(&target) = targets.first() else {
        return Err(ActionError::NoValidTarget);
    };
    let caster_name = caster_ref.name.clone();

    match &def.effect {
        ItemEffect::Heal(amount) => {
            let max_hp = status::effective_stats(&combatants[&target], content).max_hp;
            let Some(recipient) = combatants.get_mut(&target) else {
                return Err(ActionError::NoValidTarget);
            };
            let recipient_name = recipient.name.clone();
            let gained = recipient.heal(*amount, max_hp);
            events.push(CombatEvent::Message(
                LogEntry::note(format!(
                    "{caster_name} uses {} on {recipient_name}, restoring {gained} HP.",
                    def.name
                ))
                .actor(caster)
                .target(target)
                .hp(gained),
            ));
        }
        ItemEffect::RestoreMp(amount) => {
            let max_mp = status::effective_stats(&combatants[&target], content).max_mp;
            let Some(recipient) = combatants.get_mut(&target) else {
                return Err(ActionError::NoValidTarget);
            };
            let recipient_name = recipient.name.clone();
            let gained = recipient.restore_mp(*amount, max_mp);
            events.push(CombatEvent::Message(
                LogEntry::note(format!(
                    "{caster_name} uses {} on {recipient_name}, restoring {gained} MP.",
                    def.name
                ))
                .actor(caster)
                .target(target)
                .mp(gained),
            ));
        }
        ItemEffect::CureStatus(which) => {
            let Some(recipient) = combatants.get_mut(&target) else {
                return Err(ActionError::NoValidTarget);
            };
            let removed = status::cure_status(recipient, content, which.as_deref(), |entry| {
                events.push(CombatEvent::Message(entry));
            });
            if removed == 0 {
                return Err(ActionError::NothingToCure);
            }
        }
        // Rejected by the combat_usable check above.
        ItemEffect::GrantSp(_) => return Err(ActionError::NotCombatUsable(def.name.clone())),
    }

    // Exactly one unit, consumed only after the effect landed.
    if let Some(count) = inventory.get_mut(item) {
        *count -= 1;
        if *count == 0 {
            inventory.shift_remove(item);
        }
    }
    Ok(ActionReport::supportive())
}

fn resolve_flee(
    session: &mut CombatSession,
    content: &ContentLibrary,
    caster: CombatantId,
) -> Result<ActionReport, ActionError> {
    let CombatSession { combatants, events, dice, .. } = session;

    let caster_ref = combatants.get(&caster).ok_or(ActionError::NoValidTarget)?;
    if !caster_ref.player_controlled {
        return Err(ActionError::PlayerOnlyFlee);
    }
    let caster_name = caster_ref.name.clone();
    let speed = status::effective_stats(caster_ref, content).speed;

    let enemy_speeds: Vec<i32> = combatants
        .values()
        .filter(|c| c.alive() && c.side.faction() == Faction::Enemies)
        .map(|c| status::effective_stats(c, content).speed)
        .collect();
    let avg_enemy_speed = if enemy_speeds.is_empty() {
        0.0
    } else {
        enemy_speeds.iter().sum::<i32>() as f64 / enemy_speeds.len() as f64
    };

    let chance = flee_chance(speed, avg_enemy_speed);
    if dice.chance(chance) {
        events.push(CombatEvent::Message(
            LogEntry::note(format!("{caster_name} calls the retreat, and the party escapes!"))
                .actor(caster),
        ));
        Ok(ActionReport { offensive: false, fled: true })
    } else {
        events.push(CombatEvent::Message(
            LogEntry::note(format!("{caster_name} tries to run, but the enemies block the way!"))
                .actor(caster),
        ));
        Ok(ActionReport::supportive())
    }
}
