//! Status effect engine: per-round ticks, duration expiry, stat-modifier
//! folding, and application with duration merging. Modifiers are never baked
//! into a combatant's stored base block: every derived-stat read folds them
//! in fresh, so removal instantly restores the unmodified value.

use crate::combatant::{Combatant, CombatantId, Stat, StatBlock, StatusInstance};
use crate::content::{ContentLibrary, StatusDef, TickKind};
use crate::events::LogEntry;

const MODIFIED_STATS: [Stat; 6] = [
    Stat::Attack,
    Stat::Defense,
    Stat::Speed,
    Stat::Accuracy,
    Stat::Evasion,
    Stat::CritChance,
];

/// Base stats with every active status modifier folded in: flat adds first,
/// then multipliers. Unknown status ids contribute nothing.
pub fn effective_stats(combatant: &Combatant, content: &ContentLibrary) -> StatBlock {
    let mut stats = combatant.base;
    for stat in MODIFIED_STATS {
        let mut value = stats.get(stat) as f64;
        let mut add = 0i32;
        let mut mult = 1.0f64;
        for instance in &combatant.statuses {
            let Some(def) = content.status(&instance.status) else { continue };
            for modifier in def.modifiers.iter().filter(|m| m.stat == stat) {
                add += modifier.add;
                mult *= modifier.mult;
            }
        }
        value = (value + add as f64) * mult;
        stats.set(stat, value.floor() as i32);
    }
    stats
}

/// Whether any active status blocks this combatant's action.
pub fn blocks_turn(combatant: &Combatant, content: &ContentLibrary) -> bool {
    combatant
        .statuses
        .iter()
        .any(|s| content.status(&s.status).is_some_and(|d| d.blocks_turn))
}

pub fn has_guaranteed_crit(combatant: &Combatant, content: &ContentLibrary) -> bool {
    combatant
        .statuses
        .iter()
        .any(|s| content.status(&s.status).is_some_and(|d| d.guaranteed_crit))
}

/// Consume every single-use guaranteed-crit status. Called by the controller
/// after a successful offensive action, never on a failed one.
pub fn strip_guaranteed_crit(
    combatant: &mut Combatant,
    content: &ContentLibrary,
    mut log: impl FnMut(LogEntry),
) {
    let mut stripped = Vec::new();
    combatant.statuses.retain(|s| {
        let single_use = content.status(&s.status).is_some_and(|d| d.guaranteed_crit);
        if single_use {
            stripped.push(s.status.clone());
        }
        !single_use
    });
    for status in stripped {
        let name = status_name(content, &status);
        log(LogEntry::note(format!("{}'s {} is spent.", combatant.name, name))
            .target(combatant.id));
    }
}

/// A status that hurts to carry: used to decide whether the guardian
/// intercepts it when it is aimed at the leader.
pub fn is_hostile(def: &StatusDef) -> bool {
    if def.blocks_turn {
        return true;
    }
    if def.tick.is_some_and(|t| t.kind == TickKind::Damage) {
        return true;
    }
    def.modifiers.iter().any(|m| m.add < 0 || m.mult < 1.0)
}

/// Apply `status` to `target` for `duration` turns. Re-applying an already
/// held status replaces its remaining duration with the larger of the two
/// rather than stacking a second instance.
pub fn apply_status(
    target: &mut Combatant,
    content: &ContentLibrary,
    status: &str,
    duration: u32,
    applied_by: CombatantId,
    mut log: impl FnMut(LogEntry),
) {
    let name = status_name(content, status);
    if let Some(existing) = target.statuses.iter_mut().find(|s| s.status == status) {
        existing.remaining = existing.remaining.max(duration);
        log(LogEntry::note(format!("{} is already affected by {}; it lingers.", target.name, name))
            .target(target.id));
        return;
    }
    target.statuses.push(StatusInstance {
        status: status.to_string(),
        remaining: duration,
        applied_by,
    });
    log(LogEntry::note(format!("{} is afflicted with {}!", target.name, name)).target(target.id));
}

/// Remove one named status, or all of them. Returns how many were removed.
pub fn cure_status(
    target: &mut Combatant,
    content: &ContentLibrary,
    which: Option<&str>,
    mut log: impl FnMut(LogEntry),
) -> usize {
    let mut removed = Vec::new();
    target.statuses.retain(|s| {
        let cure = which.is_none_or(|w| w == s.status);
        if cure {
            removed.push(s.status.clone());
        }
        !cure
    });
    for status in &removed {
        let name = status_name(content, status);
        log(LogEntry::note(format!("{} is cured of {}.", target.name, name)).target(target.id));
    }
    removed.len()
}

/// One per-round tick for a single combatant, run before its turn resolves:
/// damage/heal-over-time amounts land immediately, then every duration
/// decrements and instances reaching 0 wear off.
pub fn tick_statuses(
    combatant: &mut Combatant,
    content: &ContentLibrary,
    mut log: impl FnMut(LogEntry),
) {
    let max_hp = effective_stats(combatant, content).max_hp;
    let active: Vec<String> = combatant.statuses.iter().map(|s| s.status.clone()).collect();
    for status in active {
        let Some(def) = content.status(&status) else { continue };
        let Some(tick) = def.tick else { continue };
        let before = combatant.hp;
        match tick.kind {
            TickKind::Damage => {
                combatant.hp = (combatant.hp - tick.amount).max(0);
                log(LogEntry::note(format!(
                    "{} takes {} damage from {}.",
                    combatant.name,
                    before - combatant.hp,
                    def.name
                ))
                .target(combatant.id)
                .hp(combatant.hp - before));
            }
            TickKind::Heal => {
                combatant.hp = (combatant.hp + tick.amount).min(max_hp);
                log(LogEntry::note(format!(
                    "{} recovers {} HP from {}.",
                    combatant.name,
                    combatant.hp - before,
                    def.name
                ))
                .target(combatant.id)
                .hp(combatant.hp - before));
            }
        }
    }

    for instance in combatant.statuses.iter_mut() {
        instance.remaining = instance.remaining.saturating_sub(1);
    }
    let mut expired = Vec::new();
    combatant.statuses.retain(|s| {
        if s.remaining == 0 {
            expired.push(s.status.clone());
            return false;
        }
        true
    });
    for status in expired {
        let name = status_name(content, &status);
        log(LogEntry::note(format!("{}'s {} wears off.", combatant.name, name))
            .target(combatant.id));
    }
}

fn status_name<'a>(content: &'a ContentLibrary, id: &'a str) -> &'a str {
    content.status(id).map(|d| d.name.as_str()).unwrap_or(id)
}
