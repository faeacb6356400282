//! The outbound notification contract. The session buffers events; the host
//! drains them after every step and renders (or ignores) them. Nothing in
//! the engine reads events back; they are presentation only.

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    /// Non-fatal exit: the party escaped, no rewards, no penalty.
    Fled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rewards {
    pub xp: i32,
    pub gold: i32,
    /// Item ids that dropped from defeated enemies.
    pub loot: Vec<String>,
}

/// Write-back entry for one surviving party member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Writeback {
    pub key: String,
    pub hp: i32,
    pub mp: i32,
}

/// Everything the host needs to persist once a session ends. Fainted members
/// have no entry and stay at 0 HP in session memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub outcome: CombatOutcome,
    pub rewards: Option<Rewards>,
    pub survivors: Vec<Writeback>,
    pub inventory: Vec<(String, u32)>,
}

/// One human-readable step of the combat log, with numeric deltas for
/// presentation (damage numbers, heal popups).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub actor: Option<CombatantId>,
    pub target: Option<CombatantId>,
    pub text: String,
    pub hp_delta: i32,
    pub mp_delta: i32,
}

impl LogEntry {
    pub fn note(text: impl Into<String>) -> Self {
        Self { actor: None, target: None, text: text.into(), hp_delta: 0, mp_delta: 0 }
    }

    pub fn actor(mut self, id: CombatantId) -> Self {
        self.actor = Some(id);
        self
    }

    pub fn target(mut self, id: CombatantId) -> Self {
        self.target = Some(id);
        self
    }

    pub fn hp(mut self, delta: i32) -> Self {
        self.hp_delta = delta;
        self
    }

    pub fn mp(mut self, delta: i32) -> Self {
        self.mp_delta = delta;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatEvent {
    SessionStarted {
        encounter: Option<String>,
    },
    RoundAdvanced {
        round: u32,
    },
    TurnAdvanced {
        actor: CombatantId,
    },
    AwaitingPlayerAction {
        actor: CombatantId,
    },
    TargetSelectionRequest {
        actor: CombatantId,
        prompt: String,
        candidates: Vec<CombatantId>,
    },
    SessionEnded {
        outcome: CombatOutcome,
        rewards: Option<Rewards>,
    },
    Message(LogEntry),
}
