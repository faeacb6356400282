//! Live combat participants. A `Combatant` is the session's working copy of a
//! persistent character record or a spawned enemy; nothing outside the
//! session holds a mutable reference to one.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::content::{EnemyDef, ItemCategory};

/// Instance id, unique within one session. Allocation order doubles as
/// roster order: party first, then enemies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub u32);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The combatant arena. Insertion order is roster order, which the targeting
/// and AI tie-break rules depend on.
pub type Arena = IndexMap<CombatantId, Combatant>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Ally,
    Enemy,
}

/// Player and allies fight as one faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Faction {
    Party,
    Enemies,
}

impl Side {
    pub fn faction(self) -> Faction {
        match self {
            Side::Player | Side::Ally => Faction::Party,
            Side::Enemy => Faction::Enemies,
        }
    }
}

impl Faction {
    pub fn opposing(self) -> Faction {
        match self {
            Faction::Party => Faction::Enemies,
            Faction::Enemies => Faction::Party,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Attack,
    Defense,
    Speed,
    Accuracy,
    Evasion,
    CritChance,
}

/// Base stat block. Current HP/MP live on the combatant, not here, so the
/// block can be shared verbatim between definitions and live records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatBlock {
    pub max_hp: i32,
    pub max_mp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub accuracy: i32,
    pub evasion: i32,
    pub crit_chance: i32,
}

impl StatBlock {
    pub fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Attack => self.attack,
            Stat::Defense => self.defense,
            Stat::Speed => self.speed,
            Stat::Accuracy => self.accuracy,
            Stat::Evasion => self.evasion,
            Stat::CritChance => self.crit_chance,
        }
    }

    pub fn set(&mut self, stat: Stat, value: i32) {
        match stat {
            Stat::Attack => self.attack = value,
            Stat::Defense => self.defense = value,
            Stat::Speed => self.speed = value,
            Stat::Accuracy => self.accuracy = value,
            Stat::Evasion => self.evasion = value,
            Stat::CritChance => self.crit_chance = value,
        }
    }
}

/// One status effect currently on a combatant. Only the status engine
/// mutates these; an instance is removed the tick its duration reaches 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInstance {
    pub status: String,
    pub remaining: u32,
    pub applied_by: CombatantId,
}

#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub side: Side,
    pub hp: i32,
    pub mp: i32,
    pub base: StatBlock,
    pub skills: Vec<String>,
    pub statuses: Vec<StatusInstance>,
    pub player_controlled: bool,
    /// The party's designated leader; the guardian redirect protects them.
    pub leader: bool,
    /// Intercepts harmful single-target effects aimed at the leader.
    pub guards_leader: bool,
    pub equipped: Vec<ItemCategory>,
    /// Key of the persistent record this combatant was snapshotted from;
    /// surviving party members write HP/MP back through it at session end.
    pub persist_key: Option<String>,
    /// Definition id for enemies; the reward settlement reads XP/gold/loot
    /// through it.
    pub enemy_def: Option<String>,
    pub(crate) defeat_announced: bool,
}

impl Combatant {
    pub fn from_member(id: CombatantId, member: &MemberSnapshot) -> Self {
        Self {
            id,
            name: member.name.clone(),
            side: member.side,
            hp: member.hp.clamp(0, member.stats.max_hp),
            mp: member.mp.clamp(0, member.stats.max_mp),
            base: member.stats,
            skills: member.skills.clone(),
            statuses: Vec::new(),
            player_controlled: member.player_controlled,
            leader: member.leader,
            guards_leader: member.guards_leader,
            equipped: member.equipped.clone(),
            persist_key: Some(member.key.clone()),
            enemy_def: None,
            defeat_announced: false,
        }
    }

    pub fn from_enemy(id: CombatantId, name: String, def: &EnemyDef) -> Self {
        Self {
            id,
            name,
            side: Side::Enemy,
            hp: def.stats.max_hp,
            mp: def.stats.max_mp,
            base: def.stats,
            skills: def.skills.clone(),
            statuses: Vec::new(),
            player_controlled: false,
            leader: false,
            guards_leader: false,
            equipped: Vec::new(),
            persist_key: None,
            enemy_def: Some(def.id.clone()),
            defeat_announced: false,
        }
    }

    pub fn alive(&self) -> bool {
        self.hp > 0
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.base.max_hp <= 0 {
            return 0.0;
        }
        self.hp as f64 / self.base.max_hp as f64
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.statuses.iter().any(|s| s.status == status)
    }

    /// Reduce HP, clamped at 0. Returns the actual amount lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp - amount.max(0)).max(0);
        before - self.hp
    }

    /// Restore HP, capped at `max_hp` (callers pass the effective max so
    /// buffed maxima are honored). Returns the actual amount gained.
    pub fn heal(&mut self, amount: i32, max_hp: i32) -> i32 {
        let before = self.hp;
        self.hp = (self.hp + amount.max(0)).min(max_hp);
        self.hp - before
    }

    /// Restore MP, capped at `max_mp`. Returns the actual amount gained.
    pub fn restore_mp(&mut self, amount: i32, max_mp: i32) -> i32 {
        let before = self.mp;
        self.mp = (self.mp + amount.max(0)).min(max_mp);
        self.mp - before
    }
}

/// Read-only snapshot of a persistent party member, supplied by the host's
/// character management at session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSnapshot {
    /// Persistent record key, echoed back in the settlement write-back.
    pub key: String,
    pub name: String,
    pub side: Side,
    pub stats: StatBlock,
    pub hp: i32,
    pub mp: i32,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub equipped: Vec<ItemCategory>,
    #[serde(default)]
    pub leader: bool,
    #[serde(default)]
    pub guards_leader: bool,
    #[serde(default)]
    pub player_controlled: bool,
}

/// One pre-instantiated enemy supplied by the encounter generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySpawn {
    /// `EnemyDef` id.
    pub def: String,
    /// Display name override, e.g. "Goblin B"; defaults to the definition name.
    #[serde(default)]
    pub name: Option<String>,
}
