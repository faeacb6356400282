use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub mod actions;
pub mod ai;
pub mod combatant;
pub mod content;
pub mod events;
pub mod session;
pub mod status;
pub mod targeting;

pub use actions::{Action, ActionError, ActionReport};
pub use combatant::{
    Arena, Combatant, CombatantId, EnemySpawn, Faction, MemberSnapshot, Side, Stat, StatBlock,
    StatusInstance,
};
pub use content::{
    ContentLibrary, DamageBase, EffectKind, EnemyDef, EncounterDef, ItemCategory, ItemDef,
    ItemEffect, LootEntry, Scaling, SkillDef, SkillEffect, SkillTag, StatModifier, StatusDef,
    TickKind, TickSpec,
};
pub use events::{CombatEvent, CombatOutcome, LogEntry, Rewards, Settlement, Writeback};
pub use session::{CombatSession, PendingChoice, StepOutcome};
pub use targeting::TargetShape;

/// Critical hits multiply the computed damage by this factor.
pub const CRIT_MULTIPLIER: f64 = 1.75;

/// All randomness in the engine funnels through one seeded generator so a
/// whole session replays identically from its seed.
pub struct Dice {
    rng: ChaCha8Rng,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Uniform roll in 1..=100.
    pub fn percent(&mut self) -> i32 {
        self.rng.gen_range(1..=100)
    }

    /// True with probability `pct`/100. Values outside 0..=100 saturate.
    pub fn chance(&mut self, pct: i32) -> bool {
        if pct <= 0 {
            return false;
        }
        if pct >= 100 {
            return true;
        }
        self.percent() <= pct
    }

    /// Damage jitter, uniform in [-0.10, 0.10).
    pub fn jitter(&mut self) -> f64 {
        self.rng.gen_range(-0.10..0.10)
    }

    /// Uniform index for a non-empty collection of length `len`.
    pub fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HitRoll {
    pub chance: i32,
    pub hit: bool,
}

/// Accuracy minus evasion, clamped to 5..=95 so nothing is a sure thing.
pub fn hit_chance(accuracy: i32, evasion: i32) -> i32 {
    (accuracy - evasion).clamp(5, 95)
}

pub fn hit_roll(dice: &mut Dice, accuracy: i32, evasion: i32) -> HitRoll {
    let chance = hit_chance(accuracy, evasion);
    HitRoll { chance, hit: dice.chance(chance) }
}

/// Escape chance: 60 plus the runner's speed edge over the enemy average,
/// clamped to 10..=90.
pub fn flee_chance(speed: i32, avg_enemy_speed: f64) -> i32 {
    let raw = 60.0 + speed as f64 - avg_enemy_speed;
    (raw.floor() as i32).clamp(10, 90)
}

/// Raw physical damage before the crit multiplier and the floor of 1:
/// attack with jitter, minus half the target's defense.
pub fn physical_damage(dice: &mut Dice, attack: i32, defense: i32) -> i32 {
    (attack as f64 * (1.0 + dice.jitter()) - defense as f64 / 2.0).floor() as i32
}

/// Apply the crit multiplier and clamp to a minimum of 1.
pub fn finalize_damage(raw: i32, crit: bool) -> i32 {
    let dealt = if crit { (raw as f64 * CRIT_MULTIPLIER).floor() as i32 } else { raw };
    dealt.max(1)
}

/// Install the default tracing subscriber (env-filtered). Safe to call twice.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
