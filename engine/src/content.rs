//! Static definitions consumed by the combat core: skills, status effects,
//! items, enemies and fixed encounter groups. Definitions are data, looked up
//! by id; the engine never mutates them.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::combatant::{Stat, StatBlock};
use crate::targeting::TargetShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillTag {
    Attack,
    Debuff,
    Buff,
    Heal,
    CrowdControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub stat: Stat,
    pub factor: f64,
}

/// How a damage sub-effect derives its base value, before the target's
/// defense is subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageBase {
    /// Flat power, optionally plus a scaling stat times a factor.
    Fixed {
        power: i32,
        #[serde(default)]
        scaling: Option<Scaling>,
    },
    /// The caster's attack times a multiplier, optionally plus a scaling bonus.
    Weapon {
        multiplier: f64,
        #[serde(default)]
        bonus: Option<Scaling>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectKind {
    Damage {
        base: DamageBase,
        /// When set and the struck target is the skill's original primary,
        /// roster-adjacent living neighbors take damage times this factor.
        #[serde(default)]
        splash: Option<f64>,
    },
    Heal {
        amount: i32,
        #[serde(default)]
        scaling: Option<Scaling>,
    },
    Status {
        status: String,
        duration: u32,
        /// Apply chance in percent; absent means always applies.
        #[serde(default)]
        chance: Option<i32>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEffect {
    /// Overrides the skill-level target shape for this sub-effect.
    #[serde(default)]
    pub target: Option<TargetShape>,
    #[serde(flatten)]
    pub kind: EffectKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mp_cost: i32,
    pub target: TargetShape,
    #[serde(default)]
    pub tags: Vec<SkillTag>,
    pub effects: Vec<SkillEffect>,
    /// The caster must have an item of this category equipped.
    #[serde(default)]
    pub requires_equipped: Option<ItemCategory>,
    /// The caster must currently carry this status.
    #[serde(default)]
    pub requires_status: Option<String>,
}

impl SkillDef {
    pub fn has_tag(&self, tag: SkillTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn deals_damage(&self) -> bool {
        self.effects.iter().any(|e| matches!(e.kind, EffectKind::Damage { .. }))
    }

    /// First status this skill applies, if any. Used by the AI to avoid
    /// re-casting a buff or taunt that is already up.
    pub fn applied_status(&self) -> Option<&str> {
        self.effects.iter().find_map(|e| match &e.kind {
            EffectKind::Status { status, .. } => Some(status.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    Damage,
    Heal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSpec {
    pub kind: TickKind,
    pub amount: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    pub stat: Stat,
    #[serde(default)]
    pub add: i32,
    #[serde(default = "one")]
    pub mult: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tick: Option<TickSpec>,
    #[serde(default)]
    pub modifiers: Vec<StatModifier>,
    /// The affected combatant loses its action while this is active.
    #[serde(default)]
    pub blocks_turn: bool,
    /// The next offensive action automatically crits; stripped afterwards.
    #[serde(default)]
    pub guaranteed_crit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Weapon,
    Armor,
    Accessory,
    Consumable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemEffect {
    Heal(i32),
    RestoreMp(i32),
    /// Remove one named status, or every status when `null`.
    CureStatus(Option<String>),
    /// Skill-point grants have no meaning mid-combat and are rejected there.
    GrantSp(i32),
}

impl ItemEffect {
    pub fn combat_usable(&self) -> bool {
        !matches!(self, ItemEffect::GrantSp(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: String,
    pub name: String,
    pub category: ItemCategory,
    pub target: TargetShape,
    pub effect: ItemEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub item: String,
    pub chance: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyDef {
    pub id: String,
    pub name: String,
    pub stats: StatBlock,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub xp: i32,
    #[serde(default)]
    pub gold: i32,
    #[serde(default)]
    pub loot: Vec<LootEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterDef {
    pub id: String,
    pub enemies: Vec<String>,
}

/// One merge unit of content: every section optional, later files win.
#[derive(Debug, Default, Deserialize)]
struct ContentFile {
    #[serde(default)]
    skills: Vec<SkillDef>,
    #[serde(default)]
    statuses: Vec<StatusDef>,
    #[serde(default)]
    items: Vec<ItemDef>,
    #[serde(default)]
    enemies: Vec<EnemyDef>,
    #[serde(default)]
    encounters: Vec<EncounterDef>,
}

/// Id-keyed lookup over every definition set.
#[derive(Debug, Default)]
pub struct ContentLibrary {
    skills: IndexMap<String, SkillDef>,
    statuses: IndexMap<String, StatusDef>,
    items: IndexMap<String, ItemDef>,
    enemies: IndexMap<String, EnemyDef>,
    encounters: IndexMap<String, EncounterDef>,
}

impl ContentLibrary {
    /// The content shipped with the engine.
    pub fn builtin() -> Result<Self> {
        let mut lib = Self::default();
        lib.merge_json(include_str!("../content/skills.json"))
            .context("builtin skills.json")?;
        lib.merge_json(include_str!("../content/statuses.json"))
            .context("builtin statuses.json")?;
        lib.merge_json(include_str!("../content/items.json"))
            .context("builtin items.json")?;
        lib.merge_json(include_str!("../content/enemies.json"))
            .context("builtin enemies.json")?;
        lib.merge_json(include_str!("../content/encounters.json"))
            .context("builtin encounters.json")?;
        Ok(lib)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge a JSON content document into the library.
    pub fn merge_json(&mut self, text: &str) -> Result<()> {
        let file: ContentFile = serde_json::from_str(text).context("failed to parse content JSON")?;
        self.merge(file);
        Ok(())
    }

    /// Merge a content file from disk; `.yaml`/`.yml` parse as YAML,
    /// everything else as JSON.
    pub fn merge_path(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read content file: {}", path.display()))?;
        let yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let file: ContentFile = if yaml {
            serde_yaml::from_str(&text)
                .with_context(|| format!("failed to parse content YAML: {}", path.display()))?
        } else {
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse content JSON: {}", path.display()))?
        };
        self.merge(file);
        Ok(())
    }

    fn merge(&mut self, file: ContentFile) {
        for s in file.skills {
            self.skills.insert(s.id.clone(), s);
        }
        for s in file.statuses {
            self.statuses.insert(s.id.clone(), s);
        }
        for i in file.items {
            self.items.insert(i.id.clone(), i);
        }
        for e in file.enemies {
            self.enemies.insert(e.id.clone(), e);
        }
        for e in file.encounters {
            self.encounters.insert(e.id.clone(), e);
        }
    }

    pub fn skill(&self, id: &str) -> Option<&SkillDef> {
        self.skills.get(id)
    }

    pub fn status(&self, id: &str) -> Option<&StatusDef> {
        self.statuses.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }

    pub fn enemy(&self, id: &str) -> Option<&EnemyDef> {
        self.enemies.get(id)
    }

    pub fn encounter(&self, id: &str) -> Option<&EncounterDef> {
        self.encounters.get(id)
    }

    pub fn skills(&self) -> impl Iterator<Item = &SkillDef> {
        self.skills.values()
    }

    pub fn statuses(&self) -> impl Iterator<Item = &StatusDef> {
        self.statuses.values()
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemDef> {
        self.items.values()
    }

    pub fn enemies(&self) -> impl Iterator<Item = &EnemyDef> {
        self.enemies.values()
    }

    pub fn encounters(&self) -> impl Iterator<Item = &EncounterDef> {
        self.encounters.values()
    }

    /// Referential sanity pass: every id mentioned by a definition resolves.
    pub fn validate(&self) -> Result<()> {
        for skill in self.skills.values() {
            for effect in &skill.effects {
                if let EffectKind::Status { status, .. } = &effect.kind {
                    if !self.statuses.contains_key(status) {
                        bail!("skill `{}` applies unknown status `{}`", skill.id, status);
                    }
                }
            }
            if let Some(required) = &skill.requires_status {
                if !self.statuses.contains_key(required) {
                    bail!("skill `{}` requires unknown status `{}`", skill.id, required);
                }
            }
        }
        for enemy in self.enemies.values() {
            for skill in &enemy.skills {
                if !self.skills.contains_key(skill) {
                    bail!("enemy `{}` knows unknown skill `{}`", enemy.id, skill);
                }
            }
            for drop in &enemy.loot {
                if !self.items.contains_key(&drop.item) {
                    bail!("enemy `{}` drops unknown item `{}`", enemy.id, drop.item);
                }
            }
        }
        for encounter in self.encounters.values() {
            for enemy in &encounter.enemies {
                if !self.enemies.contains_key(enemy) {
                    bail!("encounter `{}` spawns unknown enemy `{}`", encounter.id, enemy);
                }
            }
        }
        Ok(())
    }
}
