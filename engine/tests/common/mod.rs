//! Shared fixtures: a small deterministic content set and snapshot builders.
//! The fixture skills roll no hit check and the fixture combatants have zero
//! crit chance, so damage numbers are exact.
#![allow(dead_code)]

use engine::{
    CombatSession, ContentLibrary, EnemySpawn, ItemCategory, MemberSnapshot, Side, StatBlock,
};

pub const FIXTURE_CONTENT: &str = r#"{
  "statuses": [
    { "id": "venom", "name": "Venom",
      "tick": { "kind": "damage", "amount": 3 } },
    { "id": "mending", "name": "Mending",
      "tick": { "kind": "heal", "amount": 4 } },
    { "id": "daze", "name": "Daze", "blocks_turn": true },
    { "id": "sapped", "name": "Sapped",
      "modifiers": [ { "stat": "attack", "mult": 0.5 } ] },
    { "id": "bulwark", "name": "Bulwark",
      "modifiers": [ { "stat": "defense", "mult": 2.0 } ] },
    { "id": "swiftness", "name": "Swiftness",
      "modifiers": [ { "stat": "speed", "add": 50 } ] },
    { "id": "deadeye", "name": "Deadeye", "guaranteed_crit": true }
  ],
  "skills": [
    { "id": "bolt", "name": "Bolt", "mp_cost": 4, "target": "single_enemy",
      "tags": ["attack"],
      "effects": [ { "kind": "damage", "base": { "fixed": { "power": 20 } } } ] },
    { "id": "nova", "name": "Nova", "mp_cost": 8, "target": "all_enemies",
      "tags": ["attack"],
      "effects": [ { "kind": "damage", "base": { "fixed": { "power": 12 } } } ] },
    { "id": "shatter", "name": "Shatter", "mp_cost": 6,
      "target": "single_enemy_splash", "tags": ["attack"],
      "effects": [ { "kind": "damage",
                     "base": { "fixed": { "power": 20 } }, "splash": 0.5 } ] },
    { "id": "twin_shot", "name": "Twin Shot", "mp_cost": 5, "target": "aoe_2",
      "tags": ["attack"],
      "effects": [ { "kind": "damage", "base": { "fixed": { "power": 10 } } } ] },
    { "id": "soothe", "name": "Soothe", "mp_cost": 4, "target": "single_ally",
      "tags": ["heal"],
      "effects": [ { "kind": "heal", "amount": 25 } ] },
    { "id": "envenom", "name": "Envenom", "mp_cost": 3, "target": "single_enemy",
      "tags": ["debuff"],
      "effects": [ { "kind": "status", "status": "venom", "duration": 2 } ] },
    { "id": "sap", "name": "Sap", "mp_cost": 3, "target": "single_enemy",
      "tags": ["debuff"],
      "effects": [ { "kind": "status", "status": "sapped", "duration": 3 } ] },
    { "id": "daze_bolt", "name": "Daze Bolt", "mp_cost": 5, "target": "single_enemy",
      "tags": ["attack", "crowd_control"],
      "effects": [ { "kind": "damage", "base": { "fixed": { "power": 8 } } },
                   { "kind": "status", "status": "daze", "duration": 2 } ] },
    { "id": "flash", "name": "Flash", "mp_cost": 3, "target": "single_enemy",
      "tags": ["debuff", "crowd_control"],
      "effects": [ { "kind": "status", "status": "daze", "duration": 1 } ] },
    { "id": "rampart", "name": "Rampart", "mp_cost": 4, "target": "single_ally",
      "tags": ["buff"],
      "effects": [ { "kind": "status", "status": "bulwark", "duration": 3 } ] },
    { "id": "take_aim", "name": "Take Aim", "mp_cost": 2, "target": "self",
      "tags": ["buff"],
      "effects": [ { "kind": "status", "status": "deadeye", "duration": 3 } ] },
    { "id": "quicken", "name": "Quicken", "mp_cost": 3, "target": "single_ally",
      "tags": ["buff"],
      "effects": [ { "kind": "status", "status": "swiftness", "duration": 3 } ] },
    { "id": "blade_arc", "name": "Blade Arc", "mp_cost": 4, "target": "single_enemy",
      "tags": ["attack"], "requires_equipped": "weapon",
      "effects": [ { "kind": "damage",
                     "base": { "weapon": { "multiplier": 1.5 } } } ] },
    { "id": "followup", "name": "Follow-up", "mp_cost": 2, "target": "single_enemy",
      "tags": ["attack"], "requires_status": "deadeye",
      "effects": [ { "kind": "damage", "base": { "fixed": { "power": 15 } } } ] }
  ],
  "items": [
    { "id": "tonic", "name": "Tonic", "category": "consumable",
      "target": "single_ally", "effect": { "heal": 30 } },
    { "id": "mana_draught", "name": "Mana Draught", "category": "consumable",
      "target": "single_ally", "effect": { "restore_mp": 20 } },
    { "id": "purgative", "name": "Purgative", "category": "consumable",
      "target": "single_ally", "effect": { "cure_status": "venom" } },
    { "id": "panacea", "name": "Panacea", "category": "consumable",
      "target": "single_ally", "effect": { "cure_status": null } },
    { "id": "training_manual", "name": "Training Manual", "category": "consumable",
      "target": "single_ally", "effect": { "grant_sp": 1 } }
  ],
  "enemies": [
    { "id": "dummy", "name": "Training Dummy",
      "stats": { "max_hp": 100, "max_mp": 0, "attack": 0, "defense": 0,
                 "speed": 1, "accuracy": 0, "evasion": 0, "crit_chance": 0 },
      "xp": 7, "gold": 5,
      "loot": [ { "item": "tonic", "chance": 100 } ] },
    { "id": "brute", "name": "Brute",
      "stats": { "max_hp": 60, "max_mp": 10, "attack": 14, "defense": 4,
                 "speed": 6, "accuracy": 85, "evasion": 5, "crit_chance": 0 },
      "xp": 12, "gold": 9 }
  ],
  "encounters": [
    { "id": "drill", "enemies": ["dummy", "dummy"] }
  ]
}"#;

pub fn fixture_library() -> ContentLibrary {
    let mut lib = ContentLibrary::empty();
    lib.merge_json(FIXTURE_CONTENT).expect("fixture content parses");
    lib.validate().expect("fixture content is consistent");
    lib
}

pub fn member(key: &str, side: Side, speed: i32) -> MemberSnapshot {
    MemberSnapshot {
        key: key.to_string(),
        name: key.to_string(),
        side,
        stats: StatBlock {
            max_hp: 100,
            max_mp: 50,
            attack: 10,
            defense: 0,
            speed,
            accuracy: 100,
            evasion: 0,
            crit_chance: 0,
        },
        hp: 100,
        mp: 50,
        skills: Vec::new(),
        equipped: vec![ItemCategory::Weapon],
        leader: false,
        guards_leader: false,
        player_controlled: false,
    }
}

/// The fastest combatant in every fixture session: a player at speed 99, so
/// `run_until_blocked` suspends on them before anything else acts.
pub fn player(key: &str) -> MemberSnapshot {
    let mut m = member(key, Side::Player, 99);
    m.player_controlled = true;
    m
}

pub fn spawn(def: &str) -> EnemySpawn {
    EnemySpawn { def: def.to_string(), name: None }
}

#[allow(dead_code)]
pub fn start_session(
    library: &ContentLibrary,
    party: Vec<MemberSnapshot>,
    enemies: Vec<EnemySpawn>,
    inventory: &[(String, u32)],
    seed: u64,
) -> CombatSession {
    CombatSession::start(library, &party, &enemies, inventory, None, seed)
        .expect("session starts")
}

/// Id of the combatant whose name matches, looked up by roster scan.
#[allow(dead_code)]
pub fn id_of(session: &CombatSession, name: &str) -> engine::CombatantId {
    session
        .combatants()
        .find(|c| c.name == name)
        .map(|c| c.id)
        .unwrap_or_else(|| panic!("no combatant named {name}"))
}

/// Concatenated message text drained from the session, for log assertions.
#[allow(dead_code)]
pub fn drain_text(session: &mut CombatSession) -> String {
    session
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            engine::CombatEvent::Message(entry) => Some(entry.text),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
