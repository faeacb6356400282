use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use engine::{
    Action, CombatEvent, CombatOutcome, CombatSession, ContentLibrary, EnemySpawn, ItemCategory,
    MemberSnapshot, Side, StatBlock, StepOutcome,
};

#[derive(Parser)]
#[command(name = "combat", about = "Party combat engine demo driver")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run one auto-piloted battle and render the event stream
    Battle {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Encounter id from the content library
        #[arg(long, default_value = "goblin_ambush")]
        encounter: String,
        /// Delay between rendered steps, in milliseconds
        #[arg(long, default_value_t = 0)]
        pace_ms: u64,
        /// Extra content file (JSON or YAML) merged over the builtins
        #[arg(long)]
        content: Option<PathBuf>,
        /// Emit events as JSON lines instead of prose
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run many seeded battles and tally the outcomes
    Simulate {
        /// Base RNG seed; trial i runs with seed + i
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, default_value_t = 100)]
        trials: u64,
        #[arg(long, default_value = "goblin_ambush")]
        encounter: String,
    },
    /// List the loaded content definitions
    Content {
        /// Extra content file (JSON or YAML) merged over the builtins
        #[arg(long)]
        content: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    engine::init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Battle { seed, encounter, pace_ms, content, json } => {
            let library = load_library(content.as_deref())?;
            let outcome = run_battle(&library, &encounter, seed, pace_ms, json)?;
            println!("outcome: {outcome:?}");
            Ok(())
        }
        Cmd::Simulate { seed, trials, encounter } => {
            let library = load_library(None)?;
            let mut wins = 0u64;
            let mut losses = 0u64;
            let mut fled = 0u64;
            for i in 0..trials {
                match run_battle(&library, &encounter, seed + i, 0, false)? {
                    CombatOutcome::Victory => wins += 1,
                    CombatOutcome::Defeat => losses += 1,
                    CombatOutcome::Fled => fled += 1,
                }
            }
            println!(
                "{trials} battles vs `{encounter}`: {wins} wins, {losses} losses, {fled} fled"
            );
            Ok(())
        }
        Cmd::Content { content } => {
            let library = load_library(content.as_deref())?;
            println!("skills:");
            for skill in library.skills() {
                println!("  {:<16} mp {:>3}  {:?}", skill.id, skill.mp_cost, skill.tags);
            }
            println!("statuses:");
            for status in library.statuses() {
                println!("  {}", status.id);
            }
            println!("items:");
            for item in library.items() {
                println!("  {:<16} {:?}", item.id, item.effect);
            }
            println!("enemies:");
            for enemy in library.enemies() {
                println!("  {:<16} hp {:>3}  xp {:>3}", enemy.id, enemy.stats.max_hp, enemy.xp);
            }
            println!("encounters:");
            for encounter in library.encounters() {
                println!("  {:<16} {:?}", encounter.id, encounter.enemies);
            }
            Ok(())
        }
    }
}

fn load_library(extra: Option<&std::path::Path>) -> Result<ContentLibrary> {
    let mut library = ContentLibrary::builtin()?;
    if let Some(path) = extra {
        library.merge_path(path)?;
    }
    library.validate()?;
    Ok(library)
}

/// A fixed demo party: a leading hero, a guardian, and a mage.
fn sample_party() -> Vec<MemberSnapshot> {
    vec![
        MemberSnapshot {
            key: "hero".into(),
            name: "Arin".into(),
            side: Side::Player,
            stats: StatBlock {
                max_hp: 90, max_mp: 30,
                attack: 16, defense: 10, speed: 12,
                accuracy: 90, evasion: 10, crit_chance: 10,
            },
            hp: 90,
            mp: 30,
            skills: vec!["power_strike".into(), "cleave".into(), "focus".into()],
            equipped: vec![ItemCategory::Weapon, ItemCategory::Armor],
            leader: true,
            guards_leader: false,
            player_controlled: true,
        },
        MemberSnapshot {
            key: "guardian".into(),
            name: "Brakka".into(),
            side: Side::Ally,
            stats: StatBlock {
                max_hp: 120, max_mp: 20,
                attack: 13, defense: 14, speed: 7,
                accuracy: 85, evasion: 6, crit_chance: 5,
            },
            hp: 120,
            mp: 20,
            skills: vec!["provoke".into(), "iron_guard".into()],
            equipped: vec![ItemCategory::Weapon, ItemCategory::Armor],
            leader: false,
            guards_leader: true,
            player_controlled: false,
        },
        MemberSnapshot {
            key: "mage".into(),
            name: "Sylva".into(),
            side: Side::Ally,
            stats: StatBlock {
                max_hp: 64, max_mp: 48,
                attack: 14, defense: 6, speed: 10,
                accuracy: 88, evasion: 9, crit_chance: 6,
            },
            hp: 64,
            mp: 48,
            skills: vec!["twin_bolt".into(), "inferno".into(), "mend".into(), "iron_guard".into()],
            equipped: vec![ItemCategory::Accessory],
            leader: false,
            guards_leader: false,
            player_controlled: false,
        },
    ]
}

fn spawn_group(library: &ContentLibrary, encounter: &str) -> Result<Vec<EnemySpawn>> {
    let def = library
        .encounter(encounter)
        .ok_or_else(|| anyhow::anyhow!("unknown encounter `{encounter}`"))?;
    let suffixes = ["A", "B", "C", "D", "E", "F"];
    let spawns = def
        .enemies
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let base = library.enemy(id).map(|e| e.name.clone()).unwrap_or_else(|| id.clone());
            let name = if def.enemies.len() > 1 {
                format!("{} {}", base, suffixes.get(i).copied().unwrap_or("X"))
            } else {
                base
            };
            EnemySpawn { def: id.clone(), name: Some(name) }
        })
        .collect();
    Ok(spawns)
}

/// Drive one battle to completion. Player turns are auto-piloted through the
/// ally policy so the demo needs no interactive input; pacing delays happen
/// here, around step boundaries. The engine itself never sleeps.
fn run_battle(
    library: &ContentLibrary,
    encounter: &str,
    seed: u64,
    pace_ms: u64,
    json: bool,
) -> Result<CombatOutcome> {
    let enemies = spawn_group(library, encounter)?;
    let inventory = vec![("potion".to_string(), 3u32), ("antidote".to_string(), 1u32)];
    let mut session = CombatSession::start(
        library,
        &sample_party(),
        &enemies,
        &inventory,
        Some(encounter.to_string()),
        seed,
    )?;

    let quiet = pace_ms == 0 && !json;
    loop {
        let outcome = session.run_until_blocked(library);
        render_events(&mut session, json, quiet, pace_ms);
        match outcome {
            StepOutcome::AwaitingPlayer(actor) => {
                let action = session
                    .suggest_action(library)
                    .unwrap_or(Action::Pass { caster: actor });
                session.submit(library, action);
                render_events(&mut session, json, quiet, pace_ms);
            }
            StepOutcome::Ended(outcome) => {
                if let Some(settlement) = session.settlement() {
                    if !quiet {
                        for survivor in &settlement.survivors {
                            println!(
                                "  [writeback] {}: hp {} mp {}",
                                survivor.key, survivor.hp, survivor.mp
                            );
                        }
                    }
                }
                return Ok(outcome);
            }
            StepOutcome::Progressed => {}
        }
    }
}

fn render_events(session: &mut CombatSession, json: bool, quiet: bool, pace_ms: u64) {
    for event in session.drain_events() {
        if json {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
        } else if !quiet {
            render_event(&event);
        }
        if pace_ms > 0 {
            thread::sleep(Duration::from_millis(pace_ms));
        }
    }
}

fn render_event(event: &CombatEvent) {
    match event {
        CombatEvent::SessionStarted { encounter } => {
            println!("[START] {}", encounter.as_deref().unwrap_or("battle"));
        }
        CombatEvent::RoundAdvanced { round } => println!("[ROUND] {round}"),
        CombatEvent::TurnAdvanced { .. } => {}
        CombatEvent::AwaitingPlayerAction { actor } => println!("[INPUT] waiting on {actor}"),
        CombatEvent::TargetSelectionRequest { prompt, candidates, .. } => {
            println!("[TARGET] {prompt}: {candidates:?}");
        }
        CombatEvent::SessionEnded { outcome, rewards } => {
            println!("[END] {outcome:?}");
            if let Some(rewards) = rewards {
                println!(
                    "  [rewards] {} xp, {} gold, loot: {:?}",
                    rewards.xp, rewards.gold, rewards.loot
                );
            }
        }
        CombatEvent::Message(entry) => println!("  {}", entry.text),
    }
}
