//! Skill resolution through the session: MP accounting, prerequisites,
//! multi-effect skills, splash and guaranteed crits. Fixture skills roll no
//! hit check, so every number here is exact.

mod common;

use common::{drain_text, fixture_library, id_of, member, player, spawn, start_session};
use engine::{Action, Side, StepOutcome};

fn submit_skill(
    session: &mut engine::CombatSession,
    library: &engine::ContentLibrary,
    skill: &str,
    target: Option<engine::CombatantId>,
) -> StepOutcome {
    let StepOutcome::AwaitingPlayer(actor) = session.run_until_blocked(library) else {
        panic!("expected the player to be awaited");
    };
    session.submit(
        library,
        Action::Skill { caster: actor, skill: skill.to_string(), target },
    )
}

#[test]
fn skill_damage_spends_mp_once_and_lands_exactly() {
    let library = fixture_library();
    let mut hero = player("hero");
    hero.skills = vec!["bolt".into()];
    let mut session = start_session(&library, vec![hero], vec![spawn("dummy")], &[], 3);
    let dummy = id_of(&session, "Training Dummy");

    submit_skill(&mut session, &library, "bolt", Some(dummy));
    let hero_id = id_of(&session, "hero");
    assert_eq!(session.combatant(hero_id).unwrap().mp, 46);
    assert_eq!(session.combatant(dummy).unwrap().hp, 80);
}

#[test]
fn insufficient_mp_reprompts_without_side_effects() {
    let library = fixture_library();
    let mut hero = player("hero");
    hero.skills = vec!["bolt".into()];
    hero.mp = 3;
    let mut session = start_session(&library, vec![hero], vec![spawn("dummy")], &[], 3);
    let dummy = id_of(&session, "Training Dummy");
    let hero_id = id_of(&session, "hero");

    let outcome = submit_skill(&mut session, &library, "bolt", Some(dummy));
    assert_eq!(outcome, StepOutcome::AwaitingPlayer(hero_id));
    assert_eq!(session.combatant(hero_id).unwrap().mp, 3);
    assert_eq!(session.combatant(dummy).unwrap().hp, 100);
    let text = drain_text(&mut session);
    assert!(text.contains("cannot do that"));
}

#[test]
fn equipment_gated_skill_needs_the_category() {
    let library = fixture_library();
    let mut hero = player("hero");
    hero.skills = vec!["blade_arc".into()];
    hero.equipped.clear();
    let mut session = start_session(&library, vec![hero], vec![spawn("dummy")], &[], 3);
    let hero_id = id_of(&session, "hero");

    let outcome = submit_skill(&mut session, &library, "blade_arc", None);
    assert_eq!(outcome, StepOutcome::AwaitingPlayer(hero_id));
    assert_eq!(session.combatant(hero_id).unwrap().mp, 50);
}

#[test]
fn status_gated_skill_crits_once_then_loses_the_buff() {
    let library = fixture_library();
    let mut hero = player("hero");
    hero.skills = vec!["take_aim".into(), "followup".into()];
    let mut session = start_session(&library, vec![hero], vec![spawn("dummy")], &[], 3);
    let dummy = id_of(&session, "Training Dummy");
    let hero_id = id_of(&session, "hero");

    // Without the aim buff the follow-up is rejected, nothing spent.
    let outcome = submit_skill(&mut session, &library, "followup", Some(dummy));
    assert_eq!(outcome, StepOutcome::AwaitingPlayer(hero_id));
    assert_eq!(session.combatant(hero_id).unwrap().mp, 50);

    // Buff up: supportive, so the crit charge survives the turn.
    submit_skill(&mut session, &library, "take_aim", None);
    assert!(session.combatant(hero_id).unwrap().has_status("deadeye"));

    // The follow-up auto-crits: 15 * 1.75 floored = 26, and the charge is
    // consumed by the offensive action.
    let hp_before = session.combatant(dummy).unwrap().hp;
    submit_skill(&mut session, &library, "followup", Some(dummy));
    assert_eq!(hp_before - session.combatant(dummy).unwrap().hp, 26);
    assert!(!session.combatant(hero_id).unwrap().has_status("deadeye"));
    let text = drain_text(&mut session);
    assert!(text.contains("critical hit"));
    assert!(text.contains("is spent"));
}

#[test]
fn splash_hits_roster_neighbors_at_the_factor() {
    let library = fixture_library();
    let mut hero = player("hero");
    hero.skills = vec!["shatter".into()];
    let mut session = start_session(
        &library,
        vec![hero],
        vec![spawn("dummy"), spawn("dummy"), spawn("dummy")],
        &[],
        3,
    );
    let ids: Vec<_> = session
        .combatants()
        .filter(|c| c.side == Side::Enemy)
        .map(|c| c.id)
        .collect();

    // 20 to the middle target, floor(20 * 0.5) = 10 to each neighbor.
    submit_skill(&mut session, &library, "shatter", Some(ids[1]));
    assert_eq!(session.combatant(ids[1]).unwrap().hp, 80);
    assert_eq!(session.combatant(ids[0]).unwrap().hp, 90);
    assert_eq!(session.combatant(ids[2]).unwrap().hp, 90);
}

#[test]
fn multi_effect_skill_applies_damage_then_status() {
    let library = fixture_library();
    let mut hero = player("hero");
    hero.skills = vec!["daze_bolt".into()];
    let mut session = start_session(&library, vec![hero], vec![spawn("dummy")], &[], 3);
    let dummy = id_of(&session, "Training Dummy");

    submit_skill(&mut session, &library, "daze_bolt", Some(dummy));
    assert_eq!(session.combatant(dummy).unwrap().hp, 92);
    assert!(session.combatant(dummy).unwrap().has_status("daze"));

    // The dazed dummy forfeits its next turn.
    session.run_until_blocked(&library);
    let text = drain_text(&mut session);
    assert!(text.contains("stunned"));
}

#[test]
fn one_turn_stun_costs_the_victim_exactly_one_action() {
    let library = fixture_library();
    let mut hero = player("hero");
    hero.skills = vec!["flash".into()];
    let mut session = start_session(&library, vec![hero], vec![spawn("dummy")], &[], 7);
    let dummy = id_of(&session, "Training Dummy");

    submit_skill(&mut session, &library, "flash", Some(dummy));
    assert!(session.combatant(dummy).unwrap().has_status("daze"));

    // The dummy's own tick expires the one-turn daze, but the turn is
    // still forfeited.
    let StepOutcome::AwaitingPlayer(actor) = session.run_until_blocked(&library) else {
        panic!("expected the player to be awaited");
    };
    let text = drain_text(&mut session);
    assert!(text.contains("stunned and cannot act"));
    assert!(text.contains("Daze wears off"));
    assert!(!session.combatant(dummy).unwrap().has_status("daze"));

    // Next round the dummy acts normally again.
    session.submit(&library, Action::Pass { caster: actor });
    session.run_until_blocked(&library);
    let text = drain_text(&mut session);
    assert!(text.contains("Training Dummy attacks"));
    assert!(!text.contains("stunned and cannot act"));
}

#[test]
fn whole_side_skill_needs_no_primary() {
    let library = fixture_library();
    let mut hero = player("hero");
    hero.skills = vec!["nova".into()];
    let mut session = start_session(
        &library,
        vec![hero],
        vec![spawn("dummy"), spawn("dummy")],
        &[],
        3,
    );
    submit_skill(&mut session, &library, "nova", None);
    for enemy in session.combatants().filter(|c| c.side == Side::Enemy) {
        assert_eq!(enemy.hp, 88);
    }
}

#[test]
fn heal_skill_caps_at_max_hp() {
    let library = fixture_library();
    let mut hero = player("hero");
    hero.skills = vec!["soothe".into()];
    hero.hp = 90;
    let mut session = start_session(&library, vec![hero], vec![spawn("dummy")], &[], 3);
    let hero_id = id_of(&session, "hero");

    // 25 healing against 10 missing: capped, the log reports the real gain.
    submit_skill(&mut session, &library, "soothe", Some(hero_id));
    assert_eq!(session.combatant(hero_id).unwrap().hp, 100);
    let text = drain_text(&mut session);
    assert!(text.contains("recovers 10 HP"));
}

#[test]
fn unknown_skill_is_rejected() {
    let library = fixture_library();
    let mut session = start_session(
        &library,
        vec![player("hero"), member("ally", Side::Ally, 5)],
        vec![spawn("dummy")],
        &[],
        3,
    );
    let hero_id = id_of(&session, "hero");
    let outcome = submit_skill(&mut session, &library, "meteor", None);
    assert_eq!(outcome, StepOutcome::AwaitingPlayer(hero_id));
    let text = drain_text(&mut session);
    assert!(text.contains("unknown skill"));
}
