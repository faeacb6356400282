//! Decision policies against hand-built arenas: the enemy coin flip, the
//! ally priority ladder and the shared focus rule.

mod common;

use common::{fixture_library, member};
use engine::ai::{decide, lowest_hp_ratio};
use engine::{Action, Arena, Combatant, CombatantId, Dice, MemberSnapshot, Side};

fn build_arena(members: Vec<MemberSnapshot>) -> Arena {
    let mut arena = Arena::new();
    for (i, m) in members.into_iter().enumerate() {
        let id = CombatantId(i as u32);
        arena.insert(id, Combatant::from_member(id, &m));
    }
    arena
}

#[test]
fn lowest_hp_ratio_prefers_the_weakest_then_roster_order() {
    let mut arena = build_arena(vec![
        member("a", Side::Enemy, 5),
        member("b", Side::Enemy, 5),
        member("c", Side::Enemy, 5),
    ]);
    let ids = [CombatantId(0), CombatantId(1), CombatantId(2)];
    // All full: the tie goes to the first in roster order.
    assert_eq!(lowest_hp_ratio(&arena, &ids), Some(ids[0]));

    arena.get_mut(&ids[2]).unwrap().hp = 30;
    assert_eq!(lowest_hp_ratio(&arena, &ids), Some(ids[2]));

    // The dead are no focus at all.
    arena.get_mut(&ids[2]).unwrap().hp = 0;
    assert_eq!(lowest_hp_ratio(&arena, &ids), Some(ids[0]));
}

#[test]
fn skill_less_enemy_always_attacks_the_weakest() {
    let library = fixture_library();
    let mut hurt = member("hurt", Side::Ally, 5);
    hurt.hp = 40;
    let arena = build_arena(vec![
        member("hero", Side::Player, 10),
        hurt,
        member("foe", Side::Enemy, 5),
    ]);
    let mut dice = Dice::from_seed(1);
    let action = decide(&arena, &library, &mut dice, CombatantId(2));
    assert_eq!(
        action,
        Action::Attack { caster: CombatantId(2), target: Some(CombatantId(1)) }
    );
}

#[test]
fn broke_enemy_cannot_pick_a_skill() {
    let library = fixture_library();
    let mut foe = member("foe", Side::Enemy, 5);
    foe.skills = vec!["bolt".into()];
    foe.mp = 0;
    let arena = build_arena(vec![member("hero", Side::Player, 10), foe]);
    // Whatever the coin flip says, an unaffordable skill is off the table.
    for seed in 0..20 {
        let mut dice = Dice::from_seed(seed);
        let action = decide(&arena, &library, &mut dice, CombatantId(1));
        assert!(matches!(action, Action::Attack { .. }), "got {action:?}");
    }
}

#[test]
fn enemy_with_a_skill_casts_it_about_half_the_time() {
    let library = fixture_library();
    let mut foe = member("foe", Side::Enemy, 5);
    foe.skills = vec!["bolt".into()];
    let arena = build_arena(vec![member("hero", Side::Player, 10), foe]);
    let mut dice = Dice::from_seed(2);
    let casts = (0..1000)
        .filter(|_| {
            matches!(
                decide(&arena, &library, &mut dice, CombatantId(1)),
                Action::Skill { .. }
            )
        })
        .count();
    let rate = casts as f64 / 1000.0;
    assert!((0.43..0.57).contains(&rate), "cast rate {rate} off the coin flip");
}

#[test]
fn ally_buffs_the_leader_in_danger_first() {
    let library = fixture_library();
    let mut leader = member("leader", Side::Player, 10);
    leader.leader = true;
    leader.hp = 20; // 20% of 100, under the rescue threshold
    let mut support = member("support", Side::Ally, 8);
    support.skills = vec!["bolt".into(), "rampart".into()];
    let arena = build_arena(vec![leader, support, member("foe", Side::Enemy, 5)]);
    let mut dice = Dice::from_seed(1);
    let action = decide(&arena, &library, &mut dice, CombatantId(1));
    assert_eq!(
        action,
        Action::Skill {
            caster: CombatantId(1),
            skill: "rampart".into(),
            target: Some(CombatantId(0)),
        }
    );
}

#[test]
fn ally_skips_a_buff_the_leader_already_has() {
    let library = fixture_library();
    let mut leader = member("leader", Side::Player, 10);
    leader.leader = true;
    leader.hp = 20;
    let mut support = member("support", Side::Ally, 8);
    support.skills = vec!["rampart".into()];
    let mut arena = build_arena(vec![leader, support, member("foe", Side::Enemy, 5)]);

    // Pre-apply the buff: the rescue rule has nothing left to add and the
    // ladder falls through to a plain attack.
    engine::status::apply_status(
        arena.get_mut(&CombatantId(0)).unwrap(),
        &library,
        "bulwark",
        3,
        CombatantId(1),
        |_| {},
    );
    let mut dice = Dice::from_seed(1);
    let action = decide(&arena, &library, &mut dice, CombatantId(1));
    assert!(matches!(action, Action::Attack { .. }), "got {action:?}");
}

#[test]
fn ally_controls_the_crowd_when_outnumbered() {
    let library = fixture_library();
    let mut support = member("support", Side::Ally, 8);
    support.skills = vec!["daze_bolt".into()];
    let arena = build_arena(vec![
        member("hero", Side::Player, 10),
        support,
        member("foe_a", Side::Enemy, 5),
        member("foe_b", Side::Enemy, 5),
    ]);
    let mut dice = Dice::from_seed(1);
    let action = decide(&arena, &library, &mut dice, CombatantId(1));
    assert_eq!(
        action,
        Action::Skill {
            caster: CombatantId(1),
            skill: "daze_bolt".into(),
            target: Some(CombatantId(2)),
        }
    );
}

#[test]
fn ally_prefers_the_strongest_affordable_nuke() {
    let library = fixture_library();
    let mut support = member("support", Side::Ally, 8);
    // bolt estimates 20, nova 12, blade_arc 1.5 * attack 10 = 15.
    support.skills = vec!["nova".into(), "blade_arc".into(), "bolt".into()];
    let arena = build_arena(vec![
        member("hero", Side::Player, 10),
        support,
        member("foe", Side::Enemy, 5),
    ]);
    let mut dice = Dice::from_seed(1);
    let action = decide(&arena, &library, &mut dice, CombatantId(1));
    assert_eq!(
        action,
        Action::Skill {
            caster: CombatantId(1),
            skill: "bolt".into(),
            target: Some(CombatantId(2)),
        }
    );
}

#[test]
fn ally_with_no_usable_skill_attacks() {
    let library = fixture_library();
    let mut support = member("support", Side::Ally, 8);
    support.skills = vec!["blade_arc".into()];
    support.equipped.clear(); // the gate makes the skill unusable
    let arena = build_arena(vec![
        member("hero", Side::Player, 10),
        support,
        member("foe", Side::Enemy, 5),
    ]);
    let mut dice = Dice::from_seed(1);
    let action = decide(&arena, &library, &mut dice, CombatantId(1));
    assert_eq!(
        action,
        Action::Attack { caster: CombatantId(1), target: Some(CombatantId(2)) }
    );
}

#[test]
fn nobody_left_to_fight_means_pass() {
    let library = fixture_library();
    let mut arena = build_arena(vec![
        member("hero", Side::Player, 10),
        member("foe", Side::Enemy, 5),
    ]);
    arena.get_mut(&CombatantId(1)).unwrap().hp = 0;
    let mut dice = Dice::from_seed(1);
    let action = decide(&arena, &library, &mut dice, CombatantId(0));
    assert_eq!(action, Action::Pass { caster: CombatantId(0) });
}
