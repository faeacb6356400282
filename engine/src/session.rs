//! The combat session controller: owns the combatant arena, turn order and
//! round counter, drives the loop, and settles the outcome. `step` is a pure
//! synchronous state transition; all pacing and rendering belongs to the
//! host draining the event buffer between steps.

use anyhow::{Result, bail};
use indexmap::IndexMap;
use tracing::debug;

use crate::combatant::{Arena, Combatant, CombatantId, EnemySpawn, Faction, MemberSnapshot, Side};
use crate::content::ContentLibrary;
use crate::events::{CombatEvent, CombatOutcome, LogEntry, Rewards, Settlement, Writeback};
use crate::targeting::{self, TargetShape};
use crate::{Dice, actions, ai, status};
use crate::actions::{Action, ActionError};

/// Result of driving the session one iteration forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The loop moved; call `step` again.
    Progressed,
    /// A player-controlled actor is up; the session suspends until `submit`.
    AwaitingPlayer(CombatantId),
    Ended(CombatOutcome),
}

/// A player's partially-built action while they pick a target. Cancelling it
/// reopens the action menu without consuming the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingChoice {
    Attack,
    Skill(String),
    Item(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingAction {
    pub actor: CombatantId,
    pub choice: PendingChoice,
}

pub struct CombatSession {
    pub(crate) combatants: Arena,
    pub(crate) inventory: IndexMap<String, u32>,
    pub(crate) turn_order: Vec<CombatantId>,
    pub(crate) turn_index: usize,
    pub(crate) round: u32,
    pub(crate) active: bool,
    pub(crate) awaiting: Option<CombatantId>,
    pub(crate) pending: Option<PendingAction>,
    pub(crate) encounter: Option<String>,
    pub(crate) dice: Dice,
    pub(crate) events: Vec<CombatEvent>,
    pub(crate) settlement: Option<Settlement>,
}

impl CombatSession {
    /// Snapshot the party and the supplied enemy group into a new session.
    /// Fainted party members are not snapshotted. The session is immediately
    /// steppable; nothing has acted yet.
    pub fn start(
        content: &ContentLibrary,
        party: &[MemberSnapshot],
        enemies: &[EnemySpawn],
        inventory: &[(String, u32)],
        encounter: Option<String>,
        seed: u64,
    ) -> Result<Self> {
        let mut arena = Arena::new();
        let mut next_id = 0u32;
        for member in party.iter().filter(|m| m.hp > 0) {
            if member.side == Side::Enemy {
                bail!("party snapshot `{}` is tagged as an enemy", member.key);
            }
            let id = CombatantId(next_id);
            next_id += 1;
            arena.insert(id, Combatant::from_member(id, member));
        }
        if arena.is_empty() {
            bail!("cannot start combat without a living party member");
        }
        for spawn in enemies {
            let Some(def) = content.enemy(&spawn.def) else {
                bail!("unknown enemy definition `{}`", spawn.def);
            };
            let id = CombatantId(next_id);
            next_id += 1;
            let name = spawn.name.clone().unwrap_or_else(|| def.name.clone());
            arena.insert(id, Combatant::from_enemy(id, name, def));
        }
        if !arena.values().any(|c| c.side == Side::Enemy) {
            bail!("cannot start combat without enemies");
        }

        let mut session = Self {
            combatants: arena,
            inventory: inventory.iter().cloned().collect(),
            turn_order: Vec::new(),
            turn_index: 0,
            round: 1,
            active: true,
            awaiting: None,
            pending: None,
            encounter: encounter.clone(),
            dice: Dice::from_seed(seed),
            events: Vec::new(),
            settlement: None,
        };
        session.compute_turn_order(content);
        session.events.push(CombatEvent::SessionStarted { encounter });
        debug!(round = session.round, combatants = session.combatants.len(), "session started");
        Ok(session)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn turn_order(&self) -> &[CombatantId] {
        &self.turn_order
    }

    pub fn current_actor(&self) -> Option<CombatantId> {
        self.turn_order.get(self.turn_index).copied()
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// Read-only view over every combatant, in roster order. Fainted
    /// combatants stay visible here even after leaving the turn order.
    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    pub fn inventory(&self) -> impl Iterator<Item = (&str, u32)> {
        self.inventory.iter().map(|(id, count)| (id.as_str(), *count))
    }

    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    /// The in-progress target selection, if any.
    pub fn pending_choice(&self) -> Option<(CombatantId, &PendingChoice)> {
        self.pending.as_ref().map(|p| (p.actor, &p.choice))
    }

    /// Hand the buffered notifications to the host.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Descending effective speed, stable: equal speeds keep roster order,
    /// party before enemies. Recomputed at every round boundary.
    fn compute_turn_order(&mut self, content: &ContentLibrary) {
        let mut order: Vec<(CombatantId, i32)> = self
            .combatants
            .values()
            .filter(|c| c.alive())
            .map(|c| (c.id, status::effective_stats(c, content).speed))
            .collect();
        order.sort_by(|a, b| b.1.cmp(&a.1));
        self.turn_order = order.into_iter().map(|(id, _)| id).collect();
    }

    /// One iteration of the combat loop. Never blocks, never sleeps.
    pub fn step(&mut self, content: &ContentLibrary) -> StepOutcome {
        if !self.active {
            let outcome = self
                .settlement
                .as_ref()
                .map(|s| s.outcome)
                .unwrap_or(CombatOutcome::Defeat);
            return StepOutcome::Ended(outcome);
        }
        if let Some(outcome) = self.check_end(content) {
            return StepOutcome::Ended(outcome);
        }
        // Already suspended on a player: stepping again must not re-run the
        // turn preamble (status ticks are once per turn).
        if let Some(actor) = self.awaiting {
            return StepOutcome::AwaitingPlayer(actor);
        }

        if self.turn_index >= self.turn_order.len() {
            self.turn_index = 0;
            self.round += 1;
            self.compute_turn_order(content);
            self.events.push(CombatEvent::RoundAdvanced { round: self.round });
            debug!(round = self.round, "round advanced");
            return StepOutcome::Progressed;
        }

        let Some(actor) = self.current_actor() else {
            return StepOutcome::Progressed;
        };
        self.events.push(CombatEvent::TurnAdvanced { actor });

        // Read before the tick: a stun applied with duration 1 expires on
        // this very tick but still costs the victim the turn.
        let blocked = self
            .combatants
            .get(&actor)
            .is_some_and(|c| status::blocks_turn(c, content));
        if blocked {
            let name = self.combatants[&actor].name.clone();
            self.events.push(CombatEvent::Message(
                LogEntry::note(format!("{name} is stunned and cannot act!")).actor(actor),
            ));
        }

        // Per-round status tick for the actor, before its turn resolves.
        {
            let CombatSession { combatants, events, .. } = self;
            if let Some(combatant) = combatants.get_mut(&actor) {
                status::tick_statuses(combatant, content, |entry| {
                    events.push(CombatEvent::Message(entry));
                });
            }
        }
        self.sweep_defeated();
        if let Some(outcome) = self.check_end(content) {
            return StepOutcome::Ended(outcome);
        }
        let actor_alive = self.combatants.get(&actor).is_some_and(|c| c.alive());
        if !actor_alive {
            // The sweep already removed the actor from the order; the index
            // now points at the next combatant.
            return StepOutcome::Progressed;
        }

        if blocked {
            self.advance();
            return StepOutcome::Progressed;
        }

        if self.combatants[&actor].player_controlled {
            self.awaiting = Some(actor);
            self.events.push(CombatEvent::AwaitingPlayerAction { actor });
            return StepOutcome::AwaitingPlayer(actor);
        }

        let action = ai::decide(&self.combatants, content, &mut self.dice, actor);
        match actions::resolve(self, content, &action) {
            Ok(report) => self.after_success(content, actor, report),
            Err(err) => {
                // AI turns never stall: a failed action is a forfeited turn.
                debug!(actor = %actor, %err, "ai action failed; advancing");
                self.advance();
                StepOutcome::Progressed
            }
        }
    }

    /// Drive the loop until player input is needed or the session ends.
    pub fn run_until_blocked(&mut self, content: &ContentLibrary) -> StepOutcome {
        loop {
            match self.step(content) {
                StepOutcome::Progressed => continue,
                outcome => return outcome,
            }
        }
    }

    /// Submit the awaited player action. Out-of-turn submissions are
    /// rejected without touching session state; a failed action re-prompts
    /// the player with the turn unconsumed.
    pub fn submit(&mut self, content: &ContentLibrary, action: Action) -> StepOutcome {
        if !self.active {
            let outcome = self
                .settlement
                .as_ref()
                .map(|s| s.outcome)
                .unwrap_or(CombatOutcome::Defeat);
            return StepOutcome::Ended(outcome);
        }
        let Some(awaited) = self.awaiting else {
            // Nobody is awaited: stale submission, force the loop onward.
            return self.run_until_blocked(content);
        };
        if action.caster() != awaited {
            self.events.push(CombatEvent::AwaitingPlayerAction { actor: awaited });
            return StepOutcome::AwaitingPlayer(awaited);
        }

        match actions::resolve(self, content, &action) {
            Ok(report) => {
                self.awaiting = None;
                self.pending = None;
                match self.after_success(content, awaited, report) {
                    StepOutcome::Progressed => self.run_until_blocked(content),
                    outcome => outcome,
                }
            }
            Err(err) => {
                let name = self.combatants.get(&awaited).map(|c| c.name.clone()).unwrap_or_default();
                self.events.push(CombatEvent::Message(
                    LogEntry::note(format!("{name} cannot do that: {err}")).actor(awaited),
                ));
                self.events.push(CombatEvent::AwaitingPlayerAction { actor: awaited });
                StepOutcome::AwaitingPlayer(awaited)
            }
        }
    }

    /// What the ally policy would do for the awaited player. Hosts use this
    /// for an "auto" battle command; it consumes dice rolls, so calling it
    /// and then submitting something else changes the replay.
    pub fn suggest_action(&mut self, content: &ContentLibrary) -> Option<Action> {
        let actor = self.awaiting?;
        Some(ai::decide(&self.combatants, content, &mut self.dice, actor))
    }

    /// Record that the awaited player picked an action needing a target, and
    /// publish the candidate list for the host's selection menu.
    pub fn begin_target_selection(
        &mut self,
        content: &ContentLibrary,
        choice: PendingChoice,
    ) -> Result<(), ActionError> {
        let Some(actor) = self.awaiting else {
            return Err(ActionError::OutOfTurn);
        };
        let (label, shape) = match &choice {
            PendingChoice::Attack => ("Attack".to_string(), TargetShape::SingleEnemy),
            PendingChoice::Skill(id) => {
                let def = content
                    .skill(id)
                    .ok_or_else(|| ActionError::UnknownSkill(id.clone()))?;
                (def.name.clone(), def.target)
            }
            PendingChoice::Item(id) => {
                let def = content
                    .item(id)
                    .ok_or_else(|| ActionError::UnknownItem(id.clone()))?;
                (def.name.clone(), def.target)
            }
        };
        let candidates = targeting::candidate_pool(&self.combatants, shape, actor);
        self.pending = Some(PendingAction { actor, choice });
        self.events.push(CombatEvent::TargetSelectionRequest {
            actor,
            prompt: format!("Choose a target for {label}"),
            candidates,
        });
        Ok(())
    }

    /// Abandon an in-progress target selection: the action menu reopens for
    /// the same actor, no turn consumed, no state changed.
    pub fn cancel_pending(&mut self) {
        if self.pending.take().is_some() {
            if let Some(actor) = self.awaiting {
                self.events.push(CombatEvent::AwaitingPlayerAction { actor });
            }
        }
    }

    /// Bookkeeping after any successfully resolved action.
    fn after_success(
        &mut self,
        content: &ContentLibrary,
        actor: CombatantId,
        report: actions::ActionReport,
    ) -> StepOutcome {
        if report.offensive {
            let CombatSession { combatants, events, .. } = self;
            if let Some(combatant) = combatants.get_mut(&actor) {
                status::strip_guaranteed_crit(combatant, content, |entry| {
                    events.push(CombatEvent::Message(entry));
                });
            }
        }
        if report.fled {
            self.settle(content, CombatOutcome::Fled);
            return StepOutcome::Ended(CombatOutcome::Fled);
        }
        self.advance();
        self.sweep_defeated();
        if let Some(outcome) = self.check_end(content) {
            return StepOutcome::Ended(outcome);
        }
        StepOutcome::Progressed
    }

    fn advance(&mut self) {
        self.turn_index += 1;
    }

    /// Announce and drop newly fainted combatants. Each defeat message is
    /// emitted exactly once; the record itself stays in the arena at 0 HP.
    fn sweep_defeated(&mut self) {
        let mut defeated = Vec::new();
        for combatant in self.combatants.values_mut() {
            if combatant.hp <= 0 && !combatant.defeat_announced {
                combatant.defeat_announced = true;
                defeated.push((combatant.id, combatant.name.clone()));
            }
        }
        for (id, name) in defeated {
            self.events
                .push(CombatEvent::Message(LogEntry::note(format!("{name} is defeated!")).target(id)));
            if let Some(pos) = self.turn_order.iter().position(|&x| x == id) {
                self.turn_order.remove(pos);
                if pos < self.turn_index {
                    self.turn_index -= 1;
                }
            }
        }
    }

    /// No living enemy means victory; no living party member means defeat.
    fn check_end(&mut self, content: &ContentLibrary) -> Option<CombatOutcome> {
        if !self.active {
            return self.settlement.as_ref().map(|s| s.outcome);
        }
        let enemies_alive = self
            .combatants
            .values()
            .any(|c| c.alive() && c.side.faction() == Faction::Enemies);
        let party_alive = self
            .combatants
            .values()
            .any(|c| c.alive() && c.side.faction() == Faction::Party);
        if !enemies_alive {
            self.settle(content, CombatOutcome::Victory);
            Some(CombatOutcome::Victory)
        } else if !party_alive {
            self.settle(content, CombatOutcome::Defeat);
            Some(CombatOutcome::Defeat)
        } else {
            None
        }
    }

    /// Terminal settlement: write-back list for surviving party members,
    /// aggregated rewards on a win, and the session-ended notification.
    fn settle(&mut self, content: &ContentLibrary, outcome: CombatOutcome) {
        if self.settlement.is_some() {
            return;
        }

        let rewards = if outcome == CombatOutcome::Victory {
            let mut rewards = Rewards::default();
            let defeated: Vec<String> = self
                .combatants
                .values()
                .filter(|c| c.side == Side::Enemy && !c.alive())
                .filter_map(|c| c.enemy_def.clone())
                .collect();
            for def_id in defeated {
                let Some(def) = content.enemy(&def_id) else { continue };
                rewards.xp += def.xp;
                rewards.gold += def.gold;
                for entry in &def.loot {
                    if self.dice.chance(entry.chance) {
                        rewards.loot.push(entry.item.clone());
                    }
                }
            }
            Some(rewards)
        } else {
            None
        };

        let survivors: Vec<Writeback> = self
            .combatants
            .values()
            .filter(|c| c.alive() && c.side.faction() == Faction::Party)
            .filter_map(|c| {
                c.persist_key.as_ref().map(|key| Writeback {
                    key: key.clone(),
                    hp: c.hp,
                    mp: c.mp,
                })
            })
            .collect();

        if outcome == CombatOutcome::Defeat {
            self.events.push(CombatEvent::Message(LogEntry::note("The party has fallen...")));
        }
        self.events.push(CombatEvent::SessionEnded { outcome, rewards: rewards.clone() });
        debug!(?outcome, "session ended");

        self.settlement = Some(Settlement {
            outcome,
            rewards,
            survivors,
            inventory: self.inventory.iter().map(|(id, n)| (id.clone(), *n)).collect(),
        });
        self.active = false;
        self.awaiting = None;
        self.pending = None;
    }
}
