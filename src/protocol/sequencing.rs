//! Update numbering, server validation and client replay
//!
//! The server owns the counter: each accepted batch produces exactly one
//! outgoing update numbered `update_counter + 1`. Clients stamp proposals
//! with the last id they have seen; a proposal older than the server's
//! counter is stale and changes nothing.

use ahash::AHashSet;

use crate::core::error::{ActionError, Result, TacticsError};
use crate::core::types::{PlayerId, UnitId};
use crate::entity::player::Player;
use crate::entity::unit::{PartialUnitStats, Unit};
use crate::map::hex::HexCoord;
use crate::protocol::update::{AttackInfo, PlayerUpdate, UnitAction, UnitUpdate, Update};
use crate::state::combat::AttackOutcome;
use crate::state::game_state::GameState;

impl GameState {
    // === CLIENT HELPERS ===

    /// Empty proposal stamped with the last update id this state has seen
    pub fn create_update(&self) -> Update {
        Update::new(self.update_counter)
    }

    pub fn unit_move(&self, update: &mut Update, unit: UnitId, path: Vec<HexCoord>) {
        update.push_unit(UnitUpdate::movement(unit, path));
    }

    pub fn unit_attack(&self, update: &mut Update, unit: UnitId, targets: Vec<UnitId>) {
        update.push_unit(UnitUpdate::attack(unit, targets));
    }

    pub fn unit_pass(&self, update: &mut Update, unit: UnitId) {
        update.push_unit(UnitUpdate::pass(unit));
    }

    pub fn end_turn(&self, update: &mut Update) {
        update.end_turn = true;
    }

    // === SERVER ===

    /// Full canonical description of this state
    ///
    /// Applying it to any replica built on the same map and creature
    /// registry reproduces this state exactly.
    pub fn snapshot(&self) -> Update {
        let mut update = Update::new(self.update_counter);
        update.snapshot = true;
        update.win_state = self.win_state;
        update.winning_team = self.winning_team;
        update.initiative_counter = Some(self.initiative_counter);
        update.teams = self.teams.values().cloned().collect();
        update.players = self.players.values().map(PlayerUpdate::full).collect();
        update.units = self
            .units
            .iter()
            .map(|unit| {
                UnitUpdate::new(
                    unit.id,
                    UnitAction::CanonicalState {
                        template: unit.template.id.clone(),
                        owner: unit.owner,
                    },
                )
                .with_stats(unit.full_stats())
            })
            .collect();
        update
    }

    /// Open the game: the first numbered update, carrying the full state
    pub fn begin(&mut self) -> Result<Update> {
        self.stamp_victory()?;
        self.update_counter += 1;
        let mut update = self.snapshot();
        update.game_start = true;
        tracing::info!(
            units = self.units.len(),
            players = self.players.len(),
            "game started"
        );
        Ok(update)
    }

    /// Validate a client proposal and apply whatever part of it is legal
    ///
    /// Returns `Ok(None)` for a stale proposal. Refused sub-actions are left
    /// out of the result and the first reason is reported in `failure`. A
    /// structural error aborts the whole batch and leaves the state as it
    /// was.
    pub fn validate_and_apply(&mut self, incoming: &Update) -> Result<Option<Update>> {
        if incoming.id < self.update_counter {
            tracing::warn!(
                incoming = incoming.id,
                current = self.update_counter,
                "stale update rejected"
            );
            return Ok(None);
        }

        let mut next = self.clone();
        let outgoing = next.process_batch(incoming)?;
        *self = next;
        Ok(Some(outgoing))
    }

    fn process_batch(&mut self, incoming: &Update) -> Result<Update> {
        self.update_counter += 1;
        let mut outgoing = Update::new(self.update_counter);
        let mut failures: Vec<ActionError> = Vec::new();
        let roster: AHashSet<UnitId> = self.units.iter().map(|unit| unit.id).collect();

        for request in &incoming.units {
            let result = match &request.action {
                UnitAction::Move { path } => self.dispatch_move(request.unit, path, &mut outgoing),
                UnitAction::Attack { targets } => {
                    self.dispatch_attack(request.unit, targets, &roster, &mut outgoing)
                }
                UnitAction::Pass => Ok(()),
                UnitAction::Spell | UnitAction::Summon => {
                    tracing::debug!(unit = ?request.unit, action = ?request.action, "action not supported, ignored");
                    Ok(())
                }
                UnitAction::CanonicalState { .. } => Err(ActionError::CanonicalFromClient.into()),
            };

            match result {
                Ok(()) => {}
                Err(TacticsError::Rejected(reason)) => {
                    tracing::warn!(unit = ?request.unit, %reason, "action rejected");
                    failures.push(reason);
                }
                Err(err) => return Err(err),
            }
        }

        if incoming.end_turn {
            self.end_unit_turn()?;
            outgoing.end_turn = true;
            outgoing.initiative_counter = Some(self.initiative_counter);
        }

        self.stamp_victory()?;
        outgoing.win_state = self.win_state;
        outgoing.winning_team = self.winning_team;
        outgoing.failure = failures.first().map(ToString::to_string);

        tracing::debug!(
            id = outgoing.id,
            units = outgoing.units.len(),
            end_turn = outgoing.end_turn,
            failures = failures.len(),
            "batch applied"
        );
        Ok(outgoing)
    }

    fn dispatch_move(&mut self, unit: UnitId, path: &[HexCoord], outgoing: &mut Update) -> Result<()> {
        let remaining = self.validate_move(unit, path)?;
        let stats = PartialUnitStats {
            move_points: Some(remaining),
            ..Default::default()
        };
        outgoing.push_unit(UnitUpdate::movement(unit, path.to_vec()).with_stats(stats));
        Ok(())
    }

    /// Strike each target in turn; each refused target is reported
    /// separately but only the first refusal is returned
    ///
    /// A target that was on the map when the batch started but has since
    /// died is a refusal; an id that was never on the map is structural.
    fn dispatch_attack(
        &mut self,
        aggressor_id: UnitId,
        targets: &[UnitId],
        roster: &AHashSet<UnitId>,
        outgoing: &mut Update,
    ) -> Result<()> {
        let aggressor = self.require_unit(aggressor_id)?;
        if self.current_unit()?.id != aggressor_id {
            return Err(ActionError::NotActiveUnit(aggressor_id).into());
        }
        if aggressor.attacks_remaining <= 0 {
            return Err(ActionError::NoAttacksRemaining.into());
        }

        let mut refusal = None;
        for &target_id in targets {
            let aggressor = self.require_unit(aggressor_id)?;
            let target = match self.unit(target_id) {
                Some(target) => target,
                None if roster.contains(&target_id) => {
                    tracing::debug!(aggressor = ?aggressor_id, target = ?target_id, "target already fell");
                    refusal.get_or_insert(ActionError::TargetGone(target_id));
                    continue;
                }
                None => return Err(TacticsError::UnitNotFound(target_id)),
            };
            if let Err(err) = self.check_attack(aggressor, target) {
                match err {
                    TacticsError::Rejected(reason) => {
                        tracing::debug!(aggressor = ?aggressor_id, target = ?target_id, %reason, "target refused");
                        refusal.get_or_insert(reason);
                        continue;
                    }
                    other => return Err(other),
                }
            }

            let AttackOutcome::Hit { damage, was_critical, target_health, .. } =
                self.combat(aggressor_id, target_id)?
            else {
                refusal.get_or_insert(ActionError::NoAttacksRemaining);
                break;
            };

            let attacks_remaining = self.require_unit(aggressor_id)?.attacks_remaining;
            outgoing.push_unit(UnitUpdate::attack(aggressor_id, vec![target_id]).with_stats(
                PartialUnitStats {
                    attacks_remaining: Some(attacks_remaining),
                    ..Default::default()
                },
            ));
            outgoing.push_unit(
                UnitUpdate::attack(target_id, Vec::new())
                    .with_stats(PartialUnitStats {
                        health: Some(target_health),
                        ..Default::default()
                    })
                    .with_attack_info(AttackInfo { was_critical, damage }),
            );
        }

        match refusal {
            Some(reason) => Err(reason.into()),
            None => Ok(()),
        }
    }

    // === CLIENT ===

    /// Replay an update from the server
    ///
    /// Returns `Ok(false)` when the update was already applied. Snapshots
    /// always apply and replace the roster, players and teams.
    pub fn apply(&mut self, update: &Update) -> Result<bool> {
        if update.is_quit_sentinel() {
            return Ok(false);
        }
        if !update.snapshot && update.id <= self.update_counter {
            tracing::debug!(
                incoming = update.id,
                current = self.update_counter,
                "update already applied, skipped"
            );
            return Ok(false);
        }

        let mut next = self.clone();
        next.replay(update)?;
        *self = next;
        Ok(true)
    }

    fn replay(&mut self, update: &Update) -> Result<()> {
        if update.snapshot {
            self.units.clear();
            self.players.clear();
            self.teams.clear();
        }

        for team in &update.teams {
            self.teams.insert(team.id, team.clone());
        }
        for player in &update.players {
            self.upsert_player(player)?;
        }

        let mut canonical = false;
        for unit_update in &update.units {
            match &unit_update.action {
                UnitAction::Move { path } => {
                    let unit = self
                        .unit_mut(unit_update.unit)
                        .ok_or(TacticsError::UnitNotFound(unit_update.unit))?;
                    if let Some(&last) = path.last() {
                        unit.position = last;
                    }
                    unit.apply_stats(&unit_update.stats);
                }
                UnitAction::Attack { .. } => {
                    self.unit_mut(unit_update.unit)
                        .ok_or(TacticsError::UnitNotFound(unit_update.unit))?
                        .apply_stats(&unit_update.stats);
                }
                UnitAction::CanonicalState { template, owner } => {
                    self.upsert_unit(unit_update.unit, template, *owner, &unit_update.stats)?;
                    canonical = true;
                }
                UnitAction::Pass | UnitAction::Spell | UnitAction::Summon => {}
            }
        }

        if canonical {
            self.sort_roster();
        }
        for id in self.remove_dead() {
            tracing::debug!(unit = ?id, "unit removed");
        }

        if update.end_turn {
            self.end_unit_turn()?;
        }
        if let Some(counter) = update.initiative_counter {
            self.initiative_counter = counter;
        }

        self.win_state = update.win_state;
        self.winning_team = update.winning_team;
        self.update_counter = update.id;
        Ok(())
    }

    fn upsert_player(&mut self, update: &PlayerUpdate) -> Result<()> {
        if let Some(player) = self.players.get_mut(&update.id) {
            if let Some(name) = &update.name {
                player.name = name.clone();
            }
            if let Some(team) = update.team {
                player.team = team;
            }
            if let Some(kind) = update.kind {
                player.kind = kind;
            }
        } else {
            let (Some(name), Some(team)) = (&update.name, update.team) else {
                return Err(TacticsError::PlayerNotFound(update.id));
            };
            let player = Player {
                id: update.id,
                name: name.clone(),
                team,
                kind: update.kind.unwrap_or_default(),
            };
            self.players.insert(update.id, player);
        }

        let team = self.players[&update.id].team;
        if !self.teams.contains_key(&team) {
            return Err(TacticsError::TeamNotFound(team));
        }
        Ok(())
    }

    fn upsert_unit(&mut self, id: UnitId, template: &str, owner: PlayerId, stats: &PartialUnitStats) -> Result<()> {
        if !self.players.contains_key(&owner) {
            return Err(TacticsError::PlayerNotFound(owner));
        }
        if let Some(unit) = self.unit_mut(id) {
            unit.owner = owner;
            unit.apply_stats(stats);
            return Ok(());
        }

        let template = self.creatures.require(template)?;
        let position = stats.position.ok_or(TacticsError::UnitNotFound(id))?;
        let mut unit = Unit::with_id(id, template, owner, position);
        unit.apply_stats(stats);
        self.units.push(unit);
        Ok(())
    }
}
