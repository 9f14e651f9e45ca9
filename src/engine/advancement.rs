//! Winner advancement and loser placement.
//!
//! Every resolved match passes through [`TournamentEngine::on_match_resolved`],
//! which dispatches on the tournament format. Single-elimination winners
//! climb pairwise into the next round; a winner whose paired feeder slot
//! does not exist parks in a scheduled bye placeholder until the overdue
//! sweep walks it over, which it only does once every earlier round is
//! decided and no late feeder can still claim the Bye seat. The final
//! round is the exception: it is only ever created once both semifinal
//! feeders are decided, so a Bye can never reach it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::bracket::fan::plan_consolation;
use crate::bracket::olympic::{LADDER_ROUND_ORDER_BASE, plan_ladder};
use crate::bracket::seeding::main_draw_rounds;
use crate::tournament::error::EngineResult;
use crate::tournament::models::{
    Entrant, EntrantId, EntrantRef, Match, MatchId, MatchStatus, PlacementResult, PlayerId,
    RoundReached, Tournament, TournamentFormat, TournamentStatus,
};

use super::TournamentEngine;

impl TournamentEngine {
    /// React to a match reaching a terminal state with a winner.
    pub(crate) async fn on_match_resolved(
        &self,
        m: &Match,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let tournament = self.require_tournament(m.tournament_id).await?;
        if tournament.status == TournamentStatus::Cancelled {
            return Ok(());
        }
        match tournament.format {
            TournamentFormat::SingleElimination => {
                self.resolve_elimination(&tournament, m, now).await
            }
            TournamentFormat::OlympicPlacement => self.resolve_olympic(&tournament, m, now).await,
            TournamentFormat::RoundRobin => self.resolve_round_robin(&tournament).await,
        }
    }

    /// Rounds in the main draw for the frozen roster size.
    fn expected_final_round(roster: &[Entrant]) -> u32 {
        main_draw_rounds(roster.len().max(2))
    }

    async fn resolve_elimination(
        &self,
        tournament: &Tournament,
        m: &Match,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let roster = self.roster(tournament.id).await?;
        if m.is_consolation {
            if let Some(loser) = m.loser() {
                self.record_round_reached(tournament, &roster, loser, 1, true)
                    .await?;
            }
            return Ok(());
        }

        let final_round = Self::expected_final_round(&roster);
        if m.round_index >= final_round {
            self.finalize_elimination(tournament, &roster, m).await?;
        } else {
            if let Some(loser) = m.loser() {
                self.record_round_reached(tournament, &roster, loser, m.round_index, false)
                    .await?;
            }
            self.advance_main_draw(tournament, &roster, m, final_round, now)
                .await?;
        }

        if m.round_index == 1 {
            self.try_build_consolation(tournament, &roster, now).await?;
        }
        Ok(())
    }

    /// The championship match decided places one and two.
    async fn finalize_elimination(
        &self,
        tournament: &Tournament,
        roster: &[Entrant],
        m: &Match,
    ) -> EngineResult<()> {
        if let Some(EntrantRef::Real(winner)) = m.winner {
            self.place_entrant(tournament, roster, winner, 1, false)
                .await?;
        }
        if let Some(EntrantRef::Real(loser)) = m.loser() {
            self.place_entrant(tournament, roster, loser, 2, false)
                .await?;
        }
        self.complete_with_points(tournament).await
    }

    /// Mark the tournament completed and push every accumulated placement
    /// row into the rankings. Points flow exactly once, at finalization.
    pub(crate) async fn complete_with_points(&self, tournament: &Tournament) -> EngineResult<()> {
        let current = self.require_tournament(tournament.id).await?;
        if current.status != TournamentStatus::Active {
            return Ok(());
        }
        for row in self.store.placements_of(tournament.id).await? {
            if row.points == 0 {
                continue;
            }
            if let Err(e) = self.rankings.add_points(row.player_id, row.points).await {
                log::warn!(
                    "Failed to credit {} points to player {}: {}",
                    row.points,
                    row.player_id,
                    e
                );
            }
        }
        let mut completed = current;
        completed.status = TournamentStatus::Completed;
        self.store.update_tournament(&completed).await?;
        log::info!("Tournament {} completed", tournament.id);
        Ok(())
    }

    /// Carry a main-draw winner into round `r + 1`.
    ///
    /// The destination slot for the winner of `(r, o)` is `(r + 1, (o + 1) / 2)`,
    /// fed by orders `2q - 1` and `2q` of round `r`. If the destination
    /// already exists as a bye placeholder the winner takes the Bye seat;
    /// if the sibling feeder is decided a real pairing is created; if the
    /// sibling is still running the winner waits; and if the sibling slot
    /// never existed the winner parks in a scheduled placeholder against
    /// Bye, except into the final round, which is never created early.
    pub(crate) async fn advance_main_draw(
        &self,
        tournament: &Tournament,
        roster: &[Entrant],
        m: &Match,
        final_round: u32,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let Some(winner) = m.winner else {
            return Ok(());
        };
        let next_round = m.round_index + 1;
        let next_order = (m.round_order + 1) / 2;

        if let Some(mut dest) = self
            .store
            .main_draw_match_at(tournament.id, next_round, next_order)
            .await?
        {
            if dest.status.is_terminal() {
                log::warn!(
                    "Winner of match {} arrived at match {}, which is already decided",
                    m.id,
                    dest.id
                );
                return Ok(());
            }
            if dest.is_bye_placeholder() {
                dest.replace_bye_side(winner);
            } else if !dest.fill_first_empty(winner) {
                log::warn!(
                    "Destination match {} has no open side for the winner of match {}",
                    dest.id,
                    m.id
                );
                return Ok(());
            }
            self.store.update_match(&dest).await?;
            self.link_feeder(m.id, dest.id).await?;
            self.announce_match(roster, &dest).await;
            return Ok(());
        }

        let sibling_order = if m.round_order % 2 == 1 {
            m.round_order + 1
        } else {
            m.round_order - 1
        };
        let sibling = self
            .store
            .main_draw_match_at(tournament.id, m.round_index, sibling_order)
            .await?;

        match sibling {
            Some(sib) if sib.status.is_terminal() => {
                let Some(other) = sib.winner else {
                    return Ok(());
                };
                let (side1, side2) = if m.round_order < sib.round_order {
                    (winner, other)
                } else {
                    (other, winner)
                };
                let dest = self
                    .store
                    .insert_match(&Match {
                        id: 0,
                        tournament_id: tournament.id,
                        round_index: next_round,
                        round_order: next_order,
                        is_consolation: false,
                        placement_min: None,
                        placement_max: None,
                        side1: Some(side1),
                        side2: Some(side2),
                        status: MatchStatus::Scheduled,
                        deadline: Some(tournament.round_deadline(next_round)),
                        winner: None,
                        sets: Vec::new(),
                        next_match: None,
                        loser_next_match: None,
                        completed_at: None,
                    })
                    .await?;
                self.link_feeder(m.id, dest.id).await?;
                self.link_feeder(sib.id, dest.id).await?;
                self.announce_match(roster, &dest).await;
            }
            Some(_) => {
                // Sibling still running; it will create the pairing.
            }
            None => {
                if next_round >= final_round {
                    // The final waits for a real opponent.
                    log::debug!(
                        "Winner of match {} holds for the final of tournament {}",
                        m.id,
                        tournament.id
                    );
                    return Ok(());
                }
                let placeholder = self
                    .store
                    .insert_match(&Match {
                        id: 0,
                        tournament_id: tournament.id,
                        round_index: next_round,
                        round_order: next_order,
                        is_consolation: false,
                        placement_min: None,
                        placement_max: None,
                        side1: Some(winner),
                        side2: Some(EntrantRef::Bye),
                        status: MatchStatus::Scheduled,
                        deadline: Some(tournament.round_deadline(next_round)),
                        winner: None,
                        sets: Vec::new(),
                        next_match: None,
                        loser_next_match: None,
                        completed_at: None,
                    })
                    .await?;
                self.link_feeder(m.id, placeholder.id).await?;
                log::debug!(
                    "Parked the winner of match {} in placeholder {} at round {}",
                    m.id,
                    placeholder.id,
                    next_round
                );
            }
        }
        Ok(())
    }

    async fn link_feeder(&self, feeder: MatchId, dest: MatchId) -> EngineResult<()> {
        let Some(mut current) = self.store.match_by_id(feeder).await? else {
            return Ok(());
        };
        current.next_match = Some(dest);
        self.store.update_match(&current).await?;
        Ok(())
    }

    /// Build the consolation round once every first-round match is decided.
    /// First-round losers get one more mirrored pairing; the round exists
    /// at most once per tournament.
    async fn try_build_consolation(
        &self,
        tournament: &Tournament,
        roster: &[Entrant],
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let current = self.require_tournament(tournament.id).await?;
        if current.status != TournamentStatus::Active {
            return Ok(());
        }
        let matches = self.store.matches_of(tournament.id).await?;
        if matches.iter().any(|m| m.is_consolation) {
            return Ok(());
        }
        let first_round: Vec<&Match> = matches
            .iter()
            .filter(|m| !m.is_consolation && m.round_index == 1)
            .collect();
        if first_round.is_empty() || first_round.iter().any(|m| !m.status.is_terminal()) {
            return Ok(());
        }

        let losers: Vec<EntrantId> = first_round
            .iter()
            .filter_map(|m| m.loser().and_then(|l| l.real_id()))
            .collect();
        let planned = plan_consolation(
            &losers,
            tournament.start_date,
            tournament.match_period(),
            now,
        );
        if planned.is_empty() {
            return Ok(());
        }
        let created = self.persist_planned(tournament.id, &planned).await?;
        for m in &created {
            self.announce_match(roster, m).await;
        }
        log::info!(
            "Built consolation round for tournament {}: {} matches",
            tournament.id,
            created.len()
        );
        Ok(())
    }

    async fn resolve_olympic(
        &self,
        tournament: &Tournament,
        m: &Match,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let roster = self.roster(tournament.id).await?;
        if m.is_consolation {
            return self.resolve_ladder_match(tournament, &roster, m).await;
        }

        let final_round = Self::expected_final_round(&roster);
        if m.round_index >= final_round {
            if let Some(EntrantRef::Real(winner)) = m.winner {
                self.place_entrant(tournament, &roster, winner, 1, false)
                    .await?;
            }
            if let Some(EntrantRef::Real(loser)) = m.loser() {
                self.place_entrant(tournament, &roster, loser, 2, false)
                    .await?;
            }
            self.try_finalize_olympic(tournament, &roster).await?;
        } else {
            self.advance_main_draw(tournament, &roster, m, final_round, now)
                .await?;
            self.try_build_ladder(tournament, &roster, m.round_index, now)
                .await?;
        }
        Ok(())
    }

    /// A ladder result forwards its winner up and its loser down; a match
    /// with no onward links is a decider and assigns its two places.
    async fn resolve_ladder_match(
        &self,
        tournament: &Tournament,
        roster: &[Entrant],
        m: &Match,
    ) -> EngineResult<()> {
        let Some(winner) = m.winner else {
            return Ok(());
        };
        let loser = m.loser();

        if let Some(dest) = m.next_match {
            self.feed_ladder_slot(roster, dest, winner).await?;
            if let (Some(l), Some(loser_dest)) = (loser, m.loser_next_match) {
                self.feed_ladder_slot(roster, loser_dest, l).await?;
            }
        } else if let (Some(lo), Some(hi)) = (m.placement_min, m.placement_max) {
            if let EntrantRef::Real(w) = winner {
                self.place_entrant(tournament, roster, w, lo, true).await?;
            }
            if let Some(EntrantRef::Real(l)) = loser {
                self.place_entrant(tournament, roster, l, hi, true).await?;
            }
        }
        self.try_finalize_olympic(tournament, roster).await
    }

    /// Put an arriving entrant into the first open side of a ladder match.
    async fn feed_ladder_slot(
        &self,
        roster: &[Entrant],
        dest: MatchId,
        entrant: EntrantRef,
    ) -> EngineResult<()> {
        let Some(mut current) = self.store.match_by_id(dest).await? else {
            return Ok(());
        };
        if current.status.is_terminal() {
            return Ok(());
        }
        if !current.fill_first_empty(entrant) {
            log::warn!("Ladder match {} has no open side left", dest);
            return Ok(());
        }
        self.store.update_match(&current).await?;
        self.announce_match(roster, &current).await;
        Ok(())
    }

    /// Drop the real losers of a completed main round into a fresh
    /// placement ladder. The contested range is fixed by the ideal cohort
    /// of the round; byes shrink the cohort but not the range, so the
    /// places they absorbed simply go unassigned.
    async fn try_build_ladder(
        &self,
        tournament: &Tournament,
        roster: &[Entrant],
        round_index: u32,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let final_round = Self::expected_final_round(roster);
        if round_index >= final_round {
            return Ok(());
        }
        let matches = self.store.matches_of(tournament.id).await?;
        if matches
            .iter()
            .any(|m| m.is_consolation && m.round_index == round_index)
        {
            return Ok(());
        }
        let round_mains: Vec<&Match> = matches
            .iter()
            .filter(|m| !m.is_consolation && m.round_index == round_index)
            .collect();
        if round_mains.is_empty() || round_mains.iter().any(|m| !m.status.is_terminal()) {
            return Ok(());
        }
        let cohort: Vec<EntrantId> = round_mains
            .iter()
            .filter_map(|m| m.loser().and_then(|l| l.real_id()))
            .collect();
        if cohort.is_empty() {
            return Ok(());
        }

        let size = 1u32 << (final_round - round_index);
        let placement_max = size * 2;
        let placement_min = placement_max - size + 1;
        let order_base = LADDER_ROUND_ORDER_BASE
            + matches
                .iter()
                .filter(|m| m.is_consolation && m.round_order >= LADDER_ROUND_ORDER_BASE)
                .count() as u32;

        let plan = plan_ladder(
            &cohort,
            round_index,
            placement_min,
            tournament.start_date,
            tournament.match_period(),
            order_base,
        )?;
        let created = self.persist_planned(tournament.id, &plan.matches).await?;
        for m in &created {
            self.announce_match(roster, m).await;
        }
        for (entrant, place) in &plan.direct_places {
            self.place_entrant(tournament, roster, *entrant, *place, true)
                .await?;
        }
        log::info!(
            "Built placement ladder for round {} of tournament {}: {} matches, places {}..={}",
            round_index,
            tournament.id,
            created.len(),
            placement_min,
            placement_max
        );
        self.try_finalize_olympic(tournament, roster).await
    }

    /// Complete the tournament once every member player holds an exact
    /// place.
    async fn try_finalize_olympic(
        &self,
        tournament: &Tournament,
        roster: &[Entrant],
    ) -> EngineResult<()> {
        if roster.is_empty() {
            return Ok(());
        }
        let placements = self.store.placements_of(tournament.id).await?;
        let placed: HashSet<PlayerId> = placements
            .iter()
            .filter(|p| p.place.is_some())
            .map(|p| p.player_id)
            .collect();
        let all_placed = roster
            .iter()
            .flat_map(|e| e.members())
            .all(|p| placed.contains(&p));
        if !all_placed {
            return Ok(());
        }
        self.complete_with_points(tournament).await
    }

    /// Write exact-place rows for every member of an entrant.
    async fn place_entrant(
        &self,
        tournament: &Tournament,
        roster: &[Entrant],
        entrant: EntrantId,
        place: u32,
        is_consolation: bool,
    ) -> EngineResult<()> {
        for player in Self::members_of(roster, entrant) {
            self.store
                .upsert_placement(&PlacementResult {
                    tournament_id: tournament.id,
                    player_id: player,
                    round_reached: RoundReached::from_place(place),
                    is_consolation,
                    points: tournament.points.for_place(place),
                    place: Some(place),
                })
                .await?;
        }
        Ok(())
    }

    /// Record how far an eliminated entrant got, tier points attached.
    async fn record_round_reached(
        &self,
        tournament: &Tournament,
        roster: &[Entrant],
        loser: EntrantRef,
        round_index: u32,
        is_consolation: bool,
    ) -> EngineResult<()> {
        let Some(entrant) = loser.real_id() else {
            return Ok(());
        };
        for player in Self::members_of(roster, entrant) {
            self.store
                .upsert_placement(&PlacementResult {
                    tournament_id: tournament.id,
                    player_id: player,
                    round_reached: RoundReached::from_round(round_index),
                    is_consolation,
                    points: tournament.points.for_round(round_index),
                    place: None,
                })
                .await?;
        }
        Ok(())
    }

    /// A round robin completes once every scheduled pairing has a winner.
    async fn resolve_round_robin(&self, tournament: &Tournament) -> EngineResult<()> {
        if tournament.status != TournamentStatus::Active {
            return Ok(());
        }
        let matches = self.store.matches_of(tournament.id).await?;
        if matches.is_empty()
            || matches
                .iter()
                .filter(|m| !m.is_consolation)
                .any(|m| m.winner.is_none())
        {
            return Ok(());
        }
        let mut completed = tournament.clone();
        completed.status = TournamentStatus::Completed;
        self.store.update_tournament(&completed).await?;
        log::info!("Tournament {} completed", tournament.id);
        Ok(())
    }
}
