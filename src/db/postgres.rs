//! PostgreSQL [`EngineStore`] implementation.
//!
//! Tables: `tournaments`, `matches`, `result_proposals`,
//! `placement_results` (primary key `(tournament_id, player_id)`), and
//! `sweep_leases` (primary key `name`). Lifecycle enums are stored as text,
//! match sides and set scores as JSONB, timestamps as UTC without zone.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::tournament::error::{StoreError, StoreResult};
use crate::tournament::models::{
    EntrantRef, Match, MatchId, MatchStatus, PlacementResult, PointTable, ProposalId,
    ProposalStatus, ResultClaim, ResultProposal, RoundReached, SetScore, Tournament, TournamentId,
    TournamentStatus,
};

use super::config::DatabaseConfig;
use super::store::EngineStore;
use super::Database;

const TOURNAMENT_COLUMNS: &str = "id, name, format, mode, status, max_entrants, min_entrants,
            start_date, registration_deadline, match_days_per_round, bracket_generated, points,
            below_minimum_alerted_at, created_at";

const MATCH_COLUMNS: &str = "id, tournament_id, round_index, round_order, is_consolation,
            placement_min, placement_max, side1, side2, status, deadline, winner, sets,
            next_match, loser_next_match, completed_at";

const PROPOSAL_COLUMNS: &str = "id, match_id, proposer, claim, sets, status, created_at";

/// Engine store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Connect a fresh pool from configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let db = Database::new(config).await?;
        Ok(Self::new(Arc::new(db.pool().clone())))
    }
}

fn decode_err(message: String) -> StoreError {
    StoreError::Database(sqlx::Error::Decode(message.into()))
}

fn utc(dt: NaiveDateTime) -> DateTime<Utc> {
    dt.and_utc()
}

fn row_to_tournament(row: &PgRow) -> StoreResult<Tournament> {
    let format_str: String = row.get("format");
    let mode_str: String = row.get("mode");
    let status_str: String = row.get("status");
    let points: PointTable = serde_json::from_value(row.get("points"))?;

    Ok(Tournament {
        id: row.get("id"),
        name: row.get("name"),
        format: crate::tournament::models::TournamentFormat::parse(&format_str)
            .ok_or_else(|| decode_err(format!("unknown tournament format: {format_str}")))?,
        mode: crate::tournament::models::EntrantMode::parse(&mode_str)
            .ok_or_else(|| decode_err(format!("unknown entrant mode: {mode_str}")))?,
        status: TournamentStatus::parse(&status_str)
            .ok_or_else(|| decode_err(format!("unknown tournament status: {status_str}")))?,
        max_entrants: row.get::<Option<i32>, _>("max_entrants").map(|v| v as u32),
        min_entrants: row.get::<Option<i32>, _>("min_entrants").map(|v| v as u32),
        start_date: utc(row.get("start_date")),
        registration_deadline: row
            .get::<Option<NaiveDateTime>, _>("registration_deadline")
            .map(utc),
        match_days_per_round: row.get::<i32, _>("match_days_per_round") as u32,
        bracket_generated: row.get("bracket_generated"),
        points,
        below_minimum_alerted_at: row
            .get::<Option<NaiveDateTime>, _>("below_minimum_alerted_at")
            .map(utc),
        created_at: utc(row.get("created_at")),
    })
}

fn row_to_match(row: &PgRow) -> StoreResult<Match> {
    let status_str: String = row.get("status");
    let side1: Option<EntrantRef> = serde_json::from_value(row.get("side1"))?;
    let side2: Option<EntrantRef> = serde_json::from_value(row.get("side2"))?;
    let winner: Option<EntrantRef> = serde_json::from_value(row.get("winner"))?;
    let sets: Vec<SetScore> = serde_json::from_value(row.get("sets"))?;

    Ok(Match {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        round_index: row.get::<i32, _>("round_index") as u32,
        round_order: row.get::<i32, _>("round_order") as u32,
        is_consolation: row.get("is_consolation"),
        placement_min: row.get::<Option<i32>, _>("placement_min").map(|v| v as u32),
        placement_max: row.get::<Option<i32>, _>("placement_max").map(|v| v as u32),
        side1,
        side2,
        status: MatchStatus::parse(&status_str)
            .ok_or_else(|| decode_err(format!("unknown match status: {status_str}")))?,
        deadline: row.get::<Option<NaiveDateTime>, _>("deadline").map(utc),
        winner,
        sets,
        next_match: row.get("next_match"),
        loser_next_match: row.get("loser_next_match"),
        completed_at: row.get::<Option<NaiveDateTime>, _>("completed_at").map(utc),
    })
}

fn row_to_proposal(row: &PgRow) -> StoreResult<ResultProposal> {
    let claim_str: String = row.get("claim");
    let status_str: String = row.get("status");
    let sets: Vec<SetScore> = serde_json::from_value(row.get("sets"))?;

    Ok(ResultProposal {
        id: row.get("id"),
        match_id: row.get("match_id"),
        proposer: row.get("proposer"),
        claim: ResultClaim::parse(&claim_str)
            .ok_or_else(|| decode_err(format!("unknown result claim: {claim_str}")))?,
        sets,
        status: ProposalStatus::parse(&status_str)
            .ok_or_else(|| decode_err(format!("unknown proposal status: {status_str}")))?,
        created_at: utc(row.get("created_at")),
    })
}

fn row_to_placement(row: &PgRow) -> StoreResult<PlacementResult> {
    let reached_str: String = row.get("round_reached");

    Ok(PlacementResult {
        tournament_id: row.get("tournament_id"),
        player_id: row.get("player_id"),
        round_reached: RoundReached::parse(&reached_str)
            .ok_or_else(|| decode_err(format!("unknown round reached: {reached_str}")))?,
        is_consolation: row.get("is_consolation"),
        points: row.get("points"),
        place: row.get::<Option<i32>, _>("place").map(|v| v as u32),
    })
}

#[async_trait]
impl EngineStore for PgStore {
    async fn insert_tournament(&self, tournament: &Tournament) -> StoreResult<Tournament> {
        let points = serde_json::to_value(tournament.points)?;
        let row = sqlx::query(
            "INSERT INTO tournaments (name, format, mode, status, max_entrants, min_entrants,
                 start_date, registration_deadline, match_days_per_round, bracket_generated,
                 points, below_minimum_alerted_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING id",
        )
        .bind(&tournament.name)
        .bind(tournament.format.as_str())
        .bind(tournament.mode.as_str())
        .bind(tournament.status.as_str())
        .bind(tournament.max_entrants.map(|v| v as i32))
        .bind(tournament.min_entrants.map(|v| v as i32))
        .bind(tournament.start_date.naive_utc())
        .bind(tournament.registration_deadline.map(|d| d.naive_utc()))
        .bind(tournament.match_days_per_round as i32)
        .bind(tournament.bracket_generated)
        .bind(points)
        .bind(tournament.below_minimum_alerted_at.map(|d| d.naive_utc()))
        .bind(tournament.created_at.naive_utc())
        .fetch_one(&*self.pool)
        .await?;

        let mut stored = tournament.clone();
        stored.id = row.get("id");
        Ok(stored)
    }

    async fn tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref().map(row_to_tournament).transpose()
    }

    async fn update_tournament(&self, tournament: &Tournament) -> StoreResult<()> {
        let points = serde_json::to_value(tournament.points)?;
        sqlx::query(
            "UPDATE tournaments
             SET name = $1, format = $2, mode = $3, status = $4, max_entrants = $5,
                 min_entrants = $6, start_date = $7, registration_deadline = $8,
                 match_days_per_round = $9, bracket_generated = $10, points = $11,
                 below_minimum_alerted_at = $12
             WHERE id = $13",
        )
        .bind(&tournament.name)
        .bind(tournament.format.as_str())
        .bind(tournament.mode.as_str())
        .bind(tournament.status.as_str())
        .bind(tournament.max_entrants.map(|v| v as i32))
        .bind(tournament.min_entrants.map(|v| v as i32))
        .bind(tournament.start_date.naive_utc())
        .bind(tournament.registration_deadline.map(|d| d.naive_utc()))
        .bind(tournament.match_days_per_round as i32)
        .bind(tournament.bracket_generated)
        .bind(points)
        .bind(tournament.below_minimum_alerted_at.map(|d| d.naive_utc()))
        .bind(tournament.id)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn tournaments_past_registration_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Tournament>> {
        let rows = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
             WHERE status = $1 AND bracket_generated = FALSE
               AND registration_deadline IS NOT NULL AND registration_deadline <= $2
             ORDER BY id"
        ))
        .bind(TournamentStatus::Upcoming.as_str())
        .bind(now.naive_utc())
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(row_to_tournament).collect()
    }

    async fn insert_match(&self, m: &Match) -> StoreResult<Match> {
        let side1 = serde_json::to_value(m.side1)?;
        let side2 = serde_json::to_value(m.side2)?;
        let winner = serde_json::to_value(m.winner)?;
        let sets = serde_json::to_value(&m.sets)?;

        let row = sqlx::query(
            "INSERT INTO matches (tournament_id, round_index, round_order, is_consolation,
                 placement_min, placement_max, side1, side2, status, deadline, winner, sets,
                 next_match, loser_next_match, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING id",
        )
        .bind(m.tournament_id)
        .bind(m.round_index as i32)
        .bind(m.round_order as i32)
        .bind(m.is_consolation)
        .bind(m.placement_min.map(|v| v as i32))
        .bind(m.placement_max.map(|v| v as i32))
        .bind(side1)
        .bind(side2)
        .bind(m.status.as_str())
        .bind(m.deadline.map(|d| d.naive_utc()))
        .bind(winner)
        .bind(sets)
        .bind(m.next_match)
        .bind(m.loser_next_match)
        .bind(m.completed_at.map(|d| d.naive_utc()))
        .fetch_one(&*self.pool)
        .await?;

        let mut stored = m.clone();
        stored.id = row.get("id");
        Ok(stored)
    }

    async fn match_by_id(&self, id: MatchId) -> StoreResult<Option<Match>> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;

        row.as_ref().map(row_to_match).transpose()
    }

    async fn update_match(&self, m: &Match) -> StoreResult<()> {
        let side1 = serde_json::to_value(m.side1)?;
        let side2 = serde_json::to_value(m.side2)?;
        let winner = serde_json::to_value(m.winner)?;
        let sets = serde_json::to_value(&m.sets)?;

        sqlx::query(
            "UPDATE matches
             SET side1 = $1, side2 = $2, status = $3, deadline = $4, winner = $5, sets = $6,
                 next_match = $7, loser_next_match = $8, completed_at = $9
             WHERE id = $10",
        )
        .bind(side1)
        .bind(side2)
        .bind(m.status.as_str())
        .bind(m.deadline.map(|d| d.naive_utc()))
        .bind(winner)
        .bind(sets)
        .bind(m.next_match)
        .bind(m.loser_next_match)
        .bind(m.completed_at.map(|d| d.naive_utc()))
        .bind(m.id)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn complete_match(&self, m: &Match) -> StoreResult<bool> {
        let winner = serde_json::to_value(m.winner)?;
        let sets = serde_json::to_value(&m.sets)?;

        let result = sqlx::query(
            "UPDATE matches
             SET status = $1, winner = $2, sets = $3, completed_at = $4
             WHERE id = $5 AND status IN ($6, $7)",
        )
        .bind(m.status.as_str())
        .bind(winner)
        .bind(sets)
        .bind(m.completed_at.map(|d| d.naive_utc()))
        .bind(m.id)
        .bind(MatchStatus::Scheduled.as_str())
        .bind(MatchStatus::InProgress.as_str())
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn matches_of(&self, tournament: TournamentId) -> StoreResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = $1
             ORDER BY round_index, round_order, id"
        ))
        .bind(tournament)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(row_to_match).collect()
    }

    async fn main_draw_match_at(
        &self,
        tournament: TournamentId,
        round_index: u32,
        round_order: u32,
    ) -> StoreResult<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE tournament_id = $1 AND is_consolation = FALSE
               AND round_index = $2 AND round_order = $3
             LIMIT 1"
        ))
        .bind(tournament)
        .bind(round_index as i32)
        .bind(round_order as i32)
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref().map(row_to_match).transpose()
    }

    async fn overdue_matches(&self, now: DateTime<Utc>) -> StoreResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE status IN ($1, $2) AND deadline IS NOT NULL AND deadline <= $3
             ORDER BY round_index, deadline, round_order, id"
        ))
        .bind(MatchStatus::Scheduled.as_str())
        .bind(MatchStatus::InProgress.as_str())
        .bind(now.naive_utc())
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(row_to_match).collect()
    }

    async fn scheduled_matches_with_deadline_in(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE status = $1 AND deadline >= $2 AND deadline <= $3
             ORDER BY deadline, id"
        ))
        .bind(MatchStatus::Scheduled.as_str())
        .bind(from.naive_utc())
        .bind(to.naive_utc())
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(row_to_match).collect()
    }

    async fn insert_proposal(&self, proposal: &ResultProposal) -> StoreResult<ResultProposal> {
        let sets = serde_json::to_value(&proposal.sets)?;
        let row = sqlx::query(
            "INSERT INTO result_proposals (match_id, proposer, claim, sets, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(proposal.match_id)
        .bind(proposal.proposer)
        .bind(proposal.claim.as_str())
        .bind(sets)
        .bind(proposal.status.as_str())
        .bind(proposal.created_at.naive_utc())
        .fetch_one(&*self.pool)
        .await?;

        let mut stored = proposal.clone();
        stored.id = row.get("id");
        Ok(stored)
    }

    async fn proposal(&self, id: ProposalId) -> StoreResult<Option<ResultProposal>> {
        let row = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM result_proposals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref().map(row_to_proposal).transpose()
    }

    async fn update_proposal(&self, proposal: &ResultProposal) -> StoreResult<()> {
        sqlx::query("UPDATE result_proposals SET status = $1 WHERE id = $2")
            .bind(proposal.status.as_str())
            .bind(proposal.id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn pending_proposals_for(&self, match_id: MatchId) -> StoreResult<Vec<ResultProposal>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM result_proposals
             WHERE match_id = $1 AND status = $2
             ORDER BY created_at, id"
        ))
        .bind(match_id)
        .bind(ProposalStatus::Pending.as_str())
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(row_to_proposal).collect()
    }

    async fn stale_pending_proposals(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<ResultProposal>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM result_proposals
             WHERE status = $1 AND created_at <= $2
             ORDER BY created_at, id"
        ))
        .bind(ProposalStatus::Pending.as_str())
        .bind(cutoff.naive_utc())
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(row_to_proposal).collect()
    }

    async fn upsert_placement(&self, placement: &PlacementResult) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO placement_results (tournament_id, player_id, round_reached,
                 is_consolation, points, place)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (tournament_id, player_id) DO UPDATE
             SET round_reached = EXCLUDED.round_reached,
                 is_consolation = EXCLUDED.is_consolation,
                 points = EXCLUDED.points,
                 place = EXCLUDED.place",
        )
        .bind(placement.tournament_id)
        .bind(placement.player_id)
        .bind(placement.round_reached.as_str())
        .bind(placement.is_consolation)
        .bind(placement.points)
        .bind(placement.place.map(|v| v as i32))
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn placements_of(&self, tournament: TournamentId) -> StoreResult<Vec<PlacementResult>> {
        let rows = sqlx::query(
            "SELECT tournament_id, player_id, round_reached, is_consolation, points, place
             FROM placement_results WHERE tournament_id = $1
             ORDER BY player_id",
        )
        .bind(tournament)
        .fetch_all(&*self.pool)
        .await?;

        rows.iter().map(row_to_placement).collect()
    }

    async fn try_acquire_lease(
        &self,
        name: &str,
        holder: Uuid,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        // Single atomic upsert: the conditional update loses against a live
        // lease, so exactly one caller can win per expiry window.
        let result = sqlx::query(
            "INSERT INTO sweep_leases (name, holder, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (name) DO UPDATE
             SET holder = EXCLUDED.holder, expires_at = EXCLUDED.expires_at
             WHERE sweep_leases.expires_at <= $4",
        )
        .bind(name)
        .bind(holder)
        .bind((now + ttl).naive_utc())
        .bind(now.naive_utc())
        .execute(&*self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
