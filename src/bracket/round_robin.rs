//! Round-robin scheduling and standings.
//!
//! The schedule comes from the classic circle method: fix the first unit,
//! rotate the rest one step per round, pair across the circle. Odd fields
//! get a phantom unit whose opponent rests that round; no bye matches are
//! recorded. The whole schedule is planned up front, one match period per
//! round.

use std::collections::{HashMap, HashSet};

use crate::tournament::error::ValidationError;
use crate::tournament::models::{EntrantId, EntrantRef, Match};
use serde::{Deserialize, Serialize};

use super::seeding::SeedingContext;
use super::{BracketPlan, BuildBracket, PlannedMatch};

/// Planner for the round-robin format.
pub struct RoundRobinGenerator;

impl BuildBracket for RoundRobinGenerator {
    fn build(&self, ctx: &SeedingContext) -> Result<BracketPlan, ValidationError> {
        let n = ctx.entrants.len();
        if n < 2 {
            return Err(ValidationError::NotEnoughEntrants {
                needed: 2,
                current: n,
            });
        }

        let mut units: Vec<Option<EntrantId>> = ctx.entrants.iter().map(|e| Some(e.id)).collect();
        if n % 2 == 1 {
            units.push(None);
        }
        let circle = units.len();
        let rounds = circle - 1;

        let mut matches = Vec::with_capacity(n * (n - 1) / 2);
        for round in 1..=rounds as u32 {
            let deadline = Some(ctx.round_deadline(round));
            let mut order = 1u32;
            for i in 0..circle / 2 {
                let (Some(a), Some(b)) = (units[i], units[circle - 1 - i]) else {
                    // The entrant across from the phantom rests this round
                    continue;
                };
                let (low, high) = if a < b { (a, b) } else { (b, a) };
                matches.push(PlannedMatch::scheduled(
                    round,
                    order,
                    Some(EntrantRef::Real(low)),
                    Some(EntrantRef::Real(high)),
                    deadline,
                ));
                order += 1;
            }
            if let Some(last) = units.pop() {
                units.insert(1, last);
            }
        }

        let message = format!(
            "Generated round-robin schedule: {} matches over {} rounds",
            matches.len(),
            rounds
        );
        Ok(BracketPlan { matches, message })
    }
}

/// One line of a round-robin table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub entrant: EntrantId,
    pub wins: u32,
    pub matches_played: u32,
    pub sets_won: u32,
    pub sets_lost: u32,
    pub games_won: u32,
    pub games_lost: u32,
    /// One point per win
    pub points: u32,
    /// 1-based table position; `None` until a result exists
    pub place: Option<u32>,
}

impl StandingsRow {
    fn empty(entrant: EntrantId) -> Self {
        Self {
            entrant,
            wins: 0,
            matches_played: 0,
            sets_won: 0,
            sets_lost: 0,
            games_won: 0,
            games_lost: 0,
            points: 0,
            place: None,
        }
    }

    fn set_diff(&self) -> i64 {
        i64::from(self.sets_won) - i64::from(self.sets_lost)
    }

    fn game_diff(&self) -> i64 {
        i64::from(self.games_won) - i64::from(self.games_lost)
    }
}

/// Rank entrants from decided matches.
///
/// Order: wins, then within a tie group the head-to-head balance among the
/// tied (+1 per win, -1 per loss against other group members), then set
/// difference, game difference, games won, and finally entrant id so the
/// table is stable.
pub fn compute_standings(entrants: &[EntrantId], matches: &[Match]) -> Vec<StandingsRow> {
    let decided: Vec<&Match> = matches
        .iter()
        .filter(|m| !m.is_consolation && m.status.is_decided())
        .collect();

    let mut tally: HashMap<EntrantId, StandingsRow> = entrants
        .iter()
        .map(|&e| (e, StandingsRow::empty(e)))
        .collect();

    for m in &decided {
        let (Some(EntrantRef::Real(a)), Some(EntrantRef::Real(b))) = (m.side1, m.side2) else {
            continue;
        };
        let Some(winner) = m.winner else { continue };

        for (me, mine_first) in [(a, true), (b, false)] {
            let Some(row) = tally.get_mut(&me) else {
                continue;
            };
            row.matches_played += 1;
            if winner == EntrantRef::Real(me) {
                row.wins += 1;
                row.points += 1;
            }
            for set in &m.sets {
                let (mine, theirs) = if mine_first {
                    (set.side1, set.side2)
                } else {
                    (set.side2, set.side1)
                };
                row.games_won += mine;
                row.games_lost += theirs;
                if mine > theirs {
                    row.sets_won += 1;
                } else if theirs > mine {
                    row.sets_lost += 1;
                }
            }
        }
    }

    let mut rows: Vec<StandingsRow> = entrants
        .iter()
        .filter_map(|e| tally.remove(e))
        .collect();
    rows.sort_by(|a, b| b.wins.cmp(&a.wins).then(a.entrant.cmp(&b.entrant)));

    // Break ties head-to-head among the tied group only
    let mut ranked: Vec<StandingsRow> = Vec::with_capacity(rows.len());
    let mut i = 0;
    while i < rows.len() {
        let j = rows[i..]
            .iter()
            .position(|r| r.wins != rows[i].wins)
            .map_or(rows.len(), |p| i + p);
        let mut group: Vec<StandingsRow> = rows[i..j].to_vec();
        if group.len() > 1 {
            let ids: HashSet<EntrantId> = group.iter().map(|r| r.entrant).collect();
            let mut head_to_head: HashMap<EntrantId, i32> = HashMap::new();
            for m in &decided {
                let (Some(EntrantRef::Real(a)), Some(EntrantRef::Real(b))) = (m.side1, m.side2)
                else {
                    continue;
                };
                if !ids.contains(&a) || !ids.contains(&b) {
                    continue;
                }
                if let Some(EntrantRef::Real(w)) = m.winner {
                    let loser = if w == a { b } else { a };
                    *head_to_head.entry(w).or_insert(0) += 1;
                    *head_to_head.entry(loser).or_insert(0) -= 1;
                }
            }
            group.sort_by(|a, b| {
                let a_h2h = head_to_head.get(&a.entrant).copied().unwrap_or(0);
                let b_h2h = head_to_head.get(&b.entrant).copied().unwrap_or(0);
                b_h2h
                    .cmp(&a_h2h)
                    .then(b.set_diff().cmp(&a.set_diff()))
                    .then(b.game_diff().cmp(&a.game_diff()))
                    .then(b.games_won.cmp(&a.games_won))
                    .then(a.entrant.cmp(&b.entrant))
            });
        }
        ranked.extend(group);
        i = j;
    }

    let any_decided = !decided.is_empty();
    for (position, row) in ranked.iter_mut().enumerate() {
        row.place = any_decided.then_some(position as u32 + 1);
    }
    ranked
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::tournament::models::{Entrant, MatchStatus, SetScore};

    use super::*;

    fn ctx(n: i64) -> SeedingContext {
        let now = Utc::now();
        SeedingContext {
            entrants: (0..n).map(|i| Entrant::singles(i + 1, i + 101)).collect(),
            start_date: now,
            match_period: Duration::days(7),
            now,
        }
    }

    fn pair_of(m: &PlannedMatch) -> (EntrantId, EntrantId) {
        match (m.side1, m.side2) {
            (Some(EntrantRef::Real(a)), Some(EntrantRef::Real(b))) => (a, b),
            other => panic!("round robin planned a non-real pairing: {other:?}"),
        }
    }

    #[test]
    fn test_even_field_covers_every_pair_once() {
        let plan = RoundRobinGenerator.build(&ctx(4)).unwrap();
        assert_eq!(plan.matches.len(), 6);

        let rounds: HashSet<u32> = plan.matches.iter().map(|m| m.round_index).collect();
        assert_eq!(rounds, HashSet::from([1, 2, 3]));

        let pairs: HashSet<(EntrantId, EntrantId)> = plan.matches.iter().map(pair_of).collect();
        assert_eq!(pairs.len(), 6, "Every pair should meet exactly once");
        assert!(plan.matches.iter().all(|m| {
            let (a, b) = pair_of(m);
            a < b
        }));
    }

    #[test]
    fn test_odd_field_rests_one_entrant_per_round() {
        let plan = RoundRobinGenerator.build(&ctx(5)).unwrap();
        assert_eq!(plan.matches.len(), 10);

        for round in 1..=5u32 {
            let in_round: Vec<_> = plan
                .matches
                .iter()
                .filter(|m| m.round_index == round)
                .collect();
            assert_eq!(in_round.len(), 2, "Round {round} should have 2 matches");
            assert_eq!(
                in_round.iter().map(|m| m.round_order).collect::<Vec<_>>(),
                vec![1, 2]
            );

            let mut busy = HashSet::new();
            for m in &in_round {
                let (a, b) = pair_of(m);
                busy.insert(a);
                busy.insert(b);
            }
            assert_eq!(busy.len(), 4, "Exactly one entrant rests per round");
        }

        let pairs: HashSet<(EntrantId, EntrantId)> = plan.matches.iter().map(pair_of).collect();
        assert_eq!(pairs.len(), 10);
    }

    #[test]
    fn test_round_deadlines_step_by_period() {
        let context = ctx(4);
        let plan = RoundRobinGenerator.build(&context).unwrap();
        for m in &plan.matches {
            let expected = context.start_date + Duration::days(7) * m.round_index as i32;
            assert_eq!(m.deadline, Some(expected));
        }
    }

    #[test]
    fn test_build_rejects_single_entrant() {
        assert!(RoundRobinGenerator.build(&ctx(1)).is_err());
    }

    fn decided(
        id: i64,
        a: EntrantId,
        b: EntrantId,
        winner: EntrantId,
        sets: Vec<SetScore>,
    ) -> Match {
        Match {
            id,
            tournament_id: 1,
            round_index: 1,
            round_order: 1,
            is_consolation: false,
            placement_min: None,
            placement_max: None,
            side1: Some(EntrantRef::Real(a)),
            side2: Some(EntrantRef::Real(b)),
            status: MatchStatus::Completed,
            deadline: None,
            winner: Some(EntrantRef::Real(winner)),
            sets,
            next_match: None,
            loser_next_match: None,
            completed_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_standings_rank_by_wins_then_head_to_head() {
        let entrants = vec![1, 2, 3, 4];
        let matches = vec![
            decided(10, 1, 2, 1, vec![SetScore::new(6, 0), SetScore::new(6, 0)]),
            decided(11, 1, 4, 1, vec![SetScore::new(6, 2), SetScore::new(6, 2)]),
            // 2 and 3 tie on one win each; 2 took the head-to-head narrowly
            // while 3 crushed 4, so game difference alone would rank 3 first
            decided(13, 2, 3, 2, vec![SetScore::new(7, 6), SetScore::new(7, 6)]),
            decided(14, 3, 4, 3, vec![SetScore::new(6, 0), SetScore::new(6, 0)]),
        ];

        let rows = compute_standings(&entrants, &matches);
        let order: Vec<_> = rows.iter().map(|r| r.entrant).collect();
        assert_eq!(
            order,
            vec![1, 2, 3, 4],
            "Head to head should outrank game difference inside a tie group"
        );

        assert_eq!(rows[0].wins, 2);
        assert_eq!(rows[0].place, Some(1));
        assert_eq!(rows[1].wins, 1);
        assert_eq!(rows[1].place, Some(2));
        assert_eq!(rows[2].entrant, 3);
        assert!(
            rows[2].game_diff() > rows[1].game_diff(),
            "The scenario should only be decided by head to head"
        );
        assert_eq!(rows[3].wins, 0);
        assert_eq!(rows[3].place, Some(4));
        assert_eq!(rows[0].points, 2);
    }

    #[test]
    fn test_standings_count_sets_and_games() {
        let entrants = vec![1, 2];
        let matches = vec![decided(
            10,
            1,
            2,
            1,
            vec![SetScore::new(6, 4), SetScore::new(3, 6), SetScore::new(7, 5)],
        )];

        let rows = compute_standings(&entrants, &matches);
        assert_eq!(rows[0].entrant, 1);
        assert_eq!(rows[0].sets_won, 2);
        assert_eq!(rows[0].sets_lost, 1);
        assert_eq!(rows[0].games_won, 16);
        assert_eq!(rows[0].games_lost, 15);
        assert_eq!(rows[1].sets_won, 1);
        assert_eq!(rows[1].games_won, 15);
    }

    #[test]
    fn test_standings_with_no_results_have_no_places() {
        let rows = compute_standings(&[1, 2, 3], &[]);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.place.is_none()));
        assert!(rows.iter().all(|r| r.matches_played == 0));
    }

    #[test]
    fn test_walkover_counts_as_win_without_sets() {
        let entrants = vec![1, 2];
        let mut m = decided(10, 1, 2, 2, Vec::new());
        m.status = MatchStatus::Walkover;
        let rows = compute_standings(&entrants, &[m]);
        assert_eq!(rows[0].entrant, 2);
        assert_eq!(rows[0].wins, 1);
        assert_eq!(rows[0].sets_won, 0);
        assert_eq!(rows[1].entrant, 1);
        assert_eq!(rows[1].matches_played, 1);
    }
}
