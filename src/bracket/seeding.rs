//! Seed ordering and the first-round pairing shared by the elimination
//! formats.

use chrono::{DateTime, Duration, Utc};

use crate::tournament::models::{Entrant, EntrantRef};

use super::PlannedMatch;

/// Inputs to a bracket planner.
pub struct SeedingContext {
    /// Entrants in seed order, best first
    pub entrants: Vec<Entrant>,
    /// Competitive start of the tournament; round deadlines count from here
    pub start_date: DateTime<Utc>,
    /// Time allotted per round
    pub match_period: Duration,
    /// Wall clock at planning time, stamped on planted walkovers
    pub now: DateTime<Utc>,
}

impl SeedingContext {
    /// Deadline for the given 1-based round.
    pub fn round_deadline(&self, round_index: u32) -> DateTime<Utc> {
        self.start_date + self.match_period * round_index as i32
    }
}

/// Order entrants for seeding: rating descending, entrant id ascending on
/// equal ratings so draws are reproducible.
pub fn seed_order(mut rated: Vec<(Entrant, i64)>) -> Vec<Entrant> {
    rated.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.id.cmp(&b.0.id)));
    rated.into_iter().map(|(entrant, _)| entrant).collect()
}

/// Number of main-draw rounds needed to reduce `n` real entrants to a
/// champion.
pub fn main_draw_rounds(n: usize) -> u32 {
    let mut rounds = 1u32;
    while (1usize << rounds) < n {
        rounds += 1;
    }
    rounds
}

/// Pair round one by seed: best against worst, second best against second
/// worst, and so on. An odd draw gives the top seed a bye planted as an
/// already-decided walkover at round order 1.
pub fn plan_first_round(ctx: &SeedingContext) -> Vec<PlannedMatch> {
    let n = ctx.entrants.len();
    let deadline = Some(ctx.round_deadline(1));
    let has_bye = n % 2 == 1;
    let mut matches = Vec::with_capacity(n / 2 + usize::from(has_bye));

    if has_bye {
        let top = EntrantRef::Real(ctx.entrants[0].id);
        matches.push(
            PlannedMatch::scheduled(1, 1, Some(top), Some(EntrantRef::Bye), deadline)
                .walkover_to(top, ctx.now),
        );
    }

    let offset = usize::from(has_bye);
    let first_order = offset as u32 + 1;
    for k in 0..(n - offset) / 2 {
        let high = EntrantRef::Real(ctx.entrants[offset + k].id);
        let low = EntrantRef::Real(ctx.entrants[n - 1 - k].id);
        matches.push(PlannedMatch::scheduled(
            1,
            first_order + k as u32,
            Some(high),
            Some(low),
            deadline,
        ));
    }

    matches
}

#[cfg(test)]
mod tests {
    use crate::tournament::models::MatchStatus;

    use super::*;

    fn singles(n: i64) -> Vec<Entrant> {
        (0..n).map(|i| Entrant::singles(i + 1, i + 101)).collect()
    }

    fn ctx(entrants: Vec<Entrant>) -> SeedingContext {
        let now = Utc::now();
        SeedingContext {
            entrants,
            start_date: now,
            match_period: Duration::days(7),
            now,
        }
    }

    #[test]
    fn test_seed_order_sorts_by_rating_then_id() {
        let rated = vec![
            (Entrant::singles(3, 103), 50),
            (Entrant::singles(1, 101), 90),
            (Entrant::singles(2, 102), 50),
            (Entrant::singles(4, 104), 120),
        ];
        let order: Vec<_> = seed_order(rated).into_iter().map(|e| e.id).collect();
        assert_eq!(order, vec![4, 1, 2, 3], "Ties should break on lower id");
    }

    #[test]
    fn test_main_draw_rounds() {
        assert_eq!(main_draw_rounds(2), 1);
        assert_eq!(main_draw_rounds(3), 2);
        assert_eq!(main_draw_rounds(4), 2);
        assert_eq!(main_draw_rounds(5), 3);
        assert_eq!(main_draw_rounds(8), 3);
        assert_eq!(main_draw_rounds(9), 4);
        assert_eq!(main_draw_rounds(10), 4);
        assert_eq!(main_draw_rounds(16), 4);
        assert_eq!(main_draw_rounds(17), 5);
    }

    #[test]
    fn test_even_draw_pairs_best_against_worst() {
        let matches = plan_first_round(&ctx(singles(8)));
        assert_eq!(matches.len(), 4);

        let pairs: Vec<_> = matches
            .iter()
            .map(|m| (m.side1.unwrap(), m.side2.unwrap()))
            .collect();
        assert_eq!(pairs[0], (EntrantRef::Real(1), EntrantRef::Real(8)));
        assert_eq!(pairs[1], (EntrantRef::Real(2), EntrantRef::Real(7)));
        assert_eq!(pairs[2], (EntrantRef::Real(3), EntrantRef::Real(6)));
        assert_eq!(pairs[3], (EntrantRef::Real(4), EntrantRef::Real(5)));

        let orders: Vec<_> = matches.iter().map(|m| m.round_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
        assert!(matches.iter().all(|m| m.status == MatchStatus::Scheduled));
        assert!(matches.iter().all(|m| m.round_index == 1));
    }

    #[test]
    fn test_odd_draw_gives_top_seed_a_bye() {
        let matches = plan_first_round(&ctx(singles(9)));
        assert_eq!(matches.len(), 5);

        let bye = &matches[0];
        assert_eq!(bye.round_order, 1);
        assert_eq!(bye.side1, Some(EntrantRef::Real(1)));
        assert_eq!(bye.side2, Some(EntrantRef::Bye));
        assert_eq!(bye.status, MatchStatus::Walkover);
        assert_eq!(bye.winner, Some(EntrantRef::Real(1)));
        assert!(bye.completed_at.is_some());

        // Remaining eight pair 2v9, 3v8, 4v7, 5v6
        assert_eq!(matches[1].side1, Some(EntrantRef::Real(2)));
        assert_eq!(matches[1].side2, Some(EntrantRef::Real(9)));
        assert_eq!(matches[4].side1, Some(EntrantRef::Real(5)));
        assert_eq!(matches[4].side2, Some(EntrantRef::Real(6)));
        assert_eq!(
            matches.iter().map(|m| m.round_order).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_two_entrants_is_a_single_final() {
        let matches = plan_first_round(&ctx(singles(2)));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].side1, Some(EntrantRef::Real(1)));
        assert_eq!(matches[0].side2, Some(EntrantRef::Real(2)));
        assert_eq!(matches[0].status, MatchStatus::Scheduled);
    }

    #[test]
    fn test_deadline_is_one_period_after_start() {
        let context = ctx(singles(4));
        let matches = plan_first_round(&context);
        let expected = context.start_date + Duration::days(7);
        assert!(matches.iter().all(|m| m.deadline == Some(expected)));
    }
}
