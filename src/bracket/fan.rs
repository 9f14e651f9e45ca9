//! Seeded knockout ("fan") bracket.
//!
//! Only round one is planned up front; later rounds materialize as results
//! arrive, so a winner whose next opponent is not yet known waits in a
//! bye-placeholder slot instead of an empty bracket cell. First-round losers
//! get one consolation match against another first-round loser.

use chrono::{DateTime, Duration, Utc};

use crate::tournament::error::ValidationError;
use crate::tournament::models::{EntrantId, EntrantRef};

use super::seeding::{SeedingContext, plan_first_round};
use super::{BracketPlan, BuildBracket, PlannedMatch};

/// Consolation matches number from here, after the main draw's positions.
pub const CONSOLATION_ROUND_ORDER_BASE: u32 = 100;

/// Planner for the single-elimination format.
pub struct FanGenerator;

impl BuildBracket for FanGenerator {
    fn build(&self, ctx: &SeedingContext) -> Result<BracketPlan, ValidationError> {
        let n = ctx.entrants.len();
        if n < 2 {
            return Err(ValidationError::NotEnoughEntrants {
                needed: 2,
                current: n,
            });
        }

        let matches = plan_first_round(ctx);
        let message = if n % 2 == 1 {
            format!(
                "Generated round 1 with {} matches for {} entrants; top seed advances on a bye",
                matches.len(),
                n
            )
        } else {
            format!(
                "Generated round 1 with {} matches for {} entrants",
                matches.len(),
                n
            )
        };

        Ok(BracketPlan { matches, message })
    }
}

/// Pair first-round losers for their consolation match.
///
/// `losers` must be in the round order of the main matches they lost, byes
/// excluded. Pairing mirrors the main draw (first against last); an odd
/// count leaves the middle loser with a planted consolation walkover.
/// Fewer than two losers means no consolation round at all.
pub fn plan_consolation(
    losers: &[EntrantId],
    start_date: DateTime<Utc>,
    match_period: Duration,
    now: DateTime<Utc>,
) -> Vec<PlannedMatch> {
    let n = losers.len();
    if n < 2 {
        return Vec::new();
    }

    // Consolations run alongside round two
    let deadline = Some(start_date + match_period * 2);
    let mut matches = Vec::with_capacity(n / 2 + 1);

    for i in 0..n / 2 {
        let order = CONSOLATION_ROUND_ORDER_BASE + i as u32;
        matches.push(
            PlannedMatch::scheduled(
                1,
                order,
                Some(EntrantRef::Real(losers[i])),
                Some(EntrantRef::Real(losers[n - 1 - i])),
                deadline,
            )
            .consolation(),
        );
    }

    if n % 2 == 1 {
        let leftover = EntrantRef::Real(losers[n / 2]);
        let order = CONSOLATION_ROUND_ORDER_BASE + (n / 2) as u32;
        matches.push(
            PlannedMatch::scheduled(1, order, Some(leftover), Some(EntrantRef::Bye), deadline)
                .consolation()
                .walkover_to(leftover, now),
        );
    }

    matches
}
