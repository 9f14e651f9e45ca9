//! Integration tests for the single-elimination format
//!
//! These tests drive whole tournaments through the engine: generation,
//! winner advancement, bye placeholders, the consolation round, and
//! finalization with points.

#[cfg(test)]
mod single_elimination_tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use matchpoint::TournamentEngine;
    use matchpoint::db::MemoryStore;
    use matchpoint::ports::stubs::{InMemoryRegistry, RecordingNotifier, StaticRankings};
    use matchpoint::ports::{NotificationKind, RankingProvider, RegistrationProvider};
    use matchpoint::tournament::{
        EngineError, Entrant, EntrantId, EntrantMode, EntrantRef, Match, MatchStatus, ResultClaim,
        SetScore, StateError, Tournament, TournamentFormat, TournamentId, TournamentSettings,
        TournamentStatus, ValidationError,
    };

    #[tokio::test]
    async fn test_ten_entrants_plan_five_real_matches() {
        let rig = rig();
        let t = past_tournament(&rig, TournamentFormat::SingleElimination).await;
        seed_singles(&rig, t.id, 10).await;

        let message = rig.engine.generate_bracket(t.id).await.unwrap();
        assert!(message.contains("5 matches"));

        let matches = rig.engine.matches_of(t.id).await.unwrap();
        assert_eq!(matches.len(), 5);
        assert!(
            matches.iter().all(|m| m.status == MatchStatus::Scheduled),
            "An even draw has no planted walkover"
        );
        assert!(
            matches
                .iter()
                .all(|m| m.side1.is_some_and(|s| !s.is_bye())
                    && m.side2.is_some_and(|s| !s.is_bye()))
        );

        // Best against worst: seed 1 meets seed 10
        assert_eq!(matches[0].side1, Some(EntrantRef::Real(1)));
        assert_eq!(matches[0].side2, Some(EntrantRef::Real(10)));

        let current = rig.engine.tournament(t.id).await.unwrap();
        assert!(current.bracket_generated);
        assert_eq!(current.status, TournamentStatus::Active);
    }

    #[tokio::test]
    async fn test_nine_entrants_top_seed_walks_over_the_bye() {
        let rig = rig();
        let t = past_tournament(&rig, TournamentFormat::SingleElimination).await;
        seed_singles(&rig, t.id, 9).await;

        rig.engine.generate_bracket(t.id).await.unwrap();

        let matches = rig.engine.matches_of(t.id).await.unwrap();
        assert_eq!(matches.len(), 5);

        let bye = &matches[0];
        assert_eq!(bye.side1, Some(EntrantRef::Real(1)));
        assert_eq!(bye.side2, Some(EntrantRef::Bye));
        assert_eq!(bye.status, MatchStatus::Walkover);
        assert_eq!(bye.winner, Some(EntrantRef::Real(1)));
    }

    #[tokio::test]
    async fn test_generating_twice_is_rejected() {
        let rig = rig();
        let t = past_tournament(&rig, TournamentFormat::SingleElimination).await;
        seed_singles(&rig, t.id, 4).await;

        rig.engine.generate_bracket(t.id).await.unwrap();
        let err = rig.engine.generate_bracket(t.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::BracketAlreadyGenerated)
        ));
    }

    #[tokio::test]
    async fn test_capacity_bounds_are_enforced() {
        let rig = rig();
        let settings = TournamentSettings::new(
            "Club Night",
            TournamentFormat::SingleElimination,
            EntrantMode::Singles,
            Utc::now(),
        )
        .with_entrant_bounds(Some(2), Some(4));
        let t = rig.engine.create_tournament(settings).await.unwrap();
        seed_singles(&rig, t.id, 5).await;

        let err = rig.engine.generate_bracket(t.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::OverCapacity {
                capacity: 4,
                current: 5
            })
        ));

        let empty = past_tournament(&rig, TournamentFormat::SingleElimination).await;
        seed_singles(&rig, empty.id, 1).await;
        let err = rig.engine.generate_bracket(empty.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::NotEnoughEntrants {
                needed: 2,
                current: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_next_round_waits_for_both_feeders() {
        let rig = rig();
        let t = past_tournament(&rig, TournamentFormat::SingleElimination).await;
        seed_singles(&rig, t.id, 4).await;
        rig.engine.generate_bracket(t.id).await.unwrap();

        let matches = rig.engine.matches_of(t.id).await.unwrap();
        decide(&rig.engine, &matches[0], 1).await;
        assert_eq!(
            rig.engine.matches_of(t.id).await.unwrap().len(),
            2,
            "One decided feeder should not create the next round"
        );

        decide(&rig.engine, &matches[1], 2).await;
        let matches = rig.engine.matches_of(t.id).await.unwrap();

        let final_match = matches
            .iter()
            .find(|m| m.round_index == 2 && !m.is_consolation)
            .expect("both feeders decided should create the final");
        assert_eq!(final_match.side1, Some(EntrantRef::Real(1)));
        assert_eq!(final_match.side2, Some(EntrantRef::Real(2)));

        // Both feeders link forward to it
        for feeder in matches.iter().filter(|m| m.round_index == 1 && !m.is_consolation) {
            assert_eq!(feeder.next_match, Some(final_match.id));
        }
    }

    #[tokio::test]
    async fn test_consolation_pairs_first_round_losers_mirrored() {
        let rig = rig();
        let t = past_tournament(&rig, TournamentFormat::SingleElimination).await;
        seed_singles(&rig, t.id, 8).await;
        rig.engine.generate_bracket(t.id).await.unwrap();

        // Round 1 pairs (1,8) (2,7) (3,6) (4,5); higher seed wins each
        let matches = rig.engine.matches_of(t.id).await.unwrap();
        for (m, winner) in matches.iter().zip([1, 2, 3, 4]) {
            decide(&rig.engine, m, winner).await;
        }

        let consolations: Vec<Match> = rig
            .engine
            .matches_of(t.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.is_consolation)
            .collect();
        assert_eq!(consolations.len(), 2);

        // Losers in round order are [8, 7, 6, 5]; mirror pairing
        assert_eq!(consolations[0].round_order, 100);
        assert_eq!(consolations[0].side1, Some(EntrantRef::Real(8)));
        assert_eq!(consolations[0].side2, Some(EntrantRef::Real(5)));
        assert_eq!(consolations[1].side1, Some(EntrantRef::Real(7)));
        assert_eq!(consolations[1].side2, Some(EntrantRef::Real(6)));
    }

    #[tokio::test]
    async fn test_consolation_loss_keeps_first_round_points() {
        let rig = rig();
        let t = past_tournament(&rig, TournamentFormat::SingleElimination).await;
        seed_singles(&rig, t.id, 4).await;
        rig.engine.generate_bracket(t.id).await.unwrap();

        let matches = rig.engine.matches_of(t.id).await.unwrap();
        decide(&rig.engine, &matches[0], 1).await;
        decide(&rig.engine, &matches[1], 2).await;

        let consolation = rig
            .engine
            .matches_of(t.id)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.is_consolation)
            .unwrap();
        decide(&rig.engine, &consolation, 3).await;

        let placements = rig.engine.placements_of(t.id).await.unwrap();
        let loser = placements
            .iter()
            .find(|p| p.player_id == 104)
            .expect("the consolation loser has a placement row");
        assert!(loser.is_consolation);
        assert_eq!(loser.points, t.points.r1);
    }

    #[tokio::test]
    async fn test_final_awards_places_and_completes() {
        let rig = rig();
        let t = past_tournament(&rig, TournamentFormat::SingleElimination).await;
        seed_singles(&rig, t.id, 4).await;
        rig.engine.generate_bracket(t.id).await.unwrap();

        let matches = rig.engine.matches_of(t.id).await.unwrap();
        decide(&rig.engine, &matches[0], 1).await;
        decide(&rig.engine, &matches[1], 2).await;
        let consolation = rig
            .engine
            .matches_of(t.id)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.is_consolation)
            .unwrap();
        decide(&rig.engine, &consolation, 3).await;
        let final_match = rig
            .engine
            .matches_of(t.id)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.round_index == 2)
            .unwrap();
        decide(&rig.engine, &final_match, 1).await;

        let current = rig.engine.tournament(t.id).await.unwrap();
        assert_eq!(current.status, TournamentStatus::Completed);

        let placements = rig.engine.placements_of(t.id).await.unwrap();
        assert_eq!(placements.len(), 4);
        let by_player = |p: i64| placements.iter().find(|r| r.player_id == p).unwrap();
        assert_eq!(by_player(101).place, Some(1));
        assert_eq!(by_player(101).points, t.points.winner);
        assert_eq!(by_player(102).place, Some(2));
        assert_eq!(by_player(102).points, t.points.finalist);

        // Points flow into the rankings exactly once at finalization
        assert_eq!(
            rig.rankings.player_rating(101).await.unwrap(),
            rating_of_seed(1) + t.points.winner
        );
        assert_eq!(
            rig.rankings.player_rating(104).await.unwrap(),
            rating_of_seed(4) + t.points.r1
        );
    }

    /// The 10-entrant draw is the binding placeholder scenario: three
    /// orphan-winner spines, two bye placeholders, and a final that only
    /// ever pairs two real entrants.
    #[tokio::test]
    async fn test_ten_player_draw_resolves_to_completion() {
        let rig = rig();
        let t = past_tournament(&rig, TournamentFormat::SingleElimination).await;
        seed_singles(&rig, t.id, 10).await;
        rig.engine.generate_bracket(t.id).await.unwrap();

        let now = Utc::now();
        let resolved = rig.engine.process_overdue_matches_at(now).await.unwrap();
        assert!(resolved > 0);

        let current = rig.engine.tournament(t.id).await.unwrap();
        assert_eq!(current.status, TournamentStatus::Completed);

        let matches = rig.engine.matches_of(t.id).await.unwrap();
        let final_match = matches
            .iter()
            .filter(|m| !m.is_consolation)
            .max_by_key(|m| m.round_index)
            .unwrap();
        assert_eq!(final_match.round_index, 4);
        assert!(
            final_match.side1.is_some_and(|s| !s.is_bye())
                && final_match.side2.is_some_and(|s| !s.is_bye()),
            "The final must pair two real entrants"
        );
        assert_eq!(
            final_match.winner,
            Some(EntrantRef::Real(1)),
            "Technical wins always go to the higher rating"
        );

        // Seed 5's spine had no sibling in rounds 2 and 3, so it waited in
        // bye placeholders both times and still reached the final on merit
        // of the sweep
        assert_eq!(final_match.side2, Some(EntrantRef::Real(5)));
        let placeholders = matches
            .iter()
            .filter(|m| {
                !m.is_consolation
                    && m.round_index > 1
                    && m.sides().contains(&Some(EntrantRef::Bye))
            })
            .count();
        assert_eq!(placeholders, 2);

        // Every entrant holds exactly one placement row and the points
        // reconstruct the configured table
        let placements = rig.engine.placements_of(t.id).await.unwrap();
        assert_eq!(placements.len(), 10);
        let total: i64 = placements.iter().map(|p| p.points).sum();
        let p = t.points;
        assert_eq!(total, p.winner + p.finalist + p.semifinal + 2 * p.r2 + 5 * p.r1);

        // A second sweep after the cooldown changes nothing
        let again = rig
            .engine
            .process_overdue_matches_at(now + Duration::seconds(61))
            .await
            .unwrap();
        assert_eq!(again, 0);
        assert_eq!(rig.engine.matches_of(t.id).await.unwrap().len(), matches.len());
    }

    /// Confirmations arriving ahead of the sweep can park a winner in a
    /// placeholder two rounds deep. That placeholder must wait for the
    /// slower side of the draw: walking it over while a feeder is still
    /// open would strand the feeder's winner against a decided match.
    #[tokio::test]
    async fn test_early_placeholder_waits_for_the_slow_side_of_the_draw() {
        let rig = rig();
        let t = past_tournament(&rig, TournamentFormat::SingleElimination).await;
        seed_singles(&rig, t.id, 14).await;
        rig.engine.generate_bracket(t.id).await.unwrap();

        // Round 1 pairs (1,14)..(7,8); confirm orders 5 and 6, then their
        // round-2 pairing, while the rest of the draw sits untouched
        let round_one = rig.engine.matches_of(t.id).await.unwrap();
        let at = |order: u32| {
            round_one
                .iter()
                .find(|m| m.round_index == 1 && m.round_order == order)
                .unwrap()
                .clone()
        };
        decide(&rig.engine, &at(5), 5).await;
        decide(&rig.engine, &at(6), 6).await;

        let quarter = rig
            .engine
            .matches_of(t.id)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.round_index == 2)
            .expect("both feeders decided should create the round-2 match");
        assert_eq!(quarter.sides(), [Some(EntrantRef::Real(5)), Some(EntrantRef::Real(6))]);
        decide(&rig.engine, &quarter, 5).await;

        // Entrant 5 now waits in a round-3 placeholder whose Bye seat
        // belongs to a quarter of the draw that has not even been paired
        let placeholder = rig
            .engine
            .matches_of(t.id)
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.round_index == 3)
            .unwrap();
        assert_eq!(placeholder.side1, Some(EntrantRef::Real(5)));
        assert_eq!(placeholder.side2, Some(EntrantRef::Bye));

        // Nobody can claim a result against the Bye
        let err = rig
            .engine
            .propose_result(placeholder.id, 5, Vec::new(), ResultClaim::WalkoverWin)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::State(StateError::NoOpponent(_))));

        // One sweep drains the rest of the draw; the late quarter's winner
        // must land in that placeholder, not vanish against a walkover
        rig.engine.process_overdue_matches_at(Utc::now()).await.unwrap();

        let current = rig.engine.tournament(t.id).await.unwrap();
        assert_eq!(current.status, TournamentStatus::Completed);

        let matches = rig.engine.matches_of(t.id).await.unwrap();
        let semifinal = matches.iter().find(|m| m.id == placeholder.id).unwrap();
        assert_eq!(
            semifinal.sides(),
            [Some(EntrantRef::Real(5)), Some(EntrantRef::Real(7))],
            "The slow side's winner takes the Bye seat"
        );

        let placements = rig.engine.placements_of(t.id).await.unwrap();
        assert_eq!(placements.len(), 14, "One placement row per entrant");
        let by_player = |p: i64| placements.iter().find(|r| r.player_id == p).unwrap();
        assert_eq!(by_player(101).place, Some(1));
        assert_eq!(by_player(107).points, t.points.semifinal);
        assert_eq!(
            rig.rankings.player_rating(107).await.unwrap(),
            rating_of_seed(7) + t.points.semifinal
        );

        let p = t.points;
        let total: i64 = placements.iter().map(|r| r.points).sum();
        assert_eq!(
            total,
            p.winner + p.finalist + 2 * p.semifinal + 3 * p.r2 + 7 * p.r1
        );
    }

    #[tokio::test]
    async fn test_incomplete_doubles_team_is_withdrawn_and_refunded() {
        let rig = rig();
        let settings = TournamentSettings::new(
            "Doubles Ladder",
            TournamentFormat::SingleElimination,
            EntrantMode::Doubles,
            Utc::now() - Duration::days(30),
        );
        let t = rig.engine.create_tournament(settings).await.unwrap();

        for i in 1..=3i64 {
            let team = Entrant::doubles(i, 200 + 2 * i, Some(201 + 2 * i));
            rig.registry.register(t.id, team).await;
            for player in team.members() {
                rig.rankings.add_points(player, 1000 - 10 * i).await.unwrap();
            }
        }
        let solo = Entrant::doubles(9, 290, None);
        rig.registry.register(t.id, solo).await;

        rig.engine.generate_bracket(t.id).await.unwrap();

        assert_eq!(rig.registry.refunds().await, vec![290]);
        assert_eq!(
            rig.notifier.count_of(NotificationKind::EntrantWithdrawn).await,
            1
        );
        let roster = rig.registry.registered_entrants(t.id).await.unwrap();
        assert_eq!(roster.len(), 3);
        assert!(roster.iter().all(|e| e.id != 9));

        // Three remaining teams: odd draw, top team walks over the bye
        let matches = rig.engine.matches_of(t.id).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].status, MatchStatus::Walkover);
        assert_eq!(matches[0].winner, Some(EntrantRef::Real(1)));
    }

    // === Helpers ===

    struct TestRig {
        engine: TournamentEngine,
        rankings: Arc<StaticRankings>,
        registry: Arc<InMemoryRegistry>,
        notifier: Arc<RecordingNotifier>,
    }

    fn rig() -> TestRig {
        let rankings = Arc::new(StaticRankings::new());
        let registry = Arc::new(InMemoryRegistry::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = TournamentEngine::new(
            Arc::new(MemoryStore::new()),
            rankings.clone(),
            registry.clone(),
            notifier.clone(),
        );
        TestRig {
            engine,
            rankings,
            registry,
            notifier,
        }
    }

    /// A singles tournament whose rounds are all already past deadline.
    async fn past_tournament(rig: &TestRig, format: TournamentFormat) -> Tournament {
        let settings = TournamentSettings::new(
            "Autumn Cup",
            format,
            EntrantMode::Singles,
            Utc::now() - Duration::days(365),
        );
        rig.engine.create_tournament(settings).await.unwrap()
    }

    fn rating_of_seed(seed: i64) -> i64 {
        2000 - 50 * seed
    }

    /// Register `n` singles entrants: entrant `i` is player `100 + i` with a
    /// rating that decreases with the seed number.
    async fn seed_singles(rig: &TestRig, tournament: TournamentId, n: i64) {
        for i in 1..=n {
            rig.registry
                .register(tournament, Entrant::singles(i, 100 + i))
                .await;
            rig.rankings
                .add_points(100 + i, rating_of_seed(i))
                .await
                .unwrap();
        }
    }

    /// Decide a match through the confirmation workflow: the winner claims,
    /// the loser accepts.
    async fn decide(engine: &TournamentEngine, m: &Match, winner: EntrantId) {
        let loser = m
            .opponent_of(winner)
            .and_then(|s| s.real_id())
            .expect("decide() needs a real opponent");
        let proposal = engine
            .propose_result(
                m.id,
                winner,
                vec![SetScore::new(6, 4), SetScore::new(6, 3)],
                ResultClaim::Win,
            )
            .await
            .unwrap();
        engine.confirm_proposal(proposal.id, loser, true).await.unwrap();
    }
}
