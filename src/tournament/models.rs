//! Tournament data models shared by the bracket generators and the engine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tournament ID type
pub type TournamentId = i64;

/// Match ID type
pub type MatchId = i64;

/// Result proposal ID type
pub type ProposalId = i64;

/// Entrant ID type (a player in singles, a team in doubles)
pub type EntrantId = i64;

/// Player ID type
pub type PlayerId = i64;

/// Days allotted per round when a tournament does not configure its own period.
pub const DEFAULT_MATCH_DAYS_PER_ROUND: u32 = 7;

/// Competition format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentFormat {
    /// Seeded single elimination with one consolation round for first-round losers
    SingleElimination,
    /// Single-elimination main draw plus a recursive placement ladder for every rank
    OlympicPlacement,
    /// Everyone plays everyone once; standings decide the order
    RoundRobin,
}

impl TournamentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentFormat::SingleElimination => "single_elimination",
            TournamentFormat::OlympicPlacement => "olympic_placement",
            TournamentFormat::RoundRobin => "round_robin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single_elimination" => Some(TournamentFormat::SingleElimination),
            "olympic_placement" => Some(TournamentFormat::OlympicPlacement),
            "round_robin" => Some(TournamentFormat::RoundRobin),
            _ => None,
        }
    }
}

/// Whether entrants are individual players or two-player teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrantMode {
    Singles,
    Doubles,
}

impl EntrantMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrantMode::Singles => "singles",
            EntrantMode::Doubles => "doubles",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "singles" => Some(EntrantMode::Singles),
            "doubles" => Some(EntrantMode::Doubles),
            _ => None,
        }
    }
}

/// Tournament lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatus {
    /// Registration open, bracket not yet generated
    Upcoming,
    /// Bracket generated, matches being played
    Active,
    /// All placements determined
    Completed,
    /// Cancelled before completion
    Cancelled,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Upcoming => "upcoming",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(TournamentStatus::Upcoming),
            "active" => Some(TournamentStatus::Active),
            "completed" => Some(TournamentStatus::Completed),
            "cancelled" => Some(TournamentStatus::Cancelled),
            _ => None,
        }
    }
}

/// Elimination points keyed by the round an entrant reached.
///
/// Lookups use the absolute round index; the final additionally awards the
/// `finalist` and `winner` tiers explicitly when it completes. Olympic
/// tournaments award by final place instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTable {
    /// Eliminated in round 1 (and consolation losses)
    pub r1: i64,
    /// Eliminated in round 2
    pub r2: i64,
    /// Eliminated in the semifinal
    pub semifinal: i64,
    /// Lost the final
    pub finalist: i64,
    /// Won the tournament
    pub winner: i64,
}

impl PointTable {
    /// Points for losing a main-draw match in the given round.
    pub fn for_round(&self, round_index: u32) -> i64 {
        match round_index {
            1 => self.r1,
            2 => self.r2,
            3 => self.semifinal,
            4 => self.finalist,
            _ => 0,
        }
    }

    /// Points for an exact final place (olympic ladders).
    pub fn for_place(&self, place: u32) -> i64 {
        match place {
            1 => self.winner,
            2 => self.finalist,
            3 | 4 => self.semifinal,
            5..=8 => self.r2,
            _ => self.r1,
        }
    }
}

impl Default for PointTable {
    fn default() -> Self {
        Self {
            r1: 10,
            r2: 20,
            semifinal: 35,
            finalist: 60,
            winner: 100,
        }
    }
}

/// The players behind an entrant.
///
/// A doubles team may be missing its second player until the bracket is
/// generated; incomplete teams are withdrawn at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrantKind {
    Singles { player: PlayerId },
    Doubles { first: PlayerId, second: Option<PlayerId> },
}

/// A competitor: a single player or a doubles team.
///
/// Ratings are not stored here; seeding and tie-breaks read them through the
/// ranking port at the moment they are needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrant {
    pub id: EntrantId,
    pub kind: EntrantKind,
}

impl Entrant {
    pub fn singles(id: EntrantId, player: PlayerId) -> Self {
        Self {
            id,
            kind: EntrantKind::Singles { player },
        }
    }

    pub fn doubles(id: EntrantId, first: PlayerId, second: Option<PlayerId>) -> Self {
        Self {
            id,
            kind: EntrantKind::Doubles { first, second },
        }
    }

    /// Iterate the real member players of this entrant.
    pub fn members(&self) -> impl Iterator<Item = PlayerId> {
        let (first, second) = match self.kind {
            EntrantKind::Singles { player } => (player, None),
            EntrantKind::Doubles { first, second } => (first, second),
        };
        std::iter::once(first).chain(second)
    }

    /// Whether the entrant can be drawn into a bracket.
    pub fn is_complete(&self) -> bool {
        match self.kind {
            EntrantKind::Singles { .. } => true,
            EntrantKind::Doubles { second, .. } => second.is_some(),
        }
    }
}

/// A match side or winner: a real entrant, or the bye sentinel padding an
/// odd-sized draw. Bye never wins competitively and never earns points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrantRef {
    Real(EntrantId),
    Bye,
}

impl EntrantRef {
    pub fn is_bye(&self) -> bool {
        matches!(self, EntrantRef::Bye)
    }

    pub fn real_id(&self) -> Option<EntrantId> {
        match self {
            EntrantRef::Real(id) => Some(*id),
            EntrantRef::Bye => None,
        }
    }
}

/// Match lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Scheduled,
    /// Set from outside the engine once the sides agree on a court time.
    /// No engine transition produces it; guards and sweeps treat it
    /// exactly like `Scheduled`.
    InProgress,
    /// Played and confirmed
    Completed,
    /// Decided without play: a bye or a technical win
    Walkover,
    Cancelled,
}

impl MatchStatus {
    /// Completed or walked over: a winner exists.
    pub fn is_decided(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Walkover)
    }

    /// No further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchStatus::Completed | MatchStatus::Walkover | MatchStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Walkover => "walkover",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(MatchStatus::Scheduled),
            "in_progress" => Some(MatchStatus::InProgress),
            "completed" => Some(MatchStatus::Completed),
            "walkover" => Some(MatchStatus::Walkover),
            "cancelled" => Some(MatchStatus::Cancelled),
            _ => None,
        }
    }
}

/// Games won per side in one set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub side1: u32,
    pub side2: u32,
}

impl SetScore {
    pub fn new(side1: u32, side2: u32) -> Self {
        Self { side1, side2 }
    }
}

/// A single bracket match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// 1-based round number in the main draw; ladder matches keep the round
    /// whose losers they place
    pub round_index: u32,
    /// Position within the round; consolation matches number from 100,
    /// olympic ladder matches from 201
    pub round_order: u32,
    pub is_consolation: bool,
    /// Best final rank contested by this olympic ladder match
    pub placement_min: Option<u32>,
    /// Worst final rank contested by this olympic ladder match
    pub placement_max: Option<u32>,
    /// `None` while the slot waits for a feeder match to finish
    pub side1: Option<EntrantRef>,
    pub side2: Option<EntrantRef>,
    pub status: MatchStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub winner: Option<EntrantRef>,
    /// Recorded sets, at most three
    pub sets: Vec<SetScore>,
    /// Where the winner goes next
    pub next_match: Option<MatchId>,
    /// Where the loser goes next (olympic ladders only)
    pub loser_next_match: Option<MatchId>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Both slots, in side order.
    pub fn sides(&self) -> [Option<EntrantRef>; 2] {
        [self.side1, self.side2]
    }

    /// Whether the given entrant occupies one of the sides.
    pub fn has_side(&self, entrant: EntrantId) -> bool {
        self.sides()
            .iter()
            .any(|s| *s == Some(EntrantRef::Real(entrant)))
    }

    /// The side facing the given entrant, if the entrant plays here.
    pub fn opponent_of(&self, entrant: EntrantId) -> Option<EntrantRef> {
        if self.side1 == Some(EntrantRef::Real(entrant)) {
            self.side2
        } else if self.side2 == Some(EntrantRef::Real(entrant)) {
            self.side1
        } else {
            None
        }
    }

    /// The side that lost a decided match.
    pub fn loser(&self) -> Option<EntrantRef> {
        let winner = self.winner?;
        match (self.side1, self.side2) {
            (Some(a), Some(b)) if a == winner => Some(b),
            (Some(a), Some(b)) if b == winner => Some(a),
            _ => None,
        }
    }

    /// An undecided next-round slot holding a winner against the bye
    /// sentinel, waiting for either a late feeder winner or the overdue
    /// sweep.
    pub fn is_bye_placeholder(&self) -> bool {
        if self.winner.is_some() || self.status.is_terminal() {
            return false;
        }
        matches!(
            (self.side1, self.side2),
            (Some(EntrantRef::Real(_)), Some(EntrantRef::Bye))
                | (Some(EntrantRef::Bye), Some(EntrantRef::Real(_)))
        )
    }

    /// Replace the bye side of a placeholder with an arriving winner.
    pub fn replace_bye_side(&mut self, entrant: EntrantRef) -> bool {
        if self.side1 == Some(EntrantRef::Bye) {
            self.side1 = Some(entrant);
            true
        } else if self.side2 == Some(EntrantRef::Bye) {
            self.side2 = Some(entrant);
            true
        } else {
            false
        }
    }

    /// Put an arriving entrant into the first empty slot.
    pub fn fill_first_empty(&mut self, entrant: EntrantRef) -> bool {
        if self.side1.is_none() {
            self.side1 = Some(entrant);
            true
        } else if self.side2.is_none() {
            self.side2 = Some(entrant);
            true
        } else {
            false
        }
    }
}

/// What the proposer claims happened, from their own perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultClaim {
    Win,
    Loss,
    /// Won without play (opponent forfeited)
    WalkoverWin,
    /// Lost without play
    WalkoverLoss,
}

impl ResultClaim {
    pub fn wins_for_proposer(&self) -> bool {
        matches!(self, ResultClaim::Win | ResultClaim::WalkoverWin)
    }

    pub fn is_walkover(&self) -> bool {
        matches!(self, ResultClaim::WalkoverWin | ResultClaim::WalkoverLoss)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultClaim::Win => "win",
            ResultClaim::Loss => "loss",
            ResultClaim::WalkoverWin => "walkover_win",
            ResultClaim::WalkoverLoss => "walkover_loss",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "win" => Some(ResultClaim::Win),
            "loss" => Some(ResultClaim::Loss),
            "walkover_win" => Some(ResultClaim::WalkoverWin),
            "walkover_loss" => Some(ResultClaim::WalkoverLoss),
            _ => None,
        }
    }
}

/// Proposal lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProposalStatus::Pending),
            "accepted" => Some(ProposalStatus::Accepted),
            "rejected" => Some(ProposalStatus::Rejected),
            _ => None,
        }
    }
}

/// A claimed match result awaiting the opponent's confirmation.
///
/// At most one pending proposal exists per (match, proposing side); a new
/// submission supersedes the previous pending one from the same side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultProposal {
    pub id: ProposalId,
    pub match_id: MatchId,
    /// The side that submitted the claim
    pub proposer: EntrantId,
    pub claim: ResultClaim,
    /// Claimed sets, oriented to the match's side1/side2
    pub sets: Vec<SetScore>,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
}

/// How far a player got in an elimination draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundReached {
    R1,
    R2,
    Semifinal,
    Final,
    Winner,
}

impl RoundReached {
    /// Tier for an elimination in the given main-draw round.
    pub fn from_round(round_index: u32) -> Self {
        match round_index {
            1 => RoundReached::R1,
            2 => RoundReached::R2,
            3 => RoundReached::Semifinal,
            4 => RoundReached::Final,
            _ => RoundReached::R1,
        }
    }

    /// Tier matching an exact olympic place.
    pub fn from_place(place: u32) -> Self {
        match place {
            1 => RoundReached::Winner,
            2 => RoundReached::Final,
            3 | 4 => RoundReached::Semifinal,
            5..=8 => RoundReached::R2,
            _ => RoundReached::R1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundReached::R1 => "r1",
            RoundReached::R2 => "r2",
            RoundReached::Semifinal => "semifinal",
            RoundReached::Final => "final",
            RoundReached::Winner => "winner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "r1" => Some(RoundReached::R1),
            "r2" => Some(RoundReached::R2),
            "semifinal" => Some(RoundReached::Semifinal),
            "final" => Some(RoundReached::Final),
            "winner" => Some(RoundReached::Winner),
            _ => None,
        }
    }
}

/// Per-player tournament outcome: one row per (tournament, player), written
/// only by the advancement and placement engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementResult {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub round_reached: RoundReached,
    /// Set when the row was last touched by a consolation loss
    pub is_consolation: bool,
    /// Points pushed into the ranking provider at finalization
    pub points: i64,
    /// Exact final rank (olympic ladders and the main-draw final)
    pub place: Option<u32>,
}

/// A named, store-held sweep lease. Acquiring it is the sweep's cooldown:
/// a second invocation before `expires_at` skips its run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepLease {
    pub name: String,
    pub holder: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Parameters for creating a tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentSettings {
    pub name: String,
    pub format: TournamentFormat,
    pub mode: EntrantMode,
    /// Capacity ceiling; `None` means unbounded
    pub max_entrants: Option<u32>,
    /// Below this at the registration deadline, the capacity manager alerts
    /// and eventually cancels
    pub min_entrants: Option<u32>,
    pub start_date: DateTime<Utc>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub match_days_per_round: u32,
    pub points: PointTable,
}

impl TournamentSettings {
    pub fn new(
        name: impl Into<String>,
        format: TournamentFormat,
        mode: EntrantMode,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            format,
            mode,
            max_entrants: None,
            min_entrants: None,
            start_date,
            registration_deadline: None,
            match_days_per_round: DEFAULT_MATCH_DAYS_PER_ROUND,
            points: PointTable::default(),
        }
    }

    pub fn with_entrant_bounds(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_entrants = min;
        self.max_entrants = max;
        self
    }

    pub fn with_registration_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.registration_deadline = Some(deadline);
        self
    }

    pub fn with_match_period_days(mut self, days: u32) -> Self {
        self.match_days_per_round = days;
        self
    }

    pub fn with_points(mut self, points: PointTable) -> Self {
        self.points = points;
        self
    }
}

/// A tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub format: TournamentFormat,
    pub mode: EntrantMode,
    pub status: TournamentStatus,
    pub max_entrants: Option<u32>,
    pub min_entrants: Option<u32>,
    pub start_date: DateTime<Utc>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub match_days_per_round: u32,
    /// Once true the entrant set is frozen and registration is closed
    pub bracket_generated: bool,
    pub points: PointTable,
    /// First time the capacity manager saw the entrant count below minimum;
    /// cleared by a deadline extension
    pub below_minimum_alerted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    /// Build a not-yet-persisted tournament from settings.
    pub fn from_settings(settings: TournamentSettings, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            name: settings.name,
            format: settings.format,
            mode: settings.mode,
            status: TournamentStatus::Upcoming,
            max_entrants: settings.max_entrants,
            min_entrants: settings.min_entrants,
            start_date: settings.start_date,
            registration_deadline: settings.registration_deadline,
            match_days_per_round: settings.match_days_per_round.max(1),
            bracket_generated: false,
            points: settings.points,
            below_minimum_alerted_at: None,
            created_at: now,
        }
    }

    /// Time allotted per round.
    pub fn match_period(&self) -> Duration {
        Duration::days(i64::from(self.match_days_per_round))
    }

    /// Deadline for matches of the given round: start plus one period per
    /// round played so far.
    pub fn round_deadline(&self, round_index: u32) -> DateTime<Utc> {
        self.start_date + self.match_period() * round_index as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_table_round_lookup() {
        let points = PointTable::default();
        assert_eq!(points.for_round(1), 10);
        assert_eq!(points.for_round(2), 20);
        assert_eq!(points.for_round(3), 35);
        assert_eq!(points.for_round(4), 60);
        assert_eq!(points.for_round(5), 0);
    }

    #[test]
    fn test_point_table_place_lookup() {
        let points = PointTable::default();
        assert_eq!(points.for_place(1), 100);
        assert_eq!(points.for_place(2), 60);
        assert_eq!(points.for_place(3), 35);
        assert_eq!(points.for_place(4), 35);
        assert_eq!(points.for_place(5), 20);
        assert_eq!(points.for_place(8), 20);
        assert_eq!(points.for_place(9), 10);
        assert_eq!(points.for_place(16), 10);
    }

    #[test]
    fn test_entrant_members() {
        let single = Entrant::singles(1, 10);
        assert_eq!(single.members().collect::<Vec<_>>(), vec![10]);

        let pair = Entrant::doubles(2, 10, Some(11));
        assert_eq!(pair.members().collect::<Vec<_>>(), vec![10, 11]);

        let solo = Entrant::doubles(3, 10, None);
        assert_eq!(solo.members().collect::<Vec<_>>(), vec![10]);
        assert!(!solo.is_complete());
        assert!(pair.is_complete());
        assert!(single.is_complete());
    }

    #[test]
    fn test_bye_placeholder_detection() {
        let mut m = test_match();
        m.side1 = Some(EntrantRef::Real(1));
        m.side2 = Some(EntrantRef::Bye);
        assert!(m.is_bye_placeholder());

        // A decided walkover is not a placeholder
        m.winner = Some(EntrantRef::Real(1));
        m.status = MatchStatus::Walkover;
        assert!(!m.is_bye_placeholder());

        let mut real = test_match();
        real.side1 = Some(EntrantRef::Real(1));
        real.side2 = Some(EntrantRef::Real(2));
        assert!(!real.is_bye_placeholder());
    }

    #[test]
    fn test_replace_bye_side() {
        let mut m = test_match();
        m.side1 = Some(EntrantRef::Real(1));
        m.side2 = Some(EntrantRef::Bye);
        assert!(m.replace_bye_side(EntrantRef::Real(7)));
        assert_eq!(m.side2, Some(EntrantRef::Real(7)));
        assert!(!m.replace_bye_side(EntrantRef::Real(8)));
    }

    #[test]
    fn test_fill_first_empty() {
        let mut m = test_match();
        assert!(m.fill_first_empty(EntrantRef::Real(5)));
        assert_eq!(m.side1, Some(EntrantRef::Real(5)));
        assert!(m.fill_first_empty(EntrantRef::Real(6)));
        assert_eq!(m.side2, Some(EntrantRef::Real(6)));
        assert!(!m.fill_first_empty(EntrantRef::Real(7)));
    }

    #[test]
    fn test_loser_of_decided_match() {
        let mut m = test_match();
        m.side1 = Some(EntrantRef::Real(1));
        m.side2 = Some(EntrantRef::Real(2));
        m.winner = Some(EntrantRef::Real(2));
        assert_eq!(m.loser(), Some(EntrantRef::Real(1)));
    }

    #[test]
    fn test_claim_semantics() {
        assert!(ResultClaim::Win.wins_for_proposer());
        assert!(ResultClaim::WalkoverWin.wins_for_proposer());
        assert!(!ResultClaim::Loss.wins_for_proposer());
        assert!(!ResultClaim::WalkoverLoss.wins_for_proposer());
        assert!(ResultClaim::WalkoverWin.is_walkover());
        assert!(ResultClaim::WalkoverLoss.is_walkover());
        assert!(!ResultClaim::Win.is_walkover());
    }

    #[test]
    fn test_round_reached_mappings() {
        assert_eq!(RoundReached::from_round(1), RoundReached::R1);
        assert_eq!(RoundReached::from_round(3), RoundReached::Semifinal);
        assert_eq!(RoundReached::from_round(9), RoundReached::R1);
        assert_eq!(RoundReached::from_place(1), RoundReached::Winner);
        assert_eq!(RoundReached::from_place(4), RoundReached::Semifinal);
        assert_eq!(RoundReached::from_place(7), RoundReached::R2);
        assert_eq!(RoundReached::from_place(12), RoundReached::R1);
    }

    #[test]
    fn test_round_deadlines_scale_with_period() {
        let start = Utc::now();
        let mut settings = TournamentSettings::new(
            "Spring Open",
            TournamentFormat::SingleElimination,
            EntrantMode::Singles,
            start,
        );
        settings = settings.with_match_period_days(3);
        let t = Tournament::from_settings(settings, start);
        assert_eq!(t.round_deadline(1), start + Duration::days(3));
        assert_eq!(t.round_deadline(4), start + Duration::days(12));
    }

    #[test]
    fn test_status_round_trips() {
        for status in [
            TournamentStatus::Upcoming,
            TournamentStatus::Active,
            TournamentStatus::Completed,
            TournamentStatus::Cancelled,
        ] {
            assert_eq!(TournamentStatus::parse(status.as_str()), Some(status));
        }
        for status in [
            MatchStatus::Scheduled,
            MatchStatus::InProgress,
            MatchStatus::Completed,
            MatchStatus::Walkover,
            MatchStatus::Cancelled,
        ] {
            assert_eq!(MatchStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TournamentStatus::parse("paused"), None);
    }

    fn test_match() -> Match {
        Match {
            id: 1,
            tournament_id: 1,
            round_index: 1,
            round_order: 1,
            is_consolation: false,
            placement_min: None,
            placement_max: None,
            side1: None,
            side2: None,
            status: MatchStatus::Scheduled,
            deadline: None,
            winner: None,
            sets: Vec::new(),
            next_match: None,
            loser_next_match: None,
            completed_at: None,
        }
    }
}
