//! Full pool lifecycle: open a round, bet, enter official scores, settle,
//! and read both tables back.

use matchday_bet_ledger::{BetLedger, BetLedgerClient, BetLine};
use matchday_fixtures::{FixtureStore, FixtureStoreClient, GamePair, GameResult, RoundStatus};
use matchday_settlement::{SettlementEngine, SettlementEngineClient};
use matchday_shared::ScoringWeights;
use matchday_standings::{Standings, StandingsClient};
use soroban_sdk::{
    testutils::{Address as _, Ledger as _},
    Address, Env, String, Vec,
};

const DEADLINE: u64 = 10_000;

#[test]
fn test_round_lifecycle_end_to_end() {
    let env = Env::default();
    let admin = Address::generate(&env);

    let fixtures_id = env.register(FixtureStore, ());
    let fixtures = FixtureStoreClient::new(&env, &fixtures_id);
    let ledger_id = env.register(BetLedger, ());
    let ledger = BetLedgerClient::new(&env, &ledger_id);
    let standings_id = env.register(Standings, ());
    let standings = StandingsClient::new(&env, &standings_id);
    let engine_id = env.register(SettlementEngine, ());
    let engine = SettlementEngineClient::new(&env, &engine_id);

    env.mock_all_auths();
    fixtures.init(&admin);
    ledger.init(&admin, &fixtures_id);
    standings.init(&admin, &fixtures_id);
    engine.init(
        &admin,
        &fixtures_id,
        &ledger_id,
        &standings_id,
        &ScoringWeights {
            exact: 3,
            sign_only: 1,
        },
    );
    fixtures.set_authorized(&admin, &engine_id, &true);
    standings.set_authorized(&admin, &engine_id, &true);

    // Twenty clubs, one round of ten games.
    let mut team_ids = Vec::new(&env);
    for i in 0..20u32 {
        let name = if i % 2 == 0 { "Home Club" } else { "Away Club" };
        team_ids.push_back(fixtures.register_team(&admin, &String::from_str(&env, name)));
    }
    let mut games = Vec::new(&env);
    for i in 0..10u32 {
        games.push_back(GamePair {
            home_team: team_ids.get_unchecked(i * 2),
            away_team: team_ids.get_unchecked(i * 2 + 1),
        });
    }
    fixtures.open_round(&admin, &1u32, &games, &DEADLINE);

    // A bettor fills in the whole slip off the active-round view.
    let bettor = Address::generate(&env);
    let view = ledger.get_active_round(&bettor);
    assert_eq!(view.round.games.len(), 10);
    assert_eq!(view.bets.len(), 0);

    let mut slip = Vec::new(&env);
    for game in view.round.games.iter() {
        slip.push_back(BetLine {
            game_id: game.game_id,
            home_goals: 2,
            away_goals: 0,
        });
    }
    ledger.submit(&bettor, &1u32, &slip);
    assert_eq!(ledger.get_user_bets(&bettor, &1u32), slip);

    // Window closes; the admin enters the official scores. The bettor hit
    // three exact 2-0s, two more home wins with the wrong score, and
    // missed the rest.
    env.ledger().with_mut(|li| li.timestamp = DEADLINE);

    let round = fixtures.get_round(&1u32);
    let mut results = Vec::new(&env);
    for i in 0..round.game_ids.len() {
        let (home_goals, away_goals) = match i {
            0 | 1 | 2 => (2, 0),
            3 | 4 => (1, 0),
            _ => (0, 0),
        };
        results.push_back(GameResult {
            game_id: round.game_ids.get_unchecked(i),
            home_goals,
            away_goals,
        });
    }
    engine.settle_round(&admin, &1u32, &results);

    // Totals applied once: 3 exact, 5 correct signs, 3*3 + 2*1 points.
    let totals = standings.get_user_totals(&bettor);
    assert_eq!(totals.guessed_scores, 3);
    assert_eq!(totals.guessed_signs, 5);
    assert_eq!(totals.points, 11);

    let rows = standings.bettor_standings();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.get_unchecked(0).user, bettor);
    assert_eq!(rows.get_unchecked(0).points, 11);

    // Five home wins and five goalless draws across the club table.
    let clubs = standings.club_standings();
    assert_eq!(clubs.len(), 20);
    let top = clubs.get_unchecked(0);
    assert_eq!(top.stats.points, 3);
    assert_eq!(top.stats.goals_scored, 2);

    // The round is closed for good.
    assert_eq!(fixtures.get_round(&1u32).status, RoundStatus::Settled);
    assert!(fixtures.try_get_active_round().is_err());

    let again = engine.try_settle_round(&admin, &1u32, &results);
    assert!(again.is_err());
}
