//! Matchday Fixture Store Contract
//!
//! Record of the betting pool's reference data and round lifecycle: the
//! registered clubs, each round of ten games, the round's betting deadline,
//! and the official score lines written at settlement. The pool is a single
//! global one, so at most one round is ever open for betting; the store
//! enforces that when a round is opened and still reports "no active round"
//! and "more than one active round" as distinct, non-fatal conditions on
//! the read side.
//!
//! ## Storage Strategy
//! - `instance()`: Admin, authorized-writer allowlist, and the id counters.
//!   Small fixed-size config sharing one ledger entry and TTL.
//! - `persistent()`: per-team, per-round, per-game, and per-result entries,
//!   plus the active-round list. Each has its own TTL, bumped on every
//!   write, so cost does not scale with seasons of history.
//!
//! A game's official result is a separate `Result(game_id)` entry; its
//! absence means the game has not been played. The outcome sign is never
//! stored, only re-derived from the goal pair.
#![no_std]
#![allow(unexpected_cfgs)]

use matchday_shared::ROUND_GAMES;
use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env, String, Vec,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    NotAuthorized = 3,
    TeamNotFound = 4,
    InvalidTeamName = 5,
    InvalidRoundId = 6,
    DuplicateRound = 7,
    InvalidRoundSize = 8,
    InvalidMatchup = 9,
    InvalidDeadline = 10,
    RoundAlreadyActive = 11,
    NoActiveRound = 12,
    MultipleActiveRounds = 13,
    RoundNotFound = 14,
    GameNotFound = 15,
    ResultNotRecorded = 16,
    ResultAlreadyRecorded = 17,
    AlreadySettled = 18,
    RoundIncomplete = 19,
    Overflow = 20,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

/// Discriminants for all storage keys.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Admin,
    Authorized(Address),
    NextTeamId,
    NextGameId,
    // --- persistent() ---
    Team(u32),
    Teams,
    Round(u32),
    Game(u64),
    /// Official score line, present only once the game has been played.
    Result(u64),
    /// Round ids currently open for betting. Kept as a list so the read
    /// side can report zero and more-than-one as distinct conditions.
    ActiveRounds,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TeamData {
    pub team_id: u32,
    pub name: String,
}

/// Home/away pairing supplied when a round is opened.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GamePair {
    pub home_team: u32,
    pub away_team: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameData {
    pub game_id: u64,
    pub home_team: u32,
    pub away_team: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScoreLine {
    pub home_goals: u32,
    pub away_goals: u32,
}

/// Official score for one game, as submitted at settlement.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameResult {
    pub game_id: u64,
    pub home_goals: u32,
    pub away_goals: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RoundStatus {
    Active = 0,
    Settled = 1,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundData {
    pub round_id: u32,
    pub bets_accepted_by: u64,
    pub status: RoundStatus,
    pub game_ids: Vec<u64>,
}

/// A game with both club records populated, for display and bet entry.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameView {
    pub game_id: u64,
    pub home_team: TeamData,
    pub away_team: TeamData,
}

/// The unique active round with its games and club data joined in.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActiveRoundView {
    pub round_id: u32,
    pub bets_accepted_by: u64,
    pub games: Vec<GameView>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct TeamRegistered {
    #[topic]
    pub team_id: u32,
    pub name: String,
}

#[contractevent]
pub struct RoundOpened {
    #[topic]
    pub round_id: u32,
    pub bets_accepted_by: u64,
}

#[contractevent]
pub struct ResultRecorded {
    #[topic]
    pub round_id: u32,
    #[topic]
    pub game_id: u64,
    pub home_goals: u32,
    pub away_goals: u32,
}

#[contractevent]
pub struct RoundClosed {
    #[topic]
    pub round_id: u32,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct FixtureStore;

#[contractimpl]
impl FixtureStore {
    /// Initialize the store with an admin. May only be called once.
    pub fn init(env: Env, admin: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::NextTeamId, &0u32);
        env.storage().instance().set(&DataKey::NextGameId, &0u64);

        Ok(())
    }

    /// Authorize or deauthorize an address (the settlement contract) to
    /// write official results and close rounds.
    pub fn set_authorized(env: Env, admin: Address, addr: Address, auth: bool) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        env.storage()
            .instance()
            .set(&DataKey::Authorized(addr), &auth);
        Ok(())
    }

    /// Register a club and return its id. Admin only.
    pub fn register_team(env: Env, admin: Address, name: String) -> Result<u32, Error> {
        require_admin(&env, &admin)?;

        if name.is_empty() {
            return Err(Error::InvalidTeamName);
        }

        let next: u32 = env
            .storage()
            .instance()
            .get(&DataKey::NextTeamId)
            .unwrap_or(0);
        let team_id = next.checked_add(1).ok_or(Error::Overflow)?;
        env.storage().instance().set(&DataKey::NextTeamId, &team_id);

        let team = TeamData {
            team_id,
            name: name.clone(),
        };
        set_persistent(&env, DataKey::Team(team_id), &team);

        let mut teams: Vec<u32> = env
            .storage()
            .persistent()
            .get(&DataKey::Teams)
            .unwrap_or(Vec::new(&env));
        teams.push_back(team_id);
        set_persistent(&env, DataKey::Teams, &teams);

        TeamRegistered { team_id, name }.publish(&env);

        Ok(team_id)
    }

    /// All registered clubs in registration order.
    pub fn get_teams(env: Env) -> Result<Vec<TeamData>, Error> {
        require_initialized(&env)?;

        let ids: Vec<u32> = env
            .storage()
            .persistent()
            .get(&DataKey::Teams)
            .unwrap_or(Vec::new(&env));

        let mut teams = Vec::new(&env);
        for id in ids.iter() {
            teams.push_back(get_team(&env, id)?);
        }

        Ok(teams)
    }

    pub fn get_team(env: Env, team_id: u32) -> Result<TeamData, Error> {
        require_initialized(&env)?;
        get_team(&env, team_id)
    }

    /// Open a new round of exactly ten games, numbered `round_id`, accepting
    /// bets until `bets_accepted_by`.
    ///
    /// Creation and activation are one atomic step: the call is rejected
    /// outright while any round is still active, which is what keeps the
    /// single-active-round invariant from ever being violated at write time.
    pub fn open_round(
        env: Env,
        admin: Address,
        round_id: u32,
        games: Vec<GamePair>,
        bets_accepted_by: u64,
    ) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        if round_id == 0 {
            return Err(Error::InvalidRoundId);
        }

        if games.len() != ROUND_GAMES {
            return Err(Error::InvalidRoundSize);
        }

        if bets_accepted_by <= env.ledger().timestamp() {
            return Err(Error::InvalidDeadline);
        }

        if env.storage().persistent().has(&DataKey::Round(round_id)) {
            return Err(Error::DuplicateRound);
        }

        let mut actives: Vec<u32> = env
            .storage()
            .persistent()
            .get(&DataKey::ActiveRounds)
            .unwrap_or(Vec::new(&env));
        if !actives.is_empty() {
            return Err(Error::RoundAlreadyActive);
        }

        let mut next: u64 = env
            .storage()
            .instance()
            .get(&DataKey::NextGameId)
            .unwrap_or(0);

        let mut game_ids = Vec::new(&env);
        for pair in games.iter() {
            if pair.home_team == pair.away_team {
                return Err(Error::InvalidMatchup);
            }
            get_team(&env, pair.home_team)?;
            get_team(&env, pair.away_team)?;

            next = next.checked_add(1).ok_or(Error::Overflow)?;
            let game = GameData {
                game_id: next,
                home_team: pair.home_team,
                away_team: pair.away_team,
            };
            set_persistent(&env, DataKey::Game(next), &game);
            game_ids.push_back(next);
        }
        env.storage().instance().set(&DataKey::NextGameId, &next);

        let round = RoundData {
            round_id,
            bets_accepted_by,
            status: RoundStatus::Active,
            game_ids,
        };
        set_persistent(&env, DataKey::Round(round_id), &round);

        actives.push_back(round_id);
        set_persistent(&env, DataKey::ActiveRounds, &actives);

        RoundOpened {
            round_id,
            bets_accepted_by,
        }
        .publish(&env);

        Ok(())
    }

    /// The unique active round with games and clubs populated.
    ///
    /// Zero and more-than-one active rounds are reported as distinct
    /// conditions; callers must treat both as "betting unavailable". No
    /// betting-window check happens here — the settled-score entry form
    /// needs this view after the window has closed.
    pub fn get_active_round(env: Env) -> Result<ActiveRoundView, Error> {
        require_initialized(&env)?;

        let actives: Vec<u32> = env
            .storage()
            .persistent()
            .get(&DataKey::ActiveRounds)
            .unwrap_or(Vec::new(&env));

        if actives.is_empty() {
            return Err(Error::NoActiveRound);
        }
        if actives.len() > 1 {
            return Err(Error::MultipleActiveRounds);
        }

        let round = get_round(&env, actives.get_unchecked(0))?;

        let mut games = Vec::new(&env);
        for game_id in round.game_ids.iter() {
            let game = get_game(&env, game_id)?;
            games.push_back(GameView {
                game_id,
                home_team: get_team(&env, game.home_team)?,
                away_team: get_team(&env, game.away_team)?,
            });
        }

        Ok(ActiveRoundView {
            round_id: round.round_id,
            bets_accepted_by: round.bets_accepted_by,
            games,
        })
    }

    /// Whether the round is still accepting bets. Pure clock comparison.
    pub fn is_betting_open(env: Env, round_id: u32) -> Result<bool, Error> {
        require_initialized(&env)?;
        let round = get_round(&env, round_id)?;
        Ok(env.ledger().timestamp() < round.bets_accepted_by)
    }

    pub fn get_round(env: Env, round_id: u32) -> Result<RoundData, Error> {
        require_initialized(&env)?;
        get_round(&env, round_id)
    }

    pub fn get_game(env: Env, game_id: u64) -> Result<GameData, Error> {
        require_initialized(&env)?;
        get_game(&env, game_id)
    }

    /// The official score line for a played game.
    pub fn get_result(env: Env, game_id: u64) -> Result<ScoreLine, Error> {
        require_initialized(&env)?;

        if !env.storage().persistent().has(&DataKey::Game(game_id)) {
            return Err(Error::GameNotFound);
        }

        env.storage()
            .persistent()
            .get(&DataKey::Result(game_id))
            .ok_or(Error::ResultNotRecorded)
    }

    /// Write the official score for every game of a still-active round.
    /// Authorized callers only. Each score line is written exactly once and
    /// the supplied results must cover the round's ten games exactly.
    pub fn record_results(
        env: Env,
        caller: Address,
        round_id: u32,
        results: Vec<GameResult>,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_authorized(&env, &caller)?;

        let round = get_round(&env, round_id)?;
        if round.status == RoundStatus::Settled {
            return Err(Error::AlreadySettled);
        }

        if results.len() != ROUND_GAMES {
            return Err(Error::InvalidRoundSize);
        }

        for result in results.iter() {
            if !contains_game(&round.game_ids, result.game_id) {
                return Err(Error::GameNotFound);
            }

            let result_key = DataKey::Result(result.game_id);
            if env.storage().persistent().has(&result_key) {
                return Err(Error::ResultAlreadyRecorded);
            }

            let line = ScoreLine {
                home_goals: result.home_goals,
                away_goals: result.away_goals,
            };
            set_persistent(&env, result_key, &line);

            ResultRecorded {
                round_id,
                game_id: result.game_id,
                home_goals: result.home_goals,
                away_goals: result.away_goals,
            }
            .publish(&env);
        }

        Ok(())
    }

    /// Flip an active round to settled, exactly once. Authorized callers
    /// only. Requires every game's official score to have been recorded;
    /// a settled round is never reopened.
    pub fn mark_settled(env: Env, caller: Address, round_id: u32) -> Result<(), Error> {
        require_initialized(&env)?;
        require_authorized(&env, &caller)?;

        let mut round = get_round(&env, round_id)?;
        if round.status == RoundStatus::Settled {
            return Err(Error::AlreadySettled);
        }

        for game_id in round.game_ids.iter() {
            if !env.storage().persistent().has(&DataKey::Result(game_id)) {
                return Err(Error::RoundIncomplete);
            }
        }

        round.status = RoundStatus::Settled;
        set_persistent(&env, DataKey::Round(round_id), &round);

        let mut actives: Vec<u32> = env
            .storage()
            .persistent()
            .get(&DataKey::ActiveRounds)
            .unwrap_or(Vec::new(&env));
        let mut found: Option<u32> = None;
        for i in 0..actives.len() {
            if actives.get_unchecked(i) == round_id {
                found = Some(i);
                break;
            }
        }
        if let Some(idx) = found {
            actives.remove(idx);
            set_persistent(&env, DataKey::ActiveRounds, &actives);
        }

        RoundClosed { round_id }.publish(&env);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

/// Verify that `caller` is the stored admin and has signed the invocation.
fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin: Address = env
        .storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn require_authorized(env: &Env, caller: &Address) -> Result<(), Error> {
    caller.require_auth();
    if !env
        .storage()
        .instance()
        .get(&DataKey::Authorized(caller.clone()))
        .unwrap_or(false)
    {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn get_team(env: &Env, team_id: u32) -> Result<TeamData, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Team(team_id))
        .ok_or(Error::TeamNotFound)
}

fn get_round(env: &Env, round_id: u32) -> Result<RoundData, Error> {
    if round_id == 0 {
        return Err(Error::InvalidRoundId);
    }

    env.storage()
        .persistent()
        .get(&DataKey::Round(round_id))
        .ok_or(Error::RoundNotFound)
}

fn get_game(env: &Env, game_id: u64) -> Result<GameData, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Game(game_id))
        .ok_or(Error::GameNotFound)
}

fn contains_game(game_ids: &Vec<u64>, game_id: u64) -> bool {
    for id in game_ids.iter() {
        if id == game_id {
            return true;
        }
    }
    false
}

fn set_persistent<T>(env: &Env, key: DataKey, value: &T)
where
    T: soroban_sdk::IntoVal<Env, soroban_sdk::Val>,
{
    env.storage().persistent().set(&key, value);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
