//! Matchday Bet Ledger Contract
//!
//! Per-user predictions for the active round. A user's ten predicted score
//! lines are held as one slip entry, written whole on every submission, so
//! a resubmission replaces the previous slip atomically — there is no
//! delete-then-insert window in which a double-click could leave a partial
//! or duplicated bet set.
//!
//! Round state is resolved through the fixture store on every call; its
//! "no active round" and "more than one active round" conditions are passed
//! through typed, and both mean betting is unavailable.
#![no_std]
#![allow(unexpected_cfgs)]

use matchday_fixtures as fixtures;
use matchday_fixtures::{ActiveRoundView, FixtureStoreClient};
use matchday_shared::ROUND_GAMES;
use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env, Map, Vec,
};

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
    NoActiveRound = 3,
    MultipleActiveRounds = 4,
    RoundNotActive = 5,
    BettingClosed = 6,
    IncompleteSubmission = 7,
    UnknownGame = 8,
    DuplicateGame = 9,
    SlipNotFound = 10,
    FixtureLookupFailed = 11,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Admin,
    Fixtures,
    // --- persistent() ---
    /// A user's whole slip for a round, in the round's game order.
    Slip(u32, Address),
    /// Everyone who has a slip for the round, in first-submission order.
    Bettors(u32),
}

/// One predicted score line.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BetLine {
    pub game_id: u64,
    pub home_goals: u32,
    pub away_goals: u32,
}

/// The active round together with the caller's existing lines, if any.
/// Backs the bet-entry form: an empty `bets` means a first submission,
/// a populated one pre-fills the form for a replacement.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserRoundView {
    pub round: ActiveRoundView,
    pub bets: Vec<BetLine>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct SlipSubmitted {
    #[topic]
    pub round_id: u32,
    #[topic]
    pub user: Address,
    pub replaced: bool,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct BetLedger;

#[contractimpl]
impl BetLedger {
    /// Initialize with an admin and the fixture store address. Call once.
    pub fn init(env: Env, admin: Address, fixtures: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Fixtures, &fixtures);

        Ok(())
    }

    /// Submit or replace the caller's ten predictions for the active round.
    ///
    /// The round must be the active one and its betting window still open.
    /// The predictions must cover the round's games exactly; they are
    /// normalized into the round's game order and stored as one entry, so
    /// the previous slip (if any) is swapped out wholesale.
    pub fn submit(
        env: Env,
        user: Address,
        round_id: u32,
        predictions: Vec<BetLine>,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        user.require_auth();

        let view = active_round(&env)?;
        if view.round_id != round_id {
            return Err(Error::RoundNotActive);
        }

        if env.ledger().timestamp() >= view.bets_accepted_by {
            return Err(Error::BettingClosed);
        }

        if predictions.len() != ROUND_GAMES {
            return Err(Error::IncompleteSubmission);
        }

        let mut round_games: Map<u64, bool> = Map::new(&env);
        for game in view.games.iter() {
            round_games.set(game.game_id, true);
        }

        let mut by_game: Map<u64, BetLine> = Map::new(&env);
        for line in predictions.iter() {
            if !round_games.contains_key(line.game_id) {
                return Err(Error::UnknownGame);
            }
            if by_game.contains_key(line.game_id) {
                return Err(Error::DuplicateGame);
            }
            by_game.set(line.game_id, line);
        }

        let mut slip = Vec::new(&env);
        for game in view.games.iter() {
            let line = by_game
                .get(game.game_id)
                .ok_or(Error::IncompleteSubmission)?;
            slip.push_back(line);
        }

        let slip_key = DataKey::Slip(round_id, user.clone());
        let replaced = env.storage().persistent().has(&slip_key);
        set_persistent(&env, slip_key, &slip);

        if !replaced {
            let bettors_key = DataKey::Bettors(round_id);
            let mut bettors: Vec<Address> = env
                .storage()
                .persistent()
                .get(&bettors_key)
                .unwrap_or(Vec::new(&env));
            bettors.push_back(user.clone());
            set_persistent(&env, bettors_key, &bettors);
        }

        SlipSubmitted {
            round_id,
            user,
            replaced,
        }
        .publish(&env);

        Ok(())
    }

    /// The active round with the caller's existing lines merged in.
    /// Unavailable once the betting window has closed — at that point the
    /// round is waiting on official scores, not on more bets.
    pub fn get_active_round(env: Env, user: Address) -> Result<UserRoundView, Error> {
        require_initialized(&env)?;

        let view = active_round(&env)?;

        if env.ledger().timestamp() >= view.bets_accepted_by {
            return Err(Error::BettingClosed);
        }

        let bets: Vec<BetLine> = env
            .storage()
            .persistent()
            .get(&DataKey::Slip(view.round_id, user))
            .unwrap_or(Vec::new(&env));

        Ok(UserRoundView { round: view, bets })
    }

    /// The user's ten lines for a round, in the round's game order.
    pub fn get_user_bets(env: Env, user: Address, round_id: u32) -> Result<Vec<BetLine>, Error> {
        require_initialized(&env)?;

        env.storage()
            .persistent()
            .get(&DataKey::Slip(round_id, user))
            .ok_or(Error::SlipNotFound)
    }

    /// Everyone with a slip for the round, in first-submission order.
    pub fn bettors(env: Env, round_id: u32) -> Result<Vec<Address>, Error> {
        require_initialized(&env)?;

        Ok(env
            .storage()
            .persistent()
            .get(&DataKey::Bettors(round_id))
            .unwrap_or(Vec::new(&env)))
    }

    pub fn get_fixtures(env: Env) -> Result<Address, Error> {
        require_initialized(&env)?;

        env.storage()
            .instance()
            .get(&DataKey::Fixtures)
            .ok_or(Error::NotInitialized)
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

/// Resolve the unique active round through the fixture store, keeping its
/// zero/multiple conditions typed instead of letting them trap.
fn active_round(env: &Env) -> Result<ActiveRoundView, Error> {
    let fixtures_addr: Address = env
        .storage()
        .instance()
        .get(&DataKey::Fixtures)
        .ok_or(Error::NotInitialized)?;

    match FixtureStoreClient::new(env, &fixtures_addr).try_get_active_round() {
        Ok(Ok(view)) => Ok(view),
        Err(Ok(fixtures::Error::NoActiveRound)) => Err(Error::NoActiveRound),
        Err(Ok(fixtures::Error::MultipleActiveRounds)) => Err(Error::MultipleActiveRounds),
        _ => Err(Error::FixtureLookupFailed),
    }
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
