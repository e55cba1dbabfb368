//! Matchday Settlement Engine Contract
//!
//! The one-time conversion of a round's official scores into bettor
//! counters and club season stats. Settling a round:
//!
//! 1. writes each game's official score line into the fixture store,
//! 2. folds every bettor's ten predictions into a single counter delta
//!    (exact score, correct sign, points per the configured weights) and
//!    applies it with one standings call per bettor,
//! 3. folds each game's result into both clubs' season stats,
//! 4. flips the round to settled, exactly once.
//!
//! A second settlement attempt fails on the `AlreadySettled` guard before
//! touching anything. Everything after the typed precondition checks runs
//! inside the one invocation: if any downstream write fails, the call traps
//! and the ledger rolls the whole transaction back, so a failed settlement
//! leaves the round active and no totals applied, and a retry is safe.
//!
//! The exact and sign-only point weights are contract configuration, set at
//! init and adjustable by the admin between rounds — never literals in the
//! scoring path.
#![no_std]
#![allow(unexpected_cfgs)]

use matchday_bet_ledger::BetLedgerClient;
use matchday_fixtures as fixtures;
use matchday_fixtures::{FixtureStoreClient, GameResult, RoundStatus};
use matchday_shared::{derive_sign, ScoringWeights, ROUND_GAMES};
use matchday_standings::StandingsClient;
use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env, Map, Vec,
};

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
    InvalidWeights = 4,
    RoundNotFound = 5,
    AlreadySettled = 6,
    InvalidResultCount = 7,
    UnknownGame = 8,
    DuplicateGame = 9,
    FixtureLookupFailed = 10,
    Overflow = 11,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

/// All keys live in instance storage: the engine holds addresses and the
/// scoring policy, never per-round data — that belongs to the stores it
/// writes into.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    Fixtures,
    BetLedger,
    Standings,
    Weights,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct Initialized {
    pub admin: Address,
    pub exact: u32,
    pub sign_only: u32,
}

#[contractevent]
pub struct WeightsUpdated {
    pub exact: u32,
    pub sign_only: u32,
}

#[contractevent]
pub struct RoundSettled {
    #[topic]
    pub round_id: u32,
    pub bettors: u32,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct SettlementEngine;

#[contractimpl]
impl SettlementEngine {
    /// Initialize with an admin, the three stores, and the scoring policy.
    /// Call once. The engine must also be allowlisted on the fixture store
    /// and the standings contract before the first settlement.
    pub fn init(
        env: Env,
        admin: Address,
        fixtures: Address,
        bet_ledger: Address,
        standings: Address,
        weights: ScoringWeights,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        if !weights.is_valid() {
            return Err(Error::InvalidWeights);
        }

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Fixtures, &fixtures);
        env.storage()
            .instance()
            .set(&DataKey::BetLedger, &bet_ledger);
        env.storage().instance().set(&DataKey::Standings, &standings);
        env.storage().instance().set(&DataKey::Weights, &weights);

        Initialized {
            admin,
            exact: weights.exact,
            sign_only: weights.sign_only,
        }
        .publish(&env);

        Ok(())
    }

    /// Update the scoring policy. Admin only. Takes effect for rounds
    /// settled after the update; already-applied totals are never revised.
    pub fn set_weights(env: Env, admin: Address, weights: ScoringWeights) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        if !weights.is_valid() {
            return Err(Error::InvalidWeights);
        }

        env.storage().instance().set(&DataKey::Weights, &weights);

        WeightsUpdated {
            exact: weights.exact,
            sign_only: weights.sign_only,
        }
        .publish(&env);

        Ok(())
    }

    pub fn get_weights(env: Env) -> Result<ScoringWeights, Error> {
        require_initialized(&env)?;

        env.storage()
            .instance()
            .get(&DataKey::Weights)
            .ok_or(Error::NotInitialized)
    }

    /// Settle a round against its official final scores. Admin only.
    pub fn settle_round(
        env: Env,
        admin: Address,
        round_id: u32,
        results: Vec<GameResult>,
    ) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        let fixtures_client = FixtureStoreClient::new(&env, &get_address(&env, DataKey::Fixtures)?);

        let round = match fixtures_client.try_get_round(&round_id) {
            Ok(Ok(round)) => round,
            Err(Ok(fixtures::Error::RoundNotFound)) | Err(Ok(fixtures::Error::InvalidRoundId)) => {
                return Err(Error::RoundNotFound)
            }
            _ => return Err(Error::FixtureLookupFailed),
        };

        // The idempotency guard: a settled round is final, a second call
        // must never double-award.
        if round.status == RoundStatus::Settled {
            return Err(Error::AlreadySettled);
        }

        if results.len() != ROUND_GAMES {
            return Err(Error::InvalidResultCount);
        }

        let mut round_games: Map<u64, bool> = Map::new(&env);
        for game_id in round.game_ids.iter() {
            round_games.set(game_id, true);
        }

        let mut official: Map<u64, GameResult> = Map::new(&env);
        for result in results.iter() {
            if !round_games.contains_key(result.game_id) {
                return Err(Error::UnknownGame);
            }
            if official.contains_key(result.game_id) {
                return Err(Error::DuplicateGame);
            }
            official.set(result.game_id, result);
        }

        let weights = get_weights_internal(&env)?;
        let engine = env.current_contract_address();

        // 1. Official scores into the fixture store.
        fixtures_client.record_results(&engine, &round_id, &results);

        // 2. One batched counter delta per bettor.
        let ledger = BetLedgerClient::new(&env, &get_address(&env, DataKey::BetLedger)?);
        let standings = StandingsClient::new(&env, &get_address(&env, DataKey::Standings)?);

        let bettors = ledger.bettors(&round_id);
        for user in bettors.iter() {
            let slip = ledger.get_user_bets(&user, &round_id);

            let mut scores_delta: u32 = 0;
            let mut signs_delta: u32 = 0;
            let mut points_delta: u32 = 0;

            for line in slip.iter() {
                let result = official.get(line.game_id).ok_or(Error::UnknownGame)?;

                if line.home_goals == result.home_goals && line.away_goals == result.away_goals {
                    scores_delta = scores_delta.checked_add(1).ok_or(Error::Overflow)?;
                    signs_delta = signs_delta.checked_add(1).ok_or(Error::Overflow)?;
                    points_delta = points_delta
                        .checked_add(weights.exact)
                        .ok_or(Error::Overflow)?;
                } else if derive_sign(line.home_goals, line.away_goals)
                    == derive_sign(result.home_goals, result.away_goals)
                {
                    signs_delta = signs_delta.checked_add(1).ok_or(Error::Overflow)?;
                    points_delta = points_delta
                        .checked_add(weights.sign_only)
                        .ok_or(Error::Overflow)?;
                }
            }

            // Applied even when everything missed, so the bettor still
            // shows up in the table with zeroes.
            standings.record_bettor_round(&engine, &user, &scores_delta, &signs_delta, &points_delta);
        }

        // 3. Club season stats, one call per game.
        for game_id in round.game_ids.iter() {
            let game = fixtures_client.get_game(&game_id);
            let result = official.get(game_id).ok_or(Error::UnknownGame)?;
            standings.record_game_result(
                &engine,
                &game.home_team,
                &game.away_team,
                &result.home_goals,
                &result.away_goals,
            );
        }

        // 4. Flip the round, exactly once.
        fixtures_client.mark_settled(&engine, &round_id);

        RoundSettled {
            round_id,
            bettors: bettors.len(),
        }
        .publish(&env);

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

fn get_address(env: &Env, key: DataKey) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&key)
        .ok_or(Error::NotInitialized)
}

fn get_weights_internal(env: &Env) -> Result<ScoringWeights, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Weights)
        .ok_or(Error::NotInitialized)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
