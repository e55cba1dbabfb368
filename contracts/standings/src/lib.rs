//! Matchday Standings Contract
//!
//! Cumulative bettor counters and club season stats, plus the two ranked
//! tables computed from them. Only authorized callers (the settlement
//! contract) may write; both tables are re-sorted from the persisted totals
//! on every read, so no cached rank can ever disagree with the latest
//! settled round.
//!
//! ## Ordering
//! Clubs: points desc, then goal difference desc. Bettors: points desc,
//! then correct signs desc, then exact scores desc. Remaining ties keep
//! first-tracked order, which is the order in which settlement first wrote
//! a row for the club or bettor.
#![no_std]
#![allow(unexpected_cfgs)]

use matchday_fixtures::FixtureStoreClient;
use matchday_shared::{club_points, derive_sign, Sign};
use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env, String, Vec,
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
    NotAuthorized = 3,
    /// Nothing to rank yet. An expected condition, not a failure.
    EmptyStandings = 4,
    TeamNotFound = 5,
    Overflow = 6,
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
    Authorized(Address),
    // --- persistent() ---
    UserTotals(Address),
    /// Bettors with totals, in first-scored order.
    Bettors,
    TeamStats(u32),
    /// Clubs with stats, in first-played order.
    Teams,
}

/// Cumulative bettor counters. Only ever incremented, one batch per
/// settled round.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserTotals {
    pub guessed_scores: u32,
    pub guessed_signs: u32,
    pub points: u64,
}

/// Cumulative club season stats.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TeamSeasonStats {
    pub games_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_scored: u32,
    pub goals_conceded: u32,
    pub points: u32,
}

/// One club table row, stats joined with the club's record.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClubRow {
    pub team_id: u32,
    pub name: String,
    pub stats: TeamSeasonStats,
}

/// One bettor table row.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BettorRow {
    pub user: Address,
    pub guessed_scores: u32,
    pub guessed_signs: u32,
    pub points: u64,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct BettorTotalsUpdated {
    #[topic]
    pub user: Address,
    pub points: u64,
}

#[contractevent]
pub struct ClubStatsUpdated {
    #[topic]
    pub team_id: u32,
    pub points: u32,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct Standings;

#[contractimpl]
impl Standings {
    /// Initialize with an admin and the fixture store used for the club
    /// record join. Call once.
    pub fn init(env: Env, admin: Address, fixtures: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Fixtures, &fixtures);

        Ok(())
    }

    /// Authorize or deauthorize an address (the settlement contract) to
    /// write totals.
    pub fn set_authorized(env: Env, admin: Address, addr: Address, auth: bool) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        env.storage()
            .instance()
            .set(&DataKey::Authorized(addr), &auth);
        Ok(())
    }

    /// Apply one settled round's worth of counter deltas for a bettor.
    /// Authorized callers only. Settlement folds a bettor's ten games into
    /// a single call, so a half-applied round can never be observed here.
    pub fn record_bettor_round(
        env: Env,
        caller: Address,
        user: Address,
        scores_delta: u32,
        signs_delta: u32,
        points_delta: u32,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_authorized(&env, &caller)?;

        let totals_key = DataKey::UserTotals(user.clone());
        let known = env.storage().persistent().has(&totals_key);
        let mut totals: UserTotals = env
            .storage()
            .persistent()
            .get(&totals_key)
            .unwrap_or(UserTotals {
                guessed_scores: 0,
                guessed_signs: 0,
                points: 0,
            });

        totals.guessed_scores = totals
            .guessed_scores
            .checked_add(scores_delta)
            .ok_or(Error::Overflow)?;
        totals.guessed_signs = totals
            .guessed_signs
            .checked_add(signs_delta)
            .ok_or(Error::Overflow)?;
        totals.points = totals
            .points
            .checked_add(points_delta as u64)
            .ok_or(Error::Overflow)?;

        set_persistent(&env, totals_key, &totals);

        if !known {
            let mut bettors: Vec<Address> = env
                .storage()
                .persistent()
                .get(&DataKey::Bettors)
                .unwrap_or(Vec::new(&env));
            bettors.push_back(user.clone());
            set_persistent(&env, DataKey::Bettors, &bettors);
        }

        BettorTotalsUpdated {
            user,
            points: totals.points,
        }
        .publish(&env);

        Ok(())
    }

    /// Fold one official result into both clubs' season stats.
    /// Authorized callers only.
    pub fn record_game_result(
        env: Env,
        caller: Address,
        home_team: u32,
        away_team: u32,
        home_goals: u32,
        away_goals: u32,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_authorized(&env, &caller)?;

        // Both clubs must exist in the fixture store; a typo here would
        // otherwise poison the table forever.
        let fixtures = fixtures_client(&env)?;
        if fixtures.try_get_team(&home_team).is_err() || fixtures.try_get_team(&away_team).is_err()
        {
            return Err(Error::TeamNotFound);
        }

        let sign = derive_sign(home_goals, away_goals);
        let (home_points, away_points) = club_points(sign);

        apply_team_result(
            &env,
            home_team,
            home_goals,
            away_goals,
            sign == Sign::Home,
            sign == Sign::Draw,
            home_points,
        )?;
        apply_team_result(
            &env,
            away_team,
            away_goals,
            home_goals,
            sign == Sign::Away,
            sign == Sign::Draw,
            away_points,
        )?;

        Ok(())
    }

    /// The club table: points desc, goal difference desc, ties stable.
    pub fn club_standings(env: Env) -> Result<Vec<ClubRow>, Error> {
        require_initialized(&env)?;

        let ids: Vec<u32> = env
            .storage()
            .persistent()
            .get(&DataKey::Teams)
            .unwrap_or(Vec::new(&env));
        if ids.is_empty() {
            return Err(Error::EmptyStandings);
        }

        let fixtures = fixtures_client(&env)?;

        let mut rows: Vec<ClubRow> = Vec::new(&env);
        for team_id in ids.iter() {
            let stats = get_team_stats(&env, team_id);
            let team = fixtures.get_team(&team_id);
            let row = ClubRow {
                team_id,
                name: team.name,
                stats,
            };

            let mut inserted = false;
            for i in 0..rows.len() {
                if club_ranks_above(&row.stats, &rows.get_unchecked(i).stats) {
                    rows.insert(i, row.clone());
                    inserted = true;
                    break;
                }
            }
            if !inserted {
                rows.push_back(row);
            }
        }

        Ok(rows)
    }

    /// The bettor table: points desc, correct signs desc, exact scores
    /// desc, ties stable.
    pub fn bettor_standings(env: Env) -> Result<Vec<BettorRow>, Error> {
        require_initialized(&env)?;

        let users: Vec<Address> = env
            .storage()
            .persistent()
            .get(&DataKey::Bettors)
            .unwrap_or(Vec::new(&env));
        if users.is_empty() {
            return Err(Error::EmptyStandings);
        }

        let mut rows: Vec<BettorRow> = Vec::new(&env);
        for user in users.iter() {
            let totals = get_user_totals(&env, &user);
            let row = BettorRow {
                user,
                guessed_scores: totals.guessed_scores,
                guessed_signs: totals.guessed_signs,
                points: totals.points,
            };

            let mut inserted = false;
            for i in 0..rows.len() {
                if bettor_ranks_above(&row, &rows.get_unchecked(i)) {
                    rows.insert(i, row.clone());
                    inserted = true;
                    break;
                }
            }
            if !inserted {
                rows.push_back(row);
            }
        }

        Ok(rows)
    }

    /// A single bettor's counters; zeroes if they have never scored.
    pub fn get_user_totals(env: Env, user: Address) -> Result<UserTotals, Error> {
        require_initialized(&env)?;
        Ok(get_user_totals(&env, &user))
    }

    /// A single club's season stats; zeroes if it has never played.
    pub fn get_team_stats(env: Env, team_id: u32) -> Result<TeamSeasonStats, Error> {
        require_initialized(&env)?;
        Ok(get_team_stats(&env, team_id))
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

fn fixtures_client(env: &Env) -> Result<FixtureStoreClient<'_>, Error> {
    let fixtures_addr: Address = env
        .storage()
        .instance()
        .get(&DataKey::Fixtures)
        .ok_or(Error::NotInitialized)?;
    Ok(FixtureStoreClient::new(env, &fixtures_addr))
}

fn get_user_totals(env: &Env, user: &Address) -> UserTotals {
    env.storage()
        .persistent()
        .get(&DataKey::UserTotals(user.clone()))
        .unwrap_or(UserTotals {
            guessed_scores: 0,
            guessed_signs: 0,
            points: 0,
        })
}

fn get_team_stats(env: &Env, team_id: u32) -> TeamSeasonStats {
    env.storage()
        .persistent()
        .get(&DataKey::TeamStats(team_id))
        .unwrap_or(TeamSeasonStats {
            games_played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_scored: 0,
            goals_conceded: 0,
            points: 0,
        })
}

/// Fold one result into a single club's row, from that club's perspective.
fn apply_team_result(
    env: &Env,
    team_id: u32,
    goals_scored: u32,
    goals_conceded: u32,
    won: bool,
    drew: bool,
    match_points: u32,
) -> Result<(), Error> {
    let stats_key = DataKey::TeamStats(team_id);
    let known = env.storage().persistent().has(&stats_key);
    let mut stats = get_team_stats(env, team_id);

    stats.games_played = stats.games_played.checked_add(1).ok_or(Error::Overflow)?;
    if won {
        stats.wins = stats.wins.checked_add(1).ok_or(Error::Overflow)?;
    } else if drew {
        stats.draws = stats.draws.checked_add(1).ok_or(Error::Overflow)?;
    } else {
        stats.losses = stats.losses.checked_add(1).ok_or(Error::Overflow)?;
    }
    stats.goals_scored = stats
        .goals_scored
        .checked_add(goals_scored)
        .ok_or(Error::Overflow)?;
    stats.goals_conceded = stats
        .goals_conceded
        .checked_add(goals_conceded)
        .ok_or(Error::Overflow)?;
    stats.points = stats
        .points
        .checked_add(match_points)
        .ok_or(Error::Overflow)?;

    set_persistent(env, stats_key, &stats);

    if !known {
        let mut teams: Vec<u32> = env
            .storage()
            .persistent()
            .get(&DataKey::Teams)
            .unwrap_or(Vec::new(env));
        teams.push_back(team_id);
        set_persistent(env, DataKey::Teams, &teams);
    }

    ClubStatsUpdated {
        team_id,
        points: stats.points,
    }
    .publish(env);

    Ok(())
}

fn goal_difference(stats: &TeamSeasonStats) -> i64 {
    stats.goals_scored as i64 - stats.goals_conceded as i64
}

fn club_ranks_above(a: &TeamSeasonStats, b: &TeamSeasonStats) -> bool {
    if a.points != b.points {
        return a.points > b.points;
    }
    goal_difference(a) > goal_difference(b)
}

fn bettor_ranks_above(a: &BettorRow, b: &BettorRow) -> bool {
    if a.points != b.points {
        return a.points > b.points;
    }
    if a.guessed_signs != b.guessed_signs {
        return a.guessed_signs > b.guessed_signs;
    }
    a.guessed_scores > b.guessed_scores
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
