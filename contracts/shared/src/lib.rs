//! Shared reference types for the Matchday betting pool contracts.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::contracttype;

/// Number of games in every round.
pub const ROUND_GAMES: u32 = 10;

/// Club match points awarded per official result.
pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;
pub const LOSS_POINTS: u32 = 0;

/// Ternary outcome of a game, the classic 1/X/2.
///
/// Never persisted alongside a score line; always re-derived from the two
/// goal counts so the stored pair and the outcome cannot drift apart.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Sign {
    Home = 0,
    Draw = 1,
    Away = 2,
}

/// Derive the outcome sign from a goal pair.
pub fn derive_sign(home_goals: u32, away_goals: u32) -> Sign {
    if home_goals > away_goals {
        Sign::Home
    } else if home_goals < away_goals {
        Sign::Away
    } else {
        Sign::Draw
    }
}

/// Points a club earns from a result with the given sign.
/// Returns `(home_points, away_points)`.
pub fn club_points(sign: Sign) -> (u32, u32) {
    match sign {
        Sign::Home => (WIN_POINTS, LOSS_POINTS),
        Sign::Draw => (DRAW_POINTS, DRAW_POINTS),
        Sign::Away => (LOSS_POINTS, WIN_POINTS),
    }
}

/// Bettor scoring policy: an exact score match is worth `exact`, a correct
/// sign with a wrong score is worth `sign_only`. Configuration on the
/// settlement contract, validated there as `exact > sign_only`.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScoringWeights {
    pub exact: u32,
    pub sign_only: u32,
}

impl ScoringWeights {
    pub fn is_valid(&self) -> bool {
        self.exact > self.sign_only
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sign_derivation() {
        assert_eq!(derive_sign(2, 1), Sign::Home);
        assert_eq!(derive_sign(0, 2), Sign::Away);
        assert_eq!(derive_sign(1, 1), Sign::Draw);
        assert_eq!(derive_sign(0, 0), Sign::Draw);
    }

    #[test]
    fn test_sign_derivation_is_stable() {
        for home in 0..6u32 {
            for away in 0..6u32 {
                let first = derive_sign(home, away);
                assert_eq!(first, derive_sign(home, away));
                match first {
                    Sign::Home => assert!(home > away),
                    Sign::Away => assert!(home < away),
                    Sign::Draw => assert_eq!(home, away),
                }
            }
        }
    }

    #[test]
    fn test_club_points() {
        assert_eq!(club_points(Sign::Home), (3, 0));
        assert_eq!(club_points(Sign::Draw), (1, 1));
        assert_eq!(club_points(Sign::Away), (0, 3));
    }

    #[test]
    fn test_weights_validation() {
        assert!(ScoringWeights { exact: 3, sign_only: 1 }.is_valid());
        assert!(!ScoringWeights { exact: 1, sign_only: 1 }.is_valid());
        assert!(!ScoringWeights { exact: 1, sign_only: 2 }.is_valid());
    }
}
