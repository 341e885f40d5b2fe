//! Read entities definitions.

pub mod leaderboard;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod user;

pub use self::leaderboard::Entry as LeaderboardEntry;
