//! Sale leaderboard definitions.

use juniper::GraphQLObject;
use service::read;

use crate::{api, Context};

/// Position in a `Sale` leaderboard.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context, name = "LeaderboardEntry")]
pub struct Entry {
    /// `Purchase` occupying this position.
    pub purchase: api::Purchase,

    /// Public identity of the buyer.
    pub buyer: api::user::Public,
}

impl From<read::LeaderboardEntry> for Entry {
    fn from(entry: read::LeaderboardEntry) -> Self {
        let read::LeaderboardEntry { purchase, buyer } = entry;
        Self {
            purchase: purchase.into(),
            buyer: buyer.into(),
        }
    }
}

/// Page of a `Sale` leaderboard.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context, name = "LeaderboardPage")]
pub struct Page {
    /// Entries on this page, earliest purchase first.
    pub entries: Vec<Entry>,

    /// Information about this page.
    pub pagination: PageInfo,
}

impl From<read::leaderboard::Page> for Page {
    fn from(page: read::leaderboard::Page) -> Self {
        let read::leaderboard::Page { items, info } = page;
        Self {
            entries: items.into_iter().map(Into::into).collect(),
            pagination: info.into(),
        }
    }
}

/// Information about a `LeaderboardPage`.
#[derive(Clone, Copy, Debug, Eq, GraphQLObject, PartialEq)]
#[graphql(name = "LeaderboardPageInfo")]
pub struct PageInfo {
    /// Total number of entries across all the pages.
    pub total: i32,

    /// Number of this page.
    pub page: i32,

    /// Maximum number of entries on a page.
    pub limit: i32,

    /// Total number of pages.
    pub pages: i32,
}

impl From<read::leaderboard::PageInfo> for PageInfo {
    fn from(info: read::leaderboard::PageInfo) -> Self {
        let read::leaderboard::PageInfo {
            total,
            page,
            limit,
            pages,
        } = info;
        Self {
            total: api::saturate(total),
            page: api::saturate(page),
            limit: api::saturate(limit),
            pages: api::saturate(pages),
        }
    }
}

#[cfg(test)]
mod spec {
    use std::num::NonZeroU32;

    use service::read::leaderboard::{Arguments, PageInfo as ReadPageInfo};

    use super::PageInfo;

    #[test]
    fn converts_page_info() {
        let args = Arguments::new(
            Some(2),
            Some(10),
            NonZeroU32::MIN,
            NonZeroU32::new(100).unwrap(),
        )
        .unwrap();

        assert_eq!(
            PageInfo::from(ReadPageInfo::new(&args, 25)),
            PageInfo {
                total: 25,
                page: 2,
                limit: 10,
                pages: 3,
            },
        );
    }
}
