//! Abstractions for page-number pagination.

use std::num::NonZeroU32;

/// Page-number pagination arguments.
///
/// Both `page` and `limit` are `1`-based and never zero.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Arguments {
    /// Number of the requested page.
    page: NonZeroU32,

    /// Maximum number of items on the requested page.
    limit: NonZeroU32,
}

impl Arguments {
    /// Creates new [`Arguments`] out of the caller-supplied values.
    ///
    /// Missing `page` defaults to the first one, and missing `limit` to the
    /// `default` one. [`None`] is returned if any of the values is less than
    /// `1`, or the `limit` exceeds the `max` one.
    pub fn new<Num>(
        page: Option<Num>,
        limit: Option<Num>,
        default: NonZeroU32,
        max: NonZeroU32,
    ) -> Option<Self>
    where
        Num: TryInto<u32>,
    {
        let page = match page {
            Some(p) => NonZeroU32::new(p.try_into().ok()?)?,
            None => NonZeroU32::MIN,
        };
        let limit = match limit {
            Some(l) => NonZeroU32::new(l.try_into().ok()?)?,
            None => default,
        };
        (limit <= max).then_some(Self { page, limit })
    }

    /// Returns number of the requested page.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.get()
    }

    /// Returns maximum number of items on the requested page.
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit.get()
    }

    /// Returns number of items to skip before the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.get() - 1) * u64::from(self.limit.get())
    }
}

/// A page of `I`tems.
#[derive(Clone, Debug)]
pub struct Page<I> {
    /// Items on this [`Page`].
    pub items: Vec<I>,

    /// [`PageInfo`] of this [`Page`].
    pub info: PageInfo,
}

impl<I> Page<I> {
    /// Creates a new [`Page`] out of the provided `items` and `total` count
    /// of items across all the pages.
    #[must_use]
    pub fn new(
        args: &Arguments,
        items: impl IntoIterator<Item = impl Into<I>>,
        total: u64,
    ) -> Self {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            info: PageInfo::new(args, total),
        }
    }
}

/// Information about a [`Page`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageInfo {
    /// Total number of items across all the pages.
    pub total: u64,

    /// Number of this page.
    pub page: u32,

    /// Maximum number of items on a page.
    pub limit: u32,

    /// Total number of pages.
    pub pages: u64,
}

impl PageInfo {
    /// Calculates [`PageInfo`] for the provided [`Arguments`] and `total`
    /// count of items.
    #[must_use]
    pub fn new(args: &Arguments, total: u64) -> Self {
        Self {
            total,
            page: args.page(),
            limit: args.limit(),
            pages: total.div_ceil(u64::from(args.limit())),
        }
    }
}

/// Pagination selector.
#[derive(Clone, Copy, Debug)]
pub struct Selector<F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($node:ty, $filter:ty) => {
        #[doc = "A [`Page`] of [`Node`]s."]
        pub type Page = $crate::pagination::Page<$node>;

        #[doc = "An information about a [`Page`]."]
        pub type PageInfo = $crate::pagination::PageInfo;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$filter>;
    };
}

#[cfg(test)]
mod spec {
    use std::num::NonZeroU32;

    use super::{Arguments, Page, PageInfo};

    fn args(page: Option<i32>, limit: Option<i32>) -> Option<Arguments> {
        Arguments::new(
            page,
            limit,
            NonZeroU32::new(50).unwrap(),
            NonZeroU32::new(100).unwrap(),
        )
    }

    #[test]
    fn defaults_missing_values() {
        let args = args(None, None).unwrap();

        assert_eq!(args.page(), 1);
        assert_eq!(args.limit(), 50);
        assert_eq!(args.offset(), 0);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(args(Some(0), None).is_none());
        assert!(args(Some(-1), None).is_none());
        assert!(args(None, Some(0)).is_none());
        assert!(args(None, Some(-10)).is_none());
        assert!(args(None, Some(101)).is_none());
        assert!(args(None, Some(100)).is_some());
    }

    #[test]
    fn skips_previous_pages() {
        assert_eq!(args(Some(1), Some(10)).unwrap().offset(), 0);
        assert_eq!(args(Some(2), Some(10)).unwrap().offset(), 10);
        assert_eq!(args(Some(5), Some(3)).unwrap().offset(), 12);
    }

    #[test]
    fn counts_pages_rounding_up() {
        let args = args(Some(2), Some(10)).unwrap();

        assert_eq!(
            PageInfo::new(&args, 0),
            PageInfo {
                total: 0,
                page: 2,
                limit: 10,
                pages: 0,
            },
        );
        assert_eq!(PageInfo::new(&args, 10).pages, 1);
        assert_eq!(PageInfo::new(&args, 11).pages, 2);
        assert_eq!(PageInfo::new(&args, 20).pages, 2);
        assert_eq!(PageInfo::new(&args, 21).pages, 3);
    }

    #[test]
    fn page_keeps_items_order() {
        let args = args(None, Some(3)).unwrap();
        let page = Page::<u8>::new(&args, [3_u8, 1, 2], 7);

        assert_eq!(page.items, [3, 1, 2]);
        assert_eq!(page.info.pages, 3);
        assert_eq!(page.info.total, 7);
    }
}
