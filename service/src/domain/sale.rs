//! [`Sale`] definitions.

use common::{define_kind, unit, DateTime, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{product, purchase};
#[cfg(doc)]
use crate::domain::{Product, Purchase};

/// Time-boxed flash sale of a single [`Product`] with its own stock.
#[derive(Clone, Debug)]
pub struct Sale {
    /// ID of this [`Sale`].
    pub id: Id,

    /// ID of the [`Product`] being sold.
    pub product_id: product::Id,

    /// [`DateTime`] when this [`Sale`] is scheduled to open.
    pub start_at: StartDateTime,

    /// [`DateTime`] when this [`Sale`] left the [`Status::Active`] state, if
    /// it did.
    pub end_at: Option<EndDateTime>,

    /// [`Stock`] this [`Sale`] was opened with.
    pub initial_stock: Stock,

    /// [`Stock`] still available for purchasing.
    pub current_stock: Stock,

    /// Maximum number of [`Purchase`]s a single buyer may make.
    pub max_per_user: PurchaseLimit,

    /// [`Status`] of this [`Sale`].
    pub status: Status,

    /// [`DateTime`] when this [`Sale`] was created.
    pub created_at: CreationDateTime,
}

impl Sale {
    /// Indicates whether this [`Sale`] is [`Status::Active`].
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Indicates whether this [`Sale`] accepts purchases at the provided
    /// moment.
    #[must_use]
    pub fn is_open_at(&self, now: DateTime) -> bool {
        self.is_active()
            && self.start_at.coerce() <= now
            && self.end_at.map_or(true, |end| end.coerce() > now)
            && self.current_stock.get() > 0
    }

    /// Indicates whether this [`Sale`] is [`Status::Scheduled`] and its
    /// start is due at the provided moment.
    #[must_use]
    pub fn is_due_at(&self, now: DateTime) -> bool {
        self.status == Status::Scheduled && self.start_at.coerce() <= now
    }

    /// Moves this [`Sale`] from [`Status::Scheduled`] to [`Status::Active`].
    ///
    /// Returns `false` and leaves this [`Sale`] untouched if it's not
    /// [`Status::Scheduled`].
    #[must_use]
    pub fn activate(&mut self) -> bool {
        if self.status != Status::Scheduled {
            return false;
        }
        self.status = Status::Active;
        true
    }

    /// Moves this [`Sale`] from [`Status::Active`] to [`Status::Ended`].
    ///
    /// Returns `false` and leaves this [`Sale`] untouched if it's not
    /// [`Status::Active`].
    #[must_use]
    pub fn end(&mut self, at: EndDateTime) -> bool {
        if self.status != Status::Active {
            return false;
        }
        self.status = Status::Ended;
        self.end_at = Some(at);
        true
    }

    /// Reschedules this [`Sale`] with a fresh [`Stock`].
    ///
    /// Returns `false` and leaves this [`Sale`] untouched if it's
    /// [`Status::Active`].
    #[must_use]
    pub fn reset(&mut self, stock: Stock) -> bool {
        if self.status == Status::Active {
            return false;
        }
        self.initial_stock = stock;
        self.current_stock = stock;
        self.status = Status::Scheduled;
        self.end_at = None;
        true
    }

    /// Takes the provided [`purchase::Quantity`] out of the
    /// [`Sale::current_stock`].
    ///
    /// Succeeds only for an [`Status::Active`] [`Sale`] having enough stock.
    /// The [`Sale`] is ended at the provided moment once its stock is
    /// exhausted. Returns `false` and leaves this [`Sale`] untouched on
    /// failure.
    #[must_use]
    pub fn reserve(
        &mut self,
        quantity: purchase::Quantity,
        at: EndDateTime,
    ) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(rest) = self.current_stock.get().checked_sub(quantity.get())
        else {
            return false;
        };
        let Some(rest) = Stock::new(rest) else {
            return false;
        };

        self.current_stock = rest;
        if rest.get() == 0 {
            self.status = Status::Ended;
            self.end_at = Some(at);
        }
        true
    }
}

/// ID of a [`Sale`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Number of units of a [`Product`] available in a [`Sale`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Stock(i32);

impl Stock {
    /// Creates a new [`Stock`] if the given `units` are not negative.
    #[must_use]
    pub fn new(units: i32) -> Option<Self> {
        (units >= 0).then_some(Self(units))
    }

    /// Returns the number of units in this [`Stock`].
    #[must_use]
    pub fn get(self) -> i32 {
        self.0
    }
}

/// Maximum number of [`Purchase`]s a single buyer may make in a [`Sale`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PurchaseLimit(i32);

impl PurchaseLimit {
    /// Creates a new [`PurchaseLimit`] if the given `limit` is positive.
    #[must_use]
    pub fn new(limit: i32) -> Option<Self> {
        (limit >= 1).then_some(Self(limit))
    }

    /// Returns the number this [`PurchaseLimit`] allows.
    #[must_use]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl Default for PurchaseLimit {
    fn default() -> Self {
        Self(1)
    }
}

define_kind! {
    #[doc = "Lifecycle status of a [`Sale`]."]
    enum Status {
        #[doc = "[`Sale`] is waiting to be started."]
        Scheduled = 1,

        #[doc = "[`Sale`] accepts purchases."]
        Active = 2,

        #[doc = "[`Sale`] is over."]
        Ended = 3,
    }
}

/// Marker type indicating a [`Sale`] start.
#[derive(Clone, Copy, Debug)]
pub struct Opening;

/// Marker type indicating a [`Sale`] end.
#[derive(Clone, Copy, Debug)]
pub struct Closing;

/// [`DateTime`] when a [`Sale`] was created.
pub type CreationDateTime = DateTimeOf<(Sale, unit::Creation)>;

/// [`DateTime`] when a [`Sale`] starts.
pub type StartDateTime = DateTimeOf<(Sale, Opening)>;

/// [`DateTime`] when a [`Sale`] ended.
pub type EndDateTime = DateTimeOf<(Sale, Closing)>;

/// Request to take some units out of a [`Sale`] stock.
#[derive(Clone, Copy, Debug)]
pub struct Reservation {
    /// ID of the [`Sale`] to take the units from.
    pub sale_id: Id,

    /// Number of units to take.
    pub quantity: purchase::Quantity,

    /// [`DateTime`] to end the [`Sale`] at, if the stock runs out.
    pub at: EndDateTime,
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{product, purchase};

    use super::{Id, PurchaseLimit, Sale, Status, Stock};

    fn sale(status: Status, stock: i32) -> Sale {
        let now = DateTime::now();
        Sale {
            id: Id::new(),
            product_id: product::Id::new(),
            start_at: (now - Duration::from_secs(1)).coerce(),
            end_at: None,
            initial_stock: Stock::new(stock).unwrap(),
            current_stock: Stock::new(stock).unwrap(),
            max_per_user: PurchaseLimit::default(),
            status,
            created_at: now.coerce(),
        }
    }

    fn qty(n: i32) -> purchase::Quantity {
        purchase::Quantity::new(n).unwrap()
    }

    #[test]
    fn validates_numbers() {
        assert!(Stock::new(0).is_some());
        assert!(Stock::new(-1).is_none());
        assert!(PurchaseLimit::new(1).is_some());
        assert!(PurchaseLimit::new(0).is_none());
        assert_eq!(PurchaseLimit::default().get(), 1);
    }

    #[test]
    fn activates_only_scheduled() {
        let mut s = sale(Status::Scheduled, 10);
        assert!(s.activate());
        assert_eq!(s.status, Status::Active);
        assert!(s.is_active());

        assert!(!s.activate());
        assert_eq!(s.status, Status::Active);

        let mut s = sale(Status::Ended, 10);
        assert!(!s.activate());
        assert_eq!(s.status, Status::Ended);
    }

    #[test]
    fn ends_only_active() {
        let at = DateTime::now().coerce();

        let mut s = sale(Status::Scheduled, 10);
        assert!(!s.end(at));
        assert_eq!(s.status, Status::Scheduled);
        assert!(s.end_at.is_none());

        let mut s = sale(Status::Active, 10);
        assert!(s.end(at));
        assert_eq!(s.status, Status::Ended);
        assert_eq!(s.end_at, Some(at));
        assert!(!s.is_active());

        assert!(!s.end(at));
    }

    #[test]
    fn resets_unless_active() {
        let mut s = sale(Status::Active, 10);
        assert!(!s.reset(Stock::new(5).unwrap()));
        assert_eq!(s.current_stock.get(), 10);

        let mut s = sale(Status::Active, 10);
        assert!(s.reserve(qty(10), DateTime::now().coerce()));
        assert_eq!(s.status, Status::Ended);

        assert!(s.reset(Stock::new(200).unwrap()));
        assert_eq!(s.status, Status::Scheduled);
        assert_eq!(s.initial_stock.get(), 200);
        assert_eq!(s.current_stock.get(), 200);
        assert!(s.end_at.is_none());
    }

    #[test]
    fn reserves_only_available_stock() {
        let at = DateTime::now().coerce();

        let mut s = sale(Status::Scheduled, 10);
        assert!(!s.reserve(qty(1), at));
        assert_eq!(s.current_stock.get(), 10);

        let mut s = sale(Status::Active, 3);
        assert!(!s.reserve(qty(4), at));
        assert_eq!(s.current_stock.get(), 3);
        assert_eq!(s.status, Status::Active);

        assert!(s.reserve(qty(2), at));
        assert_eq!(s.current_stock.get(), 1);
        assert_eq!(s.status, Status::Active);
        assert!(s.end_at.is_none());
    }

    #[test]
    fn ends_once_stock_is_exhausted() {
        let at = DateTime::now().coerce();

        let mut s = sale(Status::Active, 2);
        assert!(s.reserve(qty(2), at));
        assert_eq!(s.current_stock.get(), 0);
        assert_eq!(s.status, Status::Ended);
        assert_eq!(s.end_at, Some(at));

        assert!(!s.reserve(qty(1), at));
    }

    #[test]
    fn opens_only_within_window() {
        let now = DateTime::now();

        assert!(sale(Status::Active, 1).is_open_at(now));
        assert!(!sale(Status::Scheduled, 1).is_open_at(now));
        assert!(!sale(Status::Active, 0).is_open_at(now));

        let mut s = sale(Status::Active, 1);
        s.start_at = (now + Duration::from_secs(60)).coerce();
        assert!(!s.is_open_at(now));

        let mut s = sale(Status::Active, 1);
        s.end_at = Some(now.coerce());
        assert!(!s.is_open_at(now));
        s.end_at = Some((now + Duration::from_secs(60)).coerce());
        assert!(s.is_open_at(now));
    }

    #[test]
    fn is_due_once_start_passes() {
        let now = DateTime::now();

        assert!(sale(Status::Scheduled, 1).is_due_at(now));
        assert!(!sale(Status::Active, 1).is_due_at(now));

        let mut s = sale(Status::Scheduled, 1);
        s.start_at = (now + Duration::from_secs(1)).coerce();
        assert!(!s.is_due_at(now));
    }
}
