//! [`Handler`] abstraction shared by commands, queries, tasks and database
//! operations.

use std::future::Future;

/// Asynchronous handler of some `Args`.
///
/// The same [`Handler`] may be implemented for many `Args`, one per
/// operation it knows how to perform.
pub trait Handler<Args = ()> {
    /// Result of a successful execution.
    type Ok;

    /// Error of a failed execution.
    type Err;

    /// Performs the operation described by the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
