//! [`ActivateDueSales`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{By, Perform, Start},
    DateTime,
};
use smart_default::SmartDefault;
use tokio::time::{interval, MissedTickBehavior};
use tracing as log;

#[cfg(doc)]
use crate::domain::Sale;
use crate::{command, Command, Service};

use super::Task;

/// Configuration for [`ActivateDueSales`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between checks for due [`Sale`]s.
    #[default(time::Duration::from_secs(1))]
    pub interval: time::Duration,
}

/// [`Task`] for activating scheduled [`Sale`]s once their start is due.
#[derive(Clone, Copy, Debug)]
pub struct ActivateDueSales<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<ActivateDueSales<Self>, Config>>> for Service<Db>
where
    ActivateDueSales<Service<Db>>:
        Task<Perform<()>, Ok = usize, Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ActivateDueSales<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ActivateDueSales {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::debug!("`task::ActivateDueSales` activated {n}"),
                Err(e) => {
                    log::error!("`task::ActivateDueSales` failed: {e}");
                }
            }
        }
    }
}

impl<Db> Task<Perform<()>> for ActivateDueSales<Service<Db>>
where
    Service<Db>: Command<
        command::ActivateDueSales,
        Ok = usize,
        Err = ExecutionError,
    >,
{
    type Ok = usize;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        self.service
            .execute(command::ActivateDueSales {
                now: DateTime::now(),
            })
            .await
    }
}

/// Error of [`ActivateDueSales`] execution.
pub type ExecutionError =
    tracerr::Traced<command::activate_due_sales::ExecutionError>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Perform, DateTime};

    use crate::{domain::sale, fixture, Task as _};

    use super::{ActivateDueSales, Config};

    #[test]
    fn defaults_to_one_second() {
        assert_eq!(Config::default().interval, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn performs_activation() {
        let svc = fixture::service();
        let product = fixture::product(&svc, "Headphones").await;
        let sale = fixture::scheduled_sale(
            &svc,
            product.id,
            DateTime::now() - Duration::from_secs(1),
        )
        .await;
        let task = ActivateDueSales {
            config: Config::default(),
            service: svc.clone(),
        };

        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);
        let stored = svc.database().snapshot().await;
        assert_eq!(stored.sale(sale.id).unwrap().status, sale::Status::Active);
    }
}
