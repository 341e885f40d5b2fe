use std::{future::IntoFuture as _, io, sync::OnceLock};

use application::{api, config, Args, Config};
use futures::{future, TryFutureExt as _};
use service::{
    command::{self, Command as _},
    domain::user,
    infra::{postgres, Postgres},
    Service,
};
use tokio::net::TcpListener;
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stdout)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || (!STDERR_LEVELS.contains(meta.level()))
                            && LOG_LEVEL
                                .get()
                                .copied()
                                .unwrap_or(log::Level::INFO)
                                >= *meta.level()
                })),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stderr)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || (STDERR_LEVELS.contains(meta.level()))
                            && LOG_LEVEL
                                .get()
                                .copied()
                                .unwrap_or(log::Level::INFO)
                                >= *meta.level()
                })),
        )
        .init();

    _ = start().await;
}

async fn start() -> Result<(), ()> {
    let Args { config } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        postgres,
        service,
        server,
        log,
    } = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let statement_timeout = postgres.statement_timeout;
    let postgres_config = postgres.into();
    let mut postgres = Postgres::new(&postgres_config, statement_timeout)
        .map_err(|e| {
            log::error!("failed to initialize `Postgres` client: {e}");
        })?;

    migrations::runner()
        .run_async(&mut postgres)
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?;

    let admin = service.admin.clone();
    let (service, background) = Service::new(service.into(), postgres);

    if let Some(admin) = admin {
        ensure_admin(&service, admin).await?;
    }

    let app = application::app(api::schema(), service, &server.cors)
        .map_err(|e| {
            log::error!("invalid CORS origin in `Config`: {e}");
        })?;

    let listener = TcpListener::bind((server.host.clone(), server.port))
        .await
        .map_err(|e| {
            log::error!(
                "failed to listen on `{}:{}`: {e}",
                server.host,
                server.port,
            );
        })?;

    log::info!("listening on `{}:{}`", server.host, server.port);

    let serve = axum::serve(listener, app);

    future::try_join(
        serve
            .into_future()
            .map_err(|e| log::error!("webserver failed: {e}")),
        background.into_future().map_err(|e| {
            log::error!("background task failed: {e}");
        }),
    )
    .await
    .map(drop)
}

/// Creates the bootstrap administrator described by the provided
/// [`config::Admin`], unless its credentials are occupied already.
async fn ensure_admin(
    service: &application::Service,
    admin: config::Admin,
) -> Result<(), ()> {
    use command::create_user::ExecutionError as E;

    let config::Admin {
        username,
        email,
        password,
    } = admin;
    let username = user::Username::new(username).ok_or_else(|| {
        log::error!("invalid `service.admin.username` in `Config`");
    })?;
    let email = user::Email::new(email).ok_or_else(|| {
        log::error!("invalid `service.admin.email` in `Config`");
    })?;
    let password = user::Password::new(password).ok_or_else(|| {
        log::error!("invalid `service.admin.password` in `Config`");
    })?;

    match service
        .execute(command::CreateUser {
            username: username.clone(),
            email,
            password: secrecy::SecretBox::init_with(move || password),
            is_admin: true,
        })
        .await
    {
        Ok(u) => {
            log::info!("created bootstrap administrator `{}`", u.username);
            Ok(())
        }
        Err(e) => match <_ as AsRef<E>>::as_ref(&e) {
            E::UsernameOccupied(_) | E::EmailOccupied(_) => {
                log::debug!("bootstrap administrator `{username}` exists");
                Ok(())
            }
            E::Db(_) => {
                log::error!("failed to create bootstrap administrator: {e}");
                Err(())
            }
        },
    }
}
