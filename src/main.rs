mod config;

use api::{
    bot::Bot,
    corpus::Corpus,
    correlator::Correlator,
    discord::Discord,
    dispatcher::Dispatcher,
    ed25519_dalek::VerifyingKey,
    registry::{Defaults, Registry},
    scheduler::Scheduler,
    transport::Transport,
    App,
};
use config::Config;
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use std::{convert::Infallible, net::Ipv4Addr, sync::Arc};
use tokio::{net::TcpListener, runtime::Runtime};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env()?;
    let runtime = Runtime::new()?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let public = VerifyingKey::from_bytes(&config.public_key)?;

    // Connect to the database
    let (client, conn) = db::Config::new()
        .user(&config.pg_username)
        .password(&config.pg_password)
        .host(&config.pg_hostname)
        .dbname(&config.pg_database)
        .port(config.pg_port)
        .connect(db::NoTls)
        .await?;
    tokio::spawn(async move {
        if let Err(err) = conn.await {
            log::error!("database connection failed: {err}");
        }
    });
    let db = Arc::new(db::Database::from(client));

    // Load persistent state
    let corpus = Arc::new(Corpus::load(db.clone(), config.sections.as_slice()).await);
    let defaults = Defaults { section: config.default_section, interval: model::subscriber::default_interval() };
    let registry = Arc::new(
        Registry::load(db.clone(), defaults)
            .await
            .map_err(|err| anyhow::anyhow!("cannot load subscribers: {err}"))?,
    );

    // Wire up the engine
    let transport: Arc<dyn Transport> = Arc::new(Discord::new(config.token));
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), corpus.clone(), db.clone(), transport.clone()));
    let correlator = Correlator::new(registry.clone(), corpus.clone(), db);
    let scheduler = Scheduler::new(registry.clone(), dispatcher.clone(), config.tick).spawn();
    let bot = Bot::new(registry, corpus, dispatcher, correlator, transport);
    let app = Arc::new(App::new(bot, public));

    // Run the server
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port)).await?;
    log::info!("listening on {}", listener.local_addr()?);
    let mut stop = core::pin::pin!(tokio::signal::ctrl_c());
    loop {
        let (stream, addr) = tokio::select! {
            biased;
            res = &mut stop => {
                res?;
                break;
            }
            res = listener.accept() => match res {
                Ok(conn) => conn,
                Err(err) => {
                    log::error!("failed to accept connection: {err}");
                    continue;
                }
            },
        };

        let app = app.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let app = app.clone();
                async move { Ok::<_, Infallible>(app.respond(req).await) }
            });
            if let Err(err) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                log::error!("connection with {addr} failed: {err}");
            }
        });
    }

    log::info!("shutting down");
    scheduler.shutdown().await;
    Ok(())
}
