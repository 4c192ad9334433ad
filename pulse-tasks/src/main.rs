use std::sync::Arc;

use pulse_shared::clients::clickhouse::ClickHouseClient;
use pulse_shared::clients::db::create_pool;
use pulse_shared::clients::email::EmailClient;
use pulse_shared::clients::redis::RedisClient;

use pulse_tasks::backends::postgres::PgUserDirectory;
use pulse_tasks::config::AppConfig;
use pulse_tasks::scheduler::{schedules_from_config, Scheduler};
use pulse_tasks::services::Backends;
use pulse_tasks::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pulse_shared::middleware::init_tracing("pulse-tasks");
    let metrics = pulse_shared::middleware::init_metrics()?;

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url)?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let clickhouse = ClickHouseClient::new(
        &config.clickhouse_url,
        &config.clickhouse_user,
        &config.clickhouse_password,
        &config.clickhouse_database,
        config.http_timeout(),
    )?;
    let mailer = EmailClient::new(
        &config.mail_api_url,
        &config.mail_api_key,
        &config.mail_from,
        &config.mail_from_name,
        config.http_timeout(),
    )?;

    if config.self_hosted {
        tracing::info!("self-hosted mode: project reports and general stats are disabled");
    }

    let backends = Arc::new(Backends {
        cache: Arc::new(redis),
        store: Arc::new(clickhouse),
        users: Arc::new(PgUserDirectory::new(db)),
        mailer: Arc::new(mailer),
        self_hosted: config.self_hosted,
    });

    let scheduler = Arc::new(Scheduler::new(backends.clone(), &schedules_from_config(&config))?);
    let job_handles = scheduler.clone().spawn();

    let state = Arc::new(AppState {
        backends,
        scheduler,
        metrics: Some(metrics),
    });

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "pulse-tasks starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    for handle in job_handles {
        handle.abort();
    }
    tracing::info!("pulse-tasks stopped");

    Ok(())
}
