use migration::{Migrator, MigratorTrait};
use server::{AuthConfig, ServerState};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "fintrack={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no [server] section in settings, nothing to run");
        return Ok(());
    };

    tracing::info!("Found server settings...");
    let db = connect_database(&server.database).await?;
    let engine = engine::Engine::builder().database(db).build().await?;

    let auth = AuthConfig {
        jwt_secret: settings.auth.jwt_secret,
        token_ttl_minutes: settings.auth.token_ttl_minutes,
        refresh_token_ttl_days: settings.auth.refresh_token_ttl_days,
    };
    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, server.port);

    let mut tasks = tokio::task::JoinSet::new();
    tasks.spawn(async move {
        if let Err(err) = server::run(ServerState::new(engine, auth), &addr).await {
            tracing::error!("server failed: {err}");
        }
    });

    tokio::select! {
        _ = tasks.join_next() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            tasks.shutdown().await;
        }
    }

    Ok(())
}

async fn connect_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
