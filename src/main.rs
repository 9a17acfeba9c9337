use dotenvy::dotenv;
use lettings_desk::{
    config::{self, database},
    console::Console,
    errors::Result,
};
use std::io;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();

    // 2. Load the application configuration; the log filter lives there
    let app_config = config::load_app_configuration()?;

    // 3. Initialize tracing. RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_config.logging.filter)),
        )
        .with_writer(io::stderr)
        .init();
    info!("Successfully processed application configuration.");

    // 4. Open the data file, creating schema and the default account on first run
    if let Some(parent) = app_config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let database_url = database::database_url(&app_config.database.path);
    let db = database::init_database(&database_url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Run the console until quit or end of input
    let outcome = Console::new(&db, io::stdin().lock(), io::stdout().lock())
        .run()
        .await;

    database::close(db).await?;
    outcome
}
