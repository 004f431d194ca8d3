use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailings::config::{Config, build_mailer};
use mailings::infrastructure::AppState;
use mailings::mail::Templates;
use mailings::{db, seed, server};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailings=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize database
    let db = db::init_db(&config.database_url)
        .await
        .expect("Failed to initialize database");

    if let (Ok(email), Ok(password)) = (
        std::env::var("MANAGER_EMAIL"),
        std::env::var("MANAGER_PASSWORD"),
    ) {
        match seed::seed_manager(&db, &email, &password).await {
            Ok(true) => tracing::info!("Created manager account {}", email),
            Ok(false) => tracing::debug!("Manager account {} already exists", email),
            Err(e) => tracing::error!("Failed to seed manager: {}", e),
        }
    }

    let mailer = match build_mailer(&config) {
        Ok(mailer) => mailer,
        Err(e) => {
            tracing::error!("Mail transport setup failed: {}", e);
            std::process::exit(1);
        }
    };
    let templates = Templates::new().expect("Failed to load email templates");
    let state = AppState::new(db, config, mailer, templates);

    if let Err(e) = server::serve(state).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
