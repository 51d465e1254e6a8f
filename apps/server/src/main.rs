use anyhow::Context;
use clap::{Parser, Subcommand};
use promart_api::{build_router, AppState};
use promart_api::services::listing::{self, ListingFields};
use promart_config::load as load_config;
use promart_runtime::{telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "promart-server")]
#[command(about = "ProMart B2B directory backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Seed the database with a throwaway demo dataset
    SeedDemo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::SeedDemo => seed_demo().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting ProMart backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = AppState::new(
        services.db_pool.clone(),
        services.authenticator.clone(),
        services.mailer.clone(),
        config.uploads.clone(),
    );
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(promart_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

/// Seed a demo dataset through the regular storage layer. Pairs with a
/// `sqlite://:memory:` database url for a data source that lives and dies
/// with the process.
async fn seed_demo() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("seeding demo data");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    if config.auth.bootstrap_admin.is_none() {
        services
            .authenticator
            .ensure_admin("admin@promart.local", "changeme-now", "ProMart Admin")
            .await
            .context("failed to create demo admin")?;
    }

    let demo_companies = [
        (
            "steel@demo.promart.local",
            "Steelline Fabrication",
            "Steel Fabrication",
            "Custom steel parts, welding, and surface treatment.",
            "Manufacturing",
        ),
        (
            "timber@demo.promart.local",
            "Northwood Timber",
            "Timber Supply",
            "Hardwood and softwood in wholesale quantities.",
            "Materials",
        ),
        (
            "logistics@demo.promart.local",
            "Crossdock Logistics",
            "Freight & Warehousing",
            "Palletised freight, customs handling, and short-term storage.",
            "Logistics",
        ),
    ];

    for (email, company, title, description, category) in demo_companies {
        let account = match services
            .authenticator
            .register_company(email, Some("+15550100"), company, "demo-password")
            .await
        {
            Ok(account) => account,
            Err(promart_auth::AuthError::AccountExists) => {
                info!(email, "demo company already present, skipping");
                continue;
            }
            Err(error) => return Err(error).context("failed to register demo company"),
        };

        let fields = ListingFields {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            category: Some(category.to_string()),
            location: Some("Rotterdam, NL".to_string()),
            website: Some(format!("https://{}.example.com", category.to_lowercase())),
            features: Some(r#"["Certified","B2B only"]"#.to_string()),
        };

        let submitted = listing::submit_listing(
            &services.db_pool,
            services.mailer.as_ref(),
            &account,
            fields,
            vec![],
            vec![],
        )
        .await
        .map_err(|e| anyhow::anyhow!("failed to seed demo listing: {e:?}"))?;

        info!(listing = %submitted.public_id, company, "seeded demo listing");
    }

    // Approve one listing so the public directory is not empty.
    let pending = listing::admin_list(&services.db_pool, Some("pending"))
        .await
        .map_err(|e| anyhow::anyhow!("failed to list demo listings: {e:?}"))?;
    if let Some(first) = pending.first() {
        listing::approve_listing(
            &services.db_pool,
            services.mailer.as_ref(),
            &first.listing.public_id,
        )
        .await
        .map_err(|e| anyhow::anyhow!("failed to approve demo listing: {e:?}"))?;
        info!(listing = %first.listing.public_id, "approved demo listing");
    }

    println!("Demo data seeded. Demo company password: demo-password");
    Ok(())
}
