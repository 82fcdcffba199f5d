use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_kernel::settings::Settings;

/// SHELF book catalog service
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C or SIGTERM
    Serve,
    /// Print every module migration in execution order
    Migrations,
    /// Apply pending migrations to the configured store
    Migrate,
    /// Print the effective settings as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().with_context(|| "failed to load SHELF settings")?;

    match cli.command {
        Command::Serve => {
            shelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "shelf serve starting");
            shelf_app::serve(settings).await
        }
        Command::Migrations => {
            let store = shelf_db::connect(&settings.database)
                .context("failed to open catalog store")?;
            let registry = shelf_app::build_registry(&settings, store);
            for (module, migration) in registry.collect_migrations() {
                println!("-- {}/{}", module, migration.id);
                println!("{}", migration.up.trim());
                println!();
            }
            Ok(())
        }
        Command::Migrate => {
            shelf_telemetry::init(&settings.telemetry)?;
            let store = shelf_db::connect(&settings.database)
                .context("failed to open catalog store")?;
            let registry = shelf_app::build_registry(&settings, store.clone());
            let applied = shelf_app::apply_migrations(&registry, &store).await?;
            println!("{} migration(s) applied to {}", applied, settings.database.endpoint);
            Ok(())
        }
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render settings")?;
            println!("{}", rendered);
            Ok(())
        }
    }
}
