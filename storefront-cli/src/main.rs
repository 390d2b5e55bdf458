//! Storefront CLI - terminal front end for the shop assistant

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storefront_core::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront shop assistant CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file, loaded on top of the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant (one message per line, Ctrl-D to quit)
    Chat,
    /// List the product catalog
    Catalog {
        /// featured, price-low, price-high, rating or newest
        #[arg(long, default_value_t = SortOrder::Featured)]
        sort: SortOrder,
        /// grid or list
        #[arg(long, default_value_t = ViewMode::Grid)]
        view: ViewMode,
    },
    /// Print the effective configuration
    Config,
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("storefront {}", env!("CARGO_PKG_VERSION"));
            println!("storefront-core {}", storefront_core::VERSION);
        }
        Commands::Config => {
            let config = load_config(cli.config.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&redacted(config))?);
        }
        Commands::Catalog { sort, view } => {
            let query = CatalogQuery {
                sort_by: sort,
                view_mode: view,
            };
            let products = StaticCatalog::default().products(&query).await?;
            print_products(&products, view);
        }
        Commands::Chat => {
            let config = load_config(cli.config.as_ref())?;
            chat(&config).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<StorefrontConfig> {
    let config = match path {
        Some(path) => StorefrontConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StorefrontConfig::load()?,
    };
    Ok(config)
}

fn redacted(mut config: StorefrontConfig) -> StorefrontConfig {
    if let BackendConfig::OpenAI { api_key, .. } = &mut config.assistant.backend {
        if api_key.is_some() {
            *api_key = Some("***".to_string());
        }
    }
    config
}

async fn chat(config: &StorefrontConfig) -> Result<()> {
    let session = ConversationSession::from_config(config)?;
    let mut events = session.subscribe();

    for message in session.messages() {
        println!("assistant> {}", message.content);
    }

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::MessageAppended { message, .. }) if message.is_assistant() => {
                    println!("assistant> {}", message.content);
                }
                Ok(SessionEvent::SessionDisposed { .. }) => break,
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Chat output fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match session.submit(&line) {
            Ok(_) | Err(StorefrontError::InvalidInput) => {}
            Err(e) => return Err(e.into()),
        }
    }

    // let outstanding replies land before leaving
    session.wait_idle().await;
    session.dispose();
    printer.await?;

    Ok(())
}

fn print_products(products: &[Product], view: ViewMode) {
    for product in products {
        let badge = product
            .badge
            .as_deref()
            .map(|b| format!(" [{}]", b))
            .unwrap_or_default();

        match view {
            ViewMode::Grid => {
                println!("{}{}", product.name, badge);
                println!("  ${:.2}  {:.1}* ({})", product.price, product.rating, product.review_count);
            }
            ViewMode::List => println!(
                "{:<28} {:<12} ${:>8.2}  {:.1}* ({}){}",
                product.name,
                product.category,
                product.price,
                product.rating,
                product.review_count,
                badge
            ),
        }
    }
}
