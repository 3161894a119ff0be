//! Anime Nexus search CLI.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use nexus_search::{
    fetch_trending, load_character_detail, BackoffHttpClient, Disposition, Item,
    PaginationController, SearchEndpoint, SearchStatus, SentinelDetector, SuggestionController,
    SuggestionSettings, Viewport,
};
use shared::{Config, LogConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search characters, scrolling until the results run out
    Search {
        query: String,

        /// Stop after this many pages
        #[arg(long, default_value = "5")]
        max_pages: u32,

        /// Search anime instead of characters
        #[arg(long)]
        anime: bool,
    },
    /// Type a query key by key and show the suggestions it settles on
    Suggest { text: String },
    /// Show a character's profile, voice actors and anime
    Character { id: u32 },
    /// Show the most favorited characters and top anime
    Trending {
        #[arg(long, default_value = "20")]
        characters: u32,

        #[arg(long, default_value = "6")]
        anime: u32,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let mut log_config =
        LogConfig::from_settings(&config.logging, &config.log_dir(), "nexus-search");
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    shared::logging::init(log_config)?;

    info!(config_file = %args.config.display(), "Loaded configuration");

    let client = Arc::new(
        BackoffHttpClient::from_config(&config.jikan).context("Failed to create Jikan client")?,
    );

    match args.command {
        Command::Search {
            query,
            max_pages,
            anime,
        } => {
            let endpoint = if anime {
                SearchEndpoint::Anime
            } else {
                SearchEndpoint::Characters
            };
            run_search(client, endpoint, config.jikan.page_size, &query, max_pages).await
        }
        Command::Suggest { text } => {
            let settings = SuggestionSettings::from(&config.suggestions);
            run_suggest(client, settings, &text).await
        }
        Command::Character { id } => run_character(&client, id).await,
        Command::Trending { characters, anime } => {
            let trending = fetch_trending(&client, characters, anime).await;
            println!("=== Trending Characters ===");
            print_listing(&trending.characters);
            println!("=== Top Anime ===");
            print_listing(&trending.anime);
            Ok(())
        }
    }
}

async fn run_search(
    client: Arc<BackoffHttpClient>,
    endpoint: SearchEndpoint,
    page_size: u32,
    query: &str,
    max_pages: u32,
) -> Result<()> {
    let mut controller = PaginationController::new(client, endpoint, page_size);
    // The whole page counts as "seen" here, so the sentinel is always visible
    let detector = SentinelDetector::default();

    if controller.submit_query(query).is_err() {
        bail!("Query must not be empty");
    }

    loop {
        let Some(disposition) = controller.next_outcome().await else {
            break;
        };
        if let Disposition::Failed(kind) = disposition {
            bail!("Search failed: {}", kind);
        }

        let session = controller.session();
        println!(
            "page {} -> {} results{}",
            session.current_page,
            session.accumulated_results.len(),
            session
                .total_items
                .map(|total| format!(" of {}", total))
                .unwrap_or_default()
        );

        if session.status != SearchStatus::Success || session.current_page >= max_pages {
            break;
        }

        let rendered = session.accumulated_results.len();
        let viewport = Viewport {
            rendered,
            last_visible: rendered.saturating_sub(1),
        };
        controller.observe_viewport(&detector, &viewport);
    }

    let snapshot = controller.snapshot();
    let elapsed = Utc::now() - snapshot.started_at;
    println!(
        "Search \"{}\" started {}, {} ms ago",
        snapshot.query,
        snapshot.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        elapsed.num_milliseconds()
    );
    for item in snapshot.results {
        print_item(item);
    }
    if snapshot.status == SearchStatus::NoMore {
        println!("No more results to load");
    }

    Ok(())
}

async fn run_suggest(
    client: Arc<BackoffHttpClient>,
    settings: SuggestionSettings,
    text: &str,
) -> Result<()> {
    let mut controller = SuggestionController::new(client, settings);

    let mut typed = String::new();
    for ch in text.chars() {
        typed.push(ch);
        controller.on_query_text_changed(&typed);
    }
    controller.settle().await;

    for suggestion in controller.suggestions() {
        println!("[{:?}] {}", suggestion.category, suggestion.item.display_name);
    }
    if controller.suggestions().is_empty() {
        println!("No suggestions");
    }

    Ok(())
}

async fn run_character(client: &BackoffHttpClient, id: u32) -> Result<()> {
    let detail = load_character_detail(client, id)
        .await
        .with_context(|| format!("Failed to load character {}", id))?;

    let profile = &detail.profile;
    println!("{} (#{})", profile.name, profile.mal_id);
    if let Some(kanji) = &profile.name_kanji {
        println!("  {}", kanji);
    }
    println!("  favorites: {}", profile.favorites.unwrap_or(0));

    match &detail.appearances {
        Ok(appearances) => {
            println!("=== Anime ===");
            for appearance in appearances {
                println!("  {} ({})", appearance.anime.title, appearance.role);
            }
        }
        Err(e) => println!("Anime appearances unavailable: {}", e),
    }

    match &detail.voices {
        Ok(voices) => {
            println!("=== Voice Actors ===");
            for credit in voices {
                println!("  {} ({})", credit.person.name, credit.language);
            }
        }
        Err(e) => println!("Voice actors unavailable: {}", e),
    }

    Ok(())
}

fn print_listing(listing: &nexus_search::error::Result<Vec<Item>>) {
    match listing {
        Ok(items) => items.iter().for_each(print_item),
        Err(e) => println!("  unavailable: {}", e),
    }
}

fn print_item(item: &Item) {
    println!("  #{:<7} {:<40} \u{2665} {}", item.id, item.display_name, item.popularity_score);
}
