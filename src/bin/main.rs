use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidshelf::catalog::Catalog;
use vidshelf::config::Config;
use vidshelf::AppError;

#[derive(Parser, Debug)]
#[command(name = "vidshelf")]
#[command(about = "Inspect a vidshelf video catalog", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "vidshelf.yaml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Counts of videos, favorites, categories and playlists
    Summary,
    /// Categories in display order
    Categories,
    /// All videos, optionally limited to one category
    Videos {
        #[arg(long)]
        category: Option<String>,
    },
    /// Playlists with their videos
    Playlists,
}

fn init_logging(logfile: &str) -> Result<(), std::io::Error> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vidshelf=info".into());

    if logfile == "stdout" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        let file = OpenOptions::new().create(true).append(true).open(logfile)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    }
    Ok(())
}

async fn run(catalog: &Catalog, command: Command) -> Result<(), AppError> {
    match command {
        Command::Summary => {
            let summary = catalog.summary().await?;
            println!("videos:     {}", summary.videos);
            println!("favorites:  {}", summary.favorites);
            println!("categories: {}", summary.categories);
            println!("playlists:  {}", summary.playlists);
        }
        Command::Categories => {
            for category in catalog.categories().await? {
                let count = catalog.videos_in_category(&category.id).await?.len();
                println!("{:>3}  {:<24} {:<24} {} videos", category.order, category.id, category.name, count);
            }
        }
        Command::Videos { category } => {
            let videos = match category {
                Some(id) => catalog.videos_in_category(&id).await?,
                None => catalog.videos().await?,
            };
            for video in videos {
                let star = if video.favorite { "*" } else { " " };
                println!("{} {}  [{}]  {}  {}", star, video.id, video.category, video.title, video.url);
            }
        }
        Command::Playlists => {
            for playlist in catalog.playlists().await? {
                println!("{}  {}", playlist.id, playlist.name);
                let videos = catalog.videos_in_playlist(&playlist.id).await?.unwrap_or_default();
                for (i, video) in videos.iter().enumerate() {
                    println!("  {:>2}. {}", i + 1, video.title);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logfile) {
        eprintln!("Error: cannot open log file {}: {}", config.logfile, e);
        std::process::exit(1);
    }

    let result = match vidshelf::open(&config).await {
        Ok(catalog) => run(&catalog, args.command.unwrap_or(Command::Summary)).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
