use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::auth::AuthService;
use crate::config;
use crate::media::{paths, probe::Ffprobe, service::MediaService};
use crate::storage::db::i64_seconds_to_local_time;
use crate::storage::store::MediaStore;

#[derive(Parser)]
#[command(name = "mediarack")]
#[command(version = "0.1")]
#[command(about = "Media library manager and indexing server")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run http server hosting the API and frontend
    Serve,
    /// Register a directory as a new library
    Add {
        /// Library name
        name: String,
        /// Directory path, absolute or relative to the base media directory
        path: String,
    },
    /// Scan a library for new video files
    Scan {
        /// Library id
        library: i64,
    },
    /// List libraries and their indexed items
    List,
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = config::Config::load(&cli.config)?;

    let base_dir = paths::resolve_base(&cfg.media.base_dir)
        .context("no usable base media directory, refusing to start")?;

    let store = Arc::new(Mutex::new(MediaStore::new(&cfg.database)?));
    let media = MediaService::new(Arc::clone(&store), base_dir, Box::new(Ffprobe));

    match &cli.command {
        Commands::Serve => {
            let auth = AuthService::new(Arc::clone(&store), &cfg.auth);
            let http_server = crate::http::server::HttpServer::new(media, auth, cfg.http);

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
            Ok(())
        }

        Commands::Add { name, path } => {
            let library = media.create_library(name, path)?;
            println!(
                "Registered library \"{}\" (id {}) at {}",
                library.name,
                library.id,
                library.path.to_string_lossy()
            );
            Ok(())
        }

        Commands::Scan { library } => {
            let added = media.scan_library(*library)?;
            println!("Scan finished, {added} new items");
            Ok(())
        }

        Commands::List => {
            let libraries = media.list_libraries()?;
            if libraries.is_empty() {
                println!("No libraries registered");
            }

            for library in libraries {
                println!(
                    "[{}] {} at {}",
                    library.id,
                    library.name,
                    library.path.to_string_lossy()
                );

                if let Some(scan) = media.last_scan(library.id)? {
                    println!(
                        "  Last scanned {} ({} items added)",
                        i64_seconds_to_local_time(scan.scanned_at)?,
                        scan.added
                    );
                }

                if library.items.is_empty() {
                    println!("  No items indexed yet");
                }
                for item in &library.items {
                    println!(
                        "    - {} ({} bytes, {})",
                        item.filename,
                        item.size,
                        item.duration.as_deref().unwrap_or("??:??:??")
                    );
                }
            }
            Ok(())
        }
    }
}
