//! # Tag Resolver CLI (`tagr`)
//!
//! ## Usage
//!
//! ```bash
//! tagr --config ./config/tagr.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tagr resolve "<description>"` | Resolve a description to a tag path |
//! | `tagr search "<text>"` | Show what the local retrieval chain finds |
//! | `tagr vectors build` | Build the vector artifact from the catalog |
//! | `tagr keywords "<text>"` | Print the keywords extracted from a query |
//!
//! ## Examples
//!
//! ```bash
//! # Resolve, human-readable
//! tagr resolve "kiln 6 shell temperature"
//!
//! # Resolve, full JSON response, ignoring cached answers
//! tagr resolve "cooler fan speed" --json --bypass-cache
//!
//! # Rebuild the vector fallback after a catalog update
//! tagr vectors build --output data/tag_vectors.json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tag_resolver::{config, logging, resolve_cmd, search_cmd, vectors_cmd};
use tag_resolver_core::tokenize::extract_keywords;

/// Tag Resolver CLI: map natural-language sensor descriptions to historian
/// tag paths.
///
/// All commands except `keywords` read a TOML configuration file. See
/// `config/tagr.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tagr",
    about = "Resolve natural-language sensor descriptions to historian tag paths",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tagr.toml")]
    config: PathBuf,

    /// Log at debug level unless `TAGR_LOG` says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a description to the most likely tag path.
    ///
    /// Prints the path on a confident match, otherwise a clarifying
    /// question with the top candidates. Ambiguous and failed resolutions
    /// are normal outcomes and exit with status 0.
    Resolve {
        /// Free-text sensor description.
        description: String,

        /// Skip cached answers and ask upstream services to do the same.
        #[arg(long)]
        bypass_cache: bool,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run the local retrieval chain (keyword, substring, vector).
    Search {
        /// Query text.
        text: String,

        /// Maximum number of hits (defaults to `[resolver] max_candidates`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Manage the vector fallback artifact.
    Vectors {
        #[command(subcommand)]
        action: VectorsAction,
    },

    /// Print the keywords extracted from a query, stop words removed.
    Keywords {
        /// Query text.
        text: String,
    },
}

#[derive(Subcommand)]
enum VectorsAction {
    /// Embed every catalog tag with the configured dimension and seed.
    Build {
        /// Output file (defaults to `[vectors] path`).
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    // Needs no config
    if let Commands::Keywords { text } = &cli.command {
        println!("{}", extract_keywords(text).join(" "));
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Resolve {
            description,
            bypass_cache,
            json,
        } => {
            resolve_cmd::run_resolve(&cfg, &description, bypass_cache, json).await?;
        }
        Commands::Search { text, limit } => {
            search_cmd::run_search(&cfg, &text, limit).await?;
        }
        Commands::Vectors { action } => match action {
            VectorsAction::Build { output } => {
                vectors_cmd::run_vectors_build(&cfg, output).await?;
            }
        },
        Commands::Keywords { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
