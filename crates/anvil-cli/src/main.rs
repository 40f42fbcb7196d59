//! Anvil CLI - Command-line interface for the XModel importer

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{import, inspect};

#[derive(Parser)]
#[command(name = "anvil")]
#[command(about = "Import XModel files into a scene and inspect them", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a model into a fresh scene and print the result
    Import {
        /// Path to the model (.xmodel_export or .xmodel_bin)
        path: String,

        /// TOML file with import options
        #[arg(long)]
        config: Option<String>,

        /// Global scale factor
        #[arg(long)]
        scale: Option<f32>,

        /// One mesh per source object instead of a single mesh
        #[arg(long)]
        split: bool,

        /// Drop faces that reuse another face's vertices
        #[arg(long)]
        no_dup_tris: bool,

        /// Do not store custom normals
        #[arg(long)]
        no_custom_normals: bool,

        /// Do not store vertex colors
        #[arg(long)]
        no_vertex_colors: bool,

        /// Do not build a skeleton
        #[arg(long)]
        no_armature: bool,

        /// Make every bone a root bone
        #[arg(long)]
        no_parents: bool,

        /// Only look for images at their given and adjacent paths
        #[arg(long)]
        no_image_search: bool,

        /// Import this model first and attach the new skeleton to it
        #[arg(long)]
        onto: Option<String>,

        /// Merge the new skeleton into the one given with --onto
        #[arg(long)]
        merge: bool,
    },

    /// Print the contents of a model file
    Inspect {
        /// Path to the model
        path: String,

        /// Group faces by source object
        #[arg(long)]
        split: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            path,
            config,
            scale,
            split,
            no_dup_tris,
            no_custom_normals,
            no_vertex_colors,
            no_armature,
            no_parents,
            no_image_search,
            onto,
            merge,
        } => import::run(import::ImportArgs {
            path,
            config,
            scale,
            split,
            no_dup_tris,
            no_custom_normals,
            no_vertex_colors,
            no_armature,
            no_parents,
            no_image_search,
            onto,
            merge,
        }),
        Commands::Inspect { path, split } => inspect::run(&path, split),
    }
}
