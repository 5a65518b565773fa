//! Command-line interface for Dreamright.
//!
//! The CLI is built with clap and drives the full production pipeline:
//! project setup, story expansion, reference asset generation, chapter
//! writing, panel rendering, and unattended batch runs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dreamright CLI - AI-assisted webtoon production pipeline.
#[derive(Parser)]
#[command(name = "dreamright")]
#[command(about = "Generate webtoon stories, characters, backgrounds, and panels", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(short, long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Show detailed progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create a new project
    Init {
        /// Project name
        name: String,

        /// Output format (webtoon, short_drama)
        #[arg(short, long, default_value = "webtoon")]
        format: String,
    },

    /// Expand a premise into a story bible with cast and locations
    Expand {
        /// Story premise
        prompt: String,

        /// Preferred genre
        #[arg(short, long)]
        genre: Option<String>,

        /// Preferred tone
        #[arg(short, long)]
        tone: Option<String>,

        /// Number of episodes to plan
        #[arg(short, long, default_value = "8")]
        episodes: u32,
    },

    /// Generate images and chapters
    Generate {
        /// What to generate
        #[command(subcommand)]
        command: GenerateCommands,
    },

    /// Print a project summary
    Status,

    /// Show a project entity (story, character:<name>, location:<name>)
    Show {
        /// Entity to show
        entity: String,
    },

    /// Run a queue of projects end to end
    Batch {
        /// Path to the TOML queue file
        queue: PathBuf,

        /// Directory that holds the generated projects
        #[arg(long, default_value = "projects")]
        projects_dir: PathBuf,

        /// Log file appended to during the run
        #[arg(long, default_value = "batch_generate.log")]
        log: PathBuf,
    },
}

/// Generation subcommands.
#[derive(Subcommand)]
pub enum GenerateCommands {
    /// Generate character portraits and reference sheets
    Character {
        /// Character name (defaults to every character)
        #[arg(short, long)]
        name: Option<String>,

        /// Art style clause
        #[arg(short, long)]
        style: Option<String>,

        /// Skip the three-view reference sheet
        #[arg(long)]
        portrait_only: bool,

        /// Regenerate even when assets exist
        #[arg(long)]
        overwrite: bool,
    },

    /// Generate location backgrounds
    Location {
        /// Location name (defaults to every location)
        #[arg(short, long)]
        name: Option<String>,

        /// Art style clause
        #[arg(short, long)]
        style: Option<String>,

        /// Time of day (morning, day, evening, night; defaults to all)
        #[arg(short, long)]
        time: Option<String>,

        /// Weather descriptor (clear, cloudy, rainy, snowy)
        #[arg(short, long)]
        weather: Option<String>,

        /// Regenerate even when assets exist
        #[arg(long)]
        overwrite: bool,
    },

    /// Generate a chapter from a story beat
    Chapter {
        /// Story beat number to expand
        #[arg(short, long)]
        beat: Option<u32>,

        /// Generate every remaining beat
        #[arg(long)]
        all: bool,

        /// Target panel count per scene
        #[arg(long, default_value = "5")]
        panels_per_scene: u32,
    },

    /// Generate a single standalone panel
    Panel {
        /// What the panel shows
        description: String,

        /// Character in frame, by name
        #[arg(short, long)]
        character: Option<String>,

        /// Location, by name
        #[arg(short, long)]
        location: Option<String>,

        /// Character expression
        #[arg(short, long, default_value = "neutral")]
        expression: String,

        /// Shot type (wide, medium, close_up, extreme_close_up)
        #[arg(long, default_value = "medium")]
        shot: String,

        /// Dialogue recorded in the metadata sidecar
        #[arg(short, long)]
        dialogue: Option<String>,

        /// Art style clause
        #[arg(long)]
        style: Option<String>,

        /// Scene number used for the output path
        #[arg(long, default_value = "1")]
        scene: u32,

        /// Assets-relative output path override
        #[arg(short, long)]
        output: Option<String>,

        /// Regenerate even when a cached response exists
        #[arg(long)]
        overwrite: bool,
    },

    /// Generate all panel images for a chapter
    Panels {
        /// Chapter number
        #[arg(short, long)]
        chapter: u32,

        /// Only this scene
        #[arg(short, long)]
        scene: Option<u32>,

        /// Art style clause
        #[arg(long)]
        style: Option<String>,

        /// Regenerate panels whose image already exists
        #[arg(long)]
        overwrite: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }
}
