//! CLI module for Reelsmith.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Reelsmith - topic-to-short-video generator
///
/// Writes a narration script for a topic, voices it, captions it word by
/// word, finds matching stock footage and renders a vertical short.
#[derive(Parser, Debug)]
#[command(name = "reelsmith")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a video from a topic
    Generate {
        /// What the video is about
        topic: String,

        /// Narration voice (e.g. alloy, nova)
        #[arg(long)]
        voice: Option<String>,

        /// Narration language (e.g. English, Hindi)
        #[arg(short, long)]
        language: Option<String>,

        /// Kind of script (storytelling, interesting-facts, news)
        #[arg(long = "content-type")]
        content_type: Option<String>,

        /// Do not record the video in the metadata database
        #[arg(long)]
        no_store: bool,
    },

    /// Caption an existing audio file
    Captions {
        /// Audio file to transcribe
        audio: String,

        /// Output format (json, srt, vtt)
        #[arg(long, default_value = "srt")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// List generated videos
    List {
        /// Maximum number of videos to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete a video's metadata (and its file with --purge)
    Delete {
        /// Metadata id
        id: i64,

        /// Also delete the rendered file
        #[arg(long)]
        purge: bool,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
