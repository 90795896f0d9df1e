//! Reelsmith - topic-to-short-video generator
//!
//! Turns a topic into a captioned vertical short: an LLM writes the
//! narration, a speech model voices it, word timestamps drive the
//! captions, and stock footage matched to each stretch of narration is
//! cut together behind them with ffmpeg.
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `script` - Narration script generation
//! - `speech` - Text-to-speech synthesis
//! - `transcription` - Word-level timestamps for the narration
//! - `captions` - Word grouping into timed caption windows
//! - `timeline` - Time intervals shared by captions and footage
//! - `background` - Search terms, stock clip resolution and reconciliation
//! - `render` - ffmpeg composition and ffprobe measurement
//! - `store` - Metadata for generated videos
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use reelsmith::config::Settings;
//! use reelsmith::orchestrator::{GenerationRequest, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let video = orchestrator
//!         .generate(&GenerationRequest::new("Why volcanoes erupt"))
//!         .await?;
//!     println!("Rendered {}", video.video_path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod background;
pub mod captions;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod render;
pub mod script;
pub mod speech;
pub mod store;
pub mod timeline;
pub mod transcription;

pub use error::{ReelError, Result};
