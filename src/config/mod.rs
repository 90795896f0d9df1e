//! Configuration module for Reelsmith.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ContentType, Prompts, ScriptPrompts, SearchTermPrompts};
pub use settings::{
    DatabaseSettings, FootageSettings, GeneralSettings, MissingBackground, Orientation,
    PromptSettings, RenderSettings, ScriptSettings, SearchTermSettings, ServerSettings, Settings,
    SpeechSettings, TranscriptionSettings,
};
