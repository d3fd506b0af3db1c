//! Core library for turning a narration script into a captioned vertical reel.

pub mod config;
pub mod llm;
pub mod metadata;
pub mod reel;
pub mod srt;
pub mod subtitle;
pub mod tts;
pub mod video;
