//! A·chik Bible reader: offline-first chapter text with narrated playback.
//!
//! ```text
//! console ─► Reader ─► ContentFetcher ─► ContentStore / ScriptureSource
//!              │
//!              └─► PlaybackEngine ─► AudioSynthesizer ─► AudioSink
//! ```

pub mod audio;
pub mod config;
pub mod console;
pub mod content;
pub mod model;
pub mod playback;
pub mod reader;
pub mod remote;
pub mod store;
