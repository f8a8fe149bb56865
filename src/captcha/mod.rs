// Puzzle solving loop and the collaborators it talks to
pub mod assets;
pub mod config;
pub mod controller;
pub mod download;
pub mod log_sink;
pub mod session;
pub mod types;
pub mod validity;


pub use assets::{AssetStore, PuzzleAsset};
pub use config::{DownloadConfig, SolverConfig};
pub use controller::AttemptController;
pub use download::{DownloadError, Downloader, HttpDownloader};
pub use log_sink::{LogSink, MemoryLogSink, NullLogSink};
pub use session::{
    ElementSnapshot, InteractiveSession, ModelError, RegionDetector, SessionError,
    StaticRegionDetector, ValidityClassifier,
};
pub use types::{AttemptState, SolveOutcome, SolvePhase};
pub use validity::{SpriteValidator, Validity};
