pub mod classifier;
pub mod config;
pub mod spectral;
pub mod state;
pub mod types;

pub use classifier::TriggerClassifier;
pub use config::TriggerConfig;
pub use spectral::SpectralAnalyzer;
pub use state::{DebounceStateMachine, Transition};
pub use types::{ClassificationResult, FeatureFault, FeatureVector};
