//! Pipeline services, one per stage.

pub mod calibration;
pub mod determinism;
pub mod drift_monitor;
pub mod feedback_bridge;
pub mod gatekeeper;
pub mod lineage;
pub mod promotion_detector;
pub mod session_observer;
pub mod transcript_capture;

pub use calibration::ConfusionMatrix;
pub use determinism::DeterminismAnalyzer;
pub use drift_monitor::DriftMonitor;
pub use feedback_bridge::FeedbackBridge;
pub use gatekeeper::PromotionGatekeeper;
pub use lineage::{LineageChain, LineageTracker};
pub use promotion_detector::PromotionDetector;
pub use session_observer::SessionObserver;
