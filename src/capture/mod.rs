//! Frame and pose capture
//!
//! Traits for frame sources and pose classifiers, plus a JSON-lines pose feed
//! fed by an external hand tracker.

pub mod feed;
pub mod traits;

pub use feed::{FeedClassifier, PoseFeed, PoseFrame};
pub use traits::{CaptureError, FrameSource, PoseClassifier};
