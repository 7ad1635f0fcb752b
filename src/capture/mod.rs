pub mod guidance;
pub mod handoff;
pub mod media;
pub mod scan;
pub mod stability;

pub use guidance::{
    guidance_provider, FaceSignal, FrameProcessor, GuidanceProvider, GuidanceState, Lighting,
    LiveGuidance, StaticGuidance,
};
pub use handoff::{CaptureHandoff, CaptureResult, MediaType};
pub use media::MediaWriter;
pub use scan::ScanController;
pub use stability::{StabilityLock, DEFAULT_STABLE_FRAMES};
