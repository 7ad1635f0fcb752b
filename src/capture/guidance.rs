//! Face-framing guidance for the selfie step.
//!
//! Two providers share one output contract: [`StaticGuidance`] (no detector
//! wired, always reports a usable frame) and [`LiveGuidance`] (recomputed
//! from each [`FaceSignal`] the face detector emits). Screens only ever see
//! `dyn GuidanceProvider`, so swapping one for the other needs no caller
//! change.

use std::sync::RwLock;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::config::GuidanceMode;
use crate::log_info;

const ENABLE_LOGS: bool = false;

pub const HINT_POSITION_FACE: &str = "Position your face inside the frame";
pub const HINT_SINGLE_FACE: &str = "Only one face should be visible";
pub const HINT_HOLD_STILL: &str = "Hold still";
pub const MESSAGE_GOOD_LIGHTING: &str = "Good lighting";
pub const MESSAGE_LOW_LIGHTING: &str = "Too dark, find better lighting";
pub const MESSAGE_HIGH_LIGHTING: &str = "Too bright, avoid direct light";

/// Mean luma below this is reported as low light.
pub const LOW_LIGHT_THRESHOLD: f32 = 0.25;
/// Mean luma above this is reported as glare.
pub const HIGH_LIGHT_THRESHOLD: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lighting {
    Ok,
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceState {
    pub hint: String,
    pub lighting: Lighting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting_message: Option<String>,
    pub has_face: bool,
}

impl Default for GuidanceState {
    fn default() -> Self {
        Self {
            hint: HINT_POSITION_FACE.into(),
            lighting: Lighting::Ok,
            lighting_message: Some(MESSAGE_GOOD_LIGHTING.into()),
            has_face: true,
        }
    }
}

/// One frame's output from the face-detection model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaceSignal {
    pub face_count: u32,
    /// Mean luma in `[0, 1]`, if the detector measured it.
    pub brightness: Option<f32>,
}

impl FaceSignal {
    /// Builds a signal from a detector face count and the raw frame.
    pub fn from_frame(face_count: u32, frame: &DynamicImage) -> Self {
        Self {
            face_count,
            brightness: Some(mean_luminance(frame)),
        }
    }
}

/// Mean luma of a frame, normalised to `[0, 1]`. Empty frames read as 0.
pub fn mean_luminance(frame: &DynamicImage) -> f32 {
    let luma = frame.to_luma8();
    let pixels = luma.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    let total: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
    (total as f64 / pixels.len() as f64 / 255.0) as f32
}

/// Per-frame analysis hook. Runs on the camera frame thread, so
/// implementations must not block.
pub trait FrameProcessor: Send + Sync {
    fn process(&self, signal: &FaceSignal);
}

pub trait GuidanceProvider: Send + Sync {
    fn state(&self) -> GuidanceState;

    /// `None` means no face analysis is wired; the capture surface keeps
    /// working with the static state.
    fn frame_processor(&self) -> Option<&dyn FrameProcessor>;
}

/// Placeholder provider used until a detector is wired in.
#[derive(Debug, Default)]
pub struct StaticGuidance;

impl GuidanceProvider for StaticGuidance {
    fn state(&self) -> GuidanceState {
        GuidanceState::default()
    }

    fn frame_processor(&self) -> Option<&dyn FrameProcessor> {
        None
    }
}

/// Provider driven by a live face detector.
#[derive(Debug)]
pub struct LiveGuidance {
    state: RwLock<GuidanceState>,
}

impl LiveGuidance {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GuidanceState::default()),
        }
    }
}

impl Default for LiveGuidance {
    fn default() -> Self {
        Self::new()
    }
}

impl GuidanceProvider for LiveGuidance {
    fn state(&self) -> GuidanceState {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn frame_processor(&self) -> Option<&dyn FrameProcessor> {
        Some(self)
    }
}

impl FrameProcessor for LiveGuidance {
    fn process(&self, signal: &FaceSignal) {
        let next = evaluate(signal);
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *guard != next {
            log_info!("guidance changed: {:?} -> {:?}", guard.hint, next.hint);
            *guard = next;
        }
    }
}

fn classify_lighting(brightness: Option<f32>) -> (Lighting, Option<&'static str>) {
    match brightness {
        None => (Lighting::Ok, None),
        Some(b) if b < LOW_LIGHT_THRESHOLD => (Lighting::Low, Some(MESSAGE_LOW_LIGHTING)),
        Some(b) if b > HIGH_LIGHT_THRESHOLD => (Lighting::High, Some(MESSAGE_HIGH_LIGHTING)),
        Some(_) => (Lighting::Ok, Some(MESSAGE_GOOD_LIGHTING)),
    }
}

fn evaluate(signal: &FaceSignal) -> GuidanceState {
    let (lighting, lighting_message) = classify_lighting(signal.brightness);
    let has_face = signal.face_count > 0;

    let hint = match (signal.face_count, lighting, lighting_message) {
        (0, _, _) => HINT_POSITION_FACE,
        (n, _, _) if n > 1 => HINT_SINGLE_FACE,
        (_, Lighting::Low | Lighting::High, Some(message)) => message,
        _ => HINT_HOLD_STILL,
    };

    GuidanceState {
        hint: hint.to_string(),
        lighting,
        lighting_message: lighting_message.map(str::to_string),
        has_face,
    }
}

/// Builds the provider selected in configuration.
pub fn guidance_provider(mode: GuidanceMode) -> Box<dyn GuidanceProvider> {
    match mode {
        GuidanceMode::Static => Box::new(StaticGuidance),
        GuidanceMode::Live => Box::new(LiveGuidance::new()),
    }
}
