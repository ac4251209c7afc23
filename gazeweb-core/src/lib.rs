/// GazeWeb Core Library - Head-mounted web viewer pipeline
///
/// This library provides the rendering-independent core of a stereo viewer
/// that maps a web surface onto a 3D plane: transform utilities, scene
/// state, gaze intersection, reticle geometry, frame sequencing and the
/// click dispatcher that feeds synthetic touches back to the surface.

pub mod clock;
pub mod config;
pub mod error;
pub mod gaze;
pub mod geometry;
pub mod input;
pub mod projection;
pub mod renderer;
pub mod scene;
pub mod texture;
pub mod transform;

// Re-export commonly used types
pub use clock::{Clock, SystemClock, TestClock};
pub use config::ViewerConfig;
pub use error::{GazeError, Result};
pub use gaze::{focus_intersection, GazeSample, GazeTracker, SharedGaze};
pub use geometry::{ContentPlane, PointerReticle};
pub use input::{
    surface_queue, Click, InteractionDispatcher, PointerAction, PointerEvent, SurfaceCommand,
    SurfaceInbox, SurfaceMapping, TriggerSource,
};
pub use projection::{Eye, EyeIndex, Viewport};
pub use renderer::{
    ContentDraw, DrawTarget, FrameSummary, GazeRenderer, PointerDraw, ProgramLayout,
    StereoRenderer,
};
pub use scene::{EyeFrame, HeadPoseSlot, SceneState};
pub use texture::{LatchedFrame, SharedSurface, TextureHandle};
pub use transform::{RotationState, Transform};
