/// Stereo frame sequencing.
///
/// A frame is `prepare_frame` once, `draw_eye` once per eye, then
/// `finish_frame`. Prepare refreshes the head pose, solves the gaze hit,
/// rebuilds the reticle and latches the newest content texture. Each eye
/// pass derives its own matrices and submits two draws: the textured
/// content quad and the reticle.
///
/// The GPU sits behind [`DrawTarget`] so the sequencing runs the same on a
/// real GL context, in the terminal, or in tests.
use nalgebra::Matrix4;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::clock::Clock;
use crate::config::ViewerConfig;
use crate::error::{GazeError, Result};
use crate::gaze::{GazeSample, GazeTracker};
use crate::geometry::{PointerReticle, PLANE_COORDS, PLANE_TEX_COORDS};
use crate::input::{InteractionDispatcher, SurfaceCommand, SurfaceMapping};
use crate::projection::Eye;
use crate::scene::{EyeFrame, HeadPoseSlot, SceneState};
use crate::texture::{SharedSurface, TextureHandle};

/// Uniform and attribute names a shader program is expected to expose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramLayout {
    pub name: &'static str,
    pub uniforms: &'static [&'static str],
    pub attributes: &'static [&'static str],
}

pub const CONTENT_PROGRAM: ProgramLayout = ProgramLayout {
    name: "content",
    uniforms: &["u_Model", "u_MVMatrix", "u_MVP", "uSTMatrix"],
    attributes: &["a_Position", "a_TextureCoord"],
};

pub const POINTER_PROGRAM: ProgramLayout = ProgramLayout {
    name: "pointer",
    uniforms: &["u_MVP", "u_EVP"],
    attributes: &["a_Position"],
};

/// Textured content quad submission
#[derive(Debug, Clone, PartialEq)]
pub struct ContentDraw {
    /// `None` until the surface renderer has attached its texture
    pub texture: Option<TextureHandle>,
    pub model: Matrix4<f32>,
    pub model_view: Matrix4<f32>,
    pub model_view_projection: Matrix4<f32>,
    pub texture_transform: Matrix4<f32>,
    pub positions: &'static [f32],
    pub tex_coords: &'static [f32],
}

/// Reticle quad submission; positions are plane-local
#[derive(Debug, Clone, PartialEq)]
pub struct PointerDraw {
    pub positions: [f32; 12],
    pub model_view_projection: Matrix4<f32>,
    pub eye_view_projection: Matrix4<f32>,
}

/// Where draw submissions go
pub trait DrawTarget {
    /// Build both shader programs. Failure aborts renderer creation.
    fn create_programs(&mut self, content: &ProgramLayout, pointer: &ProgramLayout) -> Result<()>;

    /// Clear color and depth for an eye pass
    fn clear(&mut self, eye: &Eye);

    fn draw_content(&mut self, eye: &Eye, draw: &ContentDraw);

    fn draw_pointer(&mut self, eye: &Eye, draw: &PointerDraw);
}

/// Frame lifecycle driven once per display refresh
pub trait StereoRenderer {
    fn prepare_frame(&mut self) -> FrameSummary;

    fn draw_eye(&mut self, eye: &Eye) -> Result<()>;

    fn finish_frame(&mut self) -> Result<()>;
}

/// What `prepare_frame` managed to refresh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSummary {
    pub frame: u64,
    /// Fresh gaze hit, or `None` when the previous one was kept
    pub gaze: Option<GazeSample>,
    pub texture_fresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramePhase {
    Idle,
    Prepared { eyes_drawn: u8 },
}

impl FramePhase {
    fn describe(&self) -> &'static str {
        match self {
            Self::Idle => "no frame is prepared",
            Self::Prepared { eyes_drawn: 2 } => "both eyes are drawn",
            Self::Prepared { .. } => "eyes are still pending",
        }
    }
}

/// The one concrete stereo renderer: a content plane with a gaze reticle
pub struct GazeRenderer<T: DrawTarget> {
    target: T,
    config: ViewerConfig,
    scene: SceneState,
    gaze: GazeTracker,
    reticle: PointerReticle,
    head: HeadPoseSlot,
    surface: SharedSurface,
    texture: Option<TextureHandle>,
    texture_transform: Matrix4<f32>,
    phase: FramePhase,
    frame_count: u64,
}

impl<T: DrawTarget> GazeRenderer<T> {
    pub fn new(mut target: T, config: ViewerConfig, surface: SharedSurface) -> Result<Self> {
        target.create_programs(&CONTENT_PROGRAM, &POINTER_PROGRAM)?;
        info!(
            distance = config.object_distance,
            "gaze renderer initialized"
        );

        let gaze = GazeTracker::new();
        let reticle = PointerReticle::with_size(
            &gaze.current(),
            config.pointer_half_size,
            config.pointer_lift,
        );
        Ok(Self {
            target,
            scene: SceneState::new(&config),
            config,
            gaze,
            reticle,
            head: HeadPoseSlot::new(),
            surface,
            texture: None,
            texture_transform: Matrix4::identity(),
            phase: FramePhase::Idle,
            frame_count: 0,
        })
    }

    /// Slot the head-tracking provider publishes into
    pub fn head_slot(&self) -> HeadPoseSlot {
        self.head.clone()
    }

    /// Dispatcher reading this renderer's gaze hit, for the trigger thread
    pub fn dispatcher(
        &self,
        clock: Arc<dyn Clock>,
        commands: crossbeam_channel::Sender<SurfaceCommand>,
    ) -> InteractionDispatcher {
        InteractionDispatcher::new(
            self.gaze.handle(),
            self.surface.clone(),
            SurfaceMapping::from_config(&self.config),
            clock,
            Duration::from_millis(self.config.click_duration_ms),
            commands,
        )
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn reposition_plane(&mut self, model: Matrix4<f32>) {
        self.scene.reposition_plane(model);
    }

    pub fn relocate_plane(&mut self, angle_xz_deg: f32, distance: f32, elevation_deg: f32) {
        self.scene
            .plane_mut()
            .relocate(angle_xz_deg, distance, elevation_deg);
        debug!(angle_xz_deg, distance, elevation_deg, "content plane relocated");
    }

    pub fn reticle(&self) -> &PointerReticle {
        &self.reticle
    }

    pub fn gaze(&self) -> &GazeTracker {
        &self.gaze
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn content_draw(&self, frame: &EyeFrame) -> ContentDraw {
        ContentDraw {
            texture: self.texture,
            model: self.scene.plane().model,
            model_view: frame.model_view,
            model_view_projection: frame.model_view_projection,
            texture_transform: self.texture_transform,
            positions: &PLANE_COORDS,
            tex_coords: &PLANE_TEX_COORDS,
        }
    }

    fn pointer_draw(&self, frame: &EyeFrame) -> PointerDraw {
        PointerDraw {
            positions: self.reticle.to_coords(),
            model_view_projection: frame.model_view_projection,
            eye_view_projection: frame.eye_view_projection,
        }
    }
}

impl<T: DrawTarget> StereoRenderer for GazeRenderer<T> {
    fn prepare_frame(&mut self) -> FrameSummary {
        if let FramePhase::Prepared { eyes_drawn } = self.phase {
            debug!(eyes_drawn, "previous frame was not finished");
        }

        self.scene.refresh_camera();
        let (head_view, _) = self.head.latest();
        self.scene.update_head(head_view);

        let gaze = self.gaze.update(self.scene.head_view(), self.scene.plane()).ok();
        if let Some(sample) = &gaze {
            self.reticle = PointerReticle::with_size(
                &sample.local,
                self.config.pointer_half_size,
                self.config.pointer_lift,
            );
        }

        let texture_fresh = match self.surface.latch() {
            Ok(latched) => {
                self.texture = Some(latched.texture);
                self.texture_transform = latched.transform;
                latched.fresh
            }
            Err(err) => {
                debug!(%err, "content texture unavailable this frame");
                self.texture = None;
                false
            }
        };

        self.frame_count += 1;
        self.phase = FramePhase::Prepared { eyes_drawn: 0 };
        trace!(frame = self.frame_count, "frame prepared");

        FrameSummary {
            frame: self.frame_count,
            gaze,
            texture_fresh,
        }
    }

    fn draw_eye(&mut self, eye: &Eye) -> Result<()> {
        let eyes_drawn = match self.phase {
            FramePhase::Prepared { eyes_drawn } if eyes_drawn < 2 => eyes_drawn,
            phase => {
                return Err(GazeError::FrameSequence {
                    operation: "draw an eye",
                    phase: phase.describe(),
                })
            }
        };

        let frame = self
            .scene
            .eye_frame(eye, self.config.z_near, self.config.z_far);
        self.target.clear(eye);
        self.target.draw_content(eye, &self.content_draw(&frame));
        self.target.draw_pointer(eye, &self.pointer_draw(&frame));
        trace!(eye = eye.index.as_str(), frame = self.frame_count, "eye drawn");

        self.phase = FramePhase::Prepared {
            eyes_drawn: eyes_drawn + 1,
        };
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        match self.phase {
            FramePhase::Prepared { eyes_drawn: 2 } => {
                self.phase = FramePhase::Idle;
                Ok(())
            }
            phase => Err(GazeError::FrameSequence {
                operation: "finish the frame",
                phase: phase.describe(),
            }),
        }
    }
}
