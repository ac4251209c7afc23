/// Shared content surface between the surface renderer and the render loop.
///
/// The surface renderer paints web content into an off-screen buffer and
/// posts each finished frame together with its texture-coordinate
/// correction matrix. The render loop latches the newest frame once per
/// frame. Both sides hold a clone of [`SharedSurface`]; one lock covers the
/// whole state so a latch never sees a frame without its matrix.
use nalgebra::Matrix4;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{GazeError, Result};

/// Non-owning handle to the texture the surface renderer fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Snapshot taken by the render loop at the start of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatchedFrame {
    pub texture: TextureHandle,
    pub transform: Matrix4<f32>,
    /// Frames posted since the surface was attached
    pub sequence: u64,
    /// True when a new frame was consumed by this latch
    pub fresh: bool,
}

#[derive(Debug)]
struct SurfaceState {
    texture: Option<TextureHandle>,
    width: u32,
    height: u32,
    transform: Matrix4<f32>,
    pending: Option<Matrix4<f32>>,
    posted: u64,
}

/// Content surface jointly owned by producer and render loop
#[derive(Debug, Clone)]
pub struct SharedSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl SharedSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState {
                texture: None,
                width,
                height,
                transform: Matrix4::identity(),
                pending: None,
                posted: 0,
            })),
        }
    }

    /// Attach the texture the surface renderer will paint into.
    ///
    /// Until this happens the surface is not ready.
    pub fn attach(&self, texture: TextureHandle) {
        let mut state = self.state.lock();
        state.texture = Some(texture);
        info!(
            texture = texture.0,
            width = state.width,
            height = state.height,
            "content surface attached"
        );
    }

    pub fn detach(&self) {
        let mut state = self.state.lock();
        state.texture = None;
        state.pending = None;
        info!("content surface detached");
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().texture.is_some()
    }

    /// Default buffer size in surface pixels
    pub fn size(&self) -> (u32, u32) {
        let state = self.state.lock();
        (state.width, state.height)
    }

    /// Publish a finished frame. Called by the surface renderer.
    ///
    /// Frames posted before the render loop latches are coalesced; only the
    /// newest transform survives.
    pub fn post_frame(&self, transform: Matrix4<f32>) -> Result<()> {
        let mut state = self.state.lock();
        if state.texture.is_none() {
            return Err(GazeError::ResourceNotReady {
                resource: "content surface",
            });
        }
        state.pending = Some(transform);
        state.posted += 1;
        Ok(())
    }

    /// Consume the newest frame and read its correction matrix in one step.
    ///
    /// When nothing new was posted the previous matrix is returned with
    /// `fresh` unset.
    pub fn latch(&self) -> Result<LatchedFrame> {
        let mut state = self.state.lock();
        let texture = state.texture.ok_or(GazeError::ResourceNotReady {
            resource: "content surface",
        })?;

        let fresh = match state.pending.take() {
            Some(transform) => {
                state.transform = transform;
                true
            }
            None => false,
        };
        if fresh {
            debug!(sequence = state.posted, "latched content frame");
        }

        Ok(LatchedFrame {
            texture,
            transform: state.transform,
            sequence: state.posted,
            fresh,
        })
    }
}
