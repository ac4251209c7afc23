/// Background thread playing the web surface renderer
use crossbeam_channel::RecvTimeoutError;
use gazeweb_core::{
    PointerAction, SharedSurface, SurfaceCommand, SurfaceInbox, TextureHandle, Transform,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Texture name the simulated surface paints into
pub const SURFACE_TEXTURE: TextureHandle = TextureHandle(1);

/// How often the simulated page repaints
const REPAINT_INTERVAL: Duration = Duration::from_millis(33);

/// Attaches the surface, repaints it and consumes queued clicks
#[derive(Debug, Clone)]
pub struct SurfaceSimulator {
    surface: SharedSurface,
    url: String,
    stop: Arc<AtomicBool>,
}

impl SurfaceSimulator {
    pub fn new(surface: SharedSurface, url: String) -> Self {
        Self {
            surface,
            url,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn spawn(&self, inbox: SurfaceInbox) -> JoinHandle<()> {
        let this = self.clone();
        std::thread::spawn(move || this.run(inbox))
    }

    fn run(&self, inbox: SurfaceInbox) {
        info!(url = %self.url, "surface renderer loading page");
        self.surface.attach(SURFACE_TEXTURE);

        // Surface textures come out vertically flipped.
        let flip = Transform::translate(&Transform::scale_matrix(1.0, -1.0, 1.0), 0.0, -1.0, 0.0);

        while !self.stop.load(Ordering::Acquire) && inbox.is_open() {
            if let Err(err) = self.surface.post_frame(flip) {
                warn!(%err, "repaint skipped");
            }
            match inbox.recv_timeout(REPAINT_INTERVAL) {
                Ok(command) => self.handle(command),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            for command in inbox.drain() {
                self.handle(command);
            }
        }

        self.surface.detach();
        debug!("surface renderer stopped");
    }

    fn handle(&self, command: SurfaceCommand) {
        match command {
            SurfaceCommand::Pointer(event) => match event.action {
                PointerAction::Down => debug!(x = event.x, y = event.y, "touch down"),
                PointerAction::Up => info!(
                    x = event.x,
                    y = event.y,
                    down_ms = event.down_time.as_millis() as u64,
                    event_ms = event.event_time.as_millis() as u64,
                    url = %self.url,
                    "tap delivered to page"
                ),
            },
        }
    }
}
