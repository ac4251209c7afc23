/// Turning a gaze hit into a click on the content surface.
///
/// Clicks are not delivered by calling into the surface renderer. They are
/// queued as [`SurfaceCommand`]s that the renderer drains on its own
/// thread.
///
/// Known race: a trigger that fires before the surface renderer has
/// attached its texture is dropped. The dispatcher logs it and reports
/// `ResourceNotReady`; nothing is retried.
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use nalgebra::Vector4;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ViewerConfig;
use crate::error::{GazeError, Result};
use crate::gaze::SharedGaze;
use crate::texture::SharedSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Down,
    Up,
}

/// Synthetic touch event in surface pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub x: f32,
    pub y: f32,
    /// Uptime when the press started
    pub down_time: Duration,
    /// Uptime this event is stamped with
    pub event_time: Duration,
}

/// What asked for the click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// Headset button (the magnet pull on a Cardboard viewer)
    Button,
    /// Direct touch on the phone screen
    Touch,
}

/// Work for the surface renderer
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    Pointer(PointerEvent),
}

/// Receiving end of the surface command queue, owned by the surface renderer
#[derive(Debug)]
pub struct SurfaceInbox {
    rx: Receiver<SurfaceCommand>,
    closed: AtomicBool,
}

impl SurfaceInbox {
    /// Take every queued command without blocking
    pub fn drain(&self) -> Vec<SurfaceCommand> {
        let mut commands = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(command) => commands.push(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.mark_closed();
                    break;
                }
            }
        }
        commands
    }

    /// Wait up to `timeout` for the next command.
    ///
    /// `Disconnected` means every dispatcher is gone and the queue is empty.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<SurfaceCommand, RecvTimeoutError> {
        let received = self.rx.recv_timeout(timeout);
        if let Err(RecvTimeoutError::Disconnected) = received {
            self.mark_closed();
        }
        received
    }

    /// False once a receive has seen the queue disconnected
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn mark_closed(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("surface command queue closed");
        }
    }
}

/// Create the command queue between dispatchers and the surface renderer
pub fn surface_queue() -> (Sender<SurfaceCommand>, SurfaceInbox) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (
        tx,
        SurfaceInbox {
            rx,
            closed: AtomicBool::new(false),
        },
    )
}

/// Affine map from plane-local [-1, 1] space to surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMapping {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl SurfaceMapping {
    pub fn new(width: u32, height: u32, scale: f32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            scale,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.surface_width, config.surface_height, config.surface_scale)
    }

    /// Surface pixel position of a plane-local point. Y grows downward.
    pub fn to_surface(&self, point: &Vector4<f32>) -> (f32, f32) {
        let x = (point.x + 1.0) * (self.width / 2.0) * self.scale;
        let y = (-point.y + 1.0) * (self.height / 2.0) * self.scale;
        (x, y)
    }
}

/// A press/release pair that was queued
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub source: TriggerSource,
    pub down: PointerEvent,
    pub up: PointerEvent,
}

/// Emits clicks at the latest gaze hit. Cheap to clone onto other threads.
#[derive(Clone)]
pub struct InteractionDispatcher {
    gaze: SharedGaze,
    surface: SharedSurface,
    mapping: SurfaceMapping,
    clock: Arc<dyn Clock>,
    click_duration: Duration,
    commands: Sender<SurfaceCommand>,
}

impl InteractionDispatcher {
    pub fn new(
        gaze: SharedGaze,
        surface: SharedSurface,
        mapping: SurfaceMapping,
        clock: Arc<dyn Clock>,
        click_duration: Duration,
        commands: Sender<SurfaceCommand>,
    ) -> Self {
        Self {
            gaze,
            surface,
            mapping,
            clock,
            click_duration,
            commands,
        }
    }

    pub fn mapping(&self) -> SurfaceMapping {
        self.mapping
    }

    /// Click where the user is looking.
    ///
    /// Uses the hit from the most recent prepared frame, which is at most one
    /// frame old.
    pub fn trigger(&self, source: TriggerSource) -> Result<Click> {
        info!(?source, "trigger");
        if !self.surface.is_ready() {
            warn!(?source, "surface not ready, click dropped");
            return Err(GazeError::ResourceNotReady {
                resource: "content surface",
            });
        }

        let intersection = self.gaze.get();
        let (x, y) = self.mapping.to_surface(&intersection);
        let down_time = self.clock.uptime();
        let event_time = down_time + self.click_duration;

        let down = PointerEvent {
            action: PointerAction::Down,
            x,
            y,
            down_time,
            event_time,
        };
        let up = PointerEvent {
            action: PointerAction::Up,
            ..down
        };

        for event in [down, up] {
            if self.commands.send(SurfaceCommand::Pointer(event)).is_err() {
                warn!("surface input queue closed, click dropped");
                return Err(GazeError::ResourceNotReady {
                    resource: "surface input queue",
                });
            }
        }
        debug!(x, y, ?down_time, "click queued");

        Ok(Click { source, down, up })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::texture::TextureHandle;

    fn dispatcher(surface: &SharedSurface) -> (InteractionDispatcher, SurfaceInbox, Arc<TestClock>) {
        let (tx, inbox) = surface_queue();
        let clock = Arc::new(TestClock::starting_at(Duration::from_millis(1_000)));
        let dispatcher = InteractionDispatcher::new(
            SharedGaze::new(),
            surface.clone(),
            SurfaceMapping::from_config(&ViewerConfig::default()),
            clock.clone(),
            Duration::from_millis(10),
            tx,
        );
        (dispatcher, inbox, clock)
    }

    #[test]
    fn test_mapping_reference_points() {
        let mapping = SurfaceMapping::new(1000, 1000, 3.0);
        assert_eq!(mapping.to_surface(&Vector4::new(0.0, 0.0, 0.0, 1.0)), (1500.0, 1500.0));
        assert_eq!(mapping.to_surface(&Vector4::new(-1.0, -1.0, 0.0, 1.0)), (0.0, 3000.0));
        assert_eq!(mapping.to_surface(&Vector4::new(1.0, 1.0, 0.0, 1.0)), (3000.0, 0.0));
    }

    #[test]
    fn test_default_mapping_matches_reference_scale() {
        let mapping = SurfaceMapping::from_config(&ViewerConfig::default());
        assert_eq!(mapping.to_surface(&Vector4::new(0.0, 0.0, 0.0, 1.0)), (1500.0, 1500.0));
    }

    #[test]
    fn test_trigger_queues_down_then_up() {
        let surface = SharedSurface::new(3000, 3000);
        surface.attach(TextureHandle(1));
        let (dispatcher, inbox, _clock) = dispatcher(&surface);

        let click = dispatcher.trigger(TriggerSource::Button).unwrap();
        assert_eq!(click.down.down_time, Duration::from_millis(1_000));
        assert_eq!(click.up.event_time, Duration::from_millis(1_010));

        let commands = inbox.drain();
        assert_eq!(
            commands,
            vec![
                SurfaceCommand::Pointer(click.down),
                SurfaceCommand::Pointer(click.up)
            ]
        );
        assert_eq!(click.down.action, PointerAction::Down);
        assert_eq!(click.up.action, PointerAction::Up);
        assert_eq!((click.up.x, click.up.y), (1500.0, 1500.0));
    }

    #[test]
    fn test_trigger_before_surface_ready_is_dropped() {
        let surface = SharedSurface::new(3000, 3000);
        let (dispatcher, inbox, _clock) = dispatcher(&surface);

        let result = dispatcher.trigger(TriggerSource::Touch);
        assert!(matches!(result, Err(GazeError::ResourceNotReady { .. })));
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn test_closed_queue_reports_not_ready() {
        let surface = SharedSurface::new(3000, 3000);
        surface.attach(TextureHandle(1));
        let (dispatcher, inbox, _clock) = dispatcher(&surface);
        drop(inbox);
        assert!(dispatcher.trigger(TriggerSource::Button).is_err());
    }

    #[test]
    fn test_inbox_closes_with_dispatchers() {
        let surface = SharedSurface::new(3000, 3000);
        let (dispatcher, inbox, _clock) = dispatcher(&surface);
        assert!(inbox.drain().is_empty());
        assert!(inbox.is_open());
        assert_eq!(
            inbox.recv_timeout(Duration::from_millis(1)),
            Err(RecvTimeoutError::Timeout)
        );

        drop(dispatcher);
        assert_eq!(
            inbox.recv_timeout(Duration::from_millis(1)),
            Err(RecvTimeoutError::Disconnected)
        );
        assert!(!inbox.is_open());
    }

    #[test]
    fn test_drain_marks_closed_after_last_commands() {
        let surface = SharedSurface::new(3000, 3000);
        surface.attach(TextureHandle(1));
        let (dispatcher, inbox, _clock) = dispatcher(&surface);
        dispatcher.trigger(TriggerSource::Button).unwrap();
        drop(dispatcher);

        // Queued commands are still delivered after the senders go away.
        assert_eq!(inbox.drain().len(), 2);
        assert!(!inbox.is_open());
    }

    #[test]
    fn test_later_clicks_have_later_timestamps() {
        let surface = SharedSurface::new(3000, 3000);
        surface.attach(TextureHandle(1));
        let (dispatcher, _inbox, clock) = dispatcher(&surface);

        let first = dispatcher.trigger(TriggerSource::Button).unwrap();
        clock.advance(Duration::from_millis(500));
        let second = dispatcher.trigger(TriggerSource::Touch).unwrap();
        assert!(second.down.down_time > first.up.event_time);
        assert_eq!(second.source, TriggerSource::Touch);
    }
}
