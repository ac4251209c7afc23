/// Terminal driver for the gaze viewer
///
/// Plays every external collaborator of the core: the keyboard stands in
/// for head tracking, the terminal halves are the two eye viewports, and a
/// background thread acts as the web surface renderer.
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use gazeweb_core::{
    surface_queue, Click, Eye, EyeIndex, GazeError, GazeRenderer, HeadPoseSlot,
    InteractionDispatcher, RotationState, SharedSurface, StereoRenderer, SystemClock,
    Transform, TriggerSource, ViewerConfig,
};
use std::io::{self, stdout, Write};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub mod renderer;
pub mod surface;

pub use renderer::AsciiRenderer;
pub use surface::SurfaceSimulator;

/// Head turn per key press (radians)
const TURN_STEP: f32 = 0.05;
const PITCH_LIMIT: f32 = 1.4;

/// Plane placements cycled with `P`: (swing degrees, distance, elevation degrees)
const PLACEMENTS: &[(f32, f32, f32)] = &[(35.0, 2.0, 10.0), (-70.0, 1.5, -5.0), (35.0, 1.5, 0.0)];

/// Main application struct for terminal gaze rendering
pub struct TerminalApp {
    config: ViewerConfig,
    renderer: GazeRenderer<AsciiRenderer>,
    head: HeadPoseSlot,
    rotation: RotationState,
    dispatcher: InteractionDispatcher,
    surface_thread: Option<(SurfaceSimulator, JoinHandle<()>)>,
    placement: usize,
    running: bool,
    last_click: Option<Click>,
    status: String,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: ViewerConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        // Bottom two rows hold the status overlay
        let render_height = height.saturating_sub(2).max(1) as usize;

        let surface = SharedSurface::new(config.surface_width, config.surface_height);
        let renderer = GazeRenderer::new(
            AsciiRenderer::new(width as usize, render_height),
            config.clone(),
            surface.clone(),
        )
        .map_err(to_io_error)?;

        let (commands, inbox) = surface_queue();
        let dispatcher = renderer.dispatcher(Arc::new(SystemClock::new()), commands);
        let simulator = SurfaceSimulator::new(surface, config.home_url.clone());
        let handle = simulator.spawn(inbox);

        Ok(Self {
            head: renderer.head_slot(),
            status: config.welcome_message.clone(),
            config,
            renderer,
            rotation: RotationState::zero(),
            dispatcher,
            surface_thread: Some((simulator, handle)),
            placement: 0,
            running: true,
            last_click: None,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;
        terminal::disable_raw_mode()?;
        self.stop_surface();

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_input()?;
            }

            self.update();
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<()> {
        match event::read()? {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => match code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.running = false;
                }
                KeyCode::Char('w') | KeyCode::Up => self.rotation.rotate(TURN_STEP, 0.0, 0.0),
                KeyCode::Char('s') | KeyCode::Down => self.rotation.rotate(-TURN_STEP, 0.0, 0.0),
                KeyCode::Char('a') | KeyCode::Left => self.rotation.rotate(0.0, TURN_STEP, 0.0),
                KeyCode::Char('d') | KeyCode::Right => self.rotation.rotate(0.0, -TURN_STEP, 0.0),
                KeyCode::Char('e') => self.rotation.rotate(0.0, 0.0, TURN_STEP),
                KeyCode::Char('r') => self.rotation.rotate(0.0, 0.0, -TURN_STEP),
                KeyCode::Char('c') => self.rotation = RotationState::zero(),
                KeyCode::Char('p') => self.relocate_plane(),
                KeyCode::Char(' ') | KeyCode::Enter => self.click(TriggerSource::Button),
                _ => {}
            },
            Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(_),
                ..
            }) => self.click(TriggerSource::Touch),
            Event::Resize(width, height) => {
                let render_height = height.saturating_sub(2).max(1) as usize;
                self.renderer
                    .target_mut()
                    .resize(width as usize, render_height);
            }
            _ => {}
        }
        Ok(())
    }

    fn click(&mut self, source: TriggerSource) {
        match self.dispatcher.trigger(source) {
            Ok(click) => {
                self.status = format!("clicked at ({:.0}, {:.0})", click.down.x, click.down.y);
                self.last_click = Some(click);
            }
            Err(err) => self.status = format!("click dropped: {}", err),
        }
    }

    fn relocate_plane(&mut self) {
        let (swing, distance, elevation) = PLACEMENTS[self.placement % PLACEMENTS.len()];
        self.placement += 1;
        self.renderer.relocate_plane(swing, distance, elevation);
        self.status = format!("plane moved to {:.1}m", distance);
    }

    fn update(&mut self) {
        self.rotation.clamp_pitch(PITCH_LIMIT);
        self.head.publish(Transform::head_view(&self.rotation));
    }

    /// Eyes as the stereo provider would hand them over
    fn eyes(&self) -> [Eye; 2] {
        let fov_y = self.config.fov_y_deg.to_radians();
        let half_ipd = self.config.ipd / 2.0;
        let [left, right] = self.renderer.target().eye_viewports();
        // Terminal cells are about twice as tall as they are wide.
        let aspect = left.aspect() * 0.5;
        [
            Eye::new(
                EyeIndex::Left,
                Transform::translation_matrix(half_ipd, 0.0, 0.0) * self.renderer.scene().head_view(),
                fov_y,
                left,
            )
            .with_aspect(aspect),
            Eye::new(
                EyeIndex::Right,
                Transform::translation_matrix(-half_ipd, 0.0, 0.0) * self.renderer.scene().head_view(),
                fov_y,
                right,
            )
            .with_aspect(aspect),
        ]
    }

    fn render_frame(&mut self) {
        self.renderer.prepare_frame();
        for eye in &self.eyes() {
            if let Err(err) = self.renderer.draw_eye(eye) {
                warn!(%err, eye = eye.index.as_str(), "eye pass skipped");
            }
        }
        if let Err(err) = self.renderer.finish_frame() {
            warn!(%err, "frame did not finish cleanly");
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.render_frame();

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.target().draw(&mut stdout)?;

        let gaze = self.renderer.gaze().current();
        let (sx, sy) = self.dispatcher.mapping().to_surface(&gaze);
        let rows = self.renderer.target().height() as u16;
        queue!(
            stdout,
            cursor::MoveTo(0, rows),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "GazeWeb | FPS: {:.1} | gaze ({:+.2}, {:+.2}) -> surface ({:.0}, {:.0}) | {}",
                self.fps, gaze.x, gaze.y, sx, sy, self.status
            )),
            terminal::Clear(terminal::ClearType::UntilNewLine),
            cursor::MoveTo(0, rows + 1),
            Print("Arrows/WASD=Look E/R=Roll C=Center Space/Click=Tap P=Move page Q=Quit"),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }

    fn stop_surface(&mut self) {
        if let Some((simulator, handle)) = self.surface_thread.take() {
            simulator.stop();
            if handle.join().is_err() {
                warn!("surface thread panicked");
            }
        }
        if let Some(click) = self.last_click {
            info!(x = click.down.x, y = click.down.y, "last click of the session");
        }
    }
}

impl Drop for TerminalApp {
    fn drop(&mut self) {
        self.stop_surface();
    }
}

/// Map core errors onto `io::Error` for the binary
pub fn to_io_error(err: GazeError) -> io::Error {
    let kind = match err {
        GazeError::Config(_) => io::ErrorKind::InvalidData,
        _ => io::ErrorKind::Other,
    };
    io::Error::new(kind, err.to_string())
}
