/// Example: Render one stereo frame offscreen and tap the page
///
/// Usage: cargo run --example headless_click -- [yaw-degrees] [pitch-degrees]

use gazeweb_core::{
    surface_queue, Eye, EyeIndex, GazeRenderer, RotationState, SharedSurface, StereoRenderer,
    SurfaceCommand, SystemClock, TextureHandle, Transform, TriggerSource, ViewerConfig,
};
use gazeweb_terminal::{to_io_error, AsciiRenderer};
use std::env;
use std::io::{self, Write};
use std::sync::Arc;

fn main() -> io::Result<()> {
    let args: Vec<f32> = env::args()
        .skip(1)
        .map(|a| a.parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("bad angle: {}", e)))?;
    let yaw = args.first().copied().unwrap_or(0.0);
    let pitch = args.get(1).copied().unwrap_or(0.0);

    let config = ViewerConfig::default();
    let surface = SharedSurface::new(config.surface_width, config.surface_height);
    surface.attach(TextureHandle(1));
    surface.post_frame(Transform::identity()).map_err(to_io_error)?;

    let mut renderer = GazeRenderer::new(AsciiRenderer::new(100, 30), config.clone(), surface)
        .map_err(to_io_error)?;
    let (commands, inbox) = surface_queue();
    let dispatcher = renderer.dispatcher(Arc::new(SystemClock::new()), commands);

    let rotation = RotationState::new(pitch.to_radians(), yaw.to_radians(), 0.0);
    let head_view = Transform::head_view(&rotation);
    renderer.head_slot().publish(head_view);

    renderer.prepare_frame();
    let [left, right] = renderer.target().eye_viewports();
    let half_ipd = config.ipd / 2.0;
    let fov_y = config.fov_y_deg.to_radians();
    for (index, viewport, offset) in [
        (EyeIndex::Left, left, half_ipd),
        (EyeIndex::Right, right, -half_ipd),
    ] {
        let eye = Eye::new(
            index,
            Transform::translation_matrix(offset, 0.0, 0.0) * head_view,
            fov_y,
            viewport,
        )
        .with_aspect(viewport.aspect() * 0.5);
        renderer.draw_eye(&eye).map_err(to_io_error)?;
    }
    renderer.finish_frame().map_err(to_io_error)?;

    let mut out = io::stdout();
    renderer.target().draw(&mut out)?;
    out.flush()?;

    let click = dispatcher.trigger(TriggerSource::Button).map_err(to_io_error)?;
    println!(
        "\nGaze at plane ({:+.3}, {:+.3}) -> surface ({:.1}, {:.1})",
        renderer.gaze().current().x,
        renderer.gaze().current().y,
        click.down.x,
        click.down.y
    );
    for SurfaceCommand::Pointer(event) in inbox.drain() {
        println!(
            "{:?} at ({:.1}, {:.1}) down={:?} event={:?}",
            event.action, event.x, event.y, event.down_time, event.event_time
        );
    }
    Ok(())
}
