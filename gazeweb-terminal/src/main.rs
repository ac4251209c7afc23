/// GazeWeb Terminal Viewer - Web page on a plane, clicked by gaze
///
/// Renders the content plane side by side for both eyes in the terminal.
/// Controls:
///   - WASD / Arrow Keys: Turn the head
///   - E/R: Roll the head, C: Recenter
///   - Space/Enter (or mouse click): Tap where the red reticle points
///   - P: Move the page around the viewer
///   - Q/ESC: Quit
///
/// Usage: gazeweb-terminal [config-file]
/// Logs go to `gazeweb.log`; set `RUST_LOG` to change the level.
use gazeweb_core::ViewerConfig;
use gazeweb_terminal::{to_io_error, TerminalApp};
use std::env;
use std::fs::File;
use std::io;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn main() -> io::Result<()> {
    let log_file = File::create("gazeweb.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let config = match env::args().nth(1) {
        Some(path) => {
            println!("Loading config: {}", path);
            ViewerConfig::load(&path).map_err(to_io_error)?
        }
        None => ViewerConfig::default(),
    };

    println!("GazeWeb Terminal Viewer - {}", config.welcome_message);
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(config)?;
    app.run()?;

    println!("Thank you for using GazeWeb!");
    Ok(())
}
