//! meshview terminal viewer
//!
//! Loads an STL, OBJ, PLY or glTF model (or a demo cube) and renders it as
//! ASCII art with point-to-point measurement, clipping planes and camera
//! presets.

use clap::Parser;
use meshview_core::{load_path, Mesh, ViewerConfig, ViewerSession};
use meshview_terminal::TerminalApp;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "meshview-terminal")]
#[command(about = "Inspect 3D models in the terminal", long_about = None)]
#[command(version)]
struct Cli {
    /// Model file to open (.stl, .obj, .ply, .gltf or .glb). A cube is shown
    /// when omitted.
    model: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_mesh(cli: &Cli) -> meshview_core::Result<Mesh> {
    match &cli.model {
        Some(path) => {
            log::info!("loading model file {}", path.display());
            load_path(path)
        }
        None => {
            log::info!("no model file provided, using default cube");
            Ok(Mesh::cube(2.0))
        }
    }
}

fn run(cli: Cli) -> meshview_core::Result<()> {
    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };

    let mesh = load_mesh(&cli)?;
    let mut session = ViewerSession::new(config, 80, 48);
    session.load_model(mesh)?;

    let mut app = TerminalApp::new(session)?;
    app.run()?;
    Ok(())
}

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    run(cli).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}
