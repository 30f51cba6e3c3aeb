use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use log::warn;
use winit::event_loop::EventLoop;

use objview::{load_obj, load_shader, App, ViewerConfig, DEFAULT_SHADER};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;

    let config = match &options.settings {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };

    let model = load_obj(&options.model)
        .with_context(|| format!("failed to load model {}", options.model.display()))?;

    println!(
        "Loaded {} with {} meshes ({} vertices, {} triangles, {} materials)",
        model.name,
        model.meshes.len(),
        model.vertex_count(),
        model.triangle_count(),
        model.materials.len()
    );
    for mesh in &model.meshes {
        println!(" - {} ({} triangles)", mesh.name, mesh.indices.len() / 3);
    }

    if options.info_only {
        return Ok(());
    }

    let shader_path = config
        .shader
        .clone()
        .unwrap_or_else(|| PathBuf::from("shaders/phong.wgsl"));
    let shader_source = match load_shader(&shader_path) {
        Ok(source) => source,
        Err(err) => {
            warn!("{err:#}; falling back to the built-in shader");
            DEFAULT_SHADER.to_string()
        }
    };

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = App::new(model, shader_source, config, options.wireframe)?;
    event_loop.run_app(&mut app).context("event loop failed")?;
    app.finish()
}

struct CliOptions {
    model: PathBuf,
    wireframe: bool,
    settings: Option<PathBuf>,
    info_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(model) = args.next() else {
            return Err(anyhow!(
                "Usage: objview <model.obj> [--wireframe] [--settings <file>] [--info]"
            ));
        };
        let mut wireframe = false;
        let mut settings = None;
        let mut info_only = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--wireframe" => wireframe = true,
                "--info" => info_only = true,
                "--settings" => {
                    let Some(path) = args.next() else {
                        return Err(anyhow!("--settings expects a file path"));
                    };
                    settings = Some(PathBuf::from(path));
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --wireframe, --settings or --info"
                    ));
                }
            }
        }
        Ok(Self {
            model: PathBuf::from(model),
            wireframe,
            settings,
            info_only,
        })
    }
}
