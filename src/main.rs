use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use glam::Vec2;
use log::info;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use hod_viewer::app::{apply_load_event, request_startup_assets};
use hod_viewer::{
    capability, AssetCatalog, LightParams, ModelLoader, OrbitCamera, Renderer, SceneGraph,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;

    // The probe runs synchronously and completes before any asset is
    // requested. Missing features are data, not errors.
    let verdict = capability::probe();
    println!(
        "Capability probe: deferred={} binary-modules={}",
        verdict.deferred, verdict.binary_modules
    );

    let catalog = AssetCatalog::default();
    let mut loader = ModelLoader::new();
    let requested = request_startup_assets(&mut loader, &options.assets_dir, &catalog, verdict);
    for path in &requested {
        println!("Requesting {}", path.display());
    }

    let scene = SceneGraph::new();

    if options.summary_only {
        run_headless(&mut loader, &scene)
    } else {
        match run_interactive(&mut loader, &scene) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    run_headless(&mut loader, &scene)
                } else {
                    Err(err)
                }
            }
        }
    }
}

fn run_headless(loader: &mut ModelLoader, scene: &SceneGraph) -> Result<()> {
    for event in loader.wait_idle() {
        apply_load_event(scene, event);
    }
    print_scene_summary(scene);
    Ok(())
}

fn run_interactive(loader: &mut ModelLoader, scene: &SceneGraph) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("HOD Room Viewer")
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let renderer = block_on(Renderer::new(Arc::clone(&window)))
        .map_err(|err| WindowInitError::from_error("renderer", err))?;

    let mut app = AppState {
        renderer,
        scene: scene.clone(),
        loader,
        camera: OrbitCamera::default(),
        light: LightParams::default(),
        dragging: false,
        cursor: None,
        last_error: None,
    };

    let mut event_loop = event_loop;
    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    print_scene_summary(scene);

    if let Some(err) = app.last_error {
        return Err(err);
    }

    Ok(())
}

struct AppState<'a> {
    renderer: Renderer,
    scene: SceneGraph,
    loader: &'a mut ModelLoader,
    camera: OrbitCamera,
    light: LightParams,
    dragging: bool,
    cursor: Option<Vec2>,
    last_error: Option<anyhow::Error>,
}

impl AppState<'_> {
    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        control_flow.set_exit();
                    }
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        if *button == MouseButton::Left {
                            self.dragging = *state == ElementState::Pressed;
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let pos = Vec2::new(position.x as f32, position.y as f32);
                        if self.dragging {
                            if let Some(last) = self.cursor {
                                let delta = pos - last;
                                self.camera.rotate(delta.x, delta.y);
                            }
                        }
                        self.cursor = Some(pos);
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let amount = match delta {
                            MouseScrollDelta::LineDelta(_, y) => *y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        self.camera.zoom(amount);
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                let models = self.scene.snapshot();
                let camera = self.camera.params(self.renderer.aspect());
                self.renderer.update_globals(&camera, &self.light);
                if let Err(err) = self.renderer.render(&models) {
                    match err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            let size = self.renderer.window().inner_size();
                            self.renderer.resize(size);
                        }
                        wgpu::SurfaceError::OutOfMemory => {
                            return Err(anyhow!("GPU is out of memory"));
                        }
                        wgpu::SurfaceError::Timeout => {
                            info!("Surface timeout; retrying next frame");
                        }
                    }
                }
            }
            Event::MainEventsCleared => {
                for event in self.loader.poll() {
                    apply_load_event(&self.scene, event);
                }
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }
}

fn print_scene_summary(scene: &SceneGraph) {
    println!(
        "Scene contains {} model(s) ({} meshes)",
        scene.len(),
        scene.mesh_count()
    );
    for model in scene.snapshot() {
        println!(" - {} ({} mesh(es))", model.name, model.meshes.len());
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

struct CliOptions {
    assets_dir: PathBuf,
    summary_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut assets_dir = PathBuf::from("models");
        let mut summary_only = false;
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--assets-dir" => {
                    let Some(dir) = args.next() else {
                        return Err(anyhow!("--assets-dir requires a path"));
                    };
                    assets_dir = PathBuf::from(dir);
                }
                "--summary-only" => summary_only = true,
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --assets-dir <dir> or --summary-only"
                    ));
                }
            }
        }
        Ok(Self {
            assets_dir,
            summary_only,
        })
    }
}
