//! swapframe - presents a triangle through an explicitly managed swapchain.
//!
//! Usage: `swapframe [config.toml]`. Without an argument `swapframe.toml` in
//! the working directory is used if present.

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use swapframe_core::{Config, FrameTimer, init_logging};
use swapframe_platform::Window;
use swapframe_renderer::{FrameOutcome, Renderer};

const DEFAULT_CONFIG_PATH: &str = "swapframe.toml";

struct App {
    config: Config,
    // Dropped before the window it renders into.
    renderer: Option<Renderer>,
    window: Option<Window>,
    timer: FrameTimer,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            timer: FrameTimer::new(),
        }
    }

    fn shutdown(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            if let Err(e) = renderer.shutdown() {
                error!("Renderer shutdown failed: {}", e);
            }
            info!(
                "Presented {} frames, {} swapchain recreations",
                renderer.frames().frames_presented(),
                renderer.frames().recreations()
            );
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(event_loop, &self.config.window) {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match Renderer::new(&window, &self.config.renderer) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                window.request_redraw();
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                error!("Failed to create renderer: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                debug!("Window resized to {}x{}", size.width, size.height);
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.request_recreate();
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(renderer) = self.renderer.as_mut() else {
                    return;
                };
                match renderer.render_frame() {
                    Ok(FrameOutcome::Presented { .. }) => {
                        self.timer.tick();
                    }
                    Ok(outcome) => debug!("Frame not presented: {:?}", outcome),
                    Err(e) => {
                        error!("Render error: {}", e);
                        self.shutdown();
                        event_loop.exit();
                        return;
                    }
                }
                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;

    init_logging(&config.logging);
    match &config.source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config at {}, using defaults", config_path),
    }
    info!(
        "Starting swapframe ({} frame(s) in flight)",
        config.renderer.frames_in_flight
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
