//! Platform layer: winit windows and the Vulkan surfaces presenting into them.

mod surface;
mod window;

pub use surface::{Surface, WindowSurface, required_extensions};
pub use window::Window;

// Re-export winit types that users might need
pub use winit::event::WindowEvent;
pub use winit::event_loop::{ActiveEventLoop, EventLoop};
