//! GLFW-based window, grounded on the teacher's Vulkan-backend window
//! wrapper but trimmed to what the renderer actually needs: surface
//! creation, framebuffer size, and resize/close polling.

use ash::vk;

use crate::error::{Error, Result};

pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| Error::InvalidOperation(format!("glfw init failed: {e}")))?;
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or_else(|| Error::InvalidOperation("glfw window creation failed".into()))?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        Ok(Self { glfw, window, events })
    }

    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    pub fn flush_events(&self) -> glfw::FlushedMessages<'_, (f64, glfw::WindowEvent)> {
        glfw::flush_messages(&self.events)
    }

    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (w, h) = self.window.get_framebuffer_size();
        (w as u32, h as u32)
    }

    /// Top-left corner of the primary monitor's work area, in virtual screen
    /// coordinates. Falls back to the origin if GLFW reports no monitors.
    pub fn primary_monitor_position(&mut self) -> (i32, i32) {
        self.glfw
            .with_primary_monitor(|_, monitor| monitor.map(|m| m.get_pos()))
            .unwrap_or((0, 0))
    }

    pub fn required_instance_extensions(&self) -> Result<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| Error::InvalidOperation("glfw reported no required instance extensions".into()))
    }

    pub fn create_surface(&mut self, instance: vk::Instance) -> Result<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self
            .window
            .create_window_surface(instance, std::ptr::null(), &mut surface);
        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(Error::api("creating window surface", result))
        }
    }
}
