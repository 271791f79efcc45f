use std::process;

use anyhow::Result;
use log::*;
use renderer::Renderer;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

pub mod config;
mod renderer;
pub mod vulkan;

use config::Config;

#[derive(Debug)]
pub struct Engine {
    window: Window,
    renderer: Renderer,
    event_loop: EventLoop<()>,
}

impl Engine {
    pub fn new(config: &Config) -> Result<Engine> {
        // Window
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_resizable(false)
            .build(&event_loop)?;

        let renderer = unsafe { Renderer::create(&window, config)? };

        Ok(Engine {
            window,
            renderer,
            event_loop,
        })
    }

    /// Idles until the window is closed, then tears the renderer down.
    pub fn run(mut self) -> Result<()> {
        self.event_loop.run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            if let Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                window_id,
            } = event
            {
                if window_id != self.window.id() || elwt.exiting() {
                    return;
                }
                elwt.exit();
                if let Err(e) = unsafe { self.renderer.destroy() } {
                    error!("{:#}", e);
                    process::exit(1);
                }
            }
        })?;

        Ok(())
    }
}
