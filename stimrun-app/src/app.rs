use anyhow::{Result, anyhow};
use pixels::{Pixels, SurfaceTexture};
use std::sync::Arc;
use std::time::Duration;
use stimrun_core::{RunPhase, Schedule};
use stimrun_render::SkiaRenderer;
use stimrun_run::{RunConfig, RunEvent, RunStateMachine};
use stimrun_timing::{Clock, RunClock};
use tracing::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

/// The scanner trigger. Everything else except Escape is ignored.
fn is_trigger(code: KeyCode) -> bool {
    code == KeyCode::Equal
}

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    machine: RunStateMachine<RunPhase, RunClock>,
    last_frame: Option<u64>,
    should_exit: bool,
}

impl App {
    pub fn new(config: RunConfig, schedule: Schedule) -> Self {
        Self {
            window: None,
            pixels: None,
            renderer: None,
            machine: RunStateMachine::new(config, schedule, RunClock::new()),
            last_frame: None,
            should_exit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self).map_err(Into::into)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let config = &self.machine.config;

        let requested = event_loop.available_monitors().nth(config.screen);
        if requested.is_none() {
            warn!(
                screen = config.screen,
                "monitor index not present, falling back to primary"
            );
        }
        let monitor = requested
            .or_else(|| event_loop.primary_monitor())
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow!("no monitor available"))?;

        if let Some(rate) = monitor.refresh_rate_millihertz() {
            info!(refresh_hz = rate as f64 / 1000.0, "display refresh rate");
        }

        let window_attributes = Window::default_attributes()
            .with_title("stimrun")
            .with_inner_size(LogicalSize::new(config.width as f64, config.height as f64))
            .with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        info!(
            surface_width = physical_size.width,
            surface_height = physical_size.height,
            buffer_width = config.width,
            buffer_height = config.height,
            screen = config.screen,
            "display opened"
        );

        // Surface tracks the monitor; the render buffer stays at the fixed
        // presentation resolution and pixels scales it out.
        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(config.width, config.height, surface_texture)?);
        self.renderer = Some(SkiaRenderer::new(
            config.width,
            config.height,
            &self.machine.schedule,
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);

        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (&mut self.pixels, &mut self.renderer) else {
            return Ok(());
        };

        renderer.render_frame(self.machine.view(), pixels.frame_mut())?;
        pixels.render()?;

        let now = self.machine.clock.now();
        if let Some(prev) = self.last_frame {
            self.machine
                .clock
                .record_frame(Duration::from_nanos(now.saturating_sub(prev)));
        }
        self.last_frame = Some(now);

        Ok(())
    }

    fn update(&mut self, event_loop: &ActiveEventLoop) {
        for event in self.machine.update() {
            match event {
                RunEvent::StimulusOnset {
                    index,
                    scheduled,
                    actual,
                } => {
                    let label = self
                        .machine
                        .schedule
                        .trials
                        .get(index)
                        .map(|t| t.label.as_str())
                        .unwrap_or("?");
                    info!(
                        trial = index,
                        label,
                        scheduled_s = scheduled.as_secs_f64(),
                        actual_s = actual.as_secs_f64(),
                        "stimulus onset"
                    );
                }
                RunEvent::StimulusOffset { index, actual } => {
                    info!(
                        trial = index,
                        actual_s = actual.as_secs_f64(),
                        "stimulus offset"
                    );
                }
                RunEvent::RunComplete { actual } => {
                    info!(elapsed_s = actual.as_secs_f64(), "run complete");
                    self.cleanup_and_exit(event_loop);
                }
                RunEvent::TriggerReceived => {}
            }
        }
    }

    fn handle_input(&mut self, key: PhysicalKey, event_loop: &ActiveEventLoop) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        if is_trigger(code) {
            if self.machine.handle_trigger().is_some() {
                info!("got first trigger");
            }
        } else if code == KeyCode::Escape {
            warn!("aborted from keyboard");
            self.cleanup_and_exit(event_loop);
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                error!(error = %e, "failed to resize surface");
            }
        }
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }

        let pacing = self.machine.clock.pacing();
        info!(
            frames = pacing.frames,
            mean_frame_ms = pacing.mean_frame_ns / 1e6,
            jitter_ms = pacing.jitter_ns / 1e6,
            effective_fps = pacing.effective_fps,
            "frame pacing"
        );
        info!("presentation run finished");

        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!(error = %e, "failed to open the display");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    error!(error = %e, "render failed");
                    self.cleanup_and_exit(event_loop);
                    return;
                }
                self.update(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_input(event.physical_key, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_equal_key_triggers() {
        assert!(is_trigger(KeyCode::Equal));
        assert!(!is_trigger(KeyCode::Space));
        assert!(!is_trigger(KeyCode::Enter));
        assert!(!is_trigger(KeyCode::NumpadEqual));
    }
}
