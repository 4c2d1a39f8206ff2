// GPU reaction-diffusion playground.
// Run with: cargo run --release
// Settings are read from rd_settings.json (or $RD_SETTINGS) at startup.

mod device;
mod driver;
mod error;
mod gpu;
mod params;
mod seed;
mod stats;
mod surfaces;
mod uniforms;

#[cfg(test)]
mod testing;

use driver::FrameDriver;
use error::{DeviceFailure, RenderError};
use gpu::WgpuDevice;
use params::{AppContext, Parameters};
use stats::FrameStats;
use std::sync::Arc;
use winit::{
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
};

const WINDOW_TITLE: &str = "Reaction-Diffusion Playground";

// ============================================================================
// INPUT
// ============================================================================

fn handle_key(
    code: KeyCode,
    ctx: &mut AppContext,
    driver: &mut FrameDriver<WgpuDevice>,
    device: &mut WgpuDevice,
    target: &ActiveEventLoop,
) {
    match code {
        KeyCode::Space => {
            let paused = ctx.toggle_pause();
            log::info!("{}", if paused { "Paused" } else { "Resumed" });
        }
        KeyCode::KeyR => {
            driver.reseed(device, &ctx.params.seed);
            log::info!("Reseeded with {:?}", ctx.params.seed);
        }
        KeyCode::KeyS => {
            let style = ctx.params.display.rendering_style.next();
            ctx.params.display.rendering_style = style;
            log::info!("Rendering style: {:?}", style);
        }
        KeyCode::Escape => target.exit(),
        _ => {}
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> anyhow::Result<()> {
    use env_logger::Env;
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let settings_path = Parameters::default_path();
    let params = Parameters::load_or_default(&settings_path);

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        event_loop.create_window(
            winit::window::WindowAttributes::default()
                .with_title(WINDOW_TITLE)
                .with_inner_size(winit::dpi::PhysicalSize::new(
                    params.canvas_width,
                    params.canvas_height,
                )),
        )?,
    );

    let mut device = WgpuDevice::new(window.clone())?;

    // The canvas always mirrors the real presentation surface.
    let mut ctx = AppContext::new(params);
    let (width, height) = device.screen_size();
    ctx.params.canvas_width = width;
    ctx.params.canvas_height = height;

    let mut driver = FrameDriver::new(&mut device, &ctx)?;
    let mut stats = FrameStats::new(driver.ping_pong_steps());

    window.request_redraw();

    event_loop.run(move |event, target| {
        if let Event::WindowEvent { event, window_id } = event {
            if window_id != window.id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested => {
                    log::info!("Rendered {} frames", stats.total_frames());
                    target.exit();
                }
                WindowEvent::Resized(physical_size) => {
                    let was_minimized = ctx.is_minimized();
                    ctx.request_resize(physical_size.width, physical_size.height);
                    // Ticks stop while minimized; restart them on restore.
                    if was_minimized && !ctx.is_minimized() {
                        window.request_redraw();
                    }
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(code),
                            state: ElementState::Pressed,
                            repeat: false,
                            ..
                        },
                    ..
                } => handle_key(code, &mut ctx, &mut driver, &mut device, target),
                WindowEvent::RedrawRequested => {
                    if ctx.is_minimized() {
                        return;
                    }
                    match driver.frame(&mut device, &mut ctx, &mut stats) {
                        Ok(()) => {}
                        Err(RenderError::DeviceSubmissionFailure(
                            DeviceFailure::SurfaceLost | DeviceFailure::SurfaceOutdated,
                        )) => {
                            device.reconfigure();
                        }
                        Err(err) if err.is_fatal() => {
                            log::error!("Stopping render loop: {}", err);
                            target.exit();
                        }
                        // Already logged by the driver; retry on the next tick.
                        Err(_) => {}
                    }

                    if let Some(report) = stats.take_report() {
                        window.set_title(&format!("{} - {}", WINDOW_TITLE, report));
                        log::debug!("{}", report);
                    }

                    // Every tick presents, paused or not, so Fifo presentation
                    // holds the next one until the following refresh.
                    window.request_redraw();
                }
                _ => {}
            }
        }
    })?;

    Ok(())
}
