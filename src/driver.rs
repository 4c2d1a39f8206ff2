use crate::device::{Material, RenderDevice, RenderTarget};
use crate::error::RenderError;
use crate::params::AppContext;
use crate::seed::SeedPattern;
use crate::stats::StatsSink;
use crate::surfaces::SurfacePair;
use crate::uniforms::{SurfaceIndex, UniformBindings};

/// Runs the ping-pong simulation batch and the display pass once per
/// display refresh.
///
/// The driver owns the surface pair and both uniform sets. Resizes go
/// through [`FrameDriver::resize`], which rebinds every texture reference
/// before returning, so no submission can observe a half-resized pair.
pub struct FrameDriver<D: RenderDevice> {
    surfaces: SurfacePair<D::Target>,
    bindings: UniformBindings,
    current: SurfaceIndex,
    ping_pong_steps: u32,
    quad_material: Material,
}

impl<D: RenderDevice> FrameDriver<D> {
    pub fn new(device: &mut D, ctx: &AppContext) -> Result<Self, RenderError> {
        let (width, height) = (ctx.params.canvas_width, ctx.params.canvas_height);
        let surfaces = SurfacePair::allocate(device, width, height)?;
        let current = SurfaceIndex::Zero;
        let bindings = UniformBindings::new(
            surfaces.texture_ref(current),
            surfaces.texture_ref(current.other()),
            width,
            height,
        );

        let mut driver = Self {
            surfaces,
            bindings,
            current,
            ping_pong_steps: ctx.params.ping_pong_steps,
            quad_material: Material::Display,
        };
        driver.reseed(device, &ctx.params.seed);
        log::info!(
            "Allocated {}x{} render targets, {} simulation steps per frame",
            width,
            height,
            driver.ping_pong_steps
        );
        Ok(driver)
    }

    /// One display-refresh tick.
    ///
    /// A pending resize is applied first. While paused no simulation pass
    /// runs; the display pass is re-issued against the unchanged targets so
    /// the tick still presents and stays on the refresh cadence. `stats` is
    /// notified on every tick. A failed submission ends the current frame;
    /// the next tick starts normally. Nothing happens while the window is
    /// minimized.
    pub fn frame(
        &mut self,
        device: &mut D,
        ctx: &mut AppContext,
        stats: &mut impl StatsSink,
    ) -> Result<(), RenderError> {
        if ctx.is_minimized() {
            log::trace!("Window minimized, skipping frame");
            return Ok(());
        }

        if let Some((width, height)) = ctx.take_pending_resize() {
            if let Err(err) = self.resize(device, ctx, width, height) {
                log::debug!("Skipping resize to {}x{}: {}", width, height, err);
            }
        }

        let paused = ctx.paused;
        let result = if paused {
            self.display(device, ctx)
        } else {
            self.run_batch(device, ctx)
        };

        stats.record_frame(paused);

        match &result {
            Err(err) if err.is_transient() => log::debug!("Frame skipped: {}", err),
            Err(err) => log::error!("Frame aborted: {}", err),
            Ok(()) => {}
        }
        result
    }

    fn run_batch(&mut self, device: &mut D, ctx: &AppContext) -> Result<(), RenderError> {
        self.quad_material = Material::Simulation;

        for _ in 0..self.ping_pong_steps {
            let next = self.current.other();
            let current_texture = self.surfaces.texture_ref(self.current);
            let next_texture = self.surfaces.texture_ref(next);

            self.bindings.set_simulation_previous_texture(current_texture);
            device.render(
                self.quad_material,
                &self.bindings,
                &ctx.params,
                &self.surfaces,
                RenderTarget::Offscreen(next),
            )?;
            // The last iteration's output must be what the display pass sees.
            self.bindings.set_simulation_previous_texture(next_texture);
            self.bindings.set_display_texture_to_display(next_texture);
            self.bindings.set_display_previous_texture(current_texture);

            self.current = next;
        }

        self.display(device, ctx)
    }

    /// Composites the current display bindings to the screen and presents.
    /// Writes no off-screen target.
    fn display(&mut self, device: &mut D, ctx: &AppContext) -> Result<(), RenderError> {
        self.bindings.set_display_time(ctx.elapsed_seconds());
        self.quad_material = Material::Display;
        device.render(
            self.quad_material,
            &self.bindings,
            &ctx.params,
            &self.surfaces,
            RenderTarget::Screen,
        )?;
        device.present()
    }

    /// Recreates both render targets at the new size and refreshes every
    /// binding that depends on them. The ping-pong index is kept. Both new
    /// targets are seeded so the next frame starts from a defined state.
    pub fn resize(
        &mut self,
        device: &mut D,
        ctx: &mut AppContext,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        self.surfaces.resize(device, width, height)?;
        device.resize_screen(width, height);
        ctx.params.canvas_width = width;
        ctx.params.canvas_height = height;

        self.bindings.set_simulation_resolution(width, height);
        self.rebind_textures();
        self.reseed(device, &ctx.params.seed);

        log::info!("Resized render targets to {}x{}", width, height);
        Ok(())
    }

    /// Writes `seed` into both targets. The ping-pong index is unchanged.
    pub fn reseed(&mut self, device: &mut D, seed: &SeedPattern) {
        let (width, height) = self.surfaces.dimensions();
        let texels = seed.fill(width, height);
        for target in self.surfaces.iter() {
            device.seed_target(target, &texels);
        }
    }

    fn rebind_textures(&mut self) {
        let current = self.surfaces.texture_ref(self.current);
        let previous = self.surfaces.texture_ref(self.current.other());
        self.bindings.set_simulation_previous_texture(current);
        self.bindings.set_display_texture_to_display(current);
        self.bindings.set_display_previous_texture(previous);
    }

    #[cfg(test)]
    pub fn current_index(&self) -> SurfaceIndex {
        self.current
    }

    pub fn ping_pong_steps(&self) -> u32 {
        self.ping_pong_steps
    }

    #[cfg(test)]
    pub fn bindings(&self) -> &UniformBindings {
        &self.bindings
    }

    #[cfg(test)]
    pub fn surfaces(&self) -> &SurfacePair<D::Target> {
        &self.surfaces
    }

    #[cfg(test)]
    pub fn material(&self) -> Material {
        self.quad_material
    }
}
