use crate::error::RenderError;
use crate::params::Parameters;
use crate::surfaces::SurfacePair;
use crate::uniforms::{SurfaceIndex, UniformBindings};

/// Shader program bound to the full-screen quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    Simulation,
    Display,
}

/// Destination of a render submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Offscreen(SurfaceIndex),
    /// The visible window surface.
    Screen,
}

/// Graphics capability the frame driver runs on.
///
/// `render` draws the full-screen quad with `material` into `target`,
/// resolving every texture it samples from `bindings` against `surfaces`.
/// Implementations may defer execution of submitted passes, but must keep
/// their submission order.
pub trait RenderDevice {
    type Target;

    fn create_target(&mut self, width: u32, height: u32) -> Result<Self::Target, RenderError>;

    fn release_target(&mut self, target: Self::Target);

    /// Overwrites the whole target with row-major RGBA texels.
    fn seed_target(&mut self, target: &Self::Target, texels: &[[f32; 4]]);

    fn render(
        &mut self,
        material: Material,
        bindings: &UniformBindings,
        params: &Parameters,
        surfaces: &SurfacePair<Self::Target>,
        target: RenderTarget,
    ) -> Result<(), RenderError>;

    /// Flushes everything rendered this frame and shows the screen target.
    fn present(&mut self) -> Result<(), RenderError>;

    /// Matches the visible surface to a new canvas size.
    fn resize_screen(&mut self, width: u32, height: u32);
}
