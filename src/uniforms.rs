use crate::params::{DisplayParams, SimulationParams};
use bytemuck::{Pod, Zeroable};

/// Binary address of one of the two ping-pong surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SurfaceIndex {
    #[default]
    Zero,
    One,
}

impl SurfaceIndex {
    /// The complementary surface.
    pub fn other(self) -> Self {
        match self {
            SurfaceIndex::Zero => SurfaceIndex::One,
            SurfaceIndex::One => SurfaceIndex::Zero,
        }
    }

    pub fn as_usize(self) -> usize {
        match self {
            SurfaceIndex::Zero => 0,
            SurfaceIndex::One => 1,
        }
    }
}

/// Reference to the texture of one surface, valid only for the surface
/// generation it was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRef {
    pub slot: SurfaceIndex,
    pub generation: u64,
}

/// Inputs of the simulation shader stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationUniforms {
    pub previous_iteration_texture: TextureRef,
    pub resolution: [f32; 2],
}

/// Inputs of the display shader stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayUniforms {
    pub texture_to_display: TextureRef,
    pub previous_iteration_texture: TextureRef,
    pub time: f32,
}

/// Both uniform sets. Every setter replaces the affected set with a new
/// value so a copy taken before a submission never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformBindings {
    pub simulation: SimulationUniforms,
    pub display: DisplayUniforms,
}

impl UniformBindings {
    pub fn new(current: TextureRef, previous: TextureRef, width: u32, height: u32) -> Self {
        Self {
            simulation: SimulationUniforms {
                previous_iteration_texture: current,
                resolution: [width as f32, height as f32],
            },
            display: DisplayUniforms {
                texture_to_display: current,
                previous_iteration_texture: previous,
                time: 0.0,
            },
        }
    }

    pub fn set_simulation_previous_texture(&mut self, texture: TextureRef) {
        self.simulation = SimulationUniforms {
            previous_iteration_texture: texture,
            ..self.simulation
        };
    }

    pub fn set_simulation_resolution(&mut self, width: u32, height: u32) {
        self.simulation = SimulationUniforms {
            resolution: [width as f32, height as f32],
            ..self.simulation
        };
    }

    pub fn set_display_texture_to_display(&mut self, texture: TextureRef) {
        self.display = DisplayUniforms {
            texture_to_display: texture,
            ..self.display
        };
    }

    pub fn set_display_previous_texture(&mut self, texture: TextureRef) {
        self.display = DisplayUniforms {
            previous_iteration_texture: texture,
            ..self.display
        };
    }

    pub fn set_display_time(&mut self, seconds: f32) {
        self.display = DisplayUniforms {
            time: seconds,
            ..self.display
        };
    }

    /// Texture references currently held by either stage.
    #[cfg(test)]
    pub fn texture_refs(&self) -> [TextureRef; 3] {
        [
            self.simulation.previous_iteration_texture,
            self.display.texture_to_display,
            self.display.previous_iteration_texture,
        ]
    }
}

// ============================================================================
// GPU UNIFORM BLOCKS (must match src/shaders/*.wgsl)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SimulationBlock {
    pub resolution: [f32; 2],
    pub feed: f32,
    pub kill: f32,
    pub diffusion_a: f32,
    pub diffusion_b: f32,
    pub timestep: f32,
    pub _pad: f32,
}

impl SimulationBlock {
    pub fn new(uniforms: &SimulationUniforms, params: &SimulationParams) -> Self {
        Self {
            resolution: uniforms.resolution,
            feed: params.feed,
            kill: params.kill,
            diffusion_a: params.diffusion_a,
            diffusion_b: params.diffusion_b,
            timestep: params.timestep,
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct DisplayBlock {
    pub time: f32,
    pub rendering_style: u32,
    pub _pad: [f32; 2],
}

impl DisplayBlock {
    pub fn new(uniforms: &DisplayUniforms, params: &DisplayParams) -> Self {
        Self {
            time: uniforms.time,
            rendering_style: params.rendering_style.shader_id(),
            _pad: [0.0; 2],
        }
    }
}
