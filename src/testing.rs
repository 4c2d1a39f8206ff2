//! Recording `RenderDevice` used by the unit tests.

use crate::device::{Material, RenderDevice, RenderTarget};
use crate::error::{DeviceFailure, RenderError};
use crate::params::Parameters;
use crate::stats::StatsSink;
use crate::surfaces::SurfacePair;
use crate::uniforms::UniformBindings;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTarget {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub material: Material,
    pub target: RenderTarget,
    pub target_id: Option<u32>,
    pub resolution: (u32, u32),
    /// Ids of the sampled textures, in shader binding order.
    pub source_ids: Vec<u32>,
    pub bindings: UniformBindings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { id: u32, width: u32, height: u32 },
    Release { id: u32 },
    Seed { id: u32, texels: usize },
    Render(Submission),
    Present,
    ResizeScreen(u32, u32),
}

pub struct RecordingDevice {
    pub calls: Vec<Call>,
    pub max_dimension: u32,
    /// Render call number (0-based, counted over the device lifetime) that
    /// fails once with `SurfaceLost`.
    pub fail_render_at: Option<usize>,
    pub fail_second_create: bool,
    next_id: u32,
    renders: usize,
    creates_in_row: u32,
    live: HashMap<u32, u64>,
    screen: (u32, u32),
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            max_dimension: 16384,
            fail_render_at: None,
            fail_second_create: false,
            next_id: 1,
            renders: 0,
            creates_in_row: 0,
            live: HashMap::new(),
            screen: (0, 0),
        }
    }
}

impl RecordingDevice {
    pub fn live_targets(&self) -> usize {
        self.live.len()
    }

    /// Write counters of the given targets; any render or seed bumps them.
    pub fn content_versions(&self, ids: &[u32]) -> Vec<Option<u64>> {
        ids.iter().map(|id| self.live.get(id).copied()).collect()
    }

    pub fn simulation_passes(&self) -> Vec<Submission> {
        self.passes(Material::Simulation)
    }

    pub fn display_passes(&self) -> Vec<Submission> {
        self.passes(Material::Display)
    }

    fn passes(&self, material: Material) -> Vec<Submission> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Render(submission) if submission.material == material => {
                    Some(submission.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn bump(&mut self, id: u32) {
        let version = self.live.get_mut(&id).expect("write to released target");
        *version += 1;
    }
}

impl RenderDevice for RecordingDevice {
    type Target = MockTarget;

    fn create_target(&mut self, width: u32, height: u32) -> Result<MockTarget, RenderError> {
        if width > self.max_dimension || height > self.max_dimension {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        self.creates_in_row += 1;
        if self.fail_second_create && self.creates_in_row % 2 == 0 {
            return Err(RenderError::DeviceSubmissionFailure(DeviceFailure::OutOfMemory));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id, 0);
        self.calls.push(Call::Create { id, width, height });
        Ok(MockTarget { id, width, height })
    }

    fn release_target(&mut self, target: MockTarget) {
        assert!(self.live.remove(&target.id).is_some(), "double release");
        self.calls.push(Call::Release { id: target.id });
    }

    fn seed_target(&mut self, target: &MockTarget, texels: &[[f32; 4]]) {
        assert_eq!(texels.len(), (target.width * target.height) as usize);
        self.bump(target.id);
        self.calls.push(Call::Seed {
            id: target.id,
            texels: texels.len(),
        });
    }

    fn render(
        &mut self,
        material: Material,
        bindings: &UniformBindings,
        _params: &Parameters,
        surfaces: &SurfacePair<MockTarget>,
        target: RenderTarget,
    ) -> Result<(), RenderError> {
        let call_number = self.renders;
        self.renders += 1;
        if self.fail_render_at == Some(call_number) {
            self.fail_render_at = None;
            return Err(DeviceFailure::SurfaceLost.into());
        }

        let sources = match material {
            Material::Simulation => vec![bindings.simulation.previous_iteration_texture],
            Material::Display => vec![
                bindings.display.texture_to_display,
                bindings.display.previous_iteration_texture,
            ],
        };
        let mut source_ids = Vec::with_capacity(sources.len());
        for texture in sources {
            source_ids.push(surfaces.resolve(texture)?.id);
        }

        let (target_id, resolution) = match target {
            RenderTarget::Offscreen(index) => {
                let t = surfaces.get(index);
                assert!(
                    !source_ids.contains(&t.id),
                    "pass reads the texture it renders into"
                );
                (Some(t.id), (t.width, t.height))
            }
            RenderTarget::Screen => (None, self.screen),
        };
        if let Some(id) = target_id {
            self.bump(id);
        }

        self.calls.push(Call::Render(Submission {
            material,
            target,
            target_id,
            resolution,
            source_ids,
            bindings: *bindings,
        }));
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.calls.push(Call::Present);
        Ok(())
    }

    fn resize_screen(&mut self, width: u32, height: u32) {
        self.screen = (width, height);
        self.calls.push(Call::ResizeScreen(width, height));
    }
}

#[derive(Debug, Default)]
pub struct CountingStats {
    pub frames: u32,
    pub paused_frames: u32,
}

impl StatsSink for CountingStats {
    fn record_frame(&mut self, paused: bool) {
        self.frames += 1;
        if paused {
            self.paused_frames += 1;
        }
    }
}
