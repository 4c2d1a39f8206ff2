use crate::device::RenderDevice;
use crate::error::RenderError;
use crate::uniforms::{SurfaceIndex, TextureRef};

/// The two off-screen render targets used for ping-pong iteration.
///
/// Both targets always share the same dimensions. Every successful
/// (re)allocation bumps `generation`, which invalidates texture references
/// taken from the previous pair.
pub struct SurfacePair<T> {
    targets: [T; 2],
    width: u32,
    height: u32,
    generation: u64,
}

impl<T> SurfacePair<T> {
    pub fn allocate<D>(device: &mut D, width: u32, height: u32) -> Result<Self, RenderError>
    where
        D: RenderDevice<Target = T>,
    {
        let targets = Self::create_targets(device, width, height)?;
        Ok(Self {
            targets,
            width,
            height,
            generation: 1,
        })
    }

    /// Replaces both targets with new ones of the given size. Slot mapping is
    /// kept; contents of the new targets are undefined until seeded. On error
    /// the current targets stay in place.
    pub fn resize<D>(&mut self, device: &mut D, width: u32, height: u32) -> Result<(), RenderError>
    where
        D: RenderDevice<Target = T>,
    {
        let fresh = Self::create_targets(device, width, height)?;
        let old = std::mem::replace(&mut self.targets, fresh);
        self.width = width;
        self.height = height;
        self.generation += 1;
        for target in old {
            device.release_target(target);
        }
        Ok(())
    }

    fn create_targets<D>(device: &mut D, width: u32, height: u32) -> Result<[T; 2], RenderError>
    where
        D: RenderDevice<Target = T>,
    {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let first = device.create_target(width, height)?;
        match device.create_target(width, height) {
            Ok(second) => Ok([first, second]),
            Err(err) => {
                device.release_target(first);
                Err(err)
            }
        }
    }

    pub fn get(&self, index: SurfaceIndex) -> &T {
        &self.targets[index.as_usize()]
    }

    pub fn texture_ref(&self, index: SurfaceIndex) -> TextureRef {
        TextureRef {
            slot: index,
            generation: self.generation,
        }
    }

    pub fn resolve(&self, texture: TextureRef) -> Result<&T, RenderError> {
        if texture.generation != self.generation {
            return Err(RenderError::StaleTextureReference {
                requested: texture,
                current_generation: self.generation,
            });
        }
        Ok(self.get(texture.slot))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.targets.iter()
    }
}
