use crate::uniforms::TextureRef;

/// Device-level failure reported by a render submission or presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFailure {
    /// The swapchain surface was lost and must be reconfigured.
    SurfaceLost,
    /// The swapchain no longer matches the window; the next frame will fix it.
    SurfaceOutdated,
    OutOfMemory,
    Timeout,
}

impl std::fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceFailure::SurfaceLost => write!(f, "surface lost"),
            DeviceFailure::SurfaceOutdated => write!(f, "surface outdated"),
            DeviceFailure::OutOfMemory => write!(f, "out of GPU memory"),
            DeviceFailure::Timeout => write!(f, "timed out acquiring surface texture"),
        }
    }
}

impl From<wgpu::SurfaceError> for DeviceFailure {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost => DeviceFailure::SurfaceLost,
            wgpu::SurfaceError::Outdated => DeviceFailure::SurfaceOutdated,
            wgpu::SurfaceError::OutOfMemory => DeviceFailure::OutOfMemory,
            _ => DeviceFailure::Timeout,
        }
    }
}

/// Errors raised by the render core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A surface allocation was requested with a zero or unsupported extent.
    /// The previously allocated surfaces are kept.
    InvalidDimensions { width: u32, height: u32 },
    /// A render submission failed. Fatal for the current frame only.
    DeviceSubmissionFailure(DeviceFailure),
    /// A uniform binding points at a surface generation that no longer exists.
    StaleTextureReference { requested: TextureRef, current_generation: u64 },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::InvalidDimensions { width, height } => {
                write!(f, "invalid render target dimensions {}x{}", width, height)
            }
            RenderError::DeviceSubmissionFailure(failure) => {
                write!(f, "render submission failed: {}", failure)
            }
            RenderError::StaleTextureReference {
                requested,
                current_generation,
            } => write!(
                f,
                "stale texture reference to slot {:?} of generation {} (current generation {})",
                requested.slot, requested.generation, current_generation
            ),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<DeviceFailure> for RenderError {
    fn from(failure: DeviceFailure) -> Self {
        RenderError::DeviceSubmissionFailure(failure)
    }
}

impl RenderError {
    /// Whether the render loop should stop instead of retrying next frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RenderError::DeviceSubmissionFailure(DeviceFailure::OutOfMemory)
        )
    }

    /// Swapchain states that clear up once the surface is reconfigured.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RenderError::DeviceSubmissionFailure(
                DeviceFailure::SurfaceOutdated | DeviceFailure::Timeout
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outdated_surface_is_transient_not_fatal() {
        let outdated = RenderError::from(DeviceFailure::SurfaceOutdated);
        assert!(outdated.is_transient());
        assert!(!outdated.is_fatal());

        let oom = RenderError::from(DeviceFailure::OutOfMemory);
        assert!(oom.is_fatal());
        assert!(!oom.is_transient());

        assert!(!RenderError::InvalidDimensions { width: 0, height: 0 }.is_transient());
    }
}
