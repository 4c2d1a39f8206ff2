use crate::seed::SeedPattern;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

pub const SETTINGS_FILE_NAME: &str = "rd_settings.json";
pub const SETTINGS_PATH_ENV: &str = "RD_SETTINGS";
pub const DEFAULT_PING_PONG_STEPS: u32 = 60;
const MAX_PING_PONG_STEPS: u32 = 1000;

// ============================================================================
// PARAMETERS
// ============================================================================

/// Gray-Scott scalars forwarded untouched to the simulation shader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub feed: f32,
    pub kill: f32,
    pub diffusion_a: f32,
    pub diffusion_b: f32,
    pub timestep: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            feed: 0.054,
            kill: 0.062,
            diffusion_a: 0.2097,
            diffusion_b: 0.105,
            timestep: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderingStyle {
    #[default]
    Grayscale,
    RedSand,
    PurpleFungus,
    Radioactive,
}

impl RenderingStyle {
    pub const ALL: [RenderingStyle; 4] = [
        RenderingStyle::Grayscale,
        RenderingStyle::RedSand,
        RenderingStyle::PurpleFungus,
        RenderingStyle::Radioactive,
    ];

    /// Value of the `rendering_style` uniform understood by the display shader.
    pub fn shader_id(self) -> u32 {
        self as u32
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.shader_id() as usize + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayParams {
    pub rendering_style: RenderingStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Simulation passes run per displayed frame.
    pub ping_pong_steps: u32,
    pub simulation: SimulationParams,
    pub display: DisplayParams,
    pub seed: SeedPattern,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            canvas_width: 900,
            canvas_height: 900,
            ping_pong_steps: DEFAULT_PING_PONG_STEPS,
            simulation: SimulationParams::default(),
            display: DisplayParams::default(),
            seed: SeedPattern::default(),
        }
    }
}

impl Parameters {
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(SETTINGS_PATH_ENV) {
            return PathBuf::from(path);
        }
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(SETTINGS_FILE_NAME)
    }

    pub fn load_from_disk(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut params: Parameters = serde_json::from_str(&data)?;
        params.sanitize();
        Ok(params)
    }

    /// Loads the settings file if present, falling back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::info!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from_disk(path) {
            Ok(params) => {
                log::info!("Loaded settings from {}", path.display());
                params
            }
            Err(err) => {
                log::warn!(
                    "Failed to read settings from {}: {err:?}; using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn sanitize(&mut self) {
        self.canvas_width = self.canvas_width.max(1);
        self.canvas_height = self.canvas_height.max(1);
        self.ping_pong_steps = self.ping_pong_steps.clamp(1, MAX_PING_PONG_STEPS);
        let sim = &mut self.simulation;
        sim.feed = sim.feed.clamp(0.0, 0.1);
        sim.kill = sim.kill.clamp(0.0, 0.1);
        sim.diffusion_a = sim.diffusion_a.clamp(0.0, 1.0);
        sim.diffusion_b = sim.diffusion_b.clamp(0.0, 1.0);
        sim.timestep = sim.timestep.clamp(0.0, 2.0);
        self.seed.sanitize();
    }
}

// ============================================================================
// APPLICATION CONTEXT
// ============================================================================

/// Shared mutable state owned by the application root.
///
/// Input handlers write to it between frames; the frame driver reads it at
/// the start of every frame.
#[derive(Debug)]
pub struct AppContext {
    pub params: Parameters,
    pub paused: bool,
    pub started_at: Instant,
    pending_resize: Option<(u32, u32)>,
    minimized: bool,
}

impl AppContext {
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            paused: false,
            started_at: Instant::now(),
            pending_resize: None,
            minimized: false,
        }
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Records a resize to be applied before the next frame's iterations.
    /// Later requests replace earlier ones. A zero extent marks the window as
    /// minimized and keeps the current surfaces.
    pub fn request_resize(&mut self, width: u32, height: u32) {
        self.minimized = width == 0 || height == 0;
        if self.minimized {
            self.pending_resize = None;
        } else {
            self.pending_resize = Some((width, height));
        }
    }

    /// True while the window has no drawable area. Nothing refreshes a hidden
    /// surface, so no ticks run until the next non-zero resize.
    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn take_pending_resize(&mut self) -> Option<(u32, u32)> {
        self.pending_resize.take()
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.started_at.elapsed().as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let params: Parameters =
            serde_json::from_str(r#"{ "ping_pong_steps": 8, "simulation": { "feed": 0.03 } }"#)
                .unwrap();
        assert_eq!(params.ping_pong_steps, 8);
        assert_eq!(params.simulation.feed, 0.03);
        assert_eq!(params.simulation.kill, SimulationParams::default().kill);
        assert_eq!(params.canvas_width, 900);
        assert_eq!(params.seed, SeedPattern::default());
    }

    #[test]
    fn seed_and_style_deserialize_from_snake_case() {
        let params: Parameters = serde_json::from_str(
            r#"{ "seed": { "kind": "square", "size": 20.0 }, "display": { "rendering_style": "red_sand" } }"#,
        )
        .unwrap();
        assert_eq!(params.seed, SeedPattern::Square { size: 20.0 });
        assert_eq!(params.display.rendering_style, RenderingStyle::RedSand);
    }

    #[test]
    fn sanitize_enforces_positive_canvas_and_steps() {
        let mut params = Parameters {
            canvas_width: 0,
            canvas_height: 0,
            ping_pong_steps: 0,
            ..Parameters::default()
        };
        params.simulation.feed = 5.0;
        params.sanitize();
        assert_eq!((params.canvas_width, params.canvas_height), (1, 1));
        assert_eq!(params.ping_pong_steps, 1);
        assert_eq!(params.simulation.feed, 0.1);
    }

    #[test]
    fn load_or_default_survives_malformed_file() {
        let path = std::env::temp_dir().join(format!("rd_settings_bad_{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();
        let params = Parameters::load_or_default(&path);
        assert_eq!(params, Parameters::default());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_from_disk_sanitizes() {
        let path = std::env::temp_dir().join(format!("rd_settings_ok_{}.json", std::process::id()));
        fs::write(&path, r#"{ "ping_pong_steps": 100000 }"#).unwrap();
        let params = Parameters::load_from_disk(&path).unwrap();
        assert_eq!(params.ping_pong_steps, MAX_PING_PONG_STEPS);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rendering_style_cycles() {
        let mut style = RenderingStyle::Grayscale;
        for _ in 0..RenderingStyle::ALL.len() {
            style = style.next();
        }
        assert_eq!(style, RenderingStyle::Grayscale);
        assert_eq!(RenderingStyle::Radioactive.shader_id(), 3);
    }

    #[test]
    fn resize_requests_coalesce() {
        let mut ctx = AppContext::new(Parameters::default());
        ctx.request_resize(100, 100);
        ctx.request_resize(400, 300);
        assert_eq!(ctx.take_pending_resize(), Some((400, 300)));
        assert_eq!(ctx.take_pending_resize(), None);
        assert!(ctx.toggle_pause());
        assert!(!ctx.toggle_pause());
    }

    #[test]
    fn zero_extent_marks_minimized_until_restored() {
        let mut ctx = AppContext::new(Parameters::default());
        ctx.request_resize(640, 480);
        ctx.request_resize(0, 0);
        assert!(ctx.is_minimized());
        assert_eq!(ctx.take_pending_resize(), None);

        ctx.request_resize(1024, 0);
        assert!(ctx.is_minimized());

        ctx.request_resize(1024, 768);
        assert!(!ctx.is_minimized());
        assert_eq!(ctx.take_pending_resize(), Some((1024, 768)));
    }
}
