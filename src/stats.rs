use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Receives one notification per frame tick, paused or not.
pub trait StatsSink {
    fn record_frame(&mut self, paused: bool);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsReport {
    pub fps: f32,
    pub iterations_per_second: f32,
    pub paused: bool,
}

impl std::fmt::Display for StatsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1} FPS, {:.0} iterations/s",
            self.fps, self.iterations_per_second
        )?;
        if self.paused {
            write!(f, " (paused)")?;
        }
        Ok(())
    }
}

/// Frame and simulation-iteration counter, summarised once per second.
pub struct FrameStats {
    iterations_per_frame: u32,
    frames: u32,
    iterations: u64,
    total_frames: u64,
    window_start: Instant,
    latest: Option<StatsReport>,
}

impl FrameStats {
    pub fn new(iterations_per_frame: u32) -> Self {
        Self::starting_at(iterations_per_frame, Instant::now())
    }

    fn starting_at(iterations_per_frame: u32, start: Instant) -> Self {
        Self {
            iterations_per_frame,
            frames: 0,
            iterations: 0,
            total_frames: 0,
            window_start: start,
            latest: None,
        }
    }

    pub fn record_frame_at(&mut self, paused: bool, now: Instant) -> Option<StatsReport> {
        self.frames += 1;
        self.total_frames += 1;
        if !paused {
            self.iterations += u64::from(self.iterations_per_frame);
        }

        let elapsed = now.duration_since(self.window_start);
        if elapsed < REPORT_INTERVAL {
            return None;
        }
        let secs = elapsed.as_secs_f32();
        let report = StatsReport {
            fps: self.frames as f32 / secs,
            iterations_per_second: self.iterations as f32 / secs,
            paused,
        };
        self.frames = 0;
        self.iterations = 0;
        self.window_start = now;
        Some(report)
    }

    /// Most recent report not yet consumed.
    pub fn take_report(&mut self) -> Option<StatsReport> {
        self.latest.take()
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

impl StatsSink for FrameStats {
    fn record_frame(&mut self, paused: bool) {
        if let Some(report) = self.record_frame_at(paused, Instant::now()) {
            self.latest = Some(report);
        }
    }
}
