use std::time::{Duration, Instant};

/// Decides when the window loop should request the next redraw.
///
/// Without a cap every wake-up renders and presentation blocks on vsync.
/// With a cap, frames are spaced at least `1 / fps` apart.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Option<Duration>,
    last_frame: Option<Instant>,
}

impl FramePacer {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            last_frame: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    /// Earliest instant the next frame may start, when capped.
    pub fn next_deadline(&self) -> Option<Instant> {
        Some(self.last_frame? + self.interval?)
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_frame = None;
    }
}

/// Rolling frames-per-second measurement reported once per window.
#[derive(Debug, Clone)]
pub struct FrameStats {
    window: Duration,
    started: Instant,
    frames: u32,
}

impl FrameStats {
    pub fn new(now: Instant) -> Self {
        Self {
            window: Duration::from_secs(1),
            started: now,
            frames: 0,
        }
    }

    /// Counts one frame; returns the new rate whenever a window completes.
    pub fn record(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.window {
            return None;
        }
        let fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.started = now;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncapped_pacer_is_always_ready() {
        let mut pacer = FramePacer::new(None);
        let now = Instant::now();
        assert!(pacer.ready_for_frame(now));
        pacer.mark_rendered(now);
        assert!(pacer.ready_for_frame(now));
        assert_eq!(pacer.next_deadline(), None);
    }

    #[test]
    fn capped_pacer_waits_for_interval() {
        let mut pacer = FramePacer::new(Some(8.0));
        let start = Instant::now();
        assert!(pacer.ready_for_frame(start));
        pacer.mark_rendered(start);
        assert!(!pacer.ready_for_frame(start + Duration::from_millis(50)));
        assert!(pacer.ready_for_frame(start + Duration::from_millis(125)));
        assert_eq!(pacer.next_deadline(), Some(start + Duration::from_millis(125)));
        pacer.reset();
        assert!(pacer.ready_for_frame(start));
    }

    #[test]
    fn invalid_caps_are_ignored() {
        for fps in [0.0, -5.0, f32::NAN, f32::INFINITY] {
            assert_eq!(FramePacer::new(Some(fps)).interval(), None);
        }
    }

    #[test]
    fn stats_report_once_per_window() {
        let start = Instant::now();
        let mut stats = FrameStats::new(start);
        for i in 1..30 {
            assert_eq!(stats.record(start + Duration::from_millis(i * 10)), None);
        }
        let fps = stats.record(start + Duration::from_secs(1)).unwrap();
        assert!((fps - 30.0).abs() < 1e-3);
        assert_eq!(stats.record(start + Duration::from_millis(1500)), None);
    }
}
