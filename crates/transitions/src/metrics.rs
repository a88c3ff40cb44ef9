use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

/// Samples kept for FPS smoothing and the final metrics.
pub const FRAME_WINDOW: usize = 60;

/// Frames slower than this count as drops.
pub const FRAME_DROP_FPS: f32 = 30.0;

/// Summary of one completed run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionMetrics {
    #[serde(with = "presetconfig::duration")]
    pub total_time: Duration,
    pub average_fps: f32,
    pub min_fps: f32,
    pub max_fps: f32,
    /// Highest renderer estimate seen during the run.
    pub peak_memory_usage: u64,
    pub frame_drops: u32,
    #[serde(with = "presetconfig::duration")]
    pub average_cpu_time: Duration,
    /// Frame time not accounted for by CPU work. Zero when nothing was drawn
    /// on a GPU.
    #[serde(with = "presetconfig::duration")]
    pub estimated_gpu_time: Duration,
    pub frames: u64,
}

/// Rolling window of frame intervals and CPU times, capped at
/// [`FRAME_WINDOW`] with the oldest sample dropped first.
#[derive(Debug, Default)]
pub(crate) struct FrameWindow {
    intervals: VecDeque<Duration>,
    cpu: VecDeque<Duration>,
}

fn push_capped(samples: &mut VecDeque<Duration>, value: Duration) {
    if samples.len() == FRAME_WINDOW {
        samples.pop_front();
    }
    samples.push_back(value);
}

fn mean(samples: &VecDeque<Duration>) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    let total: Duration = samples.iter().sum();
    Some(total / samples.len() as u32)
}

fn fps_of(interval: Duration) -> f32 {
    let secs = interval.as_secs_f32();
    if secs > 0.0 {
        1.0 / secs
    } else {
        0.0
    }
}

impl FrameWindow {
    pub fn clear(&mut self) {
        self.intervals.clear();
        self.cpu.clear();
    }

    pub fn record_interval(&mut self, interval: Duration) {
        if !interval.is_zero() {
            push_capped(&mut self.intervals, interval);
        }
    }

    pub fn record_cpu(&mut self, cpu: Duration) {
        push_capped(&mut self.cpu, cpu);
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// FPS from the window's mean interval.
    pub fn fps(&self) -> f32 {
        mean(&self.intervals).map_or(0.0, fps_of)
    }

    pub fn summarize(
        &self,
        total_time: Duration,
        frames: u64,
        peak_memory_usage: u64,
        gpu_drawn: bool,
    ) -> TransitionMetrics {
        let rates: Vec<f32> = self.intervals.iter().copied().map(fps_of).collect();
        let min_fps = rates.iter().copied().reduce(f32::min).unwrap_or(0.0);
        let max_fps = rates.iter().copied().reduce(f32::max).unwrap_or(0.0);
        let frame_drops = rates.iter().filter(|fps| **fps < FRAME_DROP_FPS).count() as u32;

        let average_cpu_time = mean(&self.cpu).unwrap_or_default();
        let estimated_gpu_time = match (gpu_drawn, mean(&self.intervals)) {
            (true, Some(frame)) => frame.saturating_sub(average_cpu_time),
            _ => Duration::ZERO,
        };

        TransitionMetrics {
            total_time,
            average_fps: self.fps(),
            min_fps,
            max_fps,
            peak_memory_usage,
            frame_drops,
            average_cpu_time,
            estimated_gpu_time,
            frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_the_latest_samples() {
        let mut window = FrameWindow::default();
        for _ in 0..FRAME_WINDOW {
            window.record_interval(Duration::from_millis(100));
        }
        for _ in 0..FRAME_WINDOW {
            window.record_interval(Duration::from_millis(10));
        }
        assert_eq!(window.len(), FRAME_WINDOW);
        assert!((window.fps() - 100.0).abs() < 0.5);
    }

    #[test]
    fn zero_intervals_are_ignored() {
        let mut window = FrameWindow::default();
        window.record_interval(Duration::ZERO);
        assert_eq!(window.len(), 0);
        assert_eq!(window.fps(), 0.0);
    }

    #[test]
    fn summary_counts_slow_frames() {
        let mut window = FrameWindow::default();
        for millis in [16, 16, 50, 16, 40] {
            window.record_interval(Duration::from_millis(millis));
            window.record_cpu(Duration::from_millis(4));
        }
        let metrics = window.summarize(Duration::from_millis(138), 5, 42, true);
        assert_eq!(metrics.frame_drops, 2);
        assert!((metrics.max_fps - 62.5).abs() < 0.01);
        assert!((metrics.min_fps - 20.0).abs() < 0.01);
        assert_eq!(metrics.average_cpu_time, Duration::from_millis(4));
        assert!(metrics.estimated_gpu_time > Duration::ZERO);
        assert_eq!(metrics.peak_memory_usage, 42);
    }

    #[test]
    fn gpu_time_is_zero_without_drawing() {
        let mut window = FrameWindow::default();
        window.record_interval(Duration::from_millis(16));
        window.record_cpu(Duration::from_millis(1));
        let metrics = window.summarize(Duration::from_millis(16), 1, 0, false);
        assert_eq!(metrics.estimated_gpu_time, Duration::ZERO);
    }
}
