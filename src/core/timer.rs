//! 帧计时
//!
//! FrameClock 累计总的更新时间（驱动模型动画），并每秒统计一次帧率。

use std::time::{Duration, Instant};

/// 帧计时器
#[derive(Debug)]
pub struct FrameClock {
    last_tick: Instant,
    total: Duration,
    window_elapsed: Duration,
    window_frames: u32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            total: Duration::ZERO,
            window_elapsed: Duration::ZERO,
            window_frames: 0,
        }
    }

    /// 以当前时间推进一帧
    ///
    /// 满一秒时返回这一秒内的平均帧率。
    pub fn tick(&mut self) -> Option<f64> {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.advance(delta)
    }

    /// 推进指定的时间
    pub fn advance(&mut self, delta: Duration) -> Option<f64> {
        self.total += delta;
        self.window_elapsed += delta;
        self.window_frames += 1;

        if self.window_elapsed >= Duration::from_secs(1) {
            let fps = self.window_frames as f64 / self.window_elapsed.as_secs_f64();
            self.window_frames = 0;
            self.window_elapsed = Duration::ZERO;
            Some(fps)
        } else {
            None
        }
    }

    /// 累计的更新时间（秒）
    pub fn total_seconds(&self) -> f64 {
        self.total.as_secs_f64()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
