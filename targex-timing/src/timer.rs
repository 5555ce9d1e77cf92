use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Trait for high-precision timers
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn frame_count(&self) -> usize;
    fn frame_stats(&self) -> FrameStats;
}

/// Summary of the frame intervals recorded so far.
#[derive(Debug, Clone)]
pub struct FrameStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
    /// Frames that overran 1.5x the average interval.
    pub dropped_frames: usize,
}

fn stats_from(times_ns: &[f64]) -> FrameStats {
    if times_ns.is_empty() {
        return FrameStats {
            average_frame_time_ns: 0.0,
            jitter_ns: 0.0,
            min_frame_time_ns: 0.0,
            max_frame_time_ns: 0.0,
            effective_fps: 0.0,
            dropped_frames: 0,
        };
    }
    let sum: f64 = times_ns.iter().sum();
    let avg = sum / times_ns.len() as f64;
    let var = times_ns.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times_ns.len() as f64;
    let min = times_ns.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = times_ns.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let dropped = times_ns.iter().filter(|&&t| t > 1.5 * avg).count();
    FrameStats {
        average_frame_time_ns: avg,
        jitter_ns: var.sqrt(),
        min_frame_time_ns: min,
        max_frame_time_ns: max,
        effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        dropped_frames: dropped,
    }
}

/// Wall-clock timer with a platform high-resolution sleep.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
    frame_times: Vec<Duration>,
    frame_count: usize,
    max_samples: usize,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.remove(0);
        }
        self.frame_times.push(d);
        self.frame_count += 1;
    }
    fn frame_count(&self) -> usize {
        self.frame_count
    }
    fn frame_stats(&self) -> FrameStats {
        let times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        stats_from(&times)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            frame_count: 0,
            max_samples: 1000,
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "windows")]
        self.windows_sleep(duration);
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(target_os = "macos")]
        self.macos_sleep(duration);
        #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "windows")]
    fn windows_sleep(&self, duration: Duration) {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{
            CreateWaitableTimerW, SetWaitableTimer, WaitForSingleObject, INFINITE,
        };

        unsafe {
            let Ok(timer) = CreateWaitableTimerW(None, true, None) else {
                std::thread::sleep(duration);
                return;
            };

            // Negative due time = relative interval, in 100 ns units.
            let due_time = -(duration.as_nanos() as i64 / 100);
            if SetWaitableTimer(timer, &due_time, 0, None, None, false).is_ok() {
                WaitForSingleObject(timer, INFINITE);
            }
            let _ = CloseHandle(timer);
        }
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    #[cfg(target_os = "macos")]
    fn macos_sleep(&self, duration: Duration) {
        use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};
        use std::thread;

        if duration.as_nanos() < 100_000 {
            unsafe {
                let start = mach_absolute_time();
                let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
                mach_timebase_info(&mut timebase);

                let target_ticks =
                    duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;

                while mach_absolute_time() - start < target_ticks {
                    std::hint::spin_loop();
                }
            }
        } else {
            thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic clock for simulation and tests.
///
/// Time only moves when a holder advances it; `sleep` advances it by the
/// requested duration. Clones share state, so a simulated frontend can drive
/// the same clock the runner reads.
#[derive(Debug, Clone)]
pub struct VirtualTimer {
    state: Arc<Mutex<VirtualState>>,
}

#[derive(Debug)]
struct VirtualState {
    now_ns: u64,
    frame_times: Vec<Duration>,
    frame_count: usize,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(VirtualState {
                now_ns: 0,
                frame_times: Vec::new(),
                frame_count: 0,
            })),
        }
    }

    pub fn advance(&self, d: Duration) {
        self.state.lock().unwrap().now_ns += d.as_nanos() as u64;
    }
}

impl Default for VirtualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for VirtualTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.state.lock().unwrap().now_ns
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
    fn record_frame(&mut self, d: Duration) {
        let mut state = self.state.lock().unwrap();
        state.frame_times.push(d);
        state.frame_count += 1;
    }
    fn frame_count(&self) -> usize {
        self.state.lock().unwrap().frame_count
    }
    fn frame_stats(&self) -> FrameStats {
        let state = self.state.lock().unwrap();
        let times: Vec<f64> = state
            .frame_times
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        stats_from(&times)
    }
}
