use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Aggregate progress counters shared by every worker in a batch.
///
/// Totals are fixed at construction. The completed counters only grow, and
/// both are bumped inside one critical section, so no reader ever observes a
/// half-applied update. One instance lives for exactly one batch.
#[derive(Debug)]
pub struct ProgressTracker {
    total_files: u64,
    total_bytes: u64,
    started: Instant,
    completed: Mutex<Completed>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Completed {
    files: u64,
    bytes: u64,
}

/// Point-in-time view of a tracker, as sampled by the reporter.
#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot {
    pub completed_files: u64,
    pub total_files: u64,
    pub completed_bytes: u64,
    pub total_bytes: u64,
    /// Fraction of the byte total completed, in [0.0, 1.0].
    pub fraction: f64,
    pub bytes_per_sec: f64,
    pub elapsed: Duration,
    /// Estimated time remaining; `None` while throughput is still zero.
    pub eta: Option<Duration>,
}

impl ProgressTracker {
    pub fn new(total_files: u64, total_bytes: u64) -> Self {
        Self {
            total_files,
            total_bytes,
            started: Instant::now(),
            completed: Mutex::new(Completed::default()),
        }
    }

    /// Record one finished item of `bytes` bytes.
    pub fn update(&self, bytes: u64) {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        completed.files += 1;
        completed.bytes += bytes;
    }

    pub fn completed_files(&self) -> u64 {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .files
    }

    /// Whether every file in the batch has been credited.
    ///
    /// Failed items never call `update`, so a batch with failures ends via
    /// the driver cancelling the reporter, not via this condition.
    pub fn is_complete(&self) -> bool {
        self.completed_files() >= self.total_files
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let completed = *self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let elapsed = self.started.elapsed();

        let fraction = if self.total_bytes == 0 {
            0.0
        } else {
            completed.bytes as f64 / self.total_bytes as f64
        };
        let secs = elapsed.as_secs_f64();
        let bytes_per_sec = if secs > 0.0 {
            completed.bytes as f64 / secs
        } else {
            0.0
        };
        let eta = if bytes_per_sec > 0.0 {
            let remaining = self.total_bytes.saturating_sub(completed.bytes);
            Some(Duration::from_secs_f64(remaining as f64 / bytes_per_sec))
        } else {
            None
        };

        ProgressSnapshot {
            completed_files: completed.files,
            total_files: self.total_files,
            completed_bytes: completed.bytes,
            total_bytes: self.total_bytes,
            fraction,
            bytes_per_sec,
            elapsed,
            eta,
        }
    }
}

/// Bucket a duration the way the status line shows it: plain seconds under a
/// minute, minutes+seconds under an hour, hours+minutes beyond that.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Human-readable byte count: `0B`, `1.5KB`, `4.2GB`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1}{unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1}TB")
}

/// Renders the live status line for a running batch.
///
/// Samples the shared tracker on a fixed cadence and redraws one
/// carriage-returned line; holds no state of its own beyond that cadence.
pub struct ProgressReporter {
    tracker: Arc<ProgressTracker>,
    interval: Duration,
    label: String,
}

impl ProgressReporter {
    pub fn new(tracker: Arc<ProgressTracker>, interval: Duration, label: impl Into<String>) -> Self {
        Self {
            tracker,
            interval,
            label: label.into(),
        }
    }

    /// Poll and redraw until the batch is fully credited or the driver
    /// cancels, then draw a final line and terminate it with a newline.
    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {}
            }
            self.draw();
            if self.tracker.is_complete() {
                break;
            }
        }
        self.draw();
        println!();
    }

    fn draw(&self) {
        let line = render_status_line(&self.label, &self.tracker.snapshot());
        let mut stdout = io::stdout();
        let _ = write!(stdout, "\r\x1b[2K{line}");
        let _ = stdout.flush();
    }
}

const BAR_WIDTH: usize = 50;

fn render_status_line(label: &str, snap: &ProgressSnapshot) -> String {
    let filled = ((BAR_WIDTH as f64 * snap.fraction) as usize).min(BAR_WIDTH);
    let eta = snap
        .eta
        .map(format_duration)
        .unwrap_or_else(|| "--".to_string());

    format!(
        "{} [{}{}] {:.1}% | {}/{} files | {}/{} | {}/s | elapsed {} | eta {}",
        label,
        "=".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        snap.fraction * 100.0,
        snap.completed_files,
        snap.total_files,
        format_size(snap.completed_bytes),
        format_size(snap.total_bytes),
        format_size(snap.bytes_per_sec as u64),
        format_duration(snap.elapsed),
        eta,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_updates_are_never_lost() {
        let tracker = Arc::new(ProgressTracker::new(80, 80 * 25));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        tracker.update(25);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread panicked");
        }

        let snap = tracker.snapshot();
        assert_eq!(snap.completed_files, 80);
        assert_eq!(snap.completed_bytes, 80 * 25);
        assert!(tracker.is_complete());
    }

    #[test]
    fn fraction_is_monotonic() {
        let tracker = ProgressTracker::new(3, 500);
        let mut last = tracker.snapshot().fraction;
        for bytes in [100, 250, 150] {
            tracker.update(bytes);
            let fraction = tracker.snapshot().fraction;
            assert!(fraction >= last);
            last = fraction;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn zero_byte_total_never_divides_by_zero() {
        let tracker = ProgressTracker::new(2, 0);
        tracker.update(0);
        let snap = tracker.snapshot();
        assert_eq!(snap.fraction, 0.0);
        assert!(!tracker.is_complete());
    }

    #[test]
    fn eta_is_unknown_until_bytes_flow() {
        let tracker = ProgressTracker::new(1, 1000);
        let snap = tracker.snapshot();
        assert_eq!(snap.bytes_per_sec, 0.0);
        assert!(snap.eta.is_none());

        tracker.update(500);
        assert!(tracker.snapshot().eta.is_some());
    }

    #[test]
    fn durations_bucket_at_minute_and_hour() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(75)), "1m15s");
        assert_eq!(format_duration(Duration::from_secs(3700)), "1h1m");
    }

    #[test]
    fn sizes_format_like_the_status_line() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0MB");
    }

    #[test]
    fn status_line_reports_every_contract_field() {
        let tracker = ProgressTracker::new(4, 1000);
        tracker.update(250);
        let line = render_status_line("download", &tracker.snapshot());

        assert!(line.starts_with("download ["));
        assert!(line.contains("25.0%"));
        assert!(line.contains("1/4 files"));
        assert!(line.contains("250.0B/1000.0B"));
        assert!(line.contains("elapsed"));
        assert!(line.contains("eta"));
    }
}
