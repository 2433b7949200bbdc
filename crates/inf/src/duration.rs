use std::time::{Duration, Instant};

/// Measures the wall clock time of an operation
pub struct Recorder {
    start: Instant,
}

impl Recorder {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    pub fn elapsed_time(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_time_string(&self) -> String {
        format_duration(self.elapsed_time())
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let elapsed = self.start.elapsed();
        write!(f, "{}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis())
    }
}

/// Human readable duration: minutes and seconds above one minute, seconds with millisecond precision below
pub fn format_duration(duration: Duration) -> String {
    let elapsed = chrono::TimeDelta::from_std(duration).unwrap_or_default();

    if elapsed.num_seconds() > 60 {
        let minutes = elapsed.num_minutes();
        let seconds = elapsed.num_seconds() - (minutes * 60);
        format!("{minutes} minutes {seconds} seconds")
    } else {
        let seconds = elapsed.num_seconds();
        let milliseconds = elapsed.num_milliseconds() - (seconds * 1000);
        format!("{seconds}.{milliseconds:03} seconds")
    }
}
