//! Progress logging for multi-file extractions.

use std::time::Instant;

use tracing::info;

/// Logs progress through a fixed number of archive files.
///
/// A line is emitted at `info` level each time another
/// `report_interval_pct` percent of the files has been processed.
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    /// Wall clock start
    start_instant: Instant,
    /// Number of files to process
    total: usize,
    /// Files processed so far
    done: usize,
    /// Last reported percentage
    last_reported_pct: u32,
    /// Report interval in percentage points, 0 disables reporting
    report_interval_pct: u32,
}

impl ProgressReporter {
    pub fn new(total: usize, report_interval_pct: u32) -> Self {
        Self {
            start_instant: Instant::now(),
            total,
            done: 0,
            last_reported_pct: 0,
            report_interval_pct,
        }
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.done as f64 * 100.0 / self.total as f64
        }
    }

    /// Record one finished file and log if a threshold was crossed.
    ///
    /// Returns true if progress was reported.
    pub fn advance(&mut self, locator: &str) -> bool {
        self.done = (self.done + 1).min(self.total);
        if self.report_interval_pct == 0 {
            return false;
        }

        let pct = self.percent() as u32;
        if pct >= self.last_reported_pct + self.report_interval_pct {
            self.report(locator);
            self.last_reported_pct = (pct / self.report_interval_pct) * self.report_interval_pct;
            true
        } else {
            false
        }
    }

    fn report(&self, locator: &str) {
        let elapsed = self.start_instant.elapsed().as_secs_f64();
        let pct = self.percent();
        let eta = if pct > 0.0 {
            format_duration(elapsed * (100.0 - pct) / pct)
        } else {
            "calculating...".to_string()
        };
        info!(
            "[{:>5.1}%] {}/{} files | elapsed={} | ETA={} | {}",
            pct,
            self.done,
            self.total,
            format_duration(elapsed),
            eta,
            locator
        );
    }
}

/// Format a duration in seconds as human-readable string.
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor();
        format!("{:.0}m{:.0}s", mins, (secs - mins * 60.0).floor())
    } else {
        let hours = (secs / 3600.0).floor();
        let mins = ((secs - hours * 3600.0) / 60.0).floor();
        format!("{:.0}h{:.0}m", hours, mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_at_interval() {
        let mut progress = ProgressReporter::new(10, 25);
        let reported: Vec<bool> = (0..10).map(|n| progress.advance(&format!("f{n}"))).collect();
        // 30%, 50%, 80%, 100%
        assert_eq!(
            reported,
            [false, false, true, false, true, false, false, true, false, true]
        );
        assert_eq!(progress.done(), 10);
    }

    #[test]
    fn test_disabled_reporting() {
        let mut progress = ProgressReporter::new(2, 0);
        assert!(!progress.advance("a"));
        assert!(!progress.advance("b"));
        assert_eq!(progress.percent(), 100.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30.0s");
        assert_eq!(format_duration(90.0), "1m30s");
        assert_eq!(format_duration(3700.0), "1h1m");
    }
}
