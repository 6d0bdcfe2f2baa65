#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
}

/// 記錄每個階段耗時；啟用時另外記錄行程的 CPU / 記憶體
pub struct PhaseMonitor {
    start_time: Instant,
    phase_start: Mutex<Instant>,
    phases: Mutex<Vec<(String, Duration)>>,
    #[cfg(feature = "cli")]
    system: Option<Mutex<(System, Pid, u64)>>,
}

impl PhaseMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();
        let monitor = Self {
            start_time: now,
            phase_start: Mutex::new(now),
            phases: Mutex::new(Vec::new()),
            #[cfg(feature = "cli")]
            system: if enabled { Self::attach() } else { None },
        };

        if enabled && !monitor.is_enabled() {
            tracing::warn!("⚠️ System monitoring requested but unavailable in this build");
        }
        monitor
    }

    #[cfg(feature = "cli")]
    fn attach() -> Option<Mutex<(System, Pid, u64)>> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        Some(Mutex::new((system, pid, 0)))
    }

    #[cfg(feature = "cli")]
    pub fn get_stats(&self) -> Option<SystemStats> {
        let mut guard = self.system.as_ref()?.lock().ok()?;
        let (system, pid, peak) = &mut *guard;
        system.refresh_processes(ProcessesToUpdate::Some(&[*pid]), true);

        let process = system.process(*pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        Some(SystemStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
        })
    }

    /// Closes the current phase and logs its duration.
    pub fn finish_phase(&self, phase: &str) -> Duration {
        let elapsed = match self.phase_start.lock() {
            Ok(mut start) => {
                let elapsed = start.elapsed();
                *start = Instant::now();
                elapsed
            }
            Err(_) => Duration::ZERO,
        };
        if let Ok(mut phases) = self.phases.lock() {
            phases.push((phase.to_string(), elapsed));
        }

        #[cfg(feature = "cli")]
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 {} - {:?}, CPU: {:.1}%, Memory: {}MB, Peak: {}MB",
                phase,
                elapsed,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb
            );
            return elapsed;
        }

        tracing::debug!("⏱️ {} took {:?}", phase, elapsed);
        elapsed
    }

    pub fn phases(&self) -> Vec<(String, Duration)> {
        self.phases.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn log_final_stats(&self) {
        let total = self.start_time.elapsed();
        let slowest = self
            .phases()
            .into_iter()
            .max_by_key(|(_, elapsed)| *elapsed);
        match slowest {
            Some((phase, elapsed)) => tracing::info!(
                "📊 Final Stats - Total Time: {:?}, slowest phase: {} ({:?})",
                total,
                phase,
                elapsed
            ),
            None => tracing::info!("📊 Final Stats - Total Time: {:?}", total),
        }
    }

    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "cli")]
        {
            self.system.is_some()
        }
        #[cfg(not(feature = "cli"))]
        {
            false
        }
    }
}

impl Default for PhaseMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_are_recorded_in_order() {
        let monitor = PhaseMonitor::new(false);
        monitor.finish_phase("extract");
        monitor.finish_phase("transform");

        let names: Vec<String> = monitor.phases().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["extract", "transform"]);
        assert!(!monitor.is_enabled());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_enabled_monitor_tracks_the_process() {
        let monitor = PhaseMonitor::new(true);
        assert!(monitor.is_enabled());
    }
}
