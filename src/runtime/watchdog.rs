//! Stall watchdog for the capture plumbing
//!
//! Every sender/receiver that can block stores the start time of its current
//! operation in an atomic. A monitoring thread scans these timestamps and
//! warns once per operation that has been blocked longer than the threshold.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Operations blocked longer than this are reported
const BLOCKED_THRESHOLD_MS: u64 = 5000;

/// Milliseconds since UNIX_EPOCH, never 0 in practice (0 marks "idle")
#[inline(always)]
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

struct EndpointState {
    /// Start of the current operation, or 0 if idle
    last_op_start: AtomicU64,
    has_warned: AtomicBool,
    component: String,
    endpoint: String,
    operation: &'static str,
}

/// Handle held by a sender/receiver to report its blocking operations
#[derive(Clone)]
pub struct WatchdogHandle {
    state: Arc<EndpointState>,
}

impl WatchdogHandle {
    #[inline(always)]
    pub fn start_operation(&self) {
        self.state.last_op_start.store(now_millis(), Ordering::Relaxed);
        self.state.has_warned.store(false, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn finish_operation(&self) {
        if self.state.has_warned.swap(false, Ordering::Relaxed) {
            info!(
                "UNBLOCKED: [{}] {} on '{}'",
                self.state.component, self.state.operation, self.state.endpoint
            );
        }
        self.state.last_op_start.store(0, Ordering::Relaxed);
    }
}

/// Shared watchdog registry
#[derive(Clone)]
pub struct Watchdog {
    endpoints: Arc<Mutex<Vec<Weak<EndpointState>>>>,
    enabled: Arc<AtomicBool>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self {
            endpoints: Arc::new(Mutex::new(Vec::new())),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Register an endpoint (e.g. `"decoder"`, `"recv"`, `"frames"`) for monitoring
    pub fn register(&self, component: &str, operation: &'static str, endpoint: &str) -> WatchdogHandle {
        let state = Arc::new(EndpointState {
            last_op_start: AtomicU64::new(0),
            has_warned: AtomicBool::new(false),
            component: component.to_string(),
            endpoint: endpoint.to_string(),
            operation,
        });

        if let Ok(mut endpoints) = self.endpoints.lock() {
            endpoints.push(Arc::downgrade(&state));
        }

        WatchdogHandle { state }
    }

    /// Warn about operations blocked past the threshold. Returns how many are blocked.
    pub fn check_for_blocked(&self) -> usize {
        let now = now_millis();
        let mut blocked = 0;

        let Ok(mut endpoints) = self.endpoints.lock() else {
            return 0;
        };

        endpoints.retain(|weak| {
            let Some(state) = weak.upgrade() else {
                return false;
            };
            let start = state.last_op_start.load(Ordering::Relaxed);
            if start > 0 && now.saturating_sub(start) > BLOCKED_THRESHOLD_MS {
                blocked += 1;
                if !state.has_warned.swap(true, Ordering::Relaxed) {
                    warn!(
                        "BLOCKED: [{}] {} on '{}' for {:.1}s",
                        state.component,
                        state.operation,
                        state.endpoint,
                        now.saturating_sub(start) as f64 / 1000.0
                    );
                }
            }
            true
        });

        blocked
    }

    /// Start the monitoring thread; it exits after [`Watchdog::stop`]
    pub fn start_monitoring_thread(&self) -> JoinHandle<()> {
        self.enabled.store(true, Ordering::Relaxed);
        let watchdog = self.clone();
        std::thread::spawn(move || {
            while watchdog.enabled.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(250));
                watchdog.check_for_blocked();
            }
        })
    }

    pub fn stop(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard marking one blocking operation
pub struct OperationGuard<'a> {
    handle: &'a WatchdogHandle,
}

impl<'a> OperationGuard<'a> {
    #[inline(always)]
    pub fn new(handle: &'a WatchdogHandle) -> Self {
        handle.start_operation();
        Self { handle }
    }
}

impl Drop for OperationGuard<'_> {
    #[inline(always)]
    fn drop(&mut self) {
        self.handle.finish_operation();
    }
}
