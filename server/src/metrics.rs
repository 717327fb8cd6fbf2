//! Request metrics in the Prometheus text exposition format.
//!
//! Counters and histograms are keyed by `(method, route, status_code)` and
//! backed by `DashMap` + atomics, so concurrent requests never lose updates.
//! Durations are accumulated in microseconds and rendered as seconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const ACTIVE_CONNECTIONS: &str = "active_connections";
pub const PROCESS_START_TIME: &str = "process_start_time_seconds";

/// Histogram upper bounds in seconds, paired with the bound in microseconds.
const BUCKETS: [(&str, u64); 5] = [
    ("0.1", 100_000),
    ("0.5", 500_000),
    ("1", 1_000_000),
    ("2", 2_000_000),
    ("5", 5_000_000),
];

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RequestLabels {
    method: String,
    route: String,
    status_code: u16,
}

impl RequestLabels {
    fn render(&self) -> String {
        format!(
            "method=\"{}\",route=\"{}\",status_code=\"{}\"",
            escape_label(&self.method),
            escape_label(&self.route),
            self.status_code
        )
    }
}

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum_micros: AtomicU64,
    buckets: [AtomicU64; BUCKETS.len()],
}

impl AtomicHistogram {
    fn observe(&self, micros: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);

        // Cumulative: every bucket at or above the value.
        for (i, &(_, bound)) in BUCKETS.iter().enumerate() {
            if micros <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[derive(Default)]
struct Registry {
    requests_total: DashMap<RequestLabels, AtomicU64>,
    request_duration: DashMap<RequestLabels, AtomicHistogram>,
    active: AtomicI64,
}

/// Process-wide request metrics. Cloning shares the same registry; separate
/// `init()` calls give isolated collectors.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    started: Instant,
    started_unix: f64,
}

impl Metrics {
    pub fn init() -> Self {
        let started_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self {
            registry: Arc::new(Registry::default()),
            started: Instant::now(),
            started_unix,
        }
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Unix time at which the collector was created, in seconds.
    pub fn start_time_seconds(&self) -> f64 {
        self.started_unix
    }

    pub fn observe_request(&self, method: &str, route: &str, status_code: u16, duration_seconds: f64) {
        let labels = RequestLabels {
            method: method.to_string(),
            route: route.to_string(),
            status_code,
        };
        // Negative and NaN durations saturate to zero.
        let micros = (duration_seconds * 1_000_000.0).round() as u64;

        self.registry
            .request_duration
            .entry(labels.clone())
            .or_default()
            .observe(micros);
        self.registry
            .requests_total
            .entry(labels)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_active(&self) {
        self.registry.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_active(&self) {
        self.registry.active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active_requests(&self) -> i64 {
        self.registry.active.load(Ordering::Relaxed)
    }

    pub fn request_count(&self, method: &str, route: &str, status_code: u16) -> u64 {
        let labels = RequestLabels {
            method: method.to_string(),
            route: route.to_string(),
            status_code,
        };
        self.registry
            .requests_total
            .get(&labels)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Counts the request as in flight until the returned timer is dropped.
    pub fn start_request(&self) -> RequestTimer {
        self.inc_active();
        RequestTimer {
            metrics: self.clone(),
            started: Instant::now(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# HELP {} Total number of HTTP requests", REQUESTS_TOTAL);
        let _ = writeln!(out, "# TYPE {} counter", REQUESTS_TOTAL);
        for entry in self.registry.requests_total.iter() {
            let _ = writeln!(
                out,
                "{}{{{}}} {}",
                REQUESTS_TOTAL,
                entry.key().render(),
                entry.value().load(Ordering::Relaxed)
            );
        }

        let _ = writeln!(out, "# HELP {} Duration of HTTP requests in seconds", REQUEST_DURATION);
        let _ = writeln!(out, "# TYPE {} histogram", REQUEST_DURATION);
        for entry in self.registry.request_duration.iter() {
            let labels = entry.key().render();
            let hist = entry.value();
            for (i, &(le, _)) in BUCKETS.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{}_bucket{{{},le=\"{}\"}} {}",
                    REQUEST_DURATION,
                    labels,
                    le,
                    hist.buckets[i].load(Ordering::Relaxed)
                );
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{},le=\"+Inf\"}} {}", REQUEST_DURATION, labels, count);
            let sum = hist.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
            let _ = writeln!(out, "{}_sum{{{}}} {}", REQUEST_DURATION, labels, sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", REQUEST_DURATION, labels, count);
        }

        let _ = writeln!(out, "# HELP {} Number of active connections", ACTIVE_CONNECTIONS);
        let _ = writeln!(out, "# TYPE {} gauge", ACTIVE_CONNECTIONS);
        let _ = writeln!(out, "{} {}", ACTIVE_CONNECTIONS, self.active_requests());

        let _ = writeln!(
            out,
            "# HELP {} Start time of the process since unix epoch in seconds.",
            PROCESS_START_TIME
        );
        let _ = writeln!(out, "# TYPE {} gauge", PROCESS_START_TIME);
        let _ = writeln!(out, "{} {:.3}", PROCESS_START_TIME, self.started_unix);

        out
    }

    pub fn shutdown(self) {
        let total: u64 = self
            .registry
            .requests_total
            .iter()
            .map(|entry| entry.value().load(Ordering::Relaxed))
            .sum();
        log::info!(
            "Metrics collector stopped after {:.0}s ({} requests observed, {} in flight)",
            self.uptime_seconds(),
            total,
            self.active_requests()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::init()
    }
}

/// In-flight marker for one request. Dropping it without `finish` (client
/// went away, future cancelled) still releases the gauge.
pub struct RequestTimer {
    metrics: Metrics,
    started: Instant,
}

impl RequestTimer {
    pub fn finish(self, method: &str, route: &str, status_code: u16) {
        let elapsed = self.started.elapsed().as_secs_f64();
        self.metrics.observe_request(method, route, status_code, elapsed);
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.metrics.dec_active();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_per_label_set() {
        let metrics = Metrics::init();
        metrics.observe_request("GET", "/health", 200, 0.01);
        metrics.observe_request("GET", "/health", 200, 0.02);
        metrics.observe_request("GET", "/health", 503, 0.02);

        assert_eq!(metrics.request_count("GET", "/health", 200), 2);
        assert_eq!(metrics.request_count("GET", "/health", 503), 1);
        assert_eq!(metrics.request_count("POST", "/health", 200), 0);
    }

    #[test]
    fn test_render_format() {
        let metrics = Metrics::init();
        metrics.observe_request("GET", "/api/posts", 200, 0.3);

        let text = metrics.render();
        assert!(text.contains("# HELP http_requests_total Total number of HTTP requests"));
        assert!(text.contains("# TYPE http_requests_total counter"));
        assert!(text.contains(
            "http_requests_total{method=\"GET\",route=\"/api/posts\",status_code=\"200\"} 1"
        ));
        assert!(text.contains("# TYPE http_request_duration_seconds histogram"));
        assert!(text.contains("# TYPE active_connections gauge"));
        assert!(text.contains("active_connections 0"));
    }

    #[test]
    fn test_process_start_time_exported() {
        let metrics = Metrics::init();
        assert!(metrics.start_time_seconds() > 1_600_000_000.0);

        let text = metrics.render();
        assert!(text.contains("# TYPE process_start_time_seconds gauge"));
        let line = text
            .lines()
            .find(|l| l.starts_with("process_start_time_seconds "))
            .expect("start time sample");
        let value: f64 = line["process_start_time_seconds ".len()..].parse().unwrap();
        assert!((value - metrics.start_time_seconds()).abs() < 0.01);
    }

    #[test]
    fn test_histogram_buckets_are_cumulative() {
        let metrics = Metrics::init();
        metrics.observe_request("GET", "/slow", 200, 0.3);
        metrics.observe_request("GET", "/slow", 200, 3.0);

        let text = metrics.render();
        let labels = "method=\"GET\",route=\"/slow\",status_code=\"200\"";
        assert!(text.contains(&format!("http_request_duration_seconds_bucket{{{labels},le=\"0.1\"}} 0")));
        assert!(text.contains(&format!("http_request_duration_seconds_bucket{{{labels},le=\"0.5\"}} 1")));
        assert!(text.contains(&format!("http_request_duration_seconds_bucket{{{labels},le=\"2\"}} 1")));
        assert!(text.contains(&format!("http_request_duration_seconds_bucket{{{labels},le=\"5\"}} 2")));
        assert!(text.contains(&format!("http_request_duration_seconds_bucket{{{labels},le=\"+Inf\"}} 2")));
        assert!(text.contains(&format!("http_request_duration_seconds_count{{{labels}}} 2")));
        assert!(text.contains(&format!("http_request_duration_seconds_sum{{{labels}}} 3.3")));
    }

    #[test]
    fn test_label_escaping() {
        let metrics = Metrics::init();
        metrics.observe_request("GET", "/a\"b", 404, 0.0);
        assert!(metrics.render().contains("route=\"/a\\\"b\""));
    }

    #[test]
    fn test_timer_pairs_gauge() {
        let metrics = Metrics::init();
        let timer = metrics.start_request();
        assert_eq!(metrics.active_requests(), 1);
        timer.finish("GET", "/health", 200);
        assert_eq!(metrics.active_requests(), 0);
        assert_eq!(metrics.request_count("GET", "/health", 200), 1);
    }

    #[test]
    fn test_dropped_timer_releases_gauge() {
        let metrics = Metrics::init();
        {
            let _timer = metrics.start_request();
            assert_eq!(metrics.active_requests(), 1);
        }
        assert_eq!(metrics.active_requests(), 0);
        assert!(!metrics.render().contains("http_requests_total{"));
    }

    #[test]
    fn test_collectors_are_isolated() {
        let a = Metrics::init();
        let b = Metrics::init();
        a.observe_request("GET", "/", 200, 0.0);
        assert_eq!(a.request_count("GET", "/", 200), 1);
        assert_eq!(b.request_count("GET", "/", 200), 0);

        let shared = a.clone();
        shared.observe_request("GET", "/", 200, 0.0);
        assert_eq!(a.request_count("GET", "/", 200), 2);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Metrics::init();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        let timer = metrics.start_request();
                        timer.finish("GET", "/api/posts", 200);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.request_count("GET", "/api/posts", 200), 2_000);
        assert_eq!(metrics.active_requests(), 0);
    }
}
