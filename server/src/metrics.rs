// Metrics collection and tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of latency samples kept for percentiles
const MAX_LATENCY_SAMPLES: usize = 1000;

/// Per-endpoint request metrics
#[derive(Debug, Clone)]
pub struct EndpointMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub total_latency_ms: Arc<AtomicU64>,
    pub max_latency_ms: Arc<AtomicU64>,
    pub latency_samples: Arc<std::sync::Mutex<Vec<u64>>>,
}

impl EndpointMetrics {
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
            total_latency_ms: Arc::new(AtomicU64::new(0)),
            max_latency_ms: Arc::new(AtomicU64::new(0)),
            latency_samples: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn record_request(&self, latency_ms: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.max_latency_ms.fetch_max(latency_ms, Ordering::Relaxed);

        if let Ok(mut samples) = self.latency_samples.lock() {
            samples.push(latency_ms);
            if samples.len() > MAX_LATENCY_SAMPLES {
                samples.remove(0);
            }
        }
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_latency_ms(&self) -> f64 {
        let count = self.request_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        total as f64 / count as f64
    }

    pub fn percentile(&self, p: u8) -> u64 {
        if let Ok(samples) = self.latency_samples.lock() {
            if samples.is_empty() {
                return 0;
            }
            let mut sorted = samples.clone();
            sorted.sort_unstable();
            let index = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
            sorted[index]
        } else {
            0
        }
    }

    pub fn stats(&self) -> EndpointStats {
        EndpointStats {
            request_count: self.request_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            avg_latency_ms: self.avg_latency_ms(),
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            p50_latency_ms: self.percentile(50),
            p95_latency_ms: self.percentile(95),
        }
    }
}

impl Default for EndpointMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Synthesis counters
#[derive(Debug, Clone, Default)]
pub struct GenerationMetrics {
    pub generations: Arc<AtomicU64>,
    pub chunks: Arc<AtomicU64>,
    pub audio_bytes: Arc<AtomicU64>,
    pub no_audio: Arc<AtomicU64>,
    pub failures: Arc<AtomicU64>,
}

impl GenerationMetrics {
    pub fn record_success(&self, chunks: usize, bytes: usize) {
        self.generations.fetch_add(1, Ordering::Relaxed);
        self.chunks.fetch_add(chunks as u64, Ordering::Relaxed);
        self.audio_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_no_audio(&self) {
        self.no_audio.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> GenerationStats {
        GenerationStats {
            generations: self.generations.load(Ordering::Relaxed),
            chunks: self.chunks.load(Ordering::Relaxed),
            audio_bytes: self.audio_bytes.load(Ordering::Relaxed),
            no_audio: self.no_audio.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppMetrics {
    pub started: Instant,
    pub requests: Arc<AtomicU64>,
    pub tts: EndpointMetrics,
    pub generation: GenerationMetrics,
}

impl AppMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests: Arc::new(AtomicU64::new(0)),
            tts: EndpointMetrics::new(),
            generation: GenerationMetrics::default(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsResponse {
        let mut system = sysinfo::System::new();
        system.refresh_cpu();
        system.refresh_memory();

        let memory_used = system.used_memory();
        let memory_total = system.total_memory();
        let memory_usage_percent = if memory_total > 0 {
            (memory_used as f64 / memory_total as f64 * 100.0) as f32
        } else {
            0.0
        };

        MetricsResponse {
            timestamp: Utc::now(),
            system: SystemMetrics {
                cpu_usage_percent: system.global_cpu_info().cpu_usage(),
                memory_used_mb: memory_used / 1024 / 1024,
                memory_total_mb: memory_total / 1024 / 1024,
                memory_usage_percent,
                request_count: self.requests.load(Ordering::Relaxed),
                uptime_seconds: self.uptime_seconds(),
            },
            tts: self.tts.stats(),
            generation: self.generation.stats(),
        }
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub timestamp: DateTime<Utc>,
    pub system: SystemMetrics,
    pub tts: EndpointStats,
    pub generation: GenerationStats,
}

#[derive(Serialize)]
pub struct SystemMetrics {
    pub cpu_usage_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub memory_usage_percent: f32,
    pub request_count: u64,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct EndpointStats {
    pub request_count: u64,
    pub error_count: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p95_latency_ms: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct GenerationStats {
    pub generations: u64,
    pub chunks: u64,
    pub audio_bytes: u64,
    pub no_audio: u64,
    pub failures: u64,
}
