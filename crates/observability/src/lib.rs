use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    predictions_total: AtomicU64,
    override_total: AtomicU64,
    validation_errors_total: AtomicU64,
    model_errors_total: AtomicU64,
    total_latency_micros: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub predictions_total: u64,
    pub override_total: u64,
    pub validation_errors_total: u64,
    pub model_errors_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("cardio_requests_total").increment(1);
    }

    /// `risk` is the label string; `overridden` marks the BMI rules.
    pub fn record_prediction(&self, risk: &'static str, overridden: bool) {
        self.predictions_total.fetch_add(1, Ordering::Relaxed);
        if overridden {
            self.override_total.fetch_add(1, Ordering::Relaxed);
        }
        metrics::counter!("cardio_predictions_total", "risk" => risk).increment(1);
    }

    pub fn inc_validation_error(&self) {
        self.validation_errors_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("cardio_errors_total", "kind" => "validation").increment(1);
    }

    pub fn inc_model_error(&self) {
        self.model_errors_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("cardio_errors_total", "kind" => "model").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        metrics::histogram!("cardio_predict_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_micros.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            predictions_total: self.predictions_total.load(Ordering::Relaxed),
            override_total: self.override_total.load(Ordering::Relaxed),
            validation_errors_total: self.validation_errors_total.load(Ordering::Relaxed),
            model_errors_total: self.model_errors_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / 1000.0 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,cardio_api=info,cardio_ml=info,tower_http=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
