use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "inventory_realtime_http_requests_total",
            "Total HTTP requests handled by inventory-realtime-service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create inventory_realtime_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register inventory_realtime_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "inventory_realtime_http_request_duration_seconds",
            "HTTP request latency for inventory-realtime-service",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["method", "path", "status"],
    )
    .expect("failed to create inventory_realtime_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register inventory_realtime_http_request_duration_seconds");
    histogram
});

static CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "inventory_realtime_connections_active",
        "WebSocket connections currently registered with the broadcast hub",
    )
    .expect("failed to create inventory_realtime_connections_active");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register inventory_realtime_connections_active");
    gauge
});

static EVENTS_DELIVERED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "inventory_realtime_events_delivered_total",
            "Events queued to WebSocket sessions, by channel family",
        ),
        &["channel_kind"],
    )
    .expect("failed to create inventory_realtime_events_delivered_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register inventory_realtime_events_delivered_total");
    counter
});

static INGRESS_IGNORED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "inventory_realtime_ingress_ignored_total",
            "Client events dropped by ingress validation",
        ),
        &["reason"],
    )
    .expect("failed to create inventory_realtime_ingress_ignored_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register inventory_realtime_ingress_ignored_total");
    counter
});

static SCAN_CYCLES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "inventory_realtime_scan_cycles_total",
            "Expiry scan cycles by outcome",
        ),
        &["outcome"],
    )
    .expect("failed to create inventory_realtime_scan_cycles_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register inventory_realtime_scan_cycles_total");
    counter
});

static EXPIRY_ALERTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "inventory_realtime_expiry_alerts_total",
            "Expiry alerts published, by alert level",
        ),
        &["alert_level"],
    )
    .expect("failed to create inventory_realtime_expiry_alerts_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register inventory_realtime_expiry_alerts_total");
    counter
});

pub fn set_active_connections(count: usize) {
    CONNECTIONS_ACTIVE.set(count as i64);
}

pub fn record_delivered(channel_kind: &str, delivered: usize) {
    EVENTS_DELIVERED_TOTAL
        .with_label_values(&[channel_kind])
        .inc_by(delivered as u64);
}

pub fn record_ingress_ignored(reason: &str) {
    INGRESS_IGNORED_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_scan_cycle(outcome: &str) {
    SCAN_CYCLES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_expiry_alert(alert_level: &str) {
    EXPIRY_ALERTS_TOTAL.with_label_values(&[alert_level]).inc();
}

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status_label = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status_label])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status_label])
        .observe(elapsed.as_secs_f64());
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::Instant;

pub struct MetricsMiddleware;

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        // Route pattern keeps user ids out of the label set.
        let path = req
            .match_pattern()
            .unwrap_or_else(|| req.path().to_string());
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = service.call(req).await;
            let elapsed = start.elapsed();
            match &result {
                Ok(response) => {
                    observe_http_request(&method, &path, response.status().as_u16(), elapsed);
                }
                Err(_) => {
                    observe_http_request(&method, &path, 500, elapsed);
                }
            }
            result
        })
    }
}
