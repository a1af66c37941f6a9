//! Prometheus metrics collection and exposition endpoint.

use std::sync::OnceLock;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    core::Collector,
};
use salvo::{
    Request, Response, handler,
    http::{
        StatusCode,
        header::{CONTENT_TYPE, HeaderValue},
    },
};
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{error, warn};

use lectern_app::domain::events::DomainEvent;

#[derive(Debug)]
struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    requests_in_flight: IntGauge,
    enrollments_total: IntCounterVec,
    payment_verifications_total: IntCounterVec,
    callback_rejections_total: IntCounterVec,
    domain_events_total: IntCounterVec,
}

static METRICS: OnceLock<Option<Metrics>> = OnceLock::new();

/// How an enrollment request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnrollmentOutcome {
    Free,
    Pending,
    SessionFailed,
    Rejected,
}

impl EnrollmentOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pending => "pending",
            Self::SessionFailed => "session_failed",
            Self::Rejected => "rejected",
        }
    }
}

/// Who asked for a payment to be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerificationSource {
    Client,
    Callback,
}

impl VerificationSource {
    fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Callback => "callback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerificationOutcome {
    Paid,
    Unpaid,
    Rejected,
}

impl VerificationOutcome {
    pub(crate) fn from_paid(paid: bool) -> Self {
        if paid { Self::Paid } else { Self::Unpaid }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug)]
pub(super) struct InFlightRequestGuard {
    tracked: bool,
}

impl InFlightRequestGuard {
    pub(super) fn track() -> Self {
        if let Some(metrics) = metrics() {
            metrics.requests_in_flight.inc();
            return Self { tracked: true };
        }

        Self { tracked: false }
    }
}

impl Drop for InFlightRequestGuard {
    fn drop(&mut self) {
        if self.tracked
            && let Some(metrics) = metrics()
        {
            metrics.requests_in_flight.dec();
        }
    }
}

pub(super) fn observe_request(method: &str, route: &str, status_code: u16, duration_seconds: f64) {
    let Some(metrics) = metrics() else {
        return;
    };

    let status_class = status_class(status_code);
    let status_code = status_code.to_string();

    metrics
        .requests_total
        .with_label_values(&[method, route, status_class, status_code.as_str()])
        .inc();

    metrics
        .request_duration_seconds
        .with_label_values(&[method, route])
        .observe(duration_seconds);
}

pub(crate) fn record_enrollment(outcome: EnrollmentOutcome) {
    if let Some(metrics) = metrics() {
        metrics
            .enrollments_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }
}

pub(crate) fn record_verification(source: VerificationSource, outcome: VerificationOutcome) {
    if let Some(metrics) = metrics() {
        metrics
            .payment_verifications_total
            .with_label_values(&[source.as_str(), outcome.as_str()])
            .inc();
    }
}

pub(crate) fn record_callback_rejection(gateway: &str) {
    if let Some(metrics) = metrics() {
        metrics
            .callback_rejections_total
            .with_label_values(&[gateway])
            .inc();
    }
}

/// Count published domain events until the publisher goes away.
pub(crate) async fn record_domain_events(mut events: Receiver<DomainEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(metrics) = metrics() {
                    metrics
                        .domain_events_total
                        .with_label_values(&[event.name()])
                        .inc();
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "domain event metrics fell behind");
            }
            Err(RecvError::Closed) => return,
        }
    }
}

#[handler]
pub(crate) async fn metrics_handler(_req: &mut Request, res: &mut Response) {
    let Some(metrics) = metrics() else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };

    let encoder = TextEncoder::new();
    let metric_families = metrics.registry.gather();

    let mut encoded = Vec::new();

    if let Err(source) = encoder.encode(&metric_families, &mut encoded) {
        error!("failed to encode metrics response: {source}");
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

        return;
    }

    let content_type = match HeaderValue::from_str(encoder.format_type()) {
        Ok(value) => value,
        Err(source) => {
            error!("failed to encode metrics content type header: {source}");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

            return;
        }
    };

    res.headers_mut().insert(CONTENT_TYPE, content_type);
    res.render(String::from_utf8_lossy(&encoded).into_owned());
}

fn metrics() -> Option<&'static Metrics> {
    METRICS.get_or_init(build_metrics).as_ref()
}

fn counter(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> Option<IntCounterVec> {
    match IntCounterVec::new(Opts::new(name, help), labels) {
        Ok(metric) => register(registry, name, metric),
        Err(source) => {
            error!("failed to create {name} metric: {source}");
            None
        }
    }
}

fn register<M>(registry: &Registry, name: &str, metric: M) -> Option<M>
where
    M: Collector + Clone + 'static,
{
    if let Err(source) = registry.register(Box::new(metric.clone())) {
        error!("failed to register {name} metric: {source}");
        return None;
    }

    Some(metric)
}

fn build_metrics() -> Option<Metrics> {
    let registry = Registry::new();

    let requests_total = counter(
        &registry,
        "lectern_json_http_requests_total",
        "Total HTTP requests partitioned by method, route, status class, and status code.",
        &["method", "route", "status_class", "status_code"],
    )?;

    let request_duration_seconds = match HistogramVec::new(
        HistogramOpts::new(
            "lectern_json_http_request_duration_seconds",
            "HTTP request duration in seconds partitioned by method and route.",
        )
        .buckets(vec![
            0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "route"],
    ) {
        Ok(metric) => register(&registry, "request_duration", metric)?,
        Err(source) => {
            error!("failed to create request_duration metric: {source}");
            return None;
        }
    };

    let requests_in_flight = match IntGauge::with_opts(Opts::new(
        "lectern_json_http_requests_in_flight",
        "Current number of in-flight HTTP requests.",
    )) {
        Ok(metric) => register(&registry, "in-flight gauge", metric)?,
        Err(source) => {
            error!("failed to create in-flight gauge metric: {source}");
            return None;
        }
    };

    let enrollments_total = counter(
        &registry,
        "lectern_json_enrollments_total",
        "Enrollment requests partitioned by outcome.",
        &["outcome"],
    )?;

    let payment_verifications_total = counter(
        &registry,
        "lectern_json_payment_verifications_total",
        "Payment verifications partitioned by source and outcome.",
        &["source", "outcome"],
    )?;

    let callback_rejections_total = counter(
        &registry,
        "lectern_json_callback_rejections_total",
        "Provider callbacks rejected as untrusted or malformed.",
        &["gateway"],
    )?;

    let domain_events_total = counter(
        &registry,
        "lectern_json_domain_events_total",
        "Published domain events partitioned by event name.",
        &["event"],
    )?;

    Some(Metrics {
        registry,
        requests_total,
        request_duration_seconds,
        requests_in_flight,
        enrollments_total,
        payment_verifications_total,
        callback_rejections_total,
        domain_events_total,
    })
}

fn status_class(status_code: u16) -> &'static str {
    match status_code {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use salvo::{
        Router, Service,
        test::{ResponseExt, TestClient},
    };

    use super::*;

    async fn scrape() -> String {
        let service =
            Service::new(Router::new().push(Router::with_path("metrics").get(metrics_handler)));

        TestClient::get("http://example.com/metrics")
            .send(&service)
            .await
            .take_string()
            .await
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_http_metrics() {
        observe_request("GET", "/enrollments/{uuid}", 200, 0.042);
        observe_request("GET", "/enrollments/{uuid}", 500, 0.123);

        let response = scrape().await;

        assert!(
            response.contains("lectern_json_http_requests_total"),
            "expected requests_total metric in response"
        );
        assert!(
            response.contains("lectern_json_http_request_duration_seconds"),
            "expected request_duration metric in response"
        );
        assert!(
            response.contains("lectern_json_http_requests_in_flight"),
            "expected in-flight metric in response"
        );
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_payment_metrics() {
        record_enrollment(EnrollmentOutcome::Pending);
        record_verification(VerificationSource::Callback, VerificationOutcome::Rejected);
        record_callback_rejection("paymob");

        let response = scrape().await;

        assert!(
            response.contains(r#"lectern_json_enrollments_total{outcome="pending"}"#),
            "expected enrollment outcome in response"
        );
        assert!(
            response.contains(
                r#"lectern_json_payment_verifications_total{outcome="rejected",source="callback"}"#
            ),
            "expected verification outcome in response"
        );
        assert!(
            response.contains(r#"lectern_json_callback_rejections_total{gateway="paymob"}"#),
            "expected callback rejection in response"
        );
    }
}
