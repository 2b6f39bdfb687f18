// Private module declaration
mod server;

use prometheus::{IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order status transitions
// - Lifecycle event publication (successes and swallowed failures)
// - Retry attempts and outcomes
// - Consumer deliveries and dead-lettered messages
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the service
pub struct Metrics {
    registry: Registry,

    // Workflow Metrics
    pub order_transitions: IntCounterVec,
    pub events_published: IntCounterVec,
    pub event_publish_failures: IntCounterVec,

    // Retry Metrics
    pub retry_attempts_total: IntCounterVec,
    pub retry_outcomes: IntCounterVec,

    // Consumer Metrics
    pub consumer_messages: IntCounterVec,
    pub dead_lettered_messages: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Workflow Metrics
        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order status transitions committed"),
            &["status"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("order_events_published_total", "Lifecycle events accepted by the broker"),
            &["routing_key"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let event_publish_failures = IntCounterVec::new(
            Opts::new(
                "order_events_publish_failures_total",
                "Lifecycle events dropped because the broker rejected them",
            ),
            &["routing_key"],
        )?;
        registry.register(Box::new(event_publish_failures.clone()))?;

        // Retry Metrics
        let retry_attempts_total = IntCounterVec::new(
            Opts::new("retry_attempts_total", "Total retry attempts"),
            &["operation", "attempt"],
        )?;
        registry.register(Box::new(retry_attempts_total.clone()))?;

        let retry_outcomes = IntCounterVec::new(
            Opts::new("retry_outcomes_total", "Retried operations by final outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(retry_outcomes.clone()))?;

        // Consumer Metrics
        let consumer_messages = IntCounterVec::new(
            Opts::new("consumer_messages_total", "Deliveries handled by queue consumers"),
            &["outcome"],
        )?;
        registry.register(Box::new(consumer_messages.clone()))?;

        let dead_lettered_messages = IntCounterVec::new(
            Opts::new("dead_lettered_messages_total", "Deliveries rerouted to a dead-letter key"),
            &["routing_key", "reason"],
        )?;
        registry.register(Box::new(dead_lettered_messages.clone()))?;

        Ok(Self {
            registry,
            order_transitions,
            events_published,
            event_publish_failures,
            retry_attempts_total,
            retry_outcomes,
            consumer_messages,
            dead_lettered_messages,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, status: &str) {
        self.order_transitions.with_label_values(&[status]).inc();
    }

    pub fn record_publish(&self, routing_key: &str, success: bool) {
        if success {
            self.events_published.with_label_values(&[routing_key]).inc();
        } else {
            self.event_publish_failures.with_label_values(&[routing_key]).inc();
        }
    }

    pub fn record_retry_attempt(&self, operation: &str, attempt: u32) {
        let attempt = attempt.to_string();
        self.retry_attempts_total
            .with_label_values(&[operation, attempt.as_str()])
            .inc();
    }

    pub fn record_retry_outcome(&self, operation: &str, success: bool) {
        let outcome = if success { "success" } else { "exhausted" };
        self.retry_outcomes.with_label_values(&[operation, outcome]).inc();
    }

    pub fn record_consumer_message(&self, outcome: &str) {
        self.consumer_messages.with_label_values(&[outcome]).inc();
    }

    pub fn record_dead_letter(&self, routing_key: &str, reason: &str) {
        self.dead_lettered_messages
            .with_label_values(&[routing_key, reason])
            .inc();
    }

    pub fn transition_count(&self, status: &str) -> u64 {
        self.order_transitions.with_label_values(&[status]).get()
    }

    pub fn publish_count(&self, routing_key: &str, success: bool) -> u64 {
        if success {
            self.events_published.with_label_values(&[routing_key]).get()
        } else {
            self.event_publish_failures.with_label_values(&[routing_key]).get()
        }
    }

    /// Attempts recorded for `operation`, summed over attempt numbers.
    pub fn retry_attempt_count(&self, operation: &str) -> u64 {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.name() == "retry_attempts_total")
            .flat_map(|family| family.metric.iter())
            .filter(|metric| {
                metric
                    .label
                    .iter()
                    .any(|label| label.name() == "operation" && label.value() == operation)
            })
            .map(|metric| metric.counter.value.unwrap_or(0.0) as u64)
            .sum()
    }

    pub fn dead_letter_count(&self, routing_key: &str, reason: &str) -> u64 {
        self.dead_lettered_messages
            .with_label_values(&[routing_key, reason])
            .get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transition("CONFIRMED");
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_transition() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transition("CONFIRMED");
        metrics.record_transition("CONFIRMED");
        metrics.record_transition("READY");

        assert_eq!(metrics.transition_count("CONFIRMED"), 2);
        assert_eq!(metrics.transition_count("READY"), 1);
        assert_eq!(metrics.transition_count("DELIVERED"), 0);
    }

    #[test]
    fn test_record_publish_outcomes() {
        let metrics = Metrics::new().unwrap();
        metrics.record_publish("order.status.ready", true);
        metrics.record_publish("order.status.ready", false);
        metrics.record_publish("order.status.ready", false);

        assert_eq!(metrics.publish_count("order.status.ready", true), 1);
        assert_eq!(metrics.publish_count("order.status.ready", false), 2);
    }

    #[test]
    fn test_record_retry() {
        let metrics = Metrics::new().unwrap();
        metrics.record_retry_attempt("receive_confirmed", 1);
        metrics.record_retry_attempt("receive_confirmed", 2);
        metrics.record_retry_attempt("other", 1);
        metrics.record_retry_outcome("receive_confirmed", true);

        assert_eq!(metrics.retry_attempt_count("receive_confirmed"), 2);
        assert_eq!(metrics.retry_attempt_count("other"), 1);
        assert_eq!(
            metrics
                .retry_outcomes
                .with_label_values(&["receive_confirmed", "success"])
                .get(),
            1
        );
    }

    #[test]
    fn test_record_dead_letter() {
        let metrics = Metrics::new().unwrap();
        metrics.record_dead_letter("order.status.confirmed.dlq", "rejected");
        metrics.record_dead_letter("order.status.confirmed.dlq", "expired");
        metrics.record_dead_letter("order.status.confirmed.dlq", "rejected");

        assert_eq!(metrics.dead_letter_count("order.status.confirmed.dlq", "rejected"), 2);
        assert_eq!(metrics.dead_letter_count("order.status.confirmed.dlq", "expired"), 1);
    }
}
