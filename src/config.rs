use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::messaging::QueueBinding;
use crate::utils::RetryConfig;

pub const DEFAULT_BROKERS: &str = "127.0.0.1:9092";
pub const DEFAULT_EXCHANGE: &str = "order.exchange";
pub const DEFAULT_CONFIRMED_QUEUE: &str = "order.confirmed";
pub const DEFAULT_MESSAGE_TTL_MS: u64 = 30_000;
pub const DEFAULT_METRICS_PORT: u16 = 9090;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrokerKind {
    #[default]
    Memory,
    Redpanda,
}

impl FromStr for BrokerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(BrokerKind::Memory),
            "redpanda" | "kafka" => Ok(BrokerKind::Redpanda),
            other => Err(format!("unknown broker kind '{other}'")),
        }
    }
}

impl Display for BrokerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerKind::Memory => f.write_str("memory"),
            BrokerKind::Redpanda => f.write_str("redpanda"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerConfig {
    pub kind: BrokerKind,
    pub brokers: String,
    pub exchange: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: BrokerKind::default(),
            brokers: DEFAULT_BROKERS.to_string(),
            exchange: DEFAULT_EXCHANGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub broker: BrokerConfig,
    pub confirmed_queue: QueueBinding,
    pub retry: RetryConfig,
    pub metrics_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            confirmed_queue: QueueBinding::confirmed_orders(
                DEFAULT_EXCHANGE,
                DEFAULT_CONFIRMED_QUEUE,
                Duration::from_millis(DEFAULT_MESSAGE_TTL_MS),
            ),
            retry: RetryConfig::default(),
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl AppConfig {
    /// Reads `ORDERS_*` variables from the process environment. Invalid values
    /// are logged and replaced by their defaults.
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let defaults = Self::default();

        let kind = parsed(&lookup, "ORDERS_BROKER", defaults.broker.kind);
        let brokers = lookup("ORDERS_BROKERS").unwrap_or(defaults.broker.brokers);
        let exchange = lookup("ORDERS_EXCHANGE").unwrap_or(defaults.broker.exchange);
        let queue = lookup("ORDERS_CONFIRMED_QUEUE").unwrap_or(defaults.confirmed_queue.queue);
        let ttl_ms = parsed(&lookup, "ORDERS_MESSAGE_TTL_MS", DEFAULT_MESSAGE_TTL_MS);

        let retry = RetryConfig {
            max_attempts: parsed(&lookup, "ORDERS_RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts),
            initial_delay: Duration::from_millis(parsed(
                &lookup,
                "ORDERS_RETRY_INITIAL_DELAY_MS",
                defaults.retry.initial_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_millis(parsed(
                &lookup,
                "ORDERS_RETRY_MAX_DELAY_MS",
                defaults.retry.max_delay.as_millis() as u64,
            )),
            multiplier: defaults.retry.multiplier,
        };
        let metrics_port = parsed(&lookup, "ORDERS_METRICS_PORT", defaults.metrics_port);

        let confirmed_queue = QueueBinding::confirmed_orders(exchange.clone(), queue, Duration::from_millis(ttl_ms));

        Self {
            broker: BrokerConfig { kind, brokers, exchange },
            confirmed_queue,
            retry,
            metrics_port,
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {raw} is not a valid value for {key}. {e} Using the default, {default}, instead.");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.broker.kind, BrokerKind::Memory);
        assert_eq!(config.confirmed_queue.message_ttl, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.metrics_port, 9090);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("ORDERS_BROKER", "redpanda"),
            ("ORDERS_BROKERS", "redpanda:9092"),
            ("ORDERS_EXCHANGE", "kitchen"),
            ("ORDERS_CONFIRMED_QUEUE", "kitchen.confirmed"),
            ("ORDERS_MESSAGE_TTL_MS", "5000"),
            ("ORDERS_RETRY_MAX_ATTEMPTS", "5"),
            ("ORDERS_RETRY_INITIAL_DELAY_MS", "250"),
            ("ORDERS_RETRY_MAX_DELAY_MS", "2000"),
            ("ORDERS_METRICS_PORT", "9100"),
        ]));

        assert_eq!(config.broker.kind, BrokerKind::Redpanda);
        assert_eq!(config.broker.brokers, "redpanda:9092");
        assert_eq!(config.confirmed_queue.exchange, "kitchen");
        assert_eq!(config.confirmed_queue.dead_letter_exchange, "kitchen");
        assert_eq!(config.confirmed_queue.queue, "kitchen.confirmed");
        assert_eq!(config.confirmed_queue.message_ttl, Duration::from_millis(5000));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_millis(2000));
        assert_eq!(config.metrics_port, 9100);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[
            ("ORDERS_BROKER", "rabbit"),
            ("ORDERS_METRICS_PORT", "not-a-port"),
            ("ORDERS_RETRY_MAX_ATTEMPTS", "-1"),
        ]));

        assert_eq!(config.broker.kind, BrokerKind::Memory);
        assert_eq!(config.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(config.retry.max_attempts, 3);
    }
}
