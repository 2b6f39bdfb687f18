use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kitchen_orders::config::{AppConfig, BrokerKind};
use kitchen_orders::domain::order::{CreateOrder, NewLineItem, OrderWorkflowService};
use kitchen_orders::messaging::{
    EventPublisher, InMemoryBroker, MessageBroker, OrderEventConsumer, QueueWorker, RedpandaBroker,
};
use kitchen_orders::metrics::{self, Metrics};
use kitchen_orders::persistence::{InMemoryCustomerRepository, InMemoryOrderRepository};
use kitchen_orders::utils::RetryExecutor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kitchen_orders=debug")))
        .init();

    let config = AppConfig::from_env_or_default();
    tracing::info!("🚀 Starting kitchen order service");
    tracing::info!(broker = %config.broker.kind, exchange = %config.broker.exchange, "Configuration loaded");

    // === 1. Initialize Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // Start metrics HTTP server on its own actix system
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let result = actix_web::rt::System::new()
            .block_on(async move { metrics::start_metrics_server(metrics_registry, metrics_port).await });
        if let Err(e) = result {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 2. Broker ===
    let broker: Arc<dyn MessageBroker> = match config.broker.kind {
        BrokerKind::Memory => Arc::new(InMemoryBroker::new()),
        BrokerKind::Redpanda => Arc::new(RedpandaBroker::new(&config.broker.brokers)?),
    };

    // === 3. Workflow ===
    let publisher =
        Arc::new(EventPublisher::new(broker.clone(), config.broker.exchange.clone()).with_metrics(metrics.clone()));
    let workflow = Arc::new(
        OrderWorkflowService::new(
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(InMemoryCustomerRepository::new()),
            publisher,
        )
        .with_metrics(metrics.clone()),
    );

    // === 4. Kitchen consumer for confirmed orders ===
    let retry = RetryExecutor::new(config.retry.clone()).with_metrics(metrics.clone());
    let consumer = Arc::new(OrderEventConsumer::new(workflow.clone(), retry));
    let worker = Arc::new(
        QueueWorker::new(broker.clone(), config.confirmed_queue.clone(), consumer).with_metrics(metrics.clone()),
    );
    tokio::spawn(async move {
        if let Err(e) = worker.run().await {
            tracing::error!(error = %e, "Confirmed-order worker stopped");
        }
    });
    // let the subscription bind before anything is published
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    // === 5. Demonstrate the order lifecycle ===
    tracing::info!("📝 Demonstrating kitchen order lifecycle");

    let order = workflow
        .create_order(
            CreateOrder {
                customer_id: None,
                items: vec![
                    NewLineItem::new("x-burger", 2, BigDecimal::from_str("15.00")?),
                    NewLineItem::new("milkshake", 1, BigDecimal::from_str("20.00")?),
                ],
            },
            None,
        )
        .await?;
    let order_id = order.id().unwrap_or_default().to_string();
    tracing::info!("✅ Order created: {} (total {})", order_id, order.total());

    workflow.confirm(&order_id).await?;
    tracing::info!("✅ Order confirmed: {}", order_id);

    // The kitchen consumer moves the order to RECEIVED
    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
    let received = workflow.find_by_id(&order_id).await?;
    tracing::info!("🍳 Order {} is {}", order_id, received.status());

    workflow.start_preparation(&order_id).await?;
    workflow.mark_ready(&order_id).await?;
    tracing::info!("🔔 Kitchen board: {} active order(s)", workflow.list_active().await?.len());
    workflow.mark_delivered(&order_id).await?;
    tracing::info!("✅ Order delivered: {}", order_id);

    tracing::info!("🎉 Demo complete!");
    Ok(())
}
