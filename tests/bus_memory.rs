//! End-to-end scenarios across the bus and the memory tiers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::json;

use axon::{
    Bus, BusConfig, Config, Envelope, MemoryAdapter, MemoryConfig, Priority, SubscribeError,
    SubscriberFn, topics,
};

/// Route bus/memory logs through `RUST_LOG` when debugging a failure.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::test]
async fn stored_interaction_is_recalled_as_context() {
    init_tracing();
    let cfg = Config::default();
    let bus = Arc::new(Bus::new(cfg.bus));
    let memory = Arc::new(MemoryAdapter::new(&cfg.memory).expect("adapter"));

    // The orchestrator-side subscriber: answers user input and stores the
    // completed interaction.
    let adapter = Arc::clone(&memory);
    bus.subscribe(
        topics::USER_INPUT,
        SubscriberFn::arc("orchestrator", move |envelope: Envelope| {
            let adapter = Arc::clone(&adapter);
            async move {
                let content = envelope.payload["content"].as_str().unwrap_or_default();
                adapter
                    .store_interaction(content, "hi there", Some(envelope.payload.clone()))
                    .await
                    .map_err(|err| SubscribeError::retryable(err.to_string()))
            }
        }),
    )
    .await
    .expect("subscribe");

    bus.start();
    bus.publish(
        topics::USER_INPUT,
        json!({"content": "hello world", "user_id": "u1"}),
        Priority::Normal,
    )
    .expect("publish");
    bus.shutdown().await;

    let context = memory.get_context("hello").await;
    assert!(
        context.iter().any(|r| r.content.contains("hello world")),
        "expected the stored interaction in {context:?}"
    );

    let recent = memory.recent_interactions(5).expect("recent");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].input, "hello world");
}

#[tokio::test]
async fn attached_memory_consumes_bus_traffic() {
    init_tracing();
    let cfg = Config::default();
    let bus = Bus::new(cfg.bus);
    let memory = Arc::new(MemoryAdapter::new(&cfg.memory).expect("adapter"));

    memory.attach(&bus).await.expect("attach");
    bus.start();

    bus.publish(
        topics::USER_INPUT,
        json!({"content": "remember the milk", "user_id": "u1"}),
        Priority::Normal,
    )
    .expect("publish");
    bus.publish(
        topics::CONTEXT_PROCESSOR,
        json!({"input": "remember the milk", "response": "noted"}),
        Priority::Normal,
    )
    .expect("publish");
    bus.shutdown().await;

    let context = memory.get_context("milk").await;
    assert!(context.iter().any(|r| r.kind == topics::USER_INPUT));
    assert!(context.iter().any(|r| r.kind == "interaction"));
}

#[tokio::test]
async fn publish_to_topic_without_subscribers_is_silent() {
    let bus = Bus::new(BusConfig::default());
    bus.start();

    bus.publish("trigger", json!({"pattern": "unused"}), Priority::Urgent)
        .expect("publish");
    bus.shutdown().await;
}

#[tokio::test]
async fn dispatch_survives_concurrent_subscribe_churn() {
    let bus = Arc::new(Bus::new(BusConfig::default()));
    let delivered = Arc::new(AtomicU32::new(0));

    let sink = Arc::clone(&delivered);
    bus.subscribe(
        "t",
        SubscriberFn::arc("stable", move |_envelope: Envelope| {
            let sink = Arc::clone(&sink);
            async move {
                sink.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SubscribeError>(())
            }
        }),
    )
    .await
    .expect("subscribe");

    bus.start();

    // Publisher and churner race the dispatcher.
    let publisher = {
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            for i in 0..100u32 {
                bus.publish("t", json!({"marker": i}), Priority::Normal)
                    .expect("publish");
                if i % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };
    let churner = {
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            for _ in 0..50 {
                let handle = bus
                    .subscribe(
                        "t",
                        SubscriberFn::arc("ephemeral", |_envelope: Envelope| async move {
                            Ok::<_, SubscribeError>(())
                        }),
                    )
                    .await
                    .expect("subscribe");
                tokio::task::yield_now().await;
                bus.unsubscribe(&handle).await.expect("unsubscribe");
            }
        })
    };

    publisher.await.expect("publisher");
    churner.await.expect("churner");
    bus.shutdown().await;

    // The stable subscriber saw every envelope despite the churn.
    assert_eq!(delivered.load(Ordering::SeqCst), 100);
}

#[tokio::test]
async fn retrying_memory_write_eventually_lands() {
    // A subscriber that fails twice before storing — the bus retries it and
    // the record still reaches the tiers.
    let cfg = Config {
        bus: BusConfig {
            retry: axon::RetryPolicy {
                base: std::time::Duration::from_millis(1),
                ..Default::default()
            },
        },
        memory: MemoryConfig::default(),
    };
    let bus = Bus::new(cfg.bus);
    let memory = Arc::new(MemoryAdapter::new(&cfg.memory).expect("adapter"));

    let attempts = Arc::new(AtomicU32::new(0));
    let adapter = Arc::clone(&memory);
    let counter = Arc::clone(&attempts);
    bus.subscribe(
        topics::AGENT_OUTPUT,
        SubscriberFn::arc("flaky-writer", move |envelope: Envelope| {
            let adapter = Arc::clone(&adapter);
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    return Err(SubscribeError::retryable("transient outage"));
                }
                let content = envelope.payload["content"].as_str().unwrap_or_default();
                adapter
                    .store(axon::MemoryRecord::new("agent_output", content))
                    .await
                    .map_err(|err| SubscribeError::retryable(err.to_string()))
            }
        }),
    )
    .await
    .expect("subscribe");

    bus.start();
    bus.publish(
        topics::AGENT_OUTPUT,
        json!({"content": "eventually stored"}),
        Priority::High,
    )
    .expect("publish");
    bus.shutdown().await;

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let results = memory.retrieve("eventually stored", 5).await;
    assert!(!results.is_empty());
}
