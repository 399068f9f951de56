// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

mod common;

use common::{MockPort, registry_with, settle};
use mikrotik_telemetry::{
    PollingSettings, RouterPorts, Sampler, SessionKey, SubscriptionRegistry, TelemetryError,
};
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;

const SECOND: Duration = Duration::from_secs(1);

// --- end-to-end ---

#[tokio::test(start_paused = true)]
async fn single_subscriber_receives_samples_and_cleans_up() {
    let registry = registry_with("r1", MockPort::fixed(100, 200));
    let ctx = CancellationToken::new();

    let mut stream = registry
        .subscribe(ctx.clone(), "r1", "eth1", SECOND)
        .await
        .unwrap();

    sleep(Duration::from_secs(3)).await;
    let mut received = 0;
    while let Some(sample) = stream.try_recv() {
        assert_eq!(sample.tx_bytes, 100);
        assert_eq!(sample.rx_bytes, 200);
        received += 1;
    }
    assert!(received >= 3, "received only {received} samples");

    ctx.cancel();
    let closed = timeout(Duration::from_millis(1100), async {
        while stream.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "queue did not close after cancel");

    settle().await;
    assert_eq!(registry.active_sessions().await, 0);
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn two_subscribers_share_one_session() {
    let registry = registry_with("r1", MockPort::counting());
    let ctx_a = CancellationToken::new();
    let ctx_b = CancellationToken::new();

    let _a = registry.subscribe(ctx_a.clone(), "r1", "eth1", SECOND).await.unwrap();
    let _b = registry.subscribe(ctx_b.clone(), "r1", "eth1", SECOND).await.unwrap();
    assert_eq!(registry.active_sessions().await, 1);
    assert_eq!(registry.subscriber_count().await, 2);

    ctx_a.cancel();
    settle().await;
    assert_eq!(registry.active_sessions().await, 1);
    assert_eq!(registry.subscriber_count().await, 1);

    ctx_b.cancel();
    settle().await;
    assert_eq!(registry.active_sessions().await, 0);
    assert_eq!(registry.subscriber_count().await, 0);
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn slow_consumer_does_not_slow_others() {
    let registry = registry_with("r1", MockPort::counting());
    let ctx = CancellationToken::new();

    let mut fast = registry.subscribe(ctx.clone(), "r1", "eth1", SECOND).await.unwrap();
    let slow = registry.subscribe(ctx.clone(), "r1", "eth1", SECOND).await.unwrap();

    let reader = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(sample) = fast.recv().await {
            seen.push(sample.tx_bytes);
        }
        seen
    });

    // 30 ticks: t = 0s ..= 29s
    sleep(Duration::from_millis(29_500)).await;
    assert_eq!(slow.buffered(), 10);

    registry.stop().await;
    let seen = reader.await.unwrap();
    assert!(seen.len() >= 27, "fast consumer saw only {} samples", seen.len());
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "samples out of order");
    drop(slow);
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_clamped_to_one_second() {
    let registry = registry_with("r1", MockPort::counting());
    let start = Instant::now();

    let mut stream = registry
        .subscribe(CancellationToken::new(), "r1", "eth1", Duration::ZERO)
        .await
        .unwrap();

    let first = timeout(Duration::from_millis(1200), stream.recv()).await;
    assert!(matches!(first, Ok(Some(_))));
    let second = timeout(
        Duration::from_millis(2200).saturating_sub(start.elapsed()),
        stream.recv(),
    )
    .await;
    assert!(matches!(second, Ok(Some(_))));

    // no third sample before the 2s tick
    assert!(stream.try_recv().is_none());
    assert_eq!(
        registry.session_interval(&SessionKey::new("r1", "eth1")).await,
        Some(SECOND)
    );
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_closes_every_subscription() {
    let registry = registry_with("r1", MockPort::counting());
    let ctx = CancellationToken::new();
    let interval = Duration::from_secs(3);

    let mut streams = Vec::new();
    for iface in 0..5 {
        for _ in 0..4 {
            let stream = registry
                .subscribe(ctx.clone(), "r1", &format!("eth{iface}"), interval)
                .await
                .unwrap();
            streams.push(stream);
        }
    }
    assert_eq!(registry.active_sessions().await, 5);
    assert_eq!(registry.subscriber_count().await, 20);
    sleep(Duration::from_millis(4500)).await;

    let started = Instant::now();
    registry.stop().await;
    assert!(started.elapsed() <= interval * 2);
    assert_eq!(registry.producer_tasks(), 0);

    for mut stream in streams {
        let closed = timeout(SECOND, async {
            while stream.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok(), "stream {} never closed", stream.id());
    }

    let err = registry
        .subscribe(ctx, "r1", "eth0", interval)
        .await
        .unwrap_err();
    assert_eq!(err, TelemetryError::ShuttingDown);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_skip_ticks_and_recover() {
    let port = MockPort::failing_on_even_calls();
    let registry = registry_with("r1", port.clone());
    let mut stream = registry
        .subscribe(CancellationToken::new(), "r1", "eth1", SECOND)
        .await
        .unwrap();

    // ticks at 0..=5s -> calls 1..=6
    sleep(Duration::from_millis(5500)).await;
    let mut seen = Vec::new();
    while let Some(sample) = stream.try_recv() {
        seen.push(sample.tx_bytes);
    }
    assert_eq!(seen, vec![1, 3, 5]);
    assert_eq!(registry.active_sessions().await, 1);
    let key = SessionKey::new("r1", "eth1");
    assert_eq!(registry.metrics().sample_errors(&key, "transport"), 3);

    port.set_fail_even_calls(false);
    sleep(Duration::from_secs(3)).await;
    let mut recovered = Vec::new();
    while let Some(sample) = stream.try_recv() {
        recovered.push(sample.tx_bytes);
    }
    assert_eq!(recovered, vec![7, 8, 9]);
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn missing_interface_keeps_session_alive() {
    let port = MockPort::counting();
    port.set_empty(true);
    let registry = registry_with("r1", port.clone());
    let mut stream = registry
        .subscribe(CancellationToken::new(), "r1", "*99", SECOND)
        .await
        .unwrap();

    sleep(Duration::from_millis(2500)).await;
    assert!(stream.try_recv().is_none());
    let key = SessionKey::new("r1", "*99");
    assert_eq!(registry.metrics().sample_errors(&key, "not_found"), 3);

    port.set_empty(false);
    sleep(SECOND).await;
    assert!(stream.try_recv().is_some());
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stalled_fetch_times_out_and_session_survives() {
    let port = MockPort::counting();
    port.set_stalled(true);
    let registry = registry_with("r1", port.clone());
    let key = SessionKey::new("r1", "eth1");
    let mut stream = registry
        .subscribe(CancellationToken::new(), "r1", "eth1", SECOND)
        .await
        .unwrap();

    // first fetch hangs until the 5s fetch timeout
    sleep(Duration::from_millis(5500)).await;
    assert_eq!(registry.metrics().sample_errors(&key, "transport"), 1);
    assert_eq!(registry.active_sessions().await, 1);
    assert!(stream.try_recv().is_none());

    // the call started at 5s still hangs; the one after its timeout answers
    port.set_stalled(false);
    sleep(Duration::from_secs(6)).await;
    assert_eq!(registry.metrics().sample_errors(&key, "transport"), 2);
    assert!(stream.try_recv().is_some());

    // stop abandons a hung fetch instead of waiting out its timeout
    port.set_stalled(true);
    sleep(SECOND).await;
    let started = Instant::now();
    registry.stop().await;
    assert!(started.elapsed() < SECOND, "stop waited {:?}", started.elapsed());
    while stream.recv().await.is_some() {}
    assert_eq!(registry.producer_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn ended_sessions_leave_no_metric_series() {
    let registry = registry_with("r1", MockPort::counting());
    let mut streams = Vec::new();
    for i in 0..100 {
        let iface = format!("*{i:X}");
        streams.push(registry.subscribe(CancellationToken::new(), "r1", &iface, SECOND).await.unwrap());
    }

    sleep(Duration::from_millis(1500)).await;
    let text = registry.metrics().encode_metrics().await.unwrap();
    assert!(text.contains("mikrotik_telemetry_samples_total{router=\"r1\""));

    drop(streams);
    settle().await;
    assert_eq!(registry.producer_tasks(), 0);

    let text = registry.metrics().encode_metrics().await.unwrap();
    assert!(!text.contains("router=\"r1\""), "{text}");
    registry.stop().await;
}

// --- invariants ---

#[tokio::test(start_paused = true)]
async fn producers_match_sessions() {
    let registry = registry_with("r1", MockPort::counting());
    let ctx = CancellationToken::new();

    let a = registry.subscribe(ctx.clone(), "r1", "eth1", SECOND).await.unwrap();
    let b = registry.subscribe(ctx.clone(), "r1", "eth2", SECOND).await.unwrap();
    let _c = registry.subscribe(ctx.clone(), "r1", "eth2", SECOND).await.unwrap();
    assert_eq!(registry.active_sessions().await, 2);
    assert_eq!(registry.producer_tasks(), 2);

    drop(a);
    drop(b);
    settle().await;
    assert_eq!(registry.active_sessions().await, 1);
    assert_eq!(registry.producer_tasks(), 1);

    registry.stop().await;
    assert_eq!(registry.active_sessions().await, 0);
    assert_eq!(registry.producer_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn resubscribe_after_last_detach_starts_fresh_session() {
    let port = MockPort::counting();
    let registry = registry_with("r1", port.clone());
    let key = SessionKey::new("r1", "eth1");

    let first = registry
        .subscribe(CancellationToken::new(), "r1", "eth1", Duration::from_secs(2))
        .await
        .unwrap();
    drop(first);
    settle().await;
    assert_eq!(registry.active_sessions().await, 0);

    let mut second = registry
        .subscribe(CancellationToken::new(), "r1", "eth1", Duration::from_secs(7))
        .await
        .unwrap();
    assert_eq!(registry.active_sessions().await, 1);
    assert_eq!(registry.producer_tasks(), 1);
    // new session, new interval
    assert_eq!(registry.session_interval(&key).await, Some(Duration::from_secs(7)));
    assert!(second.recv().await.is_some());
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn late_subscriber_sees_ordered_suffix() {
    let registry = registry_with("r1", MockPort::counting());
    let ctx = CancellationToken::new();

    let mut early = registry.subscribe(ctx.clone(), "r1", "eth1", SECOND).await.unwrap();
    sleep(Duration::from_millis(2500)).await;
    let mut late = registry.subscribe(ctx.clone(), "r1", "eth1", SECOND).await.unwrap();
    sleep(Duration::from_secs(3)).await;
    registry.stop().await;

    let mut early_seen = Vec::new();
    while let Some(s) = early.recv().await {
        early_seen.push(s.tx_bytes);
    }
    let mut late_seen = Vec::new();
    while let Some(s) = late.recv().await {
        late_seen.push(s.tx_bytes);
    }

    assert_eq!(early_seen, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(late_seen, vec![4, 5, 6]);
}

// --- laws and boundaries ---

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent() {
    let registry = registry_with("r1", MockPort::counting());
    let mut stream = registry
        .subscribe(CancellationToken::new(), "r1", "eth1", SECOND)
        .await
        .unwrap();

    registry.stop().await;
    registry.stop().await;

    while stream.recv().await.is_some() {}
    assert_eq!(registry.active_sessions().await, 0);
    assert_eq!(registry.metrics().subscribers(), 0);
    assert!(registry.is_stopped().await);
}

#[tokio::test(start_paused = true)]
async fn detach_is_idempotent() {
    let registry = registry_with("r1", MockPort::counting());
    let ctx = CancellationToken::new();
    let stream = registry.subscribe(ctx.clone(), "r1", "eth1", SECOND).await.unwrap();
    let _other = registry
        .subscribe(CancellationToken::new(), "r1", "eth1", SECOND)
        .await
        .unwrap();

    // context cancelled and stream dropped: both detach paths fire
    ctx.cancel();
    ctx.cancel();
    drop(stream);
    settle().await;

    assert_eq!(registry.subscriber_count().await, 1);
    assert_eq!(registry.metrics().subscribers(), 1);
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn interval_is_clamped_to_bounds() {
    let registry = registry_with("r1", MockPort::counting());
    let ctx = CancellationToken::new();

    let _a = registry.subscribe(ctx.clone(), "r1", "zero", Duration::ZERO).await.unwrap();
    let _b = registry
        .subscribe(ctx.clone(), "r1", "hour", Duration::from_secs(3600))
        .await
        .unwrap();
    let _c = registry
        .subscribe(ctx.clone(), "r1", "mid", Duration::from_secs(12))
        .await
        .unwrap();

    let interval = |iface: &str| {
        let registry = registry.clone();
        let key = SessionKey::new("r1", iface);
        async move { registry.session_interval(&key).await }
    };
    assert_eq!(interval("zero").await, Some(SECOND));
    assert_eq!(interval("hour").await, Some(Duration::from_secs(30)));
    assert_eq!(interval("mid").await, Some(Duration::from_secs(12)));
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn thousand_subscribe_cycles_leave_nothing_behind() {
    let registry = registry_with("r1", MockPort::counting());

    for _ in 0..1000 {
        let ctx = CancellationToken::new();
        let stream = registry.subscribe(ctx.clone(), "r1", "eth1", SECOND).await.unwrap();
        ctx.cancel();
        drop(stream);
    }
    settle().await;

    assert_eq!(registry.active_sessions().await, 0);
    assert_eq!(registry.subscriber_count().await, 0);
    assert_eq!(registry.producer_tasks(), 0);
    assert_eq!(registry.metrics().subscribers(), 0);
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unread_queue_caps_at_capacity() {
    let registry = registry_with("r1", MockPort::counting());
    let stream = registry
        .subscribe(CancellationToken::new(), "r1", "eth1", SECOND)
        .await
        .unwrap();

    sleep(Duration::from_millis(15_500)).await;
    assert_eq!(stream.buffered(), 10);

    let key = SessionKey::new("r1", "eth1");
    assert_eq!(registry.metrics().samples_dropped(&key), 6);
    registry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_router_never_delivers() {
    let sampler = Sampler::new(RouterPorts::new(), Duration::from_secs(5));
    let registry = SubscriptionRegistry::new(sampler, PollingSettings::default());
    let mut stream = registry
        .subscribe(CancellationToken::new(), "ghost", "eth1", SECOND)
        .await
        .unwrap();

    sleep(Duration::from_millis(2500)).await;
    assert!(stream.try_recv().is_none());
    assert_eq!(registry.active_sessions().await, 1);
    registry.stop().await;
    assert!(stream.recv().await.is_none());
}

// --- concurrency ---

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscribe_cancel_and_drop_leave_nothing_behind() {
    let registry = registry_with("r1", MockPort::counting());

    let mut workers = Vec::new();
    for worker in 0..8usize {
        let registry = registry.clone();
        workers.push(tokio::spawn(async move {
            for round in 0..50usize {
                let iface = format!("eth{}", (worker + round) % 3);
                let ctx = CancellationToken::new();
                let stream = registry.subscribe(ctx.clone(), "r1", &iface, SECOND).await.unwrap();
                tokio::task::yield_now().await;
                match round % 3 {
                    0 => {
                        ctx.cancel();
                        tokio::task::yield_now().await;
                        drop(stream);
                    }
                    1 => drop(stream),
                    _ => {
                        drop(stream);
                        ctx.cancel();
                    }
                }
            }
        }));
    }
    for worker in workers {
        worker.await.unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(2);
    while (registry.active_sessions().await > 0 || registry.producer_tasks() > 0)
        && Instant::now() < deadline
    {
        sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(registry.active_sessions().await, 0);
    assert_eq!(registry.producer_tasks(), 0);
    assert_eq!(registry.subscriber_count().await, 0);
    assert_eq!(registry.metrics().subscribers(), 0);
    assert_eq!(registry.metrics().active_sessions(), 0);
    registry.stop().await;
}
