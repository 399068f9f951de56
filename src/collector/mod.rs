// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Watch collector
//!
//! Subscribes to every configured watch and feeds the samples into the
//! interface counters of the metrics registry.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{PollingSettings, WatchConfig};
use crate::telemetry::SubscriptionRegistry;

/// Starts one consumer task per watch entry
///
/// Each task ends when `shutdown` fires or the registry closes its stream.
pub fn start_collection(
    registry: &SubscriptionRegistry,
    watches: &[WatchConfig],
    polling: &PollingSettings,
    shutdown: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    tracing::info!("Starting collection for {} watch(es)", watches.len());

    watches
        .iter()
        .map(|watch| {
            let registry = registry.clone();
            let ctx = shutdown.child_token();
            let watch = watch.clone();
            let interval = watch.interval(polling);

            tokio::spawn(async move {
                let mut stream = match registry
                    .subscribe(ctx, &watch.router, &watch.interface, interval)
                    .await
                {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::warn!(
                            "Cannot watch {}:{}: {}",
                            watch.router,
                            watch.interface,
                            e
                        );
                        return;
                    }
                };

                let key = stream.key().clone();
                tracing::debug!("Watching {} every {:?}", key, interval);
                while let Some(sample) = stream.recv().await {
                    registry.metrics().update_interface(&key, &sample).await;
                }
                registry.metrics().forget_interface(&key).await;
                tracing::debug!("Stopped watching {}", key);
            })
        })
        .collect()
}
