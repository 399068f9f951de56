// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Label types for Prometheus metrics

use prometheus_client::encoding::EncodeLabelSet;

use crate::telemetry::SessionKey;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct InterfaceLabels {
    pub router: String,
    pub interface: String,
}

impl From<&SessionKey> for InterfaceLabels {
    fn from(key: &SessionKey) -> Self {
        Self {
            router: key.router_id.clone(),
            interface: key.interface_id.clone(),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SampleErrorLabels {
    pub router: String,
    pub interface: String,
    pub kind: String,
}
