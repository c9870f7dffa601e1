//! The four uniform channel adapters (§4.4). Each turns a
//! `NormalizedRequest` into a provider call and a uniform `AdapterResult`.

pub mod email;
pub mod in_app;
pub mod push;
pub mod sms;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use notification_common::enums::Channel;
use notification_common::notification::{AdapterResult, NormalizedRequest};

/// Capability every channel adapter implements (§4.4).
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    async fn send(&self, request: &NormalizedRequest) -> AdapterResult;
}

/// Adapters keyed by channel, so `ChannelRouter` doesn't hard-wire four call
/// sites (§9 cyclic-dependency note).
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<Channel, Arc<dyn ChannelAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        AdapterRegistry {
            adapters: HashMap::new(),
        }
    }

    pub fn with(mut self, channel: Channel, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.adapters.insert(channel, adapter);
        self
    }

    pub fn get(&self, channel: Channel) -> Option<&Arc<dyn ChannelAdapter>> {
        self.adapters.get(&channel)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
