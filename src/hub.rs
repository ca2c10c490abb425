//! Process-wide channel registry

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::channel::Channel;
use crate::config::ChannelConfig;
use crate::error::Result;
use crate::types::Session;

/// Owns every live [`Channel`] in the process, keyed by session id.
///
/// Construct one at application start and hand references to consumers;
/// there is no implicit global instance. Call [`ChannelHub::shutdown`]
/// during application teardown so no channel is left reconnecting behind
/// a host that is going away.
pub struct ChannelHub {
    config: ChannelConfig,
    channels: RwLock<HashMap<String, Arc<Channel>>>,
}

impl ChannelHub {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Create a channel for `session`, start connecting it, and track it.
    ///
    /// Opening a second channel for the same session id disconnects the
    /// first; a session has at most one live channel.
    pub fn open(&self, origin: &str, session: Session) -> Result<Arc<Channel>> {
        let session_id = session.session_id.clone();
        let channel = Arc::new(Channel::new(origin, session, self.config.clone())?);
        channel.connect();

        let previous = self
            .channels
            .write()
            .insert(session_id.clone(), Arc::clone(&channel));
        if let Some(previous) = previous {
            tracing::warn!(%session_id, "replacing live channel for session");
            previous.disconnect();
        }
        Ok(channel)
    }

    /// Look up the channel for a session
    pub fn get(&self, session_id: &str) -> Option<Arc<Channel>> {
        self.channels.read().get(session_id).cloned()
    }

    /// Disconnect and stop tracking the channel for `session_id`. Returns
    /// whether one existed. Call this when the hosting component unmounts.
    pub fn release(&self, session_id: &str) -> bool {
        match self.channels.write().remove(session_id) {
            Some(channel) => {
                channel.disconnect();
                true
            }
            None => false,
        }
    }

    /// Number of tracked channels
    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    /// Disconnect every channel and drop them all.
    pub fn shutdown(&self) {
        let mut channels = self.channels.write();
        for (session_id, channel) in channels.drain() {
            tracing::debug!(%session_id, "shutting down channel");
            channel.disconnect();
        }
    }
}
