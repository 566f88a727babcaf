//! An in-process `Fabric` built from one `tokio::sync::mpsc` channel per
//! rank, wired together by [`LocalCluster`]. FIFO delivery per channel is a
//! property of `mpsc` itself, which is what gives us §5's per-channel
//! ordering guarantee for free.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::trace;

use super::Fabric;
use crate::error::{Error, Result};
use crate::wire::{Message, Payload, Rank, Tag};

/// One endpoint of an in-process fabric: an owned inbound channel plus a
/// sender handle to every other rank's inbound channel.
pub struct LocalFabric {
    rank: Rank,
    size: usize,
    senders: HashMap<Rank, mpsc::UnboundedSender<Message>>,
    inbox: Mutex<mpsc::UnboundedReceiver<Message>>,
}

#[async_trait]
impl Fabric for LocalFabric {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn send(&self, dest: Rank, tag: Tag, payload: Payload) -> Result<()> {
        trace!(from = self.rank, to = dest, %tag, "fabric send");
        let sender = self
            .senders
            .get(&dest)
            .ok_or(Error::FabricClosed(dest))?;
        sender
            .send(Message::new(self.rank, tag, payload))
            .map_err(|_| Error::FabricClosed(dest))
    }

    async fn recv(&self) -> Result<Message> {
        let mut inbox = self.inbox.lock().await;
        let msg = inbox.recv().await.ok_or(Error::FabricClosed(self.rank))?;
        trace!(at = self.rank, from = msg.source, tag = %msg.tag, "fabric recv");
        Ok(msg)
    }
}

/// Spawns and wires the channels for a Director plus `shard_count` Shards,
/// handing back one [`LocalFabric`] per rank in rank order (index 0 is the
/// Director's). This is the crate's stand-in for the rank-assigning
/// bootstrap the distilled spec places out of scope.
pub struct LocalCluster;

impl LocalCluster {
    pub fn build(shard_count: usize) -> Vec<LocalFabric> {
        let size = shard_count + 1;
        let mut senders: HashMap<Rank, mpsc::UnboundedSender<Message>> = HashMap::new();
        let mut inboxes: HashMap<Rank, mpsc::UnboundedReceiver<Message>> = HashMap::new();

        for rank in 0..size as Rank {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(rank, tx);
            inboxes.insert(rank, rx);
        }

        (0..size as Rank)
            .map(|rank| LocalFabric {
                rank,
                size,
                senders: senders.clone(),
                inbox: Mutex::new(inboxes.remove(&rank).expect("inbox built above")),
            })
            .collect()
    }
}
