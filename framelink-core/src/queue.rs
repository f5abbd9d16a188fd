//! Bounded outbound packet queue.
//!
//! Capacity is fixed at construction; a full queue rejects new packets
//! instead of growing or blocking. The default pop order is
//! last-in-first-out: the most recently queued packet leaves first.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::LinkError;
use crate::packet::Packet;

/// Default number of packets an endpoint can hold for sending.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Which queued packet [`PacketQueue::pop`] removes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOrder {
    /// Most recently pushed first.
    #[default]
    Lifo,
    /// Oldest first.
    Fifo,
}

#[derive(Debug, Clone)]
pub struct PacketQueue {
    packets: VecDeque<Packet>,
    capacity: usize,
    order: QueueOrder,
}

impl PacketQueue {
    pub fn new(capacity: usize, order: QueueOrder) -> Self {
        Self {
            packets: VecDeque::with_capacity(capacity),
            capacity,
            order,
        }
    }

    /// Copy `packet` into the queue.
    ///
    /// Fails with [`LinkError::QueueFull`] and leaves the queue untouched
    /// when it is at capacity.
    pub fn push(&mut self, packet: &Packet) -> Result<(), LinkError> {
        if self.is_full() {
            return Err(LinkError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.packets.push_back(packet.clone());
        Ok(())
    }

    /// Remove the next packet according to the queue order.
    pub fn pop(&mut self) -> Option<Packet> {
        match self.order {
            QueueOrder::Lifo => self.packets.pop_back(),
            QueueOrder::Fifo => self.packets.pop_front(),
        }
    }

    /// Drop every queued packet.
    pub fn clear(&mut self) {
        self.packets.clear();
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.packets.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn order(&self) -> QueueOrder {
        self.order
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, QueueOrder::default())
    }
}
