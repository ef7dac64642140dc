//! What a region publishes to its neighbors each round

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use types::RegionIdentifier;

use crate::rcdiff::RcDiffMessage;

/// Iteration of a message that has not been produced by any round yet
pub const NO_ITERATION: i32 = -1;

/// Messages addressed to individual receivers, stamped with the sender and
/// the round that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiverMessage {
    pub sender: Option<RegionIdentifier>,
    pub iteration: i32,
    receivers: BTreeMap<RegionIdentifier, RcDiffMessage>,
}

impl Default for ReceiverMessage {
    fn default() -> Self {
        Self {
            sender: None,
            iteration: NO_ITERATION,
            receivers: BTreeMap::new(),
        }
    }
}

impl ReceiverMessage {
    pub fn new(sender: RegionIdentifier, iteration: i32) -> Self {
        Self {
            sender: Some(sender),
            iteration,
            receivers: BTreeMap::new(),
        }
    }

    pub fn add_message_to_receiver(&mut self, receiver: RegionIdentifier, message: RcDiffMessage) {
        self.receivers.insert(receiver, message);
    }

    pub fn message_for(&self, receiver: &RegionIdentifier) -> Option<&RcDiffMessage> {
        self.receivers.get(receiver)
    }

    pub fn message_for_or_default(&self, receiver: &RegionIdentifier) -> RcDiffMessage {
        self.message_for(receiver).cloned().unwrap_or_default()
    }

    pub fn is_sent_to(&self, receiver: &RegionIdentifier) -> bool {
        self.receivers.contains_key(receiver)
    }

    pub fn receivers(&self) -> impl Iterator<Item = &RegionIdentifier> {
        self.receivers.keys()
    }
}

/// Payload exchanged between neighboring leaders
///
/// The default value stands for "nothing received yet" and is what a
/// connection reports before its first share arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcopSharedInformation {
    pub message: ReceiverMessage,
}

impl DcopSharedInformation {
    pub fn new(message: ReceiverMessage) -> Self {
        Self { message }
    }

    pub fn iteration(&self) -> i32 {
        self.message.iteration
    }

    pub fn sender(&self) -> Option<&RegionIdentifier> {
        self.message.sender.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rcdiff::{AugmentedRoot, RcDiffLoadMap, RcDiffMessageType};

    #[test]
    fn test_default_has_no_iteration() {
        let info = DcopSharedInformation::default();
        assert_eq!(info.iteration(), NO_ITERATION);
        assert_eq!(info.sender(), None);
    }

    #[test]
    fn test_messages_per_receiver() {
        let a = RegionIdentifier::new("A");
        let b = RegionIdentifier::new("B");
        let c = RegionIdentifier::new("C");

        let message = RcDiffMessage::single(
            RcDiffMessageType::Ask,
            RcDiffLoadMap::new(AugmentedRoot::new(a.clone(), 1), 0),
        );

        let mut receiver_message = ReceiverMessage::new(a, 4);
        receiver_message.add_message_to_receiver(b.clone(), message.clone());

        assert!(receiver_message.is_sent_to(&b));
        assert!(!receiver_message.is_sent_to(&c));
        assert_eq!(receiver_message.message_for(&b), Some(&message));
        assert!(receiver_message.message_for_or_default(&c).is_empty());
        assert_eq!(receiver_message.receivers().collect::<Vec<_>>(), vec![&b]);
    }
}
