use std::collections::{BTreeMap, VecDeque};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Topic {
    Feed,
    Consent,
    Storage,
    Money,
    Inventory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Notice {
    FeedPerformed { amount: i32 },
    ConsentChanged { enabled: bool },
    StorageCleared,
    MoneyChanged { money: u64 },
    InventoryChanged,
}

impl Notice {
    pub(crate) fn topic(&self) -> Topic {
        match self {
            Notice::FeedPerformed { .. } => Topic::Feed,
            Notice::ConsentChanged { .. } => Topic::Consent,
            Notice::StorageCleared => Topic::Storage,
            Notice::MoneyChanged { .. } => Topic::Money,
            Notice::InventoryChanged => Topic::Inventory,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct SubscriptionId(u64);

struct Subscriber {
    topics: Vec<Topic>,
    queue: VecDeque<Notice>,
}

/// Single-threaded publish/subscribe. Each subscriber owns a queue that it
/// drains from the frame loop.
#[derive(Default)]
pub(crate) struct Bus {
    next_id: u64,
    subs: BTreeMap<SubscriptionId, Subscriber>,
}

impl Bus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&mut self, topics: &[Topic]) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subs.insert(
            id,
            Subscriber {
                topics: topics.to_vec(),
                queue: VecDeque::new(),
            },
        );
        id
    }

    /// Returns false when `id` was not subscribed.
    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subs.remove(&id).is_some()
    }

    pub(crate) fn publish(&mut self, notice: Notice) {
        let topic = notice.topic();
        for sub in self.subs.values_mut() {
            if sub.topics.contains(&topic) {
                sub.queue.push_back(notice.clone());
            }
        }
    }

    pub(crate) fn drain(&mut self, id: SubscriptionId) -> Vec<Notice> {
        match self.subs.get_mut(&id) {
            Some(sub) => sub.queue.drain(..).collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_topic() {
        let mut bus = Bus::new();
        let pet = bus.subscribe(&[Topic::Feed]);
        let shop = bus.subscribe(&[Topic::Consent, Topic::Storage]);

        bus.publish(Notice::FeedPerformed { amount: 5 });
        bus.publish(Notice::StorageCleared);
        bus.publish(Notice::ConsentChanged { enabled: false });

        assert_eq!(bus.drain(pet), vec![Notice::FeedPerformed { amount: 5 }]);
        assert_eq!(
            bus.drain(shop),
            vec![
                Notice::StorageCleared,
                Notice::ConsentChanged { enabled: false }
            ]
        );
        assert!(bus.drain(pet).is_empty());
    }

    #[test]
    fn unsubscribed_queue_is_dropped() {
        let mut bus = Bus::new();
        let id = bus.subscribe(&[Topic::Money]);
        bus.publish(Notice::MoneyChanged { money: 3 });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert!(bus.drain(id).is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
