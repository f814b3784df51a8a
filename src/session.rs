//! Connection-scoped session bookkeeping
//!
//! A [`Session`] holds the topic-id state a client accumulates over one
//! connection: the ids it may publish to (granted through Register) and the
//! ids it receives on (granted through SubAck, or bound later for wildcard
//! subscriptions). Both lists are bounded; running out of room is reported
//! as [`Error::CapacityExceeded`](crate::error::Error), never papered over.
//!
//! The session is pure bookkeeping. Only the message sequencer mutates it,
//! and only after an exchange has fully validated, so a failed exchange
//! never leaves half-updated state behind.

use crate::error::Error;
use heapless::Vec;

/// Default bound on the subscribed and publishable topic-id lists.
pub const MAX_TOPICS: usize = 10;

/// What a successful subscription turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    /// The gateway resolved the filter to a concrete topic id.
    Topic(u16),
    /// The filter contained a wildcard; ids arrive later via Register.
    Wildcard,
}

/// Per-connection topic-id state.
///
/// `N` bounds each id list independently; the default matches the classic
/// ten-topic client profile.
#[derive(Debug, Default)]
pub struct Session<const N: usize = MAX_TOPICS> {
    sub_topics: Vec<u16, N>,
    pub_topics: Vec<u16, N>,
    wildcard_subs: usize,
    /// The single currently bound wildcard-resolved id. The model tracks
    /// one active binding even when several wildcard subscriptions exist;
    /// a new Register from the gateway replaces it.
    wildcard_topic: Option<u16>,
}

impl<const N: usize> Session<N> {
    /// Create an empty session.
    pub fn new() -> Self {
        Self {
            sub_topics: Vec::new(),
            pub_topics: Vec::new(),
            wildcard_subs: 0,
            wildcard_topic: None,
        }
    }

    /// Record a topic id granted for publishing by a RegAck.
    pub fn record_publish_topic(&mut self, topic_id: u16) -> Result<(), Error> {
        self.pub_topics
            .push(topic_id)
            .map_err(|_| Error::CapacityExceeded)
    }

    /// Record the outcome of a SubAck. Topic id 0 is the wildcard sentinel.
    pub fn record_subscription(&mut self, topic_id: u16) -> Result<Subscription, Error> {
        if topic_id == 0 {
            self.wildcard_subs += 1;
            Ok(Subscription::Wildcard)
        } else {
            self.sub_topics
                .push(topic_id)
                .map_err(|_| Error::CapacityExceeded)?;
            Ok(Subscription::Topic(topic_id))
        }
    }

    /// Bind the active wildcard-resolved topic id, replacing any previous
    /// binding. Only meaningful while a wildcard subscription exists.
    pub fn bind_wildcard(&mut self, topic_id: u16) {
        self.wildcard_topic = Some(topic_id);
    }

    /// Whether an inbound Publish with this topic id should be accepted.
    pub fn is_subscribed_to(&self, topic_id: u16) -> bool {
        self.sub_topics.contains(&topic_id) || self.wildcard_topic == Some(topic_id)
    }

    /// Whether this id was granted for publishing.
    pub fn may_publish_to(&self, topic_id: u16) -> bool {
        self.pub_topics.contains(&topic_id)
    }

    /// Ids granted for publishing, in registration order.
    pub fn publish_topics(&self) -> &[u16] {
        &self.pub_topics
    }

    /// Ids subscribed to, excluding wildcard subscriptions.
    pub fn subscribed_topics(&self) -> &[u16] {
        &self.sub_topics
    }

    /// Number of non-wildcard subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.sub_topics.len()
    }

    /// Number of wildcard subscriptions.
    pub fn wildcard_count(&self) -> usize {
        self.wildcard_subs
    }

    /// Whether at least one wildcard subscription is active.
    pub fn has_wildcard(&self) -> bool {
        self.wildcard_subs > 0
    }

    /// Room left on the publish-id list.
    pub fn publish_capacity_left(&self) -> usize {
        N - self.pub_topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_list_reports_capacity() {
        let mut session: Session<3> = Session::new();
        for id in 1..=3 {
            session.record_publish_topic(id).unwrap();
        }
        assert_eq!(
            session.record_publish_topic(4),
            Err(Error::CapacityExceeded)
        );
        assert_eq!(session.publish_topics(), &[1, 2, 3]);
    }

    #[test]
    fn subscribe_list_reports_capacity() {
        let mut session: Session<2> = Session::new();
        assert_eq!(
            session.record_subscription(5),
            Ok(Subscription::Topic(5))
        );
        session.record_subscription(6).unwrap();
        assert_eq!(
            session.record_subscription(7),
            Err(Error::CapacityExceeded)
        );
        assert_eq!(session.subscription_count(), 2);
    }

    #[test]
    fn wildcard_sentinel_does_not_consume_list_space() {
        let mut session: Session<1> = Session::new();
        session.record_subscription(9).unwrap();
        assert_eq!(
            session.record_subscription(0),
            Ok(Subscription::Wildcard)
        );
        assert!(session.has_wildcard());
        assert_eq!(session.wildcard_count(), 1);
        assert_eq!(session.subscription_count(), 1);
    }

    #[test]
    fn membership_follows_recorded_subscriptions() {
        let mut session: Session = Session::new();
        assert!(!session.is_subscribed_to(7));
        session.record_subscription(7).unwrap();
        assert!(session.is_subscribed_to(7));
        assert!(!session.is_subscribed_to(8));
    }

    #[test]
    fn wildcard_binding_extends_membership() {
        let mut session: Session = Session::new();
        session.record_subscription(0).unwrap();
        assert!(!session.is_subscribed_to(42));
        session.bind_wildcard(42);
        assert!(session.is_subscribed_to(42));
        // A fresh binding replaces the previous one.
        session.bind_wildcard(43);
        assert!(!session.is_subscribed_to(42));
        assert!(session.is_subscribed_to(43));
    }

    #[test]
    fn publish_and_subscribe_lists_stay_disjoint() {
        let mut session: Session = Session::new();
        session.record_publish_topic(7).unwrap();
        assert!(!session.is_subscribed_to(7));
        assert!(session.may_publish_to(7));
        session.record_subscription(8).unwrap();
        assert!(!session.may_publish_to(8));
    }
}
