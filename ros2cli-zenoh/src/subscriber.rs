//! Raw topic subscriber.
//!
//! Receives serialized messages from every publisher of a topic, whatever
//! their type, and hands them over with their arrival time. Used by the
//! verbs that only need payload sizes and timing (`bw`, `hz`) or that print
//! opaque payloads (`action echo`).
//!
//! # Reference
//!
//! See [rmw_zenoh design - Subscriptions](https://github.com/ros2/rmw_zenoh/blob/rolling/docs/design.md#subscriptions)

use crate::{attachment::Attachment, context::Context, error::Result};
use ros2cli_core::{DurabilityPolicy, HistoryPolicy, Profile, keyexpr::topic_wildcard_keyexpr};
use std::time::Instant;
use zenoh::Wait;
use zenoh_ext::AdvancedSubscriberBuilderExt;

/// A message as received, before any deserialization.
#[derive(Debug, Clone)]
pub struct RawSample {
    /// Topic the sample arrived on
    pub topic: String,
    /// Local arrival time
    pub received_at: Instant,
    /// CDR payload including the encapsulation header
    pub payload: Vec<u8>,
    /// Publisher attachment, when present and valid
    pub attachment: Option<Attachment>,
}

/// History depth for a QoS: the depth for keep last, unbounded for keep all.
fn effective_depth(qos: &Profile) -> Option<usize> {
    match qos.history {
        HistoryPolicy::KeepAll => None,
        _ => Some(qos.depth.max(1)),
    }
}

/// Keeps a callback subscription alive; dropping it undeclares the subscriber.
pub struct CallbackSubscription {
    _zenoh_subscriber: zenoh_ext::AdvancedSubscriber<()>,
}

impl CallbackSubscription {
    /// Subscribe to `topic` (fully qualified) and run `callback` on the
    /// Zenoh thread for every sample.
    ///
    /// Transient local subscriptions query publisher caches for up to
    /// `depth` historical samples.
    pub fn new<F>(context: &Context, topic: &str, qos: &Profile, callback: F) -> Result<Self>
    where
        F: Fn(RawSample) + Send + Sync + 'static,
    {
        let key_expr = topic_wildcard_keyexpr(context.domain_id(), topic);
        let history_depth = if qos.durability == DurabilityPolicy::TransientLocal {
            effective_depth(qos).unwrap_or(usize::MAX)
        } else {
            0
        };

        let sample_topic = topic.to_string();
        let zenoh_subscriber = context
            .session()
            .declare_subscriber(&key_expr)
            .callback(move |sample: zenoh::sample::Sample| {
                callback(RawSample {
                    topic: sample_topic.clone(),
                    received_at: Instant::now(),
                    payload: sample.payload().to_bytes().to_vec(),
                    attachment: sample
                        .attachment()
                        .and_then(|bytes| Attachment::from_bytes(&bytes.to_bytes()).ok()),
                });
            })
            .history(zenoh_ext::HistoryConfig::default().max_samples(history_depth))
            .wait()?;
        tracing::debug!(topic, key_expr, history_depth, "raw subscriber declared");

        Ok(Self {
            _zenoh_subscriber: zenoh_subscriber,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_depth() {
        assert_eq!(effective_depth(&Profile::sensor_data()), Some(5));
        assert_eq!(effective_depth(&Profile::system_default()), Some(1));
        let keep_all = Profile {
            history: HistoryPolicy::KeepAll,
            ..Default::default()
        };
        assert_eq!(effective_depth(&keep_all), None);
    }
}
