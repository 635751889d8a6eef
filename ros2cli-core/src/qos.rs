//! Quality of Service (QoS) policies, presets and command-line short keys.
//!
//! Every verb that creates an endpoint (`topic bw`, `topic hz`, `action echo`)
//! accepts the same family of `--qos-*` options. They are resolved here so the
//! verbs only deal with a finished [`Profile`].

use crate::error::{Error, Result};
use std::{fmt, str::FromStr, time::Duration};

/// QoS history policy - how samples are stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HistoryPolicy {
    /// Implementation default for history policy.
    SystemDefault,

    /// Only store up to a maximum number of samples, dropping oldest once max is exceeded.
    KeepLast,

    /// Store all samples, subject to resource limits.
    KeepAll,

    /// History policy has not yet been set.
    Unknown,
}

/// QoS reliability policy - how messages are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliabilityPolicy {
    /// Implementation specific default.
    SystemDefault,

    /// Guarantee that samples are delivered, may retry multiple times.
    Reliable,

    /// Attempt to deliver samples, but some may be lost if the network is not robust.
    BestEffort,

    /// Reliability policy has not yet been set.
    Unknown,

    /// Match the majority of endpoints while keeping the highest level possible.
    BestAvailable,
}

/// QoS durability policy - how samples persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityPolicy {
    /// Implementation specific default.
    SystemDefault,

    /// The publisher is responsible for persisting samples for "late-joining" subscribers.
    TransientLocal,

    /// Samples are not persistent.
    Volatile,

    /// Durability policy has not yet been set.
    Unknown,

    /// Match the majority of endpoints while keeping the highest level possible.
    BestAvailable,
}

/// QoS liveliness policy - a publisher's reporting policy for its alive status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivelinessPolicy {
    /// Implementation specific default.
    SystemDefault,

    /// The signal that establishes a topic is alive comes from the ROS layer.
    Automatic,

    /// The signal that establishes a topic is alive is at the topic level.
    ManualByTopic,

    /// Liveliness policy has not yet been set.
    Unknown,

    /// Match the majority of endpoints while keeping the highest level possible.
    BestAvailable,
}

macro_rules! short_keys {
    ($ty:ident, $policy:literal, { $($variant:ident => $key:literal, $display:literal),+ $(,)? }) => {
        impl $ty {
            /// Short keys accepted on the command line.
            pub const SHORT_KEYS: &'static [&'static str] = &[$($key),+];

            /// Short key for this policy value.
            pub fn short_key(&self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                    #[allow(unreachable_patterns)]
                    _ => "unknown",
                }
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($key => Ok(Self::$variant),)+
                    _ => Err(Error::UnknownShortKey {
                        policy: $policy,
                        key: s.to_string(),
                        expected: Self::SHORT_KEYS.join(", "),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($display),)+
                    #[allow(unreachable_patterns)]
                    _ => f.write_str("UNKNOWN"),
                }
            }
        }
    };
}

short_keys!(HistoryPolicy, "history", {
    SystemDefault => "system_default", "SYSTEM_DEFAULT",
    KeepLast => "keep_last", "KEEP_LAST",
    KeepAll => "keep_all", "KEEP_ALL",
});

short_keys!(ReliabilityPolicy, "reliability", {
    SystemDefault => "system_default", "SYSTEM_DEFAULT",
    Reliable => "reliable", "RELIABLE",
    BestEffort => "best_effort", "BEST_EFFORT",
    BestAvailable => "best_available", "BEST_AVAILABLE",
});

short_keys!(DurabilityPolicy, "durability", {
    SystemDefault => "system_default", "SYSTEM_DEFAULT",
    TransientLocal => "transient_local", "TRANSIENT_LOCAL",
    Volatile => "volatile", "VOLATILE",
    BestAvailable => "best_available", "BEST_AVAILABLE",
});

short_keys!(LivelinessPolicy, "liveliness", {
    SystemDefault => "system_default", "SYSTEM_DEFAULT",
    Automatic => "automatic", "AUTOMATIC",
    ManualByTopic => "manual_by_topic", "MANUAL_BY_TOPIC",
    BestAvailable => "best_available", "BEST_AVAILABLE",
});

/// Represents a QoS profile.
///
/// Durations of zero mean "unspecified", which the middleware treats as infinite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Keep last: only store up to N samples, configurable via the queue depth option.
    /// Keep all: store all samples, subject to the configured resource limits.
    pub history: HistoryPolicy,

    /// Size of the message queue.
    pub depth: usize,

    /// Reliability QoS policy setting.
    pub reliability: ReliabilityPolicy,

    /// Durability QoS policy setting.
    pub durability: DurabilityPolicy,

    /// The period at which messages are expected to be sent/received.
    pub deadline: Duration,

    /// The age at which messages are considered expired and no longer valid.
    pub lifespan: Duration,

    /// Liveliness QoS policy setting.
    pub liveliness: LivelinessPolicy,

    /// The time within which the node or publisher must show that it is alive.
    pub liveliness_lease_duration: Duration,
}

impl Default for Profile {
    /// Default QoS profile: keep last 10, reliable, volatile.
    fn default() -> Self {
        Self {
            history: HistoryPolicy::KeepLast,
            depth: 10,
            reliability: ReliabilityPolicy::Reliable,
            durability: DurabilityPolicy::Volatile,
            deadline: Duration::ZERO,
            lifespan: Duration::ZERO,
            liveliness: LivelinessPolicy::SystemDefault,
            liveliness_lease_duration: Duration::ZERO,
        }
    }
}

impl Profile {
    /// Short keys of the preset profiles.
    pub const PRESET_SHORT_KEYS: &'static [&'static str] = &[
        "default",
        "system_default",
        "sensor_data",
        "services_default",
        "parameters",
        "parameter_events",
        "action_status_default",
        "best_available",
    ];

    /// Everything left to the middleware.
    pub const fn system_default() -> Self {
        Self {
            history: HistoryPolicy::SystemDefault,
            depth: 0,
            reliability: ReliabilityPolicy::SystemDefault,
            durability: DurabilityPolicy::SystemDefault,
            deadline: Duration::ZERO,
            lifespan: Duration::ZERO,
            liveliness: LivelinessPolicy::SystemDefault,
            liveliness_lease_duration: Duration::ZERO,
        }
    }

    /// Sensor data: keep last 5, best effort, volatile.
    pub const fn sensor_data() -> Self {
        Self {
            depth: 5,
            reliability: ReliabilityPolicy::BestEffort,
            ..Self::keep_last_reliable(5)
        }
    }

    /// Services: keep last 10, reliable, volatile.
    pub const fn services_default() -> Self {
        Self::keep_last_reliable(10)
    }

    /// Parameters: keep last 1000, reliable, volatile.
    pub const fn parameters() -> Self {
        Self::keep_last_reliable(1000)
    }

    /// Parameter events: keep last 1000, reliable, volatile.
    pub const fn parameter_events() -> Self {
        Self::keep_last_reliable(1000)
    }

    /// Action status: keep last 1, reliable, transient local.
    pub const fn action_status_default() -> Self {
        Self {
            durability: DurabilityPolicy::TransientLocal,
            ..Self::keep_last_reliable(1)
        }
    }

    /// Best available: adapt reliability, durability and liveliness to the publishers.
    pub const fn best_available() -> Self {
        Self {
            reliability: ReliabilityPolicy::BestAvailable,
            durability: DurabilityPolicy::BestAvailable,
            liveliness: LivelinessPolicy::BestAvailable,
            ..Self::keep_last_reliable(10)
        }
    }

    const fn keep_last_reliable(depth: usize) -> Self {
        Self {
            history: HistoryPolicy::KeepLast,
            depth,
            reliability: ReliabilityPolicy::Reliable,
            durability: DurabilityPolicy::Volatile,
            deadline: Duration::ZERO,
            lifespan: Duration::ZERO,
            liveliness: LivelinessPolicy::SystemDefault,
            liveliness_lease_duration: Duration::ZERO,
        }
    }

    /// Look up a preset by its short key.
    pub fn from_short_key(key: &str) -> Result<Self> {
        match key {
            "default" => Ok(Self::default()),
            "system_default" => Ok(Self::system_default()),
            "sensor_data" => Ok(Self::sensor_data()),
            "services_default" => Ok(Self::services_default()),
            "parameters" => Ok(Self::parameters()),
            "parameter_events" => Ok(Self::parameter_events()),
            "action_status_default" => Ok(Self::action_status_default()),
            "best_available" => Ok(Self::best_available()),
            _ => Err(Error::UnknownShortKey {
                policy: "profile",
                key: key.to_string(),
                expected: Self::PRESET_SHORT_KEYS.join(", "),
            }),
        }
    }

    /// Apply command-line overrides on top of this profile.
    ///
    /// A transient local profile never keeps a depth of zero: late joiners
    /// would receive nothing.
    pub fn configure(&mut self, overrides: &QosOverrides) {
        if let Some(history) = overrides.history {
            self.history = history;
        }
        if let Some(durability) = overrides.durability {
            self.durability = durability;
        }
        if let Some(reliability) = overrides.reliability {
            self.reliability = reliability;
        }
        if let Some(liveliness) = overrides.liveliness {
            self.liveliness = liveliness;
        }
        if let Some(lease) = overrides.liveliness_lease_duration_s.filter(|s| *s >= 0.0) {
            self.liveliness_lease_duration = Duration::from_secs_f64(lease);
        }
        match overrides.depth {
            Some(depth) => self.depth = depth,
            None => {
                if self.durability == DurabilityPolicy::TransientLocal && self.depth == 0 {
                    self.depth = 1;
                }
            }
        }
    }
}

/// Format a QoS duration the way `ros2 topic info -v` does.
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        "Infinite".to_string()
    } else {
        format!("{} nanoseconds", duration.as_nanos())
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "QoS profile:")?;
        writeln!(f, "  Reliability: {}", self.reliability)?;
        writeln!(f, "  History (Depth): {} ({})", self.history, self.depth)?;
        writeln!(f, "  Durability: {}", self.durability)?;
        writeln!(f, "  Lifespan: {}", format_duration(self.lifespan))?;
        writeln!(f, "  Deadline: {}", format_duration(self.deadline))?;
        writeln!(f, "  Liveliness: {}", self.liveliness)?;
        write!(
            f,
            "  Liveliness lease duration: {}",
            format_duration(self.liveliness_lease_duration)
        )
    }
}

/// Per-policy overrides given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QosOverrides {
    /// `--qos-history`
    pub history: Option<HistoryPolicy>,
    /// `--qos-depth`
    pub depth: Option<usize>,
    /// `--qos-reliability`
    pub reliability: Option<ReliabilityPolicy>,
    /// `--qos-durability`
    pub durability: Option<DurabilityPolicy>,
    /// `--qos-liveliness`
    pub liveliness: Option<LivelinessPolicy>,
    /// `--qos-liveliness-lease-duration-seconds`
    pub liveliness_lease_duration_s: Option<f64>,
}

impl QosOverrides {
    /// True when at least one policy was overridden explicitly.
    pub fn any(&self) -> bool {
        self.history.is_some()
            || self.depth.is_some()
            || self.reliability.is_some()
            || self.durability.is_some()
            || self.liveliness.is_some()
            || self.liveliness_lease_duration_s.is_some()
    }
}

/// Build a profile from a preset short key and optional overrides.
pub fn qos_profile_from_short_keys(preset: &str, overrides: &QosOverrides) -> Result<Profile> {
    let mut profile = Profile::from_short_key(preset)?;
    profile.configure(overrides);
    Ok(profile)
}

/// Outcome of [`choose_qos`]: the profile to subscribe with, plus the notices
/// to show the user when publishers disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct QosChoice {
    /// Profile to use for the subscription
    pub profile: Profile,
    /// Human readable notices about fallbacks
    pub notices: Vec<String>,
}

/// Choose the QoS profile for subscribing to a topic.
///
/// Explicit overrides always win. Otherwise the preset is adapted to the
/// publishers currently on the topic: reliable only when every publisher is
/// reliable, transient local only when every publisher is transient local.
pub fn choose_qos(
    preset: &str,
    overrides: &QosOverrides,
    publishers: &[Profile],
) -> Result<QosChoice> {
    if overrides.any() {
        return Ok(QosChoice {
            profile: qos_profile_from_short_keys(preset, overrides)?,
            notices: Vec::new(),
        });
    }

    let mut profile = Profile::from_short_key(preset)?;
    let mut notices = Vec::new();
    if publishers.is_empty() {
        return Ok(QosChoice { profile, notices });
    }

    let reliable = publishers
        .iter()
        .filter(|p| p.reliability == ReliabilityPolicy::Reliable)
        .count();
    let transient_local = publishers
        .iter()
        .filter(|p| p.durability == DurabilityPolicy::TransientLocal)
        .count();

    if reliable == publishers.len() {
        profile.reliability = ReliabilityPolicy::Reliable;
    } else {
        if reliable > 0 {
            notices.push(
                "Some, but not all, publishers are offering QoSReliabilityPolicy.RELIABLE. \
                 Falling back to QoSReliabilityPolicy.BEST_EFFORT as it will connect to all publishers"
                    .to_string(),
            );
        }
        profile.reliability = ReliabilityPolicy::BestEffort;
    }

    if transient_local == publishers.len() {
        profile.durability = DurabilityPolicy::TransientLocal;
    } else {
        if transient_local > 0 {
            notices.push(
                "Some, but not all, publishers are offering QoSDurabilityPolicy.TRANSIENT_LOCAL. \
                 Falling back to QoSDurabilityPolicy.VOLATILE as it will connect to all publishers"
                    .to_string(),
            );
        }
        profile.durability = DurabilityPolicy::Volatile;
    }

    Ok(QosChoice { profile, notices })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publisher(reliability: ReliabilityPolicy, durability: DurabilityPolicy) -> Profile {
        Profile {
            reliability,
            durability,
            ..Default::default()
        }
    }

    #[test]
    fn test_short_keys_parse() {
        assert_eq!(
            "keep_all".parse::<HistoryPolicy>().unwrap(),
            HistoryPolicy::KeepAll
        );
        assert_eq!(
            "best_effort".parse::<ReliabilityPolicy>().unwrap(),
            ReliabilityPolicy::BestEffort
        );
        assert_eq!(
            "transient_local".parse::<DurabilityPolicy>().unwrap(),
            DurabilityPolicy::TransientLocal
        );
        assert!(matches!(
            "sometimes".parse::<ReliabilityPolicy>(),
            Err(Error::UnknownShortKey { policy: "reliability", .. })
        ));
    }

    #[test]
    fn test_short_key_display_roundtrip() {
        for key in LivelinessPolicy::SHORT_KEYS {
            let policy: LivelinessPolicy = key.parse().unwrap();
            assert_eq!(policy.short_key(), *key);
        }
        assert_eq!(ReliabilityPolicy::BestEffort.to_string(), "BEST_EFFORT");
    }

    #[test]
    fn test_presets() {
        assert_eq!(Profile::from_short_key("sensor_data").unwrap().depth, 5);
        assert_eq!(
            Profile::from_short_key("sensor_data").unwrap().reliability,
            ReliabilityPolicy::BestEffort
        );
        assert_eq!(
            Profile::from_short_key("action_status_default")
                .unwrap()
                .durability,
            DurabilityPolicy::TransientLocal
        );
        assert!(Profile::from_short_key("nope").is_err());
        for key in Profile::PRESET_SHORT_KEYS {
            assert!(Profile::from_short_key(key).is_ok(), "{key}");
        }
    }

    #[test]
    fn test_configure_transient_local_depth() {
        let mut profile = Profile::system_default();
        profile.configure(&QosOverrides {
            durability: Some(DurabilityPolicy::TransientLocal),
            ..Default::default()
        });
        assert_eq!(profile.depth, 1);

        let mut profile = Profile::system_default();
        profile.configure(&QosOverrides {
            durability: Some(DurabilityPolicy::TransientLocal),
            depth: Some(7),
            ..Default::default()
        });
        assert_eq!(profile.depth, 7);
    }

    #[test]
    fn test_configure_liveliness_lease() {
        let mut profile = Profile::default();
        profile.configure(&QosOverrides {
            liveliness_lease_duration_s: Some(1.5),
            ..Default::default()
        });
        assert_eq!(profile.liveliness_lease_duration, Duration::from_millis(1500));

        profile.configure(&QosOverrides {
            liveliness_lease_duration_s: Some(-1.0),
            ..Default::default()
        });
        assert_eq!(profile.liveliness_lease_duration, Duration::from_millis(1500));
    }

    #[test]
    fn test_choose_qos_overrides_win() {
        let overrides = QosOverrides {
            reliability: Some(ReliabilityPolicy::Reliable),
            ..Default::default()
        };
        let publishers = [publisher(
            ReliabilityPolicy::BestEffort,
            DurabilityPolicy::Volatile,
        )];
        let choice = choose_qos("sensor_data", &overrides, &publishers).unwrap();
        assert_eq!(choice.profile.reliability, ReliabilityPolicy::Reliable);
        assert!(choice.notices.is_empty());
    }

    #[test]
    fn test_choose_qos_no_publishers_keeps_preset() {
        let choice = choose_qos("sensor_data", &QosOverrides::default(), &[]).unwrap();
        assert_eq!(choice.profile, Profile::sensor_data());
    }

    #[test]
    fn test_choose_qos_all_reliable_transient_local() {
        let publishers = [
            publisher(ReliabilityPolicy::Reliable, DurabilityPolicy::TransientLocal),
            publisher(ReliabilityPolicy::Reliable, DurabilityPolicy::TransientLocal),
        ];
        let choice = choose_qos("sensor_data", &QosOverrides::default(), &publishers).unwrap();
        assert_eq!(choice.profile.reliability, ReliabilityPolicy::Reliable);
        assert_eq!(choice.profile.durability, DurabilityPolicy::TransientLocal);
        assert!(choice.notices.is_empty());
    }

    #[test]
    fn test_choose_qos_mixed_falls_back() {
        let publishers = [
            publisher(ReliabilityPolicy::Reliable, DurabilityPolicy::TransientLocal),
            publisher(ReliabilityPolicy::BestEffort, DurabilityPolicy::Volatile),
        ];
        let choice = choose_qos("default", &QosOverrides::default(), &publishers).unwrap();
        assert_eq!(choice.profile.reliability, ReliabilityPolicy::BestEffort);
        assert_eq!(choice.profile.durability, DurabilityPolicy::Volatile);
        assert_eq!(choice.notices.len(), 2);
    }

    #[test]
    fn test_profile_display() {
        let text = Profile::default().to_string();
        assert!(text.contains("Reliability: RELIABLE"));
        assert!(text.contains("History (Depth): KEEP_LAST (10)"));
        assert!(text.contains("Lifespan: Infinite"));
    }
}
