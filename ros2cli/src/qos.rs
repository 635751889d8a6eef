//! `--qos-*` options shared by the verbs that subscribe.

use crate::error::Result;
use clap::{Args, builder::PossibleValuesParser};
use ros2cli_core::{
    DurabilityPolicy, HistoryPolicy, LivelinessPolicy, Profile, QosOverrides, ReliabilityPolicy,
    qos::{QosChoice, choose_qos, qos_profile_from_short_keys},
};

/// QoS preset and per-policy overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct QosArgs {
    /// Quality of service preset profile (default depends on the verb)
    #[arg(
        long,
        value_name = "PROFILE",
        value_parser = PossibleValuesParser::new(Profile::PRESET_SHORT_KEYS.iter().copied())
    )]
    pub qos_profile: Option<String>,

    /// Queue size setting (overrides depth of the profile)
    #[arg(long, value_name = "N")]
    pub qos_depth: Option<usize>,

    /// History of samples setting: system_default, keep_last, keep_all
    #[arg(long, value_name = "POLICY")]
    pub qos_history: Option<HistoryPolicy>,

    /// Reliability setting: system_default, reliable, best_effort, best_available
    #[arg(long, value_name = "POLICY")]
    pub qos_reliability: Option<ReliabilityPolicy>,

    /// Durability setting: system_default, transient_local, volatile, best_available
    #[arg(long, value_name = "POLICY")]
    pub qos_durability: Option<DurabilityPolicy>,

    /// Liveliness setting: system_default, automatic, manual_by_topic, best_available
    #[arg(long, value_name = "POLICY")]
    pub qos_liveliness: Option<LivelinessPolicy>,

    /// Liveliness lease duration in seconds
    #[arg(long, value_name = "SECONDS")]
    pub qos_liveliness_lease_duration_seconds: Option<f64>,
}

impl QosArgs {
    /// Policies given explicitly.
    pub fn overrides(&self) -> QosOverrides {
        QosOverrides {
            history: self.qos_history,
            depth: self.qos_depth,
            reliability: self.qos_reliability,
            durability: self.qos_durability,
            liveliness: self.qos_liveliness,
            liveliness_lease_duration_s: self.qos_liveliness_lease_duration_seconds,
        }
    }

    /// Preset short key, `default` when not given.
    pub fn preset<'a>(&'a self, default: &'a str) -> &'a str {
        self.qos_profile.as_deref().unwrap_or(default)
    }

    /// The preset with the overrides applied, ignoring the publishers.
    pub fn profile(&self, default_preset: &str) -> Result<Profile> {
        Ok(qos_profile_from_short_keys(
            self.preset(default_preset),
            &self.overrides(),
        )?)
    }

    /// Subscription profile adapted to the publishers' QoS, with the
    /// notices to show when they disagree.
    pub fn choose(&self, default_preset: &str, publishers: &[Profile]) -> Result<QosChoice> {
        Ok(choose_qos(
            self.preset(default_preset),
            &self.overrides(),
            publishers,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{FromArgMatches, Parser};

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        qos: QosArgs,
    }

    #[test]
    fn test_parse_short_keys() {
        let cli = Cli::try_parse_from([
            "test",
            "--qos-profile",
            "sensor_data",
            "--qos-reliability",
            "reliable",
            "--qos-depth",
            "3",
        ])
        .unwrap();
        let profile = cli.qos.profile("default").unwrap();
        assert_eq!(profile.reliability, ReliabilityPolicy::Reliable);
        assert_eq!(profile.depth, 3);
        assert!(cli.qos.overrides().any());
    }

    #[test]
    fn test_unknown_short_key_is_rejected() {
        assert!(Cli::try_parse_from(["test", "--qos-durability", "forever"]).is_err());
        assert!(Cli::try_parse_from(["test", "--qos-profile", "nope"]).is_err());
    }

    #[test]
    fn test_default_preset_adapts_to_publishers() {
        let matches = <Cli as clap::CommandFactory>::command().get_matches_from(["test"]);
        let cli = Cli::from_arg_matches(&matches).unwrap();
        let choice = cli
            .qos
            .choose("sensor_data", &[Profile::default(), Profile::default()])
            .unwrap();
        assert_eq!(choice.profile.reliability, ReliabilityPolicy::Reliable);
        assert!(choice.notices.is_empty());
    }
}
