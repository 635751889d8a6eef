//! `ros2 action echo`: print the introspection traffic of an action.
//!
//! Goal, result and feedback bodies depend on the action type and are shown
//! as hex; the headers every action shares are decoded.

use super::action_types;
use crate::{
    cli::CliContext,
    commands::finish,
    error::{Error, Result},
    extension::Verb,
    qos::QosArgs,
};
use clap::Args;
use ros2cli_core::{Profile, graph::ACTION_INFIX, names::absolute_topic_name};
use ros2cli_zenoh::{
    CallbackSubscription, Context, RawSample,
    cdr::{CdrDecode, CdrReader},
    msgs::action::{FeedbackHeader, GoalStatusArray, ServiceEventInfo, Uuid, goal_status_name},
};
use std::{fmt::Write as _, str::FromStr};

const DEFAULT_TRUNCATE_LENGTH: usize = 128;
const OUTPUT_QUEUE_SIZE: usize = 100;

/// The parts of an action that can be echoed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ActionInterface {
    GoalService,
    CancelService,
    ResultService,
    FeedbackTopic,
    StatusTopic,
}

impl ActionInterface {
    const ALL: [Self; 5] = [
        Self::GoalService,
        Self::CancelService,
        Self::ResultService,
        Self::FeedbackTopic,
        Self::StatusTopic,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::GoalService => "GOAL_SERVICE",
            Self::CancelService => "CANCEL_SERVICE",
            Self::ResultService => "RESULT_SERVICE",
            Self::FeedbackTopic => "FEEDBACK_TOPIC",
            Self::StatusTopic => "STATUS_TOPIC",
        }
    }

    /// Topic carrying this interface for `action`.
    fn topic(self, action: &str) -> String {
        let suffix = match self {
            Self::GoalService => "send_goal/_service_event",
            Self::CancelService => "cancel_goal/_service_event",
            Self::ResultService => "get_result/_service_event",
            Self::FeedbackTopic => "feedback",
            Self::StatusTopic => "status",
        };
        format!("{action}{ACTION_INFIX}{suffix}")
    }
}

impl FromStr for ActionInterface {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        let upper = s.to_uppercase();
        Self::ALL
            .into_iter()
            .find(|interface| interface.as_str() == upper)
            .ok_or(())
    }
}

/// Parse the `--interfaces` option: names separated by `|`, every interface
/// when absent.
pub(crate) fn parse_interfaces(option: Option<&str>) -> Result<Vec<ActionInterface>> {
    let Some(option) = option else {
        return Ok(ActionInterface::ALL.to_vec());
    };
    if option.is_empty() {
        return Err(Error::command("Input action interface name is empty."));
    }
    let mut interfaces = Vec::new();
    for name in option.split('|').map(str::trim) {
        let interface = name
            .parse::<ActionInterface>()
            .map_err(|()| Error::command(format!("\"{name}\" is incorrect interface name.")))?;
        interfaces.push(interface);
    }
    interfaces.sort();
    interfaces.dedup();
    Ok(interfaces)
}

fn is_action_type(ty: &str) -> bool {
    let parts: Vec<&str> = ty.split('/').collect();
    matches!(parts.as_slice(), [package, "action", name] if !package.is_empty() && !name.is_empty())
}

/// Echo a action.
#[derive(Debug, Args)]
pub(crate) struct EchoArgs {
    /// Name of the ROS action to echo (e.g. '/fibonacci')
    action_name: String,

    /// Type of the ROS action (e.g. 'example_interfaces/action/Fibonacci')
    action_type: Option<String>,

    /// Specify a action interfaces list are output. "|" is used as a
    /// delimiter for multiple action interfaces. Action interfaces include
    /// "GOAL_SERVICE", "CANCEL_SERVICE", "RESULT_SERVICE", "FEEDBACK_TOPIC"
    /// and "STATUS_TOPIC". If this option is not set, output messages from
    /// all interfaces of the action.
    #[arg(short, long, value_name = "interfaces_name_list")]
    interfaces: Option<String>,

    /// Output all bytes of payloads longer than '--truncate-length'
    #[arg(short, long)]
    full_length: bool,

    /// The length to truncate payloads to
    #[arg(short = 'l', long, default_value_t = DEFAULT_TRUNCATE_LENGTH)]
    truncate_length: usize,

    #[command(flatten)]
    qos: QosArgs,
}

fn hex(bytes: &[u8], truncate: Option<usize>) -> String {
    let shown = truncate.map_or(bytes, |n| &bytes[..bytes.len().min(n)]);
    let mut out = String::with_capacity(shown.len() * 2 + 3);
    for byte in shown {
        let _ = write!(out, "{byte:02x}");
    }
    if shown.len() < bytes.len() {
        out.push_str("...");
    }
    out
}

fn push_payload(out: &mut String, rest: &[u8], truncate: Option<usize>) {
    if !rest.is_empty() {
        let _ = writeln!(out, "payload: {}", hex(rest, truncate));
    }
}

/// Render one sample the way `ros2 action echo` prints it.
pub(crate) fn render(
    interface: ActionInterface,
    payload: &[u8],
    truncate: Option<usize>,
) -> Result<String> {
    let mut out = format!("interface: {}\n", interface.as_str());
    let mut reader = CdrReader::new(payload)?;
    match interface {
        ActionInterface::GoalService
        | ActionInterface::CancelService
        | ActionInterface::ResultService => {
            let info = ServiceEventInfo::decode(&mut reader)?;
            let _ = write!(
                out,
                "info:\n  event_type: {}\n  stamp:\n    sec: {}\n    nanosec: {}\n  \
                 client_gid: {}\n  sequence_number: {}\n",
                info.event_type,
                info.stamp.sec,
                info.stamp.nanosec,
                Uuid(&info.client_gid),
                info.sequence_number
            );
            push_payload(&mut out, reader.remaining(), truncate);
        }
        ActionInterface::FeedbackTopic => {
            let header = FeedbackHeader::decode(&mut reader)?;
            let _ = writeln!(out, "goal_id:\n  uuid: {}", Uuid(&header.goal_id));
            push_payload(&mut out, reader.remaining(), truncate);
        }
        ActionInterface::StatusTopic => {
            let status = GoalStatusArray::decode(&mut reader)?;
            if status.status_list.is_empty() {
                out.push_str("status_list: []\n");
            } else {
                out.push_str("status_list:\n");
            }
            for goal in &status.status_list {
                let _ = write!(
                    out,
                    "- goal_info:\n    goal_id:\n      uuid: {}\n    stamp:\n      sec: {}\n      \
                     nanosec: {}\n  status: {}\n",
                    Uuid(&goal.goal_id),
                    goal.stamp.sec,
                    goal.stamp.nanosec,
                    goal_status_name(goal.status)
                );
            }
        }
    }
    out.push_str("---");
    Ok(out)
}

#[derive(Default)]
pub(crate) struct EchoVerb;

fn resolve_action(context_types: Vec<String>, args: &EchoArgs) -> Result<()> {
    match &args.action_type {
        Some(ty) if !is_action_type(ty) => Err(Error::command(format!(
            "The service type '{ty}' is invalid"
        ))),
        Some(_) => Ok(()),
        None if context_types.is_empty() => Err(Error::command(format!(
            "The action name '{}' is invalid",
            args.action_name
        ))),
        None => Ok(()),
    }
}

async fn echo(context: &Context, args: &EchoArgs, interfaces: &[ActionInterface]) -> Result<()> {
    let action = absolute_topic_name(&args.action_name);
    if args.action_type.is_none() {
        let graph = context.graph().await?;
        resolve_action(action_types(&graph, &action), args)?;
    } else {
        resolve_action(Vec::new(), args)?;
    }

    let truncate = (!args.full_length).then_some(args.truncate_length);
    let service_events = args.qos.profile("services_default")?;
    let (sender, receiver) = flume::bounded::<String>(OUTPUT_QUEUE_SIZE);

    let mut subscriptions = Vec::new();
    for interface in interfaces.iter().copied() {
        let qos = match interface {
            ActionInterface::FeedbackTopic => Profile::default(),
            ActionInterface::StatusTopic => Profile::action_status_default(),
            _ => service_events.clone(),
        };
        let sender = sender.clone();
        let callback = move |sample: RawSample| {
            let text = match render(interface, &sample.payload, truncate) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(%err, topic = %sample.topic, "cannot decode sample");
                    return;
                }
            };
            if sender.try_send(text).is_err() {
                println!(
                    "Output message is full! Please increase the queue size of output message"
                );
            }
        };
        subscriptions.push(CallbackSubscription::new(
            context,
            &interface.topic(&action),
            &qos,
            callback,
        )?);
    }
    drop(sender);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                return Ok(());
            }
            message = receiver.recv_async() => match message {
                Ok(text) => println!("{text}"),
                Err(_) => return Ok(()),
            },
        }
    }
}

impl Verb for EchoVerb {
    type Args = EchoArgs;

    fn main(&self, cli: &CliContext, args: EchoArgs) -> Result<()> {
        let interfaces = parse_interfaces(args.interfaces.as_deref())?;
        cli.block_on(async {
            let context = cli.connect().await?;
            let result = echo(&context, &args, &interfaces).await;
            finish(context, result).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ros2cli_zenoh::cdr::CdrWriter;

    #[test]
    fn test_parse_interfaces() {
        assert_eq!(parse_interfaces(None).unwrap().len(), 5);
        assert_eq!(
            parse_interfaces(Some("status_topic| GOAL_SERVICE|goal_service")).unwrap(),
            [ActionInterface::GoalService, ActionInterface::StatusTopic]
        );
        assert_eq!(
            parse_interfaces(Some("")).unwrap_err().to_string(),
            "Input action interface name is empty."
        );
        assert_eq!(
            parse_interfaces(Some("GOAL_SERVICE|bogus")).unwrap_err().to_string(),
            "\"bogus\" is incorrect interface name."
        );
    }

    #[test]
    fn test_interface_topics() {
        assert_eq!(
            ActionInterface::GoalService.topic("/fibonacci"),
            "/fibonacci/_action/send_goal/_service_event"
        );
        assert_eq!(
            ActionInterface::StatusTopic.topic("/fibonacci"),
            "/fibonacci/_action/status"
        );
    }

    #[test]
    fn test_action_type_validation() {
        assert!(is_action_type("example_interfaces/action/Fibonacci"));
        assert!(!is_action_type("example_interfaces/srv/AddTwoInts"));
        assert!(!is_action_type("Fibonacci"));
    }

    #[test]
    fn test_render_service_event() {
        let mut w = CdrWriter::new();
        w.write_u8(0);
        w.write_i32(1);
        w.write_u32(2);
        for _ in 0..16 {
            w.write_u8(0);
        }
        w.write_i64(7);
        w.write_u32(0xdead_beef);
        let text = render(ActionInterface::GoalService, &w.finish(), Some(2)).unwrap();
        assert!(text.starts_with("interface: GOAL_SERVICE\ninfo:\n  event_type: REQUEST_SENT\n"));
        assert!(text.contains("  sequence_number: 7\n"));
        assert!(text.contains("payload: efbe...\n"));
        assert!(text.ends_with("---"));
    }

    #[test]
    fn test_render_status() {
        let mut w = CdrWriter::new();
        w.write_u32(1);
        for _ in 0..16 {
            w.write_u8(1);
        }
        w.write_i32(3);
        w.write_u32(0);
        w.write_i8(4);
        let text = render(ActionInterface::StatusTopic, &w.finish(), None).unwrap();
        assert!(text.contains("status_list:\n- goal_info:\n"));
        assert!(text.contains("  status: SUCCEEDED\n"));

        let mut w = CdrWriter::new();
        w.write_u32(0);
        let text = render(ActionInterface::StatusTopic, &w.finish(), None).unwrap();
        assert_eq!(text, "interface: STATUS_TOPIC\nstatus_list: []\n---");
    }

    #[test]
    fn test_render_rejects_garbage() {
        assert!(render(ActionInterface::FeedbackTopic, &[1], None).is_err());
    }
}
