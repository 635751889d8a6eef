//! `ros2 interface`: browse the message, service and action definitions
//! installed in the ament index.

use crate::{
    ament::AmentIndex,
    cli::CliContext,
    error::{Error, Result},
    extension::{COMMAND_GROUP, EntryPoint, Registry, Verb, VerbCommand, verb},
};
use clap::Args;
use ros2msg::{Constant, Field, ParseResult, Type};
use std::{collections::BTreeMap, fs};

/// Extension point of the interface verbs.
pub const VERB_GROUP: &str = "ros2interface.verb";

/// Resource type listing the interfaces of a package.
pub const INTERFACES_RESOURCE: &str = "rosidl_interfaces";

/// Separates request, response and feedback sections.
const SECTION_SEPARATOR: &str = "---";

/// Nesting beyond this depth means a recursive definition.
const MAX_DEPTH: usize = 32;

pub(crate) fn register(registry: &mut Registry) {
    registry.add_extension_point(VERB_GROUP, "Extension point for 'interface' verb extensions");
    registry.add(EntryPoint::new(
        COMMAND_GROUP,
        "interface",
        "Show information about ROS interfaces",
        || Ok(VerbCommand::plugin("interface", VERB_GROUP)),
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "list",
        "List all interface types available",
        verb::<ListVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "packages",
        "Output a list of packages that provide interfaces",
        verb::<PackagesVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "package",
        "Output a list of available interface types within one package",
        verb::<PackageVerb>,
    ));
    registry.add(EntryPoint::new(
        VERB_GROUP,
        "show",
        "Output the interface definition",
        verb::<ShowVerb>,
    ));
}

/// The three kinds of interface definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Kind {
    /// `msg`
    Message,
    /// `srv`
    Service,
    /// `action`
    Action,
}

impl Kind {
    const ALL: [Self; 3] = [Self::Message, Self::Service, Self::Action];

    /// Directory and file extension of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "msg",
            Self::Service => "srv",
            Self::Action => "action",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Message => "Messages",
            Self::Service => "Services",
            Self::Action => "Actions",
        }
    }

    fn from_dir(dir: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == dir)
    }
}

/// Interface names (`kind/Name`) of every package, read from the
/// `rosidl_interfaces` resources. Both the `.idl` and the source file of a
/// definition are listed there; they collapse into one name.
pub(crate) fn all_interfaces(index: &AmentIndex) -> BTreeMap<String, Vec<(Kind, String)>> {
    let mut packages = BTreeMap::new();
    for package in index.resources(INTERFACES_RESOURCE).into_keys() {
        let Some((content, _)) = index.resource(INTERFACES_RESOURCE, &package) else {
            continue;
        };
        packages.insert(package, parse_resource(&content));
    }
    packages
}

fn parse_resource(content: &str) -> Vec<(Kind, String)> {
    let mut interfaces: Vec<(Kind, String)> = content
        .lines()
        .filter_map(|line| {
            let (dir, file) = line.trim().split_once('/')?;
            let kind = Kind::from_dir(dir)?;
            let name = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
            (!name.is_empty()).then(|| (kind, name.to_string()))
        })
        .collect();
    interfaces.sort();
    interfaces.dedup();
    interfaces
}

/// `-m`/`-s`/`-a` selection; none given means every kind.
#[derive(Debug, Args)]
#[group(multiple = false)]
pub(crate) struct KindArgs {
    /// Print out only the messages
    #[arg(short = 'm', long = "only-msgs")]
    only_msgs: bool,

    /// Print out only the services
    #[arg(short = 's', long = "only-srvs")]
    only_srvs: bool,

    /// Print out only the actions
    #[arg(short = 'a', long = "only-actions")]
    only_actions: bool,
}

impl KindArgs {
    fn kinds(&self) -> Vec<Kind> {
        let selected: Vec<Kind> = [
            (self.only_msgs, Kind::Message),
            (self.only_srvs, Kind::Service),
            (self.only_actions, Kind::Action),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .collect();
        if selected.is_empty() {
            Kind::ALL.to_vec()
        } else {
            selected
        }
    }
}

/// Lines of `ros2 interface list`.
pub(crate) fn list_lines(
    interfaces: &BTreeMap<String, Vec<(Kind, String)>>,
    kinds: &[Kind],
) -> Vec<String> {
    let mut out = Vec::new();
    for kind in kinds {
        out.push(format!("{}:", kind.title()));
        for (package, names) in interfaces {
            for (_, name) in names.iter().filter(|(k, _)| k == kind) {
                out.push(format!("    {package}/{}/{name}", kind.as_str()));
            }
        }
    }
    out
}

#[derive(Debug, Args)]
pub(crate) struct ListArgs {
    #[command(flatten)]
    kinds: KindArgs,
}

#[derive(Default)]
pub(crate) struct ListVerb;

impl Verb for ListVerb {
    type Args = ListArgs;

    fn main(&self, _cli: &CliContext, args: ListArgs) -> Result<()> {
        let interfaces = all_interfaces(&AmentIndex::from_env()?);
        for line in list_lines(&interfaces, &args.kinds.kinds()) {
            println!("{line}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct PackagesArgs {
    #[command(flatten)]
    kinds: KindArgs,
}

#[derive(Default)]
pub(crate) struct PackagesVerb;

/// Packages providing at least one interface of `kinds`.
pub(crate) fn packages_with(
    interfaces: &BTreeMap<String, Vec<(Kind, String)>>,
    kinds: &[Kind],
) -> Vec<String> {
    interfaces
        .iter()
        .filter(|(_, names)| names.iter().any(|(k, _)| kinds.contains(k)))
        .map(|(package, _)| package.clone())
        .collect()
}

impl Verb for PackagesVerb {
    type Args = PackagesArgs;

    fn main(&self, _cli: &CliContext, args: PackagesArgs) -> Result<()> {
        let interfaces = all_interfaces(&AmentIndex::from_env()?);
        for package in packages_with(&interfaces, &args.kinds.kinds()) {
            println!("{package}");
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub(crate) struct PackageArgs {
    /// Package name
    package_name: String,
}

#[derive(Default)]
pub(crate) struct PackageVerb;

impl Verb for PackageVerb {
    type Args = PackageArgs;

    fn main(&self, _cli: &CliContext, args: PackageArgs) -> Result<()> {
        let index = AmentIndex::from_env()?;
        let Some((content, _)) = index.resource(INTERFACES_RESOURCE, &args.package_name) else {
            return Err(Error::command(format!(
                "Unknown package '{}'",
                args.package_name
            )));
        };
        for (kind, name) in parse_resource(&content) {
            println!("{}/{}/{name}", args.package_name, kind.as_str());
        }
        Ok(())
    }
}

/// How comments are rendered by `show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comments {
    /// Comments of the requested type only
    TopLevel,
    /// Comments of nested types too
    All,
    /// No comments at all
    None,
}

/// A fully qualified interface type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InterfaceType {
    package: String,
    kind: Kind,
    name: String,
}

impl InterfaceType {
    /// Parse `pkg/kind/Name`, or `pkg/Name` with the kind looked up in the index.
    pub(crate) fn parse(text: &str, index: &AmentIndex) -> Result<Self> {
        let unknown = || Error::command(format!("Could not find the interface '{text}'"));
        let parts: Vec<&str> = text.split('/').collect();
        match parts.as_slice() {
            [package, kind, name] => Ok(Self {
                package: package.to_string(),
                kind: Kind::from_dir(kind).ok_or_else(unknown)?,
                name: name.to_string(),
            }),
            [package, name] => {
                let (content, _) = index
                    .resource(INTERFACES_RESOURCE, package)
                    .ok_or_else(unknown)?;
                let (kind, _) = parse_resource(&content)
                    .into_iter()
                    .find(|(_, n)| n == name)
                    .ok_or_else(unknown)?;
                Ok(Self {
                    package: package.to_string(),
                    kind,
                    name: name.to_string(),
                })
            }
            _ => Err(unknown()),
        }
    }

    fn message(package: &str, name: &str) -> Self {
        Self {
            package: package.to_string(),
            kind: Kind::Message,
            name: name.to_string(),
        }
    }

    fn definition(&self, index: &AmentIndex) -> Result<String> {
        let path = index
            .package_share_directory(&self.package)
            .map(|share| {
                share
                    .join(self.kind.as_str())
                    .join(format!("{}.{}", self.name, self.kind.as_str()))
            })
            .ok_or_else(|| Error::command(format!("Unknown package '{}'", self.package)))?;
        fs::read_to_string(&path).map_err(|_| {
            Error::command(format!(
                "Could not find the interface '{}'",
                path.display()
            ))
        })
    }
}

/// Byte offset of the `#` opening a comment. A `#` inside a string
/// literal does not count.
fn comment_start(line: &str) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;
    for (pos, c) in line.char_indices() {
        match (quote, c) {
            _ if escaped => escaped = false,
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') => return Some(pos),
            _ => {}
        }
    }
    None
}

/// Parse the code part of a definition line. Returns the field it declares;
/// constants, separators and annotations declare none.
fn parse_code(code: &str, package: &str) -> ParseResult<Option<Field>> {
    if code.is_empty() || code == SECTION_SEPARATOR || code.starts_with('@') {
        return Ok(None);
    }
    let (type_string, rest) = code.split_once(char::is_whitespace).unwrap_or((code, ""));
    let rest = rest.trim_start();
    let name_end = rest
        .find(|c: char| c.is_whitespace() || c == '=')
        .unwrap_or(rest.len());
    let (name, tail) = rest.split_at(name_end);
    if let Some(value) = tail.trim_start().strip_prefix('=') {
        Constant::new(type_string, name, value.trim())?;
        return Ok(None);
    }
    let type_string = match type_string {
        "Header" => "std_msgs/Header".to_string(),
        other => other.replacen("/msg/", "/", 1),
    };
    let default = Some(tail.trim()).filter(|d| !d.is_empty());
    Field::new(Type::new(&type_string, Some(package))?, name, default).map(Some)
}

/// Message type a field refers to, if it is not a primitive.
fn nested_type(field: &Field) -> Option<InterfaceType> {
    let base = &field.field_type.base_type;
    let package = base.pkg_name.as_deref()?;
    Some(InterfaceType::message(package, &base.type_name))
}

fn expand(
    index: &AmentIndex,
    ty: &InterfaceType,
    text: &str,
    depth: usize,
    comments: Comments,
    out: &mut Vec<String>,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::command(format!(
            "Interface '{}/{}/{}' nests too deeply",
            ty.package,
            ty.kind.as_str(),
            ty.name
        )));
    }
    let keep_comments = match comments {
        Comments::All => true,
        Comments::TopLevel => depth == 0,
        Comments::None => false,
    };
    let indent = "\t".repeat(depth);
    for (number, line) in text.lines().enumerate() {
        let line = line.trim_end();
        let (code, has_comment) = match comment_start(line) {
            Some(pos) => (line[..pos].trim_end(), true),
            None => (line, false),
        };
        let field = parse_code(code.trim(), &ty.package).map_err(|err| {
            Error::command(format!(
                "Invalid interface '{}/{}/{}', line {}: {err}",
                ty.package,
                ty.kind.as_str(),
                ty.name,
                number + 1
            ))
        })?;
        let blank = code.trim().is_empty();
        if !keep_comments && blank && (has_comment || depth > 0 || comments == Comments::None) {
            continue;
        }
        let shown = if keep_comments { line } else { code };
        out.push(format!("{indent}{shown}"));
        if let Some(nested) = field.as_ref().and_then(nested_type) {
            let definition = nested.definition(index)?;
            expand(index, &nested, &definition, depth + 1, comments, out)?;
        }
    }
    Ok(())
}

/// Lines of `ros2 interface show`.
pub(crate) fn show_lines(
    index: &AmentIndex,
    ty: &InterfaceType,
    comments: Comments,
) -> Result<Vec<String>> {
    let definition = ty.definition(index)?;
    let mut out = Vec::new();
    expand(index, ty, &definition, 0, comments, &mut out)?;
    Ok(out)
}

#[derive(Debug, Args)]
pub(crate) struct ShowArgs {
    /// Show an interface definition (e.g. "example_interfaces/msg/String")
    type_name: String,

    /// Show all comments, including for nested interface definitions
    #[arg(long, conflicts_with = "no_comments")]
    all_comments: bool,

    /// Show no comments or whitespace
    #[arg(long)]
    no_comments: bool,
}

#[derive(Default)]
pub(crate) struct ShowVerb;

impl Verb for ShowVerb {
    type Args = ShowArgs;

    fn main(&self, _cli: &CliContext, args: ShowArgs) -> Result<()> {
        let index = AmentIndex::from_env()?;
        let ty = InterfaceType::parse(&args.type_name, &index)?;
        let comments = if args.all_comments {
            Comments::All
        } else if args.no_comments {
            Comments::None
        } else {
            Comments::TopLevel
        };
        for line in show_lines(&index, &ty, comments)? {
            println!("{line}");
        }
        Ok(())
    }
}
