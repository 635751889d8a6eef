//! `rcl_interfaces` parameter bindings.
//!
//! [`ParameterValue`] is the Rust view of `rcl_interfaces/msg/ParameterValue`:
//! the wire message carries every field plus a type tag, the enum keeps only
//! the active one.

use super::service;
use crate::{
    cdr::{CdrDecode, CdrEncode, CdrReader, CdrWriter},
    error::Result,
};
use std::fmt;
use yaml_rust2::{Yaml, YamlLoader};

/// `rcl_interfaces/msg/ParameterType` constants.
pub mod parameter_type {
    /// Parameter is not set (also used to delete a parameter)
    pub const NOT_SET: u8 = 0;
    /// bool
    pub const BOOL: u8 = 1;
    /// int64
    pub const INTEGER: u8 = 2;
    /// float64
    pub const DOUBLE: u8 = 3;
    /// string
    pub const STRING: u8 = 4;
    /// byte[]
    pub const BYTE_ARRAY: u8 = 5;
    /// bool[]
    pub const BOOL_ARRAY: u8 = 6;
    /// int64[]
    pub const INTEGER_ARRAY: u8 = 7;
    /// float64[]
    pub const DOUBLE_ARRAY: u8 = 8;
    /// string[]
    pub const STRING_ARRAY: u8 = 9;
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParameterValue {
    /// Not set
    #[default]
    NotSet,
    /// bool
    Bool(bool),
    /// int64
    Integer(i64),
    /// float64
    Double(f64),
    /// string
    String(String),
    /// byte[]
    ByteArray(Vec<u8>),
    /// bool[]
    BoolArray(Vec<bool>),
    /// int64[]
    IntegerArray(Vec<i64>),
    /// float64[]
    DoubleArray(Vec<f64>),
    /// string[]
    StringArray(Vec<String>),
}

impl ParameterValue {
    /// `rcl_interfaces/msg/ParameterType` id of the value.
    pub fn type_id(&self) -> u8 {
        use parameter_type::*;
        match self {
            Self::NotSet => NOT_SET,
            Self::Bool(_) => BOOL,
            Self::Integer(_) => INTEGER,
            Self::Double(_) => DOUBLE,
            Self::String(_) => STRING,
            Self::ByteArray(_) => BYTE_ARRAY,
            Self::BoolArray(_) => BOOL_ARRAY,
            Self::IntegerArray(_) => INTEGER_ARRAY,
            Self::DoubleArray(_) => DOUBLE_ARRAY,
            Self::StringArray(_) => STRING_ARRAY,
        }
    }

    /// Type name as `ros2 param` prints it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NotSet => "not set",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::ByteArray(_) => "byte array",
            Self::BoolArray(_) => "boolean array",
            Self::IntegerArray(_) => "integer array",
            Self::DoubleArray(_) => "double array",
            Self::StringArray(_) => "string array",
        }
    }

    /// Parse a command-line value the way `ros2 param set` does: the text
    /// is read as YAML and falls back to a plain string when it is not a
    /// scalar or a homogeneous sequence.
    pub fn from_cli(text: &str) -> Self {
        let parsed = YamlLoader::load_from_str(text)
            .ok()
            .and_then(|docs| docs.into_iter().next())
            .and_then(|doc| Self::from_yaml(&doc));
        parsed.unwrap_or_else(|| Self::String(text.to_string()))
    }

    /// Convert a YAML node. Mixed or nested sequences and mappings yield `None`.
    pub fn from_yaml(yaml: &Yaml) -> Option<Self> {
        match yaml {
            Yaml::Boolean(b) => Some(Self::Bool(*b)),
            Yaml::Integer(i) => Some(Self::Integer(*i)),
            Yaml::Real(s) => s.parse::<f64>().ok().map(Self::Double),
            Yaml::String(s) => Some(Self::String(s.clone())),
            Yaml::Array(arr) => {
                let Some(first) = arr.first() else {
                    return Some(Self::StringArray(Vec::new()));
                };
                match first {
                    Yaml::Boolean(_) => arr
                        .iter()
                        .map(Yaml::as_bool)
                        .collect::<Option<Vec<_>>>()
                        .map(Self::BoolArray),
                    Yaml::Integer(_) => arr
                        .iter()
                        .map(Yaml::as_i64)
                        .collect::<Option<Vec<_>>>()
                        .map(Self::IntegerArray),
                    Yaml::Real(_) => arr
                        .iter()
                        .map(Yaml::as_f64)
                        .collect::<Option<Vec<_>>>()
                        .map(Self::DoubleArray),
                    Yaml::String(_) => arr
                        .iter()
                        .map(|v| v.as_str().map(String::from))
                        .collect::<Option<Vec<_>>>()
                        .map(Self::StringArray),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Convert to a YAML node for `ros2 param dump`.
    pub fn to_yaml(&self) -> Yaml {
        fn real(v: f64) -> Yaml {
            Yaml::Real(format!("{v:?}"))
        }
        match self {
            Self::NotSet => Yaml::Null,
            Self::Bool(b) => Yaml::Boolean(*b),
            Self::Integer(i) => Yaml::Integer(*i),
            Self::Double(d) => real(*d),
            Self::String(s) => Yaml::String(s.clone()),
            Self::ByteArray(v) => {
                Yaml::Array(v.iter().map(|b| Yaml::Integer(i64::from(*b))).collect())
            }
            Self::BoolArray(v) => Yaml::Array(v.iter().map(|b| Yaml::Boolean(*b)).collect()),
            Self::IntegerArray(v) => Yaml::Array(v.iter().map(|i| Yaml::Integer(*i)).collect()),
            Self::DoubleArray(v) => Yaml::Array(v.iter().map(|d| real(*d)).collect()),
            Self::StringArray(v) => {
                Yaml::Array(v.iter().map(|s| Yaml::String(s.clone())).collect())
            }
        }
    }

    /// The line `ros2 param get` prints for this value.
    pub fn describe(&self) -> String {
        match self {
            Self::NotSet => "Parameter not set.".to_string(),
            Self::Bool(_) => format!("Boolean value is: {self}"),
            Self::Integer(_) => format!("Integer value is: {self}"),
            Self::Double(_) => format!("Double value is: {self}"),
            Self::String(_) => format!("String value is: {self}"),
            Self::ByteArray(_) => format!("Byte values are: {self}"),
            Self::BoolArray(_) => format!("Boolean values are: {self}"),
            Self::IntegerArray(_) => format!("Integer values are: {self}"),
            Self::DoubleArray(_) => format!("Double values are: {self}"),
            Self::StringArray(_) => format!("String values are: {self}"),
        }
    }
}

fn py_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

fn join<T>(items: &[T], f: impl Fn(&T) -> String) -> String {
    let parts: Vec<String> = items.iter().map(f).collect();
    format!("[{}]", parts.join(", "))
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSet => Ok(()),
            Self::Bool(b) => f.write_str(py_bool(*b)),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d:?}"),
            Self::String(s) => f.write_str(s),
            Self::ByteArray(v) => f.write_str(&join(v, |b| format!("b'\\x{b:02x}'"))),
            Self::BoolArray(v) => f.write_str(&join(v, |b| py_bool(*b).to_string())),
            Self::IntegerArray(v) => f.write_str(&join(v, |i| i.to_string())),
            Self::DoubleArray(v) => f.write_str(&join(v, |d| format!("{d:?}"))),
            Self::StringArray(v) => f.write_str(&join(v, |s| format!("'{s}'"))),
        }
    }
}

impl CdrEncode for ParameterValue {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_u8(self.type_id());
        w.write_bool(matches!(self, Self::Bool(true)));
        w.write_i64(if let Self::Integer(i) = self { *i } else { 0 });
        w.write_f64(if let Self::Double(d) = self { *d } else { 0.0 });
        w.write_string(if let Self::String(s) = self { s.as_str() } else { "" });
        match self {
            Self::ByteArray(v) => w.write_bytes(v),
            _ => w.write_bytes(&[]),
        }
        match self {
            Self::BoolArray(v) => w.write_seq_with(v, |w, b| w.write_bool(*b)),
            _ => w.write_u32(0),
        }
        match self {
            Self::IntegerArray(v) => w.write_seq_with(v, |w, i| w.write_i64(*i)),
            _ => w.write_u32(0),
        }
        match self {
            Self::DoubleArray(v) => w.write_seq_with(v, |w, d| w.write_f64(*d)),
            _ => w.write_u32(0),
        }
        match self {
            Self::StringArray(v) => w.write_seq(v),
            _ => w.write_u32(0),
        }
    }
}

impl CdrDecode for ParameterValue {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        let type_id = r.read_u8()?;
        let bool_value = r.read_bool()?;
        let integer_value = r.read_i64()?;
        let double_value = r.read_f64()?;
        let string_value = r.read_string()?;
        let byte_array = r.read_bytes()?;
        let bool_array = r.read_seq_with(|r| r.read_bool())?;
        let integer_array = r.read_seq_with(|r| r.read_i64())?;
        let double_array = r.read_seq_with(|r| r.read_f64())?;
        let string_array = r.read_seq()?;

        use parameter_type::*;
        Ok(match type_id {
            BOOL => Self::Bool(bool_value),
            INTEGER => Self::Integer(integer_value),
            DOUBLE => Self::Double(double_value),
            STRING => Self::String(string_value),
            BYTE_ARRAY => Self::ByteArray(byte_array),
            BOOL_ARRAY => Self::BoolArray(bool_array),
            INTEGER_ARRAY => Self::IntegerArray(integer_array),
            DOUBLE_ARRAY => Self::DoubleArray(double_array),
            STRING_ARRAY => Self::StringArray(string_array),
            _ => Self::NotSet,
        })
    }
}

/// `rcl_interfaces/msg/Parameter`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameter {
    /// Parameter name (`.` separates nesting levels)
    pub name: String,
    /// Parameter value
    pub value: ParameterValue,
}

impl Parameter {
    /// Build a parameter.
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Parse a `name:=value` assignment as accepted by `component load -p`.
    pub fn from_assignment(assignment: &str) -> Option<Self> {
        let (name, value) = assignment.split_once(":=")?;
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, ParameterValue::from_cli(value)))
    }
}

impl CdrEncode for Parameter {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_string(&self.name);
        self.value.encode(w);
    }
}

impl CdrDecode for Parameter {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            name: r.read_string()?,
            value: ParameterValue::decode(r)?,
        })
    }
}

/// `rcl_interfaces/msg/SetParametersResult`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetParametersResult {
    /// Whether the parameter was accepted
    pub successful: bool,
    /// Reason when it was not
    pub reason: String,
}

impl CdrDecode for SetParametersResult {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            successful: r.read_bool()?,
            reason: r.read_string()?,
        })
    }
}

/// `ListParameters` request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListParametersRequest {
    /// Only list parameters under these prefixes
    pub prefixes: Vec<String>,
    /// Recursion depth, 0 means unlimited
    pub depth: u64,
}

impl CdrEncode for ListParametersRequest {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_seq(&self.prefixes);
        w.write_u64(self.depth);
    }
}

/// `ListParameters` response (`rcl_interfaces/msg/ListParametersResult`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListParametersResponse {
    /// Parameter names
    pub names: Vec<String>,
    /// Prefixes of the listed names
    pub prefixes: Vec<String>,
}

impl CdrDecode for ListParametersResponse {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            names: r.read_seq()?,
            prefixes: r.read_seq()?,
        })
    }
}

/// `GetParameters` request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetParametersRequest {
    /// Names to fetch
    pub names: Vec<String>,
}

impl CdrEncode for GetParametersRequest {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_seq(&self.names);
    }
}

/// `GetParameters` response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetParametersResponse {
    /// Values in request order; unknown names come back `NotSet`
    pub values: Vec<ParameterValue>,
}

impl CdrDecode for GetParametersResponse {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            values: r.read_seq()?,
        })
    }
}

/// `SetParameters` request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetParametersRequest {
    /// Parameters to set; `NotSet` values delete
    pub parameters: Vec<Parameter>,
}

impl CdrEncode for SetParametersRequest {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_seq(&self.parameters);
    }
}

/// `SetParameters` response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetParametersResponse {
    /// One result per requested parameter
    pub results: Vec<SetParametersResult>,
}

impl CdrDecode for SetParametersResponse {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            results: r.read_seq()?,
        })
    }
}

service!(
    /// `rcl_interfaces/srv/ListParameters`
    ListParameters,
    "rcl_interfaces/srv/ListParameters",
    ListParametersRequest,
    ListParametersResponse
);

service!(
    /// `rcl_interfaces/srv/GetParameters`
    GetParameters,
    "rcl_interfaces/srv/GetParameters",
    GetParametersRequest,
    GetParametersResponse
);

service!(
    /// `rcl_interfaces/srv/SetParameters`
    SetParameters,
    "rcl_interfaces/srv/SetParameters",
    SetParametersRequest,
    SetParametersResponse
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::{from_cdr, to_cdr};

    #[test]
    fn test_from_cli() {
        assert_eq!(ParameterValue::from_cli("true"), ParameterValue::Bool(true));
        assert_eq!(ParameterValue::from_cli("42"), ParameterValue::Integer(42));
        assert_eq!(ParameterValue::from_cli("1.5"), ParameterValue::Double(1.5));
        assert_eq!(
            ParameterValue::from_cli("hello"),
            ParameterValue::String("hello".into())
        );
        assert_eq!(
            ParameterValue::from_cli("[1, 2, 3]"),
            ParameterValue::IntegerArray(vec![1, 2, 3])
        );
        assert_eq!(
            ParameterValue::from_cli("['a', 'b']"),
            ParameterValue::StringArray(vec!["a".into(), "b".into()])
        );
        // mixed sequences and mappings stay strings
        assert_eq!(
            ParameterValue::from_cli("[1, 'a']"),
            ParameterValue::String("[1, 'a']".into())
        );
        assert_eq!(
            ParameterValue::from_cli("{a: 1}"),
            ParameterValue::String("{a: 1}".into())
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(ParameterValue::Bool(true).describe(), "Boolean value is: True");
        assert_eq!(ParameterValue::Integer(3).describe(), "Integer value is: 3");
        assert_eq!(ParameterValue::Double(1.0).describe(), "Double value is: 1.0");
        assert_eq!(
            ParameterValue::StringArray(vec!["a".into()]).describe(),
            "String values are: ['a']"
        );
        assert_eq!(ParameterValue::NotSet.describe(), "Parameter not set.");
    }

    #[test]
    fn test_parameter_value_wire_format() {
        let value = ParameterValue::DoubleArray(vec![0.5]);
        let bytes = to_cdr(&value);
        // type, bool, pad, i64, f64, empty string, empty byte[], empty bool[],
        // empty int64[], double[] with one element, empty string[]
        assert_eq!(bytes[4], parameter_type::DOUBLE_ARRAY);
        assert_eq!(from_cdr::<ParameterValue>(&bytes).unwrap(), value);

        let param = Parameter::new("use_sim_time", ParameterValue::Bool(false));
        let request = SetParametersRequest {
            parameters: vec![param.clone()],
        };
        let bytes = to_cdr(&request);
        let mut r = CdrReader::new(&bytes).unwrap();
        let decoded: Vec<Parameter> = r.read_seq().unwrap();
        assert_eq!(decoded, [param]);
        assert!(r.remaining().is_empty());
    }

    #[test]
    fn test_assignment() {
        let param = Parameter::from_assignment("rate:=10").unwrap();
        assert_eq!(param.name, "rate");
        assert_eq!(param.value, ParameterValue::Integer(10));
        assert!(Parameter::from_assignment("rate=10").is_none());
        assert!(Parameter::from_assignment(":=10").is_none());
    }
}
