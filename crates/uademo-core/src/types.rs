// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA value model used throughout the uademo server.
//!
//! This module provides the small slice of the OPC UA information model the
//! sampling engine needs:
//!
//! - **NodeId**: All four identifier kinds with text parsing and formatting
//! - **AttributeId**: The standard attribute set (codes 1..22)
//! - **StatusCode**: 32-bit status codes with the Bad codes used by reads
//! - **Variant** / **DataValue**: Values with status and timestamps
//! - **ReadValueId** / **MonitoringMode**: What a monitored item targets
//!
//! # Examples
//!
//! ```
//! use uademo_core::types::{DataValue, NodeId, StatusCode, Variant};
//!
//! let node: NodeId = "ns=2;s=Dynamic/RandomInt32".parse().unwrap();
//! assert_eq!(node.as_string(), Some("Dynamic/RandomInt32"));
//!
//! let value = DataValue::new_now(Variant::Int32(7));
//! assert!(value.status.is_good());
//!
//! let failed = DataValue::from_status(StatusCode::BAD_INTERNAL_ERROR);
//! assert!(failed.value.is_none());
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NodeError;

// =============================================================================
// NodeId
// =============================================================================

/// Identifies a node within an address space.
///
/// # Examples
///
/// ```
/// use uademo_core::types::NodeId;
///
/// let numeric = NodeId::numeric(2, 26001);
/// assert_eq!(numeric.to_string(), "ns=2;i=26001");
///
/// let folder = NodeId::string(2, "Mass/A");
/// assert_eq!(folder.resolve("007").to_string(), "ns=2;s=Mass/A/007");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The identifier within the namespace.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node id.
    #[inline]
    pub const fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node id.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node id.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node id.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Returns a string node id for a child of this node.
    ///
    /// String identifiers are joined with `/`. Any other identifier kind
    /// yields a string id made of `name` alone in the same namespace.
    pub fn resolve(&self, name: &str) -> NodeId {
        match &self.identifier {
            NodeIdentifier::String(parent) => {
                NodeId::string(self.namespace_index, format!("{}/{}", parent, name))
            }
            _ => NodeId::string(self.namespace_index, name),
        }
    }

    /// Returns the numeric identifier, if any.
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string identifier, if any.
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index == 0 {
            write!(f, "{}", self.identifier)
        } else {
            write!(f, "ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl FromStr for NodeId {
    type Err = NodeError;

    /// Parses `ns=<n>;i=|s=|g=|b=<id>`; the namespace part is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, rest) = match s.strip_prefix("ns=") {
            Some(tail) => {
                let (ns, id) = tail
                    .split_once(';')
                    .ok_or_else(|| NodeError::invalid_node_id(s, "missing identifier after namespace"))?;
                let ns: u16 = ns
                    .parse()
                    .map_err(|_| NodeError::invalid_node_id(s, "invalid namespace index"))?;
                (ns, id)
            }
            None => (0, s),
        };

        let (kind, id) = (rest.get(..2).unwrap_or_default(), rest.get(2..).unwrap_or_default());
        let identifier = match kind {
            "i=" => NodeIdentifier::Numeric(
                id.parse()
                    .map_err(|_| NodeError::invalid_node_id(s, "invalid numeric identifier"))?,
            ),
            "s=" => NodeIdentifier::String(id.to_string()),
            "g=" => NodeIdentifier::Guid(
                Uuid::parse_str(id)
                    .map_err(|e| NodeError::invalid_node_id(s, format!("invalid GUID: {}", e)))?,
            ),
            "b=" => NodeIdentifier::Opaque(
                BASE64
                    .decode(id)
                    .map_err(|e| NodeError::invalid_node_id(s, format!("invalid base64: {}", e)))?,
            ),
            _ => {
                return Err(NodeError::invalid_node_id(
                    s,
                    "expected identifier prefix i=, s=, g= or b=",
                ))
            }
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

/// The identifier part of a [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
    /// Opaque byte string identifier.
    Opaque(Vec<u8>),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

/// Well-known data type node ids (namespace 0).
pub mod data_types {
    use super::NodeId;

    /// Boolean.
    pub const BOOLEAN: NodeId = NodeId::numeric(0, 1);
    /// Int32.
    pub const INT32: NodeId = NodeId::numeric(0, 6);
    /// UInt32.
    pub const UINT32: NodeId = NodeId::numeric(0, 7);
    /// Int64.
    pub const INT64: NodeId = NodeId::numeric(0, 8);
    /// Float.
    pub const FLOAT: NodeId = NodeId::numeric(0, 10);
    /// Double.
    pub const DOUBLE: NodeId = NodeId::numeric(0, 11);
    /// String.
    pub const STRING: NodeId = NodeId::numeric(0, 12);
    /// DateTime.
    pub const DATE_TIME: NodeId = NodeId::numeric(0, 13);
    /// BaseDataType.
    pub const BASE_DATA_TYPE: NodeId = NodeId::numeric(0, 24);
}

// =============================================================================
// AttributeId
// =============================================================================

/// Standard node attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum AttributeId {
    NodeId = 1,
    NodeClass = 2,
    BrowseName = 3,
    DisplayName = 4,
    Description = 5,
    WriteMask = 6,
    UserWriteMask = 7,
    IsAbstract = 8,
    Symmetric = 9,
    InverseName = 10,
    ContainsNoLoops = 11,
    EventNotifier = 12,
    Value = 13,
    DataType = 14,
    ValueRank = 15,
    ArrayDimensions = 16,
    AccessLevel = 17,
    UserAccessLevel = 18,
    MinimumSamplingInterval = 19,
    Historizing = 20,
    Executable = 21,
    UserExecutable = 22,
}

impl AttributeId {
    const ALL: [AttributeId; 22] = [
        Self::NodeId,
        Self::NodeClass,
        Self::BrowseName,
        Self::DisplayName,
        Self::Description,
        Self::WriteMask,
        Self::UserWriteMask,
        Self::IsAbstract,
        Self::Symmetric,
        Self::InverseName,
        Self::ContainsNoLoops,
        Self::EventNotifier,
        Self::Value,
        Self::DataType,
        Self::ValueRank,
        Self::ArrayDimensions,
        Self::AccessLevel,
        Self::UserAccessLevel,
        Self::MinimumSamplingInterval,
        Self::Historizing,
        Self::Executable,
        Self::UserExecutable,
    ];

    /// Returns the numeric attribute code.
    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Returns the attribute's standard name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::NodeId => "NodeId",
            Self::NodeClass => "NodeClass",
            Self::BrowseName => "BrowseName",
            Self::DisplayName => "DisplayName",
            Self::Description => "Description",
            Self::WriteMask => "WriteMask",
            Self::UserWriteMask => "UserWriteMask",
            Self::IsAbstract => "IsAbstract",
            Self::Symmetric => "Symmetric",
            Self::InverseName => "InverseName",
            Self::ContainsNoLoops => "ContainsNoLoops",
            Self::EventNotifier => "EventNotifier",
            Self::Value => "Value",
            Self::DataType => "DataType",
            Self::ValueRank => "ValueRank",
            Self::ArrayDimensions => "ArrayDimensions",
            Self::AccessLevel => "AccessLevel",
            Self::UserAccessLevel => "UserAccessLevel",
            Self::MinimumSamplingInterval => "MinimumSamplingInterval",
            Self::Historizing => "Historizing",
            Self::Executable => "Executable",
            Self::UserExecutable => "UserExecutable",
        }
    }
}

impl TryFrom<u32> for AttributeId {
    type Error = NodeError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        code.checked_sub(1)
            .and_then(|i| Self::ALL.get(i as usize))
            .copied()
            .ok_or_else(|| NodeError::unknown_attribute(code))
    }
}

impl FromStr for AttributeId {
    type Err = NodeError;

    /// Accepts a standard name (case-insensitive) or a numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u32>() {
            return Self::try_from(code);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| NodeError::unknown_attribute(0))
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// A 32-bit OPC UA status code.
///
/// The top two bits carry the severity: `00` good, `01` uncertain, `10` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Operation succeeded.
    pub const GOOD: StatusCode = StatusCode(0);
    /// An internal error occurred as a result of a programming or configuration error.
    pub const BAD_INTERNAL_ERROR: StatusCode = StatusCode(0x8002_0000);
    /// Waiting for the server to obtain values from the underlying data source.
    pub const BAD_WAITING_FOR_INITIAL_DATA: StatusCode = StatusCode(0x8032_0000);
    /// The node id refers to a node that does not exist.
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    /// The attribute is not supported for the specified node.
    pub const BAD_ATTRIBUTE_ID_INVALID: StatusCode = StatusCode(0x8035_0000);
    /// The syntax of the index range parameter is invalid.
    pub const BAD_INDEX_RANGE_INVALID: StatusCode = StatusCode(0x8036_0000);
    /// No data exists within the range of indexes specified.
    pub const BAD_INDEX_RANGE_NO_DATA: StatusCode = StatusCode(0x8037_0000);
    /// The data encoding is invalid.
    pub const BAD_DATA_ENCODING_INVALID: StatusCode = StatusCode(0x8038_0000);
    /// The server does not support the requested data encoding for the node.
    pub const BAD_DATA_ENCODING_UNSUPPORTED: StatusCode = StatusCode(0x8039_0000);
    /// The value supplied for the attribute is not of the same type as the attribute's value.
    pub const BAD_TYPE_MISMATCH: StatusCode = StatusCode(0x8074_0000);

    /// Returns the raw code.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` for Good severity.
    #[inline]
    pub const fn is_good(self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` for Uncertain severity.
    #[inline]
    pub const fn is_uncertain(self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` for Bad severity.
    #[inline]
    pub const fn is_bad(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name for known codes.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::GOOD => "Good",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_WAITING_FOR_INITIAL_DATA => "BadWaitingForInitialData",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            Self::BAD_INDEX_RANGE_INVALID => "BadIndexRangeInvalid",
            Self::BAD_INDEX_RANGE_NO_DATA => "BadIndexRangeNoData",
            Self::BAD_DATA_ENCODING_INVALID => "BadDataEncodingInvalid",
            Self::BAD_DATA_ENCODING_UNSUPPORTED => "BadDataEncodingUnsupported",
            Self::BAD_TYPE_MISMATCH => "BadTypeMismatch",
            _ => return None,
        };
        Some(name)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::GOOD
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

// =============================================================================
// Variant
// =============================================================================

/// A dynamically typed OPC UA value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum Variant {
    /// No value.
    #[default]
    Empty,
    /// Boolean value.
    Boolean(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// One-dimensional array.
    Array(Vec<Variant>),
}

impl Variant {
    /// Returns the type name.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Boolean(_) => "Boolean",
            Self::Int32(_) => "Int32",
            Self::Int64(_) => "Int64",
            Self::UInt32(_) => "UInt32",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::Array(_) => "Array",
        }
    }

    /// Returns `true` if this is an array.
    #[inline]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Returns the value as `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int32(v) => Some(f64::from(*v)),
            Self::Int64(v) => Some(*v as f64),
            Self::UInt32(v) => Some(f64::from(*v)),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<empty>"),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{:?}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_variant_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(v: $ty) -> Self {
                    Variant::$variant(v)
                }
            }
        )*
    };
}

impl_variant_from! {
    bool => Boolean,
    i32 => Int32,
    i64 => Int64,
    u32 => UInt32,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime<Utc> => DateTime,
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(v.to_string())
    }
}

impl<T: Into<Variant>> From<Vec<T>> for Variant {
    fn from(v: Vec<T>) -> Self {
        Variant::Array(v.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// Which timestamps a read should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampsToReturn {
    /// Source timestamp only.
    Source,
    /// Server timestamp only.
    Server,
    /// Both timestamps.
    #[default]
    Both,
    /// No timestamps.
    Neither,
}

/// A value with status and timestamps.
///
/// This is the shape every delivery path hands to a monitored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    /// The value, absent for bad statuses.
    pub value: Option<Variant>,
    /// Quality of the value.
    pub status: StatusCode,
    /// When the source produced the value.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// When the server observed the value.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Creates a Good value stamped with the current time.
    pub fn new_now(value: impl Into<Variant>) -> Self {
        let now = Utc::now();
        Self {
            value: Some(value.into()),
            status: StatusCode::GOOD,
            source_timestamp: Some(now),
            server_timestamp: Some(now),
        }
    }

    /// Creates a value-less result carrying only a status.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            value: None,
            status,
            source_timestamp: None,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Returns `true` if the status is Good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }

    /// Drops the timestamps not requested by `timestamps`.
    pub fn with_timestamps(mut self, timestamps: TimestampsToReturn) -> Self {
        match timestamps {
            TimestampsToReturn::Both => {}
            TimestampsToReturn::Source => self.server_timestamp = None,
            TimestampsToReturn::Server => self.source_timestamp = None,
            TimestampsToReturn::Neither => {
                self.source_timestamp = None;
                self.server_timestamp = None;
            }
        }
        self
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{} [{}]", v, self.status),
            None => write!(f, "[{}]", self.status),
        }
    }
}

// =============================================================================
// ReadValueId & MonitoringMode
// =============================================================================

/// A namespace-qualified name, used for browse names and data encodings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,
    /// Name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    /// The standard binary encoding name.
    pub fn default_binary() -> Self {
        Self::new(0, "Default Binary")
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index == 0 {
            f.write_str(&self.name)
        } else {
            write!(f, "{}:{}", self.namespace_index, self.name)
        }
    }
}

/// The node attribute a monitored item targets.
///
/// The attribute id is kept raw: resolving it to an [`AttributeId`] may fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadValueId {
    /// Target node.
    pub node_id: NodeId,
    /// Raw attribute code.
    pub attribute_id: u32,
    /// Optional index range text, e.g. `"0:3"`.
    pub index_range: Option<String>,
    /// Optional requested data encoding.
    pub data_encoding: Option<QualifiedName>,
}

impl ReadValueId {
    /// Targets the Value attribute of `node_id`.
    pub fn value(node_id: NodeId) -> Self {
        Self::new(node_id, AttributeId::Value.code())
    }

    /// Targets an arbitrary attribute code.
    pub fn new(node_id: NodeId, attribute_id: u32) -> Self {
        Self {
            node_id,
            attribute_id,
            index_range: None,
            data_encoding: None,
        }
    }

    /// Sets the index range.
    pub fn with_index_range(mut self, range: impl Into<String>) -> Self {
        self.index_range = Some(range.into());
        self
    }

    /// Sets the data encoding.
    pub fn with_data_encoding(mut self, encoding: QualifiedName) -> Self {
        self.data_encoding = Some(encoding);
        self
    }

    /// Resolves the attribute code.
    pub fn attribute(&self) -> Result<AttributeId, NodeError> {
        AttributeId::try_from(self.attribute_id)
    }
}

/// Client-controlled delivery mode of a monitored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringMode {
    /// Nothing is sampled or reported.
    Disabled,
    /// Sampled and queued, not reported.
    Sampling,
    /// Sampled, queued and reported.
    #[default]
    Reporting,
}

impl MonitoringMode {
    /// Returns `true` when values should be sampled.
    #[inline]
    pub const fn is_sampling_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Display for MonitoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Sampling => f.write_str("sampling"),
            Self::Reporting => f.write_str("reporting"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parse_and_format() {
        let cases = [
            "ns=2;i=26001",
            "ns=2;s=Mass/A/000",
            "i=2253",
            "ns=3;g=550e8400-e29b-41d4-a716-446655440000",
            "ns=1;b=SGVsbG8=",
        ];
        for text in cases {
            let node: NodeId = text.parse().unwrap();
            assert_eq!(node.to_string(), text);
        }
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=2;i=abc".parse::<NodeId>().is_err());
        assert!("ns=2;q=1".parse::<NodeId>().is_err());
        assert!("".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_resolve() {
        let root = NodeId::string(2, "Mass");
        assert_eq!(root.resolve("B").as_string(), Some("Mass/B"));
        assert_eq!(NodeId::numeric(2, 5).resolve("x").as_string(), Some("x"));
    }

    #[test]
    fn test_attribute_id_codes() {
        assert_eq!(AttributeId::try_from(13).unwrap(), AttributeId::Value);
        assert_eq!(AttributeId::try_from(1).unwrap(), AttributeId::NodeId);
        assert_eq!(
            AttributeId::try_from(22).unwrap(),
            AttributeId::UserExecutable
        );
        assert!(AttributeId::try_from(0).is_err());
        assert!(AttributeId::try_from(23).is_err());
        assert_eq!(AttributeId::MinimumSamplingInterval.code(), 19);
    }

    #[test]
    fn test_attribute_id_from_str() {
        assert_eq!("value".parse::<AttributeId>().unwrap(), AttributeId::Value);
        assert_eq!(
            "BrowseName".parse::<AttributeId>().unwrap(),
            AttributeId::BrowseName
        );
        assert_eq!("14".parse::<AttributeId>().unwrap(), AttributeId::DataType);
        assert!("bogus".parse::<AttributeId>().is_err());
    }

    #[test]
    fn test_status_code_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::BAD_INTERNAL_ERROR.is_bad());
        assert!(!StatusCode::BAD_INTERNAL_ERROR.is_good());
        assert!(StatusCode(0x4000_0000).is_uncertain());
        assert_eq!(
            StatusCode::BAD_INDEX_RANGE_NO_DATA.to_string(),
            "BadIndexRangeNoData (0x80370000)"
        );
    }

    #[test]
    fn test_data_value_constructors() {
        let dv = DataValue::new_now(42.0);
        assert_eq!(dv.value, Some(Variant::Double(42.0)));
        assert!(dv.source_timestamp.is_some());

        let bad = DataValue::from_status(StatusCode::BAD_NODE_ID_UNKNOWN);
        assert!(!bad.is_good());
        assert!(bad.value.is_none());
    }

    #[test]
    fn test_with_timestamps() {
        let dv = DataValue::new_now(1i32);
        let source = dv.clone().with_timestamps(TimestampsToReturn::Source);
        assert!(source.source_timestamp.is_some());
        assert!(source.server_timestamp.is_none());

        let neither = dv.with_timestamps(TimestampsToReturn::Neither);
        assert!(neither.source_timestamp.is_none());
        assert!(neither.server_timestamp.is_none());
    }

    #[test]
    fn test_variant_conversions() {
        assert_eq!(Variant::from(vec![1i32, 2]).to_string(), "[1, 2]");
        assert_eq!(Variant::from("x").type_name(), "String");
        assert_eq!(Variant::Int64(3).as_f64(), Some(3.0));
        assert_eq!(Variant::Boolean(true).as_f64(), None);
    }

    #[test]
    fn test_variant_serde() {
        let json = serde_json::to_string(&Variant::Int32(5)).unwrap();
        assert_eq!(json, r#"{"type":"Int32","value":5}"#);
        let back: Variant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Variant::Int32(5));
    }

    #[test]
    fn test_monitoring_mode() {
        assert!(!MonitoringMode::Disabled.is_sampling_enabled());
        assert!(MonitoringMode::Sampling.is_sampling_enabled());
        assert!(MonitoringMode::Reporting.is_sampling_enabled());
        let mode: MonitoringMode = serde_json::from_str(r#""sampling""#).unwrap();
        assert_eq!(mode, MonitoringMode::Sampling);
    }

    #[test]
    fn test_read_value_id() {
        let rv = ReadValueId::value(NodeId::string(2, "x")).with_index_range("0:1");
        assert_eq!(rv.attribute().unwrap(), AttributeId::Value);
        assert_eq!(rv.index_range.as_deref(), Some("0:1"));
        assert!(ReadValueId::new(NodeId::numeric(0, 1), 99).attribute().is_err());
    }
}
