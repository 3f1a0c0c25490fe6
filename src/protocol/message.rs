//! Message definitions
//!
//! Typed representation of OSC messages and arguments.

use std::fmt;

/// A single OSC argument
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    /// 32-bit signed integer (`i` tag); also carries booleans as 0/1
    Int(i32),

    /// 32-bit float (`f` tag)
    Float(f32),

    /// NUL-terminated padded UTF-8 string (`s` tag)
    Str(String),
}

impl OscArg {
    /// The OSC typetag letter for this argument
    pub fn type_tag(&self) -> char {
        match self {
            OscArg::Int(_) => 'i',
            OscArg::Float(_) => 'f',
            OscArg::Str(_) => 's',
        }
    }

    /// Numeric view of the argument, if it has one.
    ///
    /// Both `i` and `f` arguments widen losslessly to `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            OscArg::Int(v) => Some(*v as f64),
            OscArg::Float(v) => Some(*v as f64),
            OscArg::Str(_) => None,
        }
    }

    /// String view of the argument, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OscArg::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for OscArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscArg::Int(v) => write!(f, "{v}"),
            OscArg::Float(v) => write!(f, "{v}"),
            OscArg::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i32> for OscArg {
    fn from(v: i32) -> Self {
        OscArg::Int(v)
    }
}

impl From<f32> for OscArg {
    fn from(v: f32) -> Self {
        OscArg::Float(v)
    }
}

impl From<bool> for OscArg {
    fn from(v: bool) -> Self {
        OscArg::Int(v as i32)
    }
}

impl From<&str> for OscArg {
    fn from(v: &str) -> Self {
        OscArg::Str(v.to_string())
    }
}

impl From<String> for OscArg {
    fn from(v: String) -> Self {
        OscArg::Str(v)
    }
}

/// A parsed or to-be-sent OSC message
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    /// `/`-delimited address pattern
    pub address: String,

    /// Ordered argument list
    pub args: Vec<OscArg>,
}

impl OscMessage {
    /// Create a message with arguments
    pub fn new(address: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// Create a message with no arguments
    pub fn bare(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    /// The last numeric argument, if any.
    ///
    /// Peers place the value last in GET replies (e.g.
    /// `[track, device, param, value]`), so this is the standard way to
    /// extract a readback value.
    pub fn last_numeric(&self) -> Option<f64> {
        self.args.iter().rev().find_map(OscArg::as_number)
    }

    /// The last string argument, if any (display-string replies)
    pub fn last_string(&self) -> Option<&str> {
        self.args.iter().rev().find_map(OscArg::as_str)
    }
}
