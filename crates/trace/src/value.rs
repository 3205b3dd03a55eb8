//! Trace node payloads

use std::fmt;
use std::time::Duration;

/// Reference to an image published elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageRef {
    /// Image handle
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

/// Value attached to a trace node
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TraceValue {
    /// Nothing recorded
    #[default]
    None,
    /// Elapsed time (timers)
    Duration(Duration),
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Image(ImageRef),
}

impl TraceValue {
    /// Whether no value has been recorded
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The duration, if this is a timer value
    #[inline]
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for TraceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("[null]"),
            Self::Duration(d) => write!(f, "{:.4} ms", d.as_secs_f64() * 1000.0),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.6}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Image(img) => write!(f, "image#{} ({}x{})", img.id, img.width, img.height),
        }
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(impl From<$ty> for TraceValue {
            fn from(v: $ty) -> Self {
                Self::Integer(v as i64)
            }
        })*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for TraceValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for TraceValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<bool> for TraceValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for TraceValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for TraceValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Duration> for TraceValue {
    fn from(v: Duration) -> Self {
        Self::Duration(v)
    }
}

impl From<ImageRef> for TraceValue {
    fn from(v: ImageRef) -> Self {
        Self::Image(v)
    }
}
