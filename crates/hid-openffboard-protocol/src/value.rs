//! Closed value model for parameter payloads.
//!
//! Every parameter declares the [`ValueKind`] it carries. Replies are coerced
//! into a [`Value`] at the decode boundary and converted into the caller's
//! Rust type through [`FromValue`]; outgoing payloads go through
//! [`IntoValue`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

/// Reply word the firmware sends to acknowledge a command.
pub const ACK_WORD: &str = "OK";

/// Declared payload kind of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    UInt,
    Float,
    Bool,
    Text,
}

/// A decoded or to-be-encoded parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::UInt(_) => ValueKind::UInt,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::Text(_) => ValueKind::Text,
        }
    }

    /// Coerce the data segment of a text reply into `kind`.
    ///
    /// The acknowledgement word `OK` always becomes `Bool(true)`, whatever
    /// kind the parameter declares.
    pub fn from_text(raw: &str, kind: ValueKind) -> ProtocolResult<Value> {
        let trimmed = raw.trim();
        if trimmed == ACK_WORD {
            return Ok(Value::Bool(true));
        }

        let coercion = || ProtocolError::Coercion {
            raw: raw.to_string(),
            kind,
        };

        match kind {
            ValueKind::Bool => match trimmed {
                "1" | "true" => Ok(Value::Bool(true)),
                "0" | "false" => Ok(Value::Bool(false)),
                _ => Err(coercion()),
            },
            ValueKind::Int => parse_i64(trimmed).map(Value::Int).ok_or_else(coercion),
            ValueKind::UInt => parse_u64(trimmed).map(Value::UInt).ok_or_else(coercion),
            ValueKind::Float => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| coercion()),
            ValueKind::Text => Ok(Value::Text(raw.to_string())),
        }
    }

    /// Interpret the 64-bit payload field of a binary frame as `kind`.
    pub fn from_wire(raw: i64, kind: ValueKind) -> Value {
        match kind {
            ValueKind::Int => Value::Int(raw),
            ValueKind::UInt => Value::UInt(u64::from_le_bytes(raw.to_le_bytes())),
            ValueKind::Float => Value::Float(raw as f64),
            ValueKind::Bool => Value::Bool(raw != 0),
            ValueKind::Text => Value::Text(raw.to_string()),
        }
    }

    /// Payload text for the `=<value>` part of a write command.
    pub fn to_text_payload(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::UInt(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Payload field of a binary frame, or `None` for text values.
    pub fn to_wire(&self) -> Option<u64> {
        match self {
            Value::Int(v) => Some(u64::from_le_bytes(v.to_le_bytes())),
            Value::UInt(v) => Some(*v),
            Value::Float(v) => {
                let truncated = v.trunc() as i64;
                Some(u64::from_le_bytes(truncated.to_le_bytes()))
            }
            Value::Bool(b) => Some(u64::from(*b)),
            Value::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

fn parse_i64(s: &str) -> Option<i64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .ok()
            .map(|v| i64::from_le_bytes(v.to_le_bytes()));
    }
    s.parse().ok()
}

fn parse_u64(s: &str) -> Option<u64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    s.parse().ok()
}

/// Conversion out of a decoded [`Value`].
///
/// `Default` is required because reads that the device answers with an
/// error may resolve to the type's default value.
pub trait FromValue: Sized + Default {
    const KIND: ValueKind;

    fn from_value(value: Value) -> ProtocolResult<Self>;
}

/// Conversion into an outgoing [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

fn mismatch<T: FromValue>(value: &Value) -> ProtocolError {
    ProtocolError::Coercion {
        raw: value.to_string(),
        kind: T::KIND,
    }
}

macro_rules! impl_integer {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl FromValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn from_value(value: Value) -> ProtocolResult<Self> {
                let converted = match &value {
                    Value::Int(v) => <$ty>::try_from(*v).ok(),
                    Value::UInt(v) => <$ty>::try_from(*v).ok(),
                    Value::Float(v) if v.is_finite() => {
                        <$ty>::try_from(v.trunc() as i128).ok()
                    }
                    Value::Float(_) => None,
                    Value::Bool(b) => Some(<$ty>::from(*b)),
                    Value::Text(s) => s.trim().parse::<$ty>().ok(),
                };
                converted.ok_or_else(|| mismatch::<$ty>(&value))
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$kind(self.into())
            }
        }
    )*};
}

impl_integer!(
    u8 => UInt,
    u16 => UInt,
    u32 => UInt,
    u64 => UInt,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
);

impl FromValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: Value) -> ProtocolResult<Self> {
        match &value {
            Value::Bool(b) => Ok(*b),
            Value::Int(v) => Ok(*v != 0),
            Value::UInt(v) => Ok(*v != 0),
            Value::Float(v) => Ok(v.abs() > 0.0),
            Value::Text(s) => match s.trim() {
                "1" | "true" | ACK_WORD => Ok(true),
                "0" | "false" => Ok(false),
                _ => Err(mismatch::<bool>(&value)),
            },
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

macro_rules! impl_float {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            const KIND: ValueKind = ValueKind::Float;

            fn from_value(value: Value) -> ProtocolResult<Self> {
                match &value {
                    Value::Float(v) => Ok(*v as $ty),
                    Value::Int(v) => Ok(*v as $ty),
                    Value::UInt(v) => Ok(*v as $ty),
                    Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
                    Value::Text(s) => s
                        .trim()
                        .parse::<$ty>()
                        .map_err(|_| mismatch::<$ty>(&value)),
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::Float(f64::from(self))
            }
        }
    )*};
}

impl_float!(f32, f64);

impl FromValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn from_value(value: Value) -> ProtocolResult<Self> {
        Ok(match value {
            Value::Text(s) => s,
            other => other.to_string(),
        })
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn ok_word_is_true_for_every_kind() -> TestResult {
        for kind in [
            ValueKind::Int,
            ValueKind::UInt,
            ValueKind::Float,
            ValueKind::Bool,
            ValueKind::Text,
        ] {
            assert_eq!(Value::from_text("OK", kind)?, Value::Bool(true));
        }
        Ok(())
    }

    #[test]
    fn bool_digits_coerce() -> TestResult {
        assert_eq!(Value::from_text("1", ValueKind::Bool)?, Value::Bool(true));
        assert_eq!(Value::from_text("0", ValueKind::Bool)?, Value::Bool(false));
        assert!(Value::from_text("2", ValueKind::Bool).is_err());
        Ok(())
    }

    #[test]
    fn numeric_text_parses() -> TestResult {
        assert_eq!(Value::from_text("-42", ValueKind::Int)?, Value::Int(-42));
        assert_eq!(Value::from_text("0x1F", ValueKind::UInt)?, Value::UInt(31));
        assert_eq!(Value::from_text(" 500\r", ValueKind::UInt)?, Value::UInt(500));
        assert!(Value::from_text("-1", ValueKind::UInt).is_err());
        Ok(())
    }

    #[test]
    fn text_keeps_raw_string() -> TestResult {
        assert_eq!(
            Value::from_text("FFB Wheel:main:0", ValueKind::Text)?,
            Value::Text("FFB Wheel:main:0".to_string())
        );
        Ok(())
    }

    #[test]
    fn bool_payload_is_digit() {
        assert_eq!(Value::Bool(true).to_text_payload(), "1");
        assert_eq!(Value::Bool(false).to_text_payload(), "0");
    }

    #[test]
    fn wire_payload_is_twos_complement() {
        assert_eq!(Value::Int(-1).to_wire(), Some(u64::MAX));
        assert_eq!(Value::Bool(true).to_wire(), Some(1));
        assert_eq!(Value::Float(2.9).to_wire(), Some(2));
        assert_eq!(Value::Text("x".into()).to_wire(), None);
    }

    #[test]
    fn from_wire_respects_kind() {
        assert_eq!(Value::from_wire(-1, ValueKind::UInt), Value::UInt(u64::MAX));
        assert_eq!(Value::from_wire(7, ValueKind::Bool), Value::Bool(true));
        assert_eq!(Value::from_wire(12, ValueKind::Text), Value::Text("12".into()));
    }

    #[test]
    fn ack_converts_to_numeric_one() -> TestResult {
        assert_eq!(u16::from_value(Value::Bool(true))?, 1);
        assert_eq!(i64::from_value(Value::Bool(true))?, 1);
        Ok(())
    }

    #[test]
    fn out_of_range_integer_is_coercion_error() {
        let err = u8::from_value(Value::UInt(300));
        assert!(matches!(
            err,
            Err(ProtocolError::Coercion {
                kind: ValueKind::UInt,
                ..
            })
        ));
    }

    #[test]
    fn into_value_picks_signedness() {
        assert_eq!(500u16.into_value(), Value::UInt(500));
        assert_eq!((-3i32).into_value(), Value::Int(-3));
        assert_eq!("abc".into_value(), Value::Text("abc".into()));
    }
}
