//! The runtime value model: type tags, tagged values, widening and printing.

use std::{fmt, rc::Rc};

use strum::{Display, IntoStaticStr};

use crate::{
    ast::TypeDecl,
    callable::Callable,
    class::{ClassInfo, Instance},
};

/// Closed set of runtime types with the fixed ordering the widening rule is
/// built on: for any binary numeric operation the result is computed at the
/// width of the larger tag.
///
/// `Byte..=Double` is the number band, `Byte..=Long` the whole-number band.
/// `Char` is an unsigned 16-bit integer and participates in numeric
/// operators as a whole number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, IntoStaticStr)]
pub enum TypeTag {
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "void")]
    Void,
    #[strum(serialize = "boolean")]
    Boolean,
    #[strum(serialize = "byte")]
    Byte,
    #[strum(serialize = "char")]
    Char,
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "long")]
    Long,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "double")]
    Double,
    #[strum(serialize = "null")]
    Null,
    #[strum(serialize = "object")]
    UserDefined,
    #[strum(serialize = "String")]
    String,
    #[strum(serialize = "function")]
    Function,
    #[strum(serialize = "instance")]
    Instance,
    #[strum(serialize = "class")]
    Class,
}

impl TypeTag {
    /// The declarable primitive band.
    pub fn is_primitive(self) -> bool {
        Self::Boolean <= self && self <= Self::Double
    }

    pub fn is_number(self) -> bool {
        Self::Byte <= self && self <= Self::Double
    }

    pub fn is_whole_number(self) -> bool {
        Self::Byte <= self && self <= Self::Long
    }

    /// Tags whose variables may hold `null`.
    pub fn is_reference(self) -> bool {
        matches!(self, Self::String | Self::UserDefined | Self::Instance)
    }
}

/// A runtime value: primitives stored inline, reference types behind `Rc`.
///
/// Nullness of the two nullable reference types is encoded as `Option`;
/// `Str(None)` and `Instance(None)` are the "declared but null" states, while
/// the `Null` variant is the type of the bare `null` literal before it is
/// stored anywhere.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Void,
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Null,
    Str(Option<Rc<str>>),
    Function(Rc<Callable>),
    Instance(Option<Rc<Instance>>),
    Class(Rc<ClassInfo>),
}

impl Value {
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::None => TypeTag::None,
            Self::Void => TypeTag::Void,
            Self::Boolean(_) => TypeTag::Boolean,
            Self::Byte(_) => TypeTag::Byte,
            Self::Char(_) => TypeTag::Char,
            Self::Int(_) => TypeTag::Int,
            Self::Long(_) => TypeTag::Long,
            Self::Float(_) => TypeTag::Float,
            Self::Double(_) => TypeTag::Double,
            Self::Null => TypeTag::Null,
            Self::Str(_) => TypeTag::String,
            Self::Function(_) => TypeTag::Function,
            Self::Instance(_) => TypeTag::Instance,
            Self::Class(_) => TypeTag::Class,
        }
    }

    /// Display name of the value's type, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.tag().into()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Str(None) | Self::Instance(None))
    }

    /// The zero payload an uninitialized slot of the declared type holds.
    ///
    /// The slot carries its declared tag from the start so a later assignment
    /// can coerce against it.
    pub(crate) fn default_for(declared: &TypeDecl) -> Self {
        match declared.tag {
            TypeTag::Boolean => Self::Boolean(false),
            TypeTag::Byte => Self::Byte(0),
            TypeTag::Char => Self::Char(0),
            TypeTag::Int => Self::Int(0),
            TypeTag::Long => Self::Long(0),
            TypeTag::Float => Self::Float(0.0),
            TypeTag::Double => Self::Double(0.0),
            TypeTag::String => Self::Str(None),
            _ => Self::Instance(None),
        }
    }

    pub(crate) fn widen_to_byte(&self) -> i8 {
        match self {
            Self::Byte(v) => *v,
            Self::Char(v) => *v as i8,
            Self::Int(v) => *v as i8,
            Self::Long(v) => *v as i8,
            Self::Float(v) => *v as i8,
            Self::Double(v) => *v as i8,
            _ => 0,
        }
    }

    pub(crate) fn widen_to_char(&self) -> u16 {
        match self {
            Self::Byte(v) => *v as u16,
            Self::Char(v) => *v,
            Self::Int(v) => *v as u16,
            Self::Long(v) => *v as u16,
            Self::Float(v) => *v as u16,
            Self::Double(v) => *v as u16,
            _ => 0,
        }
    }

    pub(crate) fn widen_to_int(&self) -> i32 {
        match self {
            Self::Byte(v) => i32::from(*v),
            Self::Char(v) => i32::from(*v),
            Self::Int(v) => *v,
            Self::Long(v) => *v as i32,
            Self::Float(v) => *v as i32,
            Self::Double(v) => *v as i32,
            _ => 0,
        }
    }

    pub(crate) fn widen_to_long(&self) -> i64 {
        match self {
            Self::Byte(v) => i64::from(*v),
            Self::Char(v) => i64::from(*v),
            Self::Int(v) => i64::from(*v),
            Self::Long(v) => *v,
            Self::Float(v) => *v as i64,
            Self::Double(v) => *v as i64,
            _ => 0,
        }
    }

    pub(crate) fn widen_to_float(&self) -> f32 {
        match self {
            Self::Byte(v) => f32::from(*v),
            Self::Char(v) => f32::from(*v),
            Self::Int(v) => *v as f32,
            Self::Long(v) => *v as f32,
            Self::Float(v) => *v,
            Self::Double(v) => *v as f32,
            _ => 0.0,
        }
    }

    pub(crate) fn widen_to_double(&self) -> f64 {
        match self {
            Self::Byte(v) => f64::from(*v),
            Self::Char(v) => f64::from(*v),
            Self::Int(v) => f64::from(*v),
            Self::Long(v) => *v as f64,
            Self::Float(v) => f64::from(*v),
            Self::Double(v) => *v,
            _ => 0.0,
        }
    }

    /// Converts a numeric payload to `target` width. The caller has already
    /// established that both the value and the target are in the number band.
    pub(crate) fn convert_numeric(&self, target: TypeTag) -> Self {
        match target {
            TypeTag::Byte => Self::Byte(self.widen_to_byte()),
            TypeTag::Char => Self::Char(self.widen_to_char()),
            TypeTag::Int => Self::Int(self.widen_to_int()),
            TypeTag::Long => Self::Long(self.widen_to_long()),
            TypeTag::Float => Self::Float(self.widen_to_float()),
            _ => Self::Double(self.widen_to_double()),
        }
    }

    /// Coerces a value to a declared type per the implicit conversion policy:
    /// equal tags store as-is, numbers convert to the declared width, `null`
    /// fills reference slots, anything else is rejected with the message to
    /// report.
    pub(crate) fn coerce_to_declared(self, declared: &TypeDecl) -> Result<Self, String> {
        match declared.tag {
            tag if tag == self.tag() => Ok(self),
            TypeTag::UserDefined => match self {
                Self::Instance(Some(instance)) => {
                    if instance.class_name().as_ref() == declared.name.as_ref() {
                        Ok(Self::Instance(Some(instance)))
                    } else {
                        Err(format!(
                            "Can't implicitly cast '{}' to '{}'.",
                            instance.class_name(),
                            declared.name
                        ))
                    }
                }
                Self::Instance(None) | Self::Null => Ok(Self::Instance(None)),
                other => Err(format!(
                    "Can't implicitly cast '{}' to '{}'.",
                    other.type_name(),
                    declared.name
                )),
            },
            TypeTag::String => match self {
                Self::Str(_) => Ok(self),
                Self::Null => Ok(Self::Str(None)),
                other => Err(format!(
                    "Can't implicitly cast '{}' to '{}'.",
                    other.type_name(),
                    declared.name
                )),
            },
            tag if tag.is_number() && self.tag().is_number() => Ok(self.convert_numeric(tag)),
            _ => Err(format!(
                "Can't implicitly cast '{}' to '{}'.",
                self.type_name(),
                declared.name
            )),
        }
    }

    /// Writes the value in its print format.
    pub fn print_fmt(&self, out: &mut impl fmt::Write) -> fmt::Result {
        match self {
            Self::None | Self::Void => Ok(()),
            Self::Null | Self::Str(None) | Self::Instance(None) => write!(out, "null"),
            Self::Boolean(v) => write!(out, "{}", if *v { "true" } else { "false" }),
            // negative bytes sign-extend before formatting, like C's `%x`
            // after integer promotion: -56 prints as 0xffffffc8
            Self::Byte(v) => write!(out, "0x{:x}", i32::from(*v)),
            Self::Char(v) => {
                let c = char::from_u32(u32::from(*v)).unwrap_or(char::REPLACEMENT_CHARACTER);
                write!(out, "'{c}'")
            }
            Self::Int(v) => write!(out, "{v}"),
            Self::Long(v) => write!(out, "{v}"),
            Self::Float(v) => write!(out, "{v:.6}f"),
            Self::Double(v) => write!(out, "{v:.6}"),
            Self::Str(Some(s)) => write!(out, "{s}"),
            Self::Function(callable) => write!(out, "{}", callable.repr()),
            Self::Instance(Some(instance)) => {
                write!(out, "{}@{:x}", instance.class_name(), Rc::as_ptr(instance) as usize)
            }
            Self::Class(class) => write!(out, "<class {}>", class.name()),
        }
    }

    /// The value's print format as an owned string.
    #[must_use]
    pub fn to_print_string(&self) -> String {
        let mut out = String::new();
        let _ = self.print_fmt(&mut out);
        out
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_fmt(f)
    }
}

impl PartialEq for Value {
    /// Structural equality for primitives and strings, pointer identity for
    /// functions, classes and instances. Used by embedders and tests; the
    /// language's own `==` goes through the numeric widening path instead.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) | (Self::Void, Self::Void) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Instance(Some(a)), Self::Instance(Some(b))) => Rc::ptr_eq(a, b),
            (Self::Instance(None), Self::Instance(None)) => true,
            (Self::Class(a), Self::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_order_matches_the_band_layout() {
        assert!(TypeTag::Byte < TypeTag::Char);
        assert!(TypeTag::Char < TypeTag::Int);
        assert!(TypeTag::Int < TypeTag::Long);
        assert!(TypeTag::Long < TypeTag::Float);
        assert!(TypeTag::Float < TypeTag::Double);
        assert!(TypeTag::Double < TypeTag::Null);
        assert!(TypeTag::Null < TypeTag::UserDefined);
        assert!(TypeTag::UserDefined < TypeTag::String);
    }

    #[test]
    fn number_band_includes_char_and_excludes_boolean() {
        assert!(TypeTag::Char.is_number());
        assert!(TypeTag::Char.is_whole_number());
        assert!(!TypeTag::Boolean.is_number());
        assert!(!TypeTag::Null.is_number());
        assert!(TypeTag::Long.is_whole_number());
        assert!(!TypeTag::Float.is_whole_number());
    }

    #[test]
    fn numeric_conversion_truncates_toward_integers() {
        assert_eq!(Value::Double(3.9).convert_numeric(TypeTag::Int), Value::Int(3));
        assert_eq!(Value::Long(0x1_0000_0001).convert_numeric(TypeTag::Int), Value::Int(1));
        assert_eq!(Value::Int(-1).convert_numeric(TypeTag::Char), Value::Char(u16::MAX));
        assert_eq!(Value::Char(65).convert_numeric(TypeTag::Long), Value::Long(65));
    }

    #[test]
    fn numeric_conversion_is_idempotent() {
        for value in [Value::Double(2.75), Value::Long(-9), Value::Byte(12)] {
            for tag in [TypeTag::Byte, TypeTag::Char, TypeTag::Int, TypeTag::Long, TypeTag::Float, TypeTag::Double] {
                let once = value.convert_numeric(tag);
                let twice = once.convert_numeric(tag);
                assert_eq!(once, twice, "({tag})(({tag}){value:?}) must equal ({tag}){value:?}");
            }
        }
    }

    #[test]
    fn print_formats() {
        assert_eq!(Value::Null.to_print_string(), "null");
        assert_eq!(Value::Boolean(true).to_print_string(), "true");
        assert_eq!(Value::Byte(-128).to_print_string(), "0xffffff80");
        assert_eq!(Value::Byte(-56).to_print_string(), "0xffffffc8");
        assert_eq!(Value::Byte(0x2a).to_print_string(), "0x2a");
        assert_eq!(Value::Char(97).to_print_string(), "'a'");
        assert_eq!(Value::Int(-7).to_print_string(), "-7");
        assert_eq!(Value::Long(1234567890123).to_print_string(), "1234567890123");
        assert_eq!(Value::Float(1.5).to_print_string(), "1.500000f");
        assert_eq!(Value::Double(2.25).to_print_string(), "2.250000");
        assert_eq!(Value::Str(Some("hi".into())).to_print_string(), "hi");
        assert_eq!(Value::Str(None).to_print_string(), "null");
    }
}
