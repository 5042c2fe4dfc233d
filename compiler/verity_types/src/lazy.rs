//! Lazy ("wrapped") type encoding.
//!
//! A lazy type is a deferred query such as "the return type of `Foo::bar()`"
//! stored as an ordinary type string, so it can live in a [`Map`](crate::Map)
//! next to resolved names and be persisted with it.
//!
//! # Wire format
//!
//! ```text
//! [tag: 1 byte] [u8 field: 2 hex digits]* [string field: 4 hex digits LE length, bytes]*
//! ```
//!
//! - The tag is a [`LazyTag`] discriminant, always below [`LAZY_TAG_MAX`].
//!   Resolved names start with a letter or `\`, so the first byte tells
//!   the two apart.
//! - Numeric fields precede string fields.
//! - The length of the last string field is not read back; the field runs
//!   to the end of the input.
//! - Every other string field must fit a `u16` length. A query with a longer
//!   one is encoded as `mixed` instead.
//! - Hex digits are lowercase. No field can produce a `|` byte, so encoded
//!   strings survive being joined and split on the union separator.
//!
//! Changing a tag value or the field layout invalidates persisted caches.

use std::fmt;

/// Deferred-query kind, stored as the first byte of an encoded lazy type.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum LazyTag {
    /// `Class::method()`. Fields: class, method.
    StaticMethodCall = 0,
    /// `$expr->method()`. Fields: expression type, method.
    InstanceMethodCall = 1,
    /// `Class::$prop`. Fields: class, property with `$`.
    StaticPropertyFetch = 2,
    /// `Class::CONST`. Fields: class, constant.
    ClassConstFetch = 3,
    /// `$expr->prop`. Fields: expression type, property.
    InstancePropertyFetch = 4,
    /// `f()`. Fields: fully qualified function name.
    FunctionCall = 5,
    /// `T[]`. Fields: element type.
    ArrayOf = 6,
    /// `$arr[...]`. Fields: array type.
    ElemOf = 7,
    /// `$arr['key']`. Fields: array type, key.
    ElemOfKey = 8,
    /// `global $x`. Fields: variable name.
    Global = 9,
    /// `CONST`. Fields: constant name.
    Constant = 10,
    /// Type of parameter `index` of a method inherited from a base type.
    /// Fields: index (u8), class, method.
    BaseMethodParam = 11,
}

/// Every encoded lazy type starts with a byte below this value.
pub const LAZY_TAG_MAX: u8 = 12;

const STRING_LEN_DIGITS: usize = 4;
const U8_DIGITS: usize = 2;

impl LazyTag {
    pub const fn from_byte(b: u8) -> Option<LazyTag> {
        Some(match b {
            0 => LazyTag::StaticMethodCall,
            1 => LazyTag::InstanceMethodCall,
            2 => LazyTag::StaticPropertyFetch,
            3 => LazyTag::ClassConstFetch,
            4 => LazyTag::InstancePropertyFetch,
            5 => LazyTag::FunctionCall,
            6 => LazyTag::ArrayOf,
            7 => LazyTag::ElemOf,
            8 => LazyTag::ElemOfKey,
            9 => LazyTag::Global,
            10 => LazyTag::Constant,
            11 => LazyTag::BaseMethodParam,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            LazyTag::StaticMethodCall => "static_method_call",
            LazyTag::InstanceMethodCall => "instance_method_call",
            LazyTag::StaticPropertyFetch => "static_property_fetch",
            LazyTag::ClassConstFetch => "class_const_fetch",
            LazyTag::InstancePropertyFetch => "instance_property_fetch",
            LazyTag::FunctionCall => "function_call",
            LazyTag::ArrayOf => "array_of",
            LazyTag::ElemOf => "elem_of",
            LazyTag::ElemOfKey => "elem_of_key",
            LazyTag::Global => "global",
            LazyTag::Constant => "constant",
            LazyTag::BaseMethodParam => "base_method_param",
        }
    }

    const fn string_fields(self) -> usize {
        match self {
            LazyTag::FunctionCall
            | LazyTag::ArrayOf
            | LazyTag::ElemOf
            | LazyTag::Global
            | LazyTag::Constant => 1,
            _ => 2,
        }
    }
}

impl fmt::Debug for LazyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LazyTag::{}", self.name())
    }
}

impl fmt::Display for LazyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const _: () = assert!(std::mem::size_of::<LazyTag>() == 1);

/// Reported by [`LazyType::decode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Empty input.
    Empty,
    /// The first byte is not a tag: this is a resolved type name.
    NotLazy(u8),
    /// The first byte is in the tag range but names no known query.
    UnknownTag(u8),
    /// Input ended inside a field starting at byte `at`.
    Truncated { at: usize },
    /// Non-hex digit in a numeric or length field at byte `at`.
    BadHex { at: usize },
    /// A string field ends inside a UTF-8 sequence at byte `at`.
    BadBoundary { at: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => f.write_str("empty type string"),
            DecodeError::NotLazy(b) => write!(f, "not a lazy type (first byte {b:#04x})"),
            DecodeError::UnknownTag(b) => write!(f, "unknown lazy type tag {b}"),
            DecodeError::Truncated { at } => write!(f, "lazy type truncated at byte {at}"),
            DecodeError::BadHex { at } => write!(f, "invalid hex digit at byte {at}"),
            DecodeError::BadBoundary { at } => {
                write!(f, "string field ends inside a character at byte {at}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decoded form of a lazy type string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LazyType {
    StaticMethodCall { class: String, method: String },
    InstanceMethodCall { expr: String, method: String },
    StaticPropertyFetch { class: String, prop: String },
    ClassConstFetch { class: String, constant: String },
    InstancePropertyFetch { expr: String, prop: String },
    FunctionCall { name: String },
    ArrayOf { elem: String },
    ElemOf { expr: String },
    ElemOfKey { expr: String, key: String },
    Global { name: String },
    Constant { name: String },
    BaseMethodParam {
        index: u8,
        class: String,
        method: String,
    },
}

impl LazyType {
    pub fn tag(&self) -> LazyTag {
        match self {
            LazyType::StaticMethodCall { .. } => LazyTag::StaticMethodCall,
            LazyType::InstanceMethodCall { .. } => LazyTag::InstanceMethodCall,
            LazyType::StaticPropertyFetch { .. } => LazyTag::StaticPropertyFetch,
            LazyType::ClassConstFetch { .. } => LazyTag::ClassConstFetch,
            LazyType::InstancePropertyFetch { .. } => LazyTag::InstancePropertyFetch,
            LazyType::FunctionCall { .. } => LazyTag::FunctionCall,
            LazyType::ArrayOf { .. } => LazyTag::ArrayOf,
            LazyType::ElemOf { .. } => LazyTag::ElemOf,
            LazyType::ElemOfKey { .. } => LazyTag::ElemOfKey,
            LazyType::Global { .. } => LazyTag::Global,
            LazyType::Constant { .. } => LazyTag::Constant,
            LazyType::BaseMethodParam { .. } => LazyTag::BaseMethodParam,
        }
    }

    /// Encode into the wire format. Collapsing rules of the `wrap_*`
    /// helpers are not applied here. Yields `mixed` when a field other than
    /// the last is longer than `u16::MAX` bytes.
    pub fn encode(&self) -> String {
        let tag = self.tag();
        match self {
            LazyType::StaticMethodCall { class: a, method: b }
            | LazyType::InstanceMethodCall { expr: a, method: b }
            | LazyType::StaticPropertyFetch { class: a, prop: b }
            | LazyType::ClassConstFetch {
                class: a,
                constant: b,
            }
            | LazyType::InstancePropertyFetch { expr: a, prop: b }
            | LazyType::ElemOfKey { expr: a, key: b } => {
                encode_fields(tag, &[], &[a.as_str(), b.as_str()])
            }
            LazyType::FunctionCall { name: a }
            | LazyType::ArrayOf { elem: a }
            | LazyType::ElemOf { expr: a }
            | LazyType::Global { name: a }
            | LazyType::Constant { name: a } => encode_fields(tag, &[], &[a.as_str()]),
            LazyType::BaseMethodParam {
                index,
                class,
                method,
            } => encode_fields(tag, &[*index], &[class.as_str(), method.as_str()]),
        }
    }

    pub fn decode(s: &str) -> Result<LazyType, DecodeError> {
        let first = *s.as_bytes().first().ok_or(DecodeError::Empty)?;
        if first >= LAZY_TAG_MAX {
            return Err(DecodeError::NotLazy(first));
        }
        let tag = LazyTag::from_byte(first).ok_or(DecodeError::UnknownTag(first))?;

        let mut r = Reader { s, pos: 1 };
        let index = if tag == LazyTag::BaseMethodParam {
            r.u8_field()?
        } else {
            0
        };
        let (a, b) = if tag.string_fields() == 1 {
            (r.last_str_field()?, "")
        } else {
            let a = r.str_field()?;
            (a, r.last_str_field()?)
        };
        let (a, b) = (a.to_owned(), b.to_owned());

        Ok(match tag {
            LazyTag::StaticMethodCall => LazyType::StaticMethodCall {
                class: a,
                method: b,
            },
            LazyTag::InstanceMethodCall => LazyType::InstanceMethodCall { expr: a, method: b },
            LazyTag::StaticPropertyFetch => LazyType::StaticPropertyFetch { class: a, prop: b },
            LazyTag::ClassConstFetch => LazyType::ClassConstFetch {
                class: a,
                constant: b,
            },
            LazyTag::InstancePropertyFetch => LazyType::InstancePropertyFetch { expr: a, prop: b },
            LazyTag::FunctionCall => LazyType::FunctionCall { name: a },
            LazyTag::ArrayOf => LazyType::ArrayOf { elem: a },
            LazyTag::ElemOf => LazyType::ElemOf { expr: a },
            LazyTag::ElemOfKey => LazyType::ElemOfKey { expr: a, key: b },
            LazyTag::Global => LazyType::Global { name: a },
            LazyTag::Constant => LazyType::Constant { name: a },
            LazyTag::BaseMethodParam => LazyType::BaseMethodParam {
                index,
                class: a,
                method: b,
            },
        })
    }
}

/// Human-readable rendering; nested lazy types are rendered recursively.
impl fmt::Display for LazyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LazyType::Global { name } => write!(f, "global_${}", format_type(name)),
            LazyType::Constant { name } => write!(f, "constant({name})"),
            LazyType::ArrayOf { elem } => write!(f, "{}[]", format_type(elem)),
            LazyType::ElemOf { expr } => write!(f, "elem({})", format_type(expr)),
            LazyType::ElemOfKey { expr, key } => write!(f, "elem({})[{key}]", format_type(expr)),
            LazyType::FunctionCall { name } => write!(f, "{name}()"),
            LazyType::InstanceMethodCall { expr, method } => {
                write!(f, "({})->{method}()", format_type(expr))
            }
            LazyType::InstancePropertyFetch { expr, prop } => {
                write!(f, "({})->{prop}", format_type(expr))
            }
            LazyType::BaseMethodParam {
                index,
                class,
                method,
            } => write!(f, "param({class})::{method}[{index}]"),
            LazyType::StaticMethodCall { class, method } => write!(f, "{class}::{method}()"),
            LazyType::StaticPropertyFetch { class, prop } => write!(f, "{class}::{prop}"),
            LazyType::ClassConstFetch { class, constant } => write!(f, "{class}::{constant}"),
        }
    }
}

struct Reader<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn hex_digits(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let at = self.pos;
        let digits = self
            .s
            .as_bytes()
            .get(at..at + n)
            .ok_or(DecodeError::Truncated { at })?;
        if let Some(i) = digits.iter().position(|d| hex_value(*d).is_none()) {
            return Err(DecodeError::BadHex { at: at + i });
        }
        self.pos += n;
        Ok(digits)
    }

    fn u8_field(&mut self) -> Result<u8, DecodeError> {
        let d = self.hex_digits(U8_DIGITS)?;
        Ok(hex_byte(d[0], d[1]))
    }

    fn str_field(&mut self) -> Result<&'a str, DecodeError> {
        let d = self.hex_digits(STRING_LEN_DIGITS)?;
        let len = usize::from(u16::from_le_bytes([hex_byte(d[0], d[1]), hex_byte(d[2], d[3])]));
        let at = self.pos;
        if at + len > self.s.len() {
            return Err(DecodeError::Truncated { at });
        }
        let field = self
            .s
            .get(at..at + len)
            .ok_or(DecodeError::BadBoundary { at: at + len })?;
        self.pos += len;
        Ok(field)
    }

    fn last_str_field(&mut self) -> Result<&'a str, DecodeError> {
        self.hex_digits(STRING_LEN_DIGITS)?;
        let at = self.pos;
        let field = self.s.get(at..).ok_or(DecodeError::BadBoundary { at })?;
        self.pos = self.s.len();
        Ok(field)
    }
}

fn hex_value(d: u8) -> Option<u8> {
    match d {
        b'0'..=b'9' => Some(d - b'0'),
        b'a'..=b'f' => Some(d - b'a' + 10),
        b'A'..=b'F' => Some(d - b'A' + 10),
        _ => None,
    }
}

/// Callers validate both digits first.
fn hex_byte(hi: u8, lo: u8) -> u8 {
    (hex_value(hi).unwrap_or(0) << 4) | hex_value(lo).unwrap_or(0)
}

const HEX: &[u8; 16] = b"0123456789abcdef";

fn push_hex(buf: &mut String, b: u8) {
    buf.push(char::from(HEX[usize::from(b >> 4)]));
    buf.push(char::from(HEX[usize::from(b & 0xf)]));
}

/// Encode a query; an oversized non-last string field yields `mixed`.
fn encode_fields(tag: LazyTag, bytes: &[u8], strings: &[&str]) -> String {
    let rest = &strings[..strings.len().saturating_sub(1)];
    if let Some(long) = rest.iter().find(|s| s.len() > usize::from(u16::MAX)) {
        tracing::warn!(tag = %tag, len = long.len(), "lazy type field too long, using mixed");
        return "mixed".to_owned();
    }

    let cap = 1
        + bytes.len() * U8_DIGITS
        + strings
            .iter()
            .map(|s| STRING_LEN_DIGITS + s.len())
            .sum::<usize>();
    let mut buf = String::with_capacity(cap);
    buf.push(char::from(tag as u8));
    for &b in bytes {
        push_hex(&mut buf, b);
    }
    for s in strings {
        // Only the last field can saturate here; its length is never read.
        let len = u16::try_from(s.len()).unwrap_or(u16::MAX);
        for b in len.to_le_bytes() {
            push_hex(&mut buf, b);
        }
        buf.push_str(s);
    }
    buf
}

/// Whether `s` is an encoded lazy type rather than a resolved name.
pub fn is_lazy(s: &str) -> bool {
    s.as_bytes().first().is_some_and(|&b| b < LAZY_TAG_MAX)
}

pub fn lazy_tag(s: &str) -> Option<LazyTag> {
    s.as_bytes().first().and_then(|&b| LazyTag::from_byte(b))
}

pub fn wrap_static_method_call(class: &str, method: &str) -> String {
    encode_fields(LazyTag::StaticMethodCall, &[], &[class, method])
}

pub fn wrap_instance_method_call(expr: &str, method: &str) -> String {
    encode_fields(LazyTag::InstanceMethodCall, &[], &[expr, method])
}

/// The property name is stored with its `$`, which is added when missing.
pub fn wrap_static_property_fetch(class: &str, prop: &str) -> String {
    if prop.starts_with('$') {
        encode_fields(LazyTag::StaticPropertyFetch, &[], &[class, prop])
    } else {
        let prop = format!("${prop}");
        encode_fields(LazyTag::StaticPropertyFetch, &[], &[class, prop.as_str()])
    }
}

pub fn wrap_class_const_fetch(class: &str, constant: &str) -> String {
    encode_fields(LazyTag::ClassConstFetch, &[], &[class, constant])
}

pub fn wrap_instance_property_fetch(expr: &str, prop: &str) -> String {
    encode_fields(LazyTag::InstancePropertyFetch, &[], &[expr, prop])
}

pub fn wrap_function_call(name: &str) -> String {
    encode_fields(LazyTag::FunctionCall, &[], &[name])
}

pub fn wrap_array_of(elem: &str) -> String {
    encode_fields(LazyTag::ArrayOf, &[], &[elem])
}

/// Array with a key type. Key types are not tracked, so this is
/// `wrap_array_of(value)`.
pub fn wrap_array2(_key: &str, value: &str) -> String {
    wrap_array_of(value)
}

/// Element of `typ`. `elem_of(array_of(T))` is `T` itself.
pub fn wrap_elem_of(typ: &str) -> String {
    if let Some(inner) = array_of_payload(typ) {
        return inner.to_owned();
    }
    encode_fields(LazyTag::ElemOf, &[], &[typ])
}

/// Element of `typ` at `key`. `elem_of_key(array_of(T), _)` is `T` itself.
pub fn wrap_elem_of_key(typ: &str, key: &str) -> String {
    if let Some(inner) = array_of_payload(typ) {
        return inner.to_owned();
    }
    encode_fields(LazyTag::ElemOfKey, &[], &[typ, key])
}

pub fn wrap_global(name: &str) -> String {
    encode_fields(LazyTag::Global, &[], &[name])
}

pub fn wrap_constant(name: &str) -> String {
    encode_fields(LazyTag::Constant, &[], &[name])
}

pub fn wrap_base_method_param(index: u8, class: &str, method: &str) -> String {
    encode_fields(LazyTag::BaseMethodParam, &[index], &[class, method])
}

/// Payload of an `array_of` encoding, skipping its (unread) length.
fn array_of_payload(typ: &str) -> Option<&str> {
    if lazy_tag(typ) != Some(LazyTag::ArrayOf) {
        return None;
    }
    typ.get(1 + STRING_LEN_DIGITS..)
}

/// Decode `s` expecting `want`; faults are logged and yield `None`.
fn decode_as(s: &str, want: LazyTag) -> Option<LazyType> {
    match LazyType::decode(s) {
        Ok(lazy) if lazy.tag() == want => Some(lazy),
        Ok(lazy) => {
            tracing::warn!(want = %want, found = %lazy.tag(), "unexpected lazy type kind");
            None
        }
        Err(err) => {
            tracing::warn!(want = %want, %err, "decode type string error");
            None
        }
    }
}

pub fn unwrap_static_method_call(s: &str) -> (String, String) {
    match decode_as(s, LazyTag::StaticMethodCall) {
        Some(LazyType::StaticMethodCall { class, method }) => (class, method),
        _ => Default::default(),
    }
}

pub fn unwrap_instance_method_call(s: &str) -> (String, String) {
    match decode_as(s, LazyTag::InstanceMethodCall) {
        Some(LazyType::InstanceMethodCall { expr, method }) => (expr, method),
        _ => Default::default(),
    }
}

pub fn unwrap_static_property_fetch(s: &str) -> (String, String) {
    match decode_as(s, LazyTag::StaticPropertyFetch) {
        Some(LazyType::StaticPropertyFetch { class, prop }) => (class, prop),
        _ => Default::default(),
    }
}

pub fn unwrap_class_const_fetch(s: &str) -> (String, String) {
    match decode_as(s, LazyTag::ClassConstFetch) {
        Some(LazyType::ClassConstFetch { class, constant }) => (class, constant),
        _ => Default::default(),
    }
}

pub fn unwrap_instance_property_fetch(s: &str) -> (String, String) {
    match decode_as(s, LazyTag::InstancePropertyFetch) {
        Some(LazyType::InstancePropertyFetch { expr, prop }) => (expr, prop),
        _ => Default::default(),
    }
}

pub fn unwrap_function_call(s: &str) -> String {
    match decode_as(s, LazyTag::FunctionCall) {
        Some(LazyType::FunctionCall { name }) => name,
        _ => String::new(),
    }
}

pub fn unwrap_array_of(s: &str) -> String {
    match decode_as(s, LazyTag::ArrayOf) {
        Some(LazyType::ArrayOf { elem }) => elem,
        _ => String::new(),
    }
}

pub fn unwrap_elem_of(s: &str) -> String {
    match decode_as(s, LazyTag::ElemOf) {
        Some(LazyType::ElemOf { expr }) => expr,
        _ => String::new(),
    }
}

pub fn unwrap_elem_of_key(s: &str) -> (String, String) {
    match decode_as(s, LazyTag::ElemOfKey) {
        Some(LazyType::ElemOfKey { expr, key }) => (expr, key),
        _ => Default::default(),
    }
}

pub fn unwrap_global(s: &str) -> String {
    match decode_as(s, LazyTag::Global) {
        Some(LazyType::Global { name }) => name,
        _ => String::new(),
    }
}

pub fn unwrap_constant(s: &str) -> String {
    match decode_as(s, LazyTag::Constant) {
        Some(LazyType::Constant { name }) => name,
        _ => String::new(),
    }
}

pub fn unwrap_base_method_param(s: &str) -> (u8, String, String) {
    match decode_as(s, LazyTag::BaseMethodParam) {
        Some(LazyType::BaseMethodParam {
            index,
            class,
            method,
        }) => (index, class, method),
        _ => Default::default(),
    }
}

/// Render a type string for humans.
///
/// Resolved names are returned unchanged. Lazy types are rendered as the
/// expression they stand for (`Foo::bar()`, `(\Foo)->x`, `elem(int[])[k]`).
/// Undecodable input renders as `panic!(orig='..', hex='..')`.
pub fn format_type(s: &str) -> String {
    if !is_lazy(s) {
        return s.to_owned();
    }
    verity_stack::ensure_sufficient_stack(|| match LazyType::decode(s) {
        Ok(lazy) => lazy.to_string(),
        Err(_) => {
            let mut hex = String::with_capacity(s.len() * 2);
            for b in s.bytes() {
                push_hex(&mut hex, b);
            }
            format!("panic!(orig='{s}', hex='{hex}')")
        }
    })
}

#[cfg(test)]
mod tests;
