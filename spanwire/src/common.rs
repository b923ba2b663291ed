use std::borrow::{Borrow, Cow};
use std::sync::Arc;
use std::{fmt, hash};

/// The key part of attribute [KeyValue] pairs.
#[non_exhaustive]
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(AttrString);

impl Key {
    /// Create a new `Key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use spanwire::Key;
    /// use std::sync::Arc;
    ///
    /// let key1 = Key::new("my_static_str");
    /// let key2 = Key::new(String::from("my_owned_string"));
    /// let key3 = Key::new(Arc::from("my_ref_counted_str"));
    /// ```
    pub fn new(value: impl Into<Key>) -> Self {
        value.into()
    }

    /// Create a new const `Key`.
    pub const fn from_static_str(value: &'static str) -> Self {
        Key(AttrString::Static(value))
    }

    /// Returns a reference to the underlying key name
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&'static str> for Key {
    fn from(key_str: &'static str) -> Self {
        Key(AttrString::Static(key_str))
    }
}

impl From<String> for Key {
    fn from(string: String) -> Self {
        Key(AttrString::Owned(string.into_boxed_str()))
    }
}

impl From<Arc<str>> for Key {
    fn from(string: Arc<str>) -> Self {
        Key(AttrString::RefCounted(string))
    }
}

impl From<Cow<'static, str>> for Key {
    fn from(string: Cow<'static, str>) -> Self {
        match string {
            Cow::Borrowed(s) => Key(AttrString::Static(s)),
            Cow::Owned(s) => Key(AttrString::Owned(s.into_boxed_str())),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(fmt)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0.as_str().to_owned()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.0.as_str())
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Clone, Debug, Eq)]
enum AttrString {
    Owned(Box<str>),
    Static(&'static str),
    RefCounted(Arc<str>),
}

impl AttrString {
    fn as_str(&self) -> &str {
        match self {
            AttrString::Owned(s) => s.as_ref(),
            AttrString::Static(s) => s,
            AttrString::RefCounted(s) => s.as_ref(),
        }
    }
}

impl PartialOrd for AttrString {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttrString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialEq for AttrString {
    fn eq(&self, other: &Self) -> bool {
        self.as_str().eq(other.as_str())
    }
}

impl hash::Hash for AttrString {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

/// A [Value::Array] containing homogeneous values.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum Array {
    /// Array of bools
    Bool(Vec<bool>),
    /// Array of integers
    I64(Vec<i64>),
    /// Array of floats
    F64(Vec<f64>),
    /// Array of strings
    String(Vec<StringValue>),
}

impl Array {
    /// Number of elements in the array.
    pub fn len(&self) -> usize {
        match self {
            Array::Bool(values) => values.len(),
            Array::I64(values) => values.len(),
            Array::F64(values) => values.len(),
            Array::String(values) => values.len(),
        }
    }

    /// Returns `true` if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Array {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Array::Bool(values) => display_array_str(values, fmt),
            Array::I64(values) => display_array_str(values, fmt),
            Array::F64(values) => display_array_str(values, fmt),
            Array::String(values) => {
                write!(fmt, "[")?;
                for (i, t) in values.iter().enumerate() {
                    if i > 0 {
                        write!(fmt, ",")?;
                    }
                    write!(fmt, "\"{}\"", t)?;
                }
                write!(fmt, "]")
            }
        }
    }
}

fn display_array_str<T: fmt::Display>(slice: &[T], fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(fmt, "[")?;
    for (i, t) in slice.iter().enumerate() {
        if i > 0 {
            write!(fmt, ",")?;
        }
        write!(fmt, "{}", t)?;
    }
    write!(fmt, "]")
}

macro_rules! into_array {
    ($(($t:ty, $val:expr),)+) => {
        $(
            impl From<$t> for Array {
                fn from(t: $t) -> Self {
                    $val(t)
                }
            }
        )+
    }
}

into_array!(
    (Vec<bool>, Array::Bool),
    (Vec<i64>, Array::I64),
    (Vec<f64>, Array::F64),
    (Vec<StringValue>, Array::String),
);

impl From<Vec<i32>> for Array {
    fn from(values: Vec<i32>) -> Self {
        Array::I64(values.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<&'static str>> for Array {
    fn from(values: Vec<&'static str>) -> Self {
        Array::String(values.into_iter().map(StringValue::from).collect())
    }
}

impl From<Vec<String>> for Array {
    fn from(values: Vec<String>) -> Self {
        Array::String(values.into_iter().map(StringValue::from).collect())
    }
}

/// The value part of attribute [KeyValue] pairs.
///
/// The variant is decided once, when the value is converted at the call
/// boundary. Types without a dedicated variant go through
/// [`Value::from_display`] and become strings.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// bool values
    Bool(bool),
    /// i64 values
    I64(i64),
    /// f64 values
    F64(f64),
    /// String values
    String(StringValue),
    /// Array of homogeneous values
    Array(Array),
}

/// Wrapper for string-like values
#[non_exhaustive]
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StringValue(AttrString);

impl fmt::Debug for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for StringValue {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl StringValue {
    /// Returns a string slice to this value
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<StringValue> for String {
    fn from(s: StringValue) -> Self {
        s.0.as_str().to_owned()
    }
}

impl From<&'static str> for StringValue {
    fn from(s: &'static str) -> Self {
        StringValue(AttrString::Static(s))
    }
}

impl From<String> for StringValue {
    fn from(s: String) -> Self {
        StringValue(AttrString::Owned(s.into_boxed_str()))
    }
}

impl From<Arc<str>> for StringValue {
    fn from(s: Arc<str>) -> Self {
        StringValue(AttrString::RefCounted(s))
    }
}

impl From<Cow<'static, str>> for StringValue {
    fn from(s: Cow<'static, str>) -> Self {
        match s {
            Cow::Owned(s) => StringValue(AttrString::Owned(s.into_boxed_str())),
            Cow::Borrowed(s) => StringValue(AttrString::Static(s)),
        }
    }
}

impl Value {
    /// String representation of the `Value`
    ///
    /// This will allocate iff the underlying value is not a `String`.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Value::Bool(v) => format!("{}", v).into(),
            Value::I64(v) => format!("{}", v).into(),
            Value::F64(v) => format!("{}", v).into(),
            Value::String(v) => Cow::Borrowed(v.as_str()),
            Value::Array(v) => format!("{}", v).into(),
        }
    }

    /// Coerce any displayable value into a string attribute.
    ///
    /// This is the fallback arm for types the codec has no variant for.
    ///
    /// ```
    /// use spanwire::Value;
    /// use std::net::Ipv4Addr;
    ///
    /// let value = Value::from_display(&Ipv4Addr::LOCALHOST);
    /// assert_eq!(value.as_str(), "127.0.0.1");
    /// ```
    pub fn from_display<T: fmt::Display + ?Sized>(value: &T) -> Self {
        Value::String(value.to_string().into())
    }
}

macro_rules! from_values {
   (
        $(
            ($t:ty, $val:expr);
        )+
    ) => {
        $(
            impl From<$t> for Value {
                fn from(t: $t) -> Self {
                    $val(t)
                }
            }
        )+
    }
}

from_values!(
    (bool, Value::Bool);
    (i64, Value::I64);
    (f64, Value::F64);
    (StringValue, Value::String);
    (Array, Value::Array);
);

macro_rules! from_lossless_ints {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(t: $t) -> Self {
                    Value::I64(i64::from(t))
                }
            }
        )+
    }
}

from_lossless_ints!(i8, i16, i32, u8, u16, u32);

macro_rules! from_wide_ints {
    ($($t:ty),+) => {
        $(
            impl From<$t> for Value {
                /// Integers outside the `i64` range keep their exact digits as a string.
                fn from(t: $t) -> Self {
                    match i64::try_from(t) {
                        Ok(v) => Value::I64(v),
                        Err(_) => Value::from_display(&t),
                    }
                }
            }
        )+
    }
}

from_wide_ints!(u64, usize, isize, i128, u128);

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::F64(f64::from(f))
    }
}

impl From<&'static str> for Value {
    fn from(s: &'static str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Value::String(s.into())
    }
}

impl From<Cow<'static, str>> for Value {
    fn from(s: Cow<'static, str>) -> Self {
        Value::String(s.into())
    }
}

impl<T> From<Vec<T>> for Value
where
    Array: From<Vec<T>>,
{
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Value> for Value {
    /// Scalars keep their type, homogeneous scalar arrays become typed arrays
    /// and everything else (objects, mixed or nested arrays, null) is stored
    /// as its JSON text.
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::I64(i),
                None => match n.as_f64() {
                    Some(f) if n.is_f64() => Value::F64(f),
                    _ => Value::from_display(&n),
                },
            },
            Json::String(s) => Value::String(s.into()),
            Json::Array(items) => json_array(items),
            other => Value::from_display(&other),
        }
    }
}

#[cfg(feature = "json")]
fn json_array(items: Vec<serde_json::Value>) -> Value {
    use serde_json::Value as Json;

    if items.iter().all(Json::is_boolean) {
        return Value::Array(Array::Bool(
            items.iter().filter_map(Json::as_bool).collect(),
        ));
    }
    if items.iter().all(Json::is_i64) {
        return Value::Array(Array::I64(items.iter().filter_map(Json::as_i64).collect()));
    }
    if items.iter().all(Json::is_number) {
        return Value::Array(Array::F64(items.iter().filter_map(Json::as_f64).collect()));
    }
    if items.iter().all(Json::is_string) {
        return Value::Array(Array::String(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Json::String(s) => Some(StringValue::from(s)),
                    _ => None,
                })
                .collect(),
        ));
    }
    Value::from_display(&Json::Array(items))
}

impl fmt::Display for Value {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => v.fmt(fmt),
            Value::I64(v) => v.fmt(fmt),
            Value::F64(v) => v.fmt(fmt),
            Value::String(v) => fmt.write_str(v.as_str()),
            Value::Array(v) => v.fmt(fmt),
        }
    }
}

/// A key-value pair describing an attribute.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct KeyValue {
    /// The attribute name
    pub key: Key,

    /// The attribute value
    pub value: Value,
}

impl KeyValue {
    /// Create a new `KeyValue` pair.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths_collapse_to_i64() {
        assert_eq!(Value::from(7u8), Value::I64(7));
        assert_eq!(Value::from(-7i32), Value::I64(-7));
        assert_eq!(Value::from(42usize), Value::I64(42));
        assert_eq!(Value::from(u64::MAX), Value::String(u64::MAX.to_string().into()));
    }

    #[test]
    fn homogeneous_lists_become_arrays() {
        assert_eq!(
            Value::from(vec![1_i64, 2, 3]),
            Value::Array(Array::I64(vec![1, 2, 3]))
        );
        assert_eq!(
            Value::from(vec!["a", "b"]),
            Value::Array(Array::String(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            Value::from(vec![true, false]).to_string(),
            "[true,false]".to_string()
        );
    }

    #[test]
    fn unknown_types_fall_back_to_display() {
        let addr: std::net::SocketAddr = "10.0.0.1:8080".parse().unwrap();
        assert_eq!(
            KeyValue::new("peer", Value::from_display(&addr)).value,
            Value::String("10.0.0.1:8080".into())
        );
    }

    #[test]
    fn key_conversions_agree() {
        let a = Key::new("service.name");
        let b = Key::new(String::from("service.name"));
        let c = Key::new(Arc::<str>::from("service.name"));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(String::from(c), "service.name");
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_values_are_coerced() {
        use serde_json::json;

        #[rustfmt::skip]
        let cases = vec![
            (json!(true), Value::Bool(true)),
            (json!(12), Value::I64(12)),
            (json!(1.5), Value::F64(1.5)),
            (json!("s"), Value::String("s".into())),
            (json!(null), Value::String("null".into())),
            (json!([1, 2]), Value::Array(Array::I64(vec![1, 2]))),
            (json!([1.5, 2]), Value::Array(Array::F64(vec![1.5, 2.0]))),
            (json!(["x", "y"]), Value::Array(Array::String(vec!["x".into(), "y".into()]))),
            (json!([1, "y"]), Value::String("[1,\"y\"]".into())),
            (json!({"a": 1}), Value::String("{\"a\":1}".into())),
        ];

        for (input, expected) in cases {
            assert_eq!(Value::from(input.clone()), expected, "input: {input}");
        }
    }
}
