/// Builds a [`Value`](crate::Value) from a JSON-like literal.
///
/// Object keys must be string literals. Negative numbers and other
/// multi-token expressions need parentheses inside arrays and objects:
///
/// ```
/// use keyplan_value::{value, Value};
///
/// let v = value!({"id": 7, "tags": ["a", "b"], "delta": (-2), "parent": null});
/// assert_eq!(v.get("delta"), Some(&Value::from(-2)));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(::std::vec![ $( $crate::value!($elem) ),* ])
    };
    ({ $($key:literal : $val:tt),* $(,)? }) => {{
        #[allow(unused_mut)]
        let mut object = $crate::Object::new();
        $(
            object.insert(::std::string::String::from($key), $crate::value!($val));
        )*
        $crate::Value::Object(object)
    }};
    ($other:expr) => {
        $crate::Value::from($other)
    };
}
