/// Build an [`ObjectRef`](crate::ObjectRef) of plain data from JSON-like syntax.
///
/// ```
/// let settings = stow::object!({ "theme": "dark", "recent": [1, 2, 3] });
/// assert!(settings.read().unwrap().contains_key("theme"));
/// ```
#[macro_export]
macro_rules! object {
    ({ $($tt:tt)* }) => {
        match $crate::__private::json!({ $($tt)* }) {
            $crate::__private::Json::Object(map) => $crate::ObjectRef::from(map),
            _ => unreachable!("json object literal"),
        }
    };
}
