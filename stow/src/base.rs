/// Prefix prepended to every caller key unless overridden.
///
/// The version segment lets a future wire-format change start from a clean
/// namespace instead of decoding stale entries.
pub const DEFAULT_PREFIX: &str = "stow:v1:";

/// Effective slot name on the backing facility: `prefix + key`, verbatim.
pub fn namespace_key(prefix: &str, key: &str) -> String {
    let mut namespaced = String::with_capacity(prefix.len() + key.len());
    namespaced.push_str(prefix);
    namespaced.push_str(key);
    namespaced
}

// todo Let applications supply their own qualifier and organization
#[cfg(feature = "project_dir")]
pub(crate) static PROJECT_DIRS: std::sync::LazyLock<Option<directories::ProjectDirs>> =
    std::sync::LazyLock::new(|| directories::ProjectDirs::from("dev", "stow", "stow"));

macro_rules! trace {
    ($($arg:tt)*) => {
        {#[cfg(feature = "tracing")] ::tracing::trace!($($arg)*);}
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        {#[cfg(feature = "tracing")] ::tracing::debug!($($arg)*);}
    };
}

// `warn` itself would clash with the built-in lint attribute
macro_rules! warning {
    ($($arg:tt)*) => {
        {#[cfg(feature = "tracing")] ::tracing::warn!($($arg)*);}
    };
}

pub(crate) use {debug, trace, warning as warn};
