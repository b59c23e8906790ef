//! Kernel build configuration (`.config` / `/proc/config.gz` contents).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{KscopeError, Result};

/// Parsed kconfig options
///
/// Keys are stored with their `CONFIG_` prefix. Options that were explicitly
/// disabled (`# CONFIG_FOO is not set`) are recorded as `n` so that an
/// explicitly disabled option still counts as "known".
///
/// ## Example
///
/// ```rust
/// use kscope_core::platform::KernelConfig;
///
/// let config = KernelConfig::parse(
///     "CONFIG_SPARSEMEM_VMEMMAP=y\n\
///      CONFIG_ARM64_VA_BITS=48\n\
///      ## CONFIG_X86_5LEVEL is not set\n",
/// )?;
/// assert!(config.has_config("CONFIG_SPARSEMEM_VMEMMAP"));
/// assert!(config.has_config("SPARSEMEM_VMEMMAP"));
/// assert!(!config.has_config("CONFIG_X86_5LEVEL"));
/// assert_eq!(config.value("CONFIG_ARM64_VA_BITS"), Some("48"));
/// # Ok::<(), kscope_core::KscopeError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelConfig
{
    options: HashMap<String, String>,
}

fn canonical(flag: &str) -> String
{
    if flag.starts_with("CONFIG_") {
        flag.to_string()
    } else {
        format!("CONFIG_{flag}")
    }
}

impl KernelConfig
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Parse kconfig text
    ///
    /// ## Errors
    ///
    /// Returns `Parse` for a non-comment line that is not `CONFIG_NAME=value`.
    pub fn parse(text: &str) -> Result<Self>
    {
        let mut options = HashMap::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                if let Some(name) = comment.trim().strip_suffix(" is not set") {
                    if name.starts_with("CONFIG_") {
                        options.insert(name.to_string(), "n".to_string());
                    }
                }
                continue;
            }
            let (name, value) = line
                .split_once('=')
                .filter(|(name, _)| name.starts_with("CONFIG_"))
                .ok_or_else(|| KscopeError::Parse(format!("kconfig line {}: {raw:?}", lineno + 1)))?;
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            options.insert(name.to_string(), value.to_string());
        }
        Ok(Self { options })
    }

    /// Read and parse a kconfig file
    ///
    /// ## Errors
    ///
    /// `Io` if the file cannot be read, `Parse` for malformed content.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self>
    {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Set an option (`y`, `m`, `n` or a value)
    #[must_use]
    pub fn with(mut self, flag: &str, value: &str) -> Self
    {
        self.options.insert(canonical(flag), value.to_string());
        self
    }

    /// Whether the option is built in or modular
    pub fn has_config(&self, flag: &str) -> bool
    {
        matches!(self.options.get(&canonical(flag)).map(String::as_str), Some("y" | "m"))
    }

    /// Raw value of an option
    pub fn value(&self, flag: &str) -> Option<&str>
    {
        self.options.get(&canonical(flag)).map(String::as_str)
    }

    /// Numeric value of an option (decimal or `0x` hexadecimal)
    pub fn number(&self, flag: &str) -> Option<u64>
    {
        let value = self.value(flag)?;
        match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => value.parse().ok(),
        }
    }

    /// True when nothing is known about the configuration
    pub fn is_empty(&self) -> bool
    {
        self.options.is_empty()
    }

    pub fn len(&self) -> usize
    {
        self.options.len()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for KernelConfig
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self
    {
        let options = iter
            .into_iter()
            .map(|(k, v)| (canonical(k.as_ref()), v.into()))
            .collect();
        Self { options }
    }
}
