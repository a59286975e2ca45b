//! Container-wide configuration toggles.

/// Immutable settings consumed by the resolution core.
///
/// A settings value is injected into the kernel at build time and read from
/// every [`Context`](crate::Context) during resolution. It is never mutated
/// after `build()`.
///
/// # Examples
///
/// ```rust
/// use shinobi_di::{ContainerSettings, KernelBuilder};
///
/// let mut builder = KernelBuilder::new();
/// builder.with_settings(ContainerSettings {
///     allow_null_injection: true,
///     ..ContainerSettings::default()
/// });
/// let kernel = builder.build();
/// assert!(kernel.settings().allow_null_injection);
/// ```
#[derive(Debug, Clone)]
pub struct ContainerSettings {
    /// Whether a provider producing nothing is a valid resolved value.
    ///
    /// When `false` (the default), a provider that yields `None` fails the
    /// resolution with a descriptive error. When `true`, the empty value
    /// propagates: `try_get` returns `Ok(None)` and directive arguments
    /// receive `None`.
    pub allow_null_injection: bool,
    /// Whether resolution checks the active-binding stack for cycles.
    ///
    /// Adds one stack scan per resolution; without it a cyclic binding graph
    /// recurses until the depth guard trips.
    pub detect_cycles: bool,
    /// Hard bound on nested resolution depth.
    pub max_resolution_depth: usize,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            allow_null_injection: false,
            detect_cycles: true,
            max_resolution_depth: 128,
        }
    }
}
