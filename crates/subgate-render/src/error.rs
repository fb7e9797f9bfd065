//! Renderer error types.

/// Error produced by the structured-config renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Neither slot produced a typed proxy (terminal for the structured
    /// format; the aggregated format can always render raw share links).
    #[error("no renderable proxy: neither slot has a usable descriptor")]
    NoRenderableProxy,

    /// The assembled document failed to serialize.
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
