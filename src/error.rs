//! Error taxonomy for the conversion engine.
//!
//! Pure transform functions return these as values so batch conversion can
//! report which record failed without unwinding through the whole run.

/// Failures produced by the conversion engine.
///
/// `MalformedEvent` and `InvalidId` are fatal for the batch: the target
/// format readers have no tolerance for malformed fixed-layout blocks, so
/// aborting beats emitting a partially corrupt container. Missing resources
/// and tool failures are handled by exclusion at the call site.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    /// Identifier arithmetic would corrupt the layer digits.
    #[error("animation id {base} with layer {layer} does not fit unit {unit}")]
    InvalidId { base: u64, layer: u32, unit: u64 },

    /// Parameter block shorter than the field offsets assumed for its type.
    #[error("event type {event_type}: parameter block is {len} bytes, need {needed}")]
    MalformedEvent {
        event_type: u16,
        len: usize,
        needed: usize,
    },

    /// A resource the conversion depends on is absent from the source.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// The external downgrade tool chain failed for one entry.
    #[error("downgrade tool failed for {0}")]
    ExternalTool(String),

    /// A rule or catalog document could not be parsed.
    #[error("malformed rule document {path}: {reason}")]
    MalformedRules { path: String, reason: String },

    /// Run options that cannot drive a conversion.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// No catalog entry matches a retargeted material.
    #[error("material '{0}' has no entry in the target catalog")]
    UnknownMaterial(String),
}
