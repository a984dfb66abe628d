//! Store-wide configuration (spec.md section 6, "Configuration").

/// Tunables for a [`crate::store::Store`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreConfig {
    /// When true, an inbound row whose first column carries the "unknown"
    /// pseudo-type is silently promoted to text before descriptor capture
    /// or validation (spec.md section 4.1).
    #[cfg_attr(feature = "serde", serde(default = "default_convert_unknownoid"))]
    pub convert_unknownoid: bool,
}

fn default_convert_unknownoid() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            convert_unknownoid: true,
        }
    }
}
