use container_cli::InspectDocument;

/// Label set by control/user-plane images that can pair with several SPGW-U.
pub const MULTI_SGWU_LABEL: &str = "support-multi-sgwu-instances";

/// How a gateway image is brought up and configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStrategy {
    /// The image configures itself from an env list and runs its daemon on start.
    Entrypoint,
    /// Idle container; configured by a copied-in script, daemon started by hand.
    Legacy,
}

impl LaunchStrategy {
    pub fn detect(image: &InspectDocument) -> Self {
        if image.declares_entrypoint() {
            Self::Entrypoint
        } else {
            Self::Legacy
        }
    }
}

/// A multi-SGW-U control plane cannot pair with a user-plane image lacking
/// the same capability; such images are swapped for the `multi-spgwu` build.
pub fn needs_multi_spgwu_fallback(spgwc: &InspectDocument, spgwu_image: &InspectDocument) -> bool {
    spgwc.label_is_true(MULTI_SGWU_LABEL) && !spgwu_image.label_is_true(MULTI_SGWU_LABEL)
}
