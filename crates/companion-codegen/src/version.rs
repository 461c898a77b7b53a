//! Language version constants.

/// Default YAIL language version shipped with this generator.
pub const DEFAULT_YA_VERSION: u32 = 233;
/// Default blocks language version shipped with this generator.
pub const DEFAULT_BLOCKS_VERSION: u32 = 37;

/// The (yaVersion, blocksVersion) pair programs are generated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageVersion {
    /// YAIL language version.
    pub ya_version: u32,
    /// Blocks language version.
    pub blocks_version: u32,
}

impl LanguageVersion {
    /// Create a version pair.
    #[must_use]
    pub const fn new(ya_version: u32, blocks_version: u32) -> Self {
        Self {
            ya_version,
            blocks_version,
        }
    }

    /// Whether a blocks file saved with `blocks_version` can be read.
    #[must_use]
    pub fn accepts_blocks(&self, blocks_version: u32) -> bool {
        blocks_version <= self.blocks_version
    }
}

impl Default for LanguageVersion {
    fn default() -> Self {
        Self::new(DEFAULT_YA_VERSION, DEFAULT_BLOCKS_VERSION)
    }
}
