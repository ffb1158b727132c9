//! Deterministic cache keys.

use std::fmt;

use regrid_core::repres::Representation;

use crate::mask::Mask;

/// A content-addressed cache key.
///
/// Weight keys read `<method>.<input-id>.<output-id>[.IM<id>][.OM<id>]`;
/// the mask segments appear only when the corresponding mask is active,
/// which keeps masked and unmasked entries for the same grid pair apart.
/// Identical inputs always produce identical keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// The key for a weight matrix.
    pub fn weights(
        method: &str,
        input: &dyn Representation,
        output: &dyn Representation,
        input_mask: Option<&Mask>,
        output_mask: Option<&Mask>,
    ) -> Self {
        let mut key = format!("{method}.{}.{}", input.unique_id(), output.unique_id());
        if let Some(mask) = input_mask {
            key.push_str(".IM");
            key.push_str(mask.unique_id());
        }
        if let Some(mask) = output_mask {
            key.push_str(".OM");
            key.push_str(mask.unique_id());
        }
        Self(key)
    }

    /// The key for a land-sea mask.
    pub fn mask(provider: &str, representation: &dyn Representation) -> Self {
        Self(format!("{provider}.{}", representation.unique_id()))
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The on-disk file name for this key.
    pub fn file_name(&self) -> String {
        format!("{}.cache", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
