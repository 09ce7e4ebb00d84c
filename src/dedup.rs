//! Content deduplication of normalized element captures.
//!
//! Two captures are the same asset when their normalized bitmaps have the
//! same fingerprint (pixel bytes and dimensions). The first bitmap seen for a
//! fingerprint becomes the representative; later ones only add their logical
//! name to the member list.

use crate::imaging::{Fingerprint, NormalizedBitmap};
use std::collections::HashMap;

/// One unique image and every logical name that produced it.
#[derive(Debug, Clone)]
pub struct CanonicalAsset {
    bitmap: NormalizedBitmap,
    members: Vec<String>,
}

impl CanonicalAsset {
    pub fn fingerprint(&self) -> &Fingerprint {
        self.bitmap.fingerprint()
    }

    pub fn bitmap(&self) -> &NormalizedBitmap {
        &self.bitmap
    }

    /// Member names in insertion order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Lexicographically smallest member name.
    pub fn primary_name(&self) -> &str {
        self.members
            .iter()
            .min()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn sorted_members(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.members.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn size(&self) -> (u32, u32) {
        self.bitmap.size()
    }
}

#[derive(Debug, Default)]
pub struct ContentDeduplicator {
    assets: Vec<CanonicalAsset>,
    index: HashMap<Fingerprint, usize>,
}

impl ContentDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capture under `name`, returning the asset it belongs to.
    pub fn add(&mut self, name: &str, bitmap: NormalizedBitmap) -> &CanonicalAsset {
        match self.index.get(bitmap.fingerprint()) {
            Some(&i) => {
                let asset = &mut self.assets[i];
                if !asset.members.iter().any(|m| m == name) {
                    asset.members.push(name.to_string());
                }
                &self.assets[i]
            }
            None => {
                let i = self.assets.len();
                self.index.insert(bitmap.fingerprint().clone(), i);
                self.assets.push(CanonicalAsset {
                    bitmap,
                    members: vec![name.to_string()],
                });
                &self.assets[i]
            }
        }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn assets(&self) -> &[CanonicalAsset] {
        &self.assets
    }

    pub fn into_assets(self) -> Vec<CanonicalAsset> {
        self.assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::solid_bitmap;

    #[test]
    fn identical_pixels_collapse_into_one_asset() {
        let mut dedup = ContentDeduplicator::new();
        dedup.add("led_on", solid_bitmap(32, 32, [0, 255, 0]));
        let asset = dedup.add("led_alt_on", solid_bitmap(32, 32, [0, 255, 0]));
        assert_eq!(asset.members(), ["led_on", "led_alt_on"]);
        assert_eq!(asset.sorted_members(), ["led_alt_on", "led_on"]);
        assert_eq!(asset.primary_name(), "led_alt_on");
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn different_pixels_stay_separate() {
        let mut dedup = ContentDeduplicator::new();
        dedup.add("on", solid_bitmap(8, 8, [0, 255, 0]));
        dedup.add("off", solid_bitmap(8, 8, [0, 60, 0]));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn same_bytes_different_size_stay_separate() {
        let mut dedup = ContentDeduplicator::new();
        dedup.add("wide", solid_bitmap(4, 1, [5, 5, 5]));
        dedup.add("square", solid_bitmap(2, 2, [5, 5, 5]));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn repeated_name_is_not_duplicated() {
        let mut dedup = ContentDeduplicator::new();
        dedup.add("icon", solid_bitmap(4, 4, [1, 1, 1]));
        let asset = dedup.add("icon", solid_bitmap(4, 4, [1, 1, 1]));
        assert_eq!(asset.members(), ["icon"]);
    }

    #[test]
    fn first_bitmap_is_the_representative() {
        let mut dedup = ContentDeduplicator::new();
        let first = solid_bitmap(4, 4, [1, 1, 1]);
        dedup.add("a", first.clone());
        dedup.add("b", solid_bitmap(4, 4, [1, 1, 1]));
        assert_eq!(dedup.assets()[0].bitmap(), &first);
        assert_eq!(dedup.assets()[0].size(), (4, 4));
    }
}
