//! Size buckets for variable icons.
//!
//! The firmware addresses an icon as "image N of the group for this size", so
//! canonical assets are grouped by exact pixel size and numbered within each
//! group. Numbering is by smallest member name, then fingerprint, which keeps
//! indices stable across runs no matter in which order captures arrived.

use crate::dedup::CanonicalAsset;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SizeKey {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for SizeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone)]
pub struct SizeBucket {
    pub key: SizeKey,
    /// Index in this list is the icon index.
    pub assets: Vec<CanonicalAsset>,
}

impl SizeBucket {
    /// Directory name, e.g. `32x32`.
    pub fn label(&self) -> String {
        self.key.to_string()
    }
}

pub type Buckets = BTreeMap<SizeKey, SizeBucket>;

pub fn bucket(assets: impl IntoIterator<Item = CanonicalAsset>) -> Buckets {
    let mut buckets = Buckets::new();
    for asset in assets {
        let (width, height) = asset.size();
        let key = SizeKey { width, height };
        buckets
            .entry(key)
            .or_insert_with(|| SizeBucket {
                key,
                assets: Vec::new(),
            })
            .assets
            .push(asset);
    }
    for b in buckets.values_mut() {
        b.assets.sort_by(|a, b| {
            a.primary_name()
                .cmp(b.primary_name())
                .then_with(|| a.fingerprint().cmp(b.fingerprint()))
        });
    }
    buckets
}

/// Size and index of the asset `name` belongs to.
pub fn locate(buckets: &Buckets, name: &str) -> Option<(SizeKey, usize)> {
    buckets.values().find_map(|b| {
        b.assets
            .iter()
            .position(|a| a.members().iter().any(|m| m == name))
            .map(|i| (b.key, i))
    })
}

/// Icon file name for an index: `00.bmp`, `01.bmp`, ...
pub fn icon_file_name(index: usize) -> String {
    format!("{index:02}.bmp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::ContentDeduplicator;
    use crate::imaging::Fingerprint;
    use crate::test_helpers::solid_bitmap;

    fn dedup_of(items: &[(&str, u32, u32, [u8; 3])]) -> Vec<CanonicalAsset> {
        let mut dedup = ContentDeduplicator::new();
        for (name, w, h, color) in items {
            dedup.add(name, solid_bitmap(*w, *h, *color));
        }
        dedup.into_assets()
    }

    #[test]
    fn groups_by_exact_size() {
        let buckets = bucket(dedup_of(&[
            ("led_on", 32, 32, [0, 255, 0]),
            ("led_alt_on", 32, 32, [0, 255, 0]),
            ("arrow", 16, 16, [9, 9, 9]),
        ]));
        assert_eq!(buckets.len(), 2);
        assert_eq!(
            locate(&buckets, "led_on"),
            Some((SizeKey { width: 32, height: 32 }, 0))
        );
        assert_eq!(
            locate(&buckets, "led_alt_on"),
            Some((SizeKey { width: 32, height: 32 }, 0))
        );
        assert_eq!(
            locate(&buckets, "arrow"),
            Some((SizeKey { width: 16, height: 16 }, 0))
        );
    }

    #[test]
    fn indices_ignore_arrival_order() {
        let items = [
            ("zeta", 8, 8, [1, 0, 0]),
            ("alpha", 8, 8, [2, 0, 0]),
            ("mid", 8, 8, [3, 0, 0]),
            ("alias", 8, 8, [1, 0, 0]),
        ];
        let mut reversed = items;
        reversed.reverse();

        let forward = bucket(dedup_of(&items));
        let backward = bucket(dedup_of(&reversed));
        for name in ["zeta", "alpha", "mid", "alias"] {
            assert_eq!(locate(&forward, name), locate(&backward, name), "{name}");
        }
        // "alias" and "zeta" share pixels; the pair sorts under "alias"
        let key = SizeKey { width: 8, height: 8 };
        assert_eq!(locate(&forward, "alias"), Some((key, 0)));
        assert_eq!(locate(&forward, "alpha"), Some((key, 1)));
        assert_eq!(locate(&forward, "mid"), Some((key, 2)));
        assert_eq!(locate(&forward, "zeta"), Some((key, 0)));
    }

    #[test]
    fn same_name_ties_break_on_fingerprint() {
        // One element name captured on two pages with different pixels
        let items = [("led", 8, 8, [200, 0, 0]), ("led", 8, 8, [0, 0, 200])];
        let mut reversed = items;
        reversed.reverse();

        let order = |buckets: &Buckets| -> Vec<Fingerprint> {
            let key = SizeKey { width: 8, height: 8 };
            buckets[&key].assets.iter().map(|a| a.fingerprint().clone()).collect()
        };
        let forward = order(&bucket(dedup_of(&items)));
        let backward = order(&bucket(dedup_of(&reversed)));
        assert_eq!(forward.len(), 2);
        assert_eq!(forward, backward);
        assert!(forward[0] < forward[1]);
    }

    #[test]
    fn unknown_name_is_not_located() {
        let buckets = bucket(dedup_of(&[("a", 2, 2, [0, 0, 0])]));
        assert_eq!(locate(&buckets, "b"), None);
    }

    #[test]
    fn labels_and_file_names() {
        let buckets = bucket(dedup_of(&[("a", 48, 16, [0, 0, 0])]));
        assert_eq!(buckets.values().next().unwrap().label(), "48x16");
        assert_eq!(icon_file_name(0), "00.bmp");
        assert_eq!(icon_file_name(7), "07.bmp");
        assert_eq!(icon_file_name(123), "123.bmp");
    }

    #[test]
    fn buckets_iterate_in_size_order() {
        let buckets = bucket(dedup_of(&[
            ("big", 64, 64, [0, 0, 0]),
            ("small", 16, 16, [0, 0, 0]),
            ("wide", 16, 8, [0, 0, 0]),
        ]));
        let labels: Vec<String> = buckets.values().map(SizeBucket::label).collect();
        assert_eq!(labels, ["16x8", "16x16", "64x64"]);
    }
}
