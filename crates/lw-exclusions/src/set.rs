//! The exclusion list of one server collection.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use lw_types::{Guid, NoCase};

/// Patterns applied when neither the server nor the cache supplied a list.
pub const BUILT_IN_EXCLUSIONS: &str = "*.dll;*.exe;*.pdb;*.suo;*.user;*.cache;*.obj;*.lib;*.ilk;*.ncb;*.sdf;\
*.opensdf;*.ipch;*.vspscc;*.vssscc;*.tmp;bin;obj;TestResults;ipch;_ReSharper*;*.docstates;*.dbmdl;*.pch;*.aps";

/// Added to every default list, whatever its source.
pub const ALWAYS_EXCLUDED: &str = "*.class";

/// Timestamp reported when a collection has never received a server list.
pub fn unknown_update_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Default exclusions of one collection plus the bookkeeping needed to
/// merge them with a copy another process may have written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExclusionSet {
    default_exclusions: BTreeSet<NoCase>,
    /// Removed locally since the last save.
    removed_exclusions: BTreeSet<NoCase>,
    /// The default list was replaced since the last save.
    overwritten: bool,
    watermark: Guid,
    last_update: DateTime<Utc>,
}

impl ExclusionSet {
    /// A set holding the built-in list.
    pub fn new() -> Self {
        let default_exclusions = BUILT_IN_EXCLUSIONS
            .split(';')
            .chain([ALWAYS_EXCLUDED])
            .map(NoCase::from)
            .collect();
        Self {
            default_exclusions,
            removed_exclusions: BTreeSet::new(),
            overwritten: false,
            watermark: Guid::EMPTY,
            last_update: unknown_update_time(),
        }
    }

    /// A set as read back from disk.
    pub fn from_parts<I, S>(watermark: Guid, last_update: DateTime<Utc>, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            default_exclusions: exclusions.into_iter().map(NoCase::new).collect(),
            removed_exclusions: BTreeSet::new(),
            overwritten: false,
            watermark,
            last_update,
        }
    }

    /// Remove one default exclusion. Returns `false` if it was not present.
    pub fn remove_exclusion(&mut self, exclusion: &str) -> bool {
        let key = NoCase::new(exclusion);
        if !self.default_exclusions.remove(&key) {
            return false;
        }
        self.removed_exclusions.insert(key);
        true
    }

    /// Apply a default list sent by the server.
    ///
    /// The list replaces the current one only when `watermark` differs from
    /// the stored watermark. The update time is stamped either way.
    pub fn set_default_exclusions<I, S>(&mut self, watermark: Guid, exclusions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if watermark != self.watermark {
            self.default_exclusions = exclusions
                .into_iter()
                .map(NoCase::new)
                .chain([NoCase::from(ALWAYS_EXCLUDED)])
                .collect();
            let defaults = &self.default_exclusions;
            self.removed_exclusions.retain(|removed| !defaults.contains(removed));
            self.watermark = watermark;
            self.overwritten = true;
        }
        self.last_update = Utc::now();
    }

    /// Fold in the copy read from disk before saving.
    ///
    /// The disk list wins unless this set was overwritten since it was
    /// loaded; local removals are then subtracted from whichever list won.
    pub fn merge(&mut self, disk: &ExclusionSet) {
        if !self.overwritten {
            self.default_exclusions = disk.default_exclusions.clone();
            self.watermark = disk.watermark;
        }
        self.last_update = self.last_update.max(disk.last_update);
        let removed = &self.removed_exclusions;
        self.default_exclusions.retain(|e| !removed.contains(e));
    }

    /// Forget save bookkeeping after a successful write.
    pub fn mark_clean(&mut self) {
        self.overwritten = false;
        self.removed_exclusions.clear();
    }

    /// The effective exclusions, ordered case-insensitively.
    pub fn exclusions(&self) -> Vec<String> {
        self.default_exclusions.iter().map(|e| e.as_str().to_string()).collect()
    }

    pub fn watermark(&self) -> Guid {
        self.watermark
    }

    pub fn last_default_exclusion_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn is_overwritten(&self) -> bool {
        self.overwritten
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(set: &ExclusionSet) -> Vec<String> {
        set.exclusions()
    }

    #[test]
    fn bootstraps_with_built_in_list() {
        let set = ExclusionSet::new();
        let list = set_of(&set);
        assert_eq!(list.len(), 26);
        assert!(list.iter().any(|e| e == "*.class"));
        assert!(list.iter().any(|e| e == "TestResults"));
        assert_eq!(set.watermark(), Guid::EMPTY);
        assert_eq!(set.last_default_exclusion_update(), unknown_update_time());
    }

    #[test]
    fn removal_is_case_insensitive_and_tracked() {
        let mut set = ExclusionSet::new();
        assert!(set.remove_exclusion("BIN"));
        assert!(!set.remove_exclusion("bin"));
        assert!(!set_of(&set).iter().any(|e| e.eq_ignore_ascii_case("bin")));
    }

    #[test]
    fn watermark_gates_replacement() {
        let mut set = ExclusionSet::new();
        let watermark = Guid::new();
        set.set_default_exclusions(watermark, ["*.o", "target"]);
        assert_eq!(set_of(&set), vec!["*.class", "*.o", "target"]);
        assert!(set.is_overwritten());
        let stamped = set.last_default_exclusion_update();
        assert!(stamped > unknown_update_time());

        set.mark_clean();
        set.set_default_exclusions(watermark, ["other"]);
        assert_eq!(set_of(&set), vec!["*.class", "*.o", "target"]);
        assert!(!set.is_overwritten());
        assert!(set.last_default_exclusion_update() >= stamped);
    }

    #[test]
    fn new_list_cancels_matching_removals() {
        let mut set = ExclusionSet::new();
        set.remove_exclusion("bin");
        set.remove_exclusion("obj");
        set.set_default_exclusions(Guid::new(), ["bin"]);

        // "bin" is back and stays after a merge; "obj" is still removed.
        let disk = ExclusionSet::from_parts(Guid::EMPTY, unknown_update_time(), ["bin", "obj"]);
        set.merge(&disk);
        assert_eq!(set_of(&set), vec!["*.class", "bin"]);
    }

    #[test]
    fn merge_prefers_disk_unless_overwritten() {
        let disk_watermark = Guid::new();
        let disk = ExclusionSet::from_parts(disk_watermark, unknown_update_time(), ["*.a", "*.b", "*.c"]);

        let mut clean = ExclusionSet::new();
        clean.remove_exclusion("*.dll");
        clean.merge(&disk);
        assert_eq!(set_of(&clean), vec!["*.a", "*.b", "*.c"]);
        assert_eq!(clean.watermark(), disk_watermark);

        let mut removed = ExclusionSet::from_parts(Guid::EMPTY, unknown_update_time(), ["*.b"]);
        removed.remove_exclusion("*.b");
        removed.merge(&disk);
        assert_eq!(set_of(&removed), vec!["*.a", "*.c"]);

        let mut overwritten = ExclusionSet::new();
        let mine = Guid::new();
        overwritten.set_default_exclusions(mine, ["*.z"]);
        overwritten.merge(&disk);
        assert_eq!(set_of(&overwritten), vec!["*.class", "*.z"]);
        assert_eq!(overwritten.watermark(), mine);
    }

    #[test]
    fn merge_with_self_is_idempotent() {
        let mut set = ExclusionSet::new();
        set.remove_exclusion("*.exe");
        let before = set_of(&set);
        let copy = set.clone();
        set.merge(&copy);
        assert_eq!(set_of(&set), before);
    }
}
