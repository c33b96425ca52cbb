//! Run options shared by every conversion step.

use std::path::PathBuf;

/// What kind of asset the source binders describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Character,
    Object,
}

/// One conversion run's settings. Built by the CLI (or a test) and passed
/// read-only through the pipeline.
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory holding rule tables and the material catalog.
    pub res_dir: PathBuf,
    /// Directory holding the external downgrade tool chain.
    pub tools_dir: PathBuf,
    /// Four-digit id of the source asset (e.g. "2070").
    pub source_id: String,
    /// Four-digit id the ported asset is emitted under.
    pub ported_id: String,
    /// Four-digit id substituted into sound events; `None` falls back to
    /// the ported id.
    pub sound_id: Option<String>,
    /// Leave source sound ids untouched instead of substituting.
    pub keep_sound_ids: bool,
    /// Kind of the source binders.
    pub asset_kind: AssetKind,
    /// Only convert the event track, skipping physics and geometry.
    pub tae_only: bool,
    /// Only convert geometry, skipping physics and event tracks.
    pub flver_only: bool,
    /// Layer offsets dropped wholesale; survivors are compacted downward.
    pub excluded_offsets: Vec<u32>,
    /// File names of every source binder of the run, in the order the
    /// caller feeds them in. The combining pipelines key their final
    /// assembly off the last matching name in this list.
    pub source_file_names: Vec<String>,
}

impl Options {
    /// True when `current` is the last source file of the run that the
    /// predicate matches. The combining pipelines use this to decide when
    /// to fire final assembly.
    pub fn is_last_of<'a>(&self, current: &str, mut matching: impl FnMut(&str) -> bool) -> bool {
        self.source_file_names
            .iter()
            .filter(|n| matching(n))
            .next_back()
            .is_some_and(|last| last == current)
    }

    /// Character id substituted into sound events. Defaults to the ported
    /// id so a plain run renumbers sounds along with everything else;
    /// `keep_sound_ids` opts out entirely.
    pub fn sound_chr_id(&self) -> Option<&str> {
        if self.keep_sound_ids {
            return None;
        }
        Some(self.sound_id.as_deref().unwrap_or(&self.ported_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(names: &[&str]) -> Options {
        Options {
            res_dir: PathBuf::new(),
            tools_dir: PathBuf::new(),
            source_id: "5020".into(),
            ported_id: "3000".into(),
            sound_id: None,
            keep_sound_ids: false,
            asset_kind: AssetKind::Character,
            tae_only: false,
            flver_only: false,
            excluded_offsets: Vec::new(),
            source_file_names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn sound_id_falls_back_to_the_ported_id() {
        let mut op = opts(&[]);
        assert_eq!(op.sound_chr_id(), Some("3000"));

        op.sound_id = Some("5020".into());
        assert_eq!(op.sound_chr_id(), Some("5020"));

        op.keep_sound_ids = true;
        assert_eq!(op.sound_chr_id(), None);
    }

    #[test]
    fn last_fragment_check_follows_caller_order() {
        let op = opts(&["a.anibnd.dcx", "b.anibnd.dcx", "c.chrbnd.dcx"]);
        let is_anibnd = |n: &str| n.contains(".anibnd");
        assert!(!op.is_last_of("a.anibnd.dcx", is_anibnd));
        assert!(op.is_last_of("b.anibnd.dcx", is_anibnd));
        assert!(!op.is_last_of("c.chrbnd.dcx", is_anibnd));
    }
}
