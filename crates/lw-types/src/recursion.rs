use serde::{Deserialize, Serialize};

/// Depth bound meaning "the whole subtree".
pub const UNBOUNDED: usize = usize::MAX;

/// How far below a root path a query reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecursionType {
    /// Only the root itself.
    #[default]
    None,
    /// The root and its direct children.
    OneLevel,
    /// The root and every descendant.
    Full,
}

impl RecursionType {
    /// Numeric depth bound used by tree walks: 0, 1 or [`UNBOUNDED`].
    pub fn depth(self) -> usize {
        match self {
            Self::None => 0,
            Self::OneLevel => 1,
            Self::Full => UNBOUNDED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_translation() {
        assert_eq!(RecursionType::None.depth(), 0);
        assert_eq!(RecursionType::OneLevel.depth(), 1);
        assert_eq!(RecursionType::Full.depth(), UNBOUNDED);
        assert_eq!(RecursionType::default(), RecursionType::None);
    }
}
