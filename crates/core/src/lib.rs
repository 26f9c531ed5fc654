#![forbid(unsafe_code)]

pub mod conflict;

pub mod paths {
    /// Canonical workcopy-relative path. `""` is the workcopy root.
    ///
    /// Forward-slash separated, no leading or trailing slash, no empty
    /// segments, no `.`/`..`, no backslashes, no NUL.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct RelPath(String);

    impl RelPath {
        pub fn root() -> Self {
            Self(String::new())
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, RelPathError> {
            let value = value.into();
            validate_relpath(&value)?;
            Ok(Self(value))
        }

        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn is_root(&self) -> bool {
            self.0.is_empty()
        }

        /// Number of path segments; the root has depth 0.
        pub fn depth(&self) -> i64 {
            if self.0.is_empty() {
                0
            } else {
                self.0.split('/').count() as i64
            }
        }

        pub fn parent(&self) -> Option<RelPath> {
            if self.0.is_empty() {
                return None;
            }
            match self.0.rfind('/') {
                Some(idx) => Some(Self(self.0[..idx].to_string())),
                None => Some(Self::root()),
            }
        }

        pub fn basename(&self) -> &str {
            match self.0.rfind('/') {
                Some(idx) => &self.0[idx + 1..],
                None => &self.0,
            }
        }

        pub fn join(&self, tail: &str) -> Result<RelPath, RelPathError> {
            validate_relpath(tail)?;
            if tail.is_empty() {
                return Ok(self.clone());
            }
            if self.0.is_empty() {
                return Ok(Self(tail.to_string()));
            }
            Ok(Self(format!("{}/{}", self.0, tail)))
        }

        /// True when `self` is a strict ancestor of `other`. The root is an
        /// ancestor of every non-root path.
        pub fn is_ancestor_of(&self, other: &RelPath) -> bool {
            if self.0 == other.0 {
                return false;
            }
            if self.0.is_empty() {
                return !other.0.is_empty();
            }
            other.0.len() > self.0.len()
                && other.0.as_bytes()[self.0.len()] == b'/'
                && other.0.starts_with(self.0.as_str())
        }

        /// The suffix of `self` below `ancestor`, if `ancestor` covers it.
        pub fn suffix_below<'a>(&'a self, ancestor: &RelPath) -> Option<&'a str> {
            if ancestor.0.is_empty() {
                if self.0.is_empty() {
                    return None;
                }
                return Some(&self.0);
            }
            if ancestor.is_ancestor_of(self) {
                Some(&self.0[ancestor.0.len() + 1..])
            } else {
                None
            }
        }
    }

    impl std::fmt::Display for RelPath {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum RelPathError {
        LeadingSlash,
        TrailingSlash,
        EmptySegment { index: usize },
        DotSegment { index: usize },
        DotDotSegment { index: usize },
        Backslash { index: usize },
        NulByte { index: usize },
    }

    impl std::fmt::Display for RelPathError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::LeadingSlash => write!(f, "relpath must not start with '/'"),
                Self::TrailingSlash => write!(f, "relpath must not end with '/'"),
                Self::EmptySegment { index } => {
                    write!(f, "relpath has an empty segment at {index}")
                }
                Self::DotSegment { index } => write!(f, "relpath has a '.' segment at {index}"),
                Self::DotDotSegment { index } => {
                    write!(f, "relpath has a '..' segment at {index}")
                }
                Self::Backslash { index } => write!(f, "relpath has a backslash at {index}"),
                Self::NulByte { index } => write!(f, "relpath has a NUL byte at {index}"),
            }
        }
    }

    impl std::error::Error for RelPathError {}

    fn validate_relpath(value: &str) -> Result<(), RelPathError> {
        if value.is_empty() {
            return Ok(());
        }
        if let Some(index) = value.find('\\') {
            return Err(RelPathError::Backslash { index });
        }
        if let Some(index) = value.find('\0') {
            return Err(RelPathError::NulByte { index });
        }
        if value.starts_with('/') {
            return Err(RelPathError::LeadingSlash);
        }
        if value.ends_with('/') {
            return Err(RelPathError::TrailingSlash);
        }
        let mut index = 0usize;
        for segment in value.split('/') {
            match segment {
                "" => return Err(RelPathError::EmptySegment { index }),
                "." => return Err(RelPathError::DotSegment { index }),
                ".." => return Err(RelPathError::DotDotSegment { index }),
                _ => {}
            }
            index += segment.len() + 1;
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn root_is_empty_with_depth_zero() {
            let root = RelPath::root();
            assert!(root.is_root());
            assert_eq!(root.depth(), 0);
            assert!(root.parent().is_none());
        }

        #[test]
        fn depth_counts_segments() {
            let p = RelPath::try_new("a/b/c").expect("relpath");
            assert_eq!(p.depth(), 3);
            assert_eq!(p.parent().expect("parent").as_str(), "a/b");
            assert_eq!(p.basename(), "c");
        }

        #[test]
        fn rejects_non_canonical_input() {
            assert!(RelPath::try_new("/a").is_err());
            assert!(RelPath::try_new("a/").is_err());
            assert!(RelPath::try_new("a//b").is_err());
            assert!(RelPath::try_new("a/./b").is_err());
            assert!(RelPath::try_new("a/../b").is_err());
            assert!(RelPath::try_new("a\\b").is_err());
        }

        #[test]
        fn ancestry_and_suffix() {
            let root = RelPath::root();
            let a = RelPath::try_new("a").expect("relpath");
            let ab = RelPath::try_new("a/b").expect("relpath");
            assert!(root.is_ancestor_of(&a));
            assert!(a.is_ancestor_of(&ab));
            assert!(!ab.is_ancestor_of(&a));
            assert_eq!(ab.suffix_below(&a), Some("b"));
            assert_eq!(ab.suffix_below(&root), Some("a/b"));
            assert_eq!(a.suffix_below(&ab), None);
        }

        #[test]
        fn prefix_sibling_is_not_an_ancestor() {
            let a = RelPath::try_new("a").expect("relpath");
            let sibling = RelPath::try_new("ab").expect("relpath");
            assert!(!a.is_ancestor_of(&sibling));
        }
    }
}

pub mod model {
    /// Whether a node is materially present at its layer.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Presence {
        Normal,
        NotPresent,
        Excluded,
        Absent,
        Incomplete,
        BaseDeleted,
    }

    impl Presence {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Normal => "normal",
                Self::NotPresent => "not-present",
                Self::Excluded => "excluded",
                Self::Absent => "absent",
                Self::Incomplete => "incomplete",
                Self::BaseDeleted => "base-deleted",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "normal" => Some(Self::Normal),
                "not-present" => Some(Self::NotPresent),
                "excluded" => Some(Self::Excluded),
                "absent" => Some(Self::Absent),
                "incomplete" => Some(Self::Incomplete),
                "base-deleted" => Some(Self::BaseDeleted),
                _ => None,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum NodeKind {
        File,
        Dir,
        Symlink,
        Unknown,
    }

    impl NodeKind {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::File => "file",
                Self::Dir => "dir",
                Self::Symlink => "symlink",
                Self::Unknown => "unknown",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "file" => Some(Self::File),
                "dir" => Some(Self::Dir),
                "symlink" => Some(Self::Symlink),
                "unknown" => Some(Self::Unknown),
                _ => None,
            }
        }
    }

    /// Ambient subtree-depth hint recorded on directories.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum AmbientDepth {
        Empty,
        Files,
        Immediates,
        Infinity,
    }

    impl AmbientDepth {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Empty => "empty",
                Self::Files => "files",
                Self::Immediates => "immediates",
                Self::Infinity => "infinity",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value {
                "empty" => Some(Self::Empty),
                "files" => Some(Self::Files),
                "immediates" => Some(Self::Immediates),
                "infinity" => Some(Self::Infinity),
                _ => None,
            }
        }
    }

    /// Property map as stored on a node or in the actual overlay.
    ///
    /// BTreeMap keeps the JSON encoding deterministic.
    pub type PropMap = std::collections::BTreeMap<String, String>;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ChecksumError {
        Length { expected: usize, found: usize },
        InvalidChar { ch: char, index: usize },
    }

    impl std::fmt::Display for ChecksumError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Length { expected, found } => {
                    write!(f, "checksum length {found}, expected {expected} hex digits")
                }
                Self::InvalidChar { ch, index } => {
                    write!(f, "checksum has non-hex char {ch:?} at {index}")
                }
            }
        }
    }

    impl std::error::Error for ChecksumError {}

    fn validate_hex(value: &str, expected: usize) -> Result<(), ChecksumError> {
        if value.len() != expected {
            return Err(ChecksumError::Length {
                expected,
                found: value.len(),
            });
        }
        for (index, ch) in value.chars().enumerate() {
            if !ch.is_ascii_hexdigit() {
                return Err(ChecksumError::InvalidChar { ch, index });
            }
        }
        Ok(())
    }

    /// Strong content hash, lowercase hex. The pristine store's primary key.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Sha1Checksum(String);

    impl Sha1Checksum {
        pub fn try_new(value: impl Into<String>) -> Result<Self, ChecksumError> {
            let value = value.into().to_ascii_lowercase();
            validate_hex(&value, 40)?;
            Ok(Self(value))
        }

        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl std::fmt::Display for Sha1Checksum {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// Secondary index hash kept for compatibility lookups.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Md5Checksum(String);

    impl Md5Checksum {
        pub fn try_new(value: impl Into<String>) -> Result<Self, ChecksumError> {
            let value = value.into().to_ascii_lowercase();
            validate_hex(&value, 32)?;
            Ok(Self(value))
        }

        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl std::fmt::Display for Md5Checksum {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn presence_round_trips_wire_strings() {
            for p in [
                Presence::Normal,
                Presence::NotPresent,
                Presence::Excluded,
                Presence::Absent,
                Presence::Incomplete,
                Presence::BaseDeleted,
            ] {
                assert_eq!(Presence::parse(p.as_str()), Some(p));
            }
            assert_eq!(Presence::parse("deleted"), None);
        }

        #[test]
        fn checksums_normalize_to_lowercase() {
            let sha =
                Sha1Checksum::try_new("DA39A3EE5E6B4B0D3255BFEF95601890AFD80709").expect("sha1");
            assert_eq!(sha.as_str(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
            assert!(Sha1Checksum::try_new("da39").is_err());
            assert!(Md5Checksum::try_new("d41d8cd98f00b204e9800998ecf8427e").is_ok());
            assert!(Md5Checksum::try_new("zz1d8cd98f00b204e9800998ecf8427e").is_err());
        }
    }
}

pub mod cancel {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Cooperative cancellation flag, checked at transaction boundaries and
    /// between statements of batch operations.
    #[derive(Clone, Debug, Default)]
    pub struct CancelToken {
        flag: Arc<AtomicBool>,
    }

    impl CancelToken {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn cancel(&self) {
            self.flag.store(true, Ordering::Relaxed);
        }

        pub fn is_cancelled(&self) -> bool {
            self.flag.load(Ordering::Relaxed)
        }
    }
}

pub mod cache {
    /// Per-session cache knobs. Sessions own their caches; nothing here is
    /// process-global.
    #[derive(Clone, Debug)]
    pub struct CacheConfig {
        pub cache_fulltexts: bool,
        pub cache_txdeltas: bool,
        /// Surface cache-layer failures instead of downgrading them to misses.
        pub fail_stop: bool,
        pub memcache_endpoint: Option<String>,
    }

    impl Default for CacheConfig {
        fn default() -> Self {
            Self {
                cache_fulltexts: true,
                cache_txdeltas: false,
                fail_stop: false,
                memcache_endpoint: None,
            }
        }
    }
}
