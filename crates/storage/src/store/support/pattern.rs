#![forbid(unsafe_code)]

use wc_core::paths::RelPath;

/// LIKE pattern matching the strict descendants of `relpath`, with '#' as
/// the escape character. For the workcopy root the pattern must still
/// exclude the root's own empty relpath.
pub(in crate::store) fn subtree_like_pattern(relpath: &RelPath) -> String {
    if relpath.is_root() {
        return "_%".to_string();
    }
    let raw = relpath.as_str();
    let mut out = String::with_capacity(raw.len() + 2);
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '#') {
            out.push('#');
        }
        out.push(ch);
    }
    out.push_str("/%");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_metacharacters() {
        let p = RelPath::try_new("a_b/c%d/e#f").expect("relpath");
        assert_eq!(subtree_like_pattern(&p), "a#_b/c#%d/e##f/%");
    }

    #[test]
    fn root_pattern_excludes_the_root_itself() {
        assert_eq!(subtree_like_pattern(&RelPath::root()), "_%");
    }
}
