//! POSIX-style absolute path normalisation, joining, and splitting.
//!
//! Every path crossing a component boundary in svfs is passed in the
//! normalised form produced by [`normalize`].

/// Normalise a POSIX-style path: collapse repeated `/`, resolve `.` and
/// `..`, strip a trailing `/` (except for the root path itself), and make
/// the result absolute (a leading `/` is assumed even if missing).
#[must_use]
pub fn normalize(input: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in input.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}", stack.join("/"))
    }
}

/// Join a base path with a (possibly relative) child, then normalise.
#[must_use]
pub fn join(base: &str, child: &str) -> String {
    if child.starts_with('/') {
        return normalize(child);
    }
    if base.ends_with('/') {
        normalize(&format!("{base}{child}"))
    } else {
        normalize(&format!("{base}/{child}"))
    }
}

/// Split a normalised path into `(parent, base_name)`. The root path has no
/// parent and returns `("/", "")`.
#[must_use]
pub fn split(path: &str) -> (String, &str) {
    if path == "/" {
        return ("/".to_owned(), "");
    }
    match path.rfind('/') {
        Some(0) => ("/".to_owned(), &path[1..]),
        Some(idx) => (path[..idx].to_owned(), &path[idx + 1..]),
        None => ("/".to_owned(), path),
    }
}

/// The parent directory of a normalised path.
#[must_use]
pub fn parent(path: &str) -> String {
    split(path).0
}

/// The final path component ("basename") of a normalised path.
#[must_use]
pub fn base(path: &str) -> &str {
    split(path).1
}

/// `true` iff `ancestor` is `descendant` itself or a proper ancestor of it
/// (path-component-wise, not merely a string prefix).
#[must_use]
pub fn is_ancestor_or_self(ancestor: &str, descendant: &str) -> bool {
    if ancestor == "/" {
        return true;
    }
    descendant == ancestor || descendant.starts_with(&format!("{ancestor}/"))
}

/// Strip `prefix` from `path`, returning `"/"` if they are equal. Panics in
/// debug builds if `prefix` is not an ancestor of `path` — callers (the
/// router) must check [`is_ancestor_or_self`] first.
#[must_use]
pub fn strip_prefix(path: &str, prefix: &str) -> String {
    debug_assert!(is_ancestor_or_self(prefix, path));
    if prefix == "/" {
        return normalize(path);
    }
    if path == prefix {
        return "/".to_owned();
    }
    normalize(&path[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn collapses_repeated_slashes() {
        assert_eq!(normalize("/a//b///c"), "/a/b/c");
    }

    #[test]
    fn resolves_dot_and_dotdot() {
        assert_eq!(normalize("/a/./b/../c"), "/a/c");
        assert_eq!(normalize("/a/../../b"), "/b");
    }

    #[test]
    fn strips_trailing_slash_except_root() {
        assert_eq!(normalize("/a/b/"), "/a/b");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn join_relative_and_absolute_children() {
        assert_eq!(join("/mnt/repo", "sub/file.txt"), "/mnt/repo/sub/file.txt");
        assert_eq!(join("/mnt/repo", "/etc/fstab"), "/etc/fstab");
    }

    #[test]
    fn split_parent_and_base() {
        assert_eq!(split("/a/b/c"), ("/a/b".to_owned(), "c"));
        assert_eq!(split("/a"), ("/".to_owned(), "a"));
        assert_eq!(split("/"), ("/".to_owned(), ""));
    }

    #[test]
    fn ancestor_check() {
        assert!(is_ancestor_or_self("/mnt", "/mnt"));
        assert!(is_ancestor_or_self("/mnt", "/mnt/repo"));
        assert!(!is_ancestor_or_self("/mnt", "/mnted"));
        assert!(is_ancestor_or_self("/", "/anything/at/all"));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "(/[a-zA-Z0-9_.]{0,6}){0,8}") {
            let once = normalize(&s);
            let twice = normalize(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
