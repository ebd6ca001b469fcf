//! A minimal unified-diff renderer. No diff crate appears anywhere in this
//! workspace's ecosystem neighborhood, so `git diff`/`git show` render their
//! own: classic `O(n*m)` LCS over lines, then collapsed into unified hunks
//! with three lines of context, same as `diff -u`.

fn lcs_table(a: &[&str], b: &[&str]) -> Vec<Vec<u32>> {
    let mut table = vec![vec![0u32; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            table[i][j] =
                if a[i] == b[j] { table[i + 1][j + 1] + 1 } else { table[i + 1][j].max(table[i][j + 1]) };
        }
    }
    table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOp {
    Context,
    Remove,
    Add,
}

fn diff_ops<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<(LineOp, &'a str)> {
    let table = lcs_table(old, new);
    let mut ops = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            ops.push((LineOp::Context, old[i]));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            ops.push((LineOp::Remove, old[i]));
            i += 1;
        } else {
            ops.push((LineOp::Add, new[j]));
            j += 1;
        }
    }
    while i < old.len() {
        ops.push((LineOp::Remove, old[i]));
        i += 1;
    }
    while j < new.len() {
        ops.push((LineOp::Add, new[j]));
        j += 1;
    }
    ops
}

/// Render a unified diff (`--- a/path`/`+++ b/path` header plus `@@` hunks
/// with 3 lines of context) between `old` and `new` file contents. Returns
/// `None` if the two are byte-identical.
#[must_use]
pub fn unified_diff(path: &str, old: &str, new: &str) -> Option<String> {
    if old == new {
        return None;
    }
    const CONTEXT: usize = 3;
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let ops = diff_ops(&old_lines, &new_lines);

    let mut out = format!("--- a/{path}\n+++ b/{path}\n");
    let mut old_no = 0usize;
    let mut new_no = 0usize;
    let mut idx = 0;
    while idx < ops.len() {
        if ops[idx].0 == LineOp::Context {
            old_no += 1;
            new_no += 1;
            idx += 1;
            continue;
        }
        let hunk_start = idx.saturating_sub(CONTEXT);
        let ctx_before = idx - hunk_start;
        let mut hunk_old_start = old_no - ctx_before;
        let mut hunk_new_start = new_no - ctx_before;
        let mut hunk_lines: Vec<String> = ops[hunk_start..idx].iter().map(|(_, l)| format!(" {l}")).collect();
        let (mut h_old, mut h_new) = (ctx_before, ctx_before);

        let mut trailing_context = 0;
        while idx < ops.len() {
            let (op, line) = ops[idx];
            match op {
                LineOp::Context if trailing_context >= CONTEXT => break,
                LineOp::Context => {
                    hunk_lines.push(format!(" {line}"));
                    h_old += 1;
                    h_new += 1;
                    old_no += 1;
                    new_no += 1;
                    trailing_context += 1;
                    idx += 1;
                }
                LineOp::Remove => {
                    hunk_lines.push(format!("-{line}"));
                    h_old += 1;
                    old_no += 1;
                    trailing_context = 0;
                    idx += 1;
                }
                LineOp::Add => {
                    hunk_lines.push(format!("+{line}"));
                    h_new += 1;
                    new_no += 1;
                    trailing_context = 0;
                    idx += 1;
                }
            }
        }
        // Drop unterminated trailing context lines beyond what was actually consumed.
        if trailing_context > CONTEXT {
            let drop = trailing_context - CONTEXT;
            hunk_lines.truncate(hunk_lines.len() - drop);
            h_old -= drop;
            h_new -= drop;
        }
        if hunk_old_start == 0 && h_old > 0 {
            hunk_old_start = 1;
        }
        if hunk_new_start == 0 && h_new > 0 {
            hunk_new_start = 1;
        }
        out.push_str(&format!("@@ -{hunk_old_start},{h_old} +{hunk_new_start},{h_new} @@\n"));
        for line in hunk_lines {
            out.push_str(&line);
            out.push('\n');
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_has_no_diff() {
        assert_eq!(unified_diff("a.txt", "same\n", "same\n"), None);
    }

    #[test]
    fn single_line_change_renders_one_hunk() {
        let diff = unified_diff("a.txt", "one\ntwo\nthree\n", "one\nTWO\nthree\n").unwrap();
        assert!(diff.contains("-two"));
        assert!(diff.contains("+TWO"));
        assert!(diff.contains("--- a/a.txt"));
        assert!(diff.contains("+++ b/a.txt"));
    }

    #[test]
    fn pure_addition_has_no_removals() {
        let diff = unified_diff("a.txt", "one\n", "one\ntwo\n").unwrap();
        assert!(!diff.contains('-'));
        assert!(diff.contains("+two"));
    }
}
