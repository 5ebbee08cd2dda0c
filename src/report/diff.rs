//! Unified diff rendering for file reviews.
//!
//! Produces the conventional `a/<file>` / `b/<file>` unified format with
//! three lines of context, so session output can be piped into any patch
//! viewer. Returns an empty string when the sides are identical.

const CONTEXT: usize = 3;

/// Guard against quadratic blowup on pathological inputs
const MAX_CELLS: usize = 4_000_000;

#[derive(Clone, Copy, PartialEq)]
enum Tag {
    Equal,
    Delete,
    Insert,
}

pub fn unified_diff(before: &str, after: &str, filename: &str) -> String {
    if before == after {
        return String::new();
    }
    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();

    let script = if before_lines.len() * after_lines.len() > MAX_CELLS {
        whole_file_script(&before_lines, &after_lines)
    } else {
        edit_script(&before_lines, &after_lines)
    };

    let mut out = String::new();
    out.push_str(&format!("--- a/{}\n", filename));
    out.push_str(&format!("+++ b/{}\n", filename));

    for hunk in hunks(&script) {
        let (before_start, before_len, after_start, after_len) = hunk_ranges(&script, &hunk);
        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            format_range(before_start, before_len),
            format_range(after_start, after_len)
        ));
        for &i in &hunk {
            let (tag, text) = script[i];
            let prefix = match tag {
                Tag::Equal => ' ',
                Tag::Delete => '-',
                Tag::Insert => '+',
            };
            out.push(prefix);
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}

fn whole_file_script<'a>(before: &[&'a str], after: &[&'a str]) -> Vec<(Tag, &'a str)> {
    let mut script = Vec::with_capacity(before.len() + after.len());
    script.extend(before.iter().map(|l| (Tag::Delete, *l)));
    script.extend(after.iter().map(|l| (Tag::Insert, *l)));
    script
}

/// Line-level longest common subsequence, emitted as a flat edit script
fn edit_script<'a>(before: &[&'a str], after: &[&'a str]) -> Vec<(Tag, &'a str)> {
    let n = before.len();
    let m = after.len();
    let mut table = vec![0u32; (n + 1) * (m + 1)];
    let idx = |i: usize, j: usize| i * (m + 1) + j;

    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[idx(i, j)] = if before[i] == after[j] {
                table[idx(i + 1, j + 1)] + 1
            } else {
                table[idx(i + 1, j)].max(table[idx(i, j + 1)])
            };
        }
    }

    let mut script = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if before[i] == after[j] {
            script.push((Tag::Equal, before[i]));
            i += 1;
            j += 1;
        } else if table[idx(i + 1, j)] >= table[idx(i, j + 1)] {
            script.push((Tag::Delete, before[i]));
            i += 1;
        } else {
            script.push((Tag::Insert, after[j]));
            j += 1;
        }
    }
    script.extend(before[i..].iter().map(|l| (Tag::Delete, *l)));
    script.extend(after[j..].iter().map(|l| (Tag::Insert, *l)));
    script
}

/// Group changed script indices into context-padded hunks
fn hunks(script: &[(Tag, &str)]) -> Vec<Vec<usize>> {
    let changed: Vec<usize> = script
        .iter()
        .enumerate()
        .filter(|(_, (tag, _))| *tag != Tag::Equal)
        .map(|(i, _)| i)
        .collect();
    if changed.is_empty() {
        return Vec::new();
    }

    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut start = changed[0];
    let mut end = changed[0];
    for &i in &changed[1..] {
        // Two changes melt into one hunk when their context would touch.
        if i <= end + 2 * CONTEXT {
            end = i;
        } else {
            groups.push((start, end));
            start = i;
            end = i;
        }
    }
    groups.push((start, end));

    groups
        .into_iter()
        .map(|(s, e)| {
            let from = s.saturating_sub(CONTEXT);
            let to = (e + CONTEXT + 1).min(script.len());
            (from..to).collect()
        })
        .collect()
}

fn hunk_ranges(script: &[(Tag, &str)], hunk: &[usize]) -> (usize, usize, usize, usize) {
    // Line numbers are 1-based positions in each side before the hunk.
    let first = hunk[0];
    let mut before_start = 1;
    let mut after_start = 1;
    for (tag, _) in &script[..first] {
        match tag {
            Tag::Equal => {
                before_start += 1;
                after_start += 1;
            }
            Tag::Delete => before_start += 1,
            Tag::Insert => after_start += 1,
        }
    }
    let mut before_len = 0;
    let mut after_len = 0;
    for &i in hunk {
        match script[i].0 {
            Tag::Equal => {
                before_len += 1;
                after_len += 1;
            }
            Tag::Delete => before_len += 1,
            Tag::Insert => after_len += 1,
        }
    }
    (before_start, before_len, after_start, after_len)
}

fn format_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start.saturating_sub(1)),
        1 => format!("{}", start),
        _ => format!("{},{}", start, len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_inputs_yield_empty_diff() {
        assert_eq!(unified_diff("a\nb\n", "a\nb\n", "x.ts"), "");
    }

    #[test]
    fn test_single_change_with_context() {
        let before = "one\ntwo\nthree\nfour\nfive\n";
        let after = "one\ntwo\nTHREE\nfour\nfive\n";
        let diff = unified_diff(before, after, "file.ts");
        assert!(diff.starts_with("--- a/file.ts\n+++ b/file.ts\n"));
        assert!(diff.contains("@@ -1,5 +1,5 @@"));
        assert!(diff.contains("-three\n"));
        assert!(diff.contains("+THREE\n"));
        assert!(diff.contains(" two\n"));
    }

    #[test]
    fn test_new_file_is_all_insertions() {
        let diff = unified_diff("", "line1\nline2\n", "new.ts");
        assert!(diff.contains("@@ -0,0 +1,2 @@"));
        assert!(diff.contains("+line1\n"));
        assert!(diff.contains("+line2\n"));
        assert!(!diff.contains("\n-"));
    }

    #[test]
    fn test_distant_changes_make_two_hunks() {
        let before: Vec<String> = (1..=30).map(|i| format!("line{}", i)).collect();
        let mut after = before.clone();
        after[0] = "CHANGED-TOP".to_string();
        after[29] = "CHANGED-BOTTOM".to_string();
        let diff = unified_diff(&before.join("\n"), &after.join("\n"), "big.ts");
        assert_eq!(diff.matches("@@ ").count(), 2);
        assert!(diff.contains("+CHANGED-TOP"));
        assert!(diff.contains("+CHANGED-BOTTOM"));
    }

    #[test]
    fn test_single_line_range_format() {
        let diff = unified_diff("only\n", "different\n", "one.ts");
        assert!(diff.contains("@@ -1 +1 @@"));
    }
}
