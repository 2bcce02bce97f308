//! Source preparation.

/// Remove the whitespace prefix common to every non-blank line.
///
/// View sources are usually embedded as indented string literals; the
/// lexer needs the first item to start at column one. Whitespace-only lines
/// are emptied and do not take part in the prefix.
pub fn dedent(source: &str) -> String {
    let prefix = source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start().len()])
        .reduce(common_prefix)
        .unwrap_or("");

    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        if !line.trim().is_empty() {
            out.push_str(line.strip_prefix(prefix).unwrap_or(line));
        }
        out.push('\n');
    }
    out
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map(|((i, c), _)| i + c.len_utf8())
        .unwrap_or(0);
    &a[..len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_common_indent() {
        let source = "\n    def f():\n        pass\n";
        assert_eq!(dedent(source), "\ndef f():\n    pass\n");
    }

    #[test]
    fn blank_lines_do_not_limit_prefix() {
        let source = "    a\n\n  \n    b";
        assert_eq!(dedent(source), "a\n\n\nb\n");
    }

    #[test]
    fn mixed_prefixes_keep_the_shared_part() {
        assert_eq!(dedent("\t  a\n\t b"), " a\nb\n");
    }

    #[test]
    fn unindented_source_is_unchanged() {
        assert_eq!(dedent("def f():\n    pass\n"), "def f():\n    pass\n");
    }

    #[test]
    fn empty_source() {
        assert_eq!(dedent(""), "");
    }
}
