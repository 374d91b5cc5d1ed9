//! Pure text rewriting primitives for source patching.
//!
//! Every transform here takes content in and hands content out, with the
//! number of changes made, so callers can distinguish "applied", "already
//! applied", and "pattern absent" without guessing from exceptions. File IO
//! stays in the hook layer.

/// Count literal occurrences of `needle` in `content`.
///
/// An empty needle never matches.
pub fn count_occurrences(content: &str, needle: &str) -> u32 {
    if needle.is_empty() {
        return 0;
    }
    content.matches(needle).count() as u32
}

/// Replace every literal occurrence of `needle` with `replacement`.
///
/// Returns the rewritten content together with the replacement count; when the
/// needle is absent the original content comes back untouched with a count of
/// zero.
///
/// # Examples
///
/// ```
/// use fadogen_build::patcher::rewrite::replace_all_literal;
///
/// let source = "a = getenv(\"PHP_INI_SCAN_DIR\");";
/// let (patched, count) = replace_all_literal(source, "getenv(\"PHP_INI_SCAN_DIR\")", "lookup()");
/// assert_eq!(count, 1);
/// assert_eq!(patched, "a = lookup();");
///
/// let (untouched, count) = replace_all_literal(source, "missing", "x");
/// assert_eq!(count, 0);
/// assert_eq!(untouched, source);
/// ```
pub fn replace_all_literal(content: &str, needle: &str, replacement: &str) -> (String, u32) {
    let count = count_occurrences(content, needle);
    if count == 0 {
        return (content.to_string(), 0);
    }
    (content.replace(needle, replacement), count)
}

/// Insert `block` on its own lines immediately after the first line containing
/// `anchor`.
///
/// Returns `None` when no line contains the anchor. The anchor line keeps its
/// own ending; a missing trailing newline on a final anchor line is added so
/// the block always starts at column zero of a fresh line.
///
/// # Examples
///
/// ```
/// use fadogen_build::patcher::rewrite::insert_after_line_containing;
///
/// let source = "#include \"php_ini.h\"\nint main(void) {}\n";
/// let patched = insert_after_line_containing(source, "#include \"php_ini.h\"", "/* injected */\n").unwrap();
/// assert_eq!(patched, "#include \"php_ini.h\"\n/* injected */\nint main(void) {}\n");
///
/// assert!(insert_after_line_containing("int x;\n", "#include", "/* injected */\n").is_none());
/// ```
pub fn insert_after_line_containing(content: &str, anchor: &str, block: &str) -> Option<String> {
    if anchor.is_empty() {
        return None;
    }

    let mut output = String::with_capacity(content.len() + block.len() + 1);
    let mut inserted = false;

    for line in content.split_inclusive('\n') {
        output.push_str(line);
        if !inserted && line.contains(anchor) {
            if !line.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(block);
            inserted = true;
        }
    }

    if inserted {
        Some(output)
    } else {
        None
    }
}
