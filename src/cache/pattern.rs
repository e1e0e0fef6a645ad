//! Glob Pattern Module
//!
//! Translates caller globs (`*` = any run, `?` = any single character) into
//! the primary store's native pattern syntax and into anchored regexes for
//! scanning the fallback store.

use regex::Regex;

/// Builds an anchored regex equivalent to `glob`.
///
/// Every regex metacharacter other than the two wildcards is escaped, so the
/// only failure left is a glob too large for the regex size limit.
pub fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut source = String::with_capacity(glob.len() + 8);
    source.push('^');

    let mut literal = String::new();
    for ch in glob.chars() {
        match ch {
            '*' | '?' => {
                source.push_str(&regex::escape(&literal));
                literal.clear();
                source.push_str(if ch == '*' { ".*" } else { "." });
            }
            _ => literal.push(ch),
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');

    Regex::new(&source)
}

/// Rewrites `glob` for a Redis `MATCH` clause.
///
/// Redis already understands `*` and `?`; its other specials are escaped so
/// they match literally.
pub fn glob_to_redis(glob: &str) -> String {
    let mut pattern = String::with_capacity(glob.len());
    for ch in glob.chars() {
        if matches!(ch, '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern
}

/// Escapes `literal` so a Redis `MATCH` clause treats all of it verbatim.
pub fn escape_redis_literal(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for ch in literal.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
