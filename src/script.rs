//! Script template management module
//!
//! Loads the delegated scoring script and embeds the password into it.
//!
//! The template contains a placeholder (default `$arg1`) standing for the
//! password. The password is never spliced in as raw text: each occurrence
//! is replaced by a JavaScript string literal, so quotes, backslashes and
//! line breaks in the password cannot escape into the script body.
//!
//! A literal is only valid where an expression may stand. When the template
//! is built, its source is scanned once and every occurrence is classified:
//!
//! - in code, the occurrence is replaced by the literal
//! - as the whole body of a `"…"` or `'…'` string, the string is replaced
//! - in a comment, it is left alone
//! - anywhere else, such as inside a longer string or a template literal,
//!   the template is rejected with [`ScriptError::UnsafePlaceholder`]

use secrecy::{ExposeSecret, SecretString};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use crate::config::{DEFAULT_PLACEHOLDER, DEFAULT_SCRIPT_PATH, SCRIPT_PATH_ENV};

static SCRIPT_TEMPLATE: RwLock<Option<Arc<ScriptTemplate>>> = RwLock::new(None);

/// Words after which a `/` opens a regex literal rather than dividing.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "await", "case", "delete", "do", "else", "in", "instanceof", "new", "of", "return", "throw",
    "typeof", "void", "yield",
];

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Script file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Failed to read script file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Script is empty")]
    EmptyScript,
    #[error("Script does not contain the placeholder {0:?}")]
    MissingPlaceholder(String),
    #[error("Placeholder at byte {0} is embedded in a larger literal and cannot be substituted safely")]
    UnsafePlaceholder(usize),
    #[error("Unterminated literal or comment starting at byte {0}")]
    UnterminatedLiteral(usize),
    #[error("Failed to encode script argument: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A scoring script with one textual placeholder for the password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    source: String,
    placeholder: String,
    /// Byte ranges of `source` replaced by the password literal, in order.
    slots: Vec<Range<usize>>,
}

impl ScriptTemplate {
    pub fn new(source: impl Into<String>, placeholder: impl Into<String>) -> Result<Self, ScriptError> {
        let source = source.into();
        let placeholder = placeholder.into();

        if source.trim().is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        if placeholder.is_empty() {
            return Err(ScriptError::MissingPlaceholder(placeholder));
        }

        let slots = substitution_slots(&source, &placeholder)?;
        if slots.is_empty() {
            return Err(ScriptError::MissingPlaceholder(placeholder));
        }

        Ok(Self {
            source,
            placeholder,
            slots,
        })
    }

    /// Reads a template from disk.
    pub fn load<P: AsRef<Path>>(path: P, placeholder: &str) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScriptError::FileNotFound(path.to_path_buf()));
        }
        let source = std::fs::read_to_string(path)?;
        Self::new(source, placeholder)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Produces the executable script for `password`.
    ///
    /// Only the slots found when the template was built are replaced, so a
    /// password that itself contains the placeholder stays inert.
    pub fn render(&self, password: &SecretString) -> Result<String, ScriptError> {
        let literal = js_string_literal(password.expose_secret())?;
        let src = self.source.as_str();

        let mut out = String::with_capacity(src.len() + literal.len() * self.slots.len());
        let mut cursor = 0;

        for slot in &self.slots {
            out.push_str(&src[cursor..slot.start]);
            out.push_str(&literal);
            cursor = slot.end;
        }
        out.push_str(&src[cursor..]);

        Ok(out)
    }
}

/// JSON string encoding, plus the two line terminators JSON leaves raw.
fn js_string_literal(value: &str) -> Result<String, ScriptError> {
    let literal = serde_json::to_string(value)?;
    Ok(literal.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029"))
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    /// Script code; `braces` counts `{` opened inside this frame.
    Code { braces: usize },
    /// Text of a backtick template literal.
    Template { start: usize },
}

fn is_ident_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80
}

/// Scans `source` as JavaScript and returns the ranges to replace.
///
/// Delimiters are all ASCII, so scanning bytes never splits a UTF-8 sequence.
fn substitution_slots(source: &str, placeholder: &str) -> Result<Vec<Range<usize>>, ScriptError> {
    let bytes = source.as_bytes();
    let needle = placeholder.as_bytes();
    let mut slots = Vec::new();
    let mut frames = vec![Frame::Code { braces: 0 }];
    let mut regex_allowed = true;
    let mut i = 0;

    while i < bytes.len() {
        let at_placeholder = bytes[i..].starts_with(needle);

        match frames.last().copied() {
            Some(Frame::Template { .. }) => {
                if at_placeholder {
                    return Err(ScriptError::UnsafePlaceholder(i));
                }
                match bytes[i] {
                    b'\\' => i += 2,
                    b'`' => {
                        frames.pop();
                        regex_allowed = false;
                        i += 1;
                    }
                    b'$' if bytes.get(i + 1) == Some(&b'{') => {
                        frames.push(Frame::Code { braces: 0 });
                        regex_allowed = true;
                        i += 2;
                    }
                    _ => i += 1,
                }
            }
            Some(Frame::Code { braces }) => {
                if at_placeholder {
                    slots.push(i..i + needle.len());
                    regex_allowed = false;
                    i += needle.len();
                    continue;
                }
                match bytes[i] {
                    b'"' | b'\'' => {
                        let close = string_end(bytes, i)?;
                        let body = &source[i + 1..close];
                        if body == placeholder {
                            slots.push(i..close + 1);
                        } else if body.contains(placeholder) {
                            return Err(ScriptError::UnsafePlaceholder(i));
                        }
                        regex_allowed = false;
                        i = close + 1;
                    }
                    b'`' => {
                        frames.push(Frame::Template { start: i });
                        i += 1;
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'/') => {
                        i = bytes[i..]
                            .iter()
                            .position(|&c| c == b'\n')
                            .map_or(bytes.len(), |n| i + n);
                    }
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        let close = source[i + 2..]
                            .find("*/")
                            .ok_or(ScriptError::UnterminatedLiteral(i))?;
                        i += 2 + close + 2;
                    }
                    b'/' if regex_allowed => {
                        let end = regex_end(bytes, i)?;
                        if source[i..end].contains(placeholder) {
                            return Err(ScriptError::UnsafePlaceholder(i));
                        }
                        regex_allowed = false;
                        i = end;
                    }
                    b'{' => {
                        frames.pop();
                        frames.push(Frame::Code { braces: braces + 1 });
                        regex_allowed = true;
                        i += 1;
                    }
                    b'}' => {
                        frames.pop();
                        if braces > 0 {
                            frames.push(Frame::Code { braces: braces - 1 });
                        } else if frames.is_empty() {
                            // Unbalanced at top level; keep scanning as code
                            frames.push(Frame::Code { braces: 0 });
                        }
                        regex_allowed = false;
                        i += 1;
                    }
                    c if is_ident_byte(c) => {
                        let start = i;
                        while i < bytes.len()
                            && is_ident_byte(bytes[i])
                            && !bytes[i..].starts_with(needle)
                        {
                            i += 1;
                        }
                        regex_allowed = REGEX_PREFIX_KEYWORDS.contains(&&source[start..i]);
                    }
                    b')' | b']' => {
                        regex_allowed = false;
                        i += 1;
                    }
                    c if c.is_ascii_whitespace() => i += 1,
                    _ => {
                        regex_allowed = true;
                        i += 1;
                    }
                }
            }
            None => break,
        }
    }

    match frames.last() {
        Some(Frame::Code { .. }) if frames.len() == 1 => Ok(slots),
        _ => {
            let start = frames
                .iter()
                .rev()
                .find_map(|frame| match frame {
                    Frame::Template { start } => Some(*start),
                    Frame::Code { .. } => None,
                })
                .unwrap_or(0);
            Err(ScriptError::UnterminatedLiteral(start))
        }
    }
}

/// Index of the quote closing the string opened at `open`.
fn string_end(bytes: &[u8], open: usize) -> Result<usize, ScriptError> {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' | b'\r' => break,
            c if c == quote => return Ok(i),
            _ => i += 1,
        }
    }
    Err(ScriptError::UnterminatedLiteral(open))
}

/// Index just past the `/` closing the regex literal opened at `open`.
fn regex_end(bytes: &[u8], open: usize) -> Result<usize, ScriptError> {
    let mut in_class = false;
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => return Ok(i + 1),
            b'\n' | b'\r' => break,
            _ => i += 1,
        }
    }
    Err(ScriptError::UnterminatedLiteral(open))
}

/// Returns the script file path.
///
/// Priority:
/// 1. Environment variable `PWD_STRENGTH_SCRIPT_PATH`
/// 2. Default path `./assets/zxcvbn-ts.js`
pub fn get_script_path() -> PathBuf {
    std::env::var(SCRIPT_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCRIPT_PATH))
}

/// Loads the process-wide script template from [`get_script_path`] using the
/// default `$arg1` placeholder.
///
/// # Errors
///
/// Returns error if:
/// - File does not exist
/// - File cannot be read
/// - File is empty or lacks the placeholder
pub fn init_script_template() -> Result<Arc<ScriptTemplate>, ScriptError> {
    init_script_template_from_path(get_script_path(), DEFAULT_PLACEHOLDER)
}

/// Loads the process-wide script template from a specific file path.
///
/// Idempotent: once a template is cached, later calls return it without
/// touching the filesystem.
pub fn init_script_template_from_path<P: AsRef<Path>>(
    path: P,
    placeholder: &str,
) -> Result<Arc<ScriptTemplate>, ScriptError> {
    if let Some(template) = get_script_template() {
        return Ok(template);
    }

    let path = path.as_ref();
    let template = match ScriptTemplate::load(path, placeholder) {
        Ok(template) => Arc::new(template),
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::error!("Script template initialization FAILED for {:?}: {}", path, e);
            return Err(e);
        }
    };

    let mut guard = SCRIPT_TEMPLATE.write().unwrap_or_else(PoisonError::into_inner);
    // A concurrent initializer may have won the race
    let cached = guard.get_or_insert_with(|| template).clone();

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Script template initialized: {} bytes from {:?}",
        cached.source().len(),
        path
    );

    Ok(cached)
}

/// Returns the cached template, or `None` before initialization.
pub fn get_script_template() -> Option<Arc<ScriptTemplate>> {
    SCRIPT_TEMPLATE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[cfg(test)]
pub(crate) fn reset_script_template_for_testing() {
    let mut guard = SCRIPT_TEMPLATE.write().unwrap_or_else(PoisonError::into_inner);
    *guard = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn secret(s: &str) -> SecretString {
        SecretString::new(s.to_string().into())
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::set_var(key, value); }
    }

    fn remove_env(key: &str) {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::remove_var(key); }
    }

    fn script_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        write!(temp_file, "{}", content).expect("Failed to write");
        temp_file
    }

    #[test]
    fn test_new_rejects_empty_and_missing_placeholder() {
        assert!(matches!(
            ScriptTemplate::new("  \n", "$arg1"),
            Err(ScriptError::EmptyScript)
        ));
        assert!(matches!(
            ScriptTemplate::new("zxcvbn(x).score", "$arg1"),
            Err(ScriptError::MissingPlaceholder(_))
        ));
    }

    #[test]
    fn test_render_bare_placeholder() {
        let template = ScriptTemplate::new("zxcvbn($arg1).score", "$arg1").unwrap();
        assert_eq!(
            template.render(&secret("hunter2")).unwrap(),
            r#"zxcvbn("hunter2").score"#
        );
    }

    #[test]
    fn test_render_consumes_surrounding_quotes() {
        let double = ScriptTemplate::new(r#"zxcvbn("$arg1").score"#, "$arg1").unwrap();
        let single = ScriptTemplate::new("zxcvbn('$arg1').score", "$arg1").unwrap();
        assert_eq!(
            double.render(&secret("abc")).unwrap(),
            r#"zxcvbn("abc").score"#
        );
        assert_eq!(
            single.render(&secret("abc")).unwrap(),
            r#"zxcvbn("abc").score"#
        );
    }

    #[test]
    fn test_new_rejects_unterminated_string() {
        assert!(matches!(
            ScriptTemplate::new(r#"f("$arg1')"#, "$arg1"),
            Err(ScriptError::UnterminatedLiteral(2))
        ));
        assert!(matches!(
            ScriptTemplate::new("f($arg1) /* note", "$arg1"),
            Err(ScriptError::UnterminatedLiteral(9))
        ));
    }

    #[test]
    fn test_new_rejects_placeholder_inside_template_literal() {
        assert!(matches!(
            ScriptTemplate::new("zxcvbn(`$arg1`).score", "$arg1"),
            Err(ScriptError::UnsafePlaceholder(8))
        ));
        assert!(matches!(
            ScriptTemplate::new("zxcvbn(`pw: ${x} $arg1`).score", "$arg1"),
            Err(ScriptError::UnsafePlaceholder(_))
        ));
    }

    #[test]
    fn test_new_rejects_placeholder_inside_longer_string() {
        for source in [
            r#"zxcvbn("pw:$arg1").score"#,
            "zxcvbn('$arg1 ').score",
            r#"zxcvbn(""$arg1").score"#,
        ] {
            assert!(
                matches!(
                    ScriptTemplate::new(source, "$arg1"),
                    Err(ScriptError::UnsafePlaceholder(7))
                ),
                "accepted {source}"
            );
        }
    }

    #[test]
    fn test_new_rejects_placeholder_inside_regex() {
        assert!(matches!(
            ScriptTemplate::new("/^$arg1$/.test(x)", "$arg1"),
            Err(ScriptError::UnsafePlaceholder(0))
        ));
        // `/` after a value divides, so this is code
        let template = ScriptTemplate::new("score(x) / $arg1.length", "$arg1").unwrap();
        assert_eq!(
            template.render(&secret("ab")).unwrap(),
            r#"score(x) / "ab".length"#
        );
    }

    #[test]
    fn test_render_inside_template_substitution_is_code() {
        let template = ScriptTemplate::new("`${zxcvbn($arg1).score}`", "$arg1").unwrap();
        assert_eq!(
            template.render(&secret("${globalThis.pwned=1}")).unwrap(),
            r#"`${zxcvbn("${globalThis.pwned=1}").score}`"#
        );
    }

    #[test]
    fn test_comments_do_not_confuse_quote_tracking() {
        let source = "// don't use `eval` here\n/* \"$arg1\" */ zxcvbn('$arg1').score";
        let template = ScriptTemplate::new(source, "$arg1").unwrap();
        assert_eq!(
            template.render(&secret("x")).unwrap(),
            "// don't use `eval` here\n/* \"$arg1\" */ zxcvbn(\"x\").score"
        );
        assert!(matches!(
            ScriptTemplate::new("zxcvbn(x) // $arg1", "$arg1"),
            Err(ScriptError::MissingPlaceholder(_))
        ));
    }

    #[test]
    fn test_render_keeps_interpolation_syntax_inert() {
        let quoted = ScriptTemplate::new(r#"zxcvbn("$arg1").score"#, "$arg1").unwrap();
        let bare = ScriptTemplate::new("zxcvbn($arg1).score", "$arg1").unwrap();
        for template in [quoted, bare] {
            assert_eq!(
                template.render(&secret("${globalThis.pwned=1}")).unwrap(),
                r#"zxcvbn("${globalThis.pwned=1}").score"#
            );
            assert_eq!(
                template.render(&secret("+(globalThis.pwned=1)+")).unwrap(),
                r#"zxcvbn("+(globalThis.pwned=1)+").score"#
            );
        }
    }

    #[test]
    fn test_render_escapes_injection_attempts() {
        let template = ScriptTemplate::new(r#"zxcvbn("$arg1").score"#, "$arg1").unwrap();
        let rendered = template
            .render(&secret("\"); fetch('//evil'); (\"\\\n"))
            .unwrap();
        assert_eq!(
            rendered,
            r#"zxcvbn("\"); fetch('//evil'); (\"\\\n").score"#
        );
    }

    #[test]
    fn test_render_does_not_rescan_inserted_password() {
        let template = ScriptTemplate::new("a($arg1); b($arg1)", "$arg1").unwrap();
        assert_eq!(
            template.render(&secret("$arg1")).unwrap(),
            r#"a("$arg1"); b("$arg1")"#
        );
    }

    #[test]
    fn test_render_escapes_js_line_terminators() {
        let template = ScriptTemplate::new("s($arg1)", "$arg1").unwrap();
        assert_eq!(
            template.render(&secret("a\u{2028}b")).unwrap(),
            r#"s("a\u2028b")"#
        );
    }

    #[test]
    #[serial]
    fn test_get_script_path_default_and_env() {
        remove_env(SCRIPT_PATH_ENV);
        assert_eq!(get_script_path(), PathBuf::from("./assets/zxcvbn-ts.js"));

        set_env(SCRIPT_PATH_ENV, "/custom/zxcvbn.js");
        assert_eq!(get_script_path(), PathBuf::from("/custom/zxcvbn.js"));
        remove_env(SCRIPT_PATH_ENV);
    }

    #[test]
    #[serial]
    fn test_init_script_template_file_not_found() {
        reset_script_template_for_testing();
        set_env(SCRIPT_PATH_ENV, "/nonexistent/path/zxcvbn.js");

        match init_script_template() {
            Err(ScriptError::FileNotFound(_)) => {}
            other => panic!("Expected FileNotFound error, got {:?}", other),
        }
        assert!(get_script_template().is_none());

        remove_env(SCRIPT_PATH_ENV);
    }

    #[test]
    #[serial]
    fn test_init_script_template_is_idempotent() {
        reset_script_template_for_testing();
        let first = script_file("zxcvbn('$arg1').score");
        let second = script_file("other('$arg1')");

        let loaded = init_script_template_from_path(first.path(), "$arg1").unwrap();
        assert_eq!(loaded.source(), "zxcvbn('$arg1').score");

        let again = init_script_template_from_path(second.path(), "$arg1").unwrap();
        assert!(Arc::ptr_eq(&loaded, &again));

        reset_script_template_for_testing();
    }

    #[test]
    #[serial]
    fn test_init_script_template_empty_file() {
        reset_script_template_for_testing();
        let empty = script_file("");
        assert!(matches!(
            init_script_template_from_path(empty.path(), "$arg1"),
            Err(ScriptError::EmptyScript)
        ));
    }
}
