//! Harness generation for submitted scripts.
//!
//! [`wrap`] embeds the user's source into a fixed Python program that runs
//! it in a fresh namespace, calls `main()`, and reports back over a strict
//! wire contract:
//!
//! - success: exit code 0 and exactly one JSON object on stdout,
//!   `{"result": <value>, "stdout": <captured prints>}`;
//! - failure: nothing on stdout, a traceback on stderr, exit code 1.
//!
//! The harness repeats the `main()` presence check so it does not depend on
//! validation having run.

use std::fmt::Write as _;

/// Raised inside the harness when `main` is missing or not callable.
pub const MAIN_NOT_FOUND: &str = "Function 'main()' not found in script";

/// Raised inside the harness when `main()` returns a non-JSON value.
pub const NOT_SERIALIZABLE: &str = "Return value of main() is not JSON serializable";

/// Filename reported in tracebacks for the user's code.
pub const USER_FILENAME: &str = "user_script.py";

const SOURCE_PLACEHOLDER: &str = "__PYEXEC_USER_SOURCE__";

/// Python harness template. `__PYEXEC_USER_SOURCE__` is replaced by a string
/// literal holding the user's source; nothing else is substituted.
const HARNESS_TEMPLATE: &str = r#"import io
import json
import sys
import traceback

_dumps = json.dumps
_isinstance = isinstance
_real_stdout = sys.stdout
_real_stderr = sys.stderr
_user_source = __PYEXEC_USER_SOURCE__


def _require_str_keys(value):
    # json.dumps coerces int, float, bool and None keys to strings.
    pending = [value]
    while pending:
        item = pending.pop()
        if _isinstance(item, dict):
            for key, child in item.items():
                if not _isinstance(key, str):
                    raise TypeError("dict key is not a string")
                pending.append(child)
        elif _isinstance(item, (list, tuple)):
            pending.extend(item)


_buffer = io.StringIO()
sys.stdout = _buffer
try:
    _namespace = {"__name__": "__sandbox__", "__builtins__": __builtins__}
    exec(compile(_user_source, "user_script.py", "exec"), _namespace)

    _main = _namespace.get("main")
    if _main is None or not callable(_main):
        raise ValueError("Function 'main()' not found in script")

    _result = _main()

    try:
        _dumps(_result, allow_nan=False)
        _require_str_keys(_result)
    except (TypeError, ValueError, RecursionError):
        raise ValueError("Return value of main() is not JSON serializable")

    _captured = _buffer.getvalue()
    sys.stdout = _real_stdout
    _real_stdout.write(_dumps({"result": _result, "stdout": _captured}, allow_nan=False))
    _real_stdout.write("\n")
    _real_stdout.flush()
except BaseException:
    sys.stdout = _real_stdout
    traceback.print_exc(file=_real_stderr)
    _real_stderr.flush()
    sys.exit(1)
"#;

/// A submission embedded in the harness, ready to be written to disk and run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedProgram {
    text: String,
}

impl WrappedProgram {
    /// Full Python source of the harness program.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Embed `source` into the execution harness.
pub fn wrap(source: &str) -> WrappedProgram {
    let literal = python_string_literal(source);
    WrappedProgram {
        text: HARNESS_TEMPLATE.replacen(SOURCE_PLACEHOLDER, &literal, 1),
    }
}

/// Encode `s` as a double-quoted, pure-ASCII Python `str` literal.
///
/// Every character outside printable ASCII is written as an escape, so the
/// literal survives any source encoding and cannot terminate early.
fn python_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' '..='~' => out.push(ch),
            c if (c as u32) <= 0xff => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) <= 0xffff => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
    out.push('"');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
