//! Static validation of submitted Python source.
//!
//! Runs a full tree-sitter parse of the script, rejects the constructs the
//! grammar tolerates but CPython refuses at parse time, and checks that the
//! script defines a plain `def main` at module level. Nothing is executed
//! here.

use tree_sitter::{Node, Parser};

use crate::error::CoreError;

/// Rejection reason for sources that do not parse.
pub const SYNTAX_ERROR: &str = "Syntax Error in script";

/// Rejection reason for sources without a top-level `main` function.
pub const MISSING_MAIN: &str = "Script must contain a 'main()' function";

/// Name of the required entry point.
const ENTRY_POINT: &str = "main";

/// Result of validating one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(String),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Check that `source` parses and declares a top-level `main` function.
///
/// Only module-level statements are inspected; a `main` nested in a class,
/// function, or conditional does not count. Arity and return type are not
/// checked.
///
/// Returns `Err` only if the parser itself cannot be initialised.
pub fn validate(source: &str) -> Result<ValidationOutcome, CoreError> {
    let mut parser = Parser::new();
    parser
        .set_language(tree_sitter_python::language())
        .map_err(|e| CoreError::Internal(format!("Failed to load Python grammar: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| CoreError::Internal("Python parser returned no tree".to_string()))?;
    let root = tree.root_node();

    if root.has_error() || rejected_by_python3(root) {
        return Ok(ValidationOutcome::Invalid(SYNTAX_ERROR.to_string()));
    }

    let mut cursor = root.walk();
    let has_main = root
        .named_children(&mut cursor)
        .any(|node| declares_entry_point(node, source));

    if has_main {
        Ok(ValidationOutcome::Valid)
    } else {
        Ok(ValidationOutcome::Invalid(MISSING_MAIN.to_string()))
    }
}

/// Whether a module-level statement is `def main(...)`, decorated or not.
fn declares_entry_point(node: Node<'_>, source: &str) -> bool {
    let def = match node.kind() {
        "function_definition" => node,
        "decorated_definition" => match node.child_by_field_name("definition") {
            Some(inner) if inner.kind() == "function_definition" => inner,
            _ => return false,
        },
        _ => return false,
    };

    // `async def` parses as a function_definition with a leading `async` token.
    if def.child(0).is_some_and(|first| first.kind() == "async") {
        return false;
    }

    def.child_by_field_name("name")
        .and_then(|name| name.utf8_text(source.as_bytes()).ok())
        .is_some_and(|name| name == ENTRY_POINT)
}

/// Whether the tree holds a construct the grammar accepts but CPython
/// rejects while parsing.
///
/// Walks with an explicit stack; deeply nested input must not exhaust the
/// worker thread's stack.
fn rejected_by_python3(root: Node<'_>) -> bool {
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if violates_python3_grammar(node) {
            return true;
        }
        let mut cursor = node.walk();
        pending.extend(node.named_children(&mut cursor));
    }
    false
}

fn violates_python3_grammar(node: Node<'_>) -> bool {
    match node.kind() {
        // Python 2 statement forms.
        "print_statement" | "exec_statement" => true,
        // `del 1`, `del f()`
        "delete_statement" => has_invalid_delete_target(node),
        // `x += y += 1`, `x += y = 1`
        "augmented_assignment" => {
            right_side_is(node, &["assignment", "augmented_assignment"])
        }
        // `x = y += 1`, `x: int = y = 1`
        "assignment" => {
            right_side_is(node, &["augmented_assignment"])
                || (node.child_by_field_name("type").is_some()
                    && right_side_is(node, &["assignment"]))
        }
        // `f(x for x in y, 1)`, `[x for x in a, b]`
        "for_in_clause" => has_token(node, ","),
        // `f(a=1, 2)`, `f(**k, *a)`
        "argument_list" => has_positional_after_keyword(node),
        // `def f(a=1, b)`, `lambda a=1, b: 0`, `def f((a, b))`
        "parameters" | "lambda_parameters" => has_misordered_parameters(node),
        _ => false,
    }
}

fn right_side_is(node: Node<'_>, kinds: &[&str]) -> bool {
    node.child_by_field_name("right")
        .is_some_and(|right| kinds.contains(&right.kind()))
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

/// Only names, attributes and subscripts (optionally grouped) can be deleted.
fn has_invalid_delete_target(statement: Node<'_>) -> bool {
    let mut cursor = statement.walk();
    let mut pending: Vec<Node<'_>> = statement.named_children(&mut cursor).collect();
    while let Some(target) = pending.pop() {
        match target.kind() {
            "identifier" | "keyword_identifier" | "attribute" | "subscript" | "comment" => {}
            "expression_list" | "tuple" | "list" | "parenthesized_expression" => {
                let mut inner = target.walk();
                pending.extend(target.named_children(&mut inner));
            }
            _ => return true,
        }
    }
    false
}

/// Positional arguments may not follow keyword arguments, and iterable
/// unpacking may not follow mapping unpacking.
fn has_positional_after_keyword(arguments: Node<'_>) -> bool {
    let mut seen_keyword = false;
    let mut seen_mapping_unpack = false;
    let mut cursor = arguments.walk();
    for argument in arguments.named_children(&mut cursor) {
        match argument.kind() {
            "comment" => {}
            "keyword_argument" => seen_keyword = true,
            "dictionary_splat" => seen_mapping_unpack = true,
            "list_splat" => {
                if seen_mapping_unpack {
                    return true;
                }
            }
            _ => {
                if seen_keyword || seen_mapping_unpack {
                    return true;
                }
            }
        }
    }
    false
}

/// A parameter without a default may not follow one with a default unless a
/// `*` or `*args` separates them. Tuple parameters are Python 2 only.
fn has_misordered_parameters(parameters: Node<'_>) -> bool {
    let mut seen_default = false;
    let mut seen_star = false;
    let mut cursor = parameters.walk();
    for parameter in parameters.named_children(&mut cursor) {
        let kind = match parameter.kind() {
            // `a: int`, `*args: int`, `**kw: int`
            "typed_parameter" => parameter
                .named_child(0)
                .map_or("identifier", |inner| inner.kind()),
            other => other,
        };
        match kind {
            "comment" | "positional_separator" | "dictionary_splat_pattern" => {}
            "default_parameter" => {
                if parameter
                    .child_by_field_name("name")
                    .is_some_and(|name| name.kind() == "tuple_pattern")
                {
                    return true;
                }
                seen_default = true;
            }
            "typed_default_parameter" => seen_default = true,
            "list_splat_pattern" | "keyword_separator" => seen_star = true,
            "tuple_pattern" => return true,
            _ => {
                if seen_default && !seen_star {
                    return true;
                }
            }
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn check(source: &str) -> ValidationOutcome {
        validate(source).expect("parser should initialise")
    }

    #[test]
    fn accepts_simple_main() {
        let source = "def main():\n    return {\"status\": \"ok\"}\n";
        assert_eq!(check(source), ValidationOutcome::Valid);
    }

    #[test]
    fn accepts_main_with_helpers_and_imports() {
        let source = "\
import json

def helper(x):
    return x * 2

def main():
    print('working')
    return helper(21)
";
        assert!(check(source).is_valid());
    }

    #[test]
    fn accepts_decorated_main() {
        let source = "\
import functools

@functools.lru_cache(maxsize=None)
def main():
    return 1
";
        assert!(check(source).is_valid());
    }

    #[test]
    fn accepts_main_with_parameters() {
        // Arity is not checked; the harness will report the call failure.
        assert!(check("def main(a, b=2, *args, **kwargs):\n    pass\n").is_valid());
    }

    #[test]
    fn rejects_unbalanced_parenthesis() {
        let source = "def main(\n    return {}\n";
        assert_eq!(
            check(source),
            ValidationOutcome::Invalid(SYNTAX_ERROR.to_string())
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            check("this is not python at all )))"),
            ValidationOutcome::Invalid(SYNTAX_ERROR.to_string())
        );
    }

    #[test]
    fn rejects_python2_print_statement() {
        let source = "def main():\n    print \"hello\"\n    return 1\n";
        assert_eq!(
            check(source),
            ValidationOutcome::Invalid(SYNTAX_ERROR.to_string())
        );
    }

    #[test]
    fn rejects_script_without_main() {
        assert_eq!(
            check("print(\"I have no main\")\n"),
            ValidationOutcome::Invalid(MISSING_MAIN.to_string())
        );
    }

    #[test]
    fn rejects_empty_script() {
        assert_eq!(
            check(""),
            ValidationOutcome::Invalid(MISSING_MAIN.to_string())
        );
    }

    #[test]
    fn rejects_main_nested_in_class() {
        let source = "class App:\n    def main(self):\n        return 1\n";
        assert_eq!(
            check(source),
            ValidationOutcome::Invalid(MISSING_MAIN.to_string())
        );
    }

    #[test]
    fn rejects_main_nested_in_conditional() {
        let source = "if True:\n    def main():\n        return 1\n";
        assert_eq!(
            check(source),
            ValidationOutcome::Invalid(MISSING_MAIN.to_string())
        );
    }

    #[test]
    fn rejects_main_assigned_as_lambda() {
        assert_eq!(
            check("main = lambda: 1\n"),
            ValidationOutcome::Invalid(MISSING_MAIN.to_string())
        );
    }

    #[test]
    fn rejects_async_main() {
        assert_eq!(
            check("async def main():\n    return 1\n"),
            ValidationOutcome::Invalid(MISSING_MAIN.to_string())
        );
    }

    #[test]
    fn rejects_similarly_named_functions() {
        let source = "def main_helper():\n    return 1\n\ndef _main():\n    return 2\n";
        assert_eq!(
            check(source),
            ValidationOutcome::Invalid(MISSING_MAIN.to_string())
        );
    }

    fn with_main(line: &str) -> String {
        format!("{line}\n\ndef main():\n    return 1\n")
    }

    fn assert_syntax_error(line: &str) {
        assert_eq!(
            check(&with_main(line)),
            ValidationOutcome::Invalid(SYNTAX_ERROR.to_string()),
            "expected syntax error for {line:?}"
        );
    }

    fn assert_accepted(line: &str) {
        assert_eq!(
            check(&with_main(line)),
            ValidationOutcome::Valid,
            "expected {line:?} to be accepted"
        );
    }

    #[test]
    fn rejects_deleting_literals_and_calls() {
        assert_syntax_error("del 1");
        assert_syntax_error("del 'a'");
        assert_syntax_error("del f()");
        assert_syntax_error("del x, 2");
    }

    #[test]
    fn accepts_deleting_names_attributes_and_items() {
        assert_accepted("del x");
        assert_accepted("del x.y, z[0]");
        assert_accepted("del (a, [b, c])");
    }

    #[test]
    fn rejects_chained_augmented_assignment() {
        assert_syntax_error("x += y += 1");
        assert_syntax_error("x += y = 1");
        assert_syntax_error("x = y += 1");
        assert_syntax_error("x: int = y = 1");
    }

    #[test]
    fn accepts_plain_assignment_chains() {
        assert_accepted("x = y = 1");
        assert_accepted("x: int = 1");
        assert_accepted("x += 1");
        assert_accepted("x += a, b");
    }

    #[test]
    fn rejects_unparenthesized_generator_beside_other_arguments() {
        assert_syntax_error("f(x for x in y, 1)");
        assert_syntax_error("r = [x for x in a, b]");
    }

    #[test]
    fn accepts_generator_arguments_and_tuple_loops() {
        assert_accepted("f(x for x in y)");
        assert_accepted("f((x for x in y), 1)");
        assert_accepted("d = dict((k, v) for k, v in items)");
        assert_accepted("for x in a, b:\n    pass");
    }

    #[test]
    fn rejects_positional_after_keyword_argument() {
        assert_syntax_error("f(a=1, 2)");
        assert_syntax_error("f(**k, 2)");
        assert_syntax_error("f(**k, *a)");
        assert_syntax_error("class C(metaclass=M, Base):\n    pass");
    }

    #[test]
    fn accepts_valid_argument_orders() {
        assert_accepted("f(1, *a, b=2, **k)");
        assert_accepted("f(a=1, *rest)");
        assert_accepted("f(**k, a=1)");
        assert_accepted("sorted(*items, key=len)");
    }

    #[test]
    fn rejects_non_default_parameter_after_default() {
        assert_syntax_error("def f(a=1, b): pass");
        assert_syntax_error("def f(a: int = 1, b: int): pass");
        assert_syntax_error("g = lambda a=1, b: 0");
    }

    #[test]
    fn rejects_tuple_parameters() {
        assert_syntax_error("def f((a, b)): pass");
    }

    #[test]
    fn accepts_keyword_only_parameters_after_defaults() {
        assert_accepted("def f(a=1, *, b): pass");
        assert_accepted("def f(a=1, *args, b, **kw): pass");
        assert_accepted("def f(a, /, b=2, *, c): pass");
        assert_accepted("def f(self, x: int, y: str = 'a'): pass");
        assert_accepted("g = lambda a, b=1: a + b");
    }

    #[test]
    fn checks_apply_inside_main() {
        let source = "def main():\n    del 1\n    return 1\n";
        assert_eq!(
            check(source),
            ValidationOutcome::Invalid(SYNTAX_ERROR.to_string())
        );
    }

    #[test]
    fn deeply_nested_source_does_not_overflow() {
        let depth = 10_000;
        let source = format!(
            "x = {}1{}\n\ndef main():\n    return x\n",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        // Either verdict is fine; the walk must finish.
        let _ = check(&source);
    }
}
