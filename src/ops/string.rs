//! String indexing. The runtime half is provided by the native runtime as
//! `_char_at`, so the staged form is a native call rather than a dedicated
//! node kind.

use crate::ast::AstNode;
use crate::diag::{self, Diagnostic};
use crate::types;
use crate::value::Value;

use super::lowered_node;

/// char_at : string -> int -> int
///
/// Returns the byte at the index. Out-of-range indices are reported at
/// compile time; the native runtime owns that check after staging.
pub fn char_at(string: &Value, index: &Value) -> Value {
    if string.is_runtime() || index.is_runtime() {
        let (Some(s), Some(i)) = (lowered_node(string), lowered_node(index)) else {
            return Value::error();
        };
        return Value::runtime(AstNode::native_call(
            string.loc(),
            "_char_at",
            types::int(),
            vec![s, i],
            vec![types::string(), types::int()],
        ));
    }
    if string.is_error() || index.is_error() {
        return Value::error();
    }
    if !string.is_string() {
        diag::report(string.loc(), Diagnostic::StringOperand(string.ty()));
        return Value::error();
    }
    if !index.is_int() {
        diag::report(index.loc(), Diagnostic::IndexOperand(index.ty()));
        return Value::error();
    }
    let (Some(s), Some(i)) = (string.as_str(), index.as_int()) else {
        return Value::error();
    };
    match usize::try_from(i).ok().and_then(|i| s.as_bytes().get(i)) {
        Some(&byte) => Value::int(byte as i64, string.loc()),
        None => {
            diag::report(index.loc(), Diagnostic::IndexOutOfBounds(i, s.len()));
            Value::error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstKind;
    use crate::loc::Loc;

    fn s(text: &str) -> Value {
        Value::string(text, Loc::default())
    }

    fn int(i: i64) -> Value {
        Value::int(i, Loc::default())
    }

    #[test]
    fn indexes_bytes() {
        assert_eq!(char_at(&s("abc"), &int(0)).as_int(), Some(b'a' as i64));
        assert_eq!(char_at(&s("abc"), &int(2)).as_int(), Some(b'c' as i64));
    }

    #[test]
    fn out_of_range_is_reported() {
        diag::drain();
        assert!(char_at(&s("abc"), &int(3)).is_error());
        assert!(char_at(&s("abc"), &int(-1)).is_error());
        let reports = diag::drain();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].diagnostic, Diagnostic::IndexOutOfBounds(3, 3));
    }

    #[test]
    fn staged_indexing_is_a_native_call() {
        let rt = Value::runtime(AstNode::int(Loc::default(), 1));
        let out = char_at(&s("abc"), &rt);
        let node = out.as_runtime().unwrap();
        let AstKind::NativeCall {
            name, arg_types, ..
        } = node.kind()
        else {
            panic!("expected native call, got {node}");
        };
        assert_eq!(*name, "_char_at");
        assert_eq!(arg_types, &[types::string(), types::int()]);
        assert_eq!(node.ty(), types::int());
    }

    #[test]
    fn operand_kinds_are_checked() {
        diag::drain();
        assert!(char_at(&int(1), &int(0)).is_error());
        assert!(char_at(&s("a"), &s("b")).is_error());
        assert_eq!(diag::drain().len(), 2);
    }
}
