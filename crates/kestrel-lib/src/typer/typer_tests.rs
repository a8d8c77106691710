use indoc::indoc;

use crate::Buffer;
use crate::typer::printer::scheme_to_string;
use crate::typer::typed::TypedItem;

fn buffer(source: &str) -> Buffer {
    Buffer::new(source).unwrap()
}

/// Name and printed scheme of every `Value` item in a state list.
fn top_values(buffer: &Buffer) -> Vec<(String, String)> {
    buffer
        .states()
        .filter(|s| s.depth == 0)
        .flat_map(|s| s.items.iter())
        .filter_map(|item| match item {
            TypedItem::Value { name, scheme, .. } => {
                Some((name.clone(), scheme_to_string(scheme)))
            }
            _ => None,
        })
        .collect()
}

fn all_errors(buffer: &Buffer) -> Vec<String> {
    buffer
        .states()
        .flat_map(|s| s.errors.iter())
        .map(|e| e.message.clone())
        .collect()
}

#[test]
fn unit_binding() {
    let b = buffer("let u = ()");
    assert_eq!(top_values(&b), [("u".to_string(), "unit".to_string())]);
    assert!(all_errors(&b).is_empty());
}

#[test]
fn bindings_see_earlier_chunks() {
    let b = buffer("let a = 1\nlet b = a + 1");
    assert_eq!(
        top_values(&b),
        [
            ("a".to_string(), "int".to_string()),
            ("b".to_string(), "int".to_string())
        ]
    );
}

#[test]
fn functions_generalize() {
    let b = buffer("let id = fun x -> x");
    assert_eq!(top_values(&b), [("id".to_string(), "'a -> 'a".to_string())]);
}

#[test]
fn recursive_binding() {
    let b = buffer("let rec loop x = loop x");
    assert_eq!(
        top_values(&b),
        [("loop".to_string(), "'a -> 'b".to_string())]
    );
}

#[test]
fn and_group_types_as_one_definition() {
    let b = buffer("let a = 1 and b = \"s\"");
    assert_eq!(
        top_values(&b),
        [
            ("a".to_string(), "int".to_string()),
            ("b".to_string(), "string".to_string())
        ]
    );
}

#[test]
fn annotation_mismatch_is_an_error() {
    let b = buffer("let a : string = 2");
    let errors = all_errors(&b);
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].contains("has type int") && errors[0].contains("expected of type string"),
        "unexpected message: {}",
        errors[0]
    );
}

#[test]
fn error_in_one_chunk_is_local() {
    let source = indoc! {"
        let a = 1
        let bad : string = 2
        let c = a + 1
    "};
    let b = buffer(source);
    // Reported exactly once; the chunks after it still type.
    assert_eq!(all_errors(&b).len(), 1);
    let values = top_values(&b);
    assert!(values.contains(&("c".to_string(), "int".to_string())));
}

#[test]
fn error_inside_group_advances_to_remaining_items() {
    let b = buffer("let a = unknown_name and b = 2");
    assert_eq!(all_errors(&b).len(), 1);
    assert_eq!(top_values(&b), [("b".to_string(), "int".to_string())]);
}

#[test]
fn module_members_resolve_qualified() {
    let source = indoc! {"
        module M = struct
          let u = ()
        end
        let v = M.u
    "};
    let b = buffer(source);
    assert!(all_errors(&b).is_empty());
    assert!(top_values(&b).contains(&("v".to_string(), "unit".to_string())));
}

#[test]
fn open_brings_members_into_scope() {
    let source = indoc! {"
        module M = struct
          let u = 1
        end
        open M
        let v = u + 1
    "};
    let b = buffer(source);
    assert!(all_errors(&b).is_empty());
    assert!(top_values(&b).contains(&("v".to_string(), "int".to_string())));
}

#[test]
fn closed_module_restores_outer_environment() {
    let source = indoc! {"
        let u = 1
        module M = struct
          let u = ()
        end
        let w = u + 1
    "};
    let b = buffer(source);
    // Outside the module, `u` is the outer int again.
    assert!(all_errors(&b).is_empty());
    assert!(top_values(&b).contains(&("w".to_string(), "int".to_string())));
}

#[test]
fn nested_modules_fold_into_their_parent() {
    let source = indoc! {"
        module M = struct
          module N = struct
            let u = ()
          end
        end
        let v = M.N.u
    "};
    let b = buffer(source);
    assert!(all_errors(&b).is_empty(), "errors: {:?}", all_errors(&b));
    assert!(top_values(&b).contains(&("v".to_string(), "unit".to_string())));
}

#[test]
fn variant_constructors_are_usable() {
    let source = indoc! {"
        type shape = Circle of int | Point
        let s = Circle 3
        let p = Point
    "};
    let b = buffer(source);
    assert!(all_errors(&b).is_empty(), "errors: {:?}", all_errors(&b));
    let values = top_values(&b);
    assert!(values.contains(&("s".to_string(), "shape".to_string())));
    assert!(values.contains(&("p".to_string(), "shape".to_string())));
}

#[test]
fn exceptions_bind_constructors() {
    let b = buffer("exception Failure of string\nlet e = Failure \"boom\"");
    assert!(all_errors(&b).is_empty());
    assert!(top_values(&b).contains(&("e".to_string(), "exn".to_string())));
}

#[test]
fn unused_parameter_warning() {
    let b = buffer("let f x = 1");
    let warnings: Vec<_> = b
        .states()
        .flat_map(|s| s.warnings.iter())
        .map(|w| w.message.clone())
        .collect();
    assert_eq!(warnings, ["unused variable x"]);
}

#[test]
fn empty_buffer_state() {
    let b = buffer("");
    assert_eq!(b.typer().len(), b.chunks().len());
    let state = b.state().unwrap();
    assert!(state.items.is_empty());
    assert!(state.errors.is_empty());
}

#[test]
fn typer_history_tracks_chunk_history() {
    let mut b = buffer("let a = 1\nlet b = 2");
    assert_eq!(b.typer().len(), b.chunks().len());
    b.update("let a = 1\nlet b = 22\nlet c = 3").unwrap();
    assert_eq!(b.typer().len(), b.chunks().len());
}

#[test]
fn edit_retypes_only_the_suffix() {
    let source = "let a = 1\nlet b = 2\nlet c = 3\nlet d = 4";
    let mut b = buffer(source);
    let before = b.stats().definitions_typed;
    assert_eq!(before, 4);

    b.update("let a = 1\nlet b = 2\nlet c = 3\nlet d = 40").unwrap();
    // Only the edited definition is re-typed.
    assert_eq!(b.stats().definitions_typed, before + 1);
}

#[test]
fn incremental_and_fresh_typing_agree() {
    let old = "let a = 1\nlet b = a\nlet c = b";
    let new = "let a = \"s\"\nlet b = a\nlet c = b";
    let mut incremental = buffer(old);
    incremental.update(new).unwrap();
    let fresh = buffer(new);

    assert_eq!(top_values(&incremental), top_values(&fresh));
    assert_eq!(all_errors(&incremental), all_errors(&fresh));
}
