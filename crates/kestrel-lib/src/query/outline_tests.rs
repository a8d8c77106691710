use indoc::indoc;

use crate::Buffer;
use crate::typer::typed::ItemKind;

use super::outline::{OutlineItem, outline};

fn buffer(source: &str) -> Buffer {
    Buffer::new(source).unwrap()
}

fn summarize(items: &[OutlineItem]) -> Vec<(String, &'static str)> {
    items
        .iter()
        .map(|i| (i.name.clone(), i.kind.as_str()))
        .collect()
}

#[test]
fn values_modules_and_opens() {
    // Scenario: one value inside a module, one at top level. The `open`
    // produces no outline entry.
    let source = "module M = struct\n  let u = ()\nend\nopen M\nlet u = M.u";
    let b = buffer(source);
    let items = outline(&b);

    assert_eq!(
        summarize(&items),
        [
            ("M".to_string(), "Module"),
            ("u".to_string(), "Value"),
        ]
    );
    assert_eq!(
        summarize(&items[0].children),
        [("u".to_string(), "Value")]
    );
    assert_eq!(items[0].children[0].ty.as_deref(), Some("unit"));
    assert_eq!(items[1].ty.as_deref(), Some("unit"));
}

#[test]
fn type_declarations_expose_labels() {
    let b = buffer("type shape = Circle of int | Point");
    let items = outline(&b);
    assert_eq!(summarize(&items), [("shape".to_string(), "Type")]);
    assert_eq!(
        summarize(&items[0].children),
        [
            ("Circle".to_string(), "Label"),
            ("Point".to_string(), "Label")
        ]
    );
}

#[test]
fn record_fields_are_labels() {
    let b = buffer("type point = { x : int; y : int }");
    let items = outline(&b);
    assert_eq!(
        summarize(&items[0].children),
        [("x".to_string(), "Label"), ("y".to_string(), "Label")]
    );
}

#[test]
fn exceptions_and_classes() {
    let b = buffer("exception Oops of string\nclass widget = object end");
    let items = outline(&b);
    assert_eq!(
        summarize(&items),
        [
            ("Oops".to_string(), "Exception"),
            ("widget".to_string(), "Class")
        ]
    );
}

#[test]
fn unterminated_module_still_outlines() {
    // The module never closes; its items must stay reachable.
    let b = buffer("module M = struct\n  let u = ()\n");
    let items = outline(&b);
    assert_eq!(summarize(&items), [("M".to_string(), "Module")]);
    assert_eq!(
        summarize(&items[0].children),
        [("u".to_string(), "Value")]
    );
}

#[test]
fn nested_modules_nest_in_outline() {
    let source = indoc! {"
        module M = struct
          module N = struct
            let u = ()
          end
          let v = 1
        end
    "};
    let b = buffer(source);
    let items = outline(&b);
    assert_eq!(summarize(&items), [("M".to_string(), "Module")]);
    assert_eq!(
        summarize(&items[0].children),
        [("N".to_string(), "Module"), ("v".to_string(), "Value")]
    );
    assert_eq!(
        summarize(&items[0].children[0].children),
        [("u".to_string(), "Value")]
    );
}

#[test]
fn anonymous_bindings_are_hidden() {
    let b = buffer("let () = print_endline \"hi\"\nlet _ = 1");
    let items = outline(&b);
    assert!(items.is_empty());
}

#[test]
fn syntax_error_chunks_leave_no_entry() {
    let b = buffer("let = 3\nlet ok = 1");
    let items = outline(&b);
    assert_eq!(summarize(&items), [("ok".to_string(), "Value")]);
}

fn dump(items: &[OutlineItem], indent: usize, out: &mut String) {
    for item in items {
        for _ in 0..indent {
            out.push_str("  ");
        }
        out.push_str(item.kind.as_str());
        out.push(' ');
        out.push_str(&item.name);
        if let Some(ty) = &item.ty {
            out.push_str(" : ");
            out.push_str(ty);
        }
        out.push('\n');
        dump(&item.children, indent + 1, out);
    }
}

#[test]
fn outline_snapshot() {
    let source = indoc! {"
        module M = struct
          let u = ()
          type t = A | B
        end
        open M
        let double = fun x -> x + x
    "};
    let b = buffer(source);
    let mut rendered = String::new();
    dump(&outline(&b), 0, &mut rendered);
    insta::assert_snapshot!(rendered, @r"
    Module M
      Value u : unit
      Type t
        Label A
        Label B
    Value double : int -> int
    ");
}

#[test]
fn kind_set_is_closed() {
    for kind in [
        ItemKind::Value,
        ItemKind::Type,
        ItemKind::Class,
        ItemKind::Exception,
        ItemKind::Label,
        ItemKind::Module,
    ] {
        assert!(!kind.as_str().is_empty());
    }
}
