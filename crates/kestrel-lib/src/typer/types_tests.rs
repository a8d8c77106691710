use super::printer::type_to_string;
use super::types::{Scheme, Ty, Unifier};

#[test]
fn unify_base_types() {
    let mut un = Unifier::new();
    assert!(un.unify(&Ty::Int, &Ty::Int).is_ok());
    assert!(un.unify(&Ty::Int, &Ty::Str).is_err());
}

#[test]
fn unify_through_variables() {
    let mut un = Unifier::new();
    let v = un.fresh();
    un.unify(&v, &Ty::Int).unwrap();
    assert_eq!(un.resolve(&v), Ty::Int);
    assert!(un.unify(&v, &Ty::Bool).is_err());
}

#[test]
fn unify_arrows_componentwise() {
    let mut un = Unifier::new();
    let a = un.fresh();
    let b = un.fresh();
    let lhs = Ty::arrow(a.clone(), b.clone());
    let rhs = Ty::arrow(Ty::Int, Ty::Bool);
    un.unify(&lhs, &rhs).unwrap();
    assert_eq!(un.resolve(&a), Ty::Int);
    assert_eq!(un.resolve(&b), Ty::Bool);
}

#[test]
fn occurs_check_rejects_infinite_types() {
    let mut un = Unifier::new();
    let v = un.fresh();
    let arrow = Ty::arrow(v.clone(), Ty::Int);
    assert!(un.unify(&v, &arrow).is_err());
}

#[test]
fn tuple_arity_must_match() {
    let mut un = Unifier::new();
    let two = Ty::Tuple(vec![Ty::Int, Ty::Int]);
    let three = Ty::Tuple(vec![Ty::Int, Ty::Int, Ty::Int]);
    assert!(un.unify(&two, &three).is_err());
}

#[test]
fn nominal_types_unify_by_stamp() {
    let mut un = Unifier::new();
    let t1 = Ty::Con {
        name: "t".to_string(),
        stamp: 1,
        args: vec![],
    };
    let t2 = Ty::Con {
        name: "t".to_string(),
        stamp: 2,
        args: vec![],
    };
    assert!(un.unify(&t1, &t1.clone()).is_ok());
    assert!(un.unify(&t1, &t2).is_err());
}

#[test]
fn instantiate_refreshes_quantified_vars() {
    let mut un = Unifier::new();
    let scheme = Scheme {
        vars: vec![0],
        ty: Ty::arrow(Ty::Var(0), Ty::Var(0)),
    };
    let once = un.instantiate(&scheme);
    let twice = un.instantiate(&scheme);
    // Distinct instantiations must not share variables.
    un.unify(&once, &Ty::arrow(Ty::Int, Ty::Int)).unwrap();
    un.unify(&twice, &Ty::arrow(Ty::Str, Ty::Str)).unwrap();
}

#[test]
fn generalize_collects_free_vars() {
    let mut un = Unifier::new();
    let a = un.fresh();
    let b = un.fresh();
    let scheme = un.generalize(&Ty::arrow(a, b));
    assert_eq!(scheme.vars.len(), 2);
}

#[test]
fn printed_variables_in_order_of_appearance() {
    let ty = Ty::arrow(Ty::Var(7), Ty::arrow(Ty::Var(3), Ty::Var(7)));
    assert_eq!(type_to_string(&ty), "'a -> 'b -> 'a");
}

#[test]
fn printed_constructors_and_tuples() {
    let list = |arg: Ty| Ty::Con {
        name: "list".to_string(),
        stamp: 9,
        args: vec![arg],
    };
    assert_eq!(type_to_string(&list(Ty::Int)), "int list");
    assert_eq!(
        type_to_string(&Ty::Tuple(vec![Ty::Int, Ty::Str])),
        "int * string"
    );
    assert_eq!(
        type_to_string(&Ty::arrow(Ty::Tuple(vec![Ty::Int, Ty::Int]), Ty::Bool)),
        "int * int -> bool"
    );
    assert_eq!(
        type_to_string(&list(Ty::arrow(Ty::Int, Ty::Bool))),
        "(int -> bool) list"
    );
}
