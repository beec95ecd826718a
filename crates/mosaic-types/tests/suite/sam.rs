use mosaic_types::{
    format_type, functional_method, SamError, SamTieBreak, Type, TypeEnv, TypeStore,
    WildcardBound,
};

use pretty_assertions::assert_eq;

#[test]
fn wildcard_arguments_are_replaced_by_their_bounds() {
    let store = TypeStore::with_minimal_jdk();
    let function = store.lookup_class("java.util.function.Function").unwrap();
    let number = Type::Declared(store.well_known().number);
    let integer = Type::Declared(store.well_known().integer);

    // Function<? super Integer, ? extends Number>
    let ty = Type::class(
        function,
        vec![
            Type::Wildcard(WildcardBound::Super(Box::new(integer.clone()))),
            Type::Wildcard(WildcardBound::Extends(Box::new(number.clone()))),
        ],
    );
    let sam = functional_method(&store, &ty, SamTieBreak::Reject).unwrap();
    assert_eq!(sam.params, vec![integer]);
    assert_eq!(sam.return_type, number);
}

#[test]
fn supplier_and_runnable_shapes() {
    let store = TypeStore::with_minimal_jdk();
    let supplier = store.lookup_class("java.util.function.Supplier").unwrap();
    let runnable = store.lookup_class("java.lang.Runnable").unwrap();
    let string = Type::Declared(store.well_known().string);

    let get = functional_method(
        &store,
        &Type::class(supplier, vec![string.clone()]),
        SamTieBreak::Reject,
    )
    .unwrap();
    assert_eq!((get.name.as_str(), get.params.len()), ("get", 0));
    assert_eq!(format_type(&store, &get.return_type), "String");

    let run = functional_method(&store, &Type::Declared(runnable), SamTieBreak::Reject).unwrap();
    assert_eq!(run.return_type, Type::Void);
}

#[test]
fn interface_without_abstract_methods_is_rejected() {
    let store = TypeStore::with_minimal_jdk();
    let serializable = Type::Declared(store.well_known().serializable);
    assert_eq!(
        functional_method(&store, &serializable, SamTieBreak::First),
        Err(SamError::NoAbstractMethod("java.io.Serializable".to_string()))
    );
}
