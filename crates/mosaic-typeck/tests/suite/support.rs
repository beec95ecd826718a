use std::sync::Once;

use mosaic_hir::Body;
use mosaic_typeck::{check_body, BodyContext, Session, TypeckConfig, TypeckResult};
use mosaic_types::{
    ClassDef, ClassId, ClassKind, FieldDef, MethodDef, MethodRef, Type, TypeEnv, TypeStore,
};

/// Install a `RUST_LOG`-controlled subscriber once per test binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// The minimal JDK plus a few user classes:
///
/// ```java
/// package com.example;
/// class Util {
///     static <T> T identity(T t);
///     static void submit(Supplier<String> s);
///     static void submit(Function<String, String> f);
///     static void exec(Runnable r);
///     static String exec(Supplier<String> s);
///     static int convert(Function<Integer, Integer> f, int x);
///     static int convert(Function<String, Integer> f, String s);
///     static String name();
///     static void log();
/// }
/// class Doubler implements Function<Integer, Integer> { Integer apply(Integer x); }
/// class Person {
///     static final int LIMIT;
///     int age;
///     String getName();
///     boolean isActive();
/// }
/// class Outer { class Inner implements Runnable { .. } }
/// ```
pub struct Fixture {
    pub store: TypeStore,
    pub util: ClassId,
    pub person: ClassId,
    pub outer: ClassId,
    pub inner: ClassId,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let mut store = TypeStore::with_minimal_jdk();
        let object = Type::Declared(store.well_known().object);
        let string = Type::Declared(store.well_known().string);
        let integer = Type::Declared(store.well_known().integer);
        let supplier = store.lookup_class("java.util.function.Supplier").unwrap();
        let function = store.lookup_class("java.util.function.Function").unwrap();
        let runnable = store.lookup_class("java.lang.Runnable").unwrap();

        let t = store.add_type_param("T", vec![object.clone()]);
        let util = store.add_class(ClassDef {
            methods: vec![
                MethodDef {
                    type_params: vec![t],
                    is_static: true,
                    ..MethodDef::new("identity", vec![Type::TypeVar(t)], Type::TypeVar(t))
                },
                MethodDef {
                    is_static: true,
                    ..MethodDef::new(
                        "submit",
                        vec![Type::class(supplier, vec![string.clone()])],
                        Type::Void,
                    )
                },
                MethodDef {
                    is_static: true,
                    ..MethodDef::new(
                        "submit",
                        vec![Type::class(function, vec![string.clone(), string.clone()])],
                        Type::Void,
                    )
                },
                MethodDef {
                    is_static: true,
                    ..MethodDef::new("exec", vec![Type::Declared(runnable)], Type::Void)
                },
                MethodDef {
                    is_static: true,
                    ..MethodDef::new(
                        "exec",
                        vec![Type::class(supplier, vec![string.clone()])],
                        string.clone(),
                    )
                },
                MethodDef {
                    is_static: true,
                    ..MethodDef::new(
                        "convert",
                        vec![Type::class(function, vec![integer.clone(), integer.clone()]), Type::int()],
                        Type::int(),
                    )
                },
                MethodDef {
                    is_static: true,
                    ..MethodDef::new(
                        "convert",
                        vec![Type::class(function, vec![string.clone(), integer.clone()]), string.clone()],
                        Type::int(),
                    )
                },
                MethodDef {
                    is_static: true,
                    ..MethodDef::new("name", vec![], string.clone())
                },
                MethodDef {
                    is_static: true,
                    ..MethodDef::new("log", vec![], Type::Void)
                },
            ],
            ..class("com.example.Util", &object)
        });

        store.add_class(ClassDef {
            interfaces: vec![Type::class(function, vec![integer.clone(), integer.clone()])],
            methods: vec![MethodDef::new("apply", vec![integer.clone()], integer)],
            ..class("com.example.Doubler", &object)
        });

        let person = store.add_class(ClassDef {
            fields: vec![
                FieldDef {
                    name: "LIMIT".to_string(),
                    ty: Type::int(),
                    is_static: true,
                    is_final: true,
                },
                FieldDef {
                    name: "age".to_string(),
                    ty: Type::int(),
                    is_static: false,
                    is_final: false,
                },
            ],
            methods: vec![
                MethodDef::new("getName", vec![], string),
                MethodDef::new("isActive", vec![], Type::boolean()),
            ],
            ..class("com.example.Person", &object)
        });

        let outer = store.add_class(class("com.example.Outer", &object));
        let inner = store.add_class(ClassDef {
            interfaces: vec![Type::Declared(runnable)],
            enclosing: Some(outer),
            ..class("com.example.Outer.Inner", &object)
        });

        Self {
            store,
            util,
            person,
            outer,
            inner,
        }
    }

    pub fn check(&self, body: &Body, ctx: BodyContext) -> TypeckResult {
        self.check_with(TypeckConfig::default(), body, ctx)
    }

    pub fn check_with(&self, config: TypeckConfig, body: &Body, ctx: BodyContext) -> TypeckResult {
        let mut session = Session::new(config);
        check_body(&self.store, &mut session, body, ctx).unwrap()
    }

    pub fn class(&self, name: &str) -> ClassId {
        self.store.lookup_class(name).unwrap()
    }

    pub fn declared(&self, name: &str) -> Type {
        Type::Declared(self.class(name))
    }

    pub fn generic(&self, name: &str, args: Vec<Type>) -> Type {
        Type::class(self.class(name), args)
    }

    pub fn string(&self) -> Type {
        Type::Declared(self.store.well_known().string)
    }

    pub fn integer(&self) -> Type {
        Type::Declared(self.store.well_known().integer)
    }

    /// Every method called `name` declared directly in `class`, in declaration order.
    pub fn overloads(&self, class: &str, name: &str) -> Vec<MethodRef> {
        let id = self.class(class);
        self.store
            .class(id)
            .unwrap()
            .methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.name == name)
            .map(|(index, _)| MethodRef::method(id, index))
            .collect()
    }

    /// The first method called `name` declared directly in `class`.
    pub fn method(&self, class: &str, name: &str) -> MethodRef {
        let id = self.class(class);
        let index = self
            .store
            .class(id)
            .unwrap()
            .methods
            .iter()
            .position(|m| m.name == name)
            .unwrap();
        MethodRef::method(id, index)
    }
}

fn class(name: &str, object: &Type) -> ClassDef {
    ClassDef {
        name: name.to_string(),
        kind: ClassKind::Class,
        type_params: vec![],
        super_class: Some(object.clone()),
        interfaces: vec![],
        fields: vec![],
        constructors: vec![],
        methods: vec![],
        enclosing: None,
        is_dynamic: false,
    }
}

pub fn codes(result: &TypeckResult) -> Vec<&'static str> {
    result.diagnostics().iter().map(|d| d.code).collect()
}
