use std::collections::HashMap;

use crate::{
    ClassDef, ClassId, ClassKind, CompiledClass, FieldDef, MethodDef, MethodRef, PrimitiveType,
    Type, TypeEnv, TypeParamDef, TypeVarId, TypeVarOwner, WildcardBound,
};

/// Declarations the engine needs to refer to without a name lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WellKnownTypes {
    pub object: ClassId,
    pub string: ClassId,
    pub number: ClassId,
    pub boolean: ClassId,
    pub byte: ClassId,
    pub short: ClassId,
    pub character: ClassId,
    pub integer: ClassId,
    pub long: ClassId,
    pub float: ClassId,
    pub double: ClassId,
    pub cloneable: ClassId,
    pub serializable: ClassId,
}

/// Arena of class and type-parameter declarations.
#[derive(Clone, Debug)]
pub struct TypeStore {
    classes: Vec<ClassDef>,
    type_params: Vec<TypeParamDef>,
    by_name: HashMap<String, ClassId>,
    compiled: HashMap<ClassId, CompiledClass>,
    well_known: WellKnownTypes,
}

impl TypeStore {
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn class_mut(&mut self, id: ClassId) -> Option<&mut ClassDef> {
        self.classes.get_mut(id.idx())
    }

    pub fn type_param_mut(&mut self, id: TypeVarId) -> Option<&mut TypeParamDef> {
        self.type_params.get_mut(id.idx())
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassDef)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(idx, def)| (ClassId::from_raw(idx as u32), def))
    }

    /// Allocate a fresh type parameter. Its owner is filled in by [`TypeStore::add_class`].
    pub fn add_type_param(&mut self, name: impl Into<String>, upper_bounds: Vec<Type>) -> TypeVarId {
        let id = TypeVarId::from_raw(self.type_params.len() as u32);
        self.type_params.push(TypeParamDef {
            name: name.into(),
            owner: None,
            upper_bounds,
        });
        id
    }

    /// Insert (or replace, keyed by name) a class declaration.
    pub fn add_class(&mut self, def: ClassDef) -> ClassId {
        let id = match self.by_name.get(&def.name) {
            Some(existing) => {
                self.classes[existing.idx()] = def;
                *existing
            }
            None => {
                let id = ClassId::from_raw(self.classes.len() as u32);
                self.by_name.insert(def.name.clone(), id);
                self.classes.push(def);
                id
            }
        };
        self.assign_owners(id);
        id
    }

    pub fn register_compiled(&mut self, id: ClassId, handle: CompiledClass) {
        self.compiled.insert(id, handle);
    }

    fn assign_owners(&mut self, id: ClassId) {
        let def = &self.classes[id.idx()];
        let mut owners: Vec<(TypeVarId, TypeVarOwner)> = def
            .type_params
            .iter()
            .map(|tp| (*tp, TypeVarOwner::Class(id)))
            .collect();
        for (idx, m) in def.methods.iter().enumerate() {
            for tp in &m.type_params {
                owners.push((*tp, TypeVarOwner::Method(MethodRef::method(id, idx))));
            }
        }
        for (idx, c) in def.constructors.iter().enumerate() {
            for tp in &c.type_params {
                owners.push((*tp, TypeVarOwner::Method(MethodRef::constructor(id, idx))));
            }
        }
        for (tp, owner) in owners {
            if let Some(param) = self.type_params.get_mut(tp.idx()) {
                param.owner = Some(owner);
            }
        }
    }

    fn reserve(&mut self, name: &str, kind: ClassKind) -> ClassId {
        self.add_class(ClassDef {
            name: name.to_string(),
            kind,
            type_params: vec![],
            super_class: None,
            interfaces: vec![],
            fields: vec![],
            constructors: vec![],
            methods: vec![],
            enclosing: None,
            is_dynamic: false,
        })
    }

    fn fill(&mut self, id: ClassId, f: impl FnOnce(&mut ClassDef)) {
        f(&mut self.classes[id.idx()]);
        self.assign_owners(id);
    }

    /// A store pre-populated with the handful of JDK types the engine and its tests rely on.
    pub fn with_minimal_jdk() -> Self {
        let placeholder = ClassId::from_raw(0);
        let mut store = TypeStore {
            classes: Vec::new(),
            type_params: Vec::new(),
            by_name: HashMap::new(),
            compiled: HashMap::new(),
            well_known: WellKnownTypes {
                object: placeholder,
                string: placeholder,
                number: placeholder,
                boolean: placeholder,
                byte: placeholder,
                short: placeholder,
                character: placeholder,
                integer: placeholder,
                long: placeholder,
                float: placeholder,
                double: placeholder,
                cloneable: placeholder,
                serializable: placeholder,
            },
        };

        use ClassKind::{Class, Interface};
        let object = store.reserve("java.lang.Object", Class);
        let string = store.reserve("java.lang.String", Class);
        let char_sequence = store.reserve("java.lang.CharSequence", Interface);
        let comparable = store.reserve("java.lang.Comparable", Interface);
        let number = store.reserve("java.lang.Number", Class);
        let boolean = store.reserve("java.lang.Boolean", Class);
        let byte = store.reserve("java.lang.Byte", Class);
        let short = store.reserve("java.lang.Short", Class);
        let character = store.reserve("java.lang.Character", Class);
        let integer = store.reserve("java.lang.Integer", Class);
        let long = store.reserve("java.lang.Long", Class);
        let float = store.reserve("java.lang.Float", Class);
        let double = store.reserve("java.lang.Double", Class);
        let cloneable = store.reserve("java.lang.Cloneable", Interface);
        let serializable = store.reserve("java.io.Serializable", Interface);
        let iterable = store.reserve("java.lang.Iterable", Interface);
        let runnable = store.reserve("java.lang.Runnable", Interface);
        let collection = store.reserve("java.util.Collection", Interface);
        let list = store.reserve("java.util.List", Interface);
        let array_list = store.reserve("java.util.ArrayList", Class);
        let map = store.reserve("java.util.Map", Interface);
        let hash_map = store.reserve("java.util.HashMap", Class);
        let collections = store.reserve("java.util.Collections", Class);
        let optional = store.reserve("java.util.Optional", Class);
        let comparator = store.reserve("java.util.Comparator", Interface);
        let callable = store.reserve("java.util.concurrent.Callable", Interface);
        let function = store.reserve("java.util.function.Function", Interface);
        let bi_function = store.reserve("java.util.function.BiFunction", Interface);
        let unary_operator = store.reserve("java.util.function.UnaryOperator", Interface);
        let supplier = store.reserve("java.util.function.Supplier", Interface);
        let consumer = store.reserve("java.util.function.Consumer", Interface);
        let predicate = store.reserve("java.util.function.Predicate", Interface);

        store.well_known = WellKnownTypes {
            object,
            string,
            number,
            boolean,
            byte,
            short,
            character,
            integer,
            long,
            float,
            double,
            cloneable,
            serializable,
        };

        let obj = Type::Declared(object);
        let str_ty = Type::Declared(string);
        let int = Type::Primitive(PrimitiveType::Int);
        let bool_ty = Type::Primitive(PrimitiveType::Boolean);
        let abstract_method = |name: &str, params: Vec<Type>, ret: Type| MethodDef {
            is_abstract: true,
            ..MethodDef::new(name, params, ret)
        };
        let static_method = |name: &str, params: Vec<Type>, ret: Type| MethodDef {
            is_static: true,
            ..MethodDef::new(name, params, ret)
        };

        store.fill(object, |def| {
            def.constructors = vec![MethodDef::new("<init>", vec![], Type::Void)];
            def.methods = vec![
                MethodDef::new("equals", vec![obj.clone()], bool_ty.clone()),
                MethodDef::new("hashCode", vec![], int.clone()),
                MethodDef::new("toString", vec![], str_ty.clone()),
            ];
        });

        store.fill(char_sequence, |def| {
            def.methods = vec![
                abstract_method("length", vec![], int.clone()),
                abstract_method("charAt", vec![int.clone()], Type::Primitive(PrimitiveType::Char)),
            ];
        });

        let comparable_t = store.add_type_param("T", vec![obj.clone()]);
        store.fill(comparable, |def| {
            def.type_params = vec![comparable_t];
            def.methods = vec![abstract_method(
                "compareTo",
                vec![Type::TypeVar(comparable_t)],
                int.clone(),
            )];
        });

        store.fill(string, |def| {
            def.super_class = Some(obj.clone());
            def.interfaces = vec![
                Type::Declared(char_sequence),
                Type::class(comparable, vec![str_ty.clone()]),
                Type::Declared(serializable),
            ];
            def.constructors = vec![MethodDef::new("<init>", vec![], Type::Void)];
            def.methods = vec![
                MethodDef::new("length", vec![], int.clone()),
                MethodDef::new("charAt", vec![int.clone()], Type::Primitive(PrimitiveType::Char)),
                MethodDef::new("isEmpty", vec![], bool_ty.clone()),
                MethodDef::new("concat", vec![str_ty.clone()], str_ty.clone()),
                MethodDef::new("substring", vec![int.clone()], str_ty.clone()),
                MethodDef::new("toUpperCase", vec![], str_ty.clone()),
                MethodDef::new("compareTo", vec![str_ty.clone()], int.clone()),
                static_method("valueOf", vec![obj.clone()], str_ty.clone()),
            ];
        });

        store.fill(number, |def| {
            def.super_class = Some(obj.clone());
            def.interfaces = vec![Type::Declared(serializable)];
            def.methods = vec![
                abstract_method("intValue", vec![], int.clone()),
                abstract_method("longValue", vec![], Type::Primitive(PrimitiveType::Long)),
                abstract_method("doubleValue", vec![], Type::Primitive(PrimitiveType::Double)),
            ];
        });

        let boxes = [
            (boolean, PrimitiveType::Boolean, None),
            (byte, PrimitiveType::Byte, Some(number)),
            (short, PrimitiveType::Short, Some(number)),
            (character, PrimitiveType::Char, None),
            (integer, PrimitiveType::Int, Some(number)),
            (long, PrimitiveType::Long, Some(number)),
            (float, PrimitiveType::Float, Some(number)),
            (double, PrimitiveType::Double, Some(number)),
        ];
        for (id, prim, super_class) in boxes {
            let self_ty = Type::Declared(id);
            let prim_ty = Type::Primitive(prim);
            store.fill(id, |def| {
                def.super_class = Some(Type::Declared(super_class.unwrap_or(object)));
                def.interfaces = vec![Type::class(comparable, vec![self_ty.clone()])];
                def.fields = vec![
                    FieldDef {
                        name: "MAX_VALUE".to_string(),
                        ty: prim_ty.clone(),
                        is_static: true,
                        is_final: true,
                    },
                    FieldDef {
                        name: "MIN_VALUE".to_string(),
                        ty: prim_ty.clone(),
                        is_static: true,
                        is_final: true,
                    },
                ];
                def.methods = vec![
                    static_method("valueOf", vec![prim_ty.clone()], self_ty.clone()),
                    MethodDef::new("compareTo", vec![self_ty.clone()], int.clone()),
                ];
                if prim == PrimitiveType::Int {
                    def.methods.push(static_method("parseInt", vec![str_ty.clone()], int.clone()));
                }
                if super_class.is_some() {
                    def.methods.push(MethodDef::new("intValue", vec![], int.clone()));
                }
            });
        }

        store.fill(runnable, |def| {
            def.methods = vec![abstract_method("run", vec![], Type::Void)];
        });

        // java.util.function
        let function_t = store.add_type_param("T", vec![obj.clone()]);
        let function_r = store.add_type_param("R", vec![obj.clone()]);
        let function_v = store.add_type_param("V", vec![obj.clone()]);
        let identity_t = store.add_type_param("T", vec![obj.clone()]);
        store.fill(function, |def| {
            def.type_params = vec![function_t, function_r];
            def.methods = vec![
                abstract_method(
                    "apply",
                    vec![Type::TypeVar(function_t)],
                    Type::TypeVar(function_r),
                ),
                MethodDef {
                    type_params: vec![function_v],
                    is_default: true,
                    ..MethodDef::new(
                        "andThen",
                        vec![Type::class(
                            function,
                            vec![
                                Type::Wildcard(WildcardBound::Super(Box::new(Type::TypeVar(
                                    function_r,
                                )))),
                                Type::Wildcard(WildcardBound::Extends(Box::new(Type::TypeVar(
                                    function_v,
                                )))),
                            ],
                        )],
                        Type::class(
                            function,
                            vec![Type::TypeVar(function_t), Type::TypeVar(function_v)],
                        ),
                    )
                },
                MethodDef {
                    type_params: vec![identity_t],
                    is_static: true,
                    ..MethodDef::new(
                        "identity",
                        vec![],
                        Type::class(
                            function,
                            vec![Type::TypeVar(identity_t), Type::TypeVar(identity_t)],
                        ),
                    )
                },
            ];
        });

        let bi_t = store.add_type_param("T", vec![obj.clone()]);
        let bi_u = store.add_type_param("U", vec![obj.clone()]);
        let bi_r = store.add_type_param("R", vec![obj.clone()]);
        store.fill(bi_function, |def| {
            def.type_params = vec![bi_t, bi_u, bi_r];
            def.methods = vec![abstract_method(
                "apply",
                vec![Type::TypeVar(bi_t), Type::TypeVar(bi_u)],
                Type::TypeVar(bi_r),
            )];
        });

        let unary_t = store.add_type_param("T", vec![obj.clone()]);
        store.fill(unary_operator, |def| {
            def.type_params = vec![unary_t];
            def.interfaces = vec![Type::class(
                function,
                vec![Type::TypeVar(unary_t), Type::TypeVar(unary_t)],
            )];
        });

        let supplier_t = store.add_type_param("T", vec![obj.clone()]);
        store.fill(supplier, |def| {
            def.type_params = vec![supplier_t];
            def.methods = vec![abstract_method("get", vec![], Type::TypeVar(supplier_t))];
        });

        let consumer_t = store.add_type_param("T", vec![obj.clone()]);
        store.fill(consumer, |def| {
            def.type_params = vec![consumer_t];
            def.methods = vec![abstract_method(
                "accept",
                vec![Type::TypeVar(consumer_t)],
                Type::Void,
            )];
        });

        let predicate_t = store.add_type_param("T", vec![obj.clone()]);
        store.fill(predicate, |def| {
            def.type_params = vec![predicate_t];
            def.methods = vec![
                abstract_method("test", vec![Type::TypeVar(predicate_t)], bool_ty.clone()),
                MethodDef {
                    is_default: true,
                    ..MethodDef::new(
                        "negate",
                        vec![],
                        Type::class(predicate, vec![Type::TypeVar(predicate_t)]),
                    )
                },
            ];
        });

        let callable_v = store.add_type_param("V", vec![obj.clone()]);
        store.fill(callable, |def| {
            def.type_params = vec![callable_v];
            def.methods = vec![abstract_method("call", vec![], Type::TypeVar(callable_v))];
        });

        let comparator_t = store.add_type_param("T", vec![obj.clone()]);
        store.fill(comparator, |def| {
            def.type_params = vec![comparator_t];
            def.methods = vec![
                abstract_method(
                    "compare",
                    vec![Type::TypeVar(comparator_t), Type::TypeVar(comparator_t)],
                    int.clone(),
                ),
                // Redeclared `Object` method; not part of the functional contract.
                abstract_method("equals", vec![obj.clone()], bool_ty.clone()),
                MethodDef {
                    is_default: true,
                    ..MethodDef::new(
                        "reversed",
                        vec![],
                        Type::class(comparator, vec![Type::TypeVar(comparator_t)]),
                    )
                },
            ];
        });

        // java.util collections
        let iterable_t = store.add_type_param("T", vec![obj.clone()]);
        store.fill(iterable, |def| {
            def.type_params = vec![iterable_t];
            def.methods = vec![MethodDef {
                is_default: true,
                ..MethodDef::new(
                    "forEach",
                    vec![Type::class(
                        consumer,
                        vec![Type::Wildcard(WildcardBound::Super(Box::new(Type::TypeVar(
                            iterable_t,
                        ))))],
                    )],
                    Type::Void,
                )
            }];
        });

        let collection_e = store.add_type_param("E", vec![obj.clone()]);
        store.fill(collection, |def| {
            def.type_params = vec![collection_e];
            def.interfaces = vec![Type::class(iterable, vec![Type::TypeVar(collection_e)])];
            def.methods = vec![
                abstract_method("size", vec![], int.clone()),
                abstract_method("isEmpty", vec![], bool_ty.clone()),
                abstract_method("add", vec![Type::TypeVar(collection_e)], bool_ty.clone()),
            ];
        });

        let list_e = store.add_type_param("E", vec![obj.clone()]);
        let list_of_t = store.add_type_param("T", vec![obj.clone()]);
        store.fill(list, |def| {
            def.type_params = vec![list_e];
            def.interfaces = vec![Type::class(collection, vec![Type::TypeVar(list_e)])];
            def.methods = vec![
                abstract_method("get", vec![int.clone()], Type::TypeVar(list_e)),
                abstract_method(
                    "set",
                    vec![int.clone(), Type::TypeVar(list_e)],
                    Type::TypeVar(list_e),
                ),
                MethodDef {
                    type_params: vec![list_of_t],
                    is_static: true,
                    is_varargs: true,
                    ..MethodDef::new(
                        "of",
                        vec![Type::array(Type::TypeVar(list_of_t))],
                        Type::class(list, vec![Type::TypeVar(list_of_t)]),
                    )
                },
            ];
        });

        let array_list_e = store.add_type_param("E", vec![obj.clone()]);
        store.fill(array_list, |def| {
            def.type_params = vec![array_list_e];
            def.super_class = Some(obj.clone());
            def.interfaces = vec![
                Type::class(list, vec![Type::TypeVar(array_list_e)]),
                Type::Declared(cloneable),
                Type::Declared(serializable),
            ];
            def.constructors = vec![
                MethodDef::new("<init>", vec![], Type::Void),
                MethodDef::new(
                    "<init>",
                    vec![Type::class(
                        collection,
                        vec![Type::Wildcard(WildcardBound::Extends(Box::new(Type::TypeVar(
                            array_list_e,
                        ))))],
                    )],
                    Type::Void,
                ),
            ];
            def.methods = vec![
                MethodDef::new("get", vec![int.clone()], Type::TypeVar(array_list_e)),
                MethodDef::new("add", vec![Type::TypeVar(array_list_e)], bool_ty.clone()),
                MethodDef::new("size", vec![], int.clone()),
                MethodDef::new("isEmpty", vec![], bool_ty.clone()),
                MethodDef::new(
                    "set",
                    vec![int.clone(), Type::TypeVar(array_list_e)],
                    Type::TypeVar(array_list_e),
                ),
            ];
        });

        let map_k = store.add_type_param("K", vec![obj.clone()]);
        let map_v = store.add_type_param("V", vec![obj.clone()]);
        store.fill(map, |def| {
            def.type_params = vec![map_k, map_v];
            def.methods = vec![
                abstract_method("get", vec![obj.clone()], Type::TypeVar(map_v)),
                abstract_method(
                    "put",
                    vec![Type::TypeVar(map_k), Type::TypeVar(map_v)],
                    Type::TypeVar(map_v),
                ),
                abstract_method("size", vec![], int.clone()),
            ];
        });

        let hash_map_k = store.add_type_param("K", vec![obj.clone()]);
        let hash_map_v = store.add_type_param("V", vec![obj.clone()]);
        store.fill(hash_map, |def| {
            def.type_params = vec![hash_map_k, hash_map_v];
            def.super_class = Some(obj.clone());
            def.interfaces = vec![Type::class(
                map,
                vec![Type::TypeVar(hash_map_k), Type::TypeVar(hash_map_v)],
            )];
            def.constructors = vec![MethodDef::new("<init>", vec![], Type::Void)];
            def.methods = vec![
                MethodDef::new("get", vec![obj.clone()], Type::TypeVar(hash_map_v)),
                MethodDef::new(
                    "put",
                    vec![Type::TypeVar(hash_map_k), Type::TypeVar(hash_map_v)],
                    Type::TypeVar(hash_map_v),
                ),
                MethodDef::new("size", vec![], int.clone()),
            ];
        });

        let empty_list_t = store.add_type_param("T", vec![obj.clone()]);
        let singleton_t = store.add_type_param("T", vec![obj.clone()]);
        let n_copies_t = store.add_type_param("T", vec![obj.clone()]);
        store.fill(collections, |def| {
            def.super_class = Some(obj.clone());
            def.methods = vec![
                MethodDef {
                    type_params: vec![empty_list_t],
                    is_static: true,
                    ..MethodDef::new(
                        "emptyList",
                        vec![],
                        Type::class(list, vec![Type::TypeVar(empty_list_t)]),
                    )
                },
                MethodDef {
                    type_params: vec![singleton_t],
                    is_static: true,
                    ..MethodDef::new(
                        "singletonList",
                        vec![Type::TypeVar(singleton_t)],
                        Type::class(list, vec![Type::TypeVar(singleton_t)]),
                    )
                },
                MethodDef {
                    type_params: vec![n_copies_t],
                    is_static: true,
                    ..MethodDef::new(
                        "nCopies",
                        vec![int.clone(), Type::TypeVar(n_copies_t)],
                        Type::class(list, vec![Type::TypeVar(n_copies_t)]),
                    )
                },
            ];
        });

        let optional_t = store.add_type_param("T", vec![obj.clone()]);
        let optional_of_t = store.add_type_param("T", vec![obj.clone()]);
        let optional_map_u = store.add_type_param("U", vec![obj.clone()]);
        store.fill(optional, |def| {
            def.type_params = vec![optional_t];
            def.super_class = Some(obj.clone());
            def.methods = vec![
                MethodDef {
                    type_params: vec![optional_of_t],
                    is_static: true,
                    ..MethodDef::new(
                        "of",
                        vec![Type::TypeVar(optional_of_t)],
                        Type::class(optional, vec![Type::TypeVar(optional_of_t)]),
                    )
                },
                MethodDef {
                    type_params: vec![optional_map_u],
                    ..MethodDef::new(
                        "map",
                        vec![Type::class(
                            function,
                            vec![
                                Type::Wildcard(WildcardBound::Super(Box::new(Type::TypeVar(
                                    optional_t,
                                )))),
                                Type::Wildcard(WildcardBound::Extends(Box::new(Type::TypeVar(
                                    optional_map_u,
                                )))),
                            ],
                        )],
                        Type::class(optional, vec![Type::TypeVar(optional_map_u)]),
                    )
                },
                MethodDef::new("get", vec![], Type::TypeVar(optional_t)),
                MethodDef::new("orElse", vec![Type::TypeVar(optional_t)], Type::TypeVar(optional_t)),
                MethodDef::new("isPresent", vec![], bool_ty.clone()),
            ];
        });

        store
    }
}

impl TypeEnv for TypeStore {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.idx())
    }

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef> {
        self.type_params.get(id.idx())
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_id(name)
    }

    fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }

    fn compiled_class(&self, ty: &Type) -> Option<CompiledClass> {
        ty.class_id().and_then(|id| self.compiled.get(&id).copied())
    }

    fn is_package(&self, name: &str) -> bool {
        // A class shadows a package of the same name.
        if self.by_name.contains_key(name) {
            return false;
        }
        let prefix = format!("{name}.");
        self.by_name.keys().any(|class| class.starts_with(&prefix))
    }
}
