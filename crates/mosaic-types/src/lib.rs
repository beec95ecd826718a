//! Type model shared by the Mosaic semantic core.
//!
//! Declarations (classes, interfaces, type parameters) live in an arena ([`TypeStore`]) and are
//! referenced by stable ids. [`Type`] values are small immutable descriptions that point into the
//! arena, so cyclic relations (enclosing types, supertypes) never form ownership cycles.
//!
//! Higher layers never inspect the store directly; they go through the [`TypeEnv`] query surface.

use std::fmt;

pub mod java;
mod store;

pub use java::format::{format_method_signature, format_type};
pub use java::helpers::{
    erasure, instantiate_as_supertype, lub, resolve_type_parameter, substitute, type_args_as,
    validate_type, TypeArgCountMismatch,
};
pub use java::sam::{functional_method, FunctionalMethod, SamError, SamTieBreak};
pub use java::subtyping::{
    binary_numeric_promotion, boxed, is_assignable_from, is_more_specific, is_subtype, unboxed,
};
pub use store::{TypeStore, WellKnownTypes};

/// A byte-span into a source string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        ClassId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(u32);

impl TypeVarId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        TypeVarId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MethodKind {
    Method,
    Constructor,
}

/// Stable handle to a method or constructor declaration inside a [`ClassDef`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    pub owner: ClassId,
    pub kind: MethodKind,
    pub index: u32,
}

impl MethodRef {
    pub fn method(owner: ClassId, index: usize) -> Self {
        Self {
            owner,
            kind: MethodKind::Method,
            index: index as u32,
        }
    }

    pub fn constructor(owner: ClassId, index: usize) -> Self {
        Self {
            owner,
            kind: MethodKind::Constructor,
            index: index as u32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    pub owner: ClassId,
    pub index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveType::Boolean)
    }

    /// Integral types, `char` included.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveType::Byte
                | PrimitiveType::Short
                | PrimitiveType::Char
                | PrimitiveType::Int
                | PrimitiveType::Long
        )
    }

    pub fn from_keyword(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => PrimitiveType::Boolean,
            "byte" => PrimitiveType::Byte,
            "short" => PrimitiveType::Short,
            "char" => PrimitiveType::Char,
            "int" => PrimitiveType::Int,
            "long" => PrimitiveType::Long,
            "float" => PrimitiveType::Float,
            "double" => PrimitiveType::Double,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<Type>),
    Super(Box<Type>),
}

/// A class or interface instantiated with type arguments (`List<String>`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamType {
    pub base: ClassId,
    pub args: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Primitive(PrimitiveType),
    Null,
    /// A declaration used without type arguments: non-generic, or raw.
    Declared(ClassId),
    Parameterized(ParamType),
    Array(Box<Type>),
    TypeVar(TypeVarId),
    Wildcard(WildcardBound),
    /// Unresolved; inference proceeds optimistically.
    Unknown,
    /// Already reported; suppresses follow-up errors.
    Error,
}

impl Type {
    /// `Declared` when `args` is empty, `Parameterized` otherwise.
    pub fn class(def: ClassId, args: Vec<Type>) -> Type {
        if args.is_empty() {
            Type::Declared(def)
        } else {
            Type::Parameterized(ParamType { base: def, args })
        }
    }

    pub fn array(component: Type) -> Type {
        Type::Array(Box::new(component))
    }

    /// `component` wrapped in `dims` array levels.
    pub fn array_of(component: Type, dims: usize) -> Type {
        (0..dims).fold(component, |acc, _| Type::array(acc))
    }

    pub fn boolean() -> Type {
        Type::Primitive(PrimitiveType::Boolean)
    }

    pub fn int() -> Type {
        Type::Primitive(PrimitiveType::Int)
    }

    pub fn is_errorish(&self) -> bool {
        matches!(self, Type::Unknown | Type::Error)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Declared(_)
                | Type::Parameterized(_)
                | Type::Array(_)
                | Type::TypeVar(_)
                | Type::Null
                | Type::Wildcard(_)
        )
    }

    /// The declaration behind a class-like type.
    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            Type::Declared(id) => Some(*id),
            Type::Parameterized(p) => Some(p.base),
            _ => None,
        }
    }

    pub fn type_args(&self) -> &[Type] {
        match self {
            Type::Parameterized(p) => &p.args,
            _ => &[],
        }
    }

    pub fn component(&self) -> Option<&Type> {
        match self {
            Type::Array(c) => Some(c),
            _ => None,
        }
    }

    /// Number of array levels (`int[][]` has two).
    pub fn dims(&self) -> usize {
        match self {
            Type::Array(c) => 1 + c.dims(),
            _ => 0,
        }
    }

    /// Whether `var` occurs anywhere in this type.
    pub fn mentions(&self, var: TypeVarId) -> bool {
        match self {
            Type::TypeVar(id) => *id == var,
            Type::Parameterized(p) => p.args.iter().any(|a| a.mentions(var)),
            Type::Array(c) => c.mentions(var),
            Type::Wildcard(WildcardBound::Extends(b)) | Type::Wildcard(WildcardBound::Super(b)) => {
                b.mentions(var)
            }
            _ => false,
        }
    }

    /// All type variables occurring in this type, in first-occurrence order.
    pub fn type_vars(&self) -> Vec<TypeVarId> {
        fn go(ty: &Type, out: &mut Vec<TypeVarId>) {
            match ty {
                Type::TypeVar(id) => {
                    if !out.contains(id) {
                        out.push(*id);
                    }
                }
                Type::Parameterized(p) => p.args.iter().for_each(|a| go(a, out)),
                Type::Array(c) => go(c, out),
                Type::Wildcard(WildcardBound::Extends(b))
                | Type::Wildcard(WildcardBound::Super(b)) => go(b, out),
                _ => {}
            }
        }
        let mut out = Vec::new();
        go(self, &mut out);
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeVarOwner {
    Class(ClassId),
    Method(MethodRef),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParamDef {
    pub name: String,
    pub owner: Option<TypeVarOwner>,
    pub upper_bounds: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
    pub is_final: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_static: bool,
    pub is_varargs: bool,
    pub is_abstract: bool,
    pub is_default: bool,
}

impl MethodDef {
    /// A public instance method with no flags set.
    pub fn new(name: impl Into<String>, params: Vec<Type>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            params,
            return_type,
            is_static: false,
            is_varargs: false,
            is_abstract: false,
            is_default: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDef {
    /// Binary name, e.g. `java.util.Map$Entry` is spelled `java.util.Map.Entry` here.
    pub name: String,
    pub kind: ClassKind,
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<Type>,
    pub interfaces: Vec<Type>,
    pub fields: Vec<FieldDef>,
    pub constructors: Vec<MethodDef>,
    pub methods: Vec<MethodDef>,
    pub enclosing: Option<ClassId>,
    /// Members are looked up at runtime; static checks are relaxed.
    pub is_dynamic: bool,
}

impl ClassDef {
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }
}

/// Opaque handle to a precompiled class supplied by the type lookup collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompiledClass(pub u64);

/// Read-only query surface over type declarations.
///
/// The semantic core only ever talks to declarations through this trait; the store that backs it
/// (and any caching it performs) belongs to the caller.
pub trait TypeEnv {
    fn class(&self, id: ClassId) -> Option<&ClassDef>;
    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef>;
    fn lookup_class(&self, name: &str) -> Option<ClassId>;
    fn well_known(&self) -> &WellKnownTypes;

    fn method(&self, method: MethodRef) -> Option<&MethodDef> {
        let class = self.class(method.owner)?;
        match method.kind {
            MethodKind::Method => class.methods.get(method.index as usize),
            MethodKind::Constructor => class.constructors.get(method.index as usize),
        }
    }

    fn field(&self, field: FieldRef) -> Option<&FieldDef> {
        self.class(field.owner)?.fields.get(field.index as usize)
    }

    /// Find a type declaration by fully-qualified name.
    fn find_type_declaration(&self, name: &str) -> Option<Type> {
        self.lookup_class(name).map(Type::Declared)
    }

    fn compiled_class(&self, _ty: &Type) -> Option<CompiledClass> {
        None
    }

    /// Whether `name` is a package containing at least one known type.
    fn is_package(&self, _name: &str) -> bool {
        false
    }

    fn is_dynamic_type(&self, ty: &Type) -> bool {
        ty.class_id()
            .and_then(|id| self.class(id))
            .is_some_and(|def| def.is_dynamic)
    }
}
