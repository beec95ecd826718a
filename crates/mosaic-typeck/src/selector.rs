//! Selector chains: `base.field`, `base.call(..)`, `base[i]`, `Outer.this`, `Iface.super`.
//!
//! The base may be a value, a type name (static access) or a package prefix. Each selector is
//! bound against the running position left by the previous one; only the last selector sees the
//! chain's own target type.

use mosaic_hir::{Expr, ExprId, Selector};
use mosaic_types::{
    erasure, format_type, is_assignable_from, ClassId, Diagnostic, FieldRef, MethodRef, Span, Type,
};

use crate::method::{CallKey, CallSite, ParamTypedMethod};
use crate::resolve::{find_field, member_receiver, methods_named, ValueRef};
use crate::{this_type, Typeck};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoundKind {
    Value,
    Field,
    /// `obj.name` read through `getName()` / `isName()`.
    Getter,
    Method,
    ArrayElement,
    ArrayLength,
    This,
    Super,
    Type,
    Package,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorBinding {
    pub kind: BoundKind,
    pub ty: Type,
    pub method: Option<MethodRef>,
    pub field: Option<FieldRef>,
}

impl SelectorBinding {
    fn new(kind: BoundKind, ty: Type) -> Self {
        Self {
            kind,
            ty,
            method: None,
            field: None,
        }
    }

    fn unknown() -> Self {
        Self::new(BoundKind::Unknown, Type::Unknown)
    }
}

/// Bindings for the base and for each selector, in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainBinding {
    pub base: SelectorBinding,
    pub selectors: Vec<SelectorBinding>,
}

impl ChainBinding {
    /// Methods bound along the chain, in order.
    pub fn methods(&self) -> Vec<MethodRef> {
        self.selectors.iter().filter_map(|s| s.method).collect()
    }
}

/// Where the chain stands after a selector.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Position {
    Value(Type),
    TypeName(Type),
    Package(String),
    Unknown,
}

impl Position {
    fn ty(&self) -> Type {
        match self {
            Position::Value(ty) | Position::TypeName(ty) => ty.clone(),
            Position::Package(_) | Position::Unknown => Type::Unknown,
        }
    }
}

impl<'a> Typeck<'a> {
    /// Bind every selector of the chain at `expr`. Returns the chain's type and whether it
    /// depends on the chain's target.
    pub(crate) fn resolve_chain(&mut self, expr: ExprId) -> (Type, bool) {
        let body = self.body;
        let Expr::Selector {
            base, selectors, ..
        } = body.expr(expr)
        else {
            return (Type::Error, false);
        };
        tracing::trace!(target: "mosaic.typeck", ?expr, selectors = selectors.len(), "walking selector chain");

        let (mut position, base_binding) = self.classify_base(*base);
        let mut bindings = Vec::with_capacity(selectors.len());
        let mut poly = false;
        for (index, selector) in selectors.iter().enumerate() {
            let is_last = index + 1 == selectors.len();
            let slot = (index as u32) * 16;
            let (next, binding, selector_poly) =
                self.bind_selector(expr, index, slot, selector, &position, is_last);
            if is_last {
                poly = selector_poly;
            }
            position = next;
            bindings.push(binding);
        }

        let ty = position.ty();
        if let Some(last) = bindings.last() {
            if let Some(method) = last.method {
                self.bound_methods.insert(expr, method);
            }
            if let Some(field) = last.field {
                self.bound_fields.insert(expr, field);
            }
        }
        self.chains.insert(
            expr,
            ChainBinding {
                base: base_binding,
                selectors: bindings,
            },
        );
        (ty, poly)
    }

    /// A simple name is tried as a value, then a type, then a package.
    fn classify_base(&mut self, base: ExprId) -> (Position, SelectorBinding) {
        let env = self.env;
        let body = self.body;
        match body.expr(base) {
            Expr::Name { name, .. } => {
                if let Some(value) = self.lookup_value(name) {
                    let ty = self.start_expr_in_ctx(base);
                    let kind = match value {
                        ValueRef::Field { .. } => BoundKind::Field,
                        ValueRef::Local(_) | ValueRef::Param(_) => BoundKind::Value,
                    };
                    let mut binding = SelectorBinding::new(kind, ty.clone());
                    binding.field = self.bound_fields.get(&base).copied();
                    return (Position::Value(ty), binding);
                }
                if let Some(ty) = self.resolve_type_name(name) {
                    self.state.record_type(base, ty.clone(), self.final_ctx, false);
                    return (
                        Position::TypeName(ty.clone()),
                        SelectorBinding::new(BoundKind::Type, ty),
                    );
                }
                if env.is_package(name) {
                    self.state.record_type(base, Type::Unknown, self.final_ctx, false);
                    return (
                        Position::Package(name.clone()),
                        SelectorBinding::new(BoundKind::Package, Type::Unknown),
                    );
                }
                // Reports the unresolved name.
                self.start_expr_in_ctx(base);
                (Position::Unknown, SelectorBinding::unknown())
            }
            Expr::This { .. } => {
                let ty = self.start_expr_in_ctx(base);
                (Position::Value(ty.clone()), SelectorBinding::new(BoundKind::This, ty))
            }
            Expr::Super { .. } => {
                let ty = self.start_expr_in_ctx(base);
                (Position::Value(ty.clone()), SelectorBinding::new(BoundKind::Super, ty))
            }
            _ => {
                let ty = self.start_expr_in_ctx(base);
                (Position::Value(ty.clone()), SelectorBinding::new(BoundKind::Value, ty))
            }
        }
    }

    fn bind_selector(
        &mut self,
        expr: ExprId,
        index: usize,
        slot: u32,
        selector: &Selector,
        position: &Position,
        is_last: bool,
    ) -> (Position, SelectorBinding, bool) {
        match selector {
            Selector::Field { name, range } => {
                let (pos, binding) = self.bind_field(expr, slot, name, *range, position);
                (pos, binding, false)
            }
            Selector::Call {
                name,
                type_args,
                args,
                range,
            } => {
                let target = if is_last {
                    self.state.inferred(expr).cloned()
                } else {
                    None
                };
                let (receiver, static_only) = match position {
                    Position::TypeName(ty) => (ty.clone(), true),
                    Position::Value(ty) if self.env.is_dynamic_type(ty) => {
                        self.start_args_untargeted(args);
                        return (Position::Unknown, SelectorBinding::unknown(), false);
                    }
                    Position::Value(ty) => (member_receiver(self.env, ty), false),
                    Position::Package(pkg) => {
                        let message = format!("cannot find symbol `{pkg}.{name}`");
                        self.report_unresolved(expr, slot, "unresolved-name", message, *range);
                        self.start_args_untargeted(args);
                        return (Position::Unknown, SelectorBinding::unknown(), false);
                    }
                    Position::Unknown => {
                        self.start_args_untargeted(args);
                        return (Position::Unknown, SelectorBinding::unknown(), false);
                    }
                };
                let result = self.resolve_call(CallSite {
                    key: CallKey::Selector(expr, index),
                    expr,
                    slot,
                    span: *range,
                    name,
                    receiver,
                    static_only,
                    type_args,
                    args,
                    target,
                    diamond: false,
                });
                let mut binding = SelectorBinding::new(BoundKind::Method, result.ty.clone());
                binding.method = result.method;
                let next = if result.ty.is_errorish() {
                    Position::Unknown
                } else {
                    Position::Value(result.ty)
                };
                (next, binding, result.poly)
            }
            Selector::Index { index: index_expr, range } => {
                let env = self.env;
                self.push_target(*index_expr, Type::int(), self.final_ctx);
                let index_ty = self.start_expr_in_ctx(*index_expr);
                if !index_ty.is_errorish() && !is_assignable_from(env, &Type::int(), &index_ty) {
                    let message = format!(
                        "incompatible types: `{}` cannot be converted to `int`",
                        format_type(env, &index_ty)
                    );
                    let span = self.span_of(*index_expr);
                    self.report(*index_expr, 10, Diagnostic::error("incompatible-types", message, Some(span)));
                }
                match position {
                    Position::Value(Type::Array(component)) => {
                        let ty = (**component).clone();
                        (
                            Position::Value(ty.clone()),
                            SelectorBinding::new(BoundKind::ArrayElement, ty),
                            false,
                        )
                    }
                    Position::Value(ty) if !ty.is_errorish() => {
                        let message = format!("array required, but `{}` found", format_type(env, ty));
                        self.report(expr, slot, Diagnostic::error("not-an-array", message, Some(*range)));
                        (Position::Unknown, SelectorBinding::new(BoundKind::Unknown, Type::Error), false)
                    }
                    _ => (Position::Unknown, SelectorBinding::unknown(), false),
                }
            }
            Selector::This { range } => {
                let (pos, binding) = self.bind_qualified_this(expr, slot, *range, position);
                (pos, binding, false)
            }
            Selector::Super { range } => {
                let (pos, binding) = self.bind_qualified_super(expr, slot, *range, position);
                (pos, binding, false)
            }
        }
    }

    fn bind_field(
        &mut self,
        expr: ExprId,
        slot: u32,
        name: &str,
        range: Span,
        position: &Position,
    ) -> (Position, SelectorBinding) {
        let env = self.env;
        match position {
            Position::Package(pkg) => {
                let qualified = format!("{pkg}.{name}");
                if let Some(id) = env.lookup_class(&qualified) {
                    let ty = Type::Declared(id);
                    return (
                        Position::TypeName(ty.clone()),
                        SelectorBinding::new(BoundKind::Type, ty),
                    );
                }
                if env.is_package(&qualified) {
                    return (
                        Position::Package(qualified),
                        SelectorBinding::new(BoundKind::Package, Type::Unknown),
                    );
                }
                let message = format!("cannot find symbol `{qualified}`");
                self.report_unresolved(expr, slot, "unresolved-name", message, range);
                (Position::Unknown, SelectorBinding::unknown())
            }
            Position::TypeName(ty) => {
                if let Some((field, field_ty, is_static)) = find_field(env, ty, name) {
                    if !is_static {
                        let message = format!(
                            "non-static field `{name}` cannot be referenced from a static context"
                        );
                        self.report(expr, slot + 1, Diagnostic::error("static-context", message, Some(range)));
                    }
                    let mut binding = SelectorBinding::new(BoundKind::Field, field_ty.clone());
                    binding.field = Some(field);
                    return (Position::Value(field_ty), binding);
                }
                let nested = ty
                    .class_id()
                    .and_then(|id| env.class(id))
                    .and_then(|def| env.lookup_class(&format!("{}.{name}", def.name)));
                if let Some(id) = nested {
                    let ty = Type::Declared(id);
                    return (
                        Position::TypeName(ty.clone()),
                        SelectorBinding::new(BoundKind::Type, ty),
                    );
                }
                self.unresolved_field(expr, slot, name, ty, range)
            }
            Position::Value(ty) => {
                if ty.is_errorish() || env.is_dynamic_type(ty) {
                    return (Position::Unknown, SelectorBinding::unknown());
                }
                if let Type::Array(_) = ty {
                    if name == "length" {
                        return (
                            Position::Value(Type::int()),
                            SelectorBinding::new(BoundKind::ArrayLength, Type::int()),
                        );
                    }
                    return self.unresolved_field(expr, slot, name, ty, range);
                }
                let receiver = member_receiver(env, ty);
                if let Some((field, field_ty, _)) = find_field(env, &receiver, name) {
                    let mut binding = SelectorBinding::new(BoundKind::Field, field_ty.clone());
                    binding.field = Some(field);
                    return (Position::Value(field_ty), binding);
                }
                if self.session.config.getter_properties {
                    if let Some((method, getter_ty)) = self.find_getter(&receiver, name) {
                        let mut binding = SelectorBinding::new(BoundKind::Getter, getter_ty.clone());
                        binding.method = Some(method);
                        return (Position::Value(getter_ty), binding);
                    }
                }
                self.unresolved_field(expr, slot, name, ty, range)
            }
            Position::Unknown => (Position::Unknown, SelectorBinding::unknown()),
        }
    }

    fn unresolved_field(
        &mut self,
        expr: ExprId,
        slot: u32,
        name: &str,
        owner: &Type,
        range: Span,
    ) -> (Position, SelectorBinding) {
        let message = format!(
            "cannot find field `{name}` in `{}`",
            format_type(self.env, owner)
        );
        self.report_unresolved(expr, slot, "unresolved-field", message, range);
        (Position::Unknown, SelectorBinding::unknown())
    }

    /// `getName()`, or `isName()` returning `boolean`, with no parameters.
    fn find_getter(&self, receiver: &Type, name: &str) -> Option<(MethodRef, Type)> {
        let env = self.env;
        let class = receiver.class_id()?;
        let mut chars = name.chars();
        let first = chars.next()?;
        let capitalized: String = first.to_uppercase().chain(chars).collect();
        let accessor = |prefix: &str, wants_boolean: bool| {
            methods_named(env, class, &format!("{prefix}{capitalized}"))
                .into_iter()
                .find_map(|method| {
                    let def = env.method(method)?;
                    if !def.params.is_empty() || def.is_static {
                        return None;
                    }
                    let ty = ParamTypedMethod::new(env, method, receiver, 0)?.return_type();
                    let is_boolean = ty == Type::boolean();
                    (ty != Type::Void && (!wants_boolean || is_boolean)).then_some((method, ty))
                })
        };
        accessor("get", false).or_else(|| accessor("is", true))
    }

    /// The context class or one of its enclosing classes.
    fn is_enclosing_class(&self, class: ClassId) -> bool {
        let mut current = Some(self.ctx.class);
        while let Some(id) = current {
            if id == class {
                return true;
            }
            current = self.env.class(id).and_then(|def| def.enclosing);
        }
        false
    }

    fn bind_qualified_this(
        &mut self,
        expr: ExprId,
        slot: u32,
        range: Span,
        position: &Position,
    ) -> (Position, SelectorBinding) {
        let env = self.env;
        let class = match position {
            Position::TypeName(ty) => ty.class_id().filter(|id| self.is_enclosing_class(*id)),
            Position::Unknown => return (Position::Unknown, SelectorBinding::unknown()),
            Position::Value(_) | Position::Package(_) => None,
        };
        let Some(class) = class else {
            let message = format!(
                "`{}.this` does not name an enclosing class",
                format_type(env, &position.ty())
            );
            self.report(expr, slot, Diagnostic::error("invalid-qualified-this", message, Some(range)));
            return (Position::Unknown, SelectorBinding::new(BoundKind::This, Type::Error));
        };
        if self.ctx.is_static {
            self.report(
                expr,
                slot + 1,
                Diagnostic::error(
                    "static-context",
                    "`this` cannot be referenced from a static context",
                    Some(range),
                ),
            );
        }
        let ty = this_type(env, class);
        (Position::Value(ty.clone()), SelectorBinding::new(BoundKind::This, ty))
    }

    /// `X.super` is valid for the direct superclass or a direct superinterface of the context
    /// class.
    fn bind_qualified_super(
        &mut self,
        expr: ExprId,
        slot: u32,
        range: Span,
        position: &Position,
    ) -> (Position, SelectorBinding) {
        let env = self.env;
        let named = match position {
            Position::TypeName(ty) => ty.class_id(),
            Position::Unknown => return (Position::Unknown, SelectorBinding::unknown()),
            Position::Value(_) | Position::Package(_) => None,
        };
        let direct = env.class(self.ctx.class).and_then(|def| {
            let named = named?;
            def.super_class
                .iter()
                .chain(def.interfaces.iter())
                .find(|sup| sup.class_id() == Some(named))
                .cloned()
        });
        let Some(super_ty) = direct else {
            let message = format!(
                "`{}` is not a direct supertype of the enclosing class",
                format_type(env, &erasure(env, &position.ty()))
            );
            self.report(expr, slot, Diagnostic::error("invalid-qualified-super", message, Some(range)));
            return (Position::Unknown, SelectorBinding::new(BoundKind::Super, Type::Error));
        };
        (
            Position::Value(super_ty.clone()),
            SelectorBinding::new(BoundKind::Super, super_ty),
        )
    }
}
