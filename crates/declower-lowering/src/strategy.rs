//! Strategy classification.
//!
//! Every choice the engines make about where a synthesized callable goes and
//! what its body does is one of a fixed set of variants, decided here from
//! the model and matched exhaustively at the use sites.

use declower_model::{Container, DeclId, DeclKind, DeclarationModel, Parameter};

use crate::options::LoweringOptions;

/// Where the default-value methods of a functional declaration live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultValueOwner {
    /// Next to the declaration, on the same type (methods).
    SelfType,
    /// Static on the declaration's own class or wrapper (toplevel).
    Static,
    /// On the class enclosing a member class.
    Outer,
    /// On the interface enclosing a member class: abstract there, concrete
    /// on its companion.
    OuterCompanion,
    /// Static on the host a local class is hoisted into, taking the class's
    /// capture prefix.
    InitCompanion,
}

impl DefaultValueOwner {
    pub fn classify(model: &DeclarationModel, decl: DeclId) -> Self {
        let d = model.decl(decl);
        if !d.kind.is_class() {
            return if model.is_toplevel(decl) {
                DefaultValueOwner::Static
            } else {
                DefaultValueOwner::SelfType
            };
        }
        match d.container {
            Container::Package => DefaultValueOwner::Static,
            Container::Member(owner) if model.decl(owner).kind.is_interface() => {
                DefaultValueOwner::OuterCompanion
            }
            Container::Member(_) => DefaultValueOwner::Outer,
            Container::Local(_) => DefaultValueOwner::InitCompanion,
        }
    }
}

/// The shape of a functional declaration being given overloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Functional {
    Method,
    Constructor,
    Instantiator,
}

/// Body of a defaulted-argument overload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaoBody {
    /// Declared only.
    Abstract,
    /// Materialize the missing defaults left to right, then call the
    /// canonical (or full-arity) form.
    DelegateToCanonical,
    /// Call the superclass overload of the same arity and narrow the result.
    DelegateToSuper,
}

/// Where an overload ladder is being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LadderSite {
    /// On the type that owns the declaration's body.
    Home,
    /// On an interface, as abstract declarations.
    InterfaceSurface,
    /// On an implementing class, forwarding to a companion.
    Forwarder,
}

impl LadderSite {
    pub fn body(self, model: &DeclarationModel, options: &LoweringOptions, decl: DeclId) -> DaoBody {
        match self {
            LadderSite::InterfaceSurface => DaoBody::Abstract,
            LadderSite::Home => class_ladder_body(model, options, decl),
            LadderSite::Forwarder => DaoBody::DelegateToCanonical,
        }
    }
}

/// A variadic parameter that may be empty defaults to the empty sequence.
pub fn has_empty_default(param: &Parameter) -> bool {
    param.sequenced && !param.at_least_one && param.default.is_none()
}

/// Whether parameter `index` of `decl` may be omitted by callers, either
/// directly or because the declaration it refines made it optional.
pub fn is_optional(model: &DeclarationModel, decl: DeclId, index: usize) -> bool {
    let own = model.decl(decl).parameters().get(index);
    let root = model.decl(model.root_refined(decl)).parameters().get(index);
    own.is_some_and(|p| p.is_defaulted() || has_empty_default(p))
        || root.is_some_and(Parameter::is_defaulted)
}

/// Whether `decl` owns the default-value method of parameter `index`.
///
/// Only the declaration that introduces a default computes it; refinements
/// reuse the inherited method.
pub fn has_default_value_method(model: &DeclarationModel, decl: DeclId, index: usize) -> bool {
    model.decl(decl).refines.is_none()
        && model
            .decl(decl)
            .parameters()
            .get(index)
            .is_some_and(Parameter::is_defaulted)
}

/// Whether an overload cut before parameter `index` exists.
pub fn has_overload(model: &DeclarationModel, decl: DeclId, index: usize) -> bool {
    is_optional(model, decl, index)
}

/// Parameter indices with an overload, in source order.
pub fn overload_cuts(model: &DeclarationModel, decl: DeclId) -> Vec<usize> {
    (0..model.decl(decl).parameters().len())
        .filter(|i| has_overload(model, decl, *i))
        .collect()
}

/// Whether `decl` is split into a public forwarder and a private canonical body.
pub fn needs_canonical(model: &DeclarationModel, options: &LoweringOptions, decl: DeclId) -> bool {
    let d = model.decl(decl);
    options.canonical_methods
        && d.kind == DeclKind::Function
        && d.is_default()
        && !overload_cuts(model, decl).is_empty()
}

/// Whether a member class gets an instantiator on its container.
pub fn generates_instantiator(model: &DeclarationModel, class: DeclId) -> bool {
    let d = model.decl(class);
    d.kind == DeclKind::Class
        && model.is_member(class)
        && !d.is_abstract()
        && (d.modifiers.is_refinable() || d.is_shared())
}

/// Interface members that only ever exist on the companion.
pub fn only_on_companion(model: &DeclarationModel, member: DeclId) -> bool {
    let d = model.decl(member);
    model.is_interface_member(member) && (d.kind.is_interface() || !d.is_shared())
}

/// Whether `class` needs a forwarder to the companion implementation of `member`.
pub fn needs_companion_delegate(model: &DeclarationModel, class: DeclId, member: DeclId) -> bool {
    let d = model.decl(member);
    model.get_member(class, &d.name) == Some(member) && (d.is_default() || !d.is_formal())
}

/// Body of the overloads a class places for one of its own functions.
///
/// Every class method with a cut gets its own ladder, refinements included,
/// so that an overload called on a subclass reaches the subclass body. A
/// refinement that narrows the return type of a concrete superclass method
/// without a canonical form calls the superclass overload and casts: that
/// overload ends in a virtual call of the full-arity form.
pub fn class_ladder_body(
    model: &DeclarationModel,
    options: &LoweringOptions,
    decl: DeclId,
) -> DaoBody {
    let d = model.decl(decl);
    if d.is_formal() {
        return DaoBody::Abstract;
    }
    let Some(refined) = d.refines else {
        return DaoBody::DelegateToCanonical;
    };
    let r = model.decl(refined);
    let narrowed = r.value_type != d.value_type;
    if !narrowed
        || model.is_interface_member(refined)
        || r.is_formal()
        || needs_canonical(model, options, refined)
        || overload_cuts(model, refined).is_empty()
    {
        return DaoBody::DelegateToCanonical;
    }
    DaoBody::DelegateToSuper
}
