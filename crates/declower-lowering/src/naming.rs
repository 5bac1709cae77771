//! Naming service.
//!
//! Every synthesized name goes through [`Naming`]. Names are pure functions of
//! the model: the same declaration and kind always produce the same string,
//! so unchanged source lowers to identical target names across runs.
//!
//! | Kind                | Example            |
//! |---------------------|--------------------|
//! | `Type` (local)      | `f$1Local`         |
//! | `Companion`         | `Greeter$impl`     |
//! | `CompanionField`    | `$pkg$Greeter$impl`|
//! | `Canonical`         | `greet$canonical$` |
//! | `DefaultValue(1)`   | `greet$default$who`|
//! | `Instantiator`      | `Inner$new$`       |
//! | `AliasInstantiator` | `Alias$aliased$`   |
//! | `TypeDescriptor(0)` | `$reified$T`       |
//! | `OuterThis`         | `$this`            |

use declower_model::{Container, DeclId, Declaration, DeclarationModel};

/// What a synthesized name is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    /// Simple name of the target type for a class, interface or alias.
    Type,
    Companion,
    CompanionField,
    /// Simple name of a function or value on its target type.
    Member,
    Canonical,
    /// Default-value method of parameter `n` of the first parameter list.
    DefaultValue(usize),
    Instantiator,
    AliasInstantiator,
    Getter,
    Setter,
    /// Accessors of promoted parameter `n` of a class.
    PromotedGetter(usize),
    PromotedSetter(usize),
    /// Parameter or field holding a captured local value.
    CapturedValue,
    /// Parameter or field holding a captured parameter of this declaration.
    CapturedParam { list: usize, index: usize },
    /// Descriptor parameter or field for type parameter `n`.
    TypeDescriptor(usize),
    OuterThis,
    /// Field holding the callable of a deferred function.
    DeferredField,
    /// Static holder class of a toplevel function or value.
    Wrapper,
}

/// Declaration-to-name mapping.
pub trait Naming {
    fn name(&self, model: &DeclarationModel, decl: DeclId, kind: NameKind) -> String;
}

/// The naming policy used unless an embedder supplies its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNaming;

impl DefaultNaming {
    /// The simple name with any local prefix: `{container}${n}{name}` for
    /// locals, where `n` counts same-named locals of the container from 1.
    fn base(model: &DeclarationModel, decl: DeclId) -> String {
        let d = model.decl(decl);
        match d.container {
            Container::Local(container) => format!(
                "{}${}{}",
                Self::base(model, container),
                model.local_ordinal(decl) + 1,
                d.name
            ),
            _ => d.name.clone(),
        }
    }

    fn companion_path(model: &DeclarationModel, decl: DeclId) -> String {
        let qualified = model.qualified_name(decl);
        let mut segments: Vec<&str> = qualified.namespace.iter().map(String::as_str).collect();
        let base = Self::base(model, decl);
        segments.push(&base);
        format!("${}$impl", segments.join("$"))
    }

    fn param(d: &Declaration, index: usize) -> String {
        d.parameters()
            .get(index)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| index.to_string())
    }

    fn accessor(prefix: &str, name: &str) -> String {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("{prefix}{}{}", first.to_uppercase(), chars.as_str()),
            None => prefix.to_string(),
        }
    }
}

impl Naming for DefaultNaming {
    fn name(&self, model: &DeclarationModel, decl: DeclId, kind: NameKind) -> String {
        let d = model.decl(decl);
        match kind {
            NameKind::Type | NameKind::Member => Self::base(model, decl),
            NameKind::Companion => format!("{}$impl", Self::base(model, decl)),
            NameKind::CompanionField => Self::companion_path(model, decl),
            NameKind::Canonical => format!("{}$canonical$", Self::base(model, decl)),
            NameKind::DefaultValue(index) => {
                // Named after the declaration that introduced the default.
                let root = model.root_refined(decl);
                let param = model
                    .decl(root)
                    .parameters()
                    .get(index)
                    .or_else(|| d.parameters().get(index))
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| index.to_string());
                format!("{}$default${param}", Self::base(model, root))
            }
            NameKind::Instantiator => format!("{}$new$", Self::base(model, decl)),
            NameKind::AliasInstantiator => format!("{}$aliased$", Self::base(model, decl)),
            NameKind::Getter => Self::accessor("get", &Self::base(model, decl)),
            NameKind::Setter => Self::accessor("set", &Self::base(model, decl)),
            NameKind::PromotedGetter(index) => Self::accessor("get", &Self::param(d, index)),
            NameKind::PromotedSetter(index) => Self::accessor("set", &Self::param(d, index)),
            NameKind::CapturedValue => format!("$capture${}", d.name),
            NameKind::CapturedParam { list, index } => {
                let param = d
                    .parameter_lists
                    .get(list)
                    .and_then(|l| l.get(index))
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| format!("{list}_{index}"));
                format!("$capture${param}")
            }
            NameKind::TypeDescriptor(index) => {
                let param = d
                    .type_parameters
                    .get(index)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| index.to_string());
                format!("$reified${param}")
            }
            NameKind::OuterThis => "$this".to_string(),
            NameKind::DeferredField => format!("{}$deferred$", Self::base(model, decl)),
            NameKind::Wrapper => format!("{}_", Self::base(model, decl)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declower_model::{ModelBuilder, Parameter, SourceExpr, TypeRef};

    #[test]
    fn locals_are_prefixed_with_container_and_ordinal() {
        let mut b = ModelBuilder::new();
        let f = b.function("f").build();
        let first = b.class("Local").local_to(f).build();
        let second = b.class("Local").local_to(f).build();
        let g = b.function("g").local_to(f).build();
        let nested = b.class("Deep").local_to(g).build();
        let model = b.finish();

        let n = DefaultNaming;
        assert_eq!(n.name(&model, first, NameKind::Type), "f$1Local");
        assert_eq!(n.name(&model, second, NameKind::Type), "f$2Local");
        assert_eq!(n.name(&model, nested, NameKind::Type), "f$1g$1Deep");
    }

    #[test]
    fn default_value_name_comes_from_root_declaration() {
        let mut b = ModelBuilder::new();
        let i = b.interface("I").build();
        let m = b.next_id();
        b.function("greet")
            .member_of(i)
            .default_()
            .param(Parameter::new("who", TypeRef::basic("String")).with_default(SourceExpr::string("world")))
            .build();
        let c = b.class("C").satisfies(TypeRef::named(i)).build();
        let refined = b
            .function("greet")
            .member_of(c)
            .actual()
            .refines(m)
            .param(Parameter::new("whom", TypeRef::basic("String")))
            .build();
        let model = b.finish();

        let n = DefaultNaming;
        assert_eq!(n.name(&model, m, NameKind::DefaultValue(0)), "greet$default$who");
        assert_eq!(n.name(&model, refined, NameKind::DefaultValue(0)), "greet$default$who");
    }

    #[test]
    fn companion_names() {
        let mut b = ModelBuilder::new().package("a.b");
        let i = b.interface("Greeter").build();
        let model = b.finish();

        let n = DefaultNaming;
        assert_eq!(n.name(&model, i, NameKind::Companion), "Greeter$impl");
        assert_eq!(n.name(&model, i, NameKind::CompanionField), "$a$b$Greeter$impl");
    }

    #[test]
    fn accessors_and_descriptors() {
        let mut b = ModelBuilder::new();
        let c = b.class("Box").type_param("Element").build();
        let v = b.value("count", TypeRef::basic("Integer")).member_of(c).build();
        let model = b.finish();

        let n = DefaultNaming;
        assert_eq!(n.name(&model, v, NameKind::Getter), "getCount");
        assert_eq!(n.name(&model, v, NameKind::Setter), "setCount");
        assert_eq!(n.name(&model, c, NameKind::TypeDescriptor(0)), "$reified$Element");
        assert_eq!(n.name(&model, c, NameKind::Instantiator), "Box$new$");
        assert_eq!(n.name(&model, v, NameKind::Wrapper), "count_");
    }
}
