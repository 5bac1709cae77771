//! DeclarationModel - the resolved, immutable input of the lowering core.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: [`Declaration`]
//! - Edges: [`DeclEdge::Member`] from a class/interface to its members,
//!   [`DeclEdge::Local`] from a function/value/class to declarations in its body
//!
//! Declarations are added parent-first, so node order is source order and
//! member/local listings come back sorted by node index.

use declower_core::{DeclHash, ModelError, QualifiedName, Span};
use petgraph::Direction;
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

use crate::{
    Container, DeclId, DeclKind, Declaration, ParamRef, Parameter, TypeParam, TypeParamRef,
    TypeRef,
};

/// Edge types in the declaration graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclEdge {
    /// Type contains member.
    Member,
    /// Body contains local declaration.
    Local,
}

/// The resolved declaration model of one compilation unit.
#[derive(Debug, Default)]
pub struct DeclarationModel {
    /// Ownership graph.
    graph: DiGraph<Declaration, DeclEdge>,

    /// Toplevel declarations in source order.
    toplevel: Vec<DeclId>,

    /// Package path of each toplevel declaration.
    packages: FxHashMap<DeclId, Vec<String>>,

    /// Stable hash of every declaration, indexed by node.
    hashes: Vec<DeclHash>,

    /// Reverse index: hash -> declaration.
    hash_index: FxHashMap<DeclHash, DeclId>,
}

impl DeclarationModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration. Its container (if any) must already be present.
    pub fn add(&mut self, decl: Declaration, package: &[String]) -> Result<DeclId, ModelError> {
        let container = decl.container;
        if let Some(parent) = container.decl() {
            let owner = self.get(parent)?;
            let ok = match container {
                Container::Member(_) => owner.kind.is_class_or_interface(),
                Container::Local(_) => matches!(
                    owner.kind,
                    DeclKind::Function | DeclKind::Value | DeclKind::Class
                ),
                Container::Package => true,
            };
            if !ok {
                return Err(ModelError::InvalidContainer {
                    name: decl.name.clone(),
                    container: owner.name.clone(),
                    span: decl.span,
                });
            }
        }

        let hash = match container {
            Container::Package => {
                let mut segments: Vec<&str> = package.iter().map(String::as_str).collect();
                segments.push(&decl.name);
                DeclHash::from_path(&segments)
            }
            Container::Member(parent) => self.hashes[parent.index()].member(&decl.name),
            Container::Local(parent) => {
                let ordinal = self
                    .locals(parent)
                    .iter()
                    .filter(|l| self.graph[l.0].name == decl.name)
                    .count();
                self.hashes[parent.index()].local(&decl.name, ordinal)
            }
        };

        let id = DeclId(self.graph.add_node(decl));
        self.hashes.push(hash);
        self.hash_index.insert(hash, id);

        match container {
            Container::Package => {
                self.toplevel.push(id);
                self.packages.insert(id, package.to_vec());
            }
            Container::Member(parent) => {
                self.graph.add_edge(parent.0, id.0, DeclEdge::Member);
            }
            Container::Local(parent) => {
                self.graph.add_edge(parent.0, id.0, DeclEdge::Local);
            }
        }
        Ok(id)
    }

    /// Mutable access while the model is still being assembled.
    pub fn get_mut(&mut self, id: DeclId) -> Result<&mut Declaration, ModelError> {
        self.graph
            .node_weight_mut(id.0)
            .ok_or(ModelError::UnknownDeclaration { index: id.index() })
    }

    pub fn get(&self, id: DeclId) -> Result<&Declaration, ModelError> {
        self.graph
            .node_weight(id.0)
            .ok_or(ModelError::UnknownDeclaration { index: id.index() })
    }

    /// Direct access for handles known to come from this model.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this model.
    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.graph[id.0]
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Toplevel declarations in source order.
    pub fn toplevel(&self) -> &[DeclId] {
        &self.toplevel
    }

    /// Every declaration in source order.
    pub fn all(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.graph.node_indices().map(DeclId)
    }

    fn children(&self, id: DeclId, kind: DeclEdge) -> Vec<DeclId> {
        let mut out: Vec<DeclId> = self
            .graph
            .edges_directed(id.0, Direction::Outgoing)
            .filter(|e| *e.weight() == kind)
            .map(|e| DeclId(e.target()))
            .collect();
        out.sort();
        out
    }

    /// Members of a class or interface in source order.
    pub fn members(&self, id: DeclId) -> Vec<DeclId> {
        self.children(id, DeclEdge::Member)
    }

    /// Declarations local to a body, in source order.
    pub fn locals(&self, id: DeclId) -> Vec<DeclId> {
        self.children(id, DeclEdge::Local)
    }

    /// Direct member by simple name.
    pub fn direct_member(&self, id: DeclId, name: &str) -> Option<DeclId> {
        self.members(id)
            .into_iter()
            .find(|m| self.graph[m.0].name == name)
    }

    pub fn container(&self, id: DeclId) -> Container {
        self.graph[id.0].container
    }

    pub fn is_toplevel(&self, id: DeclId) -> bool {
        matches!(self.container(id), Container::Package)
    }

    pub fn is_member(&self, id: DeclId) -> bool {
        matches!(self.container(id), Container::Member(_))
    }

    pub fn is_local(&self, id: DeclId) -> bool {
        matches!(self.container(id), Container::Local(_))
    }

    pub fn is_class_member(&self, id: DeclId) -> bool {
        matches!(self.container(id), Container::Member(c) if self.graph[c.0].kind.is_class())
    }

    pub fn is_interface_member(&self, id: DeclId) -> bool {
        matches!(self.container(id), Container::Member(c) if self.graph[c.0].kind.is_interface())
    }

    /// This declaration or any enclosing one is local.
    pub fn is_ancestor_local(&self, id: DeclId) -> bool {
        let mut current = Some(id);
        while let Some(d) = current {
            match self.container(d) {
                Container::Local(_) => return true,
                Container::Member(parent) => current = Some(parent),
                Container::Package => return false,
            }
        }
        false
    }

    /// The nearest enclosing class or interface.
    pub fn enclosing_type(&self, id: DeclId) -> Option<DeclId> {
        let mut current = self.container(id).decl();
        while let Some(d) = current {
            if self.graph[d.0].kind.is_class_or_interface() {
                return Some(d);
            }
            current = self.container(d).decl();
        }
        None
    }

    /// Package path of the toplevel declaration enclosing `id`.
    pub fn package(&self, id: DeclId) -> &[String] {
        let mut current = id;
        while let Some(parent) = self.container(current).decl() {
            current = parent;
        }
        self.packages
            .get(&current)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Source-level qualified name: package, enclosing declarations, name.
    pub fn qualified_name(&self, id: DeclId) -> QualifiedName {
        let mut chain = vec![self.graph[id.0].name.clone()];
        let mut current = id;
        while let Some(parent) = self.container(current).decl() {
            chain.push(self.graph[parent.0].name.clone());
            current = parent;
        }
        chain.reverse();
        let mut namespace = self.package(id).to_vec();
        let name = chain.pop().unwrap_or_default();
        namespace.extend(chain);
        QualifiedName::new(name, namespace)
    }

    pub fn hash(&self, id: DeclId) -> DeclHash {
        self.hashes
            .get(id.index())
            .copied()
            .unwrap_or(DeclHash::EMPTY)
    }

    pub fn by_hash(&self, hash: DeclHash) -> Option<DeclId> {
        self.hash_index.get(&hash).copied()
    }

    /// Number of earlier locals with the same name in the same body.
    pub fn local_ordinal(&self, id: DeclId) -> usize {
        match self.container(id) {
            Container::Local(parent) => {
                let name = &self.graph[id.0].name;
                self.locals(parent)
                    .into_iter()
                    .take_while(|l| *l != id)
                    .filter(|l| &self.graph[l.0].name == name)
                    .count()
            }
            _ => 0,
        }
    }

    pub fn parameter(&self, param: ParamRef) -> Result<&Parameter, ModelError> {
        let owner = self.get(param.owner)?;
        owner
            .parameter_lists
            .get(param.list)
            .and_then(|list| list.get(param.index))
            .ok_or_else(|| ModelError::NoSuchParameter {
                owner: owner.name.clone(),
                list: param.list,
                index: param.index,
                span: owner.span,
            })
    }

    pub fn type_parameter(&self, tp: TypeParamRef) -> Result<&TypeParam, ModelError> {
        let owner = self.get(tp.owner)?;
        owner
            .type_parameters
            .get(tp.index)
            .ok_or_else(|| ModelError::NoSuchTypeParameter {
                owner: owner.name.clone(),
                index: tp.index,
                span: owner.span,
            })
    }

    /// Own type parameters of `id` as references.
    pub fn type_parameter_refs(&self, id: DeclId) -> Vec<TypeParamRef> {
        (0..self.graph[id.0].type_parameters.len())
            .map(|index| TypeParamRef::new(id, index))
            .collect()
    }

    /// The type a class or interface declares for its own instances.
    pub fn self_type(&self, id: DeclId) -> TypeRef {
        let args = self
            .type_parameter_refs(id)
            .into_iter()
            .map(TypeRef::Param)
            .collect();
        TypeRef::generic(id, args)
    }

    /// The declaration itself or any of its direct members carries an upstream error.
    pub fn has_error_markers(&self, id: DeclId) -> bool {
        self.graph[id.0].erroneous || self.members(id).iter().any(|m| self.graph[m.0].erroneous)
    }

    /// Source position of a declaration, for diagnostics.
    pub fn span(&self, id: DeclId) -> Span {
        self.graph[id.0].span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelBuilder;

    #[test]
    fn members_come_back_in_source_order() {
        let mut b = ModelBuilder::new();
        let c = b.class("C").build();
        let x = b.function("x").member_of(c).build();
        let y = b.value("y", TypeRef::basic("Integer")).member_of(c).build();
        let z = b.function("z").member_of(c).build();
        let model = b.finish();

        assert_eq!(model.members(c), vec![x, y, z]);
        assert_eq!(model.direct_member(c, "y"), Some(y));
        assert_eq!(model.direct_member(c, "w"), None);
    }

    #[test]
    fn qualified_name_includes_package_and_containers() {
        let mut b = ModelBuilder::new().package("geometry");
        let pair = b.class("Pair").build();
        let swap = b.function("swap").member_of(pair).build();
        let local = b.class("Tmp").local_to(swap).build();
        let model = b.finish();

        assert_eq!(model.qualified_name(pair).to_string(), "geometry.Pair");
        assert_eq!(model.qualified_name(swap).to_string(), "geometry.Pair.swap");
        assert_eq!(model.qualified_name(local).to_string(), "geometry.Pair.swap.Tmp");
        assert_eq!(model.package(local), ["geometry".to_string()]);
    }

    #[test]
    fn locality_queries() {
        let mut b = ModelBuilder::new();
        let f = b.function("f").build();
        let l = b.class("L").local_to(f).build();
        let m = b.function("m").member_of(l).build();
        let model = b.finish();

        assert!(model.is_toplevel(f));
        assert!(model.is_local(l));
        assert!(!model.is_local(m));
        assert!(model.is_ancestor_local(m));
        assert!(!model.is_ancestor_local(f));
        assert!(model.is_class_member(m));
        assert_eq!(model.enclosing_type(m), Some(l));
        assert_eq!(model.enclosing_type(l), None);
    }

    #[test]
    fn same_named_locals_get_distinct_hashes_and_ordinals() {
        let mut b = ModelBuilder::new();
        let f = b.function("f").build();
        let first = b.class("L").local_to(f).build();
        let second = b.class("L").local_to(f).build();
        let model = b.finish();

        assert_ne!(model.hash(first), model.hash(second));
        assert_eq!(model.local_ordinal(first), 0);
        assert_eq!(model.local_ordinal(second), 1);
        assert_eq!(model.by_hash(model.hash(second)), Some(second));
    }

    #[test]
    fn member_of_function_is_rejected() {
        let mut model = DeclarationModel::new();
        let f = model
            .add(Declaration::new("f", DeclKind::Function, Container::Package), &[])
            .unwrap();
        let err = model
            .add(Declaration::new("x", DeclKind::Value, Container::Member(f)), &[])
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidContainer { .. }));
    }

    #[test]
    fn parameter_lookup_reports_out_of_range() {
        let mut b = ModelBuilder::new();
        let f = b
            .function("f")
            .param(Parameter::new("a", TypeRef::basic("Integer")))
            .build();
        let model = b.finish();

        assert_eq!(model.parameter(ParamRef::new(f, 0)).unwrap().name, "a");
        assert!(matches!(
            model.parameter(ParamRef::new(f, 1)),
            Err(ModelError::NoSuchParameter { index: 1, .. })
        ));
    }

    #[test]
    fn error_markers_on_members_are_visible_on_owner() {
        let mut b = ModelBuilder::new();
        let c = b.class("C").build();
        b.function("broken").member_of(c).erroneous().build();
        let d = b.class("D").build();
        let model = b.finish();

        assert!(model.has_error_markers(c));
        assert!(!model.has_error_markers(d));
    }
}
