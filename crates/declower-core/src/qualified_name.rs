use std::fmt;

/// Qualified name of a source or target declaration.
///
/// The path holds the package segments followed by the names of every
/// enclosing declaration; `name` is the declaration's own simple name.
///
/// # Examples
///
/// ```
/// use declower_core::QualifiedName;
///
/// let pair = QualifiedName::new("Pair", vec!["geometry".into()]);
/// assert_eq!(pair.to_string(), "geometry.Pair");
///
/// let swap = pair.child("swap");
/// assert_eq!(swap.to_string(), "geometry.Pair.swap");
/// assert_eq!(swap.parent(), Some(pair));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Simple name (e.g. "Pair", "swap").
    pub name: String,
    /// Enclosing path (e.g. ["geometry"]); empty for the default package.
    pub namespace: Vec<String>,
}

impl QualifiedName {
    /// Create a new qualified name with an enclosing path.
    pub fn new(name: impl Into<String>, namespace: Vec<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
        }
    }

    /// Create a qualified name in the default package.
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Vec::new(),
        }
    }

    /// Parse a dotted path (e.g. "geometry.Pair").
    ///
    /// Empty segments are dropped, so a leading or doubled dot is harmless.
    pub fn from_dotted(s: &str) -> Self {
        let mut parts: Vec<String> = s
            .split('.')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        match parts.pop() {
            Some(name) => Self {
                name,
                namespace: parts,
            },
            None => Self::global(""),
        }
    }

    /// Check if this name lives in the default package.
    pub fn is_global(&self) -> bool {
        self.namespace.is_empty()
    }

    /// Get the simple (unqualified) name.
    pub fn simple_name(&self) -> &str {
        &self.name
    }

    /// Get the enclosing path.
    pub fn namespace_path(&self) -> &[String] {
        &self.namespace
    }

    /// Compute the stable hash of this path.
    pub fn to_decl_hash(&self) -> crate::DeclHash {
        crate::DeclHash::from_qualified(self)
    }

    /// Create a child name nested inside this one.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut child_ns = self.namespace.clone();
        child_ns.push(self.name.clone());
        Self {
            name: name.into(),
            namespace: child_ns,
        }
    }

    /// Replace the simple name, keeping the enclosing path.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: self.namespace.clone(),
        }
    }

    /// Get the enclosing name, if any.
    pub fn parent(&self) -> Option<Self> {
        let (name, namespace) = self.namespace.split_last()?;
        Some(Self {
            name: name.clone(),
            namespace: namespace.to_vec(),
        })
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.namespace.join("."), self.name)
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        Self::from_dotted(s)
    }
}

impl From<String> for QualifiedName {
    fn from(s: String) -> Self {
        Self::from_dotted(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_name() {
        let name = QualifiedName::global("Pair");
        assert!(name.is_global());
        assert_eq!(name.to_string(), "Pair");
    }

    #[test]
    fn nested_name() {
        let name = QualifiedName::new("swap", vec!["geometry".into(), "Pair".into()]);
        assert!(!name.is_global());
        assert_eq!(name.to_string(), "geometry.Pair.swap");
    }

    #[test]
    fn from_dotted() {
        let name = QualifiedName::from_dotted("geometry.Pair.swap");
        assert_eq!(name.name, "swap");
        assert_eq!(name.namespace, vec!["geometry", "Pair"]);

        let stray = QualifiedName::from_dotted(".geometry..Pair");
        assert_eq!(stray, QualifiedName::from_dotted("geometry.Pair"));

        let empty = QualifiedName::from_dotted(".");
        assert_eq!(empty.name, "");
        assert!(empty.is_global());
    }

    #[test]
    fn child_and_parent() {
        let outer = QualifiedName::new("Outer", vec!["pkg".into()]);
        let inner = outer.child("Inner");
        assert_eq!(inner.to_string(), "pkg.Outer.Inner");
        assert_eq!(inner.parent(), Some(outer.clone()));
        assert_eq!(
            outer.parent(),
            Some(QualifiedName::global("pkg"))
        );
        assert_eq!(QualifiedName::global("pkg").parent(), None);
    }

    #[test]
    fn sibling_keeps_path() {
        let iface = QualifiedName::new("Greeter", vec!["pkg".into()]);
        assert_eq!(iface.sibling("Greeter$impl").to_string(), "pkg.Greeter$impl");
    }

    #[test]
    fn hash_follows_path() {
        let a = QualifiedName::from_dotted("pkg.Pair");
        let b = QualifiedName::new("Pair", vec!["pkg".into()]);
        assert_eq!(a.to_decl_hash(), b.to_decl_hash());
    }
}
