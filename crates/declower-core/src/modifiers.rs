//! Source-level declaration modifiers.

use bitflags::bitflags;

bitflags! {
    /// Modifier set attached to a declaration by the type checker.
    ///
    /// `DEFAULT` means shared *and* overridable with a concrete body; `FORMAL`
    /// means declared without a body and must be refined.
    ///
    /// ```rust
    /// use declower_core::Modifiers;
    ///
    /// let greet = Modifiers::SHARED | Modifiers::DEFAULT;
    /// assert!(greet.is_refinable());
    /// assert!(greet.is_concrete());
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        /// Visible outside the declaring scope.
        const SHARED = 1 << 0;
        /// Declared without a body; subtypes must refine it.
        const FORMAL = 1 << 1;
        /// Has a body and may be refined.
        const DEFAULT = 1 << 2;
        /// Refines a declaration of a supertype.
        const ACTUAL = 1 << 3;
        /// Class cannot be instantiated directly.
        const ABSTRACT = 1 << 4;
        /// Class cannot be extended.
        const FINAL = 1 << 5;
        /// Value may be reassigned.
        const VARIABLE = 1 << 6;
        /// Value is computed on every access and has no storage.
        const TRANSIENT = 1 << 7;
        /// Declaration is an annotation class or constructor.
        const ANNOTATION = 1 << 8;
        /// Suppresses entry-point generation for a toplevel declaration.
        const NO_MAIN = 1 << 9;
    }
}

impl Modifiers {
    #[inline]
    pub fn is_shared(self) -> bool {
        self.contains(Modifiers::SHARED)
    }

    #[inline]
    pub fn is_formal(self) -> bool {
        self.contains(Modifiers::FORMAL)
    }

    #[inline]
    pub fn is_default(self) -> bool {
        self.contains(Modifiers::DEFAULT)
    }

    #[inline]
    pub fn is_actual(self) -> bool {
        self.contains(Modifiers::ACTUAL)
    }

    /// Formal or default: subtypes may provide their own version.
    #[inline]
    pub fn is_refinable(self) -> bool {
        self.intersects(Modifiers::FORMAL | Modifiers::DEFAULT)
    }

    /// Not formal: a body exists at this declaration.
    #[inline]
    pub fn is_concrete(self) -> bool {
        !self.is_formal()
    }
}
