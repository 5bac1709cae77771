//! Lowering configuration.

/// Switches controlling optional parts of the lowering.
///
/// ```
/// use declower_lowering::LoweringOptions;
///
/// let options = LoweringOptions::default()
///     .with_generate_main(false)
///     .with_canonical_methods(false);
/// assert!(options.reified_generics);
/// assert!(!options.canonical_methods);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoweringOptions {
    /// Synthesize a static `main` for shared, concrete, non-generic toplevel
    /// classes and functions that can be called without arguments.
    pub generate_main: bool,
    /// Attach model metadata annotations to every lowered type.
    pub model_annotations: bool,
    /// Thread runtime type descriptors for type parameters.
    pub reified_generics: bool,
    /// Split the body of a `default` member with overloads into a private
    /// canonical method.
    pub canonical_methods: bool,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        Self {
            generate_main: true,
            model_annotations: true,
            reified_generics: true,
            canonical_methods: true,
        }
    }
}

impl LoweringOptions {
    pub fn with_generate_main(mut self, enabled: bool) -> Self {
        self.generate_main = enabled;
        self
    }

    pub fn with_model_annotations(mut self, enabled: bool) -> Self {
        self.model_annotations = enabled;
        self
    }

    pub fn with_reified_generics(mut self, enabled: bool) -> Self {
        self.reified_generics = enabled;
        self
    }

    pub fn with_canonical_methods(mut self, enabled: bool) -> Self {
        self.canonical_methods = enabled;
        self
    }
}
