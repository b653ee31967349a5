//! Declared call signatures, used to check that a handler is compatible
//! with the event it is bound to.
//!
//! Rust closures don't expose their parameter names or defaults the way
//! Python's `inspect.signature` does, so a [`Signature`] here is supplied
//! explicitly at registration time rather than introspected. It is the
//! handler author's declaration of its own calling convention.

/// A single declared parameter of an [`EventFunction`](super::function::EventFunction)
/// or of a declared event's expected signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFunctionParameter {
    pub name: String,
    pub has_default: bool,
    pub is_variadic_positional: bool,
    pub is_variadic_keyword: bool,
}

impl EventFunctionParameter {
    pub fn positional(name: impl Into<String>) -> Self {
        EventFunctionParameter {
            name: name.into(),
            has_default: false,
            is_variadic_positional: false,
            is_variadic_keyword: false,
        }
    }

    pub fn with_default(name: impl Into<String>) -> Self {
        EventFunctionParameter {
            name: name.into(),
            has_default: true,
            is_variadic_positional: false,
            is_variadic_keyword: false,
        }
    }

    pub fn variadic_positional(name: impl Into<String>) -> Self {
        EventFunctionParameter {
            name: name.into(),
            has_default: false,
            is_variadic_positional: true,
            is_variadic_keyword: false,
        }
    }

    pub fn variadic_keyword(name: impl Into<String>) -> Self {
        EventFunctionParameter {
            name: name.into(),
            has_default: false,
            is_variadic_positional: false,
            is_variadic_keyword: true,
        }
    }
}

/// A declared calling convention: some ordinary parameters, optionally
/// followed by a variadic positional and/or variadic keyword parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub parameters: Vec<EventFunctionParameter>,
}

impl Signature {
    pub fn new(parameters: Vec<EventFunctionParameter>) -> Self {
        Signature { parameters }
    }

    /// Whether this signature accepts a variadic positional parameter.
    pub fn has_args(&self) -> bool {
        self.parameters.iter().any(|p| p.is_variadic_positional)
    }

    /// Whether this signature accepts a variadic keyword parameter.
    pub fn has_kwargs(&self) -> bool {
        self.parameters.iter().any(|p| p.is_variadic_keyword)
    }

    /// The names of every non-variadic parameter, in declaration order.
    pub fn keywords(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| !p.is_variadic_positional && !p.is_variadic_keyword)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// The names of non-variadic parameters that have no default.
    pub fn required_keywords(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| !p.is_variadic_positional && !p.is_variadic_keyword && !p.has_default)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// The number of non-variadic, non-defaulted parameters.
    pub fn required_variable_count(&self) -> usize {
        self.required_keywords().len()
    }

    /// A "universal" signature accepts exactly `(*args, **kwargs)` and
    /// nothing else.
    pub fn is_universal(&self) -> bool {
        self.has_args() && self.has_kwargs() && self.parameters.len() == 2
    }

    /// Whether `candidate` may be bound against `self` as the declared
    /// event signature.
    pub fn complies_with(&self, candidate: &Signature) -> bool {
        // Rule 1: a universal declared signature requires a universal candidate.
        if self.is_universal() && !candidate.is_universal() {
            return false;
        }

        // Rule 2: a universal candidate complies with anything.
        if candidate.is_universal() {
            return true;
        }

        // Rule 3/4: variadic acceptance must be matched.
        if self.has_args() && !candidate.has_args() {
            return false;
        }
        if self.has_kwargs() && !candidate.has_kwargs() {
            return false;
        }

        // Rule 5: candidate's keyword names must be a subset of the
        // declared required keyword set, unless it accepts **kwargs.
        if !candidate.has_kwargs() {
            let required: std::collections::HashSet<&str> =
                self.required_keywords().into_iter().collect();

            for name in candidate.keywords() {
                if !required.contains(name) {
                    return false;
                }
            }
        }

        // Rule 6: with no variadic on either side, required counts must
        // match exactly.
        if !self.has_args() && !self.has_kwargs() && !candidate.has_args() && !candidate.has_kwargs() {
            return self.required_variable_count() == candidate.required_variable_count();
        }

        true
    }
}
