//! rebyte: byte-level regular expression engine.
//!
//! A pattern compiles to a finite automaton over raw bytes; the automaton
//! then tests whole inputs for acceptance. Patterns that come out
//! deterministic run on a dense DFA table, everything else on a
//! subset-construction NFA, with identical semantics either way.
//!
//! ```
//! let re = rebyte::compile("lo.em").unwrap();
//! assert!(re.run("lorem"));
//! assert!(re.run("lo-em"));
//! assert!(!re.run("loremipsum"));
//! ```
//!
//! A compiled [`Regexp`] is immutable: clone it freely, share it by
//! reference, run it from as many threads as you like.
//!
//! ```
//! use std::sync::Arc;
//!
//! let re = Arc::new(rebyte::compile("(ab)+").unwrap());
//! let re2 = Arc::clone(&re);
//! assert!(re2.run("abab"));
//! ```

mod automaton;
mod parser;

use std::fmt;

use automaton::Automaton;

/// Errors reported while compiling a pattern. Matching itself cannot fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// The pattern is malformed or uses a rejected construct (stray
    /// quantifier, anchor, backreference, bad escape, unbalanced bracket...).
    InvalidArgument(String),
    /// The pattern uses syntax that is recognised but not supported, such as
    /// `[a-z]` ranges inside character classes.
    Unimplemented(String),
}

impl CompileError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        CompileError::InvalidArgument(message.into())
    }

    pub(crate) fn unimplemented(message: impl Into<String>) -> Self {
        CompileError::Unimplemented(message.into())
    }

    /// The human-readable message, without the kind.
    pub fn message(&self) -> &str {
        match self {
            CompileError::InvalidArgument(message) => message,
            CompileError::Unimplemented(message) => message,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::InvalidArgument(message) => write!(f, "invalid pattern: {message}"),
            CompileError::Unimplemented(message) => write!(f, "unimplemented: {message}"),
        }
    }
}

impl std::error::Error for CompileError {}

/// A compiled pattern.
///
/// The pattern string is consumed at compile time and not retained; what is
/// kept is the finalized automaton, which [`Regexp::run`] walks without ever
/// mutating it.
#[derive(Clone, Debug)]
pub struct Regexp {
    automaton: Automaton,
}

impl Regexp {
    /// Returns true iff the pattern matches the whole of `input`.
    ///
    /// ```
    /// let re = rebyte::compile("a+b?").unwrap();
    /// assert!(re.run("aaa"));
    /// assert!(re.run("aab"));
    /// assert!(!re.run(""));
    /// assert!(!re.run("ba"));
    /// ```
    pub fn run(&self, input: impl AsRef<[u8]>) -> bool {
        self.automaton.run(input.as_ref())
    }

    /// True if the pattern compiled down to the deterministic runtime.
    pub fn is_deterministic(&self) -> bool {
        self.automaton.is_deterministic()
    }

    /// Number of states in the compiled automaton.
    pub fn state_count(&self) -> usize {
        self.automaton.state_count()
    }
}

/// Compile `pattern` into a runnable [`Regexp`].
///
/// The pattern is a byte string: `.` and negated classes cover bytes
/// `1..=255`, and `\xHH` escapes name bytes directly. The automaton starts
/// out nondeterministic and is converted to a DFA when the finalizer finds
/// it deterministic, because the DFA runs faster.
///
/// ```
/// assert!(rebyte::compile("a{2,4}").is_ok());
/// assert!(rebyte::compile("a{4,2}").is_err());
/// ```
pub fn compile(pattern: impl AsRef<[u8]>) -> Result<Regexp, CompileError> {
    let scratch = parser::parse(pattern.as_ref())?;
    Ok(Regexp {
        automaton: scratch.finalize(),
    })
}

/// One-shot convenience: compile `pattern` and run it over `input`.
///
/// ```
/// assert_eq!(rebyte::matches("lorem|ipsum", "ipsum"), Ok(true));
/// assert_eq!(rebyte::matches("lorem|ipsum", "dolor"), Ok(false));
/// ```
pub fn matches(
    pattern: impl AsRef<[u8]>,
    input: impl AsRef<[u8]>,
) -> Result<bool, CompileError> {
    Ok(compile(pattern)?.run(input))
}
