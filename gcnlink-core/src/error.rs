//! Error types for the gcnlink core library.
//!
//! Defines the error enum exposed by the public API, stable machine-readable
//! codes for each variant, and a convenient result alias.

use std::{fmt, sync::Arc};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Error type produced while preparing data for, building, or training a
/// [`crate::GcnModel`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GcnError {
    /// A hyperparameter was outside its accepted range.
    #[error("invalid configuration for `{parameter}`: {reason}")]
    InvalidConfiguration {
        /// Name of the rejected parameter.
        parameter: &'static str,
        /// Human-readable description of the accepted range.
        reason: Arc<str>,
    },
    /// Two operands had incompatible dimensions.
    #[error("shape mismatch in {operation}: left is {left:?}, right is {right:?}")]
    ShapeMismatch {
        /// Operation that rejected the operands.
        operation: &'static str,
        /// Shape of the left-hand operand as `(rows, cols)`.
        left: (usize, usize),
        /// Shape of the right-hand operand as `(rows, cols)`.
        right: (usize, usize),
    },
    /// A sparse input did not hold the declared number of stored entries.
    #[error("sparse input declares {expected} nonzeros but stores {found}")]
    NonzeroMismatch {
        /// Nonzero count supplied by the caller.
        expected: usize,
        /// Nonzero count actually stored.
        found: usize,
    },
    /// A convolution layer produced NaN or infinite activations.
    #[error("output of layer `{layer}` has numerical instability ({non_finite} non-finite values)")]
    NumericalInstability {
        /// Name of the offending layer.
        layer: Arc<str>,
        /// Number of non-finite entries observed.
        non_finite: usize,
    },
    /// Negative-edge rejection sampling ran out of attempts.
    #[error("could only sample {achieved} of {requested} negative {split} edges")]
    SamplingExhausted {
        /// Split being sampled (`"validation"` or `"test"`).
        split: &'static str,
        /// Number of negative edges requested.
        requested: usize,
        /// Number of negative edges sampled before giving up.
        achieved: usize,
    },
    /// The graph has too few edges to hold out validation and test sets.
    #[error("graph with {edges} edges yields {validation} validation and {test} test edges")]
    InsufficientEdges {
        /// Number of undirected edges in the graph.
        edges: usize,
        /// Validation edges the fractions would hold out.
        validation: usize,
        /// Test edges the fractions would hold out.
        test: usize,
    },
    /// The adjacency matrix violated a structural requirement.
    #[error("invalid adjacency: {reason}")]
    InvalidAdjacency {
        /// Description of the violated requirement.
        reason: Arc<str>,
    },
    /// Held-out edge sets break the split contract.
    #[error("inconsistent edge split: {reason}")]
    InconsistentSplit {
        /// Description of the violated requirement.
        reason: Arc<str>,
    },
    /// An edge referenced a node outside the graph.
    #[error("edge references node {node}, but the graph has {node_count} nodes")]
    NodeOutOfBounds {
        /// The invalid node index.
        node: usize,
        /// Number of nodes in the graph.
        node_count: usize,
    },
    /// Scoring was requested for an empty edge set.
    #[error("cannot score an empty set of {role} edges")]
    EmptyEdgeSet {
        /// Which side of the evaluation was empty.
        role: &'static str,
    },
    /// Reading or writing the cached edge split failed.
    #[error("split cache `{path}` failed: {reason}")]
    SplitCache {
        /// Location of the cache file.
        path: Arc<str>,
        /// Underlying failure rendered as text.
        reason: Arc<str>,
    },
}

define_error_codes! {
    /// Stable codes describing [`GcnError`] variants.
    enum GcnErrorCode for GcnError {
        /// A hyperparameter was outside its accepted range.
        InvalidConfiguration => InvalidConfiguration { .. } => "GCN_INVALID_CONFIGURATION",
        /// Two operands had incompatible dimensions.
        ShapeMismatch => ShapeMismatch { .. } => "GCN_SHAPE_MISMATCH",
        /// A sparse input did not hold the declared number of stored entries.
        NonzeroMismatch => NonzeroMismatch { .. } => "GCN_NONZERO_MISMATCH",
        /// A convolution layer produced NaN or infinite activations.
        NumericalInstability => NumericalInstability { .. } => "GCN_NUMERICAL_INSTABILITY",
        /// Negative-edge rejection sampling ran out of attempts.
        SamplingExhausted => SamplingExhausted { .. } => "GCN_SAMPLING_EXHAUSTED",
        /// The graph has too few edges to hold out validation and test sets.
        InsufficientEdges => InsufficientEdges { .. } => "GCN_INSUFFICIENT_EDGES",
        /// The adjacency matrix violated a structural requirement.
        InvalidAdjacency => InvalidAdjacency { .. } => "GCN_INVALID_ADJACENCY",
        /// Held-out edge sets break the split contract.
        InconsistentSplit => InconsistentSplit { .. } => "GCN_INCONSISTENT_SPLIT",
        /// An edge referenced a node outside the graph.
        NodeOutOfBounds => NodeOutOfBounds { .. } => "GCN_NODE_OUT_OF_BOUNDS",
        /// Scoring was requested for an empty edge set.
        EmptyEdgeSet => EmptyEdgeSet { .. } => "GCN_EMPTY_EDGE_SET",
        /// Reading or writing the cached edge split failed.
        SplitCache => SplitCache { .. } => "GCN_SPLIT_CACHE",
    }
}

impl GcnError {
    pub(crate) fn invalid_configuration(parameter: &'static str, reason: impl Into<Arc<str>>) -> Self {
        Self::InvalidConfiguration {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistent_split(reason: impl Into<Arc<str>>) -> Self {
        Self::InconsistentSplit {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_adjacency(reason: impl Into<Arc<str>>) -> Self {
        Self::InvalidAdjacency {
            reason: reason.into(),
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, GcnError>;
