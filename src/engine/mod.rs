pub mod affine;
pub mod alignment;
pub mod constrain;
pub mod error;
pub mod gap_penalty;
pub mod matrix;
pub mod pipeline;
pub mod similarity;
pub mod traceback;

pub use affine::{do_affine_alignment, AffineAlignObj};
pub use alignment::{do_alignment, AlignObj};
pub use constrain::{constrain_similarity, no_beef_from_adaptive_rt, no_beef_mask};
pub use error::{AlignError, AlignResult};
pub use gap_penalty::base_gap_penalty;
pub use matrix::{Matrix, SimMatrix};
pub use pipeline::{
    align_chromatograms, constrained_similarity, AlignParams, AlignType, ChromAlignment,
    Constraint,
};
pub use similarity::{seq_similarity, similarity_matrix, Normalization, SimParams, SimType};
pub use traceback::AlignedIndices;
