mod write_alignment;
mod write_matrix;

pub use write_alignment::AlignmentWriter;
pub use write_matrix::write_similarity_matrix;
