pub mod align;
pub mod batch;
pub mod simmat;
