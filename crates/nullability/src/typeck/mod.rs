mod check;
mod types;

pub use check::check_program;
pub use types::{ProjectedType, Scalar, Type};

#[cfg(test)]
mod tests;
