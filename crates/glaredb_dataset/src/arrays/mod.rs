pub mod datatype;
pub mod field;
pub mod row;
pub mod scalar;
