pub mod charset;
pub mod errors;
pub mod options;
pub mod path;
