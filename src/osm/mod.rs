pub mod parser;

pub use parser::parse_drinking_water;
