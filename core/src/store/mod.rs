pub mod nested;
pub mod value;

pub use nested::NestedPathStore;
pub use value::{map_of, GeoPoint, Value};
