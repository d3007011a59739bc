pub mod model;
pub mod settings;

pub use model::*;
pub use settings::*;
