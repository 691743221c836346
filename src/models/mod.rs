pub mod audit;
pub mod enums;
pub mod record;
pub mod summary;

pub use audit::*;
pub use enums::*;
pub use record::*;
pub use summary::*;
