pub mod filters;
pub mod composite;
pub mod outline;
pub mod fit;
pub mod font;
pub mod label;
pub mod badge;

pub use filters::*;
pub use composite::*;
pub use outline::*;
pub use fit::*;
pub use font::*;
pub use label::*;
pub use badge::*;
