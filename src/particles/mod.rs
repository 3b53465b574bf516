pub mod counts;
pub mod posterior;
pub mod traits;
pub mod weights;

pub use counts::*;
pub use posterior::*;
pub use traits::*;
pub use weights::*;
