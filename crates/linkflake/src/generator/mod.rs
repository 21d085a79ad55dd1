mod interface;
mod interrupt;
mod lock;
mod mutex;
mod sequence;
mod wait;

pub use interface::*;
pub use interrupt::*;
pub use lock::*;
pub use mutex::*;
pub use sequence::*;
pub use wait::*;
