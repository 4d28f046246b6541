pub mod claude;
pub mod deepseek;
pub mod flexible;
pub mod gemini;
pub mod mock;

pub use claude::*;
pub use deepseek::*;
pub use flexible::*;
pub use gemini::*;
pub use mock::*;
