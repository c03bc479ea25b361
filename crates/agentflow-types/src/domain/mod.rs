pub mod agent;
pub mod background;
pub mod credential;
pub mod message;
pub mod part;
pub mod project;
pub mod session;
pub mod turn;
pub mod vendor;

pub use agent::*;
pub use background::*;
pub use credential::*;
pub use message::*;
pub use part::*;
pub use project::*;
pub use session::*;
pub use turn::*;
pub use vendor::*;
