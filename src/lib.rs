//! jfuzz core library: JSON document mutation sessions, the attack template
//! registry and the byte-mutation oracles they drive.

#[path = "engine/behavior.rs"]
mod behavior;
#[path = "oracle/builtin.rs"]
mod builtin;
#[path = "oracle/command.rs"]
mod command;
#[path = "platform/config.rs"]
mod config;
#[path = "platform/envinfo.rs"]
mod envinfo;
#[path = "platform/error.rs"]
mod error;
#[path = "engine/mutators.rs"]
mod mutators;
#[path = "oracle/oracle.rs"]
mod oracle;
#[path = "runtime/rng.rs"]
mod rng;
#[path = "engine/serializer.rs"]
mod serializer;
#[path = "engine/session.rs"]
mod session;
#[path = "engine/techniques.rs"]
mod techniques;
#[path = "model/value.rs"]
mod value;
#[path = "engine/walker.rs"]
mod walker;

pub use behavior::*;
pub use builtin::*;
pub use command::*;
pub use config::*;
pub use envinfo::*;
pub use error::*;
pub use mutators::*;
pub use oracle::*;
pub use rng::*;
pub use serializer::*;
pub use session::*;
pub use techniques::*;
pub use value::*;
