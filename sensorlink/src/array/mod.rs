pub mod codec;
pub mod registry;

pub use codec::{ArrayCodec, DataArrayResult, DataArrayValue, DecodedGroup, ParentRef};
pub use registry::{ComponentSpec, Handler, Registry};
