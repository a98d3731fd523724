mod arena;
mod handle;
mod node;
mod size;
mod tree;

pub(crate) use handle::Handle;
pub(crate) use tree::{Pos, RawRankedTree};
