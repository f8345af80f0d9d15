pub mod output;

pub use output::{Destination, FsOpener, Output, OutputOpener, SharedBuffer};
