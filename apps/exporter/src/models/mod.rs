pub mod snapshot;

pub use snapshot::ContentSnapshot;
