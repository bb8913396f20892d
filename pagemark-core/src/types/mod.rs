//! Value types shared by the codec, estimator, reconciliation and sync layers

mod policy;
mod position;
mod result;
mod spine;
mod state;

pub use policy::{SyncDirection, SyncPolicy};
pub use position::{PathStep, Position};
pub use result::{
    BookId, DeviceChanges, Disposition, LibraryChanges, NewState, ReconciliationResult, Staged,
};
pub use spine::{SpineDocument, SpineEntry};
pub use state::{DeviceReadingState, LibraryReadingState, ReadStatus};
