// Job state machine
//
// The job lifecycle is small enough that transitions are computed by pure
// functions rather than a stateful machine; the store applies them inside
// its transactions.

pub mod errors;
pub mod events;
pub mod policy;
pub mod states;

pub use errors::TransitionError;
pub use events::JobEvent;
pub use policy::{
    is_claimable, is_dead_lettered, next_retry_count, next_status, validate_outcome,
};
pub use states::JobStatus;
