//! Microstate labels.
//!
//! Trajectories arrive as sequences of arbitrary labels (cluster ids,
//! characters, names). A model keeps the sorted set of labels it saw and
//! maps each to a dense state index `0..n_states`.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A value that can label a microstate.
///
/// `is_missing` marks frames that carry no state assignment (for `Option`
/// labels, `None`). Missing frames are skipped and break transitions
/// through them.
pub trait StateLabel: Clone + Ord + Debug + Serialize + DeserializeOwned + Send + Sync {
    fn is_missing(&self) -> bool {
        false
    }
}

macro_rules! impl_state_label {
    ($($t:ty),* $(,)?) => {
        $(impl StateLabel for $t {})*
    };
}

impl_state_label!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, char, bool, String);

impl<T: StateLabel> StateLabel for Option<T> {
    fn is_missing(&self) -> bool {
        match self {
            Some(inner) => inner.is_missing(),
            None => true,
        }
    }
}
