// Trade simulation: per-team lineup impact and the approval verdict.

pub mod impact;
pub mod verdict;
