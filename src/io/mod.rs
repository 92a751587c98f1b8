/// CSV export of status snapshots.
pub mod export;
