//! How a toggle request turns into a store mutation.
//!
//! Callers always send the membership they last displayed. `ClientFlag`
//! trusts that flag: two clients acting on the same stale flag can both
//! apply the same change. `AtomicFlip` ignores the flag and inverts the
//! stored membership instead. Both keep the same request and response shape.

use std::str::FromStr;

use threads_db::{Database, Engagement, StoreError, Toggled};

pub trait ToggleMode: Send + Sync {
    /// Apply one toggle and return the membership after it.
    fn toggle(
        &self,
        db: &Database,
        engagement: Engagement<'_>,
        previously: bool,
    ) -> Result<Toggled, StoreError>;

    fn kind(&self) -> ToggleKind;
}

/// `previously == true` removes, otherwise adds.
pub struct ClientFlag;

impl ToggleMode for ClientFlag {
    fn toggle(
        &self,
        db: &Database,
        engagement: Engagement<'_>,
        previously: bool,
    ) -> Result<Toggled, StoreError> {
        db.set_engagement(engagement, !previously)
    }

    fn kind(&self) -> ToggleKind {
        ToggleKind::ClientFlag
    }
}

/// Reads and inverts the stored membership under the writer lock.
pub struct AtomicFlip;

impl ToggleMode for AtomicFlip {
    fn toggle(
        &self,
        db: &Database,
        engagement: Engagement<'_>,
        _previously: bool,
    ) -> Result<Toggled, StoreError> {
        db.flip_engagement(engagement)
    }

    fn kind(&self) -> ToggleKind {
        ToggleKind::AtomicFlip
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleKind {
    #[default]
    ClientFlag,
    AtomicFlip,
}

impl ToggleKind {
    pub fn build(self) -> Box<dyn ToggleMode> {
        match self {
            ToggleKind::ClientFlag => Box::new(ClientFlag),
            ToggleKind::AtomicFlip => Box::new(AtomicFlip),
        }
    }
}

impl FromStr for ToggleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client-flag" => Ok(Self::ClientFlag),
            "atomic-flip" => Ok(Self::AtomicFlip),
            other => Err(format!("unknown toggle mode '{}'", other)),
        }
    }
}
