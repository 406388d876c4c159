/// What `unregister` does with an entry whose instance failed to dispose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalFailure {
    /// Keep the entry and its cached instance; the entry stays resolvable.
    #[default]
    Retain,
    /// Drop the entry anyway. The failure is still reported.
    Remove,
}

/// Per-container resolution policy. Child containers start with a copy of
/// their parent's options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerOptions {
    try_resolve_unregistered: bool,
    bubble_to_parent: bool,
    disposal_failure: DisposalFailure,
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self {
            try_resolve_unregistered: true,
            bubble_to_parent: true,
            disposal_failure: DisposalFailure::Retain,
        }
    }

    /// Build unregistered concrete types, sole implementations and
    /// sequences on demand.
    pub fn try_resolve_unregistered(mut self, enabled: bool) -> Self {
        self.try_resolve_unregistered = enabled;
        self
    }

    /// Let unnamed misses fall through to the parent container.
    pub fn bubble_to_parent(mut self, enabled: bool) -> Self {
        self.bubble_to_parent = enabled;
        self
    }

    pub fn disposal_failure(mut self, policy: DisposalFailure) -> Self {
        self.disposal_failure = policy;
        self
    }

    pub fn resolves_unregistered(&self) -> bool {
        self.try_resolve_unregistered
    }

    pub fn bubbles_to_parent(&self) -> bool {
        self.bubble_to_parent
    }

    pub fn on_disposal_failure(&self) -> DisposalFailure {
        self.disposal_failure
    }
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self::new()
    }
}
