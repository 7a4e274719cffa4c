use std::fmt;

/// Per-process lifecycle of a [`super::WindowManager`].
///
/// `Uninitialized -> Registering -> Active -> Terminating`. `Terminating`
/// is terminal; a failed registration falls back to `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Registering,
    Active,
    Terminating,
}

impl LifecycleState {
    pub fn is_active(&self) -> bool {
        matches!(self, LifecycleState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Terminating)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Registering => "registering",
            LifecycleState::Active => "active",
            LifecycleState::Terminating => "terminating",
        };
        f.write_str(name)
    }
}
