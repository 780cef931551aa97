//! Built-in agent that records scene termination.

use engine_action::EndScene;
use tracing::info;

use crate::agent::Behaviour;
use crate::error::AgentError;
use crate::reaction::Reactions;

/// Listens for [`EndScene`] actions and keeps the end state.
///
/// Frame drivers query it after each drain to decide whether to keep
/// ticking. If several `EndScene` actions arrive, the last one wins.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EndSceneListener {
    scene_has_ended: bool,
    exit_code: i32,
}

impl EndSceneListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scene_has_ended(&self) -> bool {
        self.scene_has_ended
    }

    /// The exit code of the last [`EndScene`] seen, `0` before any.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Reaction to [`EndScene`].
    pub fn end_the_scene(&mut self, end_scene: &EndScene) {
        self.scene_has_ended = true;
        self.exit_code = end_scene.exit_code();
        info!(exit_code = self.exit_code, "scene end requested");
    }
}

impl Behaviour for EndSceneListener {
    fn register_reactions(reactions: &mut Reactions<Self>) -> Result<(), AgentError> {
        reactions.register(Self::end_the_scene)
    }
}
