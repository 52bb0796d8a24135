/// Events emitted during a scene step.
/// The presentation layer consumes these for the HUD and sound cues.

use crate::domain::events::ControllerEvent;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SceneEvent {
    /// A controller notification, tagged with the character index.
    Character { body: usize, event: ControllerEvent },
    LadderEntered { body: usize, ladder: usize },
    LadderExited { body: usize, ladder: usize },
    /// The character dropped below the level and was put back at spawn.
    Respawned { body: usize },
}
