/// Controller state enum and facing direction.

use serde::{Deserialize, Serialize};

/// Exactly one is active at a time; transitions go through
/// `MovementController::change_state`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum MotorState {
    #[default]
    OnGround,
    Jumping,
    Falling,
    WallSliding,
    Dashing,
    OnLadder,
    Frozen,
    OnLedge,
    CustomAction,
}

impl MotorState {
    pub fn name(self) -> &'static str {
        match self {
            MotorState::OnGround => "OnGround",
            MotorState::Jumping => "Jumping",
            MotorState::Falling => "Falling",
            MotorState::WallSliding => "WallSliding",
            MotorState::Dashing => "Dashing",
            MotorState::OnLadder => "OnLadder",
            MotorState::Frozen => "Frozen",
            MotorState::OnLedge => "OnLedge",
            MotorState::CustomAction => "CustomAction",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn sign(self) -> i32 {
        match self {
            Facing::Left => -1,
            Facing::Right => 1,
        }
    }

    pub fn sign_f(self) -> f32 { self.sign() as f32 }

    /// Negative → Left, anything else → Right.
    pub fn from_sign(s: i32) -> Facing {
        if s < 0 { Facing::Left } else { Facing::Right }
    }

    pub fn opposite(self) -> Facing {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_sign_roundtrip() {
        assert_eq!(Facing::from_sign(-3), Facing::Left);
        assert_eq!(Facing::from_sign(0), Facing::Right);
        assert_eq!(Facing::Left.sign(), -1);
        assert_eq!(Facing::Left.opposite(), Facing::Right);
    }
}
