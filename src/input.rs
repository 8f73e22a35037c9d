use bevy::input::keyboard::KeyCode;

/// The five driving actions the simulation understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveAction {
    Forward,
    Left,
    Right,
    Reverse,
    Handbrake,
}

impl DriveAction {
    /// Maps a normalised lowercase key identifier to an action.
    pub fn from_key(name: &str) -> Option<Self> {
        match name {
            "w" => Some(DriveAction::Forward),
            "a" => Some(DriveAction::Left),
            "d" => Some(DriveAction::Right),
            "s" => Some(DriveAction::Reverse),
            "space" | " " => Some(DriveAction::Handbrake),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Key { name: String, pressed: bool },
    FocusLost,
}

impl InputCommand {
    pub fn key(name: &str, pressed: bool) -> Self {
        InputCommand::Key {
            name: name.to_lowercase(),
            pressed,
        }
    }
}

/// Steady-state driving flags, read once per frame by the physics step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub forward: bool,
    pub left: bool,
    pub right: bool,
    pub reverse: bool,
    pub handbrake: bool,
    engaged: bool,
}

impl InputState {
    pub fn apply(&mut self, command: &InputCommand) {
        match command {
            InputCommand::Key { name, pressed } => self.set_key(name, *pressed),
            InputCommand::FocusLost => self.on_focus_lost(),
        }
    }

    /// Untracked keys are ignored.
    pub fn set_key(&mut self, name: &str, pressed: bool) {
        let action = match DriveAction::from_key(name) {
            Some(action) => action,
            None => return,
        };

        if pressed {
            self.engaged = true;
        }

        *self.flag_mut(action) = pressed;
    }

    pub fn on_focus_lost(&mut self) {
        self.forward = false;
        self.left = false;
        self.right = false;
        self.reverse = false;
        self.handbrake = false;
    }

    /// True once any driving key has been pressed.
    pub fn engaged(&self) -> bool {
        self.engaged
    }

    fn flag_mut(&mut self, action: DriveAction) -> &mut bool {
        match action {
            DriveAction::Forward => &mut self.forward,
            DriveAction::Left => &mut self.left,
            DriveAction::Right => &mut self.right,
            DriveAction::Reverse => &mut self.reverse,
            DriveAction::Handbrake => &mut self.handbrake,
        }
    }
}

/// Normalised identifier for a platform key code, if it is one we might care about.
pub fn key_name(code: KeyCode) -> Option<&'static str> {
    match code {
        KeyCode::W | KeyCode::Up => Some("w"),
        KeyCode::A | KeyCode::Left => Some("a"),
        KeyCode::S | KeyCode::Down => Some("s"),
        KeyCode::D | KeyCode::Right => Some("d"),
        KeyCode::Space => Some("space"),
        KeyCode::Escape => Some("escape"),
        _ => None,
    }
}
