use thiserror::Error;

/// Failures of a single client command. They are reported to the sending
/// connection only and never affect other rooms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Game not found")]
    NotFound(String),
    #[error("A game with id {0} already exists")]
    RoomExists(String),
    #[error("Player name must not be empty")]
    EmptyName,
    #[error("Timer must be a positive number of seconds, got {0}")]
    InvalidTimer(i64),
    #[error("Player {0} is not in this game")]
    PlayerNotFound(String),
    #[error("Already joined game {0}")]
    AlreadyInRoom(String),
    #[error("Wrong guess!")]
    IncorrectGuess { room_id: String },
    #[error("Malformed message: {0}")]
    Malformed(String),
}

impl GameError {
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotFound(_) => "not_found",
            GameError::RoomExists(_) => "room_exists",
            GameError::EmptyName => "empty_name",
            GameError::InvalidTimer(_) => "invalid_timer",
            GameError::PlayerNotFound(_) => "player_not_found",
            GameError::AlreadyInRoom(_) => "already_in_room",
            GameError::IncorrectGuess { .. } => "incorrect_guess",
            GameError::Malformed(_) => "malformed",
        }
    }
}
