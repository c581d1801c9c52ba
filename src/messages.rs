use serde::{Deserialize, Serialize};

use crate::room::{CardView, GameSnapshot, Player};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "createGame", rename_all = "camelCase")]
    CreateGame {
        #[serde(default)]
        room_id: Option<String>,
        player_name: String,
        #[serde(default)]
        timer_seconds: Option<i64>,
    },
    #[serde(rename = "joinGame", rename_all = "camelCase")]
    JoinGame {
        room_id: String,
        player_name: String,
    },
    #[serde(rename = "startGame", rename_all = "camelCase")]
    StartGame {
        room_id: String,
    },
    #[serde(rename = "revealClue", rename_all = "camelCase")]
    RevealClue {
        room_id: String,
    },
    #[serde(rename = "submitGuess", rename_all = "camelCase")]
    SubmitGuess {
        room_id: String,
        guess: String,
        #[serde(default)]
        player_id: Option<String>,
    },
    #[serde(rename = "nextCard", rename_all = "camelCase")]
    NextCard {
        room_id: String,
    },
    #[serde(rename = "leaveGame", rename_all = "camelCase")]
    LeaveGame {
        room_id: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "connected", rename_all = "camelCase")]
    Connected {
        player_id: String,
    },
    #[serde(rename = "gameCreated", rename_all = "camelCase")]
    GameCreated {
        room_id: String,
        player_id: String,
        is_host: bool,
        game: GameSnapshot,
    },
    #[serde(rename = "gameJoined", rename_all = "camelCase")]
    GameJoined {
        room_id: String,
        player_id: String,
        game: GameSnapshot,
    },
    #[serde(rename = "playerUpdate", rename_all = "camelCase")]
    PlayerUpdate {
        room_id: String,
        players: Vec<Player>,
    },
    #[serde(rename = "gameStarted", rename_all = "camelCase")]
    GameStarted {
        game: GameSnapshot,
        current_card_data: Option<CardView>,
    },
    #[serde(rename = "gameUpdate", rename_all = "camelCase")]
    GameUpdate {
        game: GameSnapshot,
        current_card_data: Option<CardView>,
    },
    #[serde(rename = "timerUpdate", rename_all = "camelCase")]
    TimerUpdate {
        room_id: String,
        time_left: u32,
    },
    #[serde(rename = "guessIncorrect", rename_all = "camelCase")]
    GuessIncorrect {
        room_id: String,
        message: String,
    },
    #[serde(rename = "error")]
    Error {
        code: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_game_accepts_optional_fields() {
        let full: ClientMessage = serde_json::from_value(json!({
            "type": "createGame",
            "roomId": "andromeda",
            "playerName": "Vera",
            "timerSeconds": 45
        }))
        .unwrap();
        assert_eq!(
            full,
            ClientMessage::CreateGame {
                room_id: Some("andromeda".to_string()),
                player_name: "Vera".to_string(),
                timer_seconds: Some(45),
            }
        );

        let minimal: ClientMessage =
            serde_json::from_value(json!({ "type": "createGame", "playerName": "Vera" })).unwrap();
        assert_eq!(
            minimal,
            ClientMessage::CreateGame {
                room_id: None,
                player_name: "Vera".to_string(),
                timer_seconds: None,
            }
        );
    }

    #[test]
    fn negative_timer_still_parses() {
        let message: ClientMessage = serde_json::from_value(json!({
            "type": "createGame",
            "playerName": "Vera",
            "timerSeconds": -5
        }))
        .unwrap();
        assert!(matches!(
            message,
            ClientMessage::CreateGame { timer_seconds: Some(-5), .. }
        ));
    }

    #[test]
    fn unknown_event_is_rejected() {
        let result = serde_json::from_value::<ClientMessage>(json!({ "type": "kickPlayer", "roomId": "x" }));
        assert!(result.is_err());
    }

    #[test]
    fn exhausted_deck_serializes_null_card() {
        let message = ServerMessage::GameUpdate {
            game: GameSnapshot {
                room_id: "orion".to_string(),
                players: vec![],
                current_round: 1,
                current_card: 3,
                revealed_clues: 0,
                started: true,
                timer_seconds: 30,
                time_left: None,
                timer_running: false,
            },
            current_card_data: None,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "gameUpdate");
        assert_eq!(value["currentCardData"], serde_json::Value::Null);
        assert_eq!(value["game"]["currentCard"], 3);
        assert_eq!(value["game"]["timeLeft"], serde_json::Value::Null);
    }

    #[test]
    fn timer_update_uses_camel_case() {
        let value = serde_json::to_value(ServerMessage::TimerUpdate {
            room_id: "orion".to_string(),
            time_left: 12,
        })
        .unwrap();
        assert_eq!(value, json!({ "type": "timerUpdate", "roomId": "orion", "timeLeft": 12 }));
    }
}
