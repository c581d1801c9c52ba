use std::collections::HashMap;
use log::{debug, info, warn};
use rand::{distributions::Alphanumeric, Rng};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::cards::Deck;
use crate::countdown::Countdown;
use crate::error::GameError;
use crate::messages::{ClientMessage, ServerMessage};
use crate::room::{GameSnapshot, Player, Room};

pub type ConnectionId = String;
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

const ROOM_ID_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    pub default_timer_seconds: u32,
    pub min_timer_seconds: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        GameSettings {
            default_timer_seconds: 30,
            min_timer_seconds: 10,
        }
    }
}

enum Command {
    Connect {
        connection_id: ConnectionId,
        outbox: Outbox,
    },
    Client {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    Reject {
        connection_id: ConnectionId,
        error: GameError,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    Tick {
        room_id: String,
        generation: u64,
    },
    Inspect {
        room_id: String,
        reply: oneshot::Sender<Option<GameSnapshot>>,
    },
    RoomCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable entry point to the coordinator task. All room state lives in
/// that task and is only reachable through these calls.
#[derive(Clone)]
pub struct CoordinatorHandle {
    inbox: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    pub fn spawn(deck: Deck, settings: GameSettings) -> Self {
        let (inbox, commands) = mpsc::unbounded_channel();
        let coordinator = Coordinator::new(deck, settings, inbox.clone());
        tokio::spawn(coordinator.run(commands));
        CoordinatorHandle { inbox }
    }

    /// Registers a new connection and returns its id together with the
    /// stream of messages addressed to it.
    pub fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let connection_id = Uuid::new_v4().to_string();
        let (outbox, messages) = mpsc::unbounded_channel();
        self.send(Command::Connect {
            connection_id: connection_id.clone(),
            outbox,
        });
        (connection_id, messages)
    }

    pub fn dispatch(&self, connection_id: &str, message: ClientMessage) {
        self.send(Command::Client {
            connection_id: connection_id.to_string(),
            message,
        });
    }

    pub fn reject(&self, connection_id: &str, error: GameError) {
        self.send(Command::Reject {
            connection_id: connection_id.to_string(),
            error,
        });
    }

    pub fn disconnect(&self, connection_id: &str) {
        self.send(Command::Disconnect {
            connection_id: connection_id.to_string(),
        });
    }

    /// Snapshot of a room after every previously sent command has been handled.
    pub async fn snapshot(&self, room_id: &str) -> Option<GameSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Inspect {
            room_id: room_id.to_string(),
            reply,
        });
        response.await.ok().flatten()
    }

    pub async fn room_count(&self) -> usize {
        let (reply, response) = oneshot::channel();
        self.send(Command::RoomCount { reply });
        response.await.unwrap_or(0)
    }

    fn send(&self, command: Command) {
        if self.inbox.send(command).is_err() {
            warn!("Coordinator is no longer running");
        }
    }
}

struct Coordinator {
    rooms: HashMap<String, Room>,
    connections: HashMap<ConnectionId, Outbox>,
    deck: Deck,
    settings: GameSettings,
    inbox: mpsc::UnboundedSender<Command>,
    next_generation: u64,
}

impl Coordinator {
    fn new(deck: Deck, settings: GameSettings, inbox: mpsc::UnboundedSender<Command>) -> Self {
        Coordinator {
            rooms: HashMap::new(),
            connections: HashMap::new(),
            deck,
            settings,
            inbox,
            next_generation: 1,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Connect {
                connection_id,
                outbox,
            } => {
                debug!("Connection {connection_id} registered");
                let _ = outbox.send(ServerMessage::Connected {
                    player_id: connection_id.clone(),
                });
                self.connections.insert(connection_id, outbox);
            }
            Command::Client {
                connection_id,
                message,
            } => {
                if let Err(error) = self.handle_client_message(&connection_id, message) {
                    self.report(&connection_id, error);
                }
            }
            Command::Reject {
                connection_id,
                error,
            } => self.report(&connection_id, error),
            Command::Disconnect { connection_id } => self.handle_disconnect(&connection_id),
            Command::Tick {
                room_id,
                generation,
            } => self.handle_tick(&room_id, generation),
            Command::Inspect { room_id, reply } => {
                let _ = reply.send(self.rooms.get(&room_id).map(Room::snapshot));
            }
            Command::RoomCount { reply } => {
                let _ = reply.send(self.rooms.len());
            }
        }
    }

    fn handle_client_message(
        &mut self,
        connection_id: &str,
        message: ClientMessage,
    ) -> Result<(), GameError> {
        match message {
            ClientMessage::CreateGame {
                room_id,
                player_name,
                timer_seconds,
            } => self.create_game(connection_id, room_id, &player_name, timer_seconds),
            ClientMessage::JoinGame {
                room_id,
                player_name,
            } => self.join_game(connection_id, &room_id, &player_name),
            ClientMessage::StartGame { room_id } => self.start_game(&room_id),
            ClientMessage::RevealClue { room_id } => self.reveal_clue(&room_id),
            ClientMessage::SubmitGuess {
                room_id,
                guess,
                player_id,
            } => {
                let scorer = player_id.unwrap_or_else(|| connection_id.to_string());
                self.submit_guess(&room_id, &guess, &scorer)
            }
            ClientMessage::NextCard { room_id } => self.next_card(connection_id, &room_id),
            ClientMessage::LeaveGame { room_id } => self.leave_game(connection_id, &room_id),
        }
    }

    fn create_game(
        &mut self,
        connection_id: &str,
        room_id: Option<String>,
        player_name: &str,
        timer_seconds: Option<i64>,
    ) -> Result<(), GameError> {
        let name = validate_name(player_name)?;
        let timer_seconds = self.resolve_timer(timer_seconds)?;
        let room_id = match room_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => self.generate_room_id(),
        };
        if self.rooms.contains_key(&room_id) {
            return Err(GameError::RoomExists(room_id));
        }

        info!("Creating game {room_id} for {name} with timer {timer_seconds}s");
        let host = Player::new(connection_id.to_string(), name);
        let room = Room::new(room_id.clone(), host, timer_seconds);
        self.send_to(
            connection_id,
            ServerMessage::GameCreated {
                room_id: room_id.clone(),
                player_id: connection_id.to_string(),
                is_host: true,
                game: room.snapshot(),
            },
        );
        self.rooms.insert(room_id.clone(), room);
        self.broadcast_players(&room_id);
        Ok(())
    }

    fn join_game(
        &mut self,
        connection_id: &str,
        room_id: &str,
        player_name: &str,
    ) -> Result<(), GameError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::NotFound(room_id.to_string()))?;
        let name = validate_name(player_name)?;
        if room.has_player(connection_id) {
            return Err(GameError::AlreadyInRoom(room_id.to_string()));
        }

        info!("Player {name} joining game {room_id}");
        room.add_player(Player::new(connection_id.to_string(), name));
        let game = room.snapshot();
        self.send_to(
            connection_id,
            ServerMessage::GameJoined {
                room_id: room_id.to_string(),
                player_id: connection_id.to_string(),
                game,
            },
        );
        self.broadcast_players(room_id);
        Ok(())
    }

    fn start_game(&mut self, room_id: &str) -> Result<(), GameError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::NotFound(room_id.to_string()))?;
        if !room.start() {
            debug!("Game {room_id} already started, ignoring");
            return Ok(());
        }

        info!("Game {room_id} started");
        let message = ServerMessage::GameStarted {
            game: room.snapshot(),
            current_card_data: room.card_view(&self.deck),
        };
        self.broadcast(room_id, &message);
        self.start_countdown(room_id);
        Ok(())
    }

    fn reveal_clue(&mut self, room_id: &str) -> Result<(), GameError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::NotFound(room_id.to_string()))?;
        if !room.is_started() || !room.reveal_clue(&self.deck) {
            debug!("Nothing to reveal in game {room_id}");
            return Ok(());
        }

        debug!(
            "Revealing clue {} for game {room_id}",
            room.revealed_clues() + 1
        );
        self.broadcast_card_state(room_id);
        Ok(())
    }

    fn submit_guess(&mut self, room_id: &str, guess: &str, scorer: &str) -> Result<(), GameError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::NotFound(room_id.to_string()))?;
        if !room.is_started() {
            debug!("Guess for game {room_id} before start, ignoring");
            return Ok(());
        }
        let Some(card) = room.current_card(&self.deck) else {
            debug!("Guess for finished game {room_id}, ignoring");
            return Ok(());
        };
        if !room.has_player(scorer) {
            return Err(GameError::PlayerNotFound(scorer.to_string()));
        }
        if !card.is_correct(guess) {
            return Err(GameError::IncorrectGuess {
                room_id: room_id.to_string(),
            });
        }

        room.cancel_countdown();
        let points = room.points_for_guess();
        room.award(scorer, points);
        info!("Player {scorer} scored {points} in game {room_id}");
        room.advance_card();

        self.broadcast_card_state(room_id);
        self.broadcast_players(room_id);
        self.start_countdown(room_id);
        Ok(())
    }

    fn next_card(&mut self, connection_id: &str, room_id: &str) -> Result<(), GameError> {
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::NotFound(room_id.to_string()))?;
        if !room.has_player(connection_id) {
            return Err(GameError::PlayerNotFound(connection_id.to_string()));
        }
        if !room.is_started() || room.is_finished(&self.deck) {
            debug!("Nothing to skip in game {room_id}");
            return Ok(());
        }

        info!("Skipping card {} in game {room_id}", room.card_index());
        room.advance_card();
        self.broadcast_card_state(room_id);
        self.start_countdown(room_id);
        Ok(())
    }

    fn leave_game(&mut self, connection_id: &str, room_id: &str) -> Result<(), GameError> {
        let room = self
            .rooms
            .get(room_id)
            .ok_or_else(|| GameError::NotFound(room_id.to_string()))?;
        if !room.has_player(connection_id) {
            return Err(GameError::PlayerNotFound(connection_id.to_string()));
        }
        self.remove_from_room(connection_id, room_id);
        Ok(())
    }

    fn handle_disconnect(&mut self, connection_id: &str) {
        let joined: Vec<String> = self
            .rooms
            .values()
            .filter(|room| room.has_player(connection_id))
            .map(|room| room.id().to_string())
            .collect();

        for room_id in joined {
            self.remove_from_room(connection_id, &room_id);
        }

        self.connections.remove(connection_id);
        debug!("Connection {connection_id} disconnected");
    }

    fn remove_from_room(&mut self, connection_id: &str, room_id: &str) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        let Some(player) = room.remove_player(connection_id) else {
            return;
        };
        info!("Player {} left game {room_id}", player.name);

        if room.is_empty() {
            // Dropping the room drops its countdown, which aborts the tick task.
            self.rooms.remove(room_id);
            info!("Game {room_id} closed");
        } else {
            self.broadcast_players(room_id);
        }
    }

    fn handle_tick(&mut self, room_id: &str, generation: u64) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        if room.countdown_generation() != Some(generation) {
            debug!("Discarding stale tick {generation} for game {room_id}");
            return;
        }

        let time_left = room.tick();
        self.broadcast(
            room_id,
            &ServerMessage::TimerUpdate {
                room_id: room_id.to_string(),
                time_left,
            },
        );

        if time_left == 0 {
            if let Some(room) = self.rooms.get_mut(room_id) {
                info!("Time is up on card {} in game {room_id}", room.card_index());
                room.advance_card();
            }
            self.broadcast_card_state(room_id);
            self.start_countdown(room_id);
        }
    }

    /// Starts a fresh countdown unless the room is gone, finished or already ticking.
    fn start_countdown(&mut self, room_id: &str) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };
        if room.has_countdown() || room.is_finished(&self.deck) {
            return;
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        let inbox = self.inbox.clone();
        let tick_room = room_id.to_string();
        let countdown = Countdown::spawn(generation, move |generation| {
            inbox
                .send(Command::Tick {
                    room_id: tick_room.clone(),
                    generation,
                })
                .is_ok()
        });
        let time_left = room.begin_countdown(countdown);

        self.broadcast(
            room_id,
            &ServerMessage::TimerUpdate {
                room_id: room_id.to_string(),
                time_left,
            },
        );
    }

    fn resolve_timer(&self, timer_seconds: Option<i64>) -> Result<u32, GameError> {
        match timer_seconds {
            None => Ok(self.settings.default_timer_seconds),
            Some(seconds) if seconds <= 0 => Err(GameError::InvalidTimer(seconds)),
            Some(seconds) => Ok(u32::try_from(seconds)
                .unwrap_or(u32::MAX)
                .max(self.settings.min_timer_seconds)),
        }
    }

    fn generate_room_id(&self) -> String {
        loop {
            let id: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(ROOM_ID_LENGTH)
                .map(|b| char::from(b).to_ascii_uppercase())
                .collect();
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }

    fn report(&self, connection_id: &str, error: GameError) {
        debug!("Rejecting command from {connection_id}: {error}");
        let message = match error {
            GameError::IncorrectGuess { ref room_id } => ServerMessage::GuessIncorrect {
                room_id: room_id.clone(),
                message: error.to_string(),
            },
            _ => ServerMessage::Error {
                code: error.code().to_string(),
                message: error.to_string(),
            },
        };
        self.send_to(connection_id, message);
    }

    fn broadcast_card_state(&self, room_id: &str) {
        if let Some(room) = self.rooms.get(room_id) {
            let message = ServerMessage::GameUpdate {
                game: room.snapshot(),
                current_card_data: room.card_view(&self.deck),
            };
            self.broadcast(room_id, &message);
        }
    }

    fn broadcast_players(&self, room_id: &str) {
        if let Some(room) = self.rooms.get(room_id) {
            let message = ServerMessage::PlayerUpdate {
                room_id: room_id.to_string(),
                players: room.players().to_vec(),
            };
            self.broadcast(room_id, &message);
        }
    }

    fn broadcast(&self, room_id: &str, message: &ServerMessage) {
        if let Some(room) = self.rooms.get(room_id) {
            for player in room.players() {
                self.send_to(&player.id, message.clone());
            }
        }
    }

    fn send_to(&self, connection_id: &str, message: ServerMessage) {
        if let Some(outbox) = self.connections.get(connection_id) {
            let _ = outbox.send(message);
        }
    }
}

fn validate_name(player_name: &str) -> Result<String, GameError> {
    let name = player_name.trim();
    if name.is_empty() {
        return Err(GameError::EmptyName);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;

    fn deck() -> Deck {
        let card = |answer: &str| Card {
            category: "planet".to_string(),
            clues: vec!["first".to_string(), "second".to_string()],
            answer: answer.to_string(),
        };
        Deck::from_cards(vec![card("Mars"), card("Venus"), card("Saturn")]).unwrap()
    }

    fn coordinator() -> Coordinator {
        let (inbox, _commands) = mpsc::unbounded_channel();
        Coordinator::new(deck(), GameSettings::default(), inbox)
    }

    fn connect(coordinator: &mut Coordinator, id: &str) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (outbox, messages) = mpsc::unbounded_channel();
        coordinator.handle(Command::Connect {
            connection_id: id.to_string(),
            outbox,
        });
        messages
    }

    fn client(coordinator: &mut Coordinator, id: &str, message: ClientMessage) {
        coordinator.handle(Command::Client {
            connection_id: id.to_string(),
            message,
        });
    }

    fn started_room(coordinator: &mut Coordinator) {
        client(
            coordinator,
            "host",
            ClientMessage::CreateGame {
                room_id: Some("orion".to_string()),
                player_name: "Vera".to_string(),
                timer_seconds: Some(10),
            },
        );
        client(
            coordinator,
            "host",
            ClientMessage::StartGame {
                room_id: "orion".to_string(),
            },
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_tick_after_guess_is_discarded() {
        let mut coordinator = coordinator();
        let _messages = connect(&mut coordinator, "host");
        started_room(&mut coordinator);

        let stale = coordinator.rooms["orion"].countdown_generation().unwrap();
        client(
            &mut coordinator,
            "host",
            ClientMessage::SubmitGuess {
                room_id: "orion".to_string(),
                guess: "mars".to_string(),
                player_id: None,
            },
        );
        let fresh = coordinator.rooms["orion"].countdown_generation().unwrap();
        assert_ne!(stale, fresh);

        coordinator.handle(Command::Tick {
            room_id: "orion".to_string(),
            generation: stale,
        });
        let snapshot = coordinator.rooms["orion"].snapshot();
        assert_eq!(snapshot.current_card, 1);
        assert_eq!(snapshot.time_left, Some(10));
        assert_eq!(snapshot.players[0].score, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_count_down_and_expire_into_next_card() {
        let mut coordinator = coordinator();
        let _messages = connect(&mut coordinator, "host");
        started_room(&mut coordinator);

        for expected in (0..10).rev() {
            let generation = coordinator.rooms["orion"].countdown_generation().unwrap();
            coordinator.handle(Command::Tick {
                room_id: "orion".to_string(),
                generation,
            });
            if expected > 0 {
                assert_eq!(coordinator.rooms["orion"].snapshot().time_left, Some(expected));
            }
        }

        let snapshot = coordinator.rooms["orion"].snapshot();
        assert_eq!(snapshot.current_card, 1);
        assert_eq!(snapshot.time_left, Some(10));
        assert!(snapshot.timer_running);
        assert_eq!(snapshot.players[0].score, 0);
    }

    #[test]
    fn timer_policy() {
        let coordinator = coordinator();
        assert_eq!(coordinator.resolve_timer(None), Ok(30));
        assert_eq!(coordinator.resolve_timer(Some(3)), Ok(10));
        assert_eq!(coordinator.resolve_timer(Some(45)), Ok(45));
        assert_eq!(coordinator.resolve_timer(Some(0)), Err(GameError::InvalidTimer(0)));
        assert_eq!(coordinator.resolve_timer(Some(-4)), Err(GameError::InvalidTimer(-4)));
    }

    #[test]
    fn generated_room_ids_are_short_and_uppercase() {
        let id = coordinator().generate_room_id();
        assert_eq!(id.len(), ROOM_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
