use serde::{Deserialize, Serialize};

use crate::cards::{Card, Deck};
use crate::countdown::Countdown;

/// Points for a correct guess on the opening clue; each revealed clue costs one.
pub const CORRECT_GUESS_POINTS: i64 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub score: i64,
}

impl Player {
    pub fn new(id: String, name: String) -> Self {
        Player { id, name, score: 0 }
    }
}

/// The category and the clues revealed so far of the card in play.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub category: String,
    pub clues: Vec<String>,
    pub total_clues: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub room_id: String,
    pub players: Vec<Player>,
    pub current_round: u32,
    pub current_card: usize,
    pub revealed_clues: usize,
    pub started: bool,
    pub timer_seconds: u32,
    pub time_left: Option<u32>,
    pub timer_running: bool,
}

#[derive(Debug)]
pub struct Room {
    id: String,
    players: Vec<Player>,
    round: u32,
    card_index: usize,
    revealed_clues: usize,
    started: bool,
    timer_seconds: u32,
    time_left: Option<u32>,
    countdown: Option<Countdown>,
}

impl Room {
    pub fn new(id: String, host: Player, timer_seconds: u32) -> Self {
        Room {
            id,
            players: vec![host],
            round: 1,
            card_index: 0,
            revealed_clues: 0,
            started: false,
            timer_seconds,
            time_left: None,
            countdown: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let index = self.players.iter().position(|p| p.id == player_id)?;
        Some(self.players.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Returns `false` if the game was already running.
    pub fn start(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        true
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn card_index(&self) -> usize {
        self.card_index
    }

    pub fn revealed_clues(&self) -> usize {
        self.revealed_clues
    }

    pub fn current_card<'d>(&self, deck: &'d Deck) -> Option<&'d Card> {
        deck.get(self.card_index)
    }

    pub fn is_finished(&self, deck: &Deck) -> bool {
        self.card_index >= deck.len()
    }

    /// Reveals one more clue of the current card, never past the last one.
    pub fn reveal_clue(&mut self, deck: &Deck) -> bool {
        match self.current_card(deck) {
            Some(card) if self.revealed_clues < card.last_clue_index() => {
                self.revealed_clues += 1;
                true
            }
            _ => false,
        }
    }

    /// Not clamped: with more than four clues the award can drop to zero or below.
    pub fn points_for_guess(&self) -> i64 {
        CORRECT_GUESS_POINTS - i64::try_from(self.revealed_clues).unwrap_or(i64::MAX)
    }

    pub fn award(&mut self, player_id: &str, points: i64) -> bool {
        match self.players.iter_mut().find(|p| p.id == player_id) {
            Some(player) => {
                player.score += points;
                true
            }
            None => false,
        }
    }

    /// Moves to the next card. The running countdown is always cancelled
    /// before the card index changes so that a late tick cannot advance twice.
    pub fn advance_card(&mut self) {
        self.cancel_countdown();
        self.card_index += 1;
        self.revealed_clues = 0;
    }

    pub fn begin_countdown(&mut self, countdown: Countdown) -> u32 {
        self.countdown = Some(countdown);
        self.time_left = Some(self.timer_seconds);
        self.timer_seconds
    }

    /// Idempotent: cancelling with no countdown running is a no-op.
    pub fn cancel_countdown(&mut self) {
        self.countdown = None;
        self.time_left = None;
    }

    pub fn countdown_generation(&self) -> Option<u64> {
        self.countdown.as_ref().map(Countdown::generation)
    }

    pub fn has_countdown(&self) -> bool {
        self.countdown.is_some()
    }

    /// Counts one second off the running countdown and returns what is left.
    pub fn tick(&mut self) -> u32 {
        let left = self.time_left.unwrap_or(0).saturating_sub(1);
        self.time_left = Some(left);
        left
    }

    pub fn card_view(&self, deck: &Deck) -> Option<CardView> {
        self.current_card(deck).map(|card| CardView {
            category: card.category.clone(),
            clues: card.visible_clues(self.revealed_clues).to_vec(),
            total_clues: card.clues.len(),
        })
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            room_id: self.id.clone(),
            players: self.players.clone(),
            current_round: self.round,
            current_card: self.card_index,
            revealed_clues: self.revealed_clues,
            started: self.started,
            timer_seconds: self.timer_seconds,
            time_left: self.time_left,
            timer_running: self.countdown.is_some(),
        }
    }
}
