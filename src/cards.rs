use std::path::Path;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every card needs at least one clue to open with and one to reveal.
pub const MIN_CLUES: usize = 2;

const BUILTIN_DECK: &str = include_str!("../assets/cards.json");

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Failed to read deck file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse deck: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Deck contains no cards")]
    Empty,
    #[error("Card {answer:?} has {count} clues, at least {min} are required", min = MIN_CLUES)]
    TooFewClues { answer: String, count: usize },
    #[error("Card #{index} has an empty answer")]
    EmptyAnswer { index: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub category: String,
    pub clues: Vec<String>,
    pub answer: String,
}

impl Card {
    /// Case-insensitive exact comparison against the answer.
    pub fn is_correct(&self, guess: &str) -> bool {
        guess.to_lowercase() == self.answer.to_lowercase()
    }

    pub fn last_clue_index(&self) -> usize {
        self.clues.len().saturating_sub(1)
    }

    pub fn visible_clues(&self, revealed: usize) -> &[String] {
        let end = revealed.min(self.last_clue_index()) + 1;
        &self.clues[..end.min(self.clues.len())]
    }
}

/// The ordered, immutable card sequence shared by every room.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Arc<[Card]>,
}

impl Deck {
    pub fn from_cards(cards: Vec<Card>) -> Result<Self, DeckError> {
        if cards.is_empty() {
            return Err(DeckError::Empty);
        }

        for (index, card) in cards.iter().enumerate() {
            if card.answer.trim().is_empty() {
                return Err(DeckError::EmptyAnswer { index });
            }
            if card.clues.len() < MIN_CLUES {
                return Err(DeckError::TooFewClues {
                    answer: card.answer.clone(),
                    count: card.clues.len(),
                });
            }
        }

        Ok(Deck {
            cards: cards.into(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, DeckError> {
        let cards: Vec<Card> = serde_json::from_str(json)?;
        Self::from_cards(cards)
    }

    pub fn builtin() -> Result<Self, DeckError> {
        Self::from_json(BUILTIN_DECK)
    }

    pub async fn load(path: &Path) -> Result<Self, DeckError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DeckError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&json)
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
