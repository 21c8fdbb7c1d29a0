//! Enumerated extractors.
//!
//! Which utterances and actions of a game feed vocabulary building, and which
//! (utterance, action) pairs become examples, is chosen by a named extractor
//! with parameters. The identifiers are plain data so they can be stored next
//! to a feature set as provenance.

use serde::{Deserialize, Serialize};

use crate::game::{Action, Event, Game, Utterance};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UtteranceExtractor {
    /// Every utterance in every round.
    #[default]
    All,
    /// Utterances whose sender matches.
    Sender { sender: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionExtractor {
    /// Every action in every round.
    #[default]
    All,
    /// Actions whose sender matches.
    Sender { sender: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PairExtractor {
    /// Per round, the first matching action that follows a matching utterance,
    /// paired with the latest matching utterance before it. At most one example
    /// per round.
    UtteranceThenAction {
        #[serde(default)]
        utterance_sender: Option<String>,
        #[serde(default)]
        action_sender: Option<String>,
    },
}

impl Default for PairExtractor {
    fn default() -> Self {
        PairExtractor::UtteranceThenAction {
            utterance_sender: None,
            action_sender: None,
        }
    }
}

fn sender_matches(filter: Option<&str>, sender: &str) -> bool {
    filter.map_or(true, |f| f == sender)
}

impl UtteranceExtractor {
    fn filter(&self) -> Option<&str> {
        match self {
            UtteranceExtractor::All => None,
            UtteranceExtractor::Sender { sender } => Some(sender.as_str()),
        }
    }

    pub fn extract<'a>(&self, game: &'a Game) -> Vec<&'a Utterance> {
        let f = self.filter();
        game.rounds
            .iter()
            .flat_map(|r| r.utterances())
            .filter(|u| sender_matches(f, &u.sender))
            .collect()
    }
}

impl ActionExtractor {
    fn filter(&self) -> Option<&str> {
        match self {
            ActionExtractor::All => None,
            ActionExtractor::Sender { sender } => Some(sender.as_str()),
        }
    }

    pub fn extract<'a>(&self, game: &'a Game) -> Vec<&'a Action> {
        let f = self.filter();
        game.rounds
            .iter()
            .flat_map(|r| r.actions())
            .filter(|a| sender_matches(f, &a.sender))
            .collect()
    }
}

/// One utterance-action pair at a game round.
#[derive(Debug, Clone, Copy)]
pub struct Example<'a> {
    pub game: &'a str,
    pub round: u32,
    pub utterance: &'a Utterance,
    pub action: &'a Action,
}

impl Example<'_> {
    /// `game_round`; unique as long as the extractor yields one pair per round.
    pub fn id(&self) -> String {
        format!("{}_{}", self.game, self.round)
    }
}

impl PairExtractor {
    pub fn extract<'a>(&self, game: &'a Game) -> Vec<Example<'a>> {
        let PairExtractor::UtteranceThenAction {
            utterance_sender,
            action_sender,
        } = self;

        let mut out = Vec::new();
        for r in &game.rounds {
            let mut last_utt: Option<&Utterance> = None;
            for e in &r.events {
                match e {
                    Event::Utterance(u) if sender_matches(utterance_sender.as_deref(), &u.sender) => {
                        last_utt = Some(u);
                    }
                    Event::Action(a) if sender_matches(action_sender.as_deref(), &a.sender) => {
                        if let Some(u) = last_utt {
                            out.push(Example {
                                game: &game.id,
                                round: r.round,
                                utterance: u,
                                action: a,
                            });
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        out
    }
}
