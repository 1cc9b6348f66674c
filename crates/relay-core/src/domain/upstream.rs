//! # Upstream Events
//!
//! Events produced by the upstream sources (a filtered tweet stream and a
//! fixed-format trade feed) and their mapping onto [`Record`].

use crate::domain::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Author of a tweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetUser {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// A status as delivered by the stream client. Any piece may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetStatus {
    pub id: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user: Option<TweetUser>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Map a status onto a record.
///
/// Returns `None` (and logs why) when the creation date, the user, the
/// user's name or the text is missing. Empty strings are passed through.
pub fn format_tweet(status: &TweetStatus) -> Option<Record> {
    let Some(created_at) = status.created_at.as_deref() else {
        warn!(status_id = status.id, "Status has no creation date");
        return None;
    };
    let Some(user) = status.user.as_ref() else {
        warn!(status_id = status.id, "Status has no user");
        return None;
    };
    let Some(name) = user.name.as_deref() else {
        warn!(status_id = status.id, user_id = user.id, "Status user has no name");
        return None;
    };
    let Some(text) = status.text.as_deref() else {
        warn!(status_id = status.id, "Status has no text");
        return None;
    };

    Some(Record::new(created_at, name, text))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => f.write_str("BUY"),
            TradeSide::Sell => f.write_str("SELL"),
        }
    }
}

/// A fixed-format trade execution.
///
/// `price` is kept as the source's decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMessage {
    pub transact_time: String,
    pub account: String,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: u64,
    pub price: String,
}

/// Map a trade onto a record: `<SIDE> <qty> <symbol> @ <price>`.
#[must_use]
pub fn format_trade(trade: &TradeMessage) -> Record {
    Record::new(
        trade.transact_time.as_str(),
        trade.account.as_str(),
        format!(
            "{} {} {} @ {}",
            trade.side, trade.quantity, trade.symbol, trade.price
        ),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionNotice {
    pub status_id: u64,
    pub user_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StallWarning {
    pub code: String,
    pub message: String,
    pub percent_full: u32,
}

impl fmt::Display for StallWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}% full): {}",
            self.code, self.percent_full, self.message
        )
    }
}

/// One line of upstream input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Status(TweetStatus),
    Deletion(DeletionNotice),
    TrackLimitation { limited: u64 },
    StallWarning(StallWarning),
    ScrubGeo { user_id: u64, up_to_status_id: u64 },
    Trade(TradeMessage),
}

/// Default tracked terms.
pub const DEFAULT_TRACK_TERMS: [&str; 6] = [
    "#java",
    "#java8",
    "#Black Friday",
    "#Ashes cricket",
    "#python",
    "#Donald Trump",
];

/// Case-insensitive track filter.
///
/// A term matches when every one of its words occurs in the text. An empty
/// filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFilter {
    terms: Vec<Vec<String>>,
}

impl TrackFilter {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|term| {
                term.as_ref()
                    .split_whitespace()
                    .map(str::to_lowercase)
                    .collect::<Vec<_>>()
            })
            .filter(|words| !words.is_empty())
            .collect();
        Self { terms }
    }

    /// Filter with [`DEFAULT_TRACK_TERMS`].
    #[must_use]
    pub fn default_terms() -> Self {
        Self::new(DEFAULT_TRACK_TERMS)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        if self.terms.is_empty() {
            return true;
        }
        let text = text.to_lowercase();
        self.terms
            .iter()
            .any(|words| words.iter().all(|word| text.contains(word.as_str())))
    }
}
