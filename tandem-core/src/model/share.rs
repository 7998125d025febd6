use crate::model::session::{SessionId, SessionIdError};
use thiserror::Error;
use url::Url;

const SESSION_KEY: &str = "s";
const LEGACY_SESSION_KEY: &str = "session";
const TYPE_KEY: &str = "type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Offer,
    Answer,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareLinkError {
    #[error("link carries no session code")]
    MissingSession,
    #[error("invalid session code: {0}")]
    Session(#[from] SessionIdError),
    #[error("unknown link type {0:?}")]
    UnknownKind(String),
}

/// What travels between the two people: only the session code and which
/// half of the handshake it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub session_id: SessionId,
    pub kind: LinkKind,
}

impl ShareLink {
    pub fn offer(session_id: SessionId) -> Self {
        Self {
            session_id,
            kind: LinkKind::Offer,
        }
    }

    pub fn answer(session_id: SessionId) -> Self {
        Self {
            session_id,
            kind: LinkKind::Answer,
        }
    }

    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            query.append_pair(SESSION_KEY, self.session_id.as_str());
            if self.kind == LinkKind::Answer {
                query.append_pair(TYPE_KEY, "answer");
            }
        }
        url
    }

    /// Accepts a full link or a bare session code.
    pub fn parse(input: &str) -> Result<Self, ShareLinkError> {
        let input = input.trim();
        let Ok(url) = Url::parse(input) else {
            return Ok(Self::offer(input.parse()?));
        };

        let mut session = None;
        let mut legacy = None;
        let mut kind = LinkKind::Offer;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                SESSION_KEY => session = Some(value.into_owned()),
                LEGACY_SESSION_KEY => legacy = Some(value.into_owned()),
                TYPE_KEY => {
                    kind = match value.as_ref() {
                        "offer" => LinkKind::Offer,
                        "answer" => LinkKind::Answer,
                        other => return Err(ShareLinkError::UnknownKind(other.to_string())),
                    }
                }
                _ => {}
            }
        }

        let code = session.or(legacy).ok_or(ShareLinkError::MissingSession)?;
        Ok(Self {
            session_id: code.parse()?,
            kind,
        })
    }
}
