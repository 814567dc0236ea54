//! Session/role gate shared by every protected page and XML endpoint.
//!
//! The gate never touches storage: the web layer resolves the session from the
//! cookie first, wraps it in a [`RequestContext`] together with the page
//! requirement, and only then asks the context to [`RequestContext::check`].

use std::fmt;

/// Global console privilege. Lower numbers are more privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum Level {
    Owner = 0,
    Master = 1,
    Administrator = 2,
    User = 3,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Owner, Level::Master, Level::Administrator, Level::User];

    pub fn rank(self) -> i16 {
        self as i16
    }

    pub fn from_rank(rank: i16) -> Option<Self> {
        match rank {
            0 => Some(Level::Owner),
            1 => Some(Level::Master),
            2 => Some(Level::Administrator),
            3 => Some(Level::User),
            _ => None,
        }
    }

    /// Whether a member holding `self` may enter a resource whose ceiling is `ceiling`.
    pub fn satisfies(self, ceiling: Level) -> bool {
        self.rank() <= ceiling.rank()
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::Owner => "Owner",
            Level::Master => "Master",
            Level::Administrator => "Administrator",
            Level::User => "User",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.rank())
    }
}

/// Per-channel authority granted by the bot (0 to 500, 500 being the channel owner).
///
/// Kept apart from [`Level`]: the two scales run in opposite directions and
/// must never be compared with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelLevel(u16);

impl ChannelLevel {
    pub const MAX: u16 = 500;
    pub const OWNER: ChannelLevel = ChannelLevel(500);

    pub fn new(value: i32) -> Option<Self> {
        u16::try_from(value)
            .ok()
            .filter(|value| *value <= Self::MAX)
            .map(ChannelLevel)
    }
}

impl fmt::Display for ChannelLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated member attached to a browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub member_id: i32,
    pub member_login: String,
    pub member_level: Level,
    pub member_level_description: String,
}

impl Session {
    pub fn has_identity(&self) -> bool {
        self.member_id > 0 && !self.member_login.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("no authenticated session")]
    Unauthenticated,
    #[error("member level {level} exceeds the required ceiling {required}")]
    InsufficientPrivilege { level: Level, required: Level },
}

/// Request-scoped view of who is asking and what the resource demands.
#[derive(Debug, Clone)]
pub struct RequestContext {
    session: Option<Session>,
    requirement: Option<Level>,
}

impl RequestContext {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session,
            requirement: None,
        }
    }

    pub fn require(mut self, ceiling: Level) -> Self {
        self.requirement = Some(ceiling);
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Runs the gate. The context is read-only, so repeated checks give the same answer
    /// and a denial stays a denial.
    pub fn check(&self) -> Result<&Session, AccessError> {
        let session = match self.session.as_ref() {
            Some(session) if session.has_identity() => session,
            _ => return Err(AccessError::Unauthenticated),
        };

        if let Some(required) = self.requirement {
            if !session.member_level.satisfies(required) {
                return Err(AccessError::InsufficientPrivilege {
                    level: session.member_level,
                    required,
                });
            }
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(level: Level) -> Session {
        Session {
            member_id: 7,
            member_login: "teuk".to_string(),
            member_level: level,
            member_level_description: level.label().to_string(),
        }
    }

    #[test]
    fn missing_session_is_unauthenticated_for_every_requirement() {
        for required in Level::ALL {
            let ctx = RequestContext::new(None).require(required);
            assert_eq!(ctx.check().unwrap_err(), AccessError::Unauthenticated);
        }
        let ctx = RequestContext::new(None);
        assert_eq!(ctx.check().unwrap_err(), AccessError::Unauthenticated);
    }

    #[test]
    fn blank_identity_is_unauthenticated() {
        let mut session = member(Level::Owner);
        session.member_login = "   ".to_string();
        let ctx = RequestContext::new(Some(session)).require(Level::User);
        assert_eq!(ctx.check().unwrap_err(), AccessError::Unauthenticated);

        let mut session = member(Level::Owner);
        session.member_id = 0;
        let ctx = RequestContext::new(Some(session));
        assert_eq!(ctx.check().unwrap_err(), AccessError::Unauthenticated);
    }

    #[test]
    fn passes_iff_level_within_ceiling() {
        for level in Level::ALL {
            for required in Level::ALL {
                let ctx = RequestContext::new(Some(member(level))).require(required);
                assert_eq!(
                    ctx.check().is_ok(),
                    level.rank() <= required.rank(),
                    "level {level} vs ceiling {required}"
                );
            }
        }
    }

    #[test]
    fn user_is_refused_master_pages() {
        let ctx = RequestContext::new(Some(member(Level::User))).require(Level::Master);
        assert_eq!(
            ctx.check().unwrap_err(),
            AccessError::InsufficientPrivilege {
                level: Level::User,
                required: Level::Master,
            }
        );
        assert!(ctx.session().is_some());
    }

    #[test]
    fn owner_and_administrator_pass_user_pages() {
        let ctx = RequestContext::new(Some(member(Level::Owner))).require(Level::User);
        assert!(ctx.check().is_ok());

        let ctx =
            RequestContext::new(Some(member(Level::Administrator))).require(Level::User);
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn no_requirement_only_checks_identity() {
        let ctx = RequestContext::new(Some(member(Level::User)));
        assert_eq!(ctx.check().map(|s| s.member_id), Ok(7));
    }

    #[test]
    fn repeated_checks_agree() {
        let ctx = RequestContext::new(Some(member(Level::Administrator))).require(Level::User);
        let first = ctx.check().map(|s| s.member_id);
        let second = ctx.check().map(|s| s.member_id);
        assert_eq!(first, second);
    }

    #[test]
    fn denial_sticks_across_repeated_checks() {
        let ctx = RequestContext::new(Some(member(Level::User))).require(Level::Master);
        let denied = AccessError::InsufficientPrivilege {
            level: Level::User,
            required: Level::Master,
        };
        assert_eq!(ctx.check().map(|s| s.member_id), Err(denied.clone()));
        assert_eq!(ctx.check().map(|s| s.member_id), Err(denied));
    }

    #[test]
    fn channel_levels_are_bounded() {
        assert_eq!(ChannelLevel::new(500), Some(ChannelLevel::OWNER));
        assert_eq!(ChannelLevel::new(501), None);
        assert_eq!(ChannelLevel::new(-1), None);
        assert!(ChannelLevel::new(400).unwrap() < ChannelLevel::OWNER);
    }
}
