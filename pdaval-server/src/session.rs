//! Session management.

use std::net::SocketAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting requests.
    Active,
    /// BYE received, the connection closes after the reply is written.
    Closing,
}

/// A client session on the line protocol.
pub struct Session {
    /// Unique session ID.
    pub id: String,

    /// Remote address.
    pub remote_addr: SocketAddr,

    state: SessionState,

    request_count: u64,

    created_at: Instant,

    last_activity: Instant,
}

impl Session {
    /// Creates a new session.
    pub fn new(remote_addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4().to_string(),
            remote_addr,
            state: SessionState::Active,
            request_count: 0,
            created_at: now,
            last_activity: now,
        }
    }

    /// Returns the session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Sets the session state.
    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub fn is_closing(&self) -> bool {
        self.state == SessionState::Closing
    }

    /// Records a request.
    pub fn record_request(&mut self) {
        self.request_count += 1;
        self.last_activity = Instant::now();
    }

    /// Returns the request count.
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    /// Returns the time since last activity.
    pub fn idle_duration(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Returns the session age.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 12345)
    }

    #[test]
    fn test_session_creation() {
        let session = Session::new(test_addr());
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.request_count(), 0);
        assert!(!session.is_closing());
        assert_eq!(session.id.len(), 36);
    }

    #[test]
    fn test_record_request() {
        let mut session = Session::new(test_addr());
        session.record_request();
        session.record_request();
        assert_eq!(session.request_count(), 2);
        assert!(session.idle_duration() <= session.age());
    }

    #[test]
    fn test_closing() {
        let mut session = Session::new(test_addr());
        session.set_state(SessionState::Closing);
        assert!(session.is_closing());
    }

    #[test]
    fn test_unique_ids() {
        let a = Session::new(test_addr());
        let b = Session::new(test_addr());
        assert_ne!(a.id, b.id);
    }
}
