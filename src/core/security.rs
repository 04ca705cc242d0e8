//! Basic input, rate and session controls with a JSON-lines audit trail.
//!
//! These are demonstration controls, not production security. The manager is
//! constructed once per process and handed to whoever needs it; call sites
//! check inputs explicitly before doing any work.

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{warn, error};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

pub const DEFAULT_MAX_INPUT_LENGTH: usize = 1000;
pub const DEFAULT_RATE_WINDOW_SECS: f64 = 300.0;
const SESSION_TTL_SECS: f64 = 3600.0;
const SESSION_TOKEN_LEN: usize = 43;
const REPORT_WINDOW_SECS: f64 = 86_400.0;
const REPORT_EVENT_LIMIT: usize = 10;

/// Substrings rejected by `validate_input`, matched case-insensitively
pub const DANGEROUS_PATTERNS: &[&str] = &[
    "';", "--", "/*", "*/", "xp_", "sp_", "drop table",
    "delete from", "insert into", "update set", "<script",
    "javascript:", "onload=", "onerror=",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityEvent {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub event_type: String,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    expires: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityReport {
    pub blocked_identifiers: usize,
    pub active_sessions: usize,
    pub recent_security_events: usize,
    pub event_types: Vec<String>,
    pub last_24h_events: Vec<SecurityEvent>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ControlStatus {
    Basic,
    NotImplemented,
}

impl ControlStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ControlStatus::Basic => "BASIC",
            ControlStatus::NotImplemented => "NOT IMPLEMENTED",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OwaspCheck {
    pub id: &'static str,
    pub status: ControlStatus,
    pub notes: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum SecurityGrade {
    Critical,
    Warning,
    Good,
}

/// Grade for a count of partially implemented controls
pub fn grade(implemented: usize) -> SecurityGrade {
    if implemented < 3 {
        SecurityGrade::Critical
    } else if implemented < 7 {
        SecurityGrade::Warning
    } else {
        SecurityGrade::Good
    }
}

/// OWASP Top 10 coverage of this tool
pub fn owasp_checklist() -> Vec<OwaspCheck> {
    use ControlStatus::*;
    let check = |id, status, notes| OwaspCheck { id, status, notes };

    vec![
        check("A01_Broken_Access_Control", Basic, "Basic session management implemented"),
        check("A02_Cryptographic_Failures", NotImplemented, "No encryption for sensitive data"),
        check("A03_Injection", Basic, "Basic input validation implemented"),
        check("A04_Insecure_Design", NotImplemented, "No security by design principles"),
        check("A05_Security_Misconfiguration", NotImplemented, "No security configuration management"),
        check("A06_Vulnerable_Components", NotImplemented, "No dependency scanning"),
        check("A07_Authentication_Failures", NotImplemented, "No proper authentication system"),
        check("A08_Software_Integrity_Failures", NotImplemented, "No integrity checks"),
        check("A09_Logging_Failures", Basic, "Basic security logging implemented"),
        check("A10_Server_Side_Request_Forgery", NotImplemented, "No SSRF protection"),
    ]
}

/// Hex-encoded SHA-256 of `data`
pub fn secure_hash(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[derive(Debug)]
pub struct SecurityManager {
    audit_path: Option<PathBuf>,
    attempts: HashMap<String, Vec<f64>>,
    blocked: HashSet<String>,
    /// Keyed by `secure_hash(token)`
    sessions: HashMap<String, Session>,
    audit_log: Vec<SecurityEvent>,
}

impl SecurityManager {
    /// Manager that appends every event to `audit_path`. Events already in
    /// the file are loaded so reports span earlier runs.
    pub fn new(audit_path: PathBuf) -> Self {
        let audit_log = match fs::read_to_string(&audit_path) {
            Ok(contents) => contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| match serde_json::from_str(line) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!("Skipping malformed audit entry: {}", e);
                        None
                    }
                })
                .collect(),
            Err(_) => Vec::new(),
        };

        Self {
            audit_path: Some(audit_path),
            audit_log,
            ..Self::in_memory()
        }
    }

    /// Manager that keeps events in memory only
    pub fn in_memory() -> Self {
        Self {
            audit_path: None,
            attempts: HashMap::new(),
            blocked: HashSet::new(),
            sessions: HashMap::new(),
            audit_log: Vec::new(),
        }
    }

    /// Reject empty, oversized, or denylisted input. Anything else is accepted.
    pub fn validate_input(&mut self, input: &str, max_length: usize) -> bool {
        if input.is_empty() {
            return false;
        }

        let length = input.chars().count();
        if length > max_length {
            self.log_security_event("input_too_long", json!({"length": length}));
            return false;
        }

        let lowered = input.to_lowercase();
        if let Some(pattern) = DANGEROUS_PATTERNS.iter().find(|p| lowered.contains(*p)) {
            self.log_security_event("potential_injection", json!({"pattern": pattern}));
            return false;
        }

        true
    }

    /// Record an attempt for `identifier`; false once `max_attempts` fall inside the window.
    pub fn rate_limit(&mut self, identifier: &str, max_attempts: usize, window_secs: f64) -> bool {
        self.rate_limit_at(identifier, max_attempts, window_secs, now_secs())
    }

    fn rate_limit_at(&mut self, identifier: &str, max_attempts: usize, window_secs: f64, now: f64) -> bool {
        let attempts = self.attempts.entry(identifier.to_string()).or_default();
        attempts.retain(|t| now - *t < window_secs);

        if attempts.len() >= max_attempts {
            self.blocked.insert(identifier.to_string());
            self.log_security_event("rate_limit_exceeded", json!({"identifier": identifier}));
            return false;
        }

        attempts.push(now);
        true
    }

    pub fn generate_session_token(&mut self, user_id: &str) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_TOKEN_LEN)
            .map(char::from)
            .collect();

        self.sessions.insert(secure_hash(&token), Session {
            user_id: user_id.to_string(),
            expires: now_secs() + SESSION_TTL_SECS,
        });
        token
    }

    /// User id for a live session; expired sessions are dropped
    pub fn validate_session(&mut self, token: &str) -> Option<String> {
        self.validate_session_at(token, now_secs())
    }

    fn validate_session_at(&mut self, token: &str, now: f64) -> Option<String> {
        let key = secure_hash(token);
        let session = self.sessions.get(&key)?;

        if now > session.expires {
            self.sessions.remove(&key);
            return None;
        }
        Some(session.user_id.clone())
    }

    pub fn log_security_event(&mut self, event_type: &str, details: serde_json::Value) {
        let event = SecurityEvent {
            timestamp: now_secs(),
            event_type: event_type.to_string(),
            details,
        };
        warn!("Security event: {} - {}", event.event_type, event.details);

        if let Some(path) = &self.audit_path {
            if let Err(e) = append_json_line(path, &event) {
                error!("Failed to write security audit log {}: {}", path.display(), e);
            }
        }
        self.audit_log.push(event);
    }

    pub fn security_report(&self) -> SecurityReport {
        let now = now_secs();
        let recent: Vec<&SecurityEvent> = self
            .audit_log
            .iter()
            .filter(|e| now - e.timestamp < REPORT_WINDOW_SECS)
            .collect();

        let mut event_types: Vec<String> = recent.iter().map(|e| e.event_type.clone()).collect();
        event_types.sort();
        event_types.dedup();

        let skip = recent.len().saturating_sub(REPORT_EVENT_LIMIT);
        SecurityReport {
            blocked_identifiers: self.blocked.len(),
            active_sessions: self.sessions.len(),
            recent_security_events: recent.len(),
            event_types,
            last_24h_events: recent.into_iter().skip(skip).cloned().collect(),
        }
    }
}

fn append_json_line(path: &PathBuf, event: &SecurityEvent) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", serde_json::to_string(event)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn plain_questions_pass_validation() {
        let mut manager = SecurityManager::in_memory();
        assert!(manager.validate_input("What causes tire defects?", DEFAULT_MAX_INPUT_LENGTH));
        assert!(manager.security_report().event_types.is_empty());
    }

    #[test]
    fn injection_attempts_are_blocked_and_logged() {
        let mut manager = SecurityManager::in_memory();
        assert!(!manager.validate_input("'; DROP TABLE users; --", DEFAULT_MAX_INPUT_LENGTH));
        assert!(!manager.validate_input("<SCRIPT>alert(1)</script>", DEFAULT_MAX_INPUT_LENGTH));

        let report = manager.security_report();
        assert_eq!(report.recent_security_events, 2);
        assert_eq!(report.event_types, vec!["potential_injection"]);
        assert_eq!(report.last_24h_events[0].details["pattern"], "';");
    }

    #[test]
    fn empty_and_oversized_input_rejected() {
        let mut manager = SecurityManager::in_memory();
        assert!(!manager.validate_input("", 10));
        assert!(!manager.validate_input("this is far too long", 10));
        assert_eq!(manager.security_report().event_types, vec!["input_too_long"]);
    }

    #[test]
    fn rate_limit_blocks_after_max_attempts() {
        let mut manager = SecurityManager::in_memory();
        let results: Vec<bool> = (0..5)
            .map(|i| manager.rate_limit_at("query", 3, 300.0, 1000.0 + i as f64))
            .collect();

        assert_eq!(results, vec![true, true, true, false, false]);
        assert_eq!(manager.security_report().blocked_identifiers, 1);
    }

    #[test]
    fn rate_limit_window_slides() {
        let mut manager = SecurityManager::in_memory();
        assert!(manager.rate_limit_at("query", 1, 300.0, 0.0));
        assert!(!manager.rate_limit_at("query", 1, 300.0, 10.0));
        assert!(manager.rate_limit_at("query", 1, 300.0, 400.0));
    }

    #[test]
    fn sessions_expire() {
        let mut manager = SecurityManager::in_memory();
        let token = manager.generate_session_token("operator-7");
        assert_eq!(token.len(), SESSION_TOKEN_LEN);

        assert_eq!(manager.validate_session(&token).as_deref(), Some("operator-7"));
        assert_eq!(manager.validate_session("not-a-token"), None);

        assert_eq!(manager.validate_session_at(&token, now_secs() + SESSION_TTL_SECS + 1.0), None);
        assert_eq!(manager.security_report().active_sessions, 0);
    }

    #[test]
    fn audit_log_is_json_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data/logs/security.json");
        let mut manager = SecurityManager::new(path.clone());

        manager.validate_input("1 -- 2", 100);
        manager.validate_input("x".repeat(20).as_str(), 10);

        let contents = fs::read_to_string(&path).unwrap();
        let events: Vec<SecurityEvent> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "potential_injection");
        assert_eq!(events[1].details["length"], 20);
    }

    #[test]
    fn earlier_audit_events_are_reloaded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("security.json");
        SecurityManager::new(path.clone()).validate_input("drop table tires", 100);
        fs::write(&path, format!("{}not json\n", fs::read_to_string(&path).unwrap())).unwrap();

        let report = SecurityManager::new(path).security_report();
        assert_eq!(report.recent_security_events, 1);
        assert_eq!(report.event_types, vec!["potential_injection"]);
    }

    #[test]
    fn checklist_scores_three_basic_controls() {
        let checks = owasp_checklist();
        let implemented = checks.iter().filter(|c| c.status == ControlStatus::Basic).count();

        assert_eq!(checks.len(), 10);
        assert_eq!(implemented, 3);
        assert_eq!(grade(implemented), SecurityGrade::Warning);
        assert_eq!(grade(2), SecurityGrade::Critical);
        assert_eq!(grade(7), SecurityGrade::Good);
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            secure_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
