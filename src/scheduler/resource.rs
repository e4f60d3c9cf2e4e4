//! Resource entity: one candidate address under speculative consideration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Resource hint mechanism, ordered roughly by increasing cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "dns-prefetch")]
    DnsPrefetch,
    #[serde(rename = "preconnect")]
    Preconnect,
    #[serde(rename = "modulepreload")]
    ModulePreload,
    #[serde(rename = "preload")]
    Preload,
    #[serde(rename = "prefetch")]
    Prefetch,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::DnsPrefetch,
        Method::Preconnect,
        Method::ModulePreload,
        Method::Preload,
        Method::Prefetch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::DnsPrefetch => "dns-prefetch",
            Method::Preconnect => "preconnect",
            Method::ModulePreload => "modulepreload",
            Method::Preload => "preload",
            Method::Prefetch => "prefetch",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "hint method",
                value: s.to_string(),
            })
    }
}

/// Scheduling priority. `Realtime` is served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Realtime,
    High,
    Normal,
    Low,
}

impl Priority {
    /// Ordinal used for sorting; lower rank sorts earlier.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Realtime => 0,
            Priority::High => 1,
            Priority::Normal => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Realtime => "realtime",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "realtime" => Ok(Priority::Realtime),
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(ParseEnumError {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Queued,
    Loading,
    Done,
    Skipped,
    AbortedManually,
}

impl State {
    /// Tie-break ordinal within equal priority: in-flight work first, `Done` last.
    pub fn rank(&self) -> u8 {
        match self {
            State::Loading => 0,
            State::Queued => 1,
            State::AbortedManually => 2,
            State::Skipped => 3,
            State::Done => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Done | State::Skipped | State::AbortedManually)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Queued => "queued",
            State::Loading => "loading",
            State::Done => "done",
            State::Skipped => "skipped",
            State::AbortedManually => "aborted_manually",
        }
    }

    /// Whether `self -> next` is a legal lifecycle transition.
    pub fn can_transition_to(&self, next: State) -> bool {
        match (self, next) {
            (State::Queued, State::Loading | State::Skipped) => true,
            (State::Loading, State::Done | State::Skipped) => true,
            (from, State::AbortedManually) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable view of a resource handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub address: String,
    pub method: Method,
    pub priority: Priority,
    pub state: State,
}

#[derive(Debug, Clone)]
pub struct Resource {
    address: String,
    method: Method,
    priority: Priority,
    priority_history: Vec<Priority>,
    state: State,
}

impl Resource {
    pub fn new(address: impl Into<String>, method: Method, priority: Priority) -> Self {
        Self {
            address: address.into(),
            method,
            priority,
            priority_history: Vec::new(),
            state: State::Queued,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn priority_history(&self) -> &[Priority] {
        &self.priority_history
    }

    pub fn is_available(&self) -> bool {
        self.state == State::Queued
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Sets a new priority, remembering the old one only when it differs.
    pub fn change_priority(&mut self, priority: Priority) -> bool {
        if priority == self.priority {
            return false;
        }
        self.priority_history.push(self.priority);
        self.priority = priority;
        true
    }

    /// Pops the last remembered priority. No-op on an empty history.
    pub fn restore_priority(&mut self) -> bool {
        match self.priority_history.pop() {
            Some(previous) => {
                self.priority = previous;
                true
            }
            None => false,
        }
    }

    /// Applies `next` if the lifecycle allows it; returns whether it did.
    pub fn transition(&mut self, next: State) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        true
    }

    pub(crate) fn sort_key(&self) -> (u8, u8) {
        (self.priority.rank(), self.state.rank())
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            address: self.address.clone(),
            method: self.method,
            priority: self.priority,
            state: self.state,
        }
    }
}
