// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{text, details}` responses with typed error discriminators.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed error discriminator carried in `details.error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Registration
    InvalidName,
    NameTaken,
    RaceLost,
    RegistrationFailed,
    // Target validation
    NotFound,
    NotActive,
    InvalidRegistration,
    // Reservations
    Reserved,
    // Swarm
    AlreadyHaveClaim,
    AlreadyClaimed,
    NotClaimed,
    NotYourClaim,
    AlreadyCompleted,
    NoSpec,
    // Crew
    PlanExists,
    NoPlan,
    NoPrd,
    InvalidStatus,
    UnmetDependencies,
    DependencyNotFound,
    DependencyCycle,
    NoPlanner,
    NoWorker,
    NoReviewer,
    NoAnalyst,
    // Orchestration
    AnalystFailed,
    PlannerFailed,
    ReviewerFailed,
    AllScoutsFailed,
    // Locks
    Locked,
    // Router
    NotRegistered,
    UnknownAction,
    CrewChild,
    // Catch-all for I/O faults
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Render exactly as serialized so logs and wire output agree.
        match serde_json::to_value(self) {
            Ok(Value::String(s)) => f.write_str(&s),
            _ => f.write_str("unknown"),
        }
    }
}

/// Structured half of a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Details {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Every action returns one of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub text: String,
    #[serde(default)]
    pub details: Details,
}

impl ActionResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into(), details: Details::default() }
    }

    /// Success with structured data; `data` must serialize to an object.
    pub fn with(text: impl Into<String>, data: Value) -> Self {
        Self { text: text.into(), details: Details { error: None, data: into_map(data) } }
    }

    pub fn error(text: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            text: text.into(),
            details: Details { error: Some(code), data: Map::new() },
        }
    }

    /// Error with extra context fields.
    pub fn error_with(text: impl Into<String>, code: ErrorCode, data: Value) -> Self {
        Self {
            text: text.into(),
            details: Details { error: Some(code), data: into_map(data) },
        }
    }

    pub fn is_error(&self) -> bool {
        self.details.error.is_some()
    }
}

fn into_map(data: Value) -> Map<String, Value> {
    match data {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
