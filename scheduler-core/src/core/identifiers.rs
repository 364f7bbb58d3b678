// scheduler-core/src/core/identifiers.rs
// ============================================================================
// Module: Fleet Scheduler Identifiers
// Description: Canonical identifiers for environments, clusters, instances,
//              tasks, and deployments, with shape validation at the edges.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the string-based identifiers used throughout the
//! scheduler. Most identifiers are opaque wrappers; `ClusterRef`,
//! `InstanceArn`, `TaskArn`, and `TaskDefinitionArn` additionally recognise
//! their expected shape at construction time, since the engine treats
//! malformed identifiers as a `bad-request` rather than deferring the
//! failure to a downstream facade call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Shape Validation
// ============================================================================

/// Errors returned when an identifier fails shape validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Identifier was empty after trimming.
    #[error("identifier is empty")]
    Empty,
    /// Identifier exceeded the maximum allowed length.
    #[error("identifier exceeds maximum length of {max}")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// A bare name contained characters reserved for ARN shapes (`/`, `:`).
    #[error("name contains reserved characters: {0}")]
    ReservedChars(String),
    /// Value looked like an ARN but did not match the expected resource shape.
    #[error("invalid arn shape for resource type `{1}`: {0}")]
    InvalidArnShape(String, &'static str),
}

const MAX_IDENTIFIER_LEN: usize = 256;

/// Validates a bare name: non-empty, bounded length, no `/` or `:`.
fn validate_name(value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong { max: MAX_IDENTIFIER_LEN });
    }
    if value.contains('/') || value.contains(':') {
        return Err(IdentifierError::ReservedChars(value.to_string()));
    }
    Ok(())
}

/// Validates an ARN-shaped value of the form
/// `arn:<partition>:ecs:<region>:<account>:<resource_type>/<name>`.
fn validate_arn(value: &str, resource_type: &'static str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong { max: MAX_IDENTIFIER_LEN });
    }
    // `splitn(6, ..)` rather than an unbounded split: a task-definition ARN's
    // resource part is itself `family:revision`, so the value may contain
    // more than five colons overall.
    let parts: Vec<&str> = value.splitn(6, ':').collect();
    if parts.len() != 6 || parts[0] != "arn" {
        return Err(IdentifierError::InvalidArnShape(value.to_string(), resource_type));
    }
    let Some((resource, name)) = parts[5].split_once('/') else {
        return Err(IdentifierError::InvalidArnShape(value.to_string(), resource_type));
    };
    if resource != resource_type || name.is_empty() {
        return Err(IdentifierError::InvalidArnShape(value.to_string(), resource_type));
    }
    Ok(())
}

// ============================================================================
// SECTION: Environment / Deployment Identifiers
// ============================================================================

/// User-declared environment name. Unique across all live environments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Parses an environment name, rejecting empty values.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Empty`] when `value` is empty.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if value.is_empty() {
            return Err(IdentifierError::Empty);
        }
        if value.len() > MAX_IDENTIFIER_LEN {
            return Err(IdentifierError::TooLong { max: MAX_IDENTIFIER_LEN });
        }
        Ok(Self(value))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque deployment identifier, freshly allocated at creation time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(String);

impl DeploymentId {
    /// Wraps a pre-generated identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque idempotency token. A fresh value is generated per environment on
/// every mutation and must be presented on the next mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wraps a pre-generated token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Cluster Identifier
// ============================================================================

/// A cluster reference as supplied by a caller: either a bare cluster name
/// or a full cluster ARN. Both shapes resolve to the same cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterRef(String);

impl ClusterRef {
    /// Parses a cluster reference, recognising either a bare name or an ARN.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when `value` is neither a valid bare name
    /// nor a valid `cluster/<name>` ARN.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if value.starts_with("arn:") {
            validate_arn(&value, "cluster")?;
        } else {
            validate_name(&value)?;
        }
        Ok(Self(value))
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when this reference is a full ARN rather than a bare name.
    #[must_use]
    pub fn is_arn(&self) -> bool {
        self.0.starts_with("arn:")
    }

    /// Returns the bare cluster name, extracted from an ARN if necessary.
    #[must_use]
    pub fn short_name(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((_, name)) => name,
            None => &self.0,
        }
    }

    /// Returns true when `self` and `other` denote the same cluster, matching
    /// either as equal strings or by ARN suffix against a bare name.
    #[must_use]
    pub fn matches(&self, other: &ClusterRef) -> bool {
        self.0 == other.0 || self.short_name() == other.short_name()
    }
}

impl fmt::Display for ClusterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Orchestrator Resource Identifiers
// ============================================================================

/// Container instance ARN.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceArn(String);

impl InstanceArn {
    /// Parses a container-instance ARN.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when `value` is not a
    /// `container-instance/<id>` ARN.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        validate_arn(&value, "container-instance")?;
        Ok(Self(value))
    }

    /// Returns the ARN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Task ARN.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskArn(String);

impl TaskArn {
    /// Parses a task ARN.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when `value` is not a `task/<id>` ARN.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        validate_arn(&value, "task")?;
        Ok(Self(value))
    }

    /// Returns the ARN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Task-definition ARN (including revision, e.g. `task-definition/t:1`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskDefinitionArn(String);

impl TaskDefinitionArn {
    /// Parses a task-definition ARN.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when `value` is not a
    /// `task-definition/<family>:<revision>` ARN.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        validate_arn(&value, "task-definition")?;
        Ok(Self(value))
    }

    /// Returns the ARN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskDefinitionArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
