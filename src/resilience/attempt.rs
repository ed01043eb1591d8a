//! Per-request attempt bookkeeping and the retry decision.
//!
//! A `RequestAttemptContext` is a value: every transition returns a new one,
//! and `classify` is a pure function of (outcome, context, policy).

use std::time::Duration;

use crate::resilience::retry::RetryPolicy;

/// Whether the one allowed reauthentication has been spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAttempt {
    FirstAttempt,
    ReauthRetried,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestAttemptContext {
    pub retry_count: u32,
    pub auth: AuthAttempt,
}

impl Default for RequestAttemptContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestAttemptContext {
    pub fn new() -> Self {
        Self {
            retry_count: 0,
            auth: AuthAttempt::FirstAttempt,
        }
    }

    pub fn after_reauth(self) -> Self {
        Self {
            auth: AuthAttempt::ReauthRetried,
            ..self
        }
    }

    pub fn after_retry(self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self
        }
    }

    /// HTTP attempts made so far, counting the one that just completed.
    pub fn attempts(&self) -> u32 {
        let reauth = match self.auth {
            AuthAttempt::FirstAttempt => 0,
            AuthAttempt::ReauthRetried => 1,
        };
        1 + self.retry_count + reauth
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    Connect,
    Other,
}

impl TransportFailure {
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportFailure::Timeout
        } else if err.is_connect() {
            TransportFailure::Connect
        } else {
            TransportFailure::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportFailure::Timeout => "timeout",
            TransportFailure::Connect => "connect",
            TransportFailure::Other => "transport",
        }
    }
}

/// What a single attempt produced, reduced to what the decision needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Status(u16),
    Transport(TransportFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Auth,
    Transient,
    Permanent,
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Success,
    Reauthenticate,
    Retry { delay: Duration },
    Fail(Failure),
}

pub fn classify(outcome: AttemptOutcome, ctx: RequestAttemptContext, policy: &RetryPolicy) -> Decision {
    match outcome {
        AttemptOutcome::Status(status) if (200..300).contains(&status) => Decision::Success,
        AttemptOutcome::Status(401) => match ctx.auth {
            AuthAttempt::FirstAttempt => Decision::Reauthenticate,
            AuthAttempt::ReauthRetried => Decision::Fail(Failure::Auth),
        },
        AttemptOutcome::Status(status) if policy.is_retryable_status(status) => {
            retry_or(ctx, policy, Failure::Transient)
        }
        AttemptOutcome::Status(_) => Decision::Fail(Failure::Permanent),
        AttemptOutcome::Transport(TransportFailure::Timeout | TransportFailure::Connect)
            if policy.retry_network_errors =>
        {
            retry_or(ctx, policy, Failure::Network)
        }
        AttemptOutcome::Transport(_) => Decision::Fail(Failure::Network),
    }
}

fn retry_or(ctx: RequestAttemptContext, policy: &RetryPolicy, exhausted: Failure) -> Decision {
    if ctx.retry_count < policy.max_retries {
        Decision::Retry {
            delay: policy.delay_for(ctx.retry_count + 1),
        }
    } else {
        Decision::Fail(exhausted)
    }
}
