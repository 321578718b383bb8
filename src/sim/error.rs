use thiserror::Error;

/// Failure surface of the what-if engine.
///
/// Plumbing layers (provider, store, HTTP client) speak `anyhow`; everything that
/// crosses into the simulation is folded into one of these three kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WhatIfError {
    /// Caller input rejected before any simulation ran: bad play index, malformed
    /// override, out-of-domain trial count, unparseable game id.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Provider failure or missing game/season. Never papered over with made-up data.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// The engine reached a state it should never reach (down 5, spot off the field,
    /// runaway continuation). Fatal for the run that hit it.
    #[error("simulation invariant violated: {0}")]
    Invariant(String),
}

impl WhatIfError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        WhatIfError::InvalidInput(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        WhatIfError::DataUnavailable(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        WhatIfError::Invariant(msg.into())
    }

    /// Stable machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            WhatIfError::InvalidInput(_) => "invalid_input",
            WhatIfError::DataUnavailable(_) => "data_unavailable",
            WhatIfError::Invariant(_) => "simulation_invariant",
        }
    }
}
