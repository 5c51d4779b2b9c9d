use std::time::Duration;
use thiserror::Error;

/// Errors raised while reading or validating configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Tuning knobs for the chat fan-out engine
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Capacity of the channel between event-source reads and queue pushes
    pub listener_buffer: usize,
    /// Capacity of each broadcaster's control channel (registrations and removals)
    pub registration_buffer: usize,
    /// Capacity of each subscriber's delivery channel
    pub delivery_buffer: usize,
    /// How long a broadcaster sleeps when its room queue is empty
    pub poll_interval: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            listener_buffer: 10,
            registration_buffer: 16,
            delivery_buffer: 16,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl ChatConfig {
    pub const LISTENER_BUFFER_VAR: &'static str = "ROOMCAST_LISTENER_BUFFER";
    pub const REGISTRATION_BUFFER_VAR: &'static str = "ROOMCAST_REGISTRATION_BUFFER";
    pub const DELIVERY_BUFFER_VAR: &'static str = "ROOMCAST_DELIVERY_BUFFER";
    pub const POLL_INTERVAL_VAR: &'static str = "ROOMCAST_POLL_INTERVAL_MS";

    /// Builds a config from the process environment, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listener_buffer = parse_capacity(
            Self::LISTENER_BUFFER_VAR,
            lookup(Self::LISTENER_BUFFER_VAR),
            defaults.listener_buffer,
        )?;
        let registration_buffer = parse_capacity(
            Self::REGISTRATION_BUFFER_VAR,
            lookup(Self::REGISTRATION_BUFFER_VAR),
            defaults.registration_buffer,
        )?;
        let delivery_buffer = parse_capacity(
            Self::DELIVERY_BUFFER_VAR,
            lookup(Self::DELIVERY_BUFFER_VAR),
            defaults.delivery_buffer,
        )?;

        let poll_interval = match lookup(Self::POLL_INTERVAL_VAR) {
            Some(raw) => {
                let millis = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: Self::POLL_INTERVAL_VAR,
                        value: raw.clone(),
                    })?;
                Duration::from_millis(millis)
            }
            None => defaults.poll_interval,
        };

        let config = Self {
            listener_buffer,
            registration_buffer,
            delivery_buffer,
            poll_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects capacities that tokio's bounded channels cannot be built with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacities = [
            (Self::LISTENER_BUFFER_VAR, self.listener_buffer),
            (Self::REGISTRATION_BUFFER_VAR, self.registration_buffer),
            (Self::DELIVERY_BUFFER_VAR, self.delivery_buffer),
        ];

        match capacities.iter().find(|(_, capacity)| *capacity == 0) {
            Some((key, _)) => Err(ConfigError::Zero(*key)),
            None => Ok(()),
        }
    }

    pub fn with_listener_buffer(mut self, capacity: usize) -> Self {
        self.listener_buffer = capacity;
        self
    }

    pub fn with_registration_buffer(mut self, capacity: usize) -> Self {
        self.registration_buffer = capacity;
        self
    }

    pub fn with_delivery_buffer(mut self, capacity: usize) -> Self {
        self.delivery_buffer = capacity;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

fn parse_capacity(
    key: &'static str,
    raw: Option<String>,
    default: usize,
) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    raw.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
        })
}
