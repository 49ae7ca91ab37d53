//! Signals produced at the transport boundary.

/// A message delivered on a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Channel the message was published on.
    pub channel: String,
    /// Raw text payload.
    pub payload: String,
}

impl From<sqlx::postgres::PgNotification> for Notification {
    fn from(value: sqlx::postgres::PgNotification) -> Self {
        Self {
            channel: value.channel().to_owned(),
            payload: value.payload().to_owned(),
        }
    }
}

/// Everything the event loop can wake up for, apart from the stop signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// A notification arrived.
    Data(Notification),
    /// The connection dropped and has been re-established.
    ///
    /// Notifications published during the gap are lost.
    Reconnect,
    /// Nothing happened for a full probe interval.
    Timeout,
}
