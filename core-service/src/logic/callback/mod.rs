//! Callback Module - completion notifications for batch jobs

pub mod dispatcher;

pub use dispatcher::{
    parse_callback_url, CallbackConfig, CallbackDispatcher, CallbackError, CallbackPayload,
    DeliveryReport, DeliveryStats,
};
