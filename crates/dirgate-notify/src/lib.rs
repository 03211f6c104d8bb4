//! # dirgate-notify
//!
//! Out-of-band delivery of issued secrets over SMS.
//!
//! Providers (Kavenegar, Melipayamak, SMS.ir, and an in-process mock) sit
//! behind the [`SmsProvider`] trait; [`NotificationDispatcher`] renders the
//! active template, sends, and appends a masked audit row per attempt.

pub mod dispatcher;
pub mod error;
pub mod providers;
pub mod template;

pub use dispatcher::{DeliveryReport, Dispatch, NotificationDispatcher, SecretNotice};
pub use error::{NotificationError, ProviderError};
pub use providers::{
    build_provider, KavenegarProvider, MelipayamakProvider, MockSmsProvider, ProviderReceipt,
    ProviderSettings, SmsIrProvider, SmsMessage, SmsProvider, SmsProviderKind,
};
pub use template::{render_masked, render_template, MessageVars, DEFAULT_TEMPLATE};
