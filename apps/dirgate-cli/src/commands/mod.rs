//! Command implementations

pub mod directory;
pub mod group;
pub mod password;
pub mod sms;
pub mod sync;
pub mod user;

use dirgate_identity::DeliveryOutcome;

/// Truncate a string for table display.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let kept: String = value.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Reject negative pagination values before they reach SQL.
pub fn validate_pagination(limit: i64, offset: i64) -> crate::error::CliResult<()> {
    if limit <= 0 || offset < 0 {
        return Err(crate::error::CliError::Validation(
            "limit must be positive and offset must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// One-line description of an SMS delivery.
pub fn describe_delivery(delivery: &DeliveryOutcome) -> String {
    match delivery {
        DeliveryOutcome::NotRequested => "not requested".to_string(),
        DeliveryOutcome::Skipped { reason } => format!("skipped ({reason})"),
        DeliveryOutcome::Sent { message_id, .. } => match message_id {
            Some(id) => format!("sent (message id {id})"),
            None => "sent".to_string(),
        },
        DeliveryOutcome::Failed { error, .. } => format!("failed ({error})"),
    }
}
