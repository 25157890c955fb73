use crate::application::status::RecordStatus;
use crate::domain::rejection::{Decision, Rejection};
use crate::domain::student::Amount;
use serde::Serialize;
use serde_json::{Value, json};

/// The tagged result object a front end serializes as its response body.
///
/// `status` is the HTTP status the outcome maps to; `data` carries the
/// success payload or, for rejections, whatever record fields are safe to
/// show for confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub kind: &'static str,
    pub status: u16,
    pub message: String,
    pub data: Value,
}

impl Envelope {
    pub fn success<T: Serialize>(message: impl Into<String>, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                success: true,
                kind: "success",
                status: 200,
                message: message.into(),
                data,
            },
            Err(e) => Self {
                success: false,
                kind: "internal_error",
                status: 500,
                message: format!("Internal error: {e}"),
                data: Value::Null,
            },
        }
    }

    pub fn rejection(rejection: &Rejection, threshold: Amount) -> Self {
        let record = rejection
            .record()
            .map(|record| RecordStatus::project(record, threshold));
        let data = match rejection {
            Rejection::InsufficientAmount {
                threshold,
                shortfall,
                ..
            } => json!({
                "record": record,
                "threshold": threshold,
                "shortfall": shortfall,
            }),
            Rejection::AlreadyRedeemed { id, .. } => json!({
                "id": id,
                "record": record,
            }),
            Rejection::NotFound { id } => json!({ "id": id }),
            Rejection::Internal(_) => Value::Null,
        };
        Self {
            success: false,
            kind: rejection.kind(),
            status: rejection.status_code(),
            message: rejection.to_string(),
            data,
        }
    }

    pub fn from_decision<T: Serialize>(
        decision: &Decision<T>,
        success_message: &str,
        threshold: Amount,
    ) -> Self {
        match decision {
            Ok(data) => Self::success(success_message, data),
            Err(rejection) => Self::rejection(rejection, threshold),
        }
    }
}
