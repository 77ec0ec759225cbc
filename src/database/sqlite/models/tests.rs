use super::*;

#[test]
fn document_status_display() {
    assert_eq!(DocumentStatus::Pending.to_string(), "Pending");
    assert_eq!(DocumentStatus::Processing.to_string(), "Processing");
    assert_eq!(DocumentStatus::Completed.to_string(), "Completed");
    assert_eq!(DocumentStatus::Failed.to_string(), "Failed");
}

#[test]
fn message_role_display() {
    assert_eq!(MessageRole::User.to_string(), "User");
    assert_eq!(MessageRole::Assistant.to_string(), "Assistant");
}

#[test]
fn document_status_serializes_lowercase() {
    let json = serde_json::to_string(&DocumentStatus::Processing).expect("should serialize");
    assert_eq!(json, "\"Processing\"");

    // sqlx storage uses the lowercase form independently of serde.
    let parsed: DocumentStatus =
        serde_json::from_str("\"Processing\"").expect("should deserialize");
    assert_eq!(parsed, DocumentStatus::Processing);
}
