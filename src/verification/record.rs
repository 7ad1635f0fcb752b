use serde::{Deserialize, Serialize};

/// Identity fields read off the document by the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedIdentity {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub document_number: Option<String>,
}

impl ParsedIdentity {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.dob.is_none()
            && self.document_number.is_none()
    }
}

/// Persisted progress of the pending verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationRecord {
    pub id_image_uri: Option<String>,
    pub face_image_uri: Option<String>,
    pub parsed_identity: Option<ParsedIdentity>,
    pub id_complete: bool,
    pub face_complete: bool,
}

impl VerificationRecord {
    pub fn step(&self) -> VerificationStep {
        match (self.id_complete, self.face_complete) {
            (false, _) => VerificationStep::Document,
            (true, false) => VerificationStep::Face,
            (true, true) => VerificationStep::Complete,
        }
    }
}

/// Where the user is in the document → face flow. Derived from the
/// completion flags only; image uris are not consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationStep {
    Document,
    Face,
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_follows_flags() {
        let mut record = VerificationRecord::default();
        assert_eq!(record.step(), VerificationStep::Document);

        // Face flag alone does not skip the document step.
        record.face_complete = true;
        assert_eq!(record.step(), VerificationStep::Document);

        record.face_complete = false;
        record.id_complete = true;
        assert_eq!(record.step(), VerificationStep::Face);

        record.face_complete = true;
        assert_eq!(record.step(), VerificationStep::Complete);
    }

    #[test]
    fn record_json_uses_camel_case_and_tolerates_missing_fields() {
        let record: VerificationRecord =
            serde_json::from_str(r#"{"idImageUri":"file:///id.jpg","idComplete":true}"#).unwrap();
        assert_eq!(record.id_image_uri.as_deref(), Some("file:///id.jpg"));
        assert!(record.id_complete);
        assert!(!record.face_complete);
        assert!(record.parsed_identity.is_none());

        let json = serde_json::to_string(&ParsedIdentity {
            document_number: Some("X1".into()),
            ..Default::default()
        })
        .unwrap();
        assert!(json.contains("\"documentNumber\":\"X1\""));
    }
}
