//! Moves results between the capture steps and the verification session.

use log::info;

use crate::capture::{CaptureHandoff, CaptureResult};
use crate::ocr::TextReading;
use crate::verification::{ParsedIdentity, VerificationSession};

/// Extracts identity fields from a locked document reading.
pub trait IdentityParser {
    fn parse(&self, reading: &TextReading) -> ParsedIdentity;
}

impl<F> IdentityParser for F
where
    F: Fn(&TextReading) -> ParsedIdentity,
{
    fn parse(&self, reading: &TextReading) -> ParsedIdentity {
        self(reading)
    }
}

pub struct VerificationFlow<'a> {
    session: &'a VerificationSession,
    handoff: &'a CaptureHandoff,
}

impl<'a> VerificationFlow<'a> {
    pub fn new(session: &'a VerificationSession, handoff: &'a CaptureHandoff) -> Self {
        Self { session, handoff }
    }

    /// Records the document step once its text has locked.
    pub fn record_document<P>(
        &self,
        image_uri: impl Into<String>,
        reading: &TextReading,
        parser: &P,
    ) where
        P: IdentityParser + ?Sized,
    {
        let identity = parser.parse(reading);
        if identity.is_empty() {
            info!("Identity parser returned no fields for locked reading");
        }
        self.session.set_id_image_uri(image_uri);
        self.session.set_parsed_id(identity);
        self.session.set_id_complete(true);
    }

    /// Takes the pending face capture, if any, and records it.
    pub fn complete_face_capture(&self) -> Option<CaptureResult> {
        let capture = self.handoff.consume_result()?;
        self.session.set_face_image_uri(capture.uri.clone());
        self.session.set_face_complete(true);
        Some(capture)
    }

    pub fn abandon(&self) {
        info!("Verification abandoned");
        self.discard();
    }

    pub fn finish(&self) {
        info!("Verification submitted");
        self.discard();
    }

    fn discard(&self) {
        self.session.reset();
        self.handoff.clear();
    }
}
