use std::{
    io::Write,
    time::{Duration, Instant},
};

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::{Error, Result};

pub const COPY_LABEL: &str = "Copy BibTeX";
pub const COPIED_LABEL: &str = "Copied!";
pub const COPIED_FOR: Duration = Duration::from_millis(1200);

/// Binary-safe payload carried by the copy control, so the control needs no
/// side table to find its BibTeX.
pub fn encode_payload(bibtex: &str) -> String {
    STANDARD.encode(bibtex.as_bytes())
}

pub fn decode_payload(payload: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Payload(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Payload(e.to_string()))
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// Clipboard sink for the command line: the text goes to stdout.
pub struct StdoutClipboard;

impl Clipboard for StdoutClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{text}").map_err(|e| Error::Clipboard(e.to_string()))?;
        out.flush().map_err(|e| Error::Clipboard(e.to_string()))
    }
}

/// State of one "Copy BibTeX" control.
#[derive(Clone, Debug)]
pub struct CopyControl {
    payload: String,
    copied_until: Option<Instant>,
}

impl CopyControl {
    pub fn new(bibtex: &str) -> Self {
        Self::from_payload(encode_payload(bibtex))
    }

    pub fn from_payload(payload: impl Into<String>) -> Self {
        CopyControl {
            payload: payload.into(),
            copied_until: None,
        }
    }

    /// Decode the payload and hand it to the clipboard. The label only flips
    /// to the acknowledgment once the write succeeded.
    pub fn activate(&mut self, clipboard: &mut dyn Clipboard, now: Instant) -> Result<()> {
        let text = decode_payload(&self.payload)?;
        clipboard.write_text(&text)?;
        self.copied_until = Some(now + COPIED_FOR);
        Ok(())
    }

    pub fn label(&self, now: Instant) -> &'static str {
        match self.copied_until {
            Some(until) if now < until => COPIED_LABEL,
            _ => COPY_LABEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemoryClipboard {
        text: Option<String>,
        fail: bool,
    }

    impl Clipboard for MemoryClipboard {
        fn write_text(&mut self, text: &str) -> Result<()> {
            if self.fail {
                return Err(Error::Clipboard("denied".to_string()));
            }
            self.text = Some(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn payload_round_trips_non_ascii() {
        let bib = "@misc{k, title={Le café de la gare}, author={Zoë Ŝ}}";
        assert_eq!(decode_payload(&encode_payload(bib)).expect("decode"), bib);
    }

    #[test]
    fn payload_round_trips_any_text() {
        proptest::proptest!(|(s in "\\PC*")| {
            let decoded = decode_payload(&encode_payload(&s)).expect("decode");
            proptest::prop_assert_eq!(decoded, s);
        })
    }

    #[test]
    fn payload_is_attribute_safe() {
        let payload = encode_payload("a \"quoted\" <tag> & 'x'");
        assert!(
            payload
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        );
    }

    #[test]
    fn invalid_payload_is_rejected() {
        assert!(matches!(decode_payload("%%%"), Err(Error::Payload(_))));
        // valid base64, invalid UTF-8
        assert!(matches!(decode_payload("/w=="), Err(Error::Payload(_))));
    }

    #[test]
    fn activation_copies_and_acknowledges_briefly() {
        let mut control = CopyControl::new("@misc{café}");
        let mut clipboard = MemoryClipboard::default();
        let t0 = Instant::now();
        assert_eq!(control.label(t0), COPY_LABEL);

        control.activate(&mut clipboard, t0).expect("activate");
        assert_eq!(clipboard.text.as_deref(), Some("@misc{café}"));
        assert_eq!(control.label(t0), COPIED_LABEL);
        assert_eq!(control.label(t0 + Duration::from_millis(1199)), COPIED_LABEL);
        assert_eq!(control.label(t0 + COPIED_FOR), COPY_LABEL);
    }

    #[test]
    fn failed_write_keeps_label() {
        let mut control = CopyControl::new("x");
        let mut clipboard = MemoryClipboard {
            fail: true,
            ..Default::default()
        };
        let now = Instant::now();
        assert!(control.activate(&mut clipboard, now).is_err());
        assert_eq!(control.label(now), COPY_LABEL);
    }
}
