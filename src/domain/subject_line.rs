use unicode_segmentation::UnicodeSegmentation;

/// A broadcast subject. Rejects anything that would not survive as a mail
/// header: empty or whitespace-only text, more than 255 graphemes, or
/// embedded line breaks.
#[derive(Debug, Clone)]
pub struct SubjectLine(String);

impl SubjectLine {
    pub fn parse(s: String) -> Result<SubjectLine, String> {
        let is_empty_or_whitespace = s.trim().is_empty();
        let is_too_long = s.graphemes(true).count() > 255;
        let contains_line_breaks = s.chars().any(|c| c == '\r' || c == '\n');

        if is_empty_or_whitespace || is_too_long || contains_line_breaks {
            Err(format!("{} is not a valid broadcast subject.", s))
        } else {
            Ok(Self(s))
        }
    }
}

impl AsRef<str> for SubjectLine {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
